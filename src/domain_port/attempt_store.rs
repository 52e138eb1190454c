use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptRecord {
    pub failed_attempts: u32,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at > now)
    }

    pub fn block_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    /// True once the record no longer affects a login decision: its block
    /// ran out, or it was never blocked and the last failure is older than
    /// `idle_before`.
    pub fn is_stale(&self, now: DateTime<Utc>, idle_before: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(_) => self.block_expired_at(now),
            None => self.last_failed_at.is_none_or(|at| at < idle_before),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Failed-login bookkeeping keyed by normalized email.
#[async_trait::async_trait]
pub trait AttemptStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, StoreError>;

    /// Atomically bumps the failure counter and returns the updated record.
    async fn record_failure(
        &self,
        key: &str,
        at: DateTime<Utc>,
    ) -> Result<AttemptRecord, StoreError>;

    async fn block(
        &self,
        key: &str,
        blocked_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn clear(&self, key: &str) -> Result<(), StoreError>;

    /// Removes every stale record, returning how many were dropped.
    async fn cleanup_stale(
        &self,
        now: DateTime<Utc>,
        idle_before: DateTime<Utc>,
    ) -> Result<usize, StoreError>;
}
