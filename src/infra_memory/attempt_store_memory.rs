use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryAttemptStore {
    records: DashMap<String, AttemptRecord>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, StoreError> {
        Ok(self.records.get(key).map(|record| record.clone()))
    }

    async fn record_failure(
        &self,
        key: &str,
        at: DateTime<Utc>,
    ) -> Result<AttemptRecord, StoreError> {
        let mut entry = self.records.entry(key.to_owned()).or_default();
        entry.failed_attempts = entry.failed_attempts.saturating_add(1);
        entry.last_failed_at = Some(at);
        Ok(entry.clone())
    }

    async fn block(
        &self,
        key: &str,
        blocked_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entry = self.records.entry(key.to_owned()).or_default();
        entry.blocked_at = Some(blocked_at);
        entry.expires_at = Some(expires_at);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.records.remove(key);
        Ok(())
    }

    async fn cleanup_stale(
        &self,
        now: DateTime<Utc>,
        idle_before: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let before = self.records.len();
        self.records
            .retain(|_, record| !record.is_stale(now, idle_before));
        Ok(before.saturating_sub(self.records.len()))
    }
}
