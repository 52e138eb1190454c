use crate::domain_model::*;
use crate::domain_port::StoreError;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(
        &self,
        user_id: UserId,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Whether the user holds a session that has not expired at `now`.
    async fn has_active(&self, user_id: UserId, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Removes the session if `jti` is the one on record. Returns whether
    /// anything was removed.
    async fn release(&self, user_id: UserId, jti: &str) -> Result<bool, StoreError>;
}
