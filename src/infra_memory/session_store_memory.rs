use crate::domain_model::UserId;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

struct SessionRecord {
    jti: String,
    expires_at: DateTime<Utc>,
}

/// One live session per user; saving a new one replaces the old.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<UserId, SessionRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(
        &self,
        user_id: UserId,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.sessions.insert(
            user_id,
            SessionRecord {
                jti: jti.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn has_active(&self, user_id: UserId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self
            .sessions
            .get(&user_id)
            .is_some_and(|session| session.expires_at > now))
    }

    async fn release(&self, user_id: UserId, jti: &str) -> Result<bool, StoreError> {
        Ok(self
            .sessions
            .remove_if(&user_id, |_, session| session.jti == jti)
            .is_some())
    }
}
