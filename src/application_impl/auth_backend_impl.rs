use crate::application_impl::{JwtConfig, JwtHs256Codec};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use std::sync::Arc;
use std::time::Duration;

/// In-process stand-in for the remote auth service: counts failed logins per
/// email, blocks after `max_attempts`, and lifts the block once it expires.
pub struct RealAuthBackend {
    attempts: Arc<dyn AttemptStore>,
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    clock: Arc<dyn Clock>,
    policy: BlockPolicy,
}

impl RealAuthBackend {
    pub fn new(
        attempts: Arc<dyn AttemptStore>,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        clock: Arc<dyn Clock>,
        policy: BlockPolicy,
    ) -> Self {
        Self {
            attempts,
            credentials,
            sessions,
            credential_hasher,
            token_codec,
            clock,
            policy,
        }
    }

    /// Memory-backed instance with a throwaway signing key.
    pub fn in_memory(
        policy: BlockPolicy,
        credential_hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let token_codec = Arc::new(JwtHs256Codec::new(
            JwtConfig {
                issuer: "login-guard.dev".to_string(),
                audience: "sign-in".to_string(),
                session_ttl: Duration::from_secs(24 * 60 * 60),
                signing_key: nanoid!(32).into_bytes(),
            },
            clock.clone(),
        ));
        Self::new(
            Arc::new(MemoryAttemptStore::new()),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemorySessionStore::new()),
            credential_hasher,
            token_codec,
            clock,
            policy,
        )
    }

    fn remaining_minutes(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
        let secs = (expires_at - now).num_seconds().max(0) as u64;
        u32::try_from(secs.div_ceil(60)).unwrap_or(u32::MAX).max(1)
    }

    fn after(now: DateTime<Utc>, by: Duration) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(by)
            .ok()
            .and_then(|by| now.checked_add_signed(by))
    }

    /// Unblocked failures before this instant are stale.
    fn idle_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.policy.attempt_window)
            .ok()
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn status_of(&self, email: &Email, record: &AttemptRecord, now: DateTime<Utc>) -> BlockStatus {
        let is_blocked = record.is_blocked_at(now);
        BlockStatus {
            email: email.as_str().to_owned(),
            is_blocked,
            attempts: record.failed_attempts,
            blocked_at: record.blocked_at,
            expires_at: record.expires_at,
            remaining_minutes: match record.expires_at {
                Some(expires_at) if is_blocked => Self::remaining_minutes(expires_at, now),
                _ => 0,
            },
        }
    }

    /// Current record for `key`, dropping a block that has run out and
    /// failures that went idle.
    async fn live_record(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AttemptRecord>, BackendError> {
        match self.attempts.get(key).await? {
            Some(record) if record.is_stale(now, self.idle_before(now)) => {
                self.attempts.clear(key).await?;
                if record.block_expired_at(now) {
                    info!(email = key, "block expired");
                } else {
                    debug!(email = key, "idle attempts forgotten");
                }
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn record_failure(&self, key: &str, now: DateTime<Utc>) -> Result<BackendError, BackendError> {
        let record = self.attempts.record_failure(key, now).await?;

        if record.failed_attempts >= self.policy.max_attempts {
            let expires_at = Self::after(now, self.policy.block_duration).ok_or_else(|| {
                BackendError::InternalError("block duration out of range".to_string())
            })?;
            self.attempts.block(key, now, expires_at).await?;
            info!(
                email = key,
                attempts = record.failed_attempts,
                %expires_at,
                "account blocked"
            );
        }

        Ok(BackendError::InvalidCredentials {
            remaining_attempts: self
                .policy
                .max_attempts
                .saturating_sub(record.failed_attempts),
        })
    }
}

#[async_trait::async_trait]
impl AuthBackend for RealAuthBackend {
    async fn register(&self, email: &Email, password: &str) -> Result<UserId, BackendError> {
        let key = email.normalized();
        let user_id = UserId::for_email(&key);
        let password_hash = self.credential_hasher.hash_password(password).await?;
        self.credentials
            .insert(CredentialsRecord {
                user_id,
                email: email.as_str().to_owned(),
                password_hash,
                is_active: true,
            })
            .await?;
        Ok(user_id)
    }

    async fn block_status(&self, email: &Email) -> Result<BlockStatus, BackendError> {
        let key = email.normalized();
        let now = self.clock.now();
        match self.live_record(&key, now).await? {
            Some(record) => Ok(self.status_of(email, &record, now)),
            None => Ok(BlockStatus::clear(email)),
        }
    }

    async fn login(&self, request: LoginInput) -> Result<LoginSuccess, BackendError> {
        let LoginInput {
            email,
            password,
            device_info,
        } = request;
        let key = email.normalized();
        let now = self.clock.now();

        if let Some(record) = self.live_record(&key, now).await? {
            if let Some(expires_at) = record.expires_at.filter(|_| record.is_blocked_at(now)) {
                return Err(BackendError::AccountBlocked {
                    remaining_minutes: Self::remaining_minutes(expires_at, now),
                });
            }
        }
        debug!(%email, %device_info, "login attempt");

        let credentials = match self.credentials.get_by_email(&key).await? {
            Some(rec) if rec.is_active => Some(rec),
            _ => None,
        };
        let verified = match &credentials {
            Some(rec) => {
                self.credential_hasher
                    .verify_password(&password, &rec.password_hash)
                    .await?
            }
            None => false,
        };
        let Some(rec) = credentials.filter(|_| verified) else {
            return Err(self.record_failure(&key, now).await?);
        };

        if self.policy.single_session && self.sessions.has_active(rec.user_id, now).await? {
            return Err(BackendError::AlreadyLoggedIn);
        }

        self.attempts.clear(&key).await?;

        let jti = nanoid!();
        let (access_token, expires_at) = self
            .token_codec
            .issue_session_token(rec.user_id, &jti)
            .await?;
        self.sessions.save(rec.user_id, &jti, expires_at).await?;

        Ok(LoginSuccess {
            user: AuthenticatedUser {
                id: rec.user_id,
                email: rec.email,
            },
            session: Session {
                access_token,
                expires_at,
            },
        })
    }

    async fn logout(&self, token: &str) -> Result<(), BackendError> {
        let verified = self.token_codec.verify_session_token(token).await?;
        if self
            .sessions
            .release(verified.user_id, &verified.jti)
            .await?
        {
            Ok(())
        } else {
            Err(BackendError::TokenInvalid)
        }
    }

    async fn cleanup(&self) -> Result<usize, BackendError> {
        let now = self.clock.now();
        let dropped = self
            .attempts
            .cleanup_stale(now, self.idle_before(now))
            .await?;
        if dropped > 0 {
            debug!(dropped, "attempt records cleaned up");
        }
        Ok(dropped)
    }
}
