use crate::domain_model::*;
use crate::domain_port::StoreError;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid credentials, {remaining_attempts} attempt(s) left")]
    InvalidCredentials { remaining_attempts: u32 },
    #[error("account blocked for {remaining_minutes} more minute(s)")]
    AccountBlocked { remaining_minutes: u32 },
    #[error("user already logged in")]
    AlreadyLoggedIn,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for BackendError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Store(e) => BackendError::Store(e),
            StoreError::InternalError(e) => BackendError::InternalError(e.to_string()),
        }
    }
}

/// Backend-owned lockout constants.
#[derive(Debug, Clone)]
pub struct BlockPolicy {
    pub max_attempts: u32,
    pub block_duration: Duration,
    /// Failures older than this without a block are forgotten.
    pub attempt_window: Duration,
    pub single_session: bool,
}

impl Default for BlockPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            block_duration: Duration::from_secs(5 * 60),
            attempt_window: Duration::from_secs(15 * 60),
            single_session: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: Email,
    pub password: String,
    /// JSON document from the client, kept for auditing only.
    pub device_info: String,
}

#[derive(Debug, Clone)]
pub struct TokenVerifyResult {
    pub user_id: UserId,
    pub jti: String,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_session_token(
        &self,
        user: UserId,
        jti: &str,
    ) -> Result<(String, DateTime<Utc>), BackendError>;
    async fn verify_session_token(&self, token: &str) -> Result<TokenVerifyResult, BackendError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, BackendError>;
    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, BackendError>;
}

/// Server side of the block-status and login endpoints.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    async fn register(&self, email: &Email, password: &str) -> Result<UserId, BackendError>;
    async fn block_status(&self, email: &Email) -> Result<BlockStatus, BackendError>;
    async fn login(&self, request: LoginInput) -> Result<LoginSuccess, BackendError>;
    async fn logout(&self, token: &str) -> Result<(), BackendError>;
    /// Drops attempt records that no longer affect any login decision.
    async fn cleanup(&self) -> Result<usize, BackendError>;
}
