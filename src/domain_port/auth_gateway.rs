use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// The two calls the attempt guard makes against the auth backend.
#[async_trait::async_trait]
pub trait AuthGateway: Send + Sync {
    /// Unknown emails come back as [`BlockStatus::clear`], never as an error.
    async fn get_block_status(&self, email: &Email) -> Result<BlockStatus, GatewayError>;

    /// Failed logins are `Ok` with a classified result; `Err` is reserved for
    /// failures to reach or understand the backend.
    async fn attempt_login(
        &self,
        email: &Email,
        password: &str,
        device_info: &DeviceInfo,
    ) -> Result<LoginAttemptResult, GatewayError>;
}
