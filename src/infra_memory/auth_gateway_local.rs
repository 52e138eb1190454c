use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

/// Gateway that calls an in-process [`AuthBackend`] instead of going over
/// HTTP. Backend errors are mapped to the same results the HTTP contract
/// would produce.
pub struct LocalAuthGateway {
    backend: Arc<dyn AuthBackend>,
}

impl LocalAuthGateway {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait::async_trait]
impl AuthGateway for LocalAuthGateway {
    async fn get_block_status(&self, email: &Email) -> Result<BlockStatus, GatewayError> {
        self.backend
            .block_status(email)
            .await
            .map_err(|e| GatewayError::Backend(e.to_string()))
    }

    async fn attempt_login(
        &self,
        email: &Email,
        password: &str,
        device_info: &DeviceInfo,
    ) -> Result<LoginAttemptResult, GatewayError> {
        let request = LoginInput {
            email: email.clone(),
            password: password.to_owned(),
            device_info: device_info.to_wire(),
        };

        match self.backend.login(request).await {
            Ok(success) => Ok(LoginAttemptResult::Success(success)),
            Err(BackendError::InvalidCredentials { remaining_attempts }) => {
                Ok(LoginAttemptResult::InvalidCredentials {
                    remaining_attempts: Some(remaining_attempts),
                })
            }
            Err(BackendError::AccountBlocked { remaining_minutes }) => {
                Ok(LoginAttemptResult::AccountBlocked {
                    remaining_minutes: Some(remaining_minutes),
                })
            }
            Err(BackendError::AlreadyLoggedIn) => Ok(LoginAttemptResult::Failed {
                status: Some(409),
                code: Some(USER_ALREADY_LOGGED_IN.to_string()),
                message: BackendError::AlreadyLoggedIn.to_string(),
            }),
            Err(e) => Err(GatewayError::Backend(e.to_string())),
        }
    }
}
