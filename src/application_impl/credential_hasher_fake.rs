use crate::application_port::{BackendError, CredentialHasher};

const PREFIX: &str = "plain:";

/// Stores passwords as `plain:<password>`. For tests and local demos only.
#[derive(Debug, Default)]
pub struct FakeCredentialHasher;

impl FakeCredentialHasher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CredentialHasher for FakeCredentialHasher {
    async fn hash_password(&self, password: &str) -> Result<String, BackendError> {
        Ok(format!("{}{}", PREFIX, password))
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, BackendError> {
        match password_hash.strip_prefix(PREFIX) {
            Some(stored) => Ok(stored == password),
            None => Err(BackendError::InternalError(
                "hash was not produced by the fake hasher".to_string(),
            )),
        }
    }
}
