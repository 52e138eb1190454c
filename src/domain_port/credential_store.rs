use crate::domain_model::*;
use crate::domain_port::StoreError;

#[derive(Debug, Clone)]
pub struct CredentialsRecord {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
}

#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert(&self, record: CredentialsRecord) -> Result<(), StoreError>;

    /// Lookup by normalized email.
    async fn get_by_email(&self, key: &str) -> Result<Option<CredentialsRecord>, StoreError>;
}
