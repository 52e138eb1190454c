use crate::domain_model::Email;
use crate::domain_port::*;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, CredentialsRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, record: CredentialsRecord) -> Result<(), StoreError> {
        let key = Email::new(&record.email).normalized();
        self.users.insert(key, record);
        Ok(())
    }

    async fn get_by_email(&self, key: &str) -> Result<Option<CredentialsRecord>, StoreError> {
        Ok(self.users.get(key).map(|record| record.clone()))
    }
}
