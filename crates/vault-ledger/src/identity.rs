//! Identity Registry: public-key records of registered users.

use chrono::Utc;
use tracing::info;
use vault_shared::protocol::User;
use vault_shared::types::{KeyId, UserId};
use vault_store::StoreError;

use crate::access::{require_non_empty, require_user};
use crate::error::{LedgerError, Result};
use crate::SharedDb;

#[derive(Clone)]
pub struct IdentityRegistry {
    db: SharedDb,
}

impl IdentityRegistry {
    pub(crate) fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// Register a public key under a fresh user id.
    pub async fn register(&self, public_key: Vec<u8>, fingerprint: Vec<u8>) -> Result<User> {
        require_non_empty("public_key", &public_key)?;
        require_non_empty("fingerprint", &fingerprint)?;

        let user = User {
            user_id: UserId::new(),
            public_key,
            fingerprint,
            key_id: KeyId::primary(),
            created_at: Utc::now(),
        };
        self.db.lock().await.insert_user(&user)?;

        info!(user = %user.user_id, "Registered user");
        Ok(user)
    }

    /// Current verification key of `user_id`.
    pub async fn resolve(&self, user_id: UserId) -> Result<Vec<u8>> {
        Ok(self.get(user_id).await?.public_key)
    }

    pub async fn get(&self, user_id: UserId) -> Result<User> {
        let db = self.db.lock().await;
        require_user(&db, user_id)
    }

    pub async fn find_by_fingerprint(&self, fingerprint: &[u8]) -> Result<User> {
        require_non_empty("fingerprint", fingerprint)?;
        self.db
            .lock()
            .await
            .find_user_by_fingerprint(fingerprint)
            .map_err(|e| match e {
                StoreError::NotFound => {
                    LedgerError::not_found("fingerprint", vault_shared::encoding::encode(fingerprint))
                }
                other => other.into(),
            })
    }
}
