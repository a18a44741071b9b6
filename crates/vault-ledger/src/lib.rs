//! Tamper-evident message ledger.
//!
//! [`Ledger`] ties together the identity registry, the conversation
//! registry, the per-conversation message chains, receipts and attachments
//! over one shared [`Database`].

pub mod attachments;
pub mod chain;
pub mod conversations;
pub mod error;
pub mod identity;
pub mod receipts;

mod access;

use std::sync::Arc;

use tokio::sync::Mutex;
use vault_shared::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use vault_shared::signing::{Ed25519Verifier, SignatureVerifier};
use vault_store::Database;

pub use attachments::AttachmentRegistry;
pub use chain::{ChainEngine, ChainReport};
pub use conversations::ConversationRegistry;
pub use error::{LedgerError, Result};
pub use identity::IdentityRegistry;
pub use receipts::ReceiptTracker;

/// Database handle shared by every ledger component.
///
/// Every storage call goes through this one mutex. Appends to different
/// conversations only overlap while waiting on their per-conversation tail
/// locks in [`ChainEngine`]; their reads and writes still take turns here.
pub type SharedDb = Arc<Mutex<Database>>;

/// Paging limits applied to list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    pub default_page_limit: u32,
    pub max_page_limit: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: MAX_PAGE_LIMIT,
        }
    }
}

impl LedgerConfig {
    /// Validate a caller-supplied page size.
    pub fn check_limit(&self, limit: i64) -> Result<u32> {
        if limit <= 0 || limit > i64::from(self.max_page_limit) {
            return Err(LedgerError::InvalidInput(format!(
                "limit must be between 1 and {}, got {limit}",
                self.max_page_limit
            )));
        }
        // In range of u32 after the check above
        Ok(limit as u32)
    }
}

pub struct Ledger {
    db: SharedDb,
    identities: IdentityRegistry,
    conversations: ConversationRegistry,
    chain: ChainEngine,
    receipts: ReceiptTracker,
    attachments: AttachmentRegistry,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(db: Database, verifier: Arc<dyn SignatureVerifier>, config: LedgerConfig) -> Self {
        let db: SharedDb = Arc::new(Mutex::new(db));
        Self {
            identities: IdentityRegistry::new(db.clone()),
            conversations: ConversationRegistry::new(db.clone()),
            chain: ChainEngine::new(db.clone(), verifier.clone(), config),
            receipts: ReceiptTracker::new(db.clone()),
            attachments: AttachmentRegistry::new(db.clone(), verifier),
            db,
            config,
        }
    }

    /// Ledger verifying Ed25519 signatures.
    pub fn with_ed25519(db: Database, config: LedgerConfig) -> Self {
        Self::new(db, Arc::new(Ed25519Verifier), config)
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    pub fn conversations(&self) -> &ConversationRegistry {
        &self.conversations
    }

    pub fn chain(&self) -> &ChainEngine {
        &self.chain
    }

    pub fn receipts(&self) -> &ReceiptTracker {
        &self.receipts
    }

    pub fn attachments(&self) -> &AttachmentRegistry {
        &self.attachments
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The underlying database. Intended for maintenance and tests.
    pub fn database(&self) -> &SharedDb {
        &self.db
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;

    use vault_shared::identity::Identity;
    use vault_shared::protocol::{NewMessage, User};
    use vault_shared::types::{ConversationId, UserId};
    use vault_store::Database;

    use crate::{Ledger, LedgerConfig};

    pub fn ledger() -> Ledger {
        Ledger::with_ed25519(Database::open_in_memory().unwrap(), LedgerConfig::default())
    }

    pub fn ledger_at(path: &Path) -> Ledger {
        Ledger::with_ed25519(Database::open_at(path).unwrap(), LedgerConfig::default())
    }

    pub async fn register(ledger: &Ledger, identity: &Identity) -> (UserId, User) {
        let user = ledger
            .identities()
            .register(
                identity.public_key_bytes().to_vec(),
                identity.fingerprint().to_vec(),
            )
            .await
            .unwrap();
        (user.user_id, user)
    }

    /// A registered user and the keys it signs with.
    pub struct Member {
        pub user_id: UserId,
        pub identity: Identity,
    }

    impl Member {
        pub fn seal(
            &self,
            conversation_id: ConversationId,
            ciphertext: &[u8],
            prev_hash: Option<Vec<u8>>,
        ) -> NewMessage {
            self.identity.seal_message(
                &conversation_id,
                self.user_id,
                ciphertext.to_vec(),
                prev_hash,
            )
        }
    }
}
