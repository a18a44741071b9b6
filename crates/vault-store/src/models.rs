//! Records persisted in the ledger database.
//!
//! Users, messages, receipts and attachments are stored exactly as they
//! travel on the wire, so those types are re-exported from `vault-shared`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use vault_shared::protocol::{Attachment, AttachmentMeta, ChainMessage, Receipt, User};
use vault_shared::types::{ConversationId, UserId};

/// A conversation. Its chain lives in `messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub conversation_id: ConversationId,
    pub created_at: DateTime<Utc>,
}

/// Membership of one user in one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}
