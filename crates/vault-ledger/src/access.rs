//! Existence and membership checks shared by the ledger components.
//!
//! All of these run against an already-locked [`Database`].

use vault_shared::protocol::User;
use vault_shared::types::{ConversationId, MessageId, UserId};
use vault_store::{Database, StoreError};

use crate::error::{LedgerError, Result};

pub(crate) fn require_user(db: &Database, user_id: UserId) -> Result<User> {
    db.get_user(user_id).map_err(|e| match e {
        StoreError::NotFound => LedgerError::not_found("user", user_id),
        other => other.into(),
    })
}

pub(crate) fn require_user_exists(db: &Database, user_id: UserId) -> Result<()> {
    if db.user_exists(user_id)? {
        Ok(())
    } else {
        Err(LedgerError::not_found("user", user_id))
    }
}

pub(crate) fn require_conversation(db: &Database, conversation_id: ConversationId) -> Result<()> {
    if db.conversation_exists(conversation_id)? {
        Ok(())
    } else {
        Err(LedgerError::not_found("conversation", conversation_id))
    }
}

pub(crate) fn require_participant(
    db: &Database,
    conversation_id: ConversationId,
    user_id: UserId,
) -> Result<()> {
    if db.is_participant(conversation_id, user_id)? {
        Ok(())
    } else {
        Err(LedgerError::Forbidden(format!(
            "user {user_id} is not a participant of conversation {conversation_id}"
        )))
    }
}

pub(crate) fn require_message(db: &Database, message_id: MessageId) -> Result<ConversationId> {
    db.message_conversation(message_id).map_err(|e| match e {
        StoreError::NotFound => LedgerError::not_found("message", message_id),
        other => other.into(),
    })
}

/// Message and user must exist, and the user must belong to the
/// message's conversation. Returns that conversation.
pub(crate) fn require_message_member(
    db: &Database,
    message_id: MessageId,
    user_id: UserId,
) -> Result<ConversationId> {
    let conversation_id = require_message(db, message_id)?;
    require_user_exists(db, user_id)?;
    require_participant(db, conversation_id, user_id)?;
    Ok(conversation_id)
}

pub(crate) fn require_non_empty(field: &str, value: &[u8]) -> Result<()> {
    if value.is_empty() {
        Err(LedgerError::InvalidInput(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}
