//! Conversation Registry: conversations and their participant sets.
//!
//! Membership is add-only.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, info};
use vault_shared::types::{ConversationId, UserId};
use vault_store::Conversation;

use crate::access::{require_conversation, require_user_exists};
use crate::error::Result;
use crate::SharedDb;

#[derive(Clone)]
pub struct ConversationRegistry {
    db: SharedDb,
}

impl ConversationRegistry {
    pub(crate) fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// Create an empty conversation.
    pub async fn create(&self) -> Result<ConversationId> {
        let conversation = Conversation {
            conversation_id: ConversationId::new(),
            created_at: Utc::now(),
        };
        self.db.lock().await.insert_conversation(&conversation)?;

        info!(conversation = %conversation.conversation_id, "Created conversation");
        Ok(conversation.conversation_id)
    }

    /// Add `user_id` to the conversation. Adding an existing participant
    /// is a no-op.
    pub async fn add_participant(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<()> {
        let db = self.db.lock().await;
        require_conversation(&db, conversation_id)?;
        require_user_exists(&db, user_id)?;

        if db.add_participant(conversation_id, user_id, Utc::now())? {
            info!(conversation = %conversation_id, user = %user_id, "Participant added");
        } else {
            debug!(conversation = %conversation_id, user = %user_id, "Already a participant");
        }
        Ok(())
    }

    pub async fn list_participants(
        &self,
        conversation_id: ConversationId,
    ) -> Result<BTreeSet<UserId>> {
        let db = self.db.lock().await;
        require_conversation(&db, conversation_id)?;
        Ok(db
            .list_participants(conversation_id)?
            .into_iter()
            .map(|p| p.user_id)
            .collect())
    }

    pub async fn is_participant(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<bool> {
        Ok(self.db.lock().await.is_participant(conversation_id, user_id)?)
    }

    /// Conversations `user_id` participates in, in the order they joined.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ConversationId>> {
        let db = self.db.lock().await;
        require_user_exists(&db, user_id)?;
        Ok(db.list_conversations_for_user(user_id)?)
    }
}
