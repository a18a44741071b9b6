//! CRUD operations for [`Conversation`] records and their participants.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use vault_shared::types::{ConversationId, UserId};

use crate::codec::{id_col, ts_col, ts_to_sql};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Conversation, Participant};

impl Database {
    // ------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------

    pub fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.conn().execute(
            "INSERT INTO conversations (conversation_id, created_at) VALUES (?1, ?2)",
            params![
                conversation.conversation_id.to_string(),
                ts_to_sql(&conversation.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        self.conn()
            .query_row(
                "SELECT conversation_id, created_at FROM conversations WHERE conversation_id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(Conversation {
                        conversation_id: id_col(row, 0)?,
                        created_at: ts_col(row, 1)?,
                    })
                },
            )
            .map_err(StoreError::from_query)
    }

    pub fn conversation_exists(&self, id: ConversationId) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM conversations WHERE conversation_id = ?1",
                params![id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    /// Add `user_id` to the conversation.
    ///
    /// Returns `false` when the user was already a participant; the
    /// first `joined_at` is kept.
    pub fn add_participant(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        joined_at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            params![
                conversation_id.to_string(),
                user_id.to_string(),
                ts_to_sql(&joined_at),
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn is_participant(&self, conversation_id: ConversationId, user_id: UserId) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM conversation_participants
                 WHERE conversation_id = ?1 AND user_id = ?2",
                params![conversation_id.to_string(), user_id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list_participants(&self, conversation_id: ConversationId) -> Result<Vec<Participant>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, joined_at
             FROM conversation_participants
             WHERE conversation_id = ?1
             ORDER BY joined_at ASC, user_id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id.to_string()], |row| {
            Ok(Participant {
                user_id: id_col(row, 0)?,
                joined_at: ts_col(row, 1)?,
            })
        })?;

        let mut participants = Vec::new();
        for row in rows {
            participants.push(row?);
        }
        Ok(participants)
    }

    /// Conversations `user_id` belongs to, in join order.
    pub fn list_conversations_for_user(&self, user_id: UserId) -> Result<Vec<ConversationId>> {
        let mut stmt = self.conn().prepare(
            "SELECT conversation_id
             FROM conversation_participants
             WHERE user_id = ?1
             ORDER BY joined_at ASC, conversation_id ASC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], |row| id_col(row, 0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}
