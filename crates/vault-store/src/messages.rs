//! Storage of chained messages.
//!
//! Rows are inserted once and never updated. The `(conversation_id,
//! sequence)` uniqueness constraint backs up the ledger's own tail lock.

use rusqlite::{params, ErrorCode, OptionalExtension};
use vault_shared::protocol::ChainTail;
use vault_shared::types::{ConversationId, KeyId, MessageId};

use crate::codec::{id_col, ts_col, ts_to_sql};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::ChainMessage;

const MESSAGE_COLUMNS: &str = "message_id, conversation_id, sequence, sender_id, ciphertext,
     content_hash, signature, prev_hash, client_timestamp, key_id, created_at";

impl Database {
    pub fn insert_message(&self, message: &ChainMessage) -> Result<()> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO messages ({MESSAGE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    message.message_id.to_string(),
                    message.conversation_id.to_string(),
                    seq_to_sql(message.sequence),
                    message.sender_id.to_string(),
                    message.ciphertext,
                    message.content_hash,
                    message.signature,
                    message.prev_hash,
                    ts_to_sql(&message.client_timestamp),
                    message.key_id.as_str(),
                    ts_to_sql(&message.created_at),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == ErrorCode::ConstraintViolation
                        && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    StoreError::Duplicate(format!(
                        "conversation {} already has sequence {}",
                        message.conversation_id, message.sequence
                    ))
                }
                other => StoreError::Sqlite(other),
            })?;
        Ok(())
    }

    pub fn get_message(&self, id: MessageId) -> Result<ChainMessage> {
        self.conn()
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?1"),
                params![id.to_string()],
                row_to_message,
            )
            .map_err(StoreError::from_query)
    }

    /// Owning conversation of a message.
    pub fn message_conversation(&self, id: MessageId) -> Result<ConversationId> {
        self.conn()
            .query_row(
                "SELECT conversation_id FROM messages WHERE message_id = ?1",
                params![id.to_string()],
                |row| id_col(row, 0),
            )
            .map_err(StoreError::from_query)
    }

    /// Messages with `sequence > after`, ascending, at most `limit`.
    pub fn list_messages(
        &self,
        conversation_id: ConversationId,
        after: u64,
        limit: u32,
    ) -> Result<Vec<ChainMessage>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE conversation_id = ?1 AND sequence > ?2
             ORDER BY sequence ASC
             LIMIT ?3"
        ))?;

        let rows = stmt.query_map(
            params![conversation_id.to_string(), seq_to_sql(after), limit],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Every message of a conversation, ascending by sequence.
    pub fn chain_messages(&self, conversation_id: ConversationId) -> Result<Vec<ChainMessage>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY sequence ASC"
        ))?;

        let rows = stmt.query_map(params![conversation_id.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Highest stored sequence and its content hash.
    pub fn chain_tail(&self, conversation_id: ConversationId) -> Result<ChainTail> {
        let tail = self
            .conn()
            .query_row(
                "SELECT sequence, content_hash
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY sequence DESC
                 LIMIT 1",
                params![conversation_id.to_string()],
                |row| {
                    let sequence: i64 = row.get(0)?;
                    let hash: Vec<u8> = row.get(1)?;
                    Ok(ChainTail {
                        last_sequence: sequence as u64,
                        last_hash: Some(hash),
                    })
                },
            )
            .optional()?;
        Ok(tail.unwrap_or_default())
    }
}

fn seq_to_sql(sequence: u64) -> i64 {
    i64::try_from(sequence).unwrap_or(i64::MAX)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChainMessage> {
    let sequence: i64 = row.get(2)?;
    Ok(ChainMessage {
        message_id: id_col(row, 0)?,
        conversation_id: id_col(row, 1)?,
        sequence: sequence as u64,
        sender_id: id_col(row, 3)?,
        ciphertext: row.get(4)?,
        content_hash: row.get(5)?,
        signature: row.get(6)?,
        prev_hash: row.get(7)?,
        client_timestamp: ts_col(row, 8)?,
        key_id: KeyId(row.get(9)?),
        created_at: ts_col(row, 10)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::conversations::tests::sample_conversation;
    use crate::users::tests::sample_user;
    use chrono::Utc;
    use vault_shared::types::UserId;

    pub(crate) fn chained(
        conversation_id: ConversationId,
        sender_id: UserId,
        sequence: u64,
        prev_hash: Option<Vec<u8>>,
    ) -> ChainMessage {
        ChainMessage {
            message_id: MessageId::new(),
            conversation_id,
            sender_id,
            ciphertext: format!("ct-{sequence}").into_bytes(),
            content_hash: format!("h-{sequence}").into_bytes(),
            signature: vec![0u8; 64],
            prev_hash,
            client_timestamp: Utc::now(),
            key_id: KeyId::primary(),
            sequence,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let conv = sample_conversation(&db);
        let user = sample_user(&db);

        let msg = chained(conv.conversation_id, user.user_id, 1, None);
        db.insert_message(&msg).unwrap();

        assert_eq!(db.get_message(msg.message_id).unwrap(), msg);
        assert_eq!(
            db.message_conversation(msg.message_id).unwrap(),
            conv.conversation_id
        );
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let db = Database::open_in_memory().unwrap();
        let conv = sample_conversation(&db);
        let user = sample_user(&db);

        db.insert_message(&chained(conv.conversation_id, user.user_id, 1, None))
            .unwrap();
        let err = db
            .insert_message(&chained(conv.conversation_id, user.user_id, 1, None))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn test_list_after_and_limit() {
        let db = Database::open_in_memory().unwrap();
        let conv = sample_conversation(&db);
        let user = sample_user(&db);

        let mut prev = None;
        for seq in 1..=5 {
            let msg = chained(conv.conversation_id, user.user_id, seq, prev.take());
            prev = Some(msg.content_hash.clone());
            db.insert_message(&msg).unwrap();
        }

        let page = db.list_messages(conv.conversation_id, 2, 2).unwrap();
        let seqs: Vec<u64> = page.iter().map(|m| m.sequence).collect();
        assert_eq!(seqs, vec![3, 4]);

        assert_eq!(db.chain_messages(conv.conversation_id).unwrap().len(), 5);
    }

    #[test]
    fn test_chain_tail() {
        let db = Database::open_in_memory().unwrap();
        let conv = sample_conversation(&db);
        let user = sample_user(&db);

        assert_eq!(db.chain_tail(conv.conversation_id).unwrap(), ChainTail::default());

        let m1 = chained(conv.conversation_id, user.user_id, 1, None);
        let m2 = chained(
            conv.conversation_id,
            user.user_id,
            2,
            Some(m1.content_hash.clone()),
        );
        db.insert_message(&m1).unwrap();
        db.insert_message(&m2).unwrap();

        let tail = db.chain_tail(conv.conversation_id).unwrap();
        assert_eq!(tail.last_sequence, 2);
        assert_eq!(tail.last_hash, Some(m2.content_hash));
    }
}
