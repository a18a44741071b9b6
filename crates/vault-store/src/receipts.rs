//! Delivery and read acknowledgements.
//!
//! One row per `(message_id, user_id)`. Both timestamps are first-wins:
//! acknowledging again keeps the stored value and returns it.

use chrono::{DateTime, Utc};
use rusqlite::params;
use vault_shared::types::{MessageId, UserId};

use crate::codec::{id_col, opt_ts_col, ts_col, ts_to_sql};
use crate::database::Database;
use crate::error::Result;
use crate::models::Receipt;

impl Database {
    /// Record delivery, returning the effective `delivered_at`.
    pub fn mark_delivered(
        &self,
        message_id: MessageId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let delivered_at = self.conn().query_row(
            "INSERT INTO message_receipts (message_id, user_id, delivered_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (message_id, user_id) DO UPDATE
                SET delivered_at = COALESCE(delivered_at, excluded.delivered_at)
             RETURNING delivered_at",
            params![message_id.to_string(), user_id.to_string(), ts_to_sql(&at)],
            |row| ts_col(row, 0),
        )?;
        Ok(delivered_at)
    }

    /// Record a read, returning the effective `read_at`. A read also
    /// counts as delivery when none was recorded.
    pub fn mark_read(
        &self,
        message_id: MessageId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let read_at = self.conn().query_row(
            "INSERT INTO message_receipts (message_id, user_id, delivered_at, read_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT (message_id, user_id) DO UPDATE
                SET read_at = COALESCE(read_at, excluded.read_at),
                    delivered_at = COALESCE(delivered_at, excluded.delivered_at)
             RETURNING read_at",
            params![message_id.to_string(), user_id.to_string(), ts_to_sql(&at)],
            |row| ts_col(row, 0),
        )?;
        Ok(read_at)
    }

    /// Users that have read `message_id`.
    pub fn list_readers(&self, message_id: MessageId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM message_receipts
             WHERE message_id = ?1 AND read_at IS NOT NULL
             ORDER BY user_id ASC",
        )?;

        let rows = stmt.query_map(params![message_id.to_string()], |row| id_col(row, 0))?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    pub fn list_receipts(&self, message_id: MessageId) -> Result<Vec<Receipt>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, delivered_at, read_at FROM message_receipts
             WHERE message_id = ?1
             ORDER BY user_id ASC",
        )?;

        let rows = stmt.query_map(params![message_id.to_string()], |row| {
            Ok(Receipt {
                user_id: id_col(row, 0)?,
                delivered_at: opt_ts_col(row, 1)?,
                read_at: opt_ts_col(row, 2)?,
            })
        })?;

        let mut receipts = Vec::new();
        for row in rows {
            receipts.push(row?);
        }
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::tests::sample_conversation;
    use crate::messages::tests::chained;
    use crate::users::tests::sample_user;
    use chrono::Duration;

    fn setup() -> (Database, MessageId, UserId) {
        let db = Database::open_in_memory().unwrap();
        let conv = sample_conversation(&db);
        let user = sample_user(&db);
        let msg = chained(conv.conversation_id, user.user_id, 1, None);
        db.insert_message(&msg).unwrap();
        (db, msg.message_id, user.user_id)
    }

    #[test]
    fn test_read_is_first_wins() {
        let (db, message_id, user_id) = setup();
        let t1 = Utc::now();
        let t2 = t1 + Duration::seconds(5);

        assert_eq!(db.mark_read(message_id, user_id, t1).unwrap(), t1);
        assert_eq!(db.mark_read(message_id, user_id, t2).unwrap(), t1);

        let receipts = db.list_receipts(message_id).unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].read_at, Some(t1));
    }

    #[test]
    fn test_read_implies_delivered() {
        let (db, message_id, user_id) = setup();
        let t1 = Utc::now();
        db.mark_read(message_id, user_id, t1).unwrap();

        let receipts = db.list_receipts(message_id).unwrap();
        assert_eq!(receipts[0].delivered_at, Some(t1));
    }

    #[test]
    fn test_delivered_then_read_keeps_delivery_time() {
        let (db, message_id, user_id) = setup();
        let t1 = Utc::now();
        let t2 = t1 + Duration::seconds(3);

        db.mark_delivered(message_id, user_id, t1).unwrap();
        assert!(db.list_readers(message_id).unwrap().is_empty());

        db.mark_read(message_id, user_id, t2).unwrap();
        let receipts = db.list_receipts(message_id).unwrap();
        assert_eq!(receipts[0].delivered_at, Some(t1));
        assert_eq!(receipts[0].read_at, Some(t2));
        assert_eq!(db.list_readers(message_id).unwrap(), vec![user_id]);
    }
}
