//! Read Receipt Tracker.
//!
//! Receipts are first-wins: the earliest recorded timestamp is kept and
//! every later acknowledgement returns it unchanged.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;
use vault_shared::protocol::Receipt;
use vault_shared::types::{MessageId, UserId};

use crate::access::{require_message, require_message_member};
use crate::error::Result;
use crate::SharedDb;

#[derive(Clone)]
pub struct ReceiptTracker {
    db: SharedDb,
}

impl ReceiptTracker {
    pub(crate) fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// Record that `user_id` read `message_id`. Returns the effective
    /// `read_at`, which is the first one ever recorded.
    pub async fn mark_read(&self, message_id: MessageId, user_id: UserId) -> Result<DateTime<Utc>> {
        let db = self.db.lock().await;
        require_message_member(&db, message_id, user_id)?;

        let read_at = db.mark_read(message_id, user_id, Utc::now())?;
        debug!(message = %message_id, user = %user_id, %read_at, "Marked read");
        Ok(read_at)
    }

    pub async fn mark_delivered(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Result<DateTime<Utc>> {
        let db = self.db.lock().await;
        require_message_member(&db, message_id, user_id)?;

        let delivered_at = db.mark_delivered(message_id, user_id, Utc::now())?;
        debug!(message = %message_id, user = %user_id, %delivered_at, "Marked delivered");
        Ok(delivered_at)
    }

    /// Users that have read `message_id`.
    pub async fn read_state(&self, message_id: MessageId) -> Result<BTreeSet<UserId>> {
        let db = self.db.lock().await;
        require_message(&db, message_id)?;
        Ok(db.list_readers(message_id)?.into_iter().collect())
    }

    /// Per-user delivery and read state, ordered by user id.
    pub async fn status(&self, message_id: MessageId) -> Result<Vec<Receipt>> {
        let db = self.db.lock().await;
        require_message(&db, message_id)?;
        Ok(db.list_receipts(message_id)?)
    }
}
