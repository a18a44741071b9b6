//! CRUD operations for encrypted [`Attachment`] records.

use rusqlite::params;
use vault_shared::types::{AttachmentId, MessageId};

use crate::codec::{id_col, ts_col, ts_to_sql};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Attachment, AttachmentMeta};

impl Database {
    pub fn insert_attachment(&self, attachment: &Attachment) -> Result<()> {
        self.conn().execute(
            "INSERT INTO attachments (attachment_id, message_id, uploader_id, ciphertext,
                content_hash, signature, meta_ciphertext, meta_hash, meta_signature, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                attachment.attachment_id.to_string(),
                attachment.message_id.to_string(),
                attachment.uploader_id.to_string(),
                attachment.ciphertext,
                attachment.content_hash,
                attachment.signature,
                attachment.meta_ciphertext,
                attachment.meta_hash,
                attachment.meta_signature,
                ts_to_sql(&attachment.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_attachment(&self, id: AttachmentId) -> Result<Attachment> {
        self.conn()
            .query_row(
                "SELECT attachment_id, message_id, uploader_id, ciphertext, content_hash,
                        signature, meta_ciphertext, meta_hash, meta_signature, created_at
                 FROM attachments WHERE attachment_id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(Attachment {
                        attachment_id: id_col(row, 0)?,
                        message_id: id_col(row, 1)?,
                        uploader_id: id_col(row, 2)?,
                        ciphertext: row.get(3)?,
                        content_hash: row.get(4)?,
                        signature: row.get(5)?,
                        meta_ciphertext: row.get(6)?,
                        meta_hash: row.get(7)?,
                        meta_signature: row.get(8)?,
                        created_at: ts_col(row, 9)?,
                    })
                },
            )
            .map_err(StoreError::from_query)
    }

    /// Attachment metadata for a message, oldest first. Bodies are not loaded.
    pub fn list_attachment_meta(&self, message_id: MessageId) -> Result<Vec<AttachmentMeta>> {
        let mut stmt = self.conn().prepare(
            "SELECT attachment_id, uploader_id, meta_ciphertext, meta_hash, meta_signature,
                    created_at
             FROM attachments
             WHERE message_id = ?1
             ORDER BY created_at ASC, attachment_id ASC",
        )?;

        let rows = stmt.query_map(params![message_id.to_string()], |row| {
            Ok(AttachmentMeta {
                attachment_id: id_col(row, 0)?,
                uploader_id: id_col(row, 1)?,
                meta_ciphertext: row.get(2)?,
                meta_hash: row.get(3)?,
                meta_signature: row.get(4)?,
                created_at: ts_col(row, 5)?,
            })
        })?;

        let mut metas = Vec::new();
        for row in rows {
            metas.push(row?);
        }
        Ok(metas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::tests::sample_conversation;
    use crate::messages::tests::chained;
    use crate::users::tests::sample_user;
    use chrono::Utc;

    #[test]
    fn test_insert_get_and_list() {
        let db = Database::open_in_memory().unwrap();
        let conv = sample_conversation(&db);
        let user = sample_user(&db);
        let msg = chained(conv.conversation_id, user.user_id, 1, None);
        db.insert_message(&msg).unwrap();

        let attachment = Attachment {
            attachment_id: AttachmentId::new(),
            message_id: msg.message_id,
            uploader_id: user.user_id,
            ciphertext: b"body".to_vec(),
            content_hash: b"bh".to_vec(),
            signature: vec![1; 64],
            meta_ciphertext: b"meta".to_vec(),
            meta_hash: b"mh".to_vec(),
            meta_signature: vec![2; 64],
            created_at: Utc::now(),
        };
        db.insert_attachment(&attachment).unwrap();

        assert_eq!(db.get_attachment(attachment.attachment_id).unwrap(), attachment);
        assert_eq!(
            db.list_attachment_meta(msg.message_id).unwrap(),
            vec![attachment.meta()]
        );
        assert!(matches!(
            db.get_attachment(AttachmentId::new()),
            Err(StoreError::NotFound)
        ));
    }
}
