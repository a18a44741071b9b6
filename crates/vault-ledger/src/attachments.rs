//! Encrypted attachments bound to a chained message.
//!
//! Body and metadata are signed separately by the uploader, so a client can
//! check the metadata listing without fetching the body.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use vault_shared::protocol::{Attachment, AttachmentMeta, NewAttachment};
use vault_shared::signing::{attachment_meta_payload, attachment_payload, SignatureVerifier};
use vault_shared::types::{AttachmentId, MessageId, UserId};
use vault_store::StoreError;

use crate::access::{require_message_member, require_non_empty, require_participant, require_user};
use crate::error::{LedgerError, Result};
use crate::SharedDb;

#[derive(Clone)]
pub struct AttachmentRegistry {
    db: SharedDb,
    verifier: Arc<dyn SignatureVerifier>,
}

impl AttachmentRegistry {
    pub(crate) fn new(db: SharedDb, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { db, verifier }
    }

    pub async fn add_attachment(
        &self,
        message_id: MessageId,
        upload: NewAttachment,
    ) -> Result<AttachmentMeta> {
        require_non_empty("ciphertext", &upload.ciphertext)?;
        require_non_empty("content_hash", &upload.content_hash)?;
        require_non_empty("signature", &upload.signature)?;
        require_non_empty("meta_ciphertext", &upload.meta_ciphertext)?;
        require_non_empty("meta_hash", &upload.meta_hash)?;
        require_non_empty("meta_signature", &upload.meta_signature)?;

        let db = self.db.lock().await;
        require_message_member(&db, message_id, upload.uploader_id)?;
        let uploader = require_user(&db, upload.uploader_id)?;

        let body_ok = self.verifier.verify(
            &uploader.public_key,
            &attachment_payload(&message_id, &upload.uploader_id, &upload.content_hash),
            &upload.signature,
        );
        let meta_ok = self.verifier.verify(
            &uploader.public_key,
            &attachment_meta_payload(&message_id, &upload.uploader_id, &upload.meta_hash),
            &upload.meta_signature,
        );
        if !(body_ok && meta_ok) {
            warn!(message = %message_id, uploader = %upload.uploader_id, "Rejected attachment: invalid signature");
            return Err(LedgerError::SignatureInvalid);
        }

        let attachment = Attachment {
            attachment_id: AttachmentId::new(),
            message_id,
            uploader_id: upload.uploader_id,
            ciphertext: upload.ciphertext,
            content_hash: upload.content_hash,
            signature: upload.signature,
            meta_ciphertext: upload.meta_ciphertext,
            meta_hash: upload.meta_hash,
            meta_signature: upload.meta_signature,
            created_at: Utc::now(),
        };
        db.insert_attachment(&attachment)?;

        info!(
            attachment = %attachment.attachment_id,
            message = %message_id,
            size = attachment.ciphertext.len(),
            "Attachment stored"
        );
        Ok(attachment.meta())
    }

    /// Metadata of every attachment on `message_id`, oldest first.
    pub async fn list_attachments(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Result<Vec<AttachmentMeta>> {
        let db = self.db.lock().await;
        require_message_member(&db, message_id, user_id)?;
        Ok(db.list_attachment_meta(message_id)?)
    }

    pub async fn get_attachment(
        &self,
        attachment_id: AttachmentId,
        user_id: UserId,
    ) -> Result<Attachment> {
        let db = self.db.lock().await;
        let attachment = db.get_attachment(attachment_id).map_err(|e| match e {
            StoreError::NotFound => LedgerError::not_found("attachment", attachment_id),
            other => other.into(),
        })?;
        require_user(&db, user_id)?;
        let conversation_id = db.message_conversation(attachment.message_id)?;
        require_participant(&db, conversation_id, user_id)?;
        Ok(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ledger, register, Member};
    use crate::Ledger;
    use vault_shared::identity::Identity;

    struct Setup {
        ledger: Ledger,
        uploader: Member,
        outsider: Member,
        message_id: MessageId,
    }

    async fn setup() -> Setup {
        let ledger = ledger();
        let uploader_identity = Identity::generate();
        let (uploader_id, _) = register(&ledger, &uploader_identity).await;
        let outsider_identity = Identity::generate();
        let (outsider_id, _) = register(&ledger, &outsider_identity).await;

        let conv = ledger.conversations().create().await.unwrap();
        ledger
            .conversations()
            .add_participant(conv, uploader_id)
            .await
            .unwrap();

        let uploader = Member {
            user_id: uploader_id,
            identity: uploader_identity,
        };
        let appended = ledger
            .chain()
            .append(conv, uploader.seal(conv, b"see attached", None))
            .await
            .unwrap();

        Setup {
            ledger,
            uploader,
            outsider: Member {
                user_id: outsider_id,
                identity: outsider_identity,
            },
            message_id: appended.message_id,
        }
    }

    fn upload(member: &Member, message_id: MessageId) -> NewAttachment {
        member.identity.seal_attachment(
            &message_id,
            member.user_id,
            b"encrypted body".to_vec(),
            b"encrypted meta".to_vec(),
        )
    }

    #[tokio::test]
    async fn test_add_list_get() {
        let s = setup().await;
        let registry = s.ledger.attachments();

        let meta = registry
            .add_attachment(s.message_id, upload(&s.uploader, s.message_id))
            .await
            .unwrap();

        let listed = registry
            .list_attachments(s.message_id, s.uploader.user_id)
            .await
            .unwrap();
        assert_eq!(listed, vec![meta.clone()]);

        let full = registry
            .get_attachment(meta.attachment_id, s.uploader.user_id)
            .await
            .unwrap();
        assert_eq!(full.ciphertext, b"encrypted body");
        assert_eq!(full.meta(), meta);
    }

    #[tokio::test]
    async fn test_signatures_checked() {
        let s = setup().await;
        let registry = s.ledger.attachments();

        let mut forged = upload(&s.uploader, s.message_id);
        forged.meta_signature = s.outsider.identity.sign(b"whatever");
        assert!(matches!(
            registry.add_attachment(s.message_id, forged).await,
            Err(LedgerError::SignatureInvalid)
        ));

        // Signed for a different message
        let moved = upload(&s.uploader, MessageId::new());
        assert!(matches!(
            registry.add_attachment(s.message_id, moved).await,
            Err(LedgerError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn test_participants_only() {
        let s = setup().await;
        let registry = s.ledger.attachments();

        assert!(matches!(
            registry
                .add_attachment(s.message_id, upload(&s.outsider, s.message_id))
                .await,
            Err(LedgerError::Forbidden(_))
        ));

        let meta = registry
            .add_attachment(s.message_id, upload(&s.uploader, s.message_id))
            .await
            .unwrap();
        assert!(matches!(
            registry
                .get_attachment(meta.attachment_id, s.outsider.user_id)
                .await,
            Err(LedgerError::Forbidden(_))
        ));
        assert!(matches!(
            registry
                .list_attachments(s.message_id, s.outsider.user_id)
                .await,
            Err(LedgerError::Forbidden(_))
        ));
        assert!(matches!(
            registry
                .get_attachment(AttachmentId::new(), s.uploader.user_id)
                .await,
            Err(LedgerError::NotFound { entity: "attachment", .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let s = setup().await;
        let mut empty = upload(&s.uploader, s.message_id);
        empty.ciphertext.clear();
        assert!(matches!(
            s.ledger.attachments().add_attachment(s.message_id, empty).await,
            Err(LedgerError::InvalidInput(_))
        ));
    }
}
