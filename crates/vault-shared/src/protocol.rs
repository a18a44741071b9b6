use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::encoding::{base64_bytes, base64_opt};
use crate::signing;
use crate::types::{AttachmentId, ConversationId, KeyId, MessageId, UserId};

/// A registered identity as returned by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    /// Verification key material (Ed25519, 32 bytes for the default verifier)
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
    /// Declared digest of the public key, used for out-of-band comparison
    #[serde(with = "base64_bytes")]
    pub fingerprint: Vec<u8>,
    pub key_id: KeyId,
    pub created_at: DateTime<Utc>,
}

/// A message as submitted by its sender, before the server assigns
/// an id and a sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender_id: UserId,
    /// Opaque encrypted payload
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// Sender's commitment to the content; becomes the chain link
    #[serde(with = "base64_bytes")]
    pub content_hash: Vec<u8>,
    /// Signature over [`NewMessage::signing_payload`]
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    /// `content_hash` of the current chain tail, `None` for the first message
    #[serde(default, with = "base64_opt")]
    pub prev_hash: Option<Vec<u8>>,
    /// Advisory only, never used for ordering
    pub client_timestamp: DateTime<Utc>,
    pub key_id: KeyId,
}

impl NewMessage {
    pub fn signing_payload(&self, conversation_id: &ConversationId) -> Vec<u8> {
        signing::message_payload(&signing::MessageFields {
            conversation_id,
            sender_id: &self.sender_id,
            content_hash: &self.content_hash,
            prev_hash: self.prev_hash.as_deref(),
            client_timestamp: &self.client_timestamp,
            key_id: self.key_id.as_str(),
        })
    }
}

/// A message committed to a conversation chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainMessage {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub content_hash: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    #[serde(default, with = "base64_opt")]
    pub prev_hash: Option<Vec<u8>>,
    pub client_timestamp: DateTime<Utc>,
    pub key_id: KeyId,
    /// Server-assigned position in the chain, starting at 1
    pub sequence: u64,
    /// Server time of the append
    pub created_at: DateTime<Utc>,
}

impl ChainMessage {
    pub fn signing_payload(&self) -> Vec<u8> {
        signing::message_payload(&signing::MessageFields {
            conversation_id: &self.conversation_id,
            sender_id: &self.sender_id,
            content_hash: &self.content_hash,
            prev_hash: self.prev_hash.as_deref(),
            client_timestamp: &self.client_timestamp,
            key_id: self.key_id.as_str(),
        })
    }
}

/// Result of a successful append.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appended {
    pub message_id: MessageId,
    pub sequence: u64,
}

/// The current end of a conversation chain.
///
/// `last_sequence == 0` and `last_hash == None` describe an empty chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainTail {
    pub last_sequence: u64,
    #[serde(default, with = "base64_opt")]
    pub last_hash: Option<Vec<u8>>,
}

impl ChainTail {
    pub fn is_empty(&self) -> bool {
        self.last_hash.is_none()
    }

    /// Whether a submitted `prev_hash` extends this tail.
    pub fn accepts(&self, prev_hash: Option<&[u8]>) -> bool {
        self.last_hash.as_deref() == prev_hash
    }
}

/// Per-user acknowledgement state of one message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub user_id: UserId,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

/// An encrypted attachment as submitted by its uploader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttachment {
    pub uploader_id: UserId,
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub content_hash: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub meta_ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub meta_hash: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub meta_signature: Vec<u8>,
}

/// Attachment metadata, without the (potentially large) body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub attachment_id: AttachmentId,
    pub uploader_id: UserId,
    #[serde(with = "base64_bytes")]
    pub meta_ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub meta_hash: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub meta_signature: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub attachment_id: AttachmentId,
    pub message_id: MessageId,
    pub uploader_id: UserId,
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub content_hash: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub meta_ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub meta_hash: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub meta_signature: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub fn meta(&self) -> AttachmentMeta {
        AttachmentMeta {
            attachment_id: self.attachment_id,
            uploader_id: self.uploader_id,
            meta_ciphertext: self.meta_ciphertext.clone(),
            meta_hash: self.meta_hash.clone(),
            meta_signature: self.meta_signature.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_from_client_json() {
        let json = r#"{
            "sender_id": "00000000-0000-0000-0000-000000000001",
            "ciphertext": "Y2lwaGVydGV4dC1kZW1v",
            "content_hash": "Y29udGVudC1oYXNoLWRlbW8=",
            "signature": "c2lnbmF0dXJlLWRlbW8=",
            "prev_hash": null,
            "client_timestamp": "2026-02-05T10:00:00Z",
            "key_id": "primary"
        }"#;
        let msg: NewMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.ciphertext, b"ciphertext-demo");
        assert_eq!(msg.content_hash, b"content-hash-demo");
        assert!(msg.prev_hash.is_none());
        assert_eq!(msg.key_id, KeyId::primary());
    }

    #[test]
    fn test_tail_accepts() {
        let empty = ChainTail::default();
        assert!(empty.is_empty());
        assert!(empty.accepts(None));
        assert!(!empty.accepts(Some(b"h1")));

        let tail = ChainTail {
            last_sequence: 1,
            last_hash: Some(b"h1".to_vec()),
        };
        assert!(tail.accepts(Some(b"h1")));
        assert!(!tail.accepts(Some(b"h0")));
        assert!(!tail.accepts(None));
    }

    #[test]
    fn test_signing_payload_matches_after_commit() {
        let conversation_id = ConversationId::new();
        let new = NewMessage {
            sender_id: UserId::new(),
            ciphertext: b"ct".to_vec(),
            content_hash: b"ch".to_vec(),
            signature: vec![0; 64],
            prev_hash: Some(b"prev".to_vec()),
            client_timestamp: Utc::now(),
            key_id: KeyId::primary(),
        };
        let committed = ChainMessage {
            message_id: MessageId::new(),
            conversation_id,
            sender_id: new.sender_id,
            ciphertext: new.ciphertext.clone(),
            content_hash: new.content_hash.clone(),
            signature: new.signature.clone(),
            prev_hash: new.prev_hash.clone(),
            client_timestamp: new.client_timestamp,
            key_id: new.key_id.clone(),
            sequence: 2,
            created_at: Utc::now(),
        };
        assert_eq!(new.signing_payload(&conversation_id), committed.signing_payload());
    }
}
