use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

use crate::protocol::{NewAttachment, NewMessage};
use crate::signing::{
    attachment_meta_payload, attachment_payload, content_hash_of, fingerprint_of,
};
use crate::types::{ConversationId, KeyId, MessageId, UserId};

/// Client-side signing identity based on Ed25519.
///
/// The server never holds one of these; it exists so clients (and tests)
/// can produce messages the ledger will accept.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a new random identity
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Restore identity from secret key bytes
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        Self { signing_key }
    }

    /// Get the raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Fingerprint declared at registration
    pub fn fingerprint(&self) -> [u8; 32] {
        fingerprint_of(&self.public_key_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// Build a signed message that extends a chain whose tail hash is
    /// `prev_hash`. The content hash is the BLAKE3 commitment of the
    /// ciphertext.
    pub fn seal_message(
        &self,
        conversation_id: &ConversationId,
        sender_id: UserId,
        ciphertext: Vec<u8>,
        prev_hash: Option<Vec<u8>>,
    ) -> NewMessage {
        let mut message = NewMessage {
            sender_id,
            content_hash: content_hash_of(&ciphertext).to_vec(),
            ciphertext,
            signature: Vec::new(),
            prev_hash,
            client_timestamp: Utc::now(),
            key_id: KeyId::primary(),
        };
        message.signature = self.sign(&message.signing_payload(conversation_id));
        message
    }

    /// Build a signed attachment for `message_id`.
    pub fn seal_attachment(
        &self,
        message_id: &MessageId,
        uploader_id: UserId,
        ciphertext: Vec<u8>,
        meta_ciphertext: Vec<u8>,
    ) -> NewAttachment {
        let content_hash = content_hash_of(&ciphertext).to_vec();
        let meta_hash = content_hash_of(&meta_ciphertext).to_vec();
        NewAttachment {
            uploader_id,
            signature: self.sign(&attachment_payload(message_id, &uploader_id, &content_hash)),
            meta_signature: self.sign(&attachment_meta_payload(
                message_id,
                &uploader_id,
                &meta_hash,
            )),
            ciphertext,
            content_hash,
            meta_ciphertext,
            meta_hash,
        }
    }
}
