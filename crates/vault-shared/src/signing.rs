//! Canonical signing payloads and signature verification.
//!
//! Every signature in the ledger covers a byte string built here, never a
//! serialized JSON body, so that clients in any language can reproduce it:
//!
//! ```text
//! tag 0x00
//! conversation_id (16) || sender_id (16)
//! u32be len || content_hash
//! 0x00                               -- first message
//! 0x01 || u32be len || prev_hash     -- otherwise
//! u32be len || client_timestamp      -- RFC 3339, microseconds, 'Z'
//! u32be len || key_id
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::constants::{
    KDF_CONTEXT_CONTENT_HASH, KDF_CONTEXT_FINGERPRINT, PUBKEY_SIZE, SIGNATURE_SIZE,
    SIGNING_TAG_ATTACHMENT, SIGNING_TAG_ATTACHMENT_META, SIGNING_TAG_MESSAGE,
};
use crate::error::CryptoError;
use crate::types::{ConversationId, MessageId, UserId};

/// Checks a signature against a public key.
///
/// The ledger only consumes this capability; which algorithm backs it is
/// decided by whoever constructs the ledger.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// Default verifier: Ed25519 with 32-byte keys and 64-byte signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        verify_ed25519(public_key, message, signature).is_ok()
    }
}

pub fn verify_ed25519(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let key: &[u8; PUBKEY_SIZE] = public_key
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyBytes)?;
    let verifying_key = VerifyingKey::from_bytes(key).map_err(|_| CryptoError::InvalidKeyBytes)?;

    let sig: &[u8; SIGNATURE_SIZE] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureBytes)?;
    let signature = Signature::from_bytes(sig);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Fields of a message covered by the sender's signature.
pub struct MessageFields<'a> {
    pub conversation_id: &'a ConversationId,
    pub sender_id: &'a UserId,
    pub content_hash: &'a [u8],
    pub prev_hash: Option<&'a [u8]>,
    pub client_timestamp: &'a DateTime<Utc>,
    pub key_id: &'a str,
}

pub fn message_payload(fields: &MessageFields<'_>) -> Vec<u8> {
    let timestamp = fields
        .client_timestamp
        .to_rfc3339_opts(SecondsFormat::Micros, true);

    let mut out = Vec::with_capacity(128 + fields.content_hash.len());
    push_tag(&mut out, SIGNING_TAG_MESSAGE);
    out.extend_from_slice(fields.conversation_id.as_bytes());
    out.extend_from_slice(fields.sender_id.as_bytes());
    push_field(&mut out, fields.content_hash);
    match fields.prev_hash {
        None => out.push(0x00),
        Some(prev) => {
            out.push(0x01);
            push_field(&mut out, prev);
        }
    }
    push_field(&mut out, timestamp.as_bytes());
    push_field(&mut out, fields.key_id.as_bytes());
    out
}

/// Payload signed for an attachment body.
pub fn attachment_payload(message_id: &MessageId, uploader_id: &UserId, hash: &[u8]) -> Vec<u8> {
    attachment_payload_tagged(SIGNING_TAG_ATTACHMENT, message_id, uploader_id, hash)
}

/// Payload signed for attachment metadata.
pub fn attachment_meta_payload(
    message_id: &MessageId,
    uploader_id: &UserId,
    meta_hash: &[u8],
) -> Vec<u8> {
    attachment_payload_tagged(SIGNING_TAG_ATTACHMENT_META, message_id, uploader_id, meta_hash)
}

fn attachment_payload_tagged(
    tag: &str,
    message_id: &MessageId,
    uploader_id: &UserId,
    hash: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + hash.len());
    push_tag(&mut out, tag);
    out.extend_from_slice(message_id.as_bytes());
    out.extend_from_slice(uploader_id.as_bytes());
    push_field(&mut out, hash);
    out
}

fn push_tag(out: &mut Vec<u8>, tag: &str) {
    out.extend_from_slice(tag.as_bytes());
    out.push(0x00);
}

fn push_field(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// BLAKE3 digest used by the reference client as its content commitment.
/// The server never recomputes it; the hash is the sender's declaration.
pub fn content_hash_of(ciphertext: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_CONTENT_HASH);
    hasher.update(ciphertext);
    *hasher.finalize().as_bytes()
}

/// BLAKE3 fingerprint of a public key.
pub fn fingerprint_of(public_key: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_FINGERPRINT);
    hasher.update(public_key);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn fields<'a>(
        conversation_id: &'a ConversationId,
        sender_id: &'a UserId,
        prev_hash: Option<&'a [u8]>,
        ts: &'a DateTime<Utc>,
    ) -> MessageFields<'a> {
        MessageFields {
            conversation_id,
            sender_id,
            content_hash: b"content",
            prev_hash,
            client_timestamp: ts,
            key_id: "primary",
        }
    }

    #[test]
    fn test_payload_distinguishes_first_message() {
        let c = ConversationId::new();
        let s = UserId::new();
        let ts = Utc::now();
        let first = message_payload(&fields(&c, &s, None, &ts));
        let empty_prev = message_payload(&fields(&c, &s, Some(b""), &ts));
        assert_ne!(first, empty_prev);
    }

    #[test]
    fn test_payload_binds_conversation() {
        let s = UserId::new();
        let ts = Utc::now();
        let c1 = ConversationId::new();
        let c2 = ConversationId::new();
        assert_ne!(
            message_payload(&fields(&c1, &s, None, &ts)),
            message_payload(&fields(&c2, &s, None, &ts))
        );
    }

    #[test]
    fn test_ed25519_verifier() {
        let id = Identity::generate();
        let msg = b"payload";
        let sig = id.sign(msg);

        let verifier = Ed25519Verifier;
        assert!(verifier.verify(&id.public_key_bytes(), msg, &sig));
        assert!(!verifier.verify(&id.public_key_bytes(), b"other", &sig));
        assert!(!verifier.verify(b"short", msg, &sig));
        assert!(!verifier.verify(&id.public_key_bytes(), msg, &sig[..10]));
    }

    #[test]
    fn test_attachment_body_and_meta_payloads_differ() {
        let m = MessageId::new();
        let u = UserId::new();
        assert_ne!(attachment_payload(&m, &u, b"h"), attachment_meta_payload(&m, &u, b"h"));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let id = Identity::generate();
        assert_eq!(
            fingerprint_of(&id.public_key_bytes()),
            fingerprint_of(&id.public_key_bytes())
        );
        assert_ne!(fingerprint_of(b"a"), content_hash_of(b"a"));
    }
}
