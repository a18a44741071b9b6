//! Walking a chain of messages without trusting whoever served it.
//!
//! A page from `list` is checked against an anchor: the tail the caller
//! already trusts (the empty tail when starting from the beginning).

use crate::error::ChainViolation;
use crate::protocol::{ChainMessage, ChainTail};
use crate::signing::SignatureVerifier;
use crate::types::{KeyId, UserId};

/// Check contiguous sequences and `prev_hash` linkage starting from `anchor`.
///
/// Returns the tail after the last message.
pub fn verify_linkage(
    messages: &[ChainMessage],
    anchor: &ChainTail,
) -> Result<ChainTail, ChainViolation> {
    let mut tail = anchor.clone();
    for msg in messages {
        step(&mut tail, msg)?;
    }
    Ok(tail)
}

/// Like [`verify_linkage`], additionally checking every signature against
/// the key returned by `key_for` for the message's sender and `key_id`.
/// `None` means the sender has no such key.
pub fn verify_messages<F>(
    messages: &[ChainMessage],
    anchor: &ChainTail,
    mut key_for: F,
    verifier: &dyn SignatureVerifier,
) -> Result<ChainTail, ChainViolation>
where
    F: FnMut(&UserId, &KeyId) -> Option<Vec<u8>>,
{
    let mut tail = anchor.clone();
    for msg in messages {
        step(&mut tail, msg)?;

        let key = key_for(&msg.sender_id, &msg.key_id).ok_or_else(|| {
            ChainViolation::UnknownKey {
                sequence: msg.sequence,
                sender: msg.sender_id,
                key_id: msg.key_id.as_str().to_string(),
            }
        })?;
        if !verifier.verify(&key, &msg.signing_payload(), &msg.signature) {
            return Err(ChainViolation::BadSignature {
                sequence: msg.sequence,
            });
        }
    }
    Ok(tail)
}

fn step(tail: &mut ChainTail, msg: &ChainMessage) -> Result<(), ChainViolation> {
    let expected = tail.last_sequence + 1;
    if msg.sequence != expected {
        return Err(ChainViolation::SequenceGap {
            expected,
            found: msg.sequence,
        });
    }
    if !tail.accepts(msg.prev_hash.as_deref()) {
        return Err(ChainViolation::BrokenLink {
            sequence: msg.sequence,
        });
    }
    tail.last_sequence = msg.sequence;
    tail.last_hash = Some(msg.content_hash.clone());
    Ok(())
}
