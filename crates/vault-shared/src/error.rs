use thiserror::Error;

use crate::types::UserId;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid public key bytes")]
    InvalidKeyBytes,

    #[error("Invalid signature bytes")]
    InvalidSignatureBytes,

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// A break found while walking a sequence of chained messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainViolation {
    #[error("Sequence gap: expected {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },

    #[error("Broken link at sequence {sequence}: prev_hash does not match predecessor")]
    BrokenLink { sequence: u64 },

    #[error("No key {key_id} registered for sender {sender} at sequence {sequence}")]
    UnknownKey {
        sequence: u64,
        sender: UserId,
        key_id: String,
    },

    #[error("Invalid signature at sequence {sequence}")]
    BadSignature { sequence: u64 },

    #[error("Stored tail hash at sequence {sequence} disagrees with committed tail")]
    TailMismatch { sequence: u64 },
}

impl ChainViolation {
    /// Sequence number at which the chain stops being trustworthy.
    pub fn sequence(&self) -> u64 {
        match self {
            ChainViolation::SequenceGap { found, .. } => *found,
            ChainViolation::BrokenLink { sequence }
            | ChainViolation::UnknownKey { sequence, .. }
            | ChainViolation::BadSignature { sequence }
            | ChainViolation::TailMismatch { sequence } => *sequence,
        }
    }
}
