use thiserror::Error;
use vault_shared::protocol::ChainTail;
use vault_store::StoreError;

/// Errors reported by ledger operations.
///
/// Every variant except `Storage` is a verdict on the request itself and is
/// returned to the caller as-is; nothing is retried or repaired server-side.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed or missing fields.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown user, conversation, message or attachment.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller is not allowed to act on this conversation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// `prev_hash` does not extend the current tail. Clients refetch the
    /// tail and resubmit.
    #[error("Chain mismatch: prev_hash does not extend tail at sequence {}", .tail.last_sequence)]
    ChainMismatch { tail: ChainTail },

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidInput(_) => "invalid_input",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Forbidden(_) => "forbidden",
            LedgerError::ChainMismatch { .. } => "chain_mismatch",
            LedgerError::SignatureInvalid => "signature_invalid",
            LedgerError::Storage(_) => "storage",
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
