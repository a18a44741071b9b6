//! # vault-shared
//!
//! Types and rules shared by the ledger server and its clients: identifiers,
//! wire structures, the canonical signing payloads, the signature verifier
//! seam, and client-side chain verification.

pub mod chain;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod signing;
pub mod types;
