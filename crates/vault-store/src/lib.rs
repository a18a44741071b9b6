//! # vault-store
//!
//! SQLite persistence for the ledger.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for users,
//! conversations, chained messages, receipts and attachments. It enforces
//! row-level constraints only (unique sequence per conversation, one
//! receipt per user and message); chain rules live in `vault-ledger`.

pub mod attachments;
pub mod conversations;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod receipts;
pub mod users;

mod codec;
mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
