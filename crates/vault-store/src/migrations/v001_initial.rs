//! v001 -- Initial schema creation.
//!
//! Creates the identity, membership and ledger tables: `users`,
//! `conversations`, `conversation_participants` and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    public_key  BLOB NOT NULL,                -- opaque verification key
    fingerprint BLOB NOT NULL,                -- declared digest of public_key
    key_id      TEXT NOT NULL,
    created_at  TEXT NOT NULL                 -- RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_users_fingerprint ON users(fingerprint);

-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    conversation_id TEXT PRIMARY KEY NOT NULL, -- UUID v4
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversation_participants (
    conversation_id TEXT NOT NULL,            -- FK -> conversations
    user_id         TEXT NOT NULL,            -- FK -> users
    joined_at       TEXT NOT NULL,

    PRIMARY KEY (conversation_id, user_id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(conversation_id),
    FOREIGN KEY (user_id) REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_participants_user
    ON conversation_participants(user_id, joined_at);

-- ----------------------------------------------------------------
-- Messages (append-only chain, one per conversation)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    message_id       TEXT PRIMARY KEY NOT NULL, -- UUID v4
    conversation_id  TEXT NOT NULL,             -- FK -> conversations
    sequence         INTEGER NOT NULL,          -- 1-based position in chain
    sender_id        TEXT NOT NULL,             -- FK -> users
    ciphertext       BLOB NOT NULL,
    content_hash     BLOB NOT NULL,
    signature        BLOB NOT NULL,
    prev_hash        BLOB,                      -- NULL for the first message
    client_timestamp TEXT NOT NULL,
    key_id           TEXT NOT NULL,
    created_at       TEXT NOT NULL,

    UNIQUE (conversation_id, sequence),
    FOREIGN KEY (conversation_id) REFERENCES conversations(conversation_id),
    FOREIGN KEY (sender_id) REFERENCES users(user_id)
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
