use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS attachments (
    attachment_id   TEXT PRIMARY KEY NOT NULL, -- UUID v4
    message_id      TEXT NOT NULL,             -- FK -> messages
    uploader_id     TEXT NOT NULL,             -- FK -> users
    ciphertext      BLOB NOT NULL,
    content_hash    BLOB NOT NULL,
    signature       BLOB NOT NULL,
    meta_ciphertext BLOB NOT NULL,
    meta_hash       BLOB NOT NULL,
    meta_signature  BLOB NOT NULL,
    created_at      TEXT NOT NULL,

    FOREIGN KEY (message_id) REFERENCES messages(message_id),
    FOREIGN KEY (uploader_id) REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_attachments_message
    ON attachments(message_id, created_at);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
