use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS message_receipts (
    message_id   TEXT NOT NULL,               -- FK -> messages
    user_id      TEXT NOT NULL,               -- FK -> users
    delivered_at TEXT,                        -- first acknowledgement wins
    read_at      TEXT,                        -- first acknowledgement wins

    PRIMARY KEY (message_id, user_id),
    FOREIGN KEY (message_id) REFERENCES messages(message_id),
    FOREIGN KEY (user_id) REFERENCES users(user_id)
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
