//! CRUD operations for [`User`] records.

use rusqlite::{params, OptionalExtension};
use vault_shared::types::{KeyId, UserId};

use crate::codec::{id_col, ts_col, ts_to_sql};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

const USER_COLUMNS: &str = "user_id, public_key, fingerprint, key_id, created_at";

impl Database {
    /// Insert a freshly registered user. Users are never updated.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (user_id, public_key, fingerprint, key_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.user_id.to_string(),
                user.public_key,
                user.fingerprint,
                user.key_id.as_str(),
                ts_to_sql(&user.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, user_id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
                params![user_id.to_string()],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    pub fn user_exists(&self, user_id: UserId) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE user_id = ?1",
                params![user_id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Earliest user that declared `fingerprint`.
    pub fn find_user_by_fingerprint(&self, fingerprint: &[u8]) -> Result<User> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE fingerprint = ?1
                     ORDER BY created_at ASC
                     LIMIT 1"
                ),
                params![fingerprint],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: id_col(row, 0)?,
        public_key: row.get(1)?,
        fingerprint: row.get(2)?,
        key_id: KeyId(row.get(3)?),
        created_at: ts_col(row, 4)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn sample_user(db: &Database) -> User {
        let user = User {
            user_id: UserId::new(),
            public_key: vec![7u8; 32],
            fingerprint: b"fp".to_vec(),
            key_id: KeyId::primary(),
            created_at: Utc::now(),
        };
        db.insert_user(&user).unwrap();
        user
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user(&db);

        let loaded = db.get_user(user.user_id).unwrap();
        assert_eq!(loaded, user);
        assert!(db.user_exists(user.user_id).unwrap());
    }

    #[test]
    fn test_missing_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_user(UserId::new()), Err(StoreError::NotFound)));
        assert!(!db.user_exists(UserId::new()).unwrap());
    }

    #[test]
    fn test_find_by_fingerprint() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user(&db);

        assert_eq!(db.find_user_by_fingerprint(b"fp").unwrap().user_id, user.user_id);
        assert!(matches!(
            db.find_user_by_fingerprint(b"other"),
            Err(StoreError::NotFound)
        ));
    }
}
