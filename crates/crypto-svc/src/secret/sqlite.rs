//! [`SqliteSecretProvider`]: reads the latest row of the admin credential table.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use super::{AdminSecret, SecretError, SecretProvider};

/// Credential provider backed by a SQLite database.
///
/// A fresh read-only connection is opened for every lookup, on the blocking
/// pool, so no connection or credential outlives a call.
#[derive(Debug, Clone)]
pub struct SqliteSecretProvider {
    path: PathBuf,
    query: String,
}

/// Returns `true` if `name` can be interpolated into SQL as a table name.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl SqliteSecretProvider {
    /// Create a provider reading `password` from `table`.
    ///
    /// `table` must already satisfy [`is_sql_identifier`]; configuration
    /// validation enforces this.
    pub fn new(path: impl Into<PathBuf>, table: &str) -> Self {
        Self {
            path: path.into(),
            // Newest `created_at` wins; on a tie the later insert wins.
            query: format!(
                "SELECT password FROM {table} ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ),
        }
    }
}

fn read_latest(path: &Path, query: &str) -> Result<AdminSecret, SecretError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| SecretError::Backend(format!("failed to open credential database: {e}")))?;

    let password: Option<String> = conn
        .query_row(query, [], |row| row.get(0))
        .optional()
        .map_err(|e| SecretError::Backend(format!("credential query failed: {e}")))?;

    password.map(AdminSecret::new).ok_or(SecretError::NotFound)
}

#[async_trait]
impl SecretProvider for SqliteSecretProvider {
    async fn current_secret(&self) -> Result<AdminSecret, SecretError> {
        let path = self.path.clone();
        let query = self.query.clone();
        tokio::task::spawn_blocking(move || read_latest(&path, &query))
            .await
            .map_err(|e| SecretError::Backend(format!("credential lookup task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed(rows: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE admins (password TEXT NOT NULL, created_at TEXT NOT NULL);",
        )
        .unwrap();
        for (password, created_at) in rows {
            conn.execute(
                "INSERT INTO admins (password, created_at) VALUES (?1, ?2)",
                [password, created_at],
            )
            .unwrap();
        }
        (dir, path)
    }

    #[tokio::test]
    async fn returns_most_recent_credential() {
        let (_dir, path) = seed(&[
            ("old-hash", "2024-01-01 00:00:00"),
            ("new-hash", "2024-06-01 00:00:00"),
            ("mid-hash", "2024-03-01 00:00:00"),
        ]);
        let provider = SqliteSecretProvider::new(&path, "admins");
        assert_eq!(provider.current_secret().await.unwrap().expose(), "new-hash");
    }

    #[tokio::test]
    async fn timestamp_tie_prefers_later_insert() {
        let (_dir, path) = seed(&[
            ("first", "2024-06-01 00:00:00"),
            ("second", "2024-06-01 00:00:00"),
        ]);
        let provider = SqliteSecretProvider::new(&path, "admins");
        assert_eq!(provider.current_secret().await.unwrap().expose(), "second");
    }

    #[tokio::test]
    async fn empty_table_is_not_found() {
        let (_dir, path) = seed(&[]);
        let provider = SqliteSecretProvider::new(&path, "admins");
        assert!(matches!(
            provider.current_secret().await,
            Err(SecretError::NotFound)
        ));
    }

    #[tokio::test]
    async fn missing_database_is_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SqliteSecretProvider::new(dir.path().join("absent.db"), "admins");
        assert!(matches!(
            provider.current_secret().await,
            Err(SecretError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn missing_table_is_backend_error() {
        let (_dir, path) = seed(&[]);
        let provider = SqliteSecretProvider::new(&path, "operators");
        assert!(matches!(
            provider.current_secret().await,
            Err(SecretError::Backend(_))
        ));
    }

    #[test]
    fn sql_identifier_check() {
        assert!(is_sql_identifier("admins"));
        assert!(is_sql_identifier("_admins_v2"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("2admins"));
        assert!(!is_sql_identifier("admins; DROP TABLE admins"));
    }
}
