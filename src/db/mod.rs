//! SQLite database shared by the persona, conversation, and event stores
//!
//! Uses rusqlite with r2d2 connection pooling. Every pooled connection has
//! foreign keys enforced.

pub mod schema;

use crate::config::StorageLocation;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

/// Free-form JSON document column (config, metadata, details)
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Storage timestamp format (UTC)
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Pooled SQLite database
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.pool.state().connections)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open the database at `location` and apply the schema
    pub fn open(location: &StorageLocation) -> Result<Self> {
        match location {
            StorageLocation::Memory => Self::open_in_memory(),
            StorageLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                tracing::info!(path = %path.display(), "Opening database");
                Self::with_manager(SqliteConnectionManager::file(path), 8)
            }
        }
    }

    /// In-memory database. Limited to one connection since every SQLite
    /// memory connection is its own database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_manager(SqliteConnectionManager::memory(), 1)
    }

    fn with_manager(manager: SqliteConnectionManager, max_size: u32) -> Result<Self> {
        let manager = manager.with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder().max_size(max_size).build(manager)?;

        let db = Self { pool };
        schema::apply(&*db.conn()?)?;
        Ok(db)
    }

    /// Borrow a pooled connection
    pub fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Cheap liveness check
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Names of the user tables present in the database
    pub fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

// =============================================================================
// Column helpers
// =============================================================================

/// Serialize an optional document for a TEXT column
pub(crate) fn encode_document(doc: Option<&Document>) -> Result<Option<String>> {
    doc.map(serde_json::to_string).transpose().map_err(Error::from)
}

/// Decode a document column. Non-object JSON is rejected.
pub(crate) fn decode_document(raw: Option<String>) -> Result<Option<Document>> {
    match raw {
        None => Ok(None),
        Some(text) => match serde_json::from_str::<serde_json::Value>(&text)? {
            serde_json::Value::Object(map) => Ok(Some(map)),
            serde_json::Value::Null => Ok(None),
            other => Err(Error::Storage(format!(
                "expected JSON object in document column, found {}",
                other
            ))),
        },
    }
}

/// Parse a storage timestamp as UTC
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Storage(format!("invalid timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use tempfile::TempDir;

    #[test]
    fn test_open_in_memory_applies_schema() {
        let db = Database::open_in_memory().unwrap();
        let tables = db.table_names().unwrap();
        for table in schema::TABLES {
            assert!(tables.iter().any(|t| t == table), "missing {}", table);
        }
    }

    #[test]
    fn test_open_file_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("dispatch.db");
        let db = Database::open(&StorageLocation::File(path.clone())).unwrap();
        db.ping().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_memory_url_forms_share_one_database() {
        for url in [
            "sqlite://",
            "sqlite://:memory:",
            "sqlite:///:memory:",
            "sqlite::memory:?cache=private",
        ] {
            let db = Database::open(&StorageLocation::parse(url).unwrap()).unwrap();
            db.conn()
                .unwrap()
                .execute(
                    "INSERT INTO personas (name) VALUES (?1)",
                    rusqlite::params![url],
                )
                .unwrap();

            // Every later checkout must see the same schema and rows
            for _ in 0..4 {
                let count: i64 = db
                    .conn()
                    .unwrap()
                    .query_row("SELECT COUNT(*) FROM personas", [], |row| row.get(0))
                    .unwrap();
                assert_eq!(count, 1, "{}", url);
            }
            assert_eq!(db.table_names().unwrap().len(), schema::TABLES.len());
        }
    }

    #[test]
    fn test_reopen_file_keeps_schema() {
        let dir = TempDir::new().unwrap();
        let location = StorageLocation::File(dir.path().join("dispatch.db"));
        drop(Database::open(&location).unwrap());
        let db = Database::open(&location).unwrap();
        assert_eq!(db.table_names().unwrap().len(), schema::TABLES.len());
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_document_round_trip() {
        let mut doc = Document::new();
        doc.insert("tone".to_string(), serde_json::json!("calm"));
        doc.insert("max_turns".to_string(), serde_json::json!(12));

        let encoded = encode_document(Some(&doc)).unwrap();
        let decoded = decode_document(encoded).unwrap().unwrap();
        assert_eq!(decoded, doc);

        assert!(encode_document(None).unwrap().is_none());
        assert!(decode_document(None).unwrap().is_none());
    }

    #[test]
    fn test_decode_document_rejects_non_object() {
        assert!(decode_document(Some("[1,2,3]".to_string())).is_err());
        assert!(decode_document(Some("not json".to_string())).is_err());
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2025-03-14 09:26:53.589").unwrap();
        assert_eq!(ts.year(), 2025);
        assert_eq!(ts.hour(), 9);
        assert_eq!(ts.timestamp_subsec_millis(), 589);

        let whole = parse_timestamp("2025-03-14 09:26:53").unwrap();
        assert_eq!(whole.second(), 53);

        assert!(parse_timestamp("yesterday").is_err());
    }
}
