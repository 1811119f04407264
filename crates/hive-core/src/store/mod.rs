//! Document store for hive.
//!
//! Path-addressed JSON document collections over SQLite. Every
//! mutation runs inside [`DocumentStore::in_transaction`], and every
//! `set`/`delete` records a before/after snapshot pair in the change
//! feed within the same SQLite transaction, so committed state and the
//! change stream can never disagree.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_errors_doc)]

mod changes;

pub use changes::ChangeRecord;

use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

/// Sort direction for ordered collection listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Oldest first (chronological conversation order)
    Asc,
    /// Newest first
    Desc,
}

/// SQLite-backed document store with a transactional change feed.
pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Open or create a document store at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create parent directories: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // Concurrent writers from other processes get a bounded wait
        // before the store reports a transaction conflict.
        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .context("Failed to set busy timeout")?;

        Ok(Self { conn })
    }

    /// Create an in-memory document store (for testing and demos).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self { conn })
    }

    /// Initialize the store schema.
    ///
    /// Creates all tables and indexes if they don't exist.
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .context("Failed to initialize schema")?;
        Ok(())
    }

    /// Run a closure inside a single atomic transaction.
    ///
    /// Everything the closure reads and writes through the [`Txn`]
    /// handle commits together or not at all. This is the only write
    /// path: the aggregate ledger depends on the item document and its
    /// review record changing as one unit.
    ///
    /// Generic over the closure's error type so domain errors pass
    /// through unchanged; store-level begin/commit failures convert
    /// via `From<anyhow::Error>`.
    pub fn in_transaction<T, E>(&self, f: impl FnOnce(&Txn<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<anyhow::Error>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| anyhow::Error::from(e).context("Failed to begin transaction"))?;

        let out = f(&Txn { conn: &tx })?;

        tx.commit()
            .map_err(|e| anyhow::Error::from(e).context("Failed to commit transaction"))?;
        Ok(out)
    }

    /// Read a single document outside any transaction.
    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        get_doc(&self.conn, path)
    }

    /// List a collection ordered by a top-level JSON field.
    pub fn list(&self, parent: &str, order_field: &str, order: Order) -> Result<Vec<(String, Value)>> {
        list_docs(&self.conn, parent, order_field, order)
    }

    /// Find document paths in a collection group by a top-level field
    /// value, bounded by `limit`.
    ///
    /// `kind` is the collection name (e.g. "reviews" matches every
    /// `items/*/reviews/*` document). This is the query behind the
    /// ban-cascade sweep: re-running it after deletions naturally
    /// skips what is already gone.
    pub fn find_by_field(
        &self,
        kind: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT path FROM documents
             WHERE kind = ? AND json_extract(doc, '$.{field}') = ?
             ORDER BY path LIMIT ?"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare group query")?;
        let rows = stmt
            .query_map(params![kind, value, limit as i64], |row| row.get(0))
            .context("Failed to run group query")?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row.context("Failed to read group query row")?);
        }
        Ok(paths)
    }

    /// Find document paths in a collection group by a boolean field.
    ///
    /// JSON booleans extract as integers in SQLite, so this binds 0/1
    /// rather than text. Used to fan a report out to every admin.
    pub fn find_by_flag(&self, kind: &str, field: &str, value: bool) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT path FROM documents
             WHERE kind = ? AND json_extract(doc, '$.{field}') = ?
             ORDER BY path"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare group query")?;
        let rows = stmt
            .query_map(params![kind, i64::from(value)], |row| row.get(0))
            .context("Failed to run group query")?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row.context("Failed to read group query row")?);
        }
        Ok(paths)
    }

    /// Number of documents under a collection path.
    pub fn count(&self, parent: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE parent = ?",
                params![parent],
                |row| row.get(0),
            )
            .context("Failed to count documents")
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Handle to an open store transaction.
///
/// All reads and writes through this handle belong to one atomic
/// commit.
pub struct Txn<'a> {
    conn: &'a Connection,
}

impl Txn<'_> {
    /// Read a document within the transaction.
    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        get_doc(self.conn, path)
    }

    /// Write (create or replace) a document and record the change.
    pub fn set(&self, path: &str, doc: &Value) -> Result<()> {
        let (parent, kind) = split_path(path)?;
        let before: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM documents WHERE path = ?",
                params![path],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read previous document")?;

        let after = serde_json::to_string(doc).context("Failed to serialize document")?;

        self.conn
            .execute(
                "INSERT INTO documents (path, parent, kind, doc) VALUES (?, ?, ?, ?)
                 ON CONFLICT (path) DO UPDATE SET doc = excluded.doc",
                params![path, parent, kind, after],
            )
            .with_context(|| format!("Failed to write document: {path}"))?;

        changes::record(self.conn, path, before.as_deref(), Some(&after))?;
        Ok(())
    }

    /// Delete a document and record the change.
    ///
    /// Returns `false` (and records nothing) if the document was
    /// already absent — deleting missing content is benign on every
    /// cascade path.
    pub fn delete(&self, path: &str) -> Result<bool> {
        let before: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM documents WHERE path = ?",
                params![path],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read document for deletion")?;

        let Some(before) = before else {
            return Ok(false);
        };

        self.conn
            .execute("DELETE FROM documents WHERE path = ?", params![path])
            .with_context(|| format!("Failed to delete document: {path}"))?;

        changes::record(self.conn, path, Some(&before), None)?;
        Ok(true)
    }

    /// List a collection within the transaction.
    pub fn list(&self, parent: &str, order_field: &str, order: Order) -> Result<Vec<(String, Value)>> {
        list_docs(self.conn, parent, order_field, order)
    }
}

/// Whether an internal store error is a lock/contention abort that the
/// caller may safely retry.
pub fn is_conflict(err: &anyhow::Error) -> bool {
    err.downcast_ref::<rusqlite::Error>().is_some_and(|e| {
        matches!(
            e.sqlite_error_code(),
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        )
    })
}

fn get_doc(conn: &Connection, path: &str) -> Result<Option<Value>> {
    let doc: Option<String> = conn
        .query_row(
            "SELECT doc FROM documents WHERE path = ?",
            params![path],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to read document: {path}"))?;

    doc.map(|d| serde_json::from_str(&d).context("Stored document is not valid JSON"))
        .transpose()
}

fn list_docs(
    conn: &Connection,
    parent: &str,
    order_field: &str,
    order: Order,
) -> Result<Vec<(String, Value)>> {
    let dir = match order {
        Order::Asc => "ASC",
        Order::Desc => "DESC",
    };
    let sql = format!(
        "SELECT path, doc FROM documents WHERE parent = ?
         ORDER BY json_extract(doc, '$.{order_field}') {dir}, path {dir}"
    );
    let mut stmt = conn.prepare(&sql).context("Failed to prepare listing")?;
    let rows = stmt
        .query_map(params![parent], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .context("Failed to list documents")?;

    let mut docs = Vec::new();
    for row in rows {
        let (path, doc) = row.context("Failed to read listing row")?;
        let value = serde_json::from_str(&doc).context("Stored document is not valid JSON")?;
        docs.push((path, value));
    }
    Ok(docs)
}

/// Split a document path into its collection path and collection name.
///
/// Document paths always have an even number of segments
/// (collection/id pairs): `items/{id}`, `items/{id}/reviews/{id}`, ...
fn split_path(path: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() < 2 || parts.len() % 2 != 0 || parts.iter().any(|p| p.is_empty()) {
        bail!("Invalid document path: {path}");
    }
    let kind = parts[parts.len() - 2].to_string();
    let parent = parts[..parts.len() - 1].join("/");
    Ok((parent, kind))
}

// ============================================================================
// Schema SQL
// ============================================================================

const SCHEMA_SQL: &str = r"
-- DOCUMENTS
CREATE TABLE IF NOT EXISTS documents (
    path TEXT PRIMARY KEY,
    parent TEXT NOT NULL,
    kind TEXT NOT NULL,
    doc TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_parent ON documents(parent);
CREATE INDEX IF NOT EXISTS idx_documents_kind ON documents(kind);

-- CHANGE FEED (transactional outbox)
CREATE TABLE IF NOT EXISTS changes (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    before TEXT,
    after TEXT,
    committed_at TEXT NOT NULL
);

-- DISPATCH CURSOR
CREATE TABLE IF NOT EXISTS dispatch_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_seq INTEGER NOT NULL DEFAULT 0,
    last_dispatch_ts TEXT
);

INSERT OR IGNORE INTO dispatch_state (id, last_seq) VALUES (1, 0);
";

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_store() -> DocumentStore {
        let store = DocumentStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    #[test]
    fn test_open_on_disk_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("store.db");

        let store = DocumentStore::open(&db_path).unwrap();
        store.init_schema().unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_set_get_delete_roundtrip() {
        let store = open_store();

        store
            .in_transaction(|txn| {
                txn.set("items/ar-1", &json!({"title": "One", "createdAt": "2024-01-01T00:00:00Z"}))
            })
            .unwrap();

        let doc = store.get("items/ar-1").unwrap().unwrap();
        assert_eq!(doc["title"], "One");

        let deleted = store
            .in_transaction(|txn| txn.delete("items/ar-1"))
            .unwrap();
        assert!(deleted);
        assert!(store.get("items/ar-1").unwrap().is_none());

        // Deleting again is benign.
        let deleted = store
            .in_transaction(|txn| txn.delete("items/ar-1"))
            .unwrap();
        assert!(!deleted);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = open_store();

        let result: Result<()> = store.in_transaction(|txn| {
            txn.set("items/ar-1", &json!({"title": "One"}))?;
            bail!("boom");
        });
        assert!(result.is_err());

        // Nothing committed: neither the document nor its change row.
        assert!(store.get("items/ar-1").unwrap().is_none());
        assert!(store.changes_after(0).unwrap().is_empty());
    }

    #[test]
    fn test_list_ordering() {
        let store = open_store();

        store
            .in_transaction(|txn| {
                txn.set(
                    "items/ar-1/reviews/u-a",
                    &json!({"userId": "u-a", "timestamp": "2024-01-01T10:00:00Z"}),
                )?;
                txn.set(
                    "items/ar-1/reviews/u-b",
                    &json!({"userId": "u-b", "timestamp": "2024-01-02T10:00:00Z"}),
                )?;
                txn.set(
                    "items/ar-1/reviews/u-c",
                    &json!({"userId": "u-c", "timestamp": "2024-01-03T10:00:00Z"}),
                )
            })
            .unwrap();

        let newest_first = store
            .list("items/ar-1/reviews", "timestamp", Order::Desc)
            .unwrap();
        let ids: Vec<&str> = newest_first
            .iter()
            .map(|(_, d)| d["userId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["u-c", "u-b", "u-a"]);

        let oldest_first = store
            .list("items/ar-1/reviews", "timestamp", Order::Asc)
            .unwrap();
        let ids: Vec<&str> = oldest_first
            .iter()
            .map(|(_, d)| d["userId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["u-a", "u-b", "u-c"]);
    }

    #[test]
    fn test_find_by_field_spans_collection_group() {
        let store = open_store();

        store
            .in_transaction(|txn| {
                txn.set("items/ar-1/reviews/u-a", &json!({"userId": "u-a"}))?;
                txn.set("items/ar-2/reviews/u-a", &json!({"userId": "u-a"}))?;
                txn.set("items/ar-2/reviews/u-b", &json!({"userId": "u-b"}))?;
                txn.set(
                    "items/ar-1/reviews/u-b/replies/re-1",
                    &json!({"userId": "u-a"}),
                )
            })
            .unwrap();

        let reviews = store.find_by_field("reviews", "userId", "u-a", 10).unwrap();
        assert_eq!(
            reviews,
            vec![
                "items/ar-1/reviews/u-a".to_string(),
                "items/ar-2/reviews/u-a".to_string()
            ]
        );

        let replies = store.find_by_field("replies", "userId", "u-a", 10).unwrap();
        assert_eq!(replies, vec!["items/ar-1/reviews/u-b/replies/re-1".to_string()]);

        // Limit bounds the batch.
        let limited = store.find_by_field("reviews", "userId", "u-a", 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_split_path() {
        assert_eq!(
            split_path("items/ar-1").unwrap(),
            ("items".to_string(), "items".to_string())
        );
        assert_eq!(
            split_path("items/ar-1/reviews/u-2").unwrap(),
            ("items/ar-1/reviews".to_string(), "reviews".to_string())
        );
        assert!(split_path("items").is_err());
        assert!(split_path("items/a/reviews").is_err());
        assert!(split_path("items//reviews/x").is_err());
    }
}
