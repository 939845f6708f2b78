//! SQLite-backed document store keyed by source key.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use bookwise_core::{Error, Result};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS book_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_key TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    outline TEXT NOT NULL DEFAULT '',
    html_content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);
";

/// A book document row. `id` is 0 until the first save assigns one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookDocument {
    pub id: i64,
    pub source_key: String,
    pub title: String,
    pub author: String,
    pub outline: String,
    pub html_content: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl BookDocument {
    /// Build an unsaved document from parsed metadata.
    pub fn new(
        source_key: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        outline: impl Into<String>,
        html_content: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            source_key: source_key.into(),
            title: title.into(),
            author: author.into(),
            outline: outline.into(),
            html_content: html_content.into(),
            created_at: 0,
            updated_at: None,
        }
    }
}

/// SQLite store for book documents.
///
/// The pipeline never deletes rows; re-ingestion of a known source key
/// overwrites content and metadata in place.
pub struct BookStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl BookStore {
    /// Open or create the store. `db_dir` is the data directory; the file
    /// will be `db_dir/bookwise.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("bookwise.db");

        let conn = Connection::open(&db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let count = store.count_documents()?;
        info!(
            "BookStore initialized: {} documents, path={}",
            count,
            store.db_path.display()
        );
        Ok(store)
    }

    /// Look up a document by its stable source key. Absence is a normal case.
    pub fn find_by_source_key(&self, source_key: &str) -> Result<Option<BookDocument>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM book_documents WHERE source_key = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![source_key], |row| Ok(Self::row_to_document(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Persist a document. Assigns an id and `created_at` on first save;
    /// subsequent saves overwrite content/metadata and refresh `updated_at`.
    pub fn save(&self, doc: &BookDocument) -> Result<BookDocument> {
        let now = now_millis();
        let conn = self.conn.lock();

        if doc.id == 0 {
            let id = conn
                .prepare_cached(
                    "INSERT INTO book_documents
                     (source_key, title, author, outline, html_content, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(|e| Error::Database(e.to_string()))?
                .insert(params![
                    doc.source_key,
                    doc.title,
                    doc.author,
                    doc.outline,
                    doc.html_content,
                    now
                ])
                .map_err(|e| Error::Database(e.to_string()))?;

            let mut saved = doc.clone();
            saved.id = id;
            saved.created_at = now;
            Ok(saved)
        } else {
            conn.execute(
                "UPDATE book_documents
                 SET title = ?1, author = ?2, outline = ?3, html_content = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![doc.title, doc.author, doc.outline, doc.html_content, now, doc.id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

            let mut saved = doc.clone();
            saved.updated_at = Some(now);
            Ok(saved)
        }
    }

    /// Count total documents.
    pub fn count_documents(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM book_documents", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    fn row_to_document(row: &Row) -> BookDocument {
        BookDocument {
            id: row.get_unwrap("id"),
            source_key: row.get_unwrap("source_key"),
            title: row.get_unwrap("title"),
            author: row.get_unwrap("author"),
            outline: row.get_unwrap("outline"),
            html_content: row.get_unwrap("html_content"),
            created_at: row.get_unwrap("created_at"),
            updated_at: row.get_unwrap("updated_at"),
        }
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}
