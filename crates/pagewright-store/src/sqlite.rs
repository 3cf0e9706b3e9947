// ABOUTME: SQLite-backed DocumentStore holding every collection as JSON bodies in one table.
// ABOUTME: Enforces per-collection slug uniqueness and keeps site settings in a meta table.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use pagewright_core::model::{Page, SiteSettings};
use pagewright_core::store::{Collection, Document, DocumentStore, StoreError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use ulid::Ulid;

const SETTINGS_KEY: &str = "site_settings";

/// Errors that can occur during SQLite store operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("sqlite connection lock poisoned")]
    Poisoned,
}

impl From<SqliteError> for StoreError {
    fn from(err: SqliteError) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// A site's document store backed by a single SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, SqliteError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// A throwaway database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, SqliteError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SqliteError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                slug TEXT,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS documents_slug
                ON documents (collection, slug) WHERE slug IS NOT NULL;

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, SqliteError>,
    ) -> Result<T, SqliteError> {
        let conn = self.conn.lock().map_err(|_| SqliteError::Poisoned)?;
        f(&conn)
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: Collection) -> Result<u64, SqliteError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection.as_str()],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
    }

    fn get_body(&self, collection: Collection, id: &str) -> Result<Option<String>, SqliteError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection.as_str(), id],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get<D: Document>(&self, id: Ulid) -> Result<Option<D>, StoreError> {
        match self.get_body(D::COLLECTION, &id.to_string())? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn put<D: Document>(&self, doc: &D) -> Result<(), StoreError> {
        let body = serde_json::to_string(doc)?;
        let id = doc.id().to_string();
        let slug = doc.slug().map(str::to_string);
        let collection = D::COLLECTION.as_str();

        let taken = self.with_conn(|conn| {
            if let Some(ref slug) = slug {
                let owner: Option<String> = conn
                    .query_row(
                        "SELECT id FROM documents WHERE collection = ?1 AND slug = ?2 AND id != ?3",
                        params![collection, slug, id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if owner.is_some() {
                    return Ok(true);
                }
            }
            conn.execute(
                "INSERT INTO documents (collection, id, slug, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(collection, id) DO UPDATE SET
                    slug = excluded.slug,
                    body = excluded.body,
                    updated_at = excluded.updated_at",
                params![collection, id, slug, body, Utc::now().to_rfc3339()],
            )?;
            Ok(false)
        })?;

        if taken {
            return Err(StoreError::SlugTaken(slug.unwrap_or_default()));
        }
        Ok(())
    }

    async fn delete<D: Document>(&self, id: Ulid) -> Result<bool, StoreError> {
        let removed = self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![D::COLLECTION.as_str(), id.to_string()],
            )?)
        })?;
        Ok(removed > 0)
    }

    async fn list<D: Document>(&self) -> Result<Vec<D>, StoreError> {
        let bodies = self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY id ASC")?;
            let rows = stmt.query_map(params![D::COLLECTION.as_str()], |row| row.get::<_, String>(0))?;

            let mut bodies = Vec::new();
            for row in rows {
                bodies.push(row?);
            }
            Ok(bodies)
        })?;

        let mut docs = Vec::with_capacity(bodies.len());
        for body in bodies {
            docs.push(serde_json::from_str(&body)?);
        }
        Ok(docs)
    }

    async fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, StoreError> {
        let body: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND slug = ?2",
                    params![Collection::Pages.as_str(), slug],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn settings(&self) -> Result<Option<SiteSettings>, StoreError> {
        let value: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM meta WHERE key = ?1",
                    params![SETTINGS_KEY],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_settings(&self, settings: &SiteSettings) -> Result<(), StoreError> {
        let json = serde_json::to_string(settings)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![SETTINGS_KEY, json],
            )?;
            Ok(())
        })?;
        Ok(())
    }
}
