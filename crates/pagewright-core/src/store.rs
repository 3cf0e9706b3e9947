// ABOUTME: The DocumentStore trait: async read/write by id for every page-tree collection.
// ABOUTME: Also provides MemoryStore, an in-process implementation used in tests and previews.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use ulid::Ulid;

use crate::model::{Block, Column, Page, Section, SiteSettings};

/// Errors surfaced by any document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("slug already in use: {0}")]
    SlugTaken(String),
}

/// The collections a site's documents live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Pages,
    Sections,
    Columns,
    Blocks,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Pages => "pages",
            Collection::Sections => "sections",
            Collection::Columns => "columns",
            Collection::Blocks => "blocks",
        }
    }
}

/// A record stored as a JSON body keyed by (collection, id).
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> Ulid;

    /// Unique lookup key within the collection, if any.
    fn slug(&self) -> Option<&str> {
        None
    }
}

impl Document for Page {
    const COLLECTION: Collection = Collection::Pages;

    fn id(&self) -> Ulid {
        self.page_id
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }
}

impl Document for Section {
    const COLLECTION: Collection = Collection::Sections;

    fn id(&self) -> Ulid {
        self.section_id
    }
}

impl Document for Column {
    const COLLECTION: Collection = Collection::Columns;

    fn id(&self) -> Ulid {
        self.column_id
    }
}

impl Document for Block {
    const COLLECTION: Collection = Collection::Blocks;

    fn id(&self) -> Ulid {
        self.block_id
    }
}

/// Async accessors for one site's documents. `put` is an upsert; deletes
/// never cascade to referenced documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get<D: Document>(&self, id: Ulid) -> Result<Option<D>, StoreError>;

    async fn put<D: Document>(&self, doc: &D) -> Result<(), StoreError>;

    /// Returns whether a document was removed.
    async fn delete<D: Document>(&self, id: Ulid) -> Result<bool, StoreError>;

    async fn list<D: Document>(&self) -> Result<Vec<D>, StoreError>;

    async fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, StoreError>;

    async fn settings(&self) -> Result<Option<SiteSettings>, StoreError>;

    async fn put_settings(&self, settings: &SiteSettings) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    docs: HashMap<(Collection, Ulid), serde_json::Value>,
    slugs: HashMap<(Collection, String), Ulid>,
    settings: Option<SiteSettings>,
}

/// A DocumentStore kept entirely in memory. Documents are stored
/// serialized so reads hand out independent copies.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string().into()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get<D: Document>(&self, id: Ulid) -> Result<Option<D>, StoreError> {
        let inner = self.lock()?;
        match inner.docs.get(&(D::COLLECTION, id)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    async fn put<D: Document>(&self, doc: &D) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        let mut inner = self.lock()?;
        let id = doc.id();
        if let Some(slug) = doc.slug() {
            let key = (D::COLLECTION, slug.to_string());
            if let Some(owner) = inner.slugs.get(&key)
                && *owner != id
            {
                return Err(StoreError::SlugTaken(slug.to_string()));
            }
            inner.slugs.retain(|(c, _), owner| !(*c == D::COLLECTION && *owner == id));
            inner.slugs.insert(key, id);
        }
        inner.docs.insert((D::COLLECTION, id), value);
        Ok(())
    }

    async fn delete<D: Document>(&self, id: Ulid) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        inner.slugs.retain(|(c, _), owner| !(*c == D::COLLECTION && *owner == id));
        Ok(inner.docs.remove(&(D::COLLECTION, id)).is_some())
    }

    async fn list<D: Document>(&self) -> Result<Vec<D>, StoreError> {
        let inner = self.lock()?;
        let mut ids: Vec<&(Collection, Ulid)> = inner
            .docs
            .keys()
            .filter(|(c, _)| *c == D::COLLECTION)
            .collect();
        ids.sort_by_key(|(_, id)| *id);
        ids.into_iter()
            .map(|key| serde_json::from_value(inner.docs[key].clone()).map_err(StoreError::from))
            .collect()
    }

    async fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, StoreError> {
        let id = {
            let inner = self.lock()?;
            inner
                .slugs
                .get(&(Collection::Pages, slug.to_string()))
                .copied()
        };
        match id {
            Some(id) => self.get::<Page>(id).await,
            None => Ok(None),
        }
    }

    async fn settings(&self) -> Result<Option<SiteSettings>, StoreError> {
        Ok(self.lock()?.settings.clone())
    }

    async fn put_settings(&self, settings: &SiteSettings) -> Result<(), StoreError> {
        self.lock()?.settings = Some(settings.clone());
        Ok(())
    }
}
