// ABOUTME: Shared application state for the pagewright HTTP server.
// ABOUTME: Holds the open sites, each with its storage and live builder sessions keyed by page ULID.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use pagewright_core::{BuilderHandle, DocumentStore, SiteSettings};
use pagewright_store::{ActivityEntry, ManagerError, SiteManager, SiteStorage};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use ulid::Ulid;

use crate::config::PagewrightConfig;
use crate::error::ApiError;

/// A live editing session plus the background task persisting its history.
pub struct BuilderSession {
    pub handle: BuilderHandle,
    pub persister: JoinHandle<()>,
}

/// One open tenant.
pub struct Site {
    pub storage: SiteStorage,
    pub sessions: RwLock<HashMap<Ulid, BuilderSession>>,
}

impl Site {
    fn new(storage: SiteStorage) -> Self {
        Self {
            storage,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn slug(&self) -> &str {
        &self.storage.slug
    }

    /// Settings as stored, or defaults named after the slug for sites
    /// created without any.
    pub async fn settings(&self) -> Result<SiteSettings, ApiError> {
        Ok(self
            .storage
            .store
            .settings()
            .await?
            .unwrap_or_else(|| SiteSettings::new(self.storage.slug.clone())))
    }

    /// Handle for the page's editing session, if one is open.
    pub async fn session(&self, page_id: Ulid) -> Option<BuilderHandle> {
        self.sessions
            .read()
            .await
            .get(&page_id)
            .map(|s| s.handle.clone())
    }

    /// Remove the page's editing session and stop its persister. Once this
    /// returns no history write for the session is in flight.
    pub async fn close_session(&self, page_id: Ulid) -> Option<BuilderHandle> {
        let session = self.sessions.write().await.remove(&page_id)?;
        session.persister.abort();
        // Cancelled is the expected outcome
        let _ = session.persister.await;
        Some(session.handle)
    }
}

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub manager: SiteManager,
    sites: RwLock<HashMap<String, Arc<Site>>>,
    pub history_capacity: usize,
    pub public_base_url: String,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(home: PathBuf, history_capacity: usize) -> Result<Self, ManagerError> {
        Ok(Self {
            manager: SiteManager::new(home)?,
            sites: RwLock::new(HashMap::new()),
            history_capacity: history_capacity.max(1),
            public_base_url: String::new(),
        })
    }

    pub fn from_config(config: &PagewrightConfig) -> Result<Self, ManagerError> {
        let mut state = Self::new(config.home.clone(), config.history_capacity)?;
        state.public_base_url = config.public_base_url.trim_end_matches('/').to_string();
        Ok(state)
    }

    /// Open every site found under the home directory. Sites that fail to
    /// open are logged and skipped.
    pub async fn load_sites(&self) -> Result<usize, ManagerError> {
        let mut sites = self.sites.write().await;
        for slug in self.manager.list_sites()? {
            if sites.contains_key(&slug) {
                continue;
            }
            match self.manager.open_site(&slug) {
                Ok(storage) => {
                    sites.insert(slug, Arc::new(Site::new(storage)));
                }
                Err(e) => tracing::error!(site = %slug, "failed to open site: {}", e),
            }
        }
        Ok(sites.len())
    }

    /// Slugs of the open sites, sorted.
    pub async fn site_slugs(&self) -> Vec<String> {
        let mut slugs: Vec<String> = self.sites.read().await.keys().cloned().collect();
        slugs.sort();
        slugs
    }

    /// Look a site up, opening it from disk if it was created since startup.
    pub async fn site(&self, slug: &str) -> Result<Arc<Site>, ApiError> {
        if let Some(site) = self.sites.read().await.get(slug) {
            return Ok(Arc::clone(site));
        }

        let mut sites = self.sites.write().await;
        if let Some(site) = sites.get(slug) {
            return Ok(Arc::clone(site));
        }
        let site = Arc::new(Site::new(self.manager.open_site(slug)?));
        sites.insert(slug.to_string(), Arc::clone(&site));
        Ok(site)
    }

    pub async fn create_site(
        &self,
        slug: &str,
        settings: &SiteSettings,
    ) -> Result<Arc<Site>, ApiError> {
        let mut sites = self.sites.write().await;
        let storage = self.manager.create_site(slug)?;
        storage.store.put_settings(settings).await?;
        storage.record(ActivityEntry::new("site_created", Some(slug.to_string())));

        let site = Arc::new(Site::new(storage));
        sites.insert(slug.to_string(), Arc::clone(&site));
        tracing::info!(site = slug, "site created");
        Ok(site)
    }
}
