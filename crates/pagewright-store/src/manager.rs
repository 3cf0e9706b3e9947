// ABOUTME: Filesystem layout for multi-tenant storage: one directory per site under the home dir.
// ABOUTME: Handles site discovery, directory creation, and opening a site's store and activity log.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pagewright_core::model::is_valid_slug;
use thiserror::Error;

use crate::activity::{ActivityEntry, ActivityError, ActivityLog};
use crate::sqlite::{SqliteError, SqliteStore};

/// Errors that can occur during site storage management.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] SqliteError),

    #[error("activity log error: {0}")]
    Activity(#[from] ActivityError),

    #[error("invalid site slug: {0}")]
    InvalidSlug(String),

    #[error("site not found: {0}")]
    SiteNotFound(String),

    #[error("site already exists: {0}")]
    SiteExists(String),
}

/// Everything stored for one tenant: its document store, activity log, and
/// the directory builder histories are saved in.
pub struct SiteStorage {
    pub slug: String,
    pub dir: PathBuf,
    pub store: SqliteStore,
    activity: Mutex<ActivityLog>,
}

impl SiteStorage {
    pub fn history_dir(&self) -> PathBuf {
        self.dir.join("history")
    }

    pub fn activity_path(&self) -> PathBuf {
        self.dir.join("activity.jsonl")
    }

    /// Append to the activity log. Failures are logged, not returned: losing
    /// a log line must not fail the request that caused it.
    pub fn record(&self, entry: ActivityEntry) {
        let result = match self.activity.lock() {
            Ok(mut log) => log.append(&entry),
            Err(_) => {
                tracing::error!(site = %self.slug, "activity log lock poisoned");
                return;
            }
        };
        if let Err(e) = result {
            tracing::error!(site = %self.slug, "failed to append activity: {}", e);
        }
    }

    /// Newest-first activity entries.
    pub fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, ActivityError> {
        ActivityLog::tail(&self.activity_path(), limit)
    }
}

/// Manages the pagewright home directory layout:
///
/// ```text
/// <home>/sites/<slug>/site.db
/// <home>/sites/<slug>/activity.jsonl
/// <home>/sites/<slug>/history/page_<id>.json
/// ```
pub struct SiteManager {
    home: PathBuf,
}

impl SiteManager {
    /// Create a manager rooted at `home`, creating `home/sites` if needed.
    pub fn new(home: PathBuf) -> Result<Self, ManagerError> {
        fs::create_dir_all(home.join("sites"))?;
        Ok(Self { home })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn site_dir(&self, slug: &str) -> PathBuf {
        self.home.join("sites").join(slug)
    }

    /// Slugs of all site directories, sorted. Directories whose names are not
    /// valid slugs are skipped with a warning.
    pub fn list_sites(&self) -> Result<Vec<String>, ManagerError> {
        let sites_dir = self.home.join("sites");
        if !sites_dir.exists() {
            return Ok(Vec::new());
        }

        let mut slugs = Vec::new();
        for entry in fs::read_dir(&sites_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if is_valid_slug(&name_str) {
                slugs.push(name_str.into_owned());
            } else {
                tracing::warn!("skipping non-slug directory in sites/: {}", name_str);
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    /// Create a new site's directory tree and open it.
    pub fn create_site(&self, slug: &str) -> Result<SiteStorage, ManagerError> {
        if !is_valid_slug(slug) {
            return Err(ManagerError::InvalidSlug(slug.to_string()));
        }
        let dir = self.site_dir(slug);
        if dir.exists() {
            return Err(ManagerError::SiteExists(slug.to_string()));
        }
        fs::create_dir_all(dir.join("history"))?;
        tracing::info!(site = slug, "created site directory");
        self.open_site(slug)
    }

    /// Open an existing site, repairing its activity log first.
    pub fn open_site(&self, slug: &str) -> Result<SiteStorage, ManagerError> {
        if !is_valid_slug(slug) {
            return Err(ManagerError::InvalidSlug(slug.to_string()));
        }
        let dir = self.site_dir(slug);
        if !dir.is_dir() {
            return Err(ManagerError::SiteNotFound(slug.to_string()));
        }

        let activity_path = dir.join("activity.jsonl");
        if activity_path.exists() {
            let kept = ActivityLog::repair(&activity_path)?;
            tracing::debug!(site = slug, "activity log holds {} entries", kept);
        }

        let store = SqliteStore::open(&dir.join("site.db"))?;
        let activity = ActivityLog::open(&activity_path)?;

        Ok(SiteStorage {
            slug: slug.to_string(),
            dir,
            store,
            activity: Mutex::new(activity),
        })
    }
}
