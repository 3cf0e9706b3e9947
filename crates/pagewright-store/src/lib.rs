// ABOUTME: Persistence layer for pagewright: per-site SQLite document stores and activity logs.
// ABOUTME: Also persists builder-session history snapshots and manages the multi-site directory layout.

pub mod activity;
pub mod manager;
pub mod snapshot;
pub mod sqlite;

pub use activity::{ActivityEntry, ActivityError, ActivityLog};
pub use manager::{ManagerError, SiteManager, SiteStorage};
pub use snapshot::{HistorySnapshot, SnapshotError, delete_history, load_history, save_history};
pub use sqlite::{SqliteError, SqliteStore};
