// ABOUTME: Core library for pagewright: page-tree model, history, responsive layout, and builder sessions.
// ABOUTME: Defines the DocumentStore trait that storage backends implement and the tree resolver that reads it.

pub mod actor;
pub mod command;
pub mod contents;
pub mod content;
pub mod error;
pub mod event;
pub mod export;
pub mod history;
pub mod model;
pub mod responsive;
pub mod session;
pub mod store;
pub mod tree;

pub use actor::{ActorError, BuilderHandle, SaveTarget, spawn};
pub use command::BuilderCommand;
pub use contents::{ContentsWrite, PageContents, collect_contents, write_contents};
pub use content::{BlockContent, ContentError};
pub use error::{Categorized, ErrorCategory};
pub use event::{BuilderEvent, BuilderEventPayload};
pub use history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer, HistoryError};
pub use model::{Block, BlockType, Column, LayoutMode, Page, PageStatus, Section, SiteSettings};
pub use responsive::{Breakpoint, LayoutSettings, ResponsiveOverrides};
pub use session::{SessionState, SessionSummary};
pub use store::{Document, DocumentStore, MemoryStore, StoreError};
pub use tree::{MAX_COLUMN_DEPTH, ResolvedPage, TreeResolver};
