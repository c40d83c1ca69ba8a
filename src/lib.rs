//! # Hondana - Chapter library synchronization for manga readers
//!
//! Hondana keeps a local manga library in sync with the chapter lists
//! reported by manga sources. Its core is the [`Reconciler`], which diffs the
//! stored chapters of a manga against a freshly fetched list and applies the
//! result in a single store transaction, while preserving read state,
//! download state and the source's chapter ordering.
//!
//! ## Features
//!
//! - **Safe Reconciliation**: An empty chapter list never wipes a manga
//! - **Re-add Detection**: Renumbered or re-uploaded chapters keep their read state
//! - **Transactional Stores**: In-memory store with JSON snapshots, optional SQLite store
//! - **Chapter Number Recognition**: Numbers parsed from free-form chapter names
//! - **Download Tracking**: Downloaded chapters are renamed along with their metadata
//! - **Library Updates**: Concurrent updates with per-manga failure reporting
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use hondana::prelude::*;
//!
//! # async fn example() -> hondana::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let downloads = Arc::new(DownloadDirectory::new("./downloads"));
//! let reconciler = Reconciler::new(store, downloads);
//!
//! let source = LocalSource::new("./local");
//! let mut manga = Manga::new(1, LocalSource::ID, "/berserk", "Berserk");
//!
//! let fetched = source.fetch_chapter_list(&manga).await?;
//! let result = reconciler.reconcile(fetched, &mut manga, &source).await?;
//! println!("{} new chapters", result.added.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`reconcile`]: The reconciliation engine
//! - [`store`]: Transactional chapter persistence
//! - [`source`]: Source trait and collection
//! - [`recognition`]: Chapter number recognition
//! - [`download`]: Download state tracking
//! - [`updater`]: Library-wide updates
//! - [`types`]: Core data structures
//! - [`error`]: Error handling

pub mod config;
pub mod download;
pub mod error;
pub mod recognition;
pub mod reconcile;
pub mod sanitize;
pub mod sort;
pub mod source;
pub mod sources;
pub mod store;
pub mod types;
pub mod updater;

/// Prelude module for convenient imports.
///
/// ```rust
/// use hondana::prelude::*;
///
/// // Now you have access to:
/// // - Reconciler, LibraryUpdater, UpdaterConfig
/// // - Source, Sources, LocalSource
/// // - ChapterStore, MemoryStore, DownloadTracker, DownloadDirectory
/// // - Manga, Chapter, SourceChapter, SyncResult
/// ```
pub mod prelude {
    pub use crate::{
        config::UpdaterConfig,
        download::{DownloadDirectory, DownloadTracker},
        reconcile::Reconciler,
        recognition::{ChapterRecognition, ChapterRecognizer},
        sort::ChapterSort,
        source::{ChapterNormalizer, Source, SourceKind, Sources},
        sources::LocalSource,
        store::{ChapterStore, MemoryStore, StoreTransaction},
        types::{Chapter, Manga, SourceChapter, SyncResult},
        updater::{LibraryUpdater, UpdateReport},
    };
}

// Re-export main types at crate root for direct access
pub use error::{Error, Result};
pub use reconcile::Reconciler;
pub use source::{Source, Sources};
pub use types::{Chapter, Manga, SourceChapter, SyncResult};
pub use updater::{LibraryUpdater, UpdateReport};
