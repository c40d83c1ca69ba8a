//! Chapter persistence behind a transactional interface.
//!
//! The reconciliation engine only talks to the [`ChapterStore`] and
//! [`StoreTransaction`] traits. Two implementations are provided:
//!
//! - [`MemoryStore`] - in-process store with JSON snapshots, always available
//! - `SqliteStore` - SQLite database through `sqlx` (requires the `sqlite` feature)
//!
//! # Transactions
//!
//! A transaction is scoped to the chapters of one manga. Transactions for the
//! same manga are serialized, transactions for different manga are not. All
//! writes made through a transaction become visible together on
//! [`commit`](StoreTransaction::commit); dropping a transaction without
//! committing discards them.
//!
//! # Examples
//!
//! ```rust
//! use hondana::store::{ChapterStore, MemoryStore};
//! use hondana::types::{Chapter, SourceChapter};
//!
//! # async fn example() -> hondana::Result<()> {
//! let store = MemoryStore::new();
//!
//! let mut tx = store.begin(1).await?;
//! let ids = tx
//!     .insert_chapters(&[Chapter::from_source(&SourceChapter::new("/c/1", "One"), 1)])
//!     .await?;
//! tx.commit().await?;
//!
//! assert_eq!(store.get_chapters(1).await?[0].id, Some(ids[0]));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{
    error::Result,
    types::{Chapter, Manga},
};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Persistent storage of chapters, keyed by manga.
#[async_trait]
pub trait ChapterStore: Send + Sync {
    /// Returns all stored chapters of a manga.
    async fn get_chapters(&self, manga_id: i64) -> Result<Vec<Chapter>>;

    /// Persists the `last_update` of a manga outside of any transaction.
    async fn update_last_updated(&self, manga: &Manga) -> Result<()>;

    /// Opens a transaction over the chapters of one manga.
    ///
    /// Waits while another transaction for the same manga is open.
    async fn begin(&self, manga_id: i64) -> Result<Box<dyn StoreTransaction>>;
}

/// An open, all-or-nothing unit of work over one manga's chapters.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Returns the chapters of the manga as seen by this transaction.
    async fn get_chapters(&mut self) -> Result<Vec<Chapter>>;

    /// Inserts new chapters and returns their assigned identifiers, in order.
    async fn insert_chapters(&mut self, chapters: &[Chapter]) -> Result<Vec<i64>>;

    /// Deletes the given chapters.
    async fn delete_chapters(&mut self, chapters: &[Chapter]) -> Result<()>;

    /// Overwrites stored chapters with the given values, matched by identifier.
    async fn update_chapters(&mut self, chapters: &[Chapter]) -> Result<()>;

    /// Writes `source_order` of the given chapters, matched by url.
    async fn fix_source_order(&mut self, chapters: &[Chapter]) -> Result<()>;

    /// Persists the `last_update` of the manga.
    async fn update_last_updated(&mut self, manga: &Manga) -> Result<()>;

    /// Makes every write of this transaction visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Per-manga locks serializing transactions on the same manga.
#[derive(Debug, Default)]
pub(crate) struct MangaLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl MangaLocks {
    pub(crate) async fn acquire(&self, manga_id: i64) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().entry(manga_id).or_default().clone();
        lock.lock_owned().await
    }
}
