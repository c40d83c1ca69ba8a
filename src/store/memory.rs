//! In-process chapter store.
//!
//! [`MemoryStore`] keeps manga and chapters in memory and can persist its
//! whole state as a JSON snapshot. Transactions work on a private copy of the
//! manga's chapters and publish it on commit.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::{ChapterStore, MangaLocks, StoreTransaction};
use crate::{
    error::{Error, Result},
    types::{Chapter, Manga},
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    next_id: i64,
    manga: BTreeMap<i64, Manga>,
    chapters: BTreeMap<i64, Vec<Chapter>>,
}

#[derive(Debug, Default)]
struct Tables {
    manga: BTreeMap<i64, Manga>,
    chapters: BTreeMap<i64, Vec<Chapter>>,
}

/// Chapter store held in memory.
///
/// # Examples
///
/// ```rust
/// use hondana::store::{ChapterStore, MemoryStore};
/// use hondana::types::Manga;
///
/// # async fn example() -> hondana::Result<()> {
/// let store = MemoryStore::new();
/// store.insert_manga(Manga::new(1, "local", "/m/1", "Berserk"));
///
/// assert!(store.get_chapters(1).await?.is_empty());
/// assert_eq!(store.manga(1).map(|m| m.title), Some("Berserk".to_string()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    next_id: Arc<AtomicI64>,
    writes: Arc<AtomicU64>,
    locks: MangaLocks,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            next_id: Arc::new(AtomicI64::new(1)),
            writes: Arc::new(AtomicU64::new(0)),
            locks: MangaLocks::default(),
        }
    }

    /// Adds or replaces a manga record.
    pub fn insert_manga(&self, manga: Manga) {
        self.tables.write().manga.insert(manga.id, manga);
    }

    /// Returns a copy of a manga record.
    pub fn manga(&self, id: i64) -> Option<Manga> {
        self.tables.read().manga.get(&id).cloned()
    }

    /// Number of committed writes: transactions and `last_update` updates.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Writes the whole store to `path` as JSON.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = {
            let tables = self.tables.read();
            let snapshot = SnapshotRef {
                next_id: self.next_id.load(Ordering::SeqCst),
                manga: &tables.manga,
                chapters: &tables.chapters,
            };
            serde_json::to_vec_pretty(&snapshot)?
        };

        if let Some(parent) = path.as_ref().parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path.as_ref(), json).await?;
        debug!(path = %path.as_ref().display(), "saved store snapshot");
        Ok(())
    }

    /// Reads a store previously written by [`save_snapshot`](Self::save_snapshot).
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;

        let max_id = snapshot
            .chapters
            .values()
            .flatten()
            .filter_map(|c| c.id)
            .max()
            .unwrap_or(0);

        let store = Self::new();
        store
            .next_id
            .store(snapshot.next_id.max(max_id + 1), Ordering::SeqCst);
        *store.tables.write() = Tables {
            manga: snapshot.manga,
            chapters: snapshot.chapters,
        };
        Ok(store)
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    next_id: i64,
    manga: &'a BTreeMap<i64, Manga>,
    chapters: &'a BTreeMap<i64, Vec<Chapter>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChapterStore for MemoryStore {
    async fn get_chapters(&self, manga_id: i64) -> Result<Vec<Chapter>> {
        Ok(self
            .tables
            .read()
            .chapters
            .get(&manga_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_last_updated(&self, manga: &Manga) -> Result<()> {
        write_last_update(&mut self.tables.write(), manga);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn begin(&self, manga_id: i64) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.locks.acquire(manga_id).await;
        let chapters = self
            .tables
            .read()
            .chapters
            .get(&manga_id)
            .cloned()
            .unwrap_or_default();

        Ok(Box::new(MemoryTransaction {
            tables: self.tables.clone(),
            next_id: self.next_id.clone(),
            writes: self.writes.clone(),
            _guard: guard,
            manga_id,
            chapters,
            manga: None,
        }))
    }
}

fn write_last_update(tables: &mut Tables, manga: &Manga) {
    tables
        .manga
        .entry(manga.id)
        .and_modify(|m| m.last_update = manga.last_update)
        .or_insert_with(|| manga.clone());
}

/// Transaction over a private copy of one manga's chapters.
struct MemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    next_id: Arc<AtomicI64>,
    writes: Arc<AtomicU64>,
    _guard: OwnedMutexGuard<()>,
    manga_id: i64,
    chapters: Vec<Chapter>,
    manga: Option<Manga>,
}

impl MemoryTransaction {
    fn position(&self, chapter: &Chapter) -> Option<usize> {
        match chapter.id {
            Some(id) => self.chapters.iter().position(|c| c.id == Some(id)),
            None => self.chapters.iter().position(|c| c.url == chapter.url),
        }
    }

    fn check_manga(&self, chapter: &Chapter) -> Result<()> {
        if chapter.manga_id != self.manga_id {
            return Err(Error::store(format!(
                "chapter '{}' belongs to manga {}, transaction is for manga {}",
                chapter.url, chapter.manga_id, self.manga_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get_chapters(&mut self) -> Result<Vec<Chapter>> {
        Ok(self.chapters.clone())
    }

    async fn insert_chapters(&mut self, chapters: &[Chapter]) -> Result<Vec<i64>> {
        let mut urls: HashSet<&str> = self.chapters.iter().map(|c| c.url.as_str()).collect();
        for chapter in chapters {
            self.check_manga(chapter)?;
            if !urls.insert(chapter.url.as_str()) {
                return Err(Error::store(format!(
                    "chapter url '{}' already exists for manga {}",
                    chapter.url, self.manga_id
                )));
            }
        }

        let mut ids = Vec::with_capacity(chapters.len());
        for chapter in chapters {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let mut stored = chapter.clone();
            stored.id = Some(id);
            self.chapters.push(stored);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn delete_chapters(&mut self, chapters: &[Chapter]) -> Result<()> {
        for chapter in chapters {
            if let Some(index) = self.position(chapter) {
                self.chapters.remove(index);
            }
        }
        Ok(())
    }

    async fn update_chapters(&mut self, chapters: &[Chapter]) -> Result<()> {
        for chapter in chapters {
            self.check_manga(chapter)?;
            if chapter.id.is_none() {
                return Err(Error::store(format!(
                    "cannot update unsaved chapter '{}'",
                    chapter.url
                )));
            }
            let index = self.position(chapter).ok_or_else(|| {
                Error::store(format!("chapter '{}' is not stored", chapter.url))
            })?;
            self.chapters[index] = chapter.clone();
        }
        Ok(())
    }

    async fn fix_source_order(&mut self, chapters: &[Chapter]) -> Result<()> {
        for chapter in chapters {
            if let Some(stored) = self.chapters.iter_mut().find(|c| c.url == chapter.url) {
                stored.source_order = chapter.source_order;
            }
        }
        Ok(())
    }

    async fn update_last_updated(&mut self, manga: &Manga) -> Result<()> {
        self.manga = Some(manga.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        {
            let mut tables = this.tables.write();
            tables.chapters.insert(this.manga_id, this.chapters);
            if let Some(manga) = &this.manga {
                write_last_update(&mut tables, manga);
            }
        }
        this.writes.fetch_add(1, Ordering::SeqCst);
        debug!(manga_id = this.manga_id, "committed memory transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceChapter;

    fn chapter(manga_id: i64, url: &str) -> Chapter {
        Chapter::from_source(&SourceChapter::new(url, url), manga_id)
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();

        let mut tx = store.begin(1).await.unwrap();
        let ids = tx
            .insert_chapters(&[chapter(1, "/a"), chapter(1, "/b")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        // Not visible before commit
        assert!(store.get_chapters(1).await.unwrap().is_empty());

        tx.commit().await.unwrap();
        let stored = store.get_chapters(1).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, Some(ids[0]));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_discards_writes() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin(1).await.unwrap();
            tx.insert_chapters(&[chapter(1, "/a")]).await.unwrap();
            tx.update_last_updated(&Manga::new(1, "s", "/m", "M"))
                .await
                .unwrap();
        }

        assert!(store.get_chapters(1).await.unwrap().is_empty());
        assert!(store.manga(1).is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_url_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin(1).await.unwrap();
        tx.insert_chapters(&[chapter(1, "/a")]).await.unwrap();

        let result = tx.insert_chapters(&[chapter(1, "/a")]).await;
        assert!(matches!(result, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryStore::new();
        let mut tx = store.begin(1).await.unwrap();
        tx.insert_chapters(&[chapter(1, "/a"), chapter(1, "/b")])
            .await
            .unwrap();
        let mut stored = tx.get_chapters().await.unwrap();

        stored[0].name = "Renamed".to_string();
        tx.update_chapters(&stored[..1]).await.unwrap();
        tx.delete_chapters(&stored[1..]).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.get_chapters(1).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Renamed");
    }

    #[tokio::test]
    async fn test_update_unknown_chapter_fails() {
        let store = MemoryStore::new();
        let mut tx = store.begin(1).await.unwrap();
        let mut missing = chapter(1, "/ghost");
        missing.id = Some(404);

        let result = tx.update_chapters(&[missing]).await;
        assert!(matches!(result, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_keeps_id_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");

        let store = MemoryStore::new();
        store.insert_manga(Manga::new(1, "s", "/m", "M"));
        let mut tx = store.begin(1).await.unwrap();
        let ids = tx.insert_chapters(&[chapter(1, "/a")]).await.unwrap();
        tx.commit().await.unwrap();
        store.save_snapshot(&path).await.unwrap();

        let loaded = MemoryStore::load_snapshot(&path).await.unwrap();
        assert_eq!(loaded.manga(1).map(|m| m.title), Some("M".to_string()));
        assert_eq!(loaded.get_chapters(1).await.unwrap()[0].id, Some(ids[0]));

        let mut tx = loaded.begin(1).await.unwrap();
        let next = tx.insert_chapters(&[chapter(1, "/b")]).await.unwrap();
        assert!(next[0] > ids[0]);
    }
}
