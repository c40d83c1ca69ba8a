//! Common test utilities
//!
//! Scripted sources, recording download trackers and a failing store shared
//! by the integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hondana::error::{Error, Result};
use hondana::prelude::*;

#[allow(dead_code)]
pub const TEST_SOURCE_ID: &str = "scripted";
#[allow(dead_code)]
pub const TEST_MANGA_TITLE: &str = "The Summer You Were There";

/// Creates the library manga every test works on.
#[allow(dead_code)]
pub fn test_manga(id: i64) -> Manga {
    Manga::new(id, TEST_SOURCE_ID, format!("/manga/{id}"), TEST_MANGA_TITLE)
}

/// Creates a descriptor with an unrecognized number and no upload date.
#[allow(dead_code)]
pub fn descriptor(url: &str, name: &str) -> SourceChapter {
    SourceChapter::new(url, name)
}

/// Creates a descriptor with an upload date.
#[allow(dead_code)]
pub fn uploaded(url: &str, name: &str, date_upload: i64) -> SourceChapter {
    let mut chapter = SourceChapter::new(url, name);
    chapter.date_upload = date_upload;
    chapter
}

/// Returns the stored chapter with `url`.
#[allow(dead_code)]
pub async fn stored(store: &MemoryStore, manga_id: i64, url: &str) -> Option<Chapter> {
    store
        .get_chapters(manga_id)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.url == url)
}

/// Marks stored chapters as read, outside of any sync.
#[allow(dead_code)]
pub async fn mark_read(store: &MemoryStore, manga_id: i64, urls: &[&str], bookmarked: bool) {
    let chapters: Vec<Chapter> = store
        .get_chapters(manga_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| urls.contains(&c.url.as_str()))
        .map(|mut c| {
            c.read = true;
            c.bookmarked = bookmarked;
            c
        })
        .collect();
    let mut tx = store.begin(manga_id).await.unwrap();
    tx.update_chapters(&chapters).await.unwrap();
    tx.commit().await.unwrap();
}

/// A source whose chapter list is set by the test.
///
/// Clones share the chapter list, so a test can keep a handle after moving
/// the source into a [`Sources`] collection.
#[allow(dead_code)]
#[derive(Clone)]
pub struct ScriptedSource {
    id: String,
    chapters: Arc<Mutex<Vec<SourceChapter>>>,
    normalizer: Option<Arc<dyn ChapterNormalizer>>,
    fetches: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            chapters: Arc::new(Mutex::new(Vec::new())),
            normalizer: None,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_normalizer(mut self, normalizer: impl ChapterNormalizer + 'static) -> Self {
        self.normalizer = Some(Arc::new(normalizer));
        self
    }

    pub fn set_chapters(&self, chapters: Vec<SourceChapter>) {
        *self.chapters.lock() = chapters;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for ScriptedSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    async fn fetch_chapter_list(&self, _manga: &Manga) -> Result<Vec<SourceChapter>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // Give concurrent updates a chance to interleave
        tokio::task::yield_now().await;
        Ok(self.chapters.lock().clone())
    }

    fn normalizer(&self) -> Option<&dyn ChapterNormalizer> {
        self.normalizer.as_deref()
    }
}

/// Normalizer that fills in a scanlator for chapters without one.
#[allow(dead_code)]
pub struct ScanlatorNormalizer(pub &'static str);

#[async_trait]
impl ChapterNormalizer for ScanlatorNormalizer {
    async fn normalize_chapter(
        &self,
        mut chapter: SourceChapter,
        _manga: &Manga,
    ) -> Result<SourceChapter> {
        if chapter.scanlator.is_none() {
            chapter.scanlator = Some(self.0.to_string());
        }
        Ok(chapter)
    }
}

/// Normalizer that fails for one chapter url.
#[allow(dead_code)]
pub struct FailingNormalizer(pub &'static str);

#[async_trait]
impl ChapterNormalizer for FailingNormalizer {
    async fn normalize_chapter(
        &self,
        chapter: SourceChapter,
        _manga: &Manga,
    ) -> Result<SourceChapter> {
        if chapter.url == self.0 {
            return Err(Error::normalization(TEST_SOURCE_ID, "metadata unavailable"));
        }
        Ok(chapter)
    }
}

/// Download tracker that treats a fixed set of urls as downloaded and
/// records every call it receives.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingDownloads {
    downloaded: Mutex<HashSet<String>>,
    store: Option<Arc<MemoryStore>>,
    renames: Mutex<Vec<(Chapter, SourceChapter)>>,
    names_at_rename: Mutex<Vec<String>>,
    deleted: Mutex<Vec<Chapter>>,
}

#[allow(dead_code)]
impl RecordingDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also records the stored name of each renamed chapter at rename time.
    pub fn observing(store: Arc<MemoryStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    pub fn mark_downloaded(&self, url: &str) {
        self.downloaded.lock().insert(url.to_string());
    }

    pub fn renames(&self) -> Vec<(Chapter, SourceChapter)> {
        self.renames.lock().clone()
    }

    pub fn names_at_rename(&self) -> Vec<String> {
        self.names_at_rename.lock().clone()
    }

    pub fn deleted(&self) -> Vec<Chapter> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl DownloadTracker for RecordingDownloads {
    async fn is_downloaded(&self, chapter: &Chapter, _manga: &Manga) -> bool {
        self.downloaded.lock().contains(&chapter.url)
    }

    async fn rename(
        &self,
        _source: &dyn Source,
        manga: &Manga,
        old: &Chapter,
        new: &SourceChapter,
    ) -> Result<()> {
        if let Some(store) = &self.store {
            let current = stored(store, manga.id, &old.url).await;
            if let Some(current) = current {
                self.names_at_rename.lock().push(current.name);
            }
        }
        self.renames.lock().push((old.clone(), new.clone()));
        Ok(())
    }

    async fn delete_chapters(&self, chapters: &[Chapter], _manga: &Manga) -> Result<()> {
        self.deleted.lock().extend(chapters.iter().cloned());
        Ok(())
    }
}

/// Transaction step a [`FailingStore`] fails on.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailAt {
    Insert,
    FixSourceOrder,
    Commit,
}

/// Store wrapper whose transactions fail at a chosen step.
#[allow(dead_code)]
pub struct FailingStore {
    pub inner: Arc<MemoryStore>,
    pub fail_at: FailAt,
}

#[async_trait]
impl ChapterStore for FailingStore {
    async fn get_chapters(&self, manga_id: i64) -> Result<Vec<Chapter>> {
        self.inner.get_chapters(manga_id).await
    }

    async fn update_last_updated(&self, manga: &Manga) -> Result<()> {
        self.inner.update_last_updated(manga).await
    }

    async fn begin(&self, manga_id: i64) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin(manga_id).await?,
            fail_at: self.fail_at,
        }))
    }
}

#[allow(dead_code)]
struct FailingTransaction {
    inner: Box<dyn StoreTransaction>,
    fail_at: FailAt,
}

impl FailingTransaction {
    fn check(&self, step: FailAt) -> Result<()> {
        if self.fail_at == step {
            return Err(Error::store(format!("injected failure at {step:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for FailingTransaction {
    async fn get_chapters(&mut self) -> Result<Vec<Chapter>> {
        self.inner.get_chapters().await
    }

    async fn insert_chapters(&mut self, chapters: &[Chapter]) -> Result<Vec<i64>> {
        self.check(FailAt::Insert)?;
        self.inner.insert_chapters(chapters).await
    }

    async fn delete_chapters(&mut self, chapters: &[Chapter]) -> Result<()> {
        self.inner.delete_chapters(chapters).await
    }

    async fn update_chapters(&mut self, chapters: &[Chapter]) -> Result<()> {
        self.inner.update_chapters(chapters).await
    }

    async fn fix_source_order(&mut self, chapters: &[Chapter]) -> Result<()> {
        self.check(FailAt::FixSourceOrder)?;
        self.inner.fix_source_order(chapters).await
    }

    async fn update_last_updated(&mut self, manga: &Manga) -> Result<()> {
        self.inner.update_last_updated(manga).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.check(FailAt::Commit)?;
        self.inner.commit().await
    }
}
