//! Chapter list reconciliation.
//!
//! [`Reconciler::reconcile`] brings the stored chapters of a manga in line with
//! a freshly fetched chapter list:
//!
//! 1. Fetched descriptors are deduplicated by url (first occurrence wins),
//!    their names sanitized, and their position recorded as `source_order`.
//! 2. Every descriptor is refreshed through the source's normalizer (if any)
//!    and the chapter number recognizer, then classified as an addition or,
//!    when a stored chapter with the same url differs, as a change.
//! 3. Stored chapters missing from the fetched list are deletions.
//! 4. Without additions, changes or deletions only `last_update` may be
//!    written.
//! 5. Otherwise all writes happen in one store transaction. Additions whose
//!    recognized number matches a deleted chapter are treated as re-added:
//!    they inherit the deleted chapter's read and bookmark state and its
//!    earliest `date_fetch`.
//! 6. Re-added chapters and the deletions they replace are not reported.
//!
//! An empty fetched list is rejected with [`Error::EmptyFetch`] before
//! anything is read or written.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    download::DownloadTracker,
    error::{Error, Result},
    recognition::{ChapterRecognition, ChapterRecognizer},
    sanitize::sanitize_chapter_name,
    source::Source,
    store::ChapterStore,
    types::{Chapter, Manga, SourceChapter, SyncResult, now_millis},
};

/// Synchronizes stored chapters with the chapter lists reported by sources.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use hondana::prelude::*;
///
/// # async fn example(source: &dyn Source) -> hondana::Result<()> {
/// let store = Arc::new(MemoryStore::new());
/// let reconciler = Reconciler::new(store, Arc::new(DownloadDirectory::new("./downloads")));
///
/// let mut manga = Manga::new(1, source.id(), "/manga/1", "Berserk");
/// let fetched = source.fetch_chapter_list(&manga).await?;
/// let result = reconciler.reconcile(fetched, &mut manga, source).await?;
/// println!("{} new, {} removed", result.added.len(), result.deleted.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ChapterStore>,
    recognizer: Arc<dyn ChapterRecognizer>,
    downloads: Arc<dyn DownloadTracker>,
}

impl Reconciler {
    /// Creates a reconciler using the default [`ChapterRecognition`].
    pub fn new(store: Arc<dyn ChapterStore>, downloads: Arc<dyn DownloadTracker>) -> Self {
        Self {
            store,
            recognizer: Arc::new(ChapterRecognition),
            downloads,
        }
    }

    /// Replaces the chapter number recognizer.
    pub fn with_recognizer(mut self, recognizer: Arc<dyn ChapterRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn store(&self) -> &Arc<dyn ChapterStore> {
        &self.store
    }

    pub fn downloads(&self) -> &Arc<dyn DownloadTracker> {
        &self.downloads
    }

    /// Reconciles the stored chapters of `manga` with `fetched`.
    ///
    /// On success `manga.last_update` reflects what was persisted. Must not
    /// run concurrently for the same manga.
    ///
    /// # Errors
    ///
    /// * [`Error::EmptyFetch`] - `fetched` is empty; nothing was changed
    /// * [`Error::Store`] - a store write failed; the transaction was rolled back
    /// * Any error of the source's normalizer or the recognizer, unchanged
    #[instrument(skip_all, fields(manga = manga.id, source = source.id()))]
    pub async fn reconcile(
        &self,
        fetched: Vec<SourceChapter>,
        manga: &mut Manga,
        source: &dyn Source,
    ) -> Result<SyncResult> {
        if fetched.is_empty() {
            return Err(Error::empty_fetch(&manga.title));
        }

        let sourced = normalize(fetched, manga);
        let stored = self.store.get_chapters(manga.id).await?;
        let stored_by_url: HashMap<&str, &Chapter> =
            stored.iter().map(|c| (c.url.as_str(), c)).collect();

        let mut to_add = Vec::new();
        let mut to_change = Vec::new();
        for candidate in &sourced {
            let refreshed = self
                .refresh(candidate.to_source(), manga, source)
                .await?;

            match stored_by_url.get(candidate.url.as_str()) {
                None => {
                    let mut chapter = Chapter::from_source(&refreshed, manga.id);
                    chapter.source_order = candidate.source_order;
                    to_add.push(chapter);
                }
                Some(&db_chapter) => {
                    if !differs(db_chapter, &refreshed, candidate.source_order) {
                        continue;
                    }
                    let renamed = db_chapter.name != refreshed.name
                        || db_chapter.scanlator != refreshed.scanlator;
                    if renamed && self.downloads.is_downloaded(db_chapter, manga).await {
                        self.downloads
                            .rename(source, manga, db_chapter, &refreshed)
                            .await?;
                    }
                    let mut chapter = db_chapter.clone();
                    chapter.copy_from(&refreshed);
                    chapter.source_order = candidate.source_order;
                    to_change.push(chapter);
                }
            }
        }

        let sourced_urls: HashSet<&str> = sourced.iter().map(|c| c.url.as_str()).collect();
        let to_delete: Vec<Chapter> = stored
            .iter()
            .filter(|c| !sourced_urls.contains(c.url.as_str()))
            .cloned()
            .collect();

        debug!(
            added = to_add.len(),
            changed = to_change.len(),
            deleted = to_delete.len(),
            "classified chapters"
        );

        if to_add.is_empty() && to_change.is_empty() && to_delete.is_empty() {
            let newest = newest_upload(&stored);
            if newest != manga.last_update {
                let mut updated = manga.clone();
                updated.last_update = newest;
                self.store.update_last_updated(&updated).await?;
                manga.last_update = newest;
            }
            return Ok(SyncResult::default());
        }

        let now = now_millis();
        let mut tx = self.store.begin(manga.id).await?;

        let mut deleted_fetch: HashMap<u64, i64> = HashMap::new();
        let mut deleted_read = HashSet::new();
        let mut deleted_bookmarked = HashSet::new();
        for chapter in &to_delete {
            let key = number_key(chapter.chapter_number);
            deleted_fetch
                .entry(key)
                .and_modify(|fetch| *fetch = (*fetch).min(chapter.date_fetch))
                .or_insert(chapter.date_fetch);
            if chapter.read {
                deleted_read.insert(key);
            }
            if chapter.bookmarked {
                deleted_bookmarked.insert(key);
            }
        }
        if !to_delete.is_empty() {
            tx.delete_chapters(&to_delete).await?;
        }

        // The first listed addition is the newest and gets the latest fetch time
        let count = to_add.len();
        let mut readded = vec![false; count];
        let mut readded_numbers = HashSet::new();
        for (i, chapter) in to_add.iter_mut().enumerate() {
            chapter.date_fetch = now + (count - i) as i64;

            if !chapter.is_recognized_number() {
                continue;
            }
            let key = number_key(chapter.chapter_number);
            if let Some(&fetch) = deleted_fetch.get(&key) {
                chapter.read = deleted_read.contains(&key);
                chapter.bookmarked = deleted_bookmarked.contains(&key);
                chapter.date_fetch = fetch;
                readded[i] = true;
                readded_numbers.insert(key);
            }
        }

        if !to_add.is_empty() {
            let ids = tx.insert_chapters(&to_add).await?;
            if ids.len() != to_add.len() {
                return Err(Error::store(format!(
                    "inserted {} chapters but received {} ids",
                    to_add.len(),
                    ids.len()
                )));
            }
            for (chapter, id) in to_add.iter_mut().zip(ids) {
                chapter.id = Some(id);
            }
        }

        if !to_change.is_empty() {
            tx.update_chapters(&to_change).await?;
        }

        tx.fix_source_order(&sourced).await?;

        let newest = newest_upload(&tx.get_chapters().await?);
        let mut updated = manga.clone();
        if newest != 0 {
            updated.last_update = newest;
        } else if !to_add.is_empty() {
            updated.last_update = now;
        }
        tx.update_last_updated(&updated).await?;

        tx.commit().await?;
        manga.last_update = updated.last_update;

        let added: Vec<Chapter> = to_add
            .into_iter()
            .zip(readded)
            .filter(|(_, readded)| !readded)
            .map(|(chapter, _)| chapter)
            .collect();
        let deleted: Vec<Chapter> = to_delete
            .into_iter()
            .filter(|c| !readded_numbers.contains(&number_key(c.chapter_number)))
            .collect();

        info!(
            added = added.len(),
            deleted = deleted.len(),
            readded = readded_numbers.len(),
            changed = to_change.len(),
            "synced chapters"
        );

        Ok(SyncResult { added, deleted })
    }

    /// Runs the per-chapter metadata refresh and number recognition.
    async fn refresh(
        &self,
        chapter: SourceChapter,
        manga: &Manga,
        source: &dyn Source,
    ) -> Result<SourceChapter> {
        let chapter = match source.normalizer() {
            Some(normalizer) => normalizer.normalize_chapter(chapter, manga).await?,
            None => chapter,
        };
        self.recognizer.recognize_number(chapter, manga)
    }
}

/// Deduplicates descriptors by url and turns them into ordered candidates.
fn normalize(fetched: Vec<SourceChapter>, manga: &Manga) -> Vec<Chapter> {
    let mut seen = HashSet::new();
    fetched
        .into_iter()
        .filter(|descriptor| seen.insert(descriptor.url.clone()))
        .enumerate()
        .map(|(index, mut descriptor)| {
            descriptor.name = sanitize_chapter_name(&descriptor.name, &manga.title);
            let mut chapter = Chapter::from_source(&descriptor, manga.id);
            chapter.source_order = index as i32;
            chapter
        })
        .collect()
}

fn differs(stored: &Chapter, refreshed: &SourceChapter, source_order: i32) -> bool {
    stored.scanlator != refreshed.scanlator
        || stored.name != refreshed.name
        || stored.date_upload != refreshed.date_upload
        || stored.chapter_number != refreshed.chapter_number
        || stored.source_order != source_order
}

fn newest_upload(chapters: &[Chapter]) -> i64 {
    chapters.iter().map(|c| c.date_upload).max().unwrap_or(0)
}

// Adding 0.0 folds -0.0 into 0.0 so both hash alike
fn number_key(number: f64) -> u64 {
    (number + 0.0).to_bits()
}
