//! Library-wide chapter updates.
//!
//! The [`LibraryUpdater`] fetches the chapter list of every requested manga
//! from its source and reconciles it with the store. Manga are processed
//! concurrently up to the configured limit; a manga is never reconciled twice
//! at the same time. Failures are collected per manga and never stop the
//! remaining updates.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hondana::prelude::*;
//!
//! # async fn example(library: Vec<Manga>) -> hondana::Result<()> {
//! let config = UpdaterConfig::load("hondana.json")?;
//! let downloads = Arc::new(DownloadDirectory::new(config.download_dir.clone()));
//! let reconciler = Reconciler::new(Arc::new(MemoryStore::new()), downloads);
//!
//! let mut sources = Sources::new();
//! sources.add(LocalSource::new("./local"));
//!
//! let updater = LibraryUpdater::new(reconciler, sources, config);
//! let report = updater.update(library).await;
//! println!("{} new chapters, {} failures", report.new_chapter_count(), report.failed.len());
//! # Ok(())
//! # }
//! ```

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::{
    config::UpdaterConfig,
    error::{Error, Result},
    reconcile::Reconciler,
    source::Sources,
    store::MangaLocks,
    types::{Manga, SyncResult},
};

/// Outcome of a library update.
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Manga with added or deleted chapters, with what changed
    pub updated: Vec<(Manga, SyncResult)>,

    /// Manga whose update failed, with the error message
    pub failed: Vec<(Manga, String)>,
}

impl UpdateReport {
    /// Total number of new chapters across all updated manga.
    pub fn new_chapter_count(&self) -> usize {
        self.updated.iter().map(|(_, result)| result.added.len()).sum()
    }
}

/// Updates the chapters of many manga against their sources.
pub struct LibraryUpdater {
    reconciler: Reconciler,
    sources: Sources,
    config: UpdaterConfig,
    running: MangaLocks,
}

impl LibraryUpdater {
    pub fn new(reconciler: Reconciler, sources: Sources, config: UpdaterConfig) -> Self {
        Self {
            reconciler,
            sources,
            config,
            running: MangaLocks::default(),
        }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// Updates all `manga` and reports the result of each.
    ///
    /// Manga without new or removed chapters appear in neither list of the
    /// report.
    pub async fn update(&self, manga: Vec<Manga>) -> UpdateReport {
        let total = manga.len();
        let results: Vec<(Manga, Result<SyncResult>)> = stream::iter(manga)
            .map(|mut manga| async move {
                let result = self.update_manga(&mut manga).await;
                (manga, result)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = UpdateReport::default();
        for (manga, result) in results {
            match result {
                Ok(result) if result.is_empty() => {}
                Ok(result) => report.updated.push((manga, result)),
                Err(e) => {
                    warn!(manga = manga.id, title = %manga.title, error = %e, "update failed");
                    report.failed.push((manga, e.to_string()));
                }
            }
        }
        report.updated.sort_by_key(|(manga, _)| manga.id);
        report.failed.sort_by_key(|(manga, _)| manga.id);

        info!(
            total,
            updated = report.updated.len(),
            failed = report.failed.len(),
            new_chapters = report.new_chapter_count(),
            "library update finished"
        );
        report
    }

    /// Fetches and reconciles the chapters of one manga.
    ///
    /// Waits while another update of the same manga is running.
    #[instrument(skip_all, fields(manga = manga.id, title = %manga.title))]
    pub async fn update_manga(&self, manga: &mut Manga) -> Result<SyncResult> {
        let _running = self.running.acquire(manga.id).await;

        let source = self
            .sources
            .get(&manga.source_id)
            .ok_or_else(|| Error::not_found(format!("Source: {}", manga.source_id)))?;

        let fetched = source.fetch_chapter_list(manga).await?;
        let result = self.reconciler.reconcile(fetched, manga, source).await?;

        if self.config.delete_removed_downloads && !result.deleted.is_empty() {
            let downloads = self.reconciler.downloads();
            if let Err(e) = downloads.delete_chapters(&result.deleted, manga).await {
                warn!(error = %e, "failed to delete downloads of removed chapters");
            }
        }

        Ok(result)
    }
}
