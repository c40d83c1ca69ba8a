//! Download state of chapters on disk.
//!
//! The reconciliation engine only needs to know whether a chapter is
//! downloaded and to rename its files when the chapter's name or scanlator
//! changes. [`DownloadDirectory`] implements this for the usual layout:
//!
//! ```text
//! <root>/<source id>/<manga title>/<scanlator>_<chapter name>/
//! <root>/<source id>/<manga title>/<scanlator>_<chapter name>.cbz
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    error::Result,
    sanitize::sanitize_filename,
    source::Source,
    types::{Chapter, Manga, SourceChapter},
};

const ARCHIVE_EXTENSION: &str = "cbz";

/// Tracks which chapters are downloaded and keeps their files in sync.
#[async_trait]
pub trait DownloadTracker: Send + Sync {
    /// Returns `true` if `chapter` of `manga` has been downloaded.
    async fn is_downloaded(&self, chapter: &Chapter, manga: &Manga) -> bool;

    /// Moves the downloaded files of `old` to the name derived from `new`.
    async fn rename(
        &self,
        source: &dyn Source,
        manga: &Manga,
        old: &Chapter,
        new: &SourceChapter,
    ) -> Result<()>;

    /// Removes the downloaded files of `chapters`. Missing files are ignored.
    async fn delete_chapters(&self, chapters: &[Chapter], manga: &Manga) -> Result<()>;
}

/// Returns the directory name of a downloaded chapter.
///
/// # Examples
///
/// ```rust
/// use hondana::download::chapter_dir_name;
///
/// assert_eq!(chapter_dir_name("Chapter 1", Some("Group")), "Group_Chapter 1");
/// assert_eq!(chapter_dir_name("Chapter 1: Start", None), "Chapter 1_ Start");
/// ```
pub fn chapter_dir_name(name: &str, scanlator: Option<&str>) -> String {
    match scanlator.filter(|s| !s.trim().is_empty()) {
        Some(scanlator) => sanitize_filename(&format!("{}_{}", scanlator, name)),
        None => sanitize_filename(name),
    }
}

/// Downloads stored in a directory tree on the local file system.
#[derive(Debug, Clone)]
pub struct DownloadDirectory {
    root: PathBuf,
}

impl DownloadDirectory {
    /// Creates a tracker rooted at `root`. The directory does not need to exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory of all downloads.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the downloaded chapters of `manga`.
    pub fn manga_dir(&self, manga: &Manga) -> PathBuf {
        self.root
            .join(sanitize_filename(&manga.source_id))
            .join(sanitize_filename(&manga.title))
    }

    /// Candidate paths of a downloaded chapter: plain directory and archive.
    fn chapter_paths(&self, manga: &Manga, name: &str, scanlator: Option<&str>) -> [PathBuf; 2] {
        let base = self.manga_dir(manga);
        let dir_name = chapter_dir_name(name, scanlator);
        [
            base.join(&dir_name),
            base.join(format!("{}.{}", dir_name, ARCHIVE_EXTENSION)),
        ]
    }
}

#[async_trait]
impl DownloadTracker for DownloadDirectory {
    async fn is_downloaded(&self, chapter: &Chapter, manga: &Manga) -> bool {
        for path in self.chapter_paths(manga, &chapter.name, chapter.scanlator.as_deref()) {
            if fs::try_exists(&path).await.unwrap_or(false) {
                return true;
            }
        }
        false
    }

    async fn rename(
        &self,
        source: &dyn Source,
        manga: &Manga,
        old: &Chapter,
        new: &SourceChapter,
    ) -> Result<()> {
        let old_paths = self.chapter_paths(manga, &old.name, old.scanlator.as_deref());
        let new_paths = self.chapter_paths(manga, &new.name, new.scanlator.as_deref());

        for (from, to) in old_paths.iter().zip(new_paths.iter()) {
            if from == to || !fs::try_exists(from).await? {
                continue;
            }
            if fs::try_exists(to).await? {
                warn!(
                    source = source.id(),
                    from = %from.display(),
                    to = %to.display(),
                    "download rename target already exists, keeping old name"
                );
                continue;
            }
            fs::rename(from, to).await?;
            debug!(from = %from.display(), to = %to.display(), "renamed chapter download");
        }
        Ok(())
    }

    async fn delete_chapters(&self, chapters: &[Chapter], manga: &Manga) -> Result<()> {
        for chapter in chapters {
            let [dir, archive] =
                self.chapter_paths(manga, &chapter.name, chapter.scanlator.as_deref());
            if fs::try_exists(&dir).await? {
                fs::remove_dir_all(&dir).await?;
            }
            if fs::try_exists(&archive).await? {
                fs::remove_file(&archive).await?;
            }
        }
        Ok(())
    }
}
