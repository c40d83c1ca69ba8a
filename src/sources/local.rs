use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;

use crate::{
    error::{Error, Result},
    recognition::parse_chapter_number,
    sanitize::sanitize_filename,
    source::{Source, SourceKind},
    types::{Manga, SourceChapter},
};

const CHAPTER_EXTENSIONS: [&str; 5] = ["zip", "cbz", "rar", "cbr", "epub"];

/// Source reading chapters from a local directory tree.
///
/// A manga is a directory under the root, named after the manga's `url`.
/// Every subdirectory and every archive inside it is a chapter.
///
/// ```text
/// <root>/<manga url>/Chapter 1/
/// <root>/<manga url>/Chapter 2.cbz
/// ```
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub const ID: &'static str = "local";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn manga_dir(&self, manga: &Manga) -> PathBuf {
        self.root.join(sanitize_filename(manga.url.trim_matches('/')))
    }
}

fn is_chapter_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            CHAPTER_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[async_trait]
impl Source for LocalSource {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Local source"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn fetch_chapter_list(&self, manga: &Manga) -> Result<Vec<SourceChapter>> {
        let dir = self.manga_dir(manga);
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            Error::source(
                self.id(),
                format!("Failed to read {}: {}", dir.display(), e),
            )
        })?;

        let mut chapters = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = entry.metadata().await?;
            if !metadata.is_dir() && !is_chapter_archive(&path) {
                continue;
            }
            // Hidden entries are never chapters
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') {
                continue;
            }

            let name = if metadata.is_dir() {
                file_name.clone()
            } else {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file_name.clone())
            };
            let date_upload = metadata
                .modified()
                .ok()
                .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);

            chapters.push(SourceChapter {
                url: format!("{}/{}", manga.url.trim_end_matches('/'), file_name),
                chapter_number: parse_chapter_number(&manga.title, &name, None),
                name,
                scanlator: None,
                date_upload,
            });
        }

        // Newest first, like remote sources
        chapters.sort_by(|a, b| {
            b.chapter_number
                .total_cmp(&a.chapter_number)
                .then_with(|| b.name.to_lowercase().cmp(&a.name.to_lowercase()))
        });

        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_directories_and_archives() {
        let dir = tempfile::tempdir().unwrap();
        let manga_dir = dir.path().join("berserk");
        fs::create_dir_all(manga_dir.join("Chapter 1")).await.unwrap();
        fs::write(manga_dir.join("Chapter 2.cbz"), b"zip").await.unwrap();
        fs::write(manga_dir.join("cover.jpg"), b"jpg").await.unwrap();
        fs::write(manga_dir.join(".hidden.cbz"), b"zip").await.unwrap();

        let source = LocalSource::new(dir.path());
        let manga = Manga::new(1, LocalSource::ID, "/berserk", "Berserk");
        let chapters = source.fetch_chapter_list(&manga).await.unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].url, "/berserk/Chapter 2.cbz");
        assert_eq!(chapters[0].name, "Chapter 2");
        assert_eq!(chapters[0].chapter_number, 2.0);
        assert_eq!(chapters[1].url, "/berserk/Chapter 1");
        assert_eq!(chapters[1].chapter_number, 1.0);
        assert_eq!(source.kind(), SourceKind::Local);
    }

    #[tokio::test]
    async fn test_missing_directory_is_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalSource::new(dir.path());
        let manga = Manga::new(1, LocalSource::ID, "/nothing", "Nothing");

        let result = source.fetch_chapter_list(&manga).await;
        assert!(matches!(result, Err(Error::Source { .. })));
    }
}
