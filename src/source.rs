//! Source trait and collection for managing chapter sources.
//!
//! This module defines the core [`Source`] trait that chapter providers implement,
//! the optional [`ChapterNormalizer`] capability used to refresh per-chapter
//! metadata, and the [`Sources`] collection that resolves a manga's
//! `source_id` to its source.
//!
//! # Examples
//!
//! ```rust
//! use hondana::prelude::*;
//! use hondana::error::Result;
//!
//! # async fn example(manga: Manga) -> Result<()> {
//! let sources = Sources::new();
//! // sources.add(LocalSource::new("/library/local"));
//!
//! if let Some(source) = sources.get(&manga.source_id) {
//!     let chapters = source.fetch_chapter_list(&manga).await?;
//!     println!("{} lists {} chapters", source.name(), chapters.len());
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;

use crate::{
    error::Result,
    types::{Manga, SourceChapter},
};

/// How a source obtains its chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Scrapes or queries a remote website or API.
    Http,
    /// Reads chapters from the local file system.
    Local,
    /// Forwards to another service on behalf of an HTTP source.
    Delegated,
}

/// Per-chapter metadata refresh offered by some sources.
///
/// The normalizer runs on every chapter that is about to be inserted or
/// compared against its stored counterpart. A failure aborts the whole sync.
#[async_trait]
pub trait ChapterNormalizer: Send + Sync {
    /// Returns `chapter` with any source-specific corrections applied.
    async fn normalize_chapter(&self, chapter: SourceChapter, manga: &Manga)
    -> Result<SourceChapter>;
}

/// Trait that all chapter sources must implement.
///
/// # Required Methods
///
/// * [`id()`](Source::id) - Unique identifier for the source
/// * [`name()`](Source::name) - Human-readable name
/// * [`fetch_chapter_list()`](Source::fetch_chapter_list) - Get chapters for a manga
///
/// # Implementation Guidelines
///
/// - Return chapters in the order the source presents them, newest first by convention
/// - Never return an empty list to mean "unchanged"; an empty list is an error upstream
/// - Return detailed errors using the [`Error`](crate::Error) types
///
/// # Examples
///
/// ```rust
/// use hondana::prelude::*;
/// use hondana::error::Result;
/// use async_trait::async_trait;
///
/// struct StaticSource;
///
/// #[async_trait]
/// impl Source for StaticSource {
///     fn id(&self) -> &str { "static" }
///     fn name(&self) -> &str { "Static Source" }
///
///     async fn fetch_chapter_list(&self, _manga: &Manga) -> Result<Vec<SourceChapter>> {
///         Ok(vec![SourceChapter::new("/c/1", "Chapter 1")])
///     }
/// }
/// ```
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the unique identifier for this source.
    ///
    /// Manga refer to their source through this identifier.
    fn id(&self) -> &str;

    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Returns how this source obtains its chapters.
    fn kind(&self) -> SourceKind {
        SourceKind::Http
    }

    /// Retrieves the current chapter list of a manga.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`](crate::Error::NotFound) - If the manga doesn't exist
    /// * [`Error::Source`](crate::Error::Source) - For source-specific errors
    async fn fetch_chapter_list(&self, manga: &Manga) -> Result<Vec<SourceChapter>>;

    /// Returns the per-chapter normalizer of this source, if it has one.
    fn normalizer(&self) -> Option<&dyn ChapterNormalizer> {
        None
    }
}

/// A collection of sources indexed by their identifier.
///
/// # Examples
///
/// ```rust
/// use hondana::prelude::*;
///
/// let mut sources = Sources::new();
/// sources.add(LocalSource::new("./local"));
///
/// assert_eq!(sources.len(), 1);
/// assert!(sources.get(LocalSource::ID).is_some());
/// assert!(sources.get("missing").is_none());
/// ```
pub struct Sources {
    sources: Vec<Box<dyn Source>>,
    by_id: HashMap<String, usize>,
}

impl Sources {
    /// Creates a new empty source collection.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Adds a source to the collection.
    ///
    /// A source with the same identifier as an existing one replaces it.
    pub fn add(&mut self, source: impl Source + 'static) -> &mut Self {
        let id = source.id().to_string();
        match self.by_id.get(&id) {
            Some(&index) => self.sources[index] = Box::new(source),
            None => {
                let index = self.sources.len();
                self.sources.push(Box::new(source));
                self.by_id.insert(id, index);
            }
        }
        self
    }

    /// Retrieves a source by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn Source> {
        self.by_id
            .get(id)
            .and_then(|&index| self.sources.get(index))
            .map(|s| s.as_ref())
    }

    /// Returns a list of all source IDs in the collection.
    pub fn list_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Returns the number of sources in the collection.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` if the collection contains no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for Sources {
    fn default() -> Self {
        Self::new()
    }
}
