//! Core data types for manga, chapters, and chapter descriptors.
//!
//! This module defines the fundamental data structures used throughout Hondana:
//!
//! - [`Manga`] - A library entry owning a list of chapters
//! - [`Chapter`] - A stored chapter with its read and download-relevant state
//! - [`SourceChapter`] - A raw chapter descriptor as returned by a source
//! - [`SyncResult`] - The externally visible outcome of one synchronization
//!
//! # Examples
//!
//! ```rust
//! use hondana::types::*;
//!
//! let descriptor = SourceChapterBuilder::default()
//!     .url("/chapter/1")
//!     .name("Chapter 1: Romance Dawn")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(descriptor.chapter_number, UNRECOGNIZED_CHAPTER_NUMBER);
//! assert_eq!(descriptor.date_upload, 0);
//! ```

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Chapter number assigned to chapters whose number could not be recognized.
pub const UNRECOGNIZED_CHAPTER_NUMBER: f64 = -1.0;

/// Chapter number a source uses to declare a chapter as deliberately unnumbered.
///
/// The recognizer never replaces this value.
pub const NUMBERLESS_CHAPTER_NUMBER: f64 = -2.0;

/// Returns `true` if `number` is a real chapter number rather than a sentinel.
pub fn is_recognized_number(number: f64) -> bool {
    number >= 0.0
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A manga entry in the local library.
///
/// Hondana only reads the manga's identity and title, and writes
/// `last_update` during a synchronization.
///
/// # Fields
///
/// * `id` - Store-assigned identifier, used to key chapters
/// * `source_id` - Identifier of the source the manga is read from
/// * `url` - Natural key of the manga within its source
/// * `title` - Title, used to sanitize chapter names
/// * `last_update` - Newest known chapter publish time (epoch millis)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub struct Manga {
    /// Store-assigned identifier
    pub id: i64,

    /// Source identifier this manga is read from
    pub source_id: String,

    /// Url of the manga within its source
    pub url: String,

    /// Main title
    pub title: String,

    /// Latest known chapter publish time, epoch millis
    #[serde(default)]
    pub last_update: i64,
}

impl Manga {
    /// Creates a manga with no known update time.
    pub fn new(
        id: i64,
        source_id: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source_id: source_id.into(),
            url: url.into(),
            title: title.into(),
            last_update: 0,
        }
    }
}

/// A chapter stored in the library.
///
/// The `url` is the natural key of a chapter and is unique among the chapters
/// of one manga. The `id` stays `None` until the store assigns one.
///
/// # Examples
///
/// ```rust
/// use hondana::types::{Chapter, SourceChapter};
///
/// let descriptor = SourceChapter::new("/c/10", "Chapter 10");
/// let chapter = Chapter::from_source(&descriptor, 7);
///
/// assert_eq!(chapter.manga_id, 7);
/// assert!(chapter.id.is_none());
/// assert!(!chapter.read);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub struct Chapter {
    /// Store-assigned identifier
    pub id: Option<i64>,

    /// Owning manga
    pub manga_id: i64,

    /// Natural key within the manga
    pub url: String,

    /// Display name
    pub name: String,

    /// Scanlation group attribution
    pub scanlator: Option<String>,

    /// Chapter number, or one of the sentinel values
    pub chapter_number: f64,

    /// Publish time reported by the source, 0 if unknown
    pub date_upload: i64,

    /// Time the chapter was first discovered locally
    pub date_fetch: i64,

    /// Position in the latest chapter list reported by the source
    pub source_order: i32,

    pub read: bool,

    pub bookmarked: bool,

    pub last_page_read: i32,
}

impl Chapter {
    /// Builds an unsaved chapter from a source descriptor.
    pub fn from_source(descriptor: &SourceChapter, manga_id: i64) -> Self {
        Self {
            id: None,
            manga_id,
            url: descriptor.url.clone(),
            name: descriptor.name.clone(),
            scanlator: descriptor.scanlator.clone(),
            chapter_number: descriptor.chapter_number,
            date_upload: descriptor.date_upload,
            date_fetch: 0,
            source_order: 0,
            read: false,
            bookmarked: false,
            last_page_read: 0,
        }
    }

    /// Returns `true` if the chapter carries a real chapter number.
    pub fn is_recognized_number(&self) -> bool {
        is_recognized_number(self.chapter_number)
    }

    /// Overwrites the source-provided fields with those of `descriptor`.
    ///
    /// Reading state and `date_fetch` are left as they are.
    pub fn copy_from(&mut self, descriptor: &SourceChapter) {
        self.name = descriptor.name.clone();
        self.scanlator = descriptor.scanlator.clone();
        self.chapter_number = descriptor.chapter_number;
        self.date_upload = descriptor.date_upload;
    }

    /// The descriptor view of this chapter's source-provided fields.
    pub fn to_source(&self) -> SourceChapter {
        SourceChapter {
            url: self.url.clone(),
            name: self.name.clone(),
            scanlator: self.scanlator.clone(),
            chapter_number: self.chapter_number,
            date_upload: self.date_upload,
        }
    }
}

/// A raw chapter descriptor as returned by a [`Source`](crate::Source).
///
/// Descriptors are normalized into [`Chapter`]s during synchronization.
///
/// # Builder Usage
///
/// ```rust
/// use hondana::types::SourceChapterBuilder;
///
/// let descriptor = SourceChapterBuilder::default()
///     .url("/chapter/12")
///     .name("Ch. 12")
///     .scanlator(Some("Group".to_string()))
///     .date_upload(1_700_000_000_000i64)
///     .build()
///     .unwrap();
///
/// assert_eq!(descriptor.scanlator.as_deref(), Some("Group"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct SourceChapter {
    pub url: String,
    pub name: String,
    #[builder(default)]
    #[serde(default)]
    pub scanlator: Option<String>,
    #[builder(default = "UNRECOGNIZED_CHAPTER_NUMBER")]
    #[serde(default = "default_chapter_number")]
    pub chapter_number: f64,
    #[builder(default)]
    #[serde(default)]
    pub date_upload: i64,
}

fn default_chapter_number() -> f64 {
    UNRECOGNIZED_CHAPTER_NUMBER
}

impl SourceChapter {
    /// Creates a descriptor with only a url and a name.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            scanlator: None,
            chapter_number: UNRECOGNIZED_CHAPTER_NUMBER,
            date_upload: 0,
        }
    }
}

/// Outcome of a chapter synchronization.
///
/// Chapters whose metadata merely changed are reported in neither list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Chapters that are new to the library
    pub added: Vec<Chapter>,

    /// Chapters the source no longer lists
    pub deleted: Vec<Chapter>,
}

impl SyncResult {
    /// Returns `true` if nothing was added or deleted.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_numbers() {
        assert!(is_recognized_number(0.0));
        assert!(is_recognized_number(12.5));
        assert!(!is_recognized_number(UNRECOGNIZED_CHAPTER_NUMBER));
        assert!(!is_recognized_number(NUMBERLESS_CHAPTER_NUMBER));
    }

    #[test]
    fn test_copy_from_keeps_reading_state() {
        let mut chapter = Chapter::from_source(&SourceChapter::new("/c/1", "Old"), 1);
        chapter.read = true;
        chapter.bookmarked = true;
        chapter.last_page_read = 14;
        chapter.date_fetch = 99;

        let mut descriptor = SourceChapter::new("/c/1", "New");
        descriptor.chapter_number = 1.0;
        descriptor.date_upload = 1234;
        chapter.copy_from(&descriptor);

        assert_eq!(chapter.name, "New");
        assert_eq!(chapter.chapter_number, 1.0);
        assert_eq!(chapter.date_upload, 1234);
        assert!(chapter.read);
        assert!(chapter.bookmarked);
        assert_eq!(chapter.last_page_read, 14);
        assert_eq!(chapter.date_fetch, 99);
    }

    #[test]
    fn test_descriptor_deserialize_defaults() {
        let descriptor: SourceChapter =
            serde_json::from_str(r#"{"url": "/c/3", "name": "Three"}"#).unwrap();
        assert_eq!(descriptor.chapter_number, UNRECOGNIZED_CHAPTER_NUMBER);
        assert_eq!(descriptor.scanlator, None);
        assert_eq!(descriptor.date_upload, 0);
    }
}
