//! Display orderings for a manga's chapters.
//!
//! # Examples
//!
//! ```rust
//! use hondana::sort::{ChapterSort, sort_chapters};
//! use hondana::types::{Chapter, SourceChapter};
//!
//! let mut chapters: Vec<Chapter> = (0..3)
//!     .map(|i| {
//!         let mut chapter = Chapter::from_source(&SourceChapter::new(format!("/c/{i}"), "c"), 1);
//!         chapter.source_order = i;
//!         chapter
//!     })
//!     .collect();
//!
//! sort_chapters(&mut chapters, ChapterSort::SourceOrder, true);
//! assert_eq!(chapters[0].source_order, 2);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::Chapter;

/// Defines how chapters are ordered.
///
/// # Variants
///
/// * `SourceOrder` - Position reported by the source, first listed first
/// * `Number` - Chapter number, lowest first
/// * `UploadDate` - Publish time, oldest first
/// * `FetchDate` - Local discovery time, oldest first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterSort {
    #[default]
    SourceOrder,
    Number,
    UploadDate,
    FetchDate,
}

impl ChapterSort {
    /// Compares two chapters in ascending order.
    pub fn compare(self, a: &Chapter, b: &Chapter) -> Ordering {
        let primary = match self {
            ChapterSort::SourceOrder => a.source_order.cmp(&b.source_order),
            ChapterSort::Number => a.chapter_number.total_cmp(&b.chapter_number),
            ChapterSort::UploadDate => a.date_upload.cmp(&b.date_upload),
            ChapterSort::FetchDate => a.date_fetch.cmp(&b.date_fetch),
        };
        // Ties fall back to the source's own order
        primary.then_with(|| a.source_order.cmp(&b.source_order))
    }
}

/// Sorts `chapters` in place.
pub fn sort_chapters(chapters: &mut [Chapter], sort: ChapterSort, descending: bool) {
    chapters.sort_by(|a, b| {
        let ordering = sort.compare(a, b);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}
