//! Chapter number recognition.
//!
//! Sources frequently report chapters without a usable number, or only as
//! part of a free-form name such as `"Vol.2 Ch.10.5 - The Return"`. The
//! [`ChapterRecognition`] recognizer extracts a floating point number from the
//! chapter name, ignoring the manga title and volume or season markers.
//!
//! Sub-chapter suffixes map onto the fractional part:
//!
//! | suffix    | value |
//! |-----------|-------|
//! | `.5`      | `.5`  |
//! | `a`..`i`  | `.1`..`.9` |
//! | `extra`   | `.99` |
//! | `omake`   | `.98` |
//! | `special` | `.97` |
//!
//! # Examples
//!
//! ```rust
//! use hondana::recognition::parse_chapter_number;
//!
//! assert_eq!(parse_chapter_number("One Piece", "One Piece 1045", None), 1045.0);
//! assert_eq!(parse_chapter_number("Title", "Vol.2 Ch.10.5", None), 10.5);
//! assert_eq!(parse_chapter_number("Title", "Oneshot", None), -1.0);
//! ```

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{
    error::Result,
    types::{Manga, NUMBERLESS_CHAPTER_NUMBER, SourceChapter, UNRECOGNIZED_CHAPTER_NUMBER},
};

const NUMBER_PATTERN: &str = r"([0-9]+)(\.[0-9]+)?(\.?[a-z]+)?";

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(NUMBER_PATTERN).expect("Invalid chapter number pattern"));

// Number directly preceded by "ch."
static BASIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"ch\. *{}", NUMBER_PATTERN)).expect("Invalid chapter prefix pattern")
});

// Volume, version and season markers
static UNWANTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:v|ver|vol|version|volume|season|s)[^a-z]?[0-9]+")
        .expect("Invalid volume marker pattern")
});

static UNWANTED_WHITESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s(extra|special|omake)").expect("Invalid sub-chapter marker pattern")
});

/// Infers the chapter number of a descriptor.
///
/// Implementations must not replace a number the source already provided.
pub trait ChapterRecognizer: Send + Sync {
    /// Returns `chapter` with `chapter_number` set.
    fn recognize_number(&self, chapter: SourceChapter, manga: &Manga) -> Result<SourceChapter>;
}

/// Name-based chapter number recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChapterRecognition;

impl ChapterRecognizer for ChapterRecognition {
    fn recognize_number(
        &self,
        mut chapter: SourceChapter,
        manga: &Manga,
    ) -> Result<SourceChapter> {
        chapter.chapter_number =
            parse_chapter_number(&manga.title, &chapter.name, Some(chapter.chapter_number));
        Ok(chapter)
    }
}

/// Parses a chapter number out of `chapter_name`.
///
/// An `existing` number that is already recognized, or explicitly marked as
/// numberless, is returned unchanged. When no number can be found the result
/// is `existing`, or the unrecognized sentinel.
pub fn parse_chapter_number(manga_title: &str, chapter_name: &str, existing: Option<f64>) -> f64 {
    if let Some(number) = existing {
        if number == NUMBERLESS_CHAPTER_NUMBER || number > UNRECOGNIZED_CHAPTER_NUMBER {
            return number;
        }
    }

    let lowered = chapter_name.to_lowercase();
    let title = manga_title.to_lowercase();
    let without_title = if title.is_empty() {
        lowered
    } else {
        lowered.replace(&title, "")
    };
    let cleaned = without_title.trim().replace([',', '-'], ".");
    let cleaned = UNWANTED_WHITESPACE.replace_all(&cleaned, "$1");

    let mut occurrences = NUMBER.captures_iter(&cleaned);
    let Some(first) = occurrences.next() else {
        return existing.unwrap_or(UNRECOGNIZED_CHAPTER_NUMBER);
    };

    if occurrences.next().is_some() {
        let name = UNWANTED.replace_all(&cleaned, "");
        if let Some(captures) = BASIC.captures(&name) {
            return number_from_captures(&captures);
        }
        if let Some(captures) = NUMBER.captures(&name) {
            return number_from_captures(&captures);
        }
    }

    number_from_captures(&first)
}

fn number_from_captures(captures: &Captures<'_>) -> f64 {
    let initial = captures
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let decimal = captures.get(2).map(|m| m.as_str());
    let alpha = captures.get(3).map(|m| m.as_str());

    initial + sub_chapter(decimal, alpha)
}

fn sub_chapter(decimal: Option<&str>, alpha: Option<&str>) -> f64 {
    if let Some(decimal) = decimal.filter(|d| !d.is_empty()) {
        return format!("0{}", decimal).parse().unwrap_or(0.0);
    }

    if let Some(alpha) = alpha.filter(|a| !a.is_empty()) {
        if alpha.contains("extra") {
            return 0.99;
        }
        if alpha.contains("omake") {
            return 0.98;
        }
        if alpha.contains("special") {
            return 0.97;
        }

        let trimmed = alpha.trim_start_matches('.');
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return alpha_postfix(c);
        }
    }

    0.0
}

// 'a' => .1, 'b' => .2, ..., anything past 'i' is ignored
fn alpha_postfix(alpha: char) -> f64 {
    let number = alpha as u32 - ('a' as u32 - 1);
    if number >= 10 {
        return 0.0;
    }
    number as f64 / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> f64 {
        parse_chapter_number("Mokushiroku Alice", name, None)
    }

    #[test]
    fn test_basic_prefix() {
        assert_eq!(parse("Ch.4: Misrepresentation"), 4.0);
        assert_eq!(parse("Ch. 12 Eternity"), 12.0);
        assert_eq!(parse("Chapter 7"), 7.0);
    }

    #[test]
    fn test_volume_is_ignored() {
        assert_eq!(parse("Vol.1 Ch.4: Misrepresentation"), 4.0);
        assert_eq!(parse("Vol. 1 Ch. 4: Misrepresentation"), 4.0);
        assert_eq!(parse("Season 2 Chapter 30"), 30.0);
    }

    #[test]
    fn test_title_is_removed() {
        assert_eq!(parse("Mokushiroku Alice Vol.1 Ch. 4"), 4.0);
        assert_eq!(
            parse_chapter_number("Solanin 2", "Solanin 2 - 015", None),
            15.0
        );
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_decimals() {
        assert_close(parse("Ch.10.5 Side Story"), 10.5);
        assert_close(parse("Chapter 3,5"), 3.5);
        assert_close(parse("Chapter 3-5"), 3.5);
    }

    #[test]
    fn test_alpha_suffixes() {
        assert_close(parse("Chapter 4a"), 4.1);
        assert_close(parse("Chapter 4.b"), 4.2);
        assert_close(parse("Chapter 4 extra"), 4.99);
        assert_close(parse("Chapter 4 omake"), 4.98);
        assert_close(parse("Chapter 4 special"), 4.97);
        assert_close(parse("Chapter 4z"), 4.0);
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(parse("Prologue"), UNRECOGNIZED_CHAPTER_NUMBER);
        assert_eq!(
            parse_chapter_number("Title", "Oneshot", Some(UNRECOGNIZED_CHAPTER_NUMBER)),
            UNRECOGNIZED_CHAPTER_NUMBER
        );
    }

    #[test]
    fn test_existing_number_is_kept() {
        assert_eq!(parse_chapter_number("Title", "Chapter 9", Some(12.0)), 12.0);
        assert_eq!(parse_chapter_number("Title", "Chapter 9", Some(0.0)), 0.0);
        assert_eq!(
            parse_chapter_number("Title", "Chapter 9", Some(NUMBERLESS_CHAPTER_NUMBER)),
            NUMBERLESS_CHAPTER_NUMBER
        );
        assert_eq!(
            parse_chapter_number("Title", "Chapter 9", Some(UNRECOGNIZED_CHAPTER_NUMBER)),
            9.0
        );
    }

    #[test]
    fn test_recognizer_sets_number() {
        let manga = Manga::new(1, "src", "/m/1", "Title");
        let chapter = ChapterRecognition
            .recognize_number(SourceChapter::new("/c/2", "Title - Ch. 2"), &manga)
            .unwrap();
        assert_eq!(chapter.chapter_number, 2.0);
    }
}
