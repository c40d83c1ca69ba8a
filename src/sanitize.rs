//! Name cleanup for chapter display names and on-disk paths.

/// Strips a leading manga title and separator noise from a chapter name.
///
/// Sources often prefix every chapter with the series title
/// (`"One Piece - Chapter 1"`). The title prefix is removed together with the
/// whitespace and `- _ , :` separators around it. If nothing would remain, the
/// trimmed original name is returned instead.
///
/// # Examples
///
/// ```rust
/// use hondana::sanitize::sanitize_chapter_name;
///
/// assert_eq!(sanitize_chapter_name("One Piece - Chapter 1", "One Piece"), "Chapter 1");
/// assert_eq!(sanitize_chapter_name("  Chapter 2: Start ", "One Piece"), "Chapter 2: Start");
/// assert_eq!(sanitize_chapter_name("One Piece", "One Piece"), "One Piece");
/// ```
pub fn sanitize_chapter_name(name: &str, manga_title: &str) -> String {
    let trimmed = name.trim();
    let without_title = if manga_title.is_empty() {
        trimmed
    } else {
        trimmed.strip_prefix(manga_title).unwrap_or(trimmed)
    };

    let sanitized = without_title.trim_matches(is_chapter_trim_char);
    if sanitized.is_empty() {
        trimmed.to_string()
    } else {
        sanitized.to_string()
    }
}

fn is_chapter_trim_char(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | ',' | ':')
}

/// Sanitizes a filename by replacing invalid characters.
///
/// This function removes or replaces characters that are not allowed in filenames
/// on most operating systems.
///
/// # Examples
///
/// ```rust
/// use hondana::sanitize::sanitize_filename;
///
/// let clean = sanitize_filename("Chapter: 1 - The Beginning!");
/// assert_eq!(clean, "Chapter_ 1 - The Beginning!");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    let mut sanitized: String = name
        .chars()
        .map(|c| if invalid_chars.contains(&c) { '_' } else { c })
        .collect();

    // Leading dots would hide the entry or escape the parent directory
    sanitized = sanitized.trim().trim_start_matches('.').to_string();
    if sanitized.len() > 200 {
        let mut end = 200;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized.truncate(end);
    }

    if sanitized.is_empty() {
        sanitized = "untitled".to_string();
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_chapter_name() {
        assert_eq!(
            sanitize_chapter_name("Berserk: Chapter 375", "Berserk"),
            "Chapter 375"
        );
        assert_eq!(
            sanitize_chapter_name("Berserk_-_Chapter 1", "Berserk"),
            "Chapter 1"
        );
        assert_eq!(sanitize_chapter_name("Chapter 10", ""), "Chapter 10");
        // Title in the middle is left alone
        assert_eq!(
            sanitize_chapter_name("Chapter 3 of Berserk", "Berserk"),
            "Chapter 3 of Berserk"
        );
        assert_eq!(sanitize_chapter_name("  -- ", "Berserk"), "--");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("normal_file.txt"), "normal_file.txt");
        assert_eq!(
            sanitize_filename("file/with\\bad:chars"),
            "file_with_bad_chars"
        );
        assert_eq!(sanitize_filename(""), "untitled");
        assert_eq!(sanitize_filename(".."), "untitled");

        let long_name = "あ".repeat(150);
        let sanitized = sanitize_filename(&long_name);
        assert!(sanitized.len() <= 200);
    }
}
