//! Line and bullet classification shared by both structuring strategies.

/// Marker prefixed to a line to turn it into a bullet.
pub const BULLET: &str = "- ";

/// Prefix of a level-one heading (the title line).
const TITLE_HEADING: &str = "# ";

/// Every character treated as a line boundary: LF, CR, VT, FF, the file,
/// group and record separators, NEL, and the Unicode line and paragraph
/// separators.
pub const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\u{0b}', '\u{0c}', '\u{1c}', '\u{1d}', '\u{1e}', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Split into lines, trim each, drop blanks.
///
/// CRLF splits into a line and an empty remainder, which is dropped, so it
/// produces the same sequence as LF.
pub fn normalize_lines(text: &str) -> Vec<&str> {
    text.split(LINE_BREAKS)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Level-one heading such as `# Project Title`.
pub fn is_title_heading(line: &str) -> bool {
    line.starts_with(TITLE_HEADING)
}

/// Line opens a section (`## …` with the default prefix).
pub fn is_section_header(line: &str, prefix: &str) -> bool {
    line.starts_with(prefix)
}

/// Title-block bullet test: any line starting with `-` or `*`.
pub fn is_loose_bullet(line: &str) -> bool {
    line.starts_with('-') || line.starts_with('*')
}

/// Section-content list test: `- `, `* `, or an item starting with any
/// Unicode digit (`1.`, `٣.`, `²`).
pub fn is_list_item(line: &str) -> bool {
    line.starts_with("- ")
        || line.starts_with("* ")
        || line.chars().next().is_some_and(char::is_numeric)
}

/// Prefix `line` with the bullet marker.
pub fn promote(line: &str) -> String {
    format!("{BULLET}{line}")
}

/// Keep a title-block line that already looks like a bullet, promote the rest.
pub fn title_line(line: &str) -> String {
    if is_loose_bullet(line) {
        line.to_string()
    } else {
        promote(line)
    }
}

/// Keep a section line that is already a list item, promote the rest.
pub fn content_line(line: &str) -> String {
    if is_list_item(line) {
        line.to_string()
    } else {
        promote(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_drops_blanks() {
        let lines = normalize_lines("  a  \n\n\t\nb\r\n  c\rd");
        assert_eq!(lines, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn normalize_splits_on_unicode_separators() {
        let lines = normalize_lines("## Goals\u{2028}- a\u{2029}b\u{85}c\u{0b}d\u{0c}e\u{1e}f");
        assert_eq!(lines, vec!["## Goals", "- a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn normalize_empty() {
        assert!(normalize_lines("").is_empty());
        assert!(normalize_lines(" \n \r\n ").is_empty());
    }

    #[test]
    fn title_heading_only_level_one() {
        assert!(is_title_heading("# Project Title"));
        assert!(!is_title_heading("## Goals"));
        assert!(!is_title_heading("#hashtag"));
    }

    #[test]
    fn loose_bullets() {
        assert!(is_loose_bullet("- item"));
        assert!(is_loose_bullet("-item"));
        assert!(is_loose_bullet("* item"));
        assert!(!is_loose_bullet("1. item"));
    }

    #[test]
    fn list_items_need_space_or_digit() {
        assert!(is_list_item("- item"));
        assert!(is_list_item("* item"));
        assert!(is_list_item("1. first"));
        assert!(is_list_item("2024 roadmap"));
        assert!(is_list_item("٣. arabic-indic"));
        assert!(is_list_item("² superscript"));
        assert!(!is_list_item("-item"));
        assert!(!is_list_item("plain text"));
    }

    #[test]
    fn content_and_title_formatting() {
        assert_eq!(content_line("plain"), "- plain");
        assert_eq!(content_line("3. step"), "3. step");
        assert_eq!(content_line("-tight"), "- -tight");
        assert_eq!(title_line("-tight"), "-tight");
        assert_eq!(title_line("Kickoff notes"), "- Kickoff notes");
    }
}
