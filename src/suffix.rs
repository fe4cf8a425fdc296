//! Link suffix grammar and scanner.
//!
//! A link suffix is the trailing line/column information attached to a path,
//! e.g. `:339:12`, `(339,12)` or `, line 339, column 12`. The grammar is
//! built generatively: a single regex cannot name the same capture group
//! twice, so every repetition of a logical field (row, col, rowEnd, colEnd)
//! across the alternated clauses gets its own numbered group (`row0`,
//! `row1`, ...), and consumers read the numbered variants in fixed priority
//! order.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::text::{byte_index, char_index};
use crate::types::{LinkSuffix, PartialRange};

/// Tracks independent counters per logical field so each emitted group name
/// is unique within the combined pattern.
struct SuffixGroups {
    row: usize,
    col: usize,
    row_end: usize,
    col_end: usize,
}

impl SuffixGroups {
    fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            row_end: 0,
            col_end: 0,
        }
    }

    fn r(&mut self) -> String {
        let group = format!(r"(?P<row{}>\d+)", self.row);
        self.row += 1;
        group
    }

    fn c(&mut self) -> String {
        let group = format!(r"(?P<col{}>\d+)", self.col);
        self.col += 1;
        group
    }

    fn re(&mut self) -> String {
        let group = format!(r"(?P<rowEnd{}>\d+)", self.row_end);
        self.row_end += 1;
        group
    }

    fn ce(&mut self) -> String {
        let group = format!(r"(?P<colEnd{}>\d+)", self.col_end);
        self.col_end += 1;
        group
    }
}

fn generate_link_suffix_regex(eol_only: bool) -> Regex {
    let mut g = SuffixGroups::new();
    let eol_suffix = if eol_only { "$" } else { "" };

    // The comments below use real strings/numbers for readability:
    // - Path    = foo
    // - Row     = 339
    // - Col     = 12
    // - RowEnd  = 341
    // - ColEnd  = 789
    //
    // These all support single quote ' in the place of " and [] in the place
    // of ().
    let line_and_column_clauses = [
        // foo:339
        // foo:339:12
        // foo:339:12-789
        // foo:339:12-341.789
        // foo:339.12
        // foo 339
        // foo 339:12
        // foo 339.12
        // foo#339
        // foo#339:12
        // foo#339.12
        // "foo",339
        // "foo",339:12
        // "foo",339.12
        // "foo",339.12-789
        // "foo",339.12-341.789
        format!(
            r#"(?::|#| |['"],){}([:.]{}(?:-(?:{}\.)?{})?)?{}"#,
            g.r(),
            g.c(),
            g.re(),
            g.ce(),
            eol_suffix
        ),
        // The quotes are optional:
        // "foo", line 339
        // "foo", line 339, col 12
        // "foo", line 339, column 12
        // "foo":line 339
        // "foo": line 339, col 12
        // "foo" on line 339, column 12
        // "foo" line 339 column 12
        // "foo", line 339, character 12
        // "foo", line 339, characters 12-789
        // "foo", lines 339-341
        // "foo", lines 339-341, characters 12-789
        format!(
            r#"['"]?(?:,? |: ?| on )lines? {}(?:-{})?(?:,? (?:col(?:umn)?|characters?) {}(?:-{})?)?{}"#,
            g.r(),
            g.re(),
            g.c(),
            g.ce(),
            eol_suffix
        ),
        // foo(339)
        // foo(339,12)
        // foo(339, 12)
        // foo (339)
        // foo: (339)
        // foo[339]
        format!(
            r":? ?[\[\(]{}(?:, ?{})?[\]\)]{}",
            g.r(),
            g.c(),
            eol_suffix
        ),
    ];

    let suffix_clause = line_and_column_clauses
        .join("|")
        // Allow the non-breaking space code point wherever a space appears.
        .replace(' ', "[\u{00A0} ]");

    Regex::new(&format!("({suffix_clause})")).expect("failed to compile link suffix regex")
}

/// The suffix regex anchored to end of line.
fn link_suffix_regex_eol() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| generate_link_suffix_regex(true))
}

/// The suffix regex matching anywhere in a line.
fn link_suffix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| generate_link_suffix_regex(false))
}

fn first_named<'t>(caps: &Captures<'t>, names: &[&str]) -> Option<regex::Match<'t>> {
    names.iter().find_map(|name| caps.name(*name))
}

fn parse_int_optional(m: Option<regex::Match<'_>>) -> Option<u32> {
    m.and_then(|m| m.as_str().parse().ok())
}

/// Convert a regex capture into a [`LinkSuffix`].
///
/// Returns `None` when the capture carries no overall match, which would be
/// a grammar bug. Absent numbered groups become `None` fields, never a
/// parse failure.
pub fn to_link_suffix(line: &str, caps: &Captures<'_>) -> Option<LinkSuffix> {
    let whole = caps.get(0)?;
    Some(LinkSuffix {
        row: parse_int_optional(first_named(caps, &["row0", "row1", "row2"])),
        col: parse_int_optional(first_named(caps, &["col0", "col1", "col2"])),
        row_end: parse_int_optional(first_named(caps, &["rowEnd0", "rowEnd1"])),
        col_end: parse_int_optional(first_named(caps, &["colEnd0", "colEnd1"])),
        suffix: PartialRange {
            index: char_index(line, whole.start()),
            text: whole.as_str().to_string(),
        },
    })
}

/// Find all link suffixes on a line, in left-to-right order.
///
/// Non-overlap is guaranteed by the regex engine's leftmost non-overlapping
/// iteration, not by any post-processing here.
pub fn detect_link_suffixes(line: &str) -> Vec<LinkSuffix> {
    let mut results = Vec::new();
    for caps in link_suffix_regex().captures_iter(line) {
        match to_link_suffix(line, &caps) {
            Some(suffix) => results.push(suffix),
            None => {
                log::warn!("link suffix grammar produced a match without content; stopping scan");
                break;
            }
        }
    }
    results
}

/// Returns the link suffix terminating `link`, if any.
pub fn get_link_suffix(link: &str) -> Option<LinkSuffix> {
    let caps = link_suffix_regex_eol().captures(link)?;
    to_link_suffix(link, &caps)
}

/// Removes the optional line/column suffix from the end of `link`.
pub fn remove_link_suffix(link: &str) -> &str {
    match get_link_suffix(link) {
        Some(suffix) => &link[..byte_index(link, suffix.suffix.index)],
        None => link,
    }
}

/// Removes any query string from `link`, skipping the `?` in `\\?\` UNC
/// path prefixes.
pub fn remove_link_query_string(link: &str) -> &str {
    let start = if link.starts_with(r"\\?\") { 4 } else { 0 };
    match link[start..].find('?') {
        Some(i) => &link[..start + i],
        None => link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffix_of(line: &str) -> LinkSuffix {
        let suffixes = detect_link_suffixes(line);
        assert_eq!(suffixes.len(), 1, "expected one suffix in {line:?}");
        suffixes.into_iter().next().unwrap()
    }

    #[test]
    fn test_colon_row() {
        let s = suffix_of("foo:339");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, None);
        assert_eq!(s.suffix.text, ":339");
        assert_eq!(s.suffix.index, 3);
    }

    #[test]
    fn test_colon_row_col() {
        let s = suffix_of("foo:339:12");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
    }

    #[test]
    fn test_colon_row_col_colend() {
        let s = suffix_of("foo:339:12-789");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
        assert_eq!(s.row_end, None);
        assert_eq!(s.col_end, Some(789));
    }

    #[test]
    fn test_colon_row_col_rowend_colend() {
        let s = suffix_of("foo:339:12-341.789");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
        assert_eq!(s.row_end, Some(341));
        assert_eq!(s.col_end, Some(789));
    }

    #[test]
    fn test_dot_row_col() {
        let s = suffix_of("foo:339.12");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
    }

    #[test]
    fn test_space_row() {
        let s = suffix_of("foo 339");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, None);
    }

    #[test]
    fn test_hash_row() {
        let s = suffix_of("foo#339");
        assert_eq!(s.row, Some(339));
    }

    #[test]
    fn test_hash_row_col() {
        let s = suffix_of("foo#339:12");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
    }

    #[test]
    fn test_quote_comma_row() {
        let s = suffix_of("\"foo\",339");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.suffix.text, "\",339");
    }

    #[test]
    fn test_line_word() {
        let s = suffix_of("\"foo\", line 339");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, None);
    }

    #[test]
    fn test_line_and_column_words() {
        let s = suffix_of("\"foo\", line 339, column 12");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
    }

    #[test]
    fn test_line_on_variant() {
        let s = suffix_of("\"foo\" on line 339, col 12");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
    }

    #[test]
    fn test_lines_range_characters_range() {
        let s = suffix_of("\"foo\", lines 339-341, characters 12-789");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.row_end, Some(341));
        assert_eq!(s.col, Some(12));
        assert_eq!(s.col_end, Some(789));
    }

    #[test]
    fn test_parens_row() {
        let s = suffix_of("foo(339)");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, None);
    }

    #[test]
    fn test_parens_row_col() {
        let s = suffix_of("foo(339, 12)");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
    }

    #[test]
    fn test_brackets_row_col() {
        let s = suffix_of("foo[339,12]");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
    }

    #[test]
    fn test_non_breaking_space() {
        let s = suffix_of("foo\u{00A0}339:12");
        assert_eq!(s.row, Some(339));
        assert_eq!(s.col, Some(12));
    }

    #[test]
    fn test_suffixes_are_ordered_and_non_overlapping() {
        let suffixes = detect_link_suffixes("a.txt:1:2 b.txt:3:4 c.txt(5)");
        assert_eq!(suffixes.len(), 3);
        for pair in suffixes.windows(2) {
            assert!(pair[0].suffix.end() <= pair[1].suffix.index);
        }
    }

    #[test]
    fn test_no_suffix() {
        assert!(detect_link_suffixes("plain text with no locations").is_empty());
    }

    #[test]
    fn test_get_link_suffix_requires_eol() {
        assert!(get_link_suffix("foo:339 trailing").is_none());
        let s = get_link_suffix("foo:339").unwrap();
        assert_eq!(s.row, Some(339));
    }

    #[test]
    fn test_remove_link_suffix() {
        assert_eq!(remove_link_suffix("foo:339:12"), "foo");
        assert_eq!(remove_link_suffix("foo"), "foo");
    }

    #[test]
    fn test_remove_link_query_string() {
        assert_eq!(remove_link_query_string("foo?a=b"), "foo");
        assert_eq!(remove_link_query_string("foo"), "foo");
        assert_eq!(
            remove_link_query_string(r"\\?\C:\foo?a=b"),
            r"\\?\C:\foo"
        );
    }
}
