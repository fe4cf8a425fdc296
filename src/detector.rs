//! Local link detection over a wrapped-line group.
//!
//! The orchestrator runs a layered strategy per group: the primary
//! suffix+path pipeline, then compiler-error-style fallback patterns if the
//! primary pass found nothing, then a styled-text heuristic as a last
//! resort. Every candidate is validated against the OS path anchor and
//! `file://` URL construction before it becomes a link; validation failures
//! are silent and the engine never errors to its caller.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::buffer::{line_content, ranges_by_attr, Buffer, BufferLine};
use crate::coords::convert_link_range_to_buffer;
use crate::detect::detect_links;
use crate::path_grammar::link_local_start_regex;
use crate::text::{char_index, slice_chars};
use crate::types::{BufferRange, OperatingSystem, StringRange, TerminalSimpleLink};

/// The max line length to try extract links from.
pub const MAX_LINE_LENGTH: usize = 2000;

/// The maximum number of links in a line to resolve. This limit is put in
/// place to bound worst-case work per call.
pub const MAX_RESOLVED_LINKS_IN_LINE: usize = 10;

/// The maximum length of a link to resolve.
pub const MAX_RESOLVED_LINK_LENGTH: usize = 1024;

/// The maximum link length possible for this detector; this puts a cap on
/// how much of a wrapped line to consider to prevent performance problems.
///
/// Chosen as a reasonable maximum given the tradeoff between performance
/// and how likely it is to encounter such a line. Reference points: the old
/// Windows max path length is 260, the Linux `PATH_MAX` is 4096.
pub const MAX_LINK_LENGTH: usize = 500;

/// Fallback patterns mainly designed to catch paths with spaces that are
/// not detectable with the path grammar. Only the first matching pattern is
/// used.
fn fallback_matchers() -> &'static [Regex] {
    static MATCHERS: OnceLock<Vec<Regex>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        [
            // Python style error: File "<path>", line <line>
            r#"^ *File (?P<link>"(?P<path>.+)"(, line (?P<line>\d+))?)"#,
            // Some C++ compile error formats:
            // C:\foo\bar baz(339) : error ...
            // C:\foo\bar baz(339,12) : error ...
            // C:\foo\bar baz(339, 12) : error ...
            // C:\foo\bar baz(339): error ...
            // C:\foo\bar baz(339,12): ...
            r"^(?P<link>(?P<path>.+)\((?P<line>\d+)(?:, ?(?P<col>\d+))?\)) ?:",
            // C:\foo/bar baz:339 : error ...
            // C:\foo/bar baz:339:12 : error ...
            // C:\foo/bar baz:339: error ...
            // C:\foo/bar baz:339:12: error ...
            r"^(?P<link>(?P<path>.+):(?P<line>\d+)(?::(?P<col>\d+))?) ?:",
            // Cmd prompt
            r"^(?P<link>(?P<path>.+))>",
            // The whole line is the path
            r"^ *(?P<link>(?P<path>.+))",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("failed to compile fallback matcher"))
        .collect()
    })
}

/// Matches one or more leading `../` or `..\` sequences.
fn leading_parent_dirs_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^(\.\.[\/\\])+").expect("failed to compile parent dirs regex")
    })
}

/// Trailing characters that are likely not part of a link.
fn special_end_chars_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"[\[\]"'\.]$"#).expect("failed to compile special end chars regex")
    })
}

/// Try candidates in order; the first that passes the path anchor and
/// parses as a `file://` URL wins. Returns the URL together with the
/// winning candidate text.
fn validate_link_candidates(candidates: &[String]) -> Option<(Url, String)> {
    for link in candidates {
        if !link_local_start_regex().is_match(link) {
            continue;
        }
        let uri = if link.starts_with("file://") {
            Url::parse(link).ok()
        } else {
            Url::parse(&format!("file://{link}")).ok()
        };
        if let Some(uri) = uri {
            return Some((uri, link.clone()));
        }
    }
    None
}

/// Validates a set of link candidates and returns a link if one validated.
///
/// `link_text` should be `None` to use the winning candidate's URL as the
/// text. `trim_range_map` maps trimmed candidates to the number of cells
/// the buffer range must be shortened by when that candidate wins.
fn validate_and_get_link(
    link_text: Option<String>,
    mut buffer_range: BufferRange,
    link_candidates: &[String],
    trim_range_map: &HashMap<String, usize>,
    cols: usize,
) -> Option<TerminalSimpleLink> {
    let (uri, winning) = validate_link_candidates(link_candidates)?;

    // Offset the buffer range if the link range was trimmed
    if let Some(&trim_range) = trim_range_map.get(&winning)
        && trim_range > 0
    {
        buffer_range.end.x -= trim_range as i32;
        if buffer_range.end.x < 0 {
            buffer_range.end.y -= 1;
            buffer_range.end.x += cols as i32;
        }
    }

    let text = link_text.unwrap_or_else(|| uri.as_str().to_string());
    Some(TerminalSimpleLink {
        text,
        uri: Some(uri),
        parsed_link: None,
        buffer_range,
        disable_trim_colon: false,
    })
}

/// Searches for local file paths within a wrapped-line group of the
/// terminal buffer. A single detection can return multiple links.
pub struct LocalLinkDetector<'a, B: Buffer> {
    buffer: &'a B,
    os: OperatingSystem,
}

impl<'a, B: Buffer> LocalLinkDetector<'a, B> {
    pub fn new(buffer: &'a B, os: OperatingSystem) -> Self {
        Self { buffer, os }
    }

    /// Detects links within the wrapped line range provided and returns
    /// them as an array.
    ///
    /// * `lines`: the individual buffer rows that make up the wrapped
    ///   line. Neither bound is validated to really delimit a wrapped line.
    /// * `start_line`: the absolute buffer row of the first entry.
    /// * `end_line`: the absolute buffer row of the last entry.
    pub fn detect(
        &self,
        lines: &[&B::Line],
        start_line: usize,
        end_line: usize,
    ) -> Vec<TerminalSimpleLink> {
        let cols = self.buffer.cols();
        let mut links = Vec::new();

        // Get the text representation of the wrapped line
        let text = line_content(self.buffer, start_line, end_line, cols);
        if text.is_empty() || text.chars().count() > MAX_LINE_LENGTH {
            return Vec::new();
        }

        let mut resolved_link_count = 0;

        for parsed_link in detect_links(&text, self.os) {
            // Don't try resolve any links of excessive length
            if parsed_link.path.text.chars().count() > MAX_RESOLVED_LINK_LENGTH {
                continue;
            }

            // Convert the link text's string index into a wrapped buffer
            // range
            let link_start = parsed_link
                .prefix
                .as_ref()
                .map(|p| p.index)
                .unwrap_or(parsed_link.path.index);
            let suffix_len = parsed_link
                .suffix
                .as_ref()
                .map(|s| s.suffix.text.chars().count())
                .unwrap_or(0);
            let buffer_range = convert_link_range_to_buffer(
                lines,
                cols,
                StringRange {
                    start_line_number: 1,
                    start_column: link_start + 1,
                    end_line_number: 1,
                    end_column: parsed_link.path.end() + suffix_len + 1,
                },
                start_line,
            );

            let mut link_candidates: Vec<String> = vec![parsed_link.path.text.clone()];
            if leading_parent_dirs_regex().is_match(&parsed_link.path.text) {
                link_candidates.push(
                    leading_parent_dirs_regex()
                        .replace(&parsed_link.path.text, "")
                        .into_owned(),
                );
            }

            // If any candidate ends with characters that are likely not
            // part of the link, add variants excluding them. Each variant
            // records how many characters it trimmed so the underline can
            // be shortened to match; the range is only trimmed when there
            // is no suffix, otherwise the underline would be wrong.
            let mut trim_range_map: HashMap<String, usize> = HashMap::new();
            let mut special_end_candidates = Vec::new();
            for candidate in &link_candidates {
                let mut previous = candidate.clone();
                let mut removed = special_end_chars_regex().replace(&previous, "").into_owned();
                let mut trim_range = 0;
                while removed != previous {
                    if parsed_link.suffix.is_none() {
                        trim_range += 1;
                    }
                    special_end_candidates.push(removed.clone());
                    trim_range_map.insert(removed.clone(), trim_range);
                    previous = removed.clone();
                    removed = special_end_chars_regex().replace(&previous, "").into_owned();
                }
            }
            link_candidates.extend(special_end_candidates);

            // Validate the path and convert to the outgoing type
            if let Some(mut simple_link) =
                validate_and_get_link(None, buffer_range, &link_candidates, &trim_range_map, cols)
            {
                let link_end = match &parsed_link.suffix {
                    Some(suffix) => suffix.suffix.end(),
                    None => parsed_link.path.end(),
                };
                simple_link.text = slice_chars(&text, link_start, link_end).to_string();
                simple_link.parsed_link = Some(parsed_link);
                links.push(simple_link);
            }

            // Stop early if too many links exist in the line
            resolved_link_count += 1;
            if resolved_link_count >= MAX_RESOLVED_LINKS_IN_LINE {
                break;
            }
        }

        // Match against the fallback matchers which are mainly designed to
        // catch paths with spaces that aren't possible using the regular
        // mechanism.
        if links.is_empty() {
            for matcher in fallback_matchers() {
                let Some(caps) = matcher.captures(&text) else {
                    continue;
                };
                let (Some(link), Some(path)) = (caps.name("link"), caps.name("path")) else {
                    continue;
                };
                let link_str = link.as_str();
                let path_str = path.as_str();

                // Don't try resolve any links of excessive length
                if link_str.chars().count() > MAX_RESOLVED_LINK_LENGTH {
                    continue;
                }

                // Convert the link text's string index into a wrapped
                // buffer range
                let Some(link_byte_index) = text.find(link_str) else {
                    continue;
                };
                let string_index = char_index(&text, link_byte_index);
                let buffer_range = convert_link_range_to_buffer(
                    lines,
                    cols,
                    StringRange {
                        start_line_number: 1,
                        start_column: string_index + 1,
                        end_line_number: 1,
                        end_column: string_index + link_str.chars().count() + 1,
                    },
                    start_line,
                );

                // Validate and add the link
                let suffix = match caps.name("line") {
                    Some(line) => match caps.name("col") {
                        Some(col) => format!(":{}:{}", line.as_str(), col.as_str()),
                        None => format!(":{}", line.as_str()),
                    },
                    None => String::new(),
                };
                if let Some(simple_link) = validate_and_get_link(
                    Some(format!("{path_str}{suffix}")),
                    buffer_range,
                    &[path_str.to_string()],
                    &HashMap::new(),
                    cols,
                ) {
                    links.push(simple_link);
                }

                // Only match a single fallback matcher
                break;
            }
        }

        // Sometimes links are styled specially in the terminal, like
        // underlined or bolded; try split the line by attributes and test
        // whether each run is a path.
        if links.is_empty() {
            for mut range_candidate in ranges_by_attr(self.buffer, start_line, end_line, cols) {
                let mut run_text = String::new();
                for y in range_candidate.start.y..=range_candidate.end.y {
                    let Some(line) = self.buffer.line(y as usize) else {
                        break;
                    };
                    let line_start_x = if y == range_candidate.start.y {
                        range_candidate.start.x
                    } else {
                        0
                    };
                    let line_end_x = if y == range_candidate.end.y {
                        range_candidate.end.x
                    } else {
                        cols as i32 - 1
                    };
                    run_text.push_str(&line.translate_to_string(
                        false,
                        line_start_x.max(0) as usize,
                        line_end_x.max(0) as usize,
                    ));
                }

                // Adjust to 1-based for the link contract
                range_candidate.start.x += 1;
                range_candidate.start.y += 1;
                range_candidate.end.y += 1;

                if let Some(simple_link) = validate_and_get_link(
                    Some(run_text.clone()),
                    range_candidate,
                    &[run_text],
                    &HashMap::new(),
                    cols,
                ) {
                    links.push(simple_link);
                }

                // Stop early if too many links exist in the line
                resolved_link_count += 1;
                if resolved_link_count >= MAX_RESOLVED_LINKS_IN_LINE {
                    break;
                }
            }
        }

        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{CellStyle, MemoryBuffer};
    use crate::types::BufferCellPosition;

    fn detect_in(buffer: &MemoryBuffer, os: OperatingSystem) -> Vec<TerminalSimpleLink> {
        let lines: Vec<_> = (0..buffer.length()).filter_map(|y| buffer.line(y)).collect();
        let end_line = buffer.length().saturating_sub(1);
        LocalLinkDetector::new(buffer, os).detect(&lines, 0, end_line)
    }

    fn cell_range(start_x: i32, start_y: i32, end_x: i32, end_y: i32) -> BufferRange {
        BufferRange {
            start: BufferCellPosition {
                x: start_x,
                y: start_y,
            },
            end: BufferCellPosition { x: end_x, y: end_y },
        }
    }

    #[test]
    fn test_detects_relative_path_with_suffix() {
        let buffer = MemoryBuffer::from_text("./foo.py:339:12 error", 80);
        let links = detect_in(&buffer, OperatingSystem::Linux);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "./foo.py:339:12");
        let parsed = links[0].parsed_link.as_ref().unwrap();
        assert_eq!(parsed.path.text, "./foo.py");
        assert_eq!(parsed.suffix.as_ref().unwrap().row, Some(339));
    }

    #[test]
    fn test_quoted_path_with_line_and_column_words() {
        let buffer = MemoryBuffer::from_text("  File \"/home/me/app.py\", line 16", 80);
        let links = detect_in(&buffer, OperatingSystem::Linux);
        assert_eq!(links.len(), 1);
        // The quoted form is caught by the primary pipeline: the prefix
        // quote is part of the underlined text and the suffix reaches the
        // end of the line.
        assert_eq!(links[0].text, "\"/home/me/app.py\", line 16");
        let parsed = links[0].parsed_link.as_ref().unwrap();
        assert_eq!(parsed.path.text, "/home/me/app.py");
        assert_eq!(parsed.suffix.as_ref().unwrap().row, Some(16));
    }

    #[test]
    fn test_rejects_line_over_max_length() {
        let long = format!("./foo.rs:1 {}", "x".repeat(MAX_LINE_LENGTH + 10));
        let buffer = MemoryBuffer::from_text(&long, 4000);
        assert!(detect_in(&buffer, OperatingSystem::Linux).is_empty());
    }

    #[test]
    fn test_python_traceback_fallback_catches_path_with_spaces() {
        // The path grammar cannot match a path containing spaces; the
        // Python traceback fallback can.
        let buffer = MemoryBuffer::from_text("  File \"/home/my docs/app.py\", line 16", 80);
        let links = detect_in(&buffer, OperatingSystem::Linux);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "/home/my docs/app.py:16");
        assert!(links[0].parsed_link.is_none());
    }

    #[test]
    fn test_fallback_skipped_when_primary_found_links() {
        let buffer = MemoryBuffer::from_text("/usr/lib/foo:10: warning", 80);
        let links = detect_in(&buffer, OperatingSystem::Linux);
        assert_eq!(links.len(), 1);
        assert!(links[0].parsed_link.is_some());
    }

    #[test]
    fn test_styled_run_detected_as_link() {
        let underline = CellStyle {
            underline: true,
            ..CellStyle::default()
        };
        let plain = CellStyle::default();
        // The line as a whole fails the path anchor and the unix grammar
        // finds no separator run, so only the styled-run heuristic can see
        // the Windows-style path.
        let buffer = MemoryBuffer::from_segments(
            &[("note ", plain), (r"C:\Users\me", underline), (" end", plain)],
            40,
        );
        let links = detect_in(&buffer, OperatingSystem::Linux);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, r"C:\Users\me");
        assert!(links[0].parsed_link.is_none());
        // Runs are reported 1-based with an inclusive end cell.
        assert_eq!(links[0].buffer_range.start, BufferCellPosition { x: 6, y: 1 });
        assert_eq!(links[0].buffer_range.end, BufferCellPosition { x: 16, y: 1 });
    }

    #[test]
    fn test_resolved_links_capped() {
        let line = (0..15)
            .map(|i| format!("/a/b{i}:1:2"))
            .collect::<Vec<_>>()
            .join(" ");
        let buffer = MemoryBuffer::from_text(&line, 400);
        let links = detect_in(&buffer, OperatingSystem::Linux);
        assert_eq!(links.len(), MAX_RESOLVED_LINKS_IN_LINE);
    }

    #[test]
    fn test_trim_range_shortens_buffer_range() {
        // When a trimmed candidate is the one that validates, the link's
        // underline shrinks by exactly the trimmed character count.
        let mut trim_map = HashMap::new();
        trim_map.insert("./foo/bar".to_string(), 2);
        let link = validate_and_get_link(
            None,
            cell_range(5, 1, 18, 1),
            &["nope".to_string(), "./foo/bar".to_string()],
            &trim_map,
            80,
        )
        .unwrap();
        assert_eq!(link.buffer_range.end, BufferCellPosition { x: 16, y: 1 });
    }

    #[test]
    fn test_trim_range_wraps_to_previous_row() {
        let mut trim_map = HashMap::new();
        trim_map.insert("./a".to_string(), 3);
        let link = validate_and_get_link(
            None,
            cell_range(78, 1, 1, 2),
            &["./a".to_string()],
            &trim_map,
            80,
        )
        .unwrap();
        assert_eq!(link.buffer_range.end, BufferCellPosition { x: 78, y: 1 });
    }

    #[test]
    fn test_untrimmed_candidate_wins_without_trim() {
        let buffer = MemoryBuffer::from_text("see ./foo/bar. next", 80);
        let links = detect_in(&buffer, OperatingSystem::Linux);
        assert_eq!(links.len(), 1);
        // `./foo/bar.` itself validates, so no trimming applies and the
        // trailing period stays part of the link.
        assert_eq!(links[0].text, "./foo/bar.");
    }
}
