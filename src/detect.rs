//! Candidate path extraction and merging.
//!
//! Two independent detection passes run over each line: a suffix-anchored
//! pass that looks for a path-shaped run immediately before every detected
//! line/column suffix, and a suffix-less pass that applies the OS path
//! grammar to the whole line. The two candidate sets are merged into one
//! ordered, non-overlapping sequence; suffix-anchored candidates always win
//! a conflict.

use std::sync::OnceLock;

use regex::Regex;

use crate::path_grammar::local_link_regex;
use crate::suffix::detect_link_suffixes;
use crate::text::{byte_index, char_index};
use crate::types::{OperatingSystem, ParsedLink, PartialRange};

/// Valid path characters for a link with a suffix. The first class lists
/// characters the path is not allowed to start with, the second characters
/// not allowed at all; the run must reach the end of the examined text.
fn link_with_suffix_path_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?P<path>(?:file:\/\/\/)?[^\s\|<>\[\({][^\s\|<>]*)$")
            .expect("failed to compile suffixed path regex")
    })
}

/// A leading run of quote characters before a path body.
fn path_prefix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"^(?P<prefix>['"]+)"#).expect("failed to compile path prefix regex")
    })
}

/// Detect all candidate paths on a line: suffix-anchored first, then
/// suffix-less candidates merged in where they do not conflict.
pub fn detect_links(line: &str, os: OperatingSystem) -> Vec<ParsedLink> {
    let mut results = detect_links_via_suffix(line);
    let no_suffix_paths = detect_paths_no_suffix(line, os);
    binary_insert_list(&mut results, no_suffix_paths);
    results
}

fn binary_insert_list(list: &mut Vec<ParsedLink>, new_items: Vec<ParsedLink>) {
    if list.is_empty() {
        list.extend(new_items);
        return;
    }
    for item in new_items {
        let high = list.len() as isize;
        binary_insert(list, item, 0, high);
    }
}

fn binary_insert(list: &mut Vec<ParsedLink>, new_item: ParsedLink, low: isize, high: isize) {
    if list.is_empty() {
        list.push(new_item);
        return;
    }
    if low > high {
        // No insertion point without a conflict; drop the candidate.
        return;
    }
    // Find the index where the new item would be inserted
    let mid = ((low + high) / 2) as usize;
    let len = list.len();
    let fits_here = mid >= len
        || (new_item.path.index < list[mid].path.index
            && (mid == 0 || new_item.path.index > list[mid - 1].path.index));
    if fits_here {
        // Check it does not overlap either neighbouring accepted span
        // before inserting
        let clears_next = mid >= len || new_item.path.end() < list[mid].path.index;
        let clears_prev = mid == 0 || new_item.path.index > list[mid - 1].path.end();
        if clears_next && clears_prev {
            list.insert(mid, new_item);
        }
        return;
    }
    if new_item.path.index > list[mid].path.index {
        binary_insert(list, new_item, mid as isize + 1, high);
    } else {
        binary_insert(list, new_item, low, mid as isize - 1);
    }
}

/// Detect paths via their line/column suffixes: for every suffix on the
/// line, the text immediately before it is matched against an end-anchored
/// path-body pattern.
pub fn detect_links_via_suffix(line: &str) -> Vec<ParsedLink> {
    let mut results = Vec::new();

    for suffix in detect_link_suffixes(line) {
        let before_suffix = &line[..byte_index(line, suffix.suffix.index)];
        let Some(caps) = link_with_suffix_path_regex().captures(before_suffix) else {
            continue;
        };
        let (Some(whole), Some(path_match)) = (caps.get(0), caps.name("path")) else {
            continue;
        };
        let mut link_start_index = char_index(before_suffix, whole.start());
        let mut path = path_match.as_str().to_string();

        // Extract a path prefix if it exists (not part of the path, but part
        // of the underlined section)
        let mut prefix: Option<PartialRange> = None;
        if let Some(prefix_caps) = path_prefix_regex().captures(&path)
            && let Some(prefix_match) = prefix_caps.name("prefix")
        {
            let prefix_text = prefix_match.as_str().to_string();
            path = path[prefix_text.len()..].to_string();
            let prefix_len = prefix_text.chars().count();
            prefix = Some(PartialRange {
                index: link_start_index,
                text: prefix_text.clone(),
            });

            // If there are multiple characters in the prefix, trim the
            // prefix if the _first_ suffix character is the same as the last
            // prefix character. For example, for the text
            // `echo "'foo' on line 1"`:
            //
            // - Prefix='
            // - Path=foo
            // - Suffix=' on line 1
            //
            // If this fails on a multi-character prefix, just keep the
            // original.
            if prefix_len > 1
                && let Some(suffix_first) = suffix.suffix.text.chars().next()
                && let Some(prefix_last) = prefix_text.chars().last()
                && (suffix_first == '\'' || suffix_first == '"')
                && prefix_last == suffix_first
            {
                let trim_prefix_amount = prefix_len - 1;
                prefix = Some(PartialRange {
                    index: link_start_index + trim_prefix_amount,
                    text: prefix_last.to_string(),
                });
                link_start_index += trim_prefix_amount;
            }
        }

        let prefix_len = prefix.as_ref().map(|p| p.text.chars().count()).unwrap_or(0);
        results.push(ParsedLink {
            path: PartialRange {
                index: link_start_index + prefix_len,
                text: path,
            },
            prefix,
            suffix: Some(suffix),
        });
    }

    results
}

/// Detect paths on a line using the OS path grammar alone, with a
/// correction for git diff `a/` and `b/` prefixes.
pub fn detect_paths_no_suffix(line: &str, os: OperatingSystem) -> Vec<ParsedLink> {
    let mut results = Vec::new();

    for m in local_link_regex(os).find_iter(line) {
        let mut text = m.as_str().to_string();
        let mut index = char_index(line, m.start());
        if text.is_empty() {
            // An empty match here would be a grammar bug; do nothing rather
            // than loop on it.
            log::warn!("path grammar produced an empty match; stopping scan");
            break;
        }

        // Adjust the link range to exclude a/ and b/ if it looks like a git
        // diff:
        //   --- a/foo/bar
        //   +++ b/foo/bar
        //   diff --git a/foo/bar b/foo/bar
        if ((line.starts_with("--- a/") || line.starts_with("+++ b/")) && index == 4)
            || (line.starts_with("diff --git")
                && (text.starts_with("a/") || text.starts_with("b/")))
        {
            text = text[2..].to_string();
            index += 2;
        }

        results.push(ParsedLink {
            path: PartialRange { index, text },
            prefix: None,
            suffix: None,
        });
    }

    results
}
