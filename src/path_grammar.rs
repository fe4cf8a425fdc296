//! Heuristic path grammars for POSIX-like and Windows-like local paths.
//!
//! These clauses are data, hand-ported from battle-tested patterns: they do
//! not consult any file system, they only describe what a local path looks
//! like in terminal output. The first character class of each family lists
//! characters a path may not start with, the second lists characters not
//! allowed anywhere in a path body; separators repeat one or more times.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::OperatingSystem;

const PATH_PREFIX: &str = r"(?:\.\.?|\~|file://)";
const PATH_SEPARATOR_CLAUSE: &str = r"\/";
// '":; are allowed in paths but they are often separators so ignore them.
// Also disallow \ to prevent a catastrophic backtracking case.
const EXCLUDED_PATH_CHARACTERS_CLAUSE: &str = r#"[^\x00<>\?\s!`&*()'":;\\]"#;
const EXCLUDED_START_PATH_CHARACTERS_CLAUSE: &str = r#"[^\x00<>\s!`&*()\[\]'":;\\]"#;

const WIN_OTHER_PATH_PREFIX: &str = r"\.\.?|\~";
const WIN_PATH_SEPARATOR_CLAUSE: &str = r"(?:\\|\/)";
const WIN_EXCLUDED_PATH_CHARACTERS_CLAUSE: &str = r#"[^\x00<>\?\|\/\s!`&*()'":;]"#;
const WIN_EXCLUDED_START_PATH_CHARACTERS_CLAUSE: &str = r#"[^\x00<>\?\|\/\s!`&*()\[\]'":;]"#;

/// Matches the start of an absolute path on Windows, such as `C:`, `c:`,
/// `file:///c:` (uri) and `\\?\C:` (UNC path).
pub const WIN_DRIVE_PREFIX: &str = r"(?:\\\\\?\\|file:\/\/\/)?[a-zA-Z]:";

/// A clause that matches non-Windows paths, such as `/foo`, `~/foo`,
/// `./foo`, `../foo` and `foo/bar`.
fn unix_local_link_clause() -> String {
    format!(
        "(?:(?:{PATH_PREFIX}|(?:{EXCLUDED_START_PATH_CHARACTERS_CLAUSE}{EXCLUDED_PATH_CHARACTERS_CLAUSE}*))?(?:{PATH_SEPARATOR_CLAUSE}(?:{EXCLUDED_PATH_CHARACTERS_CLAUSE})+)+)"
    )
}

/// A clause that matches Windows paths, such as `\\?\c:\foo`, `c:\foo`,
/// `~\foo`, `.\foo`, `..\foo` and `foo\bar`.
fn win_local_link_clause() -> String {
    format!(
        "(?:(?:(?:{WIN_DRIVE_PREFIX}|{WIN_OTHER_PATH_PREFIX})|(?:{WIN_EXCLUDED_START_PATH_CHARACTERS_CLAUSE}{WIN_EXCLUDED_PATH_CHARACTERS_CLAUSE}*))?(?:{WIN_PATH_SEPARATOR_CLAUSE}(?:{WIN_EXCLUDED_PATH_CHARACTERS_CLAUSE})+)+)"
    )
}

fn unix_local_link_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(&unix_local_link_clause()).expect("failed to compile unix path regex")
    })
}

fn win_local_link_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(&win_local_link_clause()).expect("failed to compile windows path regex")
    })
}

/// The compiled path grammar for the given operating system.
pub fn local_link_regex(os: OperatingSystem) -> &'static Regex {
    if os.is_windows() {
        win_local_link_regex()
    } else {
        unix_local_link_regex()
    }
}

/// Anchor pattern a candidate must satisfy before a `file://` URL is built
/// from it: an explicit relative prefix, a drive letter, or a separator.
pub fn link_local_start_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^(\.|\.\.|[A-Z]:|\\|\/)").expect("failed to compile link start regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unix_matches(line: &str) -> Vec<&str> {
        unix_local_link_regex()
            .find_iter(line)
            .map(|m| m.as_str())
            .collect()
    }

    fn win_matches(line: &str) -> Vec<&str> {
        win_local_link_regex()
            .find_iter(line)
            .map(|m| m.as_str())
            .collect()
    }

    #[test]
    fn test_unix_absolute_path() {
        assert_eq!(unix_matches("see /foo/bar here"), vec!["/foo/bar"]);
    }

    #[test]
    fn test_unix_relative_prefixes() {
        assert_eq!(unix_matches("./foo/bar"), vec!["./foo/bar"]);
        assert_eq!(unix_matches("../foo/bar"), vec!["../foo/bar"]);
        assert_eq!(unix_matches("~/foo/bar"), vec!["~/foo/bar"]);
    }

    #[test]
    fn test_unix_bare_relative_path() {
        assert_eq!(unix_matches("src/main.rs compiled"), vec!["src/main.rs"]);
    }

    #[test]
    fn test_unix_stops_at_quotes() {
        assert_eq!(unix_matches("'/foo/bar'"), vec!["/foo/bar"]);
    }

    #[test]
    fn test_windows_drive_path() {
        assert_eq!(win_matches(r"C:\foo\bar"), vec![r"C:\foo\bar"]);
        assert_eq!(win_matches(r"c:/foo/bar"), vec![r"c:/foo/bar"]);
    }

    #[test]
    fn test_windows_unc_path() {
        assert_eq!(win_matches(r"\\?\C:\foo"), vec![r"\\?\C:\foo"]);
    }

    #[test]
    fn test_windows_relative_path() {
        assert_eq!(win_matches(r"..\foo\bar"), vec![r"..\foo\bar"]);
    }

    #[test]
    fn test_windows_mixed_separators() {
        assert_eq!(win_matches(r"C:\foo/bar"), vec![r"C:\foo/bar"]);
    }

    #[test]
    fn test_link_local_start_regex() {
        let anchor = link_local_start_regex();
        assert!(anchor.is_match("./foo"));
        assert!(anchor.is_match("../foo"));
        assert!(anchor.is_match("/foo"));
        assert!(anchor.is_match(r"C:\foo"));
        assert!(anchor.is_match(r"\\server\share"));
        assert!(!anchor.is_match("foo/bar"));
    }
}
