//! Terminal path/link detection engine.
//!
//! Given the raw text rendered in a fixed-width character-cell terminal
//! buffer, this crate locates substrings that look like file-system paths
//! (optionally followed by a `:line:col`-style suffix), deduplicates
//! overlapping candidates, validates them against OS path syntax, and
//! converts their character offsets back into cell coordinates of the
//! possibly soft-wrapped, possibly double-width-character-containing
//! buffer, so a host UI can underline and activate them as hyperlinks.
//!
//! Detection is layered:
//! - suffix-anchored detection (`foo.py:339:12`, `"foo", line 339`)
//! - OS path grammar detection (`./foo/bar`, `C:\foo\bar`)
//! - compiler-error fallback patterns (Python tracebacks, cl.exe, clang)
//! - a styled-text heuristic over runs of constant cell attributes
//!
//! The engine never touches the file system and never returns an error:
//! the worst case is an empty result. Activation (opening an editor or the
//! system opener) is the only side-effecting layer and lives in
//! [`activate`].
//!
//! ```no_run
//! use term_links::{LinkProviderAdapter, MemoryBuffer, OperatingSystem};
//!
//! let buffer = MemoryBuffer::from_text("error in ./src/main.rs:42:7", 80);
//! let adapter = LinkProviderAdapter::new(&buffer, OperatingSystem::local());
//! adapter.provide_links(1, |links| {
//!     for link in links {
//!         println!("{} at {:?}", link.text, link.range);
//!     }
//! });
//! ```

pub mod activate;
pub mod buffer;
pub mod coords;
pub mod detect;
pub mod detector;
pub mod path_grammar;
pub mod provider;
pub mod suffix;
mod text;
pub mod types;

pub use activate::{ActivationConfig, ActivationError, EditorMode, open_link};
pub use buffer::{
    Buffer, BufferCell, BufferLine, CellStyle, MemoryBuffer, MemoryCell, MemoryLine, line_content,
    ranges_by_attr,
};
pub use coords::convert_link_range_to_buffer;
pub use detect::{detect_links, detect_links_via_suffix, detect_paths_no_suffix};
pub use detector::LocalLinkDetector;
pub use provider::{LinkProviderAdapter, TerminalLink};
pub use suffix::{detect_link_suffixes, get_link_suffix, remove_link_query_string, remove_link_suffix};
pub use types::{
    BufferCellPosition, BufferRange, LinkSuffix, OperatingSystem, ParsedLink, PartialRange,
    StringRange, TerminalSimpleLink,
};
