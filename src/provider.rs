//! Adapter between the detector and a host's link-provider contract.
//!
//! Hosts ask for links one buffer row at a time. The adapter recomputes the
//! enclosing wrapped-line group around the requested row, delegates to the
//! detector, and answers through a callback. Detection is synchronous; the
//! callback shape exists only to match the host interface.

use crate::buffer::{Buffer, BufferLine};
use crate::detector::{LocalLinkDetector, MAX_LINK_LENGTH};
use crate::types::{BufferRange, OperatingSystem, TerminalSimpleLink};

/// A host-facing link: the cell range to underline, the display text, and
/// the underlying detection result to hand to activation.
#[derive(Debug, Clone)]
pub struct TerminalLink {
    pub range: BufferRange,
    pub text: String,
    pub link: TerminalSimpleLink,
}

/// Wraps a [`LocalLinkDetector`] so it can serve a per-row link-provider
/// interface.
pub struct LinkProviderAdapter<'a, B: Buffer> {
    buffer: &'a B,
    os: OperatingSystem,
}

impl<'a, B: Buffer> LinkProviderAdapter<'a, B> {
    pub fn new(buffer: &'a B, os: OperatingSystem) -> Self {
        Self { buffer, os }
    }

    /// Provide links for the 1-based buffer row `buffer_line_number`,
    /// answering via `callback`.
    pub fn provide_links(&self, buffer_line_number: usize, callback: impl FnOnce(Vec<TerminalLink>)) {
        callback(self.links_for_line(buffer_line_number));
    }

    fn links_for_line(&self, buffer_line_number: usize) -> Vec<TerminalLink> {
        let cols = self.buffer.cols().max(1);
        let mut start_line = buffer_line_number.saturating_sub(1);
        let mut end_line = start_line;

        let Some(first) = self.buffer.line(start_line) else {
            return Vec::new();
        };
        let mut lines: Vec<&B::Line> = vec![first];

        // Cap the context taken on either side of the requested row so a
        // pathological wrapped line cannot make a single request scan the
        // whole scrollback; the requested row itself always gets links.
        let max_line_context = MAX_LINK_LENGTH / cols;
        let min_start_line = start_line.saturating_sub(max_line_context);
        let max_end_line = std::cmp::min(end_line + max_line_context, self.buffer.length());

        while start_line >= min_start_line
            && start_line > 0
            && self
                .buffer
                .line(start_line)
                .is_some_and(|line| line.is_wrapped())
        {
            let Some(previous) = self.buffer.line(start_line - 1) else {
                break;
            };
            lines.insert(0, previous);
            start_line -= 1;
        }

        while end_line < max_end_line
            && self
                .buffer
                .line(end_line + 1)
                .is_some_and(|line| line.is_wrapped())
        {
            let Some(next) = self.buffer.line(end_line + 1) else {
                break;
            };
            lines.push(next);
            end_line += 1;
        }

        let detector = LocalLinkDetector::new(self.buffer, self.os);
        detector
            .detect(&lines, start_line, end_line)
            .into_iter()
            .map(create_terminal_link)
            .collect()
    }
}

/// Remove a trailing colon from the link text if there is one, so the link
/// is more useful, then package the link for the host.
fn create_terminal_link(mut link: TerminalSimpleLink) -> TerminalLink {
    if !link.disable_trim_colon && link.text.ends_with(':') {
        link.text.pop();
        link.buffer_range.end.x -= 1;
    }
    TerminalLink {
        range: link.buffer_range,
        text: link.text.clone(),
        link,
    }
}
