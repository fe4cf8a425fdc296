//! String-index to buffer-cell coordinate conversion.
//!
//! Link detection works on the reconstructed text of a wrapped-line group,
//! so its ranges are string indices. The terminal renders that text across
//! one or more physical rows whose cells do not map one-to-one onto
//! characters: a double-width glyph occupies two cells, a multi-code-point
//! cluster occupies one, and a wide glyph that would straddle the last
//! column wraps early, leaving an empty cell behind. This module folds all
//! of that back into `(x, y)` cell coordinates.

use crate::buffer::{BufferCell, BufferLine};
use crate::types::{BufferCellPosition, BufferRange, StringRange};

/// Converts a possibly wrapped link's range (comprised of string indices)
/// into a buffer range.
///
/// * `lines`: the physical sub-lines of a single wrapped-line group, not
///   the entire buffer
/// * `buffer_width`: the number of columns in the terminal
/// * `range`: the link range, as 1-based string indices
/// * `start_line`: the absolute buffer row of the group's first sub-line
///
/// The per-cell offset rules are the contract here: +1 per double-width
/// cell, -1 per extra code point in a cell's cluster, and +1 when the last
/// column of a row holds an empty cell (a wide glyph wrapped early). A
/// missing line or cell mid-walk ends that walk and keeps whatever offset
/// has been accumulated.
pub fn convert_link_range_to_buffer<L: BufferLine>(
    lines: &[&L],
    buffer_width: usize,
    range: StringRange,
    start_line: usize,
) -> BufferRange {
    let width = buffer_width as i32;
    let mut buffer_range = BufferRange {
        start: BufferCellPosition {
            x: range.start_column as i32,
            y: (range.start_line_number + start_line) as i32,
        },
        end: BufferCellPosition {
            x: range.end_column as i32 - 1,
            y: (range.end_line_number + start_line) as i32,
        },
    };

    // Shift start range right for each wide character before the link
    let mut start_offset: i32 = 0;
    let start_wrapped_line_count = range.start_column.div_ceil(buffer_width);
    for y in 0..start_wrapped_line_count {
        let line_length = width.min(range.start_column as i32 - 1 - y as i32 * width);
        let mut line_offset: i32 = 0;
        let Some(line) = lines.get(y) else {
            // A missing sub-line here is unexpected; skip the remainder of
            // the start offset to minimize impact.
            break;
        };
        let mut x: i32 = 0;
        while x < width.min(line_length + line_offset) {
            let Some(cell) = line.cell(x as usize) else {
                // The character doesn't exist, so don't add to the offset
                break;
            };
            if cell.width() == 2 {
                line_offset += 1;
            }
            let cluster_len = cell.chars().chars().count() as i32;
            if cluster_len > 1 {
                line_offset -= cluster_len - 1;
            }
            x += 1;
        }
        start_offset += line_offset;
    }

    // Shift end range right for each wide character inside the link
    let mut end_offset: i32 = 0;
    let end_wrapped_line_count = range.end_column.div_ceil(buffer_width);
    for y in start_wrapped_line_count.saturating_sub(1)..end_wrapped_line_count {
        let start = if y + 1 == start_wrapped_line_count {
            (range.start_column as i32 - 1 + start_offset) % width
        } else {
            0
        };
        let line_length = width.min(range.end_column as i32 + start_offset - y as i32 * width);
        let mut line_offset: i32 = 0;
        let Some(line) = lines.get(y) else {
            break;
        };
        let mut x = start;
        while x >= 0 && x < width.min(line_length + line_offset) {
            let Some(cell) = line.cell(x as usize) else {
                break;
            };
            let chars = cell.chars();
            // Offset for null cells following wide characters
            if cell.width() == 2 {
                line_offset += 1;
            }
            // Offset for early wrapping when the last cell in a row is a
            // wide character
            if x == width - 1 && chars.is_empty() {
                line_offset += 1;
            }
            // Offset multi-code-point clusters like emoji
            let cluster_len = chars.chars().count() as i32;
            if cluster_len > 1 {
                line_offset -= cluster_len - 1;
            }
            x += 1;
        }
        end_offset += line_offset;
    }

    // Apply the width character offsets to the result
    buffer_range.start.x += start_offset;
    buffer_range.end.x += start_offset + end_offset;

    // Convert back to wrapped lines
    while buffer_range.start.x > width {
        buffer_range.start.x -= width;
        buffer_range.start.y += 1;
    }
    while buffer_range.end.x > width {
        buffer_range.end.x -= width;
        buffer_range.end.y += 1;
    }

    buffer_range
}
