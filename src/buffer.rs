//! Terminal buffer abstraction.
//!
//! The engine never talks to a live terminal directly; it reads cells
//! through the small trait surface below, which mirrors what terminal
//! widgets expose: lines that may be soft-wrap continuations, cells with a
//! display width and a (possibly multi-code-point) character cluster, and a
//! handful of style attributes.
//!
//! [`MemoryBuffer`] is a concrete in-memory implementation for hosts that
//! hold plain text rather than a live grid, and for the test-suite. It
//! reproduces terminal placement rules: double-width glyphs occupy a
//! width-2 cell followed by a width-0 spacer, and a wide glyph that would
//! straddle the last column wraps early, leaving an empty cell behind.

use unicode_width::UnicodeWidthChar;

use crate::types::{BufferCellPosition, BufferRange};

/// One column position in a buffer row.
pub trait BufferCell {
    /// Display width: 2 for a wide glyph, 0 for the spacer cell following
    /// one, 1 otherwise.
    fn width(&self) -> u8;
    /// The character cluster held by the cell. Empty for spacer cells and
    /// for cells skipped by an early wrap.
    fn chars(&self) -> &str;
    fn is_bold(&self) -> bool;
    fn is_inverse(&self) -> bool;
    fn is_strikethrough(&self) -> bool;
    fn is_underline(&self) -> bool;
    fn is_dim(&self) -> bool;
    fn is_italic(&self) -> bool;
}

/// One physical row of the buffer.
pub trait BufferLine {
    type Cell: BufferCell;

    /// Whether this row is a soft-wrap continuation of the previous row.
    fn is_wrapped(&self) -> bool;
    /// The text content of columns `start_col..end_col`, with spacer cells
    /// skipped and empty cells rendered as spaces. `trim_right` removes
    /// trailing whitespace.
    fn translate_to_string(&self, trim_right: bool, start_col: usize, end_col: usize) -> String;
    /// The cell at column `x`, if there is one.
    fn cell(&self, x: usize) -> Option<&Self::Cell>;
}

/// The buffer-wide view the engine needs.
pub trait Buffer {
    type Line: BufferLine;

    /// The number of columns in the terminal.
    fn cols(&self) -> usize;
    /// The number of rows in the buffer.
    fn length(&self) -> usize;
    /// The row at absolute position `y`, if there is one.
    fn line(&self, y: usize) -> Option<&Self::Line>;
}

/// Reconstruct the text of the wrapped-line group spanning rows
/// `line_start..=line_end`.
///
/// The result is capped at `max(2048, cols * 2)` characters as a sanity
/// check; the wrapped group should already be trimmed down well below that
/// by the caller.
pub fn line_content<B: Buffer>(
    buffer: &B,
    line_start: usize,
    line_end: usize,
    cols: usize,
) -> String {
    let max_line_length = std::cmp::max(2048, cols * 2);
    let mut content = String::new();
    let mut char_count = 0;
    for y in line_start..=line_end {
        // Only consider columns 0 to cols since resized buffers can retain
        // data outside of the terminal width.
        if let Some(line) = buffer.line(y) {
            let row = line.translate_to_string(true, 0, cols);
            char_count += row.chars().count();
            content.push_str(&row);
        }
        if char_count >= max_line_length {
            break;
        }
    }
    content
}

/// Split rows `line_start..=line_end` into 0-based cell ranges of constant
/// style attributes.
///
/// Bold, inverse, strikethrough and underline combine into one signature,
/// dim and italic into another; a range is emitted at every transition of
/// either signature. The trailing run is not emitted, so a uniformly styled
/// group yields no ranges.
pub fn ranges_by_attr<B: Buffer>(
    buffer: &B,
    line_start: usize,
    line_end: usize,
    cols: usize,
) -> Vec<BufferRange> {
    let mut range_start: Option<BufferCellPosition> = None;
    let mut last_fg: i32 = -1;
    let mut last_bg: i32 = -1;
    let mut ranges = Vec::new();
    for y in line_start..=line_end {
        let Some(line) = buffer.line(y) else {
            continue;
        };
        for x in 0..cols {
            let Some(cell) = line.cell(x) else {
                break;
            };
            let fg = cell.is_bold() as i32
                | (cell.is_inverse() as i32) << 1
                | (cell.is_strikethrough() as i32) << 2
                | (cell.is_underline() as i32) << 3;
            let bg = cell.is_dim() as i32 | (cell.is_italic() as i32) << 1;
            if last_fg == -1 || last_bg == -1 {
                range_start = Some(BufferCellPosition {
                    x: x as i32,
                    y: y as i32,
                });
            } else if last_fg != fg || last_bg != bg {
                if let Some(start) = range_start {
                    ranges.push(BufferRange {
                        start,
                        end: BufferCellPosition {
                            x: x as i32,
                            y: y as i32,
                        },
                    });
                }
                range_start = Some(BufferCellPosition {
                    x: x as i32,
                    y: y as i32,
                });
            }
            last_fg = fg;
            last_bg = bg;
        }
    }
    ranges
}

/// Style attributes for building [`MemoryBuffer`] content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub bold: bool,
    pub inverse: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub dim: bool,
    pub italic: bool,
}

/// A cell of a [`MemoryBuffer`].
#[derive(Debug, Clone, Default)]
pub struct MemoryCell {
    chars: String,
    width: u8,
    style: CellStyle,
}

impl MemoryCell {
    fn null() -> Self {
        Self {
            chars: String::new(),
            width: 1,
            style: CellStyle::default(),
        }
    }
}

impl BufferCell for MemoryCell {
    fn width(&self) -> u8 {
        self.width
    }

    fn chars(&self) -> &str {
        &self.chars
    }

    fn is_bold(&self) -> bool {
        self.style.bold
    }

    fn is_inverse(&self) -> bool {
        self.style.inverse
    }

    fn is_strikethrough(&self) -> bool {
        self.style.strikethrough
    }

    fn is_underline(&self) -> bool {
        self.style.underline
    }

    fn is_dim(&self) -> bool {
        self.style.dim
    }

    fn is_italic(&self) -> bool {
        self.style.italic
    }
}

/// A row of a [`MemoryBuffer`].
#[derive(Debug, Clone)]
pub struct MemoryLine {
    cells: Vec<MemoryCell>,
    wrapped: bool,
}

impl BufferLine for MemoryLine {
    type Cell = MemoryCell;

    fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    fn translate_to_string(&self, trim_right: bool, start_col: usize, end_col: usize) -> String {
        let end = end_col.min(self.cells.len());
        let mut s = String::new();
        for cell in &self.cells[start_col.min(end)..end] {
            if cell.width == 0 {
                // Spacer half of a wide glyph
                continue;
            }
            if cell.chars.is_empty() {
                s.push(' ');
            } else {
                s.push_str(&cell.chars);
            }
        }
        if trim_right {
            s.truncate(s.trim_end().len());
        }
        s
    }

    fn cell(&self, x: usize) -> Option<&MemoryCell> {
        self.cells.get(x)
    }
}

/// An in-memory terminal buffer built from text.
#[derive(Debug, Clone)]
pub struct MemoryBuffer {
    lines: Vec<MemoryLine>,
    cols: usize,
}

impl MemoryBuffer {
    /// Lay a single unstyled logical line into a buffer of `cols` columns,
    /// soft-wrapping as a terminal would.
    pub fn from_text(text: &str, cols: usize) -> Self {
        Self::from_segments(&[(text, CellStyle::default())], cols)
    }

    /// Lay several logical lines into one buffer; each entry starts a new
    /// unwrapped row and soft-wraps independently.
    pub fn from_lines(lines: &[&str], cols: usize) -> Self {
        let mut buffer = MemoryBuffer {
            lines: Vec::new(),
            cols,
        };
        for text in lines {
            let logical = Self::from_text(text, cols);
            buffer.lines.extend(logical.lines);
        }
        buffer
    }

    /// Lay one logical line of styled segments into a buffer of `cols`
    /// columns.
    pub fn from_segments(segments: &[(&str, CellStyle)], cols: usize) -> Self {
        assert!(cols > 0, "a terminal buffer needs at least one column");
        let mut rows: Vec<Vec<MemoryCell>> = Vec::new();
        let mut current: Vec<MemoryCell> = Vec::new();

        for (text, style) in segments {
            for ch in text.chars() {
                let width = ch.width().unwrap_or(0);
                if width == 0 {
                    // Combining code point: join the preceding cell's
                    // cluster. With no preceding cell there is nowhere to
                    // put it.
                    if let Some(cell) = current
                        .iter_mut()
                        .rev()
                        .chain(rows.iter_mut().rev().flat_map(|r| r.iter_mut().rev()))
                        .find(|c| c.width > 0)
                    {
                        cell.chars.push(ch);
                    }
                    continue;
                }
                if width == 2 && current.len() + 1 == cols {
                    // A wide glyph cannot straddle the last column: leave
                    // the cell empty and wrap early.
                    current.push(MemoryCell::null());
                    rows.push(std::mem::take(&mut current));
                } else if current.len() == cols {
                    rows.push(std::mem::take(&mut current));
                }
                current.push(MemoryCell {
                    chars: ch.to_string(),
                    width: width as u8,
                    style: *style,
                });
                if width == 2 {
                    current.push(MemoryCell {
                        chars: String::new(),
                        width: 0,
                        style: *style,
                    });
                }
            }
        }
        rows.push(current);

        let lines = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut cells)| {
                while cells.len() < cols {
                    cells.push(MemoryCell::null());
                }
                MemoryLine {
                    cells,
                    wrapped: i > 0,
                }
            })
            .collect();
        MemoryBuffer { lines, cols }
    }
}

impl Buffer for MemoryBuffer {
    type Line = MemoryLine;

    fn cols(&self) -> usize {
        self.cols
    }

    fn length(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, y: usize) -> Option<&MemoryLine> {
        self.lines.get(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_row_layout() {
        let buffer = MemoryBuffer::from_text("hello", 10);
        assert_eq!(buffer.length(), 1);
        assert!(!buffer.line(0).unwrap().is_wrapped());
        assert_eq!(
            buffer.line(0).unwrap().translate_to_string(true, 0, 10),
            "hello"
        );
    }

    #[test]
    fn test_soft_wrap_marks_continuations() {
        let buffer = MemoryBuffer::from_text("0123456789abc", 10);
        assert_eq!(buffer.length(), 2);
        assert!(!buffer.line(0).unwrap().is_wrapped());
        assert!(buffer.line(1).unwrap().is_wrapped());
        assert_eq!(
            buffer.line(1).unwrap().translate_to_string(true, 0, 10),
            "abc"
        );
    }

    #[test]
    fn test_wide_char_occupies_two_cells() {
        let buffer = MemoryBuffer::from_text("你a", 10);
        let line = buffer.line(0).unwrap();
        assert_eq!(line.cell(0).unwrap().width(), 2);
        assert_eq!(line.cell(0).unwrap().chars(), "你");
        assert_eq!(line.cell(1).unwrap().width(), 0);
        assert_eq!(line.cell(2).unwrap().chars(), "a");
        assert_eq!(line.translate_to_string(true, 0, 10), "你a");
    }

    #[test]
    fn test_wide_char_early_wrap() {
        let buffer = MemoryBuffer::from_text("123456789你", 10);
        assert_eq!(buffer.length(), 2);
        let first = buffer.line(0).unwrap();
        // The skipped last column holds an empty width-1 cell.
        assert_eq!(first.cell(9).unwrap().chars(), "");
        assert_eq!(first.cell(9).unwrap().width(), 1);
        let second = buffer.line(1).unwrap();
        assert!(second.is_wrapped());
        assert_eq!(second.cell(0).unwrap().chars(), "你");
        // Reconstruction trims the skipped cell away.
        assert_eq!(line_content(&buffer, 0, 1, 10), "123456789你");
    }

    #[test]
    fn test_combining_mark_joins_cluster() {
        let buffer = MemoryBuffer::from_text("e\u{301}x", 10);
        let line = buffer.line(0).unwrap();
        assert_eq!(line.cell(0).unwrap().chars(), "e\u{301}");
        assert_eq!(line.cell(0).unwrap().width(), 1);
        assert_eq!(line.cell(1).unwrap().chars(), "x");
    }

    #[test]
    fn test_line_content_concatenates_wrapped_rows() {
        let buffer = MemoryBuffer::from_text("0123456789abcdef", 10);
        assert_eq!(line_content(&buffer, 0, 1, 10), "0123456789abcdef");
    }

    #[test]
    fn test_ranges_by_attr_splits_on_transitions() {
        let bold = CellStyle {
            bold: true,
            ..CellStyle::default()
        };
        let plain = CellStyle::default();
        let buffer = MemoryBuffer::from_segments(&[("ab", plain), ("cd", bold), ("ef", plain)], 20);
        let ranges = ranges_by_attr(&buffer, 0, 0, 20);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start, BufferCellPosition { x: 0, y: 0 });
        assert_eq!(ranges[0].end, BufferCellPosition { x: 2, y: 0 });
        assert_eq!(ranges[1].start, BufferCellPosition { x: 2, y: 0 });
        assert_eq!(ranges[1].end, BufferCellPosition { x: 4, y: 0 });
    }

    #[test]
    fn test_ranges_by_attr_uniform_line_yields_nothing() {
        let buffer = MemoryBuffer::from_text("no styling here", 20);
        assert!(ranges_by_attr(&buffer, 0, 0, 20).is_empty());
    }
}
