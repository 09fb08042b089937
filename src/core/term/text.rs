//! Styled text
//!
//! The content of a terminal line: a sequence of characters, each carrying
//! its style. Offsets into a `StyledText` are character offsets.

use std::ops::Range;
use std::sync::Arc;

use unicode_width::UnicodeWidthChar;

use super::style::Style;

/// A single character with its style
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyledChar {
    pub ch: char,
    pub style: Arc<Style>,
}

/// A run of styled characters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyledText {
    cells: Vec<StyledChar>,
}

impl StyledText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build text where every character shares `style`.
    pub fn styled(text: &str, style: &Arc<Style>) -> Self {
        Self {
            cells: text
                .chars()
                .map(|ch| StyledChar {
                    ch,
                    style: Arc::clone(style),
                })
                .collect(),
        }
    }

    /// Unstyled text
    pub fn plain_text(text: &str) -> Self {
        Self::styled(text, &Arc::new(Style::default()))
    }

    /// Number of characters
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[StyledChar] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&StyledChar> {
        self.cells.get(index)
    }

    /// The characters without styling
    pub fn plain(&self) -> String {
        self.cells.iter().map(|cell| cell.ch).collect()
    }

    /// Display width in terminal cells, with tabs expanded from column 0.
    pub fn cell_width(&self, tab_size: usize) -> usize {
        let mut column = 0;
        for cell in &self.cells {
            column += char_cells(cell.ch, column, tab_size);
        }
        column
    }

    /// Copy of a character range, clamped to the text.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.cells.len());
        let start = range.start.min(end);
        Self {
            cells: self.cells[start..end].to_vec(),
        }
    }

    pub fn push_text(&mut self, other: &StyledText) {
        self.cells.extend_from_slice(&other.cells);
    }

    /// Append `count` unstyled spaces.
    pub fn pad_right(&mut self, count: usize) {
        let style = Arc::new(Style::default());
        self.cells.extend((0..count).map(|_| StyledChar {
            ch: ' ',
            style: Arc::clone(&style),
        }));
    }

    /// Concatenate pieces into a new text.
    pub fn assemble(parts: &[&StyledText]) -> Self {
        let mut cells = Vec::with_capacity(parts.iter().map(|part| part.len()).sum());
        for part in parts {
            cells.extend_from_slice(&part.cells);
        }
        Self { cells }
    }

    /// Group consecutive characters sharing a style, for painting.
    pub fn runs(&self) -> Vec<(String, Arc<Style>)> {
        let mut runs: Vec<(String, Arc<Style>)> = Vec::new();
        for cell in &self.cells {
            match runs.last_mut() {
                Some((text, style)) if Arc::ptr_eq(style, &cell.style) || **style == *cell.style => {
                    text.push(cell.ch);
                }
                _ => runs.push((cell.ch.to_string(), Arc::clone(&cell.style))),
            }
        }
        runs
    }
}

/// Cells occupied by `ch` when drawn at `column`.
///
/// Tabs advance to the next tab stop; control and combining characters
/// occupy no cells.
pub fn char_cells(ch: char, column: usize, tab_size: usize) -> usize {
    if ch == '\t' {
        if tab_size == 0 {
            return 1;
        }
        return tab_size - column % tab_size;
    }
    ch.width().unwrap_or(0)
}
