//! Line storage
//!
//! A `Buffer` holds the logical lines of one screen together with their
//! folded (soft-wrapped) rows. The cursor is kept in folded coordinates:
//! `cursor_line` indexes `folded_lines` and may point past the end, in
//! which case rows are created on demand.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

use super::command::ScrollDirection;
use super::style::Style;
use super::text::{char_cells, StyledText};

/// Parameters that decide how a line is folded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FoldParams {
    pub width: usize,
    pub auto_wrap: bool,
    pub tab_size: usize,
}

impl Default for FoldParams {
    fn default() -> Self {
        Self {
            width: 80,
            auto_wrap: true,
            tab_size: 8,
        }
    }
}

/// One visual row of a logical line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineFold {
    /// Logical line this row belongs to
    pub line_no: usize,
    /// 0 for the first row of a line
    pub fold_index: usize,
    /// Character offset of this row within the logical line
    pub char_offset: usize,
    pub content: Arc<StyledText>,
    pub revision: u64,
}

/// A logical line
#[derive(Clone, Debug)]
pub struct LineRecord {
    pub content: StyledText,
    /// Style used to paint the row beyond the end of the content
    pub trailing_style: Arc<Style>,
    pub folds: Vec<LineFold>,
    pub revision: u64,
}

/// Rows excluded from scrolling at the top and bottom of the screen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollMargin {
    pub top: Option<usize>,
    pub bottom: Option<usize>,
}

impl ScrollMargin {
    /// Inclusive range of lines that scroll.
    pub fn line_range(&self, height: usize) -> (usize, usize) {
        (
            self.top.unwrap_or(0),
            self.bottom.unwrap_or(height.saturating_sub(1)),
        )
    }
}

/// Rows changed since the delta was last taken
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delta {
    Rows(BTreeSet<usize>),
    /// Everything may have moved
    Full,
}

impl Default for Delta {
    fn default() -> Self {
        Delta::Rows(BTreeSet::new())
    }
}

impl Delta {
    pub fn is_full(&self) -> bool {
        matches!(self, Delta::Full)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Delta::Rows(rows) => rows.is_empty(),
            Delta::Full => false,
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        match self {
            Delta::Rows(rows) => rows.contains(&row),
            Delta::Full => true,
        }
    }

    pub fn mark(&mut self, row: usize) {
        if let Delta::Rows(rows) = self {
            rows.insert(row);
        }
    }

    pub fn mark_range(&mut self, range: Range<usize>) {
        if let Delta::Rows(rows) = self {
            rows.extend(range);
        }
    }
}

/// Fold a line into rows of at most `params.width` cells.
///
/// A zero width or disabled auto-wrap yields a single fold. Every fold is
/// non-empty except the only fold of an empty line.
pub fn fold_line(
    line_no: usize,
    content: &StyledText,
    params: FoldParams,
    revision: u64,
) -> Vec<LineFold> {
    let make = |fold_index: usize, range: Range<usize>| LineFold {
        line_no,
        fold_index,
        char_offset: range.start,
        content: Arc::new(content.slice(range)),
        revision,
    };

    if params.width == 0 || !params.auto_wrap {
        return vec![make(0, 0..content.len())];
    }

    let mut folds = Vec::new();
    let mut start = 0;
    let mut row_cells = 0;
    let mut column = 0;
    for (index, cell) in content.cells().iter().enumerate() {
        let cells = char_cells(cell.ch, column, params.tab_size);
        if row_cells + cells > params.width && index > start {
            folds.push(make(folds.len(), start..index));
            start = index;
            row_cells = 0;
        }
        row_cells += cells;
        column += cells;
    }
    folds.push(make(folds.len(), start..content.len()));
    folds
}

/// Storage for one screen
#[derive(Debug, Default)]
pub struct Buffer {
    lines: Vec<LineRecord>,
    line_to_fold: Vec<usize>,
    folded_lines: Vec<LineFold>,
    pub scroll_margin: ScrollMargin,
    /// Folded row of the cursor
    pub cursor_line: usize,
    /// Character offset of the cursor within its folded row
    pub cursor_offset: usize,
    /// Widest line written so far, in cells
    max_line_width: usize,
    revision: u64,
    dirty: Delta,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&LineRecord> {
        self.lines.get(index)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn folded_lines(&self) -> &[LineFold] {
        &self.folded_lines
    }

    pub fn folded_line(&self, row: usize) -> Option<&LineFold> {
        self.folded_lines.get(row)
    }

    pub fn line_to_fold(&self) -> &[usize] {
        &self.line_to_fold
    }

    /// Cursor as (folded row, offset)
    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_line, self.cursor_offset)
    }

    /// Widest line written since the last clear, in cells. Without
    /// auto-wrap this is the width a renderer needs to show every line.
    pub fn max_line_width(&self) -> usize {
        self.max_line_width
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    pub fn delta(&self) -> &Delta {
        &self.dirty
    }

    /// Drain the accumulated dirty rows.
    pub fn take_delta(&mut self) -> Delta {
        std::mem::take(&mut self.dirty)
    }

    pub fn mark_dirty(&mut self, row: usize) {
        self.dirty.mark(row);
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty = Delta::Full;
    }

    /// Append a logical line.
    pub fn add_line(&mut self, content: StyledText, style: Arc<Style>, params: FoldParams) {
        let revision = self.next_revision();
        let line_no = self.lines.len();
        self.max_line_width = self.max_line_width.max(content.cell_width(params.tab_size));
        let folds = fold_line(line_no, &content, params, revision);

        let first = self.folded_lines.len();
        self.line_to_fold.push(first);
        self.dirty.mark_range(first..first + folds.len());
        self.folded_lines.extend(folds.iter().cloned());
        self.lines.push(LineRecord {
            content,
            trailing_style: style,
            folds,
            revision,
        });
    }

    /// Append blank lines until `index` exists.
    pub fn ensure_line(&mut self, index: usize, params: FoldParams) {
        while index >= self.lines.len() {
            self.add_line(StyledText::new(), Arc::new(Style::default()), params);
        }
    }

    /// Append blank lines until folded row `row` exists.
    pub fn ensure_row(&mut self, row: usize, params: FoldParams) {
        while row >= self.folded_lines.len() {
            self.add_line(StyledText::new(), Arc::new(Style::default()), params);
        }
    }

    /// Replace the content of a logical line and refold it.
    pub fn update_line(
        &mut self,
        index: usize,
        content: StyledText,
        style: Arc<Style>,
        params: FoldParams,
    ) {
        self.ensure_line(index, params);
        let revision = self.next_revision();
        self.max_line_width = self.max_line_width.max(content.cell_width(params.tab_size));

        let folds = fold_line(index, &content, params, revision);
        let old_count = self.lines[index].folds.len();
        let new_count = folds.len();
        let record = &mut self.lines[index];
        record.content = content;
        record.trailing_style = style;
        record.folds = folds;
        record.revision = revision;

        let first = self.line_to_fold[index];
        if old_count == new_count {
            let folds = &self.lines[index].folds;
            self.folded_lines[first..first + new_count].clone_from_slice(folds);
            self.dirty.mark_range(first..first + new_count);
        } else {
            let old_total = self.folded_lines.len();
            self.rebuild_folds_from(index);
            self.dirty
                .mark_range(first..old_total.max(self.folded_lines.len()));
        }
    }

    /// Rebuild the flattened fold index from logical line `index` onward.
    fn rebuild_folds_from(&mut self, index: usize) {
        let first = self.line_to_fold.get(index).copied().unwrap_or(self.folded_lines.len());
        self.line_to_fold.truncate(index);
        self.folded_lines.truncate(first);
        for record in &self.lines[index..] {
            self.line_to_fold.push(self.folded_lines.len());
            self.folded_lines.extend(record.folds.iter().cloned());
        }
    }

    /// Cursor as (logical line, character column).
    ///
    /// A cursor below the last row maps to a line past the end at the same
    /// distance.
    pub fn logical_cursor(&self) -> (usize, usize) {
        match self.folded_lines.get(self.cursor_line) {
            Some(fold) => (fold.line_no, fold.char_offset + self.cursor_offset),
            None => (
                self.lines.len() + (self.cursor_line - self.folded_lines.len()),
                self.cursor_offset,
            ),
        }
    }

    /// Place the cursor at a logical position.
    pub fn set_logical_cursor(&mut self, line: usize, column: usize) {
        match self.lines.get(line) {
            Some(record) => {
                let (fold_index, offset) = record
                    .folds
                    .iter()
                    .rev()
                    .find(|fold| fold.char_offset <= column)
                    .map(|fold| (fold.fold_index, column - fold.char_offset))
                    .unwrap_or((0, column));
                self.cursor_line = self.line_to_fold[line] + fold_index;
                self.cursor_offset = offset;
            }
            None => {
                self.cursor_line = self.folded_lines.len() + (line - self.lines.len());
                self.cursor_offset = column;
            }
        }
    }

    /// Re-derive the folded cursor from its logical position, so a cursor
    /// at the end of a full row moves to the start of the next fold.
    pub fn normalize_cursor(&mut self) {
        let (line, column) = self.logical_cursor();
        self.set_logical_cursor(line, column);
    }

    /// Refold every line, keeping the cursor at the same logical position.
    pub fn reflow(&mut self, params: FoldParams) {
        let (line, column) = self.logical_cursor();
        let revision = self.next_revision();
        for (line_no, record) in self.lines.iter_mut().enumerate() {
            record.folds = fold_line(line_no, &record.content, params, revision);
            record.revision = revision;
        }
        self.rebuild_folds_from(0);
        self.set_logical_cursor(line, column);
        self.mark_all_dirty();
    }

    /// Drop every line and home the cursor.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.line_to_fold.clear();
        self.folded_lines.clear();
        self.cursor_line = 0;
        self.cursor_offset = 0;
        self.max_line_width = 0;
        self.next_revision();
        self.mark_all_dirty();
    }

    /// Empty the lines in `range`, keeping `style` as their trailing style.
    pub fn blank_lines(&mut self, range: Range<usize>, style: &Arc<Style>, params: FoldParams) {
        for index in range {
            self.update_line(index, StyledText::new(), Arc::clone(style), params);
        }
    }

    /// Keep only the last `height` lines.
    pub fn trim_scrollback(&mut self, height: usize, params: FoldParams) {
        let excess = self.lines.len().saturating_sub(height);
        if excess == 0 {
            return;
        }
        let (line, column) = self.logical_cursor();
        self.lines.drain(..excess);
        let revision = self.next_revision();
        for (line_no, record) in self.lines.iter_mut().enumerate() {
            record.folds = fold_line(line_no, &record.content, params, revision);
            record.revision = revision;
        }
        self.rebuild_folds_from(0);
        self.set_logical_cursor(line.saturating_sub(excess), column);
        self.mark_all_dirty();
    }

    /// Shift lines within the scroll margin by `count`, filling the vacated
    /// lines with blanks. Lines outside the margin are left alone.
    pub fn scroll(
        &mut self,
        direction: ScrollDirection,
        count: usize,
        height: usize,
        params: FoldParams,
    ) {
        let (top, bottom) = self.scroll_margin.line_range(height);
        if top > bottom || count == 0 {
            return;
        }
        self.ensure_line(bottom, params);

        let source = |line_no: usize| -> Option<usize> {
            match direction {
                ScrollDirection::Up => line_no.checked_add(count).filter(|src| *src <= bottom),
                ScrollDirection::Down => line_no.checked_sub(count).filter(|src| *src >= top),
            }
        };
        let order: Vec<usize> = match direction {
            ScrollDirection::Up => (top..=bottom).collect(),
            ScrollDirection::Down => (top..=bottom).rev().collect(),
        };

        for line_no in order {
            let (content, style) = match source(line_no).and_then(|src| self.lines.get(src)) {
                Some(record) => (record.content.clone(), Arc::clone(&record.trailing_style)),
                None => (StyledText::new(), Arc::new(Style::default())),
            };
            self.update_line(line_no, content, style, params);
        }
    }
}
