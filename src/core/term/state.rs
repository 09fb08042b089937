//! Terminal state management
//!
//! `TerminalState` owns the primary (scrollback) and alternate buffers and
//! interprets decoded commands against whichever one is active.

use std::sync::Arc;

use super::buffer::{Buffer, Delta, FoldParams, LineFold, ScrollMargin};
use super::charset::CharsetState;
use super::command::{
    ClearKind, Command, CursorOp, Feature, MouseFormat, MouseMode, MouseTrackingUpdate,
    ScrollDirection,
};
use super::decoder::{CommandStream, DEFAULT_CACHE_CAPACITY};
use super::style::Style;
use super::text::StyledText;
use super::tokenizer::Tokenizer;

/// Terminal modes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalModes {
    pub show_cursor: bool,
    pub alternate_screen: bool,
    pub bracketed_paste: bool,
    pub cursor_blink: bool,
    pub cursor_keys_application: bool,
    /// Overwrite characters at the cursor (`true`) or insert (`false`)
    pub replace_mode: bool,
    pub auto_wrap: bool,
}

impl Default for TerminalModes {
    fn default() -> Self {
        Self {
            show_cursor: true,
            alternate_screen: false,
            bracketed_paste: false,
            cursor_blink: false,
            cursor_keys_application: false,
            replace_mode: true,
            auto_wrap: true, // Usually enabled by default
        }
    }
}

/// Mouse reporting negotiated by the application
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseTracking {
    pub mode: MouseMode,
    pub format: MouseFormat,
    pub focus_events: bool,
    pub alternate_scroll: bool,
}

impl MouseTracking {
    pub fn merge(&mut self, update: MouseTrackingUpdate) {
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
        if let Some(format) = update.format {
            self.format = format;
        }
        if let Some(focus_events) = update.focus_events {
            self.focus_events = focus_events;
        }
        if let Some(alternate_scroll) = update.alternate_scroll {
            self.alternate_scroll = alternate_scroll;
        }
    }
}

/// Terminal state holding all screen data
#[derive(Debug)]
pub struct TerminalState {
    pub width: usize,
    pub height: usize,
    pub tab_size: usize,
    pub style: Arc<Style>,
    pub modes: TerminalModes,
    pub current_directory: String,
    pub title: String,
    pub scrollback: Buffer,
    pub alternate: Buffer,
    pub charset: CharsetState,
    pub mouse_tracking: MouseTracking,
    finalized: bool,
    revision: u64,
    stream: CommandStream,
}

impl TerminalState {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_options(width, height, 8, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_options(width: usize, height: usize, tab_size: usize, cache_capacity: usize) -> Self {
        Self {
            width,
            height,
            tab_size,
            style: Arc::new(Style::default()),
            modes: TerminalModes::default(),
            current_directory: String::new(),
            title: String::new(),
            scrollback: Buffer::new(),
            alternate: Buffer::new(),
            charset: CharsetState::default(),
            mouse_tracking: MouseTracking::default(),
            finalized: false,
            revision: 0,
            stream: CommandStream::new(cache_capacity),
        }
    }

    pub fn active_buffer(&self) -> &Buffer {
        if self.modes.alternate_screen {
            &self.alternate
        } else {
            &self.scrollback
        }
    }

    pub fn active_buffer_mut(&mut self) -> &mut Buffer {
        if self.modes.alternate_screen {
            &mut self.alternate
        } else {
            &mut self.scrollback
        }
    }

    /// Folded rows of the active buffer
    pub fn rows(&self) -> &[LineFold] {
        self.active_buffer().folded_lines()
    }

    /// Cursor as (folded row, character offset) in the active buffer
    pub fn cursor(&self) -> (usize, usize) {
        self.active_buffer().cursor()
    }

    pub fn cursor_visible(&self) -> bool {
        self.modes.show_cursor
    }

    pub fn is_alternate_screen(&self) -> bool {
        self.modes.alternate_screen
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Stop accepting output.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Detach the input tokenizer, with any sequence cut off at the end of
    /// the last write.
    pub fn take_tokenizer(&mut self) -> Tokenizer {
        self.stream.take_tokenizer()
    }

    pub fn resume_tokenizer(&mut self, tokenizer: Tokenizer) {
        self.stream.resume(tokenizer);
    }

    pub fn fold_params(&self) -> FoldParams {
        FoldParams {
            width: self.width,
            auto_wrap: self.modes.auto_wrap,
            tab_size: self.tab_size,
        }
    }

    /// Feed decoded text and return the rows of the active buffer that
    /// changed, or `Delta::Full` if the active buffer was switched.
    pub fn write(&mut self, text: &str) -> Delta {
        if self.finalized {
            tracing::trace!("Dropping {} bytes written after finalize", text.len());
            return Delta::default();
        }
        let was_alternate = self.modes.alternate_screen;
        for command in self.stream.feed(text) {
            self.apply(command);
        }
        let delta = self.active_buffer_mut().take_delta();
        if was_alternate != self.modes.alternate_screen {
            return Delta::Full;
        }
        delta
    }

    /// Apply a single command.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Style(style) => self.style = Arc::new(style),
            Command::Cursor(op) => self.cursor_op(op),
            Command::NewLine => {
                let op = if self.modes.alternate_screen {
                    CursorOp {
                        dy: Some(1),
                        auto_scroll: true,
                        ..CursorOp::default()
                    }
                } else {
                    CursorOp {
                        dy: Some(1),
                        absolute_x: Some(0),
                        ..CursorOp::default()
                    }
                };
                self.cursor_op(op);
            }
            Command::Clear(kind) => self.clear(kind),
            Command::ScrollMargin { top, bottom } => self.set_scroll_margin(top, bottom),
            Command::Scroll { direction, count } => {
                let (height, params) = (self.height, self.fold_params());
                let buffer = self.active_buffer_mut();
                let (line, column) = buffer.logical_cursor();
                buffer.scroll(direction, count, height, params);
                buffer.set_logical_cursor(line, column);
            }
            Command::WorkingDirectoryChanged(path) => {
                tracing::info!("Working directory changed to {:?}, finalizing", path);
                self.current_directory = path;
                self.finalize();
            }
            Command::TitleChanged(title) => self.title = title,
            Command::CharsetUpdate {
                designation,
                invoke,
            } => self.charset.update(designation, invoke),
            Command::FeatureToggle { flag, value } => self.set_feature(flag, value),
            Command::MouseTrackingUpdate(update) => self.mouse_tracking.merge(update),
            Command::Batch(commands) => {
                for command in commands {
                    self.apply(command);
                }
            }
        }
    }

    fn cursor_op(&mut self, op: CursorOp) {
        let params = self.fold_params();
        let height = self.height;
        let width = self.width;
        let alternate = self.modes.alternate_screen;
        // Last usable column while wrapping
        let clamp_x = |x: usize| {
            if params.auto_wrap && width > 0 {
                x.min(width - 1)
            } else {
                x
            }
        };

        let buffer = self.active_buffer_mut();
        buffer.ensure_row(buffer.cursor_line, params);

        if op.auto_scroll {
            if let Some(dy) = op.dy {
                let (top, bottom) = buffer.scroll_margin.line_range(height);
                let line = buffer.cursor_line;
                if (top..=bottom).contains(&line) {
                    let target = line as isize + dy;
                    let direction = if target > bottom as isize {
                        Some(ScrollDirection::Up)
                    } else if target < top as isize {
                        Some(ScrollDirection::Down)
                    } else {
                        None
                    };
                    if let Some(direction) = direction {
                        let (line, column) = buffer.logical_cursor();
                        buffer.scroll(direction, 1, height, params);
                        let column = op.absolute_x.map(clamp_x).unwrap_or(column);
                        buffer.set_logical_cursor(line, column);
                        return;
                    }
                }
            }
        }

        let start = buffer.cursor();
        if op.has_edit() {
            let text = match op.text.as_deref() {
                Some(text) => self.charset.translate(text),
                None => String::new(),
            };
            let style = Arc::clone(&self.style);
            let replace_mode = self.modes.replace_mode;
            let buffer = self.active_buffer_mut();
            edit_line(buffer, &op, &text, &style, replace_mode, params);
        }

        let buffer = self.active_buffer_mut();
        if let (Some(dx), false) = (op.dx, op.has_edit()) {
            let mut offset = buffer.cursor_offset.saturating_add_signed(dx);
            if width > 0 && offset > width {
                let rows = (offset - 1) / width;
                buffer.cursor_line = buffer.cursor_line.saturating_add(rows);
                offset -= rows * width;
            }
            buffer.cursor_offset = offset;
        }
        if let Some(x) = op.absolute_x {
            buffer.cursor_offset = clamp_x(x);
        }
        if let Some(dy) = op.dy {
            buffer.cursor_line = buffer.cursor_line.saturating_add_signed(dy);
        }
        if let Some(y) = op.absolute_y {
            buffer.cursor_line = y;
        }
        // The alternate screen stops at its last row; the primary buffer
        // may sit one row past its end or anywhere on the screen
        let last_row = if alternate && height > 0 {
            height - 1
        } else {
            buffer.folded_lines().len().max(height.saturating_sub(1))
        };
        buffer.cursor_line = buffer.cursor_line.min(last_row);
        buffer.normalize_cursor();

        if buffer.cursor() != start {
            buffer.mark_dirty(start.0);
            buffer.mark_dirty(buffer.cursor_line);
        }
    }

    fn clear(&mut self, kind: ClearKind) {
        let params = self.fold_params();
        let height = self.height;
        let style = Arc::clone(&self.style);
        let buffer = self.active_buffer_mut();
        match kind {
            ClearKind::Screen => {
                buffer.clear();
                for _ in 0..height {
                    buffer.add_line(StyledText::new(), Arc::clone(&style), params);
                }
                self.revision += 1;
            }
            ClearKind::CursorToEnd => {
                let (line, column) = buffer.logical_cursor();
                if let Some(record) = buffer.line(line) {
                    let content = record.content.slice(0..column);
                    buffer.update_line(line, content, Arc::clone(&style), params);
                }
                let end = buffer.line_count();
                buffer.blank_lines(line + 1..end, &style, params);
                buffer.set_logical_cursor(line, column);
            }
            ClearKind::CursorToBeginning => {
                let (line, column) = buffer.logical_cursor();
                let end = line.min(buffer.line_count());
                buffer.blank_lines(0..end, &style, params);
                if let Some(record) = buffer.line(line) {
                    let content = &record.content;
                    let blank_end = (column + 1).min(content.len());
                    let blanks = StyledText::styled(&" ".repeat(blank_end), &style);
                    let rest = content.slice(blank_end..content.len());
                    let trailing = Arc::clone(&record.trailing_style);
                    let updated = StyledText::assemble(&[&blanks, &rest]);
                    buffer.update_line(line, updated, trailing, params);
                }
                buffer.set_logical_cursor(line, column);
            }
            ClearKind::Scrollback => buffer.trim_scrollback(height, params),
        }
    }

    fn set_scroll_margin(&mut self, top: Option<usize>, bottom: Option<usize>) {
        let buffer = self.active_buffer_mut();
        match (top, bottom) {
            (Some(top), Some(bottom)) if top >= bottom => {
                tracing::debug!("Ignoring scroll margin {}..{}", top, bottom);
            }
            _ => buffer.scroll_margin = ScrollMargin { top, bottom },
        }
        // Setting the margins homes the cursor
        buffer.mark_dirty(buffer.cursor_line);
        buffer.cursor_line = 0;
        buffer.cursor_offset = 0;
        buffer.mark_dirty(0);
    }

    fn set_feature(&mut self, flag: Feature, value: bool) {
        match flag {
            Feature::ShowCursor => {
                self.modes.show_cursor = value;
                let buffer = self.active_buffer_mut();
                buffer.mark_dirty(buffer.cursor_line);
            }
            Feature::AlternateScreen => self.set_alternate_screen(value),
            Feature::BracketedPaste => self.modes.bracketed_paste = value,
            Feature::CursorBlink => self.modes.cursor_blink = value,
            Feature::CursorKeysApplication => self.modes.cursor_keys_application = value,
            Feature::ReplaceMode => self.modes.replace_mode = value,
            Feature::AutoWrap => self.modes.auto_wrap = value,
        }
    }

    fn set_alternate_screen(&mut self, enable: bool) {
        if enable == self.modes.alternate_screen {
            return;
        }
        self.modes.alternate_screen = enable;
        if enable {
            let params = self.fold_params();
            let style = Arc::new(Style::default());
            self.alternate.clear();
            self.alternate.scroll_margin = ScrollMargin::default();
            for _ in 0..self.height {
                self.alternate.add_line(StyledText::new(), Arc::clone(&style), params);
            }
            self.alternate.mark_all_dirty();
        } else {
            self.scrollback.mark_all_dirty();
        }
    }

    /// Resize the terminal. A width change refolds both buffers.
    pub fn update_size(&mut self, width: usize, height: usize) {
        let width_changed = width != self.width;
        self.width = width;
        self.height = height;
        let params = self.fold_params();
        if width_changed {
            self.scrollback.reflow(params);
            self.alternate.reflow(params);
        }
        if self.modes.alternate_screen && height > 0 {
            self.alternate.ensure_line(height - 1, params);
        }
    }
}

/// Splice an edit into the cursor's line and move the cursor past any
/// inserted text.
fn edit_line(
    buffer: &mut Buffer,
    op: &CursorOp,
    text: &str,
    style: &Arc<Style>,
    replace_mode: bool,
    params: FoldParams,
) {
    let (line_no, column) = buffer.logical_cursor();
    buffer.ensure_line(line_no, params);
    let Some(record) = buffer.line(line_no) else {
        return;
    };
    let mut content = record.content.clone();
    let trailing = if op.update_trailing_style {
        Arc::clone(style)
    } else {
        Arc::clone(&record.trailing_style)
    };

    let inserted = StyledText::styled(text, style);
    if column > content.len() && (!inserted.is_empty() || op.blank) {
        content.pad_right(column - content.len());
    }

    let len = content.len();
    let updated = match op.replace {
        Some(range) => {
            let (start, end) = range.offsets(column, len);
            let middle = if op.blank {
                StyledText::styled(&" ".repeat(end - start), style)
            } else {
                inserted.clone()
            };
            StyledText::assemble(&[&content.slice(0..start), &middle, &content.slice(end..len)])
        }
        None if column >= len => {
            content.push_text(&inserted);
            content
        }
        None if replace_mode => StyledText::assemble(&[
            &content.slice(0..column),
            &inserted,
            &content.slice(column + inserted.len()..len),
        ]),
        None => StyledText::assemble(&[
            &content.slice(0..column),
            &inserted,
            &content.slice(column..len),
        ]),
    };
    buffer.update_line(line_no, updated, trailing, params);

    let advance = if op.dx.is_some() && op.text.is_some() {
        inserted.len()
    } else {
        0
    };
    buffer.set_logical_cursor(line_no, column + advance);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::style::Color;

    fn row_text(state: &TerminalState, row: usize) -> String {
        state.rows()[row].content.plain()
    }

    #[test]
    fn test_styled_hello() {
        let mut state = TerminalState::new(80, 24);
        state.write("\x1b[31mHello\x1b[0m\n");

        let line = &state.active_buffer().lines()[0].content;
        assert_eq!(line.plain(), "Hello");
        for cell in line.cells() {
            assert_eq!(cell.style.foreground, Some(Color::Indexed(1)));
        }
        assert!(state.style.is_default());
        assert_eq!(state.cursor(), (1, 0));
    }

    #[test]
    fn test_clear_screen() {
        let mut state = TerminalState::new(80, 24);
        state.write("some\r\noutput\r\n");
        let revision = state.revision();

        let delta = state.write("\x1b[2J");
        assert!(delta.is_full());
        assert_eq!(state.rows().len(), 24);
        assert!(state.rows().iter().all(|row| row.content.is_empty()));
        assert_eq!(state.revision(), revision + 1);
    }

    #[test]
    fn test_scroll_margins() {
        let mut state = TerminalState::new(80, 24);
        let lines: Vec<String> = (0..24).map(|n| format!("line {}", n)).collect();
        state.write(&lines.join("\n"));

        state.write("\x1b[3;11r");
        assert_eq!(state.cursor(), (0, 0));
        state.write("\x1b[S");

        assert_eq!(row_text(&state, 0), "line 0");
        assert_eq!(row_text(&state, 1), "line 1");
        assert_eq!(row_text(&state, 2), "line 3");
        assert_eq!(row_text(&state, 9), "line 10");
        assert_eq!(row_text(&state, 10), "");
        assert_eq!(row_text(&state, 11), "line 11");
        assert_eq!(row_text(&state, 23), "line 23");
    }

    #[test]
    fn test_invalid_margin_still_homes_cursor() {
        let mut state = TerminalState::new(80, 24);
        state.write("abc\r\ndef");
        state.write("\x1b[9;3r");
        assert_eq!(state.active_buffer().scroll_margin, ScrollMargin::default());
        assert_eq!(state.cursor(), (0, 0));
    }

    #[test]
    fn test_overflow_by_one_cell() {
        let mut state = TerminalState::new(80, 24);
        state.write(&"x".repeat(81));
        let folds = &state.active_buffer().lines()[0].folds;
        assert_eq!(folds.len(), 2);
        assert_eq!(folds[1].content.plain(), "x");
        assert_eq!(state.cursor(), (1, 1));
    }

    #[test]
    fn test_exact_width_keeps_pending_wrap() {
        let mut state = TerminalState::new(10, 5);
        state.write(&"x".repeat(10));
        assert_eq!(state.rows().len(), 1);
        assert_eq!(state.cursor(), (0, 10));
        state.write("y");
        assert_eq!(state.rows().len(), 2);
        assert_eq!(state.cursor(), (1, 1));
    }

    #[test]
    fn test_working_directory_split_write() {
        let mut state = TerminalState::new(80, 24);
        state.write("\x1b]2025;/t");
        assert!(!state.is_finalized());
        state.write("mp;\x1b\\");
        assert_eq!(state.current_directory, "/tmp");
        assert!(state.is_finalized());

        let delta = state.write("ignored");
        assert!(delta.is_empty());
        assert!(state.rows().is_empty());
    }

    #[test]
    fn test_finalizing_chunk_is_applied() {
        let mut state = TerminalState::new(80, 24);
        state.write("\x1b]2025;/home\x07done");
        assert!(state.is_finalized());
        assert_eq!(row_text(&state, 0), "done");
    }

    #[test]
    fn test_alternate_screen() {
        let mut state = TerminalState::new(80, 5);
        state.write("primary");

        let delta = state.write("\x1b[?1049h");
        assert!(delta.is_full());
        assert!(state.is_alternate_screen());
        assert_eq!(state.rows().len(), 5);
        assert_eq!(state.cursor(), (0, 0));

        // Newline keeps the column on the alternate screen
        state.write("a\nb");
        assert_eq!(row_text(&state, 1), " b");

        let delta = state.write("\x1b[?1049l");
        assert!(delta.is_full());
        assert_eq!(row_text(&state, 0), "primary");
    }

    #[test]
    fn test_alternate_newline_scrolls_at_bottom() {
        let mut state = TerminalState::new(80, 3);
        state.write("\x1b[?1049h1\r\n2\r\n3\r\n4");
        let rows: Vec<String> = state.rows().iter().map(|row| row.content.plain()).collect();
        assert_eq!(rows, vec!["2", "3", "4"]);
        assert_eq!(state.cursor(), (2, 1));
    }

    #[test]
    fn test_reverse_index_scrolls_down_at_top() {
        let mut state = TerminalState::new(80, 3);
        state.write("\x1b[?1049h1\r\n2\r\n3\x1b[H\x1bM");
        let rows: Vec<String> = state.rows().iter().map(|row| row.content.plain()).collect();
        assert_eq!(rows, vec!["", "1", "2"]);
    }

    #[test]
    fn test_next_line_scrolls_and_returns_at_bottom() {
        let mut state = TerminalState::new(80, 3);
        state.write("\x1b[?1049h1\r\n2\r\n3\x1bE");
        let rows: Vec<String> = state.rows().iter().map(|row| row.content.plain()).collect();
        assert_eq!(rows, vec!["2", "3", ""]);
        assert_eq!(state.cursor(), (2, 0));
    }

    #[test]
    fn test_replace_and_insert_modes() {
        let mut state = TerminalState::new(80, 24);
        state.write("abc\rX");
        assert_eq!(row_text(&state, 0), "Xbc");
        state.write("\x1b[4h\rY");
        assert_eq!(row_text(&state, 0), "YXbc");
        assert_eq!(state.cursor(), (0, 1));
    }

    #[test]
    fn test_backspace_overwrites() {
        let mut state = TerminalState::new(80, 24);
        state.write("ab\x08c");
        assert_eq!(row_text(&state, 0), "ac");
    }

    #[test]
    fn test_erase_in_line() {
        let mut state = TerminalState::new(80, 24);
        state.write("hello\x1b[3D\x1b[K");
        assert_eq!(row_text(&state, 0), "he");
        assert_eq!(state.cursor(), (0, 2));

        state.write("\rhello\x1b[2D\x1b[1K");
        assert_eq!(row_text(&state, 0), "    o");

        state.write("\x1b[2K");
        assert_eq!(row_text(&state, 0), "");
        assert_eq!(state.cursor(), (0, 3));
    }

    #[test]
    fn test_erase_in_line_sets_trailing_style() {
        let mut state = TerminalState::new(80, 24);
        state.write("\x1b[44mab\x1b[K");
        let trailing = &state.active_buffer().lines()[0].trailing_style;
        assert_eq!(trailing.background, Some(Color::Indexed(4)));
    }

    #[test]
    fn test_delete_and_erase_characters() {
        let mut state = TerminalState::new(80, 24);
        state.write("hello\r\x1b[2P");
        assert_eq!(row_text(&state, 0), "llo");
        state.write("\x1b[2X");
        assert_eq!(row_text(&state, 0), "  o");
        assert_eq!(state.cursor(), (0, 0));
    }

    #[test]
    fn test_cursor_position_pads_line() {
        let mut state = TerminalState::new(80, 24);
        state.write("\x1b[3;5Hx");
        assert_eq!(state.active_buffer().line_count(), 3);
        assert_eq!(row_text(&state, 2), "    x");
        assert_eq!(state.cursor(), (2, 5));
    }

    #[test]
    fn test_relative_moves_wrap_past_width() {
        let mut state = TerminalState::new(10, 24);
        state.write("\x1b[15C");
        assert_eq!(state.cursor(), (1, 5));
        state.write("\x1b[20D");
        assert_eq!(state.cursor(), (1, 0));
    }

    #[test]
    fn test_move_to_full_row_end_survives_resize() {
        let mut state = TerminalState::new(10, 24);
        state.write(&"a".repeat(30));
        state.write("\x1b[H\x1b[10C");
        assert_eq!(state.cursor(), (1, 0));
        assert_eq!(state.active_buffer().logical_cursor(), (0, 10));

        state.update_size(20, 24);
        state.update_size(10, 24);
        assert_eq!(state.cursor(), (1, 0));
    }

    #[test]
    fn test_cursor_position_clamps_to_last_column() {
        let mut state = TerminalState::new(10, 24);
        state.write(&"a".repeat(30));
        state.write("\x1b[1;16H");
        assert_eq!(state.cursor(), (0, 9));

        state.update_size(20, 24);
        state.update_size(10, 24);
        assert_eq!(state.cursor(), (0, 9));

        state.write("\x1b[?7l\x1b[1;16H");
        assert_eq!(state.active_buffer().logical_cursor(), (0, 15));
    }

    #[test]
    fn test_erase_display_keeps_logical_cursor() {
        let mut state = TerminalState::new(10, 24);
        state.write(&"a".repeat(30));
        state.write("\r\nnext\x1b[1;1H\x1b[10C\x1b[J");
        assert_eq!(state.cursor(), (0, 10));
        assert_eq!(state.rows().len(), 2);
        assert_eq!(row_text(&state, 0), "a".repeat(10));

        let mut state = TerminalState::new(10, 24);
        state.write(&"b".repeat(25));
        state.write("\r\ntwo\x1b[1D\x1b[1J");
        assert_eq!(state.cursor(), (1, 2));
        assert_eq!(state.rows().len(), 2);
        assert_eq!(row_text(&state, 1), "   ");
    }

    #[test]
    fn test_scroll_keeps_logical_cursor() {
        let mut state = TerminalState::new(10, 3);
        state.write(&"a".repeat(25));
        state.write("\r\nb\r\nc\x1b[3;1H");
        assert_eq!(state.active_buffer().logical_cursor(), (0, 20));

        // Line 0 shrinks to one fold, the cursor stays on logical line 0
        state.write("\x1b[S");
        assert_eq!(row_text(&state, 0), "b");
        assert_eq!(state.active_buffer().logical_cursor(), (0, 20));
        assert_eq!(state.cursor(), (0, 20));
    }

    #[test]
    fn test_huge_moves_stay_bounded() {
        let mut state = TerminalState::new(1, 24);
        state.write("\x1b[2000000Cx");
        assert_eq!(state.active_buffer().line_count(), 24);
        assert_eq!(state.cursor().0, state.rows().len() - 1);

        let mut state = TerminalState::new(80, 24);
        state.write("\x1b[99999999999999999999B\x1b[99999999999999999999Gy");
        assert_eq!(state.active_buffer().line_count(), 24);
        assert_eq!(state.active_buffer().logical_cursor(), (23, 80));
    }

    #[test]
    fn test_alternate_cursor_stops_at_last_row() {
        let mut state = TerminalState::new(80, 3);
        state.write("\x1b[?1049h\x1b[10B");
        assert_eq!(state.cursor(), (2, 0));
        state.write("\x1b[40;1H");
        assert_eq!(state.cursor(), (2, 0));
        assert_eq!(state.rows().len(), 3);
    }

    #[test]
    fn test_erase_display_to_end() {
        let mut state = TerminalState::new(80, 24);
        state.write("one\r\ntwo\r\nthree\x1b[2;2H\x1b[J");
        assert_eq!(row_text(&state, 0), "one");
        assert_eq!(row_text(&state, 1), "t");
        assert_eq!(row_text(&state, 2), "");
    }

    #[test]
    fn test_erase_display_to_beginning() {
        let mut state = TerminalState::new(80, 24);
        state.write("one\r\ntwo\r\nthree\x1b[2;2H\x1b[1J");
        assert_eq!(row_text(&state, 0), "");
        assert_eq!(row_text(&state, 1), "  o");
        assert_eq!(row_text(&state, 2), "three");
    }

    #[test]
    fn test_erase_scrollback() {
        let mut state = TerminalState::new(80, 2);
        state.write("1\r\n2\r\n3\r\n4");
        state.write("\x1b[3J");
        let rows: Vec<String> = state.rows().iter().map(|row| row.content.plain()).collect();
        assert_eq!(rows, vec!["3", "4"]);
        assert_eq!(state.cursor(), (1, 1));
    }

    #[test]
    fn test_line_drawing_charset() {
        let mut state = TerminalState::new(80, 24);
        state.write("\x1b(0lqk\x1b(Bq");
        assert_eq!(row_text(&state, 0), "┌─┐q");
    }

    #[test]
    fn test_wide_glyph_cursor() {
        let mut state = TerminalState::new(4, 24);
        state.write("abc日");
        assert_eq!(row_text(&state, 0), "abc");
        assert_eq!(row_text(&state, 1), "日");
        assert_eq!(state.cursor(), (1, 1));
    }

    #[test]
    fn test_resize_reflows_and_restores_cursor() {
        let mut state = TerminalState::new(10, 24);
        state.write(&"a".repeat(30));
        assert_eq!(state.cursor(), (2, 10));

        state.update_size(20, 24);
        assert_eq!(state.cursor(), (1, 10));
        assert_eq!(state.rows().len(), 2);

        state.update_size(7, 24);
        state.update_size(10, 24);
        assert_eq!(state.cursor(), (2, 10));
        assert!(state.active_buffer_mut().take_delta().is_full());
    }

    #[test]
    fn test_resize_pads_alternate_screen() {
        let mut state = TerminalState::new(80, 3);
        state.write("\x1b[?1049h");
        state.update_size(80, 6);
        assert_eq!(state.rows().len(), 6);
    }

    #[test]
    fn test_auto_wrap_disabled() {
        let mut state = TerminalState::new(5, 24);
        state.write("\x1b[?7l");
        state.write("abcdefgh");
        assert_eq!(state.rows().len(), 1);
        assert_eq!(state.cursor(), (0, 8));
    }

    #[test]
    fn test_modes_and_mouse() {
        let mut state = TerminalState::new(80, 24);
        state.write("\x1b[?25l\x1b[?2004h\x1b[?1h\x1b[?12h\x1b[?1003;1006h\x1b[?1004h");
        assert!(!state.cursor_visible());
        assert!(state.modes.bracketed_paste);
        assert!(state.modes.cursor_keys_application);
        assert!(state.modes.cursor_blink);
        assert_eq!(state.mouse_tracking.mode, MouseMode::All);
        assert_eq!(state.mouse_tracking.format, MouseFormat::Sgr);
        assert!(state.mouse_tracking.focus_events);

        state.write("\x1b[?1003l");
        assert_eq!(state.mouse_tracking.mode, MouseMode::None);
        assert_eq!(state.mouse_tracking.format, MouseFormat::Sgr);
    }

    #[test]
    fn test_combined_private_modes() {
        let mut state = TerminalState::new(80, 24);
        state.write("\x1b[?25;2004l\x1b[?25;2004h");
        assert!(state.cursor_visible());
        assert!(state.modes.bracketed_paste);

        state.write("\x1b[?25;1002;1006l\x1b[?1049;1000h");
        assert!(!state.cursor_visible());
        assert!(state.is_alternate_screen());
        assert_eq!(state.mouse_tracking.mode, MouseMode::Button);
        assert_eq!(state.mouse_tracking.format, MouseFormat::Normal);
    }

    #[test]
    fn test_title() {
        let mut state = TerminalState::new(80, 24);
        state.write("\x1b]0;my shell\x07");
        assert_eq!(state.title, "my shell");
        assert!(state.rows().is_empty());
    }

    #[test]
    fn test_unknown_sequences_are_ignored() {
        let mut state = TerminalState::new(80, 24);
        state.write("a\x1b[?9999h\x1b[5n\x1bPq\x1b\\\x1b#8b");
        assert_eq!(row_text(&state, 0), "ab");
    }

    #[test]
    fn test_delta_reports_changed_rows() {
        let mut state = TerminalState::new(80, 24);
        state.write("a\r\nb\r\nc");
        let delta = state.write("\x1b[2;1Hx");
        assert!(delta.contains(1));
        assert!(!delta.contains(0));
    }

    #[test]
    fn test_state_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<TerminalState>();
    }
}
