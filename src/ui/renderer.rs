//! Terminal renderers
//!
//! `StyledRenderer` writes folded rows to any `Write` using crossterm
//! commands. `DebugRenderer` produces a plain text dump of the state.

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

use crate::core::term::{AttrFlags, Delta, LineFold, Style, TerminalState};

/// Renders styled rows as ANSI output
#[derive(Debug, Default)]
pub struct StyledRenderer {
    /// Mark the cursor cell with reverse video
    pub show_cursor: bool,
}

impl StyledRenderer {
    pub fn new() -> Self {
        Self { show_cursor: true }
    }

    /// Render every row of the active buffer
    pub fn render<W: Write>(&self, out: &mut W, state: &TerminalState) -> io::Result<()> {
        for row in 0..state.rows().len() {
            self.render_row(out, state, row)?;
        }
        out.flush()
    }

    /// Render only the rows named by `delta`
    pub fn render_delta<W: Write>(
        &self,
        out: &mut W,
        state: &TerminalState,
        delta: &Delta,
    ) -> io::Result<()> {
        match delta {
            Delta::Full => self.render(out, state),
            Delta::Rows(rows) => {
                for &row in rows {
                    if row < state.rows().len() {
                        queue!(out, Print(format!("{:>5} ", row)))?;
                        self.render_row(out, state, row)?;
                    }
                }
                out.flush()
            }
        }
    }

    fn render_row<W: Write>(&self, out: &mut W, state: &TerminalState, row: usize) -> io::Result<()> {
        let Some(fold) = state.rows().get(row) else {
            return Ok(());
        };
        let (cursor_row, cursor_offset) = state.cursor();
        let cursor = (self.show_cursor && state.cursor_visible() && cursor_row == row)
            .then_some(cursor_offset);

        let mut offset = 0;
        for (text, style) in fold.content.runs() {
            let len = text.chars().count();
            match cursor {
                Some(at) if at >= offset && at < offset + len => {
                    let split = text.char_indices().nth(at - offset).map_or(text.len(), |(i, _)| i);
                    let (before, rest) = text.split_at(split);
                    let mut chars = rest.chars();
                    let under = chars.next().unwrap_or(' ');
                    write_run(out, before, &style, false)?;
                    write_run(out, &under.to_string(), &style, true)?;
                    write_run(out, chars.as_str(), &style, false)?;
                }
                _ => write_run(out, &text, &style, false)?,
            }
            offset += len;
        }

        // Cursor past the end of the row
        if let Some(at) = cursor {
            if at >= offset {
                queue!(out, Print(" ".repeat(at - offset)))?;
                write_run(out, " ", &Style::default(), true)?;
            }
        }
        queue!(out, Print("\r\n"))?;
        Ok(())
    }
}

fn write_run<W: Write>(out: &mut W, text: &str, style: &Style, reverse: bool) -> io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    if style.is_default() && !reverse {
        queue!(out, Print(text))?;
        return Ok(());
    }

    apply_style(out, style, reverse)?;
    if let Some(link) = &style.link {
        queue!(out, Print(format!("\x1b]8;;{}\x1b\\", link)))?;
    }
    queue!(out, Print(text))?;
    if style.link.is_some() {
        queue!(out, Print("\x1b]8;;\x1b\\"))?;
    }
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
    Ok(())
}

/// Apply style attributes
fn apply_style<W: Write>(out: &mut W, style: &Style, reverse: bool) -> io::Result<()> {
    if style.has(AttrFlags::BOLD) {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if style.has(AttrFlags::DIM) {
        queue!(out, SetAttribute(Attribute::Dim))?;
    }
    if style.has(AttrFlags::ITALIC) {
        queue!(out, SetAttribute(Attribute::Italic))?;
    }
    if style.has(AttrFlags::DOUBLE_UNDERLINE) {
        queue!(out, SetAttribute(Attribute::DoubleUnderlined))?;
    } else if style.has(AttrFlags::UNDERLINE) {
        queue!(out, SetAttribute(Attribute::Underlined))?;
    }
    if style.has(AttrFlags::BLINK) {
        queue!(out, SetAttribute(Attribute::SlowBlink))?;
    }
    // Cursor cell flips whatever the cell already has
    if style.has(AttrFlags::INVERSE) != reverse {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    if style.has(AttrFlags::HIDDEN) {
        queue!(out, SetAttribute(Attribute::Hidden))?;
    }
    if style.has(AttrFlags::STRIKETHROUGH) {
        queue!(out, SetAttribute(Attribute::CrossedOut))?;
    }

    if let Some(fg) = style.foreground {
        queue!(out, SetForegroundColor(fg.to_crossterm()))?;
    }
    if let Some(bg) = style.background {
        queue!(out, SetBackgroundColor(bg.to_crossterm()))?;
    }
    Ok(())
}

/// Simple debug renderer that outputs to a string
pub struct DebugRenderer;

impl DebugRenderer {
    /// Render state to string (for debugging)
    pub fn render(state: &TerminalState) -> String {
        let rows = state.rows();
        let (cursor_row, cursor_offset) = state.cursor();
        let mut output = String::new();

        output.push_str(&format!("=== Terminal {}x{} ===\n", state.width, state.height));
        output.push_str(&format!(
            "Cursor: ({}, {}) visible={}\n",
            cursor_offset,
            cursor_row,
            state.cursor_visible()
        ));
        output.push_str(&format!("Title: {}\n", state.title));
        output.push_str(&format!("Directory: {}\n", state.current_directory));
        output.push_str(&format!("Alternate: {}\n", state.is_alternate_screen()));
        // Unwrapped lines may run past the terminal width
        let ruler = "─".repeat(state.width.max(state.active_buffer().max_line_width()));
        output.push_str(&ruler);
        output.push('\n');

        for (row_idx, fold) in rows.iter().enumerate() {
            let is_cursor_row = row_idx == cursor_row;
            output.push(if is_cursor_row { '>' } else { ' ' });
            output.push_str(&Self::render_fold(
                fold,
                is_cursor_row.then_some(cursor_offset),
                state.cursor_visible(),
            ));
            output.push('\n');
        }

        // Cursor below the last row
        if cursor_row >= rows.len() {
            output.push('>');
            if state.cursor_visible() {
                output.push_str(&" ".repeat(cursor_offset));
                output.push('█');
            }
            output.push('\n');
        }

        output.push_str(&ruler);
        output.push('\n');

        output
    }

    fn render_fold(fold: &LineFold, cursor: Option<usize>, visible: bool) -> String {
        let mut line: Vec<char> = fold.content.cells().iter().map(|c| c.ch).collect();
        if let Some(at) = cursor.filter(|_| visible) {
            if at >= line.len() {
                line.resize(at + 1, ' ');
            }
            line[at] = '█';
        }
        line.into_iter().collect()
    }
}
