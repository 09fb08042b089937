//! Terminal commands
//!
//! The closed set of operations the decoder produces and the state machine
//! applies. One command is produced per escape sequence or literal run;
//! a sequence that sets several modes yields a `Batch`.

use super::style::Style;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Replace the current style; this is the complete style, not a delta
    Style(Style),
    Cursor(CursorOp),
    NewLine,
    Clear(ClearKind),
    ScrollMargin {
        top: Option<usize>,
        bottom: Option<usize>,
    },
    Scroll {
        direction: ScrollDirection,
        count: usize,
    },
    WorkingDirectoryChanged(String),
    TitleChanged(String),
    CharsetUpdate {
        designation: Option<Designation>,
        invoke: Option<Invoke>,
    },
    FeatureToggle {
        flag: Feature,
        value: bool,
    },
    MouseTrackingUpdate(MouseTrackingUpdate),
    /// Several commands carried by one sequence, applied in order
    Batch(Vec<Command>),
}

/// Cursor movement combined with an optional edit of the cursor's line.
///
/// Edits are applied first, then relative moves, then absolute moves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CursorOp {
    pub dx: Option<isize>,
    pub dy: Option<isize>,
    pub absolute_x: Option<usize>,
    pub absolute_y: Option<usize>,
    /// Text to write at the cursor, or to substitute for `replace`
    pub text: Option<String>,
    pub replace: Option<ReplaceRange>,
    /// Overwrite `replace` with spaces instead of removing it
    pub blank: bool,
    /// Adopt the current style as the line's trailing style
    pub update_trailing_style: bool,
    /// Scroll instead of leaving the scroll margin
    pub auto_scroll: bool,
}

impl CursorOp {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            dx: Some(text.chars().count() as isize),
            text: Some(text),
            ..Self::default()
        }
    }

    pub fn has_edit(&self) -> bool {
        self.text.is_some() || self.replace.is_some()
    }
}

/// Half-open character range `[start, end)` within the cursor's line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplaceRange {
    pub start: Edge,
    pub end: Edge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Cursor,
    LineStart,
    LineEnd,
    /// Cursor plus an offset
    Relative(isize),
}

impl Edge {
    fn resolve(self, cursor: usize, line_len: usize) -> usize {
        let offset = match self {
            Edge::Cursor => cursor,
            Edge::LineStart => 0,
            Edge::LineEnd => line_len,
            Edge::Relative(n) => cursor.saturating_add_signed(n),
        };
        offset.min(line_len)
    }
}

impl ReplaceRange {
    pub fn new(start: Edge, end: Edge) -> Self {
        Self { start, end }
    }

    /// Resolve to character offsets, clamped to the line.
    pub fn offsets(&self, cursor: usize, line_len: usize) -> (usize, usize) {
        let start = self.start.resolve(cursor, line_len);
        let end = self.end.resolve(cursor, line_len);
        (start, end.max(start))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearKind {
    CursorToEnd,
    CursorToBeginning,
    Screen,
    Scrollback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Content moves towards the top
    Up,
    Down,
}

/// Store a character set identifier in one of the G0-G3 slots
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Designation {
    pub slot: usize,
    pub charset: char,
}

/// Change the GL/GR pointers, or single-shift one character
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invoke {
    pub gl: Option<usize>,
    pub gr: Option<usize>,
    pub shift: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    ShowCursor,
    AlternateScreen,
    BracketedPaste,
    CursorBlink,
    CursorKeysApplication,
    ReplaceMode,
    AutoWrap,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseMode {
    #[default]
    None,
    /// Press and release
    Button,
    /// Motion while a button is held
    Drag,
    /// All motion
    All,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseFormat {
    #[default]
    Normal,
    Utf8,
    Sgr,
    Urxvt,
}

/// Fields present are merged into the current mouse tracking state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseTrackingUpdate {
    pub mode: Option<MouseMode>,
    pub format: Option<MouseFormat>,
    pub focus_events: Option<bool>,
    pub alternate_scroll: Option<bool>,
}
