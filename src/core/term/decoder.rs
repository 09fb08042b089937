//! Command decoding
//!
//! Translates tokens into [`Command`]s. The `decode_*` functions are pure;
//! [`Decoder`] memoizes the two hot ones in bounded LRU caches, and
//! [`CommandStream`] couples the tokenizer with the running style.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::command::{
    ClearKind, Command, CursorOp, Designation, Edge, Feature, Invoke, MouseFormat, MouseMode,
    MouseTrackingUpdate, ReplaceRange, ScrollDirection,
};
use super::style::{AttrFlags, Color, Style};
use super::tokenizer::{SequenceKind, Token, Tokenizer};

/// Default number of entries in each decode cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Parse an SGR field, clamped to 255. An empty field is 0.
fn sgr_number(field: &str) -> u8 {
    if field.is_empty() {
        return 0;
    }
    field.parse::<u64>().map_or(255, |n| n.min(255) as u8)
}

/// Apply a simple (single field) SGR code.
fn apply_sgr_code(style: &mut Style, code: u8) {
    match code {
        1 => style.set(AttrFlags::BOLD),
        2 => style.set(AttrFlags::DIM),
        3 => style.set(AttrFlags::ITALIC),
        4 => style.set(AttrFlags::UNDERLINE),
        5 | 6 => style.set(AttrFlags::BLINK),
        7 => style.set(AttrFlags::INVERSE),
        8 => style.set(AttrFlags::HIDDEN),
        9 => style.set(AttrFlags::STRIKETHROUGH),
        21 => style.set(AttrFlags::DOUBLE_UNDERLINE),
        22 => style.unset(AttrFlags::BOLD | AttrFlags::DIM),
        23 => style.unset(AttrFlags::ITALIC),
        24 => style.unset(AttrFlags::UNDERLINE | AttrFlags::DOUBLE_UNDERLINE),
        25 => style.unset(AttrFlags::BLINK),
        27 => style.unset(AttrFlags::INVERSE),
        28 => style.unset(AttrFlags::HIDDEN),
        29 => style.unset(AttrFlags::STRIKETHROUGH),
        30..=37 => style.foreground = Some(Color::Indexed(code - 30)),
        39 => style.foreground = Some(Color::Default),
        40..=47 => style.background = Some(Color::Indexed(code - 40)),
        49 => style.background = Some(Color::Default),
        90..=97 => style.foreground = Some(Color::Indexed(code - 90 + 8)),
        100..=107 => style.background = Some(Color::Indexed(code - 100 + 8)),
        _ => {
            tracing::trace!("Unknown SGR code {}", code);
        }
    }
}

fn set_color(style: &mut Style, selector: u8, color: Color) {
    if selector == 38 {
        style.foreground = Some(color);
    } else {
        style.background = Some(color);
    }
}

/// Decode a colon separated field such as `38:2::255:0:0` or `4:3`.
fn apply_sgr_group(style: &mut Style, field: &str) {
    let parts: Vec<u8> = field.split(':').map(sgr_number).collect();
    match parts.as_slice() {
        [selector @ (38 | 48), 2, rest @ ..] => {
            // The color space id is optional
            let rgb = if rest.len() >= 4 { &rest[1..4] } else { rest };
            if let [r, g, b] = rgb {
                set_color(style, *selector, Color::Rgb(*r, *g, *b));
            }
        }
        [selector @ (38 | 48), 5, index, ..] => {
            set_color(style, *selector, Color::Indexed(*index));
        }
        [4, 0, ..] => style.unset(AttrFlags::UNDERLINE | AttrFlags::DOUBLE_UNDERLINE),
        [4, 2, ..] => style.set(AttrFlags::DOUBLE_UNDERLINE),
        [4, _, ..] => style.set(AttrFlags::UNDERLINE),
        [code, ..] => apply_sgr_code(style, *code),
        [] => {}
    }
}

/// Decode SGR parameters (the text between `ESC [` and `m`).
///
/// Returns `None` for a reset: any `0` field, including an empty one,
/// discards everything before it.
pub fn decode_sgr(params: &str) -> Option<Style> {
    let fields: Vec<&str> = params.split(';').collect();
    let mut style = Style::default();
    let mut index = 0;
    while index < fields.len() {
        let field = fields[index];
        index += 1;
        if field.contains(':') {
            apply_sgr_group(&mut style, field);
            continue;
        }
        match sgr_number(field) {
            0 => return None,
            selector @ (38 | 48) => {
                let mode = fields.get(index).map(|field| sgr_number(field));
                match mode {
                    Some(5) if index + 1 < fields.len() => {
                        let color = Color::Indexed(sgr_number(fields[index + 1]));
                        set_color(&mut style, selector, color);
                        index += 2;
                    }
                    Some(2) if index + 3 < fields.len() => {
                        let color = Color::Rgb(
                            sgr_number(fields[index + 1]),
                            sgr_number(fields[index + 2]),
                            sgr_number(fields[index + 3]),
                        );
                        set_color(&mut style, selector, color);
                        index += 4;
                    }
                    _ => {
                        tracing::trace!("Incomplete extended color in SGR {:?}", params);
                    }
                }
            }
            code => apply_sgr_code(&mut style, code),
        }
    }
    Some(style)
}

/// Largest CSI parameter; bigger values saturate
pub const MAX_CSI_PARAM: usize = 65535;

/// Parse a CSI field, clamped to [`MAX_CSI_PARAM`]. An empty field is 0.
fn csi_number(field: &str) -> Option<usize> {
    if field.is_empty() {
        return Some(0);
    }
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(field.parse::<usize>().map_or(MAX_CSI_PARAM, |n| n.min(MAX_CSI_PARAM)))
}

/// The parts of a CSI body
struct CsiParts<'a> {
    private: Option<char>,
    params: Vec<usize>,
    intermediates: &'a str,
    final_byte: char,
}

fn split_csi(raw: &str) -> Option<CsiParts<'_>> {
    let final_byte = raw.chars().last()?;
    let body = &raw[..raw.len() - final_byte.len_utf8()];
    let split = body
        .find(|c: char| ('\x20'..='\x2f').contains(&c))
        .unwrap_or(body.len());
    let (param_text, intermediates) = body.split_at(split);
    let (private, param_text) = match param_text.chars().next() {
        Some(marker @ ('?' | '>' | '<' | '=')) => (Some(marker), &param_text[1..]),
        _ => (None, param_text),
    };
    let params = if param_text.is_empty() {
        Vec::new()
    } else {
        param_text
            .split(';')
            .map(csi_number)
            .collect::<Option<Vec<usize>>>()?
    };
    Some(CsiParts {
        private,
        params,
        intermediates,
        final_byte,
    })
}

fn cursor(op: CursorOp) -> Option<Command> {
    Some(Command::Cursor(op))
}

fn feature(flag: Feature, value: bool) -> Option<Command> {
    Some(Command::FeatureToggle { flag, value })
}

fn private_feature(mode: usize) -> Option<Feature> {
    match mode {
        1 => Some(Feature::CursorKeysApplication),
        7 => Some(Feature::AutoWrap),
        12 => Some(Feature::CursorBlink),
        25 => Some(Feature::ShowCursor),
        47 | 1047 | 1049 => Some(Feature::AlternateScreen),
        2004 => Some(Feature::BracketedPaste),
        _ => None,
    }
}

/// Merge DEC private mouse modes; `None` if no mode is mouse related.
fn mouse_update(modes: &[usize], enable: bool) -> Option<MouseTrackingUpdate> {
    let mut update = MouseTrackingUpdate::default();
    let mut recognized = false;
    let tracking = |mode: MouseMode| if enable { mode } else { MouseMode::None };
    let format = |format: MouseFormat| if enable { format } else { MouseFormat::Normal };
    for mode in modes {
        match *mode {
            1000 => update.mode = Some(tracking(MouseMode::Button)),
            1002 => update.mode = Some(tracking(MouseMode::Drag)),
            1003 => update.mode = Some(tracking(MouseMode::All)),
            1004 => update.focus_events = Some(enable),
            1005 => update.format = Some(format(MouseFormat::Utf8)),
            1006 => update.format = Some(format(MouseFormat::Sgr)),
            1015 => update.format = Some(format(MouseFormat::Urxvt)),
            1007 => update.alternate_scroll = Some(enable),
            _ => continue,
        }
        recognized = true;
    }
    recognized.then_some(update)
}

/// Decode a CSI body (parameters, intermediates and final byte).
pub fn decode_csi(raw: &str) -> Option<Command> {
    let Some(parts) = split_csi(raw) else {
        tracing::debug!("Unparseable CSI: {:?}", raw);
        return None;
    };
    let params = &parts.params;
    // A count of 0 means 1
    let count = params.first().copied().unwrap_or(1).max(1);
    let signed = count as isize;
    let param = |index: usize| params.get(index).copied().unwrap_or(0);

    match (parts.private, parts.intermediates, parts.final_byte) {
        (None, "", 'A') => cursor(CursorOp {
            dy: Some(-signed),
            ..CursorOp::default()
        }),
        (None, "", 'B') => cursor(CursorOp {
            dy: Some(signed),
            ..CursorOp::default()
        }),
        (None, "", 'C') => cursor(CursorOp {
            dx: Some(signed),
            ..CursorOp::default()
        }),
        (None, "", 'D') => cursor(CursorOp {
            dx: Some(-signed),
            ..CursorOp::default()
        }),
        (None, "", 'E') => cursor(CursorOp {
            dy: Some(signed),
            absolute_x: Some(0),
            ..CursorOp::default()
        }),
        (None, "", 'F') => cursor(CursorOp {
            dy: Some(-signed),
            absolute_x: Some(0),
            ..CursorOp::default()
        }),
        (None, "", 'G') => cursor(CursorOp {
            absolute_x: Some(count - 1),
            ..CursorOp::default()
        }),
        (None, "", 'H' | 'f') => cursor(CursorOp {
            absolute_y: Some(param(0).max(1) - 1),
            absolute_x: Some(param(1).max(1) - 1),
            ..CursorOp::default()
        }),
        (None, "", 'd') => cursor(CursorOp {
            absolute_y: Some(count - 1),
            ..CursorOp::default()
        }),
        (None, "", 'J') => {
            let kind = match param(0) {
                0 => ClearKind::CursorToEnd,
                1 => ClearKind::CursorToBeginning,
                2 => ClearKind::Screen,
                3 => ClearKind::Scrollback,
                other => {
                    tracing::debug!("Unknown erase in display mode {}", other);
                    return None;
                }
            };
            Some(Command::Clear(kind))
        }
        (None, "", 'K') => {
            let op = match param(0) {
                0 => CursorOp {
                    replace: Some(ReplaceRange::new(Edge::Cursor, Edge::LineEnd)),
                    text: Some(String::new()),
                    update_trailing_style: true,
                    ..CursorOp::default()
                },
                1 => CursorOp {
                    replace: Some(ReplaceRange::new(Edge::LineStart, Edge::Relative(1))),
                    blank: true,
                    update_trailing_style: true,
                    ..CursorOp::default()
                },
                2 => CursorOp {
                    replace: Some(ReplaceRange::new(Edge::LineStart, Edge::LineEnd)),
                    text: Some(String::new()),
                    update_trailing_style: true,
                    ..CursorOp::default()
                },
                other => {
                    tracing::debug!("Unknown erase in line mode {}", other);
                    return None;
                }
            };
            cursor(op)
        }
        (None, "", 'P') => cursor(CursorOp {
            replace: Some(ReplaceRange::new(Edge::Cursor, Edge::Relative(signed))),
            text: Some(String::new()),
            ..CursorOp::default()
        }),
        (None, "", 'X') => cursor(CursorOp {
            replace: Some(ReplaceRange::new(Edge::Cursor, Edge::Relative(signed))),
            blank: true,
            ..CursorOp::default()
        }),
        (None, "", 'S') => Some(Command::Scroll {
            direction: ScrollDirection::Up,
            count,
        }),
        (None, "", 'T') => Some(Command::Scroll {
            direction: ScrollDirection::Down,
            count,
        }),
        (None, "", 'r') => {
            let margin = |index: usize| params.get(index).copied().filter(|n| *n > 0).map(|n| n - 1);
            Some(Command::ScrollMargin {
                top: margin(0),
                bottom: margin(1),
            })
        }
        (None, "", final_byte @ ('h' | 'l')) if params.as_slice() == [4] => {
            // IRM: set means insert, reset means replace
            feature(Feature::ReplaceMode, final_byte == 'l')
        }
        (None, _, 't') => {
            tracing::trace!("Ignoring window manipulation: {:?}", raw);
            None
        }
        (Some('?'), "", final_byte @ ('h' | 'l')) => {
            let enable = final_byte == 'h';
            let mut commands: Vec<Command> = params
                .iter()
                .filter_map(|mode| private_feature(*mode))
                .map(|flag| Command::FeatureToggle {
                    flag,
                    value: enable,
                })
                .collect();
            if let Some(update) = mouse_update(params, enable) {
                commands.push(Command::MouseTrackingUpdate(update));
            }
            match commands.len() {
                0 => {
                    tracing::debug!("Unknown private mode: {:?}", raw);
                    None
                }
                1 => commands.pop(),
                _ => Some(Command::Batch(commands)),
            }
        }
        _ => {
            tracing::debug!("Unknown CSI: {:?}", raw);
            None
        }
    }
}

/// Decode an OSC payload. `current` is the running style, which OSC 8
/// edits.
pub fn decode_osc(raw: &str, current: &Style) -> Option<Command> {
    let (code, rest) = raw.split_once(';').unwrap_or((raw, ""));
    match code {
        "8" => {
            // 8;params;uri
            let uri = rest.split_once(';').map_or("", |(_, uri)| uri);
            let link = (!uri.is_empty()).then(|| uri.to_string());
            Some(Command::Style(current.with_link(link)))
        }
        "2025" => {
            let path = rest.split(';').next().unwrap_or_default();
            Some(Command::WorkingDirectoryChanged(path.to_string()))
        }
        "0" | "1" | "2" => Some(Command::TitleChanged(rest.to_string())),
        _ => {
            tracing::debug!("Unknown OSC: {:?}", code);
            None
        }
    }
}

fn invoke(gl: Option<usize>, gr: Option<usize>, shift: Option<usize>) -> Option<Command> {
    Some(Command::CharsetUpdate {
        designation: None,
        invoke: Some(Invoke { gl, gr, shift }),
    })
}

/// Decode the byte(s) after a bare ESC.
pub fn decode_control(raw: &str) -> Option<Command> {
    match raw {
        // IND
        "D" => cursor(CursorOp {
            dy: Some(1),
            auto_scroll: true,
            ..CursorOp::default()
        }),
        // RI
        "M" => cursor(CursorOp {
            dy: Some(-1),
            auto_scroll: true,
            ..CursorOp::default()
        }),
        // NEL
        "E" => cursor(CursorOp {
            dy: Some(1),
            absolute_x: Some(0),
            auto_scroll: true,
            ..CursorOp::default()
        }),
        "n" => invoke(Some(2), None, None),
        "o" => invoke(Some(3), None, None),
        "~" => invoke(None, Some(1), None),
        "}" => invoke(None, Some(2), None),
        "|" => invoke(None, Some(3), None),
        "N" => invoke(None, None, Some(2)),
        "O" => invoke(None, None, Some(3)),
        _ => {
            tracing::debug!("Unhandled control: {:?}", raw);
            None
        }
    }
}

/// Decode a designation such as `(0`.
pub fn decode_designation(raw: &str) -> Option<Command> {
    let mut chars = raw.chars();
    let (intro, charset) = (chars.next()?, chars.next()?);
    let slot = match intro {
        '(' => 0,
        ')' | '-' => 1,
        '*' | '.' => 2,
        '+' | '/' => 3,
        _ => return None,
    };
    Some(Command::CharsetUpdate {
        designation: Some(Designation { slot, charset }),
        invoke: None,
    })
}

/// SGR sequences: digits and separators ending in `m`, no markers.
fn sgr_params(raw: &str) -> Option<&str> {
    let params = raw.strip_suffix('m')?;
    params
        .bytes()
        .all(|b| b.is_ascii_digit() || b == b';' || b == b':')
        .then_some(params)
}

/// Memoizing front end for the pure decoders
#[derive(Debug)]
pub struct Decoder {
    sgr_cache: LruCache<String, Option<Style>>,
    csi_cache: LruCache<String, Option<Command>>,
    hits: u64,
    misses: u64,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl Decoder {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sgr_cache: LruCache::new(capacity),
            csi_cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn sgr(&mut self, params: &str) -> Option<Style> {
        if let Some(style) = self.sgr_cache.get(params) {
            self.hits += 1;
            return style.clone();
        }
        self.misses += 1;
        let style = decode_sgr(params);
        self.sgr_cache.put(params.to_string(), style.clone());
        style
    }

    pub fn csi(&mut self, raw: &str) -> Option<Command> {
        if let Some(command) = self.csi_cache.get(raw) {
            self.hits += 1;
            return command.clone();
        }
        self.misses += 1;
        let command = decode_csi(raw);
        self.csi_cache.put(raw.to_string(), command.clone());
        command
    }

    /// (hits, misses) across both caches
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// Text in, commands out
#[derive(Debug)]
pub struct CommandStream {
    tokenizer: Tokenizer,
    decoder: Decoder,
    style: Style,
}

impl Default for CommandStream {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl CommandStream {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            decoder: Decoder::new(cache_capacity),
            style: Style::default(),
        }
    }

    /// The running style
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Detach the tokenizer, leaving a fresh one in its place. A sequence
    /// cut off at the end of the last chunk stays inside it.
    pub fn take_tokenizer(&mut self) -> Tokenizer {
        std::mem::take(&mut self.tokenizer)
    }

    /// Continue from a tokenizer taken from another stream.
    pub fn resume(&mut self, tokenizer: Tokenizer) {
        self.tokenizer = tokenizer;
    }

    /// Decode the next chunk of text.
    pub fn feed(&mut self, text: &str) -> Vec<Command> {
        let mut commands = Vec::new();
        for token in self.tokenizer.feed(text) {
            match token {
                Token::Literal(text) => self.literal(&text, &mut commands),
                Token::Separator('\n') => commands.push(Command::NewLine),
                Token::Separator('\r') => commands.push(Command::Cursor(CursorOp {
                    absolute_x: Some(0),
                    ..CursorOp::default()
                })),
                Token::Separator(_) => commands.push(Command::Cursor(CursorOp {
                    dx: Some(-1),
                    ..CursorOp::default()
                })),
                Token::Sequence { kind, raw } => {
                    if let Some(command) = self.sequence(kind, &raw) {
                        commands.push(command);
                    }
                }
            }
        }
        commands
    }

    fn sequence(&mut self, kind: SequenceKind, raw: &str) -> Option<Command> {
        match kind {
            SequenceKind::Csi => match sgr_params(raw) {
                Some(params) => {
                    self.style = match self.decoder.sgr(params) {
                        Some(style) => {
                            let mut combined = self.style.combine(&style);
                            combined.cleared = AttrFlags::empty();
                            combined
                        }
                        None => Style::default(),
                    };
                    Some(Command::Style(self.style.clone()))
                }
                None => self.decoder.csi(raw),
            },
            SequenceKind::Osc => {
                let command = decode_osc(raw, &self.style);
                if let Some(Command::Style(style)) = &command {
                    self.style = style.clone();
                }
                command
            }
            SequenceKind::Dcs => {
                tracing::debug!("Ignoring DCS ({} bytes)", raw.len());
                None
            }
            SequenceKind::CharsetDesignation => decode_designation(raw),
            SequenceKind::LineAttribute | SequenceKind::Iso2022Shift => {
                tracing::trace!("Ignoring {:?}: {:?}", kind, raw);
                None
            }
            SequenceKind::Control => decode_control(raw),
        }
    }

    /// Literal text. SO/SI switch GL between G1 and G0; other controls
    /// except TAB are dropped.
    fn literal(&mut self, text: &str, commands: &mut Vec<Command>) {
        let is_stripped = |ch: char| ch.is_control() && ch != '\t';
        if !text.contains(is_stripped) {
            commands.push(Command::Cursor(CursorOp::text(text)));
            return;
        }
        let mut run = String::new();
        for ch in text.chars() {
            match ch {
                '\x0e' | '\x0f' => {
                    if !run.is_empty() {
                        commands.push(Command::Cursor(CursorOp::text(std::mem::take(&mut run))));
                    }
                    let slot = if ch == '\x0e' { 1 } else { 0 };
                    commands.push(Command::CharsetUpdate {
                        designation: None,
                        invoke: Some(Invoke {
                            gl: Some(slot),
                            ..Invoke::default()
                        }),
                    });
                }
                _ if is_stripped(ch) => {
                    tracing::trace!("Dropping control {:?}", ch);
                }
                _ => run.push(ch),
            }
        }
        if !run.is_empty() {
            commands.push(Command::Cursor(CursorOp::text(run)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fg(color: Color) -> Style {
        Style {
            foreground: Some(color),
            ..Style::default()
        }
    }

    #[test]
    fn test_sgr_colors() {
        assert_eq!(decode_sgr("31"), Some(fg(Color::Indexed(1))));
        assert_eq!(decode_sgr("38;5;196"), Some(fg(Color::Indexed(196))));
        assert_eq!(decode_sgr("38;2;10;20;30"), Some(fg(Color::Rgb(10, 20, 30))));
        assert_eq!(decode_sgr("38:2::10:20:30"), Some(fg(Color::Rgb(10, 20, 30))));
        assert_eq!(decode_sgr("38:2:10:20:30"), Some(fg(Color::Rgb(10, 20, 30))));
        assert_eq!(decode_sgr("94"), Some(fg(Color::Indexed(12))));
        assert_eq!(
            decode_sgr("101").and_then(|style| style.background),
            Some(Color::Indexed(9))
        );
        assert_eq!(decode_sgr("39"), Some(fg(Color::Default)));
    }

    #[test]
    fn test_sgr_reset() {
        assert_eq!(decode_sgr("0"), None);
        assert_eq!(decode_sgr(""), None);
        assert_eq!(decode_sgr("1;31;0"), None);
        assert_eq!(decode_sgr("1;;31"), None);
    }

    #[test]
    fn test_sgr_deterministic() {
        for params in ["1;4;38;5;33", "22;23", "48;2;1;2;3;9", "0;1"] {
            assert_eq!(decode_sgr(params), decode_sgr(params));
        }
    }

    #[test]
    fn test_sgr_attributes() {
        let style = decode_sgr("1;3;4:3;9").unwrap();
        assert!(style.has(AttrFlags::BOLD | AttrFlags::ITALIC | AttrFlags::UNDERLINE));
        assert!(style.has(AttrFlags::STRIKETHROUGH));

        let style = decode_sgr("22").unwrap();
        assert!(style.cleared.contains(AttrFlags::BOLD | AttrFlags::DIM));
    }

    #[test]
    fn test_sgr_clamps_and_skips_unknown() {
        assert_eq!(decode_sgr("38;5;999"), Some(fg(Color::Indexed(255))));
        assert_eq!(decode_sgr("58;31"), Some(fg(Color::Indexed(1))));
        // An incomplete extended color drops the selector; the remaining
        // fields apply as plain codes
        let style = decode_sgr("38;2;1").unwrap();
        assert_eq!(style.foreground, None);
        assert!(style.has(AttrFlags::DIM | AttrFlags::BOLD));
    }

    #[test]
    fn test_cursor_movement() {
        assert_eq!(
            decode_csi("5A"),
            Some(Command::Cursor(CursorOp {
                dy: Some(-5),
                ..CursorOp::default()
            }))
        );
        assert_eq!(
            decode_csi("0C"),
            Some(Command::Cursor(CursorOp {
                dx: Some(1),
                ..CursorOp::default()
            }))
        );
        assert_eq!(
            decode_csi("3;7H"),
            Some(Command::Cursor(CursorOp {
                absolute_y: Some(2),
                absolute_x: Some(6),
                ..CursorOp::default()
            }))
        );
        assert_eq!(decode_csi("H"), decode_csi("1;1f"));
        assert_eq!(
            decode_csi("2F"),
            Some(Command::Cursor(CursorOp {
                dy: Some(-2),
                absolute_x: Some(0),
                ..CursorOp::default()
            }))
        );
    }

    #[test]
    fn test_erase() {
        assert_eq!(decode_csi("J"), Some(Command::Clear(ClearKind::CursorToEnd)));
        assert_eq!(decode_csi("2J"), Some(Command::Clear(ClearKind::Screen)));
        assert_eq!(decode_csi("3J"), Some(Command::Clear(ClearKind::Scrollback)));
        assert_eq!(decode_csi("9J"), None);

        match decode_csi("3X") {
            Some(Command::Cursor(op)) => {
                assert!(op.blank);
                assert_eq!(op.replace, Some(ReplaceRange::new(Edge::Cursor, Edge::Relative(3))));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scroll_margins() {
        assert_eq!(
            decode_csi("3;11r"),
            Some(Command::ScrollMargin {
                top: Some(2),
                bottom: Some(10),
            })
        );
        assert_eq!(
            decode_csi("r"),
            Some(Command::ScrollMargin {
                top: None,
                bottom: None,
            })
        );
    }

    #[test]
    fn test_modes() {
        assert_eq!(decode_csi("?25l"), feature(Feature::ShowCursor, false));
        assert_eq!(decode_csi("?1049h"), feature(Feature::AlternateScreen, true));
        assert_eq!(decode_csi("?7l"), feature(Feature::AutoWrap, false));
        assert_eq!(decode_csi("4h"), feature(Feature::ReplaceMode, false));
        assert_eq!(decode_csi("4l"), feature(Feature::ReplaceMode, true));
        assert_eq!(decode_csi("22;0;0t"), None);
        assert_eq!(decode_csi("?9999h"), None);
    }

    #[test]
    fn test_combined_private_modes() {
        assert_eq!(
            decode_csi("?25;2004h"),
            Some(Command::Batch(vec![
                Command::FeatureToggle {
                    flag: Feature::ShowCursor,
                    value: true,
                },
                Command::FeatureToggle {
                    flag: Feature::BracketedPaste,
                    value: true,
                },
            ]))
        );
        assert_eq!(
            decode_csi("?1049;1006l"),
            Some(Command::Batch(vec![
                Command::FeatureToggle {
                    flag: Feature::AlternateScreen,
                    value: false,
                },
                Command::MouseTrackingUpdate(MouseTrackingUpdate {
                    format: Some(MouseFormat::Normal),
                    ..MouseTrackingUpdate::default()
                }),
            ]))
        );
        assert_eq!(decode_csi("?9999;7l"), feature(Feature::AutoWrap, false));
    }

    #[test]
    fn test_oversized_params_saturate() {
        assert_eq!(
            decode_csi("99999999999999999999999C"),
            Some(Command::Cursor(CursorOp {
                dx: Some(MAX_CSI_PARAM as isize),
                ..CursorOp::default()
            }))
        );
        assert_eq!(
            decode_csi("70000;2H"),
            Some(Command::Cursor(CursorOp {
                absolute_y: Some(MAX_CSI_PARAM - 1),
                absolute_x: Some(1),
                ..CursorOp::default()
            }))
        );
        assert_eq!(decode_csi("1x;2H"), None);
    }

    #[test]
    fn test_mouse_modes() {
        assert_eq!(
            decode_csi("?1002;1006h"),
            Some(Command::MouseTrackingUpdate(MouseTrackingUpdate {
                mode: Some(MouseMode::Drag),
                format: Some(MouseFormat::Sgr),
                ..MouseTrackingUpdate::default()
            }))
        );
        assert_eq!(
            decode_csi("?1000;1006l"),
            Some(Command::MouseTrackingUpdate(MouseTrackingUpdate {
                mode: Some(MouseMode::None),
                format: Some(MouseFormat::Normal),
                ..MouseTrackingUpdate::default()
            }))
        );
        assert_eq!(
            decode_csi("?1004h"),
            Some(Command::MouseTrackingUpdate(MouseTrackingUpdate {
                focus_events: Some(true),
                ..MouseTrackingUpdate::default()
            }))
        );
    }

    #[test]
    fn test_osc() {
        let style = fg(Color::Indexed(2));
        assert_eq!(
            decode_osc("8;;https://example.com", &style),
            Some(Command::Style(style.with_link(Some("https://example.com".into()))))
        );
        assert_eq!(
            decode_osc("8;id=1;", &style.with_link(Some("x".into()))),
            Some(Command::Style(style.clone()))
        );
        assert_eq!(
            decode_osc("2025;/tmp;extra", &style),
            Some(Command::WorkingDirectoryChanged("/tmp".into()))
        );
        assert_eq!(
            decode_osc("2;vim", &style),
            Some(Command::TitleChanged("vim".into()))
        );
        assert_eq!(decode_osc("52;c;aGk=", &style), None);
    }

    #[test]
    fn test_control_and_designation() {
        assert_eq!(
            decode_designation("(0"),
            Some(Command::CharsetUpdate {
                designation: Some(Designation {
                    slot: 0,
                    charset: '0'
                }),
                invoke: None,
            })
        );
        assert_eq!(decode_control("O"), invoke(None, None, Some(3)));
        assert_eq!(decode_control("7"), None);
    }

    #[test]
    fn test_decoder_caches() {
        let mut decoder = Decoder::new(2);
        decoder.sgr("31");
        decoder.sgr("31");
        decoder.csi("5A");
        assert_eq!(decoder.stats(), (1, 2));
        assert_eq!(decoder.sgr("31"), decode_sgr("31"));
    }

    #[test]
    fn test_stream_style_accumulates() {
        let mut stream = CommandStream::default();
        let commands = stream.feed("\x1b[1m\x1b[31mHello\x1b[0m\n");
        let mut expected = fg(Color::Indexed(1));
        expected.set(AttrFlags::BOLD);
        assert_eq!(commands[1], Command::Style(expected));
        assert_eq!(commands[2], Command::Cursor(CursorOp::text("Hello")));
        assert_eq!(commands[3], Command::Style(Style::default()));
        assert_eq!(commands[4], Command::NewLine);
        assert!(stream.style().is_default());
    }

    #[test]
    fn test_stream_osc_link_edits_running_style() {
        let mut stream = CommandStream::default();
        stream.feed("\x1b[32m\x1b]8;;file:///a\x1b\\");
        assert_eq!(stream.style().link.as_deref(), Some("file:///a"));
        assert_eq!(stream.style().foreground, Some(Color::Indexed(2)));
        stream.feed("\x1b]8;;\x07");
        assert_eq!(stream.style().link, None);
    }

    #[test]
    fn test_stream_shift_in_out() {
        let mut stream = CommandStream::default();
        let commands = stream.feed("a\x0eq\x0fb\x07");
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[0], Command::Cursor(CursorOp::text("a")));
        assert_eq!(commands[1], invoke(Some(1), None, None).unwrap());
        assert_eq!(commands[3], invoke(Some(0), None, None).unwrap());
        assert_eq!(commands[4], Command::Cursor(CursorOp::text("b")));
    }

    #[test]
    fn test_stream_resumes_partial_sequence() {
        let mut first = CommandStream::default();
        assert!(first.feed("\x1b[3").is_empty());

        let mut second = CommandStream::default();
        second.resume(first.take_tokenizer());
        let commands = second.feed("1mred");
        assert_eq!(commands[0], Command::Style(fg(Color::Indexed(1))));
        assert_eq!(commands[1], Command::Cursor(CursorOp::text("red")));
        assert!(first.feed("1m").iter().all(|c| !matches!(c, Command::Style(_))));
    }

    #[test]
    fn test_stream_private_sgr_like_sequence_is_not_sgr() {
        let mut stream = CommandStream::default();
        assert!(stream.feed("\x1b[>4;2m").is_empty());
        assert!(stream.style().is_default());
    }
}
