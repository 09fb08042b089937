//! Incremental tokenizer
//!
//! Splits terminal output into literal runs, line separators and escape
//! sequences. `feed` may be called with arbitrary chunks; a sequence cut
//! off at the end of a chunk is held and completed by the next call.

const ESC: char = '\x1b';
const BEL: char = '\x07';
const ST: char = '\u{9c}';

/// Longest OSC/DCS payload kept; the rest is discarded
pub const MAX_STRING_LEN: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceKind {
    Csi,
    Osc,
    Dcs,
    CharsetDesignation,
    LineAttribute,
    Iso2022Shift,
    /// A bare escape, or bytes that did not form a valid sequence
    Control,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    /// LF, CR or backspace
    Separator(char),
    Sequence { kind: SequenceKind, raw: String },
}

impl Token {
    fn sequence(kind: SequenceKind, raw: impl Into<String>) -> Self {
        Token::Sequence {
            kind,
            raw: raw.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CsiStage {
    Params,
    Intermediate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StringKind {
    Osc,
    Dcs,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum State {
    #[default]
    Ground,
    Escape,
    Csi {
        raw: String,
        stage: CsiStage,
    },
    Str {
        kind: StringKind,
        body: String,
        /// ESC seen, waiting for `\`
        escape: bool,
        truncated: bool,
    },
    Designate {
        intro: char,
    },
    LineAttribute,
    Shift,
}

fn is_separator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\x08')
}

fn is_special(ch: char) -> bool {
    is_separator(ch) || ch == ESC
}

/// Resumable tokenizer state
#[derive(Debug, Default)]
pub struct Tokenizer {
    state: State,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no partial sequence is pending.
    pub fn is_ground(&self) -> bool {
        self.state == State::Ground
    }

    /// Tokenize the next chunk of the stream.
    pub fn feed(&mut self, chunk: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut rest = chunk;
        while !rest.is_empty() {
            if self.state == State::Ground {
                match rest.find(is_special) {
                    Some(0) => {}
                    Some(end) => {
                        tokens.push(Token::Literal(rest[..end].to_string()));
                        rest = &rest[end..];
                    }
                    None => {
                        tokens.push(Token::Literal(rest.to_string()));
                        break;
                    }
                }
            }
            let Some(ch) = rest.chars().next() else {
                break;
            };
            rest = &rest[ch.len_utf8()..];
            self.step(ch, &mut tokens);
        }
        tokens
    }

    fn step(&mut self, ch: char, tokens: &mut Vec<Token>) {
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            State::Ground => match ch {
                ESC => State::Escape,
                _ => {
                    tokens.push(Token::Separator(ch));
                    State::Ground
                }
            },
            State::Escape => self.escape(ch, tokens),
            State::Csi { raw, stage } => Self::csi(raw, stage, ch, tokens),
            State::Str {
                kind,
                body,
                escape,
                truncated,
            } => {
                return self.string(kind, body, escape, truncated, ch, tokens);
            }
            State::Designate { intro } => {
                if is_separator(ch) {
                    tokens.push(Token::Separator(ch));
                    State::Designate { intro }
                } else if ch == ESC {
                    tokens.push(Token::sequence(SequenceKind::Control, intro));
                    State::Escape
                } else if ('\x30'..='\x7e').contains(&ch) {
                    tokens.push(Token::sequence(
                        SequenceKind::CharsetDesignation,
                        format!("{}{}", intro, ch),
                    ));
                    State::Ground
                } else {
                    tracing::debug!("Malformed charset designation: {:?}{:?}", intro, ch);
                    tokens.push(Token::sequence(
                        SequenceKind::Control,
                        format!("{}{}", intro, ch),
                    ));
                    State::Ground
                }
            }
            state @ (State::LineAttribute | State::Shift) => {
                let (kind, intro) = if state == State::LineAttribute {
                    (SequenceKind::LineAttribute, '#')
                } else {
                    (SequenceKind::Iso2022Shift, ' ')
                };
                if is_separator(ch) {
                    tokens.push(Token::Separator(ch));
                    state
                } else if ch == ESC {
                    tokens.push(Token::sequence(SequenceKind::Control, intro));
                    State::Escape
                } else {
                    tokens.push(Token::sequence(kind, format!("{}{}", intro, ch)));
                    State::Ground
                }
            }
        };
    }

    fn escape(&mut self, ch: char, tokens: &mut Vec<Token>) -> State {
        match ch {
            '[' => State::Csi {
                raw: String::new(),
                stage: CsiStage::Params,
            },
            ']' => State::Str {
                kind: StringKind::Osc,
                body: String::new(),
                escape: false,
                truncated: false,
            },
            'P' => State::Str {
                kind: StringKind::Dcs,
                body: String::new(),
                escape: false,
                truncated: false,
            },
            '(' | ')' | '*' | '+' | '-' | '.' | '/' => State::Designate { intro: ch },
            '#' => State::LineAttribute,
            ' ' => State::Shift,
            _ if is_separator(ch) => {
                tokens.push(Token::Separator(ch));
                State::Escape
            }
            ESC => {
                tokens.push(Token::sequence(SequenceKind::Control, ESC));
                State::Escape
            }
            _ => {
                tokens.push(Token::sequence(SequenceKind::Control, ch));
                State::Ground
            }
        }
    }

    fn csi(mut raw: String, stage: CsiStage, ch: char, tokens: &mut Vec<Token>) -> State {
        match ch {
            _ if is_separator(ch) => {
                tokens.push(Token::Separator(ch));
                State::Csi { raw, stage }
            }
            ESC => {
                tokens.push(Token::sequence(SequenceKind::Control, format!("[{}", raw)));
                State::Escape
            }
            '\x30'..='\x3f' if stage == CsiStage::Params => {
                raw.push(ch);
                State::Csi { raw, stage }
            }
            '\x20'..='\x2f' => {
                raw.push(ch);
                State::Csi {
                    raw,
                    stage: CsiStage::Intermediate,
                }
            }
            '\x40'..='\x7e' => {
                raw.push(ch);
                tokens.push(Token::sequence(SequenceKind::Csi, raw));
                State::Ground
            }
            '\0'..='\x1f' => {
                tracing::trace!("Ignoring C0 {:?} inside CSI", ch);
                State::Csi { raw, stage }
            }
            _ => {
                tracing::debug!("Malformed CSI: {:?}{:?}", raw, ch);
                tokens.push(Token::sequence(
                    SequenceKind::Control,
                    format!("[{}{}", raw, ch),
                ));
                State::Ground
            }
        }
    }

    fn string(
        &mut self,
        kind: StringKind,
        mut body: String,
        escape: bool,
        mut truncated: bool,
        ch: char,
        tokens: &mut Vec<Token>,
    ) {
        let kind_token = match kind {
            StringKind::Osc => SequenceKind::Osc,
            StringKind::Dcs => SequenceKind::Dcs,
        };
        if escape {
            tokens.push(Token::sequence(kind_token, body));
            if ch == '\\' {
                self.state = State::Ground;
            } else {
                // An ESC that is not a terminator begins a new sequence
                self.state = State::Escape;
                self.step(ch, tokens);
            }
            return;
        }
        match ch {
            BEL | ST => {
                tokens.push(Token::sequence(kind_token, body));
                self.state = State::Ground;
            }
            ESC => {
                self.state = State::Str {
                    kind,
                    body,
                    escape: true,
                    truncated,
                };
            }
            _ => {
                if body.len() + ch.len_utf8() <= MAX_STRING_LEN {
                    body.push(ch);
                } else if !truncated {
                    tracing::debug!("{:?} payload exceeds {} bytes, truncating", kind, MAX_STRING_LEN);
                    truncated = true;
                }
                self.state = State::Str {
                    kind,
                    body,
                    escape: false,
                    truncated,
                };
            }
        }
    }
}
