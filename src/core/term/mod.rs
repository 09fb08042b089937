//! Terminal emulation
//!
//! Text flows through the [`tokenizer`], is turned into [`command`]s by the
//! [`decoder`] and applied by [`state::TerminalState`] to a [`buffer`].

pub mod buffer;
pub mod charset;
pub mod command;
pub mod decoder;
pub mod state;
pub mod style;
pub mod text;
pub mod tokenizer;

pub use buffer::{Buffer, Delta, FoldParams, LineFold, LineRecord, ScrollMargin};
pub use command::{ClearKind, Command, CursorOp, Edge, Feature, ReplaceRange, ScrollDirection};
pub use decoder::{decode_csi, decode_osc, decode_sgr, CommandStream, Decoder};
pub use state::{MouseTracking, TerminalModes, TerminalState};
pub use style::{AttrFlags, Color, Style};
pub use text::{StyledChar, StyledText};
pub use tokenizer::{SequenceKind, Token, Tokenizer};
