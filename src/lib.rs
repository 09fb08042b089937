//! foldterm - a VT/ANSI terminal engine with folded line storage
//!
//! Output from a pty is tokenized, decoded into commands and applied to a
//! buffer of logical lines. Each line is folded into display rows for the
//! current width, so resizing reflows text instead of truncating it.
//!
//! ```
//! use foldterm::core::term::TerminalState;
//!
//! let mut state = TerminalState::new(10, 4);
//! state.write("\x1b[1mhello\x1b[0m world, folded");
//! assert_eq!(state.rows().len(), 2);
//! assert_eq!(state.rows()[0].content.plain(), "hello worl");
//! assert_eq!(state.rows()[1].content.plain(), "d, folded");
//! ```

pub mod config;
pub mod core;
pub mod ui;

pub use crate::core::session::{Session, SessionManager, SessionOptions};
pub use crate::core::term::{Delta, TerminalState};
