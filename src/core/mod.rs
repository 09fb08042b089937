//! Core terminal emulation components.
//!
//! This module contains the terminal emulation logic:
//!
//! - **term**: tokenizer, command decoder and terminal state machine
//! - **utf8**: incremental decoding of raw pty output
//! - **session**: a terminal state fed with raw bytes, and the manager that
//!   retires finished sessions
//!
//! # Architecture
//!
//! ```text
//! SessionManager
//! └── Session
//!     ├── Utf8Decoder (bytes -> text)
//!     └── TerminalState
//!         ├── CommandStream (Tokenizer + Decoder)
//!         ├── CharsetState
//!         └── Buffer x2 (scrollback, alternate)
//!             └── LineRecord -> LineFold rows
//! ```

pub mod session;
pub mod term;
pub mod utf8;
