//! Output rendering.
//!
//! - **renderer**: ANSI output through crossterm, plus a plain text dump
//!   used for debugging and tests

pub mod renderer;

pub use renderer::{DebugRenderer, StyledRenderer};
