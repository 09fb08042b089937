//! Session management
//!
//! A `Session` is one terminal fed with raw pty output. The
//! `SessionManager` routes output to the active session and, once that
//! session finalizes, retires it and opens a fresh one in its place.

use super::term::{Delta, TerminalState};
use super::term::decoder::DEFAULT_CACHE_CAPACITY;
use super::utf8::Utf8Decoder;

/// Parameters for new sessions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    pub width: usize,
    pub height: usize,
    pub tab_size: usize,
    pub auto_wrap: bool,
    pub cache_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            tab_size: 8,
            auto_wrap: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// A terminal session
#[derive(Debug)]
pub struct Session {
    /// Session ID
    pub id: u64,
    /// Terminal state
    pub state: TerminalState,
    decoder: Utf8Decoder,
}

impl Session {
    /// Create a new session
    pub fn new(id: u64, options: SessionOptions) -> Self {
        let mut state = TerminalState::with_options(
            options.width,
            options.height,
            options.tab_size,
            options.cache_capacity,
        );
        state.modes.auto_wrap = options.auto_wrap;
        Self {
            id,
            state,
            decoder: Utf8Decoder::new(),
        }
    }

    /// Feed raw bytes into the terminal
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Delta {
        let text = self.decoder.decode(bytes);
        if text.is_empty() {
            return Delta::default();
        }
        self.state.write(&text)
    }

    /// End of input: an incomplete UTF-8 sequence is written as U+FFFD.
    pub fn finish(&mut self) -> Delta {
        match self.decoder.finish() {
            Some(ch) => self.state.write(ch.encode_utf8(&mut [0; 4])),
            None => Delta::default(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.state.is_finalized()
    }
}

/// Session manager for multiple sessions
#[derive(Debug)]
pub struct SessionManager {
    sessions: Vec<Session>,
    next_id: u64,
    active_session: Option<usize>,
    options: SessionOptions,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl SessionManager {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            sessions: Vec::new(),
            next_id: 1,
            active_session: None,
            options,
        }
    }

    /// Create a new session
    pub fn create_session(&mut self) -> &mut Session {
        let id = self.next_id;
        self.next_id += 1;

        self.sessions.push(Session::new(id, self.options));
        let index = self.sessions.len() - 1;
        if self.active_session.is_none() {
            self.active_session = Some(index);
        }
        &mut self.sessions[index]
    }

    /// Get the active session
    pub fn active(&self) -> Option<&Session> {
        self.active_session.and_then(|i| self.sessions.get(i))
    }

    /// Get all sessions, including retired ones
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Get session count
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Route output to the active session, creating one if needed.
    ///
    /// A session that finalizes while handling `bytes` is retired and a new
    /// session of the same size takes its place, starting in the directory
    /// the old one reported.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Delta {
        if self.active().is_none() {
            let index = self.sessions.len();
            self.create_session();
            self.active_session = Some(index);
        }
        let Some(index) = self.active_session else {
            return Delta::default();
        };
        let session = &mut self.sessions[index];
        let delta = session.feed_bytes(bytes);
        if session.is_finalized() {
            self.rotate(index);
        }
        delta
    }

    /// Flush the active session at end of input.
    pub fn finish(&mut self) -> Delta {
        self.active_session
            .and_then(|i| self.sessions.get_mut(i))
            .map_or_else(Delta::default, Session::finish)
    }

    /// Retire the session at `index`. Input it had not finished decoding,
    /// a split UTF-8 character or escape sequence, moves to the new session.
    fn rotate(&mut self, index: usize) {
        let retired = &mut self.sessions[index];
        let options = SessionOptions {
            width: retired.state.width,
            height: retired.state.height,
            ..self.options
        };
        let directory = retired.state.current_directory.clone();
        let retired_id = retired.id;
        let tokenizer = retired.state.take_tokenizer();
        let decoder = std::mem::take(&mut retired.decoder);

        let id = self.next_id;
        self.next_id += 1;
        let mut session = Session::new(id, options);
        session.state.current_directory = directory;
        session.state.resume_tokenizer(tokenizer);
        session.decoder = decoder;
        tracing::info!("Session {} finalized, continuing in session {}", retired_id, id);

        self.sessions.push(session);
        self.active_session = Some(self.sessions.len() - 1);
    }
}
