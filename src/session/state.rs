//! Session lifecycle states.
//!
//! ```text
//!  Idle ──▶ Connecting ──▶ Connected ──▶ Reading / Writing ──▶ Connected ──▶ Closed
//!              │                                   │
//!              ├──▶ ConnectFailed ──(close)──▶ Closed
//!              └───────────── any I/O ───▶ Lost ──▶ Closed
//! ```

use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Connecting = 1,
    Connected = 2,
    /// The hardware connect failed with an ordinary I/O error; the caller
    /// is expected to close.
    ConnectFailed = 3,
    Reading = 4,
    Writing = 5,
    /// The tag left the field; teardown in progress.
    Lost = 6,
    Closed = 7,
}

impl SessionState {
    pub fn from_index(idx: u8) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::ConnectFailed,
            4 => Self::Reading,
            5 => Self::Writing,
            6 => Self::Lost,
            7 => Self::Closed,
            _ => {
                debug_assert!(false, "invalid session state index: {idx}");
                Self::Closed
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::ConnectFailed => "ConnectFailed",
            Self::Reading => "Reading",
            Self::Writing => "Writing",
            Self::Lost => "Lost",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lock-free cell holding a [`SessionState`], readable from any thread.
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(initial: SessionState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_index(self.0.load(Ordering::Acquire))
    }

    /// Store `to`, returning the previous state.
    pub(crate) fn swap(&self, to: SessionState) -> SessionState {
        SessionState::from_index(self.0.swap(to as u8, Ordering::AcqRel))
    }
}
