//! Unified error types for the busylight controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! controller's error handling uniform.  Nothing here is meant to reach the
//! process as an unhandled fault: invalid commands are reported as `false`
//! by the controller, peer failures are counted per peer, and table errors
//! are caught once at construction.

use core::fmt;

use crate::fsm::{State, Trigger};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The transition table failed startup validation.
    InvalidTable(&'static str),
    /// A background thread could not be spawned.
    TaskSpawn(&'static str),
    /// A background task ignored cancellation past the join deadline.
    TaskStuck(&'static str),
    /// A peer notification could not be delivered.
    PeerSend(PeerSendError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// A peer address string could not be parsed.
    InvalidPeer(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTable(msg) => write!(f, "transition table: {msg}"),
            Self::TaskSpawn(name) => write!(f, "could not spawn task '{name}'"),
            Self::TaskStuck(name) => write!(f, "task '{name}' did not stop in time"),
            Self::PeerSend(e) => write!(f, "peer send: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::InvalidPeer(s) => write!(f, "invalid peer address '{s}'"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Peer send errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerSendError {
    /// Address did not resolve to a socket address.
    Unresolvable,
    /// Connect or write exceeded the send timeout.
    Timeout,
    /// The peer actively refused the connection.
    Refused,
    /// Any other socket error.
    Io,
}

impl fmt::Display for PeerSendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolvable => write!(f, "address unresolvable"),
            Self::Timeout => write!(f, "timed out"),
            Self::Refused => write!(f, "connection refused"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl From<PeerSendError> for Error {
    fn from(e: PeerSendError) -> Self {
        Self::PeerSend(e)
    }
}

impl From<std::io::Error> for PeerSendError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Self::Timeout,
            ErrorKind::ConnectionRefused => Self::Refused,
            _ => Self::Io,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition errors
// ---------------------------------------------------------------------------

/// Why a trigger was rejected.  The controller's public API collapses this
/// into `false`; the detailed form is kept for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The trigger name is not one of the known triggers.
    UnknownTrigger(String),
    /// The trigger exists but is not allowed from the current state.
    NotAllowed { trigger: Trigger, from: State },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTrigger(name) => write!(f, "unknown trigger '{name}'"),
            Self::NotAllowed { trigger, from } => {
                write!(f, "trigger '{trigger}' not allowed from '{from}'")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
