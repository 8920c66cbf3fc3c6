//! Peer notification wire format.
//!
//! A minimal pseudo-HTTP request carrying one line of compact JSON:
//!
//! ```text
//! GET /remote HTTP/1.1\n
//! Host: <peer ip>\n
//! \n
//! {"state":"call","remotes":["10.0.0.5"]}\n
//! ```
//!
//! Receivers skip every line until the first one starting with `{`.

use core::fmt;
use std::io::BufRead;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::PeerAddr;
use crate::fsm::State;

/// State report sent to peers, and returned by the status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub state: State,
    pub remotes: Vec<Ipv4Addr>,
}

impl Notification {
    /// Compact single-line JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Wrap an encoded body for delivery to `peer`.
pub fn encode_request(peer: &PeerAddr, body: &str) -> Vec<u8> {
    format!("GET /remote HTTP/1.1\nHost: {}\n\n{}\n", peer.ip, body).into_bytes()
}

#[derive(Debug)]
pub enum WireError {
    /// Stream ended before a JSON line.
    MissingBody,
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBody => write!(f, "no JSON body in request"),
            Self::Io(e) => write!(f, "read failed: {e}"),
            Self::Json(e) => write!(f, "bad JSON body: {e}"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<std::io::Error> for WireError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Read one notification from a pseudo-HTTP stream.
pub fn read_notification<R: BufRead>(reader: R) -> Result<Notification, WireError> {
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('{') {
            return Ok(serde_json::from_str(&line)?);
        }
    }
    Err(WireError::MissingBody)
}
