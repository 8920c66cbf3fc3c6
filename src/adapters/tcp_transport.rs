//! TCP peer transport.
//!
//! One short-lived connection per notification: connect, write the whole
//! request, close.  Connect and write are each bounded by `timeout`.
//! Nothing is read back.

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use log::debug;

use crate::app::ports::PeerTransport;
use crate::error::PeerSendError;
use crate::peers::PeerAddr;

#[derive(Debug, Clone, Copy)]
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl PeerTransport for TcpTransport {
    fn send(&self, peer: &PeerAddr, request: &[u8]) -> Result<(), PeerSendError> {
        let mut stream = TcpStream::connect_timeout(&peer.socket_addr(), self.timeout)?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.write_all(request)?;
        stream.flush()?;
        if let Err(e) = stream.shutdown(Shutdown::Both) {
            debug!("shutdown towards {} failed: {}", peer, e);
        }
        Ok(())
    }
}
