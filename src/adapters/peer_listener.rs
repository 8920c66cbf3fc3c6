//! Receiving end of peer notifications.
//!
//! Accepts connections on a TCP port and decodes each one with
//! [`read_notification`].  Used by the binary's remote-display mode, which
//! stands in for a remote indicator on the desk of a colleague.

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use log::{debug, warn};

use crate::peers::wire::{Notification, read_notification};

pub struct PeerListener {
    listener: TcpListener,
    read_timeout: Duration,
}

impl PeerListener {
    pub fn bind(addr: SocketAddr, read_timeout: Duration) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            read_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Block until one well-formed notification arrives.  Malformed or
    /// stalled connections are logged and skipped.
    pub fn accept_one(&self) -> std::io::Result<(SocketAddr, Notification)> {
        loop {
            let (stream, from) = self.listener.accept()?;
            stream.set_read_timeout(Some(self.read_timeout))?;
            match read_notification(BufReader::new(stream)) {
                Ok(n) => {
                    debug!("notification from {}: {}", from, n.state);
                    return Ok((from, n));
                }
                Err(e) => warn!("dropping request from {}: {}", from, e),
            }
        }
    }
}
