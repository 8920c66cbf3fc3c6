//! Remote peer registry.
//!
//! Peers are other lights or remote displays on the LAN that want to hear
//! about state changes.  Each registration expires unless refreshed by
//! contact; expired entries are dropped lazily by [`PeerRegistry::sweep_expired`],
//! which runs before every fan-out and status read.
//!
//! Identity is `(address, port)` only.  A peer can be deactivated: it stays
//! registered and listed, but is never notified until re-activated or
//! contacted again.

pub mod notifier;
pub mod wire;

use core::fmt;
use core::str::FromStr;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;

use crate::error::{Error, PeerSendError};

/// Port peers listen on when an address carries none.
pub const DEFAULT_PEER_PORT: u16 = 9001;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PeerAddr {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl PeerAddr {
    pub const fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Parse `"192.168.0.42"` or `"192.168.0.69:1234"`.
    pub fn parse(s: &str, default_port: u16) -> Result<Self, Error> {
        let invalid = || Error::InvalidPeer(s.to_string());
        let (ip, port) = match s.trim().split_once(':') {
            Some((ip, port)) => {
                if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                (ip, port.parse::<u16>().map_err(|_| invalid())?)
            }
            None => (s.trim(), default_port),
        };
        let ip = ip.parse::<Ipv4Addr>().map_err(|_| invalid())?;
        if port == 0 {
            return Err(invalid());
        }
        Ok(Self { ip, port })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl FromStr for PeerAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, DEFAULT_PEER_PORT)
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

// ---------------------------------------------------------------------------
// Peer record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeerCounters {
    /// Notifications attempted towards the peer.
    pub sent: u64,
    /// Requests received from the peer.
    pub received: u64,
    /// Failed notification attempts.
    pub errors: u64,
}

#[derive(Debug, Clone)]
pub struct RemotePeer {
    pub addr: PeerAddr,
    /// `None` while deactivated.
    pub expires_at: Option<Instant>,
    /// Suppress exactly one upcoming notification.
    pub skip_once: bool,
    pub counters: PeerCounters,
}

impl RemotePeer {
    pub fn is_active_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| now < t)
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| now >= t)
    }
}

/// Externally visible view of one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerSummary {
    pub address: Ipv4Addr,
    pub port: u16,
    pub active: bool,
    pub skip_once: bool,
    #[serde(flatten)]
    pub counters: PeerCounters,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PeerRegistry {
    peers: Vec<RemotePeer>,
    expiry: Duration,
}

impl PeerRegistry {
    pub fn new(expiry: Duration) -> Self {
        Self {
            peers: Vec::new(),
            expiry,
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn get(&self, addr: &PeerAddr) -> Option<&RemotePeer> {
        self.peers.iter().find(|p| p.addr == *addr)
    }

    fn get_mut(&mut self, addr: &PeerAddr) -> Option<&mut RemotePeer> {
        self.peers.iter_mut().find(|p| p.addr == *addr)
    }

    /// Register `addr` or refresh its expiry.  Returns `true` when new.
    pub fn add_or_update(&mut self, addr: PeerAddr) -> bool {
        self.add_or_update_at(addr, Instant::now())
    }

    pub fn add_or_update_at(&mut self, addr: PeerAddr, now: Instant) -> bool {
        let expires_at = Some(now + self.expiry);
        if let Some(peer) = self.get_mut(&addr) {
            peer.expires_at = expires_at;
            debug!("remote {} refreshed", addr);
            return false;
        }
        self.peers.push(RemotePeer {
            addr,
            expires_at,
            skip_once: false,
            counters: PeerCounters::default(),
        });
        info!("remote {} registered", addr);
        true
    }

    /// Returns `true` if the peer was registered.
    pub fn remove(&mut self, addr: &PeerAddr) -> bool {
        let before = self.peers.len();
        self.peers.retain(|p| p.addr != *addr);
        let removed = self.peers.len() != before;
        if removed {
            info!("remote {} removed", addr);
        }
        removed
    }

    /// Refresh the expiry of a registered peer.
    pub fn activate_at(&mut self, addr: &PeerAddr, now: Instant) -> bool {
        let expiry = self.expiry;
        match self.get_mut(addr) {
            Some(peer) => {
                peer.expires_at = Some(now + expiry);
                info!("remote {} activated", addr);
                true
            }
            None => false,
        }
    }

    /// Keep the peer registered but stop notifying it.
    pub fn deactivate(&mut self, addr: &PeerAddr) -> bool {
        match self.get_mut(addr) {
            Some(peer) => {
                peer.expires_at = None;
                info!("remote {} deactivated", addr);
                true
            }
            None => false,
        }
    }

    /// Record an inbound request: refresh, mark skip-once, count it.
    pub fn on_remote_request_at(&mut self, addr: PeerAddr, count_tx: bool, now: Instant) {
        self.add_or_update_at(addr, now);
        if let Some(peer) = self.get_mut(&addr) {
            peer.skip_once = true;
            peer.counters.received += 1;
            if count_tx {
                peer.counters.sent += 1;
            }
        }
    }

    /// Drop every peer whose expiry has passed.  Returns how many.
    pub fn sweep_expired(&mut self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub fn sweep_expired_at(&mut self, now: Instant) -> usize {
        let before = self.peers.len();
        self.peers.retain(|p| {
            let expired = p.is_expired_at(now);
            if expired {
                info!("remote {} expired", p.addr);
            }
            !expired
        });
        before - self.peers.len()
    }

    /// Select notification targets after a sweep.  Inactive peers are
    /// skipped; skip-once peers are skipped and their flag cleared.
    pub fn plan_fanout_at(&mut self, now: Instant) -> Vec<PeerAddr> {
        self.sweep_expired_at(now);
        let mut targets = Vec::with_capacity(self.peers.len());
        for peer in &mut self.peers {
            if !peer.is_active_at(now) {
                continue;
            }
            if peer.skip_once {
                debug!("skipping update for {} once", peer.addr);
                peer.skip_once = false;
                continue;
            }
            targets.push(peer.addr);
        }
        targets
    }

    /// Account one delivery attempt.  Unknown peers (removed meanwhile)
    /// are ignored.
    pub fn record_send(&mut self, addr: &PeerAddr, outcome: Result<(), PeerSendError>) {
        if let Some(peer) = self.get_mut(addr) {
            peer.counters.sent += 1;
            if outcome.is_err() {
                peer.counters.errors += 1;
            }
        }
    }

    /// Addresses of every registered peer, in registration order.
    pub fn addresses(&self) -> Vec<Ipv4Addr> {
        self.peers.iter().map(|p| p.addr.ip).collect()
    }

    pub fn summaries_at(&self, now: Instant) -> Vec<PeerSummary> {
        self.peers
            .iter()
            .map(|p| PeerSummary {
                address: p.addr.ip,
                port: p.addr.port,
                active: p.is_active_at(now),
                skip_once: p.skip_once,
                counters: p.counters,
            })
            .collect()
    }
}
