//! Log-based event sink adapter and console logging setup.
//!
//! [`LogEventSink`] implements [`EventSink`] by writing structured
//! controller events through the `log` facade.  [`install_console_logger`]
//! is called by the binary only: a `tracing-subscriber` formatter on stderr
//! with the `log` bridge, so every `log` record in the crate reaches it.

use log::{LevelFilter, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::events::StatusEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`StatusEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &StatusEvent) {
        match event {
            StatusEvent::Started(state) => {
                info!("START | initial_state={}", state);
            }
            StatusEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            StatusEvent::BellRang => {
                info!("BELL  | ringing");
            }
            StatusEvent::AutoReverted => {
                info!("BELL  | unanswered, reverted to video");
            }
            StatusEvent::PeerNotified { peer, state } => {
                info!("PEER  | {} <- {}", peer, state);
            }
            StatusEvent::PeerSendFailed { peer, error } => {
                warn!("PEER  | {} unreachable: {}", peer, error);
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Console logger
// ───────────────────────────────────────────────────────────────

/// Filter for the console subscriber at `level`.
pub fn console_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::new(level.as_str().to_ascii_lowercase())
}

/// Install the global console subscriber.  `RUST_LOG` overrides `level`
/// when set.  Fails if a logger is already installed.
pub fn install_console_logger(
    level: LevelFilter,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| console_filter(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
}
