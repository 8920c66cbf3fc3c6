//! Outbound controller events.
//!
//! The [`StatusController`](super::controller::StatusController) emits
//! these through the [`EventSink`](super::ports::EventSink) port.  Adapters
//! on the other side decide what to do with them: log to the console,
//! push to a dashboard, count them in a test.

use crate::error::PeerSendError;
use crate::fsm::State;
use crate::peers::PeerAddr;

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The controller has started (carries initial state).
    Started(State),

    /// The FSM transitioned between states.
    StateChanged { from: State, to: State },

    /// The bell buzzer started a ring sequence.
    BellRang,

    /// REQUEST went unanswered and fell back to VIDEO.
    AutoReverted,

    /// A state notification reached a peer.
    PeerNotified { peer: PeerAddr, state: State },

    /// A state notification could not be delivered.
    PeerSendFailed { peer: PeerAddr, error: PeerSendError },
}
