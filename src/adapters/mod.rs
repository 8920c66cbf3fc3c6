//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements           | Connects to                 |
//! |-----------------|----------------------|-----------------------------|
//! | `config_file`   | ConfigPort           | JSON file on disk           |
//! | `log_sink`      | EventSink, log::Log  | Console                     |
//! | `peer_listener` |:                    | Inbound peer notifications  |
//! | `sim`           | LedStrip, EdgeSource | Simulated strip and pins    |
//! |                 | InputPin, OutputPin  |                             |
//! | `tcp_transport` | PeerTransport        | TCP with send timeout       |

pub mod config_file;
pub mod log_sink;
pub mod peer_listener;
pub mod sim;
pub mod tcp_transport;
