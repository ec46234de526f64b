//! resocket — a resilient client-side WebSocket connector.
//!
//! Owns a single logical WebSocket connection and keeps it healthy across
//! transient failures: a connection state machine, an automatic
//! reconnection engine with pluggable backoff, a ping/pong liveness
//! subsystem, and integration with a host-supplied network-reachability
//! signal. WebSocket framing, TLS, and the timer source are all consumed
//! through traits ([`transport::Transport`], [`clock::Clock`]) rather than
//! implemented here.

pub mod clock;
pub mod close;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod message;
pub mod monitor;
pub mod pinger;
pub mod retry;
pub mod status;
pub mod transport;

mod client;

pub use client::{Client, ClientBuilder};
pub use close::{CloseCode, CloseReason};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use message::Message;
pub use monitor::Reachability;
pub use pinger::{PingMode, PingProvider, PingingConfig};
pub use retry::{BackoffPolicy, RetryPolicy};
pub use status::Status;
pub use transport::{
    Challenge, ChallengeDisposition, ConnectTarget, Credential, Transport, TransportEvents,
    TransportHandle,
};
