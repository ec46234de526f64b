use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::DelayHandle;
use crate::message::Message;

/// A liveness strategy that doesn't rely on protocol-level ping frames,
/// e.g. an application-defined heartbeat message and its expected reply.
pub trait PingProvider: Send + Sync {
    fn build_ping(&self) -> Message;
    fn check_pong(&self, message: &Message) -> bool;
}

/// Which liveness strategy the pinger uses.
#[derive(Clone)]
pub enum PingMode {
    /// Protocol-level WebSocket ping/pong frames, driven automatically by
    /// the supervisor's status transitions.
    Standard,
    /// Application-level heartbeat, driven manually by the host.
    Provider(Arc<dyn PingProvider>),
}

impl fmt::Debug for PingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingMode::Standard => write!(f, "PingMode::Standard"),
            PingMode::Provider(_) => write!(f, "PingMode::Provider(..)"),
        }
    }
}

#[derive(Clone)]
pub struct PingingConfig {
    pub mode: PingMode,
    pub timeout: Duration,
    pub interval: Duration,
}

impl fmt::Debug for PingingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PingingConfig")
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Liveness bookkeeping for a single connection. Owned by the supervisor
/// and driven entirely under its lock; holds no runtime handles of its own
/// beyond the currently scheduled delay.
pub(crate) struct Pinger {
    pub(crate) mode: PingMode,
    pub(crate) timeout: Duration,
    pub(crate) interval: Duration,
    pub(crate) pong_received: bool,
    pub(crate) suspended: bool,
    pub(crate) task: Option<Box<dyn DelayHandle>>,
}

impl Pinger {
    pub(crate) fn new(config: PingingConfig) -> Self {
        Self {
            mode: config.mode,
            timeout: config.timeout,
            interval: config.interval,
            pong_received: false,
            suspended: true,
            task: None,
        }
    }

    pub(crate) fn build_ping(&self) -> Message {
        match &self.mode {
            PingMode::Standard => Message::Ping(Vec::new()),
            PingMode::Provider(provider) => provider.build_ping(),
        }
    }

    pub(crate) fn observe(&mut self, message: &Message) {
        let matched = match &self.mode {
            PingMode::Standard => matches!(message, Message::Pong(_)),
            PingMode::Provider(provider) => provider.check_pong(message),
        };
        if matched {
            self.pong_received = true;
        }
    }
}
