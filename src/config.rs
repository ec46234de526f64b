use crate::transport::ConnectTarget;

/// Static configuration for a [`crate::Client`], fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_target: ConnectTarget,
    pub subprotocols: Vec<String>,
}

impl ClientConfig {
    pub fn new(connect_target: ConnectTarget) -> Self {
        Self {
            connect_target,
            subprotocols: Vec::new(),
        }
    }

    pub fn with_subprotocols(mut self, subprotocols: Vec<String>) -> Self {
        self.subprotocols = subprotocols;
        self
    }
}
