use crate::close::CloseCode;

/// Errors surfaced across the public API and the error taxonomy of §7.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("send failed: connection is not opened")]
    NotOpened,

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("ping timed out waiting for pong")]
    PingTimeout,

    #[error("network reachability lost")]
    MonitorLoss,

    #[error("peer closed the connection with code {code:?}")]
    ProtocolClose { code: CloseCode },
}

pub type Result<T> = std::result::Result<T, Error>;
