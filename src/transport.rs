use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::close::CloseCode;
use crate::error::Error;
use crate::message::Message;

/// Where to connect, and how. Mutually exclusive by construction: either a
/// bare URL or a fully-described request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    Url(Url),
    Request {
        url: Url,
        headers: Vec<(String, String)>,
        timeout: Option<Duration>,
    },
}

impl ConnectTarget {
    pub fn url(&self) -> &Url {
        match self {
            ConnectTarget::Url(url) => url,
            ConnectTarget::Request { url, .. } => url,
        }
    }
}

/// An authentication challenge raised by the transport mid-handshake (e.g. a
/// TLS client-certificate or HTTP auth prompt).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub host: String,
}

/// A credential supplied in response to a [`Challenge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub identity: Vec<u8>,
}

/// How a challenge should be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeDisposition {
    /// Let the transport apply its own default handling.
    UseDefault,
    /// Refuse the challenge, failing the connection attempt.
    Reject,
    /// Cancel the connection attempt outright.
    Cancel,
    UseCredential(Credential),
}

/// Lifecycle callbacks a [`Transport`] invokes on behalf of a single
/// connection attempt. Every method carries no identity of its own; the
/// transport is responsible for calling these promptly and from any thread.
pub trait TransportEvents: Send + Sync {
    fn did_open(&self, subprotocol: Option<String>);
    fn did_receive(&self, message: Message);
    fn did_close(&self, code: CloseCode, reason: Option<Vec<u8>>);
    fn did_fail(&self, message: String);

    fn did_receive_challenge(&self, _challenge: Challenge) -> ChallengeDisposition {
        ChallengeDisposition::UseDefault
    }
}

/// A live connection attempt, as handed back by [`Transport::connect`].
pub trait TransportHandle: Send + Sync {
    fn send(&self, message: Message) -> Result<(), Error>;
    fn send_ping(&self) -> Result<(), Error>;

    /// Ends the connection. `code == CloseCode::Invalid` requests an abrupt
    /// close with no close frame at all; any transmittable code requests a
    /// graceful close frame carrying that code and `reason`.
    fn cancel(&self, code: CloseCode, reason: Option<Vec<u8>>);
}

/// Opens WebSocket connections. Implementations must return from `connect`
/// immediately — the connection proceeds asynchronously and reports back
/// through `events`.
pub trait Transport: Send + Sync {
    fn connect(
        &self,
        target: &ConnectTarget,
        subprotocols: &[String],
        events: Arc<dyn TransportEvents>,
    ) -> Result<Box<dyn TransportHandle>, Error>;
}
