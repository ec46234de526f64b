use crate::error::Error;
use crate::message::Message;
use crate::status::Status;
use crate::transport::{Challenge, ChallengeDisposition};

/// The host's observation surface. Every method has a no-op default, so a
/// host only implements the callbacks it cares about — a capability struct
/// of optional callbacks, not an inheritance hierarchy.
pub trait Listener: Send + Sync {
    fn on_status(&self, _old: Status, _new: Status) {}
    fn on_message(&self, _message: Message) {}
    fn on_error(&self, _error: Error) {}

    fn on_challenge(&self, _challenge: Challenge) -> ChallengeDisposition {
        ChallengeDisposition::UseDefault
    }
}

/// A [`Listener`] that observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl Listener for NoopListener {}
