use crate::close::{CloseCode, CloseReason};

/// The lifecycle of a connection, as observed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Opening,
    Opened { subprotocol: Option<String> },
    Closing,
    Closed {
        code: CloseCode,
        reason: Option<CloseReason>,
        /// Informational echo of whether the supervisor expects to retry.
        /// Not authoritative — the retry engine's own bookkeeping drives
        /// scheduling regardless of what this field says.
        will_retry: bool,
    },
}

impl Status {
    pub fn is_opening(&self) -> bool {
        matches!(self, Status::Opening)
    }

    pub fn is_opened(&self) -> bool {
        matches!(self, Status::Opened { .. })
    }

    pub fn is_closing(&self) -> bool {
        matches!(self, Status::Closing)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Status::Closed { .. })
    }

    pub(crate) fn closed_manual() -> Self {
        Status::Closed {
            code: CloseCode::NormalClosure,
            reason: None,
            will_retry: false,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::closed_manual()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_closed_manual() {
        let status = Status::default();
        assert!(status.is_closed());
        assert_eq!(
            status,
            Status::Closed {
                code: CloseCode::NormalClosure,
                reason: None,
                will_retry: false,
            }
        );
    }

    #[test]
    fn predicates_match_variant() {
        assert!(Status::Opening.is_opening());
        assert!(Status::Opened { subprotocol: None }.is_opened());
        assert!(Status::Closing.is_closing());
    }
}
