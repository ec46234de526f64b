use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::close::{CloseCode, CloseReason};

/// The shape of the delay curve across successive retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffPolicy {
    /// `attempt as f64 * scale` seconds.
    Linear { scale: f64 },
    /// A fixed interval regardless of attempt number.
    Equal { interval: Duration },
    /// A uniformly random delay in `[min, max)`, redrawn each attempt.
    Random { min: Duration, max: Duration },
    /// `base.powf(attempt as f64 - 1.0) * scale` seconds.
    Exponential { base: f64, scale: f64 },
}

type CloseFilter = dyn Fn(CloseCode, Option<&CloseReason>) -> bool + Send + Sync;

/// A pure function from `(close cause, attempt) -> Option<delay>`.
///
/// `retry` returns `None` to mean "do not retry, settle closed": either the
/// optional `filter` rejected the close cause, or `limits` attempts have
/// already been spent.
#[derive(Clone)]
pub struct RetryPolicy {
    policy: BackoffPolicy,
    limits: u32,
    filter: Option<Arc<CloseFilter>>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("policy", &self.policy)
            .field("limits", &self.limits)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl RetryPolicy {
    pub fn new(policy: BackoffPolicy, limits: u32) -> Self {
        Self {
            policy,
            limits,
            filter: None,
        }
    }

    /// Restrict retrying to close causes the filter accepts. The filter
    /// receives the same `(code, reason)` pair presented to `retry`.
    pub fn with_filter(
        mut self,
        filter: impl Fn(CloseCode, Option<&CloseReason>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// `attempt` is 1-based: the first retry after a close is attempt 1.
    pub fn retry(
        &self,
        code: CloseCode,
        reason: Option<&CloseReason>,
        attempt: u32,
    ) -> Option<Duration> {
        if let Some(filter) = &self.filter {
            if !filter(code, reason) {
                return None;
            }
        }
        if attempt > self.limits {
            return None;
        }
        Some(match &self.policy {
            BackoffPolicy::Linear { scale } => Duration::from_secs_f64(attempt as f64 * scale),
            BackoffPolicy::Equal { interval } => *interval,
            BackoffPolicy::Random { min, max } => {
                let lo = min.as_secs_f64();
                let hi = max.as_secs_f64();
                let secs = if hi > lo {
                    rand::rng().random_range(lo..hi)
                } else {
                    lo
                };
                Duration::from_secs_f64(secs)
            }
            BackoffPolicy::Exponential { base, scale } => {
                Duration::from_secs_f64(base.powf(attempt as f64 - 1.0) * scale)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(d: Duration) -> f64 {
        d.as_secs_f64()
    }

    #[test]
    fn linear_backoff_respects_limits() {
        let policy = RetryPolicy::new(BackoffPolicy::Linear { scale: 0.5 }, 3);
        let delays: Vec<Option<f64>> = (1..=4)
            .map(|attempt| {
                policy
                    .retry(CloseCode::AbnormalClosure, None, attempt)
                    .map(secs)
            })
            .collect();
        assert_eq!(delays, vec![Some(0.5), Some(1.0), Some(1.5), None]);
    }

    #[test]
    fn exponential_backoff_doubles_each_attempt() {
        let policy = RetryPolicy::new(
            BackoffPolicy::Exponential {
                base: 2.0,
                scale: 0.25,
            },
            5,
        );
        let delays: Vec<f64> = (1..=5)
            .map(|attempt| {
                secs(
                    policy
                        .retry(CloseCode::AbnormalClosure, None, attempt)
                        .unwrap(),
                )
            })
            .collect();
        assert_eq!(delays, vec![0.25, 0.5, 1.0, 2.0, 4.0]);
        assert!(policy.retry(CloseCode::AbnormalClosure, None, 6).is_none());
    }

    #[test]
    fn equal_backoff_is_constant() {
        let policy = RetryPolicy::new(
            BackoffPolicy::Equal {
                interval: Duration::from_secs(2),
            },
            10,
        );
        for attempt in 1..=10 {
            assert_eq!(
                policy.retry(CloseCode::AbnormalClosure, None, attempt),
                Some(Duration::from_secs(2))
            );
        }
    }

    #[test]
    fn random_backoff_stays_within_bounds() {
        let policy = RetryPolicy::new(
            BackoffPolicy::Random {
                min: Duration::from_millis(100),
                max: Duration::from_millis(200),
            },
            20,
        );
        for attempt in 1..=20 {
            let delay = policy
                .retry(CloseCode::AbnormalClosure, None, attempt)
                .unwrap();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(200));
        }
    }

    #[test]
    fn filter_rejects_application_close() {
        let policy = RetryPolicy::new(BackoffPolicy::Equal { interval: Duration::from_secs(1) }, 10)
            .with_filter(|code, _reason| !matches!(code, CloseCode::Application(_)));
        assert!(policy.retry(CloseCode::Application(4001), None, 1).is_none());
        assert!(policy
            .retry(CloseCode::AbnormalClosure, None, 1)
            .is_some());
    }
}
