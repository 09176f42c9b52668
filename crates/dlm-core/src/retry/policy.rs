use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// This intentionally stays generic; callers can map HTTP status codes,
/// curl errors, or IO failures into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// Server ignored our Range header and sent a full `200` response instead
    /// of the requested slice. Retrying would just repeat it, so this is fatal
    /// like `Other` but named so the final error can say what actually went wrong.
    RangeIgnored,
    /// Any other error (typically not retried).
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Simple exponential backoff policy with caps.
///
/// For now this is hard-coded; later it can be made configurable via
/// `DlmConfig` once we extend the config schema.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            // The delay before attempt k+1 must be at least 2^k seconds, so the
            // very first retry (k=0) needs a full second, not a fraction of one.
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Compute the next backoff delay for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        self.decide_with_hint(attempt, kind, None)
    }

    /// Like `decide`, but honors a server-supplied `Retry-After` delay when
    /// one was parsed from the response. A parsed hint is always preferred
    /// over our own exponential backoff since it reflects what the server
    /// actually asked for; it is still capped at `max_delay`.
    pub fn decide_with_hint(
        &self,
        attempt: u32,
        kind: ErrorKind,
        retry_after: Option<Duration>,
    ) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other | ErrorKind::RangeIgnored => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_) => {
                if let Some(hint) = retry_after {
                    return RetryDecision::RetryAfter(hint.min(self.max_delay));
                }
                // Simple exponential backoff: base * 2^(attempt-1), capped.
                let exp = 1u32.saturating_mul(1 << attempt.saturating_sub(1).min(8));
                let raw = self.base_delay.saturating_mul(exp);
                let delay = raw.min(self.max_delay);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

/// Parse a `Retry-After` header value.
///
/// Only the delta-seconds form (e.g. `Retry-After: 120`) is understood; the
/// HTTP-date form is rare in practice for this header and is left
/// unsupported rather than pulling in a date-parsing dependency for it.
/// Callers fall back to exponential backoff when this returns `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_retry_for_other() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn no_retry_for_range_ignored() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::RangeIgnored), RetryDecision::NoRetry);
    }

    #[test]
    fn two_throttle_retries_total_at_least_three_seconds() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 10;
        let d1 = match p.decide(1, ErrorKind::Throttled) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        let d2 = match p.decide(2, ErrorKind::Throttled) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        assert!(d1 + d2 >= Duration::from_secs(3));
    }

    #[test]
    fn exponential_backoff_grows_and_is_capped() {
        let mut p = RetryPolicy::default();
        // Allow many attempts so we can observe capping behaviour.
        p.max_attempts = 20;
        let d1 = match p.decide(1, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        let d2 = match p.decide(2, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        assert!(d2 >= d1);

        // Very high attempt should cap at max_delay
        let d_last = match p.decide(10, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        assert!(d_last <= p.max_delay);
    }

    #[test]
    fn respects_max_attempts() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 3;
        assert!(matches!(
            p.decide(1, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(
            p.decide(3, ErrorKind::Throttled),
            RetryDecision::NoRetry
        );
    }
}

