//! Windowed rate limiting over the request tracker.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;
use crate::track::tracker::{now_ms, RequestRecord, RequestTracker};

/// Outcome of a rate limit check.
///
/// Advisory only: the limiter never blocks or retries, the caller decides
/// what to do with a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Attempts left in the current window.
    pub remaining: u32,
    /// Seconds until the oldest counted attempt ages out.
    pub reset_in_secs: u64,
}

/// Counts attempts per `(identity, action)` in the shared tracker.
///
/// Holds no state of its own: the composite key's window in the tracker is
/// the whole bookkeeping.
pub struct RateLimiter {
    tracker: Arc<RequestTracker>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(tracker: Arc<RequestTracker>, config: RateLimitConfig) -> Self {
        Self { tracker, config }
    }

    /// Count one attempt for `(identity, action)` and decide.
    pub fn check(&self, identity: &str, action: &str, limit: u32, window_secs: u64) -> RateDecision {
        let key = format!("{identity}::{action}");
        let window = Duration::from_secs(window_secs);

        self.tracker.record(&key, RequestRecord::attempt());
        let count = self.tracker.count_within(&key, window) as u32;

        let allowed = count <= limit;
        let remaining = limit.saturating_sub(count);
        let reset_in_secs = self
            .tracker
            .oldest_within(&key, window)
            .map_or(window_secs, |oldest| {
                let elapsed_secs = now_ms().saturating_sub(oldest) / 1000;
                window_secs.saturating_sub(elapsed_secs)
            });

        RateDecision {
            allowed,
            remaining,
            reset_in_secs,
        }
    }

    /// Check using the configured limit for `action`, falling back to the
    /// default limit when no override exists.
    pub fn check_action(&self, identity: &str, action: &str) -> RateDecision {
        let (limit, window_secs) = self
            .config
            .actions
            .iter()
            .find(|a| a.action == action)
            .map(|a| (a.limit, a.window_secs))
            .unwrap_or((self.config.default_limit, self.config.default_window_secs));
        self.check(identity, action, limit, window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionLimit, TrackerConfig};

    fn limiter(config: RateLimitConfig) -> RateLimiter {
        let tracker = Arc::new(RequestTracker::new(&TrackerConfig::default()));
        RateLimiter::new(tracker, config)
    }

    #[test]
    fn sixth_attempt_is_denied() {
        let limiter = limiter(RateLimitConfig::default());
        for i in 1..=5 {
            let decision = limiter.check("user-1", "login", 5, 60);
            assert!(decision.allowed, "attempt {i} should pass");
            assert_eq!(decision.remaining, 5 - i);
        }
        let decision = limiter.check("user-1", "login", 5, 60);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.reset_in_secs <= 60);
    }

    #[test]
    fn actions_count_independently() {
        let limiter = limiter(RateLimitConfig::default());
        for _ in 0..3 {
            limiter.check("user-1", "login", 3, 60);
        }
        assert!(!limiter.check("user-1", "login", 3, 60).allowed);
        assert!(limiter.check("user-1", "password_reset", 3, 60).allowed);
        assert!(limiter.check("user-2", "login", 3, 60).allowed);
    }

    #[test]
    fn configured_action_override_applies() {
        let config = RateLimitConfig {
            actions: vec![ActionLimit {
                action: "login".to_string(),
                limit: 2,
                window_secs: 60,
            }],
            ..Default::default()
        };
        let limiter = limiter(config);
        assert!(limiter.check_action("user-1", "login").allowed);
        assert!(limiter.check_action("user-1", "login").allowed);
        assert!(!limiter.check_action("user-1", "login").allowed);
        // Unlisted actions fall back to the default 100/60s.
        assert!(limiter.check_action("user-1", "search").allowed);
    }
}
