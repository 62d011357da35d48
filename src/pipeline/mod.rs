//! Request evaluation pipeline.
//!
//! # Data Flow
//! ```text
//! RequestContext
//!     → blacklist short-circuit (read-only probe)
//!     → signature scan (path, query, body)
//!     → risk classification (escalation, traffic thresholds)
//!     → rate limit (default bucket, when enabled)
//!     → Verdict + security events
//!     → tracker record (every request, whatever the outcome)
//! ```
//!
//! # Design Decisions
//! - Evaluation is synchronous and lock-light; background upkeep runs in
//!   sweeper tasks owned by the pipeline lifecycle
//! - Fail-open by default: a pipeline fault must not take the service
//!   down with it; fail-closed is opt-in per deployment
//! - One decision event per request, transitions logged separately

pub mod middleware;
pub mod verdict;

pub use middleware::security_middleware;
pub use verdict::{RequestContext, Verdict};

use std::sync::Arc;
use std::time::Duration;

use crate::config::{FailMode, SecurityConfig};
use crate::crypto::{self, KeyManager};
use crate::detect::{DetectionMatch, PatternDetector};
use crate::error::SecurityError;
use crate::lifecycle::{spawn_sweeper, Shutdown};
use crate::monitor::{
    AlertSink, SecurityEvent, SecurityEventKind, SecurityMonitor, SecuritySnapshot, Severity,
};
use crate::observability::metrics;
use crate::risk::{RiskAction, RiskEngine, RiskTier};
use crate::track::{RateLimiter, RequestRecord, RequestTracker};

/// Default rate-limit action applied to every evaluated request.
const DEFAULT_ACTION: &str = "request";

/// The assembled security pipeline.
pub struct Pipeline {
    config: SecurityConfig,
    detector: PatternDetector,
    tracker: Arc<RequestTracker>,
    rate_limiter: RateLimiter,
    risk: RiskEngine,
    keys: Arc<KeyManager>,
    monitor: Arc<SecurityMonitor>,
}

impl Pipeline {
    pub fn new(config: SecurityConfig) -> Self {
        Self::build(config, None)
    }

    /// Build with a custom alert sink instead of the default log sink.
    pub fn with_alert_sink(config: SecurityConfig, sink: Arc<dyn AlertSink>) -> Self {
        Self::build(config, Some(sink))
    }

    fn build(config: SecurityConfig, sink: Option<Arc<dyn AlertSink>>) -> Self {
        // The tracker must retain enough history for its widest consumer,
        // not just its own window.
        let mut tracker_config = config.tracker.clone();
        tracker_config.window_secs = config.longest_window_secs();
        let tracker = Arc::new(RequestTracker::new(&tracker_config));
        let monitor = Arc::new(match sink {
            Some(sink) => SecurityMonitor::with_sink(&config.monitor, sink),
            None => SecurityMonitor::new(&config.monitor),
        });
        let keys = Arc::new(KeyManager::new(&config.keys));
        monitor.record(SecurityEvent::new(
            SecurityEventKind::KeyGenerated,
            Severity::Low,
            None,
            format!("initial encryption key {} generated", keys.current_key_id()),
        ));

        Self {
            detector: PatternDetector::new(&config.detector),
            rate_limiter: RateLimiter::new(tracker.clone(), config.rate_limit.clone()),
            risk: RiskEngine::new(&config.risk, tracker.clone()),
            tracker,
            keys,
            monitor,
            config,
        }
    }

    /// Evaluate one request and record its outcome.
    pub fn evaluate(&self, ctx: &RequestContext) -> Verdict {
        self.monitor.note_inspected();
        metrics::record_request();

        // The deadline check brackets evaluation; everything inside is
        // synchronous and bounded.
        if let Some(deadline) = ctx.deadline {
            if std::time::Instant::now() >= deadline {
                return self.failure_verdict("evaluation deadline exceeded");
            }
        }

        let verdict = self.evaluate_inner(ctx);
        self.record_outcome(ctx, &verdict);
        verdict
    }

    fn evaluate_inner(&self, ctx: &RequestContext) -> Verdict {
        // Active blacklist: reject without scanning or recording violations.
        if let Some(retry_after) = self.risk.active_blacklist(&ctx.identity) {
            metrics::record_blocked("blacklist");
            self.monitor.record(SecurityEvent::new(
                SecurityEventKind::RequestBlocked,
                Severity::High,
                Some(&ctx.identity),
                format!("blacklisted identity rejected, retry in {retry_after}s"),
            ));
            return Verdict {
                action: RiskAction::Block,
                http_status: 403,
                retry_after_secs: Some(retry_after),
                warning_header: None,
                reasons: vec!["identity blacklisted".to_string()],
            };
        }

        let mut matches = self.detector.scan_text("path", &ctx.path);
        matches.extend(self.detector.scan("query", &ctx.query));
        matches.extend(self.detector.scan("body", &ctx.body));

        let assessment = self.risk.classify(&ctx.identity, &matches);

        if !matches.is_empty() {
            self.record_threat(ctx, &matches, assessment.severity);
        }
        if assessment.newly_blacklisted {
            metrics::record_blacklisted();
            self.monitor.record(SecurityEvent::new(
                SecurityEventKind::IdentityBlacklisted,
                Severity::Critical,
                Some(&ctx.identity),
                format!(
                    "escalated to blacklist for {}s",
                    assessment.retry_after_secs.unwrap_or_default()
                ),
            ));
        }

        match assessment.action {
            RiskAction::Block => {
                let http_status = if assessment.tier == RiskTier::Blacklisted {
                    403
                } else if matches.is_empty() {
                    // Traffic-triggered block.
                    429
                } else {
                    400
                };
                metrics::record_blocked(if matches.is_empty() { "traffic" } else { "signature" });
                if matches.is_empty() {
                    self.monitor.record(SecurityEvent::new(
                        SecurityEventKind::RequestBlocked,
                        assessment.severity,
                        Some(&ctx.identity),
                        assessment.reasons.join(", "),
                    ));
                }
                Verdict {
                    action: RiskAction::Block,
                    http_status,
                    retry_after_secs: assessment.retry_after_secs,
                    warning_header: None,
                    reasons: assessment.reasons,
                }
            }
            RiskAction::Warn | RiskAction::Allow => {
                if self.config.rate_limit.enabled {
                    let decision = self.rate_limiter.check_action(&ctx.identity, DEFAULT_ACTION);
                    if !decision.allowed {
                        metrics::record_rate_limited(DEFAULT_ACTION);
                        self.monitor.record(SecurityEvent::new(
                            SecurityEventKind::RateLimited,
                            Severity::Medium,
                            Some(&ctx.identity),
                            format!("default bucket exhausted, resets in {}s", decision.reset_in_secs),
                        ));
                        return Verdict {
                            action: RiskAction::Block,
                            http_status: 429,
                            retry_after_secs: Some(decision.reset_in_secs),
                            warning_header: None,
                            reasons: vec!["rate limit exceeded".to_string()],
                        };
                    }
                }

                if assessment.action == RiskAction::Warn {
                    metrics::record_warned();
                    self.monitor.record(SecurityEvent::new(
                        SecurityEventKind::RequestWarned,
                        assessment.severity,
                        Some(&ctx.identity),
                        assessment.reasons.join(", "),
                    ));
                    Verdict {
                        action: RiskAction::Warn,
                        http_status: 200,
                        retry_after_secs: None,
                        warning_header: Some("elevated-request-rate".to_string()),
                        reasons: assessment.reasons,
                    }
                } else {
                    Verdict::allow()
                }
            }
        }
    }

    fn record_threat(&self, ctx: &RequestContext, matches: &[DetectionMatch], severity: Severity) {
        let mut details = String::new();
        for (i, m) in matches.iter().enumerate() {
            if i > 0 {
                details.push_str(", ");
            }
            details.push_str(&format!("{} at {}", m.category, m.field_path));
            metrics::record_threat(m.category.as_str());
        }
        tracing::warn!(
            client = %ctx.identity,
            method = %ctx.method,
            path = %ctx.path,
            "threat detected: {details}"
        );
        self.monitor.record(SecurityEvent::new(
            SecurityEventKind::ThreatDetected,
            severity,
            Some(&ctx.identity),
            details,
        ));
    }

    fn record_outcome(&self, ctx: &RequestContext, verdict: &Verdict) {
        let mut record = RequestRecord::new(&ctx.method, &ctx.path, ctx.payload_size);
        record.status_code = verdict.http_status;
        record.outcome = match verdict.action {
            RiskAction::Allow => crate::track::RequestOutcome::Allowed,
            RiskAction::Warn => crate::track::RequestOutcome::Warned,
            RiskAction::Block => crate::track::RequestOutcome::Blocked,
        };
        self.tracker.record(&ctx.identity, record);
    }

    fn failure_verdict(&self, reason: &str) -> Verdict {
        match self.config.pipeline.fail_mode {
            FailMode::Open => {
                tracing::error!(reason, "pipeline failure, failing open");
                Verdict::allow()
            }
            FailMode::Closed => {
                tracing::error!(reason, "pipeline failure, failing closed");
                Verdict {
                    action: RiskAction::Block,
                    http_status: 503,
                    retry_after_secs: None,
                    warning_header: None,
                    reasons: vec!["security evaluation unavailable".to_string()],
                }
            }
        }
    }

    /// Check a named action bucket for an application-level operation
    /// (login, password reset). Counts the attempt either way.
    pub fn enforce_action_limit(&self, identity: &str, action: &str) -> Result<(), SecurityError> {
        let decision = self.rate_limiter.check_action(identity, action);
        if decision.allowed {
            return Ok(());
        }
        metrics::record_rate_limited(action);
        self.monitor.record(SecurityEvent::new(
            SecurityEventKind::RateLimited,
            Severity::Medium,
            Some(identity),
            format!("{action} bucket exhausted, resets in {}s", decision.reset_in_secs),
        ));
        Err(SecurityError::RateLimitExceeded {
            action: action.to_string(),
            retry_after_secs: decision.reset_in_secs,
        })
    }

    /// Record a failed login attempt (feeds the brute-force alert rule).
    pub fn record_login_failure(&self, identity: &str) {
        self.monitor.record(SecurityEvent::new(
            SecurityEventKind::LoginFailed,
            Severity::Medium,
            Some(identity),
            "authentication failed",
        ));
    }

    /// Encrypt a sensitive value into the compact string form.
    pub fn encrypt_sensitive(&self, value: &serde_json::Value) -> Result<String, SecurityError> {
        crypto::encrypt_value(&self.keys, value)
    }

    /// Decrypt a compact string form back into its value.
    pub fn decrypt_sensitive(&self, encoded: &str) -> Result<serde_json::Value, SecurityError> {
        crypto::decrypt_value(&self.keys, encoded)
    }

    /// Assemble a point-in-time statistics snapshot.
    pub fn snapshot(&self) -> SecuritySnapshot {
        SecuritySnapshot {
            totals: self.monitor.totals(),
            blocked_identities: self
                .risk
                .blacklisted_identities()
                .into_iter()
                .map(|(identity, _)| identity)
                .collect(),
            risk_tiers: self.risk.tier_counts(),
            recent_events: self.monitor.recent_events(50),
            recent_alerts: self.monitor.recent_alerts(20),
            keys: self.keys.key_status(),
        }
    }

    /// Spawn background maintenance tasks tied to `shutdown`.
    pub fn start(self: &Arc<Self>, shutdown: &Shutdown) {
        let pipeline = self.clone();
        spawn_sweeper(
            "tracker-sweep",
            Duration::from_secs(self.config.tracker.sweep_interval_secs),
            shutdown.subscribe(),
            move || {
                let evicted = pipeline.tracker.sweep();
                metrics::record_tracked_identities(pipeline.tracker.tracked_identities());
                if evicted > 0 {
                    tracing::debug!(evicted, "tracker sweep");
                }
            },
        );

        let pipeline = self.clone();
        spawn_sweeper(
            "risk-sweep",
            Duration::from_secs(self.config.tracker.sweep_interval_secs),
            shutdown.subscribe(),
            move || {
                let evicted = pipeline.risk.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, "risk state sweep");
                }
            },
        );

        let pipeline = self.clone();
        spawn_sweeper(
            "event-retention",
            Duration::from_secs(self.config.monitor.sweep_interval_secs),
            shutdown.subscribe(),
            move || {
                let dropped = pipeline.monitor.sweep();
                if dropped > 0 {
                    tracing::debug!(dropped, "event retention sweep");
                }
            },
        );

        let pipeline = self.clone();
        spawn_sweeper(
            "key-lifecycle",
            Duration::from_secs(self.config.keys.sweep_interval_secs),
            shutdown.subscribe(),
            move || {
                if pipeline.keys.rotation_due() {
                    let (retiring, fresh) = pipeline.keys.rotate();
                    pipeline.monitor.record(SecurityEvent::new(
                        SecurityEventKind::KeyRotated,
                        Severity::Low,
                        None,
                        format!("key {retiring} retired from encryption, key {fresh} current"),
                    ));
                }
                for id in pipeline.keys.retire_expired() {
                    pipeline.monitor.record(SecurityEvent::new(
                        SecurityEventKind::KeyRetired,
                        Severity::Low,
                        None,
                        format!("key {id} evicted past max age"),
                    ));
                }
            },
        );
    }

    pub fn monitor(&self) -> &SecurityMonitor {
        &self.monitor
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub(crate) fn trusted_proxy_header(&self) -> Option<&str> {
        self.config.pipeline.trusted_proxy_header.as_deref()
    }
}
