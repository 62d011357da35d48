//! Alert correlation rules.
//!
//! Rules are edge-triggered: each fires at most once per correlation
//! window, when the threshold is first crossed. Further matching events
//! inside the same window are absorbed silently.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::config::AlertRuleConfig;
use crate::monitor::events::{SecurityEvent, SecurityEventKind, Severity};
use crate::track::tracker::now_ms;

/// A fired alert.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub rule: &'static str,
    pub severity: Severity,
    pub timestamp_ms: u64,
    pub summary: String,
    /// Identities that tripped the rule, for sinks that need more than
    /// the prose summary.
    pub evidence: Vec<String>,
}

impl Alert {
    fn new(rule: &'static str, severity: Severity, summary: String, evidence: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule,
            severity,
            timestamp_ms: now_ms(),
            summary,
            evidence,
        }
    }
}

/// Synchronous delivery seam. Implementations hand off to async transports
/// (queues, webhooks); the monitor never awaits delivery.
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &Alert);
}

/// Default sink: a structured warning log.
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&self, alert: &Alert) {
        tracing::warn!(
            rule = alert.rule,
            severity = %alert.severity,
            evidence = ?alert.evidence,
            "{}",
            alert.summary
        );
    }
}

struct RuleWindow {
    start_ms: u64,
    count: u32,
    fired: bool,
}

/// Fires when one identity accumulates too many failed logins.
pub(super) struct BruteForceRule {
    config: AlertRuleConfig,
    windows: HashMap<String, RuleWindow>,
}

impl BruteForceRule {
    pub(super) fn new(config: AlertRuleConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
        }
    }

    pub(super) fn observe(&mut self, event: &SecurityEvent) -> Option<Alert> {
        if event.kind != SecurityEventKind::LoginFailed {
            return None;
        }
        let identity = event.identity.as_deref()?;
        let now = now_ms();
        let window_ms = self.config.window_secs * 1000;

        let window = self
            .windows
            .entry(identity.to_string())
            .or_insert(RuleWindow {
                start_ms: now,
                count: 0,
                fired: false,
            });
        if now.saturating_sub(window.start_ms) > window_ms {
            *window = RuleWindow {
                start_ms: now,
                count: 0,
                fired: false,
            };
        }
        window.count += 1;

        if window.count >= self.config.threshold && !window.fired {
            window.fired = true;
            return Some(Alert::new(
                "brute_force",
                Severity::High,
                format!(
                    "{} failed logins from {} within {}s",
                    window.count, identity, self.config.window_secs
                ),
                vec![identity.to_string()],
            ));
        }
        None
    }

    /// Drop per-identity windows that have lapsed. Without this the map
    /// keeps every identity that ever failed a login.
    pub(super) fn prune(&mut self, now: u64) {
        let window_ms = self.config.window_secs * 1000;
        self.windows
            .retain(|_, window| now.saturating_sub(window.start_ms) <= window_ms);
    }

    #[cfg(test)]
    pub(super) fn window_count(&self) -> usize {
        self.windows.len()
    }
}

/// Fires when distinct identities trip threat detection together.
pub(super) struct CoordinatedAttackRule {
    config: AlertRuleConfig,
    start_ms: u64,
    identities: HashSet<String>,
    fired: bool,
}

impl CoordinatedAttackRule {
    pub(super) fn new(config: AlertRuleConfig) -> Self {
        Self {
            config,
            start_ms: now_ms(),
            identities: HashSet::new(),
            fired: false,
        }
    }

    pub(super) fn observe(&mut self, event: &SecurityEvent) -> Option<Alert> {
        if event.kind != SecurityEventKind::ThreatDetected {
            return None;
        }
        let identity = event.identity.as_deref()?;
        let now = now_ms();
        if now.saturating_sub(self.start_ms) > self.config.window_secs * 1000 {
            self.start_ms = now;
            self.identities.clear();
            self.fired = false;
        }
        self.identities.insert(identity.to_string());

        if self.identities.len() as u32 >= self.config.threshold && !self.fired {
            self.fired = true;
            let mut evidence: Vec<String> = self.identities.iter().cloned().collect();
            evidence.sort();
            return Some(Alert::new(
                "coordinated_attack",
                Severity::Critical,
                format!(
                    "{} distinct identities triggered threat detection within {}s",
                    self.identities.len(),
                    self.config.window_secs
                ),
                evidence,
            ));
        }
        None
    }

    /// Reset a lapsed correlation window even when no new event arrives.
    pub(super) fn prune(&mut self, now: u64) {
        if now.saturating_sub(self.start_ms) > self.config.window_secs * 1000 {
            self.start_ms = now;
            self.identities.clear();
            self.fired = false;
        }
    }
}
