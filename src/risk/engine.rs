//! Risk scoring and escalation.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::config::RiskConfig;
use crate::detect::{DetectionMatch, SignatureCategory};
use crate::monitor::Severity;
use crate::risk::ddos::{DdosClassifier, TrafficClass};
use crate::risk::state::{IdentityRisk, RiskTier, ViolationClass};
use crate::track::tracker::now_ms;
use crate::track::RequestTracker;

/// What the pipeline should do with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAction {
    Allow,
    Warn,
    Block,
}

/// Outcome of classifying one request.
#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub action: RiskAction,
    pub severity: Severity,
    pub tier: RiskTier,
    /// Category-level reasons, safe to expose to callers.
    pub reasons: Vec<String>,
    /// Present when the identity is (or just became) blacklisted.
    pub retry_after_secs: Option<u64>,
    /// True only on the request that crossed the blacklist threshold.
    pub newly_blacklisted: bool,
}

impl RiskAssessment {
    fn allow(tier: RiskTier) -> Self {
        Self {
            action: RiskAction::Allow,
            severity: Severity::Low,
            tier,
            reasons: Vec::new(),
            retry_after_secs: None,
            newly_blacklisted: false,
        }
    }
}

/// Per-identity escalation state machine.
///
/// Clean → Suspicious on the first violation in a window, → HighRisk at
/// `suspicious_threshold`, → Blacklisted at `max_suspicious_attempts`.
/// Blacklists lapse back to Clean on the first evaluation after expiry.
pub struct RiskEngine {
    states: DashMap<String, IdentityRisk>,
    classifier: DdosClassifier,
    tracker: Arc<RequestTracker>,
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: &RiskConfig, tracker: Arc<RequestTracker>) -> Self {
        Self {
            states: DashMap::new(),
            classifier: DdosClassifier::new(&config.ddos),
            tracker,
            config: config.clone(),
        }
    }

    /// Read-only blacklist probe: remaining seconds if actively blocked.
    ///
    /// Never mutates state, so re-probing an already-blacklisted identity
    /// cannot extend its sentence.
    pub fn active_blacklist(&self, identity: &str) -> Option<u64> {
        let state = self.states.get(identity)?;
        let until = state.blacklisted_until_ms?;
        let now = now_ms();
        if now < until {
            Some((until - now).div_ceil(1000))
        } else {
            None
        }
    }

    /// Classify one request given its signature matches.
    pub fn classify(&self, identity: &str, matches: &[DetectionMatch]) -> RiskAssessment {
        let now = now_ms();
        let mut state = self
            .states
            .entry(identity.to_string())
            .or_insert_with(|| IdentityRisk::new(now));
        state.last_seen_ms = now;

        // An active blacklist short-circuits without recording anything.
        if let Some(until) = state.blacklisted_until_ms {
            if now < until {
                return RiskAssessment {
                    action: RiskAction::Block,
                    severity: Severity::Critical,
                    tier: RiskTier::Blacklisted,
                    reasons: vec!["identity blacklisted".to_string()],
                    retry_after_secs: Some((until - now).div_ceil(1000)),
                    newly_blacklisted: false,
                };
            }
            // Lapsed with no standing violations: the identity starts over.
            state.blacklisted_until_ms = None;
            state.violations = 0;
            state.tier = RiskTier::Clean;
        }

        let mut assessment = RiskAssessment::allow(state.tier);
        let mut violation_class: Option<ViolationClass> = None;

        if !matches.is_empty() {
            assessment.action = RiskAction::Block;
            assessment.severity = matches
                .iter()
                .map(|m| signature_severity(m.category))
                .max()
                .unwrap_or(Severity::High);
            let mut seen = Vec::new();
            for m in matches {
                if !seen.contains(&m.category) {
                    seen.push(m.category);
                    assessment.reasons.push(format!("{} signature", m.category));
                }
            }
            violation_class = Some(ViolationClass::Waf);
        }

        match self.classifier.classify(&self.tracker, identity) {
            Some(TrafficClass::Burst) => {
                assessment.action = RiskAction::Block;
                assessment.severity = assessment.severity.max(Severity::Critical);
                assessment.reasons.push("burst traffic".to_string());
                violation_class = violation_class.or(Some(ViolationClass::Ddos));
            }
            Some(TrafficClass::Sustained) => {
                assessment.action = RiskAction::Block;
                assessment.severity = assessment.severity.max(Severity::High);
                assessment.reasons.push("sustained flood".to_string());
                violation_class = violation_class.or(Some(ViolationClass::Ddos));
            }
            Some(TrafficClass::Suspicious) => {
                if assessment.action == RiskAction::Allow {
                    assessment.action = RiskAction::Warn;
                }
                assessment.severity = assessment.severity.max(Severity::Medium);
                assessment.reasons.push("elevated request rate".to_string());
            }
            None => {}
        }

        if let Some(class) = violation_class {
            let window_ms = self.config.suspicious_window_secs * 1000;
            if state.violations == 0 || now.saturating_sub(state.window_start_ms) > window_ms {
                state.violations = 0;
                state.window_start_ms = now;
            }
            state.violations += 1;

            if state.violations >= self.config.max_suspicious_attempts {
                // Signature violations take the longer WAF sentence when
                // both policies fire on the same request.
                let block_secs = match class {
                    ViolationClass::Waf => self.config.waf_block_secs,
                    ViolationClass::Ddos => self.config.ddos_block_secs,
                };
                state.blacklisted_until_ms = Some(now + block_secs * 1000);
                state.tier = RiskTier::Blacklisted;
                assessment.tier = RiskTier::Blacklisted;
                assessment.severity = Severity::Critical;
                assessment.retry_after_secs = Some(block_secs);
                assessment.newly_blacklisted = true;
                assessment.reasons.push("identity blacklisted".to_string());
                return assessment;
            }

            state.tier = if state.violations >= self.config.suspicious_threshold {
                RiskTier::HighRisk
            } else {
                RiskTier::Suspicious
            };
        }

        assessment.tier = state.tier;
        assessment
    }

    /// Identities whose blacklist has not yet lapsed, with expiry stamps.
    pub fn blacklisted_identities(&self) -> Vec<(String, u64)> {
        let now = now_ms();
        self.states
            .iter()
            .filter_map(|entry| {
                entry
                    .blacklisted_until_ms
                    .filter(|until| now < *until)
                    .map(|until| (entry.key().clone(), until))
            })
            .collect()
    }

    /// Identity count per tier, for the stats snapshot.
    pub fn tier_counts(&self) -> HashMap<&'static str, usize> {
        let mut counts = HashMap::new();
        for entry in self.states.iter() {
            *counts.entry(entry.tier.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Drop lapsed blacklists and evict clean, inactive identities.
    /// Returns the number of evicted entries.
    pub fn sweep(&self) -> usize {
        let now = now_ms();
        let horizon = now.saturating_sub(self.config.state_retention_secs * 1000);
        let before = self.states.len();
        self.states.retain(|_, state| {
            if state
                .blacklisted_until_ms
                .is_some_and(|until| now >= until)
            {
                state.blacklisted_until_ms = None;
                state.violations = 0;
                state.tier = RiskTier::Clean;
            }
            state.blacklisted_until_ms.is_some() || state.last_seen_ms >= horizon
        });
        before - self.states.len()
    }
}

fn signature_severity(category: SignatureCategory) -> Severity {
    match category {
        SignatureCategory::SqlInjection | SignatureCategory::CommandInjection => Severity::Critical,
        SignatureCategory::ScriptInjection
        | SignatureCategory::PathTraversal
        | SignatureCategory::QueryOperatorInjection => Severity::High,
    }
}
