//! Per-identity risk state.

use serde::{Deserialize, Serialize};

/// Escalation ladder for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Clean,
    Suspicious,
    HighRisk,
    Blacklisted,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Clean => "clean",
            RiskTier::Suspicious => "suspicious",
            RiskTier::HighRisk => "high_risk",
            RiskTier::Blacklisted => "blacklisted",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which policy a violation came from; block durations differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationClass {
    /// Signature match in the payload.
    Waf,
    /// Traffic threshold crossed.
    Ddos,
}

/// Mutable risk state for one identity.
#[derive(Debug, Clone)]
pub(super) struct IdentityRisk {
    pub tier: RiskTier,
    pub violations: u32,
    pub window_start_ms: u64,
    pub blacklisted_until_ms: Option<u64>,
    pub last_seen_ms: u64,
}

impl IdentityRisk {
    pub fn new(now_ms: u64) -> Self {
        Self {
            tier: RiskTier::Clean,
            violations: 0,
            window_start_ms: now_ms,
            blacklisted_until_ms: None,
            last_seen_ms: now_ms,
        }
    }
}
