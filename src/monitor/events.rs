//! Security event model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::track::tracker::now_ms;

/// Severity ladder shared by events, assessments and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    ThreatDetected,
    RequestBlocked,
    RequestWarned,
    RateLimited,
    IdentityBlacklisted,
    LoginFailed,
    KeyGenerated,
    KeyRotated,
    KeyRetired,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::ThreatDetected => "threat_detected",
            SecurityEventKind::RequestBlocked => "request_blocked",
            SecurityEventKind::RequestWarned => "request_warned",
            SecurityEventKind::RateLimited => "rate_limited",
            SecurityEventKind::IdentityBlacklisted => "identity_blacklisted",
            SecurityEventKind::LoginFailed => "login_failed",
            SecurityEventKind::KeyGenerated => "key_generated",
            SecurityEventKind::KeyRotated => "key_rotated",
            SecurityEventKind::KeyRetired => "key_retired",
        }
    }
}

/// One timestamped, attributed security event.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub timestamp_ms: u64,
    pub kind: SecurityEventKind,
    pub severity: Severity,
    /// Offending identity, when the event concerns one.
    pub identity: Option<String>,
    pub details: String,
}

impl SecurityEvent {
    pub fn new(
        kind: SecurityEventKind,
        severity: Severity,
        identity: Option<&str>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp_ms: now_ms(),
            kind,
            severity,
            identity: identity.map(str::to_string),
            details: details.into(),
        }
    }
}
