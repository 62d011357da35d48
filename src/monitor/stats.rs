//! Point-in-time statistics snapshot.

use std::collections::HashMap;

use serde::Serialize;

use crate::crypto::KeyStatus;
use crate::monitor::alerts::Alert;
use crate::monitor::events::SecurityEvent;

/// Lifetime counters since pipeline construction.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct SecurityTotals {
    pub inspected: u64,
    pub threats_detected: u64,
    pub blocked: u64,
    pub warned: u64,
    pub rate_limited: u64,
    pub alerts_fired: u64,
}

/// Serializable snapshot assembled by `Pipeline::snapshot`.
#[derive(Debug, Clone, Serialize)]
pub struct SecuritySnapshot {
    pub totals: SecurityTotals,
    /// Identities currently blacklisted.
    pub blocked_identities: Vec<String>,
    /// Identity count per risk tier.
    pub risk_tiers: HashMap<&'static str, usize>,
    pub recent_events: Vec<SecurityEvent>,
    pub recent_alerts: Vec<Alert>,
    /// Registered keys, current one flagged.
    pub keys: Vec<KeyStatus>,
}
