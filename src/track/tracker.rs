//! Sliding-window request tracking.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// How a tracked request was ultimately handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Allowed,
    Warned,
    Blocked,
}

/// Immutable record of one observed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub timestamp_ms: u64,
    pub method: String,
    pub path: String,
    pub payload_size: usize,
    pub status_code: u16,
    pub outcome: RequestOutcome,
}

impl RequestRecord {
    pub fn new(method: &str, path: &str, payload_size: usize) -> Self {
        Self {
            timestamp_ms: now_ms(),
            method: method.to_string(),
            path: path.to_string(),
            payload_size,
            status_code: 0,
            outcome: RequestOutcome::Allowed,
        }
    }

    /// A bare timestamped marker, used for rate-limit attempt counting.
    pub fn attempt() -> Self {
        Self::new("", "", 0)
    }
}

struct IdentityWindow {
    records: VecDeque<RequestRecord>,
    last_seen_ms: u64,
}

/// Per-identity sliding windows of request records.
///
/// Records are appended in arrival order and trimmed lazily on insert
/// against the longest configured window, so memory per identity is
/// bounded by its request rate. Identity entries lock independently via
/// DashMap shards.
pub struct RequestTracker {
    windows: DashMap<String, IdentityWindow>,
    max_window: Duration,
    inactivity: Duration,
}

impl RequestTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_window: Duration::from_secs(config.window_secs),
            inactivity: Duration::from_secs(config.inactivity_secs),
        }
    }

    /// Append one record to the identity's window.
    pub fn record(&self, identity: &str, record: RequestRecord) {
        let now = record.timestamp_ms;
        let mut entry = self
            .windows
            .entry(identity.to_string())
            .or_insert_with(|| IdentityWindow {
                records: VecDeque::new(),
                last_seen_ms: now,
            });
        entry.last_seen_ms = entry.last_seen_ms.max(now);
        entry.records.push_back(record);

        let horizon = now.saturating_sub(self.max_window.as_millis() as u64);
        while entry
            .records
            .front()
            .is_some_and(|r| r.timestamp_ms < horizon)
        {
            entry.records.pop_front();
        }
    }

    /// Count records for `identity` no older than `window`.
    ///
    /// Never counts records older than the window; repeated calls within
    /// a window are monotone non-decreasing as records arrive.
    pub fn count_within(&self, identity: &str, window: Duration) -> usize {
        let cutoff = now_ms().saturating_sub(window.as_millis() as u64);
        self.windows.get(identity).map_or(0, |entry| {
            entry
                .records
                .iter()
                .rev()
                .take_while(|r| r.timestamp_ms >= cutoff)
                .count()
        })
    }

    /// Count within a short burst window (convenience for classification).
    pub fn burst_count(&self, identity: &str, burst: Duration) -> usize {
        self.count_within(identity, burst)
    }

    /// Timestamp of the oldest record inside `window`, if any.
    pub fn oldest_within(&self, identity: &str, window: Duration) -> Option<u64> {
        let cutoff = now_ms().saturating_sub(window.as_millis() as u64);
        self.windows.get(identity).and_then(|entry| {
            entry
                .records
                .iter()
                .find(|r| r.timestamp_ms >= cutoff)
                .map(|r| r.timestamp_ms)
        })
    }

    /// Evict identities inactive past the inactivity horizon.
    /// Returns the number of evicted entries.
    pub fn sweep(&self) -> usize {
        let horizon = now_ms().saturating_sub(self.inactivity.as_millis() as u64);
        let before = self.windows.len();
        self.windows.retain(|_, entry| entry.last_seen_ms >= horizon);
        before - self.windows.len()
    }

    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }
}
