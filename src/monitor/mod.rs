//! Security event log, counters, and alert correlation.
//!
//! # Data Flow
//! ```text
//! pipeline decisions, key lifecycle, login failures
//!     → events.rs (SecurityEvent)
//!     → SecurityMonitor::record (counters, bounded event log)
//!     → alerts.rs rules (edge-triggered windows)
//!     → AlertSink (synchronous hand-off)
//! ```
//!
//! # Design Decisions
//! - The event log is a bounded deque; retention sweeps drop by age,
//!   the cap drops by count, whichever bites first
//! - Alert rules run inline on record; sinks must not block

pub mod alerts;
pub mod events;
pub mod stats;

pub use alerts::{Alert, AlertSink, LogAlertSink};
pub use events::{SecurityEvent, SecurityEventKind, Severity};
pub use stats::{SecuritySnapshot, SecurityTotals};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::MonitorConfig;
use crate::observability::metrics;
use crate::track::tracker::now_ms;
use alerts::{BruteForceRule, CoordinatedAttackRule};

const MAX_ALERTS: usize = 1000;

#[derive(Default)]
struct Counters {
    inspected: AtomicU64,
    threats_detected: AtomicU64,
    blocked: AtomicU64,
    warned: AtomicU64,
    rate_limited: AtomicU64,
    alerts_fired: AtomicU64,
}

/// Central sink for security events.
pub struct SecurityMonitor {
    events: Mutex<VecDeque<SecurityEvent>>,
    alerts: Mutex<VecDeque<Alert>>,
    brute_force: Mutex<BruteForceRule>,
    coordinated: Mutex<CoordinatedAttackRule>,
    sink: Arc<dyn AlertSink>,
    counters: Counters,
    max_events: usize,
    retention_ms: u64,
}

impl SecurityMonitor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self::with_sink(config, Arc::new(LogAlertSink))
    }

    pub fn with_sink(config: &MonitorConfig, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            alerts: Mutex::new(VecDeque::new()),
            brute_force: Mutex::new(BruteForceRule::new(config.brute_force.clone())),
            coordinated: Mutex::new(CoordinatedAttackRule::new(config.coordinated.clone())),
            sink,
            counters: Counters::default(),
            max_events: config.max_events,
            retention_ms: config.retention_days * 24 * 3600 * 1000,
        }
    }

    /// Count one inspected request (no event is stored for clean traffic).
    pub fn note_inspected(&self) {
        self.counters.inspected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event: bump counters, run alert rules, append to the log.
    pub fn record(&self, event: SecurityEvent) {
        metrics::record_security_event(event.kind.as_str());
        match event.kind {
            SecurityEventKind::ThreatDetected => {
                self.counters.threats_detected.fetch_add(1, Ordering::Relaxed);
            }
            SecurityEventKind::RequestBlocked | SecurityEventKind::IdentityBlacklisted => {
                self.counters.blocked.fetch_add(1, Ordering::Relaxed);
            }
            SecurityEventKind::RequestWarned => {
                self.counters.warned.fetch_add(1, Ordering::Relaxed);
            }
            SecurityEventKind::RateLimited => {
                self.counters.rate_limited.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        let mut fired = Vec::new();
        if let Some(alert) = self
            .brute_force
            .lock()
            .expect("brute force rule mutex poisoned")
            .observe(&event)
        {
            fired.push(alert);
        }
        if let Some(alert) = self
            .coordinated
            .lock()
            .expect("coordinated rule mutex poisoned")
            .observe(&event)
        {
            fired.push(alert);
        }
        for alert in fired {
            self.counters.alerts_fired.fetch_add(1, Ordering::Relaxed);
            metrics::record_alert(alert.rule);
            self.sink.deliver(&alert);
            let mut alerts = self.alerts.lock().expect("alerts mutex poisoned");
            alerts.push_back(alert);
            while alerts.len() > MAX_ALERTS {
                alerts.pop_front();
            }
        }

        let mut events = self.events.lock().expect("events mutex poisoned");
        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    /// Most recent `n` events, newest last.
    pub fn recent_events(&self, n: usize) -> Vec<SecurityEvent> {
        let events = self.events.lock().expect("events mutex poisoned");
        events.iter().rev().take(n).rev().cloned().collect()
    }

    /// Most recent `n` alerts, newest last.
    pub fn recent_alerts(&self, n: usize) -> Vec<Alert> {
        let alerts = self.alerts.lock().expect("alerts mutex poisoned");
        alerts.iter().rev().take(n).rev().cloned().collect()
    }

    pub fn totals(&self) -> SecurityTotals {
        SecurityTotals {
            inspected: self.counters.inspected.load(Ordering::Relaxed),
            threats_detected: self.counters.threats_detected.load(Ordering::Relaxed),
            blocked: self.counters.blocked.load(Ordering::Relaxed),
            warned: self.counters.warned.load(Ordering::Relaxed),
            rate_limited: self.counters.rate_limited.load(Ordering::Relaxed),
            alerts_fired: self.counters.alerts_fired.load(Ordering::Relaxed),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().expect("events mutex poisoned").len()
    }

    /// Drop events and alerts past the retention horizon and prune
    /// lapsed alert-rule windows. Returns the number of dropped entries.
    pub fn sweep(&self) -> usize {
        let now = now_ms();
        let horizon = now.saturating_sub(self.retention_ms);
        let mut dropped = 0;

        let mut events = self.events.lock().expect("events mutex poisoned");
        while events.front().is_some_and(|e| e.timestamp_ms < horizon) {
            events.pop_front();
            dropped += 1;
        }
        drop(events);

        let mut alerts = self.alerts.lock().expect("alerts mutex poisoned");
        while alerts.front().is_some_and(|a| a.timestamp_ms < horizon) {
            alerts.pop_front();
            dropped += 1;
        }
        drop(alerts);

        self.brute_force
            .lock()
            .expect("brute force rule mutex poisoned")
            .prune(now);
        self.coordinated
            .lock()
            .expect("coordinated rule mutex poisoned")
            .prune(now);
        dropped
    }
}
