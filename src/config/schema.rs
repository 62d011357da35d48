//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! security pipeline. All types derive Serde traits for deserialization
//! from config files; every field is defaulted so an empty file is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for the security pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Signature detector settings.
    pub detector: DetectorConfig,

    /// Request tracking windows.
    pub tracker: TrackerConfig,

    /// Risk engine thresholds and block durations.
    pub risk: RiskConfig,

    /// Rate limiting defaults and per-action overrides.
    pub rate_limit: RateLimitConfig,

    /// Encryption key lifecycle.
    pub keys: KeyConfig,

    /// Event retention and alert rules.
    pub monitor: MonitorConfig,

    /// Pipeline-level behavior.
    pub pipeline: PipelineConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl SecurityConfig {
    /// Longest window any consumer queries against the request tracker.
    ///
    /// The tracker trims history against this, so a rate-limit or traffic
    /// window longer than the tracker's own never loses the records it
    /// still needs to count.
    pub fn longest_window_secs(&self) -> u64 {
        let mut longest = self.tracker.window_secs;
        longest = longest.max(self.rate_limit.default_window_secs);
        for action in &self.rate_limit.actions {
            longest = longest.max(action.window_secs);
        }
        longest
            .max(self.risk.ddos.burst_window_secs)
            .max(self.risk.ddos.sustained_window_secs)
            .max(self.risk.ddos.suspicious_window_secs)
    }
}

/// Signature detector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Whether payload scanning runs at all.
    pub enabled: bool,

    /// Maximum recursion depth when walking payload trees.
    pub max_depth: usize,

    /// Maximum length of evidence snippets kept in events.
    pub max_evidence_len: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 16,
            max_evidence_len: 80,
        }
    }
}

/// Request tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Longest window any consumer may query (seconds).
    pub window_secs: u64,

    /// Identities inactive longer than this are evicted (seconds).
    pub inactivity_secs: u64,

    /// How often the eviction sweep runs (seconds).
    pub sweep_interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            inactivity_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

/// Risk engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Window over which violations accumulate (seconds).
    pub suspicious_window_secs: u64,

    /// Violations at which an identity becomes high-risk.
    pub suspicious_threshold: u32,

    /// Violations at which an identity is blacklisted.
    pub max_suspicious_attempts: u32,

    /// Blacklist duration for signature-triggered violations (seconds).
    pub waf_block_secs: u64,

    /// Blacklist duration for traffic-triggered violations (seconds).
    pub ddos_block_secs: u64,

    /// Clean, inactive identities are evicted after this long (seconds).
    pub state_retention_secs: u64,

    /// Traffic classification thresholds.
    pub ddos: DdosConfig,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            suspicious_window_secs: 900,
            suspicious_threshold: 3,
            max_suspicious_attempts: 5,
            waf_block_secs: 3600,
            ddos_block_secs: 1800,
            state_retention_secs: 3600,
            ddos: DdosConfig::default(),
        }
    }
}

/// Traffic classification thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DdosConfig {
    /// Requests within the burst window that trigger a block.
    pub burst_threshold: u32,

    /// Burst window length (seconds).
    pub burst_window_secs: u64,

    /// Requests within the sustained window that trigger a block.
    pub sustained_threshold: u32,

    /// Sustained window length (seconds).
    pub sustained_window_secs: u64,

    /// Requests within the suspicious window that trigger a warning.
    pub suspicious_threshold: u32,

    /// Suspicious window length (seconds).
    pub suspicious_window_secs: u64,
}

impl Default for DdosConfig {
    fn default() -> Self {
        Self {
            burst_threshold: 20,
            burst_window_secs: 1,
            sustained_threshold: 200,
            sustained_window_secs: 300,
            suspicious_threshold: 50,
            suspicious_window_secs: 60,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether the pipeline applies the default limit to every request.
    pub enabled: bool,

    /// Default request limit per window.
    pub default_limit: u32,

    /// Default window length (seconds).
    pub default_window_secs: u64,

    /// Per-action overrides (e.g. a tighter "login" bucket).
    pub actions: Vec<ActionLimit>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limit: 100,
            default_window_secs: 60,
            actions: Vec::new(),
        }
    }
}

/// A named action with its own limit.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionLimit {
    /// Action name (e.g. "login", "password_reset").
    pub action: String,

    /// Attempts allowed per window.
    pub limit: u32,

    /// Window length (seconds).
    pub window_secs: u64,
}

/// Encryption key lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Age at which the current key is rotated out (seconds).
    pub rotation_interval_secs: u64,

    /// Age at which retired keys are evicted irrecoverably (seconds).
    pub max_key_age_secs: u64,

    /// How often the rotation/retirement sweep runs (seconds).
    pub sweep_interval_secs: u64,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            rotation_interval_secs: 86_400,
            max_key_age_secs: 604_800,
            sweep_interval_secs: 3600,
        }
    }
}

/// Security monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Days of event history to retain.
    pub retention_days: u64,

    /// Hard cap on events held in memory.
    pub max_events: usize,

    /// How often the retention sweep runs (seconds).
    pub sweep_interval_secs: u64,

    /// Failed logins per identity that raise a brute-force alert.
    pub brute_force: AlertRuleConfig,

    /// Distinct suspicious identities that raise a coordinated-attack alert.
    pub coordinated: AlertRuleConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            max_events: 10_000,
            sweep_interval_secs: 300,
            brute_force: AlertRuleConfig {
                threshold: 5,
                window_secs: 900,
            },
            coordinated: AlertRuleConfig {
                threshold: 3,
                window_secs: 300,
            },
        }
    }
}

/// Threshold and window for one alert rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertRuleConfig {
    /// Occurrences within the window that fire the alert.
    pub threshold: u32,

    /// Correlation window length (seconds).
    pub window_secs: u64,
}

/// Pipeline-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// What to do when evaluation itself fails or runs out of time.
    pub fail_mode: FailMode,

    /// Header carrying the real client identity behind a trusted proxy
    /// (e.g. "x-forwarded-for"). When unset the peer address is used.
    pub trusted_proxy_header: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fail_mode: FailMode::Open,
            trusted_proxy_header: None,
        }
    }
}

/// Behavior when the pipeline cannot reach a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    /// Allow the request and log the failure.
    #[default]
    Open,
    /// Reject the request with 503.
    Closed,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when RUST_LOG is unset.
    pub log_level: String,

    /// Whether to install the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_window_covers_every_consumer() {
        let mut config = SecurityConfig::default();
        assert_eq!(config.longest_window_secs(), 3600);

        config.tracker.window_secs = 1;
        config.rate_limit.actions.push(ActionLimit {
            action: "login".to_string(),
            limit: 2,
            window_secs: 7200,
        });
        assert_eq!(config.longest_window_secs(), 7200);
    }
}
