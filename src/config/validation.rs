//! Configuration validation.
//!
//! Serde handles syntactic problems; this layer checks that values make
//! sense together. All errors are collected so the operator sees the full
//! list in one pass, not just the first failure.

use crate::config::schema::SecurityConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &SecurityConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut require = |condition: bool, field: &str, message: &str| {
        if !condition {
            errors.push(ValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        }
    };

    require(
        config.detector.max_depth >= 1,
        "detector.max_depth",
        "must be at least 1",
    );
    require(
        config.detector.max_evidence_len >= 8,
        "detector.max_evidence_len",
        "must be at least 8",
    );

    require(
        config.tracker.window_secs > 0,
        "tracker.window_secs",
        "must be non-zero",
    );
    require(
        config.tracker.sweep_interval_secs > 0,
        "tracker.sweep_interval_secs",
        "must be non-zero",
    );

    require(
        config.risk.suspicious_threshold >= 1,
        "risk.suspicious_threshold",
        "must be at least 1",
    );
    require(
        config.risk.max_suspicious_attempts >= config.risk.suspicious_threshold,
        "risk.max_suspicious_attempts",
        "must be >= suspicious_threshold",
    );
    require(
        config.risk.suspicious_window_secs > 0,
        "risk.suspicious_window_secs",
        "must be non-zero",
    );
    require(
        config.risk.ddos.burst_window_secs > 0
            && config.risk.ddos.sustained_window_secs > 0
            && config.risk.ddos.suspicious_window_secs > 0,
        "risk.ddos",
        "windows must be non-zero",
    );
    require(
        config.risk.ddos.burst_threshold > 0
            && config.risk.ddos.sustained_threshold > 0
            && config.risk.ddos.suspicious_threshold > 0,
        "risk.ddos",
        "thresholds must be non-zero",
    );

    require(
        config.rate_limit.default_limit > 0,
        "rate_limit.default_limit",
        "must be non-zero",
    );
    require(
        config.rate_limit.default_window_secs > 0,
        "rate_limit.default_window_secs",
        "must be non-zero",
    );
    for (i, action) in config.rate_limit.actions.iter().enumerate() {
        require(
            !action.action.is_empty(),
            &format!("rate_limit.actions[{i}].action"),
            "must be non-empty",
        );
        require(
            action.limit > 0 && action.window_secs > 0,
            &format!("rate_limit.actions[{i}]"),
            "limit and window must be non-zero",
        );
    }

    require(
        config.keys.rotation_interval_secs < config.keys.max_key_age_secs,
        "keys.rotation_interval_secs",
        "must be less than max_key_age_secs",
    );
    require(
        config.keys.sweep_interval_secs > 0,
        "keys.sweep_interval_secs",
        "must be non-zero",
    );

    require(
        config.monitor.retention_days >= 1,
        "monitor.retention_days",
        "must be at least 1",
    );
    require(
        config.monitor.max_events > 0,
        "monitor.max_events",
        "must be non-zero",
    );
    require(
        config.monitor.brute_force.threshold >= 1 && config.monitor.brute_force.window_secs > 0,
        "monitor.brute_force",
        "threshold and window must be non-zero",
    );
    require(
        config.monitor.coordinated.threshold >= 1 && config.monitor.coordinated.window_secs > 0,
        "monitor.coordinated",
        "threshold and window must be non-zero",
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
