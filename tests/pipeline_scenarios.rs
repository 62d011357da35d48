//! End-to-end pipeline scenarios.

use std::sync::Arc;

use gatehouse::config::{ActionLimit, SecurityConfig};
use gatehouse::monitor::SecurityEventKind;
use gatehouse::SecurityError;
use gatehouse::pipeline::{Pipeline, RequestContext};
use gatehouse::risk::RiskAction;
use gatehouse::Shutdown;
use serde_json::{json, Value};

/// Traffic thresholds pushed out of the way so signature behavior can be
/// exercised in isolation.
fn quiet_config() -> SecurityConfig {
    let mut config = SecurityConfig::default();
    config.risk.ddos.burst_threshold = 10_000;
    config.risk.ddos.sustained_threshold = 100_000;
    config.risk.ddos.suspicious_threshold = 100_000;
    config.rate_limit.default_limit = 100_000;
    config
}

fn login_request(identity: &str, body: Value) -> RequestContext {
    let mut ctx = RequestContext::new(identity, "POST", "/api/login");
    ctx.payload_size = 64;
    ctx.body = body;
    ctx
}

#[test]
fn repeated_sql_injection_escalates_to_blacklist() {
    let pipeline = Pipeline::new(quiet_config());
    let attacker = "203.0.113.7";
    let payload = json!({"username": "admin' OR 1=1", "password": "x"});

    for i in 1..=4 {
        let verdict = pipeline.evaluate(&login_request(attacker, payload.clone()));
        assert_eq!(verdict.action, RiskAction::Block, "request {i}");
        assert_eq!(verdict.http_status, 400, "request {i}");
    }

    // Fifth violation crosses the blacklist threshold.
    let fifth = pipeline.evaluate(&login_request(attacker, payload.clone()));
    assert_eq!(fifth.action, RiskAction::Block);
    assert_eq!(fifth.retry_after_secs, Some(3600));

    // Sixth request is rejected outright with the remaining sentence.
    let sixth = pipeline.evaluate(&login_request(attacker, payload.clone()));
    assert_eq!(sixth.action, RiskAction::Block);
    assert_eq!(sixth.http_status, 403);
    let retry = sixth.retry_after_secs.expect("retry hint");
    assert!((3590..=3600).contains(&retry), "retry was {retry}");

    let snapshot = pipeline.snapshot();
    assert!(snapshot
        .blocked_identities
        .contains(&attacker.to_string()));
    assert!(snapshot
        .recent_events
        .iter()
        .any(|e| e.kind == SecurityEventKind::IdentityBlacklisted));
}

#[test]
fn blacklist_is_not_extended_by_reevaluation() {
    let pipeline = Pipeline::new(quiet_config());
    let attacker = "203.0.113.8";
    let payload = json!({"q": "' OR 1=1"});
    for _ in 0..5 {
        pipeline.evaluate(&login_request(attacker, payload.clone()));
    }

    let first = pipeline
        .evaluate(&login_request(attacker, payload.clone()))
        .retry_after_secs
        .expect("retry hint");
    let second = pipeline
        .evaluate(&login_request(attacker, payload.clone()))
        .retry_after_secs
        .expect("retry hint");
    assert!(second <= first, "sentence grew from {first} to {second}");
}

#[test]
fn burst_traffic_blocks_from_the_threshold_request() {
    let mut config = SecurityConfig::default();
    // Keep the other recommenders quiet; burst stays at its default of 20.
    config.risk.ddos.sustained_threshold = 100_000;
    config.risk.ddos.suspicious_threshold = 100_000;
    config.rate_limit.enabled = false;
    let pipeline = Pipeline::new(config);
    let flooder = "198.51.100.9";

    for i in 1..=20 {
        let verdict = pipeline.evaluate(&RequestContext::new(flooder, "GET", "/"));
        assert_eq!(verdict.action, RiskAction::Allow, "request {i}");
    }
    for i in 21..=25 {
        let verdict = pipeline.evaluate(&RequestContext::new(flooder, "GET", "/"));
        assert_eq!(verdict.action, RiskAction::Block, "request {i}");
    }

    // A bystander is unaffected.
    let verdict = pipeline.evaluate(&RequestContext::new("198.51.100.10", "GET", "/"));
    assert_eq!(verdict.action, RiskAction::Allow);
}

#[test]
fn login_bucket_denies_sixth_attempt() {
    let pipeline = Pipeline::new(quiet_config());
    let limiter = pipeline.rate_limiter();

    for i in 1..=5 {
        let decision = limiter.check("user-1", "login", 5, 60);
        assert!(decision.allowed, "attempt {i}");
    }
    let decision = limiter.check("user-1", "login", 5, 60);
    assert!(!decision.allowed);
    assert_eq!(decision.remaining, 0);
    assert!(decision.reset_in_secs <= 60);
}

#[test]
fn configured_action_limit_is_enforced_as_error() {
    let mut config = quiet_config();
    config.rate_limit.actions.push(ActionLimit {
        action: "login".to_string(),
        limit: 2,
        window_secs: 900,
    });
    let pipeline = Pipeline::new(config);

    assert!(pipeline.enforce_action_limit("user-2", "login").is_ok());
    assert!(pipeline.enforce_action_limit("user-2", "login").is_ok());
    let denied = pipeline.enforce_action_limit("user-2", "login");
    match denied {
        Err(SecurityError::RateLimitExceeded {
            action,
            retry_after_secs,
        }) => {
            assert_eq!(action, "login");
            assert!(retry_after_secs <= 900);
        }
        other => panic!("expected rate limit error, got {other:?}"),
    }

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.totals.rate_limited, 1);
}

#[test]
fn action_window_longer_than_tracker_window_still_counts() {
    let mut config = quiet_config();
    config.tracker.window_secs = 1;
    config.rate_limit.actions.push(ActionLimit {
        action: "login".to_string(),
        limit: 2,
        window_secs: 3600,
    });
    let pipeline = Pipeline::new(config);

    assert!(pipeline.enforce_action_limit("user-9", "login").is_ok());
    assert!(pipeline.enforce_action_limit("user-9", "login").is_ok());

    // Outlive the tracker's own window; the hour-long login window must
    // still see both earlier attempts.
    std::thread::sleep(std::time::Duration::from_millis(1200));
    assert!(pipeline.enforce_action_limit("user-9", "login").is_err());
}

#[test]
fn rotation_keeps_stored_values_readable() {
    let pipeline = Pipeline::new(quiet_config());
    let value = json!({"card": "4111-1111-1111-1111"});

    let stored = pipeline.encrypt_sensitive(&value).unwrap();
    let (retiring, fresh) = pipeline.keys().rotate();
    assert_ne!(retiring, fresh);
    assert_eq!(pipeline.keys().current_key_id(), fresh);

    // Values encrypted before rotation stay readable...
    assert_eq!(pipeline.decrypt_sensitive(&stored).unwrap(), value);
    // ...and new values use the new key.
    let fresh_stored = pipeline.encrypt_sensitive(&value).unwrap();
    assert!(fresh_stored.starts_with(&format!("v1:{fresh}:")));

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.keys.len(), 2);
    assert!(snapshot
        .recent_events
        .iter()
        .any(|e| e.kind == SecurityEventKind::KeyGenerated));
}

#[test]
fn elevated_rate_warns_without_blocking() {
    let mut config = quiet_config();
    config.risk.ddos.suspicious_threshold = 3;
    let pipeline = Pipeline::new(config);
    let busy = "203.0.113.20";

    for _ in 0..3 {
        pipeline.evaluate(&RequestContext::new(busy, "GET", "/feed"));
    }
    let verdict = pipeline.evaluate(&RequestContext::new(busy, "GET", "/feed"));
    assert_eq!(verdict.action, RiskAction::Warn);
    assert_eq!(verdict.http_status, 200);
    assert!(verdict.warning_header.is_some());
}

#[test]
fn failed_logins_raise_brute_force_alert() {
    let pipeline = Pipeline::new(quiet_config());
    for _ in 0..5 {
        pipeline.record_login_failure("user-7");
    }
    let snapshot = pipeline.snapshot();
    let alert = snapshot
        .recent_alerts
        .iter()
        .find(|a| a.rule == "brute_force")
        .expect("brute force alert");
    assert_eq!(alert.evidence, vec!["user-7"]);
    assert_eq!(snapshot.totals.alerts_fired, 1);
}

#[test]
fn distinct_attackers_raise_coordinated_alert() {
    let pipeline = Pipeline::new(quiet_config());
    let payload = json!({"q": "<script>alert(1)</script>"});
    for identity in ["203.0.113.31", "203.0.113.32", "203.0.113.33"] {
        pipeline.evaluate(&login_request(identity, payload.clone()));
    }
    let snapshot = pipeline.snapshot();
    let alert = snapshot
        .recent_alerts
        .iter()
        .find(|a| a.rule == "coordinated_attack")
        .expect("coordinated attack alert");
    assert_eq!(alert.evidence.len(), 3);
    assert!(alert.evidence.contains(&"203.0.113.31".to_string()));
}

#[tokio::test]
async fn background_tasks_stop_on_shutdown() {
    let mut config = quiet_config();
    config.tracker.sweep_interval_secs = 1;
    let pipeline = Arc::new(Pipeline::new(config));
    let shutdown = Shutdown::new();

    pipeline.start(&shutdown);
    assert_eq!(shutdown.receiver_count(), 4);

    shutdown.trigger();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(shutdown.receiver_count(), 0);
}
