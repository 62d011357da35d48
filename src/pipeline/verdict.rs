//! Caller-facing request and verdict types.

use serde::Serialize;
use serde_json::Value;

use crate::risk::RiskAction;

/// Everything the pipeline needs to know about one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Client identity (peer IP or trusted-proxy-derived).
    pub identity: String,
    pub method: String,
    pub path: String,
    /// Parsed query parameters; `Null` when absent.
    pub query: Value,
    /// Parsed body; non-JSON bodies arrive as a single string leaf.
    pub body: Value,
    pub payload_size: usize,
    /// Optional evaluation deadline; past it, the fail mode decides.
    pub deadline: Option<std::time::Instant>,
}

impl RequestContext {
    pub fn new(identity: &str, method: &str, path: &str) -> Self {
        Self {
            identity: identity.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            query: Value::Null,
            body: Value::Null,
            payload_size: 0,
            deadline: None,
        }
    }
}

/// Pipeline decision for one request.
///
/// Carries category-level reasons only: rule ids and evidence snippets
/// stay in the event log, never in anything shown to the requester.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub action: RiskAction,
    /// Suggested HTTP status (200 for allow/warn).
    pub http_status: u16,
    /// Seconds until a blocked requester may retry, when known.
    pub retry_after_secs: Option<u64>,
    /// Value for an advisory response header on warned requests.
    pub warning_header: Option<String>,
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            action: RiskAction::Allow,
            http_status: 200,
            retry_after_secs: None,
            warning_header: None,
            reasons: Vec::new(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.action == RiskAction::Block
    }
}
