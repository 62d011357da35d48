//! Depth-first payload scanning.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::config::DetectorConfig;
use crate::detect::rules::{
    builtin_rules, operator_key_pattern, SignatureCategory, SignatureRule, OPERATOR_KEY_RULE_ID,
};

/// One rule hit inside a scanned payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionMatch {
    pub category: SignatureCategory,
    pub rule_id: u32,
    /// Dotted path to the offending leaf, e.g. `body.items[1].name`.
    pub field_path: String,
    /// Truncated snippet of the matched text.
    pub evidence: String,
}

/// Signature-based detector over structured payloads.
///
/// Walks maps, arrays and string leaves depth-first and applies every rule
/// to every string leaf (once raw, once percent-decoded to defeat simple
/// encoding evasion). Non-string leaves carry no text and are skipped.
/// Output order is deterministic: DFS order, then rule table order.
pub struct PatternDetector {
    rules: Vec<SignatureRule>,
    operator_key: Regex,
    max_depth: usize,
    max_evidence: usize,
    enabled: bool,
}

impl PatternDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            rules: builtin_rules(),
            operator_key: operator_key_pattern(),
            max_depth: config.max_depth,
            max_evidence: config.max_evidence_len,
            enabled: config.enabled,
        }
    }

    /// Scan a payload tree. `root` labels field paths ("body", "query").
    ///
    /// Malformed or unexpected input produces no matches, never an error.
    pub fn scan(&self, root: &str, value: &Value) -> Vec<DetectionMatch> {
        let mut matches = Vec::new();
        if self.enabled {
            self.walk(value, root, 0, &mut matches);
        }
        matches
    }

    /// Scan a bare string such as the request path.
    pub fn scan_text(&self, root: &str, text: &str) -> Vec<DetectionMatch> {
        let mut matches = Vec::new();
        if self.enabled {
            self.match_leaf(text, root, &mut matches);
        }
        matches
    }

    fn walk(&self, value: &Value, path: &str, depth: usize, out: &mut Vec<DetectionMatch>) {
        if depth > self.max_depth {
            return;
        }
        match value {
            Value::String(s) => self.match_leaf(s, path, out),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.walk(item, &format!("{path}[{i}]"), depth + 1, out);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    let child = format!("{path}.{key}");
                    if self.operator_key.is_match(key) {
                        out.push(DetectionMatch {
                            category: SignatureCategory::QueryOperatorInjection,
                            rule_id: OPERATOR_KEY_RULE_ID,
                            field_path: child.clone(),
                            evidence: self.snip(key),
                        });
                    }
                    self.walk(item, &child, depth + 1, out);
                }
            }
            // numbers, booleans and null carry no text
            _ => {}
        }
    }

    fn match_leaf(&self, text: &str, path: &str, out: &mut Vec<DetectionMatch>) {
        let decoded = percent_decode(text);
        let decoded = if decoded == text { None } else { Some(decoded) };
        for rule in &self.rules {
            let hit = rule.pattern.is_match(text)
                || decoded.as_deref().is_some_and(|d| rule.pattern.is_match(d));
            if hit {
                out.push(DetectionMatch {
                    category: rule.category,
                    rule_id: rule.id,
                    field_path: path.to_string(),
                    evidence: self.snip(text),
                });
            }
        }
    }

    fn snip(&self, text: &str) -> String {
        if text.chars().count() <= self.max_evidence {
            text.to_string()
        } else {
            text.chars().take(self.max_evidence).collect()
        }
    }
}

/// Single-pass percent decoding. Invalid escapes pass through untouched.
pub(crate) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detector() -> PatternDetector {
        PatternDetector::new(&crate::config::DetectorConfig::default())
    }

    #[test]
    fn benign_payload_produces_no_matches() {
        let payload = json!({
            "username": "alice",
            "bio": "I enjoy selecting furniture and writing scripts for plays",
            "age": 34,
            "tags": ["reading", "unions and guilds"],
            "active": true,
            "note": null,
        });
        assert!(detector().scan("body", &payload).is_empty());
    }

    #[test]
    fn detects_sql_tautology() {
        let payload = json!({"username": "admin' OR 1=1"});
        let matches = detector().scan("body", &payload);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].category, SignatureCategory::SqlInjection);
        assert_eq!(matches[0].field_path, "body.username");
    }

    #[test]
    fn detects_script_injection() {
        let payload = json!({"comment": "<script>alert(1)</script>"});
        let matches = detector().scan("body", &payload);
        assert!(matches
            .iter()
            .any(|m| m.category == SignatureCategory::ScriptInjection));
    }

    #[test]
    fn detects_traversal_in_nested_array() {
        let payload = json!({"files": [{"name": "report.pdf"}, {"name": "../../etc/passwd"}]});
        let matches = detector().scan("body", &payload);
        assert!(!matches.is_empty());
        assert!(matches
            .iter()
            .all(|m| m.field_path == "body.files[1].name"));
        assert!(matches
            .iter()
            .all(|m| m.category == SignatureCategory::PathTraversal));
    }

    #[test]
    fn detects_command_chaining() {
        let matches = detector().scan_text("query.cmd", "foo; cat /etc/shadow");
        assert!(matches
            .iter()
            .any(|m| m.category == SignatureCategory::CommandInjection));
    }

    #[test]
    fn detects_operator_key() {
        let payload = json!({"password": {"$ne": null}});
        let matches = detector().scan("body", &payload);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].category, SignatureCategory::QueryOperatorInjection);
        assert_eq!(matches[0].rule_id, OPERATOR_KEY_RULE_ID);
        assert_eq!(matches[0].field_path, "body.password.$ne");
    }

    #[test]
    fn detects_percent_encoded_payload() {
        let matches = detector().scan_text("path", "/view?f=%3Cscript%3Ealert(1)%3C/script%3E");
        assert!(matches
            .iter()
            .any(|m| m.category == SignatureCategory::ScriptInjection));
    }

    #[test]
    fn one_leaf_can_match_multiple_categories() {
        let payload = json!({"q": "' OR 1=1; DROP TABLE users; cat /etc/passwd"});
        let matches = detector().scan("body", &payload);
        let categories: std::collections::HashSet<_> =
            matches.iter().map(|m| m.category).collect();
        assert!(categories.len() >= 3);
    }

    #[test]
    fn evidence_is_truncated() {
        let long = format!("<script>{}", "a".repeat(500));
        let payload = json!({ "c": long });
        let matches = detector().scan("body", &payload);
        assert!(!matches.is_empty());
        assert!(matches[0].evidence.chars().count() <= 80);
    }

    #[test]
    fn depth_limit_stops_recursion() {
        let mut value = json!("<script>deep</script>");
        for _ in 0..40 {
            value = json!({ "inner": value });
        }
        let matches = detector().scan("body", &value);
        assert!(matches.is_empty());
    }

    #[test]
    fn disabled_detector_matches_nothing() {
        let config = crate::config::DetectorConfig {
            enabled: false,
            ..Default::default()
        };
        let detector = PatternDetector::new(&config);
        let payload = json!({"q": "' OR 1=1"});
        assert!(detector.scan("body", &payload).is_empty());
    }

    #[test]
    fn percent_decode_handles_invalid_escapes() {
        assert_eq!(percent_decode("a%2Fb"), "a/b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}
