//! Built-in signature rule table.
//!
//! Rules are compiled once at detector construction. Patterns are written
//! to match attack syntax, not attack vocabulary: ordinary prose containing
//! words like "select" or "script" must not trip them.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Categories of malicious input the detector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureCategory {
    SqlInjection,
    ScriptInjection,
    PathTraversal,
    CommandInjection,
    QueryOperatorInjection,
}

impl SignatureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureCategory::SqlInjection => "sql_injection",
            SignatureCategory::ScriptInjection => "script_injection",
            SignatureCategory::PathTraversal => "path_traversal",
            SignatureCategory::CommandInjection => "command_injection",
            SignatureCategory::QueryOperatorInjection => "query_operator_injection",
        }
    }
}

impl std::fmt::Display for SignatureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled detection rule.
pub struct SignatureRule {
    pub id: u32,
    pub category: SignatureCategory,
    pub description: &'static str,
    pub pattern: Regex,
}

/// Rule id reported when a `$`-operator appears as an object key.
pub const OPERATOR_KEY_RULE_ID: u32 = 1402;

/// Build the built-in rule table.
///
/// A pattern that fails to compile is skipped with an error log; none of
/// the built-ins should ever fail, this guards against future edits.
pub fn builtin_rules() -> Vec<SignatureRule> {
    use SignatureCategory::*;

    let table: &[(u32, SignatureCategory, &str, &str)] = &[
        (
            1001,
            SqlInjection,
            "quoted boolean tautology",
            r#"(?i)['"]\s*(?:or|and)\s+['"]?\d+['"]?\s*=\s*['"]?\d+"#,
        ),
        (
            1002,
            SqlInjection,
            "union-based extraction",
            r"(?i)\bunion\b[\s/*]+(?:all[\s/*]+)?\bselect\b",
        ),
        (
            1003,
            SqlInjection,
            "stacked destructive statement",
            r"(?i);\s*(?:drop|delete|insert|update|truncate|alter)\b",
        ),
        (
            1004,
            SqlInjection,
            "quote followed by comment truncation",
            r#"['"]\s*(?:--|;--|/\*)"#,
        ),
        (
            1101,
            ScriptInjection,
            "script tag",
            r"(?i)<\s*script\b",
        ),
        (
            1102,
            ScriptInjection,
            "javascript: URI scheme",
            r"(?i)javascript\s*:",
        ),
        (
            1103,
            ScriptInjection,
            "inline event handler",
            r"(?i)\bon(?:error|load|click|mouseover|focus|submit)\s*=",
        ),
        (
            1104,
            ScriptInjection,
            "embedding tag",
            r"(?i)<\s*(?:iframe|object|embed)\b",
        ),
        (
            1201,
            PathTraversal,
            "dot-dot path segment",
            r"\.\.[/\\]",
        ),
        (
            1202,
            PathTraversal,
            "percent-encoded dot-dot",
            r"(?i)(?:%2e%2e(?:%2f|%5c|[/\\])|\.\.%2f|\.\.%5c)",
        ),
        (
            1203,
            PathTraversal,
            "sensitive system file",
            r"(?i)(?:/etc/(?:passwd|shadow)|boot\.ini|win\.ini)",
        ),
        (
            1301,
            CommandInjection,
            "shell metacharacter chaining a command",
            r"(?i)[;&|]\s*(?:cat|ls|rm|wget|curl|nc|bash|sh|ping|whoami|id|sleep)\b",
        ),
        (
            1302,
            CommandInjection,
            "command substitution",
            r"(?i)(?:\$\(|`)\s*(?:cat|ls|rm|wget|curl|nc|bash|sh|ping|whoami|id|sleep|echo)\b",
        ),
        (
            1401,
            QueryOperatorInjection,
            "query operator in value position",
            r#"(?i)(?:^|['"{\[,\s])\$(?:where|ne|gt|gte|lt|lte|in|nin|or|and|not|regex|expr)\b"#,
        ),
    ];

    table
        .iter()
        .filter_map(|&(id, category, description, pattern)| match Regex::new(pattern) {
            Ok(pattern) => Some(SignatureRule {
                id,
                category,
                description,
                pattern,
            }),
            Err(e) => {
                tracing::error!(rule = id, error = %e, "signature pattern failed to compile");
                None
            }
        })
        .collect()
}

/// Matches `$`-operators smuggled in as object keys (`{"password": {"$ne": 1}}`).
pub fn operator_key_pattern() -> Regex {
    Regex::new(r"^\$(?:where|ne|gt|gte|lt|lte|in|nin|or|and|not|regex|expr|exists|type|mod|elemMatch)$")
        .expect("constant pattern compiles")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_builtin_patterns_compile() {
        assert_eq!(builtin_rules().len(), 14);
    }

    #[test]
    fn categories_serialize_snake_case() {
        let s = serde_json::to_string(&SignatureCategory::SqlInjection).unwrap();
        assert_eq!(s, "\"sql_injection\"");
        assert_eq!(SignatureCategory::QueryOperatorInjection.as_str(), "query_operator_injection");
    }

    #[test]
    fn prose_with_keywords_does_not_match() {
        let rules = builtin_rules();
        let benign = [
            "please select the union hall for the script reading",
            "I dropped by and updated my address",
            "the on-load procedure is documented",
        ];
        for text in benign {
            for rule in &rules {
                assert!(
                    !rule.pattern.is_match(text),
                    "rule {} matched benign text {:?}",
                    rule.id,
                    text
                );
            }
        }
    }
}
