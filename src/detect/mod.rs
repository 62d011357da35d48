//! Signature-based threat detection.
//!
//! # Data Flow
//! ```text
//! request path / query / body (serde_json::Value)
//!     → scanner.rs (depth-first walk, percent-decode pass)
//!     → rules.rs (compiled regex table, one pass per string leaf)
//!     → Vec<DetectionMatch> consumed by the risk engine
//! ```
//!
//! # Design Decisions
//! - Rules compile once at construction; scanning allocates only matches
//! - Malformed input degrades to "no matches", never an error
//! - Evidence snippets are truncated so event logs never replay payloads

pub mod rules;
pub mod scanner;

pub use rules::{SignatureCategory, SignatureRule};
pub use scanner::{DetectionMatch, PatternDetector};

pub(crate) use scanner::percent_decode;
