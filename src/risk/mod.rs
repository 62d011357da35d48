//! Risk scoring subsystem.
//!
//! # Data Flow
//! ```text
//! DetectionMatch list + tracker frequencies
//!     → ddos.rs (burst / sustained / suspicious classification)
//!     → engine.rs (per-identity escalation state machine)
//!     → RiskAssessment consumed by the pipeline
//! ```
//!
//! # Design Decisions
//! - Block wins: the final action is the OR of signature and traffic
//!   recommenders, with the most severe classification recorded
//! - Blacklist reads are idempotent; only recorded violations escalate
//! - State lives in a DashMap with TTL eviction, never grows unbounded

pub mod ddos;
pub mod engine;
pub mod state;

pub use ddos::{DdosClassifier, TrafficClass};
pub use engine::{RiskAction, RiskAssessment, RiskEngine};
pub use state::{RiskTier, ViolationClass};
