//! In-process request security pipeline.
//!
//! Inspects every inbound request before application logic: signature
//! detection, per-identity risk scoring, rate limiting, sensitive-value
//! encryption with rotating keys, and security event correlation.

pub mod config;
pub mod crypto;
pub mod detect;
pub mod error;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod pipeline;
pub mod risk;
pub mod track;

pub use config::SecurityConfig;
pub use error::SecurityError;
pub use lifecycle::Shutdown;
pub use pipeline::{Pipeline, RequestContext, Verdict};
pub use risk::RiskAction;
