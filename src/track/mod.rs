//! Request frequency tracking and rate limiting.
//!
//! # Data Flow
//! ```text
//! pipeline records every evaluated request
//!     → tracker.rs (per-identity VecDeque, lazy trim, periodic sweep)
//!     → count_within / burst_count feed the ddos classifier
//!     → rate_limit.rs counts (identity, action) composite keys
//! ```
//!
//! # Design Decisions
//! - One tracker instance backs both traffic classification and rate
//!   limiting; composite keys keep the two populations separate
//! - Trimming happens on insert, eviction in a background sweep

pub mod rate_limit;
pub mod tracker;

pub use rate_limit::{RateDecision, RateLimiter};
pub use tracker::{RequestOutcome, RequestRecord, RequestTracker};
