//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline::start
//!     → sweeper.rs spawns one task per maintenance concern
//!       (tracker eviction, risk decay, event retention, key rotation)
//!
//! Shutdown:
//!     trigger() → broadcast → every sweeper exits its select loop
//! ```
//!
//! # Design Decisions
//! - Background work is owned by the pipeline, never ambient timers
//! - One broadcast channel fans out to all tasks; no per-task plumbing

pub mod sweeper;

pub use sweeper::{spawn_sweeper, Shutdown};
