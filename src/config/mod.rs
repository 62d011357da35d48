//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SecurityConfig (validated, immutable)
//!     → handed to Pipeline::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a new pipeline
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::*;
pub use validation::{validate_config, ValidationError};
