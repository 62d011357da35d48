//! Sensitive-data protection.
//!
//! # Data Flow
//! ```text
//! caller value (serde_json::Value)
//!     → sensitive.rs (serialize, AEAD encrypt, compact string form)
//!     → keys.rs (registry, one current key, rotation + retirement)
//!     → v1:<key_id>:<nonce_b64>:<payload_b64>
//! ```
//!
//! # Design Decisions
//! - AES-256-GCM with a random 96-bit nonce per encryption
//! - Retired keys are decrypt-only; past max age they are gone for good
//! - Password hashing (password.rs) is one-way and stays out of the
//!   key registry entirely

pub mod keys;
pub mod password;
pub mod sensitive;

pub use keys::{Ciphertext, KeyId, KeyManager, KeyStatus};
pub use password::{hash_password, verify_password};
pub use sensitive::{decrypt_value, encrypt_value};
