//! Salted password hashing (PBKDF2-HMAC-SHA256).
//!
//! Deliberately separate from `KeyManager`: password digests are one-way
//! and never participate in key rotation or retirement.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::SecurityError;

const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Hash a password with a fresh random salt.
///
/// Stored form: `pbkdf2-sha256$<iterations>$<salt_b64>$<hash_b64>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut hash);
    format!(
        "{SCHEME}${ITERATIONS}${}${}",
        B64.encode(salt),
        B64.encode(hash)
    )
}

/// Verify a password against a stored hash in constant time.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, SecurityError> {
    let invalid = || SecurityError::MalformedInput("invalid password hash encoding".to_string());

    let parts: Vec<&str> = stored.split('$').collect();
    if parts.len() != 4 || parts[0] != SCHEME {
        return Err(invalid());
    }
    let iterations: u32 = parts[1].parse().map_err(|_| invalid())?;
    let salt = B64.decode(parts[2]).map_err(|_| invalid())?;
    let expected = B64.decode(parts[3]).map_err(|_| invalid())?;

    let mut actual = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut actual);

    Ok(constant_time_eq(&actual, &expected))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
