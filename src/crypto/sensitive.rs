//! String contract for encrypted sensitive values.
//!
//! Compact form: `v1:<key_id>:<nonce_b64>:<payload_b64>`. The version tag
//! leaves room for changing the envelope without breaking stored values.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde_json::Value;

use crate::crypto::keys::{Ciphertext, KeyManager, NONCE_LEN};
use crate::error::SecurityError;

const VERSION_TAG: &str = "v1";

/// Encode a ciphertext envelope into the compact string form.
pub fn encode(ciphertext: &Ciphertext) -> String {
    format!(
        "{VERSION_TAG}:{}:{}:{}",
        ciphertext.key_id,
        B64.encode(ciphertext.nonce),
        B64.encode(&ciphertext.payload)
    )
}

/// Parse the compact string form back into a ciphertext envelope.
pub fn decode(encoded: &str) -> Result<Ciphertext, SecurityError> {
    let invalid = |reason: &str| SecurityError::InvalidCiphertext(reason.to_string());

    let parts: Vec<&str> = encoded.split(':').collect();
    if parts.len() != 4 {
        return Err(invalid("expected 4 colon-separated fields"));
    }
    if parts[0] != VERSION_TAG {
        return Err(invalid("unknown version tag"));
    }
    let key_id = parts[1]
        .parse()
        .map_err(|_| invalid("key id is not a number"))?;
    let nonce_bytes = B64
        .decode(parts[2])
        .map_err(|_| invalid("nonce is not valid base64"))?;
    let nonce: [u8; NONCE_LEN] = nonce_bytes
        .try_into()
        .map_err(|_| invalid("nonce has wrong length"))?;
    let payload = B64
        .decode(parts[3])
        .map_err(|_| invalid("payload is not valid base64"))?;

    Ok(Ciphertext {
        key_id,
        nonce,
        payload,
    })
}

/// Encrypt any JSON value into the compact string form with the current key.
pub fn encrypt_value(keys: &KeyManager, value: &Value) -> Result<String, SecurityError> {
    let plaintext =
        serde_json::to_vec(value).map_err(|e| SecurityError::MalformedInput(e.to_string()))?;
    Ok(encode(&keys.encrypt(&plaintext, None)?))
}

/// Decrypt a compact string form back into its JSON value.
pub fn decrypt_value(keys: &KeyManager, encoded: &str) -> Result<Value, SecurityError> {
    let ciphertext = decode(encoded)?;
    let plaintext = keys.decrypt(&ciphertext)?;
    serde_json::from_slice(&plaintext).map_err(|e| SecurityError::MalformedInput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyConfig;
    use serde_json::json;

    #[test]
    fn value_round_trip() {
        let keys = KeyManager::new(&KeyConfig::default());
        let value = json!({"ssn": "078-05-1120", "tier": 3});
        let encoded = encrypt_value(&keys, &value).unwrap();
        assert!(encoded.starts_with("v1:1:"));
        assert_eq!(decrypt_value(&keys, &encoded).unwrap(), value);
    }

    #[test]
    fn malformed_strings_are_rejected() {
        let keys = KeyManager::new(&KeyConfig::default());
        for bad in [
            "",
            "v1:1:abc",
            "v2:1:AAAAAAAAAAAAAAAA:AAAA",
            "v1:one:AAAAAAAAAAAAAAAA:AAAA",
            "v1:1:!!!:AAAA",
            "v1:1:AAAA:AAAA", // nonce too short
        ] {
            assert!(
                matches!(
                    decrypt_value(&keys, bad),
                    Err(SecurityError::InvalidCiphertext(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn tampered_encoding_fails_authentication() {
        let keys = KeyManager::new(&KeyConfig::default());
        let encoded = encrypt_value(&keys, &json!("secret")).unwrap();
        let mut ciphertext = decode(&encoded).unwrap();
        let last = ciphertext.payload.len() - 1;
        ciphertext.payload[last] ^= 0x80;
        assert!(matches!(
            keys.decrypt(&ciphertext),
            Err(SecurityError::DecryptionFailed)
        ));
    }
}
