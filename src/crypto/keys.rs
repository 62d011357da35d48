//! AES-256-GCM key lifecycle.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;

use crate::config::KeyConfig;
use crate::error::SecurityError;
use crate::observability::metrics;
use crate::track::tracker::now_ms;

/// Opaque key identifier, monotonically assigned.
pub type KeyId = u32;

pub(crate) const NONCE_LEN: usize = 12;

/// One managed AEAD key. Secret bytes never leave this module.
pub struct ManagedKey {
    pub id: KeyId,
    secret: [u8; 32],
    pub created_at_ms: u64,
    last_used_ms: AtomicU64,
    usage_count: AtomicU64,
}

impl ManagedKey {
    fn generate(id: KeyId) -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self {
            id,
            secret,
            created_at_ms: now_ms(),
            last_used_ms: AtomicU64::new(0),
            usage_count: AtomicU64::new(0),
        }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.secret))
    }

    fn touch(&self) {
        self.last_used_ms.store(now_ms(), Ordering::Relaxed);
        self.usage_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Ciphertext envelope: key id, nonce, and payload with the GCM tag
/// appended (aes-gcm behavior).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub key_id: KeyId,
    pub nonce: [u8; NONCE_LEN],
    pub payload: Vec<u8>,
}

/// Snapshot row for one registered key.
#[derive(Debug, Clone, Serialize)]
pub struct KeyStatus {
    pub id: KeyId,
    pub current: bool,
    pub created_at_ms: u64,
    pub last_used_ms: u64,
    pub usage_count: u64,
}

/// Key registry with exactly one current (encrypting) key.
///
/// Retired keys stay decrypt-only until `max_key_age`, then are evicted
/// irrecoverably. The current key pointer is an ArcSwap so the encrypt
/// hot path never takes a lock.
pub struct KeyManager {
    keys: DashMap<KeyId, Arc<ManagedKey>>,
    current: ArcSwap<ManagedKey>,
    next_id: AtomicU32,
    rotation_interval_ms: u64,
    max_key_age_ms: u64,
}

impl KeyManager {
    pub fn new(config: &KeyConfig) -> Self {
        let first = Arc::new(ManagedKey::generate(1));
        let keys = DashMap::new();
        keys.insert(first.id, first.clone());
        Self {
            keys,
            current: ArcSwap::new(first),
            next_id: AtomicU32::new(2),
            rotation_interval_ms: config.rotation_interval_secs * 1000,
            max_key_age_ms: config.max_key_age_secs * 1000,
        }
    }

    pub fn current_key_id(&self) -> KeyId {
        self.current.load().id
    }

    /// Encrypt with the current key, or a specific registered key.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key_id: Option<KeyId>,
    ) -> Result<Ciphertext, SecurityError> {
        let key = match key_id {
            Some(id) => self
                .keys
                .get(&id)
                .map(|k| k.value().clone())
                .ok_or(SecurityError::KeyNotFound(id))?,
            None => self.current.load_full(),
        };

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let payload = key
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| SecurityError::MalformedInput("plaintext rejected by cipher".to_string()))?;
        key.touch();

        Ok(Ciphertext {
            key_id: key.id,
            nonce,
            payload,
        })
    }

    /// Decrypt with the key named in the envelope.
    ///
    /// `KeyNotFound` means the key was retired past max age (or never
    /// existed); `DecryptionFailed` means authentication failed.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Vec<u8>, SecurityError> {
        let key = self
            .keys
            .get(&ciphertext.key_id)
            .map(|k| k.value().clone())
            .ok_or(SecurityError::KeyNotFound(ciphertext.key_id))?;

        let plaintext = key
            .cipher()
            .decrypt(
                Nonce::from_slice(&ciphertext.nonce),
                ciphertext.payload.as_slice(),
            )
            .map_err(|_| SecurityError::DecryptionFailed)?;
        key.touch();
        Ok(plaintext)
    }

    /// Generate a fresh current key. Returns `(retiring_id, new_id)`.
    /// The retiring key stays registered for decryption.
    pub fn rotate(&self) -> (KeyId, KeyId) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let key = Arc::new(ManagedKey::generate(id));
        self.keys.insert(id, key.clone());
        let old = self.current.swap(key);
        metrics::record_key_rotation();
        tracing::info!(retiring_key = old.id, new_key = id, "encryption key rotated");
        (old.id, id)
    }

    /// Whether the current key is older than the rotation interval.
    pub fn rotation_due(&self) -> bool {
        now_ms().saturating_sub(self.current.load().created_at_ms) >= self.rotation_interval_ms
    }

    /// Evict keys past max age. The current key is never evicted.
    pub fn retire_expired(&self) -> Vec<KeyId> {
        let horizon = now_ms().saturating_sub(self.max_key_age_ms);
        let current_id = self.current.load().id;
        let expired: Vec<KeyId> = self
            .keys
            .iter()
            .filter(|entry| entry.id != current_id && entry.created_at_ms < horizon)
            .map(|entry| entry.id)
            .collect();
        for id in &expired {
            self.keys.remove(id);
            tracing::info!(key = id, "expired key retired irrecoverably");
        }
        expired
    }

    /// Status of all registered keys, sorted by id.
    pub fn key_status(&self) -> Vec<KeyStatus> {
        let current_id = self.current.load().id;
        let mut rows: Vec<KeyStatus> = self
            .keys
            .iter()
            .map(|entry| KeyStatus {
                id: entry.id,
                current: entry.id == current_id,
                created_at_ms: entry.created_at_ms,
                last_used_ms: entry.last_used_ms.load(Ordering::Relaxed),
                usage_count: entry.usage_count.load(Ordering::Relaxed),
            })
            .collect();
        rows.sort_by_key(|row| row.id);
        rows
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}
