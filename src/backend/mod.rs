//! Session backends: persistence of session records with TTL semantics.
//!
//! A backend exclusively owns the authoritative copy of each record.
//! Callers only ever receive value-copies from [`SessionBackend::load`];
//! mutating a loaded copy has no effect until written back with
//! [`SessionBackend::update`].

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;

use crate::error::BackendError;
use crate::models::SessionRecord;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisHashBackend;

/// Generate a URL-safe random token of `byte_size` bytes before encoding.
fn random_key(byte_size: usize) -> String {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; byte_size];
    rng.fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Persistence contract for session records.
///
/// All operations are async; per-key atomicity of a single operation is
/// guaranteed by the implementation (a key-space-wide lock in memory, the
/// remote server's native atomicity for Redis).
#[async_trait]
pub trait SessionBackend<R: SessionRecord>: Send + Sync {
    /// Number of random bytes in a generated session key, before encoding.
    fn key_byte_size(&self) -> usize {
        16
    }

    /// Generate a session key not currently in use.
    ///
    /// Best-effort uniqueness: on collision with an existing key, one
    /// fresh key is drawn. A second collision (vanishingly unlikely at 16
    /// random bytes) is surfaced to the caller as-is rather than looping.
    async fn generate_session_key(&self) -> Result<String, BackendError> {
        let mut key = random_key(self.key_byte_size());

        if self.exists(&key).await? {
            key = random_key(self.key_byte_size());
        }

        Ok(key)
    }

    /// Create a session. Fails with `AlreadyExists` if `key` is stored —
    /// never silently overwrites. Expiry is now + (`ttl` or the default).
    async fn create(&self, key: &str, session: &R, ttl: Option<u64>) -> Result<(), BackendError>;

    /// True iff a non-expired record is addressable under `key`.
    async fn exists(&self, key: &str) -> Result<bool, BackendError>;

    /// Load a value-copy of the record. Fails with `NotFound` if absent
    /// or expired.
    async fn load(&self, key: &str) -> Result<R, BackendError>;

    /// Replace the stored payload. Creates the session if absent (with
    /// `create` TTL semantics); on an existing session the expiry is
    /// touched only when `ttl` is explicitly provided.
    async fn update(&self, key: &str, session: &R, ttl: Option<u64>) -> Result<(), BackendError>;

    /// Reset expiry to now + (`ttl` or the default). Never modifies the
    /// payload. Fails with `NotFound` if absent.
    async fn renew(&self, key: &str, ttl: Option<u64>) -> Result<(), BackendError>;

    /// Force immediate expiry without necessarily removing the physical
    /// entry. Fails with `NotFound` if absent.
    async fn invalidate(&self, key: &str) -> Result<(), BackendError>;

    /// Remove the session. Fails with `NotFound` if absent. Backends where
    /// true deletion is costly may satisfy this with zero-TTL expiry,
    /// gated by configuration.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;
}
