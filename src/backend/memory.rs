//! In-memory session backend.
//!
//! Sessions live in a `HashMap` behind a single mutex, so each operation
//! is atomic with respect to the whole key space. Expiry is lazy: expired
//! entries are dropped when an operation touches them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::BackendError;
use crate::models::SessionRecord;

use super::SessionBackend;

struct Entry<R> {
    session: R,
    expires_at: Instant,
}

/// In-memory backend for API sessions.
pub struct MemoryBackend<R> {
    sessions: Mutex<HashMap<String, Entry<R>>>,
    default_ttl: u64,
    key_byte_size: usize,
}

impl<R: SessionRecord> MemoryBackend<R> {
    /// Create a backend with the given default TTL in seconds.
    pub fn new(default_ttl: u64) -> Self {
        MemoryBackend {
            sessions: Mutex::new(HashMap::new()),
            default_ttl,
            key_byte_size: 16,
        }
    }

    pub fn with_key_byte_size(mut self, key_byte_size: usize) -> Self {
        self.key_byte_size = key_byte_size;
        self
    }

    fn expiry(&self, ttl: Option<u64>) -> Instant {
        Instant::now() + Duration::from_secs(ttl.unwrap_or(self.default_ttl))
    }

    /// Drop `key` if its entry has expired. Returns true iff a live entry
    /// remains. Caller must hold the map lock.
    fn prune(map: &mut HashMap<String, Entry<R>>, key: &str) -> bool {
        match map.get(key) {
            Some(entry) if entry.expires_at <= Instant::now() => {
                map.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn expires_at(&self, key: &str) -> Option<Instant> {
        self.sessions.lock().get(key).map(|e| e.expires_at)
    }
}

impl<R: SessionRecord> Default for MemoryBackend<R> {
    fn default() -> Self {
        MemoryBackend::new(3600)
    }
}

#[async_trait]
impl<R: SessionRecord> SessionBackend<R> for MemoryBackend<R> {
    fn key_byte_size(&self) -> usize {
        self.key_byte_size
    }

    async fn create(&self, key: &str, session: &R, ttl: Option<u64>) -> Result<(), BackendError> {
        let expires_at = self.expiry(ttl);
        let mut map = self.sessions.lock();

        if Self::prune(&mut map, key) {
            return Err(BackendError::AlreadyExists(key.to_string()));
        }

        map.insert(
            key.to_string(),
            Entry {
                session: session.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        let mut map = self.sessions.lock();
        Ok(Self::prune(&mut map, key))
    }

    async fn load(&self, key: &str) -> Result<R, BackendError> {
        let mut map = self.sessions.lock();

        if !Self::prune(&mut map, key) {
            return Err(BackendError::NotFound(key.to_string()));
        }

        // Value-copy: callers never get a live reference into the map
        map.get(key)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| BackendError::NotFound(key.to_string()))
    }

    async fn update(&self, key: &str, session: &R, ttl: Option<u64>) -> Result<(), BackendError> {
        let expires_at = ttl.map(|t| Instant::now() + Duration::from_secs(t));
        let mut map = self.sessions.lock();

        if !Self::prune(&mut map, key) {
            // Absent key: insert under the held lock so no concurrent
            // create on the same key can interleave.
            map.insert(
                key.to_string(),
                Entry {
                    session: session.clone(),
                    expires_at: expires_at.unwrap_or_else(|| self.expiry(None)),
                },
            );
            return Ok(());
        }

        if let Some(entry) = map.get_mut(key) {
            entry.session = session.clone();
            if let Some(expires_at) = expires_at {
                entry.expires_at = expires_at;
            }
        }
        Ok(())
    }

    async fn renew(&self, key: &str, ttl: Option<u64>) -> Result<(), BackendError> {
        let expires_at = self.expiry(ttl);
        let mut map = self.sessions.lock();

        if !Self::prune(&mut map, key) {
            return Err(BackendError::NotFound(key.to_string()));
        }

        if let Some(entry) = map.get_mut(key) {
            entry.expires_at = expires_at;
        }
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), BackendError> {
        let mut map = self.sessions.lock();

        if !Self::prune(&mut map, key) {
            return Err(BackendError::NotFound(key.to_string()));
        }

        // Entry stays addressable in the map but reads as expired
        if let Some(entry) = map.get_mut(key) {
            entry.expires_at = Instant::now();
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut map = self.sessions.lock();

        if !Self::prune(&mut map, key) {
            return Err(BackendError::NotFound(key.to_string()));
        }

        map.remove(key);
        Ok(())
    }
}
