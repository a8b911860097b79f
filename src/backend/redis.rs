//! Redis session backend.
//!
//! Each session is a Redis hash at its session key, one hash field per
//! record field, each field value JSON-encoded. Expiry rides on Redis's
//! native key TTL, and per-key atomicity comes from the server.
//!
//! Note that Redis treats `EXPIRE key 0` as deletion, so `invalidate`
//! (and `delete` with `expire_on_delete`) reclaim storage immediately —
//! pending reads observe "not found" rather than a lingering expired
//! entry.

use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;

use crate::error::BackendError;
use crate::models::SessionRecord;

use super::SessionBackend;

/// Redis hash backend for API sessions.
pub struct RedisHashBackend<R> {
    con: redis::aio::MultiplexedConnection,
    default_ttl: u64,
    expire_on_delete: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R: SessionRecord> RedisHashBackend<R> {
    /// Connect to Redis and build a backend.
    ///
    /// With `expire_on_delete`, `delete` is satisfied by zero-TTL expiry
    /// instead of `DEL`. On Redis the two reclaim storage equally fast;
    /// the flag exists for stores where physical deletion is costlier
    /// than letting the expiry sweep collect the key.
    pub async fn connect(
        redis_url: &str,
        default_ttl: u64,
        expire_on_delete: bool,
    ) -> Result<Self, BackendError> {
        let client = redis::Client::open(redis_url)?;
        let con = client.get_multiplexed_async_connection().await?;

        Ok(RedisHashBackend {
            con,
            default_ttl,
            expire_on_delete,
            _record: PhantomData,
        })
    }

    /// Build a backend from an existing multiplexed connection.
    pub fn with_connection(
        con: redis::aio::MultiplexedConnection,
        default_ttl: u64,
        expire_on_delete: bool,
    ) -> Self {
        RedisHashBackend {
            con,
            default_ttl,
            expire_on_delete,
            _record: PhantomData,
        }
    }

    /// Flatten a record into `(field, json)` pairs for HSET.
    fn to_fields(session: &R) -> Result<Vec<(String, String)>, BackendError> {
        let value = serde_json::to_value(session)?;
        let Value::Object(map) = value else {
            return Err(BackendError::Store(
                "session record must serialize to a JSON object".to_string(),
            ));
        };

        let mut fields = Vec::with_capacity(map.len());
        for (name, field) in map {
            fields.push((name, serde_json::to_string(&field)?));
        }
        Ok(fields)
    }

    /// Rebuild a record from an HGETALL result.
    fn from_fields(key: &str, fields: HashMap<String, String>) -> Result<R, BackendError> {
        if fields.is_empty() {
            // Key expired between EXISTS and HGETALL
            return Err(BackendError::NotFound(key.to_string()));
        }

        let mut map = serde_json::Map::with_capacity(fields.len());
        for (name, json) in fields {
            map.insert(name, serde_json::from_str(&json)?);
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

#[async_trait]
impl<R: SessionRecord> SessionBackend<R> for RedisHashBackend<R> {
    async fn create(&self, key: &str, session: &R, ttl: Option<u64>) -> Result<(), BackendError> {
        if self.exists(key).await? {
            return Err(BackendError::AlreadyExists(key.to_string()));
        }

        let fields = Self::to_fields(session)?;
        let mut con = self.con.clone();
        con.hset_multiple::<_, _, _, ()>(key, &fields).await?;
        con.expire::<_, ()>(key, ttl.unwrap_or(self.default_ttl) as i64)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        let mut con = self.con.clone();
        let exists: bool = con.exists(key).await?;
        Ok(exists)
    }

    async fn load(&self, key: &str) -> Result<R, BackendError> {
        if !self.exists(key).await? {
            return Err(BackendError::NotFound(key.to_string()));
        }

        let mut con = self.con.clone();
        let fields: HashMap<String, String> = con.hgetall(key).await?;
        Self::from_fields(key, fields)
    }

    async fn update(&self, key: &str, session: &R, ttl: Option<u64>) -> Result<(), BackendError> {
        if !self.exists(key).await? {
            return self.create(key, session, ttl).await;
        }

        let fields = Self::to_fields(session)?;
        let mut con = self.con.clone();
        // HSET on an existing key leaves the TTL alone
        con.hset_multiple::<_, _, _, ()>(key, &fields).await?;

        if let Some(ttl) = ttl {
            con.expire::<_, ()>(key, ttl as i64).await?;
        }
        Ok(())
    }

    async fn renew(&self, key: &str, ttl: Option<u64>) -> Result<(), BackendError> {
        if !self.exists(key).await? {
            return Err(BackendError::NotFound(key.to_string()));
        }

        let mut con = self.con.clone();
        con.expire::<_, ()>(key, ttl.unwrap_or(self.default_ttl) as i64)
            .await?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), BackendError> {
        if !self.exists(key).await? {
            return Err(BackendError::NotFound(key.to_string()));
        }

        let mut con = self.con.clone();
        con.expire::<_, ()>(key, 0).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        if !self.exists(key).await? {
            return Err(BackendError::NotFound(key.to_string()));
        }

        let mut con = self.con.clone();
        if self.expire_on_delete {
            con.expire::<_, ()>(key, 0).await?;
        } else {
            con.del::<_, ()>(key).await?;
        }
        Ok(())
    }
}
