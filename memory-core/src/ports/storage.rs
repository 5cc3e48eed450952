//! `StoragePort` (§6): the abstract KV + memory capability every layer of
//! the core consumes.

use crate::error::Result;
use crate::types::{AgentId, Memory, MemoryId, UserId};
use async_trait::async_trait;
use serde_json::Value;

/// Options accepted by [`StoragePort::set`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Time-to-live, in seconds, after which the adapter may expire the
    /// entry. `None` means no expiry.
    pub ttl_seconds: Option<u64>,
}

/// Abstract storage capability consumed by every component in §4.
///
/// Adapters own their own consistency model (§5); the only contract this
/// trait asks of them is **at-least-once durability for `set`** and
/// **idempotency for `memory_store` by id** (§6).
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Fetch a value as JSON. Returns `Ok(None)` when the key is absent.
    /// Callers deserialize the payload themselves with
    /// `serde_json::from_value`, which keeps the trait object-safe (a
    /// generic `get<T>` would not be) while staying adapter-agnostic.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on adapter failure or
    /// [`crate::error::Error::Serialization`] on a malformed stored value.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a JSON value under `key`, honoring `opts.ttl_seconds` when the
    /// adapter supports expiry.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on adapter failure.
    async fn set(&self, key: &str, value: Value, opts: SetOptions) -> Result<()>;

    /// Remove a key. Returns whether a value was present.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on adapter failure.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List every key under `prefix`.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on adapter failure.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Store a memory. Idempotent by `memory.id` (§6): storing the same
    /// memory twice must yield the state of a single store (§8).
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on adapter failure.
    async fn memory_store(&self, user_id: &UserId, agent_id: &AgentId, memory: &Memory) -> Result<()>;

    /// Fetch one memory by id.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on adapter failure.
    async fn memory_get(&self, user_id: &UserId, agent_id: &AgentId, id: &MemoryId) -> Result<Option<Memory>>;

    /// Delete one memory by id. Returns whether it was present.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on adapter failure.
    async fn memory_delete(&self, user_id: &UserId, agent_id: &AgentId, id: &MemoryId) -> Result<bool>;

    /// List every memory owned by `(userId, agentId)`.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on adapter failure.
    async fn memory_list(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Vec<Memory>>;
}
