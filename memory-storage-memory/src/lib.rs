//! In-process, dependency-light [`StoragePort`] implementation.
//!
//! Plays the role the teacher's `memory-storage-redb` crate plays: a
//! local adapter with no external database, used by tests, the CLI's
//! default mode, and anywhere a durable backend isn't warranted. It does
//! not attempt to reproduce redb's on-disk format — state lives only for
//! the process lifetime, guarded by `parking_lot` locks rather than an
//! embedded database engine.

use async_trait::async_trait;
use do_memory_core::error::Result;
use do_memory_core::types::{AgentId, Memory, MemoryId, UserId};
use do_memory_core::{SetOptions, StoragePort};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Reference [`StoragePort`] backed by two in-memory maps: a flat KV
/// store for generic values, and a per-`(userId, agentId)` map of
/// [`Memory`] records indexed by id (so `memory_store` is naturally
/// idempotent by id, per §6).
#[derive(Default)]
pub struct MemoryStorage {
    kv: RwLock<HashMap<String, Entry>>,
    memories: RwLock<HashMap<(String, String), HashMap<String, Memory>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoragePort for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut guard = self.kv.write();
        if let Some(entry) = guard.get(key) {
            if entry.is_expired() {
                guard.remove(key);
                return Ok(None);
            }
        }
        Ok(guard.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, opts: SetOptions) -> Result<()> {
        let expires_at = opts.ttl_seconds.map(|secs| Instant::now() + Duration::from_secs(secs));
        self.kv.write().insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.kv.write().remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut guard = self.kv.write();
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            guard.remove(&key);
        }
        Ok(guard.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    async fn memory_store(&self, user_id: &UserId, agent_id: &AgentId, memory: &Memory) -> Result<()> {
        let key = (user_id.as_str().to_string(), agent_id.as_str().to_string());
        self.memories
            .write()
            .entry(key)
            .or_default()
            .insert(memory.id.as_str().to_string(), memory.clone());
        Ok(())
    }

    async fn memory_get(&self, user_id: &UserId, agent_id: &AgentId, id: &MemoryId) -> Result<Option<Memory>> {
        let key = (user_id.as_str().to_string(), agent_id.as_str().to_string());
        Ok(self.memories.read().get(&key).and_then(|m| m.get(id.as_str())).cloned())
    }

    async fn memory_delete(&self, user_id: &UserId, agent_id: &AgentId, id: &MemoryId) -> Result<bool> {
        let key = (user_id.as_str().to_string(), agent_id.as_str().to_string());
        Ok(self
            .memories
            .write()
            .get_mut(&key)
            .is_some_and(|m| m.remove(id.as_str()).is_some()))
    }

    async fn memory_list(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Vec<Memory>> {
        let key = (user_id.as_str().to_string(), agent_id.as_str().to_string());
        Ok(self.memories.read().get(&key).map(|m| m.values().cloned().collect()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use do_memory_core::types::MemoryType;

    #[tokio::test]
    async fn kv_roundtrips_and_deletes() {
        let storage = MemoryStorage::new();
        storage.set("k1", Value::String("v1".into()), SetOptions::default()).await.unwrap();
        assert_eq!(storage.get("k1").await.unwrap(), Some(Value::String("v1".into())));
        assert!(storage.delete("k1").await.unwrap());
        assert_eq!(storage.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ttl_expiry_drops_entry() {
        let storage = MemoryStorage::new();
        storage
            .set(
                "k1",
                Value::String("v1".into()),
                SetOptions { ttl_seconds: Some(0) },
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(storage.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let storage = MemoryStorage::new();
        storage.set("memory:u1:a1:m1", Value::Null, SetOptions::default()).await.unwrap();
        storage.set("decay-rules:u1:a1", Value::Null, SetOptions::default()).await.unwrap();
        let mut keys = storage.list("memory:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["memory:u1:a1:m1".to_string()]);
    }

    #[tokio::test]
    async fn memory_store_is_idempotent_by_id() {
        let storage = MemoryStorage::new();
        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");
        let memory = Memory::new(
            MemoryId::from("m1"),
            user_id.clone(),
            agent_id.clone(),
            "hello",
            MemoryType::Working,
            0.5,
            0,
            0,
        )
        .unwrap();

        storage.memory_store(&user_id, &agent_id, &memory).await.unwrap();
        storage.memory_store(&user_id, &agent_id, &memory).await.unwrap();

        let all = storage.memory_list(&user_id, &agent_id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(storage.memory_delete(&user_id, &agent_id, &memory.id).await.unwrap());
        assert!(storage.memory_list(&user_id, &agent_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_scoping_is_per_user_and_agent() {
        let storage = MemoryStorage::new();
        let mem_a = Memory::new(
            MemoryId::from("m1"),
            UserId::from("u1"),
            AgentId::from("a1"),
            "a's memory",
            MemoryType::Working,
            0.5,
            0,
            0,
        )
        .unwrap();
        storage.memory_store(&UserId::from("u1"), &AgentId::from("a1"), &mem_a).await.unwrap();

        let other = storage.memory_list(&UserId::from("u1"), &AgentId::from("a2")).await.unwrap();
        assert!(other.is_empty());
    }
}
