//! [`SchedulerHandle`] (§4.7): periodic triggering of lifecycle operations
//! per `(operation, userId, agentId)`.
//!
//! One independent `tokio::time::interval` timer runs per registered
//! `(operation, userId, agentId)` triple — an interval of zero disables
//! that trigger entirely. A global [`Semaphore`] sized to
//! `maxConcurrentOperations` bounds how many operations run at once
//! across the whole scheduler, grounded in the teacher's
//! `memory-storage-turso::pool` connection-pool pattern (a permit guard
//! acquired before work starts, released automatically on drop). A
//! `Mutex`-guarded reentry set prevents the same triple from running
//! twice concurrently: a trigger that finds its own triple already
//! in-flight, or that cannot acquire a semaphore permit immediately, is
//! *skipped*, not queued — a slow lifecycle pass does not pile up work
//! for the next tick.

use crate::error::Error;
use crate::lifecycle::manager::LifecycleManager;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::types::{AgentId, UserId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Which stage of the lifecycle pipeline a schedule entry triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleOperation {
    Decay,
    Promotion,
    Cleanup,
    EnforceLimit,
    /// The full ordered pipeline (decay, promotion, cleanup, limit).
    FullLifecycle,
}

impl LifecycleOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Decay => "decay",
            Self::Promotion => "promotion",
            Self::Cleanup => "cleanup",
            Self::EnforceLimit => "enforce_limit",
            Self::FullLifecycle => "full_lifecycle",
        }
    }
}

type ReentryKey = (LifecycleOperation, UserId, AgentId);

/// One `(operation, userId, agentId)` trigger and how often it fires.
/// `interval == Duration::ZERO` disables the entry without needing a
/// separate enabled flag.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub operation: LifecycleOperation,
    pub user_id: UserId,
    pub agent_id: AgentId,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent_operations: usize,
    pub retry: RetryConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: crate::constants::defaults::DEFAULT_MAX_CONCURRENT_OPERATIONS,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SchedulerStats {
    triggered: AtomicU64,
    skipped_busy: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl SchedulerStats {
    #[must_use]
    pub fn triggered(&self) -> u64 {
        self.triggered.load(Ordering::SeqCst)
    }
    #[must_use]
    pub fn skipped_busy(&self) -> u64 {
        self.skipped_busy.load(Ordering::SeqCst)
    }
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

/// A running scheduler. Dropping or calling [`SchedulerHandle::shutdown`]
/// cancels every per-entry timer task; `shutdown` additionally awaits
/// in-flight operations before returning.
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
    stats: Arc<SchedulerStats>,
}

impl SchedulerHandle {
    #[must_use]
    pub fn stats(&self) -> Arc<SchedulerStats> {
        self.stats.clone()
    }

    /// Cancels every timer task and waits for them to unwind. In-flight
    /// lifecycle operations finish (they are not aborted mid-run); only
    /// the next scheduled tick is prevented.
    pub async fn shutdown(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
    }
}

/// Spawns one timer task per [`ScheduleEntry`] with non-zero interval,
/// each driving `manager` through the requested [`LifecycleOperation`]
/// under the shared concurrency cap and reentry guard described above.
#[must_use]
pub fn start(manager: Arc<LifecycleManager>, entries: Vec<ScheduleEntry>, config: SchedulerConfig) -> SchedulerHandle {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_operations.max(1)));
    let in_flight: Arc<Mutex<HashSet<ReentryKey>>> = Arc::new(Mutex::new(HashSet::new()));
    let stats = Arc::new(SchedulerStats::default());
    let retry_config = config.retry;

    let mut tasks = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.interval.is_zero() {
            continue;
        }

        let manager = manager.clone();
        let semaphore = semaphore.clone();
        let in_flight = in_flight.clone();
        let stats = stats.clone();
        let retry_config = retry_config.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(entry.interval);
            // The first tick fires immediately; skip it so entries don't
            // all fire in a burst the moment the scheduler starts.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                stats.triggered.fetch_add(1, Ordering::SeqCst);

                let key: ReentryKey = (entry.operation, entry.user_id.clone(), entry.agent_id.clone());

                let permit = {
                    let mut guard = in_flight.lock().await;
                    if guard.contains(&key) {
                        None
                    } else {
                        match semaphore.clone().try_acquire_owned() {
                            Ok(permit) => {
                                guard.insert(key.clone());
                                Some(permit)
                            }
                            Err(_) => None,
                        }
                    }
                };

                let Some(permit) = permit else {
                    stats.skipped_busy.fetch_add(1, Ordering::SeqCst);
                    continue;
                };

                let manager = manager.clone();
                let in_flight = in_flight.clone();
                let stats = stats.clone();
                let mut retry = RetryPolicy::with_config(retry_config.clone());
                let key_for_run = key.clone();

                run_with_retry(&manager, &key_for_run, &mut retry, &stats).await;

                in_flight.lock().await.remove(&key);
                drop(permit);
            }
        });

        tasks.push(task);
    }

    SchedulerHandle { tasks, stats }
}

async fn run_with_retry(manager: &Arc<LifecycleManager>, key: &ReentryKey, retry: &mut RetryPolicy, stats: &Arc<SchedulerStats>) {
    let (operation, user_id, agent_id) = key;

    let result = retry
        .execute(|| async { run_once(manager, *operation, user_id, agent_id).await })
        .await;

    match result {
        Ok(()) => {
            stats.completed.fetch_add(1, Ordering::SeqCst);
            info!(operation = operation.as_str(), user_id = %user_id, agent_id = %agent_id, "lifecycle operation completed");
        }
        Err(err) => {
            stats.failed.fetch_add(1, Ordering::SeqCst);
            warn!(operation = operation.as_str(), user_id = %user_id, agent_id = %agent_id, error = %err, "lifecycle operation failed");
        }
    }
}

async fn run_once(manager: &LifecycleManager, operation: LifecycleOperation, user_id: &UserId, agent_id: &AgentId) -> Result<(), Error> {
    let now_ms = chrono::Utc::now().timestamp_millis();

    match operation {
        LifecycleOperation::Decay => {
            let rules = manager.load_decay_rules(user_id, agent_id).await?;
            manager.run_decay(user_id, agent_id, &rules, now_ms).await?;
        }
        LifecycleOperation::Promotion => {
            manager.run_promotion(user_id, agent_id, now_ms).await?;
        }
        LifecycleOperation::Cleanup => {
            manager.run_cleanup(user_id, agent_id, now_ms).await?;
        }
        LifecycleOperation::EnforceLimit => {
            manager.enforce_limit(user_id, agent_id, now_ms).await?;
        }
        LifecycleOperation::FullLifecycle => {
            let rules = manager.load_decay_rules(user_id, agent_id).await?;
            manager.run_lifecycle(user_id, agent_id, &rules, now_ms).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decay::DecayConfig;
    use crate::error::Result;
    use crate::lifecycle::manager::LifecycleConfig;
    use crate::ports::storage::{SetOptions, StoragePort};
    use crate::types::{Memory, MemoryId, MemoryType};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Default)]
    struct CountingStorage {
        memories: TokioMutex<HashMap<String, Memory>>,
        calls: AtomicU64,
    }

    #[async_trait]
    impl StoragePort for CountingStorage {
        async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: serde_json::Value, _opts: SetOptions) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
        async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn memory_store(&self, _user_id: &UserId, _agent_id: &AgentId, memory: &Memory) -> Result<()> {
            self.memories.lock().await.insert(memory.id.as_str().to_string(), memory.clone());
            Ok(())
        }
        async fn memory_get(&self, _user_id: &UserId, _agent_id: &AgentId, id: &MemoryId) -> Result<Option<Memory>> {
            Ok(self.memories.lock().await.get(id.as_str()).cloned())
        }
        async fn memory_delete(&self, _user_id: &UserId, _agent_id: &AgentId, id: &MemoryId) -> Result<bool> {
            Ok(self.memories.lock().await.remove(id.as_str()).is_some())
        }
        async fn memory_list(&self, _user_id: &UserId, _agent_id: &AgentId) -> Result<Vec<Memory>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.memories.lock().await.values().cloned().collect())
        }
    }

    #[tokio::test]
    async fn zero_interval_entries_spawn_no_task() {
        let storage = Arc::new(CountingStorage::default());
        let manager = Arc::new(LifecycleManager::new(
            storage.clone(),
            LifecycleConfig {
                decay: DecayConfig::default(),
                ..Default::default()
            },
        ));

        let entries = vec![ScheduleEntry {
            operation: LifecycleOperation::Cleanup,
            user_id: UserId::from("u1"),
            agent_id: AgentId::from("a1"),
            interval: Duration::ZERO,
        }];

        let handle = start(manager, entries, SchedulerConfig::default());
        assert!(handle.tasks.is_empty());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn periodic_trigger_runs_cleanup_and_updates_stats() {
        let storage = Arc::new(CountingStorage::default());
        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");

        let memory = Memory::new(
            MemoryId::from("m1"),
            user_id.clone(),
            agent_id.clone(),
            "fading",
            MemoryType::Semantic,
            0.05,
            0,
            0,
        )
        .unwrap();
        storage.memory_store(&user_id, &agent_id, &memory).await.unwrap();

        let manager = Arc::new(LifecycleManager::new(
            storage.clone(),
            LifecycleConfig {
                archive_enabled: false,
                decay: DecayConfig {
                    delete_threshold: 0.1,
                    ..Default::default()
                },
                ..Default::default()
            },
        ));

        let entries = vec![ScheduleEntry {
            operation: LifecycleOperation::Cleanup,
            user_id: user_id.clone(),
            agent_id: agent_id.clone(),
            interval: Duration::from_millis(10),
        }];

        let handle = start(manager, entries, SchedulerConfig::default());
        tokio::time::sleep(Duration::from_millis(60)).await;
        let stats = handle.stats();
        handle.shutdown().await;

        assert!(stats.triggered() >= 1);
        assert!(stats.completed() >= 1);
        assert_eq!(stats.failed(), 0);

        let remaining = storage.memory_list(&user_id, &agent_id).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[test]
    fn reentry_key_identity_is_per_operation_not_just_per_agent() {
        let key_a: ReentryKey = (LifecycleOperation::Decay, UserId::from("u1"), AgentId::from("a1"));
        let key_b: ReentryKey = (LifecycleOperation::Promotion, UserId::from("u1"), AgentId::from("a1"));
        let mut set = HashSet::new();
        set.insert(key_a);
        assert!(!set.contains(&key_b));
    }
}
