//! CLI-facing configuration: a serde-friendly DTO mirroring the recognised
//! configuration keys (§4.1, §4.6, §4.7, §4.3), loaded from a config file
//! and converted into the core's typed config structs.

use anyhow::Context;
use do_memory_core::batch::BatchConfig;
use do_memory_core::decay::DecayConfig;
use do_memory_core::extraction::PrimeConfig;
use do_memory_core::lifecycle::LifecycleConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub batch: BatchSettings,
    #[serde(default)]
    pub decay: DecaySettings,
    #[serde(default)]
    pub lifecycle: LifecycleSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    pub max_batch_size: usize,
    pub min_batch_size: usize,
    pub timeout_minutes: u64,
    pub extraction_rate: f64,
    pub enable_small_model: bool,
    pub enable_premium_model: bool,
    pub cost_budget: Option<f64>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        let core = BatchConfig::default();
        Self {
            max_batch_size: core.max_batch_size,
            min_batch_size: core.min_batch_size,
            timeout_minutes: core.timeout_minutes,
            extraction_rate: core.extraction_rate,
            enable_small_model: core.enable_small_model,
            enable_premium_model: core.enable_premium_model,
            cost_budget: core.cost_budget,
        }
    }
}

impl BatchSettings {
    #[must_use]
    pub fn into_core(self) -> BatchConfig {
        BatchConfig {
            max_batch_size: self.max_batch_size,
            min_batch_size: self.min_batch_size,
            timeout_minutes: self.timeout_minutes,
            extraction_rate: self.extraction_rate,
            enable_small_model: self.enable_small_model,
            enable_premium_model: self.enable_premium_model,
            cost_budget: self.cost_budget,
            ..BatchConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecaySettings {
    pub default_decay_rate: f64,
    pub default_min_importance: f64,
    pub delete_threshold: f64,
}

impl Default for DecaySettings {
    fn default() -> Self {
        let core = DecayConfig::default();
        Self {
            default_decay_rate: core.default_decay_rate,
            default_min_importance: core.default_min_importance,
            delete_threshold: core.delete_threshold,
        }
    }
}

impl DecaySettings {
    #[must_use]
    pub fn into_core(self) -> DecayConfig {
        DecayConfig {
            default_decay_rate: self.default_decay_rate,
            default_min_importance: self.default_min_importance,
            delete_threshold: self.delete_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSettings {
    pub episodic_to_semantic_days: i64,
    pub min_importance_for_promotion: f64,
    pub min_access_count_for_promotion: u64,
    pub preserve_original: bool,
    pub archive_enabled: bool,
    pub max_memories_per_agent: usize,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        let core = LifecycleConfig::default();
        Self {
            episodic_to_semantic_days: core.episodic_to_semantic_days,
            min_importance_for_promotion: core.min_importance_for_promotion,
            min_access_count_for_promotion: core.min_access_count_for_promotion,
            preserve_original: core.preserve_original,
            archive_enabled: core.archive_enabled,
            max_memories_per_agent: core.max_memories_per_agent,
        }
    }
}

impl LifecycleSettings {
    #[must_use]
    pub fn into_core(self, decay: DecayConfig) -> LifecycleConfig {
        LifecycleConfig {
            episodic_to_semantic_days: self.episodic_to_semantic_days,
            min_importance_for_promotion: self.min_importance_for_promotion,
            min_access_count_for_promotion: self.min_access_count_for_promotion,
            preserve_original: self.preserve_original,
            archive_enabled: self.archive_enabled,
            decay,
            ..LifecycleConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch: BatchSettings::default(),
            decay: DecaySettings::default(),
            lifecycle: LifecycleSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file, or fall back to a default-locations
    /// search, or finally to built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

                match path.extension().and_then(|s| s.to_str()) {
                    Some("yaml" | "yml") => serde_yaml::from_str(&content)
                        .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
                    Some("toml") => {
                        toml::from_str(&content).with_context(|| format!("Failed to parse TOML config: {}", path.display()))
                    }
                    _ => serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
                }
            }
            None => {
                let default_paths = ["memory-cli.toml", "memory-cli.json", "memory-cli.yaml", ".memory-cli.toml"];

                for path_str in &default_paths {
                    let path = Path::new(path_str);
                    if path.exists() {
                        return Self::load(Some(path));
                    }
                }

                Ok(Self::default())
            }
        }
    }

    /// Validate configuration invariants beyond what deserialization alone
    /// enforces.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch.max_batch_size < self.batch.min_batch_size {
            anyhow::bail!("batch.max_batch_size must be >= batch.min_batch_size");
        }
        if !(0.0..=1.0).contains(&self.batch.extraction_rate) {
            anyhow::bail!("batch.extraction_rate must be within [0.0, 1.0]");
        }
        if !(0.0..=1.0).contains(&self.decay.default_min_importance) {
            anyhow::bail!("decay.default_min_importance must be within [0.0, 1.0]");
        }
        if self.lifecycle.max_memories_per_agent == 0 {
            anyhow::bail!("lifecycle.max_memories_per_agent must be greater than 0");
        }
        Ok(())
    }

    #[must_use]
    pub fn batch_config(&self) -> BatchConfig {
        self.batch.clone().into_core()
    }

    #[must_use]
    pub fn decay_config(&self) -> DecayConfig {
        self.decay.clone().into_core()
    }

    #[must_use]
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        self.lifecycle.clone().into_core(self.decay_config())
    }
}

/// Resolves a [`PrimeConfig`] from explicit CLI overrides and environment
/// variables (§4.3 precedence), independent of the rest of the file-backed
/// config above.
pub fn resolve_prime_config(api_key: Option<String>, provider: Option<String>) -> anyhow::Result<PrimeConfig> {
    let overrides = do_memory_core::extraction::prime::PrimeConfigOverrides {
        provider,
        api_key,
        ..Default::default()
    };
    Ok(PrimeConfig::resolve(overrides, 0.0)?)
}

/// Builds the in-process reference storage adapter used by every CLI
/// command. `memory-cli` ships no external-database mode — a durable
/// backend is an adapter concern outside this crate's scope.
#[must_use]
pub fn initialize_storage() -> Arc<dyn do_memory_core::StoragePort> {
    Arc::new(memory_storage_memory::MemoryStorage::new())
}
