//! [`BatchConfig`] (§4.1): the recognised configuration keys for the batch
//! pipeline, as a typed record rather than a duck-typed map (§9).

use crate::constants::defaults;
use crate::noise::NoiseFilterConfig;

/// One entry of `extractors[]` (§4.1).
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub extractor_type: String,
    pub enabled: bool,
    pub cost_per_memory: f64,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub max_cost: Option<f64>,
    pub quality_threshold: Option<f64>,
}

impl ExtractorConfig {
    #[must_use]
    pub fn new(extractor_type: impl Into<String>, enabled: bool, cost_per_memory: f64) -> Self {
        Self {
            extractor_type: extractor_type.into(),
            enabled,
            cost_per_memory,
            provider: None,
            model: None,
            api_key: None,
            max_cost: None,
            quality_threshold: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_batch_size: usize,
    pub min_batch_size: usize,
    pub timeout_minutes: u64,
    pub extraction_rate: f64,
    pub enable_small_model: bool,
    pub enable_premium_model: bool,
    pub cost_budget: Option<f64>,
    pub extractors: Vec<ExtractorConfig>,
    pub noise_filtering: NoiseFilterConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: defaults::DEFAULT_MAX_BATCH_SIZE,
            min_batch_size: defaults::DEFAULT_MIN_BATCH_SIZE,
            timeout_minutes: defaults::DEFAULT_TIMEOUT_MINUTES,
            extraction_rate: defaults::DEFAULT_EXTRACTION_RATE,
            enable_small_model: false,
            enable_premium_model: false,
            cost_budget: None,
            extractors: Vec::new(),
            noise_filtering: NoiseFilterConfig::default(),
        }
    }
}

impl BatchConfig {
    #[must_use]
    pub fn extractor_cost_per_memory(&self, extractor_type: &str) -> f64 {
        self.extractors
            .iter()
            .find(|e| e.extractor_type == extractor_type)
            .map_or(0.0, |e| e.cost_per_memory)
    }
}
