//! Batch extraction pipeline (§2, §4.1): buffering, ripeness, sampling,
//! tiered extraction under a cost budget, and batch metadata bookkeeping.

mod buffer;
pub mod config;
pub mod optimizer;
mod processor;

pub use config::{BatchConfig, ExtractorConfig};
pub use optimizer::{CostOptimizer, TierEligibility};
pub use processor::BatchProcessor;
