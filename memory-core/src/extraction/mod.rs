//! Extraction tiers (§2, §4.1–§4.3, §4.5): rule-based (free), small/large
//! LLM (paid), and PRIME (single-call, auto-tiered).

pub mod llm;
pub mod prime;
pub mod rules;
pub mod sampling;
mod traits;

pub use llm::{LargeLlmExtractor, LlmExtractorCore, SmallLlmExtractor};
pub use prime::{PrimeConfig, PrimeExtractor, PrimeTier};
pub use rules::RuleBasedExtractor;
pub use traits::{ExtractionContext, Extractor};
