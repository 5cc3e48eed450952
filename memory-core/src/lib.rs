#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unused_self)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::borrowed_box)]
#![allow(clippy::float_cmp)]
#![allow(clippy::ref_option)]

//! # Memory Core
//!
//! Core engine for giving conversational AI agents durable, self-managing
//! memory: messages are buffered into batches, run through a tiered
//! extraction pipeline to become [`types::Memory`] records, left to decay
//! (or be promoted, archived, and evicted) over an agent's lifetime, and
//! linked into a navigable connection graph.
//!
//! ## Core Concepts
//!
//! - **Batch extraction** ([`batch`]): agent messages are buffered per
//!   `(userId, agentId)`, drained once "ripe", and run through noise
//!   filtering, deterministic sampling, and up to three extractor tiers
//!   under a cost budget.
//! - **Extraction** ([`extraction`]): rule-based regex extraction, two LLM
//!   tiers built on a shared core, and a PRIME extractor with automatic
//!   tier selection and a fallback path.
//! - **Decay** ([`decay`]): exponential resonance decay gated by a small,
//!   closed condition grammar — never a dynamic expression evaluator.
//! - **Lifecycle** ([`lifecycle`]): the decay → promote → cleanup →
//!   enforce-limit pipeline, plus a scheduler that triggers it on a timer
//!   per agent.
//! - **Connection graph** ([`graph`]): BFS reachability and shortest path,
//!   DFS-based clustering, and aggregate graph insights over
//!   [`types::Connection`] edges.
//!
//! ## Ports
//!
//! The engine is storage- and model-agnostic: [`ports::storage::StoragePort`],
//! [`ports::llm::LlmPort`], and [`ports::embedding::EmbeddingPort`] are the
//! seams an adapter crate implements. `memory-storage-memory` is the
//! in-process reference adapter used by tests, examples, and the CLI.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::Result`]. [`error::Error`]
//! variants are grouped by how a caller should react
//! ([`error::Error::is_recoverable`], [`error::Error::is_contained`]),
//! not by where they originated.
//!
//! ```no_run
//! use memory_core::error::Result;
//!
//! async fn example() -> Result<()> {
//!     // Operations that can fail
//!     // .await?
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod constants;
pub mod cost;
pub mod decay;
pub mod error;
pub mod extraction;
pub mod graph;
pub mod lifecycle;
pub mod noise;
pub mod ports;
pub mod retry;
pub mod tracing;
pub mod types;

pub use batch::{BatchConfig, BatchProcessor, CostOptimizer, ExtractorConfig, TierEligibility};
pub use cost::CostTracker;
pub use decay::{DecayConfig, DecayEngine, DecayReport};
pub use error::{Error, Result};
pub use extraction::{
    LargeLlmExtractor, LlmExtractorCore, PrimeConfig, PrimeExtractor, PrimeTier, RuleBasedExtractor,
    SmallLlmExtractor,
};
pub use graph::{Cluster, ConnectionGraph, ExpansionOptions, GraphInsights};
pub use lifecycle::{LifecycleConfig, LifecycleManager, LifecycleOperation, LifecycleReport, SchedulerConfig};
pub use noise::{NoiseFilter, NoiseFilterConfig};
pub use ports::embedding::EmbeddingPort;
pub use ports::llm::LlmPort;
pub use ports::storage::{SetOptions, StoragePort};
pub use types::{
    AgentId, BatchId, BatchMetadata, Connection, CostRecord, DecayRule, DecayRuleId, ExtractionRule,
    Memory, MemoryId, MemoryMessage, MemoryType, Role, RuleId, UserId,
};
