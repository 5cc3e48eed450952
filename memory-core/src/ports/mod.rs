//! External collaborator traits (§6).
//!
//! The core only ever depends on these trait boundaries — concrete LLM
//! providers, embedding providers, and storage engines are adapters that
//! live outside this crate (§1 "Out of scope"). `memory-storage-memory`
//! ships one reference [`storage::StoragePort`] implementation for tests
//! and the CLI's default mode.

pub mod embedding;
pub mod llm;
pub mod storage;

pub use embedding::{EmbeddingOutput, EmbeddingPort};
pub use llm::{GenerateObjectRequest, GenerateObjectResponse, LlmPort, StreamTextResponse, Usage};
pub use storage::{SetOptions, StoragePort};
