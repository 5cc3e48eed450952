//! `LlmPort` (§6): the abstract text/object generation capability consumed
//! by the LLM-tier extractors and PRIME's accurate path.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token accounting returned alongside every LLM call, fed straight into
/// [`crate::cost::CostTracker`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Provider-quoted cost in USD, when the provider reports one directly
    /// instead of per-token pricing the caller must compute itself.
    #[serde(default)]
    pub cost_usd: Option<f64>,
}

/// A structured-generation request: a prompt plus the JSON schema the
/// response must validate against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateObjectRequest {
    pub prompt: String,
    pub schema: Value,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateObjectResponse {
    pub object: Value,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamTextResponse {
    pub text: String,
    pub usage: Usage,
}

/// Abstract LLM capability consumed by §4.2 and §4.3.
///
/// Adapters are responsible for schema validation, retries against the
/// upstream provider, and translating provider errors into
/// [`crate::error::Error::Transient`] (retryable) or
/// [`crate::error::Error::ExtractionFailed`] (contained failure of a single
/// extraction, not the whole batch).
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Ask the model to produce a value conforming to `request.schema`.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Transient`] on a retryable provider
    /// failure, or [`crate::error::Error::ExtractionFailed`] when the model
    /// cannot produce a schema-conformant object.
    async fn generate_object(&self, request: GenerateObjectRequest) -> Result<GenerateObjectResponse>;

    /// Ask the model for free text, used by the noise filter's optional
    /// LLM fallback (§4.4).
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Transient`] on a retryable provider
    /// failure.
    async fn stream_text(&self, prompt: &str) -> Result<StreamTextResponse>;
}
