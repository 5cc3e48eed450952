//! Error taxonomy for the memory engine.
//!
//! Variants are grouped by *behaviour*, not by origin, matching the error
//! handling design: each variant's [`Error::is_recoverable`] feeds the
//! retry policy, and [`Error::is_contained`] tells a caller whether the
//! failure is already handled (logged, empty result returned) or needs to
//! propagate.

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the memory engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller passed a malformed argument (empty `userId`, importance out of
    /// `[0,1]`, invalid regex in a rule). Fails the call immediately.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Extractor or port construction failed because required configuration
    /// was missing or unrecognised (missing API key, unknown provider).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A transient failure in an external collaborator (LLM timeout,
    /// network glitch, storage unavailable). Eligible for retry.
    #[error("transient error: {0}")]
    Transient(String),

    /// Extraction for a single message or rule failed (parse error, schema
    /// mismatch, regex timeout). Contained: the unit of work is skipped,
    /// the batch continues.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// A decay condition (or similar user-supplied expression) fell outside
    /// the safe grammar, or a regex match exceeded its time budget.
    /// Contained: treated as "did not match", logged once.
    #[error("rejected for safety: {0}")]
    SecurityReject(String),

    /// An unrecoverable failure that must abort the current pipeline
    /// (storage corruption detected during write-back).
    #[error("fatal error: {0}")]
    Fatal(String),

    /// Underlying storage adapter error, surfaced verbatim.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem / process IO failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an [`Error::InvalidArgument`] from any displayable message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an [`Error::Configuration`] from any displayable message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the operation that produced this error can be retried under
    /// [`crate::retry::RetryPolicy`].
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Storage(_) | Error::Io(_))
    }

    /// Whether this error is already "contained" — the failing unit of
    /// work (message, rule, batch item) has been skipped and logged, and
    /// the caller should simply continue rather than propagate.
    #[must_use]
    pub fn is_contained(&self) -> bool {
        matches!(self, Error::ExtractionFailed(_) | Error::SecurityReject(_))
    }
}
