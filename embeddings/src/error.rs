//! Error types for the embeddings system.

use thiserror::Error;

use crate::generation::RunSummary;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider not configured.
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// Network, auth or server failure while calling the provider.
    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider account has run out of quota.
    #[error("embedding provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Provider returned a zero-length vector.
    #[error("provider returned an empty embedding")]
    EmptyEmbedding,

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The persisted cache could not be parsed.
    #[error("malformed cache file: {0}")]
    MalformedCache(String),

    /// A document's content could not be read.
    #[error("failed to read document {path}: {message}")]
    DocumentRead { path: String, message: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A generation run stopped before visiting every pending document.
    #[error(
        "generation run aborted after {} processed, {} failed: {cause}",
        .summary.processed,
        .summary.failed
    )]
    RunAborted {
        summary: RunSummary,
        #[source]
        cause: Box<EmbeddingError>,
    },
}

impl EmbeddingError {
    /// Whether this error must stop an incremental run instead of being
    /// recorded against a single document.
    ///
    /// A dimension mismatch means the provider changed under the cache, so
    /// every remaining document would fail the same way.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_) | Self::DimensionMismatch { .. })
    }

    /// Whether the root cause of this error is quota exhaustion.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            Self::QuotaExceeded(_) => true,
            Self::RunAborted { cause, .. } => cause.is_quota_exceeded(),
            _ => false,
        }
    }
}
