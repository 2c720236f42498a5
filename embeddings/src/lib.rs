//! # Embeddings
//!
//! This crate keeps a persistent cache of per-document embedding vectors
//! and decides which documents need to be embedded again.
//!
//! ## Features
//!
//! - **Text Normalization**: Turn markdown into the text that gets embedded
//! - **Multiple Providers**: OpenAI or a self-hosted embedding server
//! - **Staleness Tracking**: Compare modification times against the cache
//! - **Incremental Generation**: Embed only new or modified documents
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DocumentSource ──► normalize ──► EmbeddingProvider            │
//! │                                        │                        │
//! │                                        ▼                        │
//! │                     EmbeddingCache (records + vectors)          │
//! │                                        │                        │
//! │                                        ▼                        │
//! │                               vectors() snapshot                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod generation;
pub mod normalizer;
pub mod provider;
pub mod similarity;

pub use cache::{CacheData, EmbeddingCache, EmbeddingRecord, EmbeddingStatus, StatusCounts};
pub use config::{GenerationOptions, LinkMode, NormalizerConfig, ProviderConfig, ProviderKind};
pub use document::{DocumentMeta, DocumentSource, FsDocumentSource, InMemorySource};
pub use error::{EmbeddingError, Result};
pub use generation::{RunOutcome, RunSummary};
pub use normalizer::normalize;
pub use provider::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, LocalServerProvider, OpenAIProvider,
    ProviderHealth, build_provider,
};
pub use similarity::{SimilarityResult, cosine_similarity};

/// Re-exported so callers can cancel a run without depending on tokio-util.
pub use tokio_util::sync::CancellationToken;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
