//! Configuration for text normalization and incremental generation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// How markdown links are rewritten before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// `[text](url)` becomes `text`.
    #[default]
    KeepText,
    /// `[text](url)` is dropped entirely.
    Remove,
}

/// Configuration for the text normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Maximum number of words retained.
    pub word_limit: usize,

    /// Number of leading words ignored (template boilerplate).
    pub word_skip: usize,

    /// Whether headings are left out of the embedded text.
    pub exclude_headings: bool,

    /// Whether common English stop words are dropped.
    pub filter_stop_words: bool,

    /// How links are rewritten.
    pub link_mode: LinkMode,
}

impl NormalizerConfig {
    /// Set the word limit.
    pub fn with_word_limit(mut self, limit: usize) -> Self {
        self.word_limit = limit;
        self
    }

    /// Set the number of skipped leading words.
    pub fn with_word_skip(mut self, skip: usize) -> Self {
        self.word_skip = skip;
        self
    }

    /// Leave headings out of the output.
    pub fn without_headings(mut self) -> Self {
        self.exclude_headings = true;
        self
    }

    /// Keep stop words.
    pub fn keep_stop_words(mut self) -> Self {
        self.filter_stop_words = false;
        self
    }

    /// Set the link rewriting mode.
    pub fn with_link_mode(mut self, mode: LinkMode) -> Self {
        self.link_mode = mode;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.word_limit == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "word_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            word_limit: 500,
            word_skip: 0,
            exclude_headings: false,
            filter_stop_words: true,
            link_mode: LinkMode::KeepText,
        }
    }
}

/// Options for an incremental generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Persist the cache after this many successful embeddings.
    pub batch_size: usize,

    /// Pause between provider calls, in milliseconds.
    pub inter_request_delay_ms: u64,

    /// Text normalization applied before each provider call.
    pub normalizer: NormalizerConfig,
}

impl GenerationOptions {
    /// Set the persist interval.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the pause between provider calls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the normalizer configuration.
    pub fn with_normalizer(mut self, normalizer: NormalizerConfig) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Pause between provider calls.
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        self.normalizer.validate()
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            inter_request_delay_ms: 200,
            normalizer: NormalizerConfig::default(),
        }
    }
}

/// Which embedding provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
    /// Self-hosted sentence-transformer server.
    #[default]
    LocalServer,
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Which provider to use.
    pub kind: ProviderKind,

    /// Override for the provider base URL.
    pub base_url: Option<String>,

    /// Model to use for embeddings.
    pub model: Option<String>,

    /// API key; OpenAI falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::LocalServer,
            base_url: None,
            model: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}
