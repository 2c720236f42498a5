//! Configuration file for the `vaultgraph` binary.
//!
//! ```toml
//! [normalizer]
//! word_limit = 300
//! filter_stop_words = true
//!
//! [generation]
//! batch_size = 20
//! inter_request_delay_ms = 100
//!
//! [graph]
//! threshold = 0.8
//! max_links_per_node = 4
//!
//! [provider]
//! kind = "openai"
//! model = "text-embedding-3-small"
//!
//! [vault]
//! exclude_patterns = ["**/templates/**"]
//! ```
//!
//! Every section and key is optional.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vaultgraph_embeddings::{GenerationOptions, NormalizerConfig, ProviderConfig};
use vaultgraph_graph::GraphConfig;

/// Name of the directory inside the vault holding vaultgraph state.
pub const STATE_DIR: &str = ".vaultgraph";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultGraphConfig {
    /// Text normalization.
    pub normalizer: NormalizerConfig,

    /// Incremental generation pacing.
    pub generation: GenerationConfig,

    /// Similarity graph.
    pub graph: GraphConfig,

    /// Embedding provider.
    pub provider: ProviderConfig,

    /// Vault scanning.
    pub vault: VaultConfig,
}

impl VaultGraphConfig {
    /// Load a configuration file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No configuration file given, using defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges of every section.
    pub fn validate(&self) -> Result<()> {
        self.generation_options().validate()?;
        self.graph.validate()?;
        Ok(())
    }

    /// Options for an incremental generation run.
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            batch_size: self.generation.batch_size,
            inter_request_delay_ms: self.generation.inter_request_delay_ms,
            normalizer: self.normalizer.clone(),
        }
    }
}

/// The `[generation]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Persist the cache after this many successful embeddings.
    pub batch_size: usize,

    /// Pause between provider calls, in milliseconds.
    pub inter_request_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let defaults = GenerationOptions::default();
        Self {
            batch_size: defaults.batch_size,
            inter_request_delay_ms: defaults.inter_request_delay_ms,
        }
    }
}

/// The `[vault]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Glob patterns, relative to the vault root, that are never scanned.
    pub exclude_patterns: Vec<String>,

    /// File extensions treated as documents.
    pub extensions: Vec<String>,

    /// Cache file location; relative paths resolve against the vault root.
    pub cache_file: Option<PathBuf>,

    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,

    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
}

impl VaultConfig {
    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Set the cache file location.
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    fn default_excludes() -> Vec<String> {
        vec![
            format!("{STATE_DIR}/**"),
            "**/.git/**".to_string(),
            "**/.obsidian/**".to_string(),
            "**/.trash/**".to_string(),
            "**/node_modules/**".to_string(),
        ]
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: Self::default_excludes(),
            extensions: vec!["md".to_string()],
            cache_file: None,
            max_depth: None,
            follow_symlinks: false,
        }
    }
}
