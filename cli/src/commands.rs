//! Subcommand implementations.
//!
//! Each command returns plain data; printing is left to `main`.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result, bail};
use tracing::info;
use vaultgraph_embeddings::{
    CancellationToken, DocumentMeta, Embedding, EmbeddingCache, EmbeddingProvider,
    ProviderHealth, RunSummary, SimilarityResult, StatusCounts,
};
use vaultgraph_graph::{ExcludedPairs, SimilarityGraph, SimilarityGraphBuilder};

use crate::config::VaultGraphConfig;
use crate::vault::Vault;

/// A vault together with the configuration it is processed with.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// The vault being processed.
    pub vault: Vault,

    /// Loaded configuration.
    pub config: VaultGraphConfig,
}

impl Workspace {
    /// Create a workspace for `vault`.
    pub fn new(vault: Vault, config: VaultGraphConfig) -> Self {
        Self { vault, config }
    }

    async fn load_cache(&self) -> EmbeddingCache {
        EmbeddingCache::load(self.vault.cache_path()).await
    }

    /// Count documents per embedding status.
    pub async fn status(&self) -> StatusCounts {
        let documents = self.vault.scan();
        self.load_cache().await.stats_by_status(&documents)
    }

    /// Embed every new or modified document.
    ///
    /// Cache entries for documents that no longer exist are dropped first.
    /// `on_progress(done, total, name)` is called after each attempt.
    pub async fn generate<F>(
        &self,
        provider: &dyn EmbeddingProvider,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(usize, usize, &str),
    {
        let documents = self.vault.scan();
        let mut cache = self.load_cache().await;

        let removed = cache.retain_documents(&documents);
        if removed > 0 {
            info!("Dropped {removed} cached embeddings of deleted documents");
            cache.save().await.context("failed to save embedding cache")?;
        }

        let summary = cache
            .generate_incremental(
                &documents,
                &self.vault.source(),
                provider,
                &self.config.generation_options(),
                cancel,
                on_progress,
            )
            .await?;
        Ok(summary)
    }

    /// Build the similarity graph over the cached vectors of current
    /// documents, leaving out pairs that are already linked by hand.
    pub async fn graph(&self) -> Result<SimilarityGraph> {
        let documents = self.vault.scan();
        let cache = self.load_cache().await;
        let vectors = current_vectors(&cache, &documents);

        let links = self.vault.links(&documents).await?;
        let excluded = ExcludedPairs::from_links(&links);
        info!(
            "Building graph over {} vectors ({} manual link pairs excluded)",
            vectors.len(),
            excluded.len()
        );

        let builder = SimilarityGraphBuilder::new(self.config.graph.clone());
        Ok(builder.build(&vectors, &excluded)?)
    }

    /// Cached documents most similar to `path`.
    pub async fn related(
        &self,
        path: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SimilarityResult>> {
        let cache = self.load_cache().await;
        if cache.embedding(path).is_none() {
            bail!("no embedding cached for {path}; run `generate` first");
        }
        Ok(cache.related(path, limit, min_score))
    }

    /// Empty the embedding cache.
    pub async fn clear(&self) -> Result<()> {
        let mut cache = EmbeddingCache::empty_at(self.vault.cache_path());
        cache.clear().await.context("failed to clear embedding cache")
    }
}

/// Ask the provider whether it can serve requests.
pub async fn health(provider: &dyn EmbeddingProvider) -> Result<ProviderHealth> {
    provider
        .health()
        .await
        .with_context(|| format!("health check against {} failed", provider.name()))
}

fn current_vectors(
    cache: &EmbeddingCache,
    documents: &[DocumentMeta],
) -> BTreeMap<String, Embedding> {
    let mut vectors = cache.vectors();
    let current: HashSet<&str> = documents.iter().map(|d| d.path.as_str()).collect();
    vectors.retain(|path, _| current.contains(path.as_str()));
    vectors
}
