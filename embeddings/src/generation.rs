//! Incremental embedding generation.
//!
//! Walks the documents whose cached embedding is missing or stale, one at a
//! time, and feeds their normalized text to the provider. Progress is
//! persisted every `batch_size` successes so an interrupted run loses at
//! most one batch.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::cache::EmbeddingCache;
use crate::config::{GenerationOptions, NormalizerConfig};
use crate::document::{DocumentMeta, DocumentSource};
use crate::error::{EmbeddingError, Result};
use crate::normalizer::normalize;
use crate::provider::{EmbeddingProvider, EmbeddingRequest};

/// How a generation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every document was already up to date.
    NothingToDo,
    /// Every pending document was attempted.
    Completed,
    /// Stopped between documents at the caller's request.
    Cancelled,
    /// Stopped by a run-level error.
    Aborted,
}

/// Counters reported at the end of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Documents that needed embedding when the run started.
    pub total: usize,

    /// Documents embedded successfully.
    pub processed: usize,

    /// Documents whose attempt failed.
    pub failed: usize,

    /// How the run ended.
    pub outcome: RunOutcome,
}

impl RunSummary {
    fn start(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            failed: 0,
            outcome: RunOutcome::Completed,
        }
    }

    /// Documents attempted so far.
    pub fn attempted(&self) -> usize {
        self.processed + self.failed
    }
}

impl EmbeddingCache {
    /// Embed every document that is new or modified.
    ///
    /// Documents are processed strictly in the order given, one provider
    /// call at a time. `on_progress(done, total, name)` is called after each
    /// attempt. Per-document failures mark the document `Modified` and the
    /// run continues. Run-fatal errors (see [`EmbeddingError::is_run_fatal`])
    /// and failed saves stop the run and are returned as
    /// [`EmbeddingError::RunAborted`].
    /// Cancelling `cancel` stops the run before the next document starts.
    ///
    /// Vectors recorded for a different provider or model are dropped first,
    /// so every document is embedded again.
    pub async fn generate_incremental<F>(
        &mut self,
        documents: &[DocumentMeta],
        source: &dyn DocumentSource,
        provider: &dyn EmbeddingProvider,
        options: &GenerationOptions,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(usize, usize, &str),
    {
        options.validate()?;

        let recovered = self.recover_abandoned();
        if recovered > 0 {
            warn!("Retrying {recovered} embedding(s) abandoned by an earlier run");
        }

        if self.adopt_producer(provider.name(), provider.model()) {
            info!("Re-embedding every document with {}", provider.model());
        }

        let pending = self.pending(documents);
        let mut summary = RunSummary::start(pending.len());

        if pending.is_empty() {
            info!("All {} documents up to date, nothing to do", documents.len());
            summary.outcome = RunOutcome::NothingToDo;
            return Ok(summary);
        }

        info!(
            "Embedding {} of {} documents with {} ({})",
            summary.total,
            documents.len(),
            provider.name(),
            provider.model()
        );

        let delay = options.inter_request_delay();
        let mut unsaved = 0;

        for (index, doc) in pending.into_iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
            if cancel.is_cancelled() {
                info!(
                    "Generation cancelled after {} of {} documents",
                    summary.attempted(),
                    summary.total
                );
                summary.outcome = RunOutcome::Cancelled;
                break;
            }

            self.begin_processing(&doc.path, doc.last_modified);

            let result = match embed_document(doc, source, provider, &options.normalizer).await {
                Ok(vector) => self.commit(&doc.path, vector),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    summary.processed += 1;
                    unsaved += 1;
                    debug!("Embedded {}", doc.path);
                }
                Err(e) if e.is_run_fatal() => {
                    self.fail(&doc.path);
                    summary.failed += 1;
                    on_progress(summary.attempted(), summary.total, doc.name());
                    warn!("Stopping generation at {}: {e}", doc.path);
                    if matches!(e, EmbeddingError::DimensionMismatch { .. }) {
                        warn!("The provider's vectors changed shape; run `clear` to start over");
                    }
                    return Err(self.abort(summary, e).await);
                }
                Err(e) => {
                    self.fail(&doc.path);
                    summary.failed += 1;
                    warn!("Failed to embed {}: {e}", doc.path);
                }
            }

            on_progress(summary.attempted(), summary.total, doc.name());

            if unsaved >= options.batch_size {
                if let Err(e) = self.save().await {
                    warn!("Failed to persist embedding cache: {e}");
                    summary.outcome = RunOutcome::Aborted;
                    return Err(EmbeddingError::RunAborted {
                        summary,
                        cause: Box::new(e),
                    });
                }
                unsaved = 0;
            }
        }

        if let Err(e) = self.save().await {
            warn!("Failed to persist embedding cache: {e}");
            summary.outcome = RunOutcome::Aborted;
            return Err(EmbeddingError::RunAborted {
                summary,
                cause: Box::new(e),
            });
        }

        info!(
            "Generation finished: {} embedded, {} failed",
            summary.processed, summary.failed
        );
        Ok(summary)
    }

    /// Persist what was done so far and wrap `cause` as a run abort.
    async fn abort(&self, mut summary: RunSummary, cause: EmbeddingError) -> EmbeddingError {
        summary.outcome = RunOutcome::Aborted;
        if let Err(e) = self.save().await {
            warn!("Failed to persist embedding cache after abort: {e}");
        }
        EmbeddingError::RunAborted {
            summary,
            cause: Box::new(cause),
        }
    }
}

async fn embed_document(
    doc: &DocumentMeta,
    source: &dyn DocumentSource,
    provider: &dyn EmbeddingProvider,
    normalizer: &NormalizerConfig,
) -> Result<Embedding> {
    let content = source.read(doc).await?;

    let mut text = normalize(&content, normalizer);
    if text.is_empty() {
        // Markup-only documents are embedded by name so they still get a vector.
        text = doc.name().to_string();
    }

    let response = provider.embed(EmbeddingRequest::new(text)).await?;
    if response.embedding.is_empty() {
        return Err(EmbeddingError::EmptyEmbedding);
    }
    Ok(response.embedding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_attempted() {
        let summary = RunSummary {
            total: 5,
            processed: 3,
            failed: 1,
            outcome: RunOutcome::Completed,
        };
        assert_eq!(summary.attempted(), 4);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&RunOutcome::NothingToDo).unwrap();
        assert_eq!(json, r#""nothing_to_do""#);
    }
}
