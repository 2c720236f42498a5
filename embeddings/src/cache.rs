//! Persistent embedding cache with staleness tracking.
//!
//! The cache maps a document path to its embedding vector plus an
//! [`EmbeddingRecord`] describing when that vector was generated. Callers
//! compare the record against the document's modification time to decide
//! whether the document needs to be embedded again.
//!
//! The whole cache is written as one JSON document:
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "provider": "openai",
//!   "model": "text-embedding-3-small",
//!   "files": {
//!     "a.md": {
//!       "path": "a.md",
//!       "lastModified": 10,
//!       "embeddingGenerated": 20,
//!       "status": "up_to_date"
//!     }
//!   },
//!   "embeddings": { "a.md": [0.6, 0.8] }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::document::DocumentMeta;
use crate::error::{EmbeddingError, Result};
use crate::similarity::{SimilarityResult, find_top_k};

/// Version tag written into persisted caches.
pub const CACHE_VERSION: &str = "1.0.0";

/// Embedding state of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStatus {
    /// Never embedded.
    New,
    /// Content changed since the embedding was generated, or the last
    /// attempt failed.
    Modified,
    /// Cached vector matches the current content.
    UpToDate,
    /// An embedding request is in flight.
    Processing,
}

impl EmbeddingStatus {
    /// Whether a document in this state should be (re)embedded.
    pub fn needs_embedding(self) -> bool {
        matches!(self, Self::New | Self::Modified)
    }
}

/// Bookkeeping for one cached document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRecord {
    /// Document path.
    pub path: String,

    /// Document modification time seen when the record was last touched.
    #[serde(with = "ts_milliseconds")]
    pub last_modified: DateTime<Utc>,

    /// When the embedding was (last) generated or requested.
    #[serde(with = "ts_milliseconds")]
    pub embedding_generated: DateTime<Utc>,

    /// Current status.
    pub status: EmbeddingStatus,
}

/// The persisted form of the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheData {
    /// Layout version.
    pub version: String,

    /// Provider that produced the stored vectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Model that produced the stored vectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Records by document path.
    #[serde(default)]
    pub files: BTreeMap<String, EmbeddingRecord>,

    /// Vectors by document path.
    #[serde(default)]
    pub embeddings: BTreeMap<String, Embedding>,
}

impl CacheData {
    /// Check that all vectors are non-empty and share one dimension.
    pub fn validate(&self) -> Result<Option<usize>> {
        let mut dimension: Option<usize> = None;
        for (path, vector) in &self.embeddings {
            if vector.is_empty() {
                return Err(EmbeddingError::MalformedCache(format!(
                    "empty embedding stored for {path}"
                )));
            }
            match dimension {
                None => dimension = Some(vector.len()),
                Some(expected) if expected != vector.len() => {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(dimension)
    }
}

impl Default for CacheData {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            provider: None,
            model: None,
            files: BTreeMap::new(),
            embeddings: BTreeMap::new(),
        }
    }
}

/// Number of documents in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Documents never embedded.
    pub new: usize,

    /// Documents whose embedding is stale.
    pub modified: usize,

    /// Documents with a current embedding.
    pub up_to_date: usize,

    /// Documents with a request in flight.
    pub processing: usize,
}

impl StatusCounts {
    fn add(&mut self, status: EmbeddingStatus) {
        match status {
            EmbeddingStatus::New => self.new += 1,
            EmbeddingStatus::Modified => self.modified += 1,
            EmbeddingStatus::UpToDate => self.up_to_date += 1,
            EmbeddingStatus::Processing => self.processing += 1,
        }
    }

    /// Total number of documents counted.
    pub fn total(&self) -> usize {
        self.new + self.modified + self.up_to_date + self.processing
    }

    /// Documents that a generation run would embed.
    pub fn pending(&self) -> usize {
        self.new + self.modified
    }
}

/// Embedding cache keyed by document path.
///
/// All mutation goes through `&mut self`, so a single owner drives
/// generation and nothing else can observe a half-updated record.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingCache {
    pub(crate) data: CacheData,

    /// Where the cache is persisted, if anywhere.
    cache_path: Option<PathBuf>,
}

impl EmbeddingCache {
    /// Create an empty cache that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Create an empty cache persisted at `path`, ignoring any existing file.
    pub fn empty_at(path: impl Into<PathBuf>) -> Self {
        Self {
            data: CacheData::default(),
            cache_path: Some(path.into()),
        }
    }

    /// Load the cache persisted at `path`.
    ///
    /// A missing, unreadable or malformed file yields an empty cache; the
    /// problem is logged and the file is overwritten on the next save.
    /// Records left in [`EmbeddingStatus::Processing`] by an interrupted run
    /// are demoted to [`EmbeddingStatus::Modified`].
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let data = match Self::read_data(path).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                info!("No embedding cache at {}, starting empty", path.display());
                CacheData::default()
            }
            Err(e) => {
                warn!(
                    "Discarding embedding cache at {}: {e}; starting empty",
                    path.display()
                );
                CacheData::default()
            }
        };

        let mut cache = Self {
            data,
            cache_path: Some(path.to_path_buf()),
        };

        let recovered = cache.recover_abandoned();
        if recovered > 0 {
            warn!("Marked {recovered} interrupted embedding(s) as modified");
        }

        info!(
            "Loaded {} embeddings ({} records) from {}",
            cache.len(),
            cache.data.files.len(),
            path.display()
        );

        cache
    }

    /// Read and validate a persisted cache. `Ok(None)` when the file is absent.
    pub async fn read_data(path: &Path) -> Result<Option<CacheData>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let data: CacheData = serde_json::from_str(&content)
            .map_err(|e| EmbeddingError::MalformedCache(e.to_string()))?;

        if data.version != CACHE_VERSION {
            return Err(EmbeddingError::MalformedCache(format!(
                "unsupported cache version {}",
                data.version
            )));
        }
        data.validate()
            .map_err(|e| EmbeddingError::MalformedCache(e.to_string()))?;

        Ok(Some(data))
    }

    /// Save the cache to disk, replacing the previous file atomically.
    pub async fn save(&self) -> Result<()> {
        let Some(ref path) = self.cache_path else {
            return Ok(());
        };

        let content = serde_json::to_string(&self.data)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, path).await?;

        debug!(
            "Saved {} embeddings to {}",
            self.data.embeddings.len(),
            path.display()
        );
        Ok(())
    }

    /// Path the cache is persisted to.
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Persisted representation.
    pub fn data(&self) -> &CacheData {
        &self.data
    }

    /// Provider and model the stored vectors came from, once recorded.
    pub fn producer(&self) -> Option<(&str, &str)> {
        match (&self.data.provider, &self.data.model) {
            (Some(provider), Some(model)) => Some((provider, model)),
            _ => None,
        }
    }

    /// Record `provider`/`model` as the producer of the cached vectors.
    ///
    /// Vectors from a different producer cannot be compared with new ones,
    /// so when another producer is on record every record and vector is
    /// dropped. Returns whether that happened.
    pub fn adopt_producer(&mut self, provider: &str, model: &str) -> bool {
        let reset = self
            .producer()
            .is_some_and(|current| current != (provider, model));
        if reset {
            warn!(
                "Embeddings were generated by {}/{}, dropping {} of them for {provider}/{model}",
                self.data.provider.as_deref().unwrap_or_default(),
                self.data.model.as_deref().unwrap_or_default(),
                self.data.embeddings.len()
            );
            self.data.files.clear();
            self.data.embeddings.clear();
        }
        self.data.provider = Some(provider.to_string());
        self.data.model = Some(model.to_string());
        reset
    }

    /// Status of a document given its current modification time.
    ///
    /// Depends only on the stored record and `last_modified`; the clock is
    /// never consulted.
    pub fn status_of(&self, path: &str, last_modified: DateTime<Utc>) -> EmbeddingStatus {
        let Some(record) = self.data.files.get(path) else {
            return EmbeddingStatus::New;
        };

        match record.status {
            EmbeddingStatus::Processing => EmbeddingStatus::Processing,
            _ if last_modified > record.embedding_generated => EmbeddingStatus::Modified,
            EmbeddingStatus::UpToDate if self.data.embeddings.contains_key(path) => {
                EmbeddingStatus::UpToDate
            }
            // A record without a usable vector is stale whatever it claims.
            _ => EmbeddingStatus::Modified,
        }
    }

    /// Get the record for a document.
    pub fn record(&self, path: &str) -> Option<&EmbeddingRecord> {
        self.data.files.get(path)
    }

    /// Get the cached vector for a document.
    pub fn embedding(&self, path: &str) -> Option<&[f32]> {
        self.data.embeddings.get(path).map(Vec::as_slice)
    }

    /// Mark a document as having a request in flight.
    pub fn begin_processing(&mut self, path: &str, last_modified: DateTime<Utc>) {
        self.data.files.insert(
            path.to_string(),
            EmbeddingRecord {
                path: path.to_string(),
                last_modified,
                embedding_generated: Utc::now(),
                status: EmbeddingStatus::Processing,
            },
        );
    }

    /// Store a freshly generated vector and mark the document up to date.
    pub fn commit(&mut self, path: &str, vector: Embedding) -> Result<()> {
        if vector.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }

        let expected = self
            .data
            .embeddings
            .iter()
            .find(|(key, _)| key.as_str() != path)
            .map(|(_, v)| v.len());
        if let Some(expected) = expected {
            if expected != vector.len() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let now = Utc::now();
        let record = self
            .data
            .files
            .entry(path.to_string())
            .or_insert_with(|| EmbeddingRecord {
                path: path.to_string(),
                last_modified: now,
                embedding_generated: now,
                status: EmbeddingStatus::New,
            });
        record.embedding_generated = now;
        record.status = EmbeddingStatus::UpToDate;

        self.data.embeddings.insert(path.to_string(), vector);
        Ok(())
    }

    /// Record a failed attempt so the document is retried next run.
    pub fn fail(&mut self, path: &str) {
        if let Some(record) = self.data.files.get_mut(path) {
            record.status = EmbeddingStatus::Modified;
        }
    }

    /// Demote every `Processing` record to `Modified`.
    ///
    /// Holding `&mut self` means no request can be in flight, so any such
    /// record belongs to an abandoned attempt. Returns how many were reset.
    pub fn recover_abandoned(&mut self) -> usize {
        let mut recovered = 0;
        for record in self.data.files.values_mut() {
            if record.status == EmbeddingStatus::Processing {
                record.status = EmbeddingStatus::Modified;
                recovered += 1;
            }
        }
        recovered
    }

    /// Documents that need embedding, in the given order.
    pub fn pending<'a>(&self, documents: &'a [DocumentMeta]) -> Vec<&'a DocumentMeta> {
        documents
            .iter()
            .filter(|doc| self.status_of(&doc.path, doc.last_modified).needs_embedding())
            .collect()
    }

    /// Count documents per status.
    pub fn stats_by_status(&self, documents: &[DocumentMeta]) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for doc in documents {
            counts.add(self.status_of(&doc.path, doc.last_modified));
        }
        counts
    }

    /// Drop a document's record and vector.
    pub fn remove(&mut self, path: &str) -> bool {
        let had_record = self.data.files.remove(path).is_some();
        let had_vector = self.data.embeddings.remove(path).is_some();
        had_record || had_vector
    }

    /// Drop everything not belonging to one of `documents`. Returns how many
    /// paths were removed.
    pub fn retain_documents(&mut self, documents: &[DocumentMeta]) -> usize {
        let keep: HashSet<&str> = documents.iter().map(|d| d.path.as_str()).collect();

        let stale: BTreeSet<String> = self
            .data
            .files
            .keys()
            .chain(self.data.embeddings.keys())
            .filter(|path| !keep.contains(path.as_str()))
            .cloned()
            .collect();

        let mut removed = 0;
        for path in stale {
            if self.remove(&path) {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("Removed {removed} cache entries for deleted documents");
        }
        removed
    }

    /// Replace the whole cache with an empty one and persist it.
    pub async fn clear(&mut self) -> Result<()> {
        self.data = CacheData::default();
        info!("Cleared embedding cache");
        self.save().await
    }

    /// Owned snapshot of every cached vector.
    pub fn vectors(&self) -> BTreeMap<String, Embedding> {
        self.data.embeddings.clone()
    }

    /// Dimension shared by all cached vectors.
    pub fn dimension(&self) -> Option<usize> {
        self.data.embeddings.values().next().map(Vec::len)
    }

    /// Number of cached vectors.
    pub fn len(&self) -> usize {
        self.data.embeddings.len()
    }

    /// Whether no vectors are cached.
    pub fn is_empty(&self) -> bool {
        self.data.embeddings.is_empty()
    }

    /// Nearest cached documents to `path`, excluding itself.
    pub fn related(&self, path: &str, k: usize, min_score: f32) -> Vec<SimilarityResult> {
        let Some(query) = self.embedding(path) else {
            return Vec::new();
        };
        find_top_k(
            query,
            self.data
                .embeddings
                .iter()
                .filter(|(other, _)| other.as_str() != path)
                .map(|(other, v)| (other.as_str(), v.as_slice())),
            k,
            min_score,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn ts(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn cache_with(
        path: &str,
        modified: i64,
        generated: i64,
        status: EmbeddingStatus,
    ) -> EmbeddingCache {
        let mut cache = EmbeddingCache::in_memory();
        cache.data.files.insert(
            path.to_string(),
            EmbeddingRecord {
                path: path.to_string(),
                last_modified: ts(modified),
                embedding_generated: ts(generated),
                status,
            },
        );
        cache.data.embeddings.insert(path.to_string(), vec![1.0, 0.0]);
        cache
    }

    #[test]
    fn test_status_new_and_up_to_date() {
        let cache = cache_with("A", 10, 20, EmbeddingStatus::UpToDate);

        assert_eq!(cache.status_of("A", ts(10)), EmbeddingStatus::UpToDate);
        assert_eq!(cache.status_of("B", ts(10)), EmbeddingStatus::New);
    }

    #[test]
    fn test_status_is_pure() {
        let cache = cache_with("A", 10, 20, EmbeddingStatus::UpToDate);
        for _ in 0..3 {
            assert_eq!(cache.status_of("A", ts(20)), EmbeddingStatus::UpToDate);
            assert_eq!(cache.status_of("A", ts(21)), EmbeddingStatus::Modified);
        }
    }

    #[test]
    fn test_status_without_vector_is_modified() {
        let mut cache = cache_with("A", 10, 20, EmbeddingStatus::UpToDate);
        cache.data.embeddings.clear();
        assert_eq!(cache.status_of("A", ts(10)), EmbeddingStatus::Modified);
    }

    #[test]
    fn test_failed_record_stays_modified() {
        let mut cache = EmbeddingCache::in_memory();
        cache.begin_processing("A", ts(10));
        assert_eq!(cache.status_of("A", ts(10)), EmbeddingStatus::Processing);

        cache.fail("A");
        // embedding_generated is newer than the file, but there is no vector
        assert_eq!(cache.status_of("A", ts(10)), EmbeddingStatus::Modified);
    }

    #[test]
    fn test_commit_marks_up_to_date() {
        let mut cache = EmbeddingCache::in_memory();
        cache.begin_processing("A", ts(10));
        cache.commit("A", vec![0.6, 0.8]).unwrap();

        let record = cache.record("A").unwrap();
        assert_eq!(record.status, EmbeddingStatus::UpToDate);
        assert!(record.embedding_generated >= record.last_modified);
        assert_eq!(cache.status_of("A", ts(10)), EmbeddingStatus::UpToDate);
        assert_eq!(cache.embedding("A"), Some([0.6, 0.8].as_slice()));
    }

    #[test]
    fn test_commit_rejects_empty_and_mismatched_vectors() {
        let mut cache = EmbeddingCache::in_memory();
        cache.commit("A", vec![1.0, 0.0]).unwrap();

        assert!(matches!(
            cache.commit("B", Vec::new()),
            Err(EmbeddingError::EmptyEmbedding)
        ));
        assert!(matches!(
            cache.commit("B", vec![1.0, 0.0, 0.0]),
            Err(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        // Replacing the only vector may change the dimension.
        cache.commit("A", vec![1.0, 0.0, 0.0]).unwrap();
        assert_eq!(cache.dimension(), Some(3));
    }

    #[test]
    fn test_adopt_producer_resets_on_model_change() {
        let mut cache = EmbeddingCache::in_memory();
        cache.commit("A", vec![1.0, 0.0]).unwrap();

        // Nothing on record yet: the existing vectors are kept.
        assert!(!cache.adopt_producer("openai", "text-embedding-3-small"));
        assert!(!cache.adopt_producer("openai", "text-embedding-3-small"));
        assert_eq!(cache.len(), 1);

        // Same dimension, different model.
        assert!(cache.adopt_producer("openai", "text-embedding-ada-002"));
        assert!(cache.is_empty());
        assert!(cache.record("A").is_none());
        assert_eq!(cache.producer(), Some(("openai", "text-embedding-ada-002")));
    }

    #[test]
    fn test_recover_abandoned() {
        let mut cache = EmbeddingCache::in_memory();
        cache.begin_processing("A", ts(10));
        cache.begin_processing("B", ts(10));
        cache.commit("B", vec![1.0]).unwrap();

        assert_eq!(cache.recover_abandoned(), 1);
        assert_eq!(cache.record("A").unwrap().status, EmbeddingStatus::Modified);
        assert_eq!(cache.record("B").unwrap().status, EmbeddingStatus::UpToDate);
    }

    #[test]
    fn test_stats_by_status() {
        let mut cache = cache_with("A", 10, 20, EmbeddingStatus::UpToDate);
        cache.begin_processing("C", ts(5));
        cache.fail("C");

        let docs = vec![
            DocumentMeta::new("A", ts(10)),
            DocumentMeta::new("B", ts(10)),
            DocumentMeta::new("C", ts(5)),
        ];
        let counts = cache.stats_by_status(&docs);

        assert_eq!(
            counts,
            StatusCounts {
                new: 1,
                modified: 1,
                up_to_date: 1,
                processing: 0,
            }
        );
        assert_eq!(counts.total(), 3);
        let pending: Vec<&str> = cache.pending(&docs).iter().map(|d| d.path.as_str()).collect();
        assert_eq!(pending, vec!["B", "C"]);
    }

    #[test]
    fn test_retain_documents() {
        let mut cache = cache_with("A", 10, 20, EmbeddingStatus::UpToDate);
        cache.commit("gone.md", vec![0.0, 1.0]).unwrap();

        let removed = cache.retain_documents(&[DocumentMeta::new("A", ts(10))]);
        assert_eq!(removed, 1);
        assert!(cache.record("gone.md").is_none());
        assert!(cache.embedding("gone.md").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_related() {
        let mut cache = EmbeddingCache::in_memory();
        cache.commit("a", vec![1.0, 0.0]).unwrap();
        cache.commit("b", vec![0.9, 0.1]).unwrap();
        cache.commit("c", vec![0.0, 1.0]).unwrap();

        let related = cache.related("a", 5, 0.5);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].path, "b");
        assert!(cache.related("missing", 5, 0.0).is_empty());
    }

    #[test]
    fn test_persisted_layout() {
        let cache = cache_with("A", 10, 20, EmbeddingStatus::UpToDate);
        let json = serde_json::to_value(cache.data()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "version": "1.0.0",
                "files": {
                    "A": {
                        "path": "A",
                        "lastModified": 10,
                        "embeddingGenerated": 20,
                        "status": "up_to_date"
                    }
                },
                "embeddings": { "A": [1.0, 0.0] }
            })
        );
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/cache.json");

        let mut cache = EmbeddingCache::empty_at(&path);
        cache.adopt_producer("local", "all-MiniLM-L6-v2");
        cache.begin_processing("a.md", ts(10));
        cache.commit("a.md", vec![0.6, 0.8]).unwrap();
        cache.begin_processing("b.md", ts(10));
        cache.save().await.unwrap();

        assert!(!path.with_extension("json.tmp").exists());

        let loaded = EmbeddingCache::load(&path).await;
        assert_eq!(loaded.producer(), Some(("local", "all-MiniLM-L6-v2")));
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.embedding("a.md"), Some([0.6, 0.8].as_slice()));
        // b.md was in flight when saved
        assert_eq!(loaded.record("b.md").unwrap().status, EmbeddingStatus::Modified);
    }

    #[tokio::test]
    async fn test_load_missing_or_malformed_starts_empty() {
        let temp_dir = TempDir::new().unwrap();

        let missing = EmbeddingCache::load(temp_dir.path().join("none.json")).await;
        assert!(missing.is_empty());

        let garbage = temp_dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not json").unwrap();
        assert!(matches!(
            EmbeddingCache::read_data(&garbage).await,
            Err(EmbeddingError::MalformedCache(_))
        ));
        assert!(EmbeddingCache::load(&garbage).await.is_empty());

        let mixed = temp_dir.path().join("mixed.json");
        std::fs::write(
            &mixed,
            r#"{"version": "1.0.0", "files": {}, "embeddings": {"a": [1.0], "b": [1.0, 2.0]}}"#,
        )
        .unwrap();
        assert!(EmbeddingCache::load(&mixed).await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_persists_empty_cache() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");

        let mut cache = EmbeddingCache::empty_at(&path);
        cache.commit("a.md", vec![1.0]).unwrap();
        cache.save().await.unwrap();

        cache.clear().await.unwrap();
        assert!(cache.is_empty());
        assert!(EmbeddingCache::load(&path).await.is_empty());
    }
}
