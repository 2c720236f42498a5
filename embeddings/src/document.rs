//! Documents as seen by the embedding cache.
//!
//! Enumerating documents and reading their content belongs to the host; the
//! cache only needs an identity, a modification time and a way to fetch text.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{EmbeddingError, Result};

/// Identity and modification time of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Stable identity, usually a vault-relative path.
    pub path: String,

    /// When the document content last changed.
    pub last_modified: DateTime<Utc>,
}

impl DocumentMeta {
    /// Create document metadata.
    pub fn new(path: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            last_modified,
        }
    }

    /// Display name: the file stem of the path.
    pub fn name(&self) -> &str {
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.path)
    }
}

/// Source of document content.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Read the full raw content of a document.
    ///
    /// Content that is not valid UTF-8 is decoded lossily rather than
    /// rejected, so every readable document can be embedded.
    async fn read(&self, document: &DocumentMeta) -> Result<String>;
}

/// Reads documents from files below a root directory.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn read(&self, document: &DocumentMeta) -> Result<String> {
        let path = self.root.join(&document.path);
        let bytes = fs::read(&path)
            .await
            .map_err(|e| EmbeddingError::DocumentRead {
                path: document.path.clone(),
                message: e.to_string(),
            })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Serves documents from memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    contents: HashMap<String, String>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document's content.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.contents.insert(path.into(), content.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    async fn read(&self, document: &DocumentMeta) -> Result<String> {
        self.contents
            .get(&document.path)
            .cloned()
            .ok_or_else(|| EmbeddingError::DocumentRead {
                path: document.path.clone(),
                message: "no such document".to_string(),
            })
    }
}
