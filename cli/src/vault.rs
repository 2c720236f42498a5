//! Scanning a vault directory for markdown documents and their links.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex_lite::Regex;
use tracing::{debug, info, warn};
use vaultgraph_embeddings::normalizer::strip_front_matter;
use vaultgraph_embeddings::{DocumentMeta, DocumentSource, FsDocumentSource};
use vaultgraph_graph::GraphLink;
use walkdir::WalkDir;

use crate::config::{STATE_DIR, VaultConfig};

/// Default cache file name inside the state directory.
const CACHE_FILE: &str = "embeddings.json";

/// A directory of markdown notes.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    config: VaultConfig,
}

impl Vault {
    /// Create a vault rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, config: VaultConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the embedding cache lives.
    pub fn cache_path(&self) -> PathBuf {
        match self.config.cache_file {
            Some(ref file) if file.is_absolute() => file.clone(),
            Some(ref file) => self.root.join(file),
            None => self.root.join(STATE_DIR).join(CACHE_FILE),
        }
    }

    /// Source reading documents relative to the vault root.
    pub fn source(&self) -> FsDocumentSource {
        FsDocumentSource::new(&self.root)
    }

    /// Check if a vault-relative path should be excluded.
    pub fn should_exclude(&self, relative: &str) -> bool {
        self.config.exclude_patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern).is_ok_and(|glob| glob.matches(relative))
        })
    }

    fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
    }

    /// List every document in the vault, sorted by path.
    ///
    /// Paths are relative to the root and use `/` separators.
    pub fn scan(&self) -> Vec<DocumentMeta> {
        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX));

        let mut documents = Vec::new();
        for entry in walker.into_iter().filter_map(std::result::Result::ok) {
            if !entry.file_type().is_file() || !self.is_document(entry.path()) {
                continue;
            }

            let Some(relative) = relative_path(&self.root, entry.path()) else {
                continue;
            };
            if self.should_exclude(&relative) {
                continue;
            }

            let modified = match entry.metadata().map(|m| m.modified()) {
                Ok(Ok(time)) => DateTime::<Utc>::from(time),
                _ => {
                    warn!("No modification time for {relative}, skipping");
                    continue;
                }
            };

            documents.push(DocumentMeta::new(relative, modified));
        }

        documents.sort_by(|a, b| a.path.cmp(&b.path));
        info!("Found {} documents in {}", documents.len(), self.root.display());
        documents
    }

    /// Manual links and tags of every document.
    ///
    /// Unreadable documents are logged and skipped.
    pub async fn links(&self, documents: &[DocumentMeta]) -> Result<Vec<GraphLink>> {
        let resolver = LinkResolver::new(documents);
        let extractor = LinkExtractor::new()?;
        let source = self.source();

        let mut links = Vec::new();
        for doc in documents {
            match source.read(doc).await {
                Ok(content) => links.extend(extractor.extract(&doc.path, &content, &resolver)),
                Err(e) => warn!("Skipping links of {}: {e}", doc.path),
            }
        }

        debug!("Extracted {} manual and tag links", links.len());
        Ok(links)
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// Resolves link targets to document paths.
#[derive(Debug, Default)]
pub struct LinkResolver {
    paths: HashSet<String>,
    by_stem: HashMap<String, String>,
}

impl LinkResolver {
    /// Index the given documents.
    pub fn new(documents: &[DocumentMeta]) -> Self {
        let mut resolver = Self::default();
        for doc in documents {
            resolver.paths.insert(doc.path.clone());
            // First document in path order wins a stem collision.
            resolver
                .by_stem
                .entry(doc.name().to_lowercase())
                .or_insert_with(|| doc.path.clone());
        }
        resolver
    }

    /// Resolve a `[[wiki link]]` target: a vault path (with or without the
    /// extension) or a note name.
    pub fn resolve_wiki(&self, target: &str) -> Option<String> {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }
        if self.paths.contains(target) {
            return Some(target.to_string());
        }
        let with_ext = format!("{target}.md");
        if self.paths.contains(&with_ext) {
            return Some(with_ext);
        }
        let stem = target.rsplit('/').next().unwrap_or(target).to_lowercase();
        self.by_stem.get(&stem).cloned()
    }

    /// Resolve a relative markdown link from the document at `from`.
    pub fn resolve_relative(&self, from: &str, target: &str) -> Option<String> {
        let target = target.replace("%20", " ");
        let mut parts: Vec<&str> = if target.starts_with('/') {
            Vec::new()
        } else {
            let mut dir: Vec<&str> = from.split('/').collect();
            dir.pop();
            dir
        };

        for segment in target.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop()?;
                }
                other => parts.push(other),
            }
        }

        let path = parts.join("/");
        self.paths.contains(&path).then_some(path)
    }
}

/// Pulls manual links and tags out of markdown.
#[derive(Debug)]
pub struct LinkExtractor {
    wiki: Regex,
    markdown: Regex,
    tag: Regex,
}

impl LinkExtractor {
    /// Compile the link patterns.
    pub fn new() -> Result<Self> {
        Ok(Self {
            wiki: Regex::new(r"!?\[\[([^\]|#]+)(?:#[^\]|]*)?(?:\|[^\]]*)?\]\]")?,
            markdown: Regex::new(r"\[[^\]]*\]\(([^)\s#]+\.md)(?:#[^)]*)?\)")?,
            tag: Regex::new(r"(?:^|\s)#([A-Za-z][\w/-]*)")?,
        })
    }

    /// Links and tags found in `content`, in order, without duplicates.
    ///
    /// Text inside code fences is ignored. Links to unknown documents and
    /// self-links are dropped.
    pub fn extract(&self, path: &str, content: &str, resolver: &LinkResolver) -> Vec<GraphLink> {
        let mut links = Vec::new();
        let mut seen_targets = HashSet::new();
        let mut seen_tags = HashSet::new();
        let mut in_fence = false;

        for line in strip_front_matter(content).lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }

            let wiki = self
                .wiki
                .captures_iter(line)
                .filter_map(|c| c.get(1))
                .filter_map(|m| resolver.resolve_wiki(m.as_str()));
            let markdown = self
                .markdown
                .captures_iter(line)
                .filter_map(|c| c.get(1))
                .filter(|m| !m.as_str().contains("://"))
                .filter_map(|m| resolver.resolve_relative(path, m.as_str()));

            for target in wiki.chain(markdown) {
                if target != path && seen_targets.insert(target.clone()) {
                    links.push(GraphLink::Manual {
                        source: path.to_string(),
                        target,
                    });
                }
            }

            for tag in self.tag.captures_iter(line).filter_map(|c| c.get(1)) {
                let tag = tag.as_str().to_string();
                if seen_tags.insert(tag.clone()) {
                    links.push(GraphLink::Tag {
                        note: path.to_string(),
                        tag,
                    });
                }
            }
        }

        links
    }
}
