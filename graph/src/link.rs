//! Links between documents.
//!
//! Manual and tag links come from the host; similarity links are derived by
//! the [`SimilarityGraphBuilder`](crate::SimilarityGraphBuilder).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// An undirected similarity edge between two documents.
///
/// `a` always sorts before `b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    /// First endpoint.
    pub a: String,

    /// Second endpoint.
    pub b: String,

    /// Cosine similarity of the two embeddings.
    pub similarity: f32,

    /// Visual weight derived from the similarity.
    pub thickness: f32,
}

/// A link in the document graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphLink {
    /// A link written by the author.
    Manual { source: String, target: String },
    /// A note carrying a tag.
    Tag { note: String, tag: String },
    /// A derived semantic similarity.
    Similarity(SimilarityEdge),
}

impl GraphLink {
    /// Get a string representation of the link kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Manual { .. } => "manual",
            Self::Tag { .. } => "tag",
            Self::Similarity(_) => "similarity",
        }
    }
}

/// Order-independent key for an unordered document pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(String, String);

impl PairKey {
    /// Create the key for `{a, b}`.
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    /// Endpoints in sorted order.
    pub fn endpoints(&self) -> (&str, &str) {
        (&self.0, &self.1)
    }
}

/// Document pairs that must not receive a similarity edge.
#[derive(Debug, Clone, Default)]
pub struct ExcludedPairs {
    pairs: HashSet<PairKey>,
}

impl ExcludedPairs {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude every pair joined by a manual link.
    pub fn from_links<'a>(links: impl IntoIterator<Item = &'a GraphLink>) -> Self {
        let mut excluded = Self::new();
        for link in links {
            if let GraphLink::Manual { source, target } = link {
                excluded.insert(source, target);
            }
        }
        excluded
    }

    /// Exclude the pair `{a, b}`.
    pub fn insert(&mut self, a: &str, b: &str) -> bool {
        self.pairs.insert(PairKey::new(a, b))
    }

    /// Whether `{a, b}` is excluded, in either order.
    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.pairs.contains(&PairKey::new(a, b))
    }

    /// Number of excluded pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
