//! # Graph
//!
//! Turns a snapshot of document embeddings into a sparse, bounded-degree
//! similarity graph.
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use vaultgraph_graph::{ExcludedPairs, GraphConfig, SimilarityGraphBuilder};
//!
//! let mut vectors = BTreeMap::new();
//! vectors.insert("a.md".to_string(), vec![1.0, 0.0]);
//! vectors.insert("b.md".to_string(), vec![0.9, 0.1]);
//!
//! let builder = SimilarityGraphBuilder::new(GraphConfig::default());
//! let graph = builder.build(&vectors, &ExcludedPairs::new()).unwrap();
//! println!("{} edges", graph.edges.len());
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod link;

pub use builder::{
    Candidates, GraphStats, SimilarityCandidate, SimilarityGraph, SimilarityGraphBuilder,
    build_candidates, prune_node,
};
pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use link::{ExcludedPairs, GraphLink, PairKey, SimilarityEdge};
