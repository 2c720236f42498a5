//! Sparse similarity graph construction.
//!
//! Every unordered pair of documents is scored once. Pairs below the global
//! threshold are dropped, then each node keeps only its strongest candidates
//! (optionally raising its own bar when it has many of them). A pair kept by
//! either endpoint becomes one undirected edge.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vaultgraph_embeddings::{Embedding, cosine_similarity};

use crate::config::{DYNAMIC_PRUNING_MIN_CANDIDATES, DYNAMIC_PRUNING_SIGMA_WEIGHT, GraphConfig};
use crate::error::Result;
use crate::link::{ExcludedPairs, GraphLink, SimilarityEdge};

/// A scored pair that passed the global threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityCandidate<'a> {
    /// Endpoint that sorts first.
    pub a: &'a str,

    /// Endpoint that sorts second.
    pub b: &'a str,

    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
}

impl<'a> SimilarityCandidate<'a> {
    /// The endpoint that is not `node`.
    pub fn other(&self, node: &str) -> &'a str {
        if self.a == node { self.b } else { self.a }
    }
}

/// Candidates grouped by node.
#[derive(Debug, Clone, Default)]
pub struct Candidates<'a> {
    /// Each candidate appears in both of its endpoints' lists.
    pub by_node: BTreeMap<&'a str, Vec<SimilarityCandidate<'a>>>,

    /// Distinct pairs that passed the threshold.
    pub pairs: usize,

    /// Pairs skipped because their dimensions differ.
    pub skipped_pairs: usize,
}

/// Score every unordered pair that is not excluded and keep those at or
/// above `threshold`.
pub fn build_candidates<'a>(
    vectors: &'a BTreeMap<String, Embedding>,
    excluded: &ExcludedPairs,
    threshold: f32,
) -> Candidates<'a> {
    let nodes: Vec<(&str, &[f32])> = vectors
        .iter()
        .map(|(path, vector)| (path.as_str(), vector.as_slice()))
        .collect();

    let mut candidates = Candidates::default();

    for (i, &(a, va)) in nodes.iter().enumerate() {
        for &(b, vb) in &nodes[i + 1..] {
            if excluded.contains(a, b) {
                continue;
            }

            let similarity = match cosine_similarity(va, vb) {
                Ok(similarity) => similarity,
                Err(e) => {
                    debug!("Skipping pair ({a}, {b}): {e}");
                    candidates.skipped_pairs += 1;
                    continue;
                }
            };

            if similarity >= threshold {
                let candidate = SimilarityCandidate { a, b, similarity };
                candidates.by_node.entry(a).or_default().push(candidate);
                candidates.by_node.entry(b).or_default().push(candidate);
                candidates.pairs += 1;
            }
        }
    }

    candidates
}

/// Select the candidates a node keeps, strongest first.
pub fn prune_node<'a>(
    node: &str,
    mut candidates: Vec<SimilarityCandidate<'a>>,
    config: &GraphConfig,
) -> Vec<SimilarityCandidate<'a>> {
    let effective = effective_threshold(&candidates, config);

    candidates.retain(|c| c.similarity >= effective);
    candidates.sort_by(|x, y| {
        OrderedFloat(y.similarity)
            .cmp(&OrderedFloat(x.similarity))
            .then_with(|| x.other(node).cmp(y.other(node)))
    });
    if config.max_links_per_node > 0 {
        candidates.truncate(config.max_links_per_node);
    }
    candidates
}

/// Per-node threshold: `max(threshold, μ + 0.35·σ)` once a node has enough
/// candidates for the distribution to mean anything.
fn effective_threshold(candidates: &[SimilarityCandidate<'_>], config: &GraphConfig) -> f32 {
    if !config.dynamic_pruning || candidates.len() < DYNAMIC_PRUNING_MIN_CANDIDATES {
        return config.threshold;
    }

    let n = candidates.len() as f64;
    let mean = candidates.iter().map(|c| f64::from(c.similarity)).sum::<f64>() / n;
    let variance = candidates
        .iter()
        .map(|c| (f64::from(c.similarity) - mean).powi(2))
        .sum::<f64>()
        / n;
    let dynamic = mean + DYNAMIC_PRUNING_SIGMA_WEIGHT * variance.sqrt();

    config.threshold.max(dynamic as f32)
}

/// Counters describing one graph build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Documents with a vector.
    pub nodes: usize,

    /// Pairs that passed the global threshold.
    pub candidates: usize,

    /// Pairs skipped because of a dimension mismatch.
    pub skipped_pairs: usize,

    /// Edges emitted.
    pub edges: usize,
}

/// The result of a graph build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityGraph {
    /// Undirected edges, sorted by endpoints.
    pub edges: Vec<SimilarityEdge>,

    /// Build counters.
    pub stats: GraphStats,
}

impl SimilarityGraph {
    /// Convert the edges into graph links.
    pub fn into_links(self) -> Vec<GraphLink> {
        self.edges.into_iter().map(GraphLink::Similarity).collect()
    }

    /// Edges touching `path`.
    pub fn edges_of<'a>(
        &'a self,
        path: &'a str,
    ) -> impl Iterator<Item = &'a SimilarityEdge> + 'a {
        self.edges.iter().filter(move |e| e.a == path || e.b == path)
    }
}

/// Builds sparse similarity graphs from a vector snapshot.
#[derive(Debug, Clone, Default)]
pub struct SimilarityGraphBuilder {
    config: GraphConfig,
}

impl SimilarityGraphBuilder {
    /// Create a builder with the given configuration.
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// The builder's configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Build the graph over `vectors`, never linking an excluded pair.
    ///
    /// Fails only on invalid configuration, before any work is done.
    pub fn build(
        &self,
        vectors: &BTreeMap<String, Embedding>,
        excluded: &ExcludedPairs,
    ) -> Result<SimilarityGraph> {
        self.config.validate()?;

        let candidates = build_candidates(vectors, excluded, self.config.threshold);

        let mut accepted: BTreeMap<(&str, &str), f32> = BTreeMap::new();
        for (node, list) in candidates.by_node {
            for candidate in prune_node(node, list, &self.config) {
                accepted.insert((candidate.a, candidate.b), candidate.similarity);
            }
        }

        let edges: Vec<SimilarityEdge> = accepted
            .into_iter()
            .map(|((a, b), similarity)| SimilarityEdge {
                a: a.to_string(),
                b: b.to_string(),
                similarity,
                thickness: self.config.thickness(similarity),
            })
            .collect();

        let stats = GraphStats {
            nodes: vectors.len(),
            candidates: candidates.pairs,
            skipped_pairs: candidates.skipped_pairs,
            edges: edges.len(),
        };

        info!(
            "Built similarity graph: {} nodes, {} candidates, {} edges",
            stats.nodes, stats.candidates, stats.edges
        );
        if stats.skipped_pairs > 0 {
            debug!("Skipped {} pairs with mismatched dimensions", stats.skipped_pairs);
        }

        Ok(SimilarityGraph { edges, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use pretty_assertions::assert_eq;

    fn vectors(entries: &[(&str, Vec<f32>)]) -> BTreeMap<String, Embedding> {
        entries
            .iter()
            .map(|(path, v)| ((*path).to_string(), v.clone()))
            .collect()
    }

    /// Unit vector at `degrees` in the plane.
    fn at(degrees: f32) -> Vec<f32> {
        let radians = degrees.to_radians();
        vec![radians.cos(), radians.sin()]
    }

    #[test]
    fn test_identical_vectors_form_single_edge() {
        let vectors = vectors(&[
            ("A", vec![1.0, 0.0]),
            ("B", vec![1.0, 0.0]),
            ("C", vec![0.0, 1.0]),
        ]);
        let builder = SimilarityGraphBuilder::new(GraphConfig::default().with_threshold(0.5));

        let graph = builder.build(&vectors, &ExcludedPairs::new()).unwrap();

        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!((edge.a.as_str(), edge.b.as_str()), ("A", "B"));
        assert_eq!(edge.similarity, 1.0);
        assert_eq!(
            graph.stats,
            GraphStats {
                nodes: 3,
                candidates: 1,
                skipped_pairs: 0,
                edges: 1,
            }
        );
    }

    #[test]
    fn test_excluded_pairs_never_linked() {
        let vectors = vectors(&[("A", vec![1.0, 0.0]), ("B", vec![1.0, 0.0])]);
        let mut excluded = ExcludedPairs::new();
        excluded.insert("B", "A");

        let graph = SimilarityGraphBuilder::default()
            .build(&vectors, &excluded)
            .unwrap();
        assert!(graph.edges.is_empty());
        assert_eq!(graph.stats.candidates, 0);
    }

    #[test]
    fn test_degree_cap_keeps_strongest() {
        // A-B is about 0.9, A-C about 0.8, B-C well below the threshold.
        let angle_b = 0.9f32.acos().to_degrees();
        let angle_c = -0.8f32.acos().to_degrees();
        let vectors: BTreeMap<String, Embedding> = [
            ("A".to_string(), at(0.0)),
            ("B".to_string(), at(angle_b)),
            ("C".to_string(), at(angle_c)),
        ]
        .into_iter()
        .collect();

        let config = GraphConfig::default()
            .with_threshold(0.5)
            .with_max_links_per_node(1)
            .without_dynamic_pruning();
        let candidates = build_candidates(&vectors, &ExcludedPairs::new(), 0.5);
        let kept = prune_node("A", candidates.by_node["A"].clone(), &config);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].other("A"), "B");

        // C's only candidate is A, so C selects it and the pair survives.
        let graph = SimilarityGraphBuilder::new(config)
            .build(&vectors, &ExcludedPairs::new())
            .unwrap();
        let pairs: Vec<(&str, &str)> = graph
            .edges
            .iter()
            .map(|e| (e.a.as_str(), e.b.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "B"), ("A", "C")]);
    }

    #[test]
    fn test_pair_rejected_by_both_endpoints_is_dropped() {
        // Hub H is close to X and Y; X and Y are close to each other.
        let vectors: BTreeMap<String, Embedding> = [
            ("H".to_string(), at(0.0)),
            ("X".to_string(), at(10.0)),
            ("Y".to_string(), at(15.0)),
        ]
        .into_iter()
        .collect();
        let config = GraphConfig::default()
            .with_threshold(0.5)
            .with_max_links_per_node(1)
            .without_dynamic_pruning();

        let graph = SimilarityGraphBuilder::new(config)
            .build(&vectors, &ExcludedPairs::new())
            .unwrap();
        let pairs: Vec<(&str, &str)> = graph
            .edges
            .iter()
            .map(|e| (e.a.as_str(), e.b.as_str()))
            .collect();
        // H keeps X, X keeps Y, Y keeps X: (H, Y) is chosen by nobody.
        assert_eq!(pairs, vec![("H", "X"), ("X", "Y")]);
    }

    #[test]
    fn test_dynamic_pruning_raises_threshold() {
        let node = "N";
        let list: Vec<SimilarityCandidate<'_>> = [("a", 0.95), ("b", 0.9), ("c", 0.6), ("d", 0.55)]
            .into_iter()
            .map(|(other, similarity)| SimilarityCandidate {
                a: node,
                b: other,
                similarity,
            })
            .collect();

        // μ = 0.75, σ ≈ 0.180, effective ≈ 0.813
        let config = GraphConfig::default()
            .with_threshold(0.5)
            .with_max_links_per_node(0);
        let kept: Vec<&str> = prune_node(node, list.clone(), &config)
            .iter()
            .map(|c| c.other(node))
            .collect();
        assert_eq!(kept, vec!["a", "b"]);

        let plain = config.without_dynamic_pruning();
        assert_eq!(prune_node(node, list.clone(), &plain).len(), 4);

        // Fewer than four candidates: threshold unchanged.
        let dynamic = GraphConfig::default().with_threshold(0.5);
        assert_eq!(prune_node(node, list[..3].to_vec(), &dynamic).len(), 3);
    }

    #[test]
    fn test_dimension_mismatch_skips_only_that_pair() {
        let vectors = vectors(&[
            ("A", vec![1.0, 0.0]),
            ("B", vec![1.0, 0.0]),
            ("C", vec![1.0, 0.0, 0.0]),
        ]);
        let graph = SimilarityGraphBuilder::new(GraphConfig::default().with_threshold(0.5))
            .build(&vectors, &ExcludedPairs::new())
            .unwrap();

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.stats.skipped_pairs, 2);
    }

    #[test]
    fn test_invalid_config_fails_whole_build() {
        let vectors = vectors(&[("A", vec![1.0, 0.0]), ("B", vec![1.0, 0.0])]);
        let builder = SimilarityGraphBuilder::new(GraphConfig::default().with_threshold(0.0));
        assert!(matches!(
            builder.build(&vectors, &ExcludedPairs::new()),
            Err(GraphError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_vector_has_no_edges() {
        let vectors = vectors(&[("A", vec![0.0, 0.0]), ("B", vec![1.0, 0.0])]);
        let graph = SimilarityGraphBuilder::default()
            .build(&vectors, &ExcludedPairs::new())
            .unwrap();
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_into_links() {
        let vectors = vectors(&[("A", vec![1.0, 0.0]), ("B", vec![1.0, 0.0])]);
        let graph = SimilarityGraphBuilder::default()
            .build(&vectors, &ExcludedPairs::new())
            .unwrap();
        assert_eq!(graph.edges_of("B").count(), 1);

        let links = graph.into_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind(), "similarity");
    }
}
