//! Configuration for the similarity graph builder.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Candidates a node needs before dynamic pruning kicks in.
pub const DYNAMIC_PRUNING_MIN_CANDIDATES: usize = 4;

/// Weight of the standard deviation in the dynamic threshold `μ + k·σ`.
pub const DYNAMIC_PRUNING_SIGMA_WEIGHT: f64 = 0.35;

/// Configuration for building a similarity graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Minimum cosine similarity for a pair to be considered at all.
    pub threshold: f32,

    /// Maximum edges each node selects (0 = unbounded).
    pub max_links_per_node: usize,

    /// Raise each node's threshold based on its own candidate distribution.
    pub dynamic_pruning: bool,

    /// Edge thickness at the threshold.
    pub min_thickness: f32,

    /// Edge thickness at similarity 1.
    pub max_thickness: f32,
}

impl GraphConfig {
    /// Set the similarity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the per-node degree cap.
    pub fn with_max_links_per_node(mut self, max: usize) -> Self {
        self.max_links_per_node = max;
        self
    }

    /// Disable dynamic pruning.
    pub fn without_dynamic_pruning(mut self) -> Self {
        self.dynamic_pruning = false;
        self
    }

    /// Set the thickness range.
    pub fn with_thickness(mut self, min: f32, max: f32) -> Self {
        self.min_thickness = min;
        self.max_thickness = max;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(GraphError::InvalidConfig(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if !self.min_thickness.is_finite() || !self.max_thickness.is_finite() {
            return Err(GraphError::InvalidConfig(
                "thickness bounds must be finite".to_string(),
            ));
        }
        if self.min_thickness > self.max_thickness {
            return Err(GraphError::InvalidConfig(format!(
                "min_thickness {} exceeds max_thickness {}",
                self.min_thickness, self.max_thickness
            )));
        }
        Ok(())
    }

    /// Visual weight of an edge with the given similarity.
    ///
    /// Linear from `min_thickness` at the threshold to `max_thickness` at 1.
    pub fn thickness(&self, similarity: f32) -> f32 {
        if self.threshold >= 1.0 {
            return self.min_thickness;
        }
        let t = (similarity - self.threshold) / (1.0 - self.threshold);
        self.min_thickness + t * (self.max_thickness - self.min_thickness)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            max_links_per_node: 5,
            dynamic_pruning: true,
            min_thickness: 1.0,
            max_thickness: 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        GraphConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_ranges() {
        for threshold in [0.0, -0.5, 1.5, f32::NAN] {
            let config = GraphConfig::default().with_threshold(threshold);
            assert!(config.validate().is_err(), "threshold {threshold}");
        }
        assert!(GraphConfig::default().with_threshold(1.0).validate().is_ok());

        let inverted = GraphConfig::default().with_thickness(3.0, 1.0);
        assert!(matches!(inverted.validate(), Err(GraphError::InvalidConfig(_))));
    }

    #[test]
    fn test_thickness() {
        let config = GraphConfig::default()
            .with_threshold(0.5)
            .with_thickness(1.0, 3.0);
        assert_eq!(config.thickness(0.5), 1.0);
        assert_eq!(config.thickness(0.75), 2.0);
        assert_eq!(config.thickness(1.0), 3.0);

        let exact = config.with_threshold(1.0);
        assert_eq!(exact.thickness(1.0), 1.0);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: GraphConfig = serde_json::from_str(r#"{"threshold": 0.6}"#).unwrap();
        assert_eq!(config.threshold, 0.6);
        assert_eq!(config.max_links_per_node, 5);
    }
}
