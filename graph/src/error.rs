//! Error types for graph building.

use thiserror::Error;

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while building a similarity graph.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Invalid configuration value.
    #[error("invalid graph configuration: {0}")]
    InvalidConfig(String),
}
