//! Error types for the graph store.

use thiserror::Error;

/// Result type alias using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised by the graph store.
///
/// Code generation is deliberately total and never produces one of these:
/// a malformed or partially wired graph still compiles to syntactically
/// valid output. The graph store only fails when asked to instantiate a
/// node type the registry has never heard of, or when a serialized payload
/// cannot be decoded.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Node factory was asked for a type id with no registered definition.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// Serialized graph payload could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
