//! Error types for quadlayout.
//!
//! Only failures that make the whole request meaningless surface as
//! [`LayoutError`]. Problems local to one edge, group, or separatrix are
//! contained by the pipeline and reported through
//! [`Diagnostics`](crate::algo::diagnostics::Diagnostics) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`LayoutError`].
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors that can occur while building a surface or running the layout pipeline.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// An edge has more than two incident faces.
    #[error("edge ({v0}, {v1}) has more than two incident faces")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// A curve references vertices that are not connected by mesh edges.
    #[error("curve {curve} is not a chain of mesh edges: ({v0}, {v1}) is not an edge")]
    BrokenCurve {
        /// The curve index.
        curve: usize,
        /// First vertex of the missing edge.
        v0: usize,
        /// Second vertex of the missing edge.
        v1: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// The linear solver failed to converge.
    #[error("linear solver failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
    },
}

impl LayoutError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        LayoutError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_param_message() {
        let err = LayoutError::invalid_param("convergence_tol", -1.0, "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid parameter: convergence_tol = -1 (must be positive)"
        );
    }

    #[test]
    fn test_non_manifold_message() {
        let err = LayoutError::NonManifoldEdge { v0: 3, v1: 7 };
        assert!(err.to_string().contains("(3, 7)"));
    }
}
