//! Error types for RBF deformation.

use thiserror::Error;

/// Errors that can occur while building or applying an RBF deformation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RbfError {
    /// The mesh has no vertices.
    #[error("mesh has no vertices")]
    EmptyMesh,

    /// The rest and deformed meshes do not share a vertex order.
    #[error("rest mesh has {rest} vertices but deformed mesh has {deformed}")]
    VertexCountMismatch {
        /// Vertex count of the rest mesh.
        rest: usize,
        /// Vertex count of the deformed mesh.
        deformed: usize,
    },

    /// A persisted weight block does not match its sample count.
    #[error("expected {expected} weights for the sample count, got {actual}")]
    WeightCountMismatch {
        /// `M × (M + 4)` for the declared sample count.
        expected: usize,
        /// Number of weights supplied.
        actual: usize,
    },
}

/// Result type for RBF operations.
pub type RbfResult<T> = Result<T, RbfError>;
