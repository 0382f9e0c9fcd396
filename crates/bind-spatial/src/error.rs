//! Error types for spatial operations.

use mesh_types::Aabb;

/// Errors that can occur while building a spatial grid.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SpatialError {
    /// The bounds are empty or contain non-finite coordinates.
    #[error("grid bounds are empty or not finite: {bounds:?}")]
    InvalidBounds {
        /// The rejected bounds.
        bounds: Aabb,
    },

    /// The cell size must be positive and finite.
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),

    /// The grid resolution must be at least one cell per axis.
    #[error("grid resolution must be at least 1, got {0}")]
    InvalidResolution(u32),
}

/// Result type for spatial operations.
pub type SpatialResult<T> = Result<T, SpatialError>;
