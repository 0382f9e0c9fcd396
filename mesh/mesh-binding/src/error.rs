//! Error types for binding builds.

use std::fmt;

use bind_spatial::SpatialError;
use thiserror::Error;

/// The step of [`build_binding`](crate::build_binding) that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStage {
    /// Checking the input meshes and LOD range.
    Validation,
    /// Retargeting target positions through the source mesh's UVs.
    Transfer,
    /// Propagating the binding attribute between LODs.
    AttributeTransfer,
    /// Projecting roots onto the target surface.
    Projection,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Transfer => "transfer",
            Self::AttributeTransfer => "attribute transfer",
            Self::Projection => "projection",
        };
        f.write_str(name)
    }
}

/// Which mesh of a transfer is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshRole {
    /// The mesh the roots were authored on.
    Source,
    /// The mesh being bound to.
    Target,
}

impl fmt::Display for MeshRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Target => "target",
        })
    }
}

/// Errors that abort a binding build.
///
/// Every variant identifies the LOD it concerns; [`BindingError::stage`]
/// names the build step.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindingError {
    /// The target mesh has no LODs.
    #[error("target mesh has no LODs")]
    NoLods,

    /// The minimum target LOD is past the last LOD.
    #[error("minimum target LOD {min_lod} is out of range for {lod_count} LODs")]
    InvalidMinLod {
        /// Requested minimum LOD.
        min_lod: usize,
        /// Number of target LODs.
        lod_count: usize,
    },

    /// The requested source LOD does not exist.
    #[error("source mesh LOD {lod} is not valid")]
    InvalidSourceLod {
        /// Requested source LOD.
        lod: usize,
    },

    /// A LOD has no vertices.
    #[error("{role} mesh LOD {lod} has no vertices")]
    EmptyLod {
        /// Which mesh.
        role: MeshRole,
        /// Offending LOD.
        lod: usize,
    },

    /// A mesh LOD has no sections.
    #[error("{stage} failed for LOD {lod}: mesh has no sections")]
    NoSections {
        /// Failing step.
        stage: BuildStage,
        /// Offending LOD.
        lod: usize,
    },

    /// UV data is missing or degenerate.
    #[error("transfer failed for LOD {lod}: the {role} mesh is missing or has invalid UVs")]
    MissingUvs {
        /// Which mesh lacks usable UVs.
        role: MeshRole,
        /// Target LOD being transferred.
        lod: usize,
    },

    /// No triangle could be inserted into the projection grid.
    #[error("projection failed for LOD {lod}: no bindable triangle overlaps the grid, the target mesh could be missing UVs")]
    EmptyGrid {
        /// Offending LOD.
        lod: usize,
    },

    /// A root found no candidate triangle.
    #[error("projection failed for LOD {lod}: root {root} is not close enough to the mesh to be projected")]
    RootOutsideMesh {
        /// Offending LOD.
        lod: usize,
        /// Index of the first root that failed.
        root: usize,
    },

    /// The mesh exceeds what the packed triangle id can address.
    #[error("LOD {lod} has {count} {what}, more than the packed format limit of {limit}")]
    FormatLimit {
        /// Offending LOD.
        lod: usize,
        /// `"sections"`, `"triangles"` or `"vertices"`.
        what: &'static str,
        /// Actual count.
        count: usize,
        /// Maximum supported count.
        limit: usize,
    },

    /// The grid could not be allocated over the computed bounds.
    #[error("{stage} failed for LOD {lod}: {source}")]
    Spatial {
        /// Failing step.
        stage: BuildStage,
        /// Offending LOD.
        lod: usize,
        /// Underlying grid error.
        #[source]
        source: SpatialError,
    },
}

impl BindingError {
    /// The build step that produced this error.
    #[must_use]
    pub const fn stage(&self) -> BuildStage {
        match self {
            Self::NoLods
            | Self::InvalidMinLod { .. }
            | Self::InvalidSourceLod { .. }
            | Self::EmptyLod { .. }
            | Self::FormatLimit { .. } => BuildStage::Validation,
            Self::MissingUvs { .. } => BuildStage::Transfer,
            Self::EmptyGrid { .. } | Self::RootOutsideMesh { .. } => BuildStage::Projection,
            Self::NoSections { stage, .. } | Self::Spatial { stage, .. } => *stage,
        }
    }
}

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BindingError::MissingUvs {
            role: MeshRole::Target,
            lod: 2,
        };
        assert!(format!("{err}").contains("target mesh is missing"));
        assert!(format!("{err}").contains("LOD 2"));
        assert_eq!(err.stage(), BuildStage::Transfer);

        let err = BindingError::RootOutsideMesh { lod: 0, root: 17 };
        assert!(format!("{err}").contains("root 17"));
        assert_eq!(err.stage(), BuildStage::Projection);

        let err = BindingError::NoSections {
            stage: BuildStage::AttributeTransfer,
            lod: 1,
        };
        assert!(format!("{err}").starts_with("attribute transfer failed"));
        assert_eq!(err.stage(), BuildStage::AttributeTransfer);

        let err = BindingError::FormatLimit {
            lod: 0,
            what: "sections",
            count: 300,
            limit: 255,
        };
        assert!(format!("{err}").contains("300 sections"));
        assert_eq!(err.stage(), BuildStage::Validation);
    }

    #[test]
    fn spatial_errors_keep_their_source() {
        let err = BindingError::Spatial {
            stage: BuildStage::Projection,
            lod: 3,
            source: SpatialError::InvalidCellSize(0.0),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.stage(), BuildStage::Projection);
    }
}
