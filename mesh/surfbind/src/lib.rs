//! Binding hair roots to deforming, multi-LOD surface meshes.
//!
//! This umbrella crate re-exports the surfbind crates, providing a unified API
//! from mesh access to the persisted binding data. All crates are Layer 0
//! (zero Bevy dependencies) and can be used in asset pipelines, CLI tools, or
//! servers.
//!
//! # Quick Start
//!
//! ```
//! use surfbind::prelude::*;
//!
//! // A body mesh with two LODs and a few guide roots on it
//! let lods = [subdivided_square(8), subdivided_square(2)];
//! let guides = RootSet::new(vec![
//!     Point3::new(0.25, 0.25, 0.0),
//!     Point3::new(0.75, 0.5, 0.0),
//!     Point3::new(0.5, 0.9, 0.0),
//! ]);
//!
//! let binding = build_binding(&BindingInput::new(&lods, &guides), &BindingParams::default()).unwrap();
//!
//! // Replay a lift of the finest LOD on its guide roots
//! let lod = binding.lod(0).unwrap();
//! let lifted = lods[0].translated(Vector3::new(0.0, 0.0, 1.0));
//! let deformations = lod.samples.deformations(&lifted.positions);
//! let moved = deformations.deform_point(&guides.positions()[0]);
//! assert!((moved.z - 1.0).abs() < 2e-2);
//! ```
//!
//! # Module Organization
//!
//! ## Foundation
//! - [`types`] - Mesh access: `MeshSource`, `SurfaceMesh`, `MeshSection`, `RootSet`, `Aabb`
//! - [`spatial`] - Uniform triangle grids in 3-D and UV space, closest point on triangle
//!
//! ## Deformation
//! - [`rbf`] - Farthest-point sampling, RBF weights, two-stage deformation, mesh resizing
//!
//! ## Binding
//! - [`binding`] - UV transfer, attribute transfer, root projection, packing, build orchestration

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

// =============================================================================
// Re-exports
// =============================================================================

/// Mesh access: `MeshSource`, `SurfaceMesh`, `MeshSection`, `RootSet`, `Aabb`.
pub use mesh_types as types;

/// Uniform triangle grids in 3-D and UV space.
pub use bind_spatial as spatial;

/// Farthest-point sampling, RBF weights and deformation.
pub use mesh_rbf as rbf;

/// Root projection, transfers, packing and the binding build.
pub use mesh_binding as binding;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for building and replaying bindings.
///
/// # Usage
///
/// ```
/// use surfbind::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use mesh_types::{
        Aabb, MeshBounds, MeshSection, MeshSource, Point3, RootSet, SurfaceMesh, Vector2, Vector3,
        subdivided_square, unit_square,
    };

    // Deformation
    pub use mesh_rbf::{RbfParams, ResizeParams, SampleDeformations, resize_mesh};

    // Binding (main use case)
    pub use mesh_binding::{
        BindingData, BindingError, BindingInput, BindingParams, LodBinding, RootProjection,
        build_binding,
    };
}

// =============================================================================
// Tests
// =============================================================================
