//! Binding hair roots to the surface of a sectioned, multi-LOD mesh.
//!
//! For every target LOD this crate finds the triangle and barycentric
//! coordinates each root sits on, and solves a small RBF deformation that
//! lets a runtime carry the roots along when the mesh moves:
//!
//! - [`build_binding`] - Runs the whole build over all LODs
//! - [`transfer_positions`] - Moves target vertices onto a source mesh through shared UVs
//! - [`transfer_attribute`] - Fills the binding attribute on LODs that lack it
//! - [`project_roots`] - Closest-triangle projection with a unique-triangle table
//! - [`compute_sample_weights`] - RBF samples over the global or local mask
//! - [`pack_triangle_index`], [`pack_barycentrics`], [`pack_normal`] - Persisted encodings
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with zero Bevy dependencies.
//!
//! # Packed Formats
//!
//! Triangle ids pack the section into the high 8 bits and the section-local
//! triangle into the low 24, so a LOD may have at most [`MAX_SECTION_COUNT`]
//! sections of at most [`MAX_TRIANGLE_COUNT`] triangles each. Barycentrics
//! and UVs are stored as two half floats; normals as three 10-bit unsigned
//! components.
//!
//! # Quick Start
//!
//! ```
//! use mesh_binding::{build_binding, BindingInput, BindingParams};
//! use mesh_types::{subdivided_square, Point3, RootSet};
//!
//! let lods = [subdivided_square(4), subdivided_square(2)];
//! let guides = RootSet::new(vec![
//!     Point3::new(0.2, 0.3, 0.05),
//!     Point3::new(0.7, 0.8, -0.05),
//! ]);
//!
//! let binding = build_binding(&BindingInput::new(&lods, &guides), &BindingParams::default()).unwrap();
//! assert_eq!(binding.lod_count(), 2);
//!
//! for lod in &binding.lods {
//!     let p = lod.guides.root_position(0).unwrap();
//!     assert!((p - Point3::new(0.2, 0.3, 0.0)).norm() < 1e-3);
//! }
//! ```
//!
//! # Quality Standards
//!
//! This crate maintains A-grade standards:
//! - ≥90% test coverage
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod attribute;
mod builder;
mod error;
mod packing;
mod params;
mod projection;
mod transfer;
mod weights;

pub use attribute::{ATTRIBUTE_BOUNDS_MARGIN, DEFAULT_ATTRIBUTE_VALUE, transfer_attribute};
pub use builder::{BindingData, BindingInput, LodBinding, build_binding};
pub use error::{BindingError, BindingResult, BuildStage, MeshRole};
pub use packing::{
    MAX_SECTION_COUNT, MAX_TRIANGLE_COUNT, MAX_VERTEX_COUNT, f16_bits_to_f32, f32_to_f16_bits, pack_barycentrics,
    pack_normal, pack_normal_to_float, pack_triangle_index, pack_uvs, pack_uvs_to_float,
    unpack_barycentrics, unpack_normal, unpack_triangle_index,
};
pub use params::BindingParams;
pub use projection::{
    ROOT_BOUNDS_MARGIN, RootBinding, RootProjection, UniqueTriangle, project_roots,
    projection_bounds,
};
pub use transfer::{MIN_UNIQUE_UV_FRACTION, TransferredLod, transfer_positions};
pub use weights::{SampleWeights, compute_sample_weights, global_sample_mask, local_sample_mask};
