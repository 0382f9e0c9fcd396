//! Core mesh types for surface binding.
//!
//! This crate provides the foundational single-precision types shared by the
//! spatial, RBF and binding crates:
//!
//! - [`MeshSource`] - Read-only capability over one LOD of a sectioned mesh
//! - [`SurfaceMesh`] - Owned implementation of [`MeshSource`]
//! - [`MeshSection`] - Contiguous triangle range sharing a material
//! - [`RootSet`] - Points to bind onto a surface
//! - [`Triangle`] - A concrete triangle with vertex positions
//! - [`Aabb`] - Axis-aligned bounding box
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//! - CLI tools
//! - Asset build pipelines
//! - Servers
//! - Other game engines
//!
//! # Precision
//!
//! All coordinates are `f32`, matching GPU vertex buffers and the persisted
//! binding records built from them.
//!
//! # Example
//!
//! ```
//! use mesh_types::{unit_square, MeshBounds, MeshSource, Point3};
//!
//! let mesh = unit_square();
//! assert_eq!(mesh.section_count(), 1);
//! assert_eq!(mesh.triangle_vertex_indices(0, 1), Some([0, 2, 3]));
//! assert_eq!(mesh.bounds().max, Point3::new(1.0, 1.0, 0.0));
//! ```
//!
//! # Quality Standards
//!
//! This crate maintains A-grade standards:
//! - ≥90% test coverage
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod bounds;
mod mesh;
mod roots;
mod section;
mod traits;
mod triangle;

// Re-export core types
pub use bounds::Aabb;
pub use mesh::{SurfaceMesh, subdivided_square, unit_square};
pub use roots::RootSet;
pub use section::MeshSection;
pub use traits::{MeshBounds, MeshSource};
pub use triangle::{DEGENERATE_EDGE_LENGTH_SQUARED, Triangle};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector2, Vector3};
