//! Spatial acceleration for surface binding.
//!
//! This crate provides the grids and closest-point queries that map points to
//! the nearest triangle of a mesh:
//!
//! - [`TriangleGrid`] - Uniform 3D grid of triangles with ring-expanding lookup
//! - [`UvGrid`] - Uniform 2D grid over `[0, 1]²` texture space
//! - [`closest_point_on_triangle`] - Closest point and barycentrics, in 2D or 3D
//! - [`GridTriangle`] and [`UvTriangle`] - Triangle records stored in cells
//! - [`CellCoord`] and [`UvCell`] - Integer cell coordinates
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//! - CLI tools
//! - Asset build pipelines
//! - Servers
//! - Other game engines
//!
//! # Lookup Model
//!
//! Both grids store a copy of each triangle in every cell its bounding box
//! overlaps. A query first checks the cell containing the point; if that cell
//! is empty it scans square rings of growing radius and stops at the first ring
//! holding any triangle. The closest triangle among those candidates wins, with
//! ties going to the first one met.
//!
//! Grids are filled single-threaded and then queried through `&self`, so a
//! built grid can be shared across worker threads.
//!
//! # Example
//!
//! ```
//! use bind_spatial::{GridTriangle, TriangleGrid};
//! use mesh_types::Aabb;
//! use nalgebra::Point3;
//!
//! let positions = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut grid = TriangleGrid::new(&Aabb::from_points(&positions)).unwrap();
//! grid.insert(GridTriangle::from_positions(0, 0, positions));
//!
//! let hit = grid.closest_triangle(&Point3::new(0.2, 0.2, 1.0)).unwrap();
//! assert!((hit.distance - 1.0).abs() < 1e-6);
//! assert!((hit.point.barycentric.sum() - 1.0).abs() < 1e-6);
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

mod cell;
mod closest;
mod error;
mod grid;
mod record;
mod uv_grid;

// Re-export core types
pub use cell::{CellCoord, UvCell};
pub use closest::{ClosestPoint, closest_point_on_triangle};
pub use error::{SpatialError, SpatialResult};
pub use grid::{GridHit, INITIAL_CELL_SIZE, MAX_CELL_COUNT, TriangleGrid, TriangleHit};
pub use record::{GridTriangle, UvTriangle};
pub use uv_grid::{DEFAULT_RESOLUTION, UvGrid, UvHit};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector3};
