//! Triangle records stored in grid cells.
//!
//! Records are plain values; a triangle whose bounding box spans several cells
//! is copied into each of them.

use mesh_types::Triangle;
use nalgebra::{Point2, Point3, Vector2, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A mesh triangle as stored in a [`TriangleGrid`](crate::TriangleGrid).
///
/// `positions` are the positions the grid was built on (possibly retargeted
/// from another mesh); `rest_positions` always hold the mesh's own rest pose.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridTriangle {
    /// Triangle index within its section.
    pub triangle_index: u32,
    /// Section the triangle belongs to.
    pub section_index: u32,
    /// Absolute vertex indices.
    pub vertex_indices: [u32; 3],
    /// Positions used for spatial lookup.
    pub positions: [Point3<f32>; 3],
    /// The mesh's own rest positions.
    pub rest_positions: [Point3<f32>; 3],
    /// Vertex normals.
    pub normals: [Vector3<f32>; 3],
    /// Vertex texture coordinates.
    pub uvs: [Vector2<f32>; 3],
    /// Per-vertex binding attribute values.
    pub attributes: [f32; 3],
}

impl GridTriangle {
    /// A record with only geometry set; both position sets equal `positions`,
    /// normals are the face normal (`+Z` when degenerate), UVs zero and
    /// attributes one.
    #[must_use]
    pub fn from_positions(
        triangle_index: u32,
        section_index: u32,
        positions: [Point3<f32>; 3],
    ) -> Self {
        let normal = Triangle::from_vertices(positions)
            .normal()
            .unwrap_or_else(Vector3::z);
        Self {
            triangle_index,
            section_index,
            vertex_indices: [0, 1, 2],
            positions,
            rest_positions: positions,
            normals: [normal; 3],
            uvs: [Vector2::zeros(); 3],
            attributes: [1.0; 3],
        }
    }

    /// Barycentric blend of the attribute values.
    #[inline]
    #[must_use]
    pub fn interpolate_attribute(&self, barycentric: &Vector3<f32>) -> f32 {
        self.attributes[0] * barycentric.x
            + self.attributes[1] * barycentric.y
            + self.attributes[2] * barycentric.z
    }
}

/// A source-mesh triangle as stored in a [`UvGrid`](crate::UvGrid).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UvTriangle {
    /// Triangle index within its section.
    pub triangle_index: u32,
    /// Section the triangle belongs to.
    pub section_index: u32,
    /// Absolute vertex indices.
    pub vertex_indices: [u32; 3],
    /// Rest positions.
    pub positions: [Point3<f32>; 3],
    /// Texture coordinates used for lookup.
    pub uvs: [Point2<f32>; 3],
}

impl UvTriangle {
    /// Barycentric blend of the 3-D positions.
    #[inline]
    #[must_use]
    pub fn interpolate_position(&self, barycentric: &Vector3<f32>) -> Point3<f32> {
        Triangle::from_vertices(self.positions).interpolate(barycentric)
    }
}
