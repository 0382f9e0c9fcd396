//! Mesh sections: contiguous triangle ranges sharing a material.

use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A contiguous range of triangles in a mesh's index buffer.
///
/// Index buffer entries are absolute vertex indices; `base_vertex_index` and
/// `num_vertices` describe the vertex range the section's triangles reference.
///
/// # Example
///
/// ```
/// use mesh_types::MeshSection;
///
/// let section = MeshSection::new(0, 0, 2, 0, 4);
/// assert_eq!(section.index_of_corner(1, 2), 5);
/// assert!(section.contains_vertex(3));
/// assert!(!section.contains_vertex(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshSection {
    /// Material slot used by every triangle of the section.
    pub material_index: u32,
    /// Offset of the section's first index in the index buffer.
    pub base_index: u32,
    /// Number of triangles in the section.
    pub num_triangles: u32,
    /// First vertex referenced by the section.
    pub base_vertex_index: u32,
    /// Number of vertices referenced by the section.
    pub num_vertices: u32,
}

impl MeshSection {
    /// Create a section descriptor.
    #[must_use]
    pub const fn new(
        material_index: u32,
        base_index: u32,
        num_triangles: u32,
        base_vertex_index: u32,
        num_vertices: u32,
    ) -> Self {
        Self {
            material_index,
            base_index,
            num_triangles,
            base_vertex_index,
            num_vertices,
        }
    }

    /// Vertex index range `[base_vertex_index, base_vertex_index + num_vertices)`.
    #[inline]
    #[must_use]
    pub const fn vertex_range(&self) -> Range<u32> {
        self.base_vertex_index..self.base_vertex_index + self.num_vertices
    }

    /// Whether `vertex` falls in the section's vertex range.
    #[inline]
    #[must_use]
    pub const fn contains_vertex(&self, vertex: u32) -> bool {
        vertex >= self.base_vertex_index && vertex < self.base_vertex_index + self.num_vertices
    }

    /// Position in the index buffer of `corner` (0..3) of section-local `triangle`.
    #[inline]
    #[must_use]
    pub const fn index_of_corner(&self, triangle: u32, corner: u32) -> usize {
        (self.base_index + triangle * 3 + corner) as usize
    }
}
