//! Capability traits over concrete mesh representations.

use nalgebra::{Point3, Vector2, Vector3};

use crate::{Aabb, MeshSection, Triangle};

/// Read access to one LOD of a triangulated, sectioned mesh.
///
/// This is the only shape the binding builder needs from a mesh, so skinned
/// meshes, cached geometry, or authoring meshes can all be bound through a thin
/// adapter. [`SurfaceMesh`](crate::SurfaceMesh) is the owned implementation.
///
/// Index buffer entries are absolute vertex indices.
///
/// # Panics
///
/// Per-vertex accessors may panic when `index >= vertex_count()`.
pub trait MeshSource {
    /// Number of vertices.
    fn vertex_count(&self) -> usize;

    /// Rest position of a vertex.
    fn vertex_position(&self, index: usize) -> Point3<f32>;

    /// Texture coordinate of a vertex in `channel`, or `None` if the mesh has
    /// no such UV channel.
    fn vertex_uv(&self, index: usize, channel: usize) -> Option<Vector2<f32>>;

    /// Normal of a vertex. Need not be unit length.
    fn vertex_normal(&self, index: usize) -> Vector3<f32>;

    /// Triangle list index buffer shared by all sections.
    fn index_buffer(&self) -> &[u32];

    /// Sections in draw order.
    fn sections(&self) -> &[MeshSection];

    /// Per-vertex binding attribute, if this LOD carries one.
    ///
    /// Values `> 0` mark vertices hair may bind to.
    fn vertex_attribute(&self, index: usize) -> Option<f32> {
        let _ = index;
        None
    }

    /// Whether this LOD carries the binding attribute.
    fn has_vertex_attribute(&self) -> bool {
        false
    }

    /// Number of sections.
    fn section_count(&self) -> usize {
        self.sections().len()
    }

    /// Section at `index`, if any.
    fn section(&self, index: usize) -> Option<&MeshSection> {
        self.sections().get(index)
    }

    /// Total number of triangles across all sections.
    fn triangle_count(&self) -> usize {
        self.sections()
            .iter()
            .map(|s| s.num_triangles as usize)
            .sum()
    }

    /// Section whose vertex range contains `vertex`.
    ///
    /// Falls back to section 0 for vertices outside every range.
    fn section_from_vertex(&self, vertex: u32) -> usize {
        self.sections()
            .iter()
            .position(|s| s.contains_vertex(vertex))
            .unwrap_or(0)
    }

    /// Whether any section uses `material`.
    fn is_valid_material(&self, material: u32) -> bool {
        self.sections().iter().any(|s| s.material_index == material)
    }

    /// Indices of the sections using `material`, in ascending order.
    fn sections_matching_material(&self, material: u32) -> Vec<usize> {
        self.sections()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.material_index == material)
            .map(|(i, _)| i)
            .collect()
    }

    /// The three absolute vertex indices of section-local `triangle`.
    ///
    /// Returns `None` if the section or triangle does not exist or the index
    /// buffer is too short.
    fn triangle_vertex_indices(&self, section: usize, triangle: u32) -> Option<[u32; 3]> {
        let s = self.sections().get(section)?;
        if triangle >= s.num_triangles {
            return None;
        }
        let indices = self.index_buffer();
        Some([
            *indices.get(s.index_of_corner(triangle, 0))?,
            *indices.get(s.index_of_corner(triangle, 1))?,
            *indices.get(s.index_of_corner(triangle, 2))?,
        ])
    }

    /// Resolved rest-pose triangle.
    fn triangle(&self, section: usize, triangle: u32) -> Option<Triangle> {
        let [i0, i1, i2] = self.triangle_vertex_indices(section, triangle)?;
        Some(Triangle::new(
            self.vertex_position(i0 as usize),
            self.vertex_position(i1 as usize),
            self.vertex_position(i2 as usize),
        ))
    }
}

/// Trait for types that can compute a bounding box.
pub trait MeshBounds {
    /// Compute the axis-aligned bounding box.
    ///
    /// Returns an empty AABB if there are no points.
    fn bounds(&self) -> Aabb;

    /// Compute the bounding box, returning `None` if empty.
    fn bounds_opt(&self) -> Option<Aabb> {
        let b = self.bounds();
        if b.is_empty() { None } else { Some(b) }
    }

    /// Get the center of the bounding box.
    fn center(&self) -> Point3<f32> {
        self.bounds().center()
    }
}
