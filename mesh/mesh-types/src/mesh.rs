//! Owned, sectioned surface mesh.

use nalgebra::{Point3, Vector2, Vector3};

use crate::{Aabb, MeshBounds, MeshSection, MeshSource, Triangle};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An owned triangle mesh split into material sections.
///
/// Stores flat per-vertex buffers the way GPU-facing mesh formats do:
/// one position, normal and optional attribute per vertex, any number of UV
/// channels, and a single triangle list index buffer partitioned by
/// [`MeshSection`]s.
///
/// # Example
///
/// ```
/// use mesh_types::{MeshSource, Point3, SurfaceMesh};
///
/// let mesh = SurfaceMesh::from_triangles(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     &[[0, 1, 2]],
/// );
///
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.triangle_count(), 1);
/// assert!((mesh.vertex_normal(0).z - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceMesh {
    /// Vertex positions.
    pub positions: Vec<Point3<f32>>,
    /// Vertex normals, same length as `positions`.
    pub normals: Vec<Vector3<f32>>,
    /// UV channels; each inner buffer has one entry per vertex.
    pub uv_channels: Vec<Vec<Vector2<f32>>>,
    /// Triangle list of absolute vertex indices.
    pub indices: Vec<u32>,
    /// Sections partitioning `indices`.
    pub sections: Vec<MeshSection>,
    /// Optional per-vertex binding attribute.
    pub attribute: Option<Vec<f32>>,
}

impl SurfaceMesh {
    /// Create an empty mesh.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            uv_channels: Vec::new(),
            indices: Vec::new(),
            sections: Vec::new(),
            attribute: None,
        }
    }

    /// Build a single-section mesh (material 0) from positions and triangles.
    ///
    /// Normals are computed from the faces.
    #[must_use]
    pub fn from_triangles(positions: Vec<Point3<f32>>, triangles: &[[u32; 3]]) -> Self {
        let mut mesh = Self::new();
        mesh.append_section(0, &positions, triangles);
        mesh
    }

    /// Append a section whose triangles index `positions` locally.
    ///
    /// Vertices are appended after the existing ones and the section's index
    /// range after the existing indices. Normals are recomputed.
    pub fn append_section(
        &mut self,
        material_index: u32,
        positions: &[Point3<f32>],
        triangles: &[[u32; 3]],
    ) -> &mut Self {
        let base_vertex = as_u32(self.positions.len());
        let base_index = as_u32(self.indices.len());

        self.positions.extend_from_slice(positions);
        self.indices
            .extend(triangles.iter().flatten().map(|&i| i + base_vertex));
        self.sections.push(MeshSection::new(
            material_index,
            base_index,
            as_u32(triangles.len()),
            base_vertex,
            as_u32(positions.len()),
        ));
        for channel in &mut self.uv_channels {
            channel.resize(self.positions.len(), Vector2::zeros());
        }
        if let Some(attribute) = &mut self.attribute {
            attribute.resize(self.positions.len(), 0.0);
        }
        self.compute_normals();
        self
    }

    /// Add a UV channel.
    ///
    /// The buffer is truncated or zero-padded to the vertex count.
    #[must_use]
    pub fn with_uv_channel(mut self, mut uvs: Vec<Vector2<f32>>) -> Self {
        uvs.resize(self.positions.len(), Vector2::zeros());
        self.uv_channels.push(uvs);
        self
    }

    /// Attach a per-vertex binding attribute.
    ///
    /// The buffer is truncated or zero-padded to the vertex count.
    #[must_use]
    pub fn with_attribute(mut self, mut values: Vec<f32>) -> Self {
        values.resize(self.positions.len(), 0.0);
        self.attribute = Some(values);
        self
    }

    /// Recompute area-weighted vertex normals from the triangle list.
    ///
    /// Vertices not referenced by any non-degenerate triangle get `+Z`.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vector3::zeros(); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(pa), Some(pb), Some(pc)) = (
                self.positions.get(a),
                self.positions.get(b),
                self.positions.get(c),
            ) else {
                continue;
            };
            let n = Triangle::new(*pa, *pb, *pc).normal_unnormalized();
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }
        for n in &mut normals {
            *n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z);
        }
        self.normals = normals;
    }

    /// Copy of the mesh with every position moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vector3<f32>) -> Self {
        let mut out = self.clone();
        for p in &mut out.positions {
            *p += offset;
        }
        out
    }
}

impl MeshSource for SurfaceMesh {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn vertex_position(&self, index: usize) -> Point3<f32> {
        self.positions[index]
    }

    fn vertex_uv(&self, index: usize, channel: usize) -> Option<Vector2<f32>> {
        self.uv_channels.get(channel)?.get(index).copied()
    }

    fn vertex_normal(&self, index: usize) -> Vector3<f32> {
        self.normals.get(index).copied().unwrap_or_else(Vector3::z)
    }

    fn index_buffer(&self) -> &[u32] {
        &self.indices
    }

    fn sections(&self) -> &[MeshSection] {
        &self.sections
    }

    fn vertex_attribute(&self, index: usize) -> Option<f32> {
        self.attribute.as_ref()?.get(index).copied()
    }

    fn has_vertex_attribute(&self) -> bool {
        self.attribute.is_some()
    }
}

impl MeshBounds for SurfaceMesh {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn as_u32(n: usize) -> u32 {
    n as u32
}

/// A flat unit square on the XY plane with matching UVs.
///
/// Four vertices `(0,0,0) (1,0,0) (1,1,0) (0,1,0)`, two triangles
/// `[0,1,2]` and `[0,2,3]`, one section of material 0, normals `+Z`.
///
/// # Example
///
/// ```
/// use mesh_types::{unit_square, MeshSource};
///
/// let square = unit_square();
/// assert_eq!(square.vertex_count(), 4);
/// assert_eq!(square.triangle_count(), 2);
/// assert_eq!(square.vertex_uv(2, 0).map(|uv| uv.x), Some(1.0));
/// ```
#[must_use]
pub fn unit_square() -> SurfaceMesh {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    let uvs = positions.iter().map(|p| p.xy().coords).collect();
    SurfaceMesh::from_triangles(positions, &[[0, 1, 2], [0, 2, 3]]).with_uv_channel(uvs)
}

/// A unit square on the XY plane split into `divisions × divisions` quads.
///
/// UV channel 0 equals the XY position. Each quad is split along its
/// `(i,j)`-`(i+1,j+1)` diagonal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn subdivided_square(divisions: u32) -> SurfaceMesh {
    let n = divisions.max(1);
    let step = 1.0 / n as f32;
    let row = n + 1;

    let mut positions = Vec::with_capacity((row * row) as usize);
    let mut uvs = Vec::with_capacity((row * row) as usize);
    for j in 0..row {
        for i in 0..row {
            let (x, y) = (i as f32 * step, j as f32 * step);
            positions.push(Point3::new(x, y, 0.0));
            uvs.push(Vector2::new(x, y));
        }
    }

    let mut triangles = Vec::with_capacity((n * n * 2) as usize);
    for j in 0..n {
        for i in 0..n {
            let v00 = j * row + i;
            let v10 = v00 + 1;
            let v01 = v00 + row;
            let v11 = v01 + 1;
            triangles.push([v00, v10, v11]);
            triangles.push([v00, v11, v01]);
        }
    }

    SurfaceMesh::from_triangles(positions, &triangles).with_uv_channel(uvs)
}
