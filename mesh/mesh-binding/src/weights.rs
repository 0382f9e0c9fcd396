//! Per-LOD RBF sample selection and weights.
//!
//! Two masks decide which vertices may become samples. The global mask is
//! used after a UV transfer and covers the matching material; the local
//! mask covers only the triangles the guide roots landed on, so the
//! deformation is driven by the region that actually carries hair.

use mesh_rbf::{
    RbfParams, RbfWeights, SampleDeformations, build_weights, compute_sample_deformations,
    sample_points,
};
use mesh_types::MeshSource;
use nalgebra::Point3;
use tracing::debug;

use crate::packing::pack_triangle_index;
use crate::projection::UniqueTriangle;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

fn mark_triangle<M>(mesh: &M, mask: &mut [bool], section: usize, triangle: u32, local_only: bool)
where
    M: MeshSource + ?Sized,
{
    let Some(range) = mesh.section(section).map(mesh_types::MeshSection::vertex_range) else {
        return;
    };
    let Some(vertices) = mesh.triangle_vertex_indices(section, triangle) else {
        return;
    };
    for v in vertices {
        if local_only && !range.contains(&v) {
            continue;
        }
        if let Some(slot) = mask.get_mut(v as usize) {
            *slot = true;
        }
    }
}

/// Vertices of every section using `material`.
///
/// Every vertex is valid when `material` is `None` or no section uses it.
#[must_use]
pub fn global_sample_mask<M>(mesh: &M, material: Option<u32>) -> Vec<bool>
where
    M: MeshSource + ?Sized,
{
    let vertex_count = mesh.vertex_count();
    let sections = match material {
        Some(material) if mesh.is_valid_material(material) => {
            mesh.sections_matching_material(material)
        }
        _ => return vec![true; vertex_count],
    };

    let mut mask = vec![false; vertex_count];
    for section in sections {
        let triangles = mesh.section(section).map_or(0, |s| s.num_triangles);
        for triangle in 0..triangles {
            mark_triangle(mesh, &mut mask, section, triangle, false);
        }
    }
    mask
}

/// Vertices of the triangles roots were projected onto.
///
/// Only vertices inside their section's vertex range are marked.
#[must_use]
pub fn local_sample_mask<M>(mesh: &M, triangles: &[UniqueTriangle]) -> Vec<bool>
where
    M: MeshSource + ?Sized,
{
    let mut mask = vec![false; mesh.vertex_count()];
    for triangle in triangles {
        mark_triangle(
            mesh,
            &mut mask,
            triangle.section_index() as usize,
            triangle.triangle_index(),
            true,
        );
    }
    mask
}

/// RBF samples and weights for one mesh LOD.
///
/// # Example
///
/// ```
/// use mesh_binding::{compute_sample_weights, global_sample_mask};
/// use mesh_rbf::RbfParams;
/// use mesh_types::{subdivided_square, Vector3};
///
/// let mesh = subdivided_square(3);
/// let mask = global_sample_mask(&mesh, None);
/// let params = RbfParams::default().with_sample_count(6);
/// let samples = compute_sample_weights(&mesh, &mask, &mesh.positions, &params);
/// assert_eq!(samples.sample_count(), 6);
///
/// // Replay a rigid lift of the whole mesh
/// let lifted = mesh.translated(Vector3::z());
/// let deformations = samples.deformations(&lifted.positions);
/// let p = deformations.deform_point(&mesh.positions[5]);
/// assert!((p - lifted.positions[5]).norm() < 1e-2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleWeights {
    /// Vertex index of each sample, in selection order.
    pub indices: Vec<u32>,
    /// Section containing each sample vertex.
    pub sections: Vec<u32>,
    /// Sample positions the weights were solved on.
    pub rest_positions: Vec<Point3<f32>>,
    /// Solved interpolation weights.
    pub weights: RbfWeights,
}

impl SampleWeights {
    /// Number of samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether no sample was selected (identity deformation).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Persisted sample indices: vertex index in the low 24 bits, section in
    /// the high 8.
    #[must_use]
    pub fn packed_indices(&self) -> Vec<u32> {
        self.indices
            .iter()
            .zip(&self.sections)
            .map(|(&vertex, &section)| pack_triangle_index(vertex, section))
            .collect()
    }

    /// Deformations that carry the rest samples to a deformed pose of the
    /// same mesh LOD.
    ///
    /// # Panics
    ///
    /// Panics if a sample index is out of range for `deformed_positions`.
    #[must_use]
    pub fn deformations(&self, deformed_positions: &[Point3<f32>]) -> SampleDeformations {
        let targets: Vec<_> = self
            .indices
            .iter()
            .map(|&i| deformed_positions[i as usize])
            .collect();
        compute_sample_deformations(&self.rest_positions, &targets, &self.weights)
    }
}

/// Selects up to `params.sample_count` samples among the `mask`ed vertices
/// and solves their weights.
///
/// `positions` are the vertex positions sampled and solved on: the mesh rest
/// positions, or the transferred positions after a UV transfer.
///
/// # Panics
///
/// Panics if `mask` and `positions` differ in length.
#[must_use]
pub fn compute_sample_weights<M>(
    mesh: &M,
    mask: &[bool],
    positions: &[Point3<f32>],
    params: &RbfParams,
) -> SampleWeights
where
    M: MeshSource + ?Sized,
{
    let samples = sample_points(mask, positions, params.sample_count);
    let weights = build_weights(&samples.positions, &samples.positions, params.local_space);

    #[allow(clippy::cast_possible_truncation)]
    let sections = samples
        .indices
        .iter()
        .map(|&v| mesh.section_from_vertex(v) as u32)
        .collect();

    debug!(
        candidates = mask.iter().filter(|&&valid| valid).count(),
        samples = samples.len(),
        "Selected RBF samples"
    );

    SampleWeights {
        indices: samples.indices,
        sections,
        rest_positions: samples.positions,
        weights,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_types::{SurfaceMesh, Vector3, subdivided_square, unit_square};

    fn two_materials() -> SurfaceMesh {
        let mut mesh = unit_square();
        let far: Vec<_> = mesh
            .positions
            .iter()
            .map(|p| p + Vector3::new(4.0, 0.0, 0.0))
            .collect();
        mesh.append_section(3, &far, &[[0, 1, 2]]);
        mesh
    }

    #[test]
    fn global_mask_follows_material() {
        let mesh = two_materials();
        let mask = global_sample_mask(&mesh, Some(3));
        // Vertex 7 is not referenced by the single triangle of material 3
        assert_eq!(mask, vec![false, false, false, false, true, true, true, false]);

        assert_eq!(global_sample_mask(&mesh, None), vec![true; 8]);
        assert_eq!(global_sample_mask(&mesh, Some(9)), vec![true; 8]);
    }

    #[test]
    fn local_mask_covers_projected_triangles() {
        let mesh = two_materials();
        let triangles = [UniqueTriangle {
            id: pack_triangle_index(1, 0),
            positions: [Point3::origin(); 3],
            rest_positions: [Point3::origin(); 3],
            normals: [Vector3::z(); 3],
        }];
        let mask = local_sample_mask(&mesh, &triangles);
        assert_eq!(mask, vec![true, false, true, true, false, false, false, false]);
    }

    #[test]
    fn local_mask_skips_out_of_section_vertices() {
        let mut mesh = unit_square();
        // Section claims only vertices 0..3; triangle 1 references vertex 3
        mesh.sections[0].num_vertices = 3;
        let triangles = [UniqueTriangle {
            id: pack_triangle_index(1, 0),
            positions: [Point3::origin(); 3],
            rest_positions: [Point3::origin(); 3],
            normals: [Vector3::z(); 3],
        }];
        let mask = local_sample_mask(&mesh, &triangles);
        assert_eq!(mask, vec![true, false, true, false]);
    }

    #[test]
    fn samples_record_their_sections() {
        let mesh = two_materials();
        let mask = vec![true; 8];
        let samples = compute_sample_weights(
            &mesh,
            &mask,
            &mesh.positions,
            &RbfParams::default().with_sample_count(3),
        );
        assert_eq!(samples.indices[0], 0);
        assert_eq!(samples.sample_count(), 3);
        for (&v, &s) in samples.indices.iter().zip(&samples.sections) {
            assert_eq!(s, u32::from(v >= 4));
        }

        let packed = samples.packed_indices();
        for (i, &p) in packed.iter().enumerate() {
            assert_eq!(p & 0xFF_FFFF, samples.indices[i]);
            assert_eq!(p >> 24, samples.sections[i]);
        }
    }

    #[test]
    fn empty_mask_is_identity() {
        let mesh = unit_square();
        let samples =
            compute_sample_weights(&mesh, &[false; 4], &mesh.positions, &RbfParams::default());
        assert!(samples.is_empty());
        assert!(samples.weights.is_empty());

        let deformations = samples.deformations(&mesh.positions);
        let p = Point3::new(0.3, 2.0, 1.0);
        assert_eq!(deformations.deform_point(&p), p);
    }

    #[test]
    fn translation_is_replayed() {
        let mesh = subdivided_square(4);
        let mask = global_sample_mask(&mesh, None);
        let samples = compute_sample_weights(
            &mesh,
            &mask,
            &mesh.positions,
            &RbfParams::default().with_sample_count(8),
        );

        let offset = Vector3::new(0.5, -0.25, 2.0);
        let moved = mesh.translated(offset);
        let deformations = samples.deformations(&moved.positions);
        let p = Point3::new(0.4, 0.6, 0.0);
        assert_relative_eq!(deformations.deform_point(&p), p + offset, epsilon = 2e-2);
    }
}
