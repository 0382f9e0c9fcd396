//! Propagating the binding attribute to LODs that lack it.

use bind_spatial::TriangleGrid;
use mesh_rbf::MIN_BATCH_LEN;
use mesh_types::{Aabb, MeshSource};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{BindingError, BindingResult, BuildStage};
use crate::projection::grid_triangles;

/// Value of the binding attribute on meshes that do not carry one.
pub const DEFAULT_ATTRIBUTE_VALUE: f32 = 1.0;

/// Relative growth of the mesh bounds on each side for the transfer grid.
pub const ATTRIBUTE_BOUNDS_MARGIN: f32 = 0.1;

fn own_values<M: MeshSource>(mesh: &M) -> Vec<f32> {
    (0..mesh.vertex_count())
        .map(|v| {
            mesh.vertex_attribute(v)
                .unwrap_or(DEFAULT_ATTRIBUTE_VALUE)
        })
        .collect()
}

/// Per-vertex binding attribute for every LOD.
///
/// LODs carrying the attribute keep their own values. When only some LODs
/// from `min_lod` on carry it, the others sample it from the first of them
/// that does: each vertex takes the barycentric blend of the closest source
/// triangle's values. Without any source, every value is
/// [`DEFAULT_ATTRIBUTE_VALUE`]. LODs below `min_lod` keep their own values
/// and are never read.
///
/// # Errors
///
/// Returns [`BindingError::NoSections`] if the source LOD has no sections,
/// and [`BindingError::Spatial`] if its bounds are not finite.
///
/// # Example
///
/// ```
/// use mesh_binding::transfer_attribute;
/// use mesh_types::{subdivided_square, unit_square};
///
/// let painted = unit_square().with_attribute(vec![0.0, 1.0, 1.0, 0.0]);
/// let values = transfer_attribute(&[painted, subdivided_square(2)], 0).unwrap();
///
/// // The coarse LOD's middle vertex sits between painted and unpainted halves
/// assert!((values[1][4] - 0.5).abs() < 1e-5);
/// ```
pub fn transfer_attribute<M>(lods: &[M], min_lod: usize) -> BindingResult<Vec<Vec<f32>>>
where
    M: MeshSource + Sync,
{
    let mut values: Vec<Vec<f32>> = lods.iter().map(own_values).collect();

    let bound = || lods.iter().enumerate().skip(min_lod);
    let Some((source_lod, source)) = bound().find(|(_, m)| m.has_vertex_attribute()) else {
        return Ok(values);
    };
    if bound().all(|(_, m)| m.has_vertex_attribute()) {
        return Ok(values);
    }

    if source.section_count() == 0 {
        return Err(BindingError::NoSections {
            stage: BuildStage::AttributeTransfer,
            lod: source_lod,
        });
    }

    let triangles = grid_triangles(source, None, &values[source_lod], 0, false);
    let bounds = Aabb::from_points(triangles.iter().flat_map(|t| &t.positions));
    if bounds.is_empty() {
        warn!(lod = source_lod, "Attribute source has no triangles, keeping default values");
        return Ok(values);
    }

    let bounds = bounds.expanded_by_fraction(ATTRIBUTE_BOUNDS_MARGIN);
    let mut grid = TriangleGrid::new(&bounds).map_err(|source| BindingError::Spatial {
        stage: BuildStage::AttributeTransfer,
        lod: source_lod,
        source,
    })?;
    for triangle in triangles {
        grid.insert(triangle);
    }
    if !grid.is_populated() {
        warn!(lod = source_lod, "Attribute grid is empty, keeping default values");
        return Ok(values);
    }

    for (lod, mesh) in bound() {
        if mesh.has_vertex_attribute() {
            continue;
        }
        values[lod] = (0..mesh.vertex_count())
            .into_par_iter()
            .with_min_len(MIN_BATCH_LEN)
            .map(|v| {
                grid.closest_triangle(&mesh.vertex_position(v))
                    .map_or(DEFAULT_ATTRIBUTE_VALUE, |hit| {
                        hit.triangle.interpolate_attribute(&hit.point.barycentric)
                    })
            })
            .collect();
        debug!(lod, source_lod, vertices = values[lod].len(), "Transferred binding attribute");
    }
    Ok(values)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_types::{SurfaceMesh, Vector3, subdivided_square, unit_square};

    #[test]
    fn without_any_attribute_everything_binds() {
        let values = transfer_attribute(&[unit_square(), subdivided_square(2)], 0).unwrap();
        assert_eq!(values[0], vec![1.0; 4]);
        assert_eq!(values[1], vec![1.0; 9]);
    }

    #[test]
    fn lods_keep_their_own_values() {
        let a = unit_square().with_attribute(vec![0.0, 0.5, 1.0, 0.25]);
        let b = unit_square().with_attribute(vec![1.0; 4]);
        let values = transfer_attribute(&[a, b], 0).unwrap();
        assert_eq!(values[0], vec![0.0, 0.5, 1.0, 0.25]);
        assert_eq!(values[1], vec![1.0; 4]);
    }

    #[test]
    fn values_follow_the_closest_source_triangle() {
        let painted = unit_square().with_attribute(vec![0.0, 1.0, 1.0, 0.0]);
        let coarse = subdivided_square(4);
        let values = transfer_attribute(&[painted, coarse.clone()], 0).unwrap();

        // The painted value ramps with x
        for (v, p) in coarse.positions.iter().enumerate() {
            assert_relative_eq!(values[1][v], p.x, epsilon = 1e-5);
        }
    }

    #[test]
    fn off_surface_vertices_use_the_nearest_point() {
        let painted = unit_square().with_attribute(vec![0.0, 1.0, 1.0, 0.0]);
        let lifted = unit_square().translated(Vector3::new(0.0, 0.0, 0.05));
        let values = transfer_attribute(&[lifted, painted], 0).unwrap();
        assert_relative_eq!(values[0][1], 1.0, epsilon = 1e-5);
        assert_relative_eq!(values[0][3], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn lods_below_the_minimum_are_ignored() {
        // LOD 0 would fail as a source; LOD 1 is the first bound LOD
        let empty = SurfaceMesh::new().with_attribute(Vec::new());
        let painted = unit_square().with_attribute(vec![0.0, 1.0, 1.0, 0.0]);
        let values = transfer_attribute(&[empty, painted, subdivided_square(2)], 1).unwrap();
        assert!(values[0].is_empty());
        assert_relative_eq!(values[2][2], 1.0, epsilon = 1e-5);
        assert_relative_eq!(values[2][0], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn source_without_sections() {
        let empty = SurfaceMesh::new().with_attribute(Vec::new());
        let result = transfer_attribute(&[empty, unit_square()], 0);
        assert!(matches!(
            result,
            Err(BindingError::NoSections {
                stage: BuildStage::AttributeTransfer,
                lod: 0
            })
        ));
    }
}
