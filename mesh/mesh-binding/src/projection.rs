//! Projecting roots onto the closest point of a mesh surface.
//!
//! Each LOD gets its own [`TriangleGrid`] over the bindable triangles. Roots
//! are projected in parallel against the read-only grid, then the triangles
//! they land on are compacted into a unique-triangle table sorted by packed
//! id.

use std::collections::{BTreeMap, BTreeSet};

use bind_spatial::{GridTriangle, TriangleGrid};
use mesh_rbf::MIN_BATCH_LEN;
use mesh_types::{Aabb, MeshBounds, MeshSource, RootSet};
use nalgebra::{Point3, Vector2, Vector3};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{BindingError, BindingResult, BuildStage};
use crate::packing::{
    pack_barycentrics, pack_normal_to_float, pack_triangle_index, unpack_barycentrics,
    unpack_triangle_index,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Growth applied to the roots' bounds, relative to the distance from their
/// center to the nearest mesh vertex.
pub const ROOT_BOUNDS_MARGIN: f32 = 1.25;

/// Binding of one root to a unique triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RootBinding {
    /// Index into [`RootProjection::unique_triangles`].
    pub unique_triangle: u32,
    /// Weights of the triangle's first two vertices as packed half floats.
    pub packed_barycentrics: u32,
}

impl RootBinding {
    /// All three barycentric weights, the third implied by the other two.
    #[must_use]
    pub fn barycentrics(&self) -> Vector3<f32> {
        let b = unpack_barycentrics(self.packed_barycentrics);
        Vector3::new(b.x, b.y, 1.0 - b.x - b.y)
    }
}

/// A mesh triangle referenced by at least one root.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UniqueTriangle {
    /// Packed `(section, triangle)` id, see [`pack_triangle_index`].
    pub id: u32,
    /// Positions the roots were projected against (transferred when a
    /// source mesh was used).
    pub positions: [Point3<f32>; 3],
    /// The target mesh's own rest positions.
    pub rest_positions: [Point3<f32>; 3],
    /// Vertex normals.
    pub normals: [Vector3<f32>; 3],
}

impl UniqueTriangle {
    /// Section-local triangle index.
    #[must_use]
    pub const fn triangle_index(&self) -> u32 {
        unpack_triangle_index(self.id).0
    }

    /// Section index.
    #[must_use]
    pub const fn section_index(&self) -> u32 {
        unpack_triangle_index(self.id).1
    }

    /// Persisted layout: `(x, y, z, packed normal)` per vertex.
    #[must_use]
    pub fn packed_positions(&self) -> [[f32; 4]; 3] {
        pack_vertices(&self.positions, &self.normals)
    }

    /// [`packed_positions`](Self::packed_positions) over the non-transferred
    /// rest positions.
    #[must_use]
    pub fn packed_rest_positions(&self) -> [[f32; 4]; 3] {
        pack_vertices(&self.rest_positions, &self.normals)
    }
}

fn pack_vertices(positions: &[Point3<f32>; 3], normals: &[Vector3<f32>; 3]) -> [[f32; 4]; 3] {
    std::array::from_fn(|i| {
        let p = positions[i];
        [p.x, p.y, p.z, pack_normal_to_float(&normals[i])]
    })
}

/// Projection of a root set onto one mesh LOD.
///
/// # Example
///
/// ```
/// use mesh_binding::project_roots;
/// use mesh_types::{unit_square, Point3, RootSet};
///
/// let square = unit_square();
/// let roots = RootSet::new(vec![
///     Point3::new(0.7, 0.2, 0.1),
///     Point3::new(0.8, 0.1, -0.1),
///     Point3::new(0.1, 0.9, 0.0),
/// ]);
///
/// let projection = project_roots(&roots, &square, None, &[], 0).unwrap();
/// assert_eq!(projection.root_count(), 3);
/// // The first two roots share a triangle
/// assert_eq!(projection.unique_triangles.len(), 2);
///
/// let p = projection.root_position(0).unwrap();
/// assert!((p - Point3::new(0.7, 0.2, 0.0)).norm() < 1e-3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RootProjection {
    /// One binding per root, in root order.
    pub roots: Vec<RootBinding>,
    /// Triangles referenced by any root, sorted by packed id.
    pub unique_triangles: Vec<UniqueTriangle>,
    /// Sorted, deduplicated sections of the unique triangles.
    pub unique_section_ids: Vec<u32>,
    /// Number of sections of the mesh LOD.
    pub section_count: u32,
}

impl RootProjection {
    /// Number of projected roots.
    #[must_use]
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Whether no root was projected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The unique triangle a root is bound to.
    #[must_use]
    pub fn root_triangle(&self, root: usize) -> Option<&UniqueTriangle> {
        let binding = self.roots.get(root)?;
        self.unique_triangles.get(binding.unique_triangle as usize)
    }

    /// Rebuilds a root's projected position from its triangle and
    /// (half-precision) barycentrics.
    #[must_use]
    pub fn root_position(&self, root: usize) -> Option<Point3<f32>> {
        let triangle = self.root_triangle(root)?;
        let b = self.roots[root].barycentrics();
        let [p0, p1, p2] = triangle.positions;
        Some(Point3::from(p0.coords * b.x + p1.coords * b.y + p2.coords * b.z))
    }
}

/// Grid records for the triangles of a mesh LOD.
///
/// `positions` overrides the lookup positions (transferred positions);
/// `attributes` holds the per-vertex binding attribute, missing entries
/// reading as `1.0`. With `bindable_only`, triangles whose three attribute
/// values are all `<= 0` are skipped. Triangles referencing vertices outside
/// the mesh are skipped.
pub(crate) fn grid_triangles<M>(
    mesh: &M,
    positions: Option<&[Point3<f32>]>,
    attributes: &[f32],
    uv_channel: usize,
    bindable_only: bool,
) -> Vec<GridTriangle>
where
    M: MeshSource + ?Sized,
{
    let vertex_count = mesh.vertex_count();
    let attribute = |v: u32| attributes.get(v as usize).copied().unwrap_or(1.0);
    let mut triangles = Vec::with_capacity(mesh.triangle_count());

    for (section_index, section) in mesh.sections().iter().enumerate() {
        for triangle_index in 0..section.num_triangles {
            let Some(vertex_indices) = mesh.triangle_vertex_indices(section_index, triangle_index)
            else {
                continue;
            };
            if vertex_indices.iter().any(|&v| v as usize >= vertex_count) {
                continue;
            }

            let values = vertex_indices.map(attribute);
            if bindable_only && values.iter().all(|&a| a <= 0.0) {
                continue;
            }

            let rest_positions = vertex_indices.map(|v| mesh.vertex_position(v as usize));
            let lookup_positions = match positions {
                Some(overrides) => {
                    let resolved = vertex_indices.map(|v| overrides.get(v as usize).copied());
                    let [Some(a), Some(b), Some(c)] = resolved else {
                        continue;
                    };
                    [a, b, c]
                }
                None => rest_positions,
            };

            #[allow(clippy::cast_possible_truncation)]
            let section_index = section_index as u32;
            triangles.push(GridTriangle {
                triangle_index,
                section_index,
                vertex_indices,
                positions: lookup_positions,
                rest_positions,
                normals: vertex_indices.map(|v| mesh.vertex_normal(v as usize)),
                uvs: vertex_indices.map(|v| {
                    mesh.vertex_uv(v as usize, uv_channel)
                        .unwrap_or_else(Vector2::zeros)
                }),
                attributes: values,
            });
        }
    }
    triangles
}

/// Bounds of the projection grid.
///
/// Uses the triangles' bounds when their diagonal is smaller than the
/// roots'. Otherwise uses the roots' bounds grown by [`ROOT_BOUNDS_MARGIN`]
/// times the distance from the roots' center to the nearest triangle vertex,
/// so coarse LODs that only loosely follow the finest one still reach the
/// roots.
#[must_use]
pub fn projection_bounds(triangles: &[GridTriangle], roots: &Aabb) -> Aabb {
    let mesh_bounds = Aabb::from_points(triangles.iter().flat_map(|t| &t.positions));
    if mesh_bounds.diagonal() < roots.diagonal() {
        return mesh_bounds;
    }

    let center = roots.center();
    let closest = triangles
        .iter()
        .flat_map(|t| &t.positions)
        .map(|p| (p - center).norm())
        .fold(f32::MAX, f32::min);
    if closest < f32::MAX {
        roots.expanded(closest * ROOT_BOUNDS_MARGIN)
    } else {
        *roots
    }
}

/// Projects every root onto the closest bindable triangle of `mesh`.
///
/// `positions` replaces the mesh positions for lookup (after a UV transfer);
/// the non-transferred positions are kept in the unique-triangle table.
/// `attributes` is the per-vertex binding attribute; entries past its end
/// read as `1.0`, so an empty slice makes every triangle bindable. `lod`
/// only labels errors and logs.
///
/// Roots sharing a triangle share one [`UniqueTriangle`]; the table keeps
/// the record met by the first such root.
///
/// # Errors
///
/// - [`BindingError::NoSections`] if the mesh has no sections.
/// - [`BindingError::EmptyGrid`] if no bindable triangle lands in the grid.
/// - [`BindingError::RootOutsideMesh`] with the first root that found no
///   triangle.
/// - [`BindingError::Spatial`] if the grid bounds are not finite.
pub fn project_roots<M>(
    roots: &RootSet,
    mesh: &M,
    positions: Option<&[Point3<f32>]>,
    attributes: &[f32],
    lod: usize,
) -> BindingResult<RootProjection>
where
    M: MeshSource + ?Sized,
{
    let section_count = mesh.section_count();
    if section_count == 0 {
        return Err(BindingError::NoSections {
            stage: BuildStage::Projection,
            lod,
        });
    }
    #[allow(clippy::cast_possible_truncation)]
    let section_count = section_count as u32;

    if roots.is_empty() {
        return Ok(RootProjection {
            section_count,
            ..RootProjection::default()
        });
    }

    let triangles = grid_triangles(mesh, positions, attributes, 0, true);
    if triangles.is_empty() {
        return Err(BindingError::EmptyGrid { lod });
    }

    let bounds = projection_bounds(&triangles, &roots.bounds());
    let mut grid = TriangleGrid::new(&bounds).map_err(|source| BindingError::Spatial {
        stage: BuildStage::Projection,
        lod,
        source,
    })?;
    let mut populated = false;
    for triangle in triangles {
        populated |= grid.insert(triangle);
    }
    if !populated {
        return Err(BindingError::EmptyGrid { lod });
    }

    let hits: Vec<Option<(GridTriangle, Vector3<f32>)>> = roots
        .positions()
        .par_iter()
        .with_min_len(MIN_BATCH_LEN)
        .map(|p| {
            grid.closest_triangle(p)
                .map(|hit| (*hit.triangle, hit.point.barycentric))
        })
        .collect();

    if let Some(root) = hits.iter().position(Option::is_none) {
        return Err(BindingError::RootOutsideMesh { lod, root });
    }
    let hits: Vec<_> = hits.into_iter().flatten().collect();

    let mut first_root = BTreeMap::new();
    for (root, (triangle, _)) in hits.iter().enumerate() {
        first_root
            .entry(pack_triangle_index(triangle.triangle_index, triangle.section_index))
            .or_insert(root);
    }

    let mut slots = BTreeMap::new();
    let mut unique_triangles = Vec::with_capacity(first_root.len());
    let mut sections = BTreeSet::new();
    for (slot, (&id, &root)) in first_root.iter().enumerate() {
        let triangle = &hits[root].0;
        #[allow(clippy::cast_possible_truncation)]
        slots.insert(id, slot as u32);
        sections.insert(triangle.section_index);
        unique_triangles.push(UniqueTriangle {
            id,
            positions: triangle.positions,
            rest_positions: triangle.rest_positions,
            normals: triangle.normals,
        });
    }

    let bindings = hits
        .iter()
        .map(|(triangle, barycentric)| {
            let id = pack_triangle_index(triangle.triangle_index, triangle.section_index);
            RootBinding {
                unique_triangle: slots.get(&id).copied().unwrap_or_default(),
                packed_barycentrics: pack_barycentrics(&barycentric.xy()),
            }
        })
        .collect();

    debug!(
        lod,
        roots = roots.len(),
        unique_triangles = unique_triangles.len(),
        cells = grid.cell_count(),
        cell_size = grid.cell_size(),
        "Projected roots"
    );

    Ok(RootProjection {
        roots: bindings,
        unique_triangles,
        unique_section_ids: sections.into_iter().collect(),
        section_count,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_types::{SurfaceMesh, subdivided_square, unit_square};

    fn two_section_mesh() -> SurfaceMesh {
        let mut mesh = unit_square();
        let offset: Vec<_> = mesh
            .positions
            .iter()
            .map(|p| p + Vector3::new(3.0, 0.0, 0.0))
            .collect();
        mesh.append_section(1, &offset, &[[0, 1, 2], [0, 2, 3]]);
        mesh
    }

    #[test]
    fn root_at_centroid_gets_thirds() {
        let square = unit_square();
        let centroid = Point3::new(2.0 / 3.0, 1.0 / 3.0, 0.0);
        let roots = RootSet::new(vec![centroid]);

        let projection = project_roots(&roots, &square, None, &[], 0).unwrap();
        let triangle = projection.root_triangle(0).unwrap();
        assert_eq!(triangle.id, pack_triangle_index(0, 0));
        assert_relative_eq!(
            projection.roots[0].barycentrics(),
            Vector3::repeat(1.0 / 3.0),
            epsilon = 1e-3
        );
    }

    #[test]
    fn unique_table_is_sorted_and_compact() {
        let mesh = two_section_mesh();
        let roots = RootSet::new(vec![
            Point3::new(3.2, 0.8, 0.0), // section 1, triangle 1
            Point3::new(0.8, 0.2, 0.0), // section 0, triangle 0
            Point3::new(3.3, 0.9, 0.0), // section 1, triangle 1
            Point3::new(0.9, 0.1, 0.0), // section 0, triangle 0
        ]);

        let projection = project_roots(&roots, &mesh, None, &[], 0).unwrap();
        assert_eq!(projection.section_count, 2);
        assert_eq!(projection.unique_section_ids, vec![0, 1]);

        let ids: Vec<_> = projection.unique_triangles.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![pack_triangle_index(0, 0), pack_triangle_index(1, 1)]);

        let slots: Vec<_> = projection.roots.iter().map(|r| r.unique_triangle).collect();
        assert_eq!(slots, vec![1, 0, 1, 0]);
        assert!(projection.unique_triangles.len() <= projection.root_count());
    }

    #[test]
    fn projected_position_matches_closest_point() {
        let mesh = subdivided_square(4);
        let roots = RootSet::new(vec![
            Point3::new(0.31, 0.77, 0.5),
            Point3::new(0.05, 0.52, -0.2),
            Point3::new(0.9, 0.1, 0.0),
        ]);

        let projection = project_roots(&roots, &mesh, None, &[], 0).unwrap();
        for (i, root) in roots.positions().iter().enumerate() {
            let p = projection.root_position(i).unwrap();
            assert_relative_eq!(p, Point3::new(root.x, root.y, 0.0), epsilon = 1e-3);
        }
    }

    #[test]
    fn roots_off_the_surface_reach_the_nearest_edge() {
        let square = unit_square();
        let roots = RootSet::new(vec![Point3::new(2.0, 0.5, 0.0), Point3::new(-1.0, -1.0, 0.0)]);

        let projection = project_roots(&roots, &square, None, &[], 0).unwrap();
        assert_relative_eq!(
            projection.root_position(0).unwrap(),
            Point3::new(1.0, 0.5, 0.0),
            epsilon = 1e-3
        );
        assert_relative_eq!(
            projection.root_position(1).unwrap(),
            Point3::origin(),
            epsilon = 1e-3
        );
    }

    #[test]
    fn non_bindable_triangles_are_skipped() {
        let mesh = two_section_mesh();
        // Only the second section's vertices are bindable
        let attributes: Vec<f32> = (0..8).map(|v| if v < 4 { 0.0 } else { 1.0 }).collect();
        let roots = RootSet::new(vec![Point3::new(0.5, 0.5, 0.0)]);

        let projection = project_roots(&roots, &mesh, None, &attributes, 0).unwrap();
        assert_eq!(projection.root_triangle(0).unwrap().section_index(), 1);
    }

    #[test]
    fn no_bindable_triangle_is_an_error() {
        let square = unit_square();
        let roots = RootSet::new(vec![Point3::new(0.5, 0.5, 0.0)]);
        let result = project_roots(&roots, &square, None, &[0.0; 4], 2);
        assert!(matches!(result, Err(BindingError::EmptyGrid { lod: 2 })));
    }

    #[test]
    fn mesh_without_sections_is_an_error() {
        let roots = RootSet::new(vec![Point3::origin()]);
        let result = project_roots(&roots, &SurfaceMesh::new(), None, &[], 1);
        assert!(matches!(
            result,
            Err(BindingError::NoSections {
                stage: BuildStage::Projection,
                lod: 1
            })
        ));
    }

    #[test]
    fn empty_root_set_projects_nothing() {
        let projection = project_roots(&RootSet::default(), &unit_square(), None, &[], 0).unwrap();
        assert!(projection.is_empty());
        assert!(projection.unique_triangles.is_empty());
        assert_eq!(projection.section_count, 1);
    }

    #[test]
    fn transferred_positions_drive_lookup() {
        let square = unit_square();
        let lifted: Vec<_> = square
            .positions
            .iter()
            .map(|p| p + Vector3::new(0.0, 0.0, 5.0))
            .collect();
        let roots = RootSet::new(vec![Point3::new(0.25, 0.75, 5.0)]);

        let projection = project_roots(&roots, &square, Some(&lifted), &[], 0).unwrap();
        let triangle = projection.root_triangle(0).unwrap();
        assert_eq!(triangle.positions[0].z, 5.0);
        assert_eq!(triangle.rest_positions[0].z, 0.0);
        assert_relative_eq!(
            projection.root_position(0).unwrap(),
            Point3::new(0.25, 0.75, 5.0),
            epsilon = 1e-3
        );
    }

    #[test]
    fn packed_positions_carry_normals() {
        let square = unit_square();
        let roots = RootSet::new(vec![Point3::new(0.5, 0.25, 0.0)]);
        let projection = project_roots(&roots, &square, None, &[], 0).unwrap();
        let packed = projection.unique_triangles[0].packed_positions();
        assert_eq!(packed[1][..3], [1.0, 0.0, 0.0]);
        assert_eq!(packed[1][3].to_bits(), crate::pack_normal(&Vector3::z()));
    }

    #[test]
    fn grid_bounds_prefer_the_smaller_box() {
        let square = unit_square();
        let triangles = grid_triangles(&square, None, &[], 0, true);
        assert_eq!(triangles.len(), 2);

        // Roots spread wider than the mesh: use the mesh box
        let wide = Aabb::new(Point3::new(-5.0, -5.0, -5.0), Point3::new(5.0, 5.0, 5.0));
        let bounds = projection_bounds(&triangles, &wide);
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));

        // A single root: its point box grown to reach the nearest vertex
        let point = Aabb::new(Point3::new(0.0, 0.0, 2.0), Point3::new(0.0, 0.0, 2.0));
        let bounds = projection_bounds(&triangles, &point);
        assert_relative_eq!(bounds.min.z, 2.0 - 2.0 * ROOT_BOUNDS_MARGIN);
        assert!(bounds.contains(&Point3::origin()));
    }
}
