//! Property-based tests for closest-point queries and grid lookup.
//!
//! Run with: cargo test -p bind-spatial -- proptest

use bind_spatial::{GridTriangle, TriangleGrid, UvGrid, UvTriangle, closest_point_on_triangle};
use mesh_types::{Aabb, Triangle};
use nalgebra::{Point2, Point3};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_point() -> impl Strategy<Value = Point3<f32>> {
    prop::array::uniform3(-10.0..10.0f32).prop_map(Point3::from)
}

/// Triangles with a non-trivial area so the face region is well conditioned.
fn arb_triangle() -> impl Strategy<Value = [Point3<f32>; 3]> {
    prop::array::uniform3(arb_point()).prop_filter("sliver triangle", |[a, b, c]| {
        let tri = Triangle::new(*a, *b, *c);
        let longest = tri.edge_lengths_squared().iter().copied().fold(0.0f32, f32::max);
        tri.area() > 1e-2 * longest
    })
}

fn arb_uv() -> impl Strategy<Value = Point2<f32>> {
    (0.0..=1.0f32, 0.0..=1.0f32).prop_map(|(u, v)| Point2::new(u, v))
}

fn arb_barycentric() -> impl Strategy<Value = [f32; 3]> {
    (0.0..1.0f32, 0.0..1.0f32).prop_map(|(s, t)| {
        let (s, t) = if s + t > 1.0 { (1.0 - s, 1.0 - t) } else { (s, t) };
        [1.0 - s - t, s, t]
    })
}

// =============================================================================
// Property Tests: closest point
// =============================================================================

proptest! {
    /// Barycentrics are in range, sum to one and reproduce the position.
    #[test]
    fn barycentrics_are_consistent(tri in arb_triangle(), p in arb_point()) {
        let [a, b, c] = tri;
        let hit = closest_point_on_triangle(&p, &a, &b, &c);
        let w = hit.barycentric;

        prop_assert!(w.iter().all(|v| (-1e-5..=1.0 + 1e-5).contains(v)));
        prop_assert!((w.sum() - 1.0).abs() < 1e-4);

        let blended = a.coords * w.x + b.coords * w.y + c.coords * w.z;
        prop_assert!((blended - hit.position.coords).norm() < 1e-3);
    }

    /// The result is never farther than any vertex.
    #[test]
    fn closest_point_beats_vertices(tri in arb_triangle(), p in arb_point()) {
        let [a, b, c] = tri;
        let hit = closest_point_on_triangle(&p, &a, &b, &c);
        let d = (hit.position - p).norm();
        for v in [a, b, c] {
            prop_assert!(d <= (v - p).norm() + 1e-3);
        }
    }

    /// A point on the triangle is its own closest point.
    #[test]
    fn point_on_triangle_is_fixed(tri in arb_triangle(), w in arb_barycentric()) {
        let [a, b, c] = tri;
        let p = Point3::from(a.coords * w[0] + b.coords * w[1] + c.coords * w[2]);
        let hit = closest_point_on_triangle(&p, &a, &b, &c);
        prop_assert!((hit.position - p).norm() < 1e-3);
    }

    /// Degenerate input never produces non-finite output.
    #[test]
    fn degenerate_triangles_stay_finite(a in arb_point(), b in arb_point(), p in arb_point()) {
        let hit = closest_point_on_triangle(&p, &a, &b, &b);
        prop_assert!(hit.position.coords.iter().all(|v| v.is_finite()));
        prop_assert!(hit.barycentric.iter().all(|v| v.is_finite()));
    }
}

// =============================================================================
// Property Tests: grids
// =============================================================================

proptest! {
    /// A grid holding one triangle finds it from anywhere.
    #[test]
    fn single_triangle_is_always_found(tri in arb_triangle(), p in arb_point()) {
        let bounds = Aabb::from_points(&tri).expanded(5.0);
        let mut grid = TriangleGrid::with_cell_size(&bounds, 1.0).unwrap();
        prop_assert!(grid.insert(GridTriangle::from_positions(3, 0, tri)));

        let hit = grid.closest_triangle(&p).unwrap();
        prop_assert_eq!(hit.triangle.triangle_index, 3);
    }

    /// The grid answer is never closer than the true nearest triangle.
    #[test]
    fn grid_distance_bounded_by_brute_force(
        tris in prop::collection::vec(arb_triangle(), 1..12),
        p in arb_point(),
    ) {
        let bounds = Aabb::from_points(tris.iter().flatten());
        let mut grid = TriangleGrid::with_cell_size(&bounds, 1.0).unwrap();
        for (i, tri) in tris.iter().enumerate() {
            grid.insert(GridTriangle::from_positions(u32::try_from(i).unwrap(), 0, *tri));
        }

        let brute = tris
            .iter()
            .map(|[a, b, c]| (closest_point_on_triangle(&p, a, b, c).position - p).norm())
            .fold(f32::MAX, f32::min);
        let hit = grid.closest_triangle(&p).unwrap();
        prop_assert!(hit.distance >= brute - 1e-4);
    }

    /// Cell coordinates always land inside the grid.
    #[test]
    fn cell_coord_is_in_range(p in prop::array::uniform3(-1.0e4..1.0e4f32)) {
        let bounds = Aabb::new(Point3::origin(), Point3::new(10.0, 3.0, 0.0));
        let grid = TriangleGrid::new(&bounds).unwrap();
        let coord = grid.cell_coord(&Point3::from(p));
        prop_assert!(grid.linear_index(coord).is_some());
    }

    /// A UV grid holding one triangle finds it from anywhere in the unit square.
    #[test]
    fn single_uv_triangle_is_always_found(
        uvs in prop::array::uniform3(arb_uv()),
        query in arb_uv(),
    ) {
        let mut grid = UvGrid::with_resolution(32).unwrap();
        let inserted = grid.insert(UvTriangle {
            triangle_index: 9,
            section_index: 0,
            vertex_indices: [0, 1, 2],
            positions: [Point3::origin(); 3],
            uvs,
        });
        prop_assert!(inserted);

        let hit = grid.closest_triangle(&query).unwrap();
        prop_assert_eq!(hit.triangle.triangle_index, 9);
        prop_assert!(hit.distance.is_finite());
    }
}
