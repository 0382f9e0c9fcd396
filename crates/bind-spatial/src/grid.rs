//! Uniform 3D grid of triangles with ring-expanding nearest lookup.

use mesh_types::{Aabb, Triangle};
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::closest::{ClosestPoint, closest_point_on_triangle};
use crate::error::{SpatialError, SpatialResult};
use crate::{CellCoord, GridTriangle};

/// Cell edge length the sizing search starts from (2 cm in scene units).
pub const INITIAL_CELL_SIZE: f32 = 2.0;

/// Upper bound on the number of cells a grid may allocate (2²⁷).
pub const MAX_CELL_COUNT: u64 = 1 << 27;

/// The closest triangle found by a grid query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHit<'a, T, const D: usize> {
    /// The triangle record.
    pub triangle: &'a T,
    /// Closest point on that triangle and its barycentrics.
    pub point: ClosestPoint<D>,
    /// Distance from the query point to `point.position`.
    pub distance: f32,
}

/// Hit returned by [`TriangleGrid::closest_triangle`].
pub type TriangleHit<'a> = GridHit<'a, GridTriangle, 3>;

/// A uniform grid over a 3D box whose cells hold copies of every triangle
/// whose bounding box overlaps them.
///
/// The cell size starts at [`INITIAL_CELL_SIZE`] and doubles until the cell
/// count fits in [`MAX_CELL_COUNT`]; the max corner is then snapped outward to
/// a whole number of cells.
///
/// The grid is built single-threaded and then queried read-only, so it can be
/// shared across worker threads by reference.
///
/// # Example
///
/// ```
/// use bind_spatial::{GridTriangle, TriangleGrid};
/// use mesh_types::Aabb;
/// use nalgebra::Point3;
///
/// let bounds = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0));
/// let mut grid = TriangleGrid::with_cell_size(&bounds, 0.25).unwrap();
///
/// let tri = GridTriangle::from_positions(0, 0, [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(0.2, 0.0, 0.0),
///     Point3::new(0.0, 0.2, 0.0),
/// ]);
/// assert!(grid.insert(tri));
///
/// // Far corner: the search expands rings until it meets the triangle
/// let hit = grid.closest_triangle(&Point3::new(0.9, 0.9, 0.0)).unwrap();
/// assert_eq!(hit.triangle.triangle_index, 0);
/// ```
#[derive(Debug, Clone)]
pub struct TriangleGrid {
    min: Point3<f32>,
    max: Point3<f32>,
    cell_size: f32,
    resolution: CellCoord,
    cells: Vec<Vec<GridTriangle>>,
    inserted: usize,
}

impl TriangleGrid {
    /// Creates a grid covering `bounds`, starting at [`INITIAL_CELL_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidBounds`] if `bounds` is empty or not finite.
    pub fn new(bounds: &Aabb) -> SpatialResult<Self> {
        Self::with_cell_size(bounds, INITIAL_CELL_SIZE)
    }

    /// Creates a grid covering `bounds`, starting the sizing search at
    /// `initial_cell_size`.
    ///
    /// Each axis gets at least one cell, so flat bounds are valid.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidCellSize`] for a non-positive or
    /// non-finite cell size and [`SpatialError::InvalidBounds`] for empty or
    /// non-finite bounds.
    pub fn with_cell_size(bounds: &Aabb, initial_cell_size: f32) -> SpatialResult<Self> {
        if !(initial_cell_size.is_finite() && initial_cell_size > 0.0) {
            return Err(SpatialError::InvalidCellSize(initial_cell_size));
        }
        if bounds.is_empty() || !is_finite(&bounds.min) || !is_finite(&bounds.max) {
            return Err(SpatialError::InvalidBounds { bounds: *bounds });
        }

        let extent = bounds.size();
        let mut cell_size = initial_cell_size;
        let [rx, ry, rz] = loop {
            let res = [
                axis_resolution(extent.x, cell_size),
                axis_resolution(extent.y, cell_size),
                axis_resolution(extent.z, cell_size),
            ];
            let count = res[0].saturating_mul(res[1]).saturating_mul(res[2]);
            if count <= MAX_CELL_COUNT {
                break res;
            }
            cell_size *= 2.0;
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let resolution = CellCoord::new(rx as i32, ry as i32, rz as i32);
        #[allow(clippy::cast_precision_loss)]
        let max = bounds.min + Vector3::new(rx as f32, ry as f32, rz as f32) * cell_size;
        #[allow(clippy::cast_possible_truncation)]
        let cell_count = (rx * ry * rz) as usize;

        debug!(
            resolution_x = rx,
            resolution_y = ry,
            resolution_z = rz,
            cell_size,
            cell_count,
            "Created triangle grid"
        );

        Ok(Self {
            min: bounds.min,
            max,
            cell_size,
            resolution,
            cells: vec![Vec::new(); cell_count],
            inserted: 0,
        })
    }

    /// Grid box after snapping the max corner to the cell size.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.min, self.max)
    }

    /// Final cell edge length.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of cells along each axis.
    #[must_use]
    pub const fn resolution(&self) -> CellCoord {
        self.resolution
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of triangles accepted by [`insert`](Self::insert).
    #[must_use]
    pub const fn triangle_count(&self) -> usize {
        self.inserted
    }

    /// Whether at least one triangle was inserted.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.inserted > 0
    }

    /// Cell containing `point`, clamped to the grid.
    #[must_use]
    pub fn cell_coord(&self, point: &Point3<f32>) -> CellCoord {
        let f = (point - self.min).component_div(&(self.max - self.min));
        CellCoord::new(
            to_cell(f.x, self.resolution.x),
            to_cell(f.y, self.resolution.y),
            to_cell(f.z, self.resolution.z),
        )
    }

    /// Linear cell index `x + y·rx + z·rx·ry`, or `None` outside the grid.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn linear_index(&self, coord: CellCoord) -> Option<usize> {
        let r = self.resolution;
        let inside = (0..r.x).contains(&coord.x)
            && (0..r.y).contains(&coord.y)
            && (0..r.z).contains(&coord.z);
        inside.then(|| (coord.x + coord.y * r.x + coord.z * r.x * r.y) as usize)
    }

    /// Triangles stored in a cell, or `None` outside the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&[GridTriangle]> {
        self.linear_index(coord).map(|i| self.cells[i].as_slice())
    }

    /// Inserts a copy of `triangle` into every cell its bounding box overlaps.
    ///
    /// Returns `false` without inserting when the triangle has a collapsed
    /// edge, non-finite positions, or lies entirely outside the grid.
    /// Triangles touching the grid boundary are inserted.
    pub fn insert(&mut self, triangle: GridTriangle) -> bool {
        if !triangle.positions.iter().all(is_finite)
            || Triangle::from_vertices(triangle.positions).has_degenerate_edge()
        {
            return false;
        }

        let tri_bounds = Aabb::from_points(&triangle.positions);
        if self.is_outside(&tri_bounds) {
            return false;
        }

        let lo = self.cell_coord(&tri_bounds.min);
        let hi = self.cell_coord(&tri_bounds.max);
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    if let Some(index) = self.linear_index(CellCoord::new(x, y, z)) {
                        self.cells[index].push(triangle);
                    }
                }
            }
        }
        self.inserted += 1;
        true
    }

    /// Candidate cells for a nearest-triangle search from `point`.
    ///
    /// Returns the point's own cell if it holds triangles. Otherwise examines
    /// cubic rings of growing radius around it and returns every populated
    /// cell of the first ring that has any. Returns an empty list once the
    /// rings have covered the whole grid without finding a triangle.
    ///
    /// The result is a candidate set, not a guarantee: a closer triangle may
    /// live one ring further out, so callers compare all candidates.
    #[must_use]
    pub fn query_nearest_cells(&self, point: &Point3<f32>) -> Vec<&[GridTriangle]> {
        let center = self.cell_coord(point);
        let mut found = Vec::new();

        if let Some(cell) = self.populated_cell(center) {
            found.push(cell);
            return found;
        }

        let max_ring = self.resolution.x.max(self.resolution.y).max(self.resolution.z);
        for ring in 1..max_ring {
            for dz in -ring..=ring {
                for dy in -ring..=ring {
                    let mut visit = |dx: i32| {
                        if let Some(cell) = self.populated_cell(center + CellCoord::new(dx, dy, dz)) {
                            found.push(cell);
                        }
                    };
                    if dz.abs() == ring || dy.abs() == ring {
                        for dx in -ring..=ring {
                            visit(dx);
                        }
                    } else {
                        visit(-ring);
                        visit(ring);
                    }
                }
            }
            if !found.is_empty() {
                break;
            }
        }
        found
    }

    /// Closest triangle to `point` among the cells returned by
    /// [`query_nearest_cells`](Self::query_nearest_cells).
    ///
    /// Returns `None` when the grid holds no triangles.
    #[must_use]
    pub fn closest_triangle(&self, point: &Point3<f32>) -> Option<TriangleHit<'_>> {
        let mut best = None;
        let mut best_distance = f32::MAX;
        for cell in self.query_nearest_cells(point) {
            for triangle in cell {
                let [a, b, c] = &triangle.positions;
                let hit = closest_point_on_triangle(point, a, b, c);
                let distance = (hit.position - point).norm();
                if distance < best_distance {
                    best_distance = distance;
                    best = Some(GridHit {
                        triangle,
                        point: hit,
                        distance,
                    });
                }
            }
        }
        best
    }

    fn populated_cell(&self, coord: CellCoord) -> Option<&[GridTriangle]> {
        self.cell(coord).filter(|cell| !cell.is_empty())
    }

    fn is_outside(&self, b: &Aabb) -> bool {
        b.max.x < self.min.x
            || b.max.y < self.min.y
            || b.max.z < self.min.z
            || b.min.x > self.max.x
            || b.min.y > self.max.y
            || b.min.z > self.max.z
    }
}

/// Number of cells needed to cover `extent`, at least one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn axis_resolution(extent: f32, cell_size: f32) -> u64 {
    ((extent / cell_size).ceil() as u64).max(1)
}

/// Clamped cell index for a normalized coordinate.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn to_cell(normalized: f32, resolution: i32) -> i32 {
    ((normalized * resolution as f32).floor() as i32).clamp(0, resolution - 1)
}

fn is_finite(p: &Point3<f32>) -> bool {
    p.coords.iter().all(|v| v.is_finite())
}
