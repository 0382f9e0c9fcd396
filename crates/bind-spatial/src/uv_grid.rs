//! Uniform 2D grid over texture space.

use nalgebra::Point2;
use tracing::debug;

use crate::closest::closest_point_on_triangle;
use crate::error::{SpatialError, SpatialResult};
use crate::grid::GridHit;
use crate::{UvCell, UvTriangle};

/// Default number of cells along each UV axis.
pub const DEFAULT_RESOLUTION: u32 = 256;

/// Hit returned by [`UvGrid::closest_triangle`].
pub type UvHit<'a> = GridHit<'a, UvTriangle, 2>;

/// A square grid over `[0, 1]²` whose cells hold copies of every triangle
/// whose UV bounding box overlaps them.
///
/// Texture coordinates outside the unit square are clamped onto its border.
///
/// # Example
///
/// ```
/// use bind_spatial::{UvGrid, UvTriangle};
/// use nalgebra::{Point2, Point3};
///
/// let mut grid = UvGrid::new();
/// grid.insert(UvTriangle {
///     triangle_index: 0,
///     section_index: 0,
///     vertex_indices: [0, 1, 2],
///     positions: [Point3::origin(), Point3::new(2.0, 0.0, 0.0), Point3::new(0.0, 2.0, 0.0)],
///     uvs: [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)],
/// });
///
/// let hit = grid.closest_triangle(&Point2::new(0.25, 0.25)).unwrap();
/// let p = hit.triangle.interpolate_position(&hit.point.barycentric);
/// assert!((p - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-5);
/// ```
#[derive(Debug, Clone)]
pub struct UvGrid {
    resolution: i32,
    cells: Vec<Vec<UvTriangle>>,
    inserted: usize,
}

impl Default for UvGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl UvGrid {
    /// Creates an empty grid with [`DEFAULT_RESOLUTION`] cells per axis.
    #[must_use]
    pub fn new() -> Self {
        #[allow(clippy::cast_possible_wrap)]
        let resolution = DEFAULT_RESOLUTION as i32;
        Self::allocate(resolution)
    }

    /// Creates an empty grid with `resolution` cells per axis.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidResolution`] for zero or for a
    /// resolution whose cell count does not fit in memory indices.
    pub fn with_resolution(resolution: u32) -> SpatialResult<Self> {
        match i32::try_from(resolution) {
            Ok(r) if r > 0 && r <= 1 << 15 => Ok(Self::allocate(r)),
            _ => Err(SpatialError::InvalidResolution(resolution)),
        }
    }

    fn allocate(resolution: i32) -> Self {
        #[allow(clippy::cast_sign_loss)]
        let cell_count = (resolution * resolution) as usize;
        debug!(resolution, cell_count, "Created UV grid");
        Self {
            resolution,
            cells: vec![Vec::new(); cell_count],
            inserted: 0,
        }
    }

    /// Cells per axis.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn resolution(&self) -> u32 {
        self.resolution as u32
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

    /// Cell containing `uv` after clamping it to `[0, 1]²`.
    #[must_use]
    pub fn cell_coord(&self, uv: &Point2<f32>) -> UvCell {
        UvCell::new(self.to_cell(uv.x), self.to_cell(uv.y))
    }

    /// Linear cell index `x + y·resolution`, or `None` outside the grid.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn linear_index(&self, cell: UvCell) -> Option<usize> {
        let range = 0..self.resolution;
        (range.contains(&cell.x) && range.contains(&cell.y))
            .then(|| (cell.x + cell.y * self.resolution) as usize)
    }

    /// Triangles stored in a cell, or `None` outside the grid.
    #[must_use]
    pub fn cell(&self, cell: UvCell) -> Option<&[UvTriangle]> {
        self.linear_index(cell).map(|i| self.cells[i].as_slice())
    }

    /// Inserts a copy of `triangle` into every cell its UV bounding box
    /// overlaps.
    ///
    /// Returns `false` for triangles with non-finite UVs or whose UV box lies
    /// strictly outside `[0, 1]²`. Zero-area UV triangles are accepted.
    pub fn insert(&mut self, triangle: UvTriangle) -> bool {
        if !triangle.uvs.iter().all(|uv| uv.x.is_finite() && uv.y.is_finite()) {
            return false;
        }

        let [a, b, c] = triangle.uvs;
        let min = a.inf(&b).inf(&c);
        let max = a.sup(&b).sup(&c);
        if max.x < 0.0 || max.y < 0.0 || min.x > 1.0 || min.y > 1.0 {
            return false;
        }

        let lo = self.cell_coord(&min);
        let hi = self.cell_coord(&max);
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                if let Some(index) = self.linear_index(UvCell::new(x, y)) {
                    self.cells[index].push(triangle);
                }
            }
        }
        self.inserted += 1;
        true
    }

    /// Candidate cells for a nearest-triangle search from `uv`.
    ///
    /// Returns the point's own cell if it holds triangles, otherwise every
    /// populated cell of the first square ring around it that has any. The
    /// search stops once the rings cover the whole grid.
    #[must_use]
    pub fn query_nearest_cells(&self, uv: &Point2<f32>) -> Vec<&[UvTriangle]> {
        let center = self.cell_coord(uv);
        let mut found = Vec::new();

        if let Some(cell) = self.populated_cell(center) {
            found.push(cell);
            return found;
        }

        for ring in 1..self.resolution {
            for dy in -ring..=ring {
                let mut visit = |dx: i32| {
                    if let Some(cell) = self.populated_cell(center + UvCell::new(dx, dy)) {
                        found.push(cell);
                    }
                };
                if dy.abs() == ring {
                    for dx in -ring..=ring {
                        visit(dx);
                    }
                } else {
                    visit(-ring);
                    visit(ring);
                }
            }
            if !found.is_empty() {
                break;
            }
        }
        found
    }

    /// Triangle whose UV footprint is closest to `uv`.
    ///
    /// Ties keep the first triangle met. Returns `None` on an empty grid.
    #[must_use]
    pub fn closest_triangle(&self, uv: &Point2<f32>) -> Option<UvHit<'_>> {
        let mut best = None;
        let mut best_distance = f32::MAX;
        for cell in self.query_nearest_cells(uv) {
            for triangle in cell {
                let [a, b, c] = &triangle.uvs;
                let hit = closest_point_on_triangle(uv, a, b, c);
                let distance = (hit.position - uv).norm();
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

    fn populated_cell(&self, cell: UvCell) -> Option<&[UvTriangle]> {
        self.cell(cell).filter(|c| !c.is_empty())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn to_cell(&self, value: f32) -> i32 {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        ((clamped * self.resolution as f32).floor() as i32).clamp(0, self.resolution - 1)
    }
}
