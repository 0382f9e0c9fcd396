//! Triangle type for geometric calculations.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Squared edge length at or below which a triangle counts as degenerate.
pub const DEGENERATE_EDGE_LENGTH_SQUARED: f32 = 1e-12;

/// A triangle with concrete vertex positions.
///
/// Winding is counter-clockwise when viewed from the front.
///
/// # Example
///
/// ```
/// use mesh_types::{Triangle, Point3};
///
/// let tri = Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// );
///
/// assert!((tri.area() - 0.5).abs() < 1e-6);
/// assert!((tri.normal().unwrap().z - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle {
    /// First vertex.
    pub v0: Point3<f32>,
    /// Second vertex.
    pub v1: Point3<f32>,
    /// Third vertex.
    pub v2: Point3<f32>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    #[must_use]
    pub const fn new(v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Create a triangle from a vertex array.
    #[inline]
    #[must_use]
    pub const fn from_vertices(vertices: [Point3<f32>; 3]) -> Self {
        let [v0, v1, v2] = vertices;
        Self { v0, v1, v2 }
    }

    /// Cross product of the two edges leaving `v0`. Its length is twice the area.
    #[inline]
    #[must_use]
    pub fn normal_unnormalized(&self) -> Vector3<f32> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit face normal, or `None` for a zero-area triangle.
    #[must_use]
    pub fn normal(&self) -> Option<Vector3<f32>> {
        let n = self.normal_unnormalized();
        let len = n.norm();
        if len > f32::EPSILON {
            Some(n / len)
        } else {
            None
        }
    }

    /// Triangle area.
    #[inline]
    #[must_use]
    pub fn area(&self) -> f32 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Squared lengths of the edges `v0v1`, `v1v2`, `v2v0`.
    #[inline]
    #[must_use]
    pub fn edge_lengths_squared(&self) -> [f32; 3] {
        [
            (self.v1 - self.v0).norm_squared(),
            (self.v2 - self.v1).norm_squared(),
            (self.v0 - self.v2).norm_squared(),
        ]
    }

    /// Whether any edge collapses to (almost) nothing.
    ///
    /// This only catches coincident vertices; sliver triangles with three
    /// distinct vertices pass and are handled by the closest-point guards.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{Triangle, Point3};
    ///
    /// let collapsed = Triangle::new(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    /// );
    /// assert!(collapsed.has_degenerate_edge());
    /// ```
    #[must_use]
    pub fn has_degenerate_edge(&self) -> bool {
        self.edge_lengths_squared()
            .iter()
            .any(|&l| l <= DEGENERATE_EDGE_LENGTH_SQUARED)
    }

    /// Point at barycentric coordinates `(u, v, w)` relative to `(v0, v1, v2)`.
    #[inline]
    #[must_use]
    pub fn interpolate(&self, barycentric: &Vector3<f32>) -> Point3<f32> {
        Point3::from(
            self.v0.coords * barycentric.x
                + self.v1.coords * barycentric.y
                + self.v2.coords * barycentric.z,
        )
    }
}
