//! Root positions to be bound onto a surface.

use nalgebra::Point3;

use crate::{Aabb, MeshBounds};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Anchor points (typically the first vertex of every hair curve) to project
/// onto a mesh.
///
/// # Example
///
/// ```
/// use mesh_types::{MeshBounds, Point3, RootSet};
///
/// let roots = RootSet::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 0.0)]);
/// assert_eq!(roots.len(), 2);
/// assert_eq!(roots.center(), Point3::new(1.0, 1.0, 0.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RootSet {
    positions: Vec<Point3<f32>>,
}

impl RootSet {
    /// Create a root set.
    #[must_use]
    pub const fn new(positions: Vec<Point3<f32>>) -> Self {
        Self { positions }
    }

    /// Root positions in input order.
    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    /// Number of roots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether there are no roots.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl From<Vec<Point3<f32>>> for RootSet {
    fn from(positions: Vec<Point3<f32>>) -> Self {
        Self::new(positions)
    }
}

impl MeshBounds for RootSet {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }
}
