//! Integer cell coordinates.

use std::ops::Add;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A discrete 3D coordinate in a [`TriangleGrid`](crate::TriangleGrid).
///
/// Uses `i32` so ring offsets around a border cell can go negative before
/// being rejected.
///
/// # Example
///
/// ```
/// use bind_spatial::CellCoord;
///
/// let coord = CellCoord::new(1, 2, 3) + CellCoord::new(-2, 0, 1);
/// assert_eq!(coord, CellCoord::new(-1, 2, 4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellCoord {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl Add for CellCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.x.wrapping_add(rhs.x),
            self.y.wrapping_add(rhs.y),
            self.z.wrapping_add(rhs.z),
        )
    }
}

/// A discrete 2D coordinate in a [`UvGrid`](crate::UvGrid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UvCell {
    /// U coordinate.
    pub x: i32,
    /// V coordinate.
    pub y: i32,
}

impl UvCell {
    /// Creates a new UV cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for UvCell {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.wrapping_add(rhs.x), self.y.wrapping_add(rhs.y))
    }
}
