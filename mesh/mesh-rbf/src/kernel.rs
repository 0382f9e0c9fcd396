//! The radial basis kernel.

use nalgebra::Point3;

/// Added to the squared distance inside the kernel; keeps it smooth at zero.
pub const KERNEL_OFFSET: f32 = 1.0;

/// Added to the four affine diagonal entries of the system matrix.
pub const AFFINE_REGULARIZATION: f32 = 1e-4;

/// Multiquadric kernel `φ(d) = √(d² + 1)`.
///
/// Takes the squared distance so callers can skip a square root.
///
/// Persisted weights were solved against exactly this kernel, so it must not
/// change.
///
/// # Examples
///
/// ```
/// use mesh_rbf::kernel;
///
/// assert_eq!(kernel(0.0), 1.0);
/// assert!((kernel(3.0) - 2.0).abs() < 1e-6);
/// ```
#[inline]
#[must_use]
pub fn kernel(distance_squared: f32) -> f32 {
    (distance_squared + KERNEL_OFFSET).sqrt()
}

/// Kernel value between two points.
#[inline]
#[must_use]
pub fn kernel_between(a: &Point3<f32>, b: &Point3<f32>) -> f32 {
    kernel((a - b).norm_squared())
}
