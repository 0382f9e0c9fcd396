//! RBF system assembly and pseudo-inverse.
//!
//! For `M` samples the system matrix is the `(M+4) × (M+4)` block
//!
//! ```text
//! | Φ    1   X-c |
//! | 1ᵀ   ε   0   |
//! | (X-c)ᵀ 0  εI |
//! ```
//!
//! where `Φᵢⱼ = φ(|xᵢ - xⱼ|)`, `c` is the local origin and `ε` the affine
//! regularization. Its Moore-Penrose pseudo-inverse is computed through a
//! singular value decomposition, so rank-deficient sample layouts (coplanar,
//! colinear, duplicated) still give a minimum-norm least-squares solution.

use nalgebra::{DMatrix, Point3};
use tracing::{debug, warn};

use crate::kernel::{AFFINE_REGULARIZATION, kernel_between};
use crate::{RbfError, RbfResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Iteration cap for the SVD; non-finite input would otherwise never converge.
const MAX_SVD_ITERATIONS: usize = 10_000;

/// Number of affine terms appended to the kernel block.
pub const AFFINE_TERMS: usize = 4;

/// Solved interpolation weights for a set of RBF samples.
///
/// Holds `M × (M + 4)` coefficients. Entry `j * (M + 4) + r` is the
/// coefficient that sample `j`'s displacement contributes to output row `r`
/// of the sample deformations: rows `0..M` are the kernel terms, then the
/// constant term and the `x`, `y`, `z` affine terms.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RbfWeights {
    sample_count: usize,
    origin: Point3<f32>,
    entries: Vec<f32>,
}

impl RbfWeights {
    /// Rebuilds weights from persisted data.
    ///
    /// # Errors
    ///
    /// Returns [`RbfError::WeightCountMismatch`] unless `entries` holds exactly
    /// [`weight_count(sample_count)`](Self::weight_count) values.
    ///
    /// # Examples
    ///
    /// ```
    /// use mesh_rbf::RbfWeights;
    /// use nalgebra::Point3;
    ///
    /// let weights = RbfWeights::from_raw(1, Point3::origin(), vec![0.0; 5]).unwrap();
    /// assert_eq!(weights.sample_count(), 1);
    ///
    /// assert!(RbfWeights::from_raw(2, Point3::origin(), vec![0.0; 5]).is_err());
    /// ```
    pub fn from_raw(sample_count: usize, origin: Point3<f32>, entries: Vec<f32>) -> RbfResult<Self> {
        let expected = Self::weight_count(sample_count);
        if entries.len() != expected {
            return Err(RbfError::WeightCountMismatch {
                expected,
                actual: entries.len(),
            });
        }
        Ok(Self {
            sample_count,
            origin,
            entries,
        })
    }

    /// Number of output rows for `sample_count` samples, `M + 4`.
    #[must_use]
    pub const fn entry_count(sample_count: usize) -> usize {
        sample_count + AFFINE_TERMS
    }

    /// Number of stored coefficients for `sample_count` samples, `M × (M + 4)`.
    #[must_use]
    pub const fn weight_count(sample_count: usize) -> usize {
        sample_count * Self::entry_count(sample_count)
    }

    /// Number of samples `M`.
    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Whether there are no samples; deformation is then the identity.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Local origin the affine terms are measured from.
    #[must_use]
    pub const fn origin(&self) -> Point3<f32> {
        self.origin
    }

    /// The flat coefficient block.
    #[must_use]
    pub fn entries(&self) -> &[f32] {
        &self.entries
    }

    /// Coefficient of sample `sample` for output row `row`.
    ///
    /// # Panics
    ///
    /// Panics if `sample >= M` or `row >= M + 4`.
    #[inline]
    #[must_use]
    pub fn weight(&self, sample: usize, row: usize) -> f32 {
        let stride = Self::entry_count(self.sample_count);
        assert!(row < stride, "weight row out of range");
        self.entries[sample * stride + row]
    }
}

/// Solves RBF interpolation weights for the given samples.
///
/// `rows` and `cols` are the sample rest positions; the binding builder and
/// mesh resizing both pass the same slice twice. With `local_space` set the
/// affine terms are measured from the first row position, which keeps the
/// system well conditioned for samples far from the world origin.
///
/// Never fails: zero samples give empty weights, and a decomposition that
/// does not converge (non-finite input) gives all-zero weights. Both mean
/// identity deformation.
///
/// # Panics
///
/// Panics if `rows` and `cols` differ in length.
///
/// # Examples
///
/// ```
/// use mesh_rbf::{build_weights, compute_sample_deformations};
/// use nalgebra::{Point3, Vector3};
///
/// let rest = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.0, 0.0, 1.0),
/// ];
/// let weights = build_weights(&rest, &rest, true);
/// assert_eq!(weights.entries().len(), 4 * 8);
///
/// let target: Vec<_> = rest.iter().map(|p| p + Vector3::new(0.0, 0.0, 2.0)).collect();
/// let deformations = compute_sample_deformations(&rest, &target, &weights);
/// let moved = deformations.deform_point(&Point3::new(0.3, 0.3, 0.3));
/// assert!((moved.z - 2.3).abs() < 1e-2);
/// ```
#[must_use]
pub fn build_weights(rows: &[Point3<f32>], cols: &[Point3<f32>], local_space: bool) -> RbfWeights {
    assert_eq!(
        rows.len(),
        cols.len(),
        "row and column sample sets must have the same length"
    );

    let m = rows.len();
    if m == 0 {
        return RbfWeights::default();
    }

    let origin = if local_space { rows[0] } else { Point3::origin() };
    let n = RbfWeights::entry_count(m);

    let system = assemble_system(rows, cols, &origin);
    let Some(inverse) = pseudo_inverse(system) else {
        warn!(samples = m, "RBF decomposition did not converge, using zero weights");
        return RbfWeights {
            sample_count: m,
            origin,
            entries: vec![0.0; RbfWeights::weight_count(m)],
        };
    };

    let mut entries = Vec::with_capacity(RbfWeights::weight_count(m));
    for j in 0..m {
        for r in 0..n {
            entries.push(inverse[(r, j)]);
        }
    }

    debug!(samples = m, local_space, "Solved RBF weights");

    RbfWeights {
        sample_count: m,
        origin,
        entries,
    }
}

fn assemble_system(rows: &[Point3<f32>], cols: &[Point3<f32>], origin: &Point3<f32>) -> DMatrix<f32> {
    let m = rows.len();
    let n = RbfWeights::entry_count(m);
    let mut system = DMatrix::<f32>::zeros(n, n);

    for (i, row) in rows.iter().enumerate() {
        for (j, col) in cols.iter().enumerate() {
            system[(i, j)] = kernel_between(row, col);
        }
        let local = row - origin;
        system[(i, m)] = 1.0;
        system[(i, m + 1)] = local.x;
        system[(i, m + 2)] = local.y;
        system[(i, m + 3)] = local.z;
    }

    for (j, col) in cols.iter().enumerate() {
        let local = col - origin;
        system[(m, j)] = 1.0;
        system[(m + 1, j)] = local.x;
        system[(m + 2, j)] = local.y;
        system[(m + 3, j)] = local.z;
    }

    for k in m..n {
        system[(k, k)] += AFFINE_REGULARIZATION;
    }
    system
}

/// `V Σ⁺ Uᵀ`, dropping singular values at or below `ε · σ_max`.
fn pseudo_inverse(matrix: DMatrix<f32>) -> Option<DMatrix<f32>> {
    let svd = matrix.try_svd(true, true, f32::EPSILON, MAX_SVD_ITERATIONS)?;
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return None;
    };

    let max = svd
        .singular_values
        .iter()
        .fold(0.0_f32, |acc, s| acc.max(s.abs()));
    let tolerance = max * f32::EPSILON;
    let inverted = svd
        .singular_values
        .map(|s| if s.abs() > tolerance { 1.0 / s } else { 0.0 });

    Some(v_t.transpose() * DMatrix::from_diagonal(&inverted) * u.transpose())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::needless_range_loop)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tetrahedron() -> Vec<Point3<f32>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn counts() {
        assert_eq!(RbfWeights::entry_count(0), 4);
        assert_eq!(RbfWeights::entry_count(100), 104);
        assert_eq!(RbfWeights::weight_count(100), 10_400);
        assert_eq!(RbfWeights::weight_count(0), 0);
    }

    #[test]
    fn empty_samples_give_empty_weights() {
        let weights = build_weights(&[], &[], true);
        assert!(weights.is_empty());
        assert!(weights.entries().is_empty());
    }

    #[test]
    fn system_is_symmetric_with_regularized_affine_block() {
        let points = tetrahedron();
        let origin = points[0];
        let system = assemble_system(&points, &points, &origin);
        assert_eq!(system.nrows(), 8);
        assert_relative_eq!(system, system.transpose());
        assert_eq!(system[(0, 0)], 1.0);
        assert_relative_eq!(system[(0, 1)], 2.0_f32.sqrt());
        assert_eq!(system[(1, 5)], 1.0);
        assert_eq!(system[(4, 4)], AFFINE_REGULARIZATION);
        assert_eq!(system[(7, 7)], AFFINE_REGULARIZATION);
        assert_eq!(system[(4, 5)], 0.0);
    }

    #[test]
    fn origin_follows_local_space() {
        let points: Vec<_> = tetrahedron()
            .iter()
            .map(|p| p + nalgebra::Vector3::new(10.0, 0.0, 0.0))
            .collect();
        assert_eq!(build_weights(&points, &points, true).origin(), points[0]);
        assert_eq!(build_weights(&points, &points, false).origin(), Point3::origin());
    }

    #[test]
    fn pseudo_inverse_of_invertible_matrix_is_inverse() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0]);
        let inv = pseudo_inverse(a.clone()).unwrap();
        assert_relative_eq!(&a * &inv, DMatrix::identity(3, 3), epsilon = 1e-5);
    }

    #[test]
    fn pseudo_inverse_handles_rank_deficiency() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let inv = pseudo_inverse(a.clone()).unwrap();
        // Moore-Penrose: A A⁺ A = A
        assert_relative_eq!(&a * &inv * &a, a, epsilon = 1e-5);
        assert!(inv.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn stored_block_is_transposed_inverse() {
        let points = tetrahedron();
        let weights = build_weights(&points, &points, true);
        let inverse = pseudo_inverse(assemble_system(&points, &points, &points[0])).unwrap();
        for j in 0..4 {
            for r in 0..8 {
                assert_eq!(weights.weight(j, r), inverse[(r, j)]);
            }
        }
    }

    #[test]
    fn duplicate_samples_stay_finite() {
        let points = vec![Point3::new(1.0, 2.0, 3.0); 5];
        let weights = build_weights(&points, &points, true);
        assert_eq!(weights.entries().len(), RbfWeights::weight_count(5));
        assert!(weights.entries().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn from_raw_validates_length() {
        let err = RbfWeights::from_raw(3, Point3::origin(), vec![0.0; 20]).unwrap_err();
        assert!(matches!(
            err,
            RbfError::WeightCountMismatch {
                expected: 21,
                actual: 20
            }
        ));
    }
}
