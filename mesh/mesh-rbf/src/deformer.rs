//! Two-stage RBF evaluation.
//!
//! Stage A folds the sample displacements through the weight block once,
//! producing `M + 4` deformation vectors in `O(M²)`. Stage B then moves any
//! number of points at `O(M)` each, so deforming `Q` points costs
//! `O(M² + Q·M)` rather than `O(Q·M²)`.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::kernel::kernel_between;
use crate::{MIN_BATCH_LEN, RbfWeights};

/// Per-sample deformation vectors ready for point evaluation.
///
/// Holds copies of the rest sample positions and the local origin so
/// evaluation needs nothing else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleDeformations {
    rest_samples: Vec<Point3<f32>>,
    origin: Point3<f32>,
    values: Vec<Vector3<f32>>,
}

/// Stage A: folds sample displacements through the weights.
///
/// Output row `r` is `Σⱼ W[j][r] · (target[j] − rest[j])`. Rows are computed
/// in parallel.
///
/// # Panics
///
/// Panics if `rest_samples`, `target_samples` and the weights disagree on
/// the sample count.
///
/// # Examples
///
/// ```
/// use mesh_rbf::{build_weights, compute_sample_deformations};
/// use nalgebra::Point3;
///
/// let rest = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
/// let weights = build_weights(&rest, &rest, true);
///
/// // Unmoved samples: identity
/// let deformations = compute_sample_deformations(&rest, &rest, &weights);
/// let p = Point3::new(0.4, 2.0, -1.0);
/// assert!((deformations.deform_point(&p) - p).norm() < 1e-6);
/// ```
#[must_use]
pub fn compute_sample_deformations(
    rest_samples: &[Point3<f32>],
    target_samples: &[Point3<f32>],
    weights: &RbfWeights,
) -> SampleDeformations {
    let m = weights.sample_count();
    assert_eq!(rest_samples.len(), m, "rest sample count must match weights");
    assert_eq!(target_samples.len(), m, "target sample count must match weights");

    if m == 0 {
        return SampleDeformations::default();
    }

    let displacements: Vec<Vector3<f32>> = target_samples
        .iter()
        .zip(rest_samples)
        .map(|(target, rest)| target - rest)
        .collect();

    let stride = RbfWeights::entry_count(m);
    let entries = weights.entries();
    let values = (0..stride)
        .into_par_iter()
        .with_min_len(MIN_BATCH_LEN)
        .map(|row| {
            displacements
                .iter()
                .enumerate()
                .fold(Vector3::zeros(), |acc, (j, d)| acc + d * entries[j * stride + row])
        })
        .collect();

    SampleDeformations {
        rest_samples: rest_samples.to_vec(),
        origin: weights.origin(),
        values,
    }
}

impl SampleDeformations {
    /// Number of samples `M`; zero means identity.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.rest_samples.len()
    }

    /// Whether evaluation is the identity.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.values.is_empty()
    }

    /// The `M + 4` deformation vectors.
    #[must_use]
    pub fn values(&self) -> &[Vector3<f32>] {
        &self.values
    }

    /// Stage B: moves one rest-space point.
    ///
    /// `p + Σᵢ φ(|p − sᵢ|)·Dᵢ + D_M + D_{M+1}·x + D_{M+2}·y + D_{M+3}·z`, with
    /// `(x, y, z)` relative to the solve-time origin.
    #[must_use]
    pub fn deform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        if self.values.is_empty() {
            return *point;
        }

        let m = self.rest_samples.len();
        let mut offset = self
            .rest_samples
            .iter()
            .zip(&self.values[..m])
            .fold(Vector3::zeros(), |acc, (sample, d)| {
                acc + d * kernel_between(point, sample)
            });

        let local = point - self.origin;
        offset += self.values[m]
            + self.values[m + 1] * local.x
            + self.values[m + 2] * local.y
            + self.values[m + 3] * local.z;

        point + offset
    }

    /// Moves a normal by differencing the field across a unit step.
    ///
    /// Evaluates the deformation at `point` and `point + n̂` and returns the
    /// normalized difference. Zero-length normals, and normals the field
    /// collapses, come back unchanged.
    #[must_use]
    pub fn deform_normal(&self, point: &Point3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
        let Some(unit) = normal.try_normalize(f32::EPSILON) else {
            return *normal;
        };
        let base = self.deform_point(point);
        let tip = self.deform_point(&(point + unit));
        (tip - base).try_normalize(f32::EPSILON).unwrap_or(unit)
    }

    /// Stage B over a batch of points, in parallel.
    #[must_use]
    pub fn deform_points(&self, points: &[Point3<f32>]) -> Vec<Point3<f32>> {
        points
            .par_iter()
            .with_min_len(MIN_BATCH_LEN)
            .map(|p| self.deform_point(p))
            .collect()
    }

    /// [`deform_normal`](Self::deform_normal) over a batch, in parallel.
    ///
    /// # Panics
    ///
    /// Panics if `points` and `normals` differ in length.
    #[must_use]
    pub fn deform_normals(&self, points: &[Point3<f32>], normals: &[Vector3<f32>]) -> Vec<Vector3<f32>> {
        assert_eq!(points.len(), normals.len(), "one normal per point");
        points
            .par_iter()
            .zip(normals)
            .with_min_len(MIN_BATCH_LEN)
            .map(|(p, n)| self.deform_normal(p, n))
            .collect()
    }
}
