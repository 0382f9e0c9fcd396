//! Farthest-point sampling.

use nalgebra::Point3;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered subset of a point set chosen as RBF control samples.
///
/// `indices[i]` is the index of `positions[i]` in the original point set.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleSet {
    /// Indices into the sampled point set, in selection order.
    pub indices: Vec<u32>,
    /// Rest positions of the samples, same order as `indices`.
    pub positions: Vec<Point3<f32>>,
}

impl SampleSet {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether no sample was chosen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Gathers the samples' positions from another buffer with the same
    /// vertex order, e.g. a deformed pose of the sampled mesh.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range for `positions`.
    #[must_use]
    pub fn gather(&self, positions: &[Point3<f32>]) -> Vec<Point3<f32>> {
        self.indices.iter().map(|&i| positions[i as usize]).collect()
    }
}

/// Greedy farthest-point sampling of up to `count` points.
///
/// Seeds with the first point whose `valid` flag is set, then repeatedly
/// adds the valid point farthest from every sample chosen so far. Ties go to
/// the lowest index. The result has `min(count, number of valid points)`
/// distinct entries, all of them valid.
///
/// Returns an empty set when no point is valid; callers treat that as the
/// identity deformation.
///
/// # Panics
///
/// Panics if `valid` and `positions` differ in length or if `positions` has
/// more than `u32::MAX` entries.
///
/// # Examples
///
/// ```
/// use mesh_rbf::sample_points;
/// use nalgebra::Point3;
///
/// let points = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(0.1, 0.0, 0.0),
///     Point3::new(5.0, 0.0, 0.0),
///     Point3::new(2.0, 0.0, 0.0),
/// ];
/// let samples = sample_points(&[true; 4], &points, 3);
/// assert_eq!(samples.indices, vec![0, 2, 3]);
/// ```
#[must_use]
pub fn sample_points(valid: &[bool], positions: &[Point3<f32>], count: usize) -> SampleSet {
    assert_eq!(
        valid.len(),
        positions.len(),
        "validity mask and positions must have the same length"
    );
    assert!(
        u32::try_from(positions.len()).is_ok(),
        "point set too large for u32 sample indices"
    );

    let Some(seed) = valid.iter().position(|&v| v) else {
        warn!(points = positions.len(), "No valid points to sample");
        return SampleSet::default();
    };
    if count == 0 {
        return SampleSet::default();
    }

    let mut available = valid.to_vec();
    let mut nearest = vec![f32::INFINITY; positions.len()];
    let mut chosen = Vec::with_capacity(count.min(positions.len()));

    available[seed] = false;
    chosen.push(seed);

    while chosen.len() < count {
        let last = positions[chosen[chosen.len() - 1]];
        let mut best: Option<usize> = None;
        let mut best_distance = f32::NEG_INFINITY;

        for (i, p) in positions.iter().enumerate() {
            if !available[i] {
                continue;
            }
            let d = nearest[i].min((p - last).norm_squared());
            nearest[i] = d;
            if d > best_distance {
                best_distance = d;
                best = Some(i);
            }
        }

        let Some(next) = best else { break };
        available[next] = false;
        chosen.push(next);
    }

    debug!(
        requested = count,
        sampled = chosen.len(),
        points = positions.len(),
        "Farthest-point sampling complete"
    );

    #[allow(clippy::cast_possible_truncation)]
    let indices = chosen.iter().map(|&i| i as u32).collect();
    SampleSet {
        indices,
        positions: chosen.iter().map(|&i| positions[i]).collect(),
    }
}
