//! Sampling, solve and resize parameters.
//!
//! This module provides [`RbfParams`], shared by every RBF consumer, and
//! [`ResizeParams`] for [`resize_mesh`](crate::resize_mesh).

use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of farthest-point samples.
pub const DEFAULT_SAMPLE_COUNT: usize = 100;

/// Parameters for sampling and solving an RBF deformation.
///
/// # Examples
///
/// ```
/// use mesh_rbf::RbfParams;
///
/// let params = RbfParams::default().with_sample_count(64);
/// assert_eq!(params.sample_count, 64);
/// assert!(params.local_space);
///
/// let world = RbfParams::world_space();
/// assert!(!world.local_space);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RbfParams {
    /// Maximum number of control samples `M`.
    ///
    /// Solve cost grows as `M³` and evaluation as `M` per point.
    pub sample_count: usize,
    /// Measure the affine terms from the first sample instead of the world
    /// origin.
    pub local_space: bool,
}

impl Default for RbfParams {
    fn default() -> Self {
        Self::new()
    }
}

impl RbfParams {
    /// [`DEFAULT_SAMPLE_COUNT`] samples in local space.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            local_space: true,
        }
    }

    /// [`DEFAULT_SAMPLE_COUNT`] samples with affine terms in world space.
    #[must_use]
    pub const fn world_space() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            local_space: false,
        }
    }

    /// Sets the sample count.
    #[must_use]
    pub const fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Sets whether the solve uses a local origin.
    #[must_use]
    pub const fn with_local_space(mut self, local_space: bool) -> Self {
        self.local_space = local_space;
        self
    }
}

/// Parameters for [`resize_mesh`](crate::resize_mesh).
///
/// # Examples
///
/// ```
/// use mesh_rbf::{RbfParams, ResizeParams};
/// use std::collections::HashSet;
///
/// let mask: HashSet<usize> = [0, 1, 2].into_iter().collect();
/// let params = ResizeParams::default()
///     .with_rbf(RbfParams::default().with_sample_count(32))
///     .with_deform_normals(false)
///     .with_vertex_mask(mask);
///
/// assert!(params.should_deform_vertex(1));
/// assert!(!params.should_deform_vertex(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeParams {
    /// Sampling and solve settings.
    pub rbf: RbfParams,
    /// Also carry vertex normals through the deformation.
    pub deform_normals: bool,
    /// Optional set of carried-mesh vertices to move.
    ///
    /// If `None`, all vertices are deformed.
    pub vertex_mask: Option<HashSet<usize>>,
}

impl Default for ResizeParams {
    fn default() -> Self {
        Self {
            rbf: RbfParams::new(),
            deform_normals: true,
            vertex_mask: None,
        }
    }
}

impl ResizeParams {
    /// Sets the sampling and solve settings.
    #[must_use]
    pub fn with_rbf(mut self, rbf: RbfParams) -> Self {
        self.rbf = rbf;
        self
    }

    /// Sets whether normals are deformed.
    #[must_use]
    pub fn with_deform_normals(mut self, deform_normals: bool) -> Self {
        self.deform_normals = deform_normals;
        self
    }

    /// Restricts deformation to the given vertices.
    #[must_use]
    pub fn with_vertex_mask(mut self, mask: HashSet<usize>) -> Self {
        self.vertex_mask = Some(mask);
        self
    }

    /// Clears the vertex mask so all vertices are deformed.
    #[must_use]
    pub fn without_vertex_mask(mut self) -> Self {
        self.vertex_mask = None;
        self
    }

    /// Returns whether a vertex index should be deformed.
    #[must_use]
    pub fn should_deform_vertex(&self, index: usize) -> bool {
        self.vertex_mask
            .as_ref()
            .is_none_or(|mask| mask.contains(&index))
    }
}
