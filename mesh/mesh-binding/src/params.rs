//! Binding build parameters.

use mesh_rbf::RbfParams;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for [`build_binding`](crate::build_binding).
///
/// # Examples
///
/// ```
/// use mesh_binding::BindingParams;
///
/// let params = BindingParams::default()
///     .with_matching_material(Some(2))
///     .with_target_min_lod(1);
/// assert_eq!(params.matching_material, Some(2));
/// assert_eq!(params.target_min_lod, 1);
/// assert_eq!(params.rbf.sample_count, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BindingParams {
    /// Sampling and solve settings for the per-LOD RBF weights.
    pub rbf: RbfParams,
    /// Material whose sections drive the UV transfer and global sampling.
    ///
    /// `None`, or a material no section uses, falls back to every section
    /// when sampling and to material 0 when transferring.
    pub matching_material: Option<u32>,
    /// First target LOD to bind; coarser LODs below it stay empty.
    pub target_min_lod: usize,
    /// LOD of the source mesh used for the UV transfer.
    pub source_lod: usize,
    /// UV channel matched between the source and target meshes.
    pub uv_channel: usize,
}

impl Default for BindingParams {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingParams {
    /// Default RBF settings, every LOD, no material filter, UV channel 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rbf: RbfParams::new(),
            matching_material: None,
            target_min_lod: 0,
            source_lod: 0,
            uv_channel: 0,
        }
    }

    /// Sets the RBF parameters.
    #[must_use]
    pub const fn with_rbf(mut self, rbf: RbfParams) -> Self {
        self.rbf = rbf;
        self
    }

    /// Sets the matching material.
    #[must_use]
    pub const fn with_matching_material(mut self, material: Option<u32>) -> Self {
        self.matching_material = material;
        self
    }

    /// Sets the first target LOD to bind.
    #[must_use]
    pub const fn with_target_min_lod(mut self, lod: usize) -> Self {
        self.target_min_lod = lod;
        self
    }

    /// Sets the source LOD used for transfer.
    #[must_use]
    pub const fn with_source_lod(mut self, lod: usize) -> Self {
        self.source_lod = lod;
        self
    }

    /// Sets the UV channel used for transfer.
    #[must_use]
    pub const fn with_uv_channel(mut self, channel: usize) -> Self {
        self.uv_channel = channel;
        self
    }
}
