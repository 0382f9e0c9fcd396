//! Retargeting target vertices onto a source surface through shared UVs.
//!
//! When roots were authored on a different mesh than the one they are bound
//! to, every target vertex is looked up in a [`UvGrid`] over the source
//! mesh's texture space and moved to the matching source surface point. The
//! projection then runs against these transferred positions.

use std::collections::HashSet;

use bind_spatial::{UvGrid, UvTriangle};
use mesh_rbf::MIN_BATCH_LEN;
use mesh_types::MeshSource;
use nalgebra::{Point2, Point3};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{BindingError, BindingResult, BuildStage, MeshRole};
use crate::params::BindingParams;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fraction of a target LOD's vertices that must carry distinct UVs.
pub const MIN_UNIQUE_UV_FRACTION: f32 = 0.01;

/// Transfer result for one target LOD.
///
/// Vertices whose section does not use the transfer material are zero in
/// both buffers. LODs skipped by the minimum LOD are empty.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferredLod {
    /// Target rest positions.
    pub original: Vec<Point3<f32>>,
    /// Positions on the source surface.
    pub transferred: Vec<Point3<f32>>,
}

impl TransferredLod {
    /// Whether this LOD was skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transferred.is_empty()
    }
}

/// Builds a UV grid over the source triangles of `material`.
///
/// Triangles without UVs in `channel` are skipped, so a mesh lacking the
/// channel yields an unpopulated grid.
fn build_uv_grid<M>(source: &M, material: u32, channel: usize) -> UvGrid
where
    M: MeshSource + ?Sized,
{
    let vertex_count = source.vertex_count();
    let mut grid = UvGrid::new();

    for section_index in source.sections_matching_material(material) {
        let Some(section) = source.section(section_index) else {
            continue;
        };
        for triangle_index in 0..section.num_triangles {
            let Some(vertex_indices) = source.triangle_vertex_indices(section_index, triangle_index)
            else {
                continue;
            };
            if vertex_indices.iter().any(|&v| v as usize >= vertex_count) {
                continue;
            }
            let [Some(a), Some(b), Some(c)] =
                vertex_indices.map(|v| source.vertex_uv(v as usize, channel))
            else {
                continue;
            };

            #[allow(clippy::cast_possible_truncation)]
            let section_index = section_index as u32;
            grid.insert(UvTriangle {
                triangle_index,
                section_index,
                vertex_indices,
                positions: vertex_indices.map(|v| source.vertex_position(v as usize)),
                uvs: [a, b, c].map(Point2::from),
            });
        }
    }
    grid
}

/// Whether enough of a mesh's vertices carry distinct UVs in `channel`.
fn has_valid_uvs<M>(mesh: &M, channel: usize) -> bool
where
    M: MeshSource + ?Sized,
{
    let vertex_count = mesh.vertex_count();
    let mut unique = HashSet::new();
    for v in 0..vertex_count {
        let Some(uv) = mesh.vertex_uv(v, channel) else {
            return false;
        };
        unique.insert((uv.x.to_bits(), uv.y.to_bits()));
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let required = ((vertex_count as f32 * MIN_UNIQUE_UV_FRACTION) as usize).max(1);
    unique.len() >= required
}

fn transfer_vertex<M>(
    target: &M,
    grid: &UvGrid,
    material: u32,
    channel: usize,
    vertex: usize,
) -> (Point3<f32>, Point3<f32>)
where
    M: MeshSource + ?Sized,
{
    #[allow(clippy::cast_possible_truncation)]
    let section = target.section_from_vertex(vertex as u32);
    if target.section(section).map(|s| s.material_index) != Some(material) {
        return (Point3::origin(), Point3::origin());
    }

    let position = target.vertex_position(vertex);
    let transferred = target
        .vertex_uv(vertex, channel)
        .and_then(|uv| grid.closest_triangle(&Point2::from(uv)))
        .map_or(position, |hit| {
            hit.triangle.interpolate_position(&hit.point.barycentric)
        });
    (position, transferred)
}

/// Moves every target LOD's vertices onto the source surface.
///
/// The source triangles of `params.matching_material` (material 0 if the
/// source has no such section) are gridded by their `params.uv_channel`
/// UVs. Each target vertex in a section of that material takes the 3-D
/// position of the closest source UV point. A target LOD without the
/// material falls back to material 0 on both meshes.
///
/// Returns one entry per target LOD; LODs below `params.target_min_lod` are
/// empty.
///
/// # Errors
///
/// - [`BindingError::MissingUvs`] with [`MeshRole::Source`] if no source
///   triangle of the chosen material has UVs in the channel.
/// - [`BindingError::NoSections`] if a target LOD has no sections.
/// - [`BindingError::MissingUvs`] with [`MeshRole::Target`] if a target LOD
///   lacks the channel, or fewer than [`MIN_UNIQUE_UV_FRACTION`] of its
///   vertices (at least one) have distinct UVs.
///
/// # Example
///
/// ```
/// use mesh_binding::{transfer_positions, BindingParams};
/// use mesh_types::{unit_square, Vector3};
///
/// let target = unit_square();
/// let source = target.translated(Vector3::new(0.0, 0.0, 1.0));
///
/// let lods = transfer_positions(&source, &[target], &BindingParams::default()).unwrap();
/// assert!(lods[0].transferred.iter().all(|p| (p.z - 1.0).abs() < 1e-5));
/// ```
pub fn transfer_positions<S, T>(
    source: &S,
    targets: &[T],
    params: &BindingParams,
) -> BindingResult<Vec<TransferredLod>>
where
    S: MeshSource + ?Sized,
    T: MeshSource + Sync,
{
    let channel = params.uv_channel;
    let source_material = match params.matching_material {
        Some(material) if source.is_valid_material(material) => material,
        Some(material) => {
            warn!(
                material,
                "Matching material not found on the source mesh, using material 0"
            );
            0
        }
        None => 0,
    };

    let primary = build_uv_grid(source, source_material, channel);
    if !primary.is_populated() {
        return Err(BindingError::MissingUvs {
            role: MeshRole::Source,
            lod: params.source_lod,
        });
    }
    let mut fallback: Option<UvGrid> = None;

    let mut lods = Vec::with_capacity(targets.len());
    for (lod, target) in targets.iter().enumerate() {
        if lod < params.target_min_lod {
            lods.push(TransferredLod::default());
            continue;
        }
        if target.section_count() == 0 {
            return Err(BindingError::NoSections {
                stage: BuildStage::Transfer,
                lod,
            });
        }

        let (material, grid) = if target.is_valid_material(source_material) {
            (source_material, &primary)
        } else {
            warn!(
                lod,
                material = source_material,
                "Matching material not found on the target mesh, using material 0"
            );
            if source_material == 0 {
                (0, &primary)
            } else {
                let grid = fallback.get_or_insert_with(|| build_uv_grid(source, 0, channel));
                (0, &*grid)
            }
        };
        if !grid.is_populated() {
            return Err(BindingError::MissingUvs {
                role: MeshRole::Source,
                lod,
            });
        }
        if !has_valid_uvs(target, channel) {
            return Err(BindingError::MissingUvs {
                role: MeshRole::Target,
                lod,
            });
        }

        let (original, transferred): (Vec<_>, Vec<_>) = (0..target.vertex_count())
            .into_par_iter()
            .with_min_len(MIN_BATCH_LEN)
            .map(|v| transfer_vertex(target, grid, material, channel, v))
            .unzip();

        info!(
            lod,
            vertices = transferred.len(),
            material,
            source_triangles = grid.triangle_count(),
            "Transferred target positions"
        );
        lods.push(TransferredLod {
            original,
            transferred,
        });
    }
    Ok(lods)
}
