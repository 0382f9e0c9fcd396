//! Carrying meshes along when a body mesh is resized.
//!
//! This module provides [`resize_mesh`], which captures how a rest body turns
//! into a resized body with a small RBF and applies the same deformation to
//! any mesh authored against the rest body (garments, accessories, hair caps).

use mesh_types::{MeshSource, SurfaceMesh};
use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    MIN_BATCH_LEN, RbfError, RbfResult, ResizeParams, build_weights, compute_sample_deformations,
    sample_points,
};

/// Result of [`resize_mesh`].
#[derive(Debug, Clone)]
pub struct ResizeOutput {
    /// The carried mesh with deformed positions (and normals, if requested).
    pub mesh: SurfaceMesh,
    /// Number of control samples used.
    pub sample_count: usize,
    /// Number of carried vertices that moved.
    pub vertices_modified: usize,
    /// Largest vertex displacement.
    pub max_displacement: f32,
    /// Mean displacement over moved vertices.
    pub average_displacement: f32,
}

/// Deforms `carried` by the change from `rest` to `resized`.
///
/// Samples anchors on `rest` by farthest-point sampling, solves their RBF
/// weights, reads the same anchors on `resized`, and moves every selected
/// vertex of `carried`. Vertices outside `params.vertex_mask` keep their
/// position and normal.
///
/// # Errors
///
/// Returns [`RbfError::EmptyMesh`] if `rest` has no vertices and
/// [`RbfError::VertexCountMismatch`] if `resized` does not share its vertex
/// count.
///
/// # Examples
///
/// ```
/// use mesh_rbf::{resize_mesh, ResizeParams};
/// use mesh_types::{subdivided_square, unit_square, Vector3};
///
/// let body = subdivided_square(4);
/// let grown = body.translated(Vector3::new(0.0, 0.0, 0.5));
/// let patch = unit_square();
///
/// let out = resize_mesh(&body, &grown, &patch, &ResizeParams::default()).unwrap();
/// assert!((out.mesh.positions[0].z - 0.5).abs() < 1e-2);
/// assert_eq!(out.sample_count, 25);
/// ```
pub fn resize_mesh(
    rest: &impl MeshSource,
    resized: &impl MeshSource,
    carried: &SurfaceMesh,
    params: &ResizeParams,
) -> RbfResult<ResizeOutput> {
    let vertex_count = rest.vertex_count();
    if vertex_count == 0 {
        return Err(RbfError::EmptyMesh);
    }
    if resized.vertex_count() != vertex_count {
        return Err(RbfError::VertexCountMismatch {
            rest: vertex_count,
            deformed: resized.vertex_count(),
        });
    }

    info!(
        body_vertices = vertex_count,
        carried_vertices = carried.positions.len(),
        samples = params.rbf.sample_count,
        "Starting mesh resize"
    );

    let rest_positions: Vec<Point3<f32>> = (0..vertex_count).map(|i| rest.vertex_position(i)).collect();
    let samples = sample_points(&vec![true; vertex_count], &rest_positions, params.rbf.sample_count);
    if samples.is_empty() {
        warn!("No samples chosen, carried mesh is unchanged");
    }

    let weights = build_weights(&samples.positions, &samples.positions, params.rbf.local_space);
    let targets: Vec<Point3<f32>> = samples
        .indices
        .iter()
        .map(|&i| resized.vertex_position(i as usize))
        .collect();
    let deformations = compute_sample_deformations(&samples.positions, &targets, &weights);

    let positions: Vec<Point3<f32>> = carried
        .positions
        .par_iter()
        .enumerate()
        .with_min_len(MIN_BATCH_LEN)
        .map(|(i, p)| {
            if params.should_deform_vertex(i) {
                deformations.deform_point(p)
            } else {
                *p
            }
        })
        .collect();

    let mut mesh = carried.clone();
    if params.deform_normals {
        mesh.normals = carried
            .normals
            .par_iter()
            .enumerate()
            .with_min_len(MIN_BATCH_LEN)
            .map(|(i, n)| match carried.positions.get(i) {
                Some(p) if params.should_deform_vertex(i) => deformations.deform_normal(p, n),
                _ => *n,
            })
            .collect();
    }

    let mut vertices_modified = 0_usize;
    let mut max_displacement = 0.0_f32;
    let mut total_displacement = 0.0_f32;
    for (before, after) in carried.positions.iter().zip(&positions) {
        let displacement = (after - before).norm();
        if displacement > 0.0 {
            vertices_modified += 1;
            max_displacement = max_displacement.max(displacement);
            total_displacement += displacement;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let average_displacement = if vertices_modified > 0 {
        total_displacement / vertices_modified as f32
    } else {
        0.0
    };
    mesh.positions = positions;

    info!(
        samples = samples.len(),
        vertices_modified,
        max_displacement,
        "Mesh resize complete"
    );

    Ok(ResizeOutput {
        mesh,
        sample_count: samples.len(),
        vertices_modified,
        max_displacement,
        average_displacement,
    })
}
