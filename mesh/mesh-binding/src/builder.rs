//! Binding build orchestration.
//!
//! [`build_binding`] validates the inputs, optionally transfers the target
//! positions onto a source mesh, resolves the binding attribute on every
//! LOD, then projects the roots and solves the RBF samples LOD by LOD. The
//! build is all or nothing: the first failing LOD aborts it.

use std::collections::BTreeSet;
use std::fmt;

use mesh_types::{MeshSource, RootSet};
use nalgebra::Point3;
use tracing::{debug, info};

use crate::attribute::transfer_attribute;
use crate::error::{BindingError, BindingResult, BuildStage, MeshRole};
use crate::packing::{MAX_SECTION_COUNT, MAX_TRIANGLE_COUNT, MAX_VERTEX_COUNT};
use crate::params::BindingParams;
use crate::projection::{RootProjection, project_roots};
use crate::transfer::{TransferredLod, transfer_positions};
use crate::weights::{SampleWeights, compute_sample_weights, global_sample_mask, local_sample_mask};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Meshes and roots a binding is built from.
///
/// `S` is the source mesh type; it defaults to the target type.
#[derive(Debug)]
pub struct BindingInput<'a, T, S = T> {
    /// Target mesh LODs, finest first.
    pub target_lods: &'a [T],
    /// LODs of the mesh the hair was authored on, when it differs from the
    /// target. Enables the UV transfer.
    pub source_lods: Option<&'a [S]>,
    /// Guide roots; these also drive the RBF sample selection.
    pub guides: &'a RootSet,
    /// Rendered strand roots, if bound as well.
    pub strands: Option<&'a RootSet>,
}

impl<'a, T> BindingInput<'a, T> {
    /// Binds `guides` to `target_lods` directly, without a source mesh.
    #[must_use]
    pub const fn new(target_lods: &'a [T], guides: &'a RootSet) -> Self {
        Self {
            target_lods,
            source_lods: None,
            guides,
            strands: None,
        }
    }
}

impl<'a, T, S> BindingInput<'a, T, S> {
    /// Also binds the strand roots.
    #[must_use]
    pub const fn with_strands(mut self, strands: &'a RootSet) -> Self {
        self.strands = Some(strands);
        self
    }

    /// Transfers through `source_lods` before projecting.
    #[must_use]
    pub fn with_source<S2>(self, source_lods: &'a [S2]) -> BindingInput<'a, T, S2> {
        BindingInput {
            target_lods: self.target_lods,
            source_lods: Some(source_lods),
            guides: self.guides,
            strands: self.strands,
        }
    }
}

/// Binding data of one target LOD.
///
/// LODs below the minimum LOD keep the default (empty) value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LodBinding {
    /// LOD index.
    pub lod: usize,
    /// Guide roots projected onto this LOD.
    pub guides: RootProjection,
    /// Strand roots projected onto this LOD.
    pub strands: Option<RootProjection>,
    /// RBF samples driving the guide deformation.
    pub samples: SampleWeights,
}

impl LodBinding {
    /// Whether nothing was bound on this LOD.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guides.is_empty()
            && self.samples.is_empty()
            && self.strands.as_ref().is_none_or(RootProjection::is_empty)
    }

    /// Sections a runtime needs to update for `projection`: its roots'
    /// sections plus the sample sections, sorted and deduplicated.
    #[must_use]
    pub fn runtime_section_ids(&self, projection: &RootProjection) -> Vec<u32> {
        projection
            .unique_section_ids
            .iter()
            .chain(&self.samples.sections)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Result of [`build_binding`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BindingData {
    /// First bound LOD.
    pub target_min_lod: usize,
    /// One entry per target LOD.
    pub lods: Vec<LodBinding>,
    /// Per-LOD transfer results; empty when no source mesh was given.
    pub transfers: Vec<TransferredLod>,
    /// Resolved binding attribute of every target LOD.
    pub attributes: Vec<Vec<f32>>,
}

impl BindingData {
    /// Number of target LODs.
    #[must_use]
    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    /// Whether positions were transferred from a source mesh.
    #[must_use]
    pub fn has_transfer(&self) -> bool {
        !self.transfers.is_empty()
    }

    /// Binding of one LOD.
    #[must_use]
    pub fn lod(&self, lod: usize) -> Option<&LodBinding> {
        self.lods.get(lod)
    }
}

impl fmt::Display for BindingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Binding: {} LODs from LOD {} ({})",
            self.lod_count(),
            self.target_min_lod,
            if self.has_transfer() {
                "UV transfer"
            } else {
                "direct"
            }
        )?;
        for lod in &self.lods {
            if lod.lod < self.target_min_lod {
                writeln!(f, "  LOD {}: skipped", lod.lod)?;
                continue;
            }
            write!(
                f,
                "  LOD {}: {} guides on {} triangles",
                lod.lod,
                lod.guides.root_count(),
                lod.guides.unique_triangles.len()
            )?;
            if let Some(strands) = &lod.strands {
                write!(
                    f,
                    ", {} strands on {} triangles",
                    strands.root_count(),
                    strands.unique_triangles.len()
                )?;
            }
            writeln!(f, ", {} samples", lod.samples.sample_count())?;
        }
        Ok(())
    }
}

fn validate_targets<T: MeshSource>(lods: &[T], min_lod: usize) -> BindingResult<()> {
    if lods.is_empty() {
        return Err(BindingError::NoLods);
    }
    if min_lod >= lods.len() {
        return Err(BindingError::InvalidMinLod {
            min_lod,
            lod_count: lods.len(),
        });
    }

    for (lod, mesh) in lods.iter().enumerate().skip(min_lod) {
        let vertex_count = mesh.vertex_count();
        if vertex_count == 0 {
            return Err(BindingError::EmptyLod {
                role: MeshRole::Target,
                lod,
            });
        }
        if vertex_count > MAX_VERTEX_COUNT {
            return Err(BindingError::FormatLimit {
                lod,
                what: "vertices",
                count: vertex_count,
                limit: MAX_VERTEX_COUNT,
            });
        }
        let section_count = mesh.section_count();
        if section_count == 0 {
            return Err(BindingError::NoSections {
                stage: BuildStage::Validation,
                lod,
            });
        }
        if section_count > MAX_SECTION_COUNT {
            return Err(BindingError::FormatLimit {
                lod,
                what: "sections",
                count: section_count,
                limit: MAX_SECTION_COUNT,
            });
        }
        if let Some(section) = mesh
            .sections()
            .iter()
            .find(|s| s.num_triangles as usize > MAX_TRIANGLE_COUNT)
        {
            return Err(BindingError::FormatLimit {
                lod,
                what: "triangles",
                count: section.num_triangles as usize,
                limit: MAX_TRIANGLE_COUNT,
            });
        }
    }
    Ok(())
}

fn validate_source<S: MeshSource>(lods: &[S], lod: usize) -> BindingResult<&S> {
    let source = lods.get(lod).ok_or(BindingError::InvalidSourceLod { lod })?;
    if source.vertex_count() == 0 {
        return Err(BindingError::EmptyLod {
            role: MeshRole::Source,
            lod,
        });
    }
    Ok(source)
}

/// Whether the source LODs are the target LODs themselves.
fn is_same_mesh<T, S>(input: &BindingInput<'_, T, S>) -> bool {
    input.source_lods.is_some_and(|source| {
        std::ptr::eq(
            source.as_ptr().cast::<()>(),
            input.target_lods.as_ptr().cast::<()>(),
        )
    })
}

/// Builds the binding of guide (and strand) roots to every target LOD.
///
/// Steps, in order:
///
/// 1. Validate the target LODs from `params.target_min_lod` on, and the
///    source LOD if a source mesh is given.
/// 2. With a source mesh other than the target, transfer the target
///    positions onto it through their shared UVs ([`transfer_positions`]).
/// 3. Resolve the binding attribute on every bound LOD
///    ([`transfer_attribute`]).
/// 4. Project the roots onto each bound LOD ([`project_roots`]), against the
///    transferred positions when there are any.
/// 5. Select and solve the RBF samples of each bound LOD: over the matching
///    material on the transferred positions after a transfer, otherwise over
///    the triangles the guides landed on.
///
/// # Errors
///
/// Returns the first [`BindingError`] met; no partial result is produced.
///
/// # Example
///
/// ```
/// use mesh_binding::{build_binding, BindingInput, BindingParams};
/// use mesh_types::{unit_square, Point3, RootSet};
///
/// let lods = [unit_square()];
/// let guides = RootSet::new(vec![Point3::new(2.0 / 3.0, 1.0 / 3.0, 0.0)]);
///
/// let binding = build_binding(&BindingInput::new(&lods, &guides), &BindingParams::default()).unwrap();
/// let lod = binding.lod(0).unwrap();
/// assert_eq!(lod.guides.unique_triangles.len(), 1);
/// assert_eq!(lod.samples.sample_count(), 3);
/// ```
pub fn build_binding<T, S>(
    input: &BindingInput<'_, T, S>,
    params: &BindingParams,
) -> BindingResult<BindingData>
where
    T: MeshSource + Sync,
    S: MeshSource,
{
    let min_lod = params.target_min_lod;
    validate_targets(input.target_lods, min_lod)?;
    let source = input
        .source_lods
        .map(|lods| validate_source(lods, params.source_lod))
        .transpose()?
        .filter(|_| !is_same_mesh(input));

    info!(
        lods = input.target_lods.len(),
        min_lod,
        guides = input.guides.len(),
        strands = input.strands.map_or(0, RootSet::len),
        transfer = source.is_some(),
        "Building binding"
    );

    let transfers = match source {
        Some(source) => transfer_positions(source, input.target_lods, params)?,
        None => Vec::new(),
    };
    let attributes = transfer_attribute(input.target_lods, min_lod)?;

    let mut lods = Vec::with_capacity(input.target_lods.len());
    for (lod, mesh) in input.target_lods.iter().enumerate() {
        if lod < min_lod {
            lods.push(LodBinding {
                lod,
                ..LodBinding::default()
            });
            continue;
        }

        let transferred = transfers.get(lod).map(|t| t.transferred.as_slice());
        let lod_attributes = attributes.get(lod).map_or(&[][..], Vec::as_slice);

        let guides = project_roots(input.guides, mesh, transferred, lod_attributes, lod)?;
        let strands = input
            .strands
            .map(|strands| project_roots(strands, mesh, transferred, lod_attributes, lod))
            .transpose()?;

        let samples = if let Some(positions) = transferred {
            let mask = global_sample_mask(mesh, params.matching_material);
            compute_sample_weights(mesh, &mask, positions, &params.rbf)
        } else {
            let mask = local_sample_mask(mesh, &guides.unique_triangles);
            let positions: Vec<Point3<f32>> =
                (0..mesh.vertex_count()).map(|v| mesh.vertex_position(v)).collect();
            compute_sample_weights(mesh, &mask, &positions, &params.rbf)
        };

        debug!(
            lod,
            guide_triangles = guides.unique_triangles.len(),
            strand_triangles = strands.as_ref().map_or(0, |s| s.unique_triangles.len()),
            samples = samples.sample_count(),
            "Bound LOD"
        );
        lods.push(LodBinding {
            lod,
            guides,
            strands,
            samples,
        });
    }

    let data = BindingData {
        target_min_lod: min_lod,
        lods,
        transfers,
        attributes,
    };
    info!(lods = data.lod_count(), "Binding built");
    Ok(data)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::packing::pack_triangle_index;
    use approx::assert_relative_eq;
    use mesh_rbf::RbfParams;
    use mesh_types::{MeshSection, SurfaceMesh, Vector3, subdivided_square, unit_square};

    fn centroid_guides() -> RootSet {
        RootSet::new(vec![
            Point3::new(2.0 / 3.0, 1.0 / 3.0, 0.0),
            Point3::new(1.0 / 3.0, 2.0 / 3.0, 0.0),
        ])
    }

    #[test]
    fn direct_binding_of_one_lod() {
        let lods = [unit_square()];
        let guides = centroid_guides();
        let binding =
            build_binding(&BindingInput::new(&lods, &guides), &BindingParams::default()).unwrap();

        assert_eq!(binding.lod_count(), 1);
        assert!(!binding.has_transfer());
        let lod = binding.lod(0).unwrap();
        let ids: Vec<_> = lod.guides.unique_triangles.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![pack_triangle_index(0, 0), pack_triangle_index(1, 0)]);
        for root in &lod.guides.roots {
            assert_relative_eq!(root.barycentrics(), Vector3::repeat(1.0 / 3.0), epsilon = 1e-3);
        }
        assert!(lod.strands.is_none());
        assert_eq!(lod.samples.sample_count(), 4);
        assert_eq!(lod.runtime_section_ids(&lod.guides), vec![0]);
    }

    #[test]
    fn lods_below_minimum_stay_empty() {
        let lods = [subdivided_square(4), subdivided_square(2), unit_square()];
        let guides = centroid_guides();
        let params = BindingParams::default().with_target_min_lod(1);
        let binding = build_binding(&BindingInput::new(&lods, &guides), &params).unwrap();

        assert_eq!(binding.lod_count(), 3);
        assert!(binding.lods[0].is_empty());
        assert_eq!(binding.lods[0].lod, 0);
        assert!(!binding.lods[1].is_empty());
        assert_eq!(binding.lods[2].guides.root_count(), 2);

        let summary = binding.to_string();
        assert!(summary.contains("LOD 0: skipped"));
        assert!(summary.contains("LOD 2: 2 guides on 2 triangles"));
    }

    #[test]
    fn strands_are_bound_alongside_guides() {
        let lods = [subdivided_square(3)];
        let guides = centroid_guides();
        #[allow(clippy::cast_precision_loss)]
        let strand_x = |i: usize| 0.05 * i as f32;
        let strands = RootSet::new((0..20).map(|i| Point3::new(strand_x(i), 0.5, 0.1)).collect());
        let input = BindingInput::new(&lods, &guides).with_strands(&strands);
        let binding = build_binding(&input, &BindingParams::default()).unwrap();

        let lod = binding.lod(0).unwrap();
        let projected = lod.strands.as_ref().unwrap();
        assert_eq!(projected.root_count(), 20);
        for i in 0..20 {
            let p = projected.root_position(i).unwrap();
            assert_relative_eq!(p, Point3::new(strand_x(i), 0.5, 0.0), epsilon = 1e-3);
        }
        assert!(binding.to_string().contains("20 strands"));
    }

    #[test]
    fn transfer_drives_projection_and_samples() {
        let target = subdivided_square(2);
        let source = [target.translated(Vector3::new(0.0, 0.0, 1.0))];
        let lods = [target];
        let guides = RootSet::new(vec![Point3::new(0.3, 0.6, 1.0)]);

        let input = BindingInput::new(&lods, &guides).with_source(&source);
        let params = BindingParams::default().with_rbf(RbfParams::default().with_sample_count(5));
        let binding = build_binding(&input, &params).unwrap();

        assert!(binding.has_transfer());
        let lod = binding.lod(0).unwrap();
        let triangle = lod.guides.root_triangle(0).unwrap();
        assert!(triangle.positions.iter().all(|p| (p.z - 1.0).abs() < 1e-5));
        assert!(triangle.rest_positions.iter().all(|p| p.z == 0.0));
        assert_relative_eq!(
            lod.guides.root_position(0).unwrap(),
            Point3::new(0.3, 0.6, 1.0),
            epsilon = 1e-3
        );

        // Samples are taken on the transferred surface
        assert_eq!(lod.samples.sample_count(), 5);
        assert!(lod.samples.rest_positions.iter().all(|p| (p.z - 1.0).abs() < 1e-5));
    }

    #[test]
    fn painted_attribute_limits_bindable_triangles() {
        let mut painted = unit_square();
        let far: Vec<_> = painted
            .positions
            .iter()
            .map(|p| p + Vector3::new(2.0, 0.0, 0.0))
            .collect();
        painted.append_section(1, &far, &[[0, 1, 2], [0, 2, 3]]);
        let painted = painted.with_attribute(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let lods = [painted];
        let guides = RootSet::new(vec![Point3::new(0.9, 0.5, 0.0)]);

        let binding =
            build_binding(&BindingInput::new(&lods, &guides), &BindingParams::default()).unwrap();
        let lod = binding.lod(0).unwrap();
        assert_eq!(lod.guides.unique_section_ids, vec![1]);
        assert_eq!(lod.runtime_section_ids(&lod.guides), vec![1]);
        assert_eq!(binding.attributes[0][4], 1.0);
    }

    #[test]
    fn validation_errors() {
        let guides = centroid_guides();
        let params = BindingParams::default();

        let none: [SurfaceMesh; 0] = [];
        assert!(matches!(
            build_binding(&BindingInput::new(&none, &guides), &params),
            Err(BindingError::NoLods)
        ));

        let lods = [unit_square()];
        assert!(matches!(
            build_binding(&BindingInput::new(&lods, &guides), &params.with_target_min_lod(1)),
            Err(BindingError::InvalidMinLod {
                min_lod: 1,
                lod_count: 1
            })
        ));

        let lods = [unit_square(), SurfaceMesh::new()];
        assert!(matches!(
            build_binding(&BindingInput::new(&lods, &guides), &params),
            Err(BindingError::EmptyLod {
                role: MeshRole::Target,
                lod: 1
            })
        ));

        let mut sectionless = unit_square();
        sectionless.sections.clear();
        let lods = [sectionless];
        let err = build_binding(&BindingInput::new(&lods, &guides), &params).unwrap_err();
        assert_eq!(err.stage(), BuildStage::Validation);
    }

    #[test]
    fn source_lod_must_exist() {
        let lods = [unit_square()];
        let source = [unit_square()];
        let guides = centroid_guides();
        let input = BindingInput::new(&lods, &guides).with_source(&source);
        assert!(matches!(
            build_binding(&input, &BindingParams::default().with_source_lod(2)),
            Err(BindingError::InvalidSourceLod { lod: 2 })
        ));

        let empty = [SurfaceMesh::new()];
        let input = BindingInput::new(&lods, &guides).with_source(&empty);
        assert!(matches!(
            build_binding(&input, &BindingParams::default()),
            Err(BindingError::EmptyLod {
                role: MeshRole::Source,
                lod: 0
            })
        ));
    }

    #[test]
    fn format_limits_are_enforced() {
        let guides = centroid_guides();
        let params = BindingParams::default();

        let mut many_sections = unit_square();
        many_sections.sections = vec![many_sections.sections[0]; MAX_SECTION_COUNT + 1];
        let lods = [many_sections];
        assert!(matches!(
            build_binding(&BindingInput::new(&lods, &guides), &params),
            Err(BindingError::FormatLimit {
                what: "sections",
                count: 256,
                ..
            })
        ));

        let mut huge = unit_square();
        huge.sections.push(MeshSection::new(0, 0, 0x100_0000, 0, 4));
        let lods = [huge];
        assert!(matches!(
            build_binding(&BindingInput::new(&lods, &guides), &params),
            Err(BindingError::FormatLimit {
                what: "triangles",
                ..
            })
        ));
    }

    /// Reports a vertex count without storing any vertex.
    struct VertexCountOnly {
        vertex_count: usize,
        sections: Vec<MeshSection>,
    }

    impl VertexCountOnly {
        fn new(vertex_count: usize) -> Self {
            Self {
                vertex_count,
                sections: vec![MeshSection::new(0, 0, 0, 0, 0)],
            }
        }
    }

    impl MeshSource for VertexCountOnly {
        fn vertex_count(&self) -> usize {
            self.vertex_count
        }
        fn vertex_position(&self, _index: usize) -> Point3<f32> {
            Point3::origin()
        }
        fn vertex_uv(&self, _index: usize, _channel: usize) -> Option<nalgebra::Vector2<f32>> {
            None
        }
        fn vertex_normal(&self, _index: usize) -> Vector3<f32> {
            Vector3::z()
        }
        fn index_buffer(&self) -> &[u32] {
            &[]
        }
        fn sections(&self) -> &[MeshSection] {
            &self.sections
        }
    }

    #[test]
    fn vertex_limit_matches_packed_sample_indices() {
        let largest = [VertexCountOnly::new(MAX_VERTEX_COUNT)];
        assert!(validate_targets(&largest, 0).is_ok());

        let too_many = [VertexCountOnly::new(MAX_VERTEX_COUNT + 1)];
        assert!(matches!(
            validate_targets(&too_many, 0),
            Err(BindingError::FormatLimit {
                lod: 0,
                what: "vertices",
                count: 0x100_0001,
                limit: 0x100_0000,
            })
        ));

        // The last addressable vertex survives packing
        let last = u32::try_from(MAX_VERTEX_COUNT - 1).unwrap();
        assert_eq!(pack_triangle_index(last, 0) & 0xFF_FFFF, last);
    }

    #[test]
    fn target_as_its_own_source_binds_directly() {
        let lods = [subdivided_square(2)];
        let guides = centroid_guides();
        let params = BindingParams::default().with_matching_material(Some(0));

        let direct = build_binding(&BindingInput::new(&lods, &guides), &params).unwrap();
        let input = BindingInput::new(&lods, &guides).with_source(&lods);
        let binding = build_binding(&input, &params).unwrap();

        assert!(!binding.has_transfer());
        assert_eq!(binding, direct);

        // A distinct copy of the same geometry still transfers
        let copy = lods.clone();
        let input = BindingInput::new(&lods, &guides).with_source(&copy);
        assert!(build_binding(&input, &params).unwrap().has_transfer());
    }

    #[test]
    fn skipped_lods_do_not_feed_the_attribute_transfer() {
        let mut sectionless = unit_square().with_attribute(vec![1.0; 4]);
        sectionless.sections.clear();
        let lods = [
            sectionless,
            unit_square().with_attribute(vec![0.0, 1.0, 1.0, 0.0]),
            subdivided_square(2),
        ];
        let guides = RootSet::new(vec![Point3::new(0.9, 0.5, 0.0)]);
        let params = BindingParams::default().with_target_min_lod(1);

        let binding = build_binding(&BindingInput::new(&lods, &guides), &params).unwrap();
        assert!(binding.lods[0].is_empty());
        assert_relative_eq!(binding.attributes[2][2], 1.0, epsilon = 1e-5);
        assert_eq!(binding.lod(2).unwrap().guides.root_count(), 1);
    }

    #[test]
    fn failing_lod_aborts_the_build() {
        // The second LOD has no bindable triangle
        let lods = [
            unit_square().with_attribute(vec![1.0; 4]),
            unit_square().with_attribute(vec![0.0; 4]),
        ];
        let guides = centroid_guides();
        let result = build_binding(&BindingInput::new(&lods, &guides), &BindingParams::default());
        assert!(matches!(result, Err(BindingError::EmptyGrid { lod: 1 })));
    }
}
