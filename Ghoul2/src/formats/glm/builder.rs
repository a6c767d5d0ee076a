//! Building models from host-neutral mesh data
//!
//! The editor side hands over triangulated meshes with per-corner UVs and
//! normals and per-vertex bone influences by name. This module turns them
//! into surfaces: corners are merged into vertices, influences are pruned
//! to what a packed vertex can hold, and bone references are assigned in
//! first-seen order.
//!
//! UVs are taken as given; flipping between editor and file conventions is
//! up to the caller.

use std::collections::HashMap;

use super::GlmFile;
use super::hierarchy::{SurfaceHierarchy, SurfaceInfo, SurfaceNode};
use super::lod::Lod;
use super::surface::Surface;
use super::triangle::Triangle;
use super::vertex::{MAX_BONE_REFERENCES, MAX_WEIGHTS, Vertex, VertexWeights};
use crate::error::{Error, Result};
use crate::formats::common::count_to_i32;
use crate::formats::gla::Skeleton;

/// Animation name of models without a `.gla`.
pub const DEFAULT_ANIM_NAME: &str = "*default";

/// Tunables for surface building.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceBuildOptions {
    /// Influences kept per vertex, at most 4.
    pub max_weights: usize,
    /// Largest per-component normal difference for corners to share a vertex.
    pub normal_tolerance: f32,
    /// Vertex count above which a surface is reported as oversized.
    pub warn_vertex_count: usize,
}

impl Default for SurfaceBuildOptions {
    fn default() -> Self {
        Self {
            max_weights: MAX_WEIGHTS,
            normal_tolerance: 0.05,
            warn_vertex_count: 1000,
        }
    }
}

/// One corner of a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshCorner {
    /// Index into [`MeshInput::positions`].
    pub vertex: usize,
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl MeshCorner {
    #[must_use]
    pub fn new(vertex: usize, uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self { vertex, uv, normal }
    }
}

/// A mesh as handed over by the editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshInput {
    pub positions: Vec<[f32; 3]>,
    /// `(bone name, weight)` pairs per vertex. May be shorter than
    /// `positions`; missing entries have no influences.
    pub influences: Vec<Vec<(String, f32)>>,
    /// Faces as corner lists. Only triangles are accepted.
    pub faces: Vec<Vec<MeshCorner>>,
}

/// Bone name to bone index lookup of a skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoneLookup {
    indices: HashMap<String, usize>,
}

impl BoneLookup {
    /// Build from a name to index map as returned by
    /// [`crate::formats::gla::read_bone_index_map`].
    ///
    /// # Errors
    /// Returns [`Error::InvalidIndex`] if no bone has index 0.
    pub fn from_index_map(indices: HashMap<String, usize>) -> Result<Self> {
        if !indices.values().any(|&i| i == 0) {
            return Err(Error::InvalidIndex("skeleton has no bone 0".to_string()));
        }
        Ok(Self { indices })
    }

    /// # Errors
    /// Returns [`Error::InvalidIndex`] if the skeleton is empty.
    pub fn from_skeleton(skeleton: &Skeleton) -> Result<Self> {
        Self::from_index_map(skeleton.bone_index_map())
    }

    #[must_use]
    pub fn index(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// How vertices are bound to bones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoneBinding {
    /// The single-bone default skeleton: every vertex is fully weighted to
    /// bone reference 0.
    Default,
    /// A real skeleton, read from the `.gla` named in the model.
    Skeleton {
        anim_name: String,
        bones: BoneLookup,
    },
}

impl BoneBinding {
    /// Whether an animation name stands for the default skeleton.
    #[must_use]
    pub fn is_default_name(anim_name: &str) -> bool {
        anim_name.is_empty() || anim_name == DEFAULT_ANIM_NAME
    }

    fn bones(&self) -> Option<&BoneLookup> {
        match self {
            Self::Default => None,
            Self::Skeleton { bones, .. } => Some(bones),
        }
    }
}

/// A whole model as handed over by the editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelInput {
    pub name: String,
    /// Surface tree of LOD 0. Later LODs reuse it.
    pub surfaces: Vec<SurfaceNode>,
    /// Meshes per LOD, keyed by surface name.
    pub lods: Vec<HashMap<String, MeshInput>>,
}

/// Keep the `max` largest influences and normalise them.
///
/// Influences without weight are dropped. The smallest are removed one at a
/// time, the earlier one first on ties. A vertex left without influences
/// goes fully to bone 0.
#[must_use]
pub fn prune_influences(influences: &[(usize, f32)], max: usize) -> Vec<(usize, f32)> {
    let mut kept: Vec<(usize, f32)> = Vec::with_capacity(influences.len());
    for &(bone, weight) in influences {
        if weight <= 0.0 {
            continue;
        }
        match kept.iter_mut().find(|(b, _)| *b == bone) {
            Some(existing) => existing.1 = weight,
            None => kept.push((bone, weight)),
        }
    }

    while kept.len() > max {
        let smallest = kept
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.1.total_cmp(&b.1.1))
            .map(|(i, _)| i);
        if let Some(i) = smallest {
            kept.remove(i);
        }
    }

    if kept.is_empty() {
        return vec![(0, 1.0)];
    }

    let total: f32 = kept.iter().map(|(_, w)| w).sum();
    for (_, weight) in &mut kept {
        *weight /= total;
    }
    kept
}

/// Bone references of one surface, in first-seen order.
#[derive(Default)]
struct BoneReferences {
    bones: Vec<usize>,
    lookup: HashMap<usize, usize>,
}

impl BoneReferences {
    fn reference(&mut self, bone: usize) -> Result<usize> {
        if let Some(&r) = self.lookup.get(&bone) {
            return Ok(r);
        }
        let r = self.bones.len();
        if r >= MAX_BONE_REFERENCES {
            return Err(Error::TooManyBoneReferences {
                count: r + 1,
                limit: MAX_BONE_REFERENCES,
            });
        }
        self.bones.push(bone);
        self.lookup.insert(bone, r);
        Ok(r)
    }

    fn into_list(self) -> Result<Vec<i32>> {
        self.bones.into_iter().map(count_to_i32).collect()
    }
}

struct SurfaceBuilder<'a> {
    info: &'a SurfaceInfo,
    mesh: &'a MeshInput,
    bones: Option<&'a BoneLookup>,
    options: &'a SurfaceBuildOptions,
    references: BoneReferences,
}

impl SurfaceBuilder<'_> {
    fn weights(&mut self, vertex: usize) -> Result<VertexWeights> {
        let Some(bones) = self.bones else {
            return Ok(VertexWeights::single(0));
        };

        let resolved: Vec<(usize, f32)> = self
            .mesh
            .influences
            .get(vertex)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|(name, weight)| match bones.index(name) {
                Some(bone) => Some((bone, *weight)),
                None => {
                    tracing::debug!("{}: ignoring influence of unknown bone {name}", self.info.name);
                    None
                }
            })
            .collect();

        let pruned = prune_influences(&resolved, self.options.max_weights.min(MAX_WEIGHTS));
        let pairs = pruned
            .into_iter()
            .map(|(bone, weight)| Ok((self.references.reference(bone)?, weight)))
            .collect::<Result<Vec<_>>>()?;
        VertexWeights::new(&pairs)
    }

    fn position(&self, vertex: usize) -> Result<[f32; 3]> {
        self.mesh.positions.get(vertex).copied().ok_or_else(|| {
            Error::InvalidIndex(format!(
                "{}: corner references vertex {vertex}, mesh has {}",
                self.info.name,
                self.mesh.positions.len()
            ))
        })
    }

    fn check_triangles(&self) -> Result<()> {
        match self.mesh.faces.iter().find(|face| face.len() != 3) {
            Some(face) => Err(Error::NonTriangleFace {
                surface: self.info.name.clone(),
                corners: face.len(),
            }),
            None => Ok(()),
        }
    }

    /// Tags keep their vertices as they are, without UV or normal.
    fn build_tag(mut self) -> Result<Surface> {
        self.check_triangles()?;

        let mut vertices = Vec::with_capacity(self.mesh.positions.len());
        for (i, &position) in self.mesh.positions.iter().enumerate() {
            vertices.push(Vertex {
                position,
                normal: [0.0; 3],
                uv: [0.0; 2],
                weights: self.weights(i)?,
            });
        }

        let mut triangles = Vec::with_capacity(self.mesh.faces.len());
        for face in &self.mesh.faces {
            for corner in face {
                self.position(corner.vertex)?;
            }
            triangles.push(Triangle::new(
                face[0].vertex as u32,
                face[1].vertex as u32,
                face[2].vertex as u32,
            ));
        }

        self.finish(vertices, triangles)
    }

    fn build_mesh(mut self) -> Result<Surface> {
        self.check_triangles()?;

        let mut vertices: Vec<Vertex> = Vec::new();
        let mut candidates: HashMap<(usize, [u32; 2]), Vec<usize>> = HashMap::new();
        let mut triangles = Vec::with_capacity(self.mesh.faces.len());
        let tolerance = self.options.normal_tolerance;

        for face in &self.mesh.faces {
            let mut indices = [0u32; 3];
            for (slot, corner) in indices.iter_mut().zip(face) {
                let key = (corner.vertex, corner.uv.map(f32::to_bits));
                let existing = candidates.get(&key).and_then(|list| {
                    list.iter().copied().find(|&i| {
                        vertices[i]
                            .normal
                            .iter()
                            .zip(&corner.normal)
                            .all(|(a, b)| (a - b).abs() < tolerance)
                    })
                });

                let index = match existing {
                    Some(index) => index,
                    None => {
                        let position = self.position(corner.vertex)?;
                        let weights = self.weights(corner.vertex)?;
                        let index = vertices.len();
                        vertices.push(Vertex {
                            position,
                            normal: corner.normal,
                            uv: corner.uv,
                            weights,
                        });
                        candidates.entry(key).or_default().push(index);
                        index
                    }
                };
                *slot = index as u32;
            }
            triangles.push(Triangle { indices });
        }

        if vertices.len() > self.options.warn_vertex_count {
            tracing::warn!(
                "{} has over {} vertices ({})",
                self.info.name,
                self.options.warn_vertex_count,
                vertices.len()
            );
        }
        tracing::debug!(
            "{}: {} corners merged into {} vertices",
            self.info.name,
            3 * triangles.len(),
            vertices.len()
        );

        self.finish(vertices, triangles)
    }

    fn finish(self, vertices: Vec<Vertex>, triangles: Vec<Triangle>) -> Result<Surface> {
        let bone_references = match self.bones {
            None => vec![0],
            Some(_) => self.references.into_list()?,
        };
        Ok(Surface {
            index: self.info.index,
            vertices,
            triangles,
            bone_references,
        })
    }
}

/// Build the geometry of one surface.
///
/// # Errors
/// Returns [`Error::NonTriangleFace`] for faces that are not triangles,
/// [`Error::TooManyBoneReferences`] if the surface needs more than 32 bones
/// and [`Error::InvalidIndex`] if a corner references a missing vertex.
pub fn build_surface(
    info: &SurfaceInfo,
    mesh: &MeshInput,
    bones: Option<&BoneLookup>,
    options: &SurfaceBuildOptions,
) -> Result<Surface> {
    let builder = SurfaceBuilder {
        info,
        mesh,
        bones,
        options,
        references: BoneReferences::default(),
    };
    if info.is_tag() {
        tracing::debug!("{} is a tag", info.name);
        builder.build_tag()
    } else {
        builder.build_mesh()
    }
}

impl GlmFile {
    /// Build a model from editor meshes.
    ///
    /// The surface tree defines the hierarchy. Every LOD gets a record for
    /// every surface; surfaces a LOD has no mesh for are left empty.
    ///
    /// # Errors
    /// Returns an error if there is no LOD, the surface tree is invalid, or
    /// a surface cannot be built.
    pub fn build(
        input: &ModelInput,
        binding: &BoneBinding,
        options: &SurfaceBuildOptions,
    ) -> Result<Self> {
        if input.lods.is_empty() {
            return Err(Error::InvalidIndex(format!("{} has no LOD 0", input.name)));
        }

        let hierarchy = SurfaceHierarchy::from_tree(&input.surfaces)?;
        tracing::info!(
            "Building {}: {} surfaces, {} LODs",
            input.name,
            hierarchy.len(),
            input.lods.len()
        );

        let mut lods = Vec::with_capacity(input.lods.len());
        for (level, meshes) in input.lods.iter().enumerate() {
            for name in meshes.keys() {
                if hierarchy.find_surface(name).is_none() {
                    tracing::debug!("LOD {level}: {name} is not in the LOD 0 hierarchy, skipping");
                }
            }

            let mut present = Vec::new();
            for info in &hierarchy.surfaces {
                let Some(mesh) = meshes.get(&info.name) else {
                    continue;
                };
                let surface = build_surface(info, mesh, binding.bones(), options).inspect_err(
                    |err| tracing::error!("could not build surface {} of LOD {level}: {err}", info.name),
                )?;
                present.push(surface);
            }
            lods.push(Lod::from_present(hierarchy.len(), present)?);
        }

        let (anim_name, num_bones) = match binding {
            BoneBinding::Default => (DEFAULT_ANIM_NAME.to_string(), 1),
            BoneBinding::Skeleton { anim_name, bones } => (anim_name.clone(), bones.len()),
        };

        Ok(Self {
            name: input.name.replace('\\', "/"),
            anim_name,
            num_bones,
            hierarchy,
            lods,
        })
    }
}
