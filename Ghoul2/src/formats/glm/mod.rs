//! GLM (Ghoul2 mesh) file format support
//!
//! A `.glm` file holds a model's surfaces at one or more levels of detail,
//! skinned against the skeleton of the `.gla` named in its header:
//!
//! ```text
//! header (164 bytes)
//! surface offset table   numSurfaces x i32, relative to the end of the header
//! surface infos          name, flags, shader, parent, children
//! LODs                   per LOD: ofsEnd, surface offsets, surface geometry
//! ```

mod builder;
mod header;
mod hierarchy;
mod inspect;
mod lod;
mod reader;
mod surface;
mod triangle;
mod vertex;
mod writer;

pub use builder::{
    BoneBinding, BoneLookup, DEFAULT_ANIM_NAME, MeshCorner, MeshInput, ModelInput,
    SurfaceBuildOptions, build_surface, prune_influences,
};
pub use header::{GLM_HEADER_SIZE, GLM_IDENT, GLM_VERSION, GlmHeader};
pub use hierarchy::{
    SURFACE_FLAG_OFF, SURFACE_FLAG_TAG, SurfaceHierarchy, SurfaceInfo, SurfaceNode,
};
pub use inspect::{GlmInfo, GlmLodInfo, GlmSurfaceInfo, inspect_glm};
pub use lod::Lod;
pub use reader::{GlmReadResult, parse_glm_bytes, read_glm};
pub use surface::{SURFACE_HEADER_SIZE, Surface, SurfaceLayout};
pub use triangle::{TRIANGLE_SIZE, Triangle};
pub use vertex::{MAX_BONE_REFERENCES, MAX_WEIGHTS, UV_SIZE, VERTEX_SIZE, Vertex, VertexWeights};
pub use writer::{write_glm, write_glm_bytes};

/// A model: surface hierarchy plus geometry per level of detail.
#[derive(Debug, Clone, PartialEq)]
pub struct GlmFile {
    /// Internal name, usually the game-relative path without extension.
    pub name: String,
    /// The `.gla` the model is skinned against, or `*default`.
    pub anim_name: String,
    /// Bone count of that skeleton.
    pub num_bones: usize,
    pub hierarchy: SurfaceHierarchy,
    /// Every LOD holds one record per hierarchy surface.
    pub lods: Vec<Lod>,
}

impl GlmFile {
    /// Whether the model uses the single-bone default skeleton.
    #[must_use]
    pub fn uses_default_skeleton(&self) -> bool {
        BoneBinding::is_default_name(&self.anim_name)
    }

    /// Geometry of a surface at a LOD.
    #[must_use]
    pub fn surface(&self, lod: usize, name: &str) -> Option<&Surface> {
        let index = self.hierarchy.find_surface(name)?;
        self.lods.get(lod)?.surfaces.get(index)
    }
}
