//! GLA (Ghoul2 animation) file format support
//!
//! A `.gla` file holds a skeleton and its animation:
//!
//! ```text
//! header (100 bytes)
//! bone offset table    numBones x i32, relative to the end of the header
//! bone records         name, flags, parent, base pose, inverse, children
//! frames               numFrames x numBones x 24-bit pool index, 4-aligned
//! bone pool            N x 14-byte quantized relative transforms
//! ```

mod animation;
mod comp_bone;
mod header;
mod hierarchy_fix;
mod inspect;
mod reader;
mod skeleton;
mod writer;

pub use animation::{AnimationFrame, AnimationStream, MAX_POOL_INDEX, frames_byte_size};
pub use comp_bone::{BoneTransform, COMP_BONE_SIZE, CompBone};
pub use header::{GLA_HEADER_SIZE, GLA_IDENT, GLA_VERSION, GlaHeader};
pub use hierarchy_fix::{HierarchyFix, ParentChanges};
pub use inspect::{GlaBoneInfo, GlaInfo, inspect_gla};
pub use reader::{
    AnimationLoadMode, GlaReadOptions, GlaReadResult, parse_gla_bytes, read_bone_index_map,
    read_gla,
};
pub use skeleton::{Bone, BoneNode, DEFAULT_BONE_NAME, Skeleton};
pub use writer::{write_gla, write_gla_bytes};

/// A skeleton with optional animation.
#[derive(Debug, Clone, PartialEq)]
pub struct GlaFile {
    /// Internal name, usually the game-relative path without extension.
    pub name: String,
    pub scale: f32,
    pub skeleton: Skeleton,
    /// `None` when only the skeleton was loaded.
    pub animation: Option<AnimationStream>,
}

impl GlaFile {
    /// The stand-in for models that use no `.gla` file.
    #[must_use]
    pub fn default_skeleton() -> Self {
        Self {
            name: "*default".to_string(),
            scale: 1.0,
            skeleton: Skeleton::default_skeleton(),
            animation: None,
        }
    }

    /// Apply a reparenting preset to the skeleton.
    ///
    /// Frames keep referring to the stored parents, so the result is meant
    /// for display only.
    ///
    /// # Errors
    /// Returns [`crate::Error::Hierarchy`] if the preset produces a cycle.
    pub fn apply_hierarchy_fix(&mut self, fix: HierarchyFix) -> crate::Result<ParentChanges> {
        let changes = fix.resolve(&self.skeleton);
        changes.apply(&mut self.skeleton)?;
        Ok(changes)
    }
}
