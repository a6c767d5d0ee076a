//! # Ghoul2
//!
//! A pure-Rust library for the Ghoul2 model formats of Jedi Knight II and
//! Jedi Academy.
//!
//! ## Supported Formats
//!
//! - **GLA** - Skeletons with compressed animation frames
//! - **GLM** - Skinned meshes with surface hierarchies and LODs
//! - **animation.cfg** - Named animation sequences
//!
//! ## Quick Start
//!
//! ### Reading a Model
//!
//! ```no_run
//! use ghoul2::scene::Scene;
//! use ghoul2::formats::gla::GlaReadOptions;
//!
//! let mut scene = Scene::new("~/jka/GameData/base");
//! scene.load_model("models/players/kyle/model", &GlaReadOptions::skeleton_only())?;
//! println!("Bones: {:?}", scene.bone_names());
//! # Ok::<(), ghoul2::Error>(())
//! ```
//!
//! ### Decoding Animation Frames
//!
//! ```no_run
//! use ghoul2::formats::gla::{GlaReadOptions, read_gla};
//!
//! let result = read_gla("_humanoid.gla", &GlaReadOptions::frame_range(0, 10))?;
//! let gla = result.gla;
//! if let Some(animation) = &gla.animation {
//!     let poses = animation.decode_poses(&gla.skeleton, None)?;
//!     println!("Decoded {} frames", poses.len());
//! }
//! # Ok::<(), ghoul2::Error>(())
//! ```
//!
//! ### Using the Prelude
//!
//! ```
//! use ghoul2::prelude::*;
//!
//! // Now you have access to:
//! // - GlaFile, GlmFile, Skeleton, Surface
//! // - read/write functions for both formats
//! // - Scene, AnimationCfg, Error, Result
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `ghoul2` command-line binary

pub mod error;
pub mod formats;
pub mod progress;
pub mod scene;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::formats::common::{FormatWarning, Mat34};

    // Skeleton and animation
    pub use crate::formats::gla::{
        AnimationLoadMode, AnimationStream, Bone, BoneNode, BoneTransform, GlaFile,
        GlaReadOptions, GlaReadResult, HierarchyFix, Skeleton, read_gla, write_gla,
    };

    // Meshes
    pub use crate::formats::glm::{
        BoneBinding, GlmFile, GlmReadResult, Lod, MeshCorner, MeshInput, ModelInput, Surface,
        SurfaceBuildOptions, SurfaceHierarchy, SurfaceNode, Triangle, Vertex, VertexWeights,
        read_glm, write_glm,
    };

    pub use crate::formats::animation_cfg::{AnimationCfg, AnimationSequence};
    pub use crate::progress::{G2Phase, G2Progress, G2ProgressCallback};
    pub use crate::scene::{Scene, validate_tree};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
