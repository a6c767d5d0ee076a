//! File format handlers for Ghoul2 models
//!
//! - `gla` - skeleton and animation
//! - `glm` - meshes with surface hierarchy and LODs
//! - `animation_cfg` - named frame ranges stored next to a `.gla`

pub mod animation_cfg;
pub mod common;
pub mod gla;
pub mod glm;

// Re-export main file types
pub use animation_cfg::{AnimationCfg, AnimationSequence, read_animation_cfg, write_animation_cfg};
pub use common::FormatWarning;
pub use gla::{GlaFile, GlaReadOptions, inspect_gla, read_gla, write_gla};
pub use glm::{GlmFile, inspect_glm, read_glm, write_glm};
