//! Model scenes
//!
//! A [`Scene`] ties a `.glm` to the `.gla` named in its header and the
//! `animation.cfg` stored next to that skeleton, resolving game paths
//! against one base directory.

pub mod paths;
mod validate;

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::formats::animation_cfg::{AnimationCfg, read_animation_cfg};
use crate::formats::common::FormatWarning;
use crate::formats::gla::{GlaFile, GlaReadOptions, read_gla, write_gla};
use crate::formats::glm::{BoneBinding, GlmFile, Surface, read_glm, write_glm};

pub use paths::{abs_path, find_file, path_to_file, rel_path, remove_extension, split_prefix};
pub use validate::{
    ModelFileKind, ValidationEntry, ValidationSummary, find_model_files, validate_file,
    validate_tree,
};

/// A model with its skeleton and animation table.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    base_path: PathBuf,
    pub glm: Option<GlmFile>,
    pub gla: Option<GlaFile>,
    /// Where the skeleton was loaded from; `None` for the default skeleton.
    pub gla_path: Option<PathBuf>,
    pub animation_cfg: Option<AnimationCfg>,
    /// Format warnings of every file loaded so far.
    pub warnings: Vec<FormatWarning>,
}

impl Scene {
    /// Create a scene resolving game paths against `base_path`.
    ///
    /// A leading `~` is expanded to the home directory.
    #[must_use]
    pub fn new(base_path: &str) -> Self {
        let expanded = shellexpand::tilde(base_path);
        Self {
            base_path: PathBuf::from(expanded.as_ref()),
            ..Self::default()
        }
    }

    /// Create a scene for a file inside a game data tree.
    ///
    /// Returns the scene and the game path of the file.
    #[must_use]
    pub fn for_file(path: &Path) -> (Self, String) {
        let (prefix, relative) = split_prefix(path);
        let relative = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let scene = Self {
            base_path: prefix,
            ..Self::default()
        };
        (scene, relative)
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Game path of a file below the base directory.
    #[must_use]
    pub fn rel_path(&self, full_path: &Path) -> String {
        rel_path(full_path, &self.base_path)
    }

    fn find(&self, relative: &str, extension: &str) -> Result<PathBuf> {
        find_file(relative, &self.base_path, &[extension]).ok_or_else(|| Error::FileNotFound {
            path: format!("{relative}.{extension}"),
            base: self.base_path.clone(),
        })
    }

    /// Load a `.glm` by game path; the extension is optional.
    ///
    /// # Errors
    /// Returns [`Error::FileNotFound`] or any read error.
    pub fn load_glm(&mut self, relative: &str) -> Result<()> {
        let path = self.find(relative, "glm")?;
        let result = read_glm(&path)?;
        self.warnings.extend(result.warnings);
        self.glm = Some(result.glm);
        Ok(())
    }

    /// Load a `.gla` by game path; `*default` or an empty path selects the
    /// single-bone default skeleton.
    ///
    /// # Errors
    /// Returns [`Error::FileNotFound`] or any read error.
    pub fn load_gla(&mut self, relative: &str, options: &GlaReadOptions) -> Result<()> {
        if BoneBinding::is_default_name(relative) {
            tracing::debug!("Using default skeleton");
            self.gla = Some(GlaFile::default_skeleton());
            self.gla_path = None;
            return Ok(());
        }

        let path = self.find(relative, "gla")?;
        let result = read_gla(&path, options)?;
        self.warnings.extend(result.warnings);
        self.gla = Some(result.gla);
        self.gla_path = Some(path);
        Ok(())
    }

    /// Load the `animation.cfg` next to the loaded skeleton.
    ///
    /// Returns `false` if there is none.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub fn load_animation_cfg(&mut self) -> Result<bool> {
        let Some(dir) = self.gla_path.as_deref().and_then(Path::parent) else {
            return Ok(false);
        };
        let path = dir.join("animation.cfg");
        if !path.is_file() {
            tracing::debug!("No animation.cfg in {}", dir.display());
            return Ok(false);
        }
        self.animation_cfg = Some(read_animation_cfg(&path)?);
        Ok(true)
    }

    /// Load a model together with the skeleton it requests and that
    /// skeleton's `animation.cfg`.
    ///
    /// # Errors
    /// Returns an error if a file is missing or unreadable, or if the bone
    /// counts of model and skeleton differ.
    pub fn load_model(&mut self, relative: &str, options: &GlaReadOptions) -> Result<()> {
        self.load_glm(relative)?;
        let requested = self.requested_gla().unwrap_or_default().to_string();
        self.load_gla(&requested, options)?;
        self.check_bone_count()?;
        self.load_animation_cfg()?;
        Ok(())
    }

    /// The skeleton named in the loaded model's header.
    #[must_use]
    pub fn requested_gla(&self) -> Option<&str> {
        self.glm.as_ref().map(|glm| glm.anim_name.as_str())
    }

    /// Check that model and skeleton agree on the bone count.
    ///
    /// # Errors
    /// Returns [`Error::BoneCountMismatch`] if they differ.
    pub fn check_bone_count(&self) -> Result<()> {
        match (&self.glm, &self.gla) {
            (Some(glm), Some(gla)) if glm.num_bones != gla.skeleton.len() => {
                Err(Error::BoneCountMismatch {
                    skeleton: gla.skeleton.len(),
                    model: glm.num_bones,
                })
            }
            _ => Ok(()),
        }
    }

    /// Bone names by bone index.
    #[must_use]
    pub fn bone_names(&self) -> Vec<&str> {
        self.gla
            .iter()
            .flat_map(|gla| gla.skeleton.bones.iter())
            .map(|bone| bone.name.as_str())
            .collect()
    }

    /// Names of the bones a surface's bone references point to.
    ///
    /// # Errors
    /// Returns [`Error::InvalidIndex`] for a reference outside the skeleton.
    pub fn surface_bone_names(&self, surface: &Surface) -> Result<Vec<&str>> {
        let names = self.bone_names();
        surface
            .bone_references
            .iter()
            .map(|&bone| {
                usize::try_from(bone)
                    .ok()
                    .and_then(|index| names.get(index).copied())
                    .ok_or_else(|| {
                        Error::InvalidIndex(format!(
                            "surface {} references bone {bone}, skeleton has {}",
                            surface.index,
                            names.len()
                        ))
                    })
            })
            .collect()
    }

    /// Write a model to `<base>/<relative>.glm`, creating directories.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn save_glm(&self, glm: &GlmFile, relative: &str) -> Result<PathBuf> {
        let path = abs_path(&format!("{relative}.glm"), &self.base_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_glm(glm, &path)?;
        Ok(path)
    }

    /// Write a skeleton to `<base>/<relative>.gla`, creating directories.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn save_gla(&self, gla: &GlaFile, relative: &str) -> Result<PathBuf> {
        let path = abs_path(&format!("{relative}.gla"), &self.base_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_gla(gla, &path)?;
        Ok(path)
    }
}
