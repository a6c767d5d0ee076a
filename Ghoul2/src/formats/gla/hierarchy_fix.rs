//! Reparenting presets for known skeletons
//!
//! Some shipped skeletons attach helper bones to odd parents. A preset moves
//! those bones under a more useful parent for display. The animation codec
//! always works with the parents stored in the file, so a fixed skeleton
//! should not be used to encode animation for the original one.

use std::fmt;
use std::str::FromStr;

use super::skeleton::Skeleton;
use crate::error::{Error, Result};
use crate::formats::common::count_to_i32;

/// Named reparenting presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HierarchyFix {
    #[default]
    None,
    /// Jedi Academy humanoid: hand tag bones follow the hands.
    JkaHumanoid,
}

/// `(bone, new parent)` name pairs of the humanoid preset.
const JKA_HUMANOID_CHANGES: &[(&str, &str)] = &[
    ("lhang_tag_bone", "lhand"),
    ("rhang_tag_bone", "rhand"),
];

impl HierarchyFix {
    fn name_pairs(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::None => &[],
            Self::JkaHumanoid => JKA_HUMANOID_CHANGES,
        }
    }

    /// Resolve the preset against a skeleton.
    ///
    /// Pairs naming bones the skeleton does not have are skipped, so a
    /// preset can be applied to any skeleton.
    #[must_use]
    pub fn resolve(self, skeleton: &Skeleton) -> ParentChanges {
        let changes = self
            .name_pairs()
            .iter()
            .filter_map(|&(bone, parent)| {
                let bone_index = skeleton.find_bone(bone);
                let parent_index = skeleton.find_bone(parent);
                if bone_index.is_none() || parent_index.is_none() {
                    tracing::debug!("Skipping hierarchy fix {bone} -> {parent}: bone not in skeleton");
                }
                Some((bone_index?, parent_index?))
            })
            .collect();
        ParentChanges { changes }
    }
}

impl fmt::Display for HierarchyFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::JkaHumanoid => write!(f, "jka-humanoid"),
        }
    }
}

impl FromStr for HierarchyFix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "jka" | "jka-humanoid" => Ok(Self::JkaHumanoid),
            other => Err(Error::InvalidIndex(format!("unknown hierarchy fix: {other}"))),
        }
    }
}

/// A resolved table of `(bone index, new parent index)` changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentChanges {
    pub changes: Vec<(usize, usize)>,
}

impl ParentChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Reparent the listed bones, updating both parents' child lists.
    ///
    /// # Errors
    /// Returns [`Error::InvalidIndex`] for indices outside the skeleton and
    /// [`Error::Hierarchy`] if the result is not a valid tree.
    pub fn apply(&self, skeleton: &mut Skeleton) -> Result<()> {
        let count = skeleton.bones.len();
        for &(bone, new_parent) in &self.changes {
            if bone >= count || new_parent >= count {
                return Err(Error::InvalidIndex(format!(
                    "hierarchy fix {bone} -> {new_parent} outside skeleton of {count} bones"
                )));
            }

            let bone_i32 = count_to_i32(bone)?;
            if let Some(old_parent) = skeleton.bones[bone].parent_index() {
                if let Some(old) = skeleton.bones.get_mut(old_parent) {
                    old.children.retain(|&child| child != bone_i32);
                }
            }
            skeleton.bones[new_parent].children.push(bone_i32);
            skeleton.bones[bone].parent = count_to_i32(new_parent)?;

            tracing::debug!(
                "Reparented {} under {}",
                skeleton.bones[bone].name,
                skeleton.bones[new_parent].name
            );
        }

        skeleton.hierarchy_order()?;
        Ok(())
    }
}
