//! Bone hierarchy of a `.gla` file
//!
//! Bones live in a flat list; `parent` and `children` refer to positions in
//! that list. The list order is the file order, but animation has to be
//! processed parent-first, see [`Skeleton::hierarchy_order`].

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::Write;

use super::header::{GLA_HEADER_SIZE, GlaHeader};
use crate::error::{Error, Result};
use crate::formats::common::{
    Mat34, SectionCursor, count_to_i32, offset_from_i32, read_qpath, write_qpath,
};

/// Name given to the single bone of the default skeleton.
pub const DEFAULT_BONE_NAME: &str = "root";

/// A bone record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bone {
    pub name: String,
    pub flags: u32,
    /// Index of the parent bone, `-1` for roots.
    pub parent: i32,
    pub base_pose: Mat34,
    pub base_pose_inv: Mat34,
    pub children: Vec<i32>,
    /// Position in the bone list. Not stored in the file.
    #[serde(skip)]
    pub index: usize,
}

impl Bone {
    /// Size of the record without children.
    pub const BASE_SIZE: usize = 64 + 4 + 4 + 2 * Mat34::SIZE + 4;

    /// Size of this bone's record in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        Self::BASE_SIZE + 4 * self.children.len()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent < 0
    }

    /// Parent index, `None` for roots.
    #[must_use]
    pub fn parent_index(&self) -> Option<usize> {
        usize::try_from(self.parent).ok()
    }

    fn read(cursor: &mut SectionCursor<'_>, index: usize) -> Result<Self> {
        let name = read_qpath(cursor)?;
        let flags = cursor.read_u32::<LittleEndian>()?;
        let parent = cursor.read_i32::<LittleEndian>()?;
        let base_pose = Mat34::read(cursor)?;
        let base_pose_inv = Mat34::read(cursor)?;

        let num_children = offset_from_i32("bone child count", cursor.read_i32::<LittleEndian>()?)?;
        let mut children = Vec::new();
        for _ in 0..num_children {
            children.push(cursor.read_i32::<LittleEndian>()?);
        }

        Ok(Self {
            name,
            flags,
            parent,
            base_pose,
            base_pose_inv,
            children,
            index,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_qpath(writer, &self.name, "bone name")?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_i32::<LittleEndian>(self.parent)?;
        self.base_pose.write(writer)?;
        self.base_pose_inv.write(writer)?;
        writer.write_i32::<LittleEndian>(count_to_i32(self.children.len())?)?;
        for &child in &self.children {
            writer.write_i32::<LittleEndian>(child)?;
        }
        Ok(())
    }
}

/// A host-neutral bone description used to build a [`Skeleton`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoneNode {
    pub name: String,
    /// Index of the parent node in the same node list.
    pub parent: Option<usize>,
    /// Base pose in model space.
    pub base_pose: Mat34,
    pub flags: u32,
}

impl BoneNode {
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<usize>, base_pose: Mat34) -> Self {
        Self {
            name: name.into(),
            parent,
            base_pose,
            flags: 0,
        }
    }
}

/// The bone list of a `.gla` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
}

impl Skeleton {
    /// The single-bone skeleton used by models without a `.gla`.
    #[must_use]
    pub fn default_skeleton() -> Self {
        Self {
            bones: vec![Bone {
                name: DEFAULT_BONE_NAME.to_string(),
                flags: 0,
                parent: -1,
                base_pose: Mat34::IDENTITY,
                base_pose_inv: Mat34::IDENTITY,
                children: Vec::new(),
                index: 0,
            }],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Read the bone offset table and every bone it points to.
    ///
    /// Expects the cursor right after the header.
    ///
    /// # Errors
    /// Returns an error if an offset points outside the data or a record is
    /// truncated.
    pub fn read(cursor: &mut SectionCursor<'_>, header: &GlaHeader) -> Result<Self> {
        cursor.expect_position("bone offsets", GLA_HEADER_SIZE)?;
        let num_bones = offset_from_i32("bone count", header.num_bones)?;

        let mut offsets = Vec::new();
        for _ in 0..num_bones {
            offsets.push(offset_from_i32("bone offset", cursor.read_i32::<LittleEndian>()?)?);
        }

        let mut bones = Vec::with_capacity(offsets.len());
        for (index, offset) in offsets.into_iter().enumerate() {
            cursor.seek_to("bone", GLA_HEADER_SIZE + offset)?;
            bones.push(Bone::read(cursor, index)?);
        }

        tracing::debug!("Read {} bones", bones.len());
        Ok(Self { bones })
    }

    /// Offsets of each bone record relative to the end of the header.
    #[must_use]
    pub fn bone_offsets(&self) -> Vec<usize> {
        let mut offset = 4 * self.bones.len();
        self.bones
            .iter()
            .map(|bone| {
                let current = offset;
                offset += bone.byte_size();
                current
            })
            .collect()
    }

    /// Size of the offset table plus all bone records.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        4 * self.bones.len() + self.bones.iter().map(Bone::byte_size).sum::<usize>()
    }

    /// Write the offset table followed by the bone records.
    ///
    /// # Errors
    /// Returns an error if a bone name is too long.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for offset in self.bone_offsets() {
            writer.write_i32::<LittleEndian>(count_to_i32(offset)?)?;
        }
        for bone in &self.bones {
            bone.write(writer)?;
        }
        Ok(())
    }

    /// Bone indices ordered so that every bone comes after its parent.
    ///
    /// # Errors
    /// Returns [`Error::Hierarchy`] if a parent index is out of range or the
    /// bones form a cycle.
    pub fn hierarchy_order(&self) -> Result<Vec<usize>> {
        let count = self.bones.len();
        for bone in &self.bones {
            if bone.parent >= 0 && bone.parent_index().is_none_or(|p| p >= count) {
                return Err(Error::Hierarchy {
                    message: format!("bone {} has invalid parent {}", bone.name, bone.parent),
                });
            }
        }

        let mut placed = vec![false; count];
        let mut order = Vec::with_capacity(count);
        let mut remaining: Vec<usize> = (0..count).collect();

        while !remaining.is_empty() {
            let before = order.len();
            remaining.retain(|&index| {
                let ready = self.bones[index].parent_index().is_none_or(|p| placed[p]);
                if ready {
                    placed[index] = true;
                    order.push(index);
                }
                !ready
            });

            if order.len() == before {
                let names: Vec<&str> = remaining
                    .iter()
                    .map(|&i| self.bones[i].name.as_str())
                    .collect();
                return Err(Error::Hierarchy {
                    message: format!("cyclic bone parents: {}", names.join(", ")),
                });
            }
        }

        Ok(order)
    }

    /// Build a skeleton from bone nodes.
    ///
    /// Bones are numbered in parent-before-child passes over the node list,
    /// so roots come first. Child lists and inverse base poses are derived.
    ///
    /// # Errors
    /// Returns [`Error::Hierarchy`] if a parent cannot be resolved.
    pub fn from_nodes(nodes: &[BoneNode]) -> Result<Self> {
        let mut node_to_bone: Vec<Option<usize>> = vec![None; nodes.len()];
        let mut bones: Vec<Bone> = Vec::with_capacity(nodes.len());
        let mut remaining: Vec<usize> = (0..nodes.len()).collect();

        while !remaining.is_empty() {
            let mut next = Vec::new();
            let mut added = false;

            for node_index in remaining {
                let node = &nodes[node_index];
                let parent = match node.parent {
                    None => Some(-1),
                    Some(p) => node_to_bone
                        .get(p)
                        .copied()
                        .flatten()
                        .map(count_to_i32)
                        .transpose()?,
                };

                match parent {
                    Some(parent) => {
                        let index = bones.len();
                        bones.push(Bone {
                            name: node.name.clone(),
                            flags: node.flags,
                            parent,
                            base_pose: node.base_pose,
                            base_pose_inv: node.base_pose.inverse(),
                            children: Vec::new(),
                            index,
                        });
                        node_to_bone[node_index] = Some(index);
                        added = true;
                    }
                    None => next.push(node_index),
                }
            }

            if !added {
                return Err(Error::Hierarchy {
                    message: "failed to find bone parent".to_string(),
                });
            }
            remaining = next;
        }

        for index in 0..bones.len() {
            if let Some(parent) = bones[index].parent_index() {
                let child = count_to_i32(index)?;
                bones[parent].children.push(child);
            }
        }

        Ok(Self { bones })
    }

    /// Map from bone name to bone index.
    #[must_use]
    pub fn bone_index_map(&self) -> HashMap<String, usize> {
        self.bones
            .iter()
            .enumerate()
            .map(|(i, bone)| (bone.name.clone(), i))
            .collect()
    }

    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    /// Whether every bone of this skeleton exists in `available`.
    #[must_use]
    pub fn fits<'a>(&self, available: impl IntoIterator<Item = &'a str>) -> bool {
        self.check_fits(available).is_ok()
    }

    /// Check that every bone of this skeleton exists in `available`.
    ///
    /// # Errors
    /// Returns [`Error::BoneNotFound`] for the first missing bone.
    pub fn check_fits<'a>(&self, available: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let available: HashSet<&str> = available.into_iter().collect();
        match self.bones.iter().find(|b| !available.contains(b.name.as_str())) {
            Some(missing) => Err(Error::BoneNotFound {
                name: missing.name.clone(),
            }),
            None => Ok(()),
        }
    }
}
