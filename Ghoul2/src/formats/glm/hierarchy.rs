//! Surface hierarchy records
//!
//! Right after the header, a `.glm` lists every surface once: an offset
//! table relative to the end of the header, followed by one record per
//! surface with its name, flags, shader and tree links. Geometry lives in
//! the LODs and refers back to these records by index.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

use super::header::{GLM_HEADER_SIZE, GlmHeader};
use crate::error::{Error, Result};
use crate::formats::common::{
    MAX_QPATH, SectionCursor, count_to_i32, offset_from_i32, read_qpath, write_qpath,
};

/// Surface is a tag: a triangle that only marks a position and orientation.
pub const SURFACE_FLAG_TAG: u32 = 0x1;
/// Surface is hidden by default.
pub const SURFACE_FLAG_OFF: u32 = 0x2;

/// Name, shader and tree links of one surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceInfo {
    pub name: String,
    pub flags: u32,
    pub shader: String,
    /// Index of the parent surface, `-1` for surfaces at the top level.
    pub parent: i32,
    pub children: Vec<i32>,
    /// Position in the hierarchy. Not stored in the file.
    #[serde(skip)]
    pub index: usize,
}

impl SurfaceInfo {
    /// Size of the record without children.
    pub const BASE_SIZE: usize = MAX_QPATH + 4 + MAX_QPATH + 3 * 4;

    #[must_use]
    pub fn byte_size(&self) -> usize {
        Self::BASE_SIZE + 4 * self.children.len()
    }

    #[must_use]
    pub fn is_tag(&self) -> bool {
        self.flags & SURFACE_FLAG_TAG != 0
    }

    #[must_use]
    pub fn is_off(&self) -> bool {
        self.flags & SURFACE_FLAG_OFF != 0
    }

    fn read(cursor: &mut SectionCursor<'_>, index: usize) -> Result<Self> {
        let name = read_qpath(cursor)?;
        let flags = cursor.read_u32::<LittleEndian>()?;
        let shader = read_qpath(cursor)?;
        // shader index, only filled in by the game
        let _shader_index = cursor.read_i32::<LittleEndian>()?;
        let parent = cursor.read_i32::<LittleEndian>()?;

        let num_children = offset_from_i32("surface child count", cursor.read_i32::<LittleEndian>()?)?;
        let mut children = Vec::new();
        for _ in 0..num_children {
            children.push(cursor.read_i32::<LittleEndian>()?);
        }

        Ok(Self {
            name,
            flags,
            shader,
            parent,
            children,
            index,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_qpath(writer, &self.name, "surface name")?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        write_qpath(writer, &self.shader, "surface shader")?;
        writer.write_i32::<LittleEndian>(0)?;
        writer.write_i32::<LittleEndian>(self.parent)?;
        writer.write_i32::<LittleEndian>(count_to_i32(self.children.len())?)?;
        for &child in &self.children {
            writer.write_i32::<LittleEndian>(child)?;
        }
        Ok(())
    }
}

/// A host-neutral surface tree node used to build a [`SurfaceHierarchy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceNode {
    pub name: String,
    pub shader: String,
    pub flags: u32,
    pub children: Vec<SurfaceNode>,
}

impl SurfaceNode {
    #[must_use]
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            flags: 0,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: SurfaceNode) -> Self {
        self.children.push(child);
        self
    }
}

/// All surfaces of a model, indexed by surface index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SurfaceHierarchy {
    pub surfaces: Vec<SurfaceInfo>,
}

impl SurfaceHierarchy {
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Read the offset table and every surface record it points to.
    ///
    /// Expects the cursor right after the header.
    ///
    /// # Errors
    /// Returns an error if an offset points outside the data or a record is
    /// truncated.
    pub fn read(cursor: &mut SectionCursor<'_>, header: &GlmHeader) -> Result<Self> {
        cursor.expect_position("surface offsets", GLM_HEADER_SIZE)?;
        let num_surfaces = offset_from_i32("surface count", header.num_surfaces)?;

        let mut offsets = Vec::new();
        for _ in 0..num_surfaces {
            offsets.push(offset_from_i32("surface offset", cursor.read_i32::<LittleEndian>()?)?);
        }

        let hierarchy_start = offset_from_i32("ofsSurfHierarchy", header.ofs_surf_hierarchy)?;
        cursor.expect_position("surface hierarchy", hierarchy_start)?;

        let mut surfaces = Vec::with_capacity(offsets.len());
        for (index, offset) in offsets.into_iter().enumerate() {
            cursor.seek_to("surface info", GLM_HEADER_SIZE + offset)?;
            surfaces.push(SurfaceInfo::read(cursor, index)?);
        }

        tracing::debug!("Read {} surface infos", surfaces.len());
        Ok(Self { surfaces })
    }

    /// Offsets of each record relative to the end of the header.
    #[must_use]
    pub fn surface_offsets(&self) -> Vec<usize> {
        let mut offset = 4 * self.surfaces.len();
        self.surfaces
            .iter()
            .map(|surface| {
                let current = offset;
                offset += surface.byte_size();
                current
            })
            .collect()
    }

    /// Size of the offset table plus all records.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        4 * self.surfaces.len() + self.surfaces.iter().map(SurfaceInfo::byte_size).sum::<usize>()
    }

    /// Write the offset table followed by the records.
    ///
    /// # Errors
    /// Returns an error if a name or shader is too long.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for offset in self.surface_offsets() {
            writer.write_i32::<LittleEndian>(count_to_i32(offset)?)?;
        }
        for surface in &self.surfaces {
            surface.write(writer)?;
        }
        Ok(())
    }

    /// Map from surface name to surface index.
    #[must_use]
    pub fn surface_index_map(&self) -> HashMap<String, usize> {
        self.surfaces
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect()
    }

    #[must_use]
    pub fn find_surface(&self, name: &str) -> Option<usize> {
        self.surfaces.iter().position(|s| s.name == name)
    }

    /// Build the hierarchy from a surface tree.
    ///
    /// Surfaces are numbered depth-first. A node's children are numbered
    /// when the node itself is processed, before descending into them.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateSurfaceName`] if two nodes share a name.
    pub fn from_tree(roots: &[SurfaceNode]) -> Result<Self> {
        let mut builder = HierarchyBuilder::default();
        for root in roots {
            let index = builder.assign(&root.name)?;
            builder.visit(root, index, -1)?;
        }
        builder.finish()
    }
}

#[derive(Default)]
struct HierarchyBuilder {
    slots: Vec<Option<SurfaceInfo>>,
    by_name: HashMap<String, usize>,
}

impl HierarchyBuilder {
    fn assign(&mut self, name: &str) -> Result<usize> {
        let next = self.slots.len();
        if let Some(&first) = self.by_name.get(name) {
            return Err(Error::DuplicateSurfaceName {
                name: name.to_string(),
                first,
                second: next,
            });
        }
        self.by_name.insert(name.to_string(), next);
        self.slots.push(None);
        Ok(next)
    }

    fn visit(&mut self, node: &SurfaceNode, index: usize, parent: i32) -> Result<()> {
        let child_indices = node
            .children
            .iter()
            .map(|child| self.assign(&child.name))
            .collect::<Result<Vec<_>>>()?;

        self.slots[index] = Some(SurfaceInfo {
            name: node.name.clone(),
            flags: node.flags,
            shader: node.shader.clone(),
            parent,
            children: child_indices
                .iter()
                .map(|&i| count_to_i32(i))
                .collect::<Result<_>>()?,
            index,
        });

        let this = count_to_i32(index)?;
        for (child, child_index) in node.children.iter().zip(child_indices) {
            self.visit(child, child_index, this)?;
        }
        Ok(())
    }

    fn finish(self) -> Result<SurfaceHierarchy> {
        let missing: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.is_none().then_some(i))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Gap {
                collection: "surface hierarchy",
                missing,
            });
        }
        Ok(SurfaceHierarchy {
            surfaces: self.slots.into_iter().flatten().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<SurfaceNode> {
        let arm = SurfaceNode::new("arm", "models/arm")
            .with_child(SurfaceNode::new("hand", "models/arm"))
            .with_child(SurfaceNode::new("*hand_tag", "").with_flags(SURFACE_FLAG_TAG));
        let torso = SurfaceNode::new("torso", "models/torso")
            .with_child(arm.with_child(SurfaceNode::new("elbow_cap", "models/arm")))
            .with_child(SurfaceNode::new("head", "models/head"));
        vec![torso, SurfaceNode::new("shadow", "").with_flags(SURFACE_FLAG_OFF)]
    }

    #[test]
    fn test_depth_first_numbering() {
        let hierarchy = SurfaceHierarchy::from_tree(&tree()).unwrap();
        let names: Vec<&str> = hierarchy.surfaces.iter().map(|s| s.name.as_str()).collect();
        // children are numbered before the walk descends into them
        assert_eq!(
            names,
            ["torso", "arm", "head", "hand", "*hand_tag", "elbow_cap", "shadow"]
        );

        let torso = &hierarchy.surfaces[0];
        assert_eq!(torso.parent, -1);
        assert_eq!(torso.children, vec![1, 2]);
        let arm = &hierarchy.surfaces[1];
        assert_eq!(arm.parent, 0);
        assert_eq!(arm.children, vec![3, 4, 5]);
        assert!(hierarchy.surfaces[4].is_tag());
        assert!(hierarchy.surfaces[6].is_off());
        assert_eq!(hierarchy.surfaces[6].parent, -1);

        for (i, surface) in hierarchy.surfaces.iter().enumerate() {
            assert_eq!(surface.index, i);
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let roots = vec![
            SurfaceNode::new("body", "").with_child(SurfaceNode::new("cap", "")),
            SurfaceNode::new("cap", ""),
        ];
        let err = SurfaceHierarchy::from_tree(&roots).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateSurfaceName { ref name, first: 1, second: 2 } if name == "cap"
        ));
    }

    #[test]
    fn test_offsets_and_round_trip() {
        let hierarchy = SurfaceHierarchy::from_tree(&tree()).unwrap();
        let offsets = hierarchy.surface_offsets();
        assert_eq!(offsets[0], 4 * 7);
        assert_eq!(offsets[1], 28 + SurfaceInfo::BASE_SIZE + 8);

        let mut buf = vec![0u8; GLM_HEADER_SIZE as usize];
        hierarchy.write(&mut buf).unwrap();
        assert_eq!(buf.len(), GLM_HEADER_SIZE as usize + hierarchy.byte_size());

        let header = GlmHeader {
            name: String::new(),
            anim_name: String::new(),
            num_bones: 1,
            num_lods: 0,
            ofs_lods: buf.len() as i32,
            num_surfaces: 7,
            ofs_surf_hierarchy: (GLM_HEADER_SIZE + 28) as i32,
            ofs_end: buf.len() as i32,
        };
        let mut cursor = SectionCursor::new(&buf);
        cursor.seek_to("surface offsets", GLM_HEADER_SIZE).unwrap();
        let back = SurfaceHierarchy::read(&mut cursor, &header).unwrap();
        assert!(cursor.warnings().is_empty());
        assert_eq!(back, hierarchy);
    }
}
