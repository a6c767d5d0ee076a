//! Levels of detail
//!
//! Every LOD holds one geometry record per surface of the hierarchy, in
//! surface order. A surface a LOD does not have is stored as an empty
//! record instead of being left out.
//!
//! ```text
//! ofsEnd             i32, relative to the LOD start
//! surface offsets    numSurfaces x i32, relative to the end of ofsEnd
//! surfaces           geometry records
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use super::hierarchy::SurfaceHierarchy;
use super::surface::Surface;
use crate::error::{Error, Result};
use crate::formats::common::{
    FormatWarning, SectionCursor, SectionWriter, count_to_i32, offset_from_i32,
};

/// Smallest possible LOD record, the `ofsEnd` field alone.
pub(crate) const MIN_LOD_SIZE: usize = 4;

/// Geometry of every surface at one level of detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Lod {
    pub surfaces: Vec<Surface>,
}

impl Lod {
    /// Build a LOD from the surfaces it has, filling the rest with empty
    /// records.
    ///
    /// # Errors
    /// Returns [`Error::InvalidIndex`] if a surface index is out of range or
    /// appears twice.
    pub fn from_present(num_surfaces: usize, present: Vec<Surface>) -> Result<Self> {
        let mut slots: Vec<Option<Surface>> = vec![None; num_surfaces];
        for surface in present {
            let index = surface.index;
            match slots.get_mut(index) {
                Some(slot @ None) => *slot = Some(surface),
                Some(Some(_)) => {
                    return Err(Error::InvalidIndex(format!("surface {index} given twice")));
                }
                None => {
                    return Err(Error::InvalidIndex(format!(
                        "surface {index} out of range, model has {num_surfaces} surfaces"
                    )));
                }
            }
        }

        let surfaces = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or_else(|| Surface::make_empty(index)))
            .collect();
        Ok(Self { surfaces })
    }

    /// Number of surfaces with geometry.
    #[must_use]
    pub fn num_present(&self) -> usize {
        self.surfaces.iter().filter(|s| !s.is_empty()).count()
    }

    /// Offsets of each surface relative to the end of the `ofsEnd` field.
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

    /// Size of the LOD in bytes, which is also its `ofsEnd`.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        4 + 4 * self.surfaces.len() + self.surfaces.iter().map(Surface::byte_size).sum::<usize>()
    }

    /// Read one LOD at the cursor position.
    ///
    /// # Errors
    /// Returns an error if an offset points outside the data or a record is
    /// truncated.
    pub fn read(
        cursor: &mut SectionCursor<'_>,
        hierarchy: &SurfaceHierarchy,
        level: usize,
    ) -> Result<Self> {
        let start = cursor.position();
        let ofs_end = offset_from_i32("LOD ofsEnd", cursor.read_i32::<LittleEndian>()?)?;
        let table_end = (MIN_LOD_SIZE + 4 * hierarchy.len()) as u64;
        if ofs_end < table_end {
            return Err(Error::CorruptFile {
                message: format!(
                    "LOD {level} ends at {ofs_end}, before its surface table ({table_end})"
                ),
            });
        }

        let mut offsets = Vec::with_capacity(hierarchy.len());
        for _ in 0..hierarchy.len() {
            offsets.push(offset_from_i32("LOD surface offset", cursor.read_i32::<LittleEndian>()?)?);
        }

        let mut surfaces = Vec::with_capacity(offsets.len());
        for (index, offset) in offsets.into_iter().enumerate() {
            let name = &hierarchy.surfaces[index].name;
            cursor.expect_position(&format!("LOD {level} {name}"), start + 4 + offset)?;
            let mut surface = Surface::read(cursor, name)?;
            if surface.index != index {
                cursor.warn(FormatWarning::SurfaceIndexMismatch {
                    lod: level,
                    expected: index,
                    found: surface.index,
                });
                surface.index = index;
            }
            surfaces.push(surface);
        }

        cursor.expect_position(&format!("LOD {level} end"), start + ofs_end)?;
        Ok(Self { surfaces })
    }

    /// Write the LOD at the writer position.
    ///
    /// # Errors
    /// Returns an error if a surface cannot be written or lands off its
    /// computed offset.
    pub fn write(&self, writer: &mut SectionWriter) -> Result<()> {
        let start = writer.position();
        writer.write_i32::<LittleEndian>(count_to_i32(self.byte_size())?)?;
        let offsets = self.surface_offsets();
        for &offset in &offsets {
            writer.write_i32::<LittleEndian>(count_to_i32(offset)?)?;
        }

        for (surface, offset) in self.surfaces.iter().zip(offsets) {
            writer.expect_position("LOD surface", start + 4 + offset as u64)?;
            surface.write(writer)?;
        }

        writer.expect_position("LOD end", start + self.byte_size() as u64)?;
        Ok(())
    }
}
