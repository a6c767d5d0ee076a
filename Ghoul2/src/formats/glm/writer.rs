//! `.glm` file writing
//!
//! Offsets are computed in one forward pass over the hierarchy and the
//! LODs; the writer then checks every section against them.

use std::path::Path;

use super::GlmFile;
use super::header::{GLM_HEADER_SIZE, GlmHeader};
use crate::error::{Error, Result};
use crate::formats::common::{SectionWriter, count_to_i32};

impl GlmFile {
    /// Compute the header for the current contents.
    ///
    /// # Errors
    /// Returns an error if a count or offset does not fit the format.
    pub fn header(&self) -> Result<GlmHeader> {
        let header_size = GLM_HEADER_SIZE as usize;
        let ofs_surf_hierarchy = header_size + 4 * self.hierarchy.len();
        let ofs_lods = header_size + self.hierarchy.byte_size();
        let ofs_end = ofs_lods + self.lods.iter().map(super::Lod::byte_size).sum::<usize>();

        Ok(GlmHeader {
            name: self.name.clone(),
            anim_name: self.anim_name.clone(),
            num_bones: count_to_i32(self.num_bones)?,
            num_lods: count_to_i32(self.lods.len())?,
            ofs_lods: count_to_i32(ofs_lods)?,
            num_surfaces: count_to_i32(self.hierarchy.len())?,
            ofs_surf_hierarchy: count_to_i32(ofs_surf_hierarchy)?,
            ofs_end: count_to_i32(ofs_end)?,
        })
    }

    /// Check that every LOD has one record per surface, in surface order.
    ///
    /// # Errors
    /// Returns [`Error::InvalidIndex`] on the first inconsistency.
    pub fn validate_lods(&self) -> Result<()> {
        for (level, lod) in self.lods.iter().enumerate() {
            if lod.surfaces.len() != self.hierarchy.len() {
                return Err(Error::InvalidIndex(format!(
                    "LOD {level} has {} surfaces, hierarchy has {}",
                    lod.surfaces.len(),
                    self.hierarchy.len()
                )));
            }
            if let Some((slot, surface)) = lod
                .surfaces
                .iter()
                .enumerate()
                .find(|(slot, surface)| surface.index != *slot)
            {
                return Err(Error::InvalidIndex(format!(
                    "LOD {level} stores surface {} in slot {slot}",
                    surface.index
                )));
            }
        }
        Ok(())
    }

    /// Serialize to bytes.
    ///
    /// # Errors
    /// Returns an error if the LODs do not match the hierarchy, a name is
    /// too long, a surface has too many bone references, or the layout
    /// cannot be represented.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.validate_lods()?;

        let header = self.header()?;
        let end = header.ofs_end as u64;
        let mut writer = SectionWriter::with_capacity(end as usize);

        header.write(&mut writer)?;
        writer.expect_position("surface offsets", GLM_HEADER_SIZE)?;
        self.hierarchy.write(&mut writer)?;
        writer.expect_position("LODs", header.ofs_lods as u64)?;
        for lod in &self.lods {
            lod.write(&mut writer)?;
        }
        writer.expect_position("end", end)?;

        Ok(writer.into_inner())
    }
}

/// Serialize a `.glm` file to bytes.
///
/// # Errors
/// See [`GlmFile::to_bytes`].
pub fn write_glm_bytes(glm: &GlmFile) -> Result<Vec<u8>> {
    glm.to_bytes()
}

/// Write a `.glm` file to disk.
///
/// # Errors
/// Returns an error if serialization or the file write fails.
pub fn write_glm<P: AsRef<Path>>(glm: &GlmFile, path: P) -> Result<()> {
    let path = path.as_ref();
    let data = glm.to_bytes()?;
    std::fs::write(path, &data)?;
    tracing::info!("Wrote {} ({} bytes)", path.display(), data.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::glm::{
        Lod, Surface, SurfaceHierarchy, SurfaceNode, Triangle, Vertex, VertexWeights,
        parse_glm_bytes,
    };

    fn surface(index: usize, bone_references: Vec<i32>) -> Surface {
        let vertex = |x: f32, bone_ref: u8| Vertex {
            position: [x, 1.0, 2.0],
            normal: [0.0, 0.0, 1.0],
            uv: [x, 0.5],
            weights: VertexWeights::new(&[
                (usize::from(bone_ref), 0.7),
                (usize::from(1 - bone_ref), 0.3),
            ])
            .unwrap(),
        };
        Surface {
            index,
            vertices: vec![vertex(0.0, 1), vertex(1.0, 0), vertex(2.0, 1)],
            triangles: vec![Triangle::new(0, 1, 2), Triangle::new(2, 0, 1)],
            bone_references,
        }
    }

    fn model() -> GlmFile {
        let torso = SurfaceNode::new("torso", "models/torso")
            .with_child(SurfaceNode::new("head", "models/head"));
        let hierarchy = SurfaceHierarchy::from_tree(&[torso]).unwrap();
        GlmFile {
            name: "models/test/model".to_string(),
            anim_name: "models/test/skeleton".to_string(),
            num_bones: 10,
            lods: vec![
                Lod::from_present(2, vec![surface(0, vec![3, 7]), surface(1, vec![2, 9])]).unwrap(),
                Lod::from_present(2, vec![surface(0, vec![3, 7])]).unwrap(),
            ],
            hierarchy,
        }
    }

    #[test]
    fn test_header_offsets() {
        let glm = model();
        let header = glm.header().unwrap();
        assert_eq!(header.ofs_surf_hierarchy, 164 + 8);
        // torso has one child
        assert_eq!(header.ofs_lods, 164 + 8 + 144 + 4 + 144);

        let surface_size = 40 + 2 * 12 + 3 * 40 + 2 * 4;
        let lod0 = 4 + 8 + 2 * surface_size;
        let lod1 = 4 + 8 + surface_size + 40;
        assert_eq!(header.ofs_end, header.ofs_lods + lod0 + lod1);
    }

    #[test]
    fn test_round_trip_has_no_warnings() {
        let glm = model();
        let data = glm.to_bytes().unwrap();
        assert_eq!(data.len(), glm.header().unwrap().ofs_end as usize);

        let result = parse_glm_bytes(&data).unwrap();
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.header, glm.header().unwrap());
        assert_eq!(result.glm.hierarchy, glm.hierarchy);
        assert_eq!(result.glm.lods.len(), 2);
        assert_eq!(result.glm.lods[1].surfaces.len(), 2);
        assert!(result.glm.lods[1].surfaces[1].is_empty());

        // bytes are stable after a decode
        assert_eq!(result.glm.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_lod_with_missing_record_is_rejected() {
        let mut glm = model();
        glm.lods[1].surfaces.pop();
        assert!(matches!(glm.to_bytes().unwrap_err(), Error::InvalidIndex(_)));
    }

    #[test]
    fn test_lod_with_swapped_records_is_rejected() {
        let mut glm = model();
        glm.lods[0].surfaces.swap(0, 1);
        assert!(matches!(glm.validate_lods().unwrap_err(), Error::InvalidIndex(_)));
    }
}
