//! `.glm` file reading

use std::path::Path;

use super::GlmFile;
use super::header::GlmHeader;
use super::hierarchy::SurfaceHierarchy;
use super::lod::{Lod, MIN_LOD_SIZE};
use crate::error::Result;
use crate::formats::common::{FormatWarning, SectionCursor, offset_from_i32};

/// Result of reading a `.glm` file.
#[derive(Debug, Clone)]
pub struct GlmReadResult {
    pub glm: GlmFile,
    /// The header as stored in the file.
    pub header: GlmHeader,
    /// Recoverable layout problems found while reading.
    pub warnings: Vec<FormatWarning>,
}

/// Parse a `.glm` file from bytes.
///
/// # Errors
/// Returns an error if the magic or version is wrong, a section lies outside
/// the data, or a record is truncated.
pub fn parse_glm_bytes(data: &[u8]) -> Result<GlmReadResult> {
    let mut cursor = SectionCursor::new(data);
    let header = GlmHeader::read(&mut cursor)?;
    tracing::debug!(
        "GLM {}: {} surfaces, {} LODs, skeleton {}",
        header.name,
        header.num_surfaces,
        header.num_lods,
        header.anim_name
    );

    let hierarchy = SurfaceHierarchy::read(&mut cursor, &header)?;

    let ofs_lods = offset_from_i32("ofsLODs", header.ofs_lods)?;
    cursor.expect_position("LODs", ofs_lods)?;
    let num_lods = offset_from_i32("LOD count", header.num_lods)?;
    let mut lods = Vec::with_capacity(cursor.capacity_for(num_lods, MIN_LOD_SIZE));
    for level in 0..num_lods as usize {
        lods.push(Lod::read(&mut cursor, &hierarchy, level)?);
    }

    let ofs_end = offset_from_i32("ofsEnd", header.ofs_end)?;
    if cursor.position() != ofs_end {
        cursor.warn(FormatWarning::TrailingData {
            expected_end: ofs_end,
            actual: cursor.position(),
        });
    }

    let glm = GlmFile {
        name: header.name.clone(),
        anim_name: header.anim_name.clone(),
        num_bones: offset_from_i32("bone count", header.num_bones)? as usize,
        hierarchy,
        lods,
    };

    Ok(GlmReadResult {
        glm,
        header,
        warnings: cursor.into_warnings(),
    })
}

/// Read a `.glm` file from disk.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_glm<P: AsRef<Path>>(path: P) -> Result<GlmReadResult> {
    let path = path.as_ref();
    tracing::info!("Loading {}", path.display());
    let data = std::fs::read(path)?;
    parse_glm_bytes(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::formats::glm::{
        GLM_HEADER_SIZE, Surface, SurfaceNode, Triangle, Vertex, VertexWeights, write_glm_bytes,
    };

    const NUM_LODS_FIELD: usize = 144;
    const OFS_LODS_FIELD: usize = 148;

    fn one_triangle_model() -> Vec<u8> {
        let vertex = |x: f32| Vertex {
            position: [x, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
            uv: [0.0, 0.0],
            weights: VertexWeights::single(0),
        };
        let surface = Surface {
            index: 0,
            vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0)],
            triangles: vec![Triangle::new(0, 1, 2)],
            bone_references: vec![0],
        };
        let glm = GlmFile {
            name: "models/test/model".to_string(),
            anim_name: "*default".to_string(),
            num_bones: 1,
            hierarchy: SurfaceHierarchy::from_tree(&[SurfaceNode::new("body", "")]).unwrap(),
            lods: vec![Lod::from_present(1, vec![surface]).unwrap()],
        };
        write_glm_bytes(&glm).unwrap()
    }

    fn field(bytes: &[u8], at: usize) -> usize {
        i32::from_le_bytes(bytes[at..at + 4].try_into().unwrap()) as usize
    }

    fn patch(bytes: &mut [u8], at: usize, value: i32) {
        bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn test_reads_back_written_model() {
        let result = parse_glm_bytes(&one_triangle_model()).unwrap();
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.glm.lods[0].surfaces[0].triangles.len(), 1);
    }

    #[test]
    fn test_huge_lod_count_is_an_error() {
        let mut bytes = one_triangle_model();
        patch(&mut bytes, NUM_LODS_FIELD, i32::MAX);
        assert!(parse_glm_bytes(&bytes).is_err());

        // a header alone, claiming LODs the data does not have
        let mut header = bytes[..GLM_HEADER_SIZE as usize].to_vec();
        patch(&mut header, 152, 0);
        patch(&mut header, 156, GLM_HEADER_SIZE as i32);
        patch(&mut header, OFS_LODS_FIELD, GLM_HEADER_SIZE as i32);
        assert!(parse_glm_bytes(&header).is_err());
    }

    #[test]
    fn test_lod_ending_before_its_table_is_corrupt() {
        let mut bytes = one_triangle_model();
        let ofs_lods = field(&bytes, OFS_LODS_FIELD);
        patch(&mut bytes, NUM_LODS_FIELD, i32::MAX);
        patch(&mut bytes, ofs_lods, 0);
        let err = parse_glm_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::CorruptFile { .. }), "{err}");
    }

    #[test]
    fn test_huge_surface_counts_are_an_error() {
        let original = one_triangle_model();
        // the only surface follows the LOD's ofsEnd and its offset table
        let surface = field(&original, OFS_LODS_FIELD) + 8;
        // numVerts, numTriangles, numBoneReferences
        for count_field in [12, 20, 28] {
            let mut bytes = original.clone();
            patch(&mut bytes, surface + count_field, i32::MAX);
            assert!(parse_glm_bytes(&bytes).is_err(), "field {count_field}");
        }
    }
}
