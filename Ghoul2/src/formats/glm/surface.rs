//! Surface geometry records
//!
//! Each LOD stores one record per surface:
//!
//! ```text
//! header (40 bytes)   ident, index, ofsHeader, numVerts, ofsVerts,
//!                     numTriangles, ofsTriangles, numBoneRefs, ofsBoneRefs, ofsEnd
//! triangles           numTriangles x 3 x i32
//! vertices            numVerts x 32 bytes
//! uvs                 numVerts x 2 x f32
//! bone references     numBoneRefs x i32 skeleton bone indices
//! ```
//!
//! All offsets are relative to the start of the record, except `ofsHeader`
//! which is the negated absolute position of the record in the file.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use super::triangle::{TRIANGLE_SIZE, Triangle};
use super::vertex::{MAX_BONE_REFERENCES, UV_SIZE, VERTEX_SIZE, Vertex};
use crate::error::{Error, Result};
use crate::formats::common::{
    FormatWarning, SectionCursor, SectionWriter, count_to_i32, offset_from_i32,
};

/// Size of the surface record header.
pub const SURFACE_HEADER_SIZE: usize = 40;

/// Section offsets of one surface record, relative to its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceLayout {
    pub ofs_triangles: usize,
    pub ofs_verts: usize,
    pub ofs_bone_refs: usize,
    pub ofs_end: usize,
}

/// Geometry of one surface at one level of detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Surface {
    /// Index of the surface in the hierarchy.
    pub index: usize,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    /// Skeleton bone indices addressed by the vertex weights.
    pub bone_references: Vec<i32>,
}

impl Surface {
    /// A surface without geometry, used where a LOD lacks the surface.
    #[must_use]
    pub fn make_empty(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.triangles.is_empty() && self.bone_references.is_empty()
    }

    #[must_use]
    pub fn layout(&self) -> SurfaceLayout {
        let ofs_triangles = SURFACE_HEADER_SIZE;
        let ofs_verts = ofs_triangles + TRIANGLE_SIZE * self.triangles.len();
        let ofs_bone_refs = ofs_verts + (VERTEX_SIZE + UV_SIZE) * self.vertices.len();
        let ofs_end = ofs_bone_refs + 4 * self.bone_references.len();
        SurfaceLayout {
            ofs_triangles,
            ofs_verts,
            ofs_bone_refs,
            ofs_end,
        }
    }

    /// Size of the record in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.layout().ofs_end
    }

    /// Read a surface record at the cursor position.
    ///
    /// `name` is only used to label warnings.
    pub(crate) fn read(cursor: &mut SectionCursor<'_>, name: &str) -> Result<Self> {
        let start = cursor.position();

        let _ident = cursor.read_i32::<LittleEndian>()?;
        let index = offset_from_i32("surface index", cursor.read_i32::<LittleEndian>()?)?;
        let ofs_header = cursor.read_i32::<LittleEndian>()?;
        let num_verts = offset_from_i32("numVerts", cursor.read_i32::<LittleEndian>()?)?;
        let ofs_verts = offset_from_i32("ofsVerts", cursor.read_i32::<LittleEndian>()?)?;
        let num_triangles = offset_from_i32("numTriangles", cursor.read_i32::<LittleEndian>()?)?;
        let ofs_triangles = offset_from_i32("ofsTriangles", cursor.read_i32::<LittleEndian>()?)?;
        let num_bone_refs = offset_from_i32("numBoneReferences", cursor.read_i32::<LittleEndian>()?)?;
        let ofs_bone_refs = offset_from_i32("ofsBoneReferences", cursor.read_i32::<LittleEndian>()?)?;
        let ofs_end = offset_from_i32("surface ofsEnd", cursor.read_i32::<LittleEndian>()?)?;

        if i64::from(ofs_header) != -(start as i64) {
            cursor.warn(FormatWarning::OffsetMismatch {
                section: format!("{name} header back-reference"),
                expected: start,
                actual: u64::try_from(-i64::from(ofs_header)).unwrap_or(0),
            });
        }

        cursor.expect_position(&format!("{name} triangles"), start + ofs_triangles)?;
        let mut triangles = Vec::with_capacity(cursor.capacity_for(num_triangles, TRIANGLE_SIZE));
        for _ in 0..num_triangles {
            triangles.push(Triangle::read(cursor)?);
        }

        cursor.expect_position(&format!("{name} vertices"), start + ofs_verts)?;
        let mut vertices =
            Vec::with_capacity(cursor.capacity_for(num_verts, VERTEX_SIZE + UV_SIZE));
        for _ in 0..num_verts {
            vertices.push(Vertex::read(cursor)?);
        }
        for vertex in &mut vertices {
            vertex.read_uv(cursor)?;
        }

        cursor.expect_position(&format!("{name} bone references"), start + ofs_bone_refs)?;
        let mut bone_references = Vec::with_capacity(cursor.capacity_for(num_bone_refs, 4));
        for _ in 0..num_bone_refs {
            bone_references.push(cursor.read_i32::<LittleEndian>()?);
        }

        cursor.expect_position(&format!("{name} end"), start + ofs_end)?;

        for (i, triangle) in triangles.iter().enumerate() {
            for &index in &triangle.indices {
                if index as usize >= vertices.len() {
                    cursor.warn(FormatWarning::TriangleIndexOutOfRange {
                        surface: name.to_string(),
                        triangle: i,
                        index,
                        num_verts: vertices.len(),
                    });
                }
            }
        }

        tracing::debug!(
            "surface {name}: {} vertices, {} triangles, {} bone references",
            vertices.len(),
            triangles.len(),
            bone_references.len()
        );

        Ok(Self {
            index: index as usize,
            vertices,
            triangles,
            bone_references,
        })
    }

    /// Write the record at the writer position.
    ///
    /// # Errors
    /// Returns [`Error::TooManyBoneReferences`] if the surface addresses more
    /// bones than a vertex can, and [`Error::LayoutMismatch`] if a section
    /// does not land at its computed offset.
    pub(crate) fn write(&self, writer: &mut SectionWriter) -> Result<()> {
        if self.bone_references.len() > MAX_BONE_REFERENCES {
            return Err(Error::TooManyBoneReferences {
                count: self.bone_references.len(),
                limit: MAX_BONE_REFERENCES,
            });
        }

        let start = writer.position();
        let layout = self.layout();
        let back_reference = i32::try_from(start)
            .map(|s| -s)
            .map_err(|_| Error::InvalidIndex(format!("surface offset {start} does not fit into i32")))?;

        writer.write_i32::<LittleEndian>(0)?;
        writer.write_i32::<LittleEndian>(count_to_i32(self.index)?)?;
        writer.write_i32::<LittleEndian>(back_reference)?;
        writer.write_i32::<LittleEndian>(count_to_i32(self.vertices.len())?)?;
        writer.write_i32::<LittleEndian>(count_to_i32(layout.ofs_verts)?)?;
        writer.write_i32::<LittleEndian>(count_to_i32(self.triangles.len())?)?;
        writer.write_i32::<LittleEndian>(count_to_i32(layout.ofs_triangles)?)?;
        writer.write_i32::<LittleEndian>(count_to_i32(self.bone_references.len())?)?;
        writer.write_i32::<LittleEndian>(count_to_i32(layout.ofs_bone_refs)?)?;
        writer.write_i32::<LittleEndian>(count_to_i32(layout.ofs_end)?)?;

        writer.expect_position("surface triangles", start + layout.ofs_triangles as u64)?;
        for triangle in &self.triangles {
            triangle.write(writer)?;
        }

        writer.expect_position("surface vertices", start + layout.ofs_verts as u64)?;
        for vertex in &self.vertices {
            vertex.write(writer)?;
        }
        for vertex in &self.vertices {
            vertex.write_uv(writer)?;
        }

        writer.expect_position("surface bone references", start + layout.ofs_bone_refs as u64)?;
        for &bone in &self.bone_references {
            writer.write_i32::<LittleEndian>(bone)?;
        }

        writer.expect_position("surface end", start + layout.ofs_end as u64)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::glm::vertex::VertexWeights;
    use std::io::Write;

    fn quad() -> Surface {
        let corner = |x: f32, y: f32| Vertex {
            position: [x, y, 0.0],
            normal: [0.0, 0.0, 1.0],
            uv: [x, y],
            weights: VertexWeights::single(0),
        };
        Surface {
            index: 1,
            vertices: vec![
                corner(0.0, 0.0),
                corner(1.0, 0.0),
                corner(1.0, 1.0),
                corner(0.0, 1.0),
            ],
            triangles: vec![Triangle::new(1, 2, 3), Triangle::new(3, 2, 1)],
            bone_references: vec![4],
        }
    }

    #[test]
    fn test_layout_arithmetic() {
        let layout = quad().layout();
        assert_eq!(layout.ofs_triangles, 40);
        assert_eq!(layout.ofs_verts, 40 + 24);
        assert_eq!(layout.ofs_bone_refs, 64 + 4 * 40);
        assert_eq!(layout.ofs_end, 224 + 4);
    }

    #[test]
    fn test_empty_surface_record() {
        let empty = Surface::make_empty(3);
        assert!(empty.is_empty());
        assert_eq!(empty.byte_size(), SURFACE_HEADER_SIZE);

        let mut writer = SectionWriter::new();
        writer.write_all(&[0u8; 8]).unwrap();
        empty.write(&mut writer).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), 8 + SURFACE_HEADER_SIZE);

        let field = |i: usize| i32::from_le_bytes(bytes[8 + 4 * i..12 + 4 * i].try_into().unwrap());
        assert_eq!(field(1), 3);
        assert_eq!(field(2), -8);
        assert_eq!(field(3), 0);
        assert_eq!(field(5), 0);
        assert_eq!(field(7), 0);
        assert_eq!(field(9), 40);
    }

    #[test]
    fn test_round_trip_without_warnings() {
        let surface = quad();
        let mut writer = SectionWriter::new();
        writer.write_all(&[0u8; 12]).unwrap();
        surface.write(&mut writer).unwrap();
        let bytes = writer.into_inner();

        let mut cursor = SectionCursor::new(&bytes);
        cursor.seek_to("surface", 12).unwrap();
        let back = Surface::read(&mut cursor, "quad").unwrap();
        assert!(cursor.warnings().is_empty());
        assert_eq!(back.triangles, surface.triangles);
        assert_eq!(back.bone_references, vec![4]);
        assert_eq!(back.vertices.len(), 4);
        assert_eq!(back.vertices[2].uv, [1.0, 1.0]);
        assert_eq!(cursor.position(), bytes.len() as u64);
    }

    #[test]
    fn test_out_of_range_triangle_warns() {
        let mut surface = quad();
        surface.triangles.push(Triangle::new(1, 2, 9));
        let mut writer = SectionWriter::new();
        surface.write(&mut writer).unwrap();
        let bytes = writer.into_inner();

        let mut cursor = SectionCursor::new(&bytes);
        Surface::read(&mut cursor, "quad").unwrap();
        assert!(matches!(
            cursor.warnings(),
            [FormatWarning::TriangleIndexOutOfRange { index: 9, num_verts: 4, .. }]
        ));
    }

    #[test]
    fn test_too_many_bone_references() {
        let mut surface = quad();
        surface.bone_references = (0..33).collect();
        let err = surface.write(&mut SectionWriter::new()).unwrap_err();
        assert!(matches!(err, Error::TooManyBoneReferences { count: 33, limit: 32 }));
    }
}
