//! `.glm` file header

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::formats::common::{read_qpath, write_qpath};

/// Identifier at the start of every `.glm` file.
pub const GLM_IDENT: [u8; 4] = *b"2LGM";
/// The only supported `.glm` version.
pub const GLM_VERSION: i32 = 6;
/// Size of the header in bytes. The surface offset table starts here.
pub const GLM_HEADER_SIZE: u64 = 164;

/// The fixed-layout `.glm` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlmHeader {
    pub name: String,
    /// Name of the `.gla` the model is skinned against, or `*default`.
    pub anim_name: String,
    pub num_bones: i32,
    pub num_lods: i32,
    pub ofs_lods: i32,
    pub num_surfaces: i32,
    /// Offset of the first surface hierarchy record.
    pub ofs_surf_hierarchy: i32,
    pub ofs_end: i32,
}

impl GlmHeader {
    /// Read and validate the header.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMagic`] or [`Error::UnsupportedVersion`] if
    /// this is not a version 6 `.glm` file.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut ident = [0u8; 4];
        reader.read_exact(&mut ident)?;
        if ident != GLM_IDENT {
            return Err(Error::InvalidMagic {
                format: "GLM",
                expected: GLM_IDENT,
                found: ident,
            });
        }

        let version = reader.read_i32::<LittleEndian>()?;
        if version != GLM_VERSION {
            return Err(Error::UnsupportedVersion {
                format: "GLM",
                version,
                expected: GLM_VERSION,
            });
        }

        let name = read_qpath(reader)?;
        let anim_name = read_qpath(reader)?;
        // reserved, an animation index in older tools
        let _reserved = reader.read_i32::<LittleEndian>()?;

        Ok(Self {
            name,
            anim_name,
            num_bones: reader.read_i32::<LittleEndian>()?,
            num_lods: reader.read_i32::<LittleEndian>()?,
            ofs_lods: reader.read_i32::<LittleEndian>()?,
            num_surfaces: reader.read_i32::<LittleEndian>()?,
            ofs_surf_hierarchy: reader.read_i32::<LittleEndian>()?,
            ofs_end: reader.read_i32::<LittleEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&GLM_IDENT)?;
        writer.write_i32::<LittleEndian>(GLM_VERSION)?;
        write_qpath(writer, &self.name, "GLM name")?;
        write_qpath(writer, &self.anim_name, "GLM animation name")?;
        writer.write_i32::<LittleEndian>(0)?;
        writer.write_i32::<LittleEndian>(self.num_bones)?;
        writer.write_i32::<LittleEndian>(self.num_lods)?;
        writer.write_i32::<LittleEndian>(self.ofs_lods)?;
        writer.write_i32::<LittleEndian>(self.num_surfaces)?;
        writer.write_i32::<LittleEndian>(self.ofs_surf_hierarchy)?;
        writer.write_i32::<LittleEndian>(self.ofs_end)?;
        Ok(())
    }
}
