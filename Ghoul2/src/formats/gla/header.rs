//! `.gla` file header

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::formats::common::{read_qpath, write_qpath};

/// Identifier at the start of every `.gla` file.
pub const GLA_IDENT: [u8; 4] = *b"2LGA";
/// The only supported `.gla` version.
pub const GLA_VERSION: i32 = 6;
/// Size of the header in bytes. The bone offset table starts here.
pub const GLA_HEADER_SIZE: u64 = 100;

/// The fixed-layout `.gla` header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlaHeader {
    /// Internal name, usually the game-relative path without extension.
    pub name: String,
    pub scale: f32,
    pub num_frames: i32,
    pub ofs_frames: i32,
    pub num_bones: i32,
    pub ofs_comp_bone_pool: i32,
    /// Offset of the first bone record.
    pub ofs_skel: i32,
    pub ofs_end: i32,
}

impl GlaHeader {
    /// Read and validate the header.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMagic`] or [`Error::UnsupportedVersion`] if
    /// this is not a version 6 `.gla` file.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut ident = [0u8; 4];
        reader.read_exact(&mut ident)?;
        if ident != GLA_IDENT {
            return Err(Error::InvalidMagic {
                format: "GLA",
                expected: GLA_IDENT,
                found: ident,
            });
        }

        let version = reader.read_i32::<LittleEndian>()?;
        if version != GLA_VERSION {
            return Err(Error::UnsupportedVersion {
                format: "GLA",
                version,
                expected: GLA_VERSION,
            });
        }

        Ok(Self {
            name: read_qpath(reader)?,
            scale: reader.read_f32::<LittleEndian>()?,
            num_frames: reader.read_i32::<LittleEndian>()?,
            ofs_frames: reader.read_i32::<LittleEndian>()?,
            num_bones: reader.read_i32::<LittleEndian>()?,
            ofs_comp_bone_pool: reader.read_i32::<LittleEndian>()?,
            ofs_skel: reader.read_i32::<LittleEndian>()?,
            ofs_end: reader.read_i32::<LittleEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&GLA_IDENT)?;
        writer.write_i32::<LittleEndian>(GLA_VERSION)?;
        write_qpath(writer, &self.name, "GLA name")?;
        writer.write_f32::<LittleEndian>(self.scale)?;
        writer.write_i32::<LittleEndian>(self.num_frames)?;
        writer.write_i32::<LittleEndian>(self.ofs_frames)?;
        writer.write_i32::<LittleEndian>(self.num_bones)?;
        writer.write_i32::<LittleEndian>(self.ofs_comp_bone_pool)?;
        writer.write_i32::<LittleEndian>(self.ofs_skel)?;
        writer.write_i32::<LittleEndian>(self.ofs_end)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> GlaHeader {
        GlaHeader {
            name: "models/players/_humanoid/_humanoid".to_string(),
            scale: 1.0,
            num_frames: 2,
            ofs_frames: 500,
            num_bones: 3,
            ofs_comp_bone_pool: 520,
            ofs_skel: 112,
            ofs_end: 548,
        }
    }

    #[test]
    fn test_header_size() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, GLA_HEADER_SIZE);
        assert_eq!(&buf[..4], b"2LGA");

        let back = GlaHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_wrong_magic_is_rejected() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf[..4].copy_from_slice(b"2LGM");
        let err = GlaHeader::read(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { format: "GLA", .. }));
    }

    #[test]
    fn test_wrong_version_is_rejected() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf[4..8].copy_from_slice(&5i32.to_le_bytes());
        let err = GlaHeader::read(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 5, expected: 6, .. }));
    }
}
