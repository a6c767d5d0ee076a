//! Fixed-size NUL-padded string fields
//!
//! Every name, shader and path stored in a Ghoul2 file occupies exactly
//! `MAX_QPATH` bytes. The value is terminated by the first NUL; the rest of
//! the field is padding.

use byteorder::WriteBytesExt;
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Size of a path/name field in bytes.
pub const MAX_QPATH: usize = 64;

/// Read a `MAX_QPATH` string field.
///
/// # Errors
/// Returns [`Error::Io`] if the field is truncated.
pub fn read_qpath<R: Read>(reader: &mut R) -> Result<String> {
    let mut bytes = [0u8; MAX_QPATH];
    reader.read_exact(&mut bytes)?;

    let len = bytes.iter().position(|&b| b == 0).unwrap_or(MAX_QPATH);
    Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
}

/// Write a `MAX_QPATH` string field, NUL-padded.
///
/// The value must leave room for the terminator.
///
/// # Errors
/// Returns [`Error::StringTooLong`] if the value exceeds 63 bytes.
pub fn write_qpath<W: Write>(writer: &mut W, value: &str, field: &'static str) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() >= MAX_QPATH {
        return Err(Error::StringTooLong {
            field,
            len: bytes.len(),
            limit: MAX_QPATH - 1,
        });
    }

    writer.write_all(bytes)?;
    for _ in bytes.len()..MAX_QPATH {
        writer.write_u8(0)?;
    }
    Ok(())
}
