//! Triangle records and the winding convention
//!
//! Triangles are stored as three `i32` vertex indices in the opposite
//! winding to the one used in memory, so both directions reverse the
//! triple. Reading additionally rotates triangles whose last index ends up
//! as 0, since some consumers mishandle that case.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{Read, Write};

use crate::error::Result;
use crate::formats::common::{count_to_i32, offset_from_i32};

/// Size of a triangle record.
pub const TRIANGLE_SIZE: usize = 12;

/// A triangle in in-memory winding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    #[must_use]
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }

    /// Convert the stored order to the in-memory winding.
    #[must_use]
    pub fn from_disk(stored: [u32; 3]) -> Self {
        let [a, b, c] = stored;
        let reversed = [c, b, a];
        Self {
            indices: fix_zero_last(reversed),
        }
    }

    /// The order written to disk.
    #[must_use]
    pub fn to_disk(self) -> [u32; 3] {
        let [a, b, c] = self.indices;
        [c, b, a]
    }

    #[must_use]
    pub fn max_index(&self) -> u32 {
        self.indices.iter().copied().max().unwrap_or(0)
    }

    pub(crate) fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut stored = [0u32; 3];
        for index in &mut stored {
            let value = reader.read_i32::<LittleEndian>()?;
            *index = offset_from_i32("triangle index", value)? as u32;
        }
        Ok(Self::from_disk(stored))
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for index in self.to_disk() {
            writer.write_i32::<LittleEndian>(count_to_i32(index as usize)?)?;
        }
        Ok(())
    }
}

/// Rotate `(x, y, 0)` to `(0, x, y)`.
fn fix_zero_last(indices: [u32; 3]) -> [u32; 3] {
    if indices[2] == 0 {
        [indices[2], indices[0], indices[1]]
    } else {
        indices
    }
}
