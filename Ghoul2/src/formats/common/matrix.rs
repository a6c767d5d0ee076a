//! Row-major 3x4 affine matrix as stored in bone records
//!
//! The first three columns are the rotation/scale part, the fourth column is
//! the translation. On disk the 12 floats are written row by row.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Affine3A, Mat3A, Vec3A};
use serde::Serialize;
use std::io::{Read, Write};

use crate::error::Result;

/// A 3x4 matrix in file layout (`rows[row][column]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mat34 {
    pub rows: [[f32; 4]; 3],
}

impl Mat34 {
    /// Size of a matrix on disk in bytes.
    pub const SIZE: usize = 12 * 4;

    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
    };

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut rows = [[0.0f32; 4]; 3];
        for row in &mut rows {
            for value in row.iter_mut() {
                *value = reader.read_f32::<LittleEndian>()?;
            }
        }
        Ok(Self { rows })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for row in &self.rows {
            for &value in row {
                writer.write_f32::<LittleEndian>(value)?;
            }
        }
        Ok(())
    }

    /// Convert to a glam affine transform.
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        let r = &self.rows;
        Affine3A {
            matrix3: Mat3A::from_cols(
                Vec3A::new(r[0][0], r[1][0], r[2][0]),
                Vec3A::new(r[0][1], r[1][1], r[2][1]),
                Vec3A::new(r[0][2], r[1][2], r[2][2]),
            ),
            translation: Vec3A::new(r[0][3], r[1][3], r[2][3]),
        }
    }

    /// Convert from a glam affine transform.
    #[must_use]
    pub fn from_affine(affine: &Affine3A) -> Self {
        let m = &affine.matrix3;
        let t = affine.translation;
        Self {
            rows: [
                [m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x],
                [m.x_axis.y, m.y_axis.y, m.z_axis.y, t.y],
                [m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z],
            ],
        }
    }

    /// The inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self::from_affine(&self.to_affine().inverse())
    }

    /// The translation column.
    #[must_use]
    pub fn translation(&self) -> [f32; 3] {
        [self.rows[0][3], self.rows[1][3], self.rows[2][3]]
    }
}

impl Default for Mat34 {
    fn default() -> Self {
        Self::IDENTITY
    }
}
