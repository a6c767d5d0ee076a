//! Bit-packed vertex records
//!
//! A vertex is stored as 32 bytes, followed later in the surface by its UV:
//!
//! ```text
//! normal     3 x f32
//! position   3 x f32
//! packed     u32
//!            bits  0-19  bone reference index i at bits 5i..5i+5
//!            bits 20-27  high 2 bits of weight i at bits 20+2i
//!            bits 30-31  number of weights - 1
//! weight_lo  4 x u8      low 8 bits of each 10-bit weight
//! ```
//!
//! The last weight is never stored; it is whatever remains of 1.0.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Maximum influences per vertex.
pub const MAX_WEIGHTS: usize = 4;
/// Maximum bone references per surface, bounded by the 5-bit index field.
pub const MAX_BONE_REFERENCES: usize = 32;
/// Size of the packed record without UV.
pub const VERTEX_SIZE: usize = 32;
/// Size of a UV pair.
pub const UV_SIZE: usize = 8;

const WEIGHT_SCALE: f32 = 1023.0;

/// Bone influences of one vertex.
///
/// Holds 1 to 4 `(bone reference, weight)` pairs in fixed-size arrays. Bone
/// references index the surface's bone reference list, not the skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VertexWeights {
    count: u8,
    bone_refs: [u8; MAX_WEIGHTS],
    weights: [f32; MAX_WEIGHTS],
}

impl VertexWeights {
    /// Full weight on a single bone reference.
    #[must_use]
    pub fn single(bone_ref: u8) -> Self {
        Self {
            count: 1,
            bone_refs: [bone_ref, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Build from `(bone reference, weight)` pairs.
    ///
    /// Weights are expected to sum to 1.0; the last one is not stored.
    ///
    /// # Errors
    /// Returns [`Error::TooManyWeights`] for 0 or more than 4 pairs and
    /// [`Error::TooManyBoneReferences`] for a reference that does not fit
    /// into 5 bits.
    pub fn new(pairs: &[(usize, f32)]) -> Result<Self> {
        if pairs.is_empty() || pairs.len() > MAX_WEIGHTS {
            return Err(Error::TooManyWeights { count: pairs.len() });
        }

        let mut result = Self {
            count: pairs.len() as u8,
            bone_refs: [0; MAX_WEIGHTS],
            weights: [0.0; MAX_WEIGHTS],
        };
        for (i, &(bone_ref, weight)) in pairs.iter().enumerate() {
            if bone_ref >= MAX_BONE_REFERENCES {
                return Err(Error::TooManyBoneReferences {
                    count: bone_ref + 1,
                    limit: MAX_BONE_REFERENCES,
                });
            }
            result.bone_refs[i] = bone_ref as u8;
            result.weights[i] = weight;
        }
        Ok(result)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.count)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn bone_refs(&self) -> &[u8] {
        &self.bone_refs[..self.len()]
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights[..self.len()]
    }

    /// `(bone reference, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u8, f32)> + '_ {
        self.bone_refs().iter().copied().zip(self.weights().iter().copied())
    }

    /// Pack into the `u32` word and the four low weight bytes.
    #[must_use]
    pub fn pack(&self) -> (u32, [u8; MAX_WEIGHTS]) {
        let count = self.len();
        let mut packed = (count as u32 - 1) << 30;
        let mut lo = [0u8; MAX_WEIGHTS];

        for i in 0..count {
            packed |= u32::from(self.bone_refs[i] & 0x1F) << (5 * i);
            // the last weight is implied
            if i + 1 < count {
                let q = quantize_weight(self.weights[i]);
                lo[i] = (q & 0xFF) as u8;
                packed |= ((q >> 8) & 0b11) << (20 + 2 * i);
            }
        }
        (packed, lo)
    }

    /// Unpack from the `u32` word and the four low weight bytes.
    #[must_use]
    pub fn unpack(packed: u32, lo: [u8; MAX_WEIGHTS]) -> Self {
        let count = ((packed >> 30) + 1) as usize;
        let mut result = Self {
            count: count as u8,
            bone_refs: [0; MAX_WEIGHTS],
            weights: [0.0; MAX_WEIGHTS],
        };

        let mut total = 0.0f32;
        for i in 0..count {
            result.bone_refs[i] = ((packed >> (5 * i)) & 0x1F) as u8;
            if i + 1 < count {
                let q = u32::from(lo[i]) | (((packed >> (20 + 2 * i)) & 0b11) << 8);
                let weight = q as f32 / WEIGHT_SCALE;
                total += weight;
                result.weights[i] = weight;
            } else {
                result.weights[i] = 1.0 - total;
            }
        }
        result
    }
}

fn quantize_weight(weight: f32) -> u32 {
    (weight.clamp(0.0, 1.0) * WEIGHT_SCALE).round() as u32
}

/// A mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub weights: VertexWeights,
}

impl Vertex {
    /// Read the packed part; the UV is read separately.
    pub(crate) fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut normal = [0.0f32; 3];
        for n in &mut normal {
            *n = reader.read_f32::<LittleEndian>()?;
        }
        let mut position = [0.0f32; 3];
        for p in &mut position {
            *p = reader.read_f32::<LittleEndian>()?;
        }
        let packed = reader.read_u32::<LittleEndian>()?;
        let mut lo = [0u8; MAX_WEIGHTS];
        reader.read_exact(&mut lo)?;

        Ok(Self {
            position,
            normal,
            uv: [0.0, 0.0],
            weights: VertexWeights::unpack(packed, lo),
        })
    }

    pub(crate) fn read_uv<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        self.uv = [
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
        ];
        Ok(())
    }

    /// Write the packed part; the UV is written separately.
    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for &n in &self.normal {
            writer.write_f32::<LittleEndian>(n)?;
        }
        for &p in &self.position {
            writer.write_f32::<LittleEndian>(p)?;
        }
        let (packed, lo) = self.weights.pack();
        writer.write_u32::<LittleEndian>(packed)?;
        writer.write_all(&lo)?;
        Ok(())
    }

    pub(crate) fn write_uv<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f32::<LittleEndian>(self.uv[0])?;
        writer.write_f32::<LittleEndian>(self.uv[1])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_single_weight_packing() {
        let (packed, lo) = VertexWeights::single(7).pack();
        assert_eq!(packed, 7);
        assert_eq!(lo, [0, 0, 0, 0]);

        let back = VertexWeights::unpack(packed, lo);
        assert_eq!(back.bone_refs(), &[7]);
        assert_eq!(back.weights(), &[1.0]);
    }

    #[test]
    fn test_four_weight_bit_layout() {
        let weights =
            VertexWeights::new(&[(1, 0.5), (2, 0.25), (31, 0.125), (4, 0.125)]).unwrap();
        let (packed, lo) = weights.pack();

        // 0.5 -> 512 = 0b10_0000_0000, 0.25 -> 256, 0.125 -> 128
        assert_eq!(packed >> 30, 3);
        assert_eq!(packed & 0x1F, 1);
        assert_eq!((packed >> 5) & 0x1F, 2);
        assert_eq!((packed >> 10) & 0x1F, 31);
        assert_eq!((packed >> 15) & 0x1F, 4);
        assert_eq!((packed >> 20) & 0b11, 2);
        assert_eq!((packed >> 22) & 0b11, 1);
        assert_eq!((packed >> 24) & 0b11, 0);
        // the last weight leaves its slots empty
        assert_eq!((packed >> 26) & 0b11, 0);
        assert_eq!(lo, [0, 0, 128, 0]);
    }

    #[test]
    fn test_weights_round_trip_and_sum_to_one() {
        let weights = VertexWeights::new(&[(0, 0.6), (3, 0.3), (5, 0.1)]).unwrap();
        let (packed, lo) = weights.pack();
        let back = VertexWeights::unpack(packed, lo);

        assert_eq!(back.bone_refs(), &[0, 3, 5]);
        for (a, b) in weights.weights().iter().zip(back.weights()) {
            assert!((a - b).abs() <= 1.0 / 1023.0, "{a} vs {b}");
        }
        let sum: f32 = back.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weight_count_limits() {
        assert!(matches!(
            VertexWeights::new(&[]).unwrap_err(),
            Error::TooManyWeights { count: 0 }
        ));
        let five = [(0, 0.2); 5];
        assert!(matches!(
            VertexWeights::new(&five).unwrap_err(),
            Error::TooManyWeights { count: 5 }
        ));
    }

    #[test]
    fn test_bone_reference_limit() {
        assert!(VertexWeights::new(&[(31, 1.0)]).is_ok());
        assert!(matches!(
            VertexWeights::new(&[(32, 1.0)]).unwrap_err(),
            Error::TooManyBoneReferences { count: 33, limit: 32 }
        ));
    }

    #[test]
    fn test_vertex_record_layout() {
        let vertex = Vertex {
            position: [1.0, 2.0, 3.0],
            normal: [0.0, 0.0, 1.0],
            uv: [0.25, 0.75],
            weights: VertexWeights::new(&[(2, 0.75), (1, 0.25)]).unwrap(),
        };

        let mut buf = Vec::new();
        vertex.write(&mut buf).unwrap();
        assert_eq!(buf.len(), VERTEX_SIZE);
        vertex.write_uv(&mut buf).unwrap();
        assert_eq!(buf.len(), VERTEX_SIZE + UV_SIZE);

        // normal comes first
        assert_eq!(f32::from_le_bytes(buf[8..12].try_into().unwrap()), 1.0);
        assert_eq!(f32::from_le_bytes(buf[12..16].try_into().unwrap()), 1.0);

        let mut cursor = Cursor::new(&buf);
        let mut back = Vertex::read(&mut cursor).unwrap();
        back.read_uv(&mut cursor).unwrap();

        assert_eq!(back.position, vertex.position);
        assert_eq!(back.normal, vertex.normal);
        assert_eq!(back.uv, vertex.uv);
        assert_eq!(back.weights.bone_refs(), &[2, 1]);
        assert!((back.weights.weights()[0] - 0.75).abs() <= 1.0 / 1023.0);
    }
}
