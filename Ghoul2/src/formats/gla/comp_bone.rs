//! Quantized bone transforms stored in the bone pool
//!
//! Each pool entry is 14 bytes: seven little-endian `u16` values holding
//! the rotation quaternion `(w, x, y, z)` followed by the translation
//! `(x, y, z)`.
//!
//! - quaternion components cover `[-2, 2]` in steps of `1/16383`
//! - translations cover `[-512, 512]` in steps of `1/64`
//!
//! Values outside these ranges are clamped.

use glam::{Affine3A, Quat, Vec3};
use std::fmt;

/// Size of a pool entry in bytes.
pub const COMP_BONE_SIZE: usize = 14;

const QUAT_RANGE: f32 = 2.0;
const QUAT_SCALE: f32 = 16383.0;
const TRANS_RANGE: f32 = 512.0;
const TRANS_SCALE: f32 = 64.0;

/// A bone transform relative to its parent, before quantization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Extract rotation and translation from an affine transform.
    ///
    /// Any scale in the matrix is discarded, the pool cannot store it.
    #[must_use]
    pub fn from_affine(affine: &Affine3A) -> Self {
        let (_scale, rotation, translation) = affine.to_scale_rotation_translation();
        Self {
            rotation,
            translation,
        }
    }

    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation, self.translation)
    }
}

/// One quantized pool entry, exactly as stored on disk.
///
/// Equality and hashing work on the raw bytes, which is what the pool
/// deduplicates on.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompBone(pub [u8; COMP_BONE_SIZE]);

impl CompBone {
    /// Quantize a transform.
    ///
    /// Returns the entry and whether any component had to be clamped.
    #[must_use]
    pub fn encode(transform: &BoneTransform) -> (Self, bool) {
        let q = transform.rotation;
        let t = transform.translation;
        let mut clamped = false;

        let values = [
            quantize_rotation(q.w, &mut clamped),
            quantize_rotation(q.x, &mut clamped),
            quantize_rotation(q.y, &mut clamped),
            quantize_rotation(q.z, &mut clamped),
            quantize_translation(t.x, &mut clamped),
            quantize_translation(t.y, &mut clamped),
            quantize_translation(t.z, &mut clamped),
        ];

        let mut bytes = [0u8; COMP_BONE_SIZE];
        for (chunk, value) in bytes.chunks_exact_mut(2).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        (Self(bytes), clamped)
    }

    /// Raw quantized values `(w, x, y, z, tx, ty, tz)`.
    #[must_use]
    pub fn values(&self) -> [u16; 7] {
        let mut values = [0u16; 7];
        for (value, chunk) in values.iter_mut().zip(self.0.chunks_exact(2)) {
            *value = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
        values
    }

    /// Dequantize into a transform with a unit quaternion.
    #[must_use]
    pub fn decode(&self) -> BoneTransform {
        let [w, x, y, z, tx, ty, tz] = self.values();
        let raw = Quat::from_xyzw(
            dequantize_rotation(x),
            dequantize_rotation(y),
            dequantize_rotation(z),
            dequantize_rotation(w),
        );
        let rotation = if raw.length_squared() > f32::EPSILON {
            raw.normalize()
        } else {
            Quat::IDENTITY
        };

        BoneTransform {
            rotation,
            translation: Vec3::new(
                dequantize_translation(tx),
                dequantize_translation(ty),
                dequantize_translation(tz),
            ),
        }
    }
}

impl fmt::Debug for CompBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompBone").field(&self.values()).finish()
    }
}

fn quantize_rotation(value: f32, clamped: &mut bool) -> u16 {
    let c = value.clamp(-QUAT_RANGE, QUAT_RANGE);
    if c != value {
        *clamped = true;
    }
    ((c + QUAT_RANGE) * QUAT_SCALE).round() as u16
}

fn dequantize_rotation(value: u16) -> f32 {
    f32::from(value) / QUAT_SCALE - QUAT_RANGE
}

fn quantize_translation(value: f32, clamped: &mut bool) -> u16 {
    let c = value.clamp(-TRANS_RANGE, TRANS_RANGE);
    if c != value {
        *clamped = true;
    }
    ((c + TRANS_RANGE) * TRANS_SCALE).round().min(f32::from(u16::MAX)) as u16
}

fn dequantize_translation(value: u16) -> f32 {
    f32::from(value) / TRANS_SCALE - TRANS_RANGE
}
