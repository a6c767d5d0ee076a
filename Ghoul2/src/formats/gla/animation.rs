//! Animation frames and the compressed bone pool
//!
//! Each frame stores one 24-bit pool index per bone. The pool holds every
//! distinct quantized relative transform exactly once; frames share entries
//! across bones and time.
//!
//! Relative transforms are taken against the parent's absolute transform,
//! so both directions walk the skeleton in hierarchy order:
//!
//! ```text
//! absolute(bone) = absolute(parent) * relative(bone)
//! pose(bone)     = absolute(bone) * base_pose(bone)
//! ```

use byteorder::{ReadBytesExt, WriteBytesExt};
use glam::Affine3A;
use std::collections::HashMap;
use std::io::{Read, Write};

use super::comp_bone::{BoneTransform, COMP_BONE_SIZE, CompBone};
use super::header::GlaHeader;
use super::skeleton::Skeleton;
use crate::error::{Error, Result};
use crate::formats::common::{FormatWarning, Mat34, SectionCursor, offset_from_i32};
use crate::progress::{G2Phase, G2ProgressCallback, report_every};

/// Largest index a 24-bit frame entry can hold.
pub const MAX_POOL_INDEX: usize = 0x00FF_FFFF;

/// Bytes per frame entry.
const INDEX_SIZE: usize = 3;

/// Slack tolerated before the bone pool, caused by 4-byte alignment.
const POOL_ALIGNMENT_SLACK: u64 = 3;

/// One frame: a pool index per bone, in bone order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationFrame {
    pub bone_indices: Vec<u32>,
}

/// Frames plus the pool they index into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationStream {
    pub frames: Vec<AnimationFrame>,
    pub pool: Vec<CompBone>,
    /// Frame number of `frames[0]` within the file.
    pub first_frame: usize,
    /// Number of frames in the file the stream was read from.
    pub total_frames: usize,
}

/// Size of the frame block for the given counts, including alignment padding.
#[must_use]
pub fn frames_byte_size(num_frames: usize, num_bones: usize) -> usize {
    let size = INDEX_SIZE * num_frames * num_bones;
    size.next_multiple_of(4)
}

impl AnimationStream {
    /// Whether only a window of the file's frames was loaded.
    ///
    /// The pool of a partial stream only covers the indices seen in the
    /// window.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.first_frame != 0 || self.frames.len() != self.total_frames
    }

    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn pool_byte_size(&self) -> usize {
        COMP_BONE_SIZE * self.pool.len()
    }

    /// Compress absolute poses into frames and a deduplicated pool.
    ///
    /// `poses[frame][bone]` is the model-space pose of each bone, the same
    /// space as the skeleton's base poses.
    ///
    /// # Errors
    /// Returns [`Error::Hierarchy`] for an invalid skeleton,
    /// [`Error::FrameBoneCountMismatch`] for frames of the wrong size and
    /// [`Error::PoolIndexOverflow`] if the pool outgrows 24-bit indices.
    pub fn encode(
        poses: &[Vec<Mat34>],
        skeleton: &Skeleton,
        progress: Option<G2ProgressCallback<'_>>,
    ) -> Result<Self> {
        let order = skeleton.hierarchy_order()?;
        let num_bones = skeleton.len();
        let base_pose_inv: Vec<Affine3A> = skeleton
            .bones
            .iter()
            .map(|b| b.base_pose_inv.to_affine())
            .collect();

        let mut pool = PoolBuilder::default();
        let mut frames = Vec::with_capacity(poses.len());
        let mut absolute = vec![Affine3A::IDENTITY; num_bones];
        let mut relative = vec![Affine3A::IDENTITY; num_bones];

        for (frame_index, pose) in poses.iter().enumerate() {
            if pose.len() != num_bones {
                return Err(Error::FrameBoneCountMismatch {
                    frame: frame_index,
                    expected: num_bones,
                    found: pose.len(),
                });
            }

            for &bone in &order {
                let offset = pose[bone].to_affine() * base_pose_inv[bone];
                relative[bone] = match skeleton.bones[bone].parent_index() {
                    Some(parent) => absolute[parent].inverse() * offset,
                    None => offset,
                };
                absolute[bone] = offset;
            }

            let bone_indices = relative
                .iter()
                .map(|rel| pool.insert(&BoneTransform::from_affine(rel)))
                .collect::<Result<Vec<u32>>>()?;
            frames.push(AnimationFrame { bone_indices });

            report_every(
                progress,
                G2Phase::CompressingFrames,
                frame_index + 1,
                poses.len(),
                10,
            );
        }

        if pool.clamped > 0 {
            tracing::warn!(
                "{} bone transforms exceeded the storable range and were clamped",
                pool.clamped
            );
        }
        tracing::info!(
            "Compressed {} frames into {} pool entries",
            frames.len(),
            pool.entries.len()
        );

        Ok(Self {
            total_frames: frames.len(),
            frames,
            pool: pool.entries,
            first_frame: 0,
        })
    }

    /// Decode every pool entry once.
    #[must_use]
    pub fn decoded_pool(&self) -> Vec<Affine3A> {
        self.pool.iter().map(|c| c.decode().to_affine()).collect()
    }

    /// Resolve one frame into model-space poses.
    ///
    /// `order` must come from [`Skeleton::hierarchy_order`] and `pool` from
    /// [`Self::decoded_pool`].
    ///
    /// # Errors
    /// Returns [`Error::InvalidIndex`] for a frame outside the stream,
    /// [`Error::FrameBoneCountMismatch`] or [`Error::InvalidPoolIndex`] if
    /// the frame does not match the skeleton or pool.
    pub fn decode_frame(
        &self,
        frame_index: usize,
        skeleton: &Skeleton,
        order: &[usize],
        pool: &[Affine3A],
    ) -> Result<Vec<Mat34>> {
        let frame = self.frames.get(frame_index).ok_or_else(|| {
            Error::InvalidIndex(format!(
                "frame {frame_index} outside stream of {} frames",
                self.frames.len()
            ))
        })?;

        let num_bones = skeleton.len();
        if frame.bone_indices.len() != num_bones {
            return Err(Error::FrameBoneCountMismatch {
                frame: frame_index,
                expected: num_bones,
                found: frame.bone_indices.len(),
            });
        }

        let mut absolute = vec![Affine3A::IDENTITY; num_bones];
        for &bone in order {
            let index = frame.bone_indices[bone];
            let relative = pool.get(index as usize).ok_or(Error::InvalidPoolIndex {
                frame: frame_index,
                bone,
                index,
                pool_len: pool.len(),
            })?;
            absolute[bone] = match skeleton.bones[bone].parent_index() {
                Some(parent) => absolute[parent] * *relative,
                None => *relative,
            };
        }

        Ok(skeleton
            .bones
            .iter()
            .zip(&absolute)
            .map(|(bone, abs)| Mat34::from_affine(&(*abs * bone.base_pose.to_affine())))
            .collect())
    }

    /// Resolve all frames into model-space poses (`[frame][bone]`).
    ///
    /// # Errors
    /// See [`Self::decode_frame`]; also fails for an invalid hierarchy.
    pub fn decode_poses(
        &self,
        skeleton: &Skeleton,
        progress: Option<G2ProgressCallback<'_>>,
    ) -> Result<Vec<Vec<Mat34>>> {
        let order = skeleton.hierarchy_order()?;
        let pool = self.decoded_pool();
        let total = self.frames.len();

        let mut poses = Vec::with_capacity(total);
        for frame_index in 0..total {
            poses.push(self.decode_frame(frame_index, skeleton, &order, &pool)?);
            report_every(progress, G2Phase::DecompressingFrames, frame_index + 1, total, 10);
        }
        Ok(poses)
    }

    /// Read frames `start..start + count` (all frames for `None`) and the
    /// part of the pool they reference.
    ///
    /// Windows reaching past the last frame are shortened; a start beyond
    /// the last frame reads only the last frame.
    ///
    /// # Errors
    /// Returns an error if a section lies outside the data or is truncated.
    pub fn read(
        cursor: &mut SectionCursor<'_>,
        header: &GlaHeader,
        window: Option<(usize, usize)>,
    ) -> Result<Self> {
        let ofs_frames = offset_from_i32("ofsFrames", header.ofs_frames)?;
        let ofs_pool = offset_from_i32("ofsCompBonePool", header.ofs_comp_bone_pool)?;
        let ofs_end = offset_from_i32("ofsEnd", header.ofs_end)?;
        let total = usize::try_from(offset_from_i32("numFrames", header.num_frames)?)
            .map_err(|_| Error::CorruptFile {
                message: "frame count out of range".to_string(),
            })?;
        let num_bones = usize::try_from(offset_from_i32("numBones", header.num_bones)?).map_err(
            |_| Error::CorruptFile {
                message: "bone count out of range".to_string(),
            },
        )?;

        cursor.expect_position("frames", ofs_frames)?;

        let (start, count) = match window {
            None => (0, total),
            Some((requested_start, requested_count)) => {
                tracing::info!("Reading {requested_count} frames, starting at {requested_start}");
                let (start, count) = clamp_window(requested_start, requested_count, total);
                if (start, count) != (requested_start, requested_count) {
                    cursor.warn(FormatWarning::FrameRangeClamped {
                        requested_start,
                        requested_count,
                        start,
                        count,
                    });
                }
                (start, count)
            }
        };
        let full_range = start == 0 && count == total;

        let frame_size = (INDEX_SIZE * num_bones) as u64;
        if frame_size == 0 && count > 0 {
            return Err(Error::CorruptFile {
                message: format!("{total} frames for a skeleton without bones"),
            });
        }
        cursor.skip("frames", (start as u64).saturating_mul(frame_size))?;
        let window_size = (count as u64).saturating_mul(frame_size);
        if window_size > cursor.remaining() {
            return Err(Error::CorruptFile {
                message: format!(
                    "{count} frames need {window_size} bytes, only {} left",
                    cursor.remaining()
                ),
            });
        }

        let mut frames = Vec::with_capacity(count);
        let mut pool_len = 0usize;
        for _ in 0..count {
            let mut bone_indices = Vec::with_capacity(num_bones);
            for _ in 0..num_bones {
                let index = read_index(cursor)?;
                pool_len = pool_len.max(index as usize + 1);
                bone_indices.push(index);
            }
            frames.push(AnimationFrame { bone_indices });
        }

        if full_range {
            cursor.expect_position_within("bone pool", ofs_pool, POOL_ALIGNMENT_SLACK)?;
        } else if cursor.position() > ofs_pool {
            cursor.expect_position("bone pool", ofs_pool)?;
        } else {
            cursor.seek_to("bone pool", ofs_pool)?;
        }

        let mut pool = Vec::with_capacity(cursor.capacity_for(pool_len as u64, COMP_BONE_SIZE));
        for _ in 0..pool_len {
            let mut bytes = [0u8; COMP_BONE_SIZE];
            cursor.read_exact(&mut bytes)?;
            pool.push(CompBone(bytes));
        }

        if full_range && cursor.position() != ofs_end {
            cursor.warn(FormatWarning::TrailingData {
                expected_end: ofs_end,
                actual: cursor.position(),
            });
        }

        tracing::debug!(
            "Read {} frames and {} pool entries",
            frames.len(),
            pool.len()
        );

        Ok(Self {
            frames,
            pool,
            first_frame: start,
            total_frames: total,
        })
    }

    /// Write the frame block, its alignment padding and the pool.
    ///
    /// The writer must be 4-byte aligned when this is called.
    ///
    /// # Errors
    /// Returns [`Error::PoolIndexOverflow`] if an index exceeds 24 bits.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut written = 0usize;
        for frame in &self.frames {
            for &index in &frame.bone_indices {
                if index as usize > MAX_POOL_INDEX {
                    return Err(Error::PoolIndexOverflow {
                        index: index as usize,
                    });
                }
                writer.write_all(&index.to_le_bytes()[..INDEX_SIZE])?;
                written += INDEX_SIZE;
            }
        }
        for _ in written..written.next_multiple_of(4) {
            writer.write_u8(0)?;
        }
        for entry in &self.pool {
            writer.write_all(&entry.0)?;
        }
        Ok(())
    }
}

fn clamp_window(start: usize, count: usize, total: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    let (mut start, mut count) = (start, count);
    if start >= total {
        tracing::warn!("Start frame {start} beyond existing frames, using last one");
        start = total - 1;
        count = 1;
    }
    if count > total - start {
        tracing::warn!("Trying to read more frames than there are, reading {}", total - start);
        count = total - start;
    }
    (start, count)
}

fn read_index(cursor: &mut SectionCursor<'_>) -> Result<u32> {
    let lo = cursor.read_u8()?;
    let mid = cursor.read_u8()?;
    let hi = cursor.read_u8()?;
    Ok(u32::from_le_bytes([lo, mid, hi, 0]))
}

/// Pool under construction, deduplicating on the quantized bytes.
#[derive(Debug, Default)]
struct PoolBuilder {
    entries: Vec<CompBone>,
    lookup: HashMap<CompBone, u32>,
    clamped: usize,
}

impl PoolBuilder {
    fn insert(&mut self, transform: &BoneTransform) -> Result<u32> {
        let (comp, clamped) = CompBone::encode(transform);
        if clamped {
            self.clamped += 1;
        }
        if let Some(&index) = self.lookup.get(&comp) {
            return Ok(index);
        }

        let index = self.entries.len();
        if index > MAX_POOL_INDEX {
            return Err(Error::PoolIndexOverflow { index });
        }
        let index = index as u32;
        self.entries.push(comp);
        self.lookup.insert(comp, index);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::gla::BoneNode;
    use glam::{Quat, Vec3};

    fn mat(rotation: Quat, translation: Vec3) -> Mat34 {
        Mat34::from_affine(&Affine3A::from_rotation_translation(rotation, translation))
    }

    fn skeleton() -> Skeleton {
        Skeleton::from_nodes(&[
            BoneNode::new("root", None, mat(Quat::IDENTITY, Vec3::new(0.0, 0.0, 10.0))),
            BoneNode::new("spine", Some(0), mat(Quat::IDENTITY, Vec3::new(0.0, 0.0, 20.0))),
            BoneNode::new(
                "head",
                Some(1),
                mat(Quat::from_rotation_x(0.2), Vec3::new(0.0, 1.0, 30.0)),
            ),
        ])
        .unwrap()
    }

    fn rest_pose(skeleton: &Skeleton) -> Vec<Mat34> {
        skeleton.bones.iter().map(|b| b.base_pose).collect()
    }

    fn assert_pose_close(a: &Mat34, b: &Mat34, eps: f32) {
        for (ra, rb) in a.rows.iter().zip(&b.rows) {
            for (x, y) in ra.iter().zip(rb) {
                assert!((x - y).abs() <= eps, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_rest_pose_uses_single_identity_entry() {
        let skeleton = skeleton();
        let poses = vec![rest_pose(&skeleton), rest_pose(&skeleton)];
        let stream = AnimationStream::encode(&poses, &skeleton, None).unwrap();

        assert_eq!(stream.pool.len(), 1);
        assert_eq!(stream.frames[0].bone_indices, vec![0, 0, 0]);
        assert_eq!(stream.frames[1].bone_indices, vec![0, 0, 0]);
        assert!(!stream.is_partial());
    }

    #[test]
    fn test_identical_frames_share_pool_entries() {
        let skeleton = skeleton();
        let mut moved = rest_pose(&skeleton);
        moved[1] = mat(Quat::from_rotation_z(0.5), Vec3::new(3.0, 0.0, 20.0));
        let poses = vec![moved.clone(), rest_pose(&skeleton), moved];

        let stream = AnimationStream::encode(&poses, &skeleton, None).unwrap();
        assert_eq!(stream.frames[0], stream.frames[2]);
        // identity plus the spine offset plus the head compensating for it
        assert_eq!(stream.pool.len(), 3);
    }

    #[test]
    fn test_decode_composes_parent_chain() {
        let skeleton = skeleton();
        let mut pose = rest_pose(&skeleton);
        // rotate the spine; the head follows rigidly
        let spin = Affine3A::from_rotation_translation(Quat::from_rotation_z(0.5), Vec3::ZERO);
        for bone in 1..3 {
            pose[bone] = Mat34::from_affine(&(spin * skeleton.bones[bone].base_pose.to_affine()));
        }

        let stream = AnimationStream::encode(&[pose.clone()], &skeleton, None).unwrap();
        // the head is at rest relative to the spine
        assert_eq!(stream.frames[0].bone_indices[0], stream.frames[0].bone_indices[2]);

        let decoded = stream.decode_poses(&skeleton, None).unwrap();
        for (a, b) in decoded[0].iter().zip(&pose) {
            assert_pose_close(a, b, 1e-2);
        }
    }

    #[test]
    fn test_decode_checks_expected_values() {
        let skeleton = skeleton();
        let identity = CompBone::encode(&BoneTransform::IDENTITY).0;
        let shifted = CompBone::encode(&BoneTransform {
            rotation: Quat::IDENTITY,
            translation: Vec3::new(5.0, 0.0, 0.0),
        })
        .0;
        let stream = AnimationStream {
            frames: vec![AnimationFrame {
                bone_indices: vec![1, 0, 0],
            }],
            pool: vec![identity, shifted],
            first_frame: 0,
            total_frames: 1,
        };
        let decoded = stream.decode_poses(&skeleton, None).unwrap();

        // moving the root drags every descendant along
        assert_pose_close(&decoded[0][0], &mat(Quat::IDENTITY, Vec3::new(5.0, 0.0, 10.0)), 1e-3);
        assert_pose_close(&decoded[0][1], &mat(Quat::IDENTITY, Vec3::new(5.0, 0.0, 20.0)), 1e-3);
        let head = decoded[0][2].translation();
        assert!((head[0] - 5.0).abs() < 1e-3);
        assert!((head[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_wrong_bone_count_is_rejected() {
        let skeleton = skeleton();
        let err = AnimationStream::encode(&[vec![Mat34::IDENTITY]], &skeleton, None).unwrap_err();
        assert!(matches!(err, Error::FrameBoneCountMismatch { frame: 0, expected: 3, found: 1 }));
    }

    #[test]
    fn test_invalid_pool_index_is_reported() {
        let skeleton = skeleton();
        let stream = AnimationStream {
            frames: vec![AnimationFrame {
                bone_indices: vec![0, 0, 4],
            }],
            pool: vec![CompBone::encode(&BoneTransform::IDENTITY).0],
            first_frame: 0,
            total_frames: 1,
        };
        let err = stream.decode_poses(&skeleton, None).unwrap_err();
        assert!(matches!(err, Error::InvalidPoolIndex { bone: 2, index: 4, .. }));
    }

    #[test]
    fn test_write_pads_frames_to_four_bytes() {
        let stream = AnimationStream {
            frames: vec![AnimationFrame {
                bone_indices: vec![0x0001_0203],
            }],
            pool: vec![CompBone([7; COMP_BONE_SIZE])],
            first_frame: 0,
            total_frames: 1,
        };
        let mut buf = Vec::new();
        stream.write(&mut buf).unwrap();
        assert_eq!(&buf[..4], &[0x03, 0x02, 0x01, 0x00]);
        assert_eq!(buf.len(), 4 + COMP_BONE_SIZE);
        assert_eq!(frames_byte_size(1, 1), 4);
        assert_eq!(frames_byte_size(2, 2), 12);
        assert_eq!(frames_byte_size(3, 3), 28);
    }

    #[test]
    fn test_clamp_window() {
        assert_eq!(clamp_window(0, 5, 10), (0, 5));
        assert_eq!(clamp_window(8, 5, 10), (8, 2));
        assert_eq!(clamp_window(12, 5, 10), (9, 1));
        assert_eq!(clamp_window(3, 1, 0), (0, 0));
        assert_eq!(clamp_window(1, usize::MAX, 3), (1, 2));
        assert_eq!(clamp_window(usize::MAX, usize::MAX, 3), (2, 1));
    }
}
