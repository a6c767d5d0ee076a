//! `.gla` file writing
//!
//! All offsets are computed up front in a single pass; the writer then
//! checks that every section lands where the header says it does.

use std::collections::HashMap;
use std::path::Path;

use super::GlaFile;
use super::animation::{AnimationStream, frames_byte_size};
use super::header::{GLA_HEADER_SIZE, GlaHeader};
use super::skeleton::Skeleton;
use crate::error::{Error, Result};
use crate::formats::common::{Mat34, SectionWriter, count_to_i32};
use crate::progress::G2ProgressCallback;

impl GlaFile {
    /// Compress poses against a skeleton.
    ///
    /// `poses[frame][bone]` follows the skeleton's bone order.
    ///
    /// # Errors
    /// See [`AnimationStream::encode`].
    pub fn encode(
        name: impl Into<String>,
        scale: f32,
        skeleton: Skeleton,
        poses: &[Vec<Mat34>],
        progress: Option<G2ProgressCallback<'_>>,
    ) -> Result<Self> {
        let animation = AnimationStream::encode(poses, &skeleton, progress)?;
        Ok(Self {
            name: name.into(),
            scale,
            skeleton,
            animation: Some(animation),
        })
    }

    /// Compress poses against an existing skeleton, keeping its bone order.
    ///
    /// `source_names[i]` names the bone that `poses[frame][i]` belongs to.
    /// Every reference bone must be present among the source bones.
    ///
    /// # Errors
    /// Returns [`Error::BoneNotFound`] if a reference bone has no source
    /// pose, otherwise see [`AnimationStream::encode`].
    pub fn encode_with_reference(
        name: impl Into<String>,
        scale: f32,
        reference: &Skeleton,
        source_names: &[String],
        poses: &[Vec<Mat34>],
        progress: Option<G2ProgressCallback<'_>>,
    ) -> Result<Self> {
        reference.check_fits(source_names.iter().map(String::as_str))?;

        let source_index: HashMap<&str, usize> = source_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();
        let mapping: Vec<usize> = reference
            .bones
            .iter()
            .map(|bone| source_index[bone.name.as_str()])
            .collect();

        let reordered = poses
            .iter()
            .enumerate()
            .map(|(frame, pose)| {
                if pose.len() != source_names.len() {
                    return Err(Error::FrameBoneCountMismatch {
                        frame,
                        expected: source_names.len(),
                        found: pose.len(),
                    });
                }
                Ok(mapping.iter().map(|&i| pose[i]).collect())
            })
            .collect::<Result<Vec<Vec<Mat34>>>>()?;

        Self::encode(name, scale, reference.clone(), &reordered, progress)
    }

    /// Compute the header for the current contents.
    ///
    /// # Errors
    /// Returns an error if a count or offset does not fit the format.
    pub fn header(&self) -> Result<GlaHeader> {
        let num_bones = self.skeleton.len();
        let num_frames = self.animation.as_ref().map_or(0, AnimationStream::num_frames);
        let pool_size = self
            .animation
            .as_ref()
            .map_or(0, AnimationStream::pool_byte_size);

        let header_size = GLA_HEADER_SIZE as usize;
        let ofs_skel = header_size + 4 * num_bones;
        let ofs_frames = header_size + self.skeleton.byte_size();
        let ofs_pool = ofs_frames + frames_byte_size(num_frames, num_bones);
        let ofs_end = ofs_pool + pool_size;

        Ok(GlaHeader {
            name: self.name.clone(),
            scale: self.scale,
            num_frames: count_to_i32(num_frames)?,
            ofs_frames: count_to_i32(ofs_frames)?,
            num_bones: count_to_i32(num_bones)?,
            ofs_comp_bone_pool: count_to_i32(ofs_pool)?,
            ofs_skel: count_to_i32(ofs_skel)?,
            ofs_end: count_to_i32(ofs_end)?,
        })
    }

    /// Serialize to bytes.
    ///
    /// # Errors
    /// Returns an error if a name is too long, a frame does not match the
    /// skeleton, or the layout cannot be represented.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if let Some(animation) = &self.animation {
            for (frame, indices) in animation.frames.iter().enumerate() {
                if indices.bone_indices.len() != self.skeleton.len() {
                    return Err(Error::FrameBoneCountMismatch {
                        frame,
                        expected: self.skeleton.len(),
                        found: indices.bone_indices.len(),
                    });
                }
            }
        }

        let header = self.header()?;
        let end = header.ofs_end as u64;
        let mut writer = SectionWriter::with_capacity(end as usize);

        header.write(&mut writer)?;
        writer.expect_position("bone offsets", GLA_HEADER_SIZE)?;
        self.skeleton.write(&mut writer)?;
        writer.expect_position("frames", header.ofs_frames as u64)?;

        match &self.animation {
            Some(animation) => animation.write(&mut writer)?,
            None => AnimationStream::default().write(&mut writer)?,
        }
        writer.expect_position("end", end)?;

        Ok(writer.into_inner())
    }
}

/// Serialize a `.gla` file to bytes.
///
/// # Errors
/// See [`GlaFile::to_bytes`].
pub fn write_gla_bytes(gla: &GlaFile) -> Result<Vec<u8>> {
    gla.to_bytes()
}

/// Write a `.gla` file to disk.
///
/// # Errors
/// Returns an error if serialization or the file write fails.
pub fn write_gla<P: AsRef<Path>>(gla: &GlaFile, path: P) -> Result<()> {
    let path = path.as_ref();
    let data = gla.to_bytes()?;
    std::fs::write(path, &data)?;
    tracing::info!("Wrote {} ({} bytes)", path.display(), data.len());
    Ok(())
}
