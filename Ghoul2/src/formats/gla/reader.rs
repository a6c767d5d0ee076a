//! `.gla` file reading

use std::collections::HashMap;
use std::path::Path;

use super::GlaFile;
use super::animation::AnimationStream;
use super::header::GlaHeader;
use super::skeleton::Skeleton;
use crate::error::Result;
use crate::formats::common::{FormatWarning, SectionCursor};

/// Which part of the animation to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationLoadMode {
    /// Skeleton only.
    None,
    /// Every frame.
    #[default]
    All,
    /// A window of frames; the pool only covers that window.
    Range { start: usize, count: usize },
}

/// Options for reading `.gla` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlaReadOptions {
    pub animation: AnimationLoadMode,
}

impl GlaReadOptions {
    #[must_use]
    pub fn skeleton_only() -> Self {
        Self {
            animation: AnimationLoadMode::None,
        }
    }

    #[must_use]
    pub fn frame_range(start: usize, count: usize) -> Self {
        Self {
            animation: AnimationLoadMode::Range { start, count },
        }
    }
}

/// Result of reading a `.gla` file.
#[derive(Debug, Clone)]
pub struct GlaReadResult {
    pub gla: GlaFile,
    /// The header as stored in the file.
    pub header: GlaHeader,
    /// Recoverable layout problems found while reading.
    pub warnings: Vec<FormatWarning>,
}

/// Parse a `.gla` file from bytes.
///
/// # Errors
/// Returns an error if the magic or version is wrong, a section lies outside
/// the data, or a record is truncated.
pub fn parse_gla_bytes(data: &[u8], options: &GlaReadOptions) -> Result<GlaReadResult> {
    let mut cursor = SectionCursor::new(data);
    let header = GlaHeader::read(&mut cursor)?;
    tracing::debug!(
        "GLA {}: {} bones, {} frames",
        header.name,
        header.num_bones,
        header.num_frames
    );

    let skeleton = Skeleton::read(&mut cursor, &header)?;

    let animation = match options.animation {
        AnimationLoadMode::None => None,
        AnimationLoadMode::All => Some(AnimationStream::read(&mut cursor, &header, None)?),
        AnimationLoadMode::Range { start, count } => Some(AnimationStream::read(
            &mut cursor,
            &header,
            Some((start, count)),
        )?),
    };

    let gla = GlaFile {
        name: header.name.clone(),
        scale: header.scale,
        skeleton,
        animation,
    };

    Ok(GlaReadResult {
        gla,
        header,
        warnings: cursor.into_warnings(),
    })
}

/// Read a `.gla` file from disk.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_gla<P: AsRef<Path>>(path: P, options: &GlaReadOptions) -> Result<GlaReadResult> {
    let path = path.as_ref();
    tracing::info!("Loading {}", path.display());
    let data = std::fs::read(path)?;
    parse_gla_bytes(&data, options)
}

/// Read only the skeleton of a `.gla` file and map bone names to indices.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_bone_index_map<P: AsRef<Path>>(path: P) -> Result<HashMap<String, usize>> {
    let result = read_gla(path, &GlaReadOptions::skeleton_only())?;
    Ok(result.gla.skeleton.bone_index_map())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::formats::common::Mat34;
    use glam::{Affine3A, Vec3};

    const NUM_FRAMES_FIELD: usize = 76;

    fn three_frames() -> Vec<u8> {
        let poses: Vec<Vec<Mat34>> = (0..3)
            .map(|f| {
                let shift = Affine3A::from_translation(Vec3::new(f as f32, 0.0, 0.0));
                vec![Mat34::from_affine(&shift)]
            })
            .collect();
        GlaFile::encode("walk", 1.0, Skeleton::default_skeleton(), &poses, None)
            .unwrap()
            .to_bytes()
            .unwrap()
    }

    #[test]
    fn test_unbounded_window_reads_to_the_end() {
        let data = three_frames();
        let result = parse_gla_bytes(&data, &GlaReadOptions::frame_range(1, usize::MAX)).unwrap();
        let animation = result.gla.animation.unwrap();
        assert_eq!(animation.first_frame, 1);
        assert_eq!(animation.num_frames(), 2);
        assert!(matches!(
            result.warnings.as_slice(),
            [FormatWarning::FrameRangeClamped { start: 1, count: 2, .. }]
        ));
    }

    #[test]
    fn test_start_past_the_end_reads_last_frame() {
        let data = three_frames();
        let options = GlaReadOptions::frame_range(usize::MAX, usize::MAX);
        let animation = parse_gla_bytes(&data, &options).unwrap().gla.animation.unwrap();
        assert_eq!(animation.first_frame, 2);
        assert_eq!(animation.num_frames(), 1);
    }

    #[test]
    fn test_huge_frame_count_is_an_error() {
        let mut data = three_frames();
        data[NUM_FRAMES_FIELD..NUM_FRAMES_FIELD + 4].copy_from_slice(&i32::MAX.to_le_bytes());

        let err = parse_gla_bytes(&data, &GlaReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::CorruptFile { .. }), "{err}");
        // the skeleton alone is still readable
        assert!(parse_gla_bytes(&data, &GlaReadOptions::skeleton_only()).is_ok());
    }
}
