//! Offset bookkeeping for section-based binary layouts
//!
//! Both container formats locate their sections through absolute or
//! base-relative offsets. Reading goes through [`SectionCursor`], which turns
//! small drift into [`FormatWarning`]s and seeks to the recorded offset.
//! Writing goes through [`SectionWriter`], where any drift is a bug in the
//! offset calculation and therefore an error.

use serde::Serialize;
use std::fmt;
use std::io::{self, Cursor, Read, Write};

use crate::error::{Error, Result};

/// A recoverable inconsistency found while reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatWarning {
    /// A section did not start where its offset said it would.
    OffsetMismatch {
        section: String,
        expected: u64,
        actual: u64,
    },
    /// The requested frame window was adjusted to the frames in the file.
    FrameRangeClamped {
        requested_start: usize,
        requested_count: usize,
        start: usize,
        count: usize,
    },
    /// Data continues past the point where the file should end.
    TrailingData { expected_end: u64, actual: u64 },
    /// A triangle references a vertex the surface does not have.
    TriangleIndexOutOfRange {
        surface: String,
        triangle: usize,
        index: u32,
        num_verts: usize,
    },
    /// A LOD stores a surface under a different index than its slot.
    SurfaceIndexMismatch {
        lod: usize,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for FormatWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffsetMismatch {
                section,
                expected,
                actual,
            } => write!(
                f,
                "{section} not encountered when expected (at {actual} instead of {expected}), seeking correct position"
            ),
            Self::FrameRangeClamped {
                requested_start,
                requested_count,
                start,
                count,
            } => write!(
                f,
                "requested {requested_count} frames from {requested_start}, reading {count} from {start}"
            ),
            Self::TrailingData {
                expected_end,
                actual,
            } => write!(
                f,
                "bone pool read but file not over yet (at {actual}, end is {expected_end})"
            ),
            Self::TriangleIndexOutOfRange {
                surface,
                triangle,
                index,
                num_verts,
            } => write!(
                f,
                "triangle {triangle} of {surface} references vertex {index}, surface has {num_verts}"
            ),
            Self::SurfaceIndexMismatch {
                lod,
                expected,
                found,
            } => write!(
                f,
                "LOD {lod} surface {expected} has index {found} in its header"
            ),
        }
    }
}

/// Convert a stored `i32` offset or count, rejecting negative values.
///
/// # Errors
/// Returns [`Error::CorruptFile`] if the value is negative.
pub fn offset_from_i32(field: &str, value: i32) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::CorruptFile {
        message: format!("negative {field}: {value}"),
    })
}

/// Convert a count or offset to the `i32` the file stores.
///
/// # Errors
/// Returns [`Error::InvalidIndex`] if the value does not fit.
pub fn count_to_i32(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidIndex(format!("{value} does not fit into i32")))
}

/// A read cursor over a whole file that records layout drift.
pub struct SectionCursor<'a> {
    inner: Cursor<&'a [u8]>,
    warnings: Vec<FormatWarning>,
}

impl<'a> SectionCursor<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(data),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    /// Bytes left after the cursor position.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    /// Capacity to reserve for `count` records of `record_size` bytes.
    ///
    /// Counts come straight from the file, so this never exceeds the number
    /// of records the remaining data could hold.
    #[must_use]
    pub fn capacity_for(&self, count: u64, record_size: usize) -> usize {
        let fit = self.remaining() / record_size.max(1) as u64;
        usize::try_from(count.min(fit)).unwrap_or(0)
    }

    /// Move to an absolute offset.
    ///
    /// # Errors
    /// Returns [`Error::CorruptFile`] if the offset lies beyond the data.
    pub fn seek_to(&mut self, section: &str, offset: u64) -> Result<()> {
        if offset > self.len() {
            return Err(Error::CorruptFile {
                message: format!(
                    "{section} offset {offset} lies beyond end of data ({})",
                    self.len()
                ),
            });
        }
        self.inner.set_position(offset);
        Ok(())
    }

    /// Skip `count` bytes forward.
    ///
    /// # Errors
    /// Returns [`Error::CorruptFile`] if that would leave the data.
    pub fn skip(&mut self, section: &str, count: u64) -> Result<()> {
        let target = self.position().saturating_add(count);
        self.seek_to(section, target)
    }

    /// Check that the cursor sits at `expected`; otherwise warn and seek there.
    ///
    /// # Errors
    /// Returns [`Error::CorruptFile`] if `expected` lies beyond the data.
    pub fn expect_position(&mut self, section: &str, expected: u64) -> Result<()> {
        let actual = self.position();
        if actual != expected {
            self.warn(FormatWarning::OffsetMismatch {
                section: section.to_string(),
                expected,
                actual,
            });
            self.seek_to(section, expected)?;
        }
        Ok(())
    }

    /// Like [`Self::expect_position`], but silently accepts being up to
    /// `slack` bytes short of `expected`.
    ///
    /// # Errors
    /// Returns [`Error::CorruptFile`] if `expected` lies beyond the data.
    pub fn expect_position_within(&mut self, section: &str, expected: u64, slack: u64) -> Result<()> {
        let actual = self.position();
        if actual <= expected && expected - actual <= slack {
            return self.seek_to(section, expected);
        }
        self.expect_position(section, expected)
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, warning: FormatWarning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    #[must_use]
    pub fn warnings(&self) -> &[FormatWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn into_warnings(self) -> Vec<FormatWarning> {
        self.warnings
    }
}

impl Read for SectionCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// An in-memory writer that checks precomputed section offsets.
#[derive(Debug, Default)]
pub struct SectionWriter {
    buf: Vec<u8>,
}

impl SectionWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Fail unless the writer is exactly at `expected`.
    ///
    /// # Errors
    /// Returns [`Error::LayoutMismatch`] on any difference.
    pub fn expect_position(&self, section: &'static str, expected: u64) -> Result<()> {
        let actual = self.position();
        if actual == expected {
            Ok(())
        } else {
            Err(Error::LayoutMismatch {
                section,
                expected,
                actual,
            })
        }
    }

    /// Zero-pad to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        let rem = self.buf.len() % alignment;
        if rem != 0 {
            self.buf.resize(self.buf.len() + alignment - rem, 0);
        }
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Write for SectionWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_position_warns_and_seeks() {
        let data = [0u8; 16];
        let mut cursor = SectionCursor::new(&data);
        cursor.expect_position("frames", 8).unwrap();
        assert_eq!(cursor.position(), 8);
        assert_eq!(
            cursor.warnings(),
            &[FormatWarning::OffsetMismatch {
                section: "frames".to_string(),
                expected: 8,
                actual: 0,
            }]
        );
    }

    #[test]
    fn test_expect_position_within_slack_is_silent() {
        let data = [0u8; 16];
        let mut cursor = SectionCursor::new(&data);
        cursor.seek_to("frames", 9).unwrap();
        cursor.expect_position_within("bone pool", 12, 3).unwrap();
        assert_eq!(cursor.position(), 12);
        assert!(cursor.warnings().is_empty());

        // past the expected offset is never tolerated
        cursor.seek_to("frames", 13).unwrap();
        cursor.expect_position_within("bone pool", 12, 3).unwrap();
        assert_eq!(cursor.warnings().len(), 1);
    }

    #[test]
    fn test_capacity_is_capped_by_remaining_data() {
        let data = [0u8; 40];
        let mut cursor = SectionCursor::new(&data);
        assert_eq!(cursor.capacity_for(3, 12), 3);
        assert_eq!(cursor.capacity_for(u64::from(u32::MAX), 12), 3);
        cursor.seek_to("triangles", 30).unwrap();
        assert_eq!(cursor.remaining(), 10);
        assert_eq!(cursor.capacity_for(100, 4), 2);
        assert_eq!(cursor.capacity_for(100, 0), 10);
    }

    #[test]
    fn test_seek_beyond_data_is_corrupt() {
        let data = [0u8; 4];
        let mut cursor = SectionCursor::new(&data);
        let err = cursor.expect_position("surfaces", 100).unwrap_err();
        assert!(matches!(err, Error::CorruptFile { .. }));
    }

    #[test]
    fn test_writer_align_and_layout_check() {
        let mut writer = SectionWriter::new();
        writer.write_all(&[1, 2, 3, 4, 5]).unwrap();
        writer.align(4);
        assert_eq!(writer.position(), 8);
        writer.expect_position("bone pool", 8).unwrap();

        let err = writer.expect_position("end", 12).unwrap_err();
        assert!(matches!(err, Error::LayoutMismatch { expected: 12, actual: 8, .. }));
        assert_eq!(writer.into_inner(), vec![1, 2, 3, 4, 5, 0, 0, 0]);
    }

    #[test]
    fn test_negative_offset_rejected() {
        assert_eq!(offset_from_i32("ofsEnd", 12).unwrap(), 12);
        assert!(offset_from_i32("ofsEnd", -1).is_err());
    }
}
