//! `animation.cfg` sequence tables
//!
//! The game looks up named animations in a plain-text table stored next to
//! the `.gla`. Each line is
//!
//! ```text
//! NAME    start_frame    num_frames    loop_frames    fps
//! ```
//!
//! where `loop_frames` is `-1` for sequences that do not loop. `//` starts a
//! comment, also at the end of a line.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One named frame range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimationSequence {
    pub name: String,
    pub start_frame: i32,
    pub num_frames: i32,
    pub looping: bool,
    pub fps: i32,
}

impl AnimationSequence {
    #[must_use]
    pub fn new(name: impl Into<String>, start_frame: i32, num_frames: i32, fps: i32) -> Self {
        Self {
            name: name.into(),
            start_frame,
            num_frames,
            looping: false,
            fps,
        }
    }

    /// First frame after the sequence, saturating at `i32::MAX`.
    #[must_use]
    pub fn end_frame(&self) -> i32 {
        self.start_frame.saturating_add(self.num_frames)
    }

    #[must_use]
    pub fn contains(&self, frame: i32) -> bool {
        (self.start_frame..self.end_frame()).contains(&frame)
    }
}

impl fmt::Display for AnimationSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t\t{}\t{}\t{}\t{}",
            self.name,
            self.start_frame,
            self.num_frames,
            if self.looping { 0 } else { -1 },
            self.fps
        )
    }
}

impl FromStr for AnimationSequence {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let content = line.split("//").next().unwrap_or_default();
        let fields: Vec<&str> = content.split_whitespace().collect();
        let [name, start, frames, looping, fps] = fields.as_slice() else {
            return Err(format!("expected 5 fields, found {}", fields.len()));
        };

        let number = |field: &str| {
            field
                .parse::<i32>()
                .map_err(|e| format!("invalid number {field:?}: {e}"))
        };
        Ok(Self {
            name: (*name).to_string(),
            start_frame: number(start)?,
            num_frames: number(frames)?,
            looping: number(looping)? != -1,
            fps: number(fps)?,
        })
    }
}

/// The sequences of one `animation.cfg`, sorted by start frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnimationCfg {
    pub sequences: Vec<AnimationSequence>,
}

impl AnimationCfg {
    /// Parse a table, skipping lines that cannot be parsed.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut sequences = Vec::new();
        for (number, line) in content_lines(text) {
            match line.parse::<AnimationSequence>() {
                Ok(sequence) => sequences.push(sequence),
                Err(reason) => {
                    tracing::warn!("Could not parse animation.cfg line {number} ({reason}): {line}");
                }
            }
        }
        Self::from_sequences(sequences)
    }

    /// Parse a table, failing on the first line that cannot be parsed.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAnimationCfg`] naming the line.
    pub fn parse_strict(text: &str) -> Result<Self> {
        let sequences = content_lines(text)
            .map(|(number, line)| {
                line.parse::<AnimationSequence>()
                    .map_err(|_| Error::InvalidAnimationCfg {
                        line: number,
                        content: line.trim_end().to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_sequences(sequences))
    }

    #[must_use]
    pub fn from_sequences(mut sequences: Vec<AnimationSequence>) -> Self {
        sequences.sort_by_key(|s| s.start_frame);
        Self { sequences }
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&AnimationSequence> {
        self.sequences.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// The sequence a frame belongs to.
    #[must_use]
    pub fn sequence_at(&self, frame: i32) -> Option<&AnimationSequence> {
        self.sequences.iter().find(|s| s.contains(frame))
    }

    /// Total frames covered, up to the end of the last sequence.
    #[must_use]
    pub fn num_frames(&self) -> i32 {
        self.sequences
            .iter()
            .map(AnimationSequence::end_frame)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for AnimationCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sequence) in self.sequences.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{sequence}")?;
        }
        Ok(())
    }
}

/// Non-blank, non-comment lines with their 1-based line numbers.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.starts_with("//") && !line.trim().is_empty())
}

/// Read an `animation.cfg`, skipping bad lines.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_animation_cfg<P: AsRef<Path>>(path: P) -> Result<AnimationCfg> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let cfg = AnimationCfg::parse(&text);
    tracing::debug!("Read {} sequences from {}", cfg.sequences.len(), path.display());
    Ok(cfg)
}

/// Write an `animation.cfg`.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_animation_cfg<P: AsRef<Path>>(cfg: &AnimationCfg, path: P) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, format!("{cfg}\n"))?;
    tracing::info!("Wrote {} sequences to {}", cfg.sequences.len(), path.display());
    Ok(())
}
