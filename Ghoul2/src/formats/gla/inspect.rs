//! `.gla` file inspection

use serde::Serialize;
use std::path::Path;

use super::reader::{GlaReadOptions, parse_gla_bytes};
use crate::error::Result;
use crate::formats::common::FormatWarning;

/// Summary of a `.gla` file.
#[derive(Debug, Clone, Serialize)]
pub struct GlaInfo {
    pub file_path: String,
    pub file_size: u64,
    pub name: String,
    pub scale: f32,
    pub num_frames: i32,
    pub num_bones: i32,
    pub pool_entries: usize,
    /// Distinct pool entries per frame and bone, lower is better.
    pub compression_ratio: Option<f64>,
    pub bones: Vec<GlaBoneInfo>,
    pub warnings: Vec<FormatWarning>,
}

/// Summary of one bone.
#[derive(Debug, Clone, Serialize)]
pub struct GlaBoneInfo {
    pub index: usize,
    pub name: String,
    pub parent: i32,
    pub num_children: usize,
    pub flags: u32,
}

/// Read a `.gla` file with all frames and summarize it.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn inspect_gla<P: AsRef<Path>>(path: P) -> Result<GlaInfo> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let result = parse_gla_bytes(&data, &GlaReadOptions::default())?;

    let pool_entries = result.gla.animation.as_ref().map_or(0, |a| a.pool.len());
    let slots = result.header.num_frames as usize * result.header.num_bones as usize;
    let compression_ratio = (slots > 0).then(|| pool_entries as f64 / slots as f64);

    let bones = result
        .gla
        .skeleton
        .bones
        .iter()
        .map(|bone| GlaBoneInfo {
            index: bone.index,
            name: bone.name.clone(),
            parent: bone.parent,
            num_children: bone.children.len(),
            flags: bone.flags,
        })
        .collect();

    Ok(GlaInfo {
        file_path: path.display().to_string(),
        file_size: data.len() as u64,
        name: result.header.name,
        scale: result.header.scale,
        num_frames: result.header.num_frames,
        num_bones: result.header.num_bones,
        pool_entries,
        compression_ratio,
        bones,
        warnings: result.warnings,
    })
}
