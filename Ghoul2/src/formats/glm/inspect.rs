//! `.glm` file inspection

use serde::Serialize;
use std::path::Path;

use super::reader::parse_glm_bytes;
use crate::error::Result;
use crate::formats::common::FormatWarning;

/// Summary of a `.glm` file.
#[derive(Debug, Clone, Serialize)]
pub struct GlmInfo {
    pub file_path: String,
    pub file_size: u64,
    pub name: String,
    pub anim_name: String,
    pub num_bones: i32,
    pub surfaces: Vec<GlmSurfaceInfo>,
    pub lods: Vec<GlmLodInfo>,
    pub warnings: Vec<FormatWarning>,
}

/// Summary of one surface hierarchy entry.
#[derive(Debug, Clone, Serialize)]
pub struct GlmSurfaceInfo {
    pub index: usize,
    pub name: String,
    pub shader: String,
    pub parent: i32,
    pub num_children: usize,
    pub tag: bool,
    pub off: bool,
}

/// Geometry totals of one LOD.
#[derive(Debug, Clone, Serialize)]
pub struct GlmLodInfo {
    pub level: usize,
    /// Surfaces with geometry; the rest are empty records.
    pub present_surfaces: usize,
    pub vertices: usize,
    pub triangles: usize,
    /// Largest bone reference list of any surface.
    pub max_bone_references: usize,
}

/// Read a `.glm` file and summarize it.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn inspect_glm<P: AsRef<Path>>(path: P) -> Result<GlmInfo> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let result = parse_glm_bytes(&data)?;

    let surfaces = result
        .glm
        .hierarchy
        .surfaces
        .iter()
        .map(|surface| GlmSurfaceInfo {
            index: surface.index,
            name: surface.name.clone(),
            shader: surface.shader.clone(),
            parent: surface.parent,
            num_children: surface.children.len(),
            tag: surface.is_tag(),
            off: surface.is_off(),
        })
        .collect();

    let lods = result
        .glm
        .lods
        .iter()
        .enumerate()
        .map(|(level, lod)| GlmLodInfo {
            level,
            present_surfaces: lod.num_present(),
            vertices: lod.surfaces.iter().map(|s| s.vertices.len()).sum(),
            triangles: lod.surfaces.iter().map(|s| s.triangles.len()).sum(),
            max_bone_references: lod
                .surfaces
                .iter()
                .map(|s| s.bone_references.len())
                .max()
                .unwrap_or(0),
        })
        .collect();

    Ok(GlmInfo {
        file_path: path.display().to_string(),
        file_size: data.len() as u64,
        name: result.header.name,
        anim_name: result.header.anim_name,
        num_bones: result.header.num_bones,
        surfaces,
        lods,
        warnings: result.warnings,
    })
}
