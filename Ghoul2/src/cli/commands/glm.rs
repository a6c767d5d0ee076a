//! GLM CLI commands
//!
//! Commands for inspecting and repacking model files.

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{CUBE, DISK, GEAR, LOOKING_GLASS, print_done, print_step};
use crate::formats::glm::{inspect_glm, read_glm, write_glm};

/// Inspect a GLM file and display its surfaces and LODs.
pub fn inspect(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let info = inspect_glm(path)?;

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&info)?;
        std::fs::write(output, json)?;
        println!("Written to: {}", output.display());
        return Ok(());
    }

    println!("GLM File Information");
    println!("====================");
    println!("Name:        {}", info.name);
    println!("Skeleton:    {}", info.anim_name);
    println!("File size:   {} bytes", info.file_size);
    println!("Bones:       {}", info.num_bones);
    println!();

    println!("Surfaces ({}):", info.surfaces.len());
    println!("-------------");
    for surface in &info.surfaces {
        let mut flags = Vec::new();
        if surface.tag {
            flags.push("tag");
        }
        if surface.off {
            flags.push("off");
        }
        println!(
            "  [{:3}] {:32} parent {:3} | {} children {}",
            surface.index,
            surface.name,
            surface.parent,
            surface.num_children,
            flags.join(" ")
        );
        if !surface.shader.is_empty() {
            println!("        shader: {}", surface.shader);
        }
    }
    println!();

    println!("LODs ({}):", info.lods.len());
    println!("---------");
    for lod in &info.lods {
        println!(
            "  [{}] {} surfaces, {} vertices, {} triangles, up to {} bone references",
            lod.level, lod.present_surfaces, lod.vertices, lod.triangles, lod.max_bone_references
        );
    }

    if !info.warnings.is_empty() {
        println!();
        println!("Warnings ({}):", info.warnings.len());
        for warning in &info.warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}

/// Decode a GLM file and write it back out.
pub fn repack(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let started = Instant::now();

    print_step(1, 3, LOOKING_GLASS, &format!("Reading {}...", source.display()));
    let result = read_glm(source)?;
    for warning in &result.warnings {
        println!("  Warning: {warning}");
    }

    print_step(2, 3, GEAR, "Encoding surfaces...");
    println!(
        "  {CUBE}{} surfaces, {} LODs",
        result.glm.hierarchy.len(),
        result.glm.lods.len()
    );

    print_step(3, 3, DISK, &format!("Writing {}...", destination.display()));
    write_glm(&result.glm, destination)?;

    print_done(started.elapsed());
    Ok(())
}
