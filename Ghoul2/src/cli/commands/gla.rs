//! GLA CLI commands
//!
//! Commands for inspecting, decoding, and repacking skeleton files.

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{
    CUBE, DISK, GEAR, LOOKING_GLASS, print_done, print_step, simple_bar, update_bar,
};
use crate::formats::gla::{AnimationStream, GlaReadOptions, inspect_gla, read_gla, write_gla};
use crate::progress::G2Progress;

/// Inspect a GLA file and display its skeleton.
pub fn inspect(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let info = inspect_gla(path)?;

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&info)?;
        std::fs::write(output, json)?;
        println!("Written to: {}", output.display());
        return Ok(());
    }

    println!("GLA File Information");
    println!("====================");
    println!("Name:        {}", info.name);
    println!("File size:   {} bytes", info.file_size);
    println!("Scale:       {}", info.scale);
    println!("Frames:      {}", info.num_frames);
    println!("Bones:       {}", info.num_bones);
    println!("Pool:        {} entries", info.pool_entries);
    if let Some(ratio) = info.compression_ratio {
        println!("Ratio:       {ratio:.3} entries per frame and bone");
    }
    println!();

    println!("Bones:");
    println!("------");
    for bone in &info.bones {
        println!(
            "  [{:3}] {:32} parent {:3} | {} children",
            bone.index, bone.name, bone.parent, bone.num_children
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

/// Decode a window of frames and print the root bone positions.
pub fn frames(path: &Path, start: usize, count: usize, quiet: bool) -> anyhow::Result<()> {
    let result = read_gla(path, &GlaReadOptions::frame_range(start, count))?;
    let gla = result.gla;
    let Some(animation) = &gla.animation else {
        anyhow::bail!("{} has no animation", path.display());
    };

    let pb = simple_bar(animation.num_frames() as u64, "Decoding", quiet);
    let callback = |progress: &G2Progress| update_bar(&pb, progress);
    let poses = animation.decode_poses(&gla.skeleton, Some(&callback))?;
    pb.finish_and_clear();

    let roots: Vec<_> = gla.skeleton.bones.iter().filter(|b| b.is_root()).collect();
    for (offset, frame) in poses.iter().enumerate() {
        let frame_number = animation.first_frame + offset;
        for bone in &roots {
            let [x, y, z] = frame[bone.index].translation();
            println!("{frame_number:5} {:24} ({x:9.3}, {y:9.3}, {z:9.3})", bone.name);
        }
    }

    for warning in &result.warnings {
        println!("Warning: {warning}");
    }
    Ok(())
}

/// Decode a GLA file and write it back out.
pub fn repack(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let started = Instant::now();

    print_step(1, 3, LOOKING_GLASS, &format!("Reading {}...", source.display()));
    let result = read_gla(source, &GlaReadOptions::default())?;
    for warning in &result.warnings {
        println!("  Warning: {warning}");
    }

    print_step(2, 3, GEAR, "Encoding skeleton and frames...");
    let frames = result.gla.animation.as_ref().map_or(0, AnimationStream::num_frames);
    println!("  {CUBE}{} bones, {frames} frames", result.gla.skeleton.len());

    print_step(3, 3, DISK, &format!("Writing {}...", destination.display()));
    write_gla(&result.gla, destination)?;

    print_done(started.elapsed());
    Ok(())
}
