//! animation.cfg CLI commands

use std::path::Path;

use crate::formats::animation_cfg::{AnimationCfg, read_animation_cfg};

/// Parse an animation.cfg and print it back, sorted by start frame.
pub fn show(path: &Path, strict: bool) -> anyhow::Result<()> {
    let cfg = if strict {
        AnimationCfg::parse_strict(&std::fs::read_to_string(path)?)?
    } else {
        read_animation_cfg(path)?
    };

    println!("{cfg}");
    println!();
    println!("{} sequences, {} frames", cfg.sequences.len(), cfg.num_frames());
    Ok(())
}
