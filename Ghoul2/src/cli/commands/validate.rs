//! Batch validation command

use std::path::Path;
use std::time::Instant;

use console::style;

use crate::cli::progress::{LOOKING_GLASS, print_done, print_step, simple_bar, update_bar};
use crate::progress::G2Progress;
use crate::scene::validate_tree;

/// Validate every model file below a directory.
pub fn execute(dir: &Path, output: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
    let started = Instant::now();
    print_step(1, 1, LOOKING_GLASS, &format!("Validating {}...", dir.display()));

    let pb = simple_bar(0, "Validating", quiet);
    let callback = |progress: &G2Progress| update_bar(&pb, progress);
    let summary = validate_tree(dir, Some(&callback))?;
    pb.finish_and_clear();

    for entry in &summary.entries {
        let display_path = entry.path.strip_prefix(dir).unwrap_or(&entry.path);
        if entry.success {
            if !quiet {
                println!(
                    "  {} {}: {}",
                    style("ok").green(),
                    display_path.display(),
                    entry.message
                );
            }
        } else {
            println!(
                "  {} {}: {}",
                style("FAILED").red().bold(),
                display_path.display(),
                entry.message
            );
        }
        for warning in &entry.warnings {
            println!("    {} {warning}", style("warning").yellow());
        }
    }

    println!();
    println!(
        "{} valid, {} failed, {} with warnings",
        summary.success_count, summary.fail_count, summary.warning_count
    );

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(output, json)?;
        println!("Report written to: {}", output.display());
    }

    print_done(started.elapsed());
    if summary.fail_count > 0 {
        anyhow::bail!("{} files failed validation", summary.fail_count);
    }
    Ok(())
}
