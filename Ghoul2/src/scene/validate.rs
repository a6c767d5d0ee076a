//! Batch validation of model directories
//!
//! Every file is decoded on its own, so a broken file never stops the
//! batch. Files are checked in parallel.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::Result;
use crate::formats::gla::{GlaReadOptions, read_gla};
use crate::formats::glm::read_glm;
use crate::progress::{G2Phase, G2Progress, G2ProgressCallback};

/// Kind of model file, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelFileKind {
    Gla,
    Glm,
}

impl ModelFileKind {
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?;
        if extension.eq_ignore_ascii_case("gla") {
            Some(Self::Gla)
        } else if extension.eq_ignore_ascii_case("glm") {
            Some(Self::Glm)
        } else {
            None
        }
    }
}

/// Outcome for one file.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationEntry {
    pub path: PathBuf,
    pub kind: ModelFileKind,
    pub success: bool,
    /// Summary on success, the error on failure.
    pub message: String,
    /// Recoverable format warnings.
    pub warnings: Vec<String>,
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    pub success_count: usize,
    pub fail_count: usize,
    /// Files with warnings, successful or not.
    pub warning_count: usize,
    pub entries: Vec<ValidationEntry>,
}

/// Find all `.gla` and `.glm` files below a directory, sorted.
///
/// # Errors
/// Returns an error if the directory cannot be walked.
pub fn find_model_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && ModelFileKind::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Decode one file completely and report the result.
///
/// Returns `None` for files that are neither `.gla` nor `.glm`.
#[must_use]
pub fn validate_file(path: &Path) -> Option<ValidationEntry> {
    let kind = ModelFileKind::from_path(path)?;
    let outcome = match kind {
        ModelFileKind::Gla => read_gla(path, &GlaReadOptions::default()).map(|result| {
            let frames = result
                .gla
                .animation
                .as_ref()
                .map_or(0, crate::formats::gla::AnimationStream::num_frames);
            (
                format!("{} bones, {frames} frames", result.gla.skeleton.len()),
                result.warnings,
            )
        }),
        ModelFileKind::Glm => read_glm(path).map(|result| {
            (
                format!(
                    "{} surfaces, {} LODs",
                    result.glm.hierarchy.len(),
                    result.glm.lods.len()
                ),
                result.warnings,
            )
        }),
    };

    let entry = match outcome {
        Ok((message, warnings)) => ValidationEntry {
            path: path.to_path_buf(),
            kind,
            success: true,
            message,
            warnings: warnings.iter().map(ToString::to_string).collect(),
        },
        Err(e) => {
            tracing::error!("Failed to validate {}: {e}", path.display());
            ValidationEntry {
                path: path.to_path_buf(),
                kind,
                success: false,
                message: e.to_string(),
                warnings: Vec::new(),
            }
        }
    };
    Some(entry)
}

/// Validate every model file below a directory.
///
/// # Errors
/// Returns an error only if the directory cannot be walked; per-file
/// failures are reported in the summary.
pub fn validate_tree<P: AsRef<Path>>(
    dir: P,
    progress: Option<G2ProgressCallback<'_>>,
) -> Result<ValidationSummary> {
    let dir = dir.as_ref();
    let files = find_model_files(dir)?;
    let total = files.len();
    tracing::info!("Validating {total} files in {}", dir.display());

    let processed = AtomicUsize::new(0);
    let entries: Vec<ValidationEntry> = files
        .par_iter()
        .filter_map(|path| {
            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(progress) = progress {
                let display_path = path.strip_prefix(dir).unwrap_or(path);
                progress(&G2Progress::with_file(
                    G2Phase::Validating,
                    current,
                    total,
                    display_path.to_string_lossy(),
                ));
            }
            validate_file(path)
        })
        .collect();

    if let Some(progress) = progress {
        progress(&G2Progress::new(G2Phase::Complete, total, total));
    }

    let success_count = entries.iter().filter(|e| e.success).count();
    Ok(ValidationSummary {
        success_count,
        fail_count: entries.len() - success_count,
        warning_count: entries.iter().filter(|e| !e.warnings.is_empty()).count(),
        entries,
    })
}
