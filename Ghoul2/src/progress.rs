//! Progress reporting for long-running codec operations
//!
//! Progress is advisory. An interrupted operation has no partial result.

/// Progress callback type for Ghoul2 operations
pub type G2ProgressCallback<'a> = &'a (dyn Fn(&G2Progress) + Sync + Send);

/// Progress information during Ghoul2 operations
#[derive(Debug, Clone)]
pub struct G2Progress {
    /// Current operation phase
    pub phase: G2Phase,
    /// Current item number (1-indexed)
    pub current: usize,
    /// Total number of items
    pub total: usize,
    /// Current file or item being processed (if applicable)
    pub current_file: Option<String>,
}

impl G2Progress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: G2Phase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    /// Create a progress update with a file/item name
    #[must_use]
    pub fn with_file(
        phase: G2Phase,
        current: usize,
        total: usize,
        file: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of a Ghoul2 operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum G2Phase {
    // === Animation phases ===
    /// Quantizing frames into the bone pool
    CompressingFrames,
    /// Resolving pool entries into poses
    DecompressingFrames,

    // === Batch phases ===
    /// Validating files of a directory tree
    Validating,

    // === Common ===
    /// Operation complete
    Complete,
}

impl G2Phase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CompressingFrames => "Compressing frames",
            Self::DecompressingFrames => "Decompressing frames",
            Self::Validating => "Validating",
            Self::Complete => "Complete",
        }
    }
}

/// Report every `interval` items, plus the last one.
pub(crate) fn report_every(
    progress: Option<G2ProgressCallback<'_>>,
    phase: G2Phase,
    current: usize,
    total: usize,
    interval: usize,
) {
    if let Some(cb) = progress {
        if current % interval.max(1) == 0 || current == total {
            cb(&G2Progress::new(phase, current, total));
        }
    }
}
