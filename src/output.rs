//! Run results: one [`PageJobResult`] per page plus aggregate stats.

use crate::config::ExecutionMode;
use crate::document::{PageBounds, Rotation};
use crate::error::{PageError, SplitError};
use crate::pipeline::geometry::RasterTarget;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one page job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PageOutcome {
    Success { path: PathBuf },
    Failure(PageError),
}

/// Result for the page at `page_index` (0-based).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageJobResult {
    pub page_index: usize,
    pub outcome: PageOutcome,
}

impl PageJobResult {
    pub fn success(page_index: usize, path: PathBuf) -> Self {
        Self {
            page_index,
            outcome: PageOutcome::Success { path },
        }
    }

    pub fn failure(page_index: usize, error: PageError) -> Self {
        Self {
            page_index,
            outcome: PageOutcome::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PageOutcome::Success { .. })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match &self.outcome {
            PageOutcome::Success { path } => Some(path),
            PageOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PageError> {
        match &self.outcome {
            PageOutcome::Success { .. } => None,
            PageOutcome::Failure(e) => Some(e),
        }
    }
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub total_pages: usize,
    pub succeeded_pages: usize,
    pub failed_pages: usize,
    pub mode: ExecutionMode,
    pub workers: usize,
    pub total_duration_ms: u64,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOutput {
    pub output_dir: PathBuf,
    /// Ordered by `page_index`, one entry per page.
    pub results: Vec<PageJobResult>,
    pub stats: RunStats,
}

impl SplitOutput {
    /// True when every page produced an image (vacuously true for empty
    /// documents).
    pub fn all_succeeded(&self) -> bool {
        self.stats.failed_pages == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &PageError> {
        self.results.iter().filter_map(PageJobResult::error)
    }

    /// Treat any page failure as an error.
    pub fn into_result(self) -> Result<Self, SplitError> {
        if self.all_succeeded() {
            Ok(self)
        } else {
            Err(SplitError::PartialFailure {
                success: self.stats.succeeded_pages,
                failed: self.stats.failed_pages,
                total: self.stats.total_pages,
            })
        }
    }
}

/// Geometry of one page as reported by [`crate::convert::inspect`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed.
    pub page_num: usize,
    pub bounds: PageBounds,
    pub rotation: Rotation,
    /// `None` when the page geometry cannot be rasterised.
    pub target: Option<RasterTarget>,
}

/// Document overview produced without rendering anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub page_count: usize,
    pub scale: f64,
    pub pages: Vec<PageSummary>,
}
