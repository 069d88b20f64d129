//! Whole-document entry points.
//!
//! Every `split*` function follows the same order so that a fatal problem
//! never leaves debris behind:
//!
//! 1. resolve the input (missing input → no output directory is created)
//! 2. open the document on the blocking pool (decode failure → still nothing created)
//! 3. create the output directory
//! 4. run the [`PageJobScheduler`]
//!
//! Fatal problems come back as `Err(SplitError)`; page failures come back
//! inside `Ok(SplitOutput)`.

use crate::backend::pdfium::PdfiumProvider;
use crate::config::SplitConfig;
use crate::document::{Document, DocumentProvider};
use crate::error::SplitError;
use crate::output::{DocumentSummary, PageSummary, RunStats, SplitOutput};
use crate::pipeline::geometry::RasterTarget;
use crate::pipeline::input;
use crate::scheduler::PageJobScheduler;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Split a PDF into one PNG per page using pdfium.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(SplitOutput)` once every page has been attempted, even if some pages
/// failed (check `output.stats.failed_pages`, or call
/// [`SplitOutput::into_result`]).
///
/// # Errors
/// Returns `Err(SplitError)` only for fatal errors:
/// - input missing, unreadable or not a PDF
/// - pdfium cannot be bound, or the document cannot be decoded
/// - the output directory cannot be created
pub async fn split(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &SplitConfig,
) -> Result<SplitOutput, SplitError> {
    let pdf_path = input::resolve_input(input.as_ref())?;
    split_with_provider(pdf_path, output_dir, Arc::new(pdfium_provider(config)), config).await
}

/// Like [`split`], with the document opened by `provider`.
pub async fn split_with_provider(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    provider: Arc<dyn DocumentProvider>,
    config: &SplitConfig,
) -> Result<SplitOutput, SplitError> {
    let output_dir = output_dir.as_ref();
    let source = input::resolve_source(input.as_ref())?;
    info!("Starting split: {}", source.display());

    let document = open_document(provider, &source).await?;

    input::ensure_output_dir(output_dir)?;
    run(document, output_dir, config).await
}

/// Split an already-open document into `output_dir`.
///
/// Unlike the path-based entry points this never creates the directory.
///
/// # Errors
/// [`SplitError::OutputDirMissing`] when `output_dir` is not an existing
/// directory.
pub async fn split_document(
    document: Arc<dyn Document>,
    output_dir: impl AsRef<Path>,
    config: &SplitConfig,
) -> Result<SplitOutput, SplitError> {
    let output_dir = output_dir.as_ref();
    if !output_dir.is_dir() {
        return Err(SplitError::OutputDirMissing {
            path: output_dir.to_path_buf(),
        });
    }
    run(document, output_dir, config).await
}

/// Synchronous wrapper around [`split`].
///
/// Creates a temporary tokio runtime internally; do not call it from inside
/// an async context.
pub fn split_sync(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &SplitConfig,
) -> Result<SplitOutput, SplitError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SplitError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(split(input, output_dir, config))
}

/// Report page count and per-page geometry of a PDF without rendering.
pub async fn inspect(
    input: impl AsRef<Path>,
    config: &SplitConfig,
) -> Result<DocumentSummary, SplitError> {
    let pdf_path = input::resolve_input(input.as_ref())?;
    let document = open_document(Arc::new(pdfium_provider(config)), &pdf_path).await?;
    Ok(summarize(document.as_ref(), config))
}

/// Page geometry and raster targets of an open document.
pub fn summarize(document: &dyn Document, config: &SplitConfig) -> DocumentSummary {
    let pages = (0..document.page_count())
        .filter_map(|index| {
            let geometry = document.page_geometry(index)?;
            let target = RasterTarget::compute(geometry.bounds, geometry.rotation, config.scale)
                .and_then(|t| t.check_max(config.max_dimension))
                .ok();
            Some(PageSummary {
                page_num: index + 1,
                bounds: geometry.bounds,
                rotation: geometry.rotation,
                target,
            })
        })
        .collect();

    DocumentSummary {
        page_count: document.page_count(),
        scale: config.scale,
        pages,
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn pdfium_provider(config: &SplitConfig) -> PdfiumProvider {
    let mut provider = PdfiumProvider::new();
    if let Some(ref path) = config.library_path {
        provider = provider.with_library_path(path);
    }
    if let Some(ref password) = config.password {
        provider = provider.with_password(password);
    }
    provider
}

/// Opening may parse the whole file (and, for pdfium, bind a native library),
/// so it runs on the blocking pool.
async fn open_document(
    provider: Arc<dyn DocumentProvider>,
    source: &Path,
) -> Result<Arc<dyn Document>, SplitError> {
    let source = source.to_path_buf();
    tokio::task::spawn_blocking(move || provider.open(&source))
        .await
        .map_err(|e| SplitError::Internal(format!("document open task failed: {e}")))?
}

async fn run(
    document: Arc<dyn Document>,
    output_dir: &Path,
    config: &SplitConfig,
) -> Result<SplitOutput, SplitError> {
    let start = Instant::now();
    let mut scheduler = PageJobScheduler::new(config);
    let results = scheduler.run(document, output_dir).await;

    let failed_pages = results.iter().filter(|r| !r.is_success()).count();
    let stats = RunStats {
        total_pages: results.len(),
        succeeded_pages: results.len() - failed_pages,
        failed_pages,
        mode: scheduler.mode(),
        workers: scheduler.workers(),
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Split finished: {}/{} pages, {}ms total",
        stats.succeeded_pages, stats.total_pages, stats.total_duration_ms
    );

    Ok(SplitOutput {
        output_dir: output_dir.to_path_buf(),
        results,
        stats,
    })
}
