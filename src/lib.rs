//! # splitpdf
//!
//! Split a paginated document into one PNG image per page.
//!
//! Each page is rasterised onto an opaque white canvas whose pixel size is
//! `ceil(page size × scale)` (width and height swapped for 90°/270° pages),
//! encoded as PNG and written atomically to `<output_dir>/page_<n>.png`.
//! Pages are independent jobs: a failing page never stops the others, and the
//! run reports one result per page, ordered by page index.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Input    validate the source path (nothing is created on failure)
//!  ├─ 2. Open     decode via a DocumentProvider (pdfium, or in-memory scene)
//!  ├─ 3. Raster   white buffer + rotate → flip-y → scale transform → draw
//!  ├─ 4. Encode   8-bit RGB/RGBA PNG
//!  ├─ 5. Write    temp file + rename onto page_<n>.png
//!  └─ 6. Schedule sequential, or bounded parallel pool (spawn_blocking)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use splitpdf::{split, SplitConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SplitConfig::builder().dpi(150).build()?;
//!     let output = split("document.pdf", "pages/", &config).await?;
//!     eprintln!("{}/{} pages written",
//!         output.stats.succeeded_pages,
//!         output.stats.total_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `splitpdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! splitpdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scheduler;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{PdfiumProvider, SceneDocument, SceneFileProvider};
pub use config::{ExecutionMode, SplitConfig, SplitConfigBuilder};
pub use convert::{inspect, split, split_document, split_sync, split_with_provider, summarize};
pub use document::{Document, DocumentProvider, PageBounds, Rotation};
pub use error::{ErrorKind, PageError, SplitError};
pub use output::{DocumentSummary, PageJobResult, PageOutcome, RunStats, SplitOutput};
pub use pipeline::buffer::PixelFormat;
pub use progress::{NoopProgressCallback, ProgressCallback, SplitProgressCallback};
pub use scheduler::{PageJobScheduler, SchedulerState};
