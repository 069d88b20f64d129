//! Error types for the splitpdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SplitError`] — **Fatal**: the run cannot start at all (missing input,
//!   undecodable document, output directory unusable). Returned as
//!   `Err(SplitError)` from the top-level `split*` functions before any page
//!   job is dispatched.
//!
//! * [`PageError`] — **Page-scoped**: a single page failed (bad geometry,
//!   backend draw error, disk full) but every other page is unaffected. Stored
//!   inside [`crate::output::PageJobResult`] so callers can inspect partial
//!   success rather than losing the whole document to one bad page.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the splitpdf library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageJobResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum SplitError {
    // ── Setup errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The output directory could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output directory does not exist (it is never created implicitly
    /// by [`crate::convert::split_document`]).
    #[error("Output directory '{path}' does not exist")]
    OutputDirMissing { path: PathBuf },

    // ── Decode errors ─────────────────────────────────────────────────────
    /// The document could not be opened by the decoding backend.
    #[error("Failed to decode '{path}': {detail}")]
    Decode { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Run outcome ───────────────────────────────────────────────────────
    /// Some pages succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::SplitOutput::into_result`] when the
    /// caller wants to treat any page failure as an error.
    #[error("{failed}/{total} pages failed during conversion")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SplitError {
    /// True for errors raised before the document is opened: missing or
    /// unreadable input and an unusable output directory.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            SplitError::FileNotFound { .. }
                | SplitError::PermissionDenied { .. }
                | SplitError::NotAPdf { .. }
                | SplitError::OutputDirCreateFailed { .. }
                | SplitError::OutputDirMissing { .. }
        )
    }

    /// True when the document itself could not be opened.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            SplitError::Decode { .. }
                | SplitError::PasswordRequired { .. }
                | SplitError::WrongPassword { .. }
        )
    }
}

/// Coarse classification of a [`PageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    PageNotFound,
    InvalidGeometry,
    RenderFailure,
    EncodingFailure,
    IoFailure,
    JobPanicked,
}

/// A page-scoped error. Never propagates past the job boundary.
///
/// Page numbers are 1-indexed to match the output file names.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum PageError {
    /// The page index is outside `0..page_count`.
    #[error("Page {page}: not found (document has {total} pages)")]
    PageNotFound { page: usize, total: usize },

    /// The raster target is empty, non-finite or too large.
    #[error("Page {page}: invalid geometry: {detail}")]
    InvalidGeometry { page: usize, detail: String },

    /// The backend draw primitive failed.
    #[error("Page {page}: rendering failed: {detail}")]
    RenderFailure { page: usize, detail: String },

    /// The pixel buffer could not be encoded.
    #[error("Page {page}: encoding failed: {detail}")]
    EncodingFailure { page: usize, detail: String },

    /// Writing the image to storage failed.
    #[error("Page {page}: failed to write '{path}': {detail}")]
    IoFailure {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// The job panicked; the panic was contained to this page.
    #[error("Page {page}: job panicked: {detail}")]
    JobPanicked { page: usize, detail: String },
}

impl PageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PageError::PageNotFound { .. } => ErrorKind::PageNotFound,
            PageError::InvalidGeometry { .. } => ErrorKind::InvalidGeometry,
            PageError::RenderFailure { .. } => ErrorKind::RenderFailure,
            PageError::EncodingFailure { .. } => ErrorKind::EncodingFailure,
            PageError::IoFailure { .. } => ErrorKind::IoFailure,
            PageError::JobPanicked { .. } => ErrorKind::JobPanicked,
        }
    }

    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::PageNotFound { page, .. }
            | PageError::InvalidGeometry { page, .. }
            | PageError::RenderFailure { page, .. }
            | PageError::EncodingFailure { page, .. }
            | PageError::IoFailure { page, .. }
            | PageError::JobPanicked { page, .. } => *page,
        }
    }
}
