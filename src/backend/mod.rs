//! Document backends.
//!
//! The pipeline talks to documents only through [`crate::document::Document`];
//! these modules provide concrete implementations.
//!
//! * [`pdfium`] — real PDFs via `pdfium-render`, serialized on an owner thread
//! * [`scene`]  — in-memory documents of filled rectangles, no native library

pub mod pdfium;
pub mod scene;

pub use pdfium::{PdfiumDocument, PdfiumProvider};
pub use scene::{FilledRect, SceneDocument, SceneFileProvider, ScenePage};
