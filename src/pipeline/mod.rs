//! Pipeline stages for page-to-image conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch rendering backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ raster ──▶ encode ──▶ write
//! (path)    (draw)     (PNG)      (atomic rename)
//! ```
//!
//! 1. [`input`]    — validate the input path before the document is opened
//! 2. [`raster`]   — size the target ([`geometry`]), allocate a white
//!    [`buffer`], and let the backend draw into it
//! 3. [`encode`]   — lossless PNG encoding of the buffer
//! 4. [`write`]    — temp file + rename into `<dir>/page_<n>.png`

pub mod buffer;
pub mod encode;
pub mod geometry;
pub mod input;
pub mod raster;
pub mod write;
