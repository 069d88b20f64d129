//! Progress-callback trait for per-page split events.
//!
//! Inject an [`Arc<dyn SplitProgressCallback>`] via
//! [`crate::config::SplitConfigBuilder::progress_callback`] to receive
//! events as the scheduler processes each page.
//!
//! # Example
//!
//! ```rust
//! use splitpdf::{SplitConfig, SplitProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl SplitProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, png_bytes: usize) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} written ({} bytes)", page_num, total_pages, png_bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = SplitConfig::builder()
//!     .progress_callback(counter as Arc<dyn SplitProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the scheduler as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// In parallel mode `on_page_start`, `on_page_complete` and `on_page_error`
/// are called from blocking-pool threads, possibly concurrently and in any
/// page order. Protect shared mutable state with `Mutex` or atomics.
pub trait SplitProgressCallback: Send + Sync {
    /// Called once before any page job is dispatched.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a worker picks up a page (1-indexed `page_num`).
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once the page's PNG is durably in place.
    ///
    /// `png_bytes` is the encoded file size.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, png_bytes: usize) {
        let _ = (page_num, total_pages, png_bytes);
    }

    /// Called when a page job fails; `error` is the rendered [`crate::PageError`].
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl SplitProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::SplitConfig`].
pub type ProgressCallback = Arc<dyn SplitProgressCallback>;
