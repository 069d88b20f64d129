//! Configuration types for page splitting.
//!
//! All run behaviour is controlled through [`SplitConfig`], built via its
//! [`SplitConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across worker threads and to log exactly what a run used.

use crate::error::SplitError;
use crate::pipeline::buffer::PixelFormat;
use crate::pipeline::raster::DEFAULT_MAX_DIMENSION;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Upper bound on the default worker count.
pub const MAX_DEFAULT_WORKERS: usize = 20;

/// Configuration for splitting a document into page images.
///
/// Built via [`SplitConfig::builder()`] or using [`SplitConfig::default()`].
///
/// # Example
/// ```rust
/// use splitpdf::{ExecutionMode, SplitConfig};
///
/// let config = SplitConfig::builder()
///     .scale(2.0)
///     .mode(ExecutionMode::Sequential)
///     .build()
///     .unwrap();
/// assert_eq!(config.scale, 2.0);
/// ```
#[derive(Clone)]
pub struct SplitConfig {
    /// Document units → pixels multiplier. Default: 1.0.
    ///
    /// 1.0 is the 72 DPI baseline: a 612 × 792 pt US-Letter page becomes a
    /// 612 × 792 px image. Use [`SplitConfigBuilder::dpi`] to think in DPI.
    pub scale: f64,

    /// Sequential or parallel page jobs. Default: [`ExecutionMode::Parallel`].
    pub mode: ExecutionMode,

    /// Worker count in parallel mode. Default: available parallelism, capped at 20.
    ///
    /// Every in-flight job holds one full-page pixel buffer, so this also caps
    /// peak memory: `workers × width × height × 4` bytes at most.
    pub workers: usize,

    /// Pixel layout of the rendered buffer and output PNG. Default: RGBA.
    pub pixel_format: PixelFormat,

    /// Largest accepted raster side in pixels. Default: 30 000.
    ///
    /// Pages exceeding it fail with `InvalidGeometry` instead of being
    /// silently downscaled: output sizes are always `ceil(points × scale)`.
    pub max_dimension: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit pdfium library file or directory.
    pub library_path: Option<PathBuf>,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            mode: ExecutionMode::default(),
            workers: default_workers(),
            pixel_format: PixelFormat::default(),
            max_dimension: DEFAULT_MAX_DIMENSION,
            password: None,
            library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfig")
            .field("scale", &self.scale)
            .field("mode", &self.mode)
            .field("workers", &self.workers)
            .field("pixel_format", &self.pixel_format)
            .field("max_dimension", &self.max_dimension)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("library_path", &self.library_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SplitProgressCallback>"),
            )
            .finish()
    }
}

impl SplitConfig {
    /// Create a new builder for `SplitConfig`.
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder {
            config: Self::default(),
        }
    }

    /// Worker count the scheduler will actually use for this config.
    pub fn effective_workers(&self) -> usize {
        match self.mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel => self.workers.max(1),
        }
    }
}

/// Builder for [`SplitConfig`].
#[derive(Debug)]
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl SplitConfigBuilder {
    pub fn scale(mut self, scale: f64) -> Self {
        self.config.scale = scale;
        self
    }

    /// Set the scale from a resolution: `scale = dpi / 72`.
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.scale = f64::from(dpi) / 72.0;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.max(1);
        self
    }

    pub fn pixel_format(mut self, format: PixelFormat) -> Self {
        self.config.pixel_format = format;
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SplitConfig, SplitError> {
        let c = &self.config;
        if !c.scale.is_finite() || c.scale <= 0.0 {
            return Err(SplitError::InvalidConfig(format!(
                "Scale factor must be positive and finite, got {}",
                c.scale
            )));
        }
        if c.max_dimension == 0 {
            return Err(SplitError::InvalidConfig(
                "Maximum dimension must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// How the scheduler runs page jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// One page at a time, in index order. Deterministic log order.
    Sequential,
    /// Pages fan out over a bounded worker pool. (default)
    #[default]
    Parallel,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => f.write_str("sequential"),
            ExecutionMode::Parallel => f.write_str("parallel"),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_DEFAULT_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SplitConfig::default();
        assert_eq!(c.scale, 1.0);
        assert_eq!(c.mode, ExecutionMode::Parallel);
        assert!((1..=MAX_DEFAULT_WORKERS).contains(&c.workers));
        assert_eq!(c.pixel_format, PixelFormat::Rgba8);
        assert_eq!(c.max_dimension, DEFAULT_MAX_DIMENSION);
    }

    #[test]
    fn dpi_maps_to_scale() {
        let c = SplitConfig::builder().dpi(144).build().expect("valid");
        assert_eq!(c.scale, 2.0);
        let c = SplitConfig::builder().dpi(72).build().expect("valid");
        assert_eq!(c.scale, 1.0);
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        assert!(SplitConfig::builder().scale(0.0).build().is_err());
        assert!(SplitConfig::builder().scale(-1.0).build().is_err());
        assert!(SplitConfig::builder().scale(f64::NAN).build().is_err());
        assert!(SplitConfig::builder().dpi(0).build().is_err());
    }

    #[test]
    fn workers_never_zero() {
        let c = SplitConfig::builder().workers(0).build().expect("valid");
        assert_eq!(c.workers, 1);
    }

    #[test]
    fn sequential_uses_one_worker() {
        let c = SplitConfig::builder()
            .workers(8)
            .mode(ExecutionMode::Sequential)
            .build()
            .expect("valid");
        assert_eq!(c.effective_workers(), 1);
    }

    #[test]
    fn debug_redacts_password() {
        let c = SplitConfig::builder().password("hunter2").build().expect("valid");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
