//! The document model consumed by the rasterization pipeline.
//!
//! Decoding is delegated to a backend (see [`crate::backend`]). The pipeline
//! only needs a narrow capability surface: how many pages there are, the
//! geometry of each page, and a primitive that draws one page into a pixel
//! buffer under a given transform. Everything else the backend knows about the
//! file stays opaque.
//!
//! ## Concurrency contract
//!
//! [`Document`] requires `Send + Sync`: in parallel mode several jobs read the
//! same document at once. A backend whose decoder is not safe for concurrent
//! access must serialize internally (the pdfium backend confines the library
//! to a single owner thread) rather than rely on the scheduler to do it.

use crate::error::{PageError, SplitError};
use crate::pipeline::buffer::PixelBuffer;
use crate::pipeline::geometry::Affine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Page rotation, clockwise, as stored in the document.
///
/// Serialized as degrees; any multiple of 90 is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalise any multiple of 90 (negative values included).
    ///
    /// Returns `None` for angles that are not a multiple of 90.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True when the page is displayed on its side (90° or 270°).
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl TryFrom<i64> for Rotation {
    type Error = String;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees)
            .ok_or_else(|| format!("rotation must be a multiple of 90°, got {degrees}"))
    }
}

impl From<Rotation> for i64 {
    fn from(rotation: Rotation) -> i64 {
        i64::from(rotation.degrees())
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Unrotated page size in document units (points, 1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBounds {
    pub width: f64,
    pub height: f64,
}

impl PageBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size after applying `rotation`, i.e. as the page is displayed.
    pub fn logical(self, rotation: Rotation) -> PageBounds {
        if rotation.swaps_axes() {
            PageBounds::new(self.height, self.width)
        } else {
            self
        }
    }
}

/// Geometry a backend reports for one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub bounds: PageBounds,
    pub rotation: Rotation,
}

/// Failure reported by a backend draw primitive.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DrawError(pub String);

impl DrawError {
    pub fn new(detail: impl Into<String>) -> Self {
        DrawError(detail.into())
    }
}

/// A decoded, immutable, paginated document.
pub trait Document: Send + Sync {
    /// Number of pages; valid indices are `0..page_count()`.
    fn page_count(&self) -> usize;

    /// Geometry of page `index`, or `None` when out of range.
    fn page_geometry(&self, index: usize) -> Option<PageGeometry>;

    /// Draw page `index` into `target`.
    ///
    /// `transform` maps unrotated page space (origin bottom-left, y up) onto
    /// raster space (origin top-left, y down, one unit per pixel). The target
    /// has already been filled with its background.
    fn draw_page(
        &self,
        index: usize,
        target: &mut PixelBuffer,
        transform: &Affine,
    ) -> Result<(), DrawError>;
}

impl<'d> dyn Document + 'd {
    /// Borrow a view of page `index`.
    pub fn page(&self, index: usize) -> Result<Page<'_>, PageError> {
        let geometry = self
            .page_geometry(index)
            .ok_or(PageError::PageNotFound {
                page: index + 1,
                total: self.page_count(),
            })?;
        Ok(Page {
            index,
            bounds: geometry.bounds,
            rotation: geometry.rotation,
            document: self,
        })
    }
}

/// A page view. Not separately allocated; borrows its document.
#[derive(Clone, Copy)]
pub struct Page<'a> {
    pub index: usize,
    pub bounds: PageBounds,
    pub rotation: Rotation,
    document: &'a dyn Document,
}

impl Page<'_> {
    pub fn draw(&self, target: &mut PixelBuffer, transform: &Affine) -> Result<(), DrawError> {
        self.document.draw_page(self.index, target, transform)
    }
}

impl fmt::Debug for Page<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("index", &self.index)
            .field("bounds", &self.bounds)
            .field("rotation", &self.rotation)
            .finish_non_exhaustive()
    }
}

/// Opens a source file into a [`Document`].
///
/// Failure is fatal for the run: no page is processed unless `open`
/// succeeds.
pub trait DocumentProvider: Send + Sync {
    fn open(&self, source: &Path) -> Result<Arc<dyn Document>, SplitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_normalises_multiples_of_90() {
        assert_eq!(Rotation::from_degrees(0), Some(Rotation::Deg0));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(-180), Some(Rotation::Deg180));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn rotation_serializes_as_degrees() {
        assert_eq!(serde_json::to_string(&Rotation::Deg270).expect("serialize"), "270");
        let r: Rotation = serde_json::from_str("-90").expect("deserialize");
        assert_eq!(r, Rotation::Deg270);
        assert!(serde_json::from_str::<Rotation>("45").is_err());
    }

    #[test]
    fn logical_bounds_swap_on_quarter_turns() {
        let b = PageBounds::new(612.0, 792.0);
        assert_eq!(b.logical(Rotation::Deg0), b);
        assert_eq!(b.logical(Rotation::Deg180), b);
        assert_eq!(b.logical(Rotation::Deg90), PageBounds::new(792.0, 612.0));
        assert_eq!(b.logical(Rotation::Deg270), PageBounds::new(792.0, 612.0));
    }

    struct TwoPages;

    impl Document for TwoPages {
        fn page_count(&self) -> usize {
            2
        }

        fn page_geometry(&self, index: usize) -> Option<PageGeometry> {
            (index < 2).then_some(PageGeometry {
                bounds: PageBounds::new(100.0, 200.0),
                rotation: Rotation::Deg0,
            })
        }

        fn draw_page(&self, _: usize, _: &mut PixelBuffer, _: &Affine) -> Result<(), DrawError> {
            Ok(())
        }
    }

    #[test]
    fn page_out_of_range_is_page_not_found() {
        let doc: &dyn Document = &TwoPages;
        assert_eq!(doc.page(1).expect("in range").index, 1);
        let err = doc.page(2).expect_err("out of range");
        assert!(matches!(err, PageError::PageNotFound { page: 3, total: 2 }));
    }
}
