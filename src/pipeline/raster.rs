//! Page rasterisation: geometry → white buffer → backend draw.
//!
//! The rasterizer owns no decoding logic. It sizes the target from the page
//! bounds, allocates an opaque-white buffer of exactly that size, builds the
//! page → raster transform and hands both to the document's draw primitive.
//! Whatever backend is wired in, the output geometry is decided here.

use crate::document::Document;
use crate::error::PageError;
use crate::pipeline::buffer::{PixelBuffer, PixelFormat};
use crate::pipeline::geometry::{page_to_raster, RasterTarget};
use tracing::debug;

/// Largest accepted raster side, in pixels. pdfium refuses bitmaps beyond
/// roughly this size, and a 30 000 px square RGBA buffer is already 3.6 GB.
pub const DEFAULT_MAX_DIMENSION: u32 = 30_000;

/// Renders one page at a fixed scale into a [`PixelBuffer`].
#[derive(Debug, Clone, Copy)]
pub struct PageRasterizer {
    scale: f64,
    format: PixelFormat,
    max_dimension: u32,
}

impl PageRasterizer {
    pub fn new(scale: f64, format: PixelFormat) -> Self {
        Self {
            scale,
            format,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(mut self, px: u32) -> Self {
        self.max_dimension = px.max(1);
        self
    }

    /// Raster page `index` of `document`.
    ///
    /// # Errors
    /// - [`PageError::PageNotFound`] for an index outside the document
    /// - [`PageError::InvalidGeometry`] for an empty, non-finite or oversized target
    /// - [`PageError::RenderFailure`] when the backend draw fails
    pub fn rasterize(&self, document: &dyn Document, index: usize) -> Result<PixelBuffer, PageError> {
        let page_num = index + 1;
        let page = document.page(index)?;

        let target = RasterTarget::compute(page.bounds, page.rotation, self.scale)
            .and_then(|t| t.check_max(self.max_dimension))
            .map_err(|detail| PageError::InvalidGeometry {
                page: page_num,
                detail,
            })?;

        let mut buffer = PixelBuffer::white(target.width, target.height, self.format).ok_or_else(|| {
            PageError::InvalidGeometry {
                page: page_num,
                detail: format!("{}x{} px buffer size overflows", target.width, target.height),
            }
        })?;

        let transform = page_to_raster(page.bounds, page.rotation, self.scale);
        debug!(
            "Rasterising page {} ({}x{} pt, {}) → {}x{} px",
            page_num, page.bounds.width, page.bounds.height, page.rotation, target.width, target.height
        );

        page.draw(&mut buffer, &transform)
            .map_err(|e| PageError::RenderFailure {
                page: page_num,
                detail: e.to_string(),
            })?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DrawError, PageBounds, PageGeometry, Rotation};
    use crate::pipeline::buffer::WHITE;
    use crate::pipeline::geometry::Affine;
    use std::sync::Mutex;

    /// Records the transform it was handed and optionally fails.
    struct Probe {
        geometry: PageGeometry,
        fail: bool,
        seen: Mutex<Option<(u32, u32, Affine)>>,
    }

    impl Probe {
        fn new(width: f64, height: f64, rotation: Rotation) -> Self {
            Self {
                geometry: PageGeometry {
                    bounds: PageBounds::new(width, height),
                    rotation,
                },
                fail: false,
                seen: Mutex::new(None),
            }
        }
    }

    impl Document for Probe {
        fn page_count(&self) -> usize {
            1
        }

        fn page_geometry(&self, index: usize) -> Option<PageGeometry> {
            (index == 0).then_some(self.geometry)
        }

        fn draw_page(
            &self,
            _index: usize,
            target: &mut PixelBuffer,
            transform: &Affine,
        ) -> Result<(), DrawError> {
            *self.seen.lock().unwrap() = Some((target.width(), target.height(), *transform));
            if self.fail {
                return Err(DrawError::new("corrupt content stream"));
            }
            Ok(())
        }
    }

    #[test]
    fn buffer_matches_target_and_starts_white() {
        let doc = Probe::new(612.0, 792.0, Rotation::Deg0);
        let buf = PageRasterizer::new(2.0, PixelFormat::Rgb8)
            .rasterize(&doc, 0)
            .expect("rasterize");
        assert_eq!((buf.width(), buf.height()), (1224, 1584));
        assert_eq!(buf.format(), PixelFormat::Rgb8);
        assert_eq!(buf.pixel(0, 0), Some(WHITE));
        assert_eq!(buf.pixel(1223, 1583), Some(WHITE));
    }

    #[test]
    fn draw_receives_composite_transform() {
        let doc = Probe::new(612.0, 792.0, Rotation::Deg90);
        PageRasterizer::new(1.0, PixelFormat::Rgba8)
            .rasterize(&doc, 0)
            .expect("rasterize");
        let seen = *doc.seen.lock().unwrap();
        let (w, h, t) = seen.expect("draw called");
        assert_eq!((w, h), (792, 612));
        let expected = page_to_raster(PageBounds::new(612.0, 792.0), Rotation::Deg90, 1.0);
        for (got, want) in t.as_coeffs().into_iter().zip(expected.as_coeffs()) {
            assert!((got - want).abs() < 1e-12, "{t:?} vs {expected:?}");
        }
    }

    #[test]
    fn missing_page_is_page_not_found() {
        let doc = Probe::new(10.0, 10.0, Rotation::Deg0);
        let err = PageRasterizer::new(1.0, PixelFormat::Rgba8)
            .rasterize(&doc, 4)
            .expect_err("out of range");
        assert!(matches!(err, PageError::PageNotFound { page: 5, total: 1 }));
    }

    #[test]
    fn zero_area_page_is_invalid_geometry_and_never_drawn() {
        let doc = Probe::new(0.0, 792.0, Rotation::Deg0);
        let err = PageRasterizer::new(1.0, PixelFormat::Rgba8)
            .rasterize(&doc, 0)
            .expect_err("zero width");
        assert!(matches!(err, PageError::InvalidGeometry { page: 1, .. }));
        assert!(doc.seen.lock().unwrap().is_none());
    }

    #[test]
    fn oversized_page_is_invalid_geometry() {
        let doc = Probe::new(612.0, 792.0, Rotation::Deg0);
        let err = PageRasterizer::new(10.0, PixelFormat::Rgba8)
            .with_max_dimension(1000)
            .rasterize(&doc, 0)
            .expect_err("too large");
        assert!(matches!(err, PageError::InvalidGeometry { .. }));
    }

    #[test]
    fn draw_error_becomes_render_failure() {
        let mut doc = Probe::new(100.0, 100.0, Rotation::Deg0);
        doc.fail = true;
        let err = PageRasterizer::new(1.0, PixelFormat::Rgba8)
            .rasterize(&doc, 0)
            .expect_err("draw fails");
        match err {
            PageError::RenderFailure { page, detail } => {
                assert_eq!(page, 1);
                assert!(detail.contains("corrupt content stream"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
