//! In-memory scene backend.
//!
//! A [`SceneDocument`] is a document built directly in memory: each page has
//! bounds, a rotation and a list of filled rectangles in unrotated page space.
//! It needs no native library, is plain immutable data (so it is trivially
//! safe to share across workers), and draws exactly what the transform says,
//! which makes it the reference backend for geometry and scheduling tests.

use crate::document::{Document, DocumentProvider, DrawError, PageBounds, PageGeometry, Rotation};
use crate::error::SplitError;
use crate::pipeline::buffer::PixelBuffer;
use crate::pipeline::geometry::{is_axis_aligned, Affine};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// An axis-aligned rectangle in page space (points, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilledRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Straight (non-premultiplied) RGBA.
    pub color: [u8; 4],
}

impl FilledRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64, color: [u8; 4]) -> Self {
        Self {
            x,
            y,
            width,
            height,
            color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePage {
    pub bounds: PageBounds,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub shapes: Vec<FilledRect>,
}

impl ScenePage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            bounds: PageBounds::new(width, height),
            rotation: Rotation::Deg0,
            shapes: Vec::new(),
        }
    }

    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_rect(mut self, rect: FilledRect) -> Self {
        self.shapes.push(rect);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub pages: Vec<ScenePage>,
}

impl SceneDocument {
    pub fn new(pages: Vec<ScenePage>) -> Self {
        Self { pages }
    }
}

impl Document for SceneDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_geometry(&self, index: usize) -> Option<PageGeometry> {
        self.pages.get(index).map(|p| PageGeometry {
            bounds: p.bounds,
            rotation: p.rotation,
        })
    }

    fn draw_page(
        &self,
        index: usize,
        target: &mut PixelBuffer,
        transform: &Affine,
    ) -> Result<(), DrawError> {
        let page = self
            .pages
            .get(index)
            .ok_or_else(|| DrawError::new(format!("no page at index {index}")))?;
        if !is_axis_aligned(transform) {
            return Err(DrawError::new("scene backend only draws axis-aligned transforms"));
        }

        for rect in &page.shapes {
            let area = transform.transform_rect_bbox(Rect::new(
                rect.x,
                rect.y,
                rect.x + rect.width,
                rect.y + rect.height,
            ));
            // A pixel is covered when its centre lies inside the rectangle.
            let (px0, px1) = pixel_span(area.x0, area.x1, target.width());
            let (py0, py1) = pixel_span(area.y0, area.y1, target.height());
            target.fill_rect(px0, py0, px1, py1, rect.color);
        }
        Ok(())
    }
}

/// Opens JSON-serialized [`SceneDocument`] files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneFileProvider;

impl DocumentProvider for SceneFileProvider {
    fn open(&self, source: &Path) -> Result<Arc<dyn Document>, SplitError> {
        let decode = |detail: String| SplitError::Decode {
            path: source.to_path_buf(),
            detail,
        };
        let text = std::fs::read_to_string(source).map_err(|e| decode(e.to_string()))?;
        let document: SceneDocument =
            serde_json::from_str(&text).map_err(|e| decode(format!("invalid scene: {e}")))?;
        info!("Scene loaded: {} pages", document.page_count());
        Ok(Arc::new(document))
    }
}

fn pixel_span(lo: f64, hi: f64, limit: u32) -> (u32, u32) {
    let clamp = |v: f64| v.clamp(0.0, f64::from(limit)) as u32;
    (clamp((lo - 0.5).ceil()), clamp((hi - 0.5).ceil()))
}
