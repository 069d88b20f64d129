//! Page-to-raster geometry.
//!
//! Document space has its origin at the bottom-left of the unrotated page
//! with y pointing up; a page may additionally carry a clockwise display
//! rotation. Raster space has its origin at the top-left of the displayed page
//! with y pointing down and one unit per pixel. [`page_to_raster`] builds the
//! affine map between the two; [`RasterTarget::compute`] the pixel size.

use crate::document::{PageBounds, Rotation};
use kurbo::Vec2;
use serde::{Deserialize, Serialize};

pub use kurbo::Affine;

/// Relative slack applied before rounding up. Products such as
/// `612 × (150/72)` land a few ulps above the integer and must not gain a
/// pixel; any fraction larger than one part in 10⁹ of the extent still rounds
/// up, so sizes match `ceil(logical × scale)` for every realistic page.
const CEIL_RELATIVE_TOLERANCE: f64 = 1e-9;

/// Clockwise quarter-turn rotation of a `width × height` box about its
/// origin, translated back so the rotated box again starts at (0, 0).
/// Operates in y-up space.
pub fn rotate_box(rotation: Rotation, width: f64, height: f64) -> Affine {
    match rotation {
        Rotation::Deg0 => Affine::IDENTITY,
        // (x, y) → (y, w − x)
        Rotation::Deg90 => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, width]),
        // (x, y) → (w − x, h − y)
        Rotation::Deg180 => Affine::new([-1.0, 0.0, 0.0, -1.0, width, height]),
        // (x, y) → (h − y, x)
        Rotation::Deg270 => Affine::new([0.0, 1.0, -1.0, 0.0, height, 0.0]),
    }
}

/// Mirror the y axis within a box of the given height: `y → height − y`.
pub fn flip_y(height: f64) -> Affine {
    Affine::FLIP_Y.then_translate(Vec2::new(0.0, height))
}

/// True when axis-aligned rectangles stay axis-aligned (no shear, and any
/// rotation is a quarter turn).
pub fn is_axis_aligned(transform: &Affine) -> bool {
    let [a, b, c, d, _, _] = transform.as_coeffs();
    (b.abs() < 1e-9 && c.abs() < 1e-9) || (a.abs() < 1e-9 && d.abs() < 1e-9)
}

/// Composite page → raster transform: rotate (about the page origin, back
/// into the positive quadrant), flip y against the logical height, then scale
/// uniformly.
pub fn page_to_raster(bounds: PageBounds, rotation: Rotation, scale: f64) -> Affine {
    let logical = bounds.logical(rotation);
    Affine::scale(scale) * flip_y(logical.height) * rotate_box(rotation, bounds.width, bounds.height)
}

/// Pixel size of a rendered page. Derived, never stored on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterTarget {
    pub width: u32,
    pub height: u32,
}

impl RasterTarget {
    /// `ceil(logical × scale)` per axis, where the logical size swaps width
    /// and height for 90°/270°. Excesses below one part in 10⁹ of the extent
    /// are treated as float noise and do not round up. The error string
    /// describes why the geometry is unusable.
    pub fn compute(bounds: PageBounds, rotation: Rotation, scale: f64) -> Result<Self, String> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(format!("scale factor must be positive and finite, got {scale}"));
        }
        let logical = bounds.logical(rotation);
        let width = scaled_extent(logical.width, scale)
            .ok_or_else(|| format!("width {} × {scale} is not a positive pixel count", logical.width))?;
        let height = scaled_extent(logical.height, scale)
            .ok_or_else(|| format!("height {} × {scale} is not a positive pixel count", logical.height))?;
        Ok(Self { width, height })
    }

    /// Reject targets with a side longer than `max_dimension`.
    pub fn check_max(self, max_dimension: u32) -> Result<Self, String> {
        if self.width > max_dimension || self.height > max_dimension {
            return Err(format!(
                "{}x{} px exceeds the {max_dimension} px limit",
                self.width, self.height
            ));
        }
        Ok(self)
    }
}

fn scaled_extent(extent: f64, scale: f64) -> Option<u32> {
    let px = extent * scale;
    if !px.is_finite() || px <= 0.0 {
        return None;
    }
    let px = (px - px * CEIL_RELATIVE_TOLERANCE).ceil();
    if px < 1.0 || px > f64::from(u32::MAX) {
        return None;
    }
    Some(px as u32)
}
