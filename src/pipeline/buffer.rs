//! Raw pixel buffers that pages are drawn into.
//!
//! A [`PixelBuffer`] is always created filled with a background colour (opaque
//! white for page renders) so transparent regions of a page never show up as
//! transparency in the output image.

use serde::{Deserialize, Serialize};

/// 8-bit-per-channel pixel layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb8,
    #[default]
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Opaque white, `[r, g, b, a]`.
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// A contiguous, row-major raster owned by exactly one page job.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
}

impl PixelBuffer {
    /// Allocate a tightly packed buffer filled with `color`.
    ///
    /// Returns `None` when the byte size overflows `usize`.
    pub fn filled(width: u32, height: u32, format: PixelFormat, color: [u8; 4]) -> Option<Self> {
        let bpp = format.bytes_per_pixel();
        let stride = (width as usize).checked_mul(bpp)?;
        let len = stride.checked_mul(height as usize)?;

        let mut data = Vec::with_capacity(len);
        let pixel = &color[..bpp];
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(pixel);
        }

        Some(Self {
            data,
            width,
            height,
            stride,
            format,
        })
    }

    /// Allocate a buffer filled with opaque white.
    pub fn white(width: u32, height: u32, format: PixelFormat) -> Option<Self> {
        Self::filled(width, height, format, WHITE)
    }

    /// Wrap raw bytes without validation. The encoder validates the layout.
    pub fn from_raw(
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Self {
        Self {
            data,
            width,
            height,
            stride,
            format,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Channel values of pixel `(x, y)` as RGBA (alpha is 255 for RGB buffers).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let bytes = &self.data[offset..offset + self.format.bytes_per_pixel()];
        Some(match self.format {
            PixelFormat::Rgb8 => [bytes[0], bytes[1], bytes[2], 255],
            PixelFormat::Rgba8 => [bytes[0], bytes[1], bytes[2], bytes[3]],
        })
    }

    /// Overwrite pixel `(x, y)`. Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let bpp = self.format.bytes_per_pixel();
        if let Some(offset) = self.offset(x, y) {
            self.data[offset..offset + bpp].copy_from_slice(&rgba[..bpp]);
        }
    }

    /// Composite `rgba` over pixel `(x, y)` (source-over).
    pub fn blend_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        match rgba[3] {
            0 => {}
            255 => self.put_pixel(x, y, rgba),
            alpha => {
                let Some(dst) = self.pixel(x, y) else {
                    return;
                };
                let sa = u32::from(alpha);
                let da = u32::from(dst[3]);
                // out_a = sa + da * (1 - sa), all in 0..=255 fixed point.
                let out_a = sa + da * (255 - sa) / 255;
                let mut out = [0u8; 4];
                for c in 0..3 {
                    let s = u32::from(rgba[c]) * sa;
                    let d = u32::from(dst[c]) * da * (255 - sa) / 255;
                    out[c] = if out_a == 0 {
                        0
                    } else {
                        ((s + d + out_a / 2) / out_a).min(255) as u8
                    };
                }
                out[3] = out_a.min(255) as u8;
                self.put_pixel(x, y, out);
            }
        }
    }

    /// Composite `rgba` over the half-open pixel rectangle `[x0, x1) × [y0, y1)`,
    /// clipped to the buffer.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, rgba: [u8; 4]) {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend_pixel(x, y, rgba);
            }
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * self.format.bytes_per_pixel();
        (offset + self.format.bytes_per_pixel() <= self.data.len()).then_some(offset)
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}
