//! Image encoding: [`PixelBuffer`] → PNG bytes.
//!
//! PNG is lossless: every channel value of the buffer survives exactly, with
//! no chroma subsampling and no resize. The encoder is deterministic, so the
//! same buffer always yields the same bytes regardless of which worker ran it.

use crate::error::PageError;
use crate::pipeline::buffer::{PixelBuffer, PixelFormat};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::debug;

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedFormat {
    Png,
}

impl EncodedFormat {
    pub fn extension(self) -> &'static str {
        match self {
            EncodedFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            EncodedFormat::Png => "image/png",
        }
    }
}

/// Encoded bytes of one page. Consumed by the output writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: EncodedFormat,
}

/// Encode a rendered page as PNG.
///
/// `page` is the 1-indexed page number used in error reports.
///
/// # Errors
/// [`PageError::EncodingFailure`] when the buffer is zero-sized, its stride is
/// not `width × bytes_per_pixel`, its length is not `stride × height`, or the
/// PNG encoder fails.
pub fn encode_png(buffer: &PixelBuffer, page: usize) -> Result<EncodedImage, PageError> {
    let fail = |detail: String| PageError::EncodingFailure { page, detail };

    let (width, height) = (buffer.width(), buffer.height());
    if width == 0 || height == 0 {
        return Err(fail(format!("buffer is empty ({width}x{height})")));
    }

    let packed = width as usize * buffer.format().bytes_per_pixel();
    if buffer.stride() != packed {
        return Err(fail(format!(
            "stride {} does not match width {width} × {} bytes",
            buffer.stride(),
            buffer.format().bytes_per_pixel()
        )));
    }
    if buffer.data().len() != packed * height as usize {
        return Err(fail(format!(
            "buffer holds {} bytes, expected {}",
            buffer.data().len(),
            packed * height as usize
        )));
    }

    let color = match buffer.format() {
        PixelFormat::Rgb8 => ExtendedColorType::Rgb8,
        PixelFormat::Rgba8 => ExtendedColorType::Rgba8,
    };

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(buffer.data(), width, height, color)
        .map_err(|e| fail(e.to_string()))?;

    debug!("Encoded page {} → {} bytes PNG", page, bytes.len());

    Ok(EncodedImage {
        bytes,
        format: EncodedFormat::Png,
    })
}
