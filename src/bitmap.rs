//! Owned pixel buffers and PNG encoding.

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use serde::Serialize;

use crate::error::CaptureError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    /// Native GDI / DXGI layout.
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }
}

/// Tightly packed pixel rows, owned by whichever pipeline stage holds it.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub bytes: Vec<u8>,
}

impl Bitmap {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: Vec<u8>,
    ) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if bytes.len() != expected {
            return Err(CaptureError::Encoding {
                message: format!(
                    "{}x{} {:?} needs {} bytes, got {}",
                    width,
                    height,
                    format,
                    expected,
                    bytes.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            bytes,
        })
    }

    /// Copies rows out of a padded source buffer (`row_pitch` bytes per row).
    ///
    /// Only the top-left `width`x`height` pixels are taken, which is how a
    /// surface larger than the wanted area gets cropped.
    pub fn from_pitched(
        width: u32,
        height: u32,
        format: PixelFormat,
        src: &[u8],
        row_pitch: usize,
    ) -> Result<Self, CaptureError> {
        let row_len = width as usize * format.bytes_per_pixel();
        if row_pitch < row_len || src.len() < row_pitch * height.saturating_sub(1) as usize + row_len
        {
            return Err(CaptureError::Encoding {
                message: format!(
                    "source buffer of {} bytes (pitch {}) too small for {}x{}",
                    src.len(),
                    row_pitch,
                    width,
                    height
                ),
            });
        }

        let mut bytes = Vec::with_capacity(row_len * height as usize);
        for y in 0..height as usize {
            let start = y * row_pitch;
            bytes.extend_from_slice(&src[start..start + row_len]);
        }
        Self::new(width, height, format, bytes)
    }

    /// Copies the bitmap onto a `width`x`height` canvas with its top-left at
    /// (`x`, `y`) on the canvas. Whatever falls outside is clipped and
    /// uncovered canvas pixels are zero.
    pub fn placed_on(&self, width: u32, height: u32, x: i32, y: i32) -> Result<Self, CaptureError> {
        let bpp = self.format.bytes_per_pixel();
        let (width, height) = (width as usize, height as usize);
        let (src_w, src_h) = (self.width as usize, self.height as usize);

        let src_x = x.saturating_neg().max(0) as usize;
        let src_y = y.saturating_neg().max(0) as usize;
        let dst_x = x.max(0) as usize;
        let dst_y = y.max(0) as usize;
        let copy_w = src_w.saturating_sub(src_x).min(width.saturating_sub(dst_x));
        let copy_h = src_h.saturating_sub(src_y).min(height.saturating_sub(dst_y));

        let mut bytes = vec![0u8; width * height * bpp];
        let len = copy_w * bpp;
        for row in 0..copy_h {
            let src = ((src_y + row) * src_w + src_x) * bpp;
            let dst = ((dst_y + row) * width + dst_x) * bpp;
            bytes[dst..dst + len].copy_from_slice(&self.bytes[src..src + len]);
        }
        Self::new(width as u32, height as u32, self.format, bytes)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Consumes the bitmap, converting to RGBA.
    pub fn into_rgba_image(self) -> RgbaImage {
        let Bitmap {
            width,
            height,
            format,
            bytes,
        } = self;

        let rgba = match format {
            PixelFormat::Rgba8 => bytes,
            PixelFormat::Bgra8 => {
                let mut bytes = bytes;
                // BGRA -> RGBA
                for px in bytes.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }
                bytes
            }
            PixelFormat::Rgb8 => {
                let mut out = Vec::with_capacity(bytes.len() / 3 * 4);
                for px in bytes.chunks_exact(3) {
                    out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
                out
            }
        };

        ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, rgba)
            .unwrap_or_else(|| ImageBuffer::new(width, height))
    }

    pub fn from_rgba_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            bytes: img.into_raw(),
        }
    }
}

/// Encodes the bitmap as PNG.
pub fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>, CaptureError> {
    let img = bitmap.clone().into_rgba_image();
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| CaptureError::Encoding {
            message: e.to_string(),
        })?;
    Ok(out.into_inner())
}

/// Decodes any format the `image` crate understands into an RGBA bitmap.
pub fn decode(bytes: &[u8]) -> Result<Bitmap, CaptureError> {
    let img = image::load_from_memory(bytes).map_err(|e| CaptureError::Encoding {
        message: e.to_string(),
    })?;
    Ok(Bitmap::from_rgba_image(img.to_rgba8()))
}
