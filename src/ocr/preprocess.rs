use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Shrinks an image to `scale_percent` of its size before OCR.
///
/// Slow machines trade accuracy for speed here. Dimensions are truncated and
/// never drop below one pixel. At 100% the image is borrowed, not copied.
pub fn downscale_for_ocr(img: &RgbaImage, scale_percent: u8) -> Cow<'_, RgbaImage> {
    let scale_percent = scale_percent.clamp(1, 100) as u32;
    if scale_percent == 100 {
        return Cow::Borrowed(img);
    }

    let (w, h) = img.dimensions();
    let new_w = (w * scale_percent / 100).max(1);
    let new_h = (h * scale_percent / 100).max(1);
    Cow::Owned(imageops::resize(img, new_w, new_h, FilterType::Triangle))
}
