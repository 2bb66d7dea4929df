//! Coordinate conversion for OCR boxes.
//!
//! OCR runs on a window-local bitmap, possibly downscaled first. These helpers
//! bring its boxes back to bitmap pixels and then to absolute screen
//! coordinates so that a click at a box centre lands on the text.

use crate::ocr::OcrBox;

/// Translates every corner of every box by `offset`. Order is preserved and
/// nothing is filtered.
pub fn to_absolute(boxes: Vec<OcrBox>, offset: (i32, i32)) -> Vec<OcrBox> {
    let (dx, dy) = (offset.0 as f64, offset.1 as f64);
    boxes
        .into_iter()
        .map(|mut b| {
            for corner in &mut b.corners {
                corner[0] += dx;
                corner[1] += dy;
            }
            b
        })
        .collect()
}

/// Undoes the OCR downscale: corners found on an image scaled to
/// `scale_percent` of the bitmap are divided back to full-size pixels.
pub fn scale_to_bitmap(boxes: Vec<OcrBox>, scale_percent: u8) -> Vec<OcrBox> {
    let scale_percent = scale_percent.clamp(1, 100);
    if scale_percent == 100 {
        return boxes;
    }
    let factor = 100.0 / scale_percent as f64;
    boxes
        .into_iter()
        .map(|mut b| {
            for corner in &mut b.corners {
                corner[0] *= factor;
                corner[1] *= factor;
            }
            b
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ocr_box;

    fn sample_boxes() -> Vec<OcrBox> {
        vec![
            ocr_box(10.0, 20.0, 50.0, 12.0, "File"),
            ocr_box(70.0, 20.0, 40.0, 12.0, "Edit"),
            ocr_box(3.5, 400.25, 10.0, 10.0, "x"),
        ]
    }

    #[test]
    fn test_window_offset_applied_to_corner() {
        let boxes = to_absolute(vec![ocr_box(10.0, 20.0, 5.0, 5.0, "a")], (100, 50));
        assert_eq!(boxes[0].corners[0], [110.0, 70.0]);
        assert_eq!(boxes[0].corners[2], [115.0, 75.0]);
    }

    #[test]
    fn test_zero_offset_is_identity() {
        assert_eq!(to_absolute(sample_boxes(), (0, 0)), sample_boxes());
    }

    #[test]
    fn test_offsets_are_additive() {
        let offsets = [((100, 50), (-20, 7)), ((-1920, 0), (1920, 0)), ((3, -4), (0, 0))];
        for ((a, b), (c, d)) in offsets {
            let twice = to_absolute(to_absolute(sample_boxes(), (a, b)), (c, d));
            let once = to_absolute(sample_boxes(), (a + c, b + d));
            assert_eq!(twice, once);
        }
    }

    #[test]
    fn test_order_and_text_preserved() {
        let out = to_absolute(sample_boxes(), (5, 5));
        let texts: Vec<_> = out.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["File", "Edit", "x"]);
    }

    #[test]
    fn test_empty_boxes() {
        assert!(to_absolute(Vec::new(), (10, 10)).is_empty());
    }

    #[test]
    fn test_half_scale_doubles_corners() {
        let out = scale_to_bitmap(vec![ocr_box(10.0, 20.0, 5.0, 5.0, "a")], 50);
        assert_eq!(out[0].corners[0], [20.0, 40.0]);
        assert_eq!(out[0].corners[2], [30.0, 50.0]);
    }

    #[test]
    fn test_full_scale_unchanged() {
        assert_eq!(scale_to_bitmap(sample_boxes(), 100), sample_boxes());
    }
}
