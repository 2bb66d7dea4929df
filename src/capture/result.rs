//! Final capture output and screenshot persistence.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::chain::CaptureSource;
use crate::bitmap::{encode_png, Bitmap};
use crate::error::{BackendAttempt, CaptureError};
use crate::ocr::OcrBox;
use crate::window::WindowDescriptor;

/// How a bitmap was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct Provenance {
    /// Window that was targeted, if any. Present even when the capture
    /// degraded to the full screen.
    pub window: Option<WindowDescriptor>,
    pub source: CaptureSource,
    pub attempts: Vec<BackendAttempt>,
}

#[derive(Debug)]
pub struct CaptureResult {
    pub bitmap: Bitmap,
    pub window: Option<WindowDescriptor>,
    pub source: CaptureSource,
    pub attempts: Vec<BackendAttempt>,
    /// OCR boxes in screen coordinates.
    pub absolute_boxes: Vec<OcrBox>,
    pub saved_path: Option<PathBuf>,
    /// Set when saving was requested and failed. The bitmap is still valid.
    pub persist_error: Option<CaptureError>,
}

/// Everything in a [`CaptureResult`] except the pixels.
#[derive(Serialize)]
pub struct CaptureSummary<'a> {
    pub width: u32,
    pub height: u32,
    pub window: Option<&'a WindowDescriptor>,
    pub source: CaptureSource,
    pub attempts: &'a [BackendAttempt],
    pub ocr: &'a [OcrBox],
    pub saved_path: Option<&'a Path>,
    pub persist_error: Option<&'a CaptureError>,
}

impl CaptureResult {
    pub fn summary(&self) -> CaptureSummary<'_> {
        CaptureSummary {
            width: self.bitmap.width,
            height: self.bitmap.height,
            window: self.window.as_ref(),
            source: self.source,
            attempts: &self.attempts,
            ocr: &self.absolute_boxes,
            saved_path: self.saved_path.as_deref(),
            persist_error: self.persist_error.as_ref(),
        }
    }
}

/// Packages a capture, saving it as PNG under `persist_to` when given.
///
/// A failed save is recorded in `persist_error`, never returned: callers
/// still get the pixels.
pub fn assemble(
    bitmap: Bitmap,
    provenance: Provenance,
    absolute_boxes: Vec<OcrBox>,
    persist_to: Option<&Path>,
) -> CaptureResult {
    let (saved_path, persist_error) = match persist_to {
        None => (None, None),
        Some(dir) => match persist_png(&bitmap, dir) {
            Ok(path) => (Some(path), None),
            Err(e) => {
                warn!("{}", e);
                (None, Some(e))
            }
        },
    };

    CaptureResult {
        bitmap,
        window: provenance.window,
        source: provenance.source,
        attempts: provenance.attempts,
        absolute_boxes,
        saved_path,
        persist_error,
    }
}

/// Writes `bitmap` to `dir/screenshot_<YYYYmmdd_HHMMSS>_<8 hex>.png`,
/// creating `dir` if needed.
pub fn persist_png(bitmap: &Bitmap, dir: &Path) -> Result<PathBuf, CaptureError> {
    let path = dir.join(screenshot_filename());
    let fail = |message: String| CaptureError::PersistFailed {
        path: path.clone(),
        message,
    };

    fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))?;
    let png = encode_png(bitmap).map_err(|e| fail(e.to_string()))?;
    fs::write(&path, png).map_err(|e| fail(e.to_string()))?;

    info!("Screenshot saved: {}", path.display());
    Ok(path)
}

fn screenshot_filename() -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let id = Uuid::new_v4().simple().to_string();
    format!("screenshot_{}_{}.png", timestamp, &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{decode, PixelFormat};
    use crate::testing::{ocr_box, window};
    use tempfile::tempdir;

    fn small_bitmap() -> Bitmap {
        Bitmap::new(2, 1, PixelFormat::Rgba8, vec![255, 0, 0, 255, 0, 255, 0, 255]).unwrap()
    }

    fn screen_provenance() -> Provenance {
        Provenance {
            window: None,
            source: CaptureSource::Screen,
            attempts: Vec::new(),
        }
    }

    #[test]
    fn test_filename_shape() {
        let name = screenshot_filename();
        // screenshot_ + 15 timestamp chars + _ + 8 hex + .png
        assert_eq!(name.len(), "screenshot_".len() + 15 + 1 + 8 + ".png".len());
        assert!(name.starts_with("screenshot_"));
        assert!(name.ends_with(".png"));
        let id = &name[27..35];
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_filenames_are_unique() {
        assert_ne!(screenshot_filename(), screenshot_filename());
    }

    #[test]
    fn test_no_persist_requested() {
        let result = assemble(small_bitmap(), screen_provenance(), Vec::new(), None);
        assert!(result.saved_path.is_none());
        assert!(result.persist_error.is_none());
    }

    #[test]
    fn test_persisted_png_decodes_to_same_pixels() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("shots");

        let result = assemble(small_bitmap(), screen_provenance(), Vec::new(), Some(&target));

        let path = result.saved_path.clone().unwrap();
        assert!(path.starts_with(&target));
        let decoded = decode(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(decoded, result.bitmap);
    }

    #[test]
    fn test_persist_failure_keeps_bitmap() {
        let dir = tempdir().unwrap();
        let not_a_dir = dir.path().join("file.txt");
        fs::write(&not_a_dir, "x").unwrap();

        let result = assemble(small_bitmap(), screen_provenance(), Vec::new(), Some(&not_a_dir));

        assert!(result.saved_path.is_none());
        assert!(matches!(
            result.persist_error,
            Some(CaptureError::PersistFailed { .. })
        ));
        assert_eq!(result.bitmap, small_bitmap());
    }

    #[test]
    fn test_summary_carries_metadata() {
        let provenance = Provenance {
            window: Some(window(7, "Notepad", 0, 0, 2, 1)),
            source: CaptureSource::Backend(crate::capture::BackendKind::Compositor),
            attempts: Vec::new(),
        };
        let boxes = vec![ocr_box(1.0, 2.0, 3.0, 4.0, "hi")];
        let result = assemble(small_bitmap(), provenance, boxes, None);

        let json = serde_json::to_value(result.summary()).unwrap();
        assert_eq!(json["width"], 2);
        assert_eq!(json["source"], "compositor");
        assert_eq!(json["window"]["title"], "Notepad");
        assert_eq!(json["ocr"][0]["text"], "hi");
        assert!(json["saved_path"].is_null());
    }
}
