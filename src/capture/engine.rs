//! End-to-end capture: match a window, capture it through the backend chain,
//! optionally OCR it, and package the result.

use std::path::PathBuf;

use image::RgbaImage;
use tracing::{debug, info, warn};

use super::activation::ActivationFallback;
use super::backend::{BackendKind, CaptureBackend, ScreenBounds, ScreenGrabber};
use super::chain::{CaptureChain, CaptureSource, ChainCapture};
use super::result::{assemble, CaptureResult, Provenance};
use crate::bitmap::Bitmap;
use crate::config::CaptureConfig;
use crate::coords::{scale_to_bitmap, to_absolute};
use crate::error::{BackendAttempt, CaptureError};
use crate::ocr::{downscale_for_ocr, OcrBox, OcrEngine};
use crate::window::{
    find_matching_window, MatchMode, MatchQuery, MinimizedWindowController, WindowDescriptor,
    WindowSystem,
};

/// What to capture and what to do with it.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureRequest {
    /// Window to capture; the whole screen when `None` or when nothing matches.
    pub query: Option<MatchQuery>,
    pub wants_ocr: bool,
    /// 1-100, size of the image handed to OCR relative to the capture.
    pub ocr_scale_percent: u8,
    /// Directory to save a PNG into.
    pub persist_to: Option<PathBuf>,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            query: None,
            wants_ocr: false,
            ocr_scale_percent: 100,
            persist_to: None,
        }
    }
}

impl CaptureRequest {
    pub fn screen() -> Self {
        Self::default()
    }

    pub fn window(query: MatchQuery) -> Self {
        Self {
            query: Some(query),
            ..Self::default()
        }
    }

    pub fn with_ocr(mut self, scale_percent: u8) -> Self {
        self.wants_ocr = true;
        self.ocr_scale_percent = scale_percent.clamp(1, 100);
        self
    }

    pub fn persist_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_to = Some(dir.into());
        self
    }
}

/// Owns the platform collaborators and runs captures against them.
///
/// Backends registered with [`with_backend`](Self::with_backend) are tried in
/// registration order. Foreground activation is always appended as the last
/// resort, and a full-screen grab backs up the whole chain.
pub struct CaptureEngine<S: WindowSystem, G: ScreenGrabber> {
    system: S,
    screen: G,
    backends: Vec<Box<dyn CaptureBackend>>,
    ocr: Option<Box<dyn OcrEngine>>,
    config: CaptureConfig,
}

impl<S: WindowSystem, G: ScreenGrabber> CaptureEngine<S, G> {
    pub fn new(system: S, screen: G, config: CaptureConfig) -> Self {
        Self {
            system,
            screen,
            backends: Vec::new(),
            ocr: None,
            config,
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn CaptureBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn with_ocr(mut self, ocr: Box<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn screen(&self) -> &G {
        &self.screen
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Backend order a window capture will follow.
    pub fn backend_order(&self) -> Vec<BackendKind> {
        self.chain().order()
    }

    /// Builds a query using the configured fuzzy threshold.
    pub fn match_query(&self, pattern: &str, use_regex: bool) -> MatchQuery {
        if use_regex {
            MatchQuery::regex(pattern)
        } else {
            MatchQuery::fuzzy(pattern, self.config.fuzzy_threshold)
        }
    }

    pub fn list_windows(&self) -> Result<Vec<WindowDescriptor>, CaptureError> {
        self.system.list_windows()
    }

    pub fn find_window(&self, query: &MatchQuery) -> Result<Option<WindowDescriptor>, CaptureError> {
        let windows = self.system.list_windows()?;
        debug!("Matching '{}' against {} windows", query.pattern, windows.len());
        Ok(find_matching_window(query, &windows))
    }

    /// Brings the matching window to the foreground, restoring it first if it
    /// is minimized. Unlike the capture fallback, the change is meant to last,
    /// so the previous foreground window is not put back.
    pub fn activate(&self, query: &MatchQuery) -> Result<WindowDescriptor, CaptureError> {
        let window = self
            .find_window(query)?
            .ok_or_else(|| CaptureError::WindowNotFound {
                pattern: query.pattern.clone(),
            })?;

        if window.is_minimized() {
            self.system.restore(window.handle)?;
        }
        self.system.activate(window.handle)?;
        info!("Activated \"{}\"", window.title);
        self.system.describe(window.handle)
    }

    pub fn screen_size(&self) -> ScreenBounds {
        self.screen.screen_bounds()
    }

    pub fn capture(&self, request: &CaptureRequest) -> Result<CaptureResult, CaptureError> {
        let target = match &request.query {
            Some(query) => {
                let found = self.find_window(query)?;
                if found.is_none() {
                    let mode = match query.mode {
                        MatchMode::Regex => "regex",
                        MatchMode::Fuzzy { .. } => "fuzzy",
                    };
                    info!(
                        "No window matches {} pattern '{}', capturing full screen",
                        mode, query.pattern
                    );
                }
                found
            }
            None => None,
        };

        let chain = self.chain();
        let (capture, window) = match &target {
            None => (chain.capture(None)?, None),
            Some(target) => {
                let (capture, window) = self.capture_window(&chain, target)?;
                (capture, Some(window))
            }
        };

        // Full-screen boxes stay unshifted
        let offset = match (capture.source, &window) {
            (CaptureSource::Backend(_), Some(w)) => w.offset(),
            _ => (0, 0),
        };

        let ChainCapture {
            bitmap,
            source,
            attempts,
        } = capture;

        let (bitmap, boxes) = if request.wants_ocr {
            // Converted in place; the result keeps the RGBA buffer OCR read
            let img = bitmap.into_rgba_image();
            let boxes = self.recognize(&img, request.ocr_scale_percent, offset)?;
            (Bitmap::from_rgba_image(img), boxes)
        } else {
            (bitmap, Vec::new())
        };
        let provenance = Provenance {
            window,
            source,
            attempts,
        };
        Ok(assemble(bitmap, provenance, boxes, request.persist_to.as_deref()))
    }

    fn chain(&self) -> CaptureChain<'_> {
        let chain = self
            .backends
            .iter()
            .fold(CaptureChain::new(&self.screen), |chain, backend| {
                chain.with_backend(Box::new(&**backend))
            });
        chain.with_backend(Box::new(ActivationFallback::new(
            &self.system,
            &self.screen,
            self.config.activation_timing(),
        )))
    }

    /// Captures `target` with the window visible. Returns the descriptor the
    /// pixels line up with: the restored geometry for a minimized window, or
    /// the original target when the chain degraded to the full screen.
    fn capture_window(
        &self,
        chain: &CaptureChain<'_>,
        target: &WindowDescriptor,
    ) -> Result<(ChainCapture, WindowDescriptor), CaptureError> {
        let controller = MinimizedWindowController::new(&self.system, self.config.restore_settle());
        let outcome = controller.with_visible(target.handle, |visible| {
            chain
                .capture(Some(visible))
                .map(|capture| (capture, visible.clone()))
        });

        match outcome {
            Err(e) if e.is_chain_failure() => {
                warn!(
                    "Could not capture \"{}\" ({}), capturing full screen instead",
                    target.title, e
                );
                let attempts = match e {
                    CaptureError::ChainExhausted { attempts } => attempts.0,
                    other => vec![BackendAttempt {
                        backend: BackendKind::Activation,
                        error: other.to_string(),
                    }],
                };
                let mut screen = chain.capture(None)?;
                screen.attempts = attempts;
                Ok((screen, target.clone()))
            }
            other => other,
        }
    }

    fn recognize(
        &self,
        img: &RgbaImage,
        scale_percent: u8,
        offset: (i32, i32),
    ) -> Result<Vec<OcrBox>, CaptureError> {
        let ocr = self.ocr.as_ref().ok_or_else(|| CaptureError::OcrFailed {
            message: "no OCR engine configured".to_string(),
        })?;

        let scaled = downscale_for_ocr(img, scale_percent);
        let boxes = ocr.recognize(&scaled).map_err(|e| CaptureError::OcrFailed {
            message: format!("{:#}", e),
        })?;
        debug!("OCR found {} text regions", boxes.len());

        Ok(to_absolute(scale_to_bitmap(boxes, scale_percent), offset))
    }
}
