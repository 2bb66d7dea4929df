//! Ordered fallback over capture backends.

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use super::backend::{BackendKind, CaptureBackend, ScreenGrabber};
use crate::bitmap::Bitmap;
use crate::error::{Attempts, BackendAttempt, CaptureError};
use crate::window::WindowDescriptor;

/// Where the pixels of a capture came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureSource {
    Backend(BackendKind),
    /// Whole screen, either requested or as the last-resort degradation.
    Screen,
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::Backend(kind) => kind.fmt(f),
            CaptureSource::Screen => f.write_str("screen"),
        }
    }
}

impl Serialize for CaptureSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Bitmap produced by the chain plus every failure seen on the way.
#[derive(Debug)]
pub struct ChainCapture {
    pub bitmap: Bitmap,
    pub source: CaptureSource,
    pub attempts: Vec<BackendAttempt>,
}

/// Backends tried strictly in insertion order until one returns a bitmap.
pub struct CaptureChain<'a> {
    screen: &'a dyn ScreenGrabber,
    backends: Vec<Box<dyn CaptureBackend + 'a>>,
}

impl<'a> CaptureChain<'a> {
    pub fn new(screen: &'a dyn ScreenGrabber) -> Self {
        Self {
            screen,
            backends: Vec::new(),
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn CaptureBackend + 'a>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn order(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Captures `window`, or the whole screen when `window` is `None`.
    ///
    /// Individual backend failures are logged and collected. The only errors
    /// returned are `InvalidWindowHandle` (the window is gone, no point going
    /// on) and `ChainExhausted` listing every attempt in order.
    pub fn capture(&self, window: Option<&WindowDescriptor>) -> Result<ChainCapture, CaptureError> {
        let Some(window) = window else {
            debug!("No target window, capturing full screen");
            return Ok(ChainCapture {
                bitmap: self.screen.capture_screen()?,
                source: CaptureSource::Screen,
                attempts: Vec::new(),
            });
        };

        let mut attempts = Vec::new();
        for backend in &self.backends {
            let kind = backend.kind();
            debug!("Trying {} capture of \"{}\"", kind, window.title);

            match backend.attempt_capture(window) {
                Ok(bitmap) => {
                    info!(
                        "Captured \"{}\" with {} ({}x{})",
                        window.title, kind, bitmap.width, bitmap.height
                    );
                    return Ok(ChainCapture {
                        bitmap,
                        source: CaptureSource::Backend(kind),
                        attempts,
                    });
                }
                Err(e @ CaptureError::InvalidWindowHandle { .. }) => {
                    warn!("{} capture aborted: {}", kind, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("{} capture failed: {}", kind, e);
                    attempts.push(BackendAttempt {
                        backend: kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(CaptureError::ChainExhausted {
            attempts: Attempts(attempts),
        })
    }
}
