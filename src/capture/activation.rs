//! Last-resort capture: bring the window to the front and grab the screen.
//!
//! This is the only place a capture changes which window has focus. The window
//! that was in front before is put back when the capture finishes, whichever
//! way it finishes.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::backend::{BackendKind, CaptureBackend, ScreenGrabber};
use crate::bitmap::Bitmap;
use crate::error::CaptureError;
use crate::window::{ensure_live, WindowDescriptor, WindowHandle, WindowSystem};

/// Timing for the activation fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationTiming {
    /// Attempts before giving up.
    pub retries: u32,
    /// Wait after activating the target.
    pub settle: Duration,
    /// Wait after giving focus back to the previous window.
    pub restore_settle: Duration,
    /// Wait between failed attempts.
    pub backoff: Duration,
}

impl Default for ActivationTiming {
    fn default() -> Self {
        Self {
            retries: 3,
            settle: Duration::from_millis(500),
            restore_settle: Duration::from_millis(200),
            backoff: Duration::from_millis(250),
        }
    }
}

/// Remembers the foreground window and re-activates it on drop.
pub struct ForegroundGuard<'a, S: WindowSystem + ?Sized> {
    system: &'a S,
    previous: Option<WindowHandle>,
    target: WindowHandle,
    settle: Duration,
}

impl<'a, S: WindowSystem + ?Sized> ForegroundGuard<'a, S> {
    pub fn save(system: &'a S, target: WindowHandle, settle: Duration) -> Self {
        let previous = system.foreground_window();
        debug!("Saved foreground window {:?}", previous);
        Self {
            system,
            previous,
            target,
            settle,
        }
    }
}

impl<S: WindowSystem + ?Sized> Drop for ForegroundGuard<'_, S> {
    fn drop(&mut self) {
        let Some(previous) = self.previous else {
            return;
        };
        if previous == self.target {
            return;
        }
        if !self.system.is_window(previous) {
            debug!("Previous foreground window {} is gone", previous);
            return;
        }
        match self.system.activate(previous) {
            Ok(()) => {
                std::thread::sleep(self.settle);
                debug!("Restored foreground window {}", previous);
            }
            Err(e) => warn!("Error restoring previous window {}: {}", previous, e),
        }
    }
}

pub struct ActivationFallback<'a, S: WindowSystem + ?Sized, G: ScreenGrabber + ?Sized> {
    system: &'a S,
    screen: &'a G,
    timing: ActivationTiming,
}

impl<'a, S: WindowSystem + ?Sized, G: ScreenGrabber + ?Sized> ActivationFallback<'a, S, G> {
    pub fn new(system: &'a S, screen: &'a G, timing: ActivationTiming) -> Self {
        Self {
            system,
            screen,
            timing,
        }
    }

    fn try_once(&self, window: &WindowDescriptor) -> Result<Bitmap, CaptureError> {
        self.system.activate(window.handle)?;
        std::thread::sleep(self.timing.settle);

        ensure_live(self.system, window.handle)?;
        let current = self.system.describe(window.handle)?;
        // Fall back to the last known rectangle if the fresh read is unusable
        let rect = if current.has_valid_dimensions() {
            &current
        } else {
            window
        };
        self.screen
            .capture_region(rect.left, rect.top, rect.width, rect.height)
    }
}

impl<S: WindowSystem + ?Sized, G: ScreenGrabber + ?Sized> CaptureBackend
    for ActivationFallback<'_, S, G>
{
    fn kind(&self) -> BackendKind {
        BackendKind::Activation
    }

    fn attempt_capture(&self, window: &WindowDescriptor) -> Result<Bitmap, CaptureError> {
        ensure_live(self.system, window.handle)?;
        info!("Activating \"{}\" for capture", window.title);

        let _foreground = ForegroundGuard::save(self.system, window.handle, self.timing.restore_settle);

        let retries = self.timing.retries.max(1);
        let mut last_error = String::new();
        for attempt in 1..=retries {
            match self.try_once(window) {
                Ok(bitmap) => return Ok(bitmap),
                Err(e @ CaptureError::InvalidWindowHandle { .. }) => return Err(e),
                Err(e) => {
                    warn!("Activation attempt {}/{} failed: {}", attempt, retries, e);
                    last_error = e.to_string();
                }
            }
            if attempt < retries {
                std::thread::sleep(self.timing.backoff);
            }
        }

        Err(CaptureError::ActivationFailed {
            attempts: retries,
            last_error,
        })
    }
}
