//! Temporarily un-minimizes a window so its content can be captured.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::system::{ensure_live, WindowSystem};
use super::types::{WindowDescriptor, WindowHandle};
use crate::error::CaptureError;

/// Restores minimized windows for the duration of a capture.
pub struct MinimizedWindowController<'a, S: WindowSystem + ?Sized> {
    system: &'a S,
    settle: Duration,
}

impl<'a, S: WindowSystem + ?Sized> MinimizedWindowController<'a, S> {
    pub fn new(system: &'a S, settle: Duration) -> Self {
        Self { system, settle }
    }

    /// Runs `body` with the window visible and a descriptor read after any
    /// restore, then puts a minimized window back.
    ///
    /// The re-minimize happens on every exit path: success, error or panic in
    /// `body`.
    pub fn with_visible<R>(
        &self,
        handle: WindowHandle,
        body: impl FnOnce(&WindowDescriptor) -> Result<R, CaptureError>,
    ) -> Result<R, CaptureError> {
        ensure_live(self.system, handle)?;
        let before = self.system.describe(handle)?;

        if !before.is_minimized() {
            return body(&before);
        }

        info!("Window \"{}\" is minimized, restoring for capture", before.title);
        let _guard = ReminimizeGuard {
            system: self.system,
            handle,
        };
        self.system.restore(handle)?;
        std::thread::sleep(self.settle);

        // Geometry reads as zero until the restore has gone through
        ensure_live(self.system, handle)?;
        let restored = self.system.describe(handle)?;
        debug!(
            "Restored window at ({}, {}) size {}x{}",
            restored.left, restored.top, restored.width, restored.height
        );
        if !restored.has_valid_dimensions() {
            return Err(CaptureError::InvalidDimensions {
                width: restored.width,
                height: restored.height,
            });
        }

        body(&restored)
    }
}

/// Minimizes the window again when dropped.
struct ReminimizeGuard<'a, S: WindowSystem + ?Sized> {
    system: &'a S,
    handle: WindowHandle,
}

impl<S: WindowSystem + ?Sized> Drop for ReminimizeGuard<'_, S> {
    fn drop(&mut self) {
        if !self.system.is_window(self.handle) {
            warn!("Window {} closed before it could be minimized again", self.handle);
            return;
        }
        match self.system.minimize(self.handle) {
            Ok(()) => debug!("Window {} minimized again", self.handle),
            Err(e) => warn!("Failed to minimize window {} again: {}", self.handle, e),
        }
    }
}
