//! Capture strategy interface.

use std::fmt;

use serde::Serialize;

use crate::bitmap::Bitmap;
use crate::error::CaptureError;
use crate::window::WindowDescriptor;

/// Which strategy produced (or failed to produce) a bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Windows.Graphics.Capture frame pool.
    GraphicsCapture,
    /// `PrintWindow` with full-content rendering.
    Compositor,
    /// Blit from the window's own device context.
    WindowDc,
    /// Blit from the screen at the window rectangle.
    ScreenRegion,
    /// Bring the window to the front, then grab the screen.
    Activation,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::GraphicsCapture => "graphics-capture",
            BackendKind::Compositor => "compositor",
            BackendKind::WindowDc => "window-dc",
            BackendKind::ScreenRegion => "screen-region",
            BackendKind::Activation => "activation",
        };
        f.write_str(name)
    }
}

/// One way of turning a window into pixels.
///
/// Implementations re-validate the window before touching it and release every
/// native resource they acquire before returning, on success and failure.
pub trait CaptureBackend {
    fn kind(&self) -> BackendKind;

    fn attempt_capture(&self, window: &WindowDescriptor) -> Result<Bitmap, CaptureError>;
}

impl<T: CaptureBackend + ?Sized> CaptureBackend for &T {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn attempt_capture(&self, window: &WindowDescriptor) -> Result<Bitmap, CaptureError> {
        (**self).attempt_capture(window)
    }
}

/// Rectangle covered by a full-screen capture, in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ScreenBounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenBounds {
    pub fn offset(&self) -> (i32, i32) {
        (self.left, self.top)
    }
}

/// Plain screen grabs with no window involved.
pub trait ScreenGrabber {
    fn screen_bounds(&self) -> ScreenBounds;

    /// Captures everything inside `screen_bounds()`.
    fn capture_screen(&self) -> Result<Bitmap, CaptureError>;

    fn capture_region(
        &self,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
    ) -> Result<Bitmap, CaptureError>;
}
