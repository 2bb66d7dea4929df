use super::types::{WindowDescriptor, WindowHandle};
use crate::error::CaptureError;

/// Read access to top-level windows plus the few state changes capture needs.
///
/// Implementations must not cache: every call reflects the window manager as
/// it is now.
pub trait WindowSystem {
    /// Enumerates visible, titled top-level windows in z-order.
    fn list_windows(&self) -> Result<Vec<WindowDescriptor>, CaptureError>;

    /// True while the handle still refers to an existing window.
    fn is_window(&self, handle: WindowHandle) -> bool;

    /// Fresh snapshot of one window.
    fn describe(&self, handle: WindowHandle) -> Result<WindowDescriptor, CaptureError>;

    fn restore(&self, handle: WindowHandle) -> Result<(), CaptureError>;

    fn minimize(&self, handle: WindowHandle) -> Result<(), CaptureError>;

    fn foreground_window(&self) -> Option<WindowHandle>;

    /// Brings the window to the foreground.
    fn activate(&self, handle: WindowHandle) -> Result<(), CaptureError>;
}

/// Fails with `InvalidWindowHandle` once the window has gone away.
pub fn ensure_live<S: WindowSystem + ?Sized>(
    system: &S,
    handle: WindowHandle,
) -> Result<(), CaptureError> {
    if system.is_window(handle) {
        Ok(())
    } else {
        Err(CaptureError::InvalidWindowHandle { handle })
    }
}
