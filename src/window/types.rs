use std::fmt;

use serde::Serialize;

/// Position Windows parks a minimized window at.
pub const MINIMIZED_SENTINEL: i32 = -32000;

/// Opaque identifier of a top-level window.
///
/// The engine never owns the window behind it. Windows can close at any time,
/// so every native call re-validates the handle first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct WindowHandle(pub isize);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Snapshot of a window taken during enumeration. Never mutated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowDescriptor {
    pub handle: WindowHandle,
    pub title: String,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub is_active: bool,
    pub is_visible: bool,
    pub is_minimized: bool,
    pub is_maximized: bool,
}

impl WindowDescriptor {
    /// True if the placement flag says minimized or the window sits at the
    /// off-screen minimized position.
    pub fn is_minimized(&self) -> bool {
        self.is_minimized || self.left == MINIMIZED_SENTINEL
    }

    pub fn has_valid_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.left, self.top)
    }
}
