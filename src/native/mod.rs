//! Win32 implementations of the window, screen and capture traits.

pub mod gdi;
pub mod graphics_capture;
pub mod window;

pub use gdi::{CompositorBackend, GdiScreen, ScreenRegionBackend, WindowDcBackend};
pub use graphics_capture::GraphicsCaptureBackend;
pub use window::Win32WindowSystem;

use crate::capture::CaptureEngine;
use crate::config::CaptureConfig;

pub type NativeEngine = CaptureEngine<Win32WindowSystem, GdiScreen>;

/// Engine wired to the live desktop.
///
/// Backend order: Graphics Capture (when enabled), PrintWindow, window DC
/// blit, screen blit. Activation is appended by the engine itself.
pub fn native_engine(config: CaptureConfig) -> NativeEngine {
    let use_graphics_capture = config.use_graphics_capture;
    let frame_timeout = config.frame_timeout();

    let mut engine = CaptureEngine::new(Win32WindowSystem, GdiScreen, config);
    if use_graphics_capture {
        engine = engine.with_backend(Box::new(GraphicsCaptureBackend::new(frame_timeout)));
    }
    engine
        .with_backend(Box::new(CompositorBackend))
        .with_backend(Box::new(WindowDcBackend))
        .with_backend(Box::new(ScreenRegionBackend))
}
