//! Window capture with a layered fallback chain and optional OCR.
//!
//! A title pattern selects a window (regex or fuzzy). The window is captured by
//! the first backend that works, with foreground activation as a last resort
//! and the full screen behind that. OCR boxes come back in screen coordinates.

pub mod bitmap;
pub mod capture;
pub mod config;
pub mod coords;
pub mod error;
pub mod logging;
#[cfg(windows)]
pub mod native;
pub mod ocr;
pub mod paths;
pub mod window;

#[cfg(test)]
mod testing;

pub use capture::{CaptureEngine, CaptureRequest, CaptureResult};
pub use error::CaptureError;
