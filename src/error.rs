//! Error types for the capture engine.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::capture::BackendKind;
use crate::window::WindowHandle;

/// One failed backend, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendAttempt {
    pub backend: BackendKind,
    pub error: String,
}

/// Wrapper so attempt lists render as `compositor: reason; window-dc: reason`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempts(pub Vec<BackendAttempt>);

impl fmt::Display for Attempts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no backends tried");
        }
        for (i, attempt) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", attempt.backend, attempt.error)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("No window found matching pattern '{pattern}'")]
    WindowNotFound { pattern: String },

    #[error("Window {handle} is no longer valid")]
    InvalidWindowHandle { handle: WindowHandle },

    #[error("{backend} capture failed: {reason}")]
    CaptureBackendFailed { backend: BackendKind, reason: String },

    #[error("Could not activate window after {attempts} attempts: {last_error}")]
    ActivationFailed { attempts: u32, last_error: String },

    #[error("Every capture backend failed ({attempts})")]
    ChainExhausted { attempts: Attempts },

    #[error("Window has invalid dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("Failed to save screenshot to {}: {message}", path.display())]
    PersistFailed { path: PathBuf, message: String },

    #[error("OCR failed: {message}")]
    OcrFailed { message: String },

    #[error("Image encoding failed: {message}")]
    Encoding { message: String },

    #[error("{what} is not supported on this platform")]
    Unsupported { what: &'static str },
}

impl CaptureError {
    pub fn backend(backend: BackendKind, reason: impl fmt::Display) -> Self {
        Self::CaptureBackendFailed {
            backend,
            reason: reason.to_string(),
        }
    }

    /// Chain-level failures that the engine answers with a full-screen capture.
    pub fn is_chain_failure(&self) -> bool {
        matches!(
            self,
            Self::ActivationFailed { .. } | Self::ChainExhausted { .. }
        )
    }
}

impl Serialize for CaptureError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
