//! Screen capture for a target window.
//!
//! This module provides:
//! - The backend and screen traits native code implements (`CaptureBackend`, `ScreenGrabber`)
//! - Ordered fallback over backends (`CaptureChain`)
//! - The foreground-activation last resort (`ActivationFallback`)
//! - The end-to-end pipeline (`CaptureEngine`) and its output (`CaptureResult`)

pub mod activation;
pub mod backend;
pub mod chain;
pub mod engine;
pub mod result;

pub use activation::{ActivationFallback, ActivationTiming, ForegroundGuard};
pub use backend::{BackendKind, CaptureBackend, ScreenBounds, ScreenGrabber};
pub use chain::{CaptureChain, CaptureSource, ChainCapture};
pub use engine::{CaptureEngine, CaptureRequest};
pub use result::{assemble, persist_png, CaptureResult, CaptureSummary, Provenance};
