//! Text recognition on captured bitmaps.
//!
//! OCR is an external collaborator: the capture engine only needs something
//! implementing [`OcrEngine`]. The bundled implementation drives the Tesseract
//! command line tool.

pub mod engine;
pub mod preprocess;
pub mod setup;
pub mod worker;

pub use engine::{OcrBox, OcrEngine, TesseractEngine};
pub use preprocess::downscale_for_ocr;
pub use setup::{ensure_tesseract, TesseractPaths};
pub use worker::OcrWorker;
