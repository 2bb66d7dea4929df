//! wincap command line.
//!
//! Captures a window (or the whole screen) and prints a JSON summary. Can also
//! list windows, report the screen size and bring a window to the front.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use wincap::config::init_config;
use wincap::logging::init_logging;
use wincap::paths;

#[derive(Parser, Debug)]
#[cfg_attr(not(windows), allow(dead_code))]
#[command(name = "wincap", version, about = "Capture a window or the screen, with optional OCR")]
struct Cli {
    /// Window title to capture; the full screen is captured when omitted or unmatched
    #[arg(short, long)]
    title: Option<String>,

    /// Treat --title as a case-insensitive regular expression
    #[arg(long)]
    regex: bool,

    /// Minimum fuzzy score (0-100), overriding config.json
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: Option<u8>,

    /// Run OCR and report text boxes in screen coordinates
    #[arg(long)]
    ocr: bool,

    /// Image scale for OCR in percent (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    scale: Option<u8>,

    /// Save a PNG, into DIR or the configured screenshot directory
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    save: Option<Option<PathBuf>>,

    /// List visible windows and exit
    #[arg(long, conflicts_with_all = ["activate", "screen_size"])]
    list: bool,

    /// Bring the window matching --title to the front and exit
    #[arg(long, requires = "title")]
    activate: bool,

    /// Print the primary screen bounds and exit
    #[arg(long)]
    screen_size: bool,
}

#[cfg_attr(not(windows), allow(dead_code))]
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    paths::ensure_directories()?;
    init_logging();
    init_config();

    tracing::info!("wincap {} starting", env!("CARGO_PKG_VERSION"));
    run(cli)
}

#[cfg(windows)]
fn run(cli: Cli) -> Result<()> {
    use wincap::native::native_engine;
    use wincap::ocr::{ensure_tesseract, OcrWorker, TesseractEngine};
    use wincap::CaptureRequest;

    // Graphics Capture needs the WinRT runtime on this thread
    unsafe {
        windows::Win32::System::WinRT::RoInitialize(
            windows::Win32::System::WinRT::RO_INIT_MULTITHREADED,
        )?
    };

    let mut config = wincap::config::get_config().clone();
    if let Some(threshold) = cli.threshold {
        config.fuzzy_threshold = threshold;
    }
    let ocr_scale = cli.scale.unwrap_or(config.ocr_scale_percent);
    let screenshot_dir = config.screenshot_dir();
    let mut engine = native_engine(config);

    if cli.list {
        return print_json(&engine.list_windows()?);
    }
    if cli.screen_size {
        return print_json(&engine.screen_size());
    }

    let query = cli
        .title
        .as_deref()
        .map(|title| engine.match_query(title, cli.regex));

    if cli.activate {
        if let Some(query) = &query {
            return print_json(&engine.activate(query)?);
        }
    }

    let mut request = match query {
        Some(query) => CaptureRequest::window(query),
        None => CaptureRequest::screen(),
    };
    if cli.ocr {
        let tesseract = ensure_tesseract()?;
        let worker = OcrWorker::spawn(Box::new(TesseractEngine::new(
            tesseract.executable,
            tesseract.tessdata,
        )))?;
        engine = engine.with_ocr(Box::new(worker));
        request = request.with_ocr(ocr_scale);
    }
    if let Some(dir) = cli.save {
        request = request.persist_to(dir.unwrap_or(screenshot_dir));
    }

    let result = engine.capture(&request)?;
    print_json(&result.summary())
}

#[cfg(not(windows))]
fn run(_cli: Cli) -> Result<()> {
    tracing::error!("Window capture needs Win32; nothing to do on this platform");
    Err(wincap::CaptureError::Unsupported {
        what: "Window capture",
    }
    .into())
}
