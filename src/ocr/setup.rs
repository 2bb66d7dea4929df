use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::paths::get_tesseract_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const LANGUAGE_FILE: &str = "eng.traineddata";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_EXECUTABLES: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];
#[cfg(not(windows))]
const COMMON_EXECUTABLES: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

#[cfg(windows)]
const SYSTEM_TESSDATA: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];
#[cfg(not(windows))]
const SYSTEM_TESSDATA: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Makes sure Tesseract can run. The executable must already be installed.
/// A tessdata directory that already has English trained data is used where
/// it is; otherwise the data is downloaded into the local Tesseract directory.
pub fn ensure_tesseract() -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;

    let tessdata = match find_tessdata_dir() {
        Ok(dir) => dir,
        Err(_) => {
            let local = get_tesseract_dir().join("tessdata");
            fs::create_dir_all(&local)?;
            download_tessdata(&local)?;
            local
        }
    };

    info!(
        "Tesseract ready: {} (tessdata {})",
        executable.display(),
        tessdata.display()
    );
    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Fetches English trained data into `tessdata_dir`.
fn download_tessdata(tessdata_dir: &Path) -> Result<()> {
    let eng_url = format!("{}/{}", TESSDATA_REPO, LANGUAGE_FILE);
    let eng_path = tessdata_dir.join(LANGUAGE_FILE);

    info!("Downloading {}...", LANGUAGE_FILE);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&eng_url)
        .header("User-Agent", "wincap")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            LANGUAGE_FILE,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&eng_path)?;
    file.write_all(&bytes)?;

    info!("Downloaded {} ({} bytes)", LANGUAGE_FILE, bytes.len());
    Ok(())
}

/// Finds the Tesseract executable, checking our local dir first, then PATH,
/// then the usual install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    if let Some(p) = first_existing(COMMON_EXECUTABLES.iter().map(PathBuf::from)) {
        return Ok(p);
    }

    warn!("Tesseract executable not found");
    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR and add it to PATH, or copy it to {}",
        get_tesseract_dir().display()
    ))
}

/// Finds a directory holding the English trained data.
pub fn find_tessdata_dir() -> Result<PathBuf> {
    let mut candidates = vec![get_tesseract_dir().join("tessdata")];
    candidates.extend(SYSTEM_TESSDATA.iter().map(PathBuf::from));

    // TESSDATA_PREFIX may point at tessdata itself or at its parent
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    tessdata_among(candidates)
        .ok_or_else(|| anyhow!("tessdata directory not found. Please ensure {} is available.", LANGUAGE_FILE))
}

/// First candidate that already holds the English trained data.
fn tessdata_among(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    first_existing(
        candidates
            .into_iter()
            .filter(|p| p.join(LANGUAGE_FILE).exists()),
    )
}

fn first_existing(mut paths: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    paths.find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_existing_tessdata_used_in_place() {
        let empty = tempdir().unwrap();
        let system = tempdir().unwrap();
        fs::write(system.path().join(LANGUAGE_FILE), b"model").unwrap();

        let found = tessdata_among(vec![
            empty.path().to_path_buf(),
            system.path().to_path_buf(),
        ]);

        assert_eq!(found.as_deref(), Some(system.path()));
        // Nothing was copied next to the empty candidate
        assert!(!empty.path().join(LANGUAGE_FILE).exists());
    }

    #[test]
    fn test_no_tessdata_among_candidates() {
        let empty = tempdir().unwrap();
        assert!(tessdata_among(vec![empty.path().to_path_buf()]).is_none());
    }
}
