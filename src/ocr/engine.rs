use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use super::setup::{find_tessdata_dir, find_tesseract_executable};

/// A region of recognized text.
///
/// Corners run clockwise from top-left as `[x, y]` pairs, in the coordinate
/// space of whatever image the box was found on until it is mapped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OcrBox {
    pub corners: [[f64; 2]; 4],
    pub text: String,
    /// 0.0 to 1.0
    pub confidence: f32,
}

impl OcrBox {
    /// Axis-aligned box from a left/top/width/height rectangle.
    pub fn from_rect(left: f64, top: f64, width: f64, height: f64, text: String, confidence: f32) -> Self {
        Self {
            corners: [
                [left, top],
                [left + width, top],
                [left + width, top + height],
                [left, top + height],
            ],
            text,
            confidence,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        let x = self.corners.iter().map(|c| c[0]).sum::<f64>() / 4.0;
        let y = self.corners.iter().map(|c| c[1]).sum::<f64>() / 4.0;
        (x, y)
    }
}

/// Anything that turns an image into text boxes.
///
/// Returning no boxes is a normal result, not an error.
pub trait OcrEngine {
    fn recognize(&self, img: &RgbaImage) -> Result<Vec<OcrBox>>;
}

/// Runs the Tesseract CLI in TSV mode and groups words into line boxes.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
    language: String,
    /// Page segmentation mode. 11 (sparse text) suits UI screenshots.
    psm: u8,
}

impl TesseractEngine {
    pub fn new(executable: PathBuf, tessdata: PathBuf) -> Self {
        Self {
            executable,
            tessdata,
            language: "eng".to_string(),
            psm: 11,
        }
    }

    /// Locates an installed Tesseract.
    pub fn locate() -> Result<Self> {
        Ok(Self::new(find_tesseract_executable()?, find_tessdata_dir()?))
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, img: &RgbaImage) -> Result<Vec<OcrBox>> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let boxes = parse_tsv_output(&tsv);
        debug!("Tesseract found {} text lines", boxes.len());
        Ok(boxes)
    }
}

#[derive(Default)]
struct LineAccumulator {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
    words: Vec<String>,
    conf_sum: f32,
}

impl LineAccumulator {
    fn add(&mut self, left: i64, top: i64, width: i64, height: i64, text: &str, conf: f32) {
        if self.words.is_empty() {
            self.left = left;
            self.top = top;
            self.right = left + width;
            self.bottom = top + height;
        } else {
            self.left = self.left.min(left);
            self.top = self.top.min(top);
            self.right = self.right.max(left + width);
            self.bottom = self.bottom.max(top + height);
        }
        self.words.push(text.to_string());
        self.conf_sum += conf;
    }

    fn into_box(self) -> OcrBox {
        let confidence = self.conf_sum / self.words.len() as f32 / 100.0;
        OcrBox::from_rect(
            self.left as f64,
            self.top as f64,
            (self.right - self.left) as f64,
            (self.bottom - self.top) as f64,
            self.words.join(" "),
            confidence.clamp(0.0, 1.0),
        )
    }
}

/// Parses Tesseract TSV output into one box per text line.
///
/// Lines come out in reading order (block, paragraph, line).
fn parse_tsv_output(tsv: &str) -> Vec<OcrBox> {
    let mut lines: BTreeMap<(i64, i64, i64), LineAccumulator> = BTreeMap::new();

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let num = |i: usize| fields[i].trim().parse::<i64>().unwrap_or(-1);
        let level = num(0);
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (num(2), num(3), num(4));
        lines
            .entry(key)
            .or_default()
            .add(num(6), num(7), num(8), num(9), text, conf);
    }

    lines.into_values().map(LineAccumulator::into_box).collect()
}
