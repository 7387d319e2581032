use anyhow::{Context, Result};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::model::Detection;
use crate::ocr::Detector;

/// Detector that shells out to a Python OCR script.
///
/// The script receives `--image <png> --lang <codes>` and prints a JSON
/// array of `{"box": [[x, y] x4], "text": ..., "confidence": ...}` in the
/// recognizer's reading order.
#[derive(Debug)]
pub struct OcrBridge {
    work_dir: PathBuf,
    script_path: PathBuf,
    python: String,
    lang: String,
    counter: AtomicUsize,
}

impl OcrBridge {
    pub fn new(work_dir: PathBuf) -> Self {
        let script_path = PathBuf::from("ocr/bridge/easyocr_bridge.py");
        Self {
            work_dir,
            script_path,
            python: "python3".to_string(),
            lang: "es,en".to_string(),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn with_script(mut self, script_path: PathBuf) -> Self {
        self.script_path = script_path;
        self
    }

    pub fn with_python(mut self, python: String) -> Self {
        self.python = python;
        self
    }

    pub fn with_lang(mut self, lang: String) -> Self {
        self.lang = lang;
        self
    }

    /// Runs the bridge on an image already on disk.
    pub fn run(&self, image_path: &Path) -> Result<Vec<Detection>> {
        let output = Command::new(&self.python)
            .arg(&self.script_path)
            .arg("--image")
            .arg(image_path)
            .arg("--lang")
            .arg(&self.lang)
            .output()
            .with_context(|| "failed to invoke python OCR bridge")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("OCR bridge failed: {stderr}");
        }

        parse_detections(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Detector for OcrBridge {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        fs::create_dir_all(&self.work_dir)?;
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let image_path = self.work_dir.join(format!("ocr_input_{n:05}.png"));
        image
            .save(&image_path)
            .with_context(|| format!("failed to write {}", image_path.display()))?;

        let result = self.run(&image_path);
        let _ = fs::remove_file(&image_path);
        result
    }
}

fn parse_detections(stdout: &str) -> Result<Vec<Detection>> {
    let raw: Vec<Detection> =
        serde_json::from_str(stdout).with_context(|| "failed to parse OCR JSON response")?;
    Ok(raw
        .into_iter()
        .map(|d| Detection::new(d.quad, d.text, d.confidence))
        .collect())
}
