use anyhow::{Context, Result};
use image::{ImageReader, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::ocr::Rasterizer;

pub const DEFAULT_DPI: u32 = 300;

/// Rasterizer backed by poppler's `pdfinfo` and `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    out_dir: PathBuf,
    dpi: u32,
    keep_images: bool,
}

impl PageRenderer {
    pub fn new(out_dir: PathBuf, dpi: u32) -> Self {
        Self {
            out_dir,
            dpi,
            keep_images: false,
        }
    }

    /// Leave the rendered PNGs in `out_dir` instead of deleting them once
    /// they are decoded.
    pub fn keep_images(mut self, keep: bool) -> Self {
        self.keep_images = keep;
        self
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    fn render_to_file(&self, pdf_path: &Path, page_idx: usize) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;

        // pdftoppm uses 1-based page indices
        let page_number = page_idx + 1;
        let prefix = self.out_dir.join(format!("page_{:03}", page_number));
        let prefix_str = prefix
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("non-UTF8 output path not supported"))?;

        let status = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(pdf_path)
            .arg(prefix_str)
            .status()
            .with_context(|| "failed to invoke pdftoppm; is poppler-utils installed?")?;

        if !status.success() {
            anyhow::bail!("pdftoppm failed with status: {status}");
        }

        // -singlefile writes `<prefix>.png` without a page suffix
        let image_path = prefix.with_extension("png");
        if !image_path.exists() {
            anyhow::bail!(
                "expected rendered image not found: {}",
                image_path.display()
            );
        }

        Ok(image_path)
    }
}

impl Rasterizer for PageRenderer {
    fn page_count(&self, source: &Path) -> Result<usize> {
        let output = Command::new("pdfinfo")
            .arg(source)
            .output()
            .with_context(|| format!("failed to invoke pdfinfo on {}", source.display()))?;

        if !output.status.success() {
            anyhow::bail!("pdfinfo failed with status: {}", output.status);
        }

        parse_page_count(&String::from_utf8_lossy(&output.stdout)).with_context(|| {
            format!("pdfinfo output did not report pages for {}", source.display())
        })
    }

    fn render_page(&self, source: &Path, page_idx: usize) -> Result<RgbImage> {
        let path = self.render_to_file(source, page_idx)?;
        let image = ImageReader::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .decode()
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgb8();

        if !self.keep_images {
            let _ = fs::remove_file(&path);
        }
        Ok(image)
    }
}

fn parse_page_count(pdfinfo: &str) -> Result<usize> {
    for line in pdfinfo.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            let num_str = rest.trim();
            let pages: usize = num_str.parse().with_context(|| {
                format!("failed to parse page count from 'Pages:' line: {num_str}")
            })?;
            return Ok(pages);
        }
    }
    anyhow::bail!("no 'Pages:' line")
}
