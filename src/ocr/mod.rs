pub mod bridge;
pub mod renderer;

use std::path::Path;

use anyhow::Result;
use image::RgbImage;

use crate::core::model::Detection;

pub use bridge::OcrBridge;
pub use renderer::PageRenderer;

/// Text detection and recognition engine.
///
/// Implementations return detections in the engine's reading order: top to
/// bottom, then left to right. Anchor resolution takes the first match in
/// that order, so an engine that shuffles its output must sort it first.
pub trait Detector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>>;
}

/// Page rasterizer. Rendering the same document twice must give the same
/// images.
pub trait Rasterizer {
    fn page_count(&self, source: &Path) -> Result<usize>;

    fn render_page(&self, source: &Path, page_idx: usize) -> Result<RgbImage>;

    /// Every page, in page order.
    fn render(&self, source: &Path) -> Result<Vec<RgbImage>> {
        (0..self.page_count(source)?)
            .map(|page_idx| self.render_page(source, page_idx))
            .collect()
    }
}
