//! Column crops and the text read back from them.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::config::RegionReadMode;
use crate::core::error::{RegionError, RegionReadError};
use crate::core::geometry::CropRectangle;
use crate::core::model::Detection;
use crate::ocr::Detector;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionExtractor {
    mode: RegionReadMode,
    recognition_scale: Option<f32>,
}

impl RegionExtractor {
    pub fn new(mode: RegionReadMode) -> Self {
        Self {
            mode,
            recognition_scale: None,
        }
    }

    /// Reads crops scaled by `scale` instead of at full resolution.
    pub fn with_recognition_scale(mut self, scale: Option<f32>) -> Self {
        self.recognition_scale = scale;
        self
    }

    /// Crops `x1..x2` from `y1` to the bottom of the image.
    ///
    /// `x2` is clipped to the image width. A left bound or top at or beyond
    /// the image edge is an invalid rectangle; an image without pixels is empty.
    pub fn extract(&self, image: &RgbImage, rect: CropRectangle) -> Result<RgbImage, RegionError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RegionError::Empty);
        }
        if rect.x1 >= width || rect.y1 >= height {
            return Err(RegionError::InvalidRectangle {
                x1: rect.x1,
                y1: rect.y1,
                x2: rect.x2,
                width,
                height,
            });
        }

        let crop_width = rect.x2.min(width).saturating_sub(rect.x1);
        let crop_height = height - rect.y1;
        if crop_width == 0 {
            return Err(RegionError::Empty);
        }

        Ok(imageops::crop_imm(image, rect.x1, rect.y1, crop_width, crop_height).to_image())
    }

    /// The buffer handed to the detector: the crop itself, or a scaled copy
    /// when a recognition scale is configured.
    pub fn recognition_view(&self, crop: RgbImage) -> RgbImage {
        match self.recognition_scale {
            Some(scale) if scale > 0.0 && scale < 1.0 => {
                let w = ((crop.width() as f32 * scale).round() as u32).max(1);
                let h = ((crop.height() as f32 * scale).round() as u32).max(1);
                imageops::resize(&crop, w, h, FilterType::Triangle)
            }
            _ => crop,
        }
    }

    /// Raw text fragments for one column, in detector order.
    ///
    /// In `Redetect` mode the crop is validated and read again by `detector`.
    /// In `Reuse` mode the page detections starting inside `rect` are taken
    /// as they are, and the image is only used for bounds checking.
    pub fn read<D: Detector + ?Sized>(
        &self,
        image: &RgbImage,
        rect: CropRectangle,
        page_detections: &[Detection],
        detector: &D,
    ) -> Result<Vec<String>, RegionReadError> {
        let crop = self.extract(image, rect)?;
        match self.mode {
            RegionReadMode::Reuse => Ok(detections_within(page_detections, rect)
                .map(|d| d.text.clone())
                .collect()),
            RegionReadMode::Redetect => {
                let view = self.recognition_view(crop);
                let detections = detector.detect(&view).map_err(RegionReadError::Detect)?;
                Ok(detections.into_iter().map(|d| d.text).collect())
            }
        }
    }
}

/// Page detections whose top-left corner falls inside `rect`.
pub fn detections_within(
    detections: &[Detection],
    rect: CropRectangle,
) -> impl Iterator<Item = &Detection> {
    detections.iter().filter(move |d| rect.contains(d.quad.top_left()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Quad;
    use anyhow::Result;
    use image::Rgb;
    use std::cell::RefCell;

    struct RecordingDetector {
        seen: RefCell<Vec<(u32, u32)>>,
    }

    impl Detector for RecordingDetector {
        fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
            self.seen.borrow_mut().push(image.dimensions());
            Ok(vec![Detection::new(Quad::from_rect(0.0, 0.0, 5.0, 5.0), "42", 0.8)])
        }
    }

    fn page() -> RgbImage {
        RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]))
    }

    #[test]
    fn crops_to_the_bottom_of_the_page() {
        let crop = RegionExtractor::default()
            .extract(&page(), CropRectangle::new(40, 30, 90).unwrap())
            .unwrap();
        assert_eq!(crop.dimensions(), (50, 70));
    }

    #[test]
    fn clips_right_bound_to_image_width() {
        let crop = RegionExtractor::default()
            .extract(&page(), CropRectangle::new(150, 0, 400).unwrap())
            .unwrap();
        assert_eq!(crop.dimensions(), (50, 100));
    }

    #[test]
    fn rejects_regions_outside_or_without_pixels() {
        let extractor = RegionExtractor::default();
        assert!(matches!(
            extractor.extract(&page(), CropRectangle::new(250, 0, 300).unwrap()),
            Err(RegionError::InvalidRectangle { .. })
        ));
        assert!(matches!(
            extractor.extract(&page(), CropRectangle::new(10, 100, 20).unwrap()),
            Err(RegionError::InvalidRectangle { y1: 100, .. })
        ));
        assert_eq!(
            extractor.extract(&RgbImage::new(0, 0), CropRectangle::new(0, 0, 20).unwrap()),
            Err(RegionError::Empty)
        );
    }

    #[test]
    fn scales_only_when_configured() {
        let detector = RecordingDetector {
            seen: RefCell::new(Vec::new()),
        };
        let rect = CropRectangle::new(0, 0, 100).unwrap();

        RegionExtractor::new(RegionReadMode::Redetect)
            .read(&page(), rect, &[], &detector)
            .unwrap();
        RegionExtractor::new(RegionReadMode::Redetect)
            .with_recognition_scale(Some(0.5))
            .read(&page(), rect, &[], &detector)
            .unwrap();

        assert_eq!(*detector.seen.borrow(), vec![(100, 100), (50, 50)]);
    }

    #[test]
    fn reuse_mode_keeps_page_detections_inside_the_crop() {
        let detector = RecordingDetector {
            seen: RefCell::new(Vec::new()),
        };
        let detections = vec![
            Detection::new(Quad::from_rect(10.0, 5.0, 30.0, 15.0), "header", 0.9),
            Detection::new(Quad::from_rect(12.0, 40.0, 30.0, 50.0), "7", 0.9),
            Detection::new(Quad::from_rect(120.0, 40.0, 130.0, 50.0), "other", 0.9),
            Detection::new(Quad::from_rect(14.0, 60.0, 30.0, 70.0), "8", 0.9),
        ];
        let texts = RegionExtractor::new(RegionReadMode::Reuse)
            .read(&page(), CropRectangle::new(0, 20, 100).unwrap(), &detections, &detector)
            .unwrap();
        assert_eq!(texts, vec!["7", "8"]);
        assert!(detector.seen.borrow().is_empty());
    }
}
