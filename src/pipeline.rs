use std::path::Path;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::anchor::{resolve, ColumnResolution};
use crate::config::{LayoutConfig, MissingSecondaryPolicy, TruncateFrom};
use crate::core::error::{PipelineError, RegionError, RegionReadError};
use crate::core::geometry::CropRectangle;
use crate::core::model::{ColumnSpec, DocumentTable, PageColumnResult, PageResult};
use crate::core::report::{ExtractWarning, ExtractionReport, WarningCode};
use crate::export::TextSink;
use crate::normalize::clean;
use crate::ocr::{Detector, Rasterizer};
use crate::region::RegionExtractor;
use crate::table::{reconcile, DocumentState, ReconcilePolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub table: DocumentTable,
    pub report: ExtractionReport,
}

/// What happened to one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Columns were read and appended.
    Extracted,
    /// The page carried the primary anchors but contributed nothing.
    Skipped,
    /// The primary anchors are gone; no later page is scanned.
    EndOfTable,
}

/// Page-by-page driver for one document.
///
/// Pages must be fed in document order. Once a page without the primary
/// anchors is seen the scanner is done and ignores further pages.
pub struct DocumentScanner<'a> {
    layout: &'a LayoutConfig,
    regions: RegionExtractor,
    state: DocumentState,
    report: ExtractionReport,
    done: bool,
}

struct ColumnRead<'c> {
    column: &'c ColumnSpec,
    fragments: Vec<String>,
}

impl<'a> DocumentScanner<'a> {
    pub fn new(layout: &'a LayoutConfig) -> Result<Self, PipelineError> {
        layout.validate()?;
        let regions = RegionExtractor::new(layout.read_mode)
            .with_recognition_scale(layout.recognition_scale);
        Ok(Self {
            layout,
            regions,
            state: DocumentState::new(layout.columns.iter().map(|c| c.name.as_str())),
            report: ExtractionReport::default(),
            done: false,
        })
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    fn warn(&mut self, warning: ExtractWarning) {
        warn!(
            code = ?warning.code,
            page = warning.page.map(|p| p + 1),
            column = warning.column.as_deref(),
            "{}",
            warning.message
        );
        self.report.warnings.push(warning);
    }

    /// Runs detection once on `image`, resolves every column and appends
    /// what could be read.
    pub fn scan_page<D: Detector + ?Sized>(
        &mut self,
        page_idx: usize,
        image: &RgbImage,
        detector: &D,
        raw_text: Option<&mut (dyn TextSink + '_)>,
    ) -> Result<PageStatus, PipelineError> {
        if self.done {
            return Ok(PageStatus::EndOfTable);
        }

        info!(page = page_idx + 1, "scanning page");
        self.report.pages_scanned += 1;
        let detections = detector
            .detect(image)
            .map_err(|source| PipelineError::Detect {
                page: page_idx,
                source,
            })?;
        debug!(page = page_idx + 1, detections = detections.len(), "page detected");

        let layout = self.layout;
        let resolved = resolve(&detections, &layout.columns);

        let primary_missing = resolved
            .iter()
            .find(|r| r.name == layout.primary_column)
            .and_then(|r| match &r.resolution {
                ColumnResolution::AnchorNotFound { anchor } => Some(anchor.clone()),
                _ => None,
            });
        if let Some(anchor) = primary_missing {
            info!(
                page = page_idx + 1,
                anchor = %anchor,
                "primary anchor absent, end of table"
            );
            self.report.stopped_at_page = Some(page_idx);
            self.done = true;
            return Ok(PageStatus::EndOfTable);
        }

        let mut targets: Vec<(&ColumnSpec, CropRectangle)> = Vec::new();
        for (column, resolved) in layout.columns.iter().zip(&resolved) {
            let is_primary = column.name == layout.primary_column;
            match &resolved.resolution {
                ColumnResolution::Found(rect) => targets.push((column, *rect)),
                ColumnResolution::AnchorNotFound { anchor } => {
                    self.warn(
                        ExtractWarning::new(
                            WarningCode::AnchorNotFound,
                            format!("anchor '{anchor}' not found"),
                        )
                        .with_page(page_idx)
                        .with_column(&column.name),
                    );
                    if layout.missing_secondary == MissingSecondaryPolicy::SkipPage {
                        return Ok(self.skip_page(page_idx, "a secondary anchor is missing"));
                    }
                }
                ColumnResolution::InvalidRectangle { x1, x2 } => {
                    self.warn(
                        ExtractWarning::new(
                            WarningCode::InvalidRectangle,
                            format!("anchors give x1={x1} x2={x2}"),
                        )
                        .with_page(page_idx)
                        .with_column(&column.name),
                    );
                    if is_primary {
                        return Ok(self.skip_page(page_idx, "primary column has no region"));
                    }
                }
            }
        }

        let mut reads = Vec::with_capacity(targets.len());
        for (column, rect) in targets {
            match self.regions.read(image, rect, &detections, detector) {
                Ok(fragments) => reads.push(ColumnRead { column, fragments }),
                Err(error) => {
                    let code = match &error {
                        RegionReadError::Region(RegionError::Empty) => WarningCode::EmptyRegion,
                        RegionReadError::Region(RegionError::InvalidRectangle { .. }) => {
                            WarningCode::InvalidRectangle
                        }
                        RegionReadError::Detect(_) => WarningCode::RegionDetectionFailed,
                    };
                    self.warn(
                        ExtractWarning::new(code, error.to_string())
                            .with_page(page_idx)
                            .with_column(&column.name),
                    );
                    if column.name == layout.primary_column {
                        return Ok(self.skip_page(page_idx, "primary column could not be read"));
                    }
                }
            }
        }

        if let Some(sink) = raw_text {
            for read in &reads {
                for fragment in &read.fragments {
                    sink.append(&read.column.name, fragment)
                        .map_err(PipelineError::Sink)?;
                }
            }
        }

        let mut columns = Vec::with_capacity(reads.len());
        for read in reads {
            // the crop starts at the header's top edge, so the header is read back too
            let body: Vec<&str> = read
                .fragments
                .iter()
                .map(String::as_str)
                .filter(|fragment| !read.column.is_header(fragment))
                .collect();
            let cleaned = clean(&body, read.column.cleaning_policy);
            for failure in &cleaned.failures {
                self.warn(
                    ExtractWarning::new(
                        WarningCode::NumericCoercionFailed,
                        format!("'{}' is not a number", failure.raw),
                    )
                    .with_page(page_idx)
                    .with_column(&read.column.name),
                );
            }
            debug!(
                page = page_idx + 1,
                column = %read.column.name,
                raw = read.fragments.len(),
                kept = cleaned.values.len(),
                "column cleaned"
            );
            columns.push(PageColumnResult {
                column: read.column.name.clone(),
                values: cleaned.values,
            });
        }

        self.state.append(PageResult { page_idx, columns });
        self.report.pages_extracted += 1;
        Ok(PageStatus::Extracted)
    }

    fn skip_page(&mut self, page_idx: usize, reason: &str) -> PageStatus {
        self.warn(ExtractWarning::new(WarningCode::PageSkipped, reason).with_page(page_idx));
        PageStatus::Skipped
    }

    /// Reconciles everything appended so far into the final table.
    pub fn finish(mut self) -> Result<Extraction, PipelineError> {
        let policy = ReconcilePolicy::from_layout(self.layout);
        let reconciled = reconcile(&self.state, &policy)?;

        for truncation in &reconciled.truncations {
            self.warn(
                ExtractWarning::new(
                    WarningCode::ColumnTruncated,
                    format!(
                        "dropped {} value(s) from the {} to match '{}'",
                        truncation.dropped,
                        match truncation.from {
                            TruncateFrom::End => "end",
                            TruncateFrom::Start => "start",
                        },
                        policy.reference
                    ),
                )
                .with_column(&truncation.column),
            );
        }

        self.report.row_count = reconciled.table.row_count;
        info!(
            rows = self.report.row_count,
            pages = self.report.pages_extracted,
            warnings = self.report.warnings.len(),
            "document reconciled"
        );
        Ok(Extraction {
            table: reconciled.table,
            report: self.report,
        })
    }
}

/// Extracts the table from already rasterized pages, in page order.
pub fn extract_images<I, D>(
    pages: I,
    layout: &LayoutConfig,
    detector: &D,
    mut raw_text: Option<&mut dyn TextSink>,
) -> Result<Extraction, PipelineError>
where
    I: IntoIterator<Item = RgbImage>,
    D: Detector + ?Sized,
{
    let mut scanner = DocumentScanner::new(layout)?;
    let mut total = 0;
    for (page_idx, image) in pages.into_iter().enumerate() {
        total += 1;
        if scanner.is_done() {
            continue;
        }
        scanner.scan_page(page_idx, &image, detector, raw_text.as_deref_mut())?;
    }
    scanner.report.pages_total = total;
    scanner.finish()
}

/// Rasterizes `source` page by page and extracts its table.
///
/// Pages after the end of the table are never rendered.
pub fn extract_document<R, D>(
    source: &Path,
    layout: &LayoutConfig,
    rasterizer: &R,
    detector: &D,
    mut raw_text: Option<&mut dyn TextSink>,
) -> Result<Extraction, PipelineError>
where
    R: Rasterizer + ?Sized,
    D: Detector + ?Sized,
{
    let mut scanner = DocumentScanner::new(layout)?;
    let page_count = rasterizer
        .page_count(source)
        .map_err(PipelineError::Rasterize)?;
    scanner.report.pages_total = page_count;
    info!(source = %source.display(), pages = page_count, "extracting document");

    for page_idx in 0..page_count {
        let image = rasterizer
            .render_page(source, page_idx)
            .map_err(PipelineError::Rasterize)?;
        let status = scanner.scan_page(page_idx, &image, detector, raw_text.as_deref_mut())?;
        if status == PageStatus::EndOfTable {
            break;
        }
    }

    scanner.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Quad;
    use crate::core::model::{AnchorMatch, CellValue, Detection};
    use anyhow::Result;
    use image::Rgb;
    use std::cell::RefCell;

    /// Page detections keyed by image height; crops are answered by the
    /// crop's left edge.
    struct ScriptedDetector {
        pages: Vec<(u32, Vec<Detection>)>,
        crops: Vec<(u32, Vec<&'static str>)>,
        calls: RefCell<usize>,
    }

    impl Detector for ScriptedDetector {
        fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
            *self.calls.borrow_mut() += 1;
            let (w, h) = image.dimensions();
            if let Some((_, dets)) = self.pages.iter().find(|(height, _)| *height == h && w == 1000) {
                return Ok(dets.clone());
            }
            let texts = self
                .crops
                .iter()
                .find(|(width, _)| *width == w)
                .map(|(_, texts)| texts.clone())
                .unwrap_or_default();
            Ok(texts
                .into_iter()
                .map(|t| Detection::new(Quad::from_rect(0.0, 0.0, 5.0, 5.0), t, 0.9))
                .collect())
        }
    }

    fn det(text: &str, x0: f32, y0: f32, x1: f32) -> Detection {
        Detection::new(Quad::from_rect(x0, y0, x1, y0 + 20.0), text, 0.9)
    }

    fn blank(height: u32) -> RgbImage {
        RgbImage::from_pixel(1000, height, Rgb([255, 255, 255]))
    }

    fn two_column_layout() -> LayoutConfig {
        let mut layout = LayoutConfig::default();
        layout.columns.truncate(2);
        layout
    }

    fn headers() -> Vec<Detection> {
        vec![det("OG", 110.0, 100.0, 150.0), det("N° TFE", 300.0, 98.0, 360.0)]
    }

    #[test]
    fn stops_at_first_page_without_primary_anchor() {
        // og crop: x 100..300 (width 200); tfe crop: x 300..410 (width 110)
        let detector = ScriptedDetector {
            pages: vec![(800, headers()), (801, vec![det("FIRMA", 10.0, 10.0, 90.0)])],
            crops: vec![(200, vec!["OG", "1041", "1042"]), (110, vec!["TFE", "55", "56"])],
            calls: RefCell::new(0),
        };
        let layout = two_column_layout();

        let extraction =
            extract_images([blank(800), blank(801), blank(800)], &layout, &detector, None).unwrap();

        assert_eq!(extraction.report.stopped_at_page, Some(1));
        assert_eq!(extraction.report.pages_total, 3);
        assert_eq!(extraction.report.pages_scanned, 2);
        assert_eq!(extraction.table.row_count, 2);
        assert_eq!(
            extraction.table.column("og").unwrap().values,
            vec![CellValue::Text("1041".into()), CellValue::Text("1042".into())]
        );
        // 2 page detections + 2 crops on page 1
        assert_eq!(*detector.calls.borrow(), 4);
    }

    #[test]
    fn missing_secondary_skips_only_that_column_by_default() {
        let mut layout = two_column_layout();
        layout.columns[1].left_anchor.matcher = AnchorMatch::Contains("ZZZ".into());
        layout.columns[1].right_anchor.matcher = AnchorMatch::Contains("ZZZ".into());
        let detector = ScriptedDetector {
            pages: vec![(800, headers())],
            crops: vec![(200, vec!["1041"])],
            calls: RefCell::new(0),
        };
        let mut scanner = DocumentScanner::new(&layout).unwrap();
        let status = scanner.scan_page(0, &blank(800), &detector, None).unwrap();

        assert_eq!(status, PageStatus::Extracted);
        assert_eq!(scanner.state().column("og").unwrap().values.len(), 1);
        assert!(scanner.state().column("tfe").unwrap().values.is_empty());
        assert_eq!(scanner.report.count(WarningCode::AnchorNotFound), 1);
    }

    #[test]
    fn missing_secondary_can_skip_the_page() {
        let mut layout = two_column_layout();
        layout.missing_secondary = MissingSecondaryPolicy::SkipPage;
        layout.columns[1].left_anchor.matcher = AnchorMatch::Contains("ZZZ".into());
        let detector = ScriptedDetector {
            pages: vec![(800, headers())],
            crops: vec![(200, vec!["1041"])],
            calls: RefCell::new(0),
        };
        let mut scanner = DocumentScanner::new(&layout).unwrap();
        let status = scanner.scan_page(0, &blank(800), &detector, None).unwrap();

        assert_eq!(status, PageStatus::Skipped);
        assert!(scanner.state().column("og").unwrap().values.is_empty());
        assert!(!scanner.is_done());
    }

    #[test]
    fn inverted_primary_anchors_skip_the_page_and_keep_scanning() {
        // OG to the right of TFE gives x1=390, x2=300
        let detector = ScriptedDetector {
            pages: vec![
                (800, vec![det("OG", 400.0, 100.0, 440.0), det("N° TFE", 300.0, 98.0, 360.0)]),
                (801, headers()),
            ],
            crops: vec![(200, vec!["1041"]), (110, vec!["55"])],
            calls: RefCell::new(0),
        };
        let layout = two_column_layout();
        let mut scanner = DocumentScanner::new(&layout).unwrap();

        let status = scanner.scan_page(0, &blank(800), &detector, None).unwrap();
        assert_eq!(status, PageStatus::Skipped);
        assert!(!scanner.is_done());
        assert_eq!(scanner.report.count(WarningCode::InvalidRectangle), 1);
        assert_eq!(scanner.report.count(WarningCode::PageSkipped), 1);
        assert!(scanner.state().column("og").unwrap().values.is_empty());

        let status = scanner.scan_page(1, &blank(801), &detector, None).unwrap();
        assert_eq!(status, PageStatus::Extracted);
        assert_eq!(scanner.state().column("og").unwrap().values.len(), 1);
    }

    #[test]
    fn unreadable_primary_crop_skips_the_page() {
        // headers sit below the bottom of an 800px page
        let detector = ScriptedDetector {
            pages: vec![(
                800,
                vec![det("OG", 110.0, 850.0, 150.0), det("N° TFE", 300.0, 848.0, 360.0)],
            )],
            crops: vec![],
            calls: RefCell::new(0),
        };
        let layout = two_column_layout();
        let mut scanner = DocumentScanner::new(&layout).unwrap();

        let status = scanner.scan_page(0, &blank(800), &detector, None).unwrap();

        assert_eq!(status, PageStatus::Skipped);
        assert!(!scanner.is_done());
        assert_eq!(scanner.report.count(WarningCode::InvalidRectangle), 1);
        assert_eq!(scanner.report.count(WarningCode::PageSkipped), 1);
        assert_eq!(scanner.report.pages_extracted, 0);
        // only the page itself was sent to the detector
        assert_eq!(*detector.calls.borrow(), 1);
    }

    #[test]
    fn detection_failure_on_page_is_fatal() {
        struct Failing;
        impl Detector for Failing {
            fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>> {
                anyhow::bail!("engine crashed")
            }
        }
        let layout = two_column_layout();
        let err = extract_images([blank(800)], &layout, &Failing, None).unwrap_err();
        assert!(matches!(err, PipelineError::Detect { page: 0, .. }));
    }
}
