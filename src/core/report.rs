use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    AnchorNotFound,
    InvalidRectangle,
    EmptyRegion,
    RegionDetectionFailed,
    PageSkipped,
    NumericCoercionFailed,
    ColumnTruncated,
}

/// An absorbed, non-fatal failure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractWarning {
    pub code: WarningCode,
    pub message: String,
    pub page: Option<usize>,
    pub column: Option<String>,
}

impl ExtractWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            page: None,
            column: None,
        }
    }

    /// `page` is the zero-based page index.
    #[must_use]
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ExtractionReport {
    pub pages_total: usize,
    pub pages_scanned: usize,
    pub pages_extracted: usize,
    /// Page whose missing primary anchors ended the scan.
    pub stopped_at_page: Option<usize>,
    pub row_count: usize,
    pub warnings: Vec<ExtractWarning>,
}

impl ExtractionReport {
    pub fn count(&self, code: WarningCode) -> usize {
        self.warnings.iter().filter(|w| w.code == code).count()
    }
}
