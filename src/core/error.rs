use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("crop region is empty")]
    Empty,

    #[error("crop rectangle x1={x1} y1={y1} x2={x2} lies outside a {width}x{height} image")]
    InvalidRectangle {
        x1: u32,
        y1: u32,
        x2: u32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Error)]
pub enum RegionReadError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error("text detection failed on crop: {0:#}")]
    Detect(anyhow::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error("column '{column}' has {actual} value(s), expected {expected}")]
    UnderLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("reference column '{0}' is not part of the document")]
    UnknownReference(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("destination {} is locked or in use by another process", path.display())]
    Locked { path: PathBuf },

    #[error("I/O error writing {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no raw text file was opened for column '{0}'")]
    UnknownColumn(String),
}

impl SinkError {
    /// Windows sharing/lock violations, plus the portable "permission denied"
    /// and "resource busy" kinds, are reported as `Locked`.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        let locked = matches!(
            source.kind(),
            io::ErrorKind::PermissionDenied | io::ErrorKind::ResourceBusy
        ) || matches!(source.raw_os_error(), Some(32 | 33));
        if locked {
            SinkError::Locked { path }
        } else {
            SinkError::Io { path, source }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Locked { .. })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("layout declares no columns")]
    NoColumns,

    #[error("column '{0}' is declared more than once")]
    DuplicateColumn(String),

    #[error("primary column '{0}' is not declared")]
    UnknownPrimary(String),

    #[error("reference column '{0}' is not declared")]
    UnknownReference(String),

    #[error("column name '{0}' cannot be used as a file name")]
    ColumnName(String),

    #[error("column '{column}': {anchor} anchor has the wrong role")]
    AnchorRole { column: String, anchor: String },

    #[error("column '{column}': anchor '{anchor}' has an empty match string")]
    EmptyNeedle { column: String, anchor: String },

    #[error("recognition scale must be in (0, 1], got {0}")]
    RecognitionScale(f32),

    #[error("failed to read layout file: {0}")]
    Read(String),

    #[error("failed to parse layout: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid layout: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to rasterize document: {0:#}")]
    Rasterize(anyhow::Error),

    #[error("text detection failed on page {page}: {source:#}")]
    Detect { page: usize, source: anyhow::Error },

    #[error("failed to write raw text: {0}")]
    Sink(#[source] SinkError),

    #[error(transparent)]
    Reconcile(#[from] ReconciliationError),
}
