pub mod anchor;
pub mod config;
pub mod core;
pub mod export;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod region;
pub mod table;

pub use config::LayoutConfig;
pub use crate::core::model::{CellValue, Detection, DocumentTable};
pub use pipeline::{extract_document, extract_images, DocumentScanner, Extraction, PageStatus};
