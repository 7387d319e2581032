pub mod csv_export;
pub mod json_export;
pub mod text_export;

use crate::core::error::SinkError;
use crate::core::model::DocumentTable;

pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;
pub use text_export::RawTextSink;

/// Destination for the reconciled table.
pub trait TableSink {
    fn write(&self, table: &DocumentTable) -> Result<(), SinkError>;
}

/// Append-only capture of the raw fragments read for each column.
pub trait TextSink {
    fn append(&mut self, column: &str, fragment: &str) -> Result<(), SinkError>;
}
