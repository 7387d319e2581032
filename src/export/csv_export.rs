use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use csv::WriterBuilder;

use crate::core::error::SinkError;
use crate::core::model::DocumentTable;
use crate::export::TableSink;

#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
    delimiter: u8,
}

impl CsvExporter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

fn write_records<W: Write>(
    writer: W,
    table: &DocumentTable,
    delimiter: u8,
) -> Result<W, SinkError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|error| SinkError::Csv(error.into_error().into()))
}

/// Renders `table` as CSV text, header row first.
pub fn to_csv_string(table: &DocumentTable, delimiter: u8) -> Result<String, SinkError> {
    let bytes = write_records(Vec::new(), table, delimiter)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl TableSink for CsvExporter {
    fn write(&self, table: &DocumentTable) -> Result<(), SinkError> {
        let file = File::create(&self.path).map_err(|e| SinkError::from_io(&self.path, e))?;
        let mut file = write_records(file, table, self.delimiter)?;
        file.flush().map_err(|e| SinkError::from_io(&self.path, e))?;
        Ok(())
    }
}
