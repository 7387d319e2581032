use std::fs;
use std::path::PathBuf;

use crate::core::error::SinkError;
use crate::core::model::DocumentTable;
use crate::export::TableSink;

#[derive(Debug, Clone)]
pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TableSink for JsonExporter {
    fn write(&self, table: &DocumentTable) -> Result<(), SinkError> {
        let data = serde_json::to_string_pretty(table)?;
        fs::write(&self.path, data).map_err(|e| SinkError::from_io(&self.path, e))?;
        Ok(())
    }
}
