use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::error::SinkError;
use crate::export::TextSink;

#[derive(Debug)]
struct ColumnFile {
    column: String,
    path: PathBuf,
    writer: BufWriter<File>,
}

/// One `<column>.txt` per column, one raw fragment per line.
///
/// Files are created (truncated) up front and flushed by [`RawTextSink::finish`].
/// Dropping the sink also flushes, but discards any error.
#[derive(Debug)]
pub struct RawTextSink {
    files: Vec<ColumnFile>,
}

impl RawTextSink {
    pub fn create<I, S>(dir: &Path, columns: I) -> Result<Self, SinkError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        fs::create_dir_all(dir).map_err(|e| SinkError::from_io(dir, e))?;
        let mut files = Vec::new();
        for column in columns {
            let column = column.as_ref().to_string();
            let path = dir.join(format!("{column}.txt"));
            let file = File::create(&path).map_err(|e| SinkError::from_io(&path, e))?;
            files.push(ColumnFile {
                column,
                path,
                writer: BufWriter::new(file),
            });
        }
        Ok(Self { files })
    }

    pub fn finish(mut self) -> Result<(), SinkError> {
        for file in &mut self.files {
            file.writer
                .flush()
                .map_err(|e| SinkError::from_io(&file.path, e))?;
        }
        Ok(())
    }
}

impl TextSink for RawTextSink {
    fn append(&mut self, column: &str, fragment: &str) -> Result<(), SinkError> {
        let Some(file) = self.files.iter_mut().find(|f| f.column == column) else {
            return Err(SinkError::UnknownColumn(column.to_string()));
        };
        // one fragment per line, even if the recognizer returned a newline
        let line = fragment.replace(['\r', '\n'], " ");
        writeln!(file.writer, "{line}").map_err(|e| SinkError::from_io(&file.path, e))
    }
}
