use crate::core::model::{CellValue, PageResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnAccumulator {
    pub name: String,
    pub values: Vec<CellValue>,
    /// `(page_idx, values contributed)` for every page that reached this column.
    pub page_counts: Vec<(usize, usize)>,
}

impl ColumnAccumulator {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Per-document accumulator, one entry per column in layout order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentState {
    columns: Vec<ColumnAccumulator>,
    pages_appended: usize,
}

impl DocumentState {
    pub fn new<I, S>(column_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: column_names.into_iter().map(ColumnAccumulator::new).collect(),
            pages_appended: 0,
        }
    }

    /// Appends a page's values after everything appended so far. Columns
    /// not declared up front are added after the declared ones.
    pub fn append(&mut self, page: PageResult) {
        for result in page.columns {
            let idx = match self.columns.iter().position(|c| c.name == result.column) {
                Some(idx) => idx,
                None => {
                    self.columns.push(ColumnAccumulator::new(result.column.as_str()));
                    self.columns.len() - 1
                }
            };
            let column = &mut self.columns[idx];
            column.page_counts.push((page.page_idx, result.values.len()));
            column.values.extend(result.values);
        }
        self.pages_appended += 1;
    }

    pub fn columns(&self) -> &[ColumnAccumulator] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnAccumulator> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn pages_appended(&self) -> usize {
        self.pages_appended
    }
}
