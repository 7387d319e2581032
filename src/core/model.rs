use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::geometry::Quad;

/// One recognizer hit: a box, its text and the recognizer's confidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    #[serde(rename = "box")]
    pub quad: Quad,
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    0.5
}

impl Detection {
    pub fn new(quad: Quad, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            quad,
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMatch {
    /// Equal after trimming surrounding whitespace.
    Exact(String),
    /// Case-sensitive substring.
    Contains(String),
}

impl AnchorMatch {
    pub fn needle(&self) -> &str {
        match self {
            AnchorMatch::Exact(needle) | AnchorMatch::Contains(needle) => needle,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnchorRole {
    LeftBound,
    RightBound,
}

/// Which top corner of the anchor box is used.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnchorEdge {
    #[default]
    Leading,
    Trailing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnchorSpec {
    pub name: String,
    #[serde(rename = "match")]
    pub matcher: AnchorMatch,
    pub role: AnchorRole,
    #[serde(default)]
    pub edge: AnchorEdge,
}

impl AnchorSpec {
    pub fn left(name: impl Into<String>, matcher: AnchorMatch) -> Self {
        Self {
            name: name.into(),
            matcher,
            role: AnchorRole::LeftBound,
            edge: AnchorEdge::Leading,
        }
    }

    pub fn right(name: impl Into<String>, matcher: AnchorMatch) -> Self {
        Self {
            name: name.into(),
            matcher,
            role: AnchorRole::RightBound,
            edge: AnchorEdge::Leading,
        }
    }

    pub fn with_edge(mut self, edge: AnchorEdge) -> Self {
        self.edge = edge;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleaningPolicy {
    Verbatim,
    DigitsOnly,
    NumericCoerce,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub left_anchor: AnchorSpec,
    pub right_anchor: AnchorSpec,
    #[serde(default)]
    pub margin_px: u32,
    #[serde(default)]
    pub right_margin_px: u32,
    pub cleaning_policy: CleaningPolicy,
}

/// A cleaned cell. `Number(None)` is a value that failed numeric coercion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(Option<f64>),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            CellValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => *value,
            CellValue::Text(_) => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(Some(value)) => write!(f, "{value}"),
            CellValue::Number(None) => Ok(()),
        }
    }
}

/// Cleaned fragments read from one column's crop on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageColumnResult {
    pub column: String,
    pub values: Vec<CellValue>,
}

/// Everything a single page contributes, in layout column order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub page_idx: usize,
    pub columns: Vec<PageColumnResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub values: Vec<CellValue>,
}

/// Rectangular output table; every column holds `row_count` values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentTable {
    pub columns: Vec<TableColumn>,
    pub row_count: usize,
}

impl DocumentTable {
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Row-major view over the table.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&CellValue>> + '_ {
        (0..self.row_count).map(move |row| self.columns.iter().map(|c| &c.values[row]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_bridge_detection() {
        let raw = r#"{"box": [[0,0],[10,0],[10,5],[0,5]], "text": "OG", "confidence": 1.7}"#;
        let parsed: Detection = serde_json::from_str(raw).unwrap();
        let detection = Detection::new(parsed.quad, parsed.text, parsed.confidence);
        assert_eq!(detection.text, "OG");
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn displays_cells_for_export() {
        assert_eq!(CellValue::Number(Some(12.5)).to_string(), "12.5");
        assert_eq!(CellValue::Number(Some(40.0)).to_string(), "40");
        assert_eq!(CellValue::Number(None).to_string(), "");
        assert_eq!(CellValue::Text("A-1".into()).to_string(), "A-1");
    }

    #[test]
    fn iterates_rows() {
        let table = DocumentTable {
            columns: vec![
                TableColumn {
                    name: "id".into(),
                    values: vec![CellValue::Text("1".into()), CellValue::Text("2".into())],
                },
                TableColumn {
                    name: "qty".into(),
                    values: vec![CellValue::Number(Some(3.0)), CellValue::Number(None)],
                },
            ],
            row_count: 2,
        };
        let rows: Vec<Vec<String>> = table
            .rows()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(rows, vec![vec!["1", "3"], vec!["2", ""]]);
        assert_eq!(table.headers(), vec!["id", "qty"]);
    }
}
