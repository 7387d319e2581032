//! Layout configuration: which columns to extract and how to find them.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::model::{AnchorEdge, AnchorMatch, AnchorRole, AnchorSpec, CleaningPolicy, ColumnSpec};

/// What to do with a page whose secondary column anchors are missing.
///
/// Forms differ on whether a page with a half-visible header is still
/// usable, so each layout states its choice.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingSecondaryPolicy {
    #[default]
    SkipColumn,
    SkipPage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceColumn {
    #[default]
    Primary,
    Named(String),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TruncateFrom {
    #[default]
    End,
    Start,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegionReadMode {
    /// Run the detector again on each column crop.
    #[default]
    Redetect,
    /// Keep the page-level detections that start inside the crop.
    Reuse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    pub primary_column: String,
    #[serde(default)]
    pub missing_secondary: MissingSecondaryPolicy,
    #[serde(default)]
    pub reference: ReferenceColumn,
    #[serde(default)]
    pub truncate_from: TruncateFrom,
    #[serde(default)]
    pub read_mode: RegionReadMode,
    /// Scale applied to a crop before it is read. `None` reads it as is.
    #[serde(default)]
    pub recognition_scale: Option<f32>,
    pub columns: Vec<ColumnSpec>,
}

impl LayoutConfig {
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(data).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns.is_empty() {
            return Err(ConfigError::NoColumns);
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !is_file_safe(&column.name) {
                return Err(ConfigError::ColumnName(column.name.clone()));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(ConfigError::DuplicateColumn(column.name.clone()));
            }
            check_anchor(column, &column.left_anchor, AnchorRole::LeftBound)?;
            check_anchor(column, &column.right_anchor, AnchorRole::RightBound)?;
        }

        if !seen.contains(self.primary_column.as_str()) {
            return Err(ConfigError::UnknownPrimary(self.primary_column.clone()));
        }
        if let ReferenceColumn::Named(name) = &self.reference {
            if !seen.contains(name.as_str()) {
                return Err(ConfigError::UnknownReference(name.clone()));
            }
        }

        if let Some(scale) = self.recognition_scale {
            if !(scale > 0.0 && scale <= 1.0) {
                return Err(ConfigError::RecognitionScale(scale));
            }
        }

        Ok(())
    }

    pub fn primary(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == self.primary_column)
    }

    pub fn secondaries(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(move |c| c.name != self.primary_column)
    }

    /// Name of the column every other column is reconciled against.
    pub fn reference_name(&self) -> &str {
        match &self.reference {
            ReferenceColumn::Primary => &self.primary_column,
            ReferenceColumn::Named(name) => name,
        }
    }
}

/// Column names double as raw-text file names.
fn is_file_safe(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

fn check_anchor(column: &ColumnSpec, anchor: &AnchorSpec, role: AnchorRole) -> Result<(), ConfigError> {
    if anchor.role != role {
        return Err(ConfigError::AnchorRole {
            column: column.name.clone(),
            anchor: anchor.name.clone(),
        });
    }
    if anchor.matcher.needle().trim().is_empty() {
        return Err(ConfigError::EmptyNeedle {
            column: column.name.clone(),
            anchor: anchor.name.clone(),
        });
    }
    Ok(())
}

/// Single-header column: left edge of the header box to its right edge
/// plus `right_margin_px`.
fn header_column(name: &str, header: &str, right_margin_px: u32, policy: CleaningPolicy) -> ColumnSpec {
    let matcher = AnchorMatch::Contains(header.to_string());
    ColumnSpec {
        name: name.to_string(),
        left_anchor: AnchorSpec::left(name, matcher.clone()),
        right_anchor: AnchorSpec::right(name, matcher).with_edge(AnchorEdge::Trailing),
        margin_px: 0,
        right_margin_px,
        cleaning_policy: policy,
    }
}

impl Default for LayoutConfig {
    /// The four-column work-order layout: `OG` up to the `TFE` header, then
    /// the `TFE`, `AMPLIACIÓN` and `REDUCCIÓN` header columns.
    fn default() -> Self {
        const DX: u32 = 10;
        let og = ColumnSpec {
            name: "og".to_string(),
            left_anchor: AnchorSpec::left("og", AnchorMatch::Exact("OG".to_string())),
            right_anchor: AnchorSpec::right("tfe", AnchorMatch::Contains("TFE".to_string())),
            margin_px: DX,
            right_margin_px: 0,
            cleaning_policy: CleaningPolicy::DigitsOnly,
        };

        Self {
            primary_column: "og".to_string(),
            missing_secondary: MissingSecondaryPolicy::SkipColumn,
            reference: ReferenceColumn::Primary,
            truncate_from: TruncateFrom::End,
            read_mode: RegionReadMode::Redetect,
            recognition_scale: None,
            columns: vec![
                og,
                header_column("tfe", "TFE", 5 * DX, CleaningPolicy::DigitsOnly),
                header_column("ampliacion", "AMPLIACIÓN", 2 * DX, CleaningPolicy::NumericCoerce),
                header_column("reduccion", "REDUCCIÓN", 2 * DX, CleaningPolicy::NumericCoerce),
            ],
        }
    }
}
