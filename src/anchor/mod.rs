//! Turns page detections into one crop rectangle per column.

pub mod matcher;

use tracing::debug;

use crate::core::geometry::{CropRectangle, Point};
use crate::core::model::{AnchorEdge, AnchorSpec, ColumnSpec, Detection};

pub use matcher::first_match;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnResolution {
    Found(CropRectangle),
    /// No detection satisfied the named anchor on this page.
    AnchorNotFound { anchor: String },
    /// Both anchors were found but `x2 <= x1`.
    InvalidRectangle { x1: i64, x2: i64 },
}

impl ColumnResolution {
    pub fn rectangle(&self) -> Option<CropRectangle> {
        match self {
            ColumnResolution::Found(rect) => Some(*rect),
            _ => None,
        }
    }

    pub fn is_anchor_missing(&self) -> bool {
        matches!(self, ColumnResolution::AnchorNotFound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub name: String,
    pub resolution: ColumnResolution,
}

fn corner(detection: &Detection, edge: AnchorEdge) -> Point {
    match edge {
        AnchorEdge::Leading => detection.quad.top_left(),
        AnchorEdge::Trailing => detection.quad.top_right(),
    }
}

fn locate<'a>(detections: &'a [Detection], anchor: &AnchorSpec) -> Option<&'a Detection> {
    let hit = first_match(detections, &anchor.matcher);
    if let Some(hit) = hit {
        debug!(
            anchor = %anchor.name,
            text = %hit.text,
            confidence = hit.confidence,
            "anchor located"
        );
    }
    hit
}

/// Resolves a single column against one page's detections.
///
/// Coordinates are truncated to whole pixels. `x1` and `y1` clamp at zero.
pub fn resolve_column(detections: &[Detection], column: &ColumnSpec) -> ColumnResolution {
    let Some(left) = locate(detections, &column.left_anchor) else {
        return ColumnResolution::AnchorNotFound {
            anchor: column.left_anchor.name.clone(),
        };
    };
    let Some(right) = locate(detections, &column.right_anchor) else {
        return ColumnResolution::AnchorNotFound {
            anchor: column.right_anchor.name.clone(),
        };
    };

    let origin = corner(left, column.left_anchor.edge);
    let x1 = (origin.x as i64 - i64::from(column.margin_px)).max(0);
    let y1 = (origin.y as i64).max(0);
    let x2 = corner(right, column.right_anchor.edge).x as i64 + i64::from(column.right_margin_px);

    let rect = match (u32::try_from(x1), u32::try_from(y1), u32::try_from(x2)) {
        (Ok(x1), Ok(y1), Ok(x2)) => CropRectangle::new(x1, y1, x2),
        _ => None,
    };
    match rect {
        Some(rect) => ColumnResolution::Found(rect),
        None => ColumnResolution::InvalidRectangle { x1, x2 },
    }
}

/// Resolves every column, preserving `columns` order.
pub fn resolve(detections: &[Detection], columns: &[ColumnSpec]) -> Vec<ResolvedColumn> {
    columns
        .iter()
        .map(|column| ResolvedColumn {
            name: column.name.clone(),
            resolution: resolve_column(detections, column),
        })
        .collect()
}
