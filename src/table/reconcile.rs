use crate::config::{LayoutConfig, TruncateFrom};
use crate::core::error::ReconciliationError;
use crate::core::model::{DocumentTable, TableColumn};
use crate::table::aggregate::DocumentState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Column whose length every other column is cut to.
    pub reference: String,
    pub truncate_from: TruncateFrom,
}

impl ReconcilePolicy {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            truncate_from: TruncateFrom::End,
        }
    }

    pub fn with_truncate_from(mut self, truncate_from: TruncateFrom) -> Self {
        self.truncate_from = truncate_from;
        self
    }

    pub fn from_layout(layout: &LayoutConfig) -> Self {
        Self::new(layout.reference_name()).with_truncate_from(layout.truncate_from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub column: String,
    pub dropped: usize,
    pub from: TruncateFrom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub table: DocumentTable,
    pub truncations: Vec<Truncation>,
}

/// Cuts every column to the reference column's length.
///
/// Surplus values are dropped from the end (trailing OCR noise) unless the
/// policy says otherwise. A column shorter than the reference is an error:
/// padding it would shift every later row.
pub fn reconcile(
    state: &DocumentState,
    policy: &ReconcilePolicy,
) -> Result<Reconciled, ReconciliationError> {
    let expected = state
        .column(&policy.reference)
        .map(|c| c.values.len())
        .ok_or_else(|| ReconciliationError::UnknownReference(policy.reference.clone()))?;

    if let Some(short) = state.columns().iter().find(|c| c.values.len() < expected) {
        return Err(ReconciliationError::UnderLength {
            column: short.name.clone(),
            expected,
            actual: short.values.len(),
        });
    }

    let mut truncations = Vec::new();
    let columns = state
        .columns()
        .iter()
        .map(|column| {
            let excess = column.values.len() - expected;
            if excess > 0 {
                truncations.push(Truncation {
                    column: column.name.clone(),
                    dropped: excess,
                    from: policy.truncate_from,
                });
            }
            let kept = match policy.truncate_from {
                TruncateFrom::End => &column.values[..expected],
                TruncateFrom::Start => &column.values[excess..],
            };
            TableColumn {
                name: column.name.clone(),
                values: kept.to_vec(),
            }
        })
        .collect();

    Ok(Reconciled {
        table: DocumentTable {
            columns,
            row_count: expected,
        },
        truncations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{CellValue, PageColumnResult, PageResult};
    use pretty_assertions::assert_eq;

    fn state(lengths: &[(&str, usize)]) -> DocumentState {
        let mut state = DocumentState::new(lengths.iter().map(|(name, _)| *name));
        state.append(PageResult {
            page_idx: 0,
            columns: lengths
                .iter()
                .map(|(name, len)| PageColumnResult {
                    column: name.to_string(),
                    values: (0..*len).map(|i| CellValue::Number(Some(i as f64))).collect(),
                })
                .collect(),
        });
        state
    }

    fn numbers(column: &TableColumn) -> Vec<f64> {
        column.values.iter().filter_map(CellValue::as_number).collect()
    }

    #[test]
    fn truncates_longer_columns_from_the_end() {
        let reconciled = reconcile(&state(&[("og", 10), ("tfe", 12)]), &ReconcilePolicy::new("og")).unwrap();
        assert_eq!(reconciled.table.row_count, 10);
        let tfe = reconciled.table.column("tfe").unwrap();
        assert_eq!(numbers(tfe), (0..10).map(f64::from).collect::<Vec<_>>());
        assert_eq!(
            reconciled.truncations,
            vec![Truncation {
                column: "tfe".into(),
                dropped: 2,
                from: TruncateFrom::End
            }]
        );
    }

    #[test]
    fn truncates_from_the_start_when_configured() {
        let policy = ReconcilePolicy::new("og").with_truncate_from(TruncateFrom::Start);
        let reconciled = reconcile(&state(&[("og", 2), ("tfe", 4)]), &policy).unwrap();
        assert_eq!(numbers(reconciled.table.column("tfe").unwrap()), vec![2.0, 3.0]);
    }

    #[test]
    fn shorter_column_is_an_error() {
        let err = reconcile(&state(&[("og", 10), ("tfe", 8)]), &ReconcilePolicy::new("og")).unwrap_err();
        assert_eq!(
            err,
            ReconciliationError::UnderLength {
                column: "tfe".into(),
                expected: 10,
                actual: 8
            }
        );
    }

    #[test]
    fn reference_need_not_be_first() {
        let reconciled = reconcile(&state(&[("og", 5), ("tfe", 3)]), &ReconcilePolicy::new("tfe")).unwrap();
        assert_eq!(reconciled.table.row_count, 3);
        assert_eq!(reconciled.table.headers(), vec!["og", "tfe"]);
    }

    #[test]
    fn unknown_reference_is_reported() {
        let err = reconcile(&state(&[("og", 1)]), &ReconcilePolicy::new("nope")).unwrap_err();
        assert_eq!(err, ReconciliationError::UnknownReference("nope".into()));
    }

    #[test]
    fn reconciling_twice_gives_the_same_table() {
        let input = state(&[("og", 4), ("tfe", 6), ("amp", 4)]);
        let policy = ReconcilePolicy::new("og");
        assert_eq!(reconcile(&input, &policy).unwrap(), reconcile(&input, &policy).unwrap());
    }
}
