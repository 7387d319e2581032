//! Per-column cleaning of raw OCR fragments.

pub mod numeric;

use crate::core::model::{CellValue, CleaningPolicy};

pub use numeric::coerce_number;

/// A fragment that did not survive numeric coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionFailure {
    /// Position in the cleaned output, which holds `Number(None)`.
    pub index: usize,
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedColumn {
    pub values: Vec<CellValue>,
    pub failures: Vec<CoercionFailure>,
}

/// Applies `policy` to every fragment, keeping input order.
///
/// Fragments that are blank after trimming are always dropped. `DigitsOnly`
/// also drops fragments with no digits. `NumericCoerce` never drops a
/// non-blank fragment; parse failures become `Number(None)`.
pub fn clean<S: AsRef<str>>(fragments: &[S], policy: CleaningPolicy) -> CleanedColumn {
    let mut cleaned = CleanedColumn::default();

    for fragment in fragments.iter().map(AsRef::as_ref) {
        if fragment.trim().is_empty() {
            continue;
        }

        match policy {
            CleaningPolicy::Verbatim => cleaned.values.push(CellValue::Text(fragment.to_string())),
            CleaningPolicy::DigitsOnly => {
                let digits: String = fragment.chars().filter(char::is_ascii_digit).collect();
                if !digits.is_empty() {
                    cleaned.values.push(CellValue::Text(digits));
                }
            }
            CleaningPolicy::NumericCoerce => {
                let value = coerce_number(fragment);
                if value.is_none() {
                    cleaned.failures.push(CoercionFailure {
                        index: cleaned.values.len(),
                        raw: fragment.to_string(),
                    });
                }
                cleaned.values.push(CellValue::Number(value));
            }
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::Text(v.to_string())).collect()
    }

    #[test]
    fn verbatim_keeps_text_and_drops_blanks() {
        let cleaned = clean(&["  A-12 ", "", "   ", "B"], CleaningPolicy::Verbatim);
        assert_eq!(cleaned.values, text(&["  A-12 ", "B"]));
        assert!(cleaned.failures.is_empty());
    }

    #[test]
    fn digits_only_strips_everything_else() {
        let cleaned = clean(&["AB12,3cd", "abc", "N° 0045"], CleaningPolicy::DigitsOnly);
        assert_eq!(cleaned.values, text(&["123", "0045"]));
    }

    #[test]
    fn numeric_failures_are_recorded_without_stopping() {
        let cleaned = clean(&["12.500", "n/a", "", "1.234.56"], CleaningPolicy::NumericCoerce);
        assert_eq!(
            cleaned.values,
            vec![
                CellValue::Number(Some(12.5)),
                CellValue::Number(None),
                CellValue::Number(Some(1234.56)),
            ]
        );
        assert_eq!(
            cleaned.failures,
            vec![CoercionFailure {
                index: 1,
                raw: "n/a".to_string()
            }]
        );
    }

    #[test]
    fn repeated_values_are_kept() {
        let cleaned = clean(&["5", "5", "5"], CleaningPolicy::DigitsOnly);
        assert_eq!(cleaned.values.len(), 3);
    }
}
