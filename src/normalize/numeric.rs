/// Characters treated as digit grouping and removed before parsing.
const GROUPING: &[char] = &[',', '\'', '_', '\u{a0}', '\u{202f}'];

/// Strips letters and grouping punctuation, keeping what a number is made of.
pub(crate) fn strip_for_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_alphabetic() && !c.is_whitespace() && !GROUPING.contains(c))
        .collect()
}

/// Keeps only the last `.` as the decimal point; earlier dots are read as
/// thousands separators.
pub(crate) fn collapse_decimal_points(cleaned: &str) -> String {
    match cleaned.rfind('.') {
        Some(last) => {
            let (int_part, frac_part) = cleaned.split_at(last);
            let mut out: String = int_part.chars().filter(|&c| c != '.').collect();
            out.push_str(frac_part);
            out
        }
        None => cleaned.to_string(),
    }
}

/// Parses one OCR fragment as a number, or `None` when nothing numeric is
/// left after cleaning.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let collapsed = collapse_decimal_points(&strip_for_number(raw));
    collapsed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
