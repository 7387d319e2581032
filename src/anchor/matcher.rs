use unicode_normalization::UnicodeNormalization;

use crate::core::model::{AnchorMatch, ColumnSpec, Detection};

fn nfc(text: &str) -> String {
    text.nfc().collect()
}

impl AnchorMatch {
    /// Compares in NFC so a recognizer that emits `O` + combining acute
    /// still matches a precomposed `Ó`.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            AnchorMatch::Exact(needle) => nfc(text.trim()) == nfc(needle.trim()),
            AnchorMatch::Contains(needle) => nfc(text).contains(&nfc(needle)),
        }
    }
}

impl ColumnSpec {
    /// True when `text` is one of the column's own anchors rather than a value.
    pub fn is_header(&self, text: &str) -> bool {
        self.left_anchor.matcher.is_match(text) || self.right_anchor.matcher.is_match(text)
    }
}

/// First detection, in detector output order, whose text satisfies `matcher`.
///
/// Later hits are ignored even when they carry a higher confidence: the
/// detector reports boxes in reading order and the header row is the first
/// occurrence on the page.
pub fn first_match<'a>(detections: &'a [Detection], matcher: &AnchorMatch) -> Option<&'a Detection> {
    detections.iter().find(|d| matcher.is_match(&d.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::core::geometry::Quad;

    fn det(text: &str, x: f32, confidence: f32) -> Detection {
        Detection::new(Quad::from_rect(x, 0.0, x + 10.0, 10.0), text, confidence)
    }

    #[test]
    fn exact_ignores_surrounding_whitespace_only() {
        let m = AnchorMatch::Exact("OG".to_string());
        assert!(m.is_match("  OG "));
        assert!(!m.is_match("OGS"));
        assert!(!m.is_match("og"));
    }

    #[test]
    fn contains_is_case_sensitive() {
        let m = AnchorMatch::Contains("TFE".to_string());
        assert!(m.is_match("N° TFE:"));
        assert!(!m.is_match("tfe"));
    }

    #[test]
    fn matches_decomposed_accents() {
        let m = AnchorMatch::Contains("AMPLIACIÓN".to_string());
        assert!(m.is_match("AMPLIACIO\u{301}N"));
    }

    #[test]
    fn header_text_is_recognized_per_column() {
        let column = LayoutConfig::default()
            .columns
            .into_iter()
            .find(|c| c.name == "ampliacion")
            .unwrap();
        assert!(column.is_header("AMPLIACIÓN"));
        assert!(column.is_header("AMPLIACIO\u{301}N"));
        assert!(!column.is_header("10.5"));
        assert!(!column.is_header("REDUCCIÓN"));
    }

    #[test]
    fn earliest_detection_wins_over_confidence() {
        let detections = vec![det("TFE", 100.0, 0.3), det("TFE", 500.0, 0.99)];
        let hit = first_match(&detections, &AnchorMatch::Contains("TFE".to_string())).unwrap();
        assert_eq!(hit.quad.top_left().x, 100.0);
    }
}
