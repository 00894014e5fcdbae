//! Title forms: what gets stored and what gets compared.

use super::{clamp_chars, MAX_TITLE_CHARS};

/// Stored form of a title: trimmed and clamped, original casing preserved.
pub fn display_title(raw: &str) -> String {
    clamp_chars(raw.trim(), MAX_TITLE_CHARS)
}

/// Comparison key of a title: the stored form, lowercased. Case folding is
/// key-only; the catalog keeps the original casing.
pub fn title_key(raw: &str) -> String {
    display_title(raw).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_folds_case_and_trims() {
        assert_eq!(title_key("  The Matrix "), "the matrix");
    }

    #[test]
    fn display_keeps_original_case() {
        assert_eq!(display_title("  The Matrix "), "The Matrix");
    }

    #[test]
    fn key_of_stored_form_matches_key_of_raw() {
        let long: String = "É".repeat(MAX_TITLE_CHARS + 40);
        let stored = display_title(&long);
        assert_eq!(stored.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(title_key(&stored), title_key(&long));
    }
}
