//! Pure field normalization: canonical dedup keys and bounded-length values.
//! Everything here is deterministic and side-effect free; malformed input
//! degrades to empty or sentinel outputs instead of erroring.
pub mod person;
pub mod release;
pub mod title;

/// Longest title the catalog stores (movies.title, alt_titles.title).
pub const MAX_TITLE_CHARS: usize = 250;
/// Longest name part the catalog stores (people.first_name / people.surname).
pub const MAX_NAME_CHARS: usize = 30;

/// Clamp a string to at most `max_chars` characters, never splitting a char.
/// Dedup keys and stored values both go through this, so a title that only
/// differs past the limit compares equal to its stored form.
pub fn clamp_chars(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_passes_through() {
        assert_eq!(clamp_chars("Heat", 250), "Heat");
    }

    #[test]
    fn clamps_on_char_boundary_not_bytes() {
        let input = "éléphant";
        assert_eq!(clamp_chars(input, 3), "élé");
    }
}
