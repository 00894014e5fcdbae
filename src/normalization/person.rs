//! Person name splitting and gender mapping.

use super::{clamp_chars, MAX_NAME_CHARS};

/// A display name split into catalog name parts, both already clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub first_name: String,
    pub surname: String,
}

/// Split a full display name into (first name, surname).
///
/// Single-token names become ("", token); multi-token names keep the last
/// token as surname and join the rest as first name. Both parts are clamped
/// independently. Names that come out empty on both sides are unusable and
/// yield None.
pub fn split_name(full: &str) -> Option<NameParts> {
    let tokens: Vec<&str> = full.split_whitespace().collect();
    let (first, last) = match tokens.as_slice() {
        [] => (String::new(), String::new()),
        [only] => (String::new(), (*only).to_string()),
        [rest @ .., last] => (rest.join(" "), (*last).to_string()),
    };
    let first_name = clamp_chars(&first, MAX_NAME_CHARS);
    let surname = clamp_chars(&last, MAX_NAME_CHARS);
    if first_name.is_empty() && surname.is_empty() {
        return None;
    }
    Some(NameParts {
        first_name,
        surname,
    })
}

/// Source gender enum to catalog code: 1 female, 2 male, anything else unknown.
pub fn gender_code(raw: Option<i64>) -> &'static str {
    match raw {
        Some(1) => "F",
        Some(2) => "M",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_token_name_splits_on_last_token() {
        let parts = split_name("Daniel Day Lewis").unwrap();
        assert_eq!(parts.first_name, "Daniel Day");
        assert_eq!(parts.surname, "Lewis");
    }

    #[test]
    fn single_token_name_is_surname_only() {
        let parts = split_name("Madonna").unwrap();
        assert_eq!(parts.first_name, "");
        assert_eq!(parts.surname, "Madonna");
    }

    #[test]
    fn whitespace_only_name_is_unusable() {
        assert!(split_name("   ").is_none());
        assert!(split_name("").is_none());
    }

    #[test]
    fn long_parts_clamp_independently() {
        let first = "A".repeat(MAX_NAME_CHARS + 5);
        let full = format!("{first} Stone");
        let parts = split_name(&full).unwrap();
        assert_eq!(parts.first_name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(parts.surname, "Stone");
    }

    #[test]
    fn gender_codes() {
        assert_eq!(gender_code(Some(1)), "F");
        assert_eq!(gender_code(Some(2)), "M");
        assert_eq!(gender_code(Some(0)), "?");
        assert_eq!(gender_code(None), "?");
    }
}
