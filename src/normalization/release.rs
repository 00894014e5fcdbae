//! Date and country facts pulled out of source records.

/// Leading year component of a partial date ("2021-03-15" -> 2021).
/// Used for release dates as well as birth/death dates, all of which the
/// source may omit or truncate to just a year. Unparsable input yields None;
/// callers treat that as a rejection or sentinel, not an error.
pub fn leading_year(date: Option<&str>) -> Option<i32> {
    let date = date?.trim();
    let lead = date.split('-').next()?;
    lead.parse::<i32>().ok()
}

/// Canonical form of a country code: trimmed, lowercased. Membership in the
/// catalog's reference set is checked by the caller that owns that set.
pub fn country_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_date_yields_year() {
        assert_eq!(leading_year(Some("2021-03-15")), Some(2021));
    }

    #[test]
    fn bare_year_is_accepted() {
        assert_eq!(leading_year(Some("1997")), Some(1997));
    }

    #[test]
    fn missing_or_garbage_dates_yield_none() {
        assert_eq!(leading_year(None), None);
        assert_eq!(leading_year(Some("")), None);
        assert_eq!(leading_year(Some("unknown")), None);
    }

    #[test]
    fn country_key_lowercases() {
        assert_eq!(country_key(" US "), "us");
        assert_eq!(country_key("fr"), "fr");
    }
}
