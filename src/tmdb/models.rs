//! TMDB payload shapes. Every field the source may omit is optional, so a
//! sparse record degrades to unknowns instead of failing the decode.

use serde::Deserialize;

/// One page of /discover/movie results.
#[derive(Debug, Deserialize)]
pub struct DiscoverPage {
    pub page: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub results: Vec<DiscoverMovie>,
}

/// Discover row. The detail fetch is keyed by id; the other fields just
/// mirror the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverMovie {
    pub id: i64,
    pub title: Option<String>,
    pub release_date: Option<String>,
}

/// /movie/{id} with credits and alternative_titles appended, so one
/// round-trip carries everything a candidate needs.
#[derive(Debug, Deserialize)]
pub struct MovieBundle {
    pub id: i64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub original_language: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub credits: Credits,
    #[serde(default)]
    pub alternative_titles: AlternativeTitles,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductionCountry {
    pub iso_3166_1: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastEntry>,
    #[serde(default)]
    pub crew: Vec<CrewEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastEntry {
    pub id: i64,
    pub name: Option<String>,
    pub known_for_department: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewEntry {
    pub id: i64,
    pub name: Option<String>,
    pub job: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlternativeTitles {
    #[serde(default)]
    pub titles: Vec<AltTitleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AltTitleEntry {
    pub title: Option<String>,
}

/// /person/{id}; birthday/deathday are partial dates or null.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonDetail {
    pub id: i64,
    pub name: Option<String>,
    pub birthday: Option<String>,
    pub deathday: Option<String>,
    pub gender: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_full_bundle() {
        let payload = json!({
            "id": 603,
            "title": "The Matrix",
            "original_title": "The Matrix",
            "original_language": "en",
            "release_date": "1999-03-30",
            "runtime": 136,
            "production_countries": [{"iso_3166_1": "US", "name": "United States"}],
            "credits": {
                "cast": [{"id": 6384, "name": "Keanu Reeves", "known_for_department": "Acting", "order": 0}],
                "crew": [{"id": 9339, "name": "Lilly Wachowski", "job": "Director", "department": "Directing"}]
            },
            "alternative_titles": {"titles": [{"iso_3166_1": "FR", "title": "Matrix"}]}
        });
        let bundle: MovieBundle = serde_json::from_value(payload).unwrap();
        assert_eq!(bundle.runtime, Some(136));
        assert_eq!(bundle.credits.cast.len(), 1);
        assert_eq!(bundle.credits.crew[0].job.as_deref(), Some("Director"));
        assert_eq!(bundle.alternative_titles.titles.len(), 1);
    }

    #[test]
    fn sparse_bundle_decodes_with_defaults() {
        let payload = json!({"id": 42});
        let bundle: MovieBundle = serde_json::from_value(payload).unwrap();
        assert!(bundle.title.is_none());
        assert!(bundle.release_date.is_none());
        assert!(bundle.production_countries.is_empty());
        assert!(bundle.credits.cast.is_empty());
        assert!(bundle.alternative_titles.titles.is_empty());
    }

    #[test]
    fn person_with_null_dates_decodes() {
        let payload = json!({"id": 1, "name": "Madonna", "birthday": null, "deathday": null, "gender": 1});
        let person: PersonDetail = serde_json::from_value(payload).unwrap();
        assert_eq!(person.birthday, None);
        assert_eq!(person.gender, Some(1));
    }
}
