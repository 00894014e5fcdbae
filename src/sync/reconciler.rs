//! Per-candidate reconciliation: screen, dedup, insert.
//!
//! Candidates flow through fixed checks in order: release year against the
//! window, production country against the reference set, then the movie
//! triple against the key index. Only a candidate that clears all three
//! touches the store. Screening rejections are expected and counted;
//! anything that errors out of here is a fault and aborts the run.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::Serialize;
use sqlx::PgConnection;
use tracing::{debug, warn};

use crate::normalization::person::{gender_code, split_name};
use crate::normalization::release::{country_key, leading_year};
use crate::normalization::title::display_title;
use crate::sync::gateway::{self, CreditRow, CreditedAs, NewMovie, NewPerson};
use crate::sync::key_index::KeyIndex;
use crate::tmdb::models::{Credits, MovieBundle};
use crate::tmdb::{PersonCache, TmdbClient};

/// Crew job that marks a director.
const DIRECTOR_JOB: &str = "Director";
/// Cast department that marks a director working in front of the camera.
const DIRECTING_DEPARTMENT: &str = "Directing";
/// Birth year stored when the source has none.
const UNKNOWN_BORN: i32 = -1;

/// Where a candidate ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    AlreadyPresent,
    SkippedYear,
    SkippedCountry,
}

/// Counters for one run. Observability only; nothing here feeds back into
/// control flow.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunCounters {
    pub seen: u64,
    pub inserted: u64,
    pub already_present: u64,
    pub skipped_year: u64,
    pub skipped_country: u64,
    pub people_written: u64,
    pub people_skipped_name: u64,
    pub credits_written: u64,
    pub alt_titles_written: u64,
    /// Original language of country-rejected candidates, for eyeballing
    /// which catalogs the reference set is missing.
    pub rejected_languages: HashMap<String, u64>,
}

impl RunCounters {
    fn tally_language(&mut self, lang: Option<&str>) {
        let key = lang.unwrap_or("??").to_string();
        *self.rejected_languages.entry(key).or_insert(0) += 1;
    }

    /// Most common rejected languages first; ties break alphabetically so
    /// the report is stable across runs.
    pub fn top_rejected_languages(&self, n: usize) -> Vec<(String, u64)> {
        let mut all: Vec<(String, u64)> = self
            .rejected_languages
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        all.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(n);
        all
    }
}

/// Screening verdict, decided before any store access.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Screened {
    OutsideWindow,
    UnknownCountry,
    Eligible {
        title: String,
        year: i32,
        country: String,
    },
}

/// Year and country checks. A missing release date lands in the same bucket
/// as an out-of-window year; only the primary production country counts.
fn screen(bundle: &MovieBundle, year_min: i32, year_max: i32, index: &KeyIndex) -> Screened {
    let Some(year) = leading_year(bundle.release_date.as_deref()) else {
        return Screened::OutsideWindow;
    };
    if year < year_min || year > year_max {
        return Screened::OutsideWindow;
    }
    let country = bundle
        .production_countries
        .first()
        .and_then(|c| c.iso_3166_1.as_deref())
        .map(country_key);
    let Some(country) = country.filter(|c| index.is_valid_country(c)) else {
        return Screened::UnknownCountry;
    };
    let title = display_title(
        bundle
            .title
            .as_deref()
            .or(bundle.original_title.as_deref())
            .unwrap_or(""),
    );
    Screened::Eligible {
        title,
        year,
        country,
    }
}

/// The movie's full alternate-title set: source alternates plus the chosen
/// and original titles, truncated then deduplicated. Empties drop out.
fn alt_title_set(bundle: &MovieBundle, chosen_title: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let candidates = bundle
        .alternative_titles
        .titles
        .iter()
        .filter_map(|t| t.title.as_deref())
        .chain(std::iter::once(chosen_title))
        .chain(bundle.original_title.as_deref());
    for raw in candidates {
        let cleaned = display_title(raw);
        if cleaned.is_empty() {
            continue;
        }
        if seen.insert(cleaned.clone()) {
            out.push(cleaned);
        }
    }
    out
}

/// One planned credit: a source person and the role to record against the
/// movie. Person identity is resolved later, against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedCredit {
    person_id: i64,
    name: String,
    role: CreditedAs,
}

/// Cast capped at `cast_limit` in source order, each credited A. Directors
/// are credited D from two signals: crew entries with the director job, and
/// retained cast whose department is directing (directors fronting their own
/// film are often credited only as cast). Duplicate (person, role) pairs
/// collapse to one.
fn plan_credits(credits: &Credits, cast_limit: usize) -> Vec<PlannedCredit> {
    let mut seen: HashSet<(i64, CreditedAs)> = HashSet::new();
    let mut plan: Vec<PlannedCredit> = Vec::new();

    for entry in credits.cast.iter().take(cast_limit) {
        if seen.insert((entry.id, CreditedAs::Acting)) {
            plan.push(PlannedCredit {
                person_id: entry.id,
                name: entry.name.clone().unwrap_or_default(),
                role: CreditedAs::Acting,
            });
        }
        if entry.known_for_department.as_deref() == Some(DIRECTING_DEPARTMENT)
            && seen.insert((entry.id, CreditedAs::Directing))
        {
            plan.push(PlannedCredit {
                person_id: entry.id,
                name: entry.name.clone().unwrap_or_default(),
                role: CreditedAs::Directing,
            });
        }
    }
    for entry in &credits.crew {
        if entry.job.as_deref() == Some(DIRECTOR_JOB)
            && seen.insert((entry.id, CreditedAs::Directing))
        {
            plan.push(PlannedCredit {
                person_id: entry.id,
                name: entry.name.clone().unwrap_or_default(),
                role: CreditedAs::Directing,
            });
        }
    }
    plan
}

pub struct Reconciler {
    index: KeyIndex,
    year_min: i32,
    year_max: i32,
    cast_limit: usize,
    pub counters: RunCounters,
}

impl Reconciler {
    pub fn new(index: KeyIndex, year_min: i32, year_max: i32, cast_limit: usize) -> Self {
        Self {
            index,
            year_min,
            year_max,
            cast_limit,
            counters: RunCounters::default(),
        }
    }

    /// Drive one candidate through the checks. All writes go through the run
    /// transaction's connection; the index is extended only after the
    /// corresponding write succeeds.
    pub async fn process(
        &mut self,
        conn: &mut PgConnection,
        client: &TmdbClient,
        people: &mut PersonCache,
        bundle: &MovieBundle,
    ) -> Result<Outcome> {
        self.counters.seen += 1;

        let (title, year, country) = match screen(bundle, self.year_min, self.year_max, &self.index)
        {
            Screened::OutsideWindow => {
                self.counters.skipped_year += 1;
                debug!(
                    source_id = bundle.id,
                    release = ?bundle.release_date,
                    "outside year window"
                );
                return Ok(Outcome::SkippedYear);
            }
            Screened::UnknownCountry => {
                self.counters.skipped_country += 1;
                self.counters
                    .tally_language(bundle.original_language.as_deref());
                debug!(
                    source_id = bundle.id,
                    lang = ?bundle.original_language,
                    "no valid production country"
                );
                return Ok(Outcome::SkippedCountry);
            }
            Screened::Eligible {
                title,
                year,
                country,
            } => (title, year, country),
        };

        if let Some(existing_id) = self.index.lookup_movie(&title, year, &country) {
            // Steady state on repeat runs. The movie row and credits stay
            // untouched, but alternate titles that appeared at the source
            // since the first sync still land.
            let titles = alt_title_set(bundle, &title);
            let added = gateway::insert_alt_titles(conn, existing_id, &titles).await?;
            self.counters.alt_titles_written += added;
            self.counters.already_present += 1;
            debug!(
                source_id = bundle.id,
                movie_id = existing_id,
                new_alt_titles = added,
                "already in catalog"
            );
            return Ok(Outcome::AlreadyPresent);
        }

        let movie_id = gateway::insert_movie(
            conn,
            &NewMovie {
                title: &title,
                country: &country,
                year_released: year,
                runtime: bundle.runtime,
            },
        )
        .await?;
        self.index.record_movie(&title, year, &country, movie_id);
        self.counters.inserted += 1;

        let titles = alt_title_set(bundle, &title);
        self.counters.alt_titles_written +=
            gateway::insert_alt_titles(conn, movie_id, &titles).await?;

        let mut credit_rows: Vec<CreditRow> = Vec::new();
        for planned in plan_credits(&bundle.credits, self.cast_limit) {
            let Some(person_id) = self.resolve_person(conn, client, people, &planned).await? else {
                continue;
            };
            credit_rows.push(CreditRow {
                movie_id,
                person_id,
                credited_as: planned.role,
            });
        }
        self.counters.credits_written += gateway::insert_credits(conn, &credit_rows).await?;

        debug!(
            source_id = bundle.id,
            movie_id,
            year,
            country = %country,
            credits = credit_rows.len(),
            "inserted"
        );
        Ok(Outcome::Inserted)
    }

    /// Find or create the catalog person behind one planned credit.
    ///
    /// The name pair from the credit entry is the identity; detail is fetched
    /// (through the run cache) only when the catalog does not already know
    /// the pair. An unusable name skips the person, never the movie.
    async fn resolve_person(
        &mut self,
        conn: &mut PgConnection,
        client: &TmdbClient,
        people: &mut PersonCache,
        planned: &PlannedCredit,
    ) -> Result<Option<i32>> {
        let Some(parts) = split_name(&planned.name) else {
            self.counters.people_skipped_name += 1;
            warn!(
                source_person = planned.person_id,
                name = %planned.name,
                "unusable person name; skipping"
            );
            return Ok(None);
        };
        if let Some(id) = self.index.lookup_person(&parts.first_name, &parts.surname) {
            return Ok(Some(id));
        }
        let detail = people.get_or_fetch(client, planned.person_id).await?;
        let born = leading_year(detail.birthday.as_deref()).unwrap_or(UNKNOWN_BORN);
        let died = leading_year(detail.deathday.as_deref());
        let id = gateway::upsert_person(
            conn,
            &NewPerson {
                first_name: &parts.first_name,
                surname: &parts.surname,
                born,
                died,
                gender: gender_code(detail.gender),
            },
        )
        .await?;
        self.index
            .record_person(&parts.first_name, &parts.surname, id);
        self.counters.people_written += 1;
        Ok(Some(id))
    }

    pub fn into_counters(self) -> RunCounters {
        self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle_from(payload: serde_json::Value) -> MovieBundle {
        serde_json::from_value(payload).unwrap()
    }

    #[test]
    fn screen_accepts_windowed_candidate_with_known_country() {
        let index = KeyIndex::with_reference(&["us"]);
        let bundle = bundle_from(json!({
            "id": 1,
            "title": "Dune",
            "release_date": "2021-03-15",
            "production_countries": [{"iso_3166_1": "US"}]
        }));
        assert_eq!(
            screen(&bundle, 2018, 2025, &index),
            Screened::Eligible {
                title: "Dune".to_string(),
                year: 2021,
                country: "us".to_string()
            }
        );
    }

    #[test]
    fn screen_buckets_missing_date_with_out_of_window() {
        let index = KeyIndex::with_reference(&["us"]);
        let undated = bundle_from(json!({"id": 1, "title": "X"}));
        assert_eq!(screen(&undated, 2018, 2025, &index), Screened::OutsideWindow);
        let early = bundle_from(json!({
            "id": 2, "title": "Y", "release_date": "2017-06-01",
            "production_countries": [{"iso_3166_1": "US"}]
        }));
        assert_eq!(screen(&early, 2018, 2025, &index), Screened::OutsideWindow);
    }

    #[test]
    fn screen_rejects_unknown_or_absent_country() {
        let index = KeyIndex::with_reference(&["us"]);
        let unknown = bundle_from(json!({
            "id": 1, "title": "X", "release_date": "2020-01-01",
            "production_countries": [{"iso_3166_1": "ZZ"}]
        }));
        assert_eq!(screen(&unknown, 2018, 2025, &index), Screened::UnknownCountry);
        let absent = bundle_from(json!({
            "id": 2, "title": "Y", "release_date": "2020-01-01"
        }));
        assert_eq!(screen(&absent, 2018, 2025, &index), Screened::UnknownCountry);
    }

    #[test]
    fn screen_only_consults_primary_country() {
        let index = KeyIndex::with_reference(&["fr"]);
        let bundle = bundle_from(json!({
            "id": 1, "title": "X", "release_date": "2020-01-01",
            "production_countries": [{"iso_3166_1": "ZZ"}, {"iso_3166_1": "FR"}]
        }));
        assert_eq!(screen(&bundle, 2018, 2025, &index), Screened::UnknownCountry);
    }

    #[test]
    fn screen_falls_back_to_original_title() {
        let index = KeyIndex::with_reference(&["fr"]);
        let bundle = bundle_from(json!({
            "id": 1, "original_title": "Amélie", "release_date": "2020-05-01",
            "production_countries": [{"iso_3166_1": "FR"}]
        }));
        match screen(&bundle, 2018, 2025, &index) {
            Screened::Eligible { title, .. } => assert_eq!(title, "Amélie"),
            other => panic!("expected eligible, got {other:?}"),
        }
    }

    #[test]
    fn plan_covers_both_director_signals() {
        let credits: Credits = serde_json::from_value(json!({
            "cast": [{"id": 20, "name": "Cast Director", "known_for_department": "Directing"}],
            "crew": [{"id": 10, "name": "Crew Director", "job": "Director"}]
        }))
        .unwrap();
        let plan = plan_credits(&credits, 5);
        let pairs: Vec<(i64, CreditedAs)> = plan.iter().map(|p| (p.person_id, p.role)).collect();
        assert!(pairs.contains(&(10, CreditedAs::Directing)));
        assert!(pairs.contains(&(20, CreditedAs::Acting)));
        assert!(pairs.contains(&(20, CreditedAs::Directing)));
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn plan_caps_cast_in_source_order() {
        let cast: Vec<serde_json::Value> = (1..=7)
            .map(|i| json!({"id": i, "name": format!("Person {i}"), "known_for_department": "Acting"}))
            .collect();
        let credits: Credits =
            serde_json::from_value(json!({"cast": cast, "crew": []})).unwrap();
        let plan = plan_credits(&credits, 5);
        assert_eq!(plan.len(), 5);
        assert_eq!(plan[0].person_id, 1);
        assert_eq!(plan[4].person_id, 5);
        assert!(plan.iter().all(|p| p.role == CreditedAs::Acting));
    }

    #[test]
    fn plan_collapses_duplicate_role_pairs() {
        let credits: Credits = serde_json::from_value(json!({
            "cast": [{"id": 30, "name": "Self Director", "known_for_department": "Directing"}],
            "crew": [
                {"id": 30, "name": "Self Director", "job": "Director"},
                {"id": 30, "name": "Self Director", "job": "Director"}
            ]
        }))
        .unwrap();
        let plan = plan_credits(&credits, 5);
        let directing = plan
            .iter()
            .filter(|p| p.role == CreditedAs::Directing)
            .count();
        assert_eq!(directing, 1);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn alt_titles_union_includes_chosen_and_original() {
        let bundle = bundle_from(json!({
            "id": 1,
            "title": "The Matrix",
            "original_title": "Matrix Original",
            "alternative_titles": {"titles": [
                {"title": "Matrix"},
                {"title": "The Matrix"},
                {"title": ""}
            ]}
        }));
        let titles = alt_title_set(&bundle, "The Matrix");
        assert_eq!(
            titles,
            vec![
                "Matrix".to_string(),
                "The Matrix".to_string(),
                "Matrix Original".to_string()
            ]
        );
    }

    #[test]
    fn alt_titles_dedup_after_truncation() {
        let base = "T".repeat(crate::normalization::MAX_TITLE_CHARS);
        let longer = format!("{base}XYZ");
        let bundle = bundle_from(json!({
            "id": 1,
            "title": base.clone(),
            "alternative_titles": {"titles": [{"title": longer}]}
        }));
        let titles = alt_title_set(&bundle, &base);
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].chars().count(), crate::normalization::MAX_TITLE_CHARS);
    }
}
