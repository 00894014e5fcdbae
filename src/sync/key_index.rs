//! In-memory mirror of catalog identity, loaded once per run.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use sqlx::{PgConnection, Row};
use tracing::info;

use crate::normalization::release::country_key;
use crate::normalization::title::title_key;

/// Identity index over the existing catalog: movie triples and person name
/// pairs mapped to their store ids, plus the reference country set.
///
/// The store has no unique constraint on the movie triple, so this index is
/// the only thing standing between a repeat run and duplicate rows. It loads
/// inside the run transaction before any write and is extended in memory
/// after each successful insert, so later candidates in the same run see
/// earlier ones.
pub struct KeyIndex {
    movies: HashMap<(String, i32, String), i32>,
    people: HashMap<(String, String), i32>,
    countries: HashSet<String>,
}

impl KeyIndex {
    /// Load the three mappings. Movie keys are restricted to the year window
    /// (nothing outside it can collide with a candidate); person keys are
    /// global because credits reach across years.
    pub async fn load(conn: &mut PgConnection, year_min: i32, year_max: i32) -> Result<Self> {
        let movie_rows = sqlx::query(
            "SELECT movieid, title, year_released, country FROM movies \
             WHERE year_released BETWEEN $1 AND $2",
        )
        .bind(year_min)
        .bind(year_max)
        .fetch_all(&mut *conn)
        .await
        .context("loading movie keys")?;
        let mut movies = HashMap::with_capacity(movie_rows.len());
        for row in movie_rows {
            let id: i32 = row.get("movieid");
            let title: String = row.get("title");
            let year: i32 = row.get("year_released");
            let country: String = row.get("country");
            movies.insert((title_key(&title), year, country_key(&country)), id);
        }

        let people_rows = sqlx::query("SELECT peopleid, first_name, surname FROM people")
            .fetch_all(&mut *conn)
            .await
            .context("loading person keys")?;
        let mut people = HashMap::with_capacity(people_rows.len());
        for row in people_rows {
            let id: i32 = row.get("peopleid");
            let first_name: Option<String> = row.get("first_name");
            let surname: String = row.get("surname");
            people.insert((first_name.unwrap_or_default(), surname), id);
        }

        let country_rows = sqlx::query("SELECT country_code FROM countries")
            .fetch_all(&mut *conn)
            .await
            .context("loading reference countries")?;
        let countries: HashSet<String> = country_rows
            .iter()
            .map(|row| country_key(row.get("country_code")))
            .collect();

        info!(
            movies = movies.len(),
            people = people.len(),
            countries = countries.len(),
            "key index loaded"
        );
        Ok(Self {
            movies,
            people,
            countries,
        })
    }

    pub fn is_valid_country(&self, code: &str) -> bool {
        self.countries.contains(code)
    }

    /// Title is normalized here, so lookups and records agree on the key no
    /// matter which form the caller holds.
    pub fn lookup_movie(&self, title: &str, year: i32, country: &str) -> Option<i32> {
        self.movies
            .get(&(title_key(title), year, country.to_string()))
            .copied()
    }

    pub fn record_movie(&mut self, title: &str, year: i32, country: &str, id: i32) {
        self.movies
            .insert((title_key(title), year, country.to_string()), id);
    }

    /// Person keys are exact post-truncation name pairs, case preserved.
    pub fn lookup_person(&self, first_name: &str, surname: &str) -> Option<i32> {
        self.people
            .get(&(first_name.to_string(), surname.to_string()))
            .copied()
    }

    pub fn record_person(&mut self, first_name: &str, surname: &str, id: i32) {
        self.people
            .insert((first_name.to_string(), surname.to_string()), id);
    }

    #[cfg(test)]
    pub(crate) fn with_reference(countries: &[&str]) -> Self {
        Self {
            movies: HashMap::new(),
            people: HashMap::new(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_lookup_folds_title_case() {
        let mut index = KeyIndex::with_reference(&["us"]);
        index.record_movie("The Matrix", 1999, "us", 7);
        assert_eq!(index.lookup_movie("  the matrix ", 1999, "us"), Some(7));
        assert_eq!(index.lookup_movie("The Matrix", 1999, "fr"), None);
        assert_eq!(index.lookup_movie("The Matrix", 2003, "us"), None);
    }

    #[test]
    fn person_keys_are_exact_pairs() {
        let mut index = KeyIndex::with_reference(&[]);
        index.record_person("Emma", "Stone", 12);
        assert_eq!(index.lookup_person("Emma", "Stone"), Some(12));
        assert_eq!(index.lookup_person("", "Stone"), None);
    }

    #[test]
    fn country_membership() {
        let index = KeyIndex::with_reference(&["us", "fr"]);
        assert!(index.is_valid_country("us"));
        assert!(!index.is_valid_country("xx"));
    }
}
