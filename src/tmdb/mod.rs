//! TMDB client: paginated discovery, expanded movie detail, person lookups.
//!
//! One client per run, strictly sequential request/response. A non-success
//! status or undecodable payload is a fault that aborts the whole run; the
//! source being down is not something a sync can paper over.
pub mod models;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::debug;

use models::{DiscoverPage, MovieBundle, PersonDetail};

const BASE_URL: &str = "https://api.themoviedb.org/3";

/// Discover stops serving results past this page regardless of total_pages.
pub const PAGE_CEILING: u32 = 500;

/// One quarter of a release year. Quarter slicing keeps each discover result
/// set comfortably under the page ceiling; a whole popular year would not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterSlice {
    pub year: i32,
    pub quarter: u8,
}

impl QuarterSlice {
    /// First day of the quarter, inclusive.
    pub fn gte(&self) -> String {
        format!("{}-{:02}-01", self.year, (self.quarter - 1) * 3 + 1)
    }

    /// Last day of the quarter, inclusive.
    pub fn lte(&self) -> String {
        match self.quarter {
            1 => format!("{}-03-31", self.year),
            2 => format!("{}-06-30", self.year),
            3 => format!("{}-09-30", self.year),
            _ => format!("{}-12-31", self.year),
        }
    }
}

/// The four fixed quarter slices of one release year.
pub fn quarter_slices(year: i32) -> [QuarterSlice; 4] {
    [1u8, 2, 3, 4].map(|quarter| QuarterSlice { year, quarter })
}

pub struct TmdbClient {
    http: reqwest::Client,
    min_vote_count: u32,
    min_runtime: u32,
}

impl TmdbClient {
    pub fn new(
        bearer_token: &str,
        timeout: Duration,
        min_vote_count: u32,
        min_runtime: u32,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {bearer_token}"))
            .context("bearer token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("building TMDB http client")?;
        Ok(Self {
            http,
            min_vote_count,
            min_runtime,
        })
    }

    /// One discover page for a quarter slice: theatrical releases only, adult
    /// titles excluded, most popular first.
    pub async fn discover_page(&self, slice: QuarterSlice, page: u32) -> Result<DiscoverPage> {
        let url = format!("{BASE_URL}/discover/movie");
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("include_adult", "false".to_string()),
                ("sort_by", "popularity.desc".to_string()),
                ("primary_release_date.gte", slice.gte()),
                ("primary_release_date.lte", slice.lte()),
                ("vote_count.gte", self.min_vote_count.to_string()),
                ("with_runtime.gte", self.min_runtime.to_string()),
                ("with_release_type", "3".to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await
            .with_context(|| {
                format!(
                    "discover request {}Q{} page {page}",
                    slice.year, slice.quarter
                )
            })?;
        if !resp.status().is_success() {
            bail!(
                "discover {}Q{} page {page} failed: HTTP {}",
                slice.year,
                slice.quarter,
                resp.status()
            );
        }
        let list: DiscoverPage = resp.json().await.context("decoding discover page")?;
        debug!(
            year = slice.year,
            quarter = slice.quarter,
            page,
            total_pages = list.total_pages,
            results = list.results.len(),
            "discover page fetched"
        );
        Ok(list)
    }

    /// Expanded movie record: detail plus credits and alternate titles in a
    /// single round-trip via append_to_response.
    pub async fn movie_bundle(&self, movie_id: i64) -> Result<MovieBundle> {
        let url = format!("{BASE_URL}/movie/{movie_id}");
        let resp = self
            .http
            .get(&url)
            .query(&[("append_to_response", "credits,alternative_titles")])
            .send()
            .await
            .with_context(|| format!("detail request for movie {movie_id}"))?;
        if !resp.status().is_success() {
            bail!("movie {movie_id} detail failed: HTTP {}", resp.status());
        }
        resp.json()
            .await
            .with_context(|| format!("decoding detail for movie {movie_id}"))
    }

    pub async fn person_detail(&self, person_id: i64) -> Result<PersonDetail> {
        let url = format!("{BASE_URL}/person/{person_id}");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("person request for {person_id}"))?;
        if !resp.status().is_success() {
            bail!("person {person_id} detail failed: HTTP {}", resp.status());
        }
        resp.json()
            .await
            .with_context(|| format!("decoding person {person_id}"))
    }
}

/// Run-lifetime cache of person lookups, keyed by source person id. This is
/// the only path to person fetches, so an identity is never fetched twice in
/// one run. Dropped with the run; a fresh run starts cold on purpose.
#[derive(Default)]
pub struct PersonCache {
    entries: HashMap<i64, PersonDetail>,
}

impl PersonCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn get_or_fetch(
        &mut self,
        client: &TmdbClient,
        person_id: i64,
    ) -> Result<PersonDetail> {
        if let Some(found) = self.entries.get(&person_id) {
            return Ok(found.clone());
        }
        let fetched = client.person_detail(person_id).await?;
        self.entries.insert(person_id, fetched.clone());
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_bounds_cover_the_year_without_gaps() {
        let slices = quarter_slices(2021);
        assert_eq!(slices[0].gte(), "2021-01-01");
        assert_eq!(slices[0].lte(), "2021-03-31");
        assert_eq!(slices[1].gte(), "2021-04-01");
        assert_eq!(slices[1].lte(), "2021-06-30");
        assert_eq!(slices[2].gte(), "2021-07-01");
        assert_eq!(slices[2].lte(), "2021-09-30");
        assert_eq!(slices[3].gte(), "2021-10-01");
        assert_eq!(slices[3].lte(), "2021-12-31");
    }

    #[test]
    fn four_slices_per_year() {
        assert_eq!(quarter_slices(2019).len(), 4);
    }
}
