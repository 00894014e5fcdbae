//! Run supervisor: owns the single transaction, walks the year/quarter/page
//! grid, reports progress, commits exactly once.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::db::Db;
use crate::sync::key_index::KeyIndex;
use crate::sync::reconciler::{Reconciler, RunCounters};
use crate::tmdb::{quarter_slices, PersonCache, TmdbClient, PAGE_CEILING};

/// What one full run did. Serialized under exports/ when enabled.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub year_min: i32,
    pub year_max: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: u64,
    #[serde(flatten)]
    pub counters: RunCounters,
}

/// Reconcile the whole configured window inside one transaction.
///
/// Commit happens once, after the last slice. Any error propagating out of
/// here abandons the transaction, which rolls back on drop, so the catalog
/// keeps exactly its pre-run state.
pub async fn run_sync(db: &Db, client: &TmdbClient, cfg: &SyncConfig) -> Result<RunSummary> {
    let started_at = Utc::now();
    let clock = Instant::now();

    // Identity defaults must survive an aborted run, hence their own
    // committed transaction before the run envelope opens.
    db.ensure_identity_sequences().await?;

    let mut tx = db.pool.begin().await.context("opening run transaction")?;

    let index = KeyIndex::load(&mut tx, cfg.year_min, cfg.year_max).await?;
    let mut reconciler = Reconciler::new(index, cfg.year_min, cfg.year_max, cfg.cast_limit);
    let mut people = PersonCache::new();

    for year in (cfg.year_min..=cfg.year_max).rev() {
        let at_year_start = reconciler.counters.clone();
        for slice in quarter_slices(year) {
            let mut page: u32 = 1;
            let mut total_pages: u32 = 1;
            while page <= total_pages {
                if let Some(cap) = cfg.page_cap {
                    if page > cap {
                        info!(year, quarter = slice.quarter, cap, "page cap reached");
                        break;
                    }
                }
                let batch = client.discover_page(slice, page).await?;
                total_pages = batch.total_pages.min(PAGE_CEILING);
                if batch.results.is_empty() {
                    break;
                }
                for candidate in &batch.results {
                    let bundle = client.movie_bundle(candidate.id).await?;
                    reconciler.process(&mut tx, client, &mut people, &bundle).await?;
                    if reconciler.counters.seen % cfg.log_every == 0 {
                        let c = &reconciler.counters;
                        info!(
                            year,
                            quarter = slice.quarter,
                            page,
                            seen = c.seen,
                            inserted = c.inserted,
                            present = c.already_present,
                            skipped_year = c.skipped_year,
                            skipped_country = c.skipped_country,
                            "progress"
                        );
                    }
                }
                page += 1;
            }
        }
        let c = &reconciler.counters;
        info!(
            year,
            seen = c.seen - at_year_start.seen,
            inserted = c.inserted - at_year_start.inserted,
            present = c.already_present - at_year_start.already_present,
            skipped_year = c.skipped_year - at_year_start.skipped_year,
            skipped_country = c.skipped_country - at_year_start.skipped_country,
            "year complete"
        );
    }

    tx.commit().await.context("committing run transaction")?;

    let counters = reconciler.into_counters();
    for (lang, rejected) in counters.top_rejected_languages(10) {
        info!(lang = %lang, rejected, "country-rejection language tally");
    }

    let finished_at = Utc::now();
    let summary = RunSummary {
        year_min: cfg.year_min,
        year_max: cfg.year_max,
        started_at,
        finished_at,
        elapsed_secs: clock.elapsed().as_secs(),
        counters,
    };
    info!(
        movies = summary.counters.inserted,
        people = summary.counters.people_written,
        credits = summary.counters.credits_written,
        alt_titles = summary.counters.alt_titles_written,
        cached_people = people.len(),
        elapsed_secs = summary.elapsed_secs,
        "run committed"
    );

    if cfg.run_export {
        if let Err(err) = export_summary(&summary) {
            warn!(error = %err, "run summary export failed");
        }
    }
    Ok(summary)
}

fn export_summary(summary: &RunSummary) -> Result<()> {
    std::fs::create_dir_all("exports").context("creating exports directory")?;
    let path = format!(
        "exports/filmsync_run_{}.json",
        summary.finished_at.format("%Y%m%d_%H%M%S")
    );
    std::fs::write(&path, serde_json::to_vec_pretty(summary)?)
        .with_context(|| format!("writing {path}"))?;
    info!(path = %path, "run summary exported");
    Ok(())
}
