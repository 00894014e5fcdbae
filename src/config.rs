//! Run configuration: env first, CLI flags override, everything fixed before
//! the sync starts. Secrets (bearer token, DSN) stay out of this struct so a
//! debug print never leaks them.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use crate::util::env as env_util;

/// Incremental film-catalog synchronizer over a TMDB release-year window.
#[derive(Debug, Default, Parser)]
#[command(name = "filmsync", version, about)]
pub struct Cli {
    /// First release year of the window (env YEAR_MIN)
    #[arg(long)]
    pub year_min: Option<i32>,
    /// Last release year of the window (env YEAR_MAX)
    #[arg(long)]
    pub year_max: Option<i32>,
    /// Cast entries retained per movie, in source order (env CAST_LIMIT)
    #[arg(long)]
    pub cast_limit: Option<usize>,
    /// Stop each quarter slice after this many pages (env PAGE_CAP)
    #[arg(long)]
    pub page_cap: Option<u32>,
    /// Progress log cadence, in candidates (env LOG_EVERY)
    #[arg(long)]
    pub log_every: Option<u64>,
    /// Apply the reference DDL before syncing (env SCHEMA_BOOTSTRAP)
    #[arg(long)]
    pub schema_bootstrap: bool,
    /// Write a JSON run summary under exports/ (env RUN_EXPORT)
    #[arg(long)]
    pub run_export: bool,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub year_min: i32,
    pub year_max: i32,
    pub cast_limit: usize,
    pub request_timeout: Duration,
    pub log_every: u64,
    pub page_cap: Option<u32>,
    pub min_vote_count: u32,
    pub min_runtime: u32,
    pub schema_bootstrap: bool,
    pub run_export: bool,
}

impl SyncConfig {
    /// Resolve the run configuration. Defaults match the original batch job:
    /// recent years, top five cast entries, modest discover filters.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let year_min = cli
            .year_min
            .unwrap_or_else(|| env_util::env_parse("YEAR_MIN", 2018));
        let year_max = cli
            .year_max
            .unwrap_or_else(|| env_util::env_parse("YEAR_MAX", 2025));
        if year_min > year_max {
            bail!("YEAR_MIN {year_min} exceeds YEAR_MAX {year_max}");
        }
        Ok(Self {
            year_min,
            year_max,
            cast_limit: cli
                .cast_limit
                .unwrap_or_else(|| env_util::env_parse("CAST_LIMIT", 5usize)),
            request_timeout: Duration::from_secs(env_util::env_parse(
                "REQUEST_TIMEOUT_SECS",
                15u64,
            )),
            log_every: cli
                .log_every
                .unwrap_or_else(|| env_util::env_parse("LOG_EVERY", 50u64))
                .max(1),
            page_cap: cli.page_cap.or_else(|| env_util::env_parse_opt("PAGE_CAP")),
            min_vote_count: env_util::env_parse("MIN_VOTE_COUNT", 5u32),
            min_runtime: env_util::env_parse("MIN_RUNTIME", 40u32),
            schema_bootstrap: cli.schema_bootstrap || env_util::env_flag("SCHEMA_BOOTSTRAP", false),
            run_export: cli.run_export || env_util::env_flag("RUN_EXPORT", false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_window_overrides_env() {
        let cli = Cli {
            year_min: Some(2020),
            year_max: Some(2021),
            ..Default::default()
        };
        let cfg = SyncConfig::resolve(&cli).unwrap();
        assert_eq!(cfg.year_min, 2020);
        assert_eq!(cfg.year_max, 2021);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let cli = Cli {
            year_min: Some(2025),
            year_max: Some(2018),
            ..Default::default()
        };
        assert!(SyncConfig::resolve(&cli).is_err());
    }
}
