use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tracing::{info, warn};

use filmsync::config::{Cli, SyncConfig};
use filmsync::db::Db;
use filmsync::sync::run::run_sync;
use filmsync::tmdb::TmdbClient;
use filmsync::util::env as env_util;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --- logging -------------------------------------------------------------
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    // --- configuration -------------------------------------------------------
    env_util::preflight_check(
        "filmsync",
        &["TMDB_BEARER_TOKEN"],
        &[
            "DATABASE_URL",
            "PGHOST",
            "YEAR_MIN",
            "YEAR_MAX",
            "CAST_LIMIT",
            "REQUEST_TIMEOUT_SECS",
            "LOG_EVERY",
            "PAGE_CAP",
            "MIN_VOTE_COUNT",
            "MIN_RUNTIME",
        ],
    )?;
    let cfg = SyncConfig::resolve(&cli)?;
    info!(
        year_min = cfg.year_min,
        year_max = cfg.year_max,
        cast_limit = cfg.cast_limit,
        page_cap = ?cfg.page_cap,
        "starting sync"
    );

    // --- DB connect ----------------------------------------------------------
    let database_url = match env_util::db_url() {
        Ok(url) => {
            info!("database URL detected (length={})", url.len());
            url
        }
        Err(err) => {
            warn!(error = %err, "no database URL provided; set DATABASE_URL or the PG* variables");
            anyhow::bail!("database URL not configured");
        }
    };
    let db = Db::connect(&database_url, 5)
        .await
        .context("connecting to catalog database")?;
    if cfg.schema_bootstrap {
        db.apply_schema().await?;
    }

    // --- sync ----------------------------------------------------------------
    let token = env_util::env_req("TMDB_BEARER_TOKEN")?;
    let client = TmdbClient::new(&token, cfg.request_timeout, cfg.min_vote_count, cfg.min_runtime)?;

    let summary = run_sync(&db, &client, &cfg).await?;
    info!(
        seen = summary.counters.seen,
        inserted = summary.counters.inserted,
        present = summary.counters.already_present,
        "sync finished"
    );
    Ok(())
}
