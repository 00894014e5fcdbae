//! Postgres access: pool construction and catalog bootstrap.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

/// Identity columns whose sequences must exist before any insert.
/// (table, column, sequence)
const IDENTITY_SEQUENCES: [(&str, &str, &str); 3] = [
    ("movies", "movieid", "movies_movieid_seq"),
    ("people", "peopleid", "people_peopleid_seq"),
    ("alt_titles", "titleid", "alt_titles_titleid_seq"),
];

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        // Ensure TLS is enabled when the DSN asks for it; sqlx usually honors
        // the DSN but being explicit avoids surprises behind poolers.
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        // PgBouncer txn mode safe
        connect_options = connect_options.statement_cache_capacity(0);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }

    /// Apply the reference catalog DDL. Opt-in, for empty databases only;
    /// production catalogs pre-exist and are never migrated by this tool.
    pub async fn apply_schema(&self) -> Result<()> {
        let ddl = include_str!("../migrations/0001_catalog.sql");
        sqlx::raw_sql(ddl)
            .execute(&self.pool)
            .await
            .context("applying reference catalog schema")?;
        info!("reference catalog schema applied");
        Ok(())
    }

    /// Make sure every identity column draws from a live sequence positioned
    /// past the current max id. Catalogs restored from plain dumps lose the
    /// column default, and inserts then fail on a null primary key.
    ///
    /// Runs in its own transaction, committed before the sync transaction
    /// opens, so the repair survives even when the sync itself rolls back.
    pub async fn ensure_identity_sequences(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (table, column, sequence) in IDENTITY_SEQUENCES {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM information_schema.sequences WHERE sequence_name = $1)",
            )
            .persistent(false)
            .bind(sequence)
            .fetch_one(&mut *tx)
            .await?;
            if !exists {
                warn!(sequence, table, "identity sequence missing; creating");
                sqlx::raw_sql(&format!("CREATE SEQUENCE {sequence}"))
                    .execute(&mut *tx)
                    .await?;
            }
            let max_id: Option<i64> =
                sqlx::query_scalar(&format!("SELECT MAX({column})::bigint FROM {table}"))
                    .persistent(false)
                    .fetch_one(&mut *tx)
                    .await?;
            let next = max_id.unwrap_or(0) + 1;
            sqlx::query("SELECT setval($1::regclass, $2, false)")
                .persistent(false)
                .bind(sequence)
                .bind(next)
                .execute(&mut *tx)
                .await?;
            sqlx::raw_sql(&format!(
                "ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT nextval('{sequence}')"
            ))
            .execute(&mut *tx)
            .await?;
            debug!(table, column, sequence, next, "identity sequence positioned");
        }
        tx.commit().await?;
        Ok(())
    }
}
