use std::{future::Future, time::Duration};

use anyhow::Context;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, Connection, PgPool};
use tracing::{info, warn};

use crate::config::MigrationConfig;

const MAX_ATTEMPTS: u32 = 5;

/// Build the pool and confirm it answers a ping. Both steps are retried with
/// `attempt^2` second pauses before giving up.
pub async fn connect_with_retry(database_url: &str) -> anyhow::Result<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(60))
        .acquire_timeout(Duration::from_secs(10));

    let pool = retry("initialise database connection pool", || {
        options.clone().connect(database_url)
    })
    .await
    .context("connect to database")?;

    retry("ping database connection pool", || async {
        let mut conn = pool.acquire().await?;
        conn.ping().await
    })
    .await
    .context("ping database")?;

    info!("database connection pool ready");
    Ok(pool)
}

async fn retry<T, F, Fut>(what: &str, mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= MAX_ATTEMPTS => {
                warn!(error = %e, attempts = attempt, "failed to {what}, giving up");
                return Err(e);
            }
            Err(e) => {
                let pause = backoff(attempt);
                warn!(error = %e, attempt, "failed to {what}");
                info!("retrying in {} seconds...", pause.as_secs());
                tokio::time::sleep(pause).await;
                attempt += 1;
            }
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt * attempt))
}

/// Apply pending migrations from `cfg.dir` against `cfg.dbstring`.
pub async fn run_migrations(cfg: &MigrationConfig) -> anyhow::Result<()> {
    let migrator = Migrator::new(cfg.dir.as_path())
        .await
        .with_context(|| format!("load migrations from {}", cfg.dir.display()))?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&cfg.dbstring)
        .await
        .context("open migration connection")?;

    migrator.run(&pool).await.context("apply migrations")?;
    pool.close().await;
    Ok(())
}
