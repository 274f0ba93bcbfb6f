use std::net::SocketAddr;

use anyhow::Context;
use clerk_users::{
    app,
    config::{AppConfig, MigrationConfig},
    db, logging,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    if let Err(e) = run().await {
        tracing::error!(error = ?e, "startup failed");
        return Err(e);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    tracing::info!(environment = %config.environment, production = config.is_production(), "configuration loaded");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("listen address")?;
    let run_migration = config.run_migration;

    let app_state = AppState::init(config).await?;

    if run_migration {
        tracing::info!("attempting to run database migrations...");
        let migrations = MigrationConfig::from_env()?;
        db::run_migrations(&migrations).await?;
        tracing::info!("database migrations complete");
    } else {
        tracing::info!("database migrations skipped");
    }

    let router = app::build_app(app_state.clone());
    app::serve(router, addr).await?;

    app_state.db.close().await;
    Ok(())
}
