// fitcoach worker
// Runs the scheduled decay sweep against a data directory

use anyhow::Context;
use fitcoach::app::{init_logging, AppState};
use fitcoach::services::DecaySweepScheduler;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let data_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FITCOACH_DATA_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data"));

    tracing::info!("Starting fitcoach worker");

    let state = AppState::initialize(data_dir)
        .await
        .context("failed to initialize data directory")?;

    let scheduler = DecaySweepScheduler::new(state.session.clone()).await?;
    scheduler.schedule(&state.settings.sweep).await?;
    scheduler.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("Shutting down fitcoach worker");
    scheduler.shutdown().await?;

    Ok(())
}
