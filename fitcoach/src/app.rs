//! Application state and initialization
//!
//! This module wires storage, settings and services together.
//! All services are initialized here and made available through AppState.

use crate::config::DATABASE_FILE_NAME;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{GameSettings, SettingsService, TrainerSession};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: GameSettings,
    pub settings_service: SettingsService,
    pub session: TrainerSession,
}

impl AppState {
    /// Open (or create) the data directory, settings and database
    pub async fn initialize(data_dir: PathBuf) -> Result<Self> {
        tracing::info!("Initializing fitcoach in {:?}", data_dir);

        std::fs::create_dir_all(&data_dir)?;

        let settings_service = SettingsService::new(data_dir.clone());
        let settings = settings_service.load().await?;

        let pool = create_pool(&data_dir.join(DATABASE_FILE_NAME)).await?;
        let session = TrainerSession::new(Repository::new(pool), &settings);

        tracing::info!("fitcoach initialized successfully");

        Ok(Self {
            data_dir,
            settings,
            settings_service,
            session,
        })
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitcoach=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
