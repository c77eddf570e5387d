/// Decay Sweep Scheduler
/// Reconciles every user's current trainer on a cron schedule so decay
/// and moods are current even for users who have not opened the app
use crate::error::{AppError, Result};
use crate::services::session::TrainerSession;
use crate::services::settings::SweepSettings;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

/// Scheduler service for the daily decay sweep
pub struct DecaySweepScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    session: Arc<TrainerSession>,
    current_job_id: Arc<RwLock<Option<Uuid>>>,
}

impl DecaySweepScheduler {
    pub async fn new(session: TrainerSession) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            session: Arc::new(session),
            current_job_id: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn start(&self) -> Result<()> {
        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Decay sweep scheduler started");
        Ok(())
    }

    /// Replace the sweep job according to `settings`
    pub async fn schedule(&self, settings: &SweepSettings) -> Result<()> {
        self.cancel().await?;

        if !settings.enabled {
            tracing::info!("Decay sweep disabled");
            return Ok(());
        }

        let session = Arc::clone(&self.session);

        let job = Job::new_async(settings.cron.clone(), move |_uuid, _l| {
            let session = Arc::clone(&session);
            Box::pin(async move {
                let today = chrono::Local::now().date_naive();
                tracing::info!("Running scheduled decay sweep for {}", today);

                if let Err(e) = session.reconcile_all(today).await {
                    tracing::error!("Decay sweep failed: {}", e);
                }
            })
        })
        .map_err(|e| AppError::Scheduler(format!("Failed to create sweep job: {}", e)))?;

        let job_id = job.guid();

        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to schedule job: {}", e)))?;

        let mut current_job = self.current_job_id.write().await;
        *current_job = Some(job_id);

        tracing::info!("Decay sweep scheduled ({})", settings.cron);
        Ok(())
    }

    pub async fn is_scheduled(&self) -> bool {
        self.current_job_id.read().await.is_some()
    }

    pub async fn cancel(&self) -> Result<()> {
        let mut current_job = self.current_job_id.write().await;

        if let Some(job_id) = *current_job {
            let scheduler = self.scheduler.write().await;
            scheduler
                .remove(&job_id)
                .await
                .map_err(|e| AppError::Scheduler(format!("Failed to remove job: {}", e)))?;

            *current_job = None;
            tracing::info!("Decay sweep cancelled");
        }

        Ok(())
    }

    /// Shutdown scheduler gracefully
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to shutdown scheduler: {}", e)))?;
        tracing::info!("Decay sweep scheduler shutdown");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, Repository};
    use crate::services::settings::GameSettings;

    async fn create_test_scheduler() -> DecaySweepScheduler {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let session = TrainerSession::new(repo, &GameSettings::default());
        DecaySweepScheduler::new(session).await.unwrap()
    }

    #[tokio::test]
    async fn test_schedule_and_cancel() {
        let scheduler = create_test_scheduler().await;

        scheduler.schedule(&SweepSettings::default()).await.unwrap();
        assert!(scheduler.is_scheduled().await);

        scheduler.cancel().await.unwrap();
        assert!(!scheduler.is_scheduled().await);
    }

    #[tokio::test]
    async fn test_disabled_sweep_schedules_nothing() {
        let scheduler = create_test_scheduler().await;

        let settings = SweepSettings {
            enabled: false,
            ..SweepSettings::default()
        };
        scheduler.schedule(&settings).await.unwrap();
        assert!(!scheduler.is_scheduled().await);
    }

    #[tokio::test]
    async fn test_invalid_cron_rejected() {
        let scheduler = create_test_scheduler().await;

        let settings = SweepSettings {
            enabled: true,
            cron: "every day please".to_string(),
        };
        let result = scheduler.schedule(&settings).await;
        assert!(matches!(result, Err(AppError::Scheduler(_))));
        assert!(!scheduler.is_scheduled().await);
    }
}
