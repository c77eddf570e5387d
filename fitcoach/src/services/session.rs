//! Trainer session
//!
//! The façade presentation code calls. Every mutating operation takes
//! the user's lock and runs in one transaction, so reconcile-then-apply
//! and the reward steps of a submission are serialized per user.

use crate::database::{
    MealRecord, RecordMealRequest, RecordWeightRequest, Repository, TrainerState,
    UpdateProfileRequest, UserProfile, WeightRecord,
};
use crate::decay::DecayOutcome;
use crate::error::Result;
use crate::progression::{level_progress, LevelTier, Mood};
use crate::services::achievements::AchievementService;
use crate::services::decay::DecayService;
use crate::services::meals::{MealEntry, MealService};
use crate::services::profile::ProfileService;
use crate::services::records::{resolve_record_date, validate_weight, LevelUp, RecordService, StreakBonus};
use crate::services::settings::GameSettings;
use crate::services::shop::{Purchase, ShopService, EXP_BOOST, STREAK_FREEZE};
use crate::services::trainers::TrainerService;
use crate::streak::consecutive_day_streak;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-user async locks. An entry lives only while someone holds or
/// waits for that user's lock.
#[derive(Clone, Default)]
struct UserLocks {
    inner: Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: &str) -> UserGuard {
        let lock = {
            let mut locks = self
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };

        let guard = Arc::clone(&lock).lock_owned().await;
        UserGuard {
            guard: Some(guard),
            lock,
            user_id: user_id.to_string(),
            locks: self.clone(),
        }
    }

    fn release(&self, user_id: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Clones are only taken under this mutex, so the count is stable:
        // one for the map and one for the releasing guard.
        if Arc::strong_count(lock) == 2
            && locks.get(user_id).is_some_and(|held| Arc::ptr_eq(held, lock))
        {
            locks.remove(user_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Holds one user's lock and prunes its map entry on drop
struct UserGuard {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<Mutex<()>>,
    user_id: String,
    locks: UserLocks,
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.user_id, &self.lock);
    }
}

/// Result of a weight submission, consumed once by the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub record: WeightRecord,
    pub is_new_record: bool,
    /// Missed days reconciled before the record was applied
    pub decay: Option<DecayOutcome>,
    pub exp_gained: i64,
    pub points_awarded: i64,
    pub level_up: Option<LevelUp>,
    pub streak_bonus: Option<StreakBonus>,
    pub newly_unlocked_achievements: Vec<String>,
}

/// Aggregate state of the current trainer
#[derive(Debug, Clone, Serialize)]
pub struct TrainerView {
    pub trainer_id: String,
    pub level: i64,
    pub level_name: &'static str,
    pub progress_percent: f64,
    pub next_level: Option<LevelTier>,
    pub net_score: i64,
    pub exp_points: i64,
    pub decay_points: i64,
    pub mood: Mood,
    pub consecutive_miss: i64,
    pub streak: i64,
    pub total_points: i64,
    pub available_freezes: i64,
    pub available_boosts: i64,
    pub last_record_at: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct TrainerSession {
    repo: Repository,
    decay: DecayService,
    records: RecordService,
    meals: MealService,
    achievements: AchievementService,
    shop: ShopService,
    trainers: TrainerService,
    profiles: ProfileService,
    locks: UserLocks,
}

impl TrainerSession {
    pub fn new(repo: Repository, settings: &GameSettings) -> Self {
        Self {
            repo,
            decay: DecayService::new(settings.decay.clone()),
            records: RecordService::new(settings.rewards.clone()),
            meals: MealService::new(settings.rewards.clone()),
            achievements: AchievementService::new(),
            shop: ShopService::new(),
            trainers: TrainerService::new(),
            profiles: ProfileService::new(),
            locks: UserLocks::default(),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Select (or switch back to) a trainer
    pub async fn select_trainer(&self, user_id: &str, trainer_id: &str) -> Result<TrainerState> {
        let _guard = self.locks.acquire(user_id).await;

        let mut tx = self.repo.begin().await?;
        let state = self.trainers.select(&mut tx, user_id, trainer_id).await?;
        tx.commit().await?;

        Ok(state)
    }

    /// Reconcile decay and return the current trainer's view.
    ///
    /// `None` when the user has not selected a trainer yet.
    pub async fn load(&self, user_id: &str, today: NaiveDate) -> Result<Option<TrainerView>> {
        let _guard = self.locks.acquire(user_id).await;

        let mut tx = self.repo.begin().await?;
        self.decay.reconcile(&mut tx, user_id, today).await?;

        let Some(state) = tx.get_trainer_state(user_id).await? else {
            tx.commit().await?;
            return Ok(None);
        };

        let records = tx.list_weight_records(user_id, None).await?;
        let total_points = tx.sum_points(user_id).await?;
        let available_freezes = tx.count_available_consumables(user_id, STREAK_FREEZE).await?;
        let available_boosts = tx.count_available_consumables(user_id, EXP_BOOST).await?;
        tx.commit().await?;

        let net_score = state.net_score();
        let progress = level_progress(net_score);

        Ok(Some(TrainerView {
            trainer_id: state.trainer_id,
            level: state.current_level,
            level_name: progress.current.name,
            progress_percent: progress.percent,
            next_level: progress.next.copied(),
            net_score,
            exp_points: state.exp_points,
            decay_points: state.decay_points,
            mood: state.mood,
            consecutive_miss: state.consecutive_miss,
            streak: consecutive_day_streak(&records, today),
            total_points,
            available_freezes,
            available_boosts,
            last_record_at: state.last_record_at,
        }))
    }

    /// Reconcile missed days without loading the view
    pub async fn reconcile(&self, user_id: &str, today: NaiveDate) -> Result<Option<DecayOutcome>> {
        let _guard = self.locks.acquire(user_id).await;

        let mut tx = self.repo.begin().await?;
        let outcome = self.decay.reconcile(&mut tx, user_id, today).await?;
        tx.commit().await?;

        Ok(outcome)
    }

    /// Reconcile every user with a current trainer. Returns how many changed.
    ///
    /// A failure for one user is logged and does not stop the others.
    pub async fn reconcile_all(&self, today: NaiveDate) -> Result<usize> {
        let mut tx = self.repo.begin().await?;
        let users = tx.list_current_trainer_users().await?;
        tx.commit().await?;

        let mut reconciled = 0;
        for user_id in &users {
            match self.reconcile(user_id, today).await {
                Ok(Some(_)) => reconciled += 1,
                Ok(None) => {}
                Err(e) => tracing::error!("Failed to reconcile user {}: {}", user_id, e),
            }
        }

        tracing::info!(
            "Decay sweep for {}: {} of {} user(s) updated",
            today,
            reconciled,
            users.len()
        );
        Ok(reconciled)
    }

    /// Submit a weight record
    pub async fn record_weight(
        &self,
        user_id: &str,
        req: RecordWeightRequest,
        today: NaiveDate,
    ) -> Result<RecordOutcome> {
        validate_weight(req.weight_kg)?;
        resolve_record_date(req.date, today)?;

        let _guard = self.locks.acquire(user_id).await;

        let mut tx = self.repo.begin().await?;
        let decay = self.decay.reconcile(&mut tx, user_id, today).await?;
        let entry = self.records.apply(&mut tx, user_id, &req, today).await?;
        tx.commit().await?;

        // The record is committed; achievements are a bonus on top and
        // are re-derived from stored state on the next submission.
        let newly_unlocked_achievements = if entry.rewarded {
            match self.evaluate_achievements(user_id, today).await {
                Ok(unlocked) => unlocked,
                Err(e) => {
                    tracing::warn!("Achievement check failed for user {}: {}", user_id, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(RecordOutcome {
            record: entry.record,
            is_new_record: entry.is_new_record,
            decay,
            exp_gained: entry.exp_gained,
            points_awarded: entry.points_awarded,
            level_up: entry.level_up,
            streak_bonus: entry.streak_bonus,
            newly_unlocked_achievements,
        })
    }

    /// Log a meal and credit its points
    pub async fn record_meal(
        &self,
        user_id: &str,
        req: RecordMealRequest,
        today: NaiveDate,
    ) -> Result<MealEntry> {
        let _guard = self.locks.acquire(user_id).await;

        let mut tx = self.repo.begin().await?;
        let entry = self.meals.record(&mut tx, user_id, &req, today).await?;
        tx.commit().await?;

        Ok(entry)
    }

    pub async fn list_meals(&self, user_id: &str, date: NaiveDate) -> Result<Vec<MealRecord>> {
        let mut tx = self.repo.begin().await?;
        let meals = tx.list_meal_records(user_id, date).await?;
        tx.commit().await?;
        Ok(meals)
    }

    pub async fn delete_meal(&self, user_id: &str, meal_id: i64) -> Result<()> {
        let _guard = self.locks.acquire(user_id).await;

        let mut tx = self.repo.begin().await?;
        self.meals.delete(&mut tx, user_id, meal_id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Re-check achievement rules outside a submission
    pub async fn check_achievements(&self, user_id: &str, today: NaiveDate) -> Result<Vec<String>> {
        let _guard = self.locks.acquire(user_id).await;

        self.evaluate_achievements(user_id, today).await
    }

    async fn evaluate_achievements(&self, user_id: &str, today: NaiveDate) -> Result<Vec<String>> {
        let mut tx = self.repo.begin().await?;
        let unlocked = self.achievements.evaluate(&mut tx, user_id, today).await?;
        tx.commit().await?;
        Ok(unlocked)
    }

    /// Buy consumables with points
    pub async fn purchase(&self, user_id: &str, item_id: &str, quantity: i64) -> Result<Purchase> {
        let _guard = self.locks.acquire(user_id).await;

        let mut tx = self.repo.begin().await?;
        let purchase = self.shop.purchase(&mut tx, user_id, item_id, quantity).await?;
        tx.commit().await?;

        Ok(purchase)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        req: UpdateProfileRequest,
    ) -> Result<UserProfile> {
        let _guard = self.locks.acquire(user_id).await;

        let mut tx = self.repo.begin().await?;
        let profile = self.profiles.update(&mut tx, user_id, &req).await?;
        tx.commit().await?;

        Ok(profile)
    }
}
