//! Record ledger
//!
//! Applies one weight submission: stores the record and, for a slot
//! that had no record yet, awards experience and points, detects
//! level-ups and pays streak milestone bonuses. Re-submitting a slot
//! only overwrites the stored weight.

use crate::config::{MAX_WEIGHT_KG, MIN_WEIGHT_KG};
use crate::database::{
    PointReason, RecordWeightRequest, StoreTx, TrainerStateUpdate, WeightRecord,
};
use crate::decay::counters_after_record;
use crate::error::{AppError, Result};
use crate::progression::{level_from_score, milestone_for_streak, mood_from_consecutive_miss, streak_bonus_key};
use crate::services::settings::RewardSettings;
use crate::services::shop::EXP_BOOST;
use crate::streak::consecutive_day_streak;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelUp {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakBonus {
    pub days: i64,
    pub bonus: i64,
}

/// What the ledger did with one submission
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub record: WeightRecord,
    pub is_new_record: bool,
    /// False for re-submissions and for users without a trainer
    pub rewarded: bool,
    pub exp_gained: i64,
    pub boost_used: bool,
    pub points_awarded: i64,
    pub level_up: Option<LevelUp>,
    pub streak: i64,
    pub streak_bonus: Option<StreakBonus>,
}

impl LedgerEntry {
    fn unrewarded(record: WeightRecord, is_new_record: bool) -> Self {
        Self {
            record,
            is_new_record,
            rewarded: false,
            exp_gained: 0,
            boost_used: false,
            points_awarded: 0,
            level_up: None,
            streak: 0,
            streak_bonus: None,
        }
    }
}

/// Weights must lie strictly inside the configured range
pub fn validate_weight(weight_kg: f64) -> Result<()> {
    if !weight_kg.is_finite() || weight_kg <= MIN_WEIGHT_KG || weight_kg >= MAX_WEIGHT_KG {
        return Err(AppError::Validation(format!(
            "Weight must be between {} and {} kg",
            MIN_WEIGHT_KG, MAX_WEIGHT_KG
        )));
    }
    Ok(())
}

/// Record date, defaulting to today. Future dates are rejected.
pub fn resolve_record_date(date: Option<NaiveDate>, today: NaiveDate) -> Result<NaiveDate> {
    let date = date.unwrap_or(today);
    if date > today {
        return Err(AppError::Validation(
            "Record date cannot be in the future".to_string(),
        ));
    }
    Ok(date)
}

#[derive(Clone)]
pub struct RecordService {
    settings: RewardSettings,
}

impl RecordService {
    pub fn new(settings: RewardSettings) -> Self {
        Self { settings }
    }

    /// Apply a submission inside the caller's transaction.
    ///
    /// Experience, the ledger credit and the trainer update share `tx`,
    /// so they commit or roll back together.
    pub async fn apply(
        &self,
        tx: &mut StoreTx,
        user_id: &str,
        req: &RecordWeightRequest,
        today: NaiveDate,
    ) -> Result<LedgerEntry> {
        validate_weight(req.weight_kg)?;
        let date = resolve_record_date(req.date, today)?;

        let is_new_record = tx
            .get_weight_record(user_id, date, req.time_slot)
            .await?
            .is_none();

        let record = tx
            .upsert_weight_record(user_id, date, req.time_slot, req.weight_kg)
            .await?;

        if !is_new_record {
            tracing::info!(
                "Updated existing {} record for user {} on {}, no rewards",
                req.time_slot,
                user_id,
                date
            );
            return Ok(LedgerEntry::unrewarded(record, false));
        }

        let Some(state) = tx.get_trainer_state(user_id).await? else {
            tracing::warn!("User {} has no trainer selected, record stored without rewards", user_id);
            return Ok(LedgerEntry::unrewarded(record, true));
        };

        // Boost is spent even if nothing else comes of this record
        let mut boost_used = false;
        if let Some(boost_id) = tx
            .list_available_consumables(user_id, EXP_BOOST, 1)
            .await?
            .into_iter()
            .next()
        {
            boost_used = tx.consume_consumable(&boost_id).await?;
        }
        let multiplier = if boost_used {
            self.settings.boost_multiplier
        } else {
            1
        };

        let exp_gained = self.settings.exp_per_record * multiplier;
        let exp_points = state.exp_points + exp_gained;
        let new_level = level_from_score(exp_points - state.decay_points);
        let last_record_at = state.last_record_at.map_or(date, |last| last.max(date));
        let (consecutive_miss, absorbed_miss) =
            counters_after_record(&state, last_record_at, today);

        tx.update_trainer_state(
            user_id,
            &TrainerStateUpdate {
                exp_points: Some(exp_points),
                current_level: Some(new_level),
                consecutive_miss: Some(consecutive_miss),
                absorbed_miss: Some(absorbed_miss),
                last_record_at: Some(last_record_at),
                mood: Some(mood_from_consecutive_miss(consecutive_miss)),
                ..Default::default()
            },
        )
        .await?;

        let points_awarded = self.settings.points_per_record;
        tx.append_point_transaction(
            user_id,
            points_awarded,
            PointReason::WeightRecord,
            &format!("{} {} weigh-in", date, req.time_slot),
        )
        .await?;

        let level_up = (new_level > state.current_level).then_some(LevelUp {
            from: state.current_level,
            to: new_level,
        });
        if let Some(level_up) = level_up {
            tracing::info!("User {} levelled up: {} -> {}", user_id, level_up.from, level_up.to);
        }

        let history = tx.list_weight_records(user_id, None).await?;
        let streak = consecutive_day_streak(&history, today);

        let mut streak_bonus = None;
        if let Some(milestone) = milestone_for_streak(streak) {
            let key = streak_bonus_key(milestone.days, today);
            if tx
                .find_point_transaction(user_id, PointReason::StreakBonus, &key)
                .await?
            {
                tracing::debug!("Streak bonus {} already paid for user {}", key, user_id);
            } else {
                tx.append_point_transaction(user_id, milestone.bonus, PointReason::StreakBonus, &key)
                    .await?;
                tracing::info!(
                    "User {} reached a {}-day streak, +{} points",
                    user_id,
                    milestone.days,
                    milestone.bonus
                );
                streak_bonus = Some(StreakBonus {
                    days: milestone.days,
                    bonus: milestone.bonus,
                });
            }
        }

        tracing::info!(
            "Recorded {} weight for user {} on {}: +{} exp{}, +{} points",
            req.time_slot,
            user_id,
            date,
            exp_gained,
            if boost_used { " (boosted)" } else { "" },
            points_awarded
        );

        Ok(LedgerEntry {
            record,
            is_new_record: true,
            rewarded: true,
            exp_gained,
            boost_used,
            points_awarded,
            level_up,
            streak,
            streak_bonus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, Repository, TimeSlot};
    use chrono::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn request(date: Option<NaiveDate>, time_slot: TimeSlot, weight_kg: f64) -> RecordWeightRequest {
        RecordWeightRequest {
            date,
            time_slot,
            weight_kg,
        }
    }

    async fn setup() -> (RecordService, Repository) {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let mut tx = repo.begin().await.unwrap();
        tx.insert_trainer_state("user-1", "coach_a").await.unwrap();
        tx.commit().await.unwrap();
        (RecordService::new(RewardSettings::default()), repo)
    }

    async fn submit(
        service: &RecordService,
        repo: &Repository,
        req: RecordWeightRequest,
        today: NaiveDate,
    ) -> Result<LedgerEntry> {
        let mut tx = repo.begin().await?;
        let entry = service.apply(&mut tx, "user-1", &req, today).await?;
        tx.commit().await?;
        Ok(entry)
    }

    #[test]
    fn test_weight_validation() {
        assert!(validate_weight(80.0).is_ok());
        assert!(validate_weight(20.5).is_ok());
        assert!(validate_weight(20.0).is_err());
        assert!(validate_weight(300.0).is_err());
        assert!(validate_weight(-5.0).is_err());
        assert!(validate_weight(f64::NAN).is_err());
        assert!(validate_weight(f64::INFINITY).is_err());
    }

    #[test]
    fn test_record_date_resolution() {
        assert_eq!(resolve_record_date(None, day(10)).unwrap(), day(10));
        assert_eq!(resolve_record_date(Some(day(3)), day(10)).unwrap(), day(3));
        assert!(resolve_record_date(Some(day(11)), day(10)).is_err());
    }

    #[tokio::test]
    async fn test_first_record_rewards() {
        let (service, repo) = setup().await;

        let entry = submit(&service, &repo, request(None, TimeSlot::Morning, 82.3), day(10))
            .await
            .unwrap();

        assert!(entry.is_new_record);
        assert!(entry.rewarded);
        assert_eq!(entry.exp_gained, 10);
        assert_eq!(entry.points_awarded, 50);
        assert_eq!(entry.streak, 1);
        assert!(entry.level_up.is_none());

        let state = repo.get_trainer_state("user-1").await.unwrap().unwrap();
        assert_eq!(state.exp_points, 10);
        assert_eq!(state.consecutive_miss, 0);
        assert_eq!(state.last_record_at, Some(day(10)));
        assert_eq!(state.current_level, level_from_score(10));
        assert_eq!(repo.sum_points("user-1").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_resubmission_updates_value_only() {
        let (service, repo) = setup().await;

        submit(&service, &repo, request(None, TimeSlot::Morning, 82.3), day(10))
            .await
            .unwrap();
        let again = submit(&service, &repo, request(None, TimeSlot::Morning, 81.9), day(10))
            .await
            .unwrap();

        assert!(!again.is_new_record);
        assert!(!again.rewarded);
        assert_eq!(again.record.weight_kg, 81.9);
        assert!(again.level_up.is_none());
        assert!(again.streak_bonus.is_none());

        let state = repo.get_trainer_state("user-1").await.unwrap().unwrap();
        assert_eq!(state.exp_points, 10);
        assert_eq!(repo.sum_points("user-1").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_invalid_weight_mutates_nothing() {
        let (service, repo) = setup().await;

        let result = submit(&service, &repo, request(None, TimeSlot::Morning, 350.0), day(10)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert!(repo.list_weight_records("user-1").await.unwrap().is_empty());
        assert_eq!(repo.sum_points("user-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_without_trainer_record_is_stored_unrewarded() {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let service = RecordService::new(RewardSettings::default());

        let mut tx = repo.begin().await.unwrap();
        let entry = service
            .apply(&mut tx, "user-2", &request(None, TimeSlot::Other, 70.0), day(10))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(entry.is_new_record);
        assert!(!entry.rewarded);
        assert_eq!(repo.list_weight_records("user-2").await.unwrap().len(), 1);
        assert_eq!(repo.sum_points("user-2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_boost_doubles_once() {
        let (service, repo) = setup().await;

        let mut tx = repo.begin().await.unwrap();
        tx.insert_consumable("user-1", EXP_BOOST).await.unwrap();
        tx.commit().await.unwrap();

        let morning = submit(&service, &repo, request(None, TimeSlot::Morning, 80.0), day(10))
            .await
            .unwrap();
        assert!(morning.boost_used);
        assert_eq!(morning.exp_gained, 20);

        let evening = submit(&service, &repo, request(None, TimeSlot::Evening, 80.4), day(10))
            .await
            .unwrap();
        assert!(!evening.boost_used);
        assert_eq!(evening.exp_gained, 10);

        let state = repo.get_trainer_state("user-1").await.unwrap().unwrap();
        assert_eq!(state.exp_points, 30);
        assert_eq!(
            repo.count_available_consumables("user-1", EXP_BOOST)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_level_up_detected() {
        let (service, repo) = setup().await;

        let mut tx = repo.begin().await.unwrap();
        tx.update_trainer_state(
            "user-1",
            &TrainerStateUpdate {
                exp_points: Some(95),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let entry = submit(&service, &repo, request(None, TimeSlot::Morning, 80.0), day(10))
            .await
            .unwrap();
        assert_eq!(entry.level_up, Some(LevelUp { from: 1, to: 3 }));
    }

    #[tokio::test]
    async fn test_seven_day_streak_bonus_fires_once() {
        let (service, repo) = setup().await;
        let start = day(1);

        let mut bonuses = Vec::new();
        for offset in 0..8 {
            let today = start + Duration::days(offset);
            let entry = submit(&service, &repo, request(None, TimeSlot::Morning, 80.0), today)
                .await
                .unwrap();
            bonuses.push(entry.streak_bonus);
        }

        assert_eq!(bonuses[6], Some(StreakBonus { days: 7, bonus: 500 }));
        assert_eq!(bonuses.iter().filter(|b| b.is_some()).count(), 1);

        // 8 records at 50 points plus one 500 bonus
        assert_eq!(repo.sum_points("user-1").await.unwrap(), 8 * 50 + 500);
    }

    #[tokio::test]
    async fn test_streak_bonus_deduplicated_on_same_date() {
        let (service, repo) = setup().await;

        for d in 1..=7 {
            submit(&service, &repo, request(None, TimeSlot::Morning, 80.0), day(d))
                .await
                .unwrap();
        }

        // A second new slot on day 7 keeps the streak at 7 but must not pay again
        let evening = submit(&service, &repo, request(None, TimeSlot::Evening, 80.2), day(7))
            .await
            .unwrap();
        assert!(evening.rewarded);
        assert_eq!(evening.streak, 7);
        assert!(evening.streak_bonus.is_none());

        assert_eq!(repo.sum_points("user-1").await.unwrap(), 8 * 50 + 500);
    }

    #[tokio::test]
    async fn test_backdated_record_keeps_latest_date() {
        let (service, repo) = setup().await;

        submit(&service, &repo, request(None, TimeSlot::Morning, 80.0), day(10))
            .await
            .unwrap();
        submit(&service, &repo, request(Some(day(8)), TimeSlot::Morning, 80.5), day(10))
            .await
            .unwrap();

        let state = repo.get_trainer_state("user-1").await.unwrap().unwrap();
        assert_eq!(state.last_record_at, Some(day(10)));
        assert_eq!(state.exp_points, 20);
    }

    #[tokio::test]
    async fn test_backfilled_streak_pays_once_per_day() {
        let (service, repo) = setup().await;

        for d in [4, 5, 6, 8, 9, 10] {
            submit(&service, &repo, request(None, TimeSlot::Morning, 80.0), day(d))
                .await
                .unwrap();
        }

        // filling the gap on day 7 completes a 7-day streak ending today
        let backfill = submit(&service, &repo, request(Some(day(7)), TimeSlot::Morning, 80.0), day(10))
            .await
            .unwrap();
        assert_eq!(backfill.streak, 7);
        assert_eq!(backfill.streak_bonus, Some(StreakBonus { days: 7, bonus: 500 }));

        let evening = submit(&service, &repo, request(None, TimeSlot::Evening, 80.3), day(10))
            .await
            .unwrap();
        assert_eq!(evening.streak, 7);
        assert!(evening.streak_bonus.is_none());

        assert_eq!(repo.sum_points("user-1").await.unwrap(), 8 * 50 + 500);
    }
}
