//! Achievement service
//!
//! Builds the evaluation context from storage, runs the rule table and
//! persists newly unlocked achievements in one batch. Unlocks are
//! permanent; a rule that stops holding never revokes one.

use crate::achievements::{newly_unlocked, AchievementContext, ALL_RULES};
use crate::database::StoreTx;
use crate::error::Result;
use crate::streak::consecutive_day_streak;
use chrono::NaiveDate;

#[derive(Clone, Default)]
pub struct AchievementService;

impl AchievementService {
    pub fn new() -> Self {
        Self
    }

    /// Unlock every rule that now holds and was not unlocked before
    pub async fn evaluate(
        &self,
        tx: &mut StoreTx,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<String>> {
        let already_unlocked = tx.list_unlocked_achievement_ids(user_id).await?;

        let mut records = tx.list_weight_records(user_id, None).await?;
        let streak = consecutive_day_streak(&records, today);
        records.reverse();

        let total_points = tx.sum_points(user_id).await?;
        let level = tx
            .get_trainer_state(user_id)
            .await?
            .map(|state| state.current_level);
        let profile = tx.get_profile(user_id).await?;

        let ctx = AchievementContext {
            records: &records,
            streak,
            total_points,
            level,
            profile: profile.as_ref(),
        };

        let unlocked: Vec<String> = newly_unlocked(ALL_RULES, &ctx, &already_unlocked)
            .into_iter()
            .map(str::to_string)
            .collect();

        if !unlocked.is_empty() {
            tx.insert_achievement_unlocks(user_id, &unlocked).await?;
            tracing::info!("User {} unlocked achievements: {:?}", user_id, unlocked);
        }

        Ok(unlocked)
    }
}
