//! Transactional storage operations
//!
//! Every multi-step engine operation runs inside one `StoreTx`. Dropping
//! the transaction without calling [`StoreTx::commit`] rolls back all of
//! its writes, so a failure at any step leaves no partial state behind.

use super::models::*;
use crate::error::{AppError, Result};
use crate::progression::{Mood, STARTING_LEVEL};
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use uuid::Uuid;

/// One logical unit of work against the store
pub struct StoreTx {
    tx: Transaction<'static, Sqlite>,
}

impl StoreTx {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    // ===== Trainer state =====

    /// Current trainer state for a user
    pub async fn get_trainer_state(&mut self, user_id: &str) -> Result<Option<TrainerState>> {
        let state = sqlx::query_as::<_, TrainerState>(
            r#"
            SELECT * FROM trainer_states WHERE user_id = ? AND is_current = 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(state)
    }

    /// Stored state for a specific trainer, current or not
    pub async fn get_trainer_state_for(
        &mut self,
        user_id: &str,
        trainer_id: &str,
    ) -> Result<Option<TrainerState>> {
        let state = sqlx::query_as::<_, TrainerState>(
            r#"
            SELECT * FROM trainer_states WHERE user_id = ? AND trainer_id = ?
            "#,
        )
        .bind(user_id)
        .bind(trainer_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(state)
    }

    /// Insert a fresh, current trainer row at the starting level
    pub async fn insert_trainer_state(
        &mut self,
        user_id: &str,
        trainer_id: &str,
    ) -> Result<TrainerState> {
        let now = Utc::now();

        let state = sqlx::query_as::<_, TrainerState>(
            r#"
            INSERT INTO trainer_states (
                user_id, trainer_id, exp_points, decay_points, current_level,
                consecutive_miss, absorbed_miss, last_record_at, mood, is_current,
                created_at, updated_at
            )
            VALUES (?, ?, 0, 0, ?, 0, 0, NULL, ?, 1, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(trainer_id)
        .bind(STARTING_LEVEL)
        .bind(Mood::Motivated)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        tracing::debug!("Created trainer state {} for user {}", trainer_id, user_id);
        Ok(state)
    }

    /// Clear the current flag on every trainer row of a user
    pub async fn deactivate_trainers(&mut self, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE trainer_states SET is_current = 0, updated_at = ?
            WHERE user_id = ? AND is_current = 1
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Mark a stored trainer row as current
    pub async fn activate_trainer(&mut self, user_id: &str, trainer_id: &str) -> Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE trainer_states SET is_current = 1, updated_at = ?
            WHERE user_id = ? AND trainer_id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(trainer_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::TrainerNotSelected(user_id.to_string()));
        }

        tracing::debug!("Activated trainer {} for user {}", trainer_id, user_id);
        Ok(())
    }

    /// Partial update of the user's current trainer state
    pub async fn update_trainer_state(
        &mut self,
        user_id: &str,
        update: &TrainerStateUpdate,
    ) -> Result<()> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE trainer_states SET updated_at = ");
        query.push_bind(Utc::now());

        if let Some(exp_points) = update.exp_points {
            query.push(", exp_points = ").push_bind(exp_points);
        }
        if let Some(decay_points) = update.decay_points {
            query.push(", decay_points = ").push_bind(decay_points);
        }
        if let Some(level) = update.current_level {
            query.push(", current_level = ").push_bind(level);
        }
        if let Some(consecutive_miss) = update.consecutive_miss {
            query.push(", consecutive_miss = ").push_bind(consecutive_miss);
        }
        if let Some(absorbed_miss) = update.absorbed_miss {
            query.push(", absorbed_miss = ").push_bind(absorbed_miss);
        }
        if let Some(last_record_at) = update.last_record_at {
            query.push(", last_record_at = ").push_bind(last_record_at);
        }
        if let Some(mood) = update.mood {
            query.push(", mood = ").push_bind(mood);
        }

        query
            .push(" WHERE user_id = ")
            .push_bind(user_id)
            .push(" AND is_current = 1");

        let rows = query
            .build()
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::TrainerNotSelected(user_id.to_string()));
        }

        tracing::debug!("Updated trainer state for user {}: {:?}", user_id, update);
        Ok(())
    }

    /// Users that have a current trainer
    pub async fn list_current_trainer_users(&mut self) -> Result<Vec<String>> {
        let users: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM trainer_states WHERE is_current = 1 ORDER BY user_id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(users)
    }

    // ===== Weight records =====

    pub async fn get_weight_record(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        time_slot: TimeSlot,
    ) -> Result<Option<WeightRecord>> {
        let record = sqlx::query_as::<_, WeightRecord>(
            r#"
            SELECT * FROM weight_records
            WHERE user_id = ? AND record_date = ? AND time_slot = ?
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(time_slot)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(record)
    }

    /// Insert a record, or overwrite the weight of an existing slot
    pub async fn upsert_weight_record(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        time_slot: TimeSlot,
        weight_kg: f64,
    ) -> Result<WeightRecord> {
        let now = Utc::now();

        let record = sqlx::query_as::<_, WeightRecord>(
            r#"
            INSERT INTO weight_records (user_id, record_date, time_slot, weight_kg, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, record_date, time_slot) DO UPDATE SET
                weight_kg = excluded.weight_kg,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(time_slot)
        .bind(weight_kg)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        tracing::debug!(
            "Stored {} weight for user {} on {}: {} kg",
            time_slot,
            user_id,
            date,
            weight_kg
        );
        Ok(record)
    }

    /// Records ordered by date, then time slot, ascending
    pub async fn list_weight_records(
        &mut self,
        user_id: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<WeightRecord>> {
        let records = sqlx::query_as::<_, WeightRecord>(
            r#"
            SELECT * FROM weight_records
            WHERE user_id = ? AND (? IS NULL OR record_date >= ?)
            ORDER BY record_date ASC,
                CASE time_slot WHEN 'morning' THEN 0 WHEN 'evening' THEN 1 ELSE 2 END ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(records)
    }

    // ===== Meals =====

    pub async fn insert_meal_record(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        req: &RecordMealRequest,
    ) -> Result<MealRecord> {
        let record = sqlx::query_as::<_, MealRecord>(
            r#"
            INSERT INTO meal_records
                (user_id, recorded_date, meal_type, food_name, calories, protein_g, fat_g, carbs_g, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(req.meal_type)
        .bind(req.food_name.trim())
        .bind(req.calories)
        .bind(req.protein_g)
        .bind(req.fat_g)
        .bind(req.carbs_g)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?;

        tracing::debug!("Logged {:?} for user {} on {}", record.meal_type, user_id, date);
        Ok(record)
    }

    /// Meals of one day, in the order they were logged
    pub async fn list_meal_records(
        &mut self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<MealRecord>> {
        let records = sqlx::query_as::<_, MealRecord>(
            "SELECT * FROM meal_records WHERE user_id = ? AND recorded_date = ? ORDER BY id ASC",
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(records)
    }

    /// Remove one of the user's meals. Points already credited stay.
    pub async fn delete_meal_record(&mut self, user_id: &str, meal_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM meal_records WHERE id = ? AND user_id = ?")
            .bind(meal_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ===== Points ledger =====

    pub async fn append_point_transaction(
        &mut self,
        user_id: &str,
        delta: i64,
        reason: PointReason,
        description: &str,
    ) -> Result<PointTransaction> {
        let transaction = sqlx::query_as::<_, PointTransaction>(
            r#"
            INSERT INTO point_transactions (user_id, delta, reason, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .bind(reason)
        .bind(description)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?;

        tracing::debug!(
            "Point transaction for user {}: {:+} ({:?})",
            user_id,
            delta,
            reason
        );
        Ok(transaction)
    }

    /// Balance derived from the ledger
    pub async fn sum_points(&mut self, user_id: &str) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM point_transactions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    pub async fn find_point_transaction(
        &mut self,
        user_id: &str,
        reason: PointReason,
        description: &str,
    ) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1 FROM point_transactions
            WHERE user_id = ? AND reason = ? AND description = ?
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(reason)
        .bind(description)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(found.is_some())
    }

    // ===== Consumables =====

    pub async fn insert_consumable(&mut self, user_id: &str, item_id: &str) -> Result<Consumable> {
        let id = Uuid::new_v4().to_string();

        let consumable = sqlx::query_as::<_, Consumable>(
            r#"
            INSERT INTO consumables (id, user_id, item_id, purchased_at, used_at)
            VALUES (?, ?, ?, ?, NULL)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(item_id)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?;

        tracing::debug!("Created consumable {} ({}) for user {}", id, item_id, user_id);
        Ok(consumable)
    }

    /// Oldest unused consumables first
    pub async fn list_available_consumables(
        &mut self,
        user_id: &str,
        item_id: &str,
        limit: i64,
    ) -> Result<Vec<String>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM consumables
            WHERE user_id = ? AND item_id = ? AND used_at IS NULL
            ORDER BY purchased_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    pub async fn count_available_consumables(&mut self, user_id: &str, item_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM consumables
            WHERE user_id = ? AND item_id = ? AND used_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    /// Spend a consumable. Returns `false` if it was already used.
    pub async fn consume_consumable(&mut self, consumable_id: &str) -> Result<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE consumables SET used_at = ? WHERE id = ? AND used_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(consumable_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows == 1 {
            tracing::debug!("Consumed consumable {}", consumable_id);
        }
        Ok(rows == 1)
    }

    // ===== Achievements =====

    pub async fn list_unlocked_achievement_ids(&mut self, user_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT achievement_id FROM achievement_unlocks
            WHERE user_id = ? ORDER BY unlocked_at ASC, achievement_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    /// Existing unlocks are left untouched
    pub async fn insert_achievement_unlocks(
        &mut self,
        user_id: &str,
        achievement_ids: &[String],
    ) -> Result<()> {
        let now = Utc::now();

        for achievement_id in achievement_ids {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO achievement_unlocks (user_id, achievement_id, unlocked_at)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(achievement_id)
            .bind(now)
            .execute(&mut *self.tx)
            .await?;
        }

        tracing::debug!(
            "Unlocked {} achievement(s) for user {}",
            achievement_ids.len(),
            user_id
        );
        Ok(())
    }

    // ===== Profile =====

    pub async fn get_profile(&mut self, user_id: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT * FROM user_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(profile)
    }

    pub async fn upsert_profile(
        &mut self,
        user_id: &str,
        height_cm: Option<f64>,
        target_weight_kg: Option<f64>,
        start_weight_kg: Option<f64>,
    ) -> Result<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, height_cm, target_weight_kg, start_weight_kg, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                height_cm = excluded.height_cm,
                target_weight_kg = excluded.target_weight_kg,
                start_weight_kg = excluded.start_weight_kg,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(height_cm)
        .bind(target_weight_kg)
        .bind(start_weight_kg)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?;

        tracing::debug!("Updated profile for user {}", user_id);
        Ok(profile)
    }
}
