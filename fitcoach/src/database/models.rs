//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization to the presentation layer.

use crate::error::AppError;
use crate::progression::Mood;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// Per-user, per-trainer progression state
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainerState {
    pub user_id: String,
    pub trainer_id: String,
    pub exp_points: i64,
    pub decay_points: i64,
    pub current_level: i64,
    /// Missed days charged as decay since the last record
    pub consecutive_miss: i64,
    /// Missed days absorbed by freezes or dropped by the decay cap
    pub absorbed_miss: i64,
    pub last_record_at: Option<NaiveDate>,
    pub mood: Mood,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainerState {
    /// Experience minus decay. May be negative.
    pub fn net_score(&self) -> i64 {
        self.exp_points - self.decay_points
    }
}

/// Partial update of the current trainer state; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TrainerStateUpdate {
    pub exp_points: Option<i64>,
    pub decay_points: Option<i64>,
    pub current_level: Option<i64>,
    pub consecutive_miss: Option<i64>,
    pub absorbed_miss: Option<i64>,
    pub last_record_at: Option<NaiveDate>,
    pub mood: Option<Mood>,
}

/// Time of day a weight was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Evening,
    Other,
}

impl TimeSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Evening => "evening",
            TimeSlot::Other => "other",
        }
    }
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(TimeSlot::Morning),
            "evening" => Ok(TimeSlot::Evening),
            "other" => Ok(TimeSlot::Other),
            other => Err(AppError::Validation(format!("Unknown time slot: {}", other))),
        }
    }
}

/// A single weigh-in
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeightRecord {
    pub id: i64,
    pub user_id: String,
    pub record_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub weight_kg: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Record weight request
#[derive(Debug, Clone, Deserialize)]
pub struct RecordWeightRequest {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub time_slot: TimeSlot,
    pub weight_kg: f64,
}

/// Which meal of the day a food entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// A logged meal with its estimated nutrition
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealRecord {
    pub id: i64,
    pub user_id: String,
    pub recorded_date: NaiveDate,
    pub meal_type: MealType,
    pub food_name: String,
    pub calories: Option<i64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Record meal request. Nutrition comes from whatever estimated it.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordMealRequest {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub meal_type: MealType,
    pub food_name: String,
    pub calories: Option<i64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub carbs_g: Option<f64>,
}

/// Why a point transaction was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PointReason {
    WeightRecord,
    MealRecord,
    StreakBonus,
    ShopPurchase,
    BonusPack,
}

/// Append-only points ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PointTransaction {
    pub id: i64,
    pub user_id: String,
    pub delta: i64,
    pub reason: PointReason,
    /// Free text. Streak bonuses use it as a deduplication key.
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Owned single-use item; spent once `used_at` is set
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Consumable {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub purchased_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

/// Permanently unlocked achievement
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AchievementUnlock {
    pub user_id: String,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Body data used by goal and BMI achievements
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: String,
    pub height_cm: Option<f64>,
    pub target_weight_kg: Option<f64>,
    /// Latest weight when a target was first set
    pub start_weight_kg: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// Update profile request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub height_cm: Option<f64>,
    pub target_weight_kg: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_slot_parsing() {
        assert_eq!("morning".parse::<TimeSlot>().unwrap(), TimeSlot::Morning);
        assert_eq!(" Evening ".parse::<TimeSlot>().unwrap(), TimeSlot::Evening);
        assert_eq!("other".parse::<TimeSlot>().unwrap(), TimeSlot::Other);

        let err = "noon".parse::<TimeSlot>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_point_reason_serializes_snake_case() {
        let json = serde_json::to_string(&PointReason::StreakBonus).unwrap();
        assert_eq!(json, "\"streak_bonus\"");
    }
}
