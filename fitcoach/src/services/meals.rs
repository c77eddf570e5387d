//! Meal log
//!
//! Stores food entries with their estimated nutrition and credits a
//! flat amount of points for each one. Meals feed the points ledger
//! only; they never touch trainer experience or decay.

use crate::config::{MAX_FOOD_NAME_LENGTH, MAX_MEAL_CALORIES};
use crate::database::{MealRecord, PointReason, RecordMealRequest, StoreTx};
use crate::error::{AppError, Result};
use crate::services::records::resolve_record_date;
use crate::services::settings::RewardSettings;
use chrono::NaiveDate;
use serde::Serialize;

pub fn validate_meal(req: &RecordMealRequest) -> Result<()> {
    let name = req.food_name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Food name is required".to_string()));
    }
    if name.chars().count() > MAX_FOOD_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Food name must be at most {} characters",
            MAX_FOOD_NAME_LENGTH
        )));
    }

    if let Some(calories) = req.calories {
        if !(0..=MAX_MEAL_CALORIES).contains(&calories) {
            return Err(AppError::Validation(format!(
                "Calories must be between 0 and {}",
                MAX_MEAL_CALORIES
            )));
        }
    }

    for (label, grams) in [
        ("Protein", req.protein_g),
        ("Fat", req.fat_g),
        ("Carbs", req.carbs_g),
    ] {
        if let Some(grams) = grams {
            if !grams.is_finite() || grams < 0.0 {
                return Err(AppError::Validation(format!(
                    "{} must be a non-negative amount",
                    label
                )));
            }
        }
    }

    Ok(())
}

/// A stored meal and the points it earned
#[derive(Debug, Clone, Serialize)]
pub struct MealEntry {
    pub meal: MealRecord,
    pub points_awarded: i64,
}

#[derive(Clone)]
pub struct MealService {
    settings: RewardSettings,
}

impl MealService {
    pub fn new(settings: RewardSettings) -> Self {
        Self { settings }
    }

    pub async fn record(
        &self,
        tx: &mut StoreTx,
        user_id: &str,
        req: &RecordMealRequest,
        today: NaiveDate,
    ) -> Result<MealEntry> {
        validate_meal(req)?;
        let date = resolve_record_date(req.date, today)?;

        let meal = tx.insert_meal_record(user_id, date, req).await?;

        let points_awarded = self.settings.points_per_meal;
        if points_awarded > 0 {
            tx.append_point_transaction(
                user_id,
                points_awarded,
                PointReason::MealRecord,
                &format!("Meal: {}", meal.food_name),
            )
            .await?;
        }

        tracing::info!(
            "User {} logged {:?} '{}' (+{} points)",
            user_id,
            meal.meal_type,
            meal.food_name,
            points_awarded
        );

        Ok(MealEntry {
            meal,
            points_awarded,
        })
    }

    /// Delete a logged meal. The points it earned are kept.
    pub async fn delete(&self, tx: &mut StoreTx, user_id: &str, meal_id: i64) -> Result<()> {
        if !tx.delete_meal_record(user_id, meal_id).await? {
            return Err(AppError::NotFound(format!("Meal {}", meal_id)));
        }
        tracing::info!("User {} deleted meal {}", user_id, meal_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, MealType, Repository};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn lunch(food_name: &str) -> RecordMealRequest {
        RecordMealRequest {
            date: None,
            meal_type: MealType::Lunch,
            food_name: food_name.to_string(),
            calories: Some(650),
            protein_g: Some(32.0),
            fat_g: Some(18.5),
            carbs_g: Some(80.0),
        }
    }

    #[test]
    fn test_meal_validation() {
        assert!(validate_meal(&lunch("Chicken rice bowl")).is_ok());
        assert!(validate_meal(&lunch("   ")).is_err());
        assert!(validate_meal(&lunch(&"x".repeat(MAX_FOOD_NAME_LENGTH + 1))).is_err());
        assert!(validate_meal(&RecordMealRequest {
            calories: Some(-1),
            ..lunch("Salad")
        })
        .is_err());
        assert!(validate_meal(&RecordMealRequest {
            fat_g: Some(f64::NAN),
            ..lunch("Salad")
        })
        .is_err());
        assert!(validate_meal(&RecordMealRequest {
            calories: None,
            protein_g: None,
            fat_g: None,
            carbs_g: None,
            ..lunch("Salad")
        })
        .is_ok());
    }

    #[tokio::test]
    async fn test_meal_credits_points() {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let service = MealService::new(RewardSettings::default());

        let mut tx = repo.begin().await.unwrap();
        let entry = service
            .record(&mut tx, "user-1", &lunch("  Chicken rice bowl "), day(3))
            .await
            .unwrap();
        assert!(tx
            .find_point_transaction("user-1", PointReason::MealRecord, "Meal: Chicken rice bowl")
            .await
            .unwrap());
        tx.commit().await.unwrap();

        assert_eq!(entry.points_awarded, 30);
        assert_eq!(entry.meal.food_name, "Chicken rice bowl");
        assert_eq!(entry.meal.recorded_date, day(3));
        assert_eq!(entry.meal.calories, Some(650));
        assert_eq!(repo.sum_points("user-1").await.unwrap(), 30);

        // a second entry of the same food earns again
        let mut tx = repo.begin().await.unwrap();
        service
            .record(&mut tx, "user-1", &lunch("Chicken rice bowl"), day(3))
            .await
            .unwrap();
        assert_eq!(tx.list_meal_records("user-1", day(3)).await.unwrap().len(), 2);
        tx.commit().await.unwrap();
        assert_eq!(repo.sum_points("user-1").await.unwrap(), 60);
    }

    #[tokio::test]
    async fn test_future_meal_rejected() {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let service = MealService::new(RewardSettings::default());

        let mut tx = repo.begin().await.unwrap();
        let result = service
            .record(
                &mut tx,
                "user-1",
                &RecordMealRequest {
                    date: Some(day(4)),
                    ..lunch("Soup")
                },
                day(3),
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(tx.sum_points("user-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_keeps_points() {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let service = MealService::new(RewardSettings::default());

        let mut tx = repo.begin().await.unwrap();
        let entry = service
            .record(&mut tx, "user-1", &lunch("Ramen"), day(3))
            .await
            .unwrap();

        // other users cannot delete it
        let foreign = service.delete(&mut tx, "user-2", entry.meal.id).await;
        assert!(matches!(foreign, Err(AppError::NotFound(_))));

        service.delete(&mut tx, "user-1", entry.meal.id).await.unwrap();
        assert!(tx.list_meal_records("user-1", day(3)).await.unwrap().is_empty());
        assert_eq!(tx.sum_points("user-1").await.unwrap(), 30);
    }
}
