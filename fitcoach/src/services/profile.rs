//! Profile service
//!
//! Height and target weight, used by goal and BMI achievements.

use crate::config::{MAX_HEIGHT_CM, MIN_HEIGHT_CM};
use crate::database::{StoreTx, UpdateProfileRequest, UserProfile};
use crate::error::{AppError, Result};
use crate::services::records::validate_weight;

pub fn validate_profile(req: &UpdateProfileRequest) -> Result<()> {
    if let Some(height_cm) = req.height_cm {
        if !height_cm.is_finite() || !(MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(&height_cm) {
            return Err(AppError::Validation(format!(
                "Height must be between {} and {} cm",
                MIN_HEIGHT_CM, MAX_HEIGHT_CM
            )));
        }
    }

    if let Some(target) = req.target_weight_kg {
        validate_weight(target)?;
    }

    Ok(())
}

#[derive(Clone, Default)]
pub struct ProfileService;

impl ProfileService {
    pub fn new() -> Self {
        Self
    }

    /// Replace height and target. The first time a target is set, the
    /// latest recorded weight is kept as the start weight for weight-loss
    /// achievements.
    pub async fn update(
        &self,
        tx: &mut StoreTx,
        user_id: &str,
        req: &UpdateProfileRequest,
    ) -> Result<UserProfile> {
        validate_profile(req)?;

        let existing = tx.get_profile(user_id).await?;
        let mut start_weight_kg = existing.and_then(|p| p.start_weight_kg);
        if start_weight_kg.is_none() && req.target_weight_kg.is_some() {
            start_weight_kg = tx
                .list_weight_records(user_id, None)
                .await?
                .last()
                .map(|r| r.weight_kg);
        }

        let profile = tx
            .upsert_profile(user_id, req.height_cm, req.target_weight_kg, start_weight_kg)
            .await?;

        tracing::info!("Profile updated for user {}", user_id);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, Repository, TimeSlot};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn test_profile_validation() {
        assert!(validate_profile(&UpdateProfileRequest::default()).is_ok());
        assert!(validate_profile(&UpdateProfileRequest {
            height_cm: Some(172.0),
            target_weight_kg: Some(68.0),
        })
        .is_ok());
        assert!(validate_profile(&UpdateProfileRequest {
            height_cm: Some(40.0),
            target_weight_kg: None,
        })
        .is_err());
        assert!(validate_profile(&UpdateProfileRequest {
            height_cm: None,
            target_weight_kg: Some(500.0),
        })
        .is_err());
    }

    #[tokio::test]
    async fn test_start_weight_captured_once() {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let service = ProfileService::new();
        let mut tx = repo.begin().await.unwrap();

        // no target yet: nothing to measure from
        let profile = service
            .update(&mut tx, "user-1", &UpdateProfileRequest {
                height_cm: Some(175.0),
                target_weight_kg: None,
            })
            .await
            .unwrap();
        assert_eq!(profile.start_weight_kg, None);

        tx.upsert_weight_record("user-1", day(1), TimeSlot::Morning, 86.0)
            .await
            .unwrap();
        tx.upsert_weight_record("user-1", day(2), TimeSlot::Morning, 85.0)
            .await
            .unwrap();

        let profile = service
            .update(&mut tx, "user-1", &UpdateProfileRequest {
                height_cm: Some(175.0),
                target_weight_kg: Some(78.0),
            })
            .await
            .unwrap();
        assert_eq!(profile.start_weight_kg, Some(85.0));

        // later goal changes keep the original start weight
        tx.upsert_weight_record("user-1", day(3), TimeSlot::Morning, 83.0)
            .await
            .unwrap();
        let profile = service
            .update(&mut tx, "user-1", &UpdateProfileRequest {
                height_cm: Some(175.0),
                target_weight_kg: Some(75.0),
            })
            .await
            .unwrap();
        assert_eq!(profile.start_weight_kg, Some(85.0));
        assert_eq!(profile.target_weight_kg, Some(75.0));
    }
}
