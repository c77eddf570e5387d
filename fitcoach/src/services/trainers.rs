//! Trainer selection
//!
//! A user has exactly one current trainer. Switching keeps the previous
//! trainer's row intact so switching back resumes where it left off.

use crate::config::MAX_TRAINER_ID_LENGTH;
use crate::database::{StoreTx, TrainerState};
use crate::error::{AppError, Result};

/// Trainer ids are short lowercase slugs
pub fn validate_trainer_id(trainer_id: &str) -> Result<()> {
    let valid_chars = trainer_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

    if trainer_id.is_empty() || trainer_id.len() > MAX_TRAINER_ID_LENGTH || !valid_chars {
        return Err(AppError::Validation(format!(
            "Trainer id must be 1-{} characters of a-z, 0-9, '_' or '-'",
            MAX_TRAINER_ID_LENGTH
        )));
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct TrainerService;

impl TrainerService {
    pub fn new() -> Self {
        Self
    }

    /// Make `trainer_id` the user's current trainer
    pub async fn select(
        &self,
        tx: &mut StoreTx,
        user_id: &str,
        trainer_id: &str,
    ) -> Result<TrainerState> {
        validate_trainer_id(trainer_id)?;

        if let Some(current) = tx.get_trainer_state(user_id).await? {
            if current.trainer_id == trainer_id {
                return Ok(current);
            }
        }

        tx.deactivate_trainers(user_id).await?;

        let state = match tx.get_trainer_state_for(user_id, trainer_id).await? {
            Some(_) => {
                tx.activate_trainer(user_id, trainer_id).await?;
                tracing::info!("User {} switched back to trainer {}", user_id, trainer_id);
                tx.get_trainer_state(user_id)
                    .await?
                    .ok_or_else(|| AppError::TrainerNotSelected(user_id.to_string()))?
            }
            None => {
                tracing::info!("User {} selected new trainer {}", user_id, trainer_id);
                tx.insert_trainer_state(user_id, trainer_id).await?
            }
        };

        Ok(state)
    }
}
