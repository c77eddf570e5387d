//! Decay service
//!
//! Reconciles missed days into decay points inside the caller's
//! transaction. Reconciliation is driven by the stored `last_record_at`
//! and miss counters, so replaying it never charges a day twice.

use crate::database::StoreTx;
use crate::decay::{pending_misses, plan_decay, DecayOutcome};
use crate::error::Result;
use crate::services::settings::DecaySettings;
use crate::services::shop::STREAK_FREEZE;
use chrono::NaiveDate;

#[derive(Clone)]
pub struct DecayService {
    settings: DecaySettings,
}

impl DecayService {
    pub fn new(settings: DecaySettings) -> Self {
        Self { settings }
    }

    /// Reconcile the user's current trainer up to `today`.
    ///
    /// Returns `None` when there is no trainer or nothing new to reconcile.
    pub async fn reconcile(
        &self,
        tx: &mut StoreTx,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Option<DecayOutcome>> {
        let Some(state) = tx.get_trainer_state(user_id).await? else {
            tracing::debug!("No trainer for user {}, nothing to reconcile", user_id);
            return Ok(None);
        };

        let additional_miss = pending_misses(&state, today);
        if additional_miss <= 0 {
            return Ok(None);
        }

        let mut freeze_used = 0;
        for freeze_id in tx
            .list_available_consumables(user_id, STREAK_FREEZE, additional_miss)
            .await?
        {
            if tx.consume_consumable(&freeze_id).await? {
                freeze_used += 1;
            }
        }

        let outcome = plan_decay(&state, additional_miss, freeze_used, &self.settings);
        tx.update_trainer_state(user_id, &outcome.update()).await?;

        tracing::info!(
            "Reconciled {} missed day(s) for user {}: {} frozen, {} charged (+{} decay), mood {}",
            outcome.additional_miss,
            user_id,
            outcome.freeze_used,
            outcome.charged_miss,
            outcome.decay_added,
            outcome.mood
        );

        Ok(Some(outcome))
    }
}
