//! Decay planning
//!
//! Turns the gap between a trainer's last record and today into decay
//! points. The functions here are pure; `services::decay` supplies the
//! freeze inventory and persists the outcome.

use crate::database::{TrainerState, TrainerStateUpdate};
use crate::progression::{level_from_score, mood_from_consecutive_miss, Mood};
use crate::services::settings::DecaySettings;
use chrono::NaiveDate;
use serde::Serialize;

/// Full days strictly between the last record and today.
///
/// Neither the day of the last record nor today counts as a miss.
pub fn expected_miss(last_record_at: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match last_record_at {
        Some(last) => ((today - last).num_days() - 1).max(0),
        None => 0,
    }
}

/// Missed days not yet reflected in the stored state
pub fn pending_misses(state: &TrainerState, today: NaiveDate) -> i64 {
    let expected = expected_miss(state.last_record_at, today);
    (expected - state.consecutive_miss - state.absorbed_miss).max(0)
}

/// Miss counters after a new record moves `last_record_at` to `new_last`.
///
/// Days after `new_last` that were already charged or absorbed stay
/// accounted for, and days still pending stay pending, so a back-dated
/// record never makes a charged day chargeable again. A record for
/// today clears both counters.
pub fn counters_after_record(
    state: &TrainerState,
    new_last: NaiveDate,
    today: NaiveDate,
) -> (i64, i64) {
    let expected = expected_miss(Some(new_last), today);
    let pending = pending_misses(state, today).min(expected);
    let accounted = expected - pending;
    let consecutive_miss = state.consecutive_miss.min(accounted);
    (consecutive_miss, accounted - consecutive_miss)
}

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecayOutcome {
    pub additional_miss: i64,
    pub freeze_used: i64,
    /// Misses charged as decay after freezes and the cap
    pub charged_miss: i64,
    pub decay_added: i64,
    pub decay_points: i64,
    pub consecutive_miss: i64,
    pub absorbed_miss: i64,
    pub mood: Mood,
    pub level: i64,
}

impl DecayOutcome {
    pub fn update(&self) -> TrainerStateUpdate {
        TrainerStateUpdate {
            decay_points: Some(self.decay_points),
            current_level: Some(self.level),
            consecutive_miss: Some(self.consecutive_miss),
            absorbed_miss: Some(self.absorbed_miss),
            mood: Some(self.mood),
            ..Default::default()
        }
    }
}

/// Apply `additional_miss` new misses, `freeze_used` of which were cancelled by freezes.
///
/// Misses beyond the per-reconciliation cap are dropped rather than charged,
/// and are remembered as absorbed so they are never charged later.
pub fn plan_decay(
    state: &TrainerState,
    additional_miss: i64,
    freeze_used: i64,
    settings: &DecaySettings,
) -> DecayOutcome {
    let additional_miss = additional_miss.max(0);
    let freeze_used = freeze_used.clamp(0, additional_miss);
    let actual_miss = additional_miss - freeze_used;

    let mut decay_points = state.decay_points;
    let mut consecutive_miss = state.consecutive_miss;
    let mut absorbed_miss = state.absorbed_miss + freeze_used;
    let mut mood = state.mood;
    let mut charged_miss = 0;

    if actual_miss > 0 {
        charged_miss = actual_miss.min(settings.max_missed_days_per_reconcile);
        absorbed_miss += actual_miss - charged_miss;
        decay_points += settings.points_per_missed_day * charged_miss;
        consecutive_miss += charged_miss;
        mood = mood_from_consecutive_miss(consecutive_miss);
    }

    DecayOutcome {
        additional_miss,
        freeze_used,
        charged_miss,
        decay_added: decay_points - state.decay_points,
        decay_points,
        consecutive_miss,
        absorbed_miss,
        mood,
        level: level_from_score(state.exp_points - decay_points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn state(last: Option<NaiveDate>, consecutive_miss: i64) -> TrainerState {
        TrainerState {
            user_id: "user-1".to_string(),
            trainer_id: "coach_a".to_string(),
            exp_points: 100,
            decay_points: 0,
            current_level: 3,
            consecutive_miss,
            absorbed_miss: 0,
            last_record_at: last,
            mood: Mood::Motivated,
            is_current: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_expected_miss() {
        assert_eq!(expected_miss(None, day(10)), 0);
        assert_eq!(expected_miss(Some(day(10)), day(10)), 0);
        assert_eq!(expected_miss(Some(day(9)), day(10)), 0);
        assert_eq!(expected_miss(Some(day(8)), day(10)), 1);
        assert_eq!(expected_miss(Some(day(6)), day(10)), 3);
        // a last record in the future never produces misses
        assert_eq!(expected_miss(Some(day(12)), day(10)), 0);
    }

    #[test]
    fn test_pending_misses_subtracts_applied() {
        let s = state(Some(day(1)), 3);
        // 8 expected, 3 already applied
        assert_eq!(pending_misses(&s, day(10)), 5);

        let s = state(Some(day(8)), 3);
        assert_eq!(pending_misses(&s, day(10)), 0);
    }

    #[test]
    fn test_plan_without_freezes() {
        let s = state(Some(day(6)), 0);
        let outcome = plan_decay(&s, 3, 0, &DecaySettings::default());

        assert_eq!(outcome.charged_miss, 3);
        assert_eq!(outcome.decay_added, 15);
        assert_eq!(outcome.consecutive_miss, 3);
        assert_eq!(outcome.mood, Mood::Concerned);
        assert_eq!(outcome.level, level_from_score(85));
    }

    #[test]
    fn test_freezes_absorb_misses() {
        let s = state(Some(day(4)), 0);
        let outcome = plan_decay(&s, 5, 2, &DecaySettings::default());

        assert_eq!(outcome.freeze_used, 2);
        assert_eq!(outcome.charged_miss, 3);
        assert_eq!(outcome.decay_added, 15);
        assert_eq!(outcome.consecutive_miss, 3);
        assert_eq!(outcome.absorbed_miss, 2);
    }

    #[test]
    fn test_all_misses_frozen_keeps_mood() {
        let mut s = state(Some(day(7)), 0);
        s.mood = Mood::Normal;
        let outcome = plan_decay(&s, 2, 5, &DecaySettings::default());

        assert_eq!(outcome.freeze_used, 2);
        assert_eq!(outcome.charged_miss, 0);
        assert_eq!(outcome.decay_added, 0);
        assert_eq!(outcome.consecutive_miss, 0);
        assert_eq!(outcome.absorbed_miss, 2);
        assert_eq!(outcome.mood, Mood::Normal);
    }

    #[test]
    fn test_cap_limits_charge() {
        let s = state(Some(day(1)), 0);
        let outcome = plan_decay(&s, 40, 0, &DecaySettings::default());

        assert_eq!(outcome.charged_miss, 30);
        assert_eq!(outcome.decay_added, 150);
        assert_eq!(outcome.consecutive_miss, 30);
        assert_eq!(outcome.absorbed_miss, 10);
        assert_eq!(outcome.mood, Mood::Angry);
    }

    #[test]
    fn test_replay_after_plan_is_noop() {
        let mut s = state(Some(day(1)), 0);
        let today = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let pending = pending_misses(&s, today);
        let outcome = plan_decay(&s, pending, 1, &DecaySettings::default());

        s.decay_points = outcome.decay_points;
        s.consecutive_miss = outcome.consecutive_miss;
        s.absorbed_miss = outcome.absorbed_miss;

        assert_eq!(pending_misses(&s, today), 0);
    }

    #[test]
    fn test_record_today_clears_counters() {
        let s = state(Some(day(1)), 8);
        assert_eq!(counters_after_record(&s, day(10), day(10)), (0, 0));
    }

    #[test]
    fn test_backdated_record_keeps_charged_days_accounted() {
        // day 1 record, reconciled on day 10: days 2..=9 charged
        let s = state(Some(day(1)), 8);
        let (consecutive_miss, absorbed_miss) = counters_after_record(&s, day(5), day(10));
        assert_eq!((consecutive_miss, absorbed_miss), (4, 0));

        let mut after = s.clone();
        after.last_record_at = Some(day(5));
        after.consecutive_miss = consecutive_miss;
        after.absorbed_miss = absorbed_miss;
        assert_eq!(pending_misses(&after, day(10)), 0);
    }

    #[test]
    fn test_backdated_record_splits_frozen_days() {
        // 8 missed days, 6 of them frozen
        let mut s = state(Some(day(1)), 2);
        s.absorbed_miss = 6;
        let (consecutive_miss, absorbed_miss) = counters_after_record(&s, day(5), day(10));
        assert_eq!(consecutive_miss + absorbed_miss, 4);
        assert_eq!(consecutive_miss, 2);
    }

    #[test]
    fn test_backdated_record_leaves_pending_days_pending() {
        // nothing reconciled yet: 8 pending
        let s = state(Some(day(1)), 0);
        assert_eq!(counters_after_record(&s, day(5), day(10)), (0, 0));

        let mut after = s.clone();
        after.last_record_at = Some(day(5));
        assert_eq!(pending_misses(&after, day(10)), 4);
    }
}
