//! Consecutive-day streaks
//!
//! Streaks are recomputed from the full record history on every use,
//! so edits to old records are reflected immediately.

use crate::database::WeightRecord;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Days in a row, ending today, with at least one record of any time slot.
///
/// Zero when today has no record.
pub fn consecutive_day_streak(records: &[WeightRecord], today: NaiveDate) -> i64 {
    let days: HashSet<NaiveDate> = records.iter().map(|r| r.record_date).collect();

    let mut streak = 0;
    let mut cursor = today;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(previous) => cursor = previous,
            None => break,
        }
    }

    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::TimeSlot;
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn record(date: NaiveDate, time_slot: TimeSlot) -> WeightRecord {
        WeightRecord {
            id: 0,
            user_id: "user-1".to_string(),
            record_date: date,
            time_slot,
            weight_kg: 80.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(consecutive_day_streak(&[], day(10)), 0);
    }

    #[test]
    fn test_streak_counts_days_not_records() {
        let records = vec![
            record(day(8), TimeSlot::Morning),
            record(day(9), TimeSlot::Morning),
            record(day(9), TimeSlot::Evening),
            record(day(10), TimeSlot::Other),
        ];
        assert_eq!(consecutive_day_streak(&records, day(10)), 3);
    }

    #[test]
    fn test_gap_stops_walk() {
        let records = vec![
            record(day(5), TimeSlot::Morning),
            record(day(6), TimeSlot::Morning),
            record(day(8), TimeSlot::Morning),
            record(day(9), TimeSlot::Morning),
        ];
        assert_eq!(consecutive_day_streak(&records, day(9)), 2);
    }

    #[test]
    fn test_no_record_today_is_zero() {
        let records = vec![record(day(9), TimeSlot::Morning)];
        assert_eq!(consecutive_day_streak(&records, day(10)), 0);
    }

    #[test]
    fn test_crosses_month_boundary() {
        let records: Vec<_> = (0..10)
            .map(|offset| record(day(5) - chrono::Duration::days(offset), TimeSlot::Morning))
            .collect();
        assert_eq!(consecutive_day_streak(&records, day(5)), 10);
    }
}
