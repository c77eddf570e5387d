//! Progression rules
//!
//! Pure mappings from scores and counters to levels, moods and
//! streak milestones. Every function here is total: it is defined
//! for any input value, including negative scores.

use serde::{Deserialize, Serialize};

/// One tier of the level table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelTier {
    pub level: i64,
    pub name: &'static str,
    /// Minimum net score required to reach this tier
    pub threshold: i64,
}

/// Canonical level table, sorted ascending by threshold.
///
/// The floor tier uses `i64::MIN` so that every net score maps to a tier.
pub const LEVEL_TABLE: &[LevelTier] = &[
    LevelTier { level: -10, name: "zombie", threshold: i64::MIN },
    LevelTier { level: -5, name: "on the brink", threshold: -500 },
    LevelTier { level: -3, name: "falling apart", threshold: -200 },
    LevelTier { level: -1, name: "slipping", threshold: -50 },
    LevelTier { level: 1, name: "apprentice trainer", threshold: 0 },
    LevelTier { level: 3, name: "competent", threshold: 100 },
    LevelTier { level: 5, name: "seasoned trainer", threshold: 300 },
    LevelTier { level: 10, name: "senior trainer", threshold: 700 },
    LevelTier { level: 12, name: "elite", threshold: 1200 },
    LevelTier { level: 15, name: "master", threshold: 1800 },
    LevelTier { level: 18, name: "grandmaster", threshold: 2500 },
    LevelTier { level: 20, name: "legend", threshold: 3500 },
    LevelTier { level: 25, name: "superhuman", threshold: 5000 },
    LevelTier { level: 30, name: "mythic", threshold: 7500 },
];

/// Level assigned to a freshly selected trainer
pub const STARTING_LEVEL: i64 = 1;

fn tier_index(net_score: i64) -> usize {
    // partition_point returns the number of tiers with threshold <= score;
    // the floor tier always qualifies, so the result is at least 1.
    LEVEL_TABLE
        .partition_point(|tier| tier.threshold <= net_score)
        .saturating_sub(1)
}

/// Highest tier whose threshold is `<= net_score`
pub fn tier_for_score(net_score: i64) -> &'static LevelTier {
    &LEVEL_TABLE[tier_index(net_score)]
}

pub fn level_from_score(net_score: i64) -> i64 {
    tier_for_score(net_score).level
}

/// Look up a tier by level number
pub fn tier_for_level(level: i64) -> Option<&'static LevelTier> {
    LEVEL_TABLE.iter().find(|tier| tier.level == level)
}

/// Position of a score inside its tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelProgress {
    pub current: &'static LevelTier,
    /// `None` at the top tier
    pub next: Option<&'static LevelTier>,
    /// Percentage towards `next`, clamped to `[0, 100]`
    pub percent: f64,
}

pub fn level_progress(net_score: i64) -> LevelProgress {
    let index = tier_index(net_score);
    let current = &LEVEL_TABLE[index];
    let next = LEVEL_TABLE.get(index + 1);

    let percent = match next {
        None => 100.0,
        // The floor tier is unbounded below, so there is no meaningful span.
        Some(_) if current.threshold == i64::MIN => 0.0,
        Some(next) => {
            let span = (next.threshold as i128 - current.threshold as i128) as f64;
            let gained = (net_score as i128 - current.threshold as i128) as f64;
            (gained / span * 100.0).clamp(0.0, 100.0)
        }
    };

    LevelProgress {
        current,
        next,
        percent,
    }
}

/// Trainer disposition derived from consecutive missed days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Mood {
    Motivated,
    Normal,
    Concerned,
    Disappointed,
    Angry,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Motivated => "motivated",
            Mood::Normal => "normal",
            Mood::Concerned => "concerned",
            Mood::Disappointed => "disappointed",
            Mood::Angry => "angry",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negative counts are treated as zero.
pub fn mood_from_consecutive_miss(consecutive_miss: i64) -> Mood {
    match consecutive_miss {
        i64::MIN..=0 => Mood::Motivated,
        1..=2 => Mood::Normal,
        3..=4 => Mood::Concerned,
        5..=6 => Mood::Disappointed,
        _ => Mood::Angry,
    }
}

/// One-time bonus for reaching an exact streak length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakMilestone {
    pub days: i64,
    pub bonus: i64,
}

pub const STREAK_MILESTONES: &[StreakMilestone] = &[
    StreakMilestone { days: 7, bonus: 500 },
    StreakMilestone { days: 14, bonus: 1000 },
    StreakMilestone { days: 30, bonus: 3000 },
];

/// Milestone whose day count equals `streak` exactly
pub fn milestone_for_streak(streak: i64) -> Option<&'static StreakMilestone> {
    STREAK_MILESTONES.iter().find(|m| m.days == streak)
}

/// Deduplication key for a streak bonus awarded on `date`
pub fn streak_bonus_key(days: i64, date: chrono::NaiveDate) -> String {
    format!("streak_{}_{}", days, date.format("%Y-%m-%d"))
}
