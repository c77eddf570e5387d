//! Achievement catalogue and unlock rules.
//!
//! Each rule is a plain `{id, predicate}` entry in [`ALL_RULES`]. A
//! predicate returns `None` when the data it needs is missing (no height,
//! no target weight, no records), which counts as "not satisfied".
//! Achievement IDs are stable strings stored in `achievement_unlocks`.

use crate::database::{TimeSlot, UserProfile, WeightRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

// ─── Achievement ID constants ─────────────────────────────────────────────────

pub const FIRST_RECORD: &str = "first_record";
pub const RECORD_10: &str = "record_10";
pub const RECORD_30: &str = "record_30";
pub const RECORD_100: &str = "record_100";
pub const MORNING_AND_EVENING: &str = "morning_and_evening";
pub const STREAK_3: &str = "streak_3";
pub const STREAK_7: &str = "streak_7";
pub const STREAK_14: &str = "streak_14";
pub const STREAK_30: &str = "streak_30";
pub const POINTS_1000: &str = "points_1000";
pub const POINTS_5000: &str = "points_5000";
pub const POINTS_10000: &str = "points_10000";
pub const LEVEL_5: &str = "level_5";
pub const LEVEL_10: &str = "level_10";
pub const LEVEL_20: &str = "level_20";
pub const GOAL_SET: &str = "goal_set";
pub const GOAL_ACHIEVED: &str = "goal_achieved";
pub const WEIGHT_DOWN_1: &str = "weight_down_1";
pub const WEIGHT_DOWN_5: &str = "weight_down_5";
pub const BMI_SET: &str = "bmi_set";
pub const BMI_NORMAL: &str = "bmi_normal";

// ─── Evaluation context ───────────────────────────────────────────────────────

/// Aggregate stats a rule may look at
#[derive(Debug, Clone, Copy)]
pub struct AchievementContext<'a> {
    /// Most recent first
    pub records: &'a [WeightRecord],
    pub streak: i64,
    pub total_points: i64,
    /// `None` when no trainer is selected
    pub level: Option<i64>,
    pub profile: Option<&'a UserProfile>,
}

impl AchievementContext<'_> {
    fn latest_weight(&self) -> Option<f64> {
        self.records.first().map(|r| r.weight_kg)
    }

    /// Loss against the weight captured when the goal was first set
    fn weight_lost(&self) -> Option<f64> {
        Some(self.profile?.start_weight_kg? - self.latest_weight()?)
    }

    fn bmi(&self) -> Option<f64> {
        let height_m = self.profile?.height_cm? / 100.0;
        if height_m <= 0.0 {
            return None;
        }
        Some(self.latest_weight()? / (height_m * height_m))
    }

    fn has_morning_and_evening_day(&self) -> bool {
        let mut slots: HashMap<NaiveDate, HashSet<TimeSlot>> = HashMap::new();
        for record in self.records {
            slots
                .entry(record.record_date)
                .or_default()
                .insert(record.time_slot);
        }
        slots
            .values()
            .any(|s| s.contains(&TimeSlot::Morning) && s.contains(&TimeSlot::Evening))
    }
}

// ─── Rule table ───────────────────────────────────────────────────────────────

pub type Predicate = fn(&AchievementContext<'_>) -> Option<bool>;

#[derive(Clone, Copy)]
pub struct AchievementRule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub predicate: Predicate,
}

impl std::fmt::Debug for AchievementRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AchievementRule").field("id", &self.id).finish()
    }
}

impl AchievementRule {
    /// Missing data is "not satisfied"
    pub fn is_satisfied(&self, ctx: &AchievementContext<'_>) -> bool {
        match (self.predicate)(ctx) {
            Some(satisfied) => satisfied,
            None => {
                tracing::trace!("Achievement {} skipped: required data missing", self.id);
                false
            }
        }
    }
}

/// The canonical catalogue, in presentation order
pub static ALL_RULES: &[AchievementRule] = &[
    AchievementRule {
        id: FIRST_RECORD,
        name: "First Step",
        description: "Logged your first weight.",
        predicate: |ctx| Some(!ctx.records.is_empty()),
    },
    AchievementRule {
        id: RECORD_10,
        name: "Getting Into It",
        description: "Logged 10 weights.",
        predicate: |ctx| Some(ctx.records.len() >= 10),
    },
    AchievementRule {
        id: RECORD_30,
        name: "Habit Formed",
        description: "Logged 30 weights.",
        predicate: |ctx| Some(ctx.records.len() >= 30),
    },
    AchievementRule {
        id: RECORD_100,
        name: "Century",
        description: "Logged 100 weights.",
        predicate: |ctx| Some(ctx.records.len() >= 100),
    },
    AchievementRule {
        id: MORNING_AND_EVENING,
        name: "Bookends",
        description: "Logged a morning and an evening weight on the same day.",
        predicate: |ctx| Some(ctx.has_morning_and_evening_day()),
    },
    AchievementRule {
        id: STREAK_3,
        name: "Past Day Three",
        description: "Logged on 3 days in a row.",
        predicate: |ctx| Some(ctx.streak >= 3),
    },
    AchievementRule {
        id: STREAK_7,
        name: "One Week Strong",
        description: "Logged on 7 days in a row.",
        predicate: |ctx| Some(ctx.streak >= 7),
    },
    AchievementRule {
        id: STREAK_14,
        name: "Iron Fortnight",
        description: "Logged on 14 days in a row.",
        predicate: |ctx| Some(ctx.streak >= 14),
    },
    AchievementRule {
        id: STREAK_30,
        name: "30-Day Champion",
        description: "Logged on 30 days in a row.",
        predicate: |ctx| Some(ctx.streak >= 30),
    },
    AchievementRule {
        id: POINTS_1000,
        name: "Point Collector",
        description: "Held 1,000 points.",
        predicate: |ctx| Some(ctx.total_points >= 1_000),
    },
    AchievementRule {
        id: POINTS_5000,
        name: "Point Hunter",
        description: "Held 5,000 points.",
        predicate: |ctx| Some(ctx.total_points >= 5_000),
    },
    AchievementRule {
        id: POINTS_10000,
        name: "Point King",
        description: "Held 10,000 points.",
        predicate: |ctx| Some(ctx.total_points >= 10_000),
    },
    AchievementRule {
        id: LEVEL_5,
        name: "Trainer in the Making",
        description: "Raised your trainer to level 5.",
        predicate: |ctx| Some(ctx.level? >= 5),
    },
    AchievementRule {
        id: LEVEL_10,
        name: "Trusted Partner",
        description: "Raised your trainer to level 10.",
        predicate: |ctx| Some(ctx.level? >= 10),
    },
    AchievementRule {
        id: LEVEL_20,
        name: "Unbeatable Duo",
        description: "Raised your trainer to level 20.",
        predicate: |ctx| Some(ctx.level? >= 20),
    },
    AchievementRule {
        id: GOAL_SET,
        name: "Goal Setter",
        description: "Set a target weight.",
        predicate: |ctx| Some(ctx.profile?.target_weight_kg.is_some()),
    },
    AchievementRule {
        id: GOAL_ACHIEVED,
        name: "Goal Reached",
        description: "Latest weight is at or below your target.",
        predicate: |ctx| Some(ctx.latest_weight()? <= ctx.profile?.target_weight_kg?),
    },
    AchievementRule {
        id: WEIGHT_DOWN_1,
        name: "Minus 1 kg",
        description: "Lost 1 kg since setting your goal.",
        predicate: |ctx| Some(ctx.weight_lost()? >= 1.0),
    },
    AchievementRule {
        id: WEIGHT_DOWN_5,
        name: "Minus 5 kg",
        description: "Lost 5 kg since setting your goal.",
        predicate: |ctx| Some(ctx.weight_lost()? >= 5.0),
    },
    AchievementRule {
        id: BMI_SET,
        name: "Health Check",
        description: "Set your height to see your BMI.",
        predicate: |ctx| Some(ctx.profile?.height_cm.is_some()),
    },
    AchievementRule {
        id: BMI_NORMAL,
        name: "Healthy Weight",
        description: "Latest weight puts your BMI between 18.5 and 25.",
        predicate: |ctx| {
            let bmi = ctx.bmi()?;
            Some((18.5..25.0).contains(&bmi))
        },
    },
];

/// Catalogue entry for presentation
#[derive(Debug, Clone, Serialize)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub fn all_definitions() -> Vec<AchievementDefinition> {
    ALL_RULES
        .iter()
        .map(|rule| AchievementDefinition {
            id: rule.id,
            name: rule.name,
            description: rule.description,
        })
        .collect()
}

pub fn find_rule(id: &str) -> Option<&'static AchievementRule> {
    ALL_RULES.iter().find(|rule| rule.id == id)
}

/// Rules that hold now and are not yet unlocked, in catalogue order
pub fn newly_unlocked(
    rules: &[AchievementRule],
    ctx: &AchievementContext<'_>,
    already_unlocked: &[String],
) -> Vec<&'static str> {
    let unlocked: HashSet<&str> = already_unlocked.iter().map(String::as_str).collect();

    rules
        .iter()
        .filter(|rule| !unlocked.contains(rule.id))
        .filter(|rule| rule.is_satisfied(ctx))
        .map(|rule| rule.id)
        .collect()
}
