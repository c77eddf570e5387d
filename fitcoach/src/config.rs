//! Engine configuration constants
//!
//! Central location for validation boundaries and resource limits
//! used throughout the engine. Tunable reward values live in
//! `services::settings` instead.

// ===== Weight Records =====

/// Weights at or below this value (kg) are rejected
pub const MIN_WEIGHT_KG: f64 = 20.0;
/// Weights at or above this value (kg) are rejected
pub const MAX_WEIGHT_KG: f64 = 300.0;

// ===== Profile =====

/// Minimum accepted body height in centimetres
pub const MIN_HEIGHT_CM: f64 = 100.0;
/// Maximum accepted body height in centimetres
pub const MAX_HEIGHT_CM: f64 = 250.0;

// ===== Meals =====

/// Maximum length of a logged food name
pub const MAX_FOOD_NAME_LENGTH: usize = 200;

/// Upper bound for calories of a single meal entry
pub const MAX_MEAL_CALORIES: i64 = 10_000;

// ===== Trainers =====

/// Maximum length of a trainer identifier
pub const MAX_TRAINER_ID_LENGTH: usize = 64;

// ===== Shop =====

/// Maximum number of items bought in a single purchase
pub const MAX_PURCHASE_QUANTITY: i64 = 10;

// ===== Reward Settings Limits =====

/// Upper bound for experience awarded per record
pub const MAX_EXP_PER_RECORD: i64 = 1_000;

/// Upper bound for points awarded per record
pub const MAX_POINTS_PER_RECORD: i64 = 10_000;

/// Upper bound for the EXP boost multiplier
pub const MAX_BOOST_MULTIPLIER: i64 = 10;

// ===== Decay Settings Limits =====

/// Upper bound for decay charged per missed day
pub const MAX_DECAY_PER_MISSED_DAY: i64 = 1_000;

/// Upper bound for the per-reconciliation missed-day cap (one year)
pub const MAX_MISSED_DAYS_PER_RECONCILE: i64 = 365;

// ===== Storage =====

/// File name of the SQLite database inside the data directory
pub const DATABASE_FILE_NAME: &str = "fitcoach.db";

/// File name of the settings document inside the data directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";
