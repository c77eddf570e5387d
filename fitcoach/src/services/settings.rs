//! Settings service
//!
//! Manages engine tuning persistence using JSON file storage.

use crate::config::{
    MAX_BOOST_MULTIPLIER, MAX_DECAY_PER_MISSED_DAY, MAX_EXP_PER_RECORD,
    MAX_MISSED_DAYS_PER_RECONCILE, MAX_POINTS_PER_RECORD, SETTINGS_FILE_NAME,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Rewards granted for a new weight record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSettings {
    #[serde(default = "default_exp_per_record")]
    pub exp_per_record: i64,
    #[serde(default = "default_points_per_record")]
    pub points_per_record: i64,
    /// Experience multiplier applied while an EXP boost is consumed
    #[serde(default = "default_boost_multiplier")]
    pub boost_multiplier: i64,
    #[serde(default = "default_points_per_meal")]
    pub points_per_meal: i64,
}

fn default_exp_per_record() -> i64 {
    10
}

fn default_points_per_record() -> i64 {
    50
}

fn default_boost_multiplier() -> i64 {
    2
}

fn default_points_per_meal() -> i64 {
    30
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            exp_per_record: default_exp_per_record(),
            points_per_record: default_points_per_record(),
            boost_multiplier: default_boost_multiplier(),
            points_per_meal: default_points_per_meal(),
        }
    }
}

/// Penalty applied for missed days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecaySettings {
    #[serde(default = "default_points_per_missed_day")]
    pub points_per_missed_day: i64,
    /// Most missed days charged by a single reconciliation
    #[serde(default = "default_max_missed_days")]
    pub max_missed_days_per_reconcile: i64,
}

fn default_points_per_missed_day() -> i64 {
    5
}

fn default_max_missed_days() -> i64 {
    30
}

impl Default for DecaySettings {
    fn default() -> Self {
        Self {
            points_per_missed_day: default_points_per_missed_day(),
            max_missed_days_per_reconcile: default_max_missed_days(),
        }
    }
}

/// Background decay sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (seconds first)
    #[serde(default = "default_sweep_cron")]
    pub cron: String,
}

fn default_true() -> bool {
    true
}

fn default_sweep_cron() -> String {
    "0 5 0 * * *".to_string() // 00:05 every day
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_sweep_cron(),
        }
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GameSettings {
    #[serde(default)]
    pub rewards: RewardSettings,
    #[serde(default)]
    pub decay: DecaySettings,
    #[serde(default)]
    pub sweep: SweepSettings,
}

fn check_range(name: &str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

impl GameSettings {
    /// Reject values outside the supported limits
    pub fn validate(&self) -> Result<()> {
        check_range("exp_per_record", self.rewards.exp_per_record, 0, MAX_EXP_PER_RECORD)?;
        check_range(
            "points_per_record",
            self.rewards.points_per_record,
            0,
            MAX_POINTS_PER_RECORD,
        )?;
        check_range(
            "points_per_meal",
            self.rewards.points_per_meal,
            0,
            MAX_POINTS_PER_RECORD,
        )?;
        check_range(
            "boost_multiplier",
            self.rewards.boost_multiplier,
            1,
            MAX_BOOST_MULTIPLIER,
        )?;
        check_range(
            "points_per_missed_day",
            self.decay.points_per_missed_day,
            0,
            MAX_DECAY_PER_MISSED_DAY,
        )?;
        check_range(
            "max_missed_days_per_reconcile",
            self.decay.max_missed_days_per_reconcile,
            1,
            MAX_MISSED_DAYS_PER_RECONCILE,
        )?;

        if self.sweep.cron.trim().is_empty() {
            return Err(AppError::Validation(
                "Sweep cron expression must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Service for managing engine settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join(SETTINGS_FILE_NAME),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<GameSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = GameSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: GameSettings = serde_json::from_str(&content)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Validate and save settings to disk
    pub async fn save(&self, settings: &GameSettings) -> Result<()> {
        settings.validate()?;

        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    pub async fn update_rewards(&self, rewards: RewardSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.rewards = rewards;
        self.save(&settings).await
    }

    pub async fn update_decay(&self, decay: DecaySettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.decay = decay;
        self.save(&settings).await
    }

    pub async fn update_sweep(&self, sweep: SweepSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.sweep = sweep;
        self.save(&settings).await
    }
}
