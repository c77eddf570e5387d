//! Services module
//!
//! Engine services that coordinate between the session façade and the
//! repository. Each service works inside a caller-supplied transaction.

pub mod achievements;
pub mod decay;
pub mod meals;
pub mod profile;
pub mod records;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod shop;
pub mod trainers;

pub use achievements::AchievementService;
pub use decay::DecayService;
pub use meals::{MealEntry, MealService};
pub use profile::ProfileService;
pub use records::{LedgerEntry, LevelUp, RecordService, StreakBonus};
pub use scheduler::DecaySweepScheduler;
pub use session::{RecordOutcome, TrainerSession, TrainerView};
pub use settings::{GameSettings, SettingsService};
pub use shop::{Purchase, ShopService};
pub use trainers::TrainerService;
