//! fitcoach library
//!
//! Gamification engine for a weight-tracking trainer app: turns weigh-ins
//! into experience, decay, levels, moods, streak bonuses and achievements.

pub mod achievements;
pub mod app;
pub mod config;
pub mod database;
pub mod decay;
pub mod error;
pub mod progression;
pub mod services;
pub mod streak;
