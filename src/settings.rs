//! Session settings supplied alongside the quiz
//!
//! Settings are a read-only bundle fixed at session creation. Only the
//! points system and the default timer influence the runtime; the remaining
//! fields are display hints echoed to clients in every snapshot.

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::constants::quiz as limits;

/// How correct answers are rewarded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsSystem {
    /// Question points plus a speed bonus of up to half the base
    #[default]
    Standard,
    /// One point per correct answer
    Simple,
    /// Nobody scores
    NoPoints,
}

/// When clients should reveal the leaderboard
///
/// The runtime does not enforce this cadence; it is echoed for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardFrequency {
    /// After every question
    #[default]
    EveryRound,
    /// Only once the game is over
    EndOnly,
    /// Only the top three, after every question
    #[serde(rename = "top_3")]
    Top3,
}

fn default_timer_seconds() -> u64 {
    limits::DEFAULT_TIME_LIMIT
}

/// The settings bundle handed to a session at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Time limit for questions when neither question nor quiz names one
    #[garde(range(max = limits::MAX_TIME_LIMIT))]
    #[serde(default = "default_timer_seconds", alias = "default_timer_seconds")]
    pub default_timer_seconds: u64,
    /// How correct answers are scored
    #[garde(skip)]
    #[serde(default, alias = "points_system")]
    pub points_system: PointsSystem,
    /// When clients should reveal the leaderboard
    #[garde(skip)]
    #[serde(default, alias = "leaderboard_frequency")]
    pub leaderboard_frequency: LeaderboardFrequency,
    /// Marks practice sessions; echoed to clients only
    #[garde(skip)]
    #[serde(default, alias = "enable_test_mode")]
    pub enable_test_mode: bool,
    /// When set, a JOIN without a usable name is ignored instead of receiving a generated one
    #[garde(skip)]
    #[serde(default, alias = "require_player_names")]
    pub require_player_names: bool,
    /// Shown by clients next to the quiz title
    #[garde(length(chars, max = 120))]
    #[serde(default, alias = "organization_name")]
    pub organization_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_timer_seconds: default_timer_seconds(),
            points_system: PointsSystem::default(),
            leaderboard_frequency: LeaderboardFrequency::default(),
            enable_test_mode: false,
            require_player_names: false,
            organization_name: String::new(),
        }
    }
}
