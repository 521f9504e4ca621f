//! Engine configuration: points awarded per result and King scheduling limits.
//!
//! Every field has a default, so a host can deserialize a partial JSON document.

use crate::models::Stage;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub points: PointsConfig,
    pub king: KingConfig,
}

/// Points written to a member's history for each kind of result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsConfig {
    /// One-time bonus on a member's first match in a tournament.
    pub join_bonus: u32,
    pub plain_win: u32,
    pub group_win: u32,
    pub semi_win: u32,
    pub final_win: u32,
    /// Awarded with each tournament title.
    pub title: u32,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            join_bonus: 20,
            plain_win: 15,
            group_win: 15,
            semi_win: 20,
            final_win: 30,
            title: 0,
        }
    }
}

impl PointsConfig {
    /// Points for winning a match in `stage`. Losses and draws earn nothing.
    pub fn win_points(&self, stage: Stage) -> u32 {
        match stage {
            Stage::Plain => self.plain_win,
            Stage::Group => self.group_win,
            Stage::Semi => self.semi_win,
            Stage::Final => self.final_win,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KingConfig {
    /// Matches each team plays before the tournament is complete.
    pub matches_per_team: u32,
    /// Bound on the scheduler's clear-and-refill repair loop.
    pub max_repair_attempts: usize,
}

impl Default for KingConfig {
    fn default() -> Self {
        Self {
            matches_per_team: 7,
            max_repair_attempts: 8,
        }
    }
}
