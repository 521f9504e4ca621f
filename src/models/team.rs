//! Team and its cumulative match statistics.

use crate::models::member::MemberId;
use serde::{Deserialize, Serialize};

/// Unique identifier for a team within one tournament.
pub type TeamId = u32;

/// Win/loss/game deltas a single match applies to one team.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TeamDelta {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub games_won: u32,
    pub games_lost: u32,
}

/// A team in the tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub matches_played: u32,
    /// Roster, in the order the host supplied it.
    pub members: Vec<MemberId>,
}

impl Team {
    /// Create a team with zeroed statistics.
    pub fn new(id: TeamId, name: impl Into<String>, members: Vec<MemberId>) -> Self {
        Self {
            id,
            name: name.into(),
            wins: 0,
            losses: 0,
            draws: 0,
            games_won: 0,
            games_lost: 0,
            matches_played: 0,
            members,
        }
    }

    pub fn game_differential(&self) -> i64 {
        i64::from(self.games_won) - i64::from(self.games_lost)
    }

    pub fn apply(&mut self, delta: &TeamDelta) {
        self.wins += delta.wins;
        self.losses += delta.losses;
        self.draws += delta.draws;
        self.games_won += delta.games_won;
        self.games_lost += delta.games_lost;
        self.matches_played += 1;
    }

    /// Undo a previously applied delta. Clamped at zero so an earlier inconsistency can
    /// never drive a counter negative.
    pub fn revert(&mut self, delta: &TeamDelta) {
        self.wins = self.wins.saturating_sub(delta.wins);
        self.losses = self.losses.saturating_sub(delta.losses);
        self.draws = self.draws.saturating_sub(delta.draws);
        self.games_won = self.games_won.saturating_sub(delta.games_won);
        self.games_lost = self.games_lost.saturating_sub(delta.games_lost);
        self.matches_played = self.matches_played.saturating_sub(1);
    }

    /// Zero every statistic, keeping id, name and roster.
    pub fn reset_stats(&mut self) {
        *self = Self::new(
            self.id,
            std::mem::take(&mut self.name),
            std::mem::take(&mut self.members),
        );
    }
}
