//! Match (game), Side, Stage and scorelines.

use crate::models::group::GroupId;
use crate::models::team::TeamId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a match, monotonic within one tournament.
pub type MatchId = u64;

/// Which side of a match (team1 or team2).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    /// Side with the higher score, or None on equal scores.
    pub fn from_scores(score1: u8, score2: u8) -> Option<Self> {
        match score1.cmp(&score2) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Phase of the tournament a match belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// King of the Court match.
    Plain,
    /// Social group round-robin match.
    Group,
    Semi,
    Final,
}

impl Stage {
    pub fn is_knockout(self) -> bool {
        matches!(self, Stage::Semi | Stage::Final)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Plain => "plain",
            Stage::Group => "group",
            Stage::Semi => "semi-final",
            Stage::Final => "final",
        };
        f.write_str(s)
    }
}

/// Games won by each side in one set (or tiebreak points).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SetScore {
    pub team1: u8,
    pub team2: u8,
}

impl SetScore {
    pub fn new(team1: u8, team2: u8) -> Self {
        Self { team1, team2 }
    }

    pub fn winner(&self) -> Option<Side> {
        Side::from_scores(self.team1, self.team2)
    }
}

/// Recorded result. Plain, group and semi matches are a single games count; the final is
/// two sets plus a tiebreak when the sets split.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scoreline {
    Games {
        team1: u8,
        team2: u8,
    },
    Sets {
        sets: [SetScore; 2],
        tiebreak: Option<SetScore>,
    },
}

impl Scoreline {
    /// Games won by (team1, team2). For a final this is the sum of both sets.
    pub fn games(&self) -> (u32, u32) {
        match self {
            Scoreline::Games { team1, team2 } => (u32::from(*team1), u32::from(*team2)),
            Scoreline::Sets { sets, .. } => sets.iter().fold((0, 0), |(a, b), s| {
                (a + u32::from(s.team1), b + u32::from(s.team2))
            }),
        }
    }

    /// Sets won by (team1, team2), counting the tiebreak as a deciding set.
    /// None for a games scoreline.
    pub fn sets_won(&self) -> Option<(u8, u8)> {
        match self {
            Scoreline::Games { .. } => None,
            Scoreline::Sets { sets, tiebreak } => {
                let mut won = (0u8, 0u8);
                for s in sets.iter().chain(tiebreak.iter()) {
                    match s.winner() {
                        Some(Side::One) => won.0 += 1,
                        Some(Side::Two) => won.1 += 1,
                        None => {}
                    }
                }
                Some(won)
            }
        }
    }

    /// Winner implied by the scoreline, None for a tie.
    pub fn winner(&self) -> Option<Side> {
        match self {
            Scoreline::Games { team1, team2 } => Side::from_scores(*team1, *team2),
            Scoreline::Sets { .. } => {
                let (a, b) = self.sets_won()?;
                Side::from_scores(a, b)
            }
        }
    }
}

/// A single recorded match between two teams.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub team1: TeamId,
    pub team2: TeamId,
    pub scoreline: Scoreline,
    /// None means a tie (never in knockout stages).
    pub winner: Option<Side>,
    pub played_at: DateTime<Utc>,
    pub stage: Stage,
    pub group: Option<GroupId>,
}

impl Match {
    pub fn team(&self, side: Side) -> TeamId {
        match side {
            Side::One => self.team1,
            Side::Two => self.team2,
        }
    }

    pub fn winner_team(&self) -> Option<TeamId> {
        self.winner.map(|s| self.team(s))
    }

    pub fn loser_team(&self) -> Option<TeamId> {
        self.winner.map(|s| self.team(s.other()))
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.team1 == team || self.team2 == team
    }

    /// True if this match is between `a` and `b` in either order.
    pub fn is_between(&self, a: TeamId, b: TeamId) -> bool {
        (self.team1 == a && self.team2 == b) || (self.team1 == b && self.team2 == a)
    }

    /// Games won by `team` and by its opponent, if it played in this match.
    pub fn games_for(&self, team: TeamId) -> Option<(u32, u32)> {
        let (g1, g2) = self.scoreline.games();
        if team == self.team1 {
            Some((g1, g2))
        } else if team == self.team2 {
            Some((g2, g1))
        } else {
            None
        }
    }
}
