//! Court slots and the pairing currently playing on them.

use crate::models::game::Stage;
use crate::models::group::GroupId;
use crate::models::team::TeamId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Two teams assigned to a court, waiting for a result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    pub team1: TeamId,
    pub team2: TeamId,
    pub stage: Stage,
    pub group: Option<GroupId>,
    /// Set by the King scheduler when every fresh pairing was exhausted and this one
    /// repeats a match already played. Recording it bypasses the duplicate check.
    #[serde(default)]
    pub forced_repeat: bool,
}

impl Pairing {
    pub fn new(team1: TeamId, team2: TeamId, stage: Stage) -> Self {
        Self {
            team1,
            team2,
            stage,
            group: None,
            forced_repeat: false,
        }
    }

    pub fn in_group(team1: TeamId, team2: TeamId, group: GroupId) -> Self {
        Self {
            group: Some(group),
            ..Self::new(team1, team2, Stage::Group)
        }
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.team1 == team || self.team2 == team
    }

    /// Unordered key of the two teams.
    pub fn key(&self) -> (TeamId, TeamId) {
        pair_key(self.team1, self.team2)
    }
}

/// Unordered pair key, lower id first.
pub fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// One active court. Empty when `pairing` is None.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CourtSlot {
    pub index: usize,
    pub pairing: Option<Pairing>,
    /// When the current pairing went on court (advisory match timer).
    pub started_at: Option<DateTime<Utc>>,
}

impl CourtSlot {
    pub fn empty(index: usize) -> Self {
        Self {
            index,
            pairing: None,
            started_at: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.pairing.is_none()
    }

    pub fn assign(&mut self, pairing: Pairing, now: DateTime<Utc>) {
        self.pairing = Some(pairing);
        self.started_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.pairing = None;
        self.started_at = None;
    }
}

/// `count` empty courts numbered from 0.
pub fn empty_courts(count: usize) -> Vec<CourtSlot> {
    (0..count).map(CourtSlot::empty).collect()
}
