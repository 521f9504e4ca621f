//! Social-format groups of three teams.

use crate::models::team::TeamId;
use serde::{Deserialize, Serialize};

/// Identifier of a group within a Social tournament.
pub type GroupId = u32;

/// Teams per group in the Social format.
pub const GROUP_SIZE: usize = 3;

/// Round-robin matches per group.
pub const GROUP_MATCHES: usize = 3;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// Board order: index 0 and 1 open the group, index 2 waits.
    pub teams: Vec<TeamId>,
}

impl Group {
    pub fn new(id: GroupId, teams: Vec<TeamId>) -> Self {
        Self { id, teams }
    }

    pub fn contains(&self, team: TeamId) -> bool {
        self.teams.contains(&team)
    }
}
