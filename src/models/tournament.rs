//! Tournament and its format-specific state.

use crate::models::court::{empty_courts, CourtSlot, Pairing};
use crate::models::error::EngineError;
use crate::models::game::{Match, MatchId, SetScore};
use crate::models::group::Group;
use crate::models::member::MemberId;
use crate::models::team::{Team, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Minimum roster size; removing a team below this is refused.
pub const MIN_TEAMS: usize = 2;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// King of the Court: winners stay on court, no bracket.
    King,
    /// Groups of three, then semi-finals and a final.
    Social,
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TournamentFormat::King => f.write_str("king"),
            TournamentFormat::Social => f.write_str("social"),
        }
    }
}

/// Current phase of a Social tournament. Only moves forward.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialStage {
    #[default]
    Group,
    Semi,
    Final,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct KingState {
    /// Court index -> team that just won there and keeps the court.
    pub court_winners: BTreeMap<usize, TeamId>,
    /// Set once no further round can be scheduled.
    pub completed: bool,
    /// Awarded by the host after completion.
    pub champion: Option<TeamId>,
}

/// Sets of the final recorded so far; nothing is applied to aggregates until it resolves.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FinalProgress {
    pub sets: Vec<SetScore>,
    pub tiebreak: Option<SetScore>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SocialState {
    pub groups: Vec<Group>,
    /// Group winners in group order.
    pub qualified: Vec<TeamId>,
    pub stage: SocialStage,
    /// Knockout pairings created while no court was free.
    pub queue: Vec<Pairing>,
    pub final_progress: Option<FinalProgress>,
    pub champion: Option<TeamId>,
}

impl SocialState {
    pub fn group_of(&self, team: TeamId) -> Option<&Group> {
        self.groups.iter().find(|g| g.contains(team))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatState {
    King(KingState),
    Social(SocialState),
}

impl FormatState {
    pub fn empty(format: TournamentFormat) -> Self {
        match format {
            TournamentFormat::King => FormatState::King(KingState::default()),
            TournamentFormat::Social => FormatState::Social(SocialState::default()),
        }
    }

    pub fn format(&self) -> TournamentFormat {
        match self {
            FormatState::King(_) => TournamentFormat::King,
            FormatState::Social(_) => TournamentFormat::Social,
        }
    }
}

/// Full tournament state: roster, match log, courts and format state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub teams: Vec<Team>,
    /// Recorded matches in recording order.
    pub matches: Vec<Match>,
    pub next_match_id: MatchId,
    pub courts: Vec<CourtSlot>,
    pub state: FormatState,
}

impl Tournament {
    /// Create an empty tournament with one court.
    pub fn new(id: TournamentId, format: TournamentFormat) -> Self {
        Self {
            id,
            name: String::new(),
            created_at: Utc::now(),
            teams: Vec::new(),
            matches: Vec::new(),
            next_match_id: 1,
            courts: empty_courts(1),
            state: FormatState::empty(format),
        }
    }

    pub fn format(&self) -> TournamentFormat {
        self.state.format()
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn team_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id == id)
    }

    pub fn require_team(&self, id: TeamId) -> Result<&Team, EngineError> {
        self.team(id).ok_or(EngineError::TeamNotFound(id))
    }

    pub fn match_by_id(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    /// Court currently holding a pairing with `team`, if any.
    pub fn court_of(&self, team: TeamId) -> Option<usize> {
        self.courts
            .iter()
            .position(|c| c.pairing.as_ref().is_some_and(|p| p.involves(team)))
    }

    pub fn court(&self, index: usize) -> Result<&CourtSlot, EngineError> {
        self.courts.get(index).ok_or(EngineError::CourtOutOfRange {
            court: index,
            active: self.courts.len(),
        })
    }

    pub fn king(&self) -> Result<&KingState, EngineError> {
        match &self.state {
            FormatState::King(k) => Ok(k),
            FormatState::Social(_) => Err(self.wrong_format(TournamentFormat::King)),
        }
    }

    pub fn social(&self) -> Result<&SocialState, EngineError> {
        match &self.state {
            FormatState::Social(s) => Ok(s),
            FormatState::King(_) => Err(self.wrong_format(TournamentFormat::Social)),
        }
    }

    pub fn wrong_format(&self, expected: TournamentFormat) -> EngineError {
        EngineError::WrongFormat {
            expected,
            actual: self.format(),
        }
    }

    /// Take the next match id.
    pub fn allocate_match_id(&mut self) -> MatchId {
        let id = self.next_match_id;
        self.next_match_id += 1;
        id
    }

    /// Add a team to the roster. Names must be unique (case-insensitive).
    pub fn add_team(
        &mut self,
        name: impl Into<String>,
        members: Vec<MemberId>,
    ) -> Result<TeamId, EngineError> {
        let name = name.into();
        let name_trimmed = name.trim();
        if name_trimmed.is_empty() {
            return Err(EngineError::InvalidState("team name is empty"));
        }
        let is_duplicate = self
            .teams
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(name_trimmed));
        if is_duplicate {
            return Err(EngineError::DuplicateTeamName);
        }
        let id = self.teams.iter().map(|t| t.id).max().map_or(1, |m| m + 1);
        let mut members = members;
        let mut seen = HashSet::new();
        members.retain(|m| seen.insert(*m));
        self.teams.push(Team::new(id, name_trimmed, members));
        Ok(id)
    }

    /// Remove a team that has never played, is not on a court and is not in a group.
    pub fn remove_team(&mut self, team_id: TeamId) -> Result<Team, EngineError> {
        let idx = self
            .teams
            .iter()
            .position(|t| t.id == team_id)
            .ok_or(EngineError::TeamNotFound(team_id))?;
        if self.teams.len() <= MIN_TEAMS {
            return Err(EngineError::NotEnoughTeams(MIN_TEAMS));
        }
        let in_group = match &self.state {
            FormatState::Social(s) => s.group_of(team_id).is_some(),
            FormatState::King(k) => k.court_winners.values().any(|t| *t == team_id),
        };
        if in_group
            || self.court_of(team_id).is_some()
            || self.matches.iter().any(|m| m.involves(team_id))
        {
            return Err(EngineError::TeamInUse(team_id));
        }
        Ok(self.teams.remove(idx))
    }

    /// Resize the court list to the host's active (non-maintenance) court count.
    /// Courts being removed must be empty.
    pub fn set_active_courts(&mut self, count: usize) -> Result<(), EngineError> {
        if count == 0 {
            return Err(EngineError::InvalidState("at least one court is required"));
        }
        if self.courts.iter().skip(count).any(|c| !c.is_free()) {
            return Err(EngineError::InvalidState("a removed court still has a match in progress"));
        }
        self.courts.truncate(count);
        while self.courts.len() < count {
            self.courts.push(CourtSlot::empty(self.courts.len()));
        }
        if let FormatState::King(k) = &mut self.state {
            k.court_winners.retain(|court, _| *court < count);
        }
        Ok(())
    }
}
