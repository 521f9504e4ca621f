//! Errors returned by the scheduling and scoring engine.

use crate::models::game::{MatchId, Stage};
use crate::models::team::TeamId;
use crate::models::tournament::{TournamentFormat, TournamentId};
use thiserror::Error;

/// Why a score was rejected for a given stage.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ScoreError {
    #[error("Scores cannot exceed {cap} in this stage (got {score1}-{score2})")]
    ExceedsCap { cap: u8, score1: u8, score2: u8 },

    #[error("{score}-{score} is not a final score; play the tiebreak")]
    UnresolvedTiebreak { score: u8 },

    #[error("A score of {cap} is only valid as {cap}-{low} or {low}-{cap} (got {score1}-{score2})")]
    InvalidTiebreakScore { cap: u8, low: u8, score1: u8, score2: u8 },

    #[error("Ties are not allowed in this stage (got {score}-{score})")]
    TieNotAllowed { score: u8 },
}

/// Coarse classification of an [`EngineError`], for hosts that map errors to responses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Illegal score; the caller should correct it.
    Validation,
    /// Pairing already recorded in the same scope.
    Duplicate,
    /// The scheduler could not produce a consistent round.
    Invariant,
    /// The request referred to something missing or is not allowed in the current state.
    Request,
}

/// Errors that can occur during engine operations. No operation mutates state when it
/// returns one of these.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ScoreError),

    #[error("Teams {team1} and {team2} have already played each other in the {stage} stage")]
    DuplicateMatch {
        team1: TeamId,
        team2: TeamId,
        stage: Stage,
    },

    #[error("Schedule invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Tournament {0} not found")]
    TournamentNotFound(TournamentId),

    #[error("Tournament is a {actual} tournament, not {expected}")]
    WrongFormat {
        expected: TournamentFormat,
        actual: TournamentFormat,
    },

    #[error("Team {0} not found")]
    TeamNotFound(TeamId),

    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("Court {court} does not exist ({active} active courts)")]
    CourtOutOfRange { court: usize, active: usize },

    #[error("No match is in progress on court {0}")]
    CourtEmpty(usize),

    #[error("Match {0} is a final; replay its sets instead")]
    FinalNotEditable(MatchId),

    #[error("At least {0} teams are required")]
    NotEnoughTeams(usize),

    #[error("A team with this name already exists")]
    DuplicateTeamName,

    #[error("Team {0} has matches, a group or a court and cannot be removed")]
    TeamInUse(TeamId),

    #[error("Invalid groups: {0}")]
    InvalidGroups(String),

    #[error("Invalid state for this action: {0}")]
    InvalidState(&'static str),

    #[error("The knockout has already advanced past match {0}")]
    KnockoutAdvanced(MatchId),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::DuplicateMatch { .. } => ErrorKind::Duplicate,
            EngineError::InvariantViolation(_) => ErrorKind::Invariant,
            _ => ErrorKind::Request,
        }
    }
}
