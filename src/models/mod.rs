//! Data structures for club tournaments: teams, matches, courts, members, tournament state.

mod court;
mod error;
mod game;
mod group;
mod member;
mod team;
mod tournament;

pub use court::{empty_courts, pair_key, CourtSlot, Pairing};
pub use error::{EngineError, ErrorKind, ScoreError};
pub use game::{Match, MatchId, Scoreline, SetScore, Side, Stage};
pub use group::{Group, GroupId, GROUP_MATCHES, GROUP_SIZE};
pub use member::{Member, MemberDirectory, MemberId, MemberTotals, PointsEntry, ResultLabel};
pub use team::{Team, TeamDelta, TeamId};
pub use tournament::{
    FinalProgress, FormatState, KingState, SocialStage, SocialState, Tournament, TournamentFormat,
    TournamentId, MIN_TEAMS,
};
