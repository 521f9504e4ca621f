//! Club tournament engine: court scheduling, stage progression, score recording and
//! standings for King of the Court and Social tournaments.

pub mod club;
pub mod config;
pub mod export;
pub mod logic;
pub mod models;

pub use club::Club;
pub use config::{EngineConfig, KingConfig, PointsConfig};
pub use logic::{
    assign_matches, draw_groups, edit_final, edit_match, generate_round, group_standings,
    member_leaderboard, next_group_pairing, record_final_set, record_match, seed_semis,
    set_groups, standings, validate_round, validate_score, FinalSetOutcome, ForcedRepeat,
    GroupStanding, LeaderboardRow, RoundOutcome, RoundPlan, ScoreContext, StandingRow,
};
pub use models::{
    CourtSlot, EngineError, ErrorKind, FormatState, Group, GroupId, KingState, Match, MatchId,
    Member, MemberDirectory, MemberId, MemberTotals, Pairing, PointsEntry, ResultLabel,
    ScoreError, Scoreline, SetScore, Side, SocialStage, SocialState, Stage, Team, TeamId,
    Tournament, TournamentFormat, TournamentId,
};
