//! Tournament business logic: score validation, scheduling, stage progression, recording,
//! editing and standings.

mod effects;
mod editor;
mod king;
mod recorder;
mod social;
mod standings;
mod validator;

pub use editor::{edit_final, edit_match};
pub use king::{generate_round, validate_round, ForcedRepeat, RoundOutcome, RoundPlan};
pub use recorder::{already_recorded, record_match};
pub use social::{
    assign_matches, draw_groups, final_scoreline, group_complete, group_matches, group_winner,
    next_group_pairing, qualifiers, record_final_set, seed_semis, set_groups, FinalSetOutcome,
};
pub use standings::{
    group_standings, member_leaderboard, rank_group, recompute_team_stats, standings,
    verify_team_stats, GroupStanding, LeaderboardRow, StandingRow,
};
pub use validator::{validate_score, ScoreContext};

pub(crate) use effects::award_title_entries;
