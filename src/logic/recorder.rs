//! Recording a result for the pairing on a court.

use crate::config::PointsConfig;
use crate::logic::effects::{apply_member_effects, apply_team_effects};
use crate::logic::social;
use crate::logic::validator::{validate_score, ScoreContext};
use crate::models::{
    EngineError, FormatState, Match, MemberDirectory, Pairing, Scoreline, Side, Stage, Tournament,
};
use chrono::{DateTime, Utc};

/// True if `pairing` was already recorded in its scope: globally for King, within the same
/// stage and group for Social.
pub fn already_recorded(tournament: &Tournament, pairing: &Pairing) -> bool {
    let scoped = matches!(tournament.state, FormatState::Social(_));
    tournament.matches.iter().any(|m| {
        m.is_between(pairing.team1, pairing.team2)
            && (!scoped || (m.stage == pairing.stage && m.group == pairing.group))
    })
}

/// Record the result of the pairing on `court`.
///
/// Validates the score for the pairing's stage, refuses a pairing already recorded in its
/// scope (unless the scheduler flagged it as a forced repeat), then updates both teams,
/// writes member history, appends the match and advances the stage engine. Everything that
/// can fail is checked before the first mutation.
pub fn record_match(
    tournament: &mut Tournament,
    members: &mut MemberDirectory,
    points: &PointsConfig,
    court: usize,
    score1: u8,
    score2: u8,
    now: DateTime<Utc>,
) -> Result<Match, EngineError> {
    let pairing = tournament
        .court(court)?
        .pairing
        .clone()
        .ok_or(EngineError::CourtEmpty(court))?;
    if pairing.stage == Stage::Final {
        return Err(EngineError::InvalidState("the final is recorded set by set"));
    }
    validate_score(ScoreContext::for_stage(pairing.stage), score1, score2)?;
    tournament.require_team(pairing.team1)?;
    tournament.require_team(pairing.team2)?;
    if !pairing.forced_repeat && already_recorded(tournament, &pairing) {
        return Err(EngineError::DuplicateMatch {
            team1: pairing.team1,
            team2: pairing.team2,
            stage: pairing.stage,
        });
    }

    let id = tournament.allocate_match_id();
    let m = Match {
        id,
        team1: pairing.team1,
        team2: pairing.team2,
        scoreline: Scoreline::Games {
            team1: score1,
            team2: score2,
        },
        winner: Side::from_scores(score1, score2),
        played_at: now,
        stage: pairing.stage,
        group: pairing.group,
    };
    apply_team_effects(&mut tournament.teams, &m);
    apply_member_effects(tournament, members, &m, points, now);
    tournament.matches.push(m.clone());
    log::info!(
        "match {} recorded: {} {}-{} {} ({})",
        m.id,
        m.team1,
        score1,
        score2,
        m.team2,
        m.stage
    );

    if let FormatState::King(king) = &mut tournament.state {
        king.court_winners
            .retain(|c, t| *c != court && *t != m.team1 && *t != m.team2);
        if let Some(winner) = m.winner_team() {
            king.court_winners.insert(court, winner);
        }
        tournament.courts[court].clear();
        return Ok(m);
    }
    social::advance_after_match(tournament, court, &m, now)?;
    Ok(m)
}
