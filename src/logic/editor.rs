//! Editing recorded results: exact reversal of the old result's effects, then re-application
//! of the corrected one.

use crate::config::PointsConfig;
use crate::logic::effects::{
    apply_member_effects, apply_team_effects, revert_member_effects, revert_team_effects,
};
use crate::logic::social;
use crate::logic::validator::{validate_score, ScoreContext};
use crate::models::{
    EngineError, FormatState, Match, MatchId, MemberDirectory, Scoreline, SetScore, Side,
    SocialStage, Stage, TeamId, Tournament,
};
use chrono::{DateTime, Utc};

fn position(tournament: &Tournament, match_id: MatchId) -> Result<usize, EngineError> {
    tournament
        .matches
        .iter()
        .position(|m| m.id == match_id)
        .ok_or(EngineError::MatchNotFound(match_id))
}

/// Swap the scoreline of a recorded match, reversing and re-applying every aggregate.
fn rewrite(
    tournament: &mut Tournament,
    members: &mut MemberDirectory,
    points: &PointsConfig,
    idx: usize,
    scoreline: Scoreline,
    now: DateTime<Utc>,
) -> Match {
    let old = tournament.matches[idx].clone();
    revert_team_effects(&mut tournament.teams, &old);
    let removed = revert_member_effects(tournament, members, &old);

    let mut new = old;
    new.winner = scoreline.winner();
    new.scoreline = scoreline;
    apply_team_effects(&mut tournament.teams, &new);
    apply_member_effects(tournament, members, &new, points, now);
    tournament.matches[idx] = new.clone();
    log::info!(
        "match {} edited: {} history entries replaced, winner now {:?}",
        new.id,
        removed,
        new.winner_team()
    );
    new
}

/// Correct the score of a recorded group, semi-final or King match.
///
/// Finals are refused here; use [`edit_final`]. A semi-final whose winner changes is only
/// editable while no set of the final has been played, and the final pairing is rebuilt.
pub fn edit_match(
    tournament: &mut Tournament,
    members: &mut MemberDirectory,
    points: &PointsConfig,
    match_id: MatchId,
    score1: u8,
    score2: u8,
    now: DateTime<Utc>,
) -> Result<Match, EngineError> {
    let idx = position(tournament, match_id)?;
    let old = &tournament.matches[idx];
    if old.stage == Stage::Final {
        return Err(EngineError::FinalNotEditable(match_id));
    }
    validate_score(ScoreContext::for_stage(old.stage), score1, score2)?;
    let new_winner = Side::from_scores(score1, score2);
    let stage = old.stage;
    let group = old.group;
    let old_winner = old.winner_team();
    let winner_changed = new_winner != old.winner;

    if stage == Stage::Semi && winner_changed {
        let social = tournament.social()?;
        let final_started = social
            .final_progress
            .as_ref()
            .is_some_and(|p| !p.sets.is_empty())
            || tournament.matches.iter().any(|m| m.stage == Stage::Final);
        if final_started {
            return Err(EngineError::KnockoutAdvanced(match_id));
        }
    }

    let scoreline = Scoreline::Games {
        team1: score1,
        team2: score2,
    };
    let edited = rewrite(tournament, members, points, idx, scoreline, now);

    match (stage, group) {
        (Stage::Group, Some(g)) => {
            social::refresh_group_court(tournament, g, now)?;
            social::check_group_stage_end(tournament, now)?;
        }
        (Stage::Semi, _) if winner_changed => {
            if tournament.social()?.stage == SocialStage::Final {
                social::rebuild_final(tournament, now)?;
            }
        }
        (Stage::Plain, _) if winner_changed => repin_court_winner(tournament, old_winner, &edited),
        _ => {}
    }
    Ok(edited)
}

/// Move a King court pin to the corrected winner when the edited match is the one that put
/// the old winner there.
fn repin_court_winner(tournament: &mut Tournament, old_winner: Option<TeamId>, edited: &Match) {
    let Some(old_winner) = old_winner else {
        return;
    };
    let latest = tournament
        .matches
        .iter()
        .rev()
        .find(|m| m.involves(old_winner))
        .map(|m| m.id);
    if latest != Some(edited.id) {
        return;
    }
    let Tournament { state, courts, .. } = tournament;
    let FormatState::King(king) = state else {
        return;
    };
    let Some(court) = king
        .court_winners
        .iter()
        .find(|(_, t)| **t == old_winner)
        .map(|(c, _)| *c)
    else {
        return;
    };
    king.court_winners.remove(&court);
    let new_winner = edited.winner_team();
    if let Some(w) = new_winner {
        if courts.iter().all(|c| c.pairing.as_ref().map_or(true, |p| !p.involves(w))) {
            king.court_winners.retain(|_, t| *t != w);
            king.court_winners.insert(court, w);
        }
    }
    log::info!("king: court {} pin moved from {} to {:?}", court, old_winner, new_winner);
}

/// Replay the sets of a finished final. When the winner changes, the title entries move
/// from the old winning roster to the new one.
pub fn edit_final(
    tournament: &mut Tournament,
    members: &mut MemberDirectory,
    points: &PointsConfig,
    match_id: MatchId,
    sets: [SetScore; 2],
    tiebreak: Option<SetScore>,
    now: DateTime<Utc>,
) -> Result<Match, EngineError> {
    let idx = position(tournament, match_id)?;
    if tournament.matches[idx].stage != Stage::Final {
        return Err(EngineError::InvalidState("only a final can be replayed set by set"));
    }
    tournament.social()?;
    let scoreline = social::final_scoreline(sets, tiebreak)?;
    let edited = rewrite(tournament, members, points, idx, scoreline, now);
    if let FormatState::Social(s) = &mut tournament.state {
        s.champion = edited.winner_team();
    }
    Ok(edited)
}
