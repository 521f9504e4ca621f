//! Social format: three-team groups with a loser-stays rotation, group-winner
//! qualification, two semi-finals and a set-based final.
//!
//! Stage transitions are derived from the match log and only ever move forward.

use crate::config::PointsConfig;
use crate::logic::effects::{apply_member_effects, apply_team_effects};
use crate::logic::standings::rank_group;
use crate::logic::validator::{validate_score, ScoreContext};
use crate::models::{
    pair_key, CourtSlot, EngineError, FinalProgress, FormatState, Group, GroupId, Match,
    MemberDirectory, Pairing, Scoreline, SetScore, Side, SocialStage, SocialState, Stage, TeamId,
    Tournament, TournamentFormat, GROUP_MATCHES, GROUP_SIZE,
};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Result of recording one set (or the tiebreak) of the final.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalSetOutcome {
    /// More sets are needed; nothing has been applied to standings yet.
    InProgress(FinalProgress),
    /// The final is decided and recorded.
    Finished(Match),
}

fn social_parts(
    tournament: &mut Tournament,
) -> Result<(&mut SocialState, &mut Vec<CourtSlot>, &Vec<Match>), EngineError> {
    let Tournament {
        state,
        courts,
        matches,
        ..
    } = tournament;
    match state {
        FormatState::Social(s) => Ok((s, courts, matches)),
        FormatState::King(_) => Err(EngineError::WrongFormat {
            expected: TournamentFormat::Social,
            actual: TournamentFormat::King,
        }),
    }
}

fn ensure_groups_editable(tournament: &Tournament) -> Result<(), EngineError> {
    let social = tournament.social()?;
    if social.stage != SocialStage::Group
        || !tournament.matches.is_empty()
        || tournament.courts.iter().any(|c| !c.is_free())
    {
        return Err(EngineError::InvalidState(
            "groups can only be changed before any match is played",
        ));
    }
    Ok(())
}

/// Set the groups explicitly. Each group must have exactly three distinct roster teams and
/// no team may appear in two groups.
pub fn set_groups(
    tournament: &mut Tournament,
    groups: Vec<Vec<TeamId>>,
) -> Result<(), EngineError> {
    ensure_groups_editable(tournament)?;
    if groups.is_empty() {
        return Err(EngineError::InvalidGroups("no groups given".into()));
    }
    let mut seen = HashSet::new();
    for (i, teams) in groups.iter().enumerate() {
        if teams.len() != GROUP_SIZE {
            return Err(EngineError::InvalidGroups(format!(
                "group {} has {} teams, expected {}",
                i + 1,
                teams.len(),
                GROUP_SIZE
            )));
        }
        for t in teams {
            tournament.require_team(*t)?;
            if !seen.insert(*t) {
                return Err(EngineError::InvalidGroups(format!(
                    "team {} appears more than once",
                    t
                )));
            }
        }
    }
    let (social, _, _) = social_parts(tournament)?;
    social.groups = groups
        .into_iter()
        .enumerate()
        .map(|(i, teams)| Group::new(i as GroupId + 1, teams))
        .collect();
    social.qualified.clear();
    log::info!("social: {} groups set", social.groups.len());
    Ok(())
}

/// Shuffle the roster into groups of three. The roster size must be a multiple of three.
pub fn draw_groups<R: Rng + ?Sized>(
    tournament: &mut Tournament,
    rng: &mut R,
) -> Result<Vec<Group>, EngineError> {
    let mut ids: Vec<TeamId> = tournament.teams.iter().map(|t| t.id).collect();
    if ids.len() < GROUP_SIZE || ids.len() % GROUP_SIZE != 0 {
        return Err(EngineError::InvalidGroups(format!(
            "{} teams cannot be split into groups of {}",
            ids.len(),
            GROUP_SIZE
        )));
    }
    ids.shuffle(rng);
    let groups = ids.chunks_exact(GROUP_SIZE).map(<[TeamId]>::to_vec).collect();
    set_groups(tournament, groups)?;
    Ok(tournament.social()?.groups.clone())
}

/// Recorded matches of one group, in recording order.
pub fn group_matches<'a>(group: &Group, matches: &'a [Match]) -> Vec<&'a Match> {
    matches
        .iter()
        .filter(|m| m.stage == Stage::Group && m.group == Some(group.id))
        .collect()
}

pub fn group_complete(group: &Group, matches: &[Match]) -> bool {
    group_matches(group, matches).len() >= GROUP_MATCHES
}

/// Next pairing of a group under the loser-stays order, or None when all three are played.
///
/// Match 1 is team 0 vs team 1. Match 2 is the loser of match 1, on the same side of the
/// board, against team 2. Match 3 is team 2 against the winner of match 1. A tie in match
/// 1 falls back to the first unplayed pair in group order.
pub fn next_group_pairing(group: &Group, matches: &[Match]) -> Option<(TeamId, TeamId)> {
    let [t0, t1, t2] = group.teams[..] else {
        return None;
    };
    let played = group_matches(group, matches);
    let has_played = |a: TeamId, b: TeamId| played.iter().any(|m| m.is_between(a, b));
    let first_unplayed = || {
        [(t0, t1), (t0, t2), (t1, t2)]
            .into_iter()
            .find(|(a, b)| !has_played(*a, *b))
    };
    match played.as_slice() {
        [] => Some((t0, t1)),
        [m1] => match m1.winner {
            Some(w) => {
                let loser_side = w.other();
                let loser = m1.team(loser_side);
                let pairing = match loser_side {
                    Side::One => (loser, t2),
                    Side::Two => (t2, loser),
                };
                if has_played(pairing.0, pairing.1) {
                    first_unplayed()
                } else {
                    Some(pairing)
                }
            }
            None => first_unplayed(),
        },
        [m1, _] => match m1.winner_team() {
            Some(w) if w != t2 && !has_played(t2, w) => Some((t2, w)),
            _ => first_unplayed(),
        },
        _ => None,
    }
}

/// Winner of a completed group: wins, then game differential, then games won.
pub fn group_winner(tournament: &Tournament, group: &Group) -> Option<TeamId> {
    if !group_complete(group, &tournament.matches) {
        return None;
    }
    rank_group(tournament, group).rows.first().map(|r| r.team_id)
}

/// Group winners of every completed group, in group order.
pub fn qualifiers(tournament: &Tournament) -> Result<Vec<TeamId>, EngineError> {
    let social = tournament.social()?;
    Ok(social
        .groups
        .iter()
        .filter_map(|g| group_winner(tournament, g))
        .collect())
}

fn all_groups_complete(tournament: &Tournament) -> Result<bool, EngineError> {
    let social = tournament.social()?;
    Ok(!social.groups.is_empty()
        && social
            .groups
            .iter()
            .all(|g| group_complete(g, &tournament.matches)))
}

/// Put queued knockout pairings (and, in the group stage, the next pairing of every idle
/// group) on free courts. Returns the courts that received a pairing. A no-op while the
/// knockout matches are already in flight.
pub fn assign_matches(
    tournament: &mut Tournament,
    now: DateTime<Utc>,
) -> Result<Vec<usize>, EngineError> {
    let stage = tournament.social()?.stage;
    let mut assigned = place_queue(tournament, now)?;
    if stage != SocialStage::Group {
        return Ok(assigned);
    }
    let (social, courts, matches) = social_parts(tournament)?;
    if social.groups.is_empty() {
        return Err(EngineError::InvalidState("groups are not set"));
    }
    for group in &social.groups {
        let on_court = courts
            .iter()
            .any(|c| c.pairing.as_ref().is_some_and(|p| p.group == Some(group.id)));
        if on_court {
            continue;
        }
        let Some((a, b)) = next_group_pairing(group, matches) else {
            continue;
        };
        let Some(court) = courts.iter().position(CourtSlot::is_free) else {
            break;
        };
        courts[court].assign(Pairing::in_group(a, b, group.id), now);
        log::debug!("social: group {} plays {} vs {} on court {}", group.id, a, b, court);
        assigned.push(court);
    }
    Ok(assigned)
}

fn place_queue(tournament: &mut Tournament, now: DateTime<Utc>) -> Result<Vec<usize>, EngineError> {
    let (social, courts, _) = social_parts(tournament)?;
    let mut assigned = Vec::new();
    while !social.queue.is_empty() {
        let Some(court) = courts.iter().position(CourtSlot::is_free) else {
            break;
        };
        let pairing = social.queue.remove(0);
        log::debug!(
            "social: {} {} vs {} on court {}",
            pairing.stage,
            pairing.team1,
            pairing.team2,
            court
        );
        courts[court].assign(pairing, now);
        assigned.push(court);
    }
    Ok(assigned)
}

/// Advance the stage engine after a group or semi-final match was recorded on `court`.
pub(crate) fn advance_after_match(
    tournament: &mut Tournament,
    court: usize,
    recorded: &Match,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    match recorded.stage {
        Stage::Group => {
            let (social, courts, matches) = social_parts(tournament)?;
            let next = social
                .groups
                .iter()
                .find(|g| Some(g.id) == recorded.group)
                .and_then(|g| next_group_pairing(g, matches).map(|p| (g.id, p)));
            match next {
                Some((group, (a, b))) => courts[court].assign(Pairing::in_group(a, b, group), now),
                None => courts[court].clear(),
            }
            check_group_stage_end(tournament, now)?;
        }
        Stage::Semi => {
            tournament.courts[court].clear();
            check_semis_end(tournament, now)?;
        }
        Stage::Plain | Stage::Final => {
            tournament.courts[court].clear();
        }
    }
    place_queue(tournament, now)?;
    Ok(())
}

/// Group stage -> semi-finals (4 qualifiers) or straight to the final (2 qualifiers).
pub(crate) fn check_group_stage_end(
    tournament: &mut Tournament,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if tournament.social()?.stage != SocialStage::Group {
        return Ok(());
    }
    let qualified = qualifiers(tournament)?;
    let complete = all_groups_complete(tournament)?;
    let (social, _, _) = social_parts(tournament)?;
    social.qualified = qualified.clone();
    if !complete {
        return Ok(());
    }
    match qualified.as_slice() {
        [a, b, c, d] => queue_semis(social, [*a, *b, *c, *d]),
        [a, b] => queue_final(social, *a, *b),
        _ => log::warn!(
            "social: {} qualifiers; waiting for the host to seed the semi-finals",
            qualified.len()
        ),
    }
    place_queue(tournament, now)?;
    Ok(())
}

fn queue_semis(social: &mut SocialState, q: [TeamId; 4]) {
    social.queue.push(Pairing::new(q[0], q[1], Stage::Semi));
    social.queue.push(Pairing::new(q[2], q[3], Stage::Semi));
    social.stage = SocialStage::Semi;
    log::info!("social: semi-finals {} vs {} and {} vs {}", q[0], q[1], q[2], q[3]);
}

fn queue_final(social: &mut SocialState, a: TeamId, b: TeamId) {
    social.queue.push(Pairing::new(a, b, Stage::Final));
    social.final_progress = Some(FinalProgress::default());
    social.stage = SocialStage::Final;
    log::info!("social: final {} vs {}", a, b);
}

/// Winners of the two semi-finals, in semi order, once both are recorded.
pub(crate) fn semi_winners(matches: &[Match]) -> Option<(TeamId, TeamId)> {
    let semis: Vec<&Match> = matches.iter().filter(|m| m.stage == Stage::Semi).collect();
    match semis.as_slice() {
        [s1, s2] => Some((s1.winner_team()?, s2.winner_team()?)),
        _ => None,
    }
}

fn check_semis_end(tournament: &mut Tournament, now: DateTime<Utc>) -> Result<(), EngineError> {
    let Some((a, b)) = semi_winners(&tournament.matches) else {
        return Ok(());
    };
    let (social, _, _) = social_parts(tournament)?;
    if social.stage != SocialStage::Semi {
        return Ok(());
    }
    queue_final(social, a, b);
    place_queue(tournament, now)?;
    Ok(())
}

/// Host override when the groups did not produce exactly four qualifiers.
pub fn seed_semis(
    tournament: &mut Tournament,
    teams: [TeamId; 4],
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if tournament.social()?.stage != SocialStage::Group || !all_groups_complete(tournament)? {
        return Err(EngineError::InvalidState(
            "semi-finals can only be seeded once every group is complete",
        ));
    }
    let distinct: HashSet<TeamId> = teams.iter().copied().collect();
    if distinct.len() != teams.len() {
        return Err(EngineError::InvalidGroups("semi-final teams must be distinct".into()));
    }
    for t in teams {
        tournament.require_team(t)?;
    }
    let (social, _, _) = social_parts(tournament)?;
    social.qualified = teams.to_vec();
    queue_semis(social, teams);
    place_queue(tournament, now)?;
    Ok(())
}

/// Build the final's scoreline from two sets and an optional tiebreak, validating each
/// part. The tiebreak is required exactly when the sets split 1-1.
pub fn final_scoreline(
    sets: [SetScore; 2],
    tiebreak: Option<SetScore>,
) -> Result<Scoreline, EngineError> {
    for s in &sets {
        validate_score(ScoreContext::FinalSet, s.team1, s.team2)?;
    }
    let split = sets[0].winner() != sets[1].winner();
    match (split, tiebreak) {
        (true, Some(tb)) => validate_score(ScoreContext::FinalTiebreak, tb.team1, tb.team2)?,
        (true, None) => {
            return Err(EngineError::InvalidState("sets are split; a tiebreak is required"))
        }
        (false, Some(_)) => {
            return Err(EngineError::InvalidState("a tiebreak is only played when sets split"))
        }
        (false, None) => {}
    }
    Ok(Scoreline::Sets { sets, tiebreak })
}

/// Record one set (or the tiebreak) of the final on `court`. Team and member aggregates are
/// only touched when the final resolves: a 2-0 sweep or the tiebreak after 1-1.
pub fn record_final_set(
    tournament: &mut Tournament,
    members: &mut MemberDirectory,
    points: &PointsConfig,
    court: usize,
    score1: u8,
    score2: u8,
    now: DateTime<Utc>,
) -> Result<FinalSetOutcome, EngineError> {
    let social = tournament.social()?;
    if social.stage != SocialStage::Final {
        return Err(EngineError::InvalidState("the final has not started"));
    }
    let pairing = tournament
        .court(court)?
        .pairing
        .clone()
        .ok_or(EngineError::CourtEmpty(court))?;
    if pairing.stage != Stage::Final {
        return Err(EngineError::InvalidState("the match on this court is not the final"));
    }
    let already = tournament
        .matches
        .iter()
        .any(|m| m.stage == Stage::Final && m.is_between(pairing.team1, pairing.team2));
    if already {
        return Err(EngineError::DuplicateMatch {
            team1: pairing.team1,
            team2: pairing.team2,
            stage: Stage::Final,
        });
    }

    let mut progress = social.final_progress.clone().unwrap_or_default();
    let set = SetScore::new(score1, score2);
    let scoreline = if progress.sets.len() < 2 {
        validate_score(ScoreContext::FinalSet, score1, score2)?;
        progress.sets.push(set);
        match progress.sets.as_slice() {
            [s1, s2] if s1.winner() == s2.winner() => Some(Scoreline::Sets {
                sets: [*s1, *s2],
                tiebreak: None,
            }),
            _ => None,
        }
    } else {
        validate_score(ScoreContext::FinalTiebreak, score1, score2)?;
        progress.tiebreak = Some(set);
        Some(Scoreline::Sets {
            sets: [progress.sets[0], progress.sets[1]],
            tiebreak: Some(set),
        })
    };

    let Some(scoreline) = scoreline else {
        let (social, _, _) = social_parts(tournament)?;
        social.final_progress = Some(progress.clone());
        log::debug!("social: final set {} recorded ({}-{})", progress.sets.len(), score1, score2);
        return Ok(FinalSetOutcome::InProgress(progress));
    };

    let id = tournament.allocate_match_id();
    let m = Match {
        id,
        team1: pairing.team1,
        team2: pairing.team2,
        winner: scoreline.winner(),
        scoreline,
        played_at: now,
        stage: Stage::Final,
        group: None,
    };
    apply_team_effects(&mut tournament.teams, &m);
    apply_member_effects(tournament, members, &m, points, now);
    tournament.matches.push(m.clone());
    tournament.courts[court].clear();
    let champion = m.winner_team();
    let (social, _, _) = social_parts(tournament)?;
    social.final_progress = None;
    social.champion = champion;
    log::info!(
        "social: final {} vs {} decided, champion {:?}",
        m.team1,
        m.team2,
        champion
    );
    Ok(FinalSetOutcome::Finished(m))
}

/// Re-derive the group pairing on court after a group match was edited.
pub(crate) fn refresh_group_court(
    tournament: &mut Tournament,
    group: GroupId,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let (social, courts, matches) = social_parts(tournament)?;
    if social.stage != SocialStage::Group {
        log::warn!(
            "social: group {} edited after the group stage ended; knockout unchanged",
            group
        );
        return Ok(());
    }
    let Some(g) = social.groups.iter().find(|g| g.id == group) else {
        return Ok(());
    };
    let next = next_group_pairing(g, matches);
    if let Some(court) = courts
        .iter()
        .position(|c| c.pairing.as_ref().is_some_and(|p| p.group == Some(group)))
    {
        let current = courts[court].pairing.as_ref().map(Pairing::key);
        match next {
            Some((a, b)) if current != Some(pair_key(a, b)) => {
                log::info!("social: group {} now plays {} vs {} on court {}", group, a, b, court);
                courts[court].assign(Pairing::in_group(a, b, group), now);
            }
            Some(_) => {}
            None => courts[court].clear(),
        }
    }
    Ok(())
}

/// Rebuild the final pairing after a semi-final winner changed. Only valid while no set of
/// the final has been recorded.
pub(crate) fn rebuild_final(
    tournament: &mut Tournament,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let Some((a, b)) = semi_winners(&tournament.matches) else {
        return Ok(());
    };
    let (social, courts, _) = social_parts(tournament)?;
    if social.stage != SocialStage::Final {
        return Ok(());
    }
    let fresh = Pairing::new(a, b, Stage::Final);
    if let Some(slot) = courts
        .iter_mut()
        .find(|c| c.pairing.as_ref().is_some_and(|p| p.stage == Stage::Final))
    {
        slot.assign(fresh, now);
    } else if let Some(queued) = social.queue.iter_mut().find(|p| p.stage == Stage::Final) {
        *queued = fresh;
    }
    social.final_progress = Some(FinalProgress::default());
    log::info!("social: final rebuilt as {} vs {}", a, b);
    Ok(())
}
