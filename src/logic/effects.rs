//! Effects of a recorded match on team and member aggregates, and their exact inverse.
//!
//! The recorder applies, the editor reverts then re-applies; both go through here so the
//! two paths cannot drift apart.

use crate::config::PointsConfig;
use crate::models::{
    Match, MemberDirectory, MemberId, PointsEntry, ResultLabel, Side, Stage, Team, TeamDelta,
    Tournament,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// Deltas for (team1, team2).
pub(crate) fn team_deltas(m: &Match) -> (TeamDelta, TeamDelta) {
    let (g1, g2) = m.scoreline.games();
    let mut d1 = TeamDelta {
        games_won: g1,
        games_lost: g2,
        ..TeamDelta::default()
    };
    let mut d2 = TeamDelta {
        games_won: g2,
        games_lost: g1,
        ..TeamDelta::default()
    };
    match m.winner {
        Some(Side::One) => {
            d1.wins = 1;
            d2.losses = 1;
        }
        Some(Side::Two) => {
            d1.losses = 1;
            d2.wins = 1;
        }
        None => {
            d1.draws = 1;
            d2.draws = 1;
        }
    }
    (d1, d2)
}

pub(crate) fn apply_team_effects(teams: &mut [Team], m: &Match) {
    let (d1, d2) = team_deltas(m);
    for t in teams.iter_mut() {
        if t.id == m.team1 {
            t.apply(&d1);
        } else if t.id == m.team2 {
            t.apply(&d2);
        }
    }
}

pub(crate) fn revert_team_effects(teams: &mut [Team], m: &Match) {
    let (d1, d2) = team_deltas(m);
    for t in teams.iter_mut() {
        if t.id == m.team1 {
            t.revert(&d1);
        } else if t.id == m.team2 {
            t.revert(&d2);
        }
    }
}

/// Distinct members of both rosters, team1's first, each with the side they play on.
fn roster_members(tournament: &Tournament, m: &Match) -> Vec<(MemberId, Side)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for side in [Side::One, Side::Two] {
        if let Some(team) = tournament.team(m.team(side)) {
            for id in &team.members {
                if seen.insert(*id) {
                    out.push((*id, side));
                }
            }
        }
    }
    out
}

fn team_name(tournament: &Tournament, m: &Match, side: Side) -> Option<String> {
    tournament.team(m.team(side)).map(|t| t.name.clone())
}

/// Append join bonuses (first match in this tournament), result entries and, for a won
/// final, title entries for every member on either roster.
pub(crate) fn apply_member_effects(
    tournament: &Tournament,
    members: &mut MemberDirectory,
    m: &Match,
    points: &PointsConfig,
    now: DateTime<Utc>,
) {
    let format = tournament.format();
    for (member_id, side) in roster_members(tournament, m) {
        let Some(member) = members.get_mut(member_id) else {
            log::warn!(
                "member {} on team {} is not in the directory; no history written",
                member_id,
                m.team(side)
            );
            continue;
        };
        let own = team_name(tournament, m, side).unwrap_or_default();
        let opponent = team_name(tournament, m, side.other());
        let entry = |match_id, result, pts, stage| PointsEntry {
            id: Uuid::new_v4(),
            recorded_at: now,
            match_id,
            team_name: own.clone(),
            opponent_name: opponent.clone(),
            result,
            points: pts,
            tournament_id: tournament.id,
            tournament_format: format,
            stage,
        };

        if !member.has_joined(tournament.id) {
            let mut join = entry(None, ResultLabel::Join, points.join_bonus, None);
            join.opponent_name = None;
            member.push_entry(join);
        }

        let (result, pts) = match m.winner {
            Some(w) if w == side => (ResultLabel::Win, points.win_points(m.stage)),
            Some(_) => (ResultLabel::Loss, 0),
            None => (ResultLabel::Draw, 0),
        };
        member.push_entry(entry(Some(m.id), result, pts, Some(m.stage)));

        if m.stage == Stage::Final && result == ResultLabel::Win {
            member.push_entry(entry(
                Some(m.id),
                ResultLabel::Title,
                points.title,
                Some(Stage::Final),
            ));
        }
    }
}

/// Remove every history entry tied to `m` from every member. Returns how many were removed.
pub(crate) fn revert_member_effects(
    tournament: &Tournament,
    members: &mut MemberDirectory,
    m: &Match,
) -> usize {
    members
        .iter_mut()
        .map(|member| member.remove_match_entries(tournament.id, m.id).len())
        .sum()
}

/// Title entries for a host-awarded championship (King format), not tied to any match.
pub(crate) fn award_title_entries(
    tournament: &Tournament,
    members: &mut MemberDirectory,
    team: &Team,
    points: &PointsConfig,
    now: DateTime<Utc>,
) {
    for member_id in &team.members {
        let Some(member) = members.get_mut(*member_id) else {
            log::warn!("member {} is not in the directory; title not written", member_id);
            continue;
        };
        member.push_entry(PointsEntry {
            id: Uuid::new_v4(),
            recorded_at: now,
            match_id: None,
            team_name: team.name.clone(),
            opponent_name: None,
            result: ResultLabel::Title,
            points: points.title,
            tournament_id: tournament.id,
            tournament_format: tournament.format(),
            stage: None,
        });
    }
}
