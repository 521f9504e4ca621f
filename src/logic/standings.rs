//! Standings derived by folding over the match log. Nothing here reads the cached team
//! counters, so every view can be recomputed at any time.

use crate::logic::effects::apply_team_effects;
use crate::models::{
    EngineError, Group, GroupId, Match, MemberDirectory, MemberId, MemberTotals, Stage, Team,
    TeamId, Tournament, GROUP_MATCHES,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub team_id: TeamId,
    pub team_name: String,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub game_differential: i64,
}

impl StandingRow {
    fn empty(team: &Team) -> Self {
        Self {
            team_id: team.id,
            team_name: team.name.clone(),
            played: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            games_won: 0,
            games_lost: 0,
            game_differential: 0,
        }
    }

    fn add(&mut self, m: &Match) {
        let Some((won, lost)) = m.games_for(self.team_id) else {
            return;
        };
        self.played += 1;
        self.games_won += won;
        self.games_lost += lost;
        self.game_differential = i64::from(self.games_won) - i64::from(self.games_lost);
        match m.winner_team() {
            Some(w) if w == self.team_id => self.wins += 1,
            Some(_) => self.losses += 1,
            None => self.draws += 1,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupStanding {
    pub group_id: GroupId,
    pub complete: bool,
    pub rows: Vec<StandingRow>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub member_id: MemberId,
    pub name: String,
    pub totals: MemberTotals,
}

fn fold_rows<'a>(
    teams: impl Iterator<Item = &'a Team>,
    matches: impl Iterator<Item = &'a Match> + Clone,
) -> Vec<StandingRow> {
    teams
        .map(|t| {
            let mut row = StandingRow::empty(t);
            for m in matches.clone() {
                row.add(m);
            }
            row
        })
        .collect()
}

/// Tournament standings: wins, then games won, then game differential. Roster order breaks
/// the remaining ties.
pub fn standings(tournament: &Tournament) -> Vec<StandingRow> {
    let mut rows = fold_rows(tournament.teams.iter(), tournament.matches.iter());
    rows.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then(b.games_won.cmp(&a.games_won))
            .then(b.game_differential.cmp(&a.game_differential))
    });
    rows
}

fn group_order(a: &StandingRow, b: &StandingRow) -> Ordering {
    b.wins
        .cmp(&a.wins)
        .then(b.game_differential.cmp(&a.game_differential))
        .then(b.games_won.cmp(&a.games_won))
}

/// Standings of one group over its group-stage matches: wins, then game differential,
/// then games won, then board order.
pub fn rank_group(tournament: &Tournament, group: &Group) -> GroupStanding {
    let teams = group.teams.iter().filter_map(|id| tournament.team(*id));
    let matches = tournament
        .matches
        .iter()
        .filter(|m| m.stage == Stage::Group && m.group == Some(group.id));
    let complete = matches.clone().count() >= GROUP_MATCHES;
    let mut rows = fold_rows(teams, matches);
    rows.sort_by(group_order);
    GroupStanding {
        group_id: group.id,
        complete,
        rows,
    }
}

/// Standings of every group of a Social tournament.
pub fn group_standings(tournament: &Tournament) -> Result<Vec<GroupStanding>, EngineError> {
    let social = tournament.social()?;
    Ok(social
        .groups
        .iter()
        .map(|g| rank_group(tournament, g))
        .collect())
}

/// Members by points, then wins, then name. Totals are folded from history.
pub fn member_leaderboard(members: &MemberDirectory) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = members
        .iter()
        .map(|m| LeaderboardRow {
            member_id: m.id,
            name: m.name.clone(),
            totals: m.folded_totals(),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.totals
            .points
            .cmp(&a.totals.points)
            .then(b.totals.wins.cmp(&a.totals.wins))
            .then(a.name.cmp(&b.name))
    });
    rows
}

/// Team counters recomputed from scratch by replaying the match log.
pub fn recompute_team_stats(tournament: &Tournament) -> Vec<Team> {
    let mut teams = tournament.teams.clone();
    for t in &mut teams {
        t.reset_stats();
    }
    for m in &tournament.matches {
        apply_team_effects(&mut teams, m);
    }
    teams
}

/// Ids of teams whose cached counters differ from a replay of the match log.
pub fn verify_team_stats(tournament: &Tournament) -> Vec<TeamId> {
    recompute_team_stats(tournament)
        .iter()
        .zip(&tournament.teams)
        .filter(|(fresh, cached)| fresh != cached)
        .map(|(fresh, _)| fresh.id)
        .collect()
}
