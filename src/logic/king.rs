//! King of the Court scheduling: winners keep their court and face a fresh challenger.
//!
//! [`generate_round`] is pure: it reads the roster, the match log, the current courts and
//! the court winners, and builds a fresh set of court slots.

use crate::config::KingConfig;
use crate::models::{pair_key, CourtSlot, EngineError, Match, Pairing, Stage, Team, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A pairing the scheduler had to repeat because no fresh opponent was left.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ForcedRepeat {
    pub court: usize,
    pub team1: TeamId,
    pub team2: TeamId,
    /// How many times these teams had already met.
    pub times_played: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoundPlan {
    pub courts: Vec<CourtSlot>,
    pub forced_repeats: Vec<ForcedRepeat>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoundOutcome {
    Scheduled(RoundPlan),
    /// Fewer than two teams still have matches to play.
    Complete,
}

/// Build the next round of court assignments.
///
/// 1. Each court winner stays and gets a challenger: not pinned elsewhere and not yet
///    played, then not yet played, then a repeat against the team with the fewest matches
///    (least-met and longest-ago first, best game differential breaking ties).
/// 2. Without any winners, still-legal in-flight pairings are carried over.
/// 3. Empty courts get an unplayed pair, then a pair that did not meet in the latest round,
///    then a forced repeat between the teams with fewest fresh opponents left. Teams with
///    fewer matches go first in every tier; roster order breaks ties.
/// 4. A bounded repair pass clears and refills any court holding a team or pairing seen on
///    an earlier court.
///
/// Recency and usage come from the match log, so the result is the same whether the host
/// schedules straight after recording or later.
pub fn generate_round(
    teams: &[Team],
    matches: &[Match],
    courts: &[CourtSlot],
    court_winners: &BTreeMap<usize, TeamId>,
    config: &KingConfig,
    now: DateTime<Utc>,
) -> Result<RoundOutcome, EngineError> {
    let mut builder = RoundBuilder::new(teams, matches, courts.len(), config.matches_per_team);
    if builder.eligible.len() < 2 {
        log::info!(
            "king round: fewer than two teams below {} matches, complete",
            config.matches_per_team
        );
        return Ok(RoundOutcome::Complete);
    }

    let pinned: HashSet<TeamId> = court_winners.values().copied().collect();
    for (&court, &winner) in court_winners {
        if court >= builder.slots.len() || !builder.is_available(winner) {
            continue;
        }
        if let Some(challenger) = builder.pick_challenger(winner, &pinned) {
            log::debug!("king round: court {} keeps winner {} vs {}", court, winner, challenger);
            builder.place(court, winner, challenger);
        }
    }

    if court_winners.is_empty() {
        for (court, slot) in courts.iter().enumerate().take(builder.slots.len()) {
            let Some(p) = &slot.pairing else { continue };
            if builder.slots[court].is_none()
                && builder.is_available(p.team1)
                && builder.is_available(p.team2)
                && p.team1 != p.team2
                && !builder.has_played(p.team1, p.team2)
            {
                log::debug!("king round: court {} carries over {} vs {}", court, p.team1, p.team2);
                builder.place(court, p.team1, p.team2);
            }
        }
    }

    for court in 0..builder.slots.len() {
        if builder.slots[court].is_none() {
            builder.fill(court);
        }
    }

    builder.repair(config.max_repair_attempts)?;
    Ok(RoundOutcome::Scheduled(builder.finish(courts, now)))
}

/// Check that no team and no unordered pairing appears on two courts.
pub fn validate_round(courts: &[CourtSlot]) -> Result<(), EngineError> {
    match first_conflict(courts.iter().map(|c| c.pairing.as_ref())) {
        None => Ok(()),
        Some(court) => Err(EngineError::InvariantViolation(format!(
            "court {} repeats a team or pairing already on another court",
            court
        ))),
    }
}

fn first_conflict<'a>(slots: impl Iterator<Item = Option<&'a Pairing>>) -> Option<usize> {
    let mut seen_teams = HashSet::new();
    let mut seen_pairs = HashSet::new();
    for (court, pairing) in slots.enumerate() {
        let Some(p) = pairing else { continue };
        if p.team1 == p.team2
            || !seen_pairs.insert(p.key())
            || !seen_teams.insert(p.team1)
            || !seen_teams.insert(p.team2)
        {
            return Some(court);
        }
    }
    None
}

struct RoundBuilder {
    /// Teams below the match cap, in roster order.
    eligible: Vec<TeamId>,
    order: HashMap<TeamId, usize>,
    played: HashMap<(TeamId, TeamId), u32>,
    /// Log position of the latest meeting of each pairing.
    last_met: HashMap<(TeamId, TeamId), usize>,
    match_count: HashMap<TeamId, u32>,
    differential: HashMap<TeamId, i64>,
    /// Pairings of the latest round: the last `court_count` matches in the log.
    recent: HashSet<(TeamId, TeamId)>,
    slots: Vec<Option<Pairing>>,
    used: HashSet<TeamId>,
    placed: HashSet<(TeamId, TeamId)>,
}

impl RoundBuilder {
    fn new(teams: &[Team], matches: &[Match], court_count: usize, cap: u32) -> Self {
        let mut played = HashMap::new();
        let mut last_met = HashMap::new();
        let mut match_count: HashMap<TeamId, u32> = HashMap::new();
        let mut differential: HashMap<TeamId, i64> = HashMap::new();
        for (position, m) in matches.iter().enumerate() {
            let key = pair_key(m.team1, m.team2);
            *played.entry(key).or_insert(0) += 1;
            last_met.insert(key, position);
            for team in [m.team1, m.team2] {
                *match_count.entry(team).or_insert(0) += 1;
                if let Some((won, lost)) = m.games_for(team) {
                    *differential.entry(team).or_insert(0) += i64::from(won) - i64::from(lost);
                }
            }
        }
        let eligible: Vec<TeamId> = teams
            .iter()
            .map(|t| t.id)
            .filter(|id| match_count.get(id).copied().unwrap_or(0) < cap)
            .collect();
        let order = teams.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        let recent = matches
            .iter()
            .rev()
            .take(court_count)
            .map(|m| pair_key(m.team1, m.team2))
            .collect();
        Self {
            eligible,
            order,
            played,
            last_met,
            match_count,
            differential,
            recent,
            slots: vec![None; court_count],
            used: HashSet::new(),
            placed: HashSet::new(),
        }
    }

    fn times_played(&self, a: TeamId, b: TeamId) -> u32 {
        self.played.get(&pair_key(a, b)).copied().unwrap_or(0)
    }

    fn has_played(&self, a: TeamId, b: TeamId) -> bool {
        self.times_played(a, b) > 0
    }

    fn matches_of(&self, team: TeamId) -> u32 {
        self.match_count.get(&team).copied().unwrap_or(0)
    }

    fn rank(&self, team: TeamId) -> usize {
        self.order.get(&team).copied().unwrap_or(usize::MAX)
    }

    /// Position of the latest meeting, or None when the teams never met.
    fn last_meeting(&self, a: TeamId, b: TeamId) -> Option<usize> {
        self.last_met.get(&pair_key(a, b)).copied()
    }

    fn is_available(&self, team: TeamId) -> bool {
        !self.used.contains(&team) && self.eligible.contains(&team)
    }

    /// Free teams, fewest matches first, then roster order.
    fn available(&self) -> Vec<TeamId> {
        let mut free: Vec<TeamId> = self
            .eligible
            .iter()
            .copied()
            .filter(|t| !self.used.contains(t))
            .collect();
        free.sort_by_key(|t| (self.matches_of(*t), self.rank(*t)));
        free
    }

    fn place(&mut self, court: usize, team1: TeamId, team2: TeamId) {
        let mut pairing = Pairing::new(team1, team2, Stage::Plain);
        pairing.forced_repeat = self.has_played(team1, team2);
        self.used.insert(team1);
        self.used.insert(team2);
        self.placed.insert(pairing.key());
        self.slots[court] = Some(pairing);
    }

    fn pick_challenger(&self, winner: TeamId, pinned: &HashSet<TeamId>) -> Option<TeamId> {
        let candidates: Vec<TeamId> = self
            .available()
            .into_iter()
            .filter(|t| *t != winner && !self.placed.contains(&pair_key(winner, *t)))
            .collect();
        candidates
            .iter()
            .copied()
            .find(|t| !pinned.contains(t) && !self.has_played(winner, *t))
            .or_else(|| candidates.iter().copied().find(|t| !self.has_played(winner, *t)))
            .or_else(|| {
                candidates.iter().copied().min_by_key(|t| {
                    (
                        self.matches_of(*t),
                        self.times_played(winner, *t),
                        self.last_meeting(winner, *t),
                        -self.differential.get(t).copied().unwrap_or(0),
                        self.rank(*t),
                    )
                })
            })
    }

    /// Sort key for a candidate pair: fewest combined matches, then roster order.
    fn pair_load(&self, (a, b): (TeamId, TeamId)) -> (u32, usize, usize) {
        (self.matches_of(a) + self.matches_of(b), self.rank(a), self.rank(b))
    }

    /// Fill one empty court. Returns false when fewer than two teams are free.
    fn fill(&mut self, court: usize) -> bool {
        let avail = self.available();
        if avail.len() < 2 {
            return false;
        }
        let pairs: Vec<(TeamId, TeamId)> = avail
            .iter()
            .enumerate()
            .flat_map(|(i, a)| avail[i + 1..].iter().map(move |b| (*a, *b)))
            .map(|(a, b)| if self.rank(a) <= self.rank(b) { (a, b) } else { (b, a) })
            .filter(|(a, b)| !self.placed.contains(&pair_key(*a, *b)))
            .collect();

        let choice = pairs
            .iter()
            .copied()
            .filter(|(a, b)| !self.has_played(*a, *b))
            .min_by_key(|p| self.pair_load(*p))
            .or_else(|| {
                pairs
                    .iter()
                    .copied()
                    .filter(|(a, b)| !self.recent.contains(&pair_key(*a, *b)))
                    .min_by_key(|p| {
                        let (load, first, second) = self.pair_load(*p);
                        let (x, y) = *p;
                        (load, self.times_played(x, y), self.last_meeting(x, y), first, second)
                    })
            })
            .or_else(|| self.fewest_options_pair(&avail));

        match choice {
            Some((a, b)) => {
                self.place(court, a, b);
                true
            }
            None => false,
        }
    }

    /// The two free teams with the fewest unplayed opponents left among eligible teams.
    fn fewest_options_pair(&self, avail: &[TeamId]) -> Option<(TeamId, TeamId)> {
        let mut by_options: Vec<(usize, u32, usize, TeamId)> = avail
            .iter()
            .map(|t| {
                let options = self
                    .eligible
                    .iter()
                    .filter(|o| *o != t && !self.has_played(*t, **o))
                    .count();
                (options, self.matches_of(*t), self.rank(*t), *t)
            })
            .collect();
        by_options.sort();
        match by_options.as_slice() {
            [(_, _, _, a), (_, _, _, b), ..] => Some((*a, *b)),
            _ => None,
        }
    }

    fn rebuild_usage(&mut self) {
        self.used.clear();
        self.placed.clear();
        for p in self.slots.iter().flatten() {
            self.used.insert(p.team1);
            self.used.insert(p.team2);
            self.placed.insert(p.key());
        }
    }

    fn conflict(&self) -> Option<usize> {
        first_conflict(self.slots.iter().map(Option::as_ref))
    }

    /// Clear and refill conflicting courts, at most `max_attempts` times.
    fn repair(&mut self, max_attempts: usize) -> Result<(), EngineError> {
        for attempt in 0..max_attempts {
            let Some(court) = self.conflict() else {
                return Ok(());
            };
            log::warn!("king round: clearing court {} (repair attempt {})", court, attempt + 1);
            self.slots[court] = None;
            self.rebuild_usage();
            self.fill(court);
        }
        match self.conflict() {
            None => Ok(()),
            Some(court) => Err(EngineError::InvariantViolation(format!(
                "court {} still conflicts after {} repair attempts",
                court, max_attempts
            ))),
        }
    }

    fn finish(self, previous: &[CourtSlot], now: DateTime<Utc>) -> RoundPlan {
        let mut forced_repeats = Vec::new();
        let courts = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(index, pairing)| {
                let Some(pairing) = pairing else {
                    return CourtSlot::empty(index);
                };
                if pairing.forced_repeat {
                    let times_played = self.played.get(&pairing.key()).copied().unwrap_or(0);
                    log::warn!(
                        "king round: forced repeat on court {}: {} vs {} (met {} times)",
                        index,
                        pairing.team1,
                        pairing.team2,
                        times_played
                    );
                    forced_repeats.push(ForcedRepeat {
                        court: index,
                        team1: pairing.team1,
                        team2: pairing.team2,
                        times_played,
                    });
                }
                let kept = previous
                    .get(index)
                    .filter(|c| c.pairing.as_ref() == Some(&pairing))
                    .and_then(|c| c.started_at);
                CourtSlot {
                    index,
                    pairing: Some(pairing),
                    started_at: Some(kept.unwrap_or(now)),
                }
            })
            .collect();
        RoundPlan {
            courts,
            forced_repeats,
        }
    }
}
