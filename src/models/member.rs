//! Club members, their points history and the in-memory member directory.

use crate::models::game::{MatchId, Stage};
use crate::models::tournament::{TournamentFormat, TournamentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a club member.
pub type MemberId = Uuid;

/// What a points-history entry was awarded for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultLabel {
    /// One-time bonus for the first match in a tournament.
    Join,
    Win,
    Loss,
    Draw,
    /// Tournament won.
    Title,
}

impl ResultLabel {
    /// Win, loss or draw: an entry that counts as one game played.
    pub fn is_match_result(self) -> bool {
        matches!(self, ResultLabel::Win | ResultLabel::Loss | ResultLabel::Draw)
    }
}

/// Immutable audit record backing a member's cumulative statistics.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    /// None for join bonuses and host-awarded titles.
    pub match_id: Option<MatchId>,
    pub team_name: String,
    pub opponent_name: Option<String>,
    pub result: ResultLabel,
    pub points: u32,
    pub tournament_id: TournamentId,
    pub tournament_format: TournamentFormat,
    pub stage: Option<Stage>,
}

/// Cumulative member statistics. Always equal to [`MemberTotals::fold`] over the history.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MemberTotals {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points: u32,
    pub tournaments_played: u32,
    pub tournaments_won: u32,
}

impl MemberTotals {
    pub fn fold<'a>(entries: impl IntoIterator<Item = &'a PointsEntry>) -> Self {
        let mut totals = Self::default();
        for e in entries {
            totals.add(e);
        }
        totals
    }

    fn add(&mut self, e: &PointsEntry) {
        self.points += e.points;
        match e.result {
            ResultLabel::Join => self.tournaments_played += 1,
            ResultLabel::Title => self.tournaments_won += 1,
            ResultLabel::Win => self.wins += 1,
            ResultLabel::Loss => self.losses += 1,
            ResultLabel::Draw => self.draws += 1,
        }
        if e.result.is_match_result() {
            self.games += 1;
        }
    }

    /// Inverse of `add`, clamped at zero.
    fn subtract(&mut self, e: &PointsEntry) {
        self.points = self.points.saturating_sub(e.points);
        let counter = match e.result {
            ResultLabel::Join => &mut self.tournaments_played,
            ResultLabel::Title => &mut self.tournaments_won,
            ResultLabel::Win => &mut self.wins,
            ResultLabel::Loss => &mut self.losses,
            ResultLabel::Draw => &mut self.draws,
        };
        *counter = counter.saturating_sub(1);
        if e.result.is_match_result() {
            self.games = self.games.saturating_sub(1);
        }
    }
}

/// A club member.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub totals: MemberTotals,
    /// Tournament of the most recent history entry.
    pub last_tournament_id: Option<TournamentId>,
    pub history: Vec<PointsEntry>,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            totals: MemberTotals::default(),
            last_tournament_id: None,
            history: Vec::new(),
        }
    }

    /// Append an entry and update the running totals.
    pub fn push_entry(&mut self, entry: PointsEntry) {
        self.totals.add(&entry);
        self.last_tournament_id = Some(entry.tournament_id);
        self.history.push(entry);
    }

    /// True once the member has received the join bonus for `tournament`.
    pub fn has_joined(&self, tournament: TournamentId) -> bool {
        self.history
            .iter()
            .any(|e| e.tournament_id == tournament && e.result == ResultLabel::Join)
    }

    /// Remove every entry tied to one match and subtract it from the running totals.
    /// Returns the removed entries.
    pub fn remove_match_entries(
        &mut self,
        tournament: TournamentId,
        match_id: MatchId,
    ) -> Vec<PointsEntry> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.history)
            .into_iter()
            .partition(|e| e.tournament_id == tournament && e.match_id == Some(match_id));
        self.history = kept;
        for e in &removed {
            self.totals.subtract(e);
        }
        removed
    }

    /// Drop every entry of a tournament and recompute totals from the remaining history.
    /// Returns how many entries were removed.
    pub fn purge_tournament(&mut self, tournament: TournamentId) -> usize {
        let before = self.history.len();
        self.history.retain(|e| e.tournament_id != tournament);
        let removed = before - self.history.len();
        self.refold();
        removed
    }

    /// Recompute totals and last tournament from history alone.
    pub fn refold(&mut self) {
        self.totals = self.folded_totals();
        self.last_tournament_id = self.history.last().map(|e| e.tournament_id);
    }

    pub fn folded_totals(&self) -> MemberTotals {
        MemberTotals::fold(&self.history)
    }
}

/// Host-supplied member directory, used to fan out history entries by id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemberDirectory {
    members: HashMap<MemberId, Member>,
}

impl MemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a member. Returns its id.
    pub fn insert(&mut self, member: Member) -> MemberId {
        let id = member.id;
        self.members.insert(id, member);
        id
    }

    pub fn get(&self, id: MemberId) -> Option<&Member> {
        self.members.get(&id)
    }

    pub fn get_mut(&mut self, id: MemberId) -> Option<&mut Member> {
        self.members.get_mut(&id)
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Member> {
        self.members.values_mut()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
