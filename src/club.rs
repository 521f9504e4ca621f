//! The club registry: every tournament keyed by id, the member directory and the engine
//! configuration. This is the entry point a host calls into.
//!
//! The registry is synchronous and not internally locked. A host serializes mutating calls
//! (one write lock around the whole club is enough) and may share read access for standings.

use crate::config::EngineConfig;
use crate::logic::{
    self, FinalSetOutcome, GroupStanding, LeaderboardRow, RoundOutcome, ScoreContext, StandingRow,
};
use crate::models::{
    EngineError, FormatState, Group, Match, MatchId, Member, MemberDirectory, MemberId, SetScore,
    TeamId, Tournament, TournamentFormat, TournamentId,
};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serializes to a single document; a host persists it and restores it with serde.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Club {
    tournaments: HashMap<TournamentId, Tournament>,
    members: MemberDirectory,
    config: EngineConfig,
}

impl Club {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tournaments: HashMap::new(),
            members: MemberDirectory::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn members(&self) -> &MemberDirectory {
        &self.members
    }

    /// Register a member in the directory. Returns its id.
    pub fn add_member(&mut self, member: Member) -> MemberId {
        self.members.insert(member)
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn tournament_ids(&self) -> impl Iterator<Item = &TournamentId> {
        self.tournaments.keys()
    }

    pub fn tournament(&self, id: TournamentId) -> Result<&Tournament, EngineError> {
        self.tournaments
            .get(&id)
            .ok_or(EngineError::TournamentNotFound(id))
    }

    fn tournament_mut(&mut self, id: TournamentId) -> Result<&mut Tournament, EngineError> {
        self.tournaments
            .get_mut(&id)
            .ok_or(EngineError::TournamentNotFound(id))
    }

    /// Look up a tournament, creating an empty one of `format` on first access.
    pub fn tournament_mut_or_create(
        &mut self,
        id: TournamentId,
        format: TournamentFormat,
    ) -> Result<&mut Tournament, EngineError> {
        let tournament = self
            .tournaments
            .entry(id)
            .or_insert_with(|| {
                log::info!("tournament {} created ({})", id, format);
                Tournament::new(id, format)
            });
        if tournament.format() != format {
            return Err(tournament.wrong_format(format));
        }
        Ok(tournament)
    }

    /// Create a new named tournament with a fresh id.
    pub fn create_tournament(
        &mut self,
        format: TournamentFormat,
        name: impl Into<String>,
    ) -> TournamentId {
        let id = uuid::Uuid::new_v4();
        let mut tournament = Tournament::new(id, format);
        tournament.name = name.into();
        log::info!("tournament {} created ({}): {}", id, format, tournament.name);
        self.tournaments.insert(id, tournament);
        id
    }

    pub fn add_team(
        &mut self,
        tournament: TournamentId,
        name: &str,
        members: Vec<MemberId>,
    ) -> Result<TeamId, EngineError> {
        self.tournament_mut(tournament)?.add_team(name, members)
    }

    pub fn remove_team(
        &mut self,
        tournament: TournamentId,
        team: TeamId,
    ) -> Result<(), EngineError> {
        self.tournament_mut(tournament)?.remove_team(team).map(|_| ())
    }

    pub fn set_active_courts(
        &mut self,
        tournament: TournamentId,
        count: usize,
    ) -> Result<(), EngineError> {
        self.tournament_mut(tournament)?.set_active_courts(count)
    }

    /// Generate the next King round and put it on the courts. Winners pinned to courts are
    /// consumed by the new round.
    pub fn schedule_round(
        &mut self,
        tournament: TournamentId,
    ) -> Result<RoundOutcome, EngineError> {
        let king_config = self.config.king.clone();
        let t = self.tournament_mut(tournament)?;
        let outcome = logic::generate_round(
            &t.teams,
            &t.matches,
            &t.courts,
            &t.king()?.court_winners,
            &king_config,
            Utc::now(),
        )?;
        let FormatState::King(king) = &mut t.state else {
            return Err(EngineError::WrongFormat {
                expected: TournamentFormat::King,
                actual: TournamentFormat::Social,
            });
        };
        match &outcome {
            RoundOutcome::Scheduled(plan) => {
                king.court_winners.clear();
                t.courts = plan.courts.clone();
            }
            RoundOutcome::Complete => {
                if !king.completed {
                    log::info!("tournament {} complete", tournament);
                }
                king.completed = true;
            }
        }
        Ok(outcome)
    }

    /// Put the next Social pairings on free courts. Returns the courts assigned.
    pub fn assign_matches(&mut self, tournament: TournamentId) -> Result<Vec<usize>, EngineError> {
        logic::assign_matches(self.tournament_mut(tournament)?, Utc::now())
    }

    pub fn validate_score(
        &self,
        context: ScoreContext,
        score1: u8,
        score2: u8,
    ) -> Result<(), EngineError> {
        logic::validate_score(context, score1, score2).map_err(EngineError::from)
    }

    pub fn record_match(
        &mut self,
        tournament: TournamentId,
        court: usize,
        score1: u8,
        score2: u8,
    ) -> Result<Match, EngineError> {
        let t = self
            .tournaments
            .get_mut(&tournament)
            .ok_or(EngineError::TournamentNotFound(tournament))?;
        logic::record_match(
            t,
            &mut self.members,
            &self.config.points,
            court,
            score1,
            score2,
            Utc::now(),
        )
    }

    pub fn record_final_set(
        &mut self,
        tournament: TournamentId,
        court: usize,
        score1: u8,
        score2: u8,
    ) -> Result<FinalSetOutcome, EngineError> {
        let t = self
            .tournaments
            .get_mut(&tournament)
            .ok_or(EngineError::TournamentNotFound(tournament))?;
        logic::record_final_set(
            t,
            &mut self.members,
            &self.config.points,
            court,
            score1,
            score2,
            Utc::now(),
        )
    }

    pub fn edit_match(
        &mut self,
        tournament: TournamentId,
        match_id: MatchId,
        score1: u8,
        score2: u8,
    ) -> Result<Match, EngineError> {
        let t = self
            .tournaments
            .get_mut(&tournament)
            .ok_or(EngineError::TournamentNotFound(tournament))?;
        logic::edit_match(
            t,
            &mut self.members,
            &self.config.points,
            match_id,
            score1,
            score2,
            Utc::now(),
        )
    }

    pub fn edit_final(
        &mut self,
        tournament: TournamentId,
        match_id: MatchId,
        sets: [SetScore; 2],
        tiebreak: Option<SetScore>,
    ) -> Result<Match, EngineError> {
        let t = self
            .tournaments
            .get_mut(&tournament)
            .ok_or(EngineError::TournamentNotFound(tournament))?;
        logic::edit_final(
            t,
            &mut self.members,
            &self.config.points,
            match_id,
            sets,
            tiebreak,
            Utc::now(),
        )
    }

    pub fn set_groups(
        &mut self,
        tournament: TournamentId,
        groups: Vec<Vec<TeamId>>,
    ) -> Result<(), EngineError> {
        logic::set_groups(self.tournament_mut(tournament)?, groups)
    }

    pub fn draw_groups<R: Rng + ?Sized>(
        &mut self,
        tournament: TournamentId,
        rng: &mut R,
    ) -> Result<Vec<Group>, EngineError> {
        logic::draw_groups(self.tournament_mut(tournament)?, rng)
    }

    pub fn seed_semis(
        &mut self,
        tournament: TournamentId,
        teams: [TeamId; 4],
    ) -> Result<(), EngineError> {
        logic::seed_semis(self.tournament_mut(tournament)?, teams, Utc::now())
    }

    /// Crown the champion of a completed King tournament. Each member of the team gets a
    /// title entry.
    pub fn award_king_title(
        &mut self,
        tournament: TournamentId,
        team: TeamId,
    ) -> Result<(), EngineError> {
        let t = self
            .tournaments
            .get_mut(&tournament)
            .ok_or(EngineError::TournamentNotFound(tournament))?;
        let king = t.king()?;
        if !king.completed {
            return Err(EngineError::InvalidState("the tournament is not complete"));
        }
        if king.champion.is_some() {
            return Err(EngineError::InvalidState("the title has already been awarded"));
        }
        let champion = t.require_team(team)?.clone();
        logic::award_title_entries(
            t,
            &mut self.members,
            &champion,
            &self.config.points,
            Utc::now(),
        );
        if let FormatState::King(king) = &mut t.state {
            king.champion = Some(team);
        }
        log::info!("tournament {}: title awarded to {}", tournament, champion.name);
        Ok(())
    }

    pub fn standings(&self, tournament: TournamentId) -> Result<Vec<StandingRow>, EngineError> {
        Ok(logic::standings(self.tournament(tournament)?))
    }

    pub fn group_standings(
        &self,
        tournament: TournamentId,
    ) -> Result<Vec<GroupStanding>, EngineError> {
        logic::group_standings(self.tournament(tournament)?)
    }

    pub fn member_leaderboard(&self) -> Vec<LeaderboardRow> {
        logic::member_leaderboard(&self.members)
    }

    /// Remove a tournament with all of its matches, and purge every history entry tagged
    /// with it. Member totals are re-folded from what remains.
    pub fn delete_tournament(
        &mut self,
        tournament: TournamentId,
    ) -> Result<Tournament, EngineError> {
        let removed = self
            .tournaments
            .remove(&tournament)
            .ok_or(EngineError::TournamentNotFound(tournament))?;
        let purged: usize = self
            .members
            .iter_mut()
            .map(|m| m.purge_tournament(tournament))
            .sum();
        log::info!(
            "tournament {} deleted: {} matches, {} history entries",
            tournament,
            removed.matches.len(),
            purged
        );
        Ok(removed)
    }
}
