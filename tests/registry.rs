//! Integration tests for the club registry: lifecycle, rosters, courts, points and exports.

use club_tournament_engine::export::{leaderboard_csv, standings_csv};
use club_tournament_engine::logic::verify_team_stats;
use club_tournament_engine::{
    Club, EngineConfig, EngineError, Member, MemberId, PointsConfig, ResultLabel, RoundOutcome,
    TournamentFormat, TournamentId,
};
use uuid::Uuid;

struct Roster {
    ana: MemberId,
    ben: MemberId,
    cal: MemberId,
    abe: MemberId,
}

fn roster(club: &mut Club) -> Roster {
    Roster {
        ana: club.add_member(Member::new("Ana")),
        ben: club.add_member(Member::new("Ben")),
        cal: club.add_member(Member::new("Cal")),
        abe: club.add_member(Member::new("Abe")),
    }
}

/// Four King teams on two courts, first round played: Aces beat Bats 6-2 and Cats beat
/// Dogs 6-4.
fn played_round(club: &mut Club, r: &Roster) -> TournamentId {
    let id = club.create_tournament(TournamentFormat::King, "Round one");
    club.add_team(id, "Aces", vec![r.ana]).unwrap();
    club.add_team(id, "Bats", vec![r.ben]).unwrap();
    club.add_team(id, "Cats", vec![r.cal]).unwrap();
    club.add_team(id, "Dogs", vec![r.abe]).unwrap();
    club.set_active_courts(id, 2).unwrap();
    assert!(matches!(
        club.schedule_round(id).unwrap(),
        RoundOutcome::Scheduled(_)
    ));
    club.record_match(id, 0, 6, 2).unwrap();
    club.record_match(id, 1, 6, 4).unwrap();
    id
}

#[test]
fn tournaments_are_created_on_first_access() {
    let mut club = Club::default();
    let id = Uuid::new_v4();
    assert_eq!(
        club.tournament(id).unwrap_err(),
        EngineError::TournamentNotFound(id)
    );

    let t = club.tournament_mut_or_create(id, TournamentFormat::King).unwrap();
    assert_eq!(t.id, id);
    assert!(t.teams.is_empty());
    assert_eq!(t.courts.len(), 1);

    assert!(matches!(
        club.tournament_mut_or_create(id, TournamentFormat::Social),
        Err(EngineError::WrongFormat {
            expected: TournamentFormat::Social,
            actual: TournamentFormat::King,
        })
    ));
    assert!(club.tournament(id).is_ok());
    assert_eq!(club.tournament_ids().count(), 1);
}

#[test]
fn format_specific_calls_check_the_format() {
    let mut club = Club::default();
    let social = club.create_tournament(TournamentFormat::Social, "Social");
    club.add_team(social, "Aces", vec![]).unwrap();
    club.add_team(social, "Bats", vec![]).unwrap();
    assert!(matches!(
        club.schedule_round(social),
        Err(EngineError::WrongFormat { .. })
    ));
    assert!(matches!(
        club.award_king_title(social, 1),
        Err(EngineError::WrongFormat { .. })
    ));

    let king = club.create_tournament(TournamentFormat::King, "King");
    assert!(matches!(
        club.set_groups(king, vec![vec![1, 2, 3]]),
        Err(EngineError::WrongFormat { .. })
    ));
    assert!(club.group_standings(king).is_err());
}

#[test]
fn match_points_follow_the_config() {
    let mut club = Club::default();
    let r = roster(&mut club);
    let id = played_round(&mut club, &r);

    let ana = club.member(r.ana).unwrap();
    assert_eq!(ana.totals.points, 35);
    assert_eq!(ana.totals.tournaments_played, 1);
    assert_eq!(ana.last_tournament_id, Some(id));
    let labels: Vec<ResultLabel> = ana.history.iter().map(|e| e.result).collect();
    assert_eq!(labels, vec![ResultLabel::Join, ResultLabel::Win]);
    assert_eq!(ana.history[1].opponent_name.as_deref(), Some("Bats"));
    assert_eq!(ana.history[1].team_name, "Aces");

    let ben = club.member(r.ben).unwrap();
    assert_eq!(ben.totals.points, 20);
    assert_eq!(ben.totals.losses, 1);

    // A second match in the same tournament pays no second join bonus.
    club.schedule_round(id).unwrap();
    club.record_match(id, 0, 6, 0).unwrap();
    let ana = club.member(r.ana).unwrap();
    assert_eq!(ana.totals.points, 50);
    assert_eq!(ana.totals.tournaments_played, 1);
}

#[test]
fn custom_points_apply() {
    let config = EngineConfig {
        points: PointsConfig {
            join_bonus: 5,
            plain_win: 10,
            ..PointsConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut club = Club::new(config);
    let r = roster(&mut club);
    played_round(&mut club, &r);
    assert_eq!(club.member(r.ana).unwrap().totals.points, 15);
    assert_eq!(club.member(r.ben).unwrap().totals.points, 5);
}

#[test]
fn unknown_members_are_skipped() {
    let mut club = Club::default();
    let id = club.create_tournament(TournamentFormat::King, "Guests");
    club.add_team(id, "Aces", vec![Uuid::from_u128(42)]).unwrap();
    club.add_team(id, "Bats", vec![]).unwrap();
    club.schedule_round(id).unwrap();
    assert!(club.record_match(id, 0, 6, 1).is_ok());
    assert!(club.members().is_empty());
}

#[test]
fn leaderboard_orders_by_points_wins_then_name() {
    let mut club = Club::default();
    let r = roster(&mut club);
    played_round(&mut club, &r);

    let names: Vec<String> = club
        .member_leaderboard()
        .into_iter()
        .map(|row| row.name)
        .collect();
    assert_eq!(names, vec!["Ana", "Cal", "Abe", "Ben"]);

    let csv = leaderboard_csv(&club.member_leaderboard()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("rank,member,points,games,wins,losses,draws,tournaments,titles")
    );
    assert_eq!(lines.next(), Some("1,Ana,35,1,1,0,0,1,0"));
    assert_eq!(csv.lines().count(), 5);
}

#[test]
fn standings_are_pure_and_exportable() {
    let mut club = Club::default();
    let r = roster(&mut club);
    let id = played_round(&mut club, &r);

    let first = club.standings(id).unwrap();
    let second = club.standings(id).unwrap();
    assert_eq!(first, second);
    let names: Vec<&str> = first.iter().map(|row| row.team_name.as_str()).collect();
    assert_eq!(names, vec!["Aces", "Cats", "Dogs", "Bats"]);
    assert!(verify_team_stats(club.tournament(id).unwrap()).is_empty());

    let csv = standings_csv(&first).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "rank,team,played,wins,losses,draws,games_won,games_lost,diff"
    );
    assert_eq!(lines[1], "1,Aces,1,1,0,0,6,2,4");
    assert_eq!(lines[3], "3,Dogs,1,0,1,0,4,6,-2");
}

#[test]
fn deleting_a_tournament_purges_its_history() {
    let mut club = Club::default();
    let r = roster(&mut club);
    let first = played_round(&mut club, &r);
    let second = played_round(&mut club, &r);
    assert_eq!(club.member(r.ana).unwrap().totals.tournaments_played, 2);

    let removed = club.delete_tournament(first).unwrap();
    assert_eq!(removed.matches.len(), 2);
    assert_eq!(
        club.tournament(first).unwrap_err(),
        EngineError::TournamentNotFound(first)
    );
    assert_eq!(
        club.delete_tournament(first).unwrap_err(),
        EngineError::TournamentNotFound(first)
    );

    for member in club.members().iter() {
        assert!(member.history.iter().all(|e| e.tournament_id != first));
        assert_eq!(member.totals, member.folded_totals());
        assert_eq!(member.totals.tournaments_played, 1);
        assert_eq!(member.last_tournament_id, Some(second));
    }
    assert_eq!(club.member(r.ana).unwrap().totals.points, 35);
    assert!(club.tournament(second).is_ok());
}

#[test]
fn team_names_are_unique_and_non_empty() {
    let mut club = Club::default();
    let id = club.create_tournament(TournamentFormat::King, "Names");
    assert_eq!(club.add_team(id, " Aces ", vec![]).unwrap(), 1);
    assert_eq!(
        club.add_team(id, "aces", vec![]).unwrap_err(),
        EngineError::DuplicateTeamName
    );
    assert!(matches!(
        club.add_team(id, "   ", vec![]),
        Err(EngineError::InvalidState(_))
    ));
    assert_eq!(club.tournament(id).unwrap().team(1).unwrap().name, "Aces");

    let m = Uuid::from_u128(7);
    club.add_team(id, "Bats", vec![m, m]).unwrap();
    assert_eq!(club.tournament(id).unwrap().team(2).unwrap().members, vec![m]);
}

#[test]
fn teams_in_use_cannot_be_removed() {
    let mut club = Club::default();
    let id = club.create_tournament(TournamentFormat::King, "Removals");
    for name in ["Aces", "Bats", "Cats"] {
        club.add_team(id, name, vec![]).unwrap();
    }
    club.schedule_round(id).unwrap();

    assert_eq!(club.remove_team(id, 1), Err(EngineError::TeamInUse(1)));
    assert_eq!(club.remove_team(id, 9), Err(EngineError::TeamNotFound(9)));
    club.remove_team(id, 3).unwrap();
    assert_eq!(club.remove_team(id, 2), Err(EngineError::NotEnoughTeams(2)));

    // Ids are never reused while higher ones exist.
    assert_eq!(club.add_team(id, "Dogs", vec![]).unwrap(), 3);
}

#[test]
fn courts_with_matches_cannot_be_removed() {
    let mut club = Club::default();
    let id = club.create_tournament(TournamentFormat::King, "Courts");
    for name in ["Aces", "Bats", "Cats", "Dogs"] {
        club.add_team(id, name, vec![]).unwrap();
    }
    club.set_active_courts(id, 2).unwrap();
    club.schedule_round(id).unwrap();

    assert!(matches!(
        club.set_active_courts(id, 1),
        Err(EngineError::InvalidState(_))
    ));
    assert!(matches!(
        club.set_active_courts(id, 0),
        Err(EngineError::InvalidState(_))
    ));
    assert!(matches!(
        club.record_match(id, 5, 6, 0),
        Err(EngineError::CourtOutOfRange { court: 5, active: 2 })
    ));

    club.record_match(id, 1, 6, 0).unwrap();
    club.set_active_courts(id, 1).unwrap();
    let t = club.tournament(id).unwrap();
    assert_eq!(t.courts.len(), 1);
    // The winner pinned to the removed court is dropped.
    assert!(t.king().unwrap().court_winners.is_empty());
    assert!(matches!(
        club.record_match(id, 0, 6, 0).map(|m| m.id),
        Ok(2)
    ));
    assert!(matches!(
        club.record_match(id, 0, 6, 0),
        Err(EngineError::CourtEmpty(0))
    ));
}

#[test]
fn partial_config_documents_fill_defaults() {
    let config: EngineConfig =
        serde_json::from_str(r#"{"points": {"join_bonus": 5}, "king": {"matches_per_team": 4}}"#)
            .unwrap();
    assert_eq!(config.points.join_bonus, 5);
    assert_eq!(config.points.plain_win, 15);
    assert_eq!(config.points.final_win, 30);
    assert_eq!(config.king.matches_per_team, 4);
    assert_eq!(config.king.max_repair_attempts, 8);

    let empty: EngineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, EngineConfig::default());
}

#[test]
fn a_saved_club_restores_and_keeps_playing() {
    let mut club = Club::default();
    let r = roster(&mut club);
    let id = played_round(&mut club, &r);

    let saved = serde_json::to_string(&club).unwrap();
    let mut restored: Club = serde_json::from_str(&saved).unwrap();
    assert_eq!(restored.standings(id).unwrap(), club.standings(id).unwrap());
    assert_eq!(
        restored.tournament(id).unwrap().king().unwrap().court_winners,
        club.tournament(id).unwrap().king().unwrap().court_winners
    );
    assert_eq!(restored.member(r.ana).unwrap().totals.points, 35);
    assert_eq!(restored.config(), club.config());

    for c in [&mut club, &mut restored] {
        c.schedule_round(id).unwrap();
        c.record_match(id, 0, 6, 0).unwrap();
    }
    assert_eq!(restored.standings(id).unwrap(), club.standings(id).unwrap());
    let totals = &restored.member(r.ana).unwrap().totals;
    assert_eq!(totals.points, 50);
    assert_eq!(*totals, club.member(r.ana).unwrap().totals);
    assert!(verify_team_stats(restored.tournament(id).unwrap()).is_empty());
}
