//! Integration tests for King of the Court round generation and winner-stays bookkeeping.

use chrono::Utc;
use club_tournament_engine::{
    generate_round, validate_round, Club, CourtSlot, EngineConfig, EngineError, ErrorKind,
    KingConfig, Member, Pairing, RoundOutcome, RoundPlan, Stage, TeamId, TournamentFormat,
    TournamentId,
};
use std::collections::{BTreeMap, HashSet};

fn king_club(
    config: EngineConfig,
    teams: usize,
    courts: usize,
) -> (Club, TournamentId, Vec<TeamId>) {
    let mut club = Club::new(config);
    let id = club.create_tournament(TournamentFormat::King, "Friday King");
    let ids = (0..teams)
        .map(|i| {
            let name = format!("Team {}", (b'A' + i as u8) as char);
            club.add_team(id, &name, vec![]).unwrap()
        })
        .collect();
    club.set_active_courts(id, courts).unwrap();
    (club, id, ids)
}

fn scheduled(club: &mut Club, id: TournamentId) -> RoundPlan {
    match club.schedule_round(id).unwrap() {
        RoundOutcome::Scheduled(plan) => plan,
        RoundOutcome::Complete => panic!("tournament completed unexpectedly"),
    }
}

fn pairing(plan: &RoundPlan, court: usize) -> &Pairing {
    plan.courts[court].pairing.as_ref().unwrap()
}

#[test]
fn first_round_fills_courts_without_repeats() {
    let (mut club, id, t) = king_club(EngineConfig::default(), 4, 2);
    let plan = scheduled(&mut club, id);

    assert!(validate_round(&plan.courts).is_ok());
    assert!(plan.forced_repeats.is_empty());
    assert_eq!((pairing(&plan, 0).team1, pairing(&plan, 0).team2), (t[0], t[1]));
    assert_eq!((pairing(&plan, 1).team1, pairing(&plan, 1).team2), (t[2], t[3]));
    assert!(plan.courts.iter().all(|c| c.started_at.is_some()));
    assert_eq!(pairing(&plan, 0).stage, Stage::Plain);
}

#[test]
fn winner_keeps_court_and_meets_fresh_opponent() {
    let (mut club, id, t) = king_club(EngineConfig::default(), 4, 2);
    scheduled(&mut club, id);

    // A beats B 6-2 on court 0.
    let m = club.record_match(id, 0, 6, 2).unwrap();
    assert_eq!(m.winner_team(), Some(t[0]));
    let king = club.tournament(id).unwrap().king().unwrap();
    assert_eq!(king.court_winners.get(&0), Some(&t[0]));
    assert!(club.tournament(id).unwrap().courts[0].is_free());

    // D beats C on court 1.
    club.record_match(id, 1, 3, 5).unwrap();

    let plan = scheduled(&mut club, id);
    let court0 = pairing(&plan, 0);
    assert_eq!(court0.team1, t[0]);
    assert_eq!(court0.team2, t[2]);
    assert!(!court0.forced_repeat);
    let court1 = pairing(&plan, 1);
    assert_eq!((court1.team1, court1.team2), (t[3], t[1]));
    assert!(validate_round(&plan.courts).is_ok());

    // Pinned winners are consumed by the new round.
    assert!(club.tournament(id).unwrap().king().unwrap().court_winners.is_empty());
}

#[test]
fn tie_pins_no_winner() {
    let (mut club, id, _) = king_club(EngineConfig::default(), 4, 2);
    scheduled(&mut club, id);
    let m = club.record_match(id, 0, 3, 3).unwrap();
    assert_eq!(m.winner, None);
    assert!(club.tournament(id).unwrap().king().unwrap().court_winners.is_empty());
}

#[test]
fn in_flight_pairing_is_carried_over_when_no_winner_exists() {
    let (mut club, id, t) = king_club(EngineConfig::default(), 4, 2);
    let first = scheduled(&mut club, id);
    club.record_match(id, 0, 2, 2).unwrap();

    let plan = scheduled(&mut club, id);
    let court1 = pairing(&plan, 1);
    assert_eq!((court1.team1, court1.team2), (t[2], t[3]));
    assert_eq!(plan.courts[1].started_at, first.courts[1].started_at);

    // A and B have already met; the only free pair is a flagged repeat.
    let court0 = pairing(&plan, 0);
    assert_eq!((court0.team1, court0.team2), (t[0], t[1]));
    assert!(court0.forced_repeat);
    assert_eq!(plan.forced_repeats.len(), 1);
    assert_eq!(plan.forced_repeats[0].court, 0);
    assert_eq!(plan.forced_repeats[0].times_played, 1);
}

#[test]
fn forced_repeat_is_flagged_and_recordable() {
    let (mut club, id, t) = king_club(EngineConfig::default(), 2, 1);
    scheduled(&mut club, id);
    club.record_match(id, 0, 6, 1).unwrap();

    let plan = scheduled(&mut club, id);
    assert_eq!(plan.forced_repeats.len(), 1);
    let p = pairing(&plan, 0);
    assert_eq!(p.team1, t[0]);
    assert!(p.forced_repeat);

    // A flagged repeat bypasses the duplicate check.
    assert!(club.record_match(id, 0, 4, 6).is_ok());
    assert_eq!(club.tournament(id).unwrap().matches.len(), 2);
}

#[test]
fn unflagged_repeat_is_rejected_without_mutation() {
    let (mut club, id, t) = king_club(EngineConfig::default(), 4, 2);
    scheduled(&mut club, id);
    club.record_match(id, 0, 6, 2).unwrap();

    let tournament = club
        .tournament_mut_or_create(id, TournamentFormat::King)
        .unwrap();
    tournament.courts[0].assign(Pairing::new(t[1], t[0], Stage::Plain), Utc::now());
    let teams_before = tournament.teams.clone();

    let err = club.record_match(id, 0, 6, 0).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateMatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Duplicate);

    let tournament = club.tournament(id).unwrap();
    assert_eq!(tournament.matches.len(), 1);
    assert_eq!(tournament.teams, teams_before);
    assert!(tournament.courts[0].pairing.is_some());
}

#[test]
fn extra_courts_stay_empty_when_teams_run_out() {
    let (mut club, id, _) = king_club(EngineConfig::default(), 5, 3);
    let plan = scheduled(&mut club, id);
    let occupied = plan.courts.iter().filter(|c| c.pairing.is_some()).count();
    assert_eq!(occupied, 2);
    assert!(plan.courts[2].is_free());
    assert!(validate_round(&plan.courts).is_ok());
}

#[test]
fn generate_round_is_pure() {
    let (club, id, _) = king_club(EngineConfig::default(), 6, 3);
    let t = club.tournament(id).unwrap();
    let now = Utc::now();
    let winners = BTreeMap::new();
    let config = KingConfig::default();
    let a = generate_round(&t.teams, &t.matches, &t.courts, &winners, &config, now).unwrap();
    let b = generate_round(&t.teams, &t.matches, &t.courts, &winners, &config, now).unwrap();
    assert_eq!(a, b);
    // Nothing was written back.
    assert!(t.courts.iter().all(CourtSlot::is_free));
}

#[test]
fn validate_round_detects_team_on_two_courts() {
    let now = Utc::now();
    let mut courts = vec![CourtSlot::empty(0), CourtSlot::empty(1)];
    courts[0].assign(Pairing::new(1, 2, Stage::Plain), now);
    courts[1].assign(Pairing::new(2, 3, Stage::Plain), now);
    let err = validate_round(&courts).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invariant);

    courts[1].assign(Pairing::new(3, 4, Stage::Plain), now);
    assert!(validate_round(&courts).is_ok());
}

#[test]
fn full_tournament_never_double_books_and_stops_at_match_cap() {
    let (mut club, id, t) = king_club(EngineConfig::default(), 6, 2);
    let mut forced = 0;
    let mut rounds = 0;
    loop {
        rounds += 1;
        assert!(rounds < 100, "scheduler did not converge");
        let plan = match club.schedule_round(id).unwrap() {
            RoundOutcome::Scheduled(plan) => plan,
            RoundOutcome::Complete => break,
        };
        assert!(validate_round(&plan.courts).is_ok());
        let mut seen = HashSet::new();
        for p in plan.courts.iter().filter_map(|c| c.pairing.as_ref()) {
            assert!(seen.insert(p.team1));
            assert!(seen.insert(p.team2));
        }
        forced += plan.forced_repeats.len();
        for court in 0..plan.courts.len() {
            if plan.courts[court].pairing.is_some() {
                club.record_match(id, court, 6, 3).unwrap();
            }
        }
    }

    let tournament = club.tournament(id).unwrap();
    assert!(tournament.king().unwrap().completed);
    for team in &tournament.teams {
        assert!(team.matches_played <= 7);
    }
    let below_cap = tournament.teams.iter().filter(|x| x.matches_played < 7).count();
    assert!(below_cap <= 1);
    // Six teams have five distinct opponents each, so seven matches force repeats.
    assert!(forced > 0);
    assert_eq!(t.len(), 6);
}

/// Schedule and record rounds until the tournament completes. `score` gets the number of
/// matches recorded so far. Returns every pairing in the order it was played.
fn play_out(
    club: &mut Club,
    id: TournamentId,
    mut score: impl FnMut(usize) -> (u8, u8),
) -> Vec<(TeamId, TeamId)> {
    let mut played = Vec::new();
    for _ in 0..100 {
        let plan = match club.schedule_round(id).unwrap() {
            RoundOutcome::Scheduled(plan) => plan,
            RoundOutcome::Complete => return played,
        };
        for (court, slot) in plan.courts.iter().enumerate() {
            if let Some(p) = &slot.pairing {
                let (s1, s2) = score(played.len());
                club.record_match(id, court, s1, s2).unwrap();
                played.push((p.team1, p.team2));
            }
        }
    }
    panic!("scheduler did not converge");
}

fn matches_played(club: &Club, id: TournamentId) -> Vec<u32> {
    let tournament = club.tournament(id).unwrap();
    tournament.teams.iter().map(|t| t.matches_played).collect()
}

#[test]
fn repeats_rotate_through_every_team_when_all_matches_tie() {
    let (mut club, id, t) = king_club(EngineConfig::default(), 3, 1);
    let played = play_out(&mut club, id, |_| (3, 3));

    let cycle = [(t[0], t[1]), (t[0], t[2]), (t[1], t[2])];
    assert_eq!(&played[..6], &[cycle, cycle].concat()[..]);
    assert_eq!(matches_played(&club, id), vec![7, 7, 6]);
    assert!(club.tournament(id).unwrap().king().unwrap().completed);
}

#[test]
fn no_team_is_left_behind_on_three_courts() {
    let (mut club, id, _) = king_club(EngineConfig::default(), 7, 3);
    let played = play_out(&mut club, id, |n| if n % 2 == 0 { (6, 2) } else { (2, 6) });

    let counts = matches_played(&club, id);
    assert!(counts.iter().all(|c| *c == 6 || *c == 7), "{:?}", counts);
    assert_eq!(counts.iter().filter(|c| **c < 7).count(), 1);
    assert_eq!(played.len(), 24);
}

#[test]
fn same_pair_does_not_replay_back_to_back_while_another_team_waits() {
    let (mut club, id, t) = king_club(EngineConfig::default(), 3, 1);
    for _ in 0..3 {
        scheduled(&mut club, id);
        club.record_match(id, 0, 4, 4).unwrap();
    }

    // Every pair has met once; A-B met longest ago and nobody has fewer matches.
    let plan = scheduled(&mut club, id);
    let p = pairing(&plan, 0);
    assert_eq!((p.team1, p.team2), (t[0], t[1]));
    assert!(p.forced_repeat);
    club.record_match(id, 0, 4, 4).unwrap();

    // C has played the least, so it is on court next.
    let p = pairing(&scheduled(&mut club, id), 0).clone();
    assert!(p.team1 == t[2] || p.team2 == t[2]);
}

#[test]
fn title_can_be_awarded_once_after_completion() {
    let config = EngineConfig {
        king: KingConfig {
            matches_per_team: 1,
            ..KingConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut club = Club::new(config);
    let alice = club.add_member(Member::new("Alice"));
    let bob = club.add_member(Member::new("Bob"));
    let id = club.create_tournament(TournamentFormat::King, "Short King");
    let a = club.add_team(id, "Aces", vec![alice]).unwrap();
    club.add_team(id, "Bats", vec![bob]).unwrap();

    scheduled(&mut club, id);
    assert!(matches!(
        club.award_king_title(id, a),
        Err(EngineError::InvalidState(_))
    ));
    club.record_match(id, 0, 6, 4).unwrap();
    assert_eq!(club.schedule_round(id).unwrap(), RoundOutcome::Complete);

    club.award_king_title(id, a).unwrap();
    assert_eq!(club.member(alice).unwrap().totals.tournaments_won, 1);
    assert_eq!(club.member(bob).unwrap().totals.tournaments_won, 0);
    assert!(club.award_king_title(id, a).is_err());
    assert_eq!(
        club.tournament(id).unwrap().king().unwrap().champion,
        Some(a)
    );
}
