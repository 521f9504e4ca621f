//! CSV rendering of standings and the member leaderboard for hosts that offer downloads.

use crate::logic::{LeaderboardRow, StandingRow};

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, csv::Error> {
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// One row per team with a header line, in ranking order.
pub fn standings_csv(rows: &[StandingRow]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "rank", "team", "played", "wins", "losses", "draws", "games_won", "games_lost", "diff",
    ])?;
    for (i, r) in rows.iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            r.team_name.clone(),
            r.played.to_string(),
            r.wins.to_string(),
            r.losses.to_string(),
            r.draws.to_string(),
            r.games_won.to_string(),
            r.games_lost.to_string(),
            r.game_differential.to_string(),
        ])?;
    }
    finish(writer)
}

pub fn leaderboard_csv(rows: &[LeaderboardRow]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "rank", "member", "points", "games", "wins", "losses", "draws", "tournaments", "titles",
    ])?;
    for (i, r) in rows.iter().enumerate() {
        let t = &r.totals;
        writer.write_record([
            (i + 1).to_string(),
            r.name.clone(),
            t.points.to_string(),
            t.games.to_string(),
            t.wins.to_string(),
            t.losses.to_string(),
            t.draws.to_string(),
            t.tournaments_played.to_string(),
            t.tournaments_won.to_string(),
        ])?;
    }
    finish(writer)
}
