//! Single binary web host for the club tournament engine: a JSON API over one in-memory club.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT.
//! ENGINE_CONFIG may point at a JSON file with points and King scheduling settings.

use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use club_tournament_engine::{
    export, Club, EngineConfig, EngineError, ErrorKind, Member, MemberId, SetScore, TeamId,
    TournamentFormat, TournamentId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// The whole club behind one lock: mutations take the write half, so calls on the same
/// tournament are serialized; standings take the read half.
type AppState = Data<RwLock<Club>>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    format: TournamentFormat,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct AddMemberBody {
    name: String,
}

#[derive(Deserialize)]
struct AddTeamBody {
    name: String,
    #[serde(default)]
    members: Vec<MemberId>,
}

#[derive(Deserialize)]
struct CourtsBody {
    count: usize,
}

#[derive(Deserialize)]
struct GroupsBody {
    groups: Vec<Vec<TeamId>>,
}

#[derive(Deserialize)]
struct SemisBody {
    teams: [TeamId; 4],
}

#[derive(Deserialize)]
struct ScoreBody {
    score1: u8,
    score2: u8,
}

#[derive(Deserialize)]
struct FinalBody {
    sets: [SetScore; 2],
    #[serde(default)]
    tiebreak: Option<SetScore>,
}

#[derive(Deserialize)]
struct TitleBody {
    team_id: TeamId,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

#[derive(Deserialize)]
struct TournamentTeamPath {
    id: TournamentId,
    team_id: TeamId,
}

#[derive(Deserialize)]
struct TournamentCourtPath {
    id: TournamentId,
    court: usize,
}

#[derive(Deserialize)]
struct TournamentMatchPath {
    id: TournamentId,
    match_id: u64,
}

/// Map an engine error to a JSON error response.
fn error_response(e: EngineError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e.kind() {
        ErrorKind::Validation => HttpResponse::BadRequest().json(body),
        ErrorKind::Duplicate => HttpResponse::Conflict().json(body),
        ErrorKind::Invariant => {
            log::error!("{}", e);
            HttpResponse::InternalServerError().json(body)
        }
        ErrorKind::Request => match e {
            EngineError::TournamentNotFound(_)
            | EngineError::TeamNotFound(_)
            | EngineError::MatchNotFound(_) => HttpResponse::NotFound().json(body),
            _ => HttpResponse::BadRequest().json(body),
        },
    }
}

fn respond<T: Serialize>(result: Result<T, EngineError>) -> HttpResponse {
    match result {
        Ok(v) => HttpResponse::Ok().json(v),
        Err(e) => error_response(e),
    }
}

fn csv_response(result: Result<String, csv::Error>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .body(body),
        Err(e) => HttpResponse::InternalServerError()
            .json(serde_json::json!({ "error": e.to_string() })),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "club-tournament-engine",
    })
}

/// Register a member in the club directory.
#[post("/api/members")]
async fn api_add_member(state: AppState, body: Json<AddMemberBody>) -> HttpResponse {
    let mut club = state.write().await;
    let id = club.add_member(Member::new(body.name.trim()));
    HttpResponse::Ok().json(club.member(id))
}

#[get("/api/members/leaderboard")]
async fn api_leaderboard(state: AppState) -> HttpResponse {
    let club = state.read().await;
    HttpResponse::Ok().json(club.member_leaderboard())
}

#[get("/api/members/leaderboard.csv")]
async fn api_leaderboard_csv(state: AppState) -> HttpResponse {
    let club = state.read().await;
    csv_response(export::leaderboard_csv(&club.member_leaderboard()))
}

/// Create a new tournament (returns it with id; client stores id for subsequent requests).
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    let mut club = state.write().await;
    let id = club.create_tournament(body.format, body.name.trim());
    respond(club.tournament(id))
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let club = state.read().await;
    respond(club.tournament(path.id))
}

/// Delete a tournament and purge its points from every member.
#[delete("/api/tournaments/{id}")]
async fn api_delete_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut club = state.write().await;
    match club.delete_tournament(path.id) {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(e),
    }
}

#[post("/api/tournaments/{id}/teams")]
async fn api_add_team(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<AddTeamBody>,
) -> HttpResponse {
    let mut club = state.write().await;
    let body = body.into_inner();
    match club.add_team(path.id, &body.name, body.members) {
        Ok(_) => respond(club.tournament(path.id)),
        Err(e) => error_response(e),
    }
}

#[delete("/api/tournaments/{id}/teams/{team_id}")]
async fn api_remove_team(state: AppState, path: Path<TournamentTeamPath>) -> HttpResponse {
    let mut club = state.write().await;
    match club.remove_team(path.id, path.team_id) {
        Ok(()) => respond(club.tournament(path.id)),
        Err(e) => error_response(e),
    }
}

/// Set the number of active (non-maintenance) courts.
#[put("/api/tournaments/{id}/courts")]
async fn api_set_courts(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<CourtsBody>,
) -> HttpResponse {
    let mut club = state.write().await;
    match club.set_active_courts(path.id, body.count) {
        Ok(()) => respond(club.tournament(path.id)),
        Err(e) => error_response(e),
    }
}

#[put("/api/tournaments/{id}/groups")]
async fn api_set_groups(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<GroupsBody>,
) -> HttpResponse {
    let mut club = state.write().await;
    match club.set_groups(path.id, body.into_inner().groups) {
        Ok(()) => respond(club.tournament(path.id)),
        Err(e) => error_response(e),
    }
}

#[post("/api/tournaments/{id}/groups/draw")]
async fn api_draw_groups(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut club = state.write().await;
    respond(club.draw_groups(path.id, &mut rand::thread_rng()))
}

#[post("/api/tournaments/{id}/semis")]
async fn api_seed_semis(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<SemisBody>,
) -> HttpResponse {
    let mut club = state.write().await;
    match club.seed_semis(path.id, body.teams) {
        Ok(()) => respond(club.tournament(path.id)),
        Err(e) => error_response(e),
    }
}

/// King: generate the next round of court assignments.
#[post("/api/tournaments/{id}/round")]
async fn api_schedule_round(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut club = state.write().await;
    respond(club.schedule_round(path.id))
}

/// Social: put the next group or knockout pairings on free courts.
#[post("/api/tournaments/{id}/assign")]
async fn api_assign_matches(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut club = state.write().await;
    match club.assign_matches(path.id) {
        Ok(_) => respond(club.tournament(path.id)),
        Err(e) => error_response(e),
    }
}

#[post("/api/tournaments/{id}/courts/{court}/result")]
async fn api_record_match(
    state: AppState,
    path: Path<TournamentCourtPath>,
    body: Json<ScoreBody>,
) -> HttpResponse {
    let mut club = state.write().await;
    respond(club.record_match(path.id, path.court, body.score1, body.score2))
}

#[post("/api/tournaments/{id}/courts/{court}/final-set")]
async fn api_record_final_set(
    state: AppState,
    path: Path<TournamentCourtPath>,
    body: Json<ScoreBody>,
) -> HttpResponse {
    let mut club = state.write().await;
    respond(club.record_final_set(path.id, path.court, body.score1, body.score2))
}

#[put("/api/tournaments/{id}/matches/{match_id}")]
async fn api_edit_match(
    state: AppState,
    path: Path<TournamentMatchPath>,
    body: Json<ScoreBody>,
) -> HttpResponse {
    let mut club = state.write().await;
    respond(club.edit_match(path.id, path.match_id, body.score1, body.score2))
}

#[put("/api/tournaments/{id}/matches/{match_id}/final")]
async fn api_edit_final(
    state: AppState,
    path: Path<TournamentMatchPath>,
    body: Json<FinalBody>,
) -> HttpResponse {
    let mut club = state.write().await;
    respond(club.edit_final(path.id, path.match_id, body.sets, body.tiebreak))
}

#[post("/api/tournaments/{id}/title")]
async fn api_award_title(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<TitleBody>,
) -> HttpResponse {
    let mut club = state.write().await;
    match club.award_king_title(path.id, body.team_id) {
        Ok(()) => respond(club.tournament(path.id)),
        Err(e) => error_response(e),
    }
}

#[get("/api/tournaments/{id}/standings")]
async fn api_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let club = state.read().await;
    respond(club.standings(path.id))
}

#[get("/api/tournaments/{id}/standings.csv")]
async fn api_standings_csv(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let club = state.read().await;
    match club.standings(path.id) {
        Ok(rows) => csv_response(export::standings_csv(&rows)),
        Err(e) => error_response(e),
    }
}

#[get("/api/tournaments/{id}/groups/standings")]
async fn api_group_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let club = state.read().await;
    respond(club.group_standings(path.id))
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Engine settings from the JSON file named by ENGINE_CONFIG, or defaults.
fn load_engine_config() -> std::io::Result<EngineConfig> {
    let Ok(path) = std::env::var("ENGINE_CONFIG") else {
        return Ok(EngineConfig::default());
    };
    let raw = std::fs::read_to_string(&path)?;
    let config = serde_json::from_str(&raw)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    log::info!("Loaded engine config from {}", path);
    Ok(config)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(default_port);
    let bind = (host.as_str(), port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let state = Data::new(RwLock::new(Club::new(load_engine_config()?)));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_add_member)
            .service(api_leaderboard)
            .service(api_leaderboard_csv)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_delete_tournament)
            .service(api_add_team)
            .service(api_remove_team)
            .service(api_set_courts)
            .service(api_set_groups)
            .service(api_draw_groups)
            .service(api_seed_semis)
            .service(api_schedule_round)
            .service(api_assign_matches)
            .service(api_record_match)
            .service(api_record_final_set)
            .service(api_edit_match)
            .service(api_edit_final)
            .service(api_award_title)
            .service(api_standings)
            .service(api_standings_csv)
            .service(api_group_standings)
    })
    .bind(bind)?
    .run()
    .await
}
