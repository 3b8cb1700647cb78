use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{GameConfig, PlayerConfig};
use crate::controller::{
    ClickOutcome, Game, GameEvent, Highlight, PendingAction, PendingToken, Selection, TurnState,
};
use crate::game::{Cell, GameError, Piece};

pub struct ServerConfig {
    pub addr: SocketAddr,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    session: Arc<Mutex<WebSession>>,
}

struct WebSession {
    game: Game,
    /// Timer task for the pending action, aborted on reset
    timer: Option<JoinHandle<()>>,
    scheduled: Option<PendingToken>,
}

impl AppState {
    pub fn new(game: Game) -> Self {
        AppState {
            session: Arc::new(Mutex::new(WebSession {
                game,
                timer: None,
                scheduled: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WebSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct NewGameRequest {
    config: Option<GameConfig>,
}

/// Pointer position translated to grid coordinates by the client.
/// Negative values mean the pointer is off the board.
#[derive(Serialize, Deserialize)]
pub struct CellRequest {
    row: i64,
    col: i64,
}

impl CellRequest {
    fn cell(&self) -> Option<Cell> {
        let row = usize::try_from(self.row).ok()?;
        let col = usize::try_from(self.col).ok()?;
        Some(Cell::new(row, col))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    rows: usize,
    columns: usize,
    pieces: Vec<Piece>,
    players: Vec<PlayerConfig>,
    current_player: usize,
    state: TurnState,
    accepting_input: bool,
    pending: Option<PendingAction>,
    selection: Selection,
    winner: Option<String>,
    events: Vec<GameEvent>,
    messages: Vec<String>,
}

#[derive(Serialize)]
pub struct ClickResponse {
    outcome: ClickOutcome,
    game: GameResponse,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": self.to_string()
            })),
        )
            .into_response()
    }
}

/// Snapshot of the game for the client; hands over any undelivered events
fn game_response(game: &mut Game) -> GameResponse {
    let events = game.drain_events();
    let messages = events.iter().map(GameEvent::message).collect();

    GameResponse {
        rows: game.board().rows(),
        columns: game.board().columns(),
        pieces: game.board_snapshot(),
        players: game.players().to_vec(),
        current_player: game.current_player(),
        state: game.state(),
        accepting_input: game.accepts_input(),
        pending: game.pending().map(|p| p.action),
        selection: game.selection(),
        winner: game.winner().map(|w| game.player_name(w)),
        events,
        messages,
    }
}

/// Arm a timer for the game's pending action unless one is already armed.
/// When it fires, the next pending action is armed in turn.
fn schedule_pending(app_state: &AppState) {
    let mut session = app_state.lock();
    let Some(pending) = session.game.pending() else {
        return;
    };
    if session.scheduled == Some(pending.token) {
        return;
    }

    session.scheduled = Some(pending.token);
    let task_state = app_state.clone();
    session.timer = Some(tokio::spawn(async move {
        tokio::time::sleep(pending.delay).await;
        let fired = task_state.lock().game.fire_pending(pending.token);
        if fired {
            schedule_pending(&task_state);
        }
    }));
}

#[axum::debug_handler]
async fn new_game(
    State(app_state): State<AppState>,
    Json(req): Json<NewGameRequest>,
) -> Result<Json<GameResponse>, GameError> {
    let response = {
        let mut session = app_state.lock();
        match req.config {
            Some(config) => session.game.reconfigure(config)?,
            None => session.game.reset_game(),
        }

        // The old game's timer must not outlive it
        if let Some(timer) = session.timer.take() {
            timer.abort();
        }
        session.scheduled = None;
        game_response(&mut session.game)
    }; // MutexGuard dropped here

    schedule_pending(&app_state);
    Ok(Json(response))
}

#[axum::debug_handler]
async fn click(State(app_state): State<AppState>, Json(req): Json<CellRequest>) -> Response {
    let response = {
        let mut session = app_state.lock();
        let outcome = session.game.handle_cell_clicked(req.cell());
        ClickResponse {
            outcome,
            game: game_response(&mut session.game),
        }
    };

    schedule_pending(&app_state);
    Json(response).into_response()
}

#[axum::debug_handler]
async fn hover(State(app_state): State<AppState>, Json(req): Json<CellRequest>) -> Json<Highlight> {
    let session = app_state.lock();
    Json(session.game.handle_cell_hovered(req.cell()))
}

#[axum::debug_handler]
async fn get_game_state(State(app_state): State<AppState>) -> Json<GameResponse> {
    let mut session = app_state.lock();
    Json(game_response(&mut session.game))
}

pub fn router(app_state: AppState, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/new-game", post(new_game))
        .route("/api/click", post(click))
        .route("/api/hover", post(hover))
        .route("/api/game-state", get(get_game_state))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_server(
    config: ServerConfig,
    game: Game,
) -> Result<(), Box<dyn std::error::Error>> {
    let app_state = AppState::new(game);
    schedule_pending(&app_state);

    let app = router(app_state, config.static_dir);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "web server running");

    axum::serve(listener, app).await?;
    Ok(())
}
