//! HTTP Game Server
//!
//! axum router over [`GameService`], plus the background task that rolls
//! the puzzle over when the date changes.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument};

use crate::config::{ConfigError, ServerConfig};
use crate::game::service::GameService;
use crate::game::session::{SessionId, SessionIdError};
use crate::game::validate::GuessError;
use crate::network::protocol::{
    ErrorBody, ErrorCode, SessionResponse, StatsResponse, TilesResponse, ValidateRequest,
    ValidateResponse, VersionResponse, SESSION_HEADER,
};
use crate::puzzle::builder::PuzzleBuilder;

/// Request errors, rendered as `{ "error": { "code", "message" } }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Required session header absent.
    #[error("missing X-Session-Id header")]
    MissingSession,

    /// Session header present but unusable.
    #[error("invalid X-Session-Id header: {0}")]
    InvalidSession(#[from] SessionIdError),

    /// Body missing or not the expected JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// Guess does not describe a permutation of today's tiles.
    #[error("malformed guess: {0}")]
    MalformedGuess(#[from] GuessError),

    /// Unexpected failure.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// Wire error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::MissingSession => ErrorCode::MissingSession,
            ApiError::InvalidSession(_) => ErrorCode::InvalidSession,
            ApiError::InvalidBody(_) => ErrorCode::InvalidInput,
            ApiError::MalformedGuess(_) => ErrorCode::MalformedGuess,
            ApiError::Internal => ErrorCode::InternalError,
        }
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody::new(self.code(), self.to_string());
        (self.status(), Json(body)).into_response()
    }
}

/// Extractor for the caller's `X-Session-Id`.
#[derive(Debug, Clone)]
pub struct PlayerSession(pub SessionId);

impl<S> FromRequestParts<S> for PlayerSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(SESSION_HEADER)
            .ok_or(ApiError::MissingSession)?;
        let raw = value
            .to_str()
            .map_err(|_| ApiError::InvalidSession(SessionIdError::InvalidCharacter))?;
        Ok(PlayerSession(SessionId::parse(raw)?))
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind or serve.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// Startup configuration was unusable.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Build the HTTP router.
pub fn router(game: Arc<GameService>, cors_permissive: bool) -> Router {
    let app = Router::new()
        .route("/tiles", get(tiles))
        .route("/validate", post(validate))
        .route("/stats", get(stats))
        .route("/version", get(version))
        .route("/session", get(new_session))
        .route("/healthz", get(healthz))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(game);

    if cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn tiles(
    State(game): State<Arc<GameService>>,
    PlayerSession(session_id): PlayerSession,
) -> Json<TilesResponse> {
    Json(game.tiles(&session_id).await.into())
}

async fn validate(
    State(game): State<Arc<GameService>>,
    PlayerSession(session_id): PlayerSession,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))?;
    let report = game.validate(&session_id, &request.user_state).await?;
    Ok(Json(report.into()))
}

async fn stats(State(game): State<Arc<GameService>>) -> Json<StatsResponse> {
    Json(game.stats().await.into())
}

async fn version(State(game): State<Arc<GameService>>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: game.version().await.to_string(),
    })
}

async fn new_session() -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: SessionId::generate().to_string(),
    })
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "Request handler panicked");
    ApiError::Internal.into_response()
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shared game state.
    game: Arc<GameService>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server over an existing game service.
    pub fn new(config: ServerConfig, game: Arc<GameService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            game,
            shutdown_tx,
        }
    }

    /// Load the corpus and wire up the game service from configuration.
    pub fn from_config(config: ServerConfig) -> Result<Self, GameServerError> {
        let corpus = config.load_corpus()?;
        let clock = config.clock()?;
        let builder = PuzzleBuilder::new(corpus, config.random_algorithm)
            .with_rules(config.puzzle_rules());
        let game = Arc::new(GameService::new(builder, Arc::new(clock)));
        Ok(Self::new(config, game))
    }

    /// Shared game service.
    pub fn game(&self) -> &Arc<GameService> {
        &self.game
    }

    /// Router for this server's configuration.
    pub fn router(&self) -> Router {
        router(self.game.clone(), self.config.cors_permissive)
    }

    /// Run the server until [`GameServer::shutdown`] is called.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("Quote server listening on {}", listener.local_addr()?);

        let date = self.game.refresh().await;
        info!(%date, "Puzzle ready");

        let rollover_handle = tokio::spawn(Self::run_rollover_loop(
            self.game.clone(),
            self.config.rollover_check,
        ));

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Shutdown signal received");
            })
            .await;

        rollover_handle.abort();
        Ok(result?)
    }

    /// Pre-build each new day's puzzle and prune stale sessions.
    async fn run_rollover_loop(game: Arc<GameService>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let date = game.refresh().await;
            let sessions = game.session_count().await;
            debug!(%date, sessions, "Rollover check");
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::core::date::{ManualClock, PuzzleDate};
    use crate::core::rng::RandomAlgorithm;
    use crate::puzzle::builder::{DailyPuzzle, PuzzleRules};
    use crate::puzzle::corpus::{Quote, QuoteCorpus};

    fn game() -> Arc<GameService> {
        let corpus = QuoteCorpus::from_quotes(vec![
            Quote::new("The cat sat on the mat", "Alice"),
            Quote::new("A dog ran in the yard", "Bob"),
        ])
        .unwrap();
        let builder = PuzzleBuilder::new(corpus, RandomAlgorithm::Sine).with_rules(PuzzleRules {
            flip_probability: 0.5,
            ..PuzzleRules::default()
        });
        let clock = ManualClock::new(PuzzleDate::from_ymd(2024, 3, 15).unwrap());
        Arc::new(GameService::new(builder, Arc::new(clock)))
    }

    fn solution(puzzle: &DailyPuzzle) -> Value {
        let state: Vec<Value> = puzzle
            .canonical_order
            .iter()
            .map(|id| json!({ "tileId": id, "isFlipped": puzzle.canonical_flip[id] }))
            .collect();
        json!({ "userState": state })
    }

    fn wrong(puzzle: &DailyPuzzle) -> Value {
        let state: Vec<Value> = puzzle
            .canonical_order
            .iter()
            .rev()
            .map(|id| json!({ "tileId": id, "isFlipped": puzzle.canonical_flip[id] }))
            .collect();
        json!({ "userState": state })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get_as(uri: &str, session: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(SESSION_HEADER, session)
            .body(Body::empty())
            .unwrap()
    }

    fn post_as(session: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/validate")
            .header(SESSION_HEADER, session)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_tiles_requires_session_header() {
        let app = router(game(), true);
        let request = Request::builder().uri("/tiles").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "missing_session");
    }

    #[tokio::test]
    async fn test_tiles_rejects_bad_session_id() {
        let app = router(game(), true);
        let long = "x".repeat(200);
        let (status, body) = send(&app, get_as("/tiles", &long)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_session");
    }

    #[tokio::test]
    async fn test_tiles_for_new_session() {
        let game = game();
        let app = router(game.clone(), true);
        let puzzle = game.today().await;

        let (status, body) = send(&app, get_as("/tiles", "p1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["guessNumber"], 0);
        assert_eq!(body["solved"], false);
        assert!(body.get("completedTop").is_none());

        let tiles = body["tiles"].as_array().unwrap();
        assert_eq!(tiles.len(), puzzle.tile_count());
        let ids: Vec<u64> = tiles.iter().map(|t| t["tileId"].as_u64().unwrap()).collect();
        let expected: Vec<u64> = puzzle.presentation_order.iter().map(|id| *id as u64).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_correct_guess_reveals_quotes() {
        let game = game();
        let app = router(game.clone(), true);
        let puzzle = game.today().await;

        send(&app, get_as("/tiles", "winner")).await;
        let (status, body) = send(&app, post_as("winner", &solution(&puzzle))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], true);
        assert_eq!(body["guessNumber"], 1);
        assert_eq!(
            body["completedTop"],
            format!("{} - {}", puzzle.cleaned_a, puzzle.quote_a.author)
        );
        assert_eq!(
            body["completedBottom"],
            format!("{} - {}", puzzle.cleaned_b, puzzle.quote_b.author)
        );

        // Resolved sessions get no tiles
        let (_, body) = send(&app, get_as("/tiles", "winner")).await;
        assert!(body.get("tiles").is_none());
        assert_eq!(body["solved"], true);
        assert_eq!(body["result"], true);

        // Replay is idempotent
        let (_, body) = send(&app, post_as("winner", &wrong(&puzzle))).await;
        assert_eq!(body["result"], true);
        assert_eq!(body["guessNumber"], 1);

        let (_, stats) = send(&app, get_as("/stats", "winner")).await;
        assert_eq!(stats["solvedIn1"], 1);
        assert_eq!(stats["solvedCount"], 1);
        assert_eq!(stats["totalSessions"], 1);
    }

    #[tokio::test]
    async fn test_three_wrong_guesses_exhaust() {
        let game = game();
        let app = router(game.clone(), true);
        let puzzle = game.today().await;

        let (_, first) = send(&app, post_as("loser", &wrong(&puzzle))).await;
        assert_eq!(first["result"], false);
        assert_eq!(first["guessNumber"], 1);
        assert!(first.get("completedTop").is_none());

        send(&app, post_as("loser", &wrong(&puzzle))).await;
        let (_, third) = send(&app, post_as("loser", &wrong(&puzzle))).await;
        assert_eq!(third["result"], false);
        assert_eq!(third["guessNumber"], 3);
        assert!(third["completedTop"].as_str().unwrap().starts_with(&puzzle.cleaned_a));
        assert!(third["completedBottom"].as_str().unwrap().starts_with(&puzzle.cleaned_b));

        let (_, stats) = send(&app, get_as("/stats", "loser")).await;
        assert_eq!(stats["solvedCount"], 0);
        assert_eq!(stats["totalSessions"], 1);
    }

    #[tokio::test]
    async fn test_malformed_guess_is_rejected_without_counting() {
        let game = game();
        let app = router(game.clone(), true);
        let puzzle = game.today().await;

        let mut body = solution(&puzzle);
        body["userState"].as_array_mut().unwrap().pop();
        let (status, err) = send(&app, post_as("careless", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["code"], "malformed_guess");

        let (_, tiles) = send(&app, get_as("/tiles", "careless")).await;
        assert_eq!(tiles["guessNumber"], 0);
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let app = router(game(), true);
        let request = Request::builder()
            .method("POST")
            .uri("/validate")
            .header(SESSION_HEADER, "p1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_input");
    }

    #[tokio::test]
    async fn test_version_and_session_endpoints() {
        let app = router(game(), false);

        let request = Request::builder().uri("/version").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], "2024-03-15");

        let request = Request::builder().uri("/session").body(Body::empty()).unwrap();
        let (_, body) = send(&app, request).await;
        let minted = body["sessionId"].as_str().unwrap();
        assert!(SessionId::parse(minted).is_ok());

        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }

    #[test]
    fn test_api_error_mapping() {
        assert_eq!(ApiError::MissingSession.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(GuessError::UnknownTile(9)).code(),
            ErrorCode::MalformedGuess
        );
        assert_eq!(ApiError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rollover_loop_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let rollover = GameServer::run_rollover_loop(game(), Duration::from_secs(60));
        assert_send(&rollover);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        };
        let server = GameServer::new(config, game());
        server.shutdown();
        // Should not panic
    }
}
