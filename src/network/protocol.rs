//! Protocol Messages
//!
//! JSON wire format for the HTTP API. Field names are camelCase to match
//! the browser client.

use serde::{Deserialize, Serialize};

use crate::game::service::TilesView;
use crate::game::stats::DailyStats;
use crate::game::validate::{CompletedQuotes, TileChoice, ValidationReport};
use crate::puzzle::builder::Tile;

/// Header carrying the player's opaque session id.
pub const SESSION_HEADER: &str = "x-session-id";

// =============================================================================
// REQUESTS
// =============================================================================

/// Body of `POST /validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    /// Submitted arrangement, left to right.
    pub user_state: Vec<TileChoice>,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Body of `GET /tiles`.
///
/// Open sessions get `tiles`; resolved sessions get `result` and the
/// completed quotes instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesResponse {
    /// Tiles in presentation order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<Tile>>,
    /// Guesses used so far.
    pub guess_number: u8,
    /// Whether the session solved the puzzle.
    pub solved: bool,
    /// Last counted result, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    /// Top quote with author, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_top: Option<String>,
    /// Bottom quote with author, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_bottom: Option<String>,
}

impl From<TilesView> for TilesResponse {
    fn from(view: TilesView) -> Self {
        match view {
            TilesView::Open { tiles, guess_number } => Self {
                tiles: Some(tiles),
                guess_number,
                solved: false,
                result: None,
                completed_top: None,
                completed_bottom: None,
            },
            TilesView::Resolved {
                guess_number,
                solved,
                result,
                completed: CompletedQuotes { top, bottom },
            } => Self {
                tiles: None,
                guess_number,
                solved,
                result: Some(result),
                completed_top: Some(top),
                completed_bottom: Some(bottom),
            },
        }
    }
}

/// Body of `POST /validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    /// Whether the guess was correct.
    pub result: bool,
    /// Guesses used, including this one.
    pub guess_number: u8,
    /// Top quote with author, once terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_top: Option<String>,
    /// Bottom quote with author, once terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_bottom: Option<String>,
}

impl From<ValidationReport> for ValidateResponse {
    fn from(report: ValidationReport) -> Self {
        let (completed_top, completed_bottom) = match report.completed {
            Some(CompletedQuotes { top, bottom }) => (Some(top), Some(bottom)),
            None => (None, None),
        };
        Self {
            result: report.result,
            guess_number: report.guess_number,
            completed_top,
            completed_bottom,
        }
    }
}

/// Body of `GET /stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Solved on the first guess.
    pub solved_in1: u64,
    /// Solved on the second guess.
    pub solved_in2: u64,
    /// Solved on the third guess.
    pub solved_in3: u64,
    /// Total solved.
    pub solved_count: u64,
    /// Sessions that played today.
    pub total_sessions: u64,
}

impl From<DailyStats> for StatsResponse {
    fn from(stats: DailyStats) -> Self {
        Self {
            solved_in1: stats.solved_in1,
            solved_in2: stats.solved_in2,
            solved_in3: stats.solved_in3,
            solved_count: stats.solved_count,
            total_sessions: stats.total_sessions,
        }
    }
}

/// Body of `GET /version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    /// Current puzzle date, `YYYY-MM-DD`.
    pub version: String,
}

/// Body of `GET /session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Freshly minted session id.
    pub session_id: String,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body: `{ "error": { "code", "message" } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error.
    pub error: ServerError,
}

/// Error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ErrorBody {
    /// Build an error body.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ServerError {
                code,
                message: message.into(),
            },
        }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No `X-Session-Id` header.
    MissingSession,
    /// `X-Session-Id` present but unusable.
    InvalidSession,
    /// Body could not be parsed.
    InvalidInput,
    /// Guess does not describe a permutation of today's tiles.
    MalformedGuess,
    /// Internal error.
    InternalError,
}

// =============================================================================
// TESTS
// =============================================================================
