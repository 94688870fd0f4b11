//! Game Logic Module
//!
//! Per-player sessions, guess judging and daily statistics.
//!
//! ## Module Structure
//!
//! - `session`: Session identity, state machine and store
//! - `validate`: Guess judging and replay
//! - `stats`: Per-date solve tallies
//! - `service`: Request-level orchestration over today's puzzle

pub mod service;
pub mod session;
pub mod stats;
pub mod validate;

// Re-export key types
pub use service::{GameService, TilesView};
pub use session::{Session, SessionId, SessionIdError, SessionState, SessionStore, MAX_GUESSES};
pub use stats::{DailyStats, StatsAggregator};
pub use validate::{CompletedQuotes, GuessError, QuoteOrientation, TileChoice, ValidationReport, Verdict};
