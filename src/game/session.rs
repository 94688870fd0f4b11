//! Session Management
//!
//! Per-player, per-day guess tracking. A session is keyed by
//! `(date, session id)` and moves one way through its states:
//!
//! ```text
//! NotStarted ──> InProgress ──> Solved
//!      │              │
//!      └──────────────┴──────> Exhausted
//! ```
//!
//! `Solved` and `Exhausted` are terminal; guesses submitted after that are
//! replays and leave the record untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::core::date::PuzzleDate;
use crate::core::hash::session_tag;
use crate::game::stats::StatsAggregator;
use crate::game::validate::{QuoteOrientation, Verdict};

/// Guesses allowed per session.
pub const MAX_GUESSES: u8 = 3;

/// Longest accepted session identifier.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque client-chosen session identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

/// Reasons a session identifier is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionIdError {
    /// Identifier is empty.
    #[error("session id is empty")]
    Empty,
    /// Identifier is longer than [`MAX_SESSION_ID_LEN`].
    #[error("session id exceeds {} characters", MAX_SESSION_ID_LEN)]
    TooLong,
    /// Identifier contains whitespace, control or non-ASCII characters.
    #[error("session id must be visible ASCII")]
    InvalidCharacter,
}

impl SessionId {
    /// Validate and wrap a raw identifier.
    pub fn parse(raw: &str) -> Result<Self, SessionIdError> {
        if raw.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if raw.len() > MAX_SESSION_ID_LEN {
            return Err(SessionIdError::TooLong);
        }
        if !raw.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(SessionIdError::InvalidCharacter);
        }
        Ok(Self(raw.to_string()))
    }

    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe tag.
    pub fn tag(&self) -> String {
        session_tag(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Tiles fetched, no guess yet.
    NotStarted,
    /// At least one wrong guess, guesses remain.
    InProgress,
    /// Solved. Terminal.
    Solved,
    /// Out of guesses. Terminal.
    Exhausted,
}

impl SessionState {
    /// Whether no further guesses count.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Solved | SessionState::Exhausted)
    }
}

/// Guess-tracking record for one player on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Owner.
    pub session_id: SessionId,
    /// Puzzle date this record belongs to.
    pub date: PuzzleDate,
    /// Guesses counted so far, at most [`MAX_GUESSES`].
    pub guess_count: u8,
    /// Current state.
    pub state: SessionState,
    /// Outcome of the latest counted guess.
    pub last_guess_result: Option<bool>,
    /// How the winning guess mapped rows to quotes, once solved.
    pub solved_orientation: Option<QuoteOrientation>,
}

/// Effect of recording a guess on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessTransition {
    /// Session was already terminal; nothing changed.
    Replayed,
    /// Guess counted, session still open.
    Continued,
    /// Guess counted and the session just became terminal.
    Resolved,
}

impl Session {
    /// Fresh session.
    pub fn new(session_id: SessionId, date: PuzzleDate) -> Self {
        Self {
            session_id,
            date,
            guess_count: 0,
            state: SessionState::NotStarted,
            last_guess_result: None,
            solved_orientation: None,
        }
    }

    /// Whether the session is solved or exhausted.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether the session is solved.
    pub fn is_solved(&self) -> bool {
        self.state == SessionState::Solved
    }

    /// Guesses left.
    pub fn remaining_guesses(&self) -> u8 {
        MAX_GUESSES.saturating_sub(self.guess_count)
    }

    /// Count a judged guess.
    pub fn record_guess(&mut self, verdict: &Verdict) -> GuessTransition {
        if self.is_terminal() {
            return GuessTransition::Replayed;
        }

        self.guess_count = (self.guess_count + 1).min(MAX_GUESSES);
        self.last_guess_result = Some(verdict.correct);

        if verdict.correct {
            self.state = SessionState::Solved;
            self.solved_orientation = verdict.orientation;
        } else if self.guess_count >= MAX_GUESSES {
            self.state = SessionState::Exhausted;
        } else {
            self.state = SessionState::InProgress;
        }

        if self.is_terminal() {
            GuessTransition::Resolved
        } else {
            GuessTransition::Continued
        }
    }
}

/// Snapshot of a session plus whether this call created it.
#[derive(Debug, Clone)]
pub struct SessionLookup {
    /// Session snapshot.
    pub session: Session,
    /// True if the record did not exist before this call.
    pub created: bool,
}

/// Result of [`SessionStore::apply_guess`].
#[derive(Debug, Clone)]
pub struct GuessOutcome {
    /// Session after the guess.
    pub session: Session,
    /// What the guess did.
    pub transition: GuessTransition,
    /// True if the record did not exist before this call.
    pub created: bool,
}

type SessionKey = (PuzzleDate, SessionId);

/// Holds all session records.
///
/// Each record sits behind its own mutex, so guesses on one session are
/// strictly ordered while different sessions proceed in parallel.
///
/// The store owns the stats bookkeeping: a session is counted in
/// `total_sessions` inside the write lock that creates it, and its terminal
/// result is counted inside the record lock that resolves it. Every solve is
/// therefore preceded by the count of its session.
pub struct SessionStore {
    sessions: RwLock<BTreeMap<SessionKey, Arc<Mutex<Session>>>>,
    stats: Arc<StatsAggregator>,
}

impl SessionStore {
    /// Create an empty store with its own statistics.
    pub fn new() -> Self {
        Self::with_stats(Arc::new(StatsAggregator::new()))
    }

    /// Create an empty store reporting into `stats`.
    pub fn with_stats(stats: Arc<StatsAggregator>) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            stats,
        }
    }

    /// Statistics this store reports into.
    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    /// Record handle for `(id, date)`, creating it if absent.
    async fn entry(&self, id: &SessionId, date: PuzzleDate) -> (Arc<Mutex<Session>>, bool) {
        let key = (date, id.clone());
        {
            let sessions = self.sessions.read().await;
            if let Some(record) = sessions.get(&key) {
                return (record.clone(), false);
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another request may have created it between the two locks
        if let Some(record) = sessions.get(&key) {
            return (record.clone(), false);
        }
        let record = Arc::new(Mutex::new(Session::new(id.clone(), date)));
        sessions.insert(key, record.clone());
        self.stats.record_session(date).await;
        debug!(session = %id.tag(), %date, "Created session");
        (record, true)
    }

    /// Session for `(id, date)`, created with no guesses if absent.
    pub async fn get(&self, id: &SessionId, date: PuzzleDate) -> SessionLookup {
        let (record, created) = self.entry(id, date).await;
        let session = record.lock().await.clone();
        SessionLookup { session, created }
    }

    /// Count a judged guess against the session.
    ///
    /// Terminal sessions are returned unchanged, so replays never
    /// double-count. The guess that resolves a session is recorded in the
    /// statistics before the record lock is released.
    pub async fn apply_guess(
        &self,
        id: &SessionId,
        date: PuzzleDate,
        verdict: &Verdict,
    ) -> GuessOutcome {
        let (record, created) = self.entry(id, date).await;
        let mut session = record.lock().await;
        let transition = session.record_guess(verdict);

        if transition == GuessTransition::Resolved {
            self.stats
                .record_terminal(date, session.is_solved(), session.guess_count)
                .await;
            info!(
                session = %id.tag(),
                %date,
                guesses = session.guess_count,
                solved = session.is_solved(),
                "Session resolved"
            );
        }

        GuessOutcome {
            session: session.clone(),
            transition,
            created,
        }
    }

    /// Drop every record for dates before `date`.
    pub async fn prune_before(&self, date: PuzzleDate) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|(d, _), _| *d >= date);
        before - sessions.len()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
