//! Game Service
//!
//! Ties the puzzle cache, session store and statistics together into the
//! request-level operations the HTTP layer exposes.
//!
//! Every request runs under a read guard on the active date. Rollover takes
//! the write side, so sessions are pruned only once no request is using
//! the old day, and the served date never moves backward.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::core::date::{Clock, PuzzleDate};
use crate::game::session::{SessionId, SessionStore};
use crate::game::stats::{DailyStats, StatsAggregator};
use crate::game::validate::{validate_guess, CompletedQuotes, GuessError, TileChoice, ValidationReport};
use crate::puzzle::builder::{DailyPuzzle, PuzzleBuilder, Tile};
use crate::puzzle::cache::PuzzleCache;

/// Days of statistics kept after rollover.
pub const STATS_RETENTION_DAYS: u64 = 30;

/// What a player sees when fetching tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilesView {
    /// Session still open: tiles in presentation order.
    Open {
        /// Public tiles.
        tiles: Vec<Tile>,
        /// Guesses used so far.
        guess_number: u8,
    },
    /// Session solved or exhausted: no tiles, only the outcome.
    Resolved {
        /// Guesses used.
        guess_number: u8,
        /// Whether the puzzle was solved.
        solved: bool,
        /// Result of the last counted guess.
        result: bool,
        /// Revealed quotes.
        completed: CompletedQuotes,
    },
}

/// A request's hold on the active day.
///
/// Rollover waits until every outstanding guard is dropped.
pub struct DayGuard<'a> {
    _active: RwLockReadGuard<'a, Option<PuzzleDate>>,
    puzzle: Arc<DailyPuzzle>,
}

impl DayGuard<'_> {
    /// Puzzle for the held day.
    pub fn puzzle(&self) -> &Arc<DailyPuzzle> {
        &self.puzzle
    }

    /// The held day.
    pub fn date(&self) -> PuzzleDate {
        self.puzzle.date
    }
}

/// Request-level game operations.
pub struct GameService {
    cache: PuzzleCache,
    sessions: SessionStore,
    stats: Arc<StatsAggregator>,
    clock: Arc<dyn Clock>,
    /// Date whose sessions are live; older records get pruned.
    active_date: RwLock<Option<PuzzleDate>>,
}

impl GameService {
    /// Create a service over a puzzle builder and clock.
    pub fn new(builder: PuzzleBuilder, clock: Arc<dyn Clock>) -> Self {
        let stats = Arc::new(StatsAggregator::new());
        Self {
            cache: PuzzleCache::new(builder),
            sessions: SessionStore::with_stats(stats.clone()),
            stats,
            clock,
            active_date: RwLock::new(None),
        }
    }

    /// Hold the active day for the length of a request.
    ///
    /// Rolls over first if the clock has passed the active date. A clock
    /// that reads earlier than the active date is served the active date.
    pub async fn enter(&self) -> DayGuard<'_> {
        loop {
            let today = self.clock.today();
            {
                let active = self.active_date.read().await;
                if let Some(date) = (*active).filter(|d| *d >= today) {
                    let puzzle = self.cache.get_or_build(date).await;
                    return DayGuard {
                        _active: active,
                        puzzle,
                    };
                }
            }
            self.roll_to(today).await;
        }
    }

    /// Today's puzzle, handling date rollover.
    pub async fn today(&self) -> Arc<DailyPuzzle> {
        self.enter().await.puzzle
    }

    /// Tiles (or the final outcome) for a session.
    pub async fn tiles(&self, session_id: &SessionId) -> TilesView {
        let day = self.enter().await;
        let puzzle = day.puzzle();
        let lookup = self.sessions.get(session_id, day.date()).await;

        let session = lookup.session;
        match CompletedQuotes::reveal(puzzle, &session) {
            Some(completed) => TilesView::Resolved {
                guess_number: session.guess_count,
                solved: session.is_solved(),
                result: session.last_guess_result.unwrap_or(false),
                completed,
            },
            None => TilesView::Open {
                tiles: puzzle.public_tiles(),
                guess_number: session.guess_count,
            },
        }
    }

    /// Judge and count a guess.
    pub async fn validate(
        &self,
        session_id: &SessionId,
        choices: &[TileChoice],
    ) -> Result<ValidationReport, GuessError> {
        let day = self.enter().await;
        validate_guess(&self.sessions, day.puzzle(), session_id, choices)
            .await
            .inspect_err(|err| {
                debug!(session = %session_id.tag(), error = %err, "Rejected malformed guess");
            })
    }

    /// Statistics for today.
    pub async fn stats(&self) -> DailyStats {
        let day = self.enter().await;
        self.stats.get(day.date()).await
    }

    /// Current puzzle date, for client cache-busting.
    pub async fn version(&self) -> PuzzleDate {
        let day = self.enter().await;
        self.cache.current_version().await.unwrap_or(day.date())
    }

    /// Build today's puzzle ahead of the first request after rollover.
    pub async fn refresh(&self) -> PuzzleDate {
        self.enter().await.date()
    }

    /// Number of live session records.
    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    /// Make `date` the active day. Waits for in-flight requests on the
    /// previous day to finish before pruning its sessions.
    async fn roll_to(&self, date: PuzzleDate) {
        let mut active = self.active_date.write().await;
        if active.is_some_and(|d| d >= date) {
            return;
        }
        self.cache.get_or_build(date).await;
        *active = Some(date);

        let pruned = self.sessions.prune_before(date).await;
        let stats_cutoff = date
            .naive()
            .checked_sub_days(chrono::Days::new(STATS_RETENTION_DAYS))
            .map(PuzzleDate::new);
        if let Some(cutoff) = stats_cutoff {
            self.stats.prune_before(cutoff).await;
        }

        info!(%date, pruned_sessions = pruned, "Activated puzzle date");
    }
}
