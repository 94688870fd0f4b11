//! Daily Statistics
//!
//! Per-date tallies of how many sessions solved the puzzle in one, two or
//! three guesses, against the number of sessions that fetched tiles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use crate::core::date::PuzzleDate;
use crate::game::session::MAX_GUESSES;

/// Aggregate results for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// Date the tallies belong to.
    pub date: PuzzleDate,
    /// Sessions solved on the first guess.
    pub solved_in1: u64,
    /// Sessions solved on the second guess.
    pub solved_in2: u64,
    /// Sessions solved on the third guess.
    pub solved_in3: u64,
    /// `solved_in1 + solved_in2 + solved_in3`.
    pub solved_count: u64,
    /// Sessions that fetched tiles (or guessed) at least once.
    pub total_sessions: u64,
}

impl DailyStats {
    /// Zero tallies for `date`.
    pub fn empty(date: PuzzleDate) -> Self {
        Self {
            date,
            solved_in1: 0,
            solved_in2: 0,
            solved_in3: 0,
            solved_count: 0,
            total_sessions: 0,
        }
    }

    /// Sessions that ran out of guesses or are still open.
    pub fn unsolved_count(&self) -> u64 {
        self.total_sessions.saturating_sub(self.solved_count)
    }
}

/// Holds per-date tallies.
pub struct StatsAggregator {
    days: RwLock<BTreeMap<PuzzleDate, DailyStats>>,
}

impl StatsAggregator {
    /// Create with no history.
    pub fn new() -> Self {
        Self {
            days: RwLock::new(BTreeMap::new()),
        }
    }

    /// Count a newly created session.
    pub async fn record_session(&self, date: PuzzleDate) {
        let mut days = self.days.write().await;
        days.entry(date)
            .or_insert_with(|| DailyStats::empty(date))
            .total_sessions += 1;
    }

    /// Count a session reaching a terminal state.
    ///
    /// Must be called once per session, at the transition, after
    /// [`record_session`](Self::record_session) for that session.
    /// [`SessionStore`](crate::game::session::SessionStore) upholds both.
    /// Exhausted sessions contribute nothing beyond their `total_sessions`
    /// entry.
    pub async fn record_terminal(&self, date: PuzzleDate, solved: bool, guess_number: u8) {
        if !solved {
            return;
        }

        let mut days = self.days.write().await;
        let stats = days.entry(date).or_insert_with(|| DailyStats::empty(date));
        match guess_number {
            1 => stats.solved_in1 += 1,
            2 => stats.solved_in2 += 1,
            n if n == MAX_GUESSES => stats.solved_in3 += 1,
            n => {
                warn!(%date, guess_number = n, "Ignoring solve with out-of-range guess number");
                return;
            }
        }
        stats.solved_count = stats.solved_in1 + stats.solved_in2 + stats.solved_in3;
    }

    /// Tallies for `date`; zeros if nothing was recorded.
    pub async fn get(&self, date: PuzzleDate) -> DailyStats {
        self.days
            .read()
            .await
            .get(&date)
            .copied()
            .unwrap_or_else(|| DailyStats::empty(date))
    }

    /// Drop tallies for dates before `date`.
    pub async fn prune_before(&self, date: PuzzleDate) -> usize {
        let mut days = self.days.write().await;
        let before = days.len();
        days.retain(|d, _| *d >= date);
        before - days.len()
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
