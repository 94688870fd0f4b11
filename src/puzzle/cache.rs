//! Daily Puzzle Cache
//!
//! Holds the puzzle for "today" and builds at most once per date.
//! Concurrent first requests for a date share one in-flight build.
//! Dates that have aged out of the cache are never rebuilt; requests for
//! them get the oldest puzzle still held.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::core::date::PuzzleDate;
use crate::puzzle::builder::{DailyPuzzle, PuzzleBuilder};

type PuzzleSlot = Arc<OnceCell<Arc<DailyPuzzle>>>;

#[derive(Default)]
struct SlotTable {
    slots: BTreeMap<PuzzleDate, PuzzleSlot>,
    /// Oldest date still held; anything earlier has been dropped.
    floor: Option<PuzzleDate>,
}

impl SlotTable {
    /// Slot for `date`, redirecting dates below the floor.
    fn slot_for(&mut self, date: PuzzleDate) -> (PuzzleDate, PuzzleSlot) {
        let date = match self.floor {
            Some(floor) if date < floor => {
                let held = self.slots.range(floor..).next().map_or(floor, |(d, _)| *d);
                warn!(requested = %date, serving = %held, "Request for a retired puzzle date");
                held
            }
            _ => date,
        };
        (date, self.slots.entry(date).or_default().clone())
    }
}

/// Process-wide, single-flight puzzle cache.
pub struct PuzzleCache {
    builder: PuzzleBuilder,
    /// One slot per date; the `OnceCell` serializes the build.
    slots: Mutex<SlotTable>,
    /// Latest date served.
    current: RwLock<Option<PuzzleDate>>,
    /// Completed builds, for diagnostics.
    builds: AtomicUsize,
}

impl PuzzleCache {
    /// Create an empty cache.
    pub fn new(builder: PuzzleBuilder) -> Self {
        Self {
            builder,
            slots: Mutex::new(SlotTable::default()),
            current: RwLock::new(None),
            builds: AtomicUsize::new(0),
        }
    }

    /// Puzzle for `date`, building it if this is the first request.
    ///
    /// Callers racing on an unbuilt date wait for the single build in flight.
    /// A date older than the retained window is answered with the oldest
    /// retained puzzle instead of being built a second time.
    pub async fn get_or_build(&self, date: PuzzleDate) -> Arc<DailyPuzzle> {
        let (date, slot) = self.slots.lock().await.slot_for(date);

        let puzzle = slot
            .get_or_init(|| async {
                debug!(%date, "Building puzzle");
                let puzzle = Arc::new(self.builder.build(date));
                self.builds.fetch_add(1, Ordering::Relaxed);
                puzzle
            })
            .await
            .clone();

        self.advance(date).await;
        puzzle
    }

    /// Date of the newest puzzle served, used by clients for cache-busting.
    pub async fn current_version(&self) -> Option<PuzzleDate> {
        *self.current.read().await
    }

    /// Number of builds performed since startup.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Number of dates currently held.
    pub async fn cached_dates(&self) -> usize {
        self.slots.lock().await.slots.len()
    }

    /// Record `date` as current if it is newer, dropping slots older than
    /// the day before it.
    async fn advance(&self, date: PuzzleDate) {
        {
            let current = self.current.read().await;
            if current.is_some_and(|c| c >= date) {
                return;
            }
        }

        let mut current = self.current.write().await;
        if current.is_some_and(|c| c >= date) {
            return;
        }
        let previous = current.replace(date);
        drop(current);

        let keep_from = date.naive().pred_opt().map(PuzzleDate::new).unwrap_or(date);
        let mut table = self.slots.lock().await;
        table.floor = Some(keep_from);
        table.slots.retain(|d, _| *d >= keep_from);
        drop(table);

        info!(
            from = ?previous.map(|d| d.to_string()),
            to = %date,
            "Puzzle date rolled over"
        );
    }
}
