//! Core deterministic primitives.
//!
//! Everything that decides the content of a daily puzzle flows from these
//! types. Given the same date and corpus they yield identical results on
//! any platform.

pub mod date;
pub mod hash;
pub mod rng;

// Re-export core types
pub use date::{Clock, ManualClock, PuzzleDate, SystemClock};
pub use hash::{session_tag, PuzzleHash, PuzzleHasher};
pub use rng::{CounterHashRng, DeterministicRandom, RandomAlgorithm, SineRng};
