//! Puzzle Module
//!
//! Everything needed to turn a quote corpus and a date into the day's puzzle.
//!
//! ## Module Structure
//!
//! - `text`: Cleaning and word chunking
//! - `corpus`: Quote corpus loading
//! - `builder`: Deterministic daily puzzle construction
//! - `cache`: Single-flight cache of the current puzzle

pub mod builder;
pub mod cache;
pub mod corpus;
pub mod text;

// Re-export key types
pub use builder::{DailyPuzzle, PuzzleBuilder, PuzzleRules, Tile, TileId, MAX_TILES, MIN_TILES};
pub use cache::PuzzleCache;
pub use corpus::{CorpusError, Quote, QuoteCorpus};
pub use text::clean_text;
