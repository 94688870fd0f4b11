//! # Quotable Server
//!
//! Server-authoritative daily puzzle: two quotes are cut into word-chunk
//! tiles, each tile carrying one chunk from each quote. Players reorder and
//! flip the tiles to rebuild both quotes within three guesses.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     QUOTABLE SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded generators (sine, SHA-256 counter) │
//! │  ├── hash.rs     - Puzzle fingerprints, session tags         │
//! │  └── date.rs     - Puzzle dates, seeds and clocks            │
//! │                                                              │
//! │  puzzle/         - Puzzle construction (deterministic)       │
//! │  ├── text.rs     - Cleaning and word chunking                │
//! │  ├── corpus.rs   - Quote corpus loading                      │
//! │  ├── builder.rs  - Daily puzzle builder                      │
//! │  └── cache.rs    - Single-flight puzzle cache                │
//! │                                                              │
//! │  game/           - Player state                              │
//! │  ├── session.rs  - Session state machine and store           │
//! │  ├── validate.rs - Guess judging                             │
//! │  ├── stats.rs    - Daily solve statistics                    │
//! │  └── service.rs  - Request-level orchestration               │
//! │                                                              │
//! │  network/        - HTTP (non-deterministic)                  │
//! │  ├── server.rs   - axum router and serve loop                │
//! │  └── protocol.rs - JSON wire types                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `puzzle/` modules are deterministic: the puzzle for a
//! date depends only on the corpus, the date and the configured generator.
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies outside [`crate::core::date::SystemClock`]
//! - All randomness from a seeded [`crate::core::rng::DeterministicRandom`]
//!
//! Any implementation of the sine generator over the same corpus produces
//! **identical puzzles**, so clients and servers agree on the day's tiles.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;
pub mod puzzle;

// Re-export commonly used types
pub use config::{ConfigError, ServerConfig};
pub use crate::core::date::{Clock, PuzzleDate, SystemClock};
pub use crate::core::rng::{DeterministicRandom, RandomAlgorithm};
pub use game::service::GameService;
pub use network::server::GameServer;
pub use puzzle::builder::{DailyPuzzle, PuzzleBuilder};
pub use puzzle::corpus::QuoteCorpus;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
