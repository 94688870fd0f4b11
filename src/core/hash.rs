//! Puzzle Hashing
//!
//! Provides deterministic hashing for:
//! - Puzzle fingerprints (logged at build time, compared in determinism checks)
//! - Session tags (log-safe stand-ins for raw session identifiers)

use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type PuzzleHash = [u8; 32];

/// Deterministic hasher for puzzle content.
///
/// Wraps SHA-256 with length-prefixed helpers so adjacent strings can't
/// collide by shifting bytes between fields. Order of updates is critical.
pub struct PuzzleHasher {
    hasher: Sha256,
}

impl PuzzleHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a daily puzzle.
    pub fn for_puzzle() -> Self {
        Self::new(b"QUOTABLE_PUZZLE_V1")
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.hasher.update([value as u8]);
    }

    /// Update with a length-prefixed string.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> PuzzleHash {
        self.hasher.finalize().into()
    }
}

/// Short, stable, log-safe tag for a session identifier.
///
/// First 4 bytes of `SHA256("quotable-session:" || id)` as hex.
pub fn session_tag(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"quotable-session:");
    hasher.update(session_id.as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..4])
}
