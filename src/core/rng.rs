//! Deterministic Random Number Generators
//!
//! Every value that shapes a daily puzzle (quote selection, tile count,
//! canonical flips, presentation order) is drawn through the
//! [`DeterministicRandom`] trait, so the generator can be swapped without
//! touching callers.
//!
//! Two generators are provided:
//! - [`SineRng`]: `value_n = frac(sin(state_n) * 10000)`, `state_{n+1} = state_n + 1`.
//!   Trivially reproducible by any implementation, but predictable.
//! - [`CounterHashRng`]: SHA-256 over `(seed, counter)`. Same determinism
//!   guarantee, without the sine generator's short-range correlations.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Increment applied to the sine generator's state after every draw.
pub const SINE_STATE_INCREMENT: f64 = 1.0;

/// Multiplier applied to `sin(state)` before taking the fractional part.
pub const SINE_AMPLITUDE: f64 = 10_000.0;

/// Domain separator for the counter-based generator.
const COUNTER_HASH_DOMAIN: &[u8] = b"QUOTABLE_RNG_V1";

/// A seeded, reproducible source of values in `[0, 1)`.
///
/// Given the same seed, every implementation must yield the same sequence
/// on every platform.
pub trait DeterministicRandom {
    /// Create a generator from an integer seed.
    fn from_seed(seed: i64) -> Self
    where
        Self: Sized;

    /// Next value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Random integer in `[0, bound)`, computed as `floor(next() * bound)`.
    ///
    /// Returns 0 when `bound` is 0.
    fn next_int(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        let value = (self.next_f64() * bound as f64).floor() as usize;
        // Rounding at the very top of [0, 1) can land on `bound` itself
        value.min(bound - 1)
    }

    /// Random boolean that is `true` with the given probability.
    fn next_bool(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Shuffle a slice in place using Fisher-Yates.
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_int(i + 1);
            slice.swap(i, j);
        }
    }
}

/// Which generator drives puzzle construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomAlgorithm {
    /// [`SineRng`].
    #[default]
    Sine,
    /// [`CounterHashRng`].
    Sha256Counter,
}

impl RandomAlgorithm {
    /// Parse a configuration value (`sine` or `sha256`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sine" => Some(Self::Sine),
            "sha256" | "sha256_counter" => Some(Self::Sha256Counter),
            _ => None,
        }
    }
}

/// Sine-based generator.
///
/// # Example
///
/// ```
/// use quotable::core::rng::{DeterministicRandom, SineRng};
///
/// let mut rng = SineRng::from_seed(20240101);
/// let first = rng.next_f64();
/// assert!((0.0..1.0).contains(&first));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SineRng {
    state: f64,
}

impl SineRng {
    /// Current state (the argument of the next `sin`).
    pub fn state(&self) -> f64 {
        self.state
    }
}

impl DeterministicRandom for SineRng {
    fn from_seed(seed: i64) -> Self {
        Self { state: seed as f64 }
    }

    #[inline]
    fn next_f64(&mut self) -> f64 {
        let x = self.state.sin() * SINE_AMPLITUDE;
        self.state += SINE_STATE_INCREMENT;
        x - x.floor()
    }
}

/// Counter-mode SHA-256 generator.
///
/// `value_n` is the top 53 bits of `SHA256(domain || seed || n)` scaled
/// into `[0, 1)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterHashRng {
    seed: i64,
    counter: u64,
}

impl DeterministicRandom for CounterHashRng {
    fn from_seed(seed: i64) -> Self {
        Self { seed, counter: 0 }
    }

    fn next_f64(&mut self) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(COUNTER_HASH_DOMAIN);
        hasher.update(self.seed.to_le_bytes());
        hasher.update(self.counter.to_le_bytes());
        let hash = hasher.finalize();
        self.counter = self.counter.wrapping_add(1);

        let mut word = [0u8; 8];
        word.copy_from_slice(&hash[..8]);
        let bits = u64::from_le_bytes(word) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }
}

// =============================================================================
// TESTS
// =============================================================================
