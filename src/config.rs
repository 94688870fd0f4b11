//! Server Configuration
//!
//! Everything the binary needs to start, read from `QUOTABLE_*` environment
//! variables with defaults for local play.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::date::SystemClock;
use crate::core::rng::RandomAlgorithm;
use crate::puzzle::builder::{PuzzleRules, DEFAULT_FLIP_PROBABILITY};
use crate::puzzle::corpus::{CorpusError, QuoteCorpus};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default corpus location, relative to the working directory.
pub const DEFAULT_CORPUS_PATH: &str = "data/quotes.json";

/// Default period of the rollover task.
pub const DEFAULT_ROLLOVER_CHECK: Duration = Duration::from_secs(60);

/// Configuration errors. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// What was wrong.
        reason: &'static str,
    },

    /// The quote corpus could not be loaded.
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Quote corpus file.
    pub corpus_path: PathBuf,
    /// Offset from UTC, in minutes, that decides the current date.
    pub utc_offset_minutes: i32,
    /// Generator used to build puzzles.
    pub random_algorithm: RandomAlgorithm,
    /// Probability a tile is canonically flipped.
    pub flip_probability: f64,
    /// How often the rollover task checks the date.
    pub rollover_check: Duration,
    /// Allow any origin, method and header.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            corpus_path: PathBuf::from(DEFAULT_CORPUS_PATH),
            utc_offset_minutes: 0,
            random_algorithm: RandomAlgorithm::default(),
            flip_probability: DEFAULT_FLIP_PROBABILITY,
            rollover_check: DEFAULT_ROLLOVER_CHECK,
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "QUOTABLE_BIND_ADDR", "expected host:port")? {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("QUOTABLE_CORPUS_PATH") {
            config.corpus_path = PathBuf::from(path);
        }
        if let Some(offset) =
            parse_var(&lookup, "QUOTABLE_UTC_OFFSET_MINUTES", "expected minutes")?
        {
            config.utc_offset_minutes = offset;
        }
        if let Some(raw) = lookup("QUOTABLE_RNG") {
            config.random_algorithm =
                RandomAlgorithm::parse(&raw).ok_or(ConfigError::InvalidValue {
                    var: "QUOTABLE_RNG",
                    value: raw,
                    reason: "expected sine or sha256",
                })?;
        }
        if let Some(p) = parse_var(&lookup, "QUOTABLE_FLIP_PROBABILITY", "expected a number")? {
            config.flip_probability = p;
        }
        if let Some(secs) =
            parse_var::<u64, _>(&lookup, "QUOTABLE_ROLLOVER_CHECK_SECS", "expected seconds")?
        {
            config.rollover_check = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("QUOTABLE_CORS_PERMISSIVE") {
            config.cors_permissive = match raw.trim() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "QUOTABLE_CORS_PERMISSIVE",
                        value: raw,
                        reason: "expected true or false",
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if SystemClock::with_offset_minutes(self.utc_offset_minutes).is_none() {
            return Err(ConfigError::InvalidValue {
                var: "QUOTABLE_UTC_OFFSET_MINUTES",
                value: self.utc_offset_minutes.to_string(),
                reason: "must be within one day of UTC",
            });
        }
        if !(0.0..=1.0).contains(&self.flip_probability) {
            return Err(ConfigError::InvalidValue {
                var: "QUOTABLE_FLIP_PROBABILITY",
                value: self.flip_probability.to_string(),
                reason: "must be between 0 and 1",
            });
        }
        if self.rollover_check.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: "QUOTABLE_ROLLOVER_CHECK_SECS",
                value: "0".to_string(),
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// Clock for the configured offset.
    pub fn clock(&self) -> Result<SystemClock, ConfigError> {
        SystemClock::with_offset_minutes(self.utc_offset_minutes).ok_or(ConfigError::InvalidValue {
            var: "QUOTABLE_UTC_OFFSET_MINUTES",
            value: self.utc_offset_minutes.to_string(),
            reason: "must be within one day of UTC",
        })
    }

    /// Puzzle shape for the configured flip probability.
    pub fn puzzle_rules(&self) -> PuzzleRules {
        PuzzleRules {
            flip_probability: self.flip_probability,
            ..PuzzleRules::default()
        }
    }

    /// Load the quote corpus.
    pub fn load_corpus(&self) -> Result<QuoteCorpus, ConfigError> {
        Ok(QuoteCorpus::load(&self.corpus_path)?)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str, reason: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let parsed = raw.trim().parse::<T>();
    match parsed {
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(ConfigError::InvalidValue { var, value: raw, reason }),
    }
}
