//! Quote Corpus
//!
//! Read-only collection of quotes, loaded once at startup.
//!
//! The on-disk format is a JSON array of records:
//!
//! ```json
//! [{ "quoteText": "The cat sat on the mat.", "quoteAuthor": "Anon" }]
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::builder::MIN_TILES;
use super::text::{clean_text, word_count};

/// Author used when a record has none.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Smallest corpus that can produce a puzzle (two distinct quotes).
pub const MIN_CORPUS_SIZE: usize = 2;

/// Fewest cleaned words a quote needs to fill the minimum number of tiles.
pub const MIN_QUOTE_WORDS: usize = MIN_TILES;

/// A quote and its author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Original quote text, punctuation and case intact.
    pub text: String,
    /// Attribution.
    pub author: String,
}

impl Quote {
    /// Create a quote.
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
        }
    }

    /// Cleaned text used for tiling and comparison.
    pub fn cleaned(&self) -> String {
        clean_text(&self.text)
    }
}

/// Record layout of the corpus file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRecord {
    quote_text: String,
    #[serde(default)]
    quote_author: Option<String>,
}

impl From<QuoteRecord> for Quote {
    fn from(record: QuoteRecord) -> Self {
        let author = record
            .quote_author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        Quote::new(record.quote_text, author)
    }
}

/// Corpus loading errors.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Corpus file could not be read.
    #[error("failed to read corpus {path}: {source}")]
    Io {
        /// File that was being read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Corpus file is not a valid quote array.
    #[error("failed to parse corpus: {0}")]
    Parse(#[from] serde_json::Error),

    /// Not enough usable quotes.
    #[error("corpus has {found} usable quotes, need at least {}", MIN_CORPUS_SIZE)]
    TooSmall {
        /// Number of usable quotes found.
        found: usize,
    },
}

/// Immutable, cheaply clonable quote collection.
#[derive(Clone, Debug)]
pub struct QuoteCorpus {
    quotes: Arc<[Quote]>,
}

impl QuoteCorpus {
    /// Build a corpus from quotes.
    ///
    /// Quotes with fewer than [`MIN_QUOTE_WORDS`] cleaned words cannot fill
    /// a puzzle and are skipped. Fails if fewer than [`MIN_CORPUS_SIZE`]
    /// remain.
    pub fn from_quotes(quotes: Vec<Quote>) -> Result<Self, CorpusError> {
        let total = quotes.len();
        let usable: Vec<Quote> = quotes
            .into_iter()
            .filter(|q| word_count(&q.cleaned()) >= MIN_QUOTE_WORDS)
            .collect();

        if usable.len() < total {
            warn!(
                skipped = total - usable.len(),
                min_words = MIN_QUOTE_WORDS,
                "skipped quotes too short to tile"
            );
        }
        if usable.len() < MIN_CORPUS_SIZE {
            return Err(CorpusError::TooSmall {
                found: usable.len(),
            });
        }

        Ok(Self {
            quotes: usable.into(),
        })
    }

    /// Parse a corpus from JSON.
    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let records: Vec<QuoteRecord> = serde_json::from_str(json)?;
        Self::from_quotes(records.into_iter().map(Quote::from).collect())
    }

    /// Load a corpus file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let corpus = Self::from_json(&json)?;
        info!(path = %path.display(), quotes = corpus.len(), "Loaded quote corpus");
        Ok(corpus)
    }

    /// Number of quotes.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Always false for a constructed corpus.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Quote at `index`.
    pub fn get(&self, index: usize) -> Option<&Quote> {
        self.quotes.get(index)
    }

    /// All quotes in file order.
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }
}
