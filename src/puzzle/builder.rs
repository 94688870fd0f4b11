//! Daily Puzzle Construction
//!
//! Builds exactly one [`DailyPuzzle`] per date from the quote corpus.
//!
//! ## Algorithm
//!
//! 1. `seed = YYYYMMDD` of the date.
//! 2. Quote A index drawn from a generator seeded with `seed`; quote B index
//!    drawn from a generator seeded with `seed + 100`, redrawn until it
//!    differs from A.
//! 3. Tile count drawn from the `seed` generator in `[5, max]` where
//!    `max = min(wc(A), wc(B), 10)`. The corpus only admits quotes of at
//!    least five words, so the range is never empty.
//! 4. A's words go to tile tops, B's to tile bottoms, left to right.
//! 5. Each tile is flipped (halves swapped) with a fixed probability, drawn
//!    from the `seed` generator. Canonical order is the identity.
//! 6. Presentation order is an independent shuffle seeded with `seed + 200`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::date::PuzzleDate;
use crate::core::hash::{PuzzleHash, PuzzleHasher};
use crate::core::rng::{CounterHashRng, DeterministicRandom, RandomAlgorithm, SineRng};
use crate::puzzle::corpus::{Quote, QuoteCorpus};
use crate::puzzle::text::{distribute_words, words};

/// Tile identifier: the tile's position before any shuffling.
pub type TileId = u32;

/// Upper bound on tiles per puzzle.
pub const MAX_TILES: usize = 10;

/// Lower bound on tiles per puzzle, when the shorter quote allows it.
pub const MIN_TILES: usize = 5;

/// Default probability that a tile's halves are swapped in the canonical solution.
pub const DEFAULT_FLIP_PROBABILITY: f64 = 0.5;

/// Seed offset for quote B's generator.
pub const QUOTE_B_SEED_OFFSET: i64 = 100;

/// Seed offset for the presentation shuffle.
pub const PRESENTATION_SEED_OFFSET: i64 = 200;

/// Attempts at drawing a distinct quote B before falling back to `A + 1`.
const MAX_REDRAWS: usize = 1000;

/// One tile: a word chunk from each quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    /// Stable identifier for the day.
    pub tile_id: TileId,
    /// Upper half, with trailing space.
    pub top: String,
    /// Lower half, with trailing space.
    pub bottom: String,
}

/// The puzzle for one date, including its solution.
///
/// Immutable once built; shared behind an `Arc` by the cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyPuzzle {
    /// Date this puzzle belongs to.
    pub date: PuzzleDate,
    /// First quote.
    pub quote_a: Quote,
    /// Second quote.
    pub quote_b: Quote,
    /// Cleaned text of quote A.
    pub cleaned_a: String,
    /// Cleaned text of quote B.
    pub cleaned_b: String,
    /// Tiles indexed by `TileId`.
    pub tiles: Vec<Tile>,
    /// Solution order.
    pub canonical_order: Vec<TileId>,
    /// Solution orientation: `true` means the tile's top carries quote B.
    pub canonical_flip: BTreeMap<TileId, bool>,
    /// Order in which tiles are shown to players.
    pub presentation_order: Vec<TileId>,
}

impl DailyPuzzle {
    /// Tile the two quotes into `flips.len()` tiles.
    ///
    /// Tile `i` has its halves swapped when `flips[i]` is true.
    /// `presentation_order` must be a permutation of the tile ids; it is not
    /// solution data.
    pub fn assemble(
        date: PuzzleDate,
        quote_a: Quote,
        quote_b: Quote,
        flips: &[bool],
        presentation_order: Vec<TileId>,
    ) -> Self {
        let cleaned_a = quote_a.cleaned();
        let cleaned_b = quote_b.cleaned();
        let tile_count = flips.len();

        let tops = distribute_words(&words(&cleaned_a), tile_count);
        let bottoms = distribute_words(&words(&cleaned_b), tile_count);

        let mut tiles = Vec::with_capacity(tile_count);
        let mut canonical_flip = BTreeMap::new();
        for (index, ((top, bottom), &flipped)) in
            tops.into_iter().zip(bottoms).zip(flips).enumerate()
        {
            let tile_id = index as TileId;
            let (top, bottom) = if flipped { (bottom, top) } else { (top, bottom) };
            tiles.push(Tile { tile_id, top, bottom });
            canonical_flip.insert(tile_id, flipped);
        }

        Self {
            date,
            quote_a,
            quote_b,
            cleaned_a,
            cleaned_b,
            canonical_order: (0..tile_count as TileId).collect(),
            tiles,
            canonical_flip,
            presentation_order,
        }
    }

    /// Number of tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Look up a tile.
    pub fn tile(&self, tile_id: TileId) -> Option<&Tile> {
        self.tiles.get(tile_id as usize)
    }

    /// Tiles in presentation order. Carries no solution data.
    ///
    /// Tile ids are reading positions; only the order of this list is
    /// shuffled, so a client that sorts by id sees the canonical order.
    pub fn public_tiles(&self) -> Vec<Tile> {
        self.presentation_order
            .iter()
            .filter_map(|id| self.tile(*id).cloned())
            .collect()
    }

    /// Read the tiles back per canonical order and flip.
    ///
    /// Returns `(quote A, quote B)` as trimmed strings; equal to the cleaned
    /// quotes for every well-formed puzzle.
    pub fn canonical_strings(&self) -> (String, String) {
        let mut a = String::new();
        let mut b = String::new();
        for tile_id in &self.canonical_order {
            let Some(tile) = self.tile(*tile_id) else {
                continue;
            };
            let flipped = self.canonical_flip.get(tile_id).copied().unwrap_or(false);
            if flipped {
                a.push_str(&tile.bottom);
                b.push_str(&tile.top);
            } else {
                a.push_str(&tile.top);
                b.push_str(&tile.bottom);
            }
        }
        (a.trim().to_string(), b.trim().to_string())
    }

    /// Deterministic fingerprint over date, tiles and solution.
    pub fn fingerprint(&self) -> PuzzleHash {
        let mut hasher = PuzzleHasher::for_puzzle();
        hasher.update_str(&self.date.to_string());
        hasher.update_u32(self.tiles.len() as u32);
        for tile in &self.tiles {
            hasher.update_u32(tile.tile_id);
            hasher.update_str(&tile.top);
            hasher.update_str(&tile.bottom);
        }
        for tile_id in &self.canonical_order {
            hasher.update_u32(*tile_id);
        }
        for (tile_id, flipped) in &self.canonical_flip {
            hasher.update_u32(*tile_id);
            hasher.update_bool(*flipped);
        }
        for tile_id in &self.presentation_order {
            hasher.update_u32(*tile_id);
        }
        hasher.finalize()
    }
}

/// Tunable puzzle shape.
#[derive(Clone, Debug, PartialEq)]
pub struct PuzzleRules {
    /// Upper bound on tiles.
    pub max_tiles: usize,
    /// Lower bound on tiles (when the shorter quote allows it).
    pub min_tiles: usize,
    /// Probability a tile is canonically flipped.
    pub flip_probability: f64,
}

impl Default for PuzzleRules {
    fn default() -> Self {
        Self {
            max_tiles: MAX_TILES,
            min_tiles: MIN_TILES,
            flip_probability: DEFAULT_FLIP_PROBABILITY,
        }
    }
}

/// Builds daily puzzles from a corpus.
#[derive(Clone, Debug)]
pub struct PuzzleBuilder {
    corpus: QuoteCorpus,
    rules: PuzzleRules,
    algorithm: RandomAlgorithm,
}

impl PuzzleBuilder {
    /// Create a builder with default rules.
    pub fn new(corpus: QuoteCorpus, algorithm: RandomAlgorithm) -> Self {
        Self {
            corpus,
            rules: PuzzleRules::default(),
            algorithm,
        }
    }

    /// Override the puzzle rules.
    pub fn with_rules(mut self, rules: PuzzleRules) -> Self {
        self.rules = rules;
        self
    }

    /// The corpus puzzles are drawn from.
    pub fn corpus(&self) -> &QuoteCorpus {
        &self.corpus
    }

    /// Build the puzzle for `date`.
    pub fn build(&self, date: PuzzleDate) -> DailyPuzzle {
        let puzzle = match self.algorithm {
            RandomAlgorithm::Sine => self.build_with::<SineRng>(date),
            RandomAlgorithm::Sha256Counter => self.build_with::<CounterHashRng>(date),
        };

        info!(
            date = %puzzle.date,
            tiles = puzzle.tile_count(),
            fingerprint = %hex::encode(&puzzle.fingerprint()[..8]),
            "Built daily puzzle"
        );
        puzzle
    }

    fn build_with<R: DeterministicRandom>(&self, date: PuzzleDate) -> DailyPuzzle {
        let seed = date.seed();
        let mut rng = R::from_seed(seed);
        let (index_a, index_b) = self.select_quotes(&mut rng, seed);

        // Both indices come from a corpus of at least two quotes
        let quote_a = self.corpus.quotes()[index_a].clone();
        let quote_b = self.corpus.quotes()[index_b].clone();

        let tile_count = self.draw_tile_count(&mut rng, &quote_a, &quote_b);
        let flips: Vec<bool> = (0..tile_count)
            .map(|_| rng.next_bool(self.rules.flip_probability))
            .collect();

        let mut presentation_rng = R::from_seed(seed.wrapping_add(PRESENTATION_SEED_OFFSET));
        let presentation_order = presentation_order(&mut presentation_rng, tile_count);

        DailyPuzzle::assemble(date, quote_a, quote_b, &flips, presentation_order)
    }

    /// Pick two distinct corpus indices.
    fn select_quotes<R: DeterministicRandom>(&self, rng_a: &mut R, seed: i64) -> (usize, usize) {
        let len = self.corpus.len();
        let index_a = rng_a.next_int(len);

        let mut rng_b = R::from_seed(seed.wrapping_add(QUOTE_B_SEED_OFFSET));
        let index_b = (0..MAX_REDRAWS)
            .map(|_| rng_b.next_int(len))
            .find(|&candidate| candidate != index_a)
            .unwrap_or((index_a + 1) % len);

        (index_a, index_b)
    }

    fn draw_tile_count<R: DeterministicRandom>(&self, rng: &mut R, a: &Quote, b: &Quote) -> usize {
        let wc_a = words(&a.cleaned()).len();
        let wc_b = words(&b.cleaned()).len();
        let max_tiles = wc_a.min(wc_b).min(self.rules.max_tiles);
        let min_tiles = max_tiles.min(self.rules.min_tiles);
        min_tiles + rng.next_int(max_tiles - min_tiles + 1)
    }
}

/// Shuffled tile ids, never the identity when more than one tile exists.
fn presentation_order<R: DeterministicRandom>(rng: &mut R, tile_count: usize) -> Vec<TileId> {
    let mut order: Vec<TileId> = (0..tile_count as TileId).collect();
    rng.shuffle(&mut order);
    if tile_count > 1 && order.iter().enumerate().all(|(i, id)| *id as usize == i) {
        order.rotate_left(1);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::puzzle::text::{clean_text, word_count};

    fn sample_corpus() -> QuoteCorpus {
        QuoteCorpus::from_quotes(vec![
            Quote::new("The cat sat on the mat.", "Alice"),
            Quote::new("A dog ran in the yard!", "Bob"),
            Quote::new(
                "Be yourself; everyone else is already taken.",
                "Oscar Wilde",
            ),
            Quote::new(
                "In the middle of difficulty lies opportunity, or so they say to anyone who listens.",
                "Albert Einstein",
            ),
            Quote::new("Simplicity is the ultimate sophistication", "Leonardo da Vinci"),
        ])
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> PuzzleDate {
        PuzzleDate::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn test_assemble_scenario_no_flips() {
        let puzzle = DailyPuzzle::assemble(
            date(2024, 1, 1),
            Quote::new("The cat sat on the mat", "Alice"),
            Quote::new("A dog ran in the yard", "Bob"),
            &[false; 6],
            vec![5, 4, 3, 2, 1, 0],
        );

        assert_eq!(puzzle.tile_count(), 6);
        assert_eq!(puzzle.tiles[0].top, "the ");
        assert_eq!(puzzle.tiles[0].bottom, "a ");
        assert_eq!(puzzle.tiles[5].top, "mat ");
        assert_eq!(puzzle.canonical_order, vec![0, 1, 2, 3, 4, 5]);
        assert!(puzzle.canonical_flip.values().all(|f| !f));

        let (a, b) = puzzle.canonical_strings();
        assert_eq!(a, "the cat sat on the mat");
        assert_eq!(b, "a dog ran in the yard");
    }

    #[test]
    fn test_assemble_flipped_tile_swaps_halves() {
        let puzzle = DailyPuzzle::assemble(
            date(2024, 1, 1),
            Quote::new("one two three four five", "A"),
            Quote::new("six seven eight nine ten", "B"),
            &[false, true, false, false, true],
            vec![0, 1, 2, 3, 4],
        );

        assert_eq!(puzzle.tiles[1].top, "seven ");
        assert_eq!(puzzle.tiles[1].bottom, "two ");
        assert!(puzzle.canonical_flip[&1]);

        let (a, b) = puzzle.canonical_strings();
        assert_eq!(a, "one two three four five");
        assert_eq!(b, "six seven eight nine ten");
    }

    #[test]
    fn test_public_tiles_follow_presentation_order() {
        let puzzle = DailyPuzzle::assemble(
            date(2024, 1, 1),
            Quote::new("The cat sat on the mat", "Alice"),
            Quote::new("A dog ran in the yard", "Bob"),
            &[false; 6],
            vec![2, 0, 1, 5, 4, 3],
        );
        let ids: Vec<TileId> = puzzle.public_tiles().iter().map(|t| t.tile_id).collect();
        assert_eq!(ids, vec![2, 0, 1, 5, 4, 3]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PuzzleBuilder::new(sample_corpus(), RandomAlgorithm::Sine);
        let d = date(2024, 6, 15);

        let first = builder.build(d);
        let second = builder.build(d);
        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_build_picks_distinct_quotes() {
        let builder = PuzzleBuilder::new(sample_corpus(), RandomAlgorithm::Sine);
        let mut d = date(2024, 1, 1);
        for _ in 0..60 {
            let puzzle = builder.build(d);
            assert_ne!(puzzle.quote_a, puzzle.quote_b);
            d = d.succ().unwrap();
        }
    }

    #[test]
    fn test_two_quote_corpus_terminates() {
        let corpus = QuoteCorpus::from_quotes(vec![
            Quote::new("alpha beta gamma delta epsilon", "A"),
            Quote::new("zeta eta theta iota kappa", "B"),
        ])
        .unwrap();
        let builder = PuzzleBuilder::new(corpus, RandomAlgorithm::Sha256Counter);
        let puzzle = builder.build(date(2030, 12, 31));
        assert_ne!(puzzle.quote_a, puzzle.quote_b);
        assert_eq!(puzzle.tile_count(), 5);
    }

    #[test]
    fn test_bundled_corpus_tile_bounds_for_a_year() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/quotes.json");
        let corpus = QuoteCorpus::load(path).unwrap();
        for algorithm in [RandomAlgorithm::Sine, RandomAlgorithm::Sha256Counter] {
            let builder = PuzzleBuilder::new(corpus.clone(), algorithm);
            let mut d = date(2025, 1, 1);
            for _ in 0..365 {
                let n = builder.build(d).tile_count();
                assert!((MIN_TILES..=MAX_TILES).contains(&n), "{d}: {n} tiles");
                d = d.succ().unwrap();
            }
        }
    }

    #[test]
    fn test_zero_flip_probability() {
        let builder = PuzzleBuilder::new(sample_corpus(), RandomAlgorithm::Sine).with_rules(
            PuzzleRules {
                flip_probability: 0.0,
                ..PuzzleRules::default()
            },
        );
        let puzzle = builder.build(date(2024, 2, 29));
        assert!(puzzle.canonical_flip.values().all(|f| !f));

        let tops: String = puzzle.tiles.iter().map(|t| t.top.as_str()).collect();
        assert_eq!(tops.trim(), puzzle.cleaned_a);
    }

    #[test]
    fn test_presentation_order_never_identity() {
        for seed in 0..200 {
            let mut rng = SineRng::from_seed(seed);
            let order = presentation_order(&mut rng, 5);
            assert_ne!(order, vec![0, 1, 2, 3, 4]);

            let mut sorted = order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
        }
    }

    fn quote_strategy() -> impl Strategy<Value = Quote> {
        (
            prop::collection::vec("[a-zA-Z]{1,8}[,.!?]?", 5..24),
            "[A-Z][a-z]{2,10}",
        )
            .prop_map(|(words, author)| Quote::new(words.join(" "), author))
    }

    fn date_strategy() -> impl Strategy<Value = PuzzleDate> {
        (2000i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| date(y, m, d))
    }

    proptest! {
        #[test]
        fn prop_build_deterministic_and_roundtrips(
            quotes in prop::collection::vec(quote_strategy(), 2..12),
            d in date_strategy(),
            sha in any::<bool>(),
        ) {
            let algorithm = if sha { RandomAlgorithm::Sha256Counter } else { RandomAlgorithm::Sine };
            let corpus = QuoteCorpus::from_quotes(quotes).unwrap();
            let builder = PuzzleBuilder::new(corpus, algorithm);

            let first = builder.build(d);
            let second = PuzzleBuilder::new(builder.corpus().clone(), algorithm).build(d);
            prop_assert_eq!(&first.tiles, &second.tiles);
            prop_assert_eq!(&first.canonical_order, &second.canonical_order);
            prop_assert_eq!(&first.canonical_flip, &second.canonical_flip);

            let (a, b) = first.canonical_strings();
            prop_assert_eq!(a, clean_text(&first.quote_a.text));
            prop_assert_eq!(b, clean_text(&first.quote_b.text));
        }

        #[test]
        fn prop_tile_count_bounds(
            quotes in prop::collection::vec(quote_strategy(), 2..12),
            d in date_strategy(),
        ) {
            let corpus = QuoteCorpus::from_quotes(quotes).unwrap();
            let puzzle = PuzzleBuilder::new(corpus, RandomAlgorithm::Sine).build(d);

            let shorter = word_count(&puzzle.cleaned_a).min(word_count(&puzzle.cleaned_b));
            let n = puzzle.tile_count();
            prop_assert!(n <= MAX_TILES);
            prop_assert!(n <= shorter);
            prop_assert!(n >= MIN_TILES);

            // Every id appears once in each ordering
            let mut order = puzzle.canonical_order.clone();
            order.sort_unstable();
            prop_assert_eq!(order, (0..n as TileId).collect::<Vec<_>>());
            let mut shown = puzzle.presentation_order.clone();
            shown.sort_unstable();
            prop_assert_eq!(shown, (0..n as TileId).collect::<Vec<_>>());
            prop_assert_eq!(puzzle.canonical_flip.len(), n);
        }
    }
}
