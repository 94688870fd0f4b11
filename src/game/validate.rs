//! Guess Validation
//!
//! Judges a submitted arrangement against the day's puzzle and applies the
//! result to the player's session.
//!
//! A submission lists every tile exactly once, in order, each with a flip
//! flag. Reading the tiles in that order yields two strings; the guess is
//! correct when they are the two cleaned quotes, in either row.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::session::{GuessOutcome, GuessTransition, Session, SessionId, SessionStore};
use crate::puzzle::builder::{DailyPuzzle, TileId};

/// One entry of a submitted arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileChoice {
    /// Tile being placed.
    pub tile_id: TileId,
    /// Whether the player turned the tile over.
    #[serde(default)]
    pub is_flipped: bool,
}

impl TileChoice {
    /// Create a choice.
    pub const fn new(tile_id: TileId, is_flipped: bool) -> Self {
        Self { tile_id, is_flipped }
    }
}

/// Which quote a guess placed in the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteOrientation {
    /// Quote A on top, quote B below.
    AOnTop,
    /// Quote B on top, quote A below.
    BOnTop,
}

/// Judgement of one arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Whether both quotes were reproduced.
    pub correct: bool,
    /// Row assignment, when correct.
    pub orientation: Option<QuoteOrientation>,
}

impl Verdict {
    /// A correct verdict.
    pub const fn correct(orientation: QuoteOrientation) -> Self {
        Self {
            correct: true,
            orientation: Some(orientation),
        }
    }

    /// An incorrect verdict.
    pub const fn incorrect() -> Self {
        Self {
            correct: false,
            orientation: None,
        }
    }
}

/// Malformed submissions. Never mutate a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuessError {
    /// Submission does not cover every tile.
    #[error("expected {expected} tiles, got {got}")]
    WrongLength {
        /// Tiles in the puzzle.
        expected: usize,
        /// Entries submitted.
        got: usize,
    },
    /// Submission names a tile that does not exist.
    #[error("unknown tile id {0}")]
    UnknownTile(TileId),
    /// Submission names a tile more than once.
    #[error("duplicate tile id {0}")]
    DuplicateTile(TileId),
}

/// Both quotes with their authors appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedQuotes {
    /// Top row, `"<cleaned quote> - <author>"`.
    pub top: String,
    /// Bottom row, `"<cleaned quote> - <author>"`.
    pub bottom: String,
}

impl CompletedQuotes {
    /// Author-annotated quotes in the given row order.
    pub fn for_puzzle(puzzle: &DailyPuzzle, orientation: QuoteOrientation) -> Self {
        let a = format!("{} - {}", puzzle.cleaned_a, puzzle.quote_a.author);
        let b = format!("{} - {}", puzzle.cleaned_b, puzzle.quote_b.author);
        match orientation {
            QuoteOrientation::AOnTop => Self { top: a, bottom: b },
            QuoteOrientation::BOnTop => Self { top: b, bottom: a },
        }
    }

    /// Quotes to reveal for a session, or `None` while it is still open.
    ///
    /// Solved sessions keep the rows they solved with; exhausted sessions
    /// get the canonical order.
    pub fn reveal(puzzle: &DailyPuzzle, session: &Session) -> Option<Self> {
        if !session.is_terminal() {
            return None;
        }
        let orientation = session
            .solved_orientation
            .filter(|_| session.is_solved())
            .unwrap_or(QuoteOrientation::AOnTop);
        Some(Self::for_puzzle(puzzle, orientation))
    }
}

/// Check a submission's shape against the puzzle.
fn check_shape(puzzle: &DailyPuzzle, choices: &[TileChoice]) -> Result<(), GuessError> {
    if choices.len() != puzzle.tile_count() {
        return Err(GuessError::WrongLength {
            expected: puzzle.tile_count(),
            got: choices.len(),
        });
    }

    let mut seen = BTreeSet::new();
    for choice in choices {
        if puzzle.tile(choice.tile_id).is_none() {
            return Err(GuessError::UnknownTile(choice.tile_id));
        }
        if !seen.insert(choice.tile_id) {
            return Err(GuessError::DuplicateTile(choice.tile_id));
        }
    }
    Ok(())
}

/// Judge an arrangement without touching any session.
pub fn judge(puzzle: &DailyPuzzle, choices: &[TileChoice]) -> Result<Verdict, GuessError> {
    check_shape(puzzle, choices)?;

    let mut top = String::new();
    let mut bottom = String::new();
    for choice in choices {
        // Shape check guarantees the tile exists
        let Some(tile) = puzzle.tile(choice.tile_id) else {
            return Err(GuessError::UnknownTile(choice.tile_id));
        };
        if choice.is_flipped {
            top.push_str(&tile.bottom);
            bottom.push_str(&tile.top);
        } else {
            top.push_str(&tile.top);
            bottom.push_str(&tile.bottom);
        }
    }

    let (top, bottom) = (top.trim(), bottom.trim());
    let (a, b) = (puzzle.cleaned_a.as_str(), puzzle.cleaned_b.as_str());

    let verdict = if top == a && bottom == b {
        Verdict::correct(QuoteOrientation::AOnTop)
    } else if top == b && bottom == a {
        Verdict::correct(QuoteOrientation::BOnTop)
    } else {
        Verdict::incorrect()
    };
    Ok(verdict)
}

/// Outcome of a validation request.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Result of the counted guess (the stored one, for replays).
    pub result: bool,
    /// Guesses used.
    pub guess_number: u8,
    /// Revealed quotes, once the session is terminal.
    pub completed: Option<CompletedQuotes>,
    /// Session state after the call.
    pub outcome: GuessOutcome,
}

impl ValidationReport {
    /// Whether this call moved the session into a terminal state.
    pub fn just_resolved(&self) -> bool {
        self.outcome.transition == GuessTransition::Resolved
    }
}

/// Judge a submission and count it against the session.
///
/// Malformed submissions are rejected before the session is touched.
pub async fn validate_guess(
    store: &SessionStore,
    puzzle: &DailyPuzzle,
    session_id: &SessionId,
    choices: &[TileChoice],
) -> Result<ValidationReport, GuessError> {
    let verdict = judge(puzzle, choices)?;
    let outcome = store.apply_guess(session_id, puzzle.date, &verdict).await;

    let session = &outcome.session;
    Ok(ValidationReport {
        result: session.last_guess_result.unwrap_or(false),
        guess_number: session.guess_count,
        completed: CompletedQuotes::reveal(puzzle, session),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use crate::core::date::PuzzleDate;
    use crate::game::session::{SessionState, MAX_GUESSES};
    use crate::puzzle::corpus::Quote;

    fn scenario_puzzle(flips: &[bool]) -> DailyPuzzle {
        DailyPuzzle::assemble(
            PuzzleDate::from_ymd(2024, 1, 1).unwrap(),
            Quote::new("The cat sat on the mat", "Alice"),
            Quote::new("A dog ran in the yard", "Bob"),
            flips,
            (0..flips.len() as TileId).rev().collect(),
        )
    }

    fn canonical(puzzle: &DailyPuzzle) -> Vec<TileChoice> {
        puzzle
            .canonical_order
            .iter()
            .map(|id| TileChoice::new(*id, puzzle.canonical_flip[id]))
            .collect()
    }

    fn sid(s: &str) -> SessionId {
        SessionId::parse(s).unwrap()
    }

    #[test]
    fn test_canonical_arrangement_is_correct() {
        let puzzle = scenario_puzzle(&[false; 6]);
        let verdict = judge(&puzzle, &canonical(&puzzle)).unwrap();
        assert_eq!(verdict, Verdict::correct(QuoteOrientation::AOnTop));
    }

    #[test]
    fn test_all_flipped_is_correct_with_rows_swapped() {
        let puzzle = scenario_puzzle(&[false; 6]);
        let choices: Vec<TileChoice> = canonical(&puzzle)
            .into_iter()
            .map(|c| TileChoice::new(c.tile_id, !c.is_flipped))
            .collect();

        let verdict = judge(&puzzle, &choices).unwrap();
        assert_eq!(verdict, Verdict::correct(QuoteOrientation::BOnTop));

        let done = CompletedQuotes::for_puzzle(&puzzle, QuoteOrientation::BOnTop);
        assert_eq!(done.top, "a dog ran in the yard - Bob");
        assert_eq!(done.bottom, "the cat sat on the mat - Alice");
    }

    #[test]
    fn test_canonical_flips_respected() {
        let puzzle = scenario_puzzle(&[true, false, true, true, false, false]);
        assert!(judge(&puzzle, &canonical(&puzzle)).unwrap().correct);

        // Ignoring the canonical flips mixes the quotes
        let unflipped: Vec<TileChoice> =
            (0..6).map(|id| TileChoice::new(id, false)).collect();
        assert!(!judge(&puzzle, &unflipped).unwrap().correct);
    }

    #[test]
    fn test_wrong_order_is_incorrect() {
        let puzzle = scenario_puzzle(&[false; 6]);
        let mut choices = canonical(&puzzle);
        choices.swap(0, 1);
        assert_eq!(judge(&puzzle, &choices).unwrap(), Verdict::incorrect());
    }

    #[test]
    fn test_malformed_submissions() {
        let puzzle = scenario_puzzle(&[false; 6]);
        let mut choices = canonical(&puzzle);

        let short = &choices[..5];
        assert_eq!(
            judge(&puzzle, short),
            Err(GuessError::WrongLength { expected: 6, got: 5 })
        );

        choices[5] = TileChoice::new(0, false);
        assert_eq!(judge(&puzzle, &choices), Err(GuessError::DuplicateTile(0)));

        choices[5] = TileChoice::new(99, false);
        assert_eq!(judge(&puzzle, &choices), Err(GuessError::UnknownTile(99)));
    }

    #[tokio::test]
    async fn test_validate_scenario_reveals_on_solve() {
        let store = SessionStore::new();
        let puzzle = scenario_puzzle(&[false; 6]);

        let report = validate_guess(&store, &puzzle, &sid("p1"), &canonical(&puzzle))
            .await
            .unwrap();

        assert!(report.result);
        assert_eq!(report.guess_number, 1);
        assert!(report.just_resolved());
        let done = report.completed.unwrap();
        assert_eq!(done.top, "the cat sat on the mat - Alice");
        assert_eq!(done.bottom, "a dog ran in the yard - Bob");
    }

    #[tokio::test]
    async fn test_malformed_leaves_session_untouched() {
        let store = SessionStore::new();
        let puzzle = scenario_puzzle(&[false; 6]);
        let id = sid("p2");
        store.get(&id, puzzle.date).await;

        let choices = canonical(&puzzle);
        let result = validate_guess(&store, &puzzle, &id, &choices[1..]).await;
        assert!(matches!(result, Err(GuessError::WrongLength { .. })));

        let session = store.get(&id, puzzle.date).await.session;
        assert_eq!(session.guess_count, 0);
        assert_eq!(session.state, SessionState::NotStarted);
    }

    #[tokio::test]
    async fn test_three_wrong_guesses_reveal_canonical() {
        let store = SessionStore::new();
        let puzzle = scenario_puzzle(&[false; 6]);
        let id = sid("p3");
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        let mut last = None;
        for expected in 1..=MAX_GUESSES {
            let mut choices = canonical(&puzzle);
            // Any arrangement that starts elsewhere than "the"/"a" is wrong
            while choices[0].tile_id == 0 {
                choices.shuffle(&mut rng);
            }
            let report = validate_guess(&store, &puzzle, &id, &choices).await.unwrap();
            assert!(!report.result);
            assert_eq!(report.guess_number, expected);
            if expected < MAX_GUESSES {
                assert!(report.completed.is_none());
            }
            last = Some(report);
        }

        let last = last.unwrap();
        assert!(last.just_resolved());
        let done = last.completed.unwrap();
        assert_eq!(done.top, "the cat sat on the mat - Alice");
        assert_eq!(done.bottom, "a dog ran in the yard - Bob");
    }

    #[tokio::test]
    async fn test_replay_after_terminal_is_idempotent() {
        let store = SessionStore::new();
        let puzzle = scenario_puzzle(&[false; 6]);
        let id = sid("p4");

        let mut wrong = canonical(&puzzle);
        wrong.swap(2, 3);
        validate_guess(&store, &puzzle, &id, &wrong).await.unwrap();
        let solved = validate_guess(&store, &puzzle, &id, &canonical(&puzzle))
            .await
            .unwrap();
        assert!(solved.result);
        assert_eq!(solved.guess_number, 2);

        // A later wrong guess replays the stored result
        let replay = validate_guess(&store, &puzzle, &id, &wrong).await.unwrap();
        assert!(replay.result);
        assert_eq!(replay.guess_number, 2);
        assert!(!replay.just_resolved());
        assert_eq!(replay.completed, solved.completed);
    }
}
