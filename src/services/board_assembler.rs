use rand::{
    Rng,
    seq::{IndexedRandom, IteratorRandom, SliceRandom},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    dao::corpus::ClueCorpus,
    state::board::{Board, Round},
};

/// Reasons a board cannot be assembled from the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// The corpus has fewer categories than two rounds need.
    #[error("corpus offers {available} categories, {required} are required")]
    NotEnoughCategories {
        /// Regular categories in the corpus.
        available: usize,
        /// Categories needed for both rounds.
        required: usize,
    },
    /// The corpus has no final-round clue.
    #[error("corpus has no final-round clue")]
    NoFinalClue,
}

/// Sample a fresh two-round board.
///
/// `2 * per_round` distinct categories are drawn without replacement; the first
/// half fills round one and the rest round two. Each category gets one clue per
/// value bucket. One final clue is reserved by id.
pub fn assemble_board<R>(
    corpus: &ClueCorpus,
    per_round: usize,
    rng: &mut R,
) -> Result<Board, BoardError>
where
    R: Rng + ?Sized,
{
    let required = per_round * 2;
    let available = corpus.categories().len();
    if available < required {
        return Err(BoardError::NotEnoughCategories {
            available,
            required,
        });
    }
    let final_clue = corpus.finals().choose(rng).ok_or(BoardError::NoFinalClue)?;

    let mut chosen = corpus.categories().iter().choose_multiple(rng, required);
    chosen.shuffle(rng);

    let mut board = Board::default();
    for (index, (category, buckets)) in chosen.into_iter().enumerate() {
        let round = if index < per_round {
            Round::Round1
        } else {
            Round::Round2
        };
        for (value, candidates) in buckets {
            let Some(clue) = candidates.choose(rng) else {
                continue;
            };
            if !board.insert(round, category, *value, clue) {
                warn!(clue_id = %clue.id, category = %category, "duplicate clue id skipped");
            }
        }
    }
    board.set_final_clue(final_clue);

    debug!(
        round1 = board.round_size(Round::Round1),
        round2 = board.round_size(Round::Round2),
        "board assembled"
    );
    Ok(board)
}
