use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::corpus::CorpusClue;

/// Rounds of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Round {
    /// First round, face values.
    Round1,
    /// Second round, doubled values.
    Round2,
    /// Reserved final round.
    Final,
}

impl Round {
    /// Multiplier applied to a clue's face value in this round.
    pub fn value_multiplier(self) -> i32 {
        match self {
            Round::Round2 => 2,
            Round::Round1 | Round::Final => 1,
        }
    }
}

/// Client-visible cell of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardClue {
    /// Clue identifier.
    pub id: String,
    /// Face value.
    pub value: u32,
    /// Whether the clue was already shown.
    pub answered: bool,
}

/// Position of a clue's client-visible counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSlot {
    /// Round whose grid holds the clue.
    pub round: Round,
    /// Index of the category within that round.
    pub category: usize,
    /// Index within the category column.
    pub position: usize,
}

/// Authoritative record of a clue placed on a session's board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClueRecord {
    /// Clue identifier.
    pub id: String,
    /// Category name.
    pub category: String,
    /// Face value.
    pub value: u32,
    /// Clue text.
    pub question: String,
    /// Expected response.
    pub answer: String,
    /// Whether the clue was already shown.
    pub answered: bool,
    /// Where the client-visible counterpart lives.
    pub slot: BoardSlot,
}

/// Category grid for one round, in display order.
pub type RoundGrid = IndexMap<String, Vec<BoardClue>>;

/// Both rounds of a session's board plus the lookup of authoritative clue records.
///
/// Records and grid cells are only ever flipped to answered together through
/// [`Board::mark_answered`].
#[derive(Debug, Clone, Default)]
pub struct Board {
    round1: RoundGrid,
    round2: RoundGrid,
    clues: HashMap<String, ClueRecord>,
    final_clue_id: Option<String>,
    round1_size: usize,
    round2_size: usize,
}

impl Board {
    /// Place a corpus clue on the grid of `round` under `category`.
    ///
    /// Returns `false` when a clue with the same id is already on the board.
    pub fn insert(&mut self, round: Round, category: &str, value: u32, clue: &CorpusClue) -> bool {
        if self.clues.contains_key(&clue.id) {
            return false;
        }
        let (grid, size) = match round {
            Round::Round1 => (&mut self.round1, &mut self.round1_size),
            Round::Round2 => (&mut self.round2, &mut self.round2_size),
            Round::Final => return false,
        };
        let entry = grid.entry(category.to_string());
        let category_index = entry.index();
        let column = entry.or_default();
        column.push(BoardClue {
            id: clue.id.clone(),
            value,
            answered: false,
        });
        *size += 1;

        self.clues.insert(
            clue.id.clone(),
            ClueRecord {
                id: clue.id.clone(),
                category: category.to_string(),
                value,
                question: clue.question.clone(),
                answer: clue.answer.clone(),
                answered: false,
                slot: BoardSlot {
                    round,
                    category: category_index,
                    position: column.len() - 1,
                },
            },
        );
        true
    }

    /// Reserve the final-round clue. It is kept by id only and never shown on the grid.
    pub fn set_final_clue(&mut self, clue: &CorpusClue) {
        self.final_clue_id = Some(clue.id.clone());
    }

    /// Identifier of the reserved final-round clue.
    pub fn final_clue_id(&self) -> Option<&str> {
        self.final_clue_id.as_deref()
    }

    /// Grid shown to clients for `round`.
    pub fn grid(&self, round: Round) -> RoundGrid {
        match round {
            Round::Round1 => self.round1.clone(),
            Round::Round2 => self.round2.clone(),
            Round::Final => RoundGrid::new(),
        }
    }

    /// Number of clues on the grid of `round`.
    pub fn round_size(&self, round: Round) -> usize {
        match round {
            Round::Round1 => self.round1_size,
            Round::Round2 => self.round2_size,
            Round::Final => 0,
        }
    }

    /// Look up the authoritative record of a clue.
    pub fn clue(&self, id: &str) -> Option<&ClueRecord> {
        self.clues.get(id)
    }

    /// Mark a clue answered in both its record and its grid cell.
    pub fn mark_answered(&mut self, id: &str) -> Option<&ClueRecord> {
        let record = self.clues.get_mut(id)?;
        record.answered = true;
        let slot = record.slot;
        let grid = match slot.round {
            Round::Round1 => &mut self.round1,
            Round::Round2 => &mut self.round2,
            Round::Final => return Some(record),
        };
        if let Some(cell) = grid
            .get_index_mut(slot.category)
            .and_then(|(_, column)| column.get_mut(slot.position))
        {
            cell.answered = true;
        }
        Some(record)
    }

    /// Whether the grid cell of `id` agrees with its record.
    pub fn is_consistent(&self, id: &str) -> bool {
        let Some(record) = self.clues.get(id) else {
            return false;
        };
        let grid = match record.slot.round {
            Round::Round1 => &self.round1,
            Round::Round2 => &self.round2,
            Round::Final => return false,
        };
        grid.get_index(record.slot.category)
            .and_then(|(_, column)| column.get(record.slot.position))
            .is_some_and(|cell| cell.id == record.id && cell.answered == record.answered)
    }

    /// Unanswered clue ids of `round`, in grid order.
    pub fn open_clues(&self, round: Round) -> Vec<String> {
        let grid = match round {
            Round::Round1 => &self.round1,
            Round::Round2 => &self.round2,
            Round::Final => return Vec::new(),
        };
        grid.values()
            .flatten()
            .filter(|cell| !cell.answered)
            .map(|cell| cell.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clue(id: &str) -> CorpusClue {
        CorpusClue {
            id: id.into(),
            category: "RIVERS".into(),
            question: "Flows through Cairo".into(),
            answer: "the Nile".into(),
            value: Some(200),
        }
    }

    #[test]
    fn marking_updates_record_and_grid_cell() {
        let mut board = Board::default();
        assert!(board.insert(Round::Round1, "RIVERS", 200, &clue("a")));
        assert!(board.insert(Round::Round1, "RIVERS", 400, &clue("b")));
        assert!(board.insert(Round::Round2, "LAKES", 200, &clue("c")));

        assert!(board.is_consistent("b"));
        board.mark_answered("b").unwrap();
        assert!(board.clue("b").unwrap().answered);
        assert!(board.grid(Round::Round1)["RIVERS"][1].answered);
        assert!(board.is_consistent("b"));
        assert_eq!(board.open_clues(Round::Round1), vec!["a".to_string()]);
        assert_eq!(board.round_size(Round::Round1), 2);
        assert_eq!(board.round_size(Round::Round2), 1);
    }

    #[test]
    fn duplicate_ids_are_not_placed_twice() {
        let mut board = Board::default();
        assert!(board.insert(Round::Round1, "RIVERS", 200, &clue("a")));
        assert!(!board.insert(Round::Round2, "LAKES", 200, &clue("a")));
        assert_eq!(board.round_size(Round::Round2), 0);
    }

    #[test]
    fn unknown_clue_cannot_be_marked() {
        let mut board = Board::default();
        assert!(board.mark_answered("missing").is_none());
    }
}
