use std::time::Duration;

use escape_engine::{MinigameInput, SurfaceTint};
use rand::seq::SliceRandom;
use rand::Rng;

use super::session::{SessionContext, Waited};
use crate::app::{HIDDEN_CARD_LABEL, MATCHED_CARD_LABEL};

pub(super) const NAME: &str = "Memory Game";
pub(super) const DESCRIPTION: &str = "Find all matching pairs of cards!";

const GRID_SIDE: usize = 4;
const SYMBOLS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];
const MISMATCH_PAUSE: Duration = Duration::from_secs(1);
const FINISH_PAUSE: Duration = Duration::from_millis(1500);
const INPUT_WAIT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardState {
    Hidden,
    Revealed,
    Matched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Card {
    symbol: char,
    state: CardState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FlipOutcome {
    Ignored,
    FirstRevealed,
    Matched,
    Mismatched,
    Completed,
}

/// A square board of face-down pairs with a cursor.
#[derive(Debug, Clone)]
pub(super) struct MemoryBoard {
    cards: Vec<Card>,
    cursor: usize,
    first_pick: Option<usize>,
    mismatch: Option<(usize, usize)>,
    moves: u32,
}

impl MemoryBoard {
    pub(super) fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut symbols: Vec<char> = SYMBOLS.iter().chain(SYMBOLS.iter()).copied().collect();
        symbols.shuffle(rng);
        Self::with_symbols(symbols)
    }

    pub(super) fn with_symbols(symbols: Vec<char>) -> Self {
        Self {
            cards: symbols
                .into_iter()
                .map(|symbol| Card {
                    symbol,
                    state: CardState::Hidden,
                })
                .collect(),
            cursor: 0,
            first_pick: None,
            mismatch: None,
            moves: 0,
        }
    }

    pub(super) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(super) fn moves(&self) -> u32 {
        self.moves
    }

    pub(super) fn matched_pairs(&self) -> usize {
        self.cards
            .iter()
            .filter(|card| card.state == CardState::Matched)
            .count()
            / 2
    }

    pub(super) fn pair_count(&self) -> usize {
        self.cards.len() / 2
    }

    pub(super) fn is_complete(&self) -> bool {
        self.cards.iter().all(|card| card.state == CardState::Matched)
    }

    /// Moves the cursor one cell on the grid, stopping at the edges.
    pub(super) fn move_cursor(&mut self, input: MinigameInput) {
        let row = self.cursor / GRID_SIDE;
        let column = self.cursor % GRID_SIDE;
        let (row, column) = match input {
            MinigameInput::Up => (row.saturating_sub(1), column),
            MinigameInput::Down => ((row + 1).min(GRID_SIDE - 1), column),
            MinigameInput::Left => (row, column.saturating_sub(1)),
            MinigameInput::Right => (row, (column + 1).min(GRID_SIDE - 1)),
            MinigameInput::Confirm => (row, column),
        };
        let target = row * GRID_SIDE + column;
        if target < self.cards.len() {
            self.cursor = target;
        }
    }

    /// Turns over the card under the cursor. Flips are ignored while a
    /// mismatched pair is still showing.
    pub(super) fn flip(&mut self) -> FlipOutcome {
        if self.mismatch.is_some() {
            return FlipOutcome::Ignored;
        }
        let index = self.cursor;
        match self.cards.get(index) {
            Some(card) if card.state == CardState::Hidden => {}
            _ => return FlipOutcome::Ignored,
        }
        self.cards[index].state = CardState::Revealed;

        let Some(first) = self.first_pick.take() else {
            self.first_pick = Some(index);
            return FlipOutcome::FirstRevealed;
        };
        self.moves += 1;
        if self.cards[first].symbol == self.cards[index].symbol {
            self.cards[first].state = CardState::Matched;
            self.cards[index].state = CardState::Matched;
            if self.is_complete() {
                FlipOutcome::Completed
            } else {
                FlipOutcome::Matched
            }
        } else {
            self.mismatch = Some((first, index));
            FlipOutcome::Mismatched
        }
    }

    pub(super) fn hide_mismatch(&mut self) {
        if let Some((first, second)) = self.mismatch.take() {
            self.cards[first].state = CardState::Hidden;
            self.cards[second].state = CardState::Hidden;
        }
    }

    pub(super) fn labels(&self) -> Vec<String> {
        self.cards
            .iter()
            .map(|card| match card.state {
                CardState::Hidden => HIDDEN_CARD_LABEL.to_string(),
                CardState::Revealed => card.symbol.to_string(),
                CardState::Matched => MATCHED_CARD_LABEL.to_string(),
            })
            .collect()
    }
}

pub(super) fn run(context: &SessionContext) -> bool {
    let surface = context.surface();
    let mut board = MemoryBoard::shuffled(&mut rand::rng());
    surface.set_tint(SurfaceTint::Neutral);
    surface.set_prompt(format!("Find all {} pairs", board.pair_count()));
    surface.set_options(board.labels(), Some(board.cursor()));

    loop {
        let input = match context.wait_for_input(INPUT_WAIT) {
            Waited::Input(input) => input,
            Waited::Elapsed => continue,
            Waited::Aborted => return false,
        };
        if input != MinigameInput::Confirm {
            board.move_cursor(input);
            surface.set_selected(Some(board.cursor()));
            continue;
        }

        match board.flip() {
            FlipOutcome::Ignored | FlipOutcome::FirstRevealed => {}
            FlipOutcome::Matched => {
                surface.set_prompt(format!(
                    "Pairs found: {}/{}",
                    board.matched_pairs(),
                    board.pair_count()
                ));
            }
            FlipOutcome::Mismatched => {
                surface.set_options(board.labels(), Some(board.cursor()));
                surface.set_prompt("No match");
                if !context.pause(MISMATCH_PAUSE) {
                    return false;
                }
                board.hide_mismatch();
                surface.set_prompt(format!(
                    "Pairs found: {}/{}",
                    board.matched_pairs(),
                    board.pair_count()
                ));
            }
            FlipOutcome::Completed => {
                surface.set_options(board.labels(), None);
                surface.set_tint(SurfaceTint::Success);
                surface.set_prompt(format!("All pairs found in {} moves!", board.moves()));
                return context.pause(FINISH_PAUSE);
            }
        }
        surface.set_options(board.labels(), Some(board.cursor()));
    }
}
