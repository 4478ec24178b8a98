use serde::Serialize;

use crate::board::{Side, SpecialCell};
use crate::game::Phase;
use crate::rules::MoveRecord;

/// A cell's place on the 3x10 drawing grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

/// Static description of one cell for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellInfo {
    pub index: usize,
    pub position: Position,
    pub special: Option<SpecialCell>,
}

/// One movable piece. `destination` is 30 when the piece bears off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveOption {
    pub origin: usize,
    pub destination: usize,
}

/// Public game state returned from WASM APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameState {
    /// 30 cells, 0=empty, 1=black, 2=white.
    pub board: Vec<u8>,
    pub turn_number: u32,
    pub current_side: Side,
    pub phase: Phase,
    /// The throw as rolled. `None` until the sticks are thrown.
    pub roll: Option<u8>,
    /// Steps the next move covers; differs from `roll` while a remainder is owed.
    pub effective_roll: Option<u8>,
    pub pending_remainder: u8,
    pub selected: Option<usize>,
    /// Contract:
    /// - Empty before the throw and after the game ends.
    /// - Empty with `must_skip == true` when the throw cannot be used.
    pub legal_moves: Vec<MoveOption>,
    pub must_skip: bool,
    pub black_remaining: u8,
    pub white_remaining: u8,
    pub black_borne_off: u8,
    pub white_borne_off: u8,
    pub winner: Option<Side>,
    /// `None` at the start and after a skipped turn.
    pub last_move: Option<MoveRecord>,
}

/// Final result after game over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameResult {
    pub winner: Option<Side>,
    pub turns_played: u32,
    pub black_borne_off: u8,
    pub white_borne_off: u8,
}
