use serde::Serialize;

use crate::error::RuleError;
use crate::types::{CellInfo, Position};

pub const NUM_CELLS: usize = 30;
/// Synthetic destination index for a piece leaving the board.
pub const OFF_BOARD: usize = NUM_CELLS;
pub const ROW_LEN: usize = 10;
pub const PIECES_PER_SIDE: usize = 5;

pub const HOUSE_OF_REBIRTH: usize = 14;
pub const SAFE_HOUSE_1: usize = 25;
pub const HOUSE_OF_WATER: usize = 26;
pub const SAFE_HOUSE_2: usize = 27;
pub const SAFE_HOUSE_3: usize = 28;
pub const SAFE_HOUSES: [usize; 3] = [SAFE_HOUSE_1, SAFE_HOUSE_2, SAFE_HOUSE_3];

const ALL_CELLS: u32 = (1 << NUM_CELLS) - 1;
const FIRST_ROW: u32 = (1 << ROW_LEN) - 1;
// Cells 0..10 alternate, White on even indices.
const START_WHITE: u32 = 0b01_0101_0101;
const START_BLACK: u32 = 0b10_1010_1010;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Black,
    White,
}

impl Side {
    /// Black moves on odd turns, White on even ones.
    pub fn for_turn(turn_number: u32) -> Self {
        if turn_number % 2 == 1 {
            Self::Black
        } else {
            Self::White
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Occupant {
    Empty,
    Black,
    White,
}

impl Occupant {
    pub fn piece(side: Side) -> Self {
        match side {
            Side::Black => Self::Black,
            Side::White => Self::White,
        }
    }

    pub fn side(self) -> Option<Side> {
        match self {
            Self::Empty => None,
            Self::Black => Some(Side::Black),
            Self::White => Some(Side::White),
        }
    }

    pub fn is(self, side: Side) -> bool {
        self.side() == Some(side)
    }

    /// Cell encoding shared with the web front-end: 0=empty, 1=black, 2=white.
    pub fn code(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Black => 1,
            Self::White => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialCell {
    Rebirth,
    Water,
    Safe,
}

/// Returns the special role of a cell, if it has one.
pub fn special_cell(index: usize) -> Option<SpecialCell> {
    match index {
        HOUSE_OF_REBIRTH => Some(SpecialCell::Rebirth),
        HOUSE_OF_WATER => Some(SpecialCell::Water),
        SAFE_HOUSE_1 | SAFE_HOUSE_2 | SAFE_HOUSE_3 => Some(SpecialCell::Safe),
        _ => None,
    }
}

/// Maps a track index onto the 3x10 drawing grid.
/// The middle row runs right to left, so the track snakes across the board.
pub fn cell_position(index: usize) -> Result<Position, RuleError> {
    if index >= NUM_CELLS {
        return Err(RuleError::OutOfRange(index));
    }
    let row = index / ROW_LEN;
    let offset = index % ROW_LEN;
    let col = if row == 1 { ROW_LEN - 1 - offset } else { offset };
    Ok(Position {
        row: row as u8,
        col: col as u8,
    })
}

/// Every cell with its grid position and special role, in track order.
pub fn layout() -> Vec<CellInfo> {
    (0..NUM_CELLS)
        .filter_map(|index| {
            cell_position(index).ok().map(|position| CellInfo {
                index,
                position,
                special: special_cell(index),
            })
        })
        .collect()
}

/// Senet track state represented by one bitboard per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    black: u32,
    white: u32,
}

impl Board {
    /// Creates the starting layout: cells 0..10 alternate White/Black, the rest empty.
    pub fn new() -> Self {
        Self {
            black: START_BLACK,
            white: START_WHITE,
        }
    }

    /// Builds a board from raw masks. Bits at or above `NUM_CELLS` are dropped.
    pub fn from_bitboards(black: u32, white: u32) -> Self {
        debug_assert_eq!(black & white, 0, "a cell cannot hold two pieces");
        Self {
            black: black & ALL_CELLS,
            white: white & ALL_CELLS & !black,
        }
    }

    /// Builds a board from `(index, side)` pairs; later entries overwrite earlier ones.
    pub fn with_pieces(pieces: &[(usize, Side)]) -> Result<Self, RuleError> {
        let mut board = Self::from_bitboards(0, 0);
        for &(index, side) in pieces {
            if index >= NUM_CELLS {
                return Err(RuleError::OutOfRange(index));
            }
            board = board.with_occupant(index, Occupant::piece(side));
        }
        Ok(board)
    }

    pub fn occupant_at(&self, index: usize) -> Result<Occupant, RuleError> {
        if index >= NUM_CELLS {
            return Err(RuleError::OutOfRange(index));
        }
        Ok(self.cell(index))
    }

    /// Number of cells holding `side`'s pieces. Zero means `side` has won.
    pub fn count_remaining(&self, side: Side) -> usize {
        self.mask(side).count_ones() as usize
    }

    pub fn borne_off(&self, side: Side) -> usize {
        PIECES_PER_SIDE.saturating_sub(self.count_remaining(side))
    }

    pub fn first_empty_cell(&self) -> Option<usize> {
        let empty = !(self.black | self.white) & ALL_CELLS;
        if empty == 0 {
            None
        } else {
            Some(empty.trailing_zeros() as usize)
        }
    }

    /// True while `side` still has a piece somewhere in cells 0..10.
    pub fn has_piece_in_first_row(&self, side: Side) -> bool {
        self.mask(side) & FIRST_ROW != 0
    }

    /// Returns a copy with `from` cleared and `to` holding what was at `from`.
    /// Performs no legality checks.
    pub fn with_move(&self, from: usize, to: usize) -> Board {
        debug_assert!(from < NUM_CELLS && to < NUM_CELLS);
        let piece = self.cell(from);
        self.with_occupant(from, Occupant::Empty)
            .with_occupant(to, piece)
    }

    /// Returns a copy with the piece at `index` taken off the board.
    pub fn without(&self, index: usize) -> Board {
        self.with_occupant(index, Occupant::Empty)
    }

    pub fn with_occupant(&self, index: usize, occupant: Occupant) -> Board {
        let square = bit(index);
        let mut next = Board {
            black: self.black & !square,
            white: self.white & !square,
        };
        match occupant {
            Occupant::Empty => {}
            Occupant::Black => next.black |= square,
            Occupant::White => next.white |= square,
        }
        next
    }

    /// Converts board to `[u8; 30]` where 0=empty, 1=black, 2=white.
    pub fn to_array(&self) -> [u8; NUM_CELLS] {
        let mut board = [0u8; NUM_CELLS];
        for (pos, cell) in board.iter_mut().enumerate() {
            *cell = self.cell(pos).code();
        }
        board
    }

    pub(crate) fn mask(&self, side: Side) -> u32 {
        match side {
            Side::Black => self.black,
            Side::White => self.white,
        }
    }

    fn cell(&self, index: usize) -> Occupant {
        let square = bit(index);
        if self.black & square != 0 {
            Occupant::Black
        } else if self.white & square != 0 {
            Occupant::White
        } else {
            Occupant::Empty
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

fn bit(pos: usize) -> u32 {
    if pos < NUM_CELLS { 1u32 << pos } else { 0 }
}

/// Set bit positions of `mask`, lowest first.
pub(crate) fn mask_to_indices(mask: u32) -> Vec<usize> {
    let mut bits = mask;
    let mut out = Vec::new();

    while bits != 0 {
        out.push(bits.trailing_zeros() as usize);
        bits &= bits - 1;
    }

    out
}
