use serde::{Deserialize, Serialize};

use crate::board::{
    Board, HOUSE_OF_REBIRTH, HOUSE_OF_WATER, NUM_CELLS, OFF_BOARD, Occupant, SAFE_HOUSES, Side,
    mask_to_indices,
};
use crate::error::RuleError;
use crate::sticks::StickRoll;

/// Length of an opponent run that can neither be passed nor captured.
const BLOCK_LEN: usize = 3;

/// Optional rule variants. The defaults reproduce the house rules as played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulePolicy {
    /// Pieces standing on the safe houses (25, 27, 28) cannot be captured.
    pub safe_houses: bool,
    /// A throw that carries a piece past the end still bears it off; the
    /// overflow becomes a remainder for another piece.
    pub overshoot_bear_off: bool,
}

impl RulePolicy {
    pub fn with_safe_houses(mut self, enabled: bool) -> Self {
        self.safe_houses = enabled;
        self
    }

    pub fn with_overshoot_bear_off(mut self, enabled: bool) -> Self {
        self.overshoot_bear_off = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Roll {
    NotRolled,
    Rolled(StickRoll),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    NoSelection,
    Selected(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnState {
    pub turn_number: u32,
    pub roll: Roll,
    pub selection: Selection,
    /// Steps still owed to the side to move after a bear-off overflow.
    pub pending_remainder: u8,
}

impl TurnState {
    pub fn new() -> Self {
        Self {
            turn_number: 1,
            roll: Roll::NotRolled,
            selection: Selection::NoSelection,
            pending_remainder: 0,
        }
    }

    pub fn side(&self) -> Side {
        Side::for_turn(self.turn_number)
    }

    /// The throw as rolled, ignoring any remainder.
    pub fn rolled(&self) -> Option<StickRoll> {
        match self.roll {
            Roll::NotRolled => None,
            Roll::Rolled(roll) => Some(roll),
        }
    }

    /// Steps the next move must cover: the remainder if one is owed, else the throw.
    pub fn effective_roll(&self) -> Option<u8> {
        let roll = self.rolled()?;
        if self.pending_remainder > 0 {
            Some(self.pending_remainder)
        } else {
            Some(roll.value())
        }
    }

    pub fn selected(&self) -> Option<usize> {
        match self.selection {
            Selection::NoSelection => None,
            Selection::Selected(cell) => Some(cell),
        }
    }

    pub fn with_roll(self, roll: StickRoll) -> Self {
        Self {
            roll: Roll::Rolled(roll),
            selection: Selection::NoSelection,
            pending_remainder: 0,
            ..self
        }
    }

    pub fn with_selection(self, selection: Selection) -> Self {
        Self { selection, ..self }
    }

    /// Same side, same turn number, waiting for a fresh throw.
    fn fresh(self) -> Self {
        Self {
            turn_number: self.turn_number,
            ..Self::new()
        }
    }

    fn passed(self) -> Self {
        Self {
            turn_number: self.turn_number + 1,
            ..Self::new()
        }
    }

    fn owing(self, remainder: u8) -> Self {
        Self {
            selection: Selection::NoSelection,
            pending_remainder: remainder,
            ..self
        }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-origin legal destinations for one side and one roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalMoves {
    roll: u8,
    origins: u32,
    legal: u32,
}

impl LegalMoves {
    /// Destination for a piece at `origin`, or `None` when it cannot move
    /// (or holds no piece of the side). `OFF_BOARD` means bearing off.
    pub fn destination(&self, origin: usize) -> Option<usize> {
        if origin >= NUM_CELLS || self.legal & (1 << origin) == 0 {
            return None;
        }
        Some((origin + self.roll as usize).min(OFF_BOARD))
    }

    /// Every origin holding the side's piece, paired with its destination.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<usize>)> + '_ {
        mask_to_indices(self.origins)
            .into_iter()
            .map(move |origin| (origin, self.destination(origin)))
    }

    /// Only the movable pieces, as `(origin, destination)`.
    pub fn moves(&self) -> Vec<(usize, usize)> {
        self.iter()
            .filter_map(|(origin, destination)| destination.map(|to| (origin, to)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.legal == 0
    }

    pub fn len(&self) -> usize {
        self.legal.count_ones() as usize
    }

    pub fn roll(&self) -> u8 {
        self.roll
    }
}

/// Where the moving piece ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Landing {
    Placed { to: usize },
    /// The opponent piece that stood on `to` was sent back to the origin.
    Captured { to: usize },
    /// Landed on the House of Water and was washed back to `to`.
    Redirected { to: usize },
    BoreOff { remainder: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub side: Side,
    pub origin: usize,
    pub roll: u8,
    pub landing: Landing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Same side throws again.
    ExtraTurn,
    /// Same side moves another piece by `steps` without throwing.
    Remainder { steps: u8 },
    TurnPassed,
    Win { side: Side },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResult {
    pub board: Board,
    pub turn: TurnState,
    pub outcome: Outcome,
    pub record: MoveRecord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rules {
    policy: RulePolicy,
}

impl Rules {
    pub fn new(policy: RulePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RulePolicy {
        self.policy
    }

    /// Computes the legal destination of every `side` piece for `roll` steps.
    pub fn legal_moves(&self, board: &Board, side: Side, roll: u8) -> LegalMoves {
        let origins = board.mask(side);
        let mut legal = 0u32;

        for origin in mask_to_indices(origins) {
            if self.destination(board, side, origin, roll).is_some() {
                legal |= 1 << origin;
            }
        }

        LegalMoves {
            roll,
            origins,
            legal,
        }
    }

    /// Applies the move of the piece at `origin` using the turn's effective roll.
    /// Returns `IllegalMoveRequested` without touching anything when the piece
    /// has no legal destination.
    pub fn apply_move(
        &self,
        board: &Board,
        turn: &TurnState,
        origin: usize,
    ) -> Result<MoveResult, RuleError> {
        let rolled = turn.rolled().ok_or(RuleError::NotRolled)?;
        let steps = turn.effective_roll().ok_or(RuleError::NotRolled)?;
        if origin >= NUM_CELLS {
            return Err(RuleError::OutOfRange(origin));
        }

        let side = turn.side();
        if !holds(board, side, origin) {
            return Err(RuleError::IllegalMoveRequested { origin });
        }
        let destination = self
            .destination(board, side, origin, steps)
            .ok_or(RuleError::IllegalMoveRequested { origin })?;

        let (next_board, landing) = resolve_landing(board, side, origin, destination, steps);

        let (outcome, next_turn) = if next_board.count_remaining(side) == 0 {
            (Outcome::Win { side }, turn.fresh())
        } else if let Landing::BoreOff { remainder } = landing
            && remainder > 0
        {
            (Outcome::Remainder { steps: remainder }, turn.owing(remainder))
        } else if rolled.grants_extra_turn() {
            (Outcome::ExtraTurn, turn.fresh())
        } else {
            (Outcome::TurnPassed, turn.passed())
        };

        Ok(MoveResult {
            board: next_board,
            turn: next_turn,
            outcome,
            record: MoveRecord {
                side,
                origin,
                roll: steps,
                landing,
            },
        })
    }

    fn destination(&self, board: &Board, side: Side, origin: usize, roll: u8) -> Option<usize> {
        let opponent = side.opponent();
        let target = origin + roll as usize;

        let bears_off = match target {
            OFF_BOARD => true,
            t if t > OFF_BOARD => self.policy.overshoot_bear_off,
            _ => false,
        };
        if target > OFF_BOARD && !bears_off {
            return None;
        }

        if is_path_blocked(board, opponent, origin, target.min(NUM_CELLS)) {
            return None;
        }

        if bears_off {
            return (!board.has_piece_in_first_row(side)).then_some(OFF_BOARD);
        }

        if holds(board, side, target) {
            return None;
        }
        if holds(board, opponent, target) && !self.is_capturable(board, opponent, target) {
            return None;
        }

        Some(target)
    }

    fn is_capturable(&self, board: &Board, owner: Side, cell: usize) -> bool {
        if self.policy.safe_houses && SAFE_HOUSES.contains(&cell) {
            return false;
        }
        !is_guarded(board, owner, cell)
    }
}

/// Passes the turn without moving. Used when no piece can move on the throw.
pub fn skip_turn(turn: &TurnState) -> TurnState {
    turn.passed()
}

/// Returns the side that has borne off all of its pieces, if any.
pub fn is_game_over(board: &Board) -> Option<Side> {
    [Side::Black, Side::White]
        .into_iter()
        .find(|&side| board.count_remaining(side) == 0)
}

fn resolve_landing(
    board: &Board,
    side: Side,
    origin: usize,
    destination: usize,
    steps: u8,
) -> (Board, Landing) {
    if destination == OFF_BOARD {
        let remainder = ((origin + steps as usize) % NUM_CELLS) as u8;
        return (board.without(origin), Landing::BoreOff { remainder });
    }

    if destination == HOUSE_OF_WATER {
        // Both candidates are empty, so the washed-back piece never captures.
        let to = if holds_any(board, HOUSE_OF_REBIRTH) {
            board.first_empty_cell().unwrap_or(origin)
        } else {
            HOUSE_OF_REBIRTH
        };
        return (board.with_move(origin, to), Landing::Redirected { to });
    }

    let opponent = side.opponent();
    if holds(board, opponent, destination) {
        let next = board
            .with_move(origin, destination)
            .with_occupant(origin, Occupant::piece(opponent));
        return (next, Landing::Captured { to: destination });
    }

    (
        board.with_move(origin, destination),
        Landing::Placed { to: destination },
    )
}

/// A piece is guarded when a piece of the same side stands right next to it.
fn is_guarded(board: &Board, owner: Side, cell: usize) -> bool {
    (cell > 0 && holds(board, owner, cell - 1)) || holds(board, owner, cell + 1)
}

/// True if `from..to` contains `BLOCK_LEN` or more consecutive `blocker` pieces.
fn is_path_blocked(board: &Board, blocker: Side, from: usize, to: usize) -> bool {
    let mut run = 0usize;
    for cell in from..to {
        if holds(board, blocker, cell) {
            run += 1;
            if run >= BLOCK_LEN {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn holds(board: &Board, side: Side, cell: usize) -> bool {
    cell < NUM_CELLS && board.mask(side) & (1 << cell) != 0
}

fn holds_any(board: &Board, cell: usize) -> bool {
    holds(board, Side::Black, cell) || holds(board, Side::White, cell)
}
