use thiserror::Error;

/// Errors raised by the rule engine itself.
///
/// Blocked paths, guarded targets and bear-off gating are not errors: they only
/// show up as a missing destination in the legal-move set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("cell index {0} is outside the board")]
    OutOfRange(usize),
    #[error("no legal move from cell {origin}")]
    IllegalMoveRequested { origin: usize },
    #[error("stick outcome must be 0 or 1, got {0}")]
    InvalidStick(u8),
    #[error("roll value must be one of 1, 2, 3, 4, 6, got {0}")]
    InvalidRoll(u8),
    #[error("no roll is available to move with")]
    NotRolled,
}

/// Errors raised by the match session when an action arrives in the wrong phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("game is already over")]
    GameOver,
    #[error("the sticks were already thrown this turn")]
    AlreadyRolled,
    #[error("throw the sticks first")]
    NotRolled,
    #[error("no piece is selected")]
    NoSelection,
    #[error("a legal move exists, the turn cannot be skipped")]
    MovesAvailable,
    #[error(transparent)]
    Rule(#[from] RuleError),
}
