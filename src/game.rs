use serde::Serialize;
use tracing::{debug, info};

use crate::board::{Board, NUM_CELLS, Side};
use crate::error::{RuleError, SessionError};
use crate::rules::{
    self, LegalMoves, MoveRecord, MoveResult, Outcome, RulePolicy, Rules, Selection, TurnState,
};
use crate::sticks::{NUM_STICKS, StickRoll, StickThrower};
use crate::types::{GameResult, GameState, MoveOption};

/// Where the match is in its throw/select/move cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    AwaitingRoll {
        side: Side,
    },
    AwaitingSelection {
        side: Side,
        roll: u8,
    },
    AwaitingDestination {
        side: Side,
        roll: u8,
        selected: usize,
        destination: usize,
    },
    Finished {
        winner: Side,
    },
}

/// One match: the board, whose turn it is, and the rule variant in force.
///
/// Every action either commits a complete new state or returns an error and
/// leaves the match exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInstance {
    board: Board,
    turn: TurnState,
    rules: Rules,
    winner: Option<Side>,
    last_move: Option<MoveRecord>,
}

impl GameInstance {
    pub fn new(policy: RulePolicy) -> Self {
        Self {
            board: Board::new(),
            turn: TurnState::new(),
            rules: Rules::new(policy),
            winner: None,
            last_move: None,
        }
    }

    pub fn new_with_default_rules() -> Self {
        Self::new(RulePolicy::default())
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn last_move(&self) -> Option<MoveRecord> {
        self.last_move
    }

    pub fn current_side(&self) -> Side {
        self.turn.side()
    }

    pub fn phase(&self) -> Phase {
        let side = self.current_side();
        if let Some(winner) = self.winner {
            return Phase::Finished { winner };
        }
        let Some(roll) = self.turn.effective_roll() else {
            return Phase::AwaitingRoll { side };
        };

        let target = self.turn.selected().and_then(|selected| {
            self.legal_moves()
                .and_then(|moves| moves.destination(selected))
                .map(|destination| (selected, destination))
        });
        match target {
            Some((selected, destination)) => Phase::AwaitingDestination {
                side,
                roll,
                selected,
                destination,
            },
            None => Phase::AwaitingSelection { side, roll },
        }
    }

    /// Records a throw for the side to move.
    pub fn roll(&mut self, roll: StickRoll) -> Result<(), SessionError> {
        self.ensure_playing()?;
        if self.turn.rolled().is_some() {
            return Err(SessionError::AlreadyRolled);
        }

        self.turn = self.turn.with_roll(roll);
        debug!(
            turn = self.turn.turn_number,
            side = ?self.current_side(),
            roll = roll.value(),
            must_skip = self.must_skip(),
            "sticks thrown"
        );
        Ok(())
    }

    /// Records a throw given as four raw stick outcomes.
    pub fn roll_sticks(&mut self, sticks: [u8; NUM_STICKS]) -> Result<StickRoll, SessionError> {
        let roll = StickRoll::from_sticks(sticks)?;
        self.roll(roll)?;
        Ok(roll)
    }

    pub fn roll_with<T: StickThrower + ?Sized>(
        &mut self,
        thrower: &mut T,
    ) -> Result<StickRoll, SessionError> {
        self.ensure_playing()?;
        if self.turn.rolled().is_some() {
            return Err(SessionError::AlreadyRolled);
        }
        self.roll_sticks(thrower.throw())
    }

    /// Legal moves for the side to move, or `None` before the throw or after the game.
    pub fn legal_moves(&self) -> Option<LegalMoves> {
        if self.winner.is_some() {
            return None;
        }
        let roll = self.turn.effective_roll()?;
        Some(self.rules.legal_moves(&self.board, self.current_side(), roll))
    }

    /// True when the throw is in but no piece can use it.
    pub fn must_skip(&self) -> bool {
        self.legal_moves().is_some_and(|moves| moves.is_empty())
    }

    /// Picks up the piece at `origin`. Returns where it would land.
    pub fn select(&mut self, origin: usize) -> Result<usize, SessionError> {
        let moves = self.require_moves()?;
        let destination = moves
            .destination(origin)
            .ok_or(illegal_request(origin))?;

        self.turn = self.turn.with_selection(Selection::Selected(origin));
        debug!(origin, destination, "piece selected");
        Ok(destination)
    }

    pub fn deselect(&mut self) {
        self.turn = self.turn.with_selection(Selection::NoSelection);
    }

    /// Moves the selected piece. `destination` must be the one the rules allow.
    pub fn move_to(&mut self, destination: usize) -> Result<Outcome, SessionError> {
        let moves = self.require_moves()?;
        let origin = self.turn.selected().ok_or(SessionError::NoSelection)?;
        if moves.destination(origin) != Some(destination) {
            return Err(illegal_request(origin).into());
        }
        self.move_piece(origin)
    }

    /// Selects and moves the piece at `origin` in one step.
    pub fn move_piece(&mut self, origin: usize) -> Result<Outcome, SessionError> {
        self.ensure_playing()?;
        if self.turn.rolled().is_none() {
            return Err(SessionError::NotRolled);
        }

        let result = self.rules.apply_move(&self.board, &self.turn, origin)?;
        Ok(self.commit(result))
    }

    /// Gives up a throw that no piece can use.
    pub fn skip_turn(&mut self) -> Result<(), SessionError> {
        let moves = self.require_moves()?;
        if !moves.is_empty() {
            return Err(SessionError::MovesAvailable);
        }

        debug!(
            turn = self.turn.turn_number,
            side = ?self.current_side(),
            roll = moves.roll(),
            "no legal move, turn skipped"
        );
        self.turn = rules::skip_turn(&self.turn);
        self.last_move = None;
        Ok(())
    }

    /// Starts a new match under the same rules.
    pub fn reset(&mut self) {
        *self = Self::new(self.rules.policy());
        debug!("match reset");
    }

    pub fn to_game_state(&self) -> GameState {
        let legal_moves = self
            .legal_moves()
            .map(|moves| {
                moves
                    .moves()
                    .into_iter()
                    .map(|(origin, destination)| MoveOption {
                        origin,
                        destination,
                    })
                    .collect()
            })
            .unwrap_or_default();

        GameState {
            board: self.board.to_array().to_vec(),
            turn_number: self.turn.turn_number,
            current_side: self.current_side(),
            phase: self.phase(),
            roll: self.turn.rolled().map(StickRoll::value),
            effective_roll: self.turn.effective_roll(),
            pending_remainder: self.turn.pending_remainder,
            selected: self.turn.selected(),
            legal_moves,
            must_skip: self.must_skip(),
            black_remaining: self.board.count_remaining(Side::Black) as u8,
            white_remaining: self.board.count_remaining(Side::White) as u8,
            black_borne_off: self.board.borne_off(Side::Black) as u8,
            white_borne_off: self.board.borne_off(Side::White) as u8,
            winner: self.winner,
            last_move: self.last_move,
        }
    }

    pub fn to_game_result(&self) -> GameResult {
        GameResult {
            winner: self.winner,
            turns_played: self.turn.turn_number,
            black_borne_off: self.board.borne_off(Side::Black) as u8,
            white_borne_off: self.board.borne_off(Side::White) as u8,
        }
    }

    fn commit(&mut self, result: MoveResult) -> Outcome {
        debug!(
            turn = self.turn.turn_number,
            side = ?result.record.side,
            origin = result.record.origin,
            landing = ?result.record.landing,
            outcome = ?result.outcome,
            "move applied"
        );

        self.board = result.board;
        self.turn = result.turn;
        self.last_move = Some(result.record);

        if let Outcome::Win { side } = result.outcome {
            self.winner = Some(side);
            info!(winner = ?side, turns = self.turn.turn_number, "game over");
        }

        result.outcome
    }

    fn ensure_playing(&self) -> Result<(), SessionError> {
        if self.winner.is_some() {
            Err(SessionError::GameOver)
        } else {
            Ok(())
        }
    }

    fn require_moves(&self) -> Result<LegalMoves, SessionError> {
        self.ensure_playing()?;
        self.legal_moves().ok_or(SessionError::NotRolled)
    }

    #[cfg(test)]
    fn set_position_for_test(&mut self, board: Board, turn_number: u32) {
        self.board = board;
        self.turn = TurnState {
            turn_number,
            ..TurnState::new()
        };
        self.winner = None;
        self.last_move = None;
    }
}

impl Default for GameInstance {
    fn default() -> Self {
        Self::new_with_default_rules()
    }
}

fn illegal_request(origin: usize) -> RuleError {
    if origin >= NUM_CELLS {
        RuleError::OutOfRange(origin)
    } else {
        RuleError::IllegalMoveRequested { origin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Landing;
    use crate::sticks::SeededSticks;

    fn roll(value: u8) -> StickRoll {
        StickRoll::new(value).unwrap()
    }

    fn board(pieces: &[(usize, Side)]) -> Board {
        Board::with_pieces(pieces).unwrap()
    }

    #[test]
    fn initial_state_is_correct() {
        let game = GameInstance::default();
        let state = game.to_game_state();

        assert_eq!(state.turn_number, 1);
        assert_eq!(state.current_side, Side::Black);
        assert_eq!(state.phase, Phase::AwaitingRoll { side: Side::Black });
        assert_eq!(state.black_remaining, 5);
        assert_eq!(state.white_remaining, 5);
        assert_eq!(state.roll, None);
        assert!(state.legal_moves.is_empty());
        assert!(!state.must_skip);
        assert_eq!(state.winner, None);
        assert_eq!(state.last_move, None);
    }

    #[test]
    fn nothing_moves_before_the_throw() {
        let mut game = GameInstance::default();
        let before = game.clone();

        assert_eq!(game.move_piece(9), Err(SessionError::NotRolled));
        assert_eq!(game.select(9), Err(SessionError::NotRolled));
        assert_eq!(game.skip_turn(), Err(SessionError::NotRolled));
        assert_eq!(game, before);
    }

    #[test]
    fn second_throw_in_one_turn_is_rejected() {
        let mut game = GameInstance::default();
        game.roll(roll(2)).unwrap();
        let before = game.clone();

        assert_eq!(game.roll(roll(3)), Err(SessionError::AlreadyRolled));
        assert_eq!(game.roll_sticks([1, 0, 0, 0]), Err(SessionError::AlreadyRolled));
        assert_eq!(game, before);
    }

    #[test]
    fn select_then_move_passes_turn_on_two() {
        let mut game = GameInstance::default();
        game.roll(roll(2)).unwrap();
        assert_eq!(
            game.phase(),
            Phase::AwaitingSelection {
                side: Side::Black,
                roll: 2
            }
        );

        let before = game.clone();
        assert_eq!(
            game.select(1),
            Err(SessionError::Rule(RuleError::IllegalMoveRequested { origin: 1 }))
        );
        assert_eq!(game, before);

        assert_eq!(game.select(9), Ok(11));
        assert_eq!(
            game.phase(),
            Phase::AwaitingDestination {
                side: Side::Black,
                roll: 2,
                selected: 9,
                destination: 11
            }
        );

        let selected = game.clone();
        assert_eq!(
            game.move_to(12),
            Err(SessionError::Rule(RuleError::IllegalMoveRequested { origin: 9 }))
        );
        assert_eq!(game, selected);

        assert_eq!(game.move_to(11), Ok(Outcome::TurnPassed));
        assert_eq!(game.phase(), Phase::AwaitingRoll { side: Side::White });
        assert_eq!(game.turn().turn_number, 2);
        assert_eq!(
            game.last_move().map(|m| m.landing),
            Some(Landing::Placed { to: 11 })
        );
    }

    #[test]
    fn move_to_requires_a_selection() {
        let mut game = GameInstance::default();
        game.roll(roll(2)).unwrap();

        assert_eq!(game.move_to(11), Err(SessionError::NoSelection));

        game.select(9).unwrap();
        game.deselect();
        assert_eq!(game.move_to(11), Err(SessionError::NoSelection));
    }

    #[test]
    fn throwing_one_keeps_the_turn() {
        let mut game = GameInstance::default();
        game.roll(roll(1)).unwrap();

        assert_eq!(game.move_piece(9), Ok(Outcome::ExtraTurn));
        assert_eq!(game.phase(), Phase::AwaitingRoll { side: Side::Black });
        assert_eq!(game.turn().turn_number, 1);
        assert!(game.roll(roll(3)).is_ok());
    }

    #[test]
    fn blocked_side_must_skip_and_consumes_the_throw() {
        let mut game = GameInstance::default();
        game.set_position_for_test(
            board(&[(1, Side::Black), (2, Side::White), (3, Side::White)]),
            1,
        );

        game.roll(roll(1)).unwrap();
        assert!(game.must_skip());
        assert_eq!(
            game.move_piece(1),
            Err(SessionError::Rule(RuleError::IllegalMoveRequested { origin: 1 }))
        );

        game.skip_turn().unwrap();
        assert_eq!(game.phase(), Phase::AwaitingRoll { side: Side::White });
        assert_eq!(game.turn().turn_number, 2);
        assert_eq!(game.board(), &board(&[(1, Side::Black), (2, Side::White), (3, Side::White)]));
    }

    #[test]
    fn skip_is_refused_while_a_move_exists() {
        let mut game = GameInstance::default();
        game.roll(roll(2)).unwrap();

        assert_eq!(game.skip_turn(), Err(SessionError::MovesAvailable));
        assert_eq!(game.turn().turn_number, 1);
    }

    #[test]
    fn bearing_off_last_piece_finishes_the_match() {
        let mut game = GameInstance::default();
        game.set_position_for_test(board(&[(27, Side::Black), (5, Side::White)]), 1);
        game.roll(roll(3)).unwrap();

        assert_eq!(game.move_piece(27), Ok(Outcome::Win { side: Side::Black }));
        assert_eq!(game.phase(), Phase::Finished { winner: Side::Black });
        assert_eq!(game.roll(roll(2)), Err(SessionError::GameOver));
        assert_eq!(game.select(5), Err(SessionError::GameOver));
        assert_eq!(game.skip_turn(), Err(SessionError::GameOver));
        assert!(game.legal_moves().is_none());

        let result = game.to_game_result();
        assert_eq!(result.winner, Some(Side::Black));
        assert_eq!(result.black_borne_off, 5);
        assert_eq!(result.white_borne_off, 4);

        game.reset();
        assert_eq!(game, GameInstance::default());
    }

    #[test]
    fn reset_keeps_the_rule_variant() {
        let policy = RulePolicy::default().with_safe_houses(true);
        let mut game = GameInstance::new(policy);
        game.roll(roll(2)).unwrap();
        game.move_piece(9).unwrap();

        game.reset();

        assert_eq!(game.rules().policy(), policy);
        assert_eq!(game.turn().turn_number, 1);
        assert_eq!(game.board(), &Board::new());
    }

    #[test]
    fn overshoot_remainder_moves_another_piece_without_throwing() {
        let policy = RulePolicy::default().with_overshoot_bear_off(true);
        let mut game = GameInstance::new(policy);
        game.set_position_for_test(
            board(&[(28, Side::Black), (15, Side::Black), (3, Side::White)]),
            1,
        );
        game.roll(roll(4)).unwrap();

        assert_eq!(game.move_piece(28), Ok(Outcome::Remainder { steps: 2 }));
        assert_eq!(
            game.phase(),
            Phase::AwaitingSelection {
                side: Side::Black,
                roll: 2
            }
        );
        assert_eq!(game.roll(roll(1)), Err(SessionError::AlreadyRolled));

        let state = game.to_game_state();
        assert_eq!(state.roll, Some(4));
        assert_eq!(state.effective_roll, Some(2));
        assert_eq!(
            state.legal_moves,
            vec![MoveOption {
                origin: 15,
                destination: 17
            }]
        );

        assert_eq!(game.move_piece(15), Ok(Outcome::ExtraTurn));
        assert_eq!(game.phase(), Phase::AwaitingRoll { side: Side::Black });
        assert_eq!(game.turn().pending_remainder, 0);
    }

    #[test]
    fn seeded_thrower_drives_identical_matches() {
        let mut a = GameInstance::default();
        let mut b = GameInstance::default();
        let mut sticks_a = SeededSticks::new(42);
        let mut sticks_b = SeededSticks::new(42);

        for _ in 0..20 {
            let ra = a.roll_with(&mut sticks_a).unwrap();
            let rb = b.roll_with(&mut sticks_b).unwrap();
            assert_eq!(ra, rb);

            match a.legal_moves().and_then(|m| m.moves().first().copied()) {
                Some((origin, _)) => {
                    assert_eq!(a.move_piece(origin), b.move_piece(origin));
                }
                None => {
                    a.skip_turn().unwrap();
                    b.skip_turn().unwrap();
                }
            }
            if a.winner().is_some() {
                break;
            }
        }

        assert_eq!(a, b);
    }

    #[test]
    fn roll_sticks_rejects_bad_input_without_consuming_the_turn() {
        let mut game = GameInstance::default();

        assert_eq!(
            game.roll_sticks([0, 3, 0, 0]),
            Err(SessionError::Rule(RuleError::InvalidStick(3)))
        );
        assert_eq!(game.roll_sticks([0, 0, 0, 0]), Ok(roll(6)));
        assert_eq!(game.turn().effective_roll(), Some(6));
    }
}
