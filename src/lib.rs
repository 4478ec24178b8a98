use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod board;
pub mod error;
pub mod game;
pub mod rules;
pub mod sticks;
pub mod types;

use crate::error::SessionError;
use crate::game::GameInstance;
use crate::rules::RulePolicy;
use crate::sticks::{NUM_STICKS, SeededSticks};

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}

/// Static cell table (grid position and special houses) for drawing the board.
#[wasm_bindgen]
pub fn board_layout() -> Result<JsValue, JsValue> {
    to_js(&board::layout())
}

/// A match driven from JavaScript. Mutators return the new `GameState`.
#[wasm_bindgen]
pub struct SenetGame {
    game: GameInstance,
    sticks: SeededSticks,
}

#[wasm_bindgen]
impl SenetGame {
    /// `policy` may be `undefined` or a partial `{ safe_houses, overshoot_bear_off }` object.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, policy: JsValue) -> Result<SenetGame, JsValue> {
        let policy: RulePolicy = if policy.is_undefined() || policy.is_null() {
            RulePolicy::default()
        } else {
            serde_wasm_bindgen::from_value(policy)?
        };

        Ok(Self {
            game: GameInstance::new(policy),
            sticks: SeededSticks::new(seed),
        })
    }

    /// Throws the sticks with the game's own seeded source.
    pub fn roll(&mut self) -> Result<JsValue, JsValue> {
        self.game.roll_with(&mut self.sticks).map_err(js_error)?;
        self.state()
    }

    /// Records a throw made elsewhere, as four 0/1 stick outcomes.
    pub fn roll_sticks(&mut self, sticks: Vec<u8>) -> Result<JsValue, JsValue> {
        let sticks: [u8; NUM_STICKS] = sticks.as_slice().try_into().map_err(|_| {
            JsValue::from(JsError::new(&format!(
                "expected {NUM_STICKS} sticks, got {}",
                sticks.len()
            )))
        })?;
        self.game.roll_sticks(sticks).map_err(js_error)?;
        self.state()
    }

    pub fn select(&mut self, cell: usize) -> Result<JsValue, JsValue> {
        self.game.select(cell).map_err(js_error)?;
        self.state()
    }

    pub fn deselect(&mut self) -> Result<JsValue, JsValue> {
        self.game.deselect();
        self.state()
    }

    pub fn move_to(&mut self, cell: usize) -> Result<JsValue, JsValue> {
        self.game.move_to(cell).map_err(js_error)?;
        self.state()
    }

    pub fn skip_turn(&mut self) -> Result<JsValue, JsValue> {
        self.game.skip_turn().map_err(js_error)?;
        self.state()
    }

    pub fn reset(&mut self) -> Result<JsValue, JsValue> {
        self.game.reset();
        self.state()
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.game.to_game_state())
    }

    pub fn result(&self) -> Result<JsValue, JsValue> {
        to_js(&self.game.to_game_result())
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

fn js_error(err: SessionError) -> JsValue {
    JsError::new(&err.to_string()).into()
}
