//! Throwing sticks: light sides showing, with no light side counting as 6.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::RuleError;

pub const NUM_STICKS: usize = 4;
const ALL_DARK_VALUE: u8 = 6;

/// A validated roll value: one of 1, 2, 3, 4, 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub struct StickRoll(u8);

impl StickRoll {
    pub fn new(value: u8) -> Result<Self, RuleError> {
        match value {
            1..=4 | ALL_DARK_VALUE => Ok(Self(value)),
            _ => Err(RuleError::InvalidRoll(value)),
        }
    }

    /// Reads four raw stick outcomes (1 = light side up, 0 = dark side up).
    pub fn from_sticks(sticks: [u8; NUM_STICKS]) -> Result<Self, RuleError> {
        let mut light = 0u8;
        for stick in sticks {
            match stick {
                0 => {}
                1 => light += 1,
                other => return Err(RuleError::InvalidStick(other)),
            }
        }
        Ok(Self(if light == 0 { ALL_DARK_VALUE } else { light }))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Throwing 1, 4 or 6 earns another throw after the move.
    pub fn grants_extra_turn(self) -> bool {
        matches!(self.0, 1 | 4 | ALL_DARK_VALUE)
    }
}

impl From<StickRoll> for u8 {
    fn from(roll: StickRoll) -> Self {
        roll.0
    }
}

/// Decodes raw stick outcomes into a roll value.
pub fn roll_sticks(sticks: [u8; NUM_STICKS]) -> Result<StickRoll, RuleError> {
    StickRoll::from_sticks(sticks)
}

/// Source of raw stick outcomes.
pub trait StickThrower {
    fn throw(&mut self) -> [u8; NUM_STICKS];
}

/// Deterministic thrower backed by ChaCha8, so a seed replays the same game.
#[derive(Clone, Debug)]
pub struct SeededSticks {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SeededSticks {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl StickThrower for SeededSticks {
    fn throw(&mut self) -> [u8; NUM_STICKS] {
        let mut sticks = [0u8; NUM_STICKS];
        for stick in &mut sticks {
            *stick = u8::from(self.rng.gen_bool(0.5));
        }
        sticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_sides_are_counted() {
        assert_eq!(roll_sticks([1, 0, 0, 0]).unwrap().value(), 1);
        assert_eq!(roll_sticks([1, 1, 0, 0]).unwrap().value(), 2);
        assert_eq!(roll_sticks([0, 1, 1, 1]).unwrap().value(), 3);
        assert_eq!(roll_sticks([1, 1, 1, 1]).unwrap().value(), 4);
    }

    #[test]
    fn all_dark_counts_as_six() {
        assert_eq!(roll_sticks([0, 0, 0, 0]).unwrap().value(), 6);
    }

    #[test]
    fn every_stick_combination_avoids_five() {
        for pattern in 0u8..16 {
            let sticks = [pattern & 1, (pattern >> 1) & 1, (pattern >> 2) & 1, (pattern >> 3) & 1];
            let roll = roll_sticks(sticks).unwrap();
            assert_ne!(roll.value(), 5);
            assert!(StickRoll::new(roll.value()).is_ok());
        }
    }

    #[test]
    fn non_binary_stick_is_rejected() {
        assert_eq!(roll_sticks([0, 2, 0, 1]), Err(RuleError::InvalidStick(2)));
    }

    #[test]
    fn roll_values_outside_the_stick_range_are_rejected() {
        assert_eq!(StickRoll::new(0), Err(RuleError::InvalidRoll(0)));
        assert_eq!(StickRoll::new(5), Err(RuleError::InvalidRoll(5)));
        assert_eq!(StickRoll::new(7), Err(RuleError::InvalidRoll(7)));
    }

    #[test]
    fn extra_turn_only_for_one_four_six() {
        let extra: Vec<u8> = [1, 2, 3, 4, 6]
            .into_iter()
            .filter(|&v| StickRoll::new(v).unwrap().grants_extra_turn())
            .collect();

        assert_eq!(extra, vec![1, 4, 6]);
    }

    #[test]
    fn seeded_sticks_replay_identically() {
        let mut a = SeededSticks::new(7);
        let mut b = SeededSticks::new(7);

        for _ in 0..32 {
            let sticks = a.throw();
            assert_eq!(sticks, b.throw());
            assert!(sticks.iter().all(|&s| s <= 1));
        }
        assert_eq!(a.seed(), 7);
    }
}
