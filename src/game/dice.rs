//! Randomness for combat contests

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use crate::game::constants::combat::DIE_SIDES;

/// Source of `rnd()` draws, uniform in `[0, DIE_SIDES)`
pub trait Dice {
    fn roll(&mut self) -> u16;
}

/// Dice backed by a seeded or entropy-seeded `StdRng`
pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Dice for RandomDice {
    fn roll(&mut self) -> u16 {
        self.rng.gen_range(0..DIE_SIDES)
    }
}

/// Dice that replay a fixed sequence, cycling when exhausted
#[derive(Debug, Clone)]
pub struct LoadedDice {
    rolls: VecDeque<u16>,
}

impl LoadedDice {
    pub fn new(rolls: impl IntoIterator<Item = u16>) -> Self {
        let rolls: VecDeque<u16> = rolls.into_iter().map(|r| r % DIE_SIDES).collect();
        assert!(!rolls.is_empty(), "loaded dice need at least one roll");
        Self { rolls }
    }
}

impl Dice for LoadedDice {
    fn roll(&mut self) -> u16 {
        let roll = self.rolls[0];
        self.rolls.rotate_left(1);
        roll
    }
}
