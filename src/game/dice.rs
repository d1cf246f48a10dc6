//! Randomness seam for combat, catalogue picks and player dice rolls.
//!
//! Everything random in the game goes through [`Dice`], so fights can be
//! replayed exactly with [`ScriptedDice`] or a seeded [`RngDice`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::ops::RangeInclusive;

use crate::validation::DiceSpec;

pub trait Dice {
    /// Uniform roll in 1..=20.
    fn d20(&mut self) -> u32 {
        self.roll(20)
    }

    /// Uniform roll in 1..=sides.
    fn roll(&mut self, sides: u32) -> u32;

    /// True with the given probability (clamped to [0, 1]).
    fn chance(&mut self, probability: f64) -> bool;

    /// Uniform value inside an inclusive range.
    fn between(&mut self, range: RangeInclusive<i32>) -> i32;

    /// Uniform index into a non-empty collection of `len` elements.
    fn pick(&mut self, len: usize) -> usize;
}

/// [`Dice`] backed by any `rand` generator.
pub struct RngDice<R: Rng> {
    rng: R,
}

impl RngDice<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RngDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Dice for RngDice<R> {
    fn roll(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn between(&mut self, range: RangeInclusive<i32>) -> i32 {
        let (lo, hi) = (*range.start(), *range.end());
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Pre-recorded outcomes, consumed in order.
///
/// When a queue runs dry the lowest outcome is returned (1 for rolls, `false`
/// for chances, the range start, index 0).
#[derive(Debug, Default, Clone)]
pub struct ScriptedDice {
    rolls: VecDeque<u32>,
    chances: VecDeque<bool>,
    values: VecDeque<i32>,
    picks: VecDeque<usize>,
}

impl ScriptedDice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue d20 / dN results.
    pub fn with_rolls(mut self, rolls: impl IntoIterator<Item = u32>) -> Self {
        self.rolls.extend(rolls);
        self
    }

    pub fn with_chances(mut self, chances: impl IntoIterator<Item = bool>) -> Self {
        self.chances.extend(chances);
        self
    }

    /// Queue results for [`Dice::between`].
    pub fn with_values(mut self, values: impl IntoIterator<Item = i32>) -> Self {
        self.values.extend(values);
        self
    }

    pub fn with_picks(mut self, picks: impl IntoIterator<Item = usize>) -> Self {
        self.picks.extend(picks);
        self
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self, sides: u32) -> u32 {
        self.rolls.pop_front().unwrap_or(1).clamp(1, sides.max(1))
    }

    fn chance(&mut self, _probability: f64) -> bool {
        self.chances.pop_front().unwrap_or(false)
    }

    fn between(&mut self, range: RangeInclusive<i32>) -> i32 {
        let (lo, hi) = (*range.start(), *range.end());
        self.values.pop_front().unwrap_or(lo).clamp(lo, hi.max(lo))
    }

    fn pick(&mut self, len: usize) -> usize {
        self.picks
            .pop_front()
            .unwrap_or(0)
            .min(len.saturating_sub(1))
    }
}

/// Result of rolling a parsed `NdM` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    pub spec: DiceSpec,
    pub rolls: Vec<u32>,
    pub total: u32,
}

pub fn roll_spec(spec: DiceSpec, dice: &mut dyn Dice) -> DiceRoll {
    let rolls: Vec<u32> = (0..spec.count).map(|_| dice.roll(spec.sides)).collect();
    let total = rolls.iter().sum();
    DiceRoll { spec, rolls, total }
}
