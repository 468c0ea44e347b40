//! Random sources for combat and loot.
//!
//! Rules never call `rand` directly; they take a `&mut impl Roller`.
//! Production code passes a thread-local RNG, tests pass a
//! [`FixedRoller`] that replays scripted values.

use std::collections::VecDeque;

use rand::Rng;
use rand::rngs::{StdRng, ThreadRng};

/// Uniform random draws used by the rules.
pub trait Roller {
    /// A value in `0..n`. Returns 0 when `n == 0`.
    fn below(&mut self, n: u32) -> u32;

    /// A value in `[0.0, 1.0)`.
    fn chance(&mut self) -> f64;
}

impl Roller for ThreadRng {
    fn below(&mut self, n: u32) -> u32 {
        if n == 0 { 0 } else { self.random_range(0..n) }
    }

    fn chance(&mut self) -> f64 {
        self.random()
    }
}

impl Roller for StdRng {
    fn below(&mut self, n: u32) -> u32 {
        if n == 0 { 0 } else { self.random_range(0..n) }
    }

    fn chance(&mut self) -> f64 {
        self.random()
    }
}

/// Replays scripted draws, then falls back to fixed defaults.
///
/// Integer draws are clamped into range, so a script written for one
/// call site can't produce an out-of-range value at another.
#[derive(Debug, Clone)]
pub struct FixedRoller {
    ints: VecDeque<u32>,
    floats: VecDeque<f64>,
    default_int: u32,
    default_float: f64,
}

impl FixedRoller {
    /// Always rolls the given integer and float.
    pub fn constant(int: u32, float: f64) -> Self {
        Self {
            ints: VecDeque::new(),
            floats: VecDeque::new(),
            default_int: int,
            default_float: float,
        }
    }

    /// Queue integer results, consumed front to back.
    pub fn with_ints(mut self, ints: impl IntoIterator<Item = u32>) -> Self {
        self.ints.extend(ints);
        self
    }

    /// Queue float results, consumed front to back.
    pub fn with_floats(mut self, floats: impl IntoIterator<Item = f64>) -> Self {
        self.floats.extend(floats);
        self
    }
}

impl Roller for FixedRoller {
    fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let v = self.ints.pop_front().unwrap_or(self.default_int);
        v.min(n - 1)
    }

    fn chance(&mut self) -> f64 {
        self.floats.pop_front().unwrap_or(self.default_float)
    }
}
