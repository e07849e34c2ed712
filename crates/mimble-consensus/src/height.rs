use serde::{Deserialize, Serialize};

use crate::constants::{HEIGHT_GENESIS, MAX_HEIGHT};

/// Inclusive height interval. Empty iff `min > max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeightRange {
    pub min: u64,
    pub max: u64,
}

impl HeightRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub const fn at(h: u64) -> Self {
        Self { min: h, max: h }
    }

    /// The widest range any element may declare.
    pub const fn full() -> Self {
        Self {
            min: HEIGHT_GENESIS,
            max: MAX_HEIGHT,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::full();
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn is_in_range(&self, h: u64) -> bool {
        h >= self.min && h <= self.max
    }

    /// Never widens either bound.
    pub fn intersect(&mut self, other: &HeightRange) {
        self.min = self.min.max(other.min);
        self.max = self.max.min(other.max);
    }
}

impl Default for HeightRange {
    fn default() -> Self {
        Self::full()
    }
}
