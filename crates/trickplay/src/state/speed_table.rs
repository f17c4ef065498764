//! Speed multiplier table and the cycling rule shared by both strategies.

use std::num::NonZeroUsize;

use super::types::{Direction, NORMAL_SPEED, TrickPlayState};
use crate::error::{Result, TrickPlayError};

pub const DEFAULT_MULTIPLIERS: &[u32] = &[2, 4, 8, 16, 32];
/// Largest multiplier whose rate still fits in `i32` speed units.
pub const MAX_MULTIPLIER: u32 = (i32::MAX / NORMAL_SPEED) as u32;

/// How a single FF/RW press should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleRequest {
    pub direction: Direction,
    /// Always honor `direction`, even when already trick-playing the other way.
    pub force: bool,
    /// Wrap back to the first multiplier after the last one.
    pub allow_cycle: bool,
}

/// Strictly increasing, non-empty list of multiples of normal speed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedTable {
    multipliers: Vec<u32>,
}

impl SpeedTable {
    pub fn new(multipliers: Vec<u32>) -> Result<Self> {
        if multipliers.is_empty() {
            return Err(TrickPlayError::EmptySpeedTable);
        }
        for (index, pair) in multipliers.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(TrickPlayError::UnorderedSpeedTable {
                    index: index + 1,
                    previous: pair[0],
                    value: pair[1],
                });
            }
        }
        if multipliers[0] == 0 {
            return Err(TrickPlayError::ZeroMultiplier { index: 0 });
        }
        if let Some(index) = multipliers.iter().position(|&m| m > MAX_MULTIPLIER) {
            return Err(TrickPlayError::MultiplierTooLarge {
                index,
                value: multipliers[index],
                max: MAX_MULTIPLIER,
            });
        }
        Ok(Self { multipliers })
    }

    pub fn len(&self) -> usize {
        self.multipliers.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn multipliers(&self) -> &[u32] {
        &self.multipliers
    }

    /// Highest valid 1-based index.
    pub fn last_index(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.multipliers.len()).unwrap_or(NonZeroUsize::MIN)
    }

    /// Signed speed units for a 1-based index in the given direction.
    pub fn rate_at(&self, index: NonZeroUsize, direction: Direction) -> i32 {
        let slot = index.get().min(self.multipliers.len()) - 1;
        self.multipliers[slot] as i32 * NORMAL_SPEED * direction.sign()
    }

    /// Compute the state one FF/RW press leads to.
    ///
    /// - Opposite direction while trick-playing (not forced): step one
    ///   multiplier down in the current direction; stepping below the first
    ///   multiplier resumes Play.
    /// - Same direction: step up, wrapping to 1 or holding at the last entry
    ///   depending on `allow_cycle`.
    /// - From Play/Pause, or a forced reversal: start at index 1.
    pub fn next(&self, current: &TrickPlayState, request: CycleRequest) -> TrickPlayState {
        let current_dir = current.mode.direction();

        if let Some(dir) = current_dir {
            if dir != request.direction && !request.force {
                let lower = current.index.and_then(|i| NonZeroUsize::new(i.get() - 1));
                return match lower {
                    Some(index) => self.step(dir, index),
                    None => TrickPlayState::playing(),
                };
            }
        }

        let index = if current_dir == Some(request.direction) {
            match current.index {
                Some(i) if i >= self.last_index() => {
                    if request.allow_cycle {
                        NonZeroUsize::MIN
                    } else {
                        self.last_index()
                    }
                }
                Some(i) => i.saturating_add(1),
                // Trick rate adopted from the player without a table slot.
                None => NonZeroUsize::MIN,
            }
        } else {
            NonZeroUsize::MIN
        };

        self.step(request.direction, index)
    }

    fn step(&self, direction: Direction, index: NonZeroUsize) -> TrickPlayState {
        TrickPlayState {
            mode: direction.mode(),
            rate: self.rate_at(index, direction),
            index: Some(index),
        }
    }

    /// Position of `rate` in the table, if it is one of the trick rates.
    pub fn index_of_rate(&self, rate: i32) -> Option<NonZeroUsize> {
        let magnitude = rate.unsigned_abs();
        if magnitude <= NORMAL_SPEED as u32 {
            return None;
        }
        self.multipliers
            .iter()
            .position(|&m| m * NORMAL_SPEED as u32 == magnitude)
            .and_then(|p| NonZeroUsize::new(p + 1))
    }
}

impl Default for SpeedTable {
    fn default() -> Self {
        Self {
            multipliers: DEFAULT_MULTIPLIERS.to_vec(),
        }
    }
}
