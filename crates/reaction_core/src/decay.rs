//! Tick-driven relaxation of the intensity scalar.

use std::time::Duration;

use shared::{domain::Intensity, error::CatalogError};

pub const DEFAULT_DECAY_TICK: Duration = Duration::from_millis(150);
/// Above this level each tick removes [`FAST_DECAY_STEP`] instead of one.
pub const FAST_DECAY_THRESHOLD: u8 = 75;
pub const FAST_DECAY_STEP: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayPolicy {
    /// Hold the level while a trigger is playing.
    FreezeWhilePlaying,
    Unconditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayTimer {
    policy: DecayPolicy,
    interval: Duration,
}

impl DecayTimer {
    pub fn new(policy: DecayPolicy, interval: Duration) -> Result<Self, CatalogError> {
        if interval.is_zero() {
            return Err(CatalogError::InvalidTick(0));
        }
        Ok(Self { policy, interval })
    }

    pub fn policy(&self) -> DecayPolicy {
        self.policy
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Level after one tick.
    pub fn step(&self, current: Intensity, playing: bool) -> Intensity {
        if playing && self.policy == DecayPolicy::FreezeWhilePlaying {
            return current;
        }
        relax(current)
    }
}

pub fn relax(current: Intensity) -> Intensity {
    match current.value() {
        v if v > FAST_DECAY_THRESHOLD => current.lowered_by(FAST_DECAY_STEP),
        v if v > 0 => current.lowered_by(1),
        _ => current,
    }
}

/// Number of unobstructed ticks needed to reach zero.
pub fn ticks_to_rest(from: Intensity) -> u32 {
    let mut level = from;
    let mut ticks = 0;
    while !level.is_zero() {
        level = relax(level);
        ticks += 1;
    }
    ticks
}

#[cfg(test)]
#[path = "tests/decay_tests.rs"]
mod tests;
