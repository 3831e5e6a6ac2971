use thiserror::Error;

use crate::domain::{TriggerId, MAX_INTENSITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("intensity {0} is above the scale maximum of {MAX_INTENSITY}")]
pub struct InvalidIntensity(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("trigger catalog is empty")]
    Empty,
    #[error("duplicate trigger id: {0}")]
    DuplicateTrigger(TriggerId),
    #[error("trigger {id} has intensity {intensity} above the scale maximum")]
    IntensityOutOfRange { id: TriggerId, intensity: u32 },
    #[error("key {key:?} is mapped more than once")]
    DuplicateKey { key: char },
    #[error("key {key:?} targets unknown trigger {target}")]
    UnknownKeyTarget { key: char, target: TriggerId },
    #[error("decay tick of {0} ms is not usable")]
    InvalidTick(u64),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("unknown trigger: {0}")]
    UnknownTrigger(TriggerId),
    #[error("failed to acquire playback resource for {id}: {reason}")]
    Acquire { id: TriggerId, reason: String },
    #[error("failed to start playback for {id}: {reason}")]
    Start { id: TriggerId, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("reaction session is closed")]
    Closed,
    #[error("unknown trigger: {0}")]
    UnknownTrigger(TriggerId),
}
