use serde::{Deserialize, Serialize};

use crate::domain::{Intensity, TriggerId};

/// User input forwarded by the presenter, or replayed from a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Gesture {
    Press { trigger: TriggerId },
    Release { trigger: TriggerId },
    ReleaseAll,
    Key { key: char },
    Wait { ms: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionPhase {
    #[default]
    Idle,
    Rising,
    Decaying,
}

impl ReactionPhase {
    pub fn derive(active: bool, intensity: Intensity) -> Self {
        if active {
            ReactionPhase::Rising
        } else if intensity.is_zero() {
            ReactionPhase::Idle
        } else {
            ReactionPhase::Decaying
        }
    }
}

/// Everything a presenter needs to render one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSnapshot {
    pub intensity: Intensity,
    pub active_trigger: Option<TriggerId>,
    pub phase: ReactionPhase,
    pub reaction_visible: bool,
    /// What the visible reaction is about. Outlives the playback itself.
    pub reaction_trigger: Option<TriggerId>,
    /// Live bursts, oldest first. Each expires on its own.
    pub bursts: Vec<TriggerId>,
}

impl ReactionSnapshot {
    pub fn is_playing(&self) -> bool {
        self.active_trigger.is_some()
    }
}
