use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::domain::{ResourceDescriptor, TriggerId};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub trigger_id: TriggerId,
    pub resource: ResourceDescriptor,
    pub volume: f32,
    /// Stereo position, -1.0 (left) to 1.0 (right).
    pub pan: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Playback reached the end of its source on its own.
    Ended,
}

/// Alternating on/off durations in milliseconds, starting with "on".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VibrationPattern(pub Vec<u32>);

impl VibrationPattern {
    pub fn pulses(durations: &[u32]) -> Self {
        Self(durations.to_vec())
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|ms| *ms == 0)
    }

    pub fn total_ms(&self) -> u32 {
        self.0.iter().sum()
    }
}

#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    /// Begins playback from the start of the source.
    async fn start(&self) -> anyhow::Result<()>;
    /// Stops playback and rewinds. Stopping a stopped handle is fine.
    async fn stop(&self) -> anyhow::Result<()>;
    fn subscribe_events(&self) -> broadcast::Receiver<PlaybackEvent>;
}

#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    async fn acquire(&self, request: PlaybackRequest) -> anyhow::Result<Arc<dyn PlaybackHandle>>;
}

pub trait HapticBackend: Send + Sync {
    /// Returns false when the platform has no vibration capability.
    fn vibrate(&self, pattern: &VibrationPattern) -> bool;
    fn cancel(&self);
}

pub struct MissingPlaybackBackend;

#[async_trait]
impl PlaybackBackend for MissingPlaybackBackend {
    async fn acquire(&self, request: PlaybackRequest) -> anyhow::Result<Arc<dyn PlaybackHandle>> {
        Err(anyhow!(
            "audio output is unavailable for trigger {}",
            request.trigger_id
        ))
    }
}

pub struct NoHaptics;

impl HapticBackend for NoHaptics {
    fn vibrate(&self, _pattern: &VibrationPattern) -> bool {
        false
    }

    fn cancel(&self) {}
}
