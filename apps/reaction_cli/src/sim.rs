//! Console stand-ins for the audio and vibration hardware.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use playback_backend::{
    HapticBackend, PlaybackBackend, PlaybackEvent, PlaybackHandle, PlaybackRequest,
    VibrationPattern,
};
use shared::domain::ResourceDescriptor;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};
use tracing::info;

pub struct SimulatedBackend {
    clip_duration: Duration,
    note_duration: Duration,
}

impl SimulatedBackend {
    pub fn new(clip_duration: Duration, note_duration: Duration) -> Self {
        Self {
            clip_duration,
            note_duration,
        }
    }
}

#[async_trait]
impl PlaybackBackend for SimulatedBackend {
    async fn acquire(&self, request: PlaybackRequest) -> anyhow::Result<Arc<dyn PlaybackHandle>> {
        let length = match &request.resource {
            ResourceDescriptor::Tone { .. } | ResourceDescriptor::Touch { .. } => None,
            ResourceDescriptor::Clip { .. } => Some(self.clip_duration),
            ResourceDescriptor::Note { .. } => Some(self.note_duration),
        };
        let (events, _) = broadcast::channel(4);
        info!(
            trigger = %request.trigger_id,
            volume = request.volume,
            pan = request.pan,
            "sim: resource acquired"
        );
        Ok(Arc::new(SimulatedHandle {
            request,
            length,
            events,
            playing: Mutex::new(None),
        }))
    }
}

pub struct SimulatedHandle {
    request: PlaybackRequest,
    /// `None` sustains until stopped.
    length: Option<Duration>,
    events: broadcast::Sender<PlaybackEvent>,
    playing: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl PlaybackHandle for SimulatedHandle {
    async fn start(&self) -> anyhow::Result<()> {
        let mut playing = self.playing.lock().await;
        if let Some(previous) = playing.take() {
            previous.abort();
        }
        info!(trigger = %self.request.trigger_id, resource = ?self.request.resource, "sim: playing");

        if let Some(length) = self.length {
            let events = self.events.clone();
            *playing = Some(tokio::spawn(async move {
                time::sleep(length).await;
                let _ = events.send(PlaybackEvent::Ended);
            }));
        }
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some(task) = self.playing.lock().await.take() {
            task.abort();
        }
        info!(trigger = %self.request.trigger_id, "sim: silenced");
        Ok(())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }
}

pub struct ConsoleHaptics;

impl HapticBackend for ConsoleHaptics {
    fn vibrate(&self, pattern: &VibrationPattern) -> bool {
        info!(pattern = ?pattern.0, total_ms = pattern.total_ms(), "sim: vibrate");
        true
    }

    fn cancel(&self) {
        info!("sim: vibration cancelled");
    }
}

#[cfg(test)]
#[path = "tests/sim_tests.rs"]
mod tests;
