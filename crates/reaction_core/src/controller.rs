use std::{collections::HashMap, sync::Arc, time::Duration};

use playback_backend::{
    HapticBackend, PlaybackBackend, PlaybackEvent, PlaybackHandle, PlaybackRequest,
    VibrationPattern,
};
use rand::Rng;
use shared::{
    domain::{Intensity, ResourceKind, Trigger, TriggerId},
    error::PlaybackError,
};
use tokio::{sync::broadcast, time::Instant};
use tracing::{debug, info, warn};

use crate::decay::DecayTimer;

pub const TONE_AUTO_STOP: Duration = Duration::from_millis(2000);
const TONE_VOLUME: f32 = 0.1;
const CLIP_VOLUME: f32 = 0.5;
/// Velocity 80 of 127.
const NOTE_VOLUME: f32 = 0.63;
const TONE_VIBRATION: [u32; 5] = [10, 20, 10, 20, 10];

/// How a start moves the intensity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntensityRule {
    /// Adds the trigger's contribution, capped at the maximum.
    #[default]
    Add,
    /// Replaces the level with the trigger's intensity.
    Set,
}

impl IntensityRule {
    pub fn apply(self, current: Intensity, contribution: Intensity) -> Intensity {
        match self {
            IntensityRule::Add => current.raised_by(contribution),
            IntensityRule::Set => contribution,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub intensity_rule: IntensityRule,
    pub tone_auto_stop: Duration,
    pub tone_volume: f32,
    pub clip_volume: f32,
    pub note_volume: f32,
    pub tone_vibration: VibrationPattern,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            intensity_rule: IntensityRule::Add,
            tone_auto_stop: TONE_AUTO_STOP,
            tone_volume: TONE_VOLUME,
            clip_volume: CLIP_VOLUME,
            note_volume: NOTE_VOLUME,
            tone_vibration: VibrationPattern::pulses(&TONE_VIBRATION),
        }
    }
}

impl ControllerConfig {
    pub fn auto_stop_for(&self, kind: ResourceKind) -> Option<Duration> {
        match kind {
            ResourceKind::Tone => Some(self.tone_auto_stop),
            ResourceKind::Clip | ResourceKind::Note | ResourceKind::Touch => None,
        }
    }

    fn volume_for(&self, kind: ResourceKind) -> f32 {
        match kind {
            ResourceKind::Tone => self.tone_volume,
            ResourceKind::Clip => self.clip_volume,
            ResourceKind::Note => self.note_volume,
            ResourceKind::Touch => 0.0,
        }
    }

    fn vibration_for(&self, kind: ResourceKind) -> Option<&VibrationPattern> {
        match kind {
            ResourceKind::Tone if !self.tone_vibration.is_empty() => Some(&self.tone_vibration),
            _ => None,
        }
    }
}

fn pan_for(kind: ResourceKind) -> f32 {
    match kind {
        ResourceKind::Tone => rand::thread_rng().gen_range(-1.0..=1.0),
        ResourceKind::Clip | ResourceKind::Note | ResourceKind::Touch => 0.0,
    }
}

/// The single live playback, if any.
pub struct ActiveHandle {
    pub trigger: Trigger,
    pub started_at: Instant,
    pub generation: u64,
    handle: Arc<dyn PlaybackHandle>,
}

/// What the owner needs to schedule follow-up work for a fresh playback.
pub struct StartedPlayback {
    pub generation: u64,
    pub events: broadcast::Receiver<PlaybackEvent>,
    pub auto_stop_after: Option<Duration>,
}

/// Owns the audio and haptic backends. At most one handle plays at a time.
pub struct PlaybackController {
    backend: Arc<dyn PlaybackBackend>,
    haptics: Arc<dyn HapticBackend>,
    config: ControllerConfig,
    pool: HashMap<TriggerId, Arc<dyn PlaybackHandle>>,
    active: Option<ActiveHandle>,
    intensity: Intensity,
    next_generation: u64,
}

impl PlaybackController {
    pub fn new(
        backend: Arc<dyn PlaybackBackend>,
        haptics: Arc<dyn HapticBackend>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            backend,
            haptics,
            config,
            pool: HashMap::new(),
            active: None,
            intensity: Intensity::ZERO,
            next_generation: 1,
        }
    }

    pub fn active(&self) -> Option<&ActiveHandle> {
        self.active.as_ref()
    }

    pub fn active_trigger(&self) -> Option<&TriggerId> {
        self.active.as_ref().map(|a| &a.trigger.id)
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    pub fn pooled_handles(&self) -> usize {
        self.pool.len()
    }

    /// Applies one decay tick. Returns whether the level moved.
    pub fn relax(&mut self, timer: &DecayTimer) -> bool {
        let next = timer.step(self.intensity, self.is_playing());
        let moved = next != self.intensity;
        self.intensity = next;
        moved
    }

    /// Interrupts whatever is playing, then plays `trigger`.
    ///
    /// Failures are logged and leave the intensity untouched.
    pub async fn start(&mut self, trigger: &Trigger) -> Option<StartedPlayback> {
        self.stop_all().await;

        match self.begin(trigger).await {
            Ok(started) => Some(started),
            Err(err) => {
                warn!(trigger = %trigger.id, error = %err, "playback: start failed");
                None
            }
        }
    }

    async fn begin(&mut self, trigger: &Trigger) -> Result<StartedPlayback, PlaybackError> {
        let kind = trigger.kind();
        let handle = self.acquire(trigger).await?;
        let events = handle.subscribe_events();

        if let Err(err) = handle.start().await {
            // A handle that failed to start is not trusted for reuse.
            self.pool.remove(&trigger.id);
            if let Err(stop_err) = handle.stop().await {
                debug!(
                    trigger = %trigger.id,
                    error = %stop_err,
                    "playback: cleanup after failed start"
                );
            }
            return Err(PlaybackError::Start {
                id: trigger.id.clone(),
                reason: err.to_string(),
            });
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.active = Some(ActiveHandle {
            trigger: trigger.clone(),
            started_at: Instant::now(),
            generation,
            handle,
        });
        self.intensity = self
            .config
            .intensity_rule
            .apply(self.intensity, trigger.intensity);

        if let Some(pattern) = self.config.vibration_for(kind) {
            if !self.haptics.vibrate(pattern) {
                debug!(trigger = %trigger.id, "playback: haptics unavailable");
            }
        }

        info!(
            trigger = %trigger.id,
            generation,
            intensity = self.intensity.value(),
            "playback: started"
        );

        Ok(StartedPlayback {
            generation,
            events,
            auto_stop_after: self.config.auto_stop_for(kind),
        })
    }

    async fn acquire(&mut self, trigger: &Trigger) -> Result<Arc<dyn PlaybackHandle>, PlaybackError> {
        let kind = trigger.kind();
        if kind.is_poolable() {
            if let Some(handle) = self.pool.get(&trigger.id) {
                return Ok(Arc::clone(handle));
            }
        }

        let request = PlaybackRequest {
            trigger_id: trigger.id.clone(),
            resource: trigger.resource.clone(),
            volume: self.config.volume_for(kind),
            pan: pan_for(kind),
        };
        let handle = self
            .backend
            .acquire(request)
            .await
            .map_err(|err| PlaybackError::Acquire {
                id: trigger.id.clone(),
                reason: err.to_string(),
            })?;

        if kind.is_poolable() {
            self.pool.insert(trigger.id.clone(), Arc::clone(&handle));
        }
        Ok(handle)
    }

    /// Stops `id` if it is the one playing. Safe to repeat.
    pub async fn stop(&mut self, id: &TriggerId) -> bool {
        if self.active_trigger() != Some(id) {
            return false;
        }
        self.release_active().await
    }

    /// Stops the playback started as `generation`, ignoring stale deliveries.
    pub async fn finish(&mut self, id: &TriggerId, generation: u64) -> bool {
        let current = self
            .active
            .as_ref()
            .is_some_and(|a| a.generation == generation && &a.trigger.id == id);
        if !current {
            debug!(trigger = %id, generation, "playback: stale completion ignored");
            return false;
        }
        self.release_active().await
    }

    pub async fn stop_all(&mut self) {
        self.release_active().await;
        self.haptics.cancel();
    }

    /// Stops everything and drops the handle pool.
    pub async fn shutdown(&mut self) {
        self.stop_all().await;
        let released = self.pool.len();
        self.pool.clear();
        debug!(released, "playback: pool released");
    }

    async fn release_active(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        if let Err(err) = active.handle.stop().await {
            warn!(trigger = %active.trigger.id, error = %err, "playback: stop failed");
        }
        info!(
            trigger = %active.trigger.id,
            generation = active.generation,
            played_ms = active.started_at.elapsed().as_millis() as u64,
            "playback: stopped"
        );
        true
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
