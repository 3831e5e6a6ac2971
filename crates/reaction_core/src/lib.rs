use std::{collections::VecDeque, sync::Arc, time::Duration};

use playback_backend::{HapticBackend, PlaybackBackend, PlaybackEvent};
use shared::{
    domain::TriggerId,
    error::SessionError,
    protocol::{Gesture, ReactionPhase, ReactionSnapshot},
};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

pub mod catalog;
pub mod controller;
pub mod decay;

pub use catalog::{KeyMap, ProfileKind, ReactionMode, ReactionProfile};
pub use controller::{
    ActiveHandle, ControllerConfig, IntensityRule, PlaybackController, StartedPlayback,
};
pub use decay::{DecayPolicy, DecayTimer};

const INBOX_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum Command {
    Start(TriggerId),
    Stop(TriggerId),
    StopAll,
}

enum SessionInput {
    Command {
        command: Command,
        reply: oneshot::Sender<ReactionSnapshot>,
    },
    PlaybackEnded {
        trigger: TriggerId,
        generation: u64,
    },
    AutoStop {
        trigger: TriggerId,
        generation: u64,
    },
    HideReaction {
        generation: u64,
    },
    ExpireBurst {
        burst: u64,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Timers that belong to the playback currently on air.
#[derive(Default)]
struct PlaybackTimers {
    auto_stop: Option<JoinHandle<()>>,
    ended_watch: Option<JoinHandle<()>>,
}

impl PlaybackTimers {
    fn cancel(&mut self) {
        if let Some(task) = self.auto_stop.take() {
            task.abort();
        }
        if let Some(task) = self.ended_watch.take() {
            task.abort();
        }
    }
}

struct LiveBurst {
    id: u64,
    trigger: TriggerId,
    expiry: JoinHandle<()>,
}

/// Single owner of one panel's playback state. Runs as one task and
/// processes user gestures, decay ticks and timer deadlines in arrival order.
pub struct ReactionSession {
    profile: Arc<ReactionProfile>,
    controller: PlaybackController,
    inbox: mpsc::WeakSender<SessionInput>,
    snapshots: watch::Sender<ReactionSnapshot>,
    timers: PlaybackTimers,
    hide_task: Option<JoinHandle<()>>,
    reaction_visible: bool,
    reaction_trigger: Option<TriggerId>,
    reaction_generation: u64,
    bursts: VecDeque<LiveBurst>,
    next_burst: u64,
}

impl ReactionSession {
    pub fn spawn(
        profile: ReactionProfile,
        backend: Arc<dyn PlaybackBackend>,
        haptics: Arc<dyn HapticBackend>,
    ) -> ReactionSessionHandle {
        let profile = Arc::new(profile);
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let (snapshots, snapshot_rx) = watch::channel(ReactionSnapshot::default());

        let session = Self {
            profile: Arc::clone(&profile),
            controller: PlaybackController::new(backend, haptics, profile.controller.clone()),
            inbox: inbox_tx.downgrade(),
            snapshots,
            timers: PlaybackTimers::default(),
            hide_task: None,
            reaction_visible: false,
            reaction_trigger: None,
            reaction_generation: 0,
            bursts: VecDeque::new(),
            next_burst: 0,
        };
        info!(profile = %profile.kind, "reaction: session started");
        tokio::spawn(session.run(inbox_rx));

        ReactionSessionHandle {
            inbox: inbox_tx,
            snapshots: snapshot_rx,
            profile,
        }
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<SessionInput>) {
        let period = self.profile.decay.interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown_reply = loop {
            tokio::select! {
                input = inbox.recv() => match input {
                    Some(SessionInput::Shutdown { reply }) => break Some(reply),
                    Some(input) => self.handle(input).await,
                    None => break None,
                },
                _ = ticker.tick() => {
                    if self.controller.relax(&self.profile.decay) {
                        self.publish();
                    }
                }
            }
        };

        self.teardown().await;
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    async fn handle(&mut self, input: SessionInput) {
        match input {
            SessionInput::Command { command, reply } => {
                match command {
                    Command::Start(id) => self.start(&id).await,
                    Command::Stop(id) => {
                        if self.controller.stop(&id).await {
                            self.timers.cancel();
                        }
                    }
                    Command::StopAll => {
                        self.controller.stop_all().await;
                        self.timers.cancel();
                    }
                }
                self.publish();
                let _ = reply.send(self.snapshot());
            }
            SessionInput::PlaybackEnded {
                trigger,
                generation,
            }
            | SessionInput::AutoStop {
                trigger,
                generation,
            } => {
                if self.controller.finish(&trigger, generation).await {
                    self.timers.cancel();
                    self.publish();
                }
            }
            SessionInput::HideReaction { generation } => {
                if generation == self.reaction_generation && self.reaction_visible {
                    self.reaction_visible = false;
                    self.reaction_trigger = None;
                    self.hide_task = None;
                    self.publish();
                }
            }
            SessionInput::ExpireBurst { burst } => {
                let before = self.bursts.len();
                self.bursts.retain(|live| live.id != burst);
                if self.bursts.len() != before {
                    self.publish();
                }
            }
            SessionInput::Shutdown { .. } => {}
        }
    }

    async fn start(&mut self, id: &TriggerId) {
        let Some(trigger) = self.profile.trigger(id).cloned() else {
            warn!(trigger = %id, "reaction: unknown trigger ignored");
            return;
        };

        self.timers.cancel();
        let Some(StartedPlayback {
            generation,
            events,
            auto_stop_after,
        }) = self.controller.start(&trigger).await
        else {
            return;
        };

        self.timers.ended_watch = Some(self.watch_ended(trigger.id.clone(), generation, events));
        if let Some(after) = auto_stop_after {
            let input = SessionInput::AutoStop {
                trigger: trigger.id.clone(),
                generation,
            };
            self.timers.auto_stop = Some(self.schedule(after, input));
        }
        if let Some(display) = self.profile.reaction_display {
            match self.profile.reaction_mode {
                ReactionMode::Message => self.show_reaction(trigger.id, display),
                ReactionMode::Bursts => self.add_burst(trigger.id, display),
            }
        }
    }

    fn watch_ended(
        &self,
        trigger: TriggerId,
        generation: u64,
        mut events: broadcast::Receiver<PlaybackEvent>,
    ) -> JoinHandle<()> {
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PlaybackEvent::Ended) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox
                    .send(SessionInput::PlaybackEnded {
                        trigger,
                        generation,
                    })
                    .await;
            }
        })
    }

    fn schedule(&self, after: Duration, input: SessionInput) -> JoinHandle<()> {
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            time::sleep(after).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(input).await;
            }
        })
    }

    fn show_reaction(&mut self, trigger: TriggerId, display: Duration) {
        if let Some(task) = self.hide_task.take() {
            task.abort();
        }
        self.reaction_generation += 1;
        self.reaction_visible = true;
        self.reaction_trigger = Some(trigger);
        let input = SessionInput::HideReaction {
            generation: self.reaction_generation,
        };
        self.hide_task = Some(self.schedule(display, input));
    }

    fn add_burst(&mut self, trigger: TriggerId, display: Duration) {
        let id = self.next_burst;
        self.next_burst += 1;
        let expiry = self.schedule(display, SessionInput::ExpireBurst { burst: id });
        self.bursts.push_back(LiveBurst {
            id,
            trigger,
            expiry,
        });
    }

    fn snapshot(&self) -> ReactionSnapshot {
        let intensity = self.controller.intensity();
        let active_trigger = self.controller.active_trigger().cloned();
        let bursts: Vec<TriggerId> = self.bursts.iter().map(|b| b.trigger.clone()).collect();
        let (reaction_visible, reaction_trigger) = match self.profile.reaction_mode {
            ReactionMode::Message => (self.reaction_visible, self.reaction_trigger.clone()),
            ReactionMode::Bursts => (!bursts.is_empty(), bursts.last().cloned()),
        };
        ReactionSnapshot {
            phase: ReactionPhase::derive(active_trigger.is_some(), intensity),
            intensity,
            active_trigger,
            reaction_visible,
            reaction_trigger,
            bursts,
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    async fn teardown(&mut self) {
        self.timers.cancel();
        if let Some(task) = self.hide_task.take() {
            task.abort();
        }
        for burst in self.bursts.drain(..) {
            burst.expiry.abort();
        }
        self.controller.shutdown().await;
        self.reaction_visible = false;
        self.reaction_trigger = None;
        self.publish();
        info!(profile = %self.profile.kind, "reaction: session closed");
    }
}

/// Cloneable front door to a running [`ReactionSession`].
#[derive(Clone)]
pub struct ReactionSessionHandle {
    inbox: mpsc::Sender<SessionInput>,
    snapshots: watch::Receiver<ReactionSnapshot>,
    profile: Arc<ReactionProfile>,
}

impl ReactionSessionHandle {
    pub fn profile(&self) -> &ReactionProfile {
        &self.profile
    }

    pub fn snapshot(&self) -> ReactionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReactionSnapshot> {
        self.snapshots.clone()
    }

    pub async fn start(&self, id: impl Into<TriggerId>) -> Result<ReactionSnapshot, SessionError> {
        let id = id.into();
        if self.profile.trigger(&id).is_none() {
            return Err(SessionError::UnknownTrigger(id));
        }
        self.command(Command::Start(id)).await
    }

    pub async fn stop(&self, id: impl Into<TriggerId>) -> Result<ReactionSnapshot, SessionError> {
        self.command(Command::Stop(id.into())).await
    }

    pub async fn stop_all(&self) -> Result<ReactionSnapshot, SessionError> {
        self.command(Command::StopAll).await
    }

    /// Starts whatever the profile's key map binds `key` to. Unbound keys
    /// leave the session untouched.
    pub async fn press_key(&self, key: char) -> Result<ReactionSnapshot, SessionError> {
        match self.profile.trigger_for_key(key) {
            Some(trigger) => self.command(Command::Start(trigger.id.clone())).await,
            None => {
                debug!(key = ?key, "reaction: unbound key");
                Ok(self.snapshot())
            }
        }
    }

    pub async fn apply(&self, gesture: &Gesture) -> Result<ReactionSnapshot, SessionError> {
        match gesture {
            Gesture::Press { trigger } => self.start(trigger.clone()).await,
            Gesture::Release { trigger } => self.stop(trigger.clone()).await,
            Gesture::ReleaseAll => self.stop_all().await,
            Gesture::Key { key } => self.press_key(*key).await,
            Gesture::Wait { ms } => {
                time::sleep(Duration::from_millis(*ms)).await;
                Ok(self.snapshot())
            }
        }
    }

    /// Stops all playback, cancels timers and waits for the session to exit.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (reply, done) = oneshot::channel();
        self.inbox
            .send(SessionInput::Shutdown { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)
    }

    async fn command(&self, command: Command) -> Result<ReactionSnapshot, SessionError> {
        let (reply, done) = oneshot::channel();
        self.inbox
            .send(SessionInput::Command { command, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)
    }
}

#[cfg(test)]
#[path = "tests/fakes.rs"]
pub(crate) mod fakes;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
