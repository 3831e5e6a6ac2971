use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use playback_backend::{HapticBackend, NoHaptics};
use reaction_core::{ProfileKind, ReactionProfile, ReactionSession, ReactionSessionHandle};
use shared::{
    domain::{ResourceDescriptor, TriggerId},
    error::SessionError,
    protocol::{Gesture, ReactionSnapshot},
    stress::{reaction_line, StressBand},
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod sim;

use config::load_settings;
use sim::{ConsoleHaptics, SimulatedBackend};

#[derive(Parser, Debug)]
#[command(about = "Drive a synesthesia reaction panel from the terminal")]
struct Cli {
    /// TOML settings file (defaults to ./reaction.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// auditory-tactile, misophonia, chromesthesia or mirror-touch.
    #[arg(long)]
    profile: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the profile's triggers.
    List,
    /// Press one trigger, hold it, release it, then watch the decay.
    Play {
        trigger: String,
        #[arg(long, default_value_t = 500)]
        hold_ms: u64,
        #[arg(long, default_value_t = 3000)]
        linger_ms: u64,
    },
    /// Type text into a profile with a key map.
    Type {
        text: String,
        #[arg(long, default_value_t = 250)]
        gap_ms: u64,
    },
    /// Replay a JSON array of gestures.
    Replay { script: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(profile) = cli.profile {
        settings.profile = profile;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let profile = settings.build_profile()?;
    if let Command::List = cli.command {
        print_triggers(&profile);
        return Ok(());
    }

    let backend = Arc::new(SimulatedBackend::new(
        Duration::from_millis(settings.clip_duration_ms),
        Duration::from_millis(settings.note_duration_ms),
    ));
    let haptics: Arc<dyn HapticBackend> = if settings.haptics_enabled {
        Arc::new(ConsoleHaptics)
    } else {
        Arc::new(NoHaptics)
    };
    let session = ReactionSession::spawn(profile, backend, haptics);
    let presenter = spawn_presenter(&session);

    let outcome = match cli.command {
        Command::List => Ok(()),
        Command::Play {
            trigger,
            hold_ms,
            linger_ms,
        } => {
            let trigger = TriggerId(trigger);
            let script = vec![
                Gesture::Press {
                    trigger: trigger.clone(),
                },
                Gesture::Wait { ms: hold_ms },
                Gesture::Release { trigger },
                Gesture::Wait { ms: linger_ms },
            ];
            replay(&session, &script).await
        }
        Command::Type { text, gap_ms } => {
            let script: Vec<Gesture> = text
                .chars()
                .flat_map(|key| [Gesture::Key { key }, Gesture::Wait { ms: gap_ms }])
                .collect();
            replay(&session, &script).await
        }
        Command::Replay { script } => {
            let raw = tokio::fs::read_to_string(&script)
                .await
                .with_context(|| format!("failed to read script '{}'", script.display()))?;
            let gestures: Vec<Gesture> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid gesture script '{}'", script.display()))?;
            replay(&session, &gestures).await
        }
    };

    session.shutdown().await?;
    presenter.abort();
    outcome
}

async fn replay(session: &ReactionSessionHandle, script: &[Gesture]) -> Result<()> {
    for gesture in script {
        match session.apply(gesture).await {
            Ok(_) => {}
            Err(SessionError::UnknownTrigger(id)) => {
                warn!(trigger = %id, "skipping gesture for unknown trigger");
            }
            Err(err) => return Err(err.into()),
        }
    }
    info!(steps = script.len(), "script finished");
    Ok(())
}

fn print_triggers(profile: &ReactionProfile) {
    println!("profile: {}", profile.kind);
    for trigger in &profile.triggers {
        println!(
            "  {:<14} {:<14} intensity={:<4} {}",
            trigger.id.as_str(),
            trigger.label,
            trigger.intensity.value(),
            trigger.color
        );
    }
}

/// Prints every snapshot change, the way a UI would re-render.
fn spawn_presenter(session: &ReactionSessionHandle) -> JoinHandle<()> {
    let mut updates: watch::Receiver<ReactionSnapshot> = session.subscribe();
    let profile = session.profile().clone();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            println!("{}", render(&profile, &snapshot));
        }
    })
}

fn render(profile: &ReactionProfile, snapshot: &ReactionSnapshot) -> String {
    let active = snapshot
        .active_trigger
        .as_ref()
        .and_then(|id| profile.trigger(id));
    let mut line = format!(
        "{:?} intensity={} active={}",
        snapshot.phase,
        snapshot.intensity,
        active.map(|t| t.label.as_str()).unwrap_or("none")
    );

    let reacting_to = snapshot
        .reaction_trigger
        .as_ref()
        .filter(|_| snapshot.reaction_visible)
        .and_then(|id| profile.trigger(id));
    match profile.kind {
        ProfileKind::Misophonia => {
            let band = StressBand::of(snapshot.intensity);
            line.push_str(&format!(" | {}", band.headline()));
            if let Some(trigger) = reacting_to {
                line.push_str(&format!(" | {}", reaction_line(&trigger.label, snapshot.intensity)));
            }
            if let Some(tip) = band.coping_suggestion() {
                line.push_str(&format!(" | tip: {tip}"));
            }
        }
        ProfileKind::MirrorTouch => {
            if let Some(trigger) = reacting_to {
                if let ResourceDescriptor::Touch { sensation } = &trigger.resource {
                    line.push_str(&format!(
                        " | watching {} touch evokes: {sensation}",
                        trigger.label.to_lowercase()
                    ));
                }
            }
        }
        ProfileKind::Chromesthesia => {
            let colors: Vec<&str> = snapshot
                .bursts
                .iter()
                .filter_map(|id| profile.trigger(id))
                .map(|t| t.color.as_str())
                .collect();
            if !colors.is_empty() {
                line.push_str(&format!(" | bursts: {}", colors.join(" ")));
            }
        }
        ProfileKind::AuditoryTactile => {}
    }
    line
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
