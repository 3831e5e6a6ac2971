use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use reaction_core::{ProfileKind, ReactionProfile};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "reaction.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub profile: String,
    /// Overrides the profile's own decay tick when set.
    pub decay_tick_ms: Option<u64>,
    pub tone_auto_stop_ms: u64,
    /// Overrides the profile's own reaction display when set.
    pub reaction_display_ms: Option<u64>,
    pub clip_duration_ms: u64,
    pub note_duration_ms: u64,
    pub haptics_enabled: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: ProfileKind::Misophonia.to_string(),
            decay_tick_ms: None,
            tone_auto_stop_ms: 2000,
            reaction_display_ms: None,
            clip_duration_ms: 1500,
            note_duration_ms: 800,
            haptics_enabled: true,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    profile: Option<String>,
    decay_tick_ms: Option<u64>,
    tone_auto_stop_ms: Option<u64>,
    reaction_display_ms: Option<u64>,
    clip_duration_ms: Option<u64>,
    note_duration_ms: Option<u64>,
    haptics_enabled: Option<bool>,
    log_filter: Option<String>,
}

/// Defaults, then the TOML file, then environment overrides.
///
/// An explicitly requested file must exist; the default file is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if required => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.profile {
        settings.profile = v;
    }
    if let Some(v) = file.decay_tick_ms {
        settings.decay_tick_ms = Some(v);
    }
    if let Some(v) = file.tone_auto_stop_ms {
        settings.tone_auto_stop_ms = v;
    }
    if let Some(v) = file.reaction_display_ms {
        settings.reaction_display_ms = Some(v);
    }
    if let Some(v) = file.clip_duration_ms {
        settings.clip_duration_ms = v;
    }
    if let Some(v) = file.note_duration_ms {
        settings.note_duration_ms = v;
    }
    if let Some(v) = file.haptics_enabled {
        settings.haptics_enabled = v;
    }
    if let Some(v) = file.log_filter {
        settings.log_filter = v;
    }
    Ok(())
}

fn env_value(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(&format!("APP__{name}")).or_else(|| lookup(&format!("REACTION_{name}")))
}

fn env_number(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    env_value(lookup, name).and_then(|v| v.trim().parse().ok())
}

pub(crate) fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env_value(&lookup, "PROFILE") {
        settings.profile = v;
    }
    if let Some(v) = env_number(&lookup, "DECAY_TICK_MS") {
        settings.decay_tick_ms = Some(v);
    }
    if let Some(v) = env_number(&lookup, "TONE_AUTO_STOP_MS") {
        settings.tone_auto_stop_ms = v;
    }
    if let Some(v) = env_number(&lookup, "REACTION_DISPLAY_MS") {
        settings.reaction_display_ms = Some(v);
    }
    if let Some(v) = env_number(&lookup, "CLIP_DURATION_MS") {
        settings.clip_duration_ms = v;
    }
    if let Some(v) = env_number(&lookup, "NOTE_DURATION_MS") {
        settings.note_duration_ms = v;
    }
    if let Some(v) = env_value(&lookup, "HAPTICS_ENABLED") {
        if let Ok(parsed) = v.trim().parse::<bool>() {
            settings.haptics_enabled = parsed;
        }
    }
    if let Some(v) = env_value(&lookup, "LOG_FILTER") {
        settings.log_filter = v;
    }
}

impl Settings {
    pub fn profile_kind(&self) -> anyhow::Result<ProfileKind> {
        self.profile.parse::<ProfileKind>().map_err(anyhow::Error::msg)
    }

    pub fn build_profile(&self) -> anyhow::Result<ReactionProfile> {
        let kind = self.profile_kind()?;
        let mut profile = ReactionProfile::build(kind)?
            .with_tone_auto_stop(Duration::from_millis(self.tone_auto_stop_ms));
        if let Some(ms) = self.decay_tick_ms {
            profile = profile.with_decay_tick(Duration::from_millis(ms))?;
        }
        if let Some(ms) = self.reaction_display_ms {
            profile = profile.with_reaction_display(Some(Duration::from_millis(ms)));
        }
        Ok(profile)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
