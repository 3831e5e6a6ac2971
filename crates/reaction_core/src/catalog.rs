//! Static trigger tables and the profiles built from them.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    str::FromStr,
    time::Duration,
};

use shared::{
    domain::{Intensity, ResourceDescriptor, Trigger, TriggerId},
    error::CatalogError,
};

use crate::{
    controller::{ControllerConfig, IntensityRule},
    decay::{DecayPolicy, DecayTimer, DEFAULT_DECAY_TICK},
};

pub const REACTION_DISPLAY: Duration = Duration::from_millis(2000);
pub const NOTE_BURST_DISPLAY: Duration = Duration::from_millis(3000);
pub const TOUCH_REACTION_DISPLAY: Duration = Duration::from_millis(5000);
pub const TOUCH_DECAY_TICK: Duration = Duration::from_millis(200);

const TONE_TABLE: [(u16, &str, &str); 8] = [
    (120, "C", "#FF5733"),
    (130, "D", "#FFC300"),
    (140, "E", "#DAF7A6"),
    (150, "F", "#33FF57"),
    (160, "G", "#33FFC4"),
    (170, "A", "#33A2FF"),
    (180, "B", "#9033FF"),
    (190, "C", "#FF33E6"),
];

const MISOPHONIA_TABLE: [(&str, &str, &str, u32, &str); 4] = [
    ("chewing", "Chewing", "/sounds/chewing.mp3", 30, "#FF6B6B"),
    ("pen-clicking", "Pen Clicking", "/sounds/pen-clicking.mp3", 20, "#4ECDC4"),
    ("sniffling", "Sniffling", "/sounds/sniffling.mp3", 25, "#FFD166"),
    ("keyboard", "Keyboard", "/sounds/keyboard.mp3", 15, "#06D6A0"),
];

const TOUCH_TABLE: [(&str, &str, u32, &str); 8] = [
    ("Hand", "Tingling in your palm", 30, "#FF6B6B"),
    ("Shoulder", "Light pressure on your shoulder", 25, "#4ECDC4"),
    ("Cheek", "Gentle brush against your cheek", 35, "#FFD166"),
    ("Back", "Warmth spreading across your back", 20, "#06D6A0"),
    ("Forehead", "Cool sensation on your brow", 28, "#A64DFF"),
    ("Foot", "Light tickle on your sole", 22, "#FF8E4D"),
    ("Arm", "Goosebumps along your arm", 26, "#4D8EFF"),
    ("Leg", "Mild vibration in your thigh", 24, "#4DFF8E"),
];

const NOTE_KEYS: &str = "abcdefghijklmnopqrstuvwxyz !";
const FIRST_NOTE: u8 = 60;
const NOTE_SPAN: f32 = 27.0;

pub fn tone_triggers() -> Vec<Trigger> {
    TONE_TABLE
        .iter()
        .map(|(hz, note, color)| Trigger::tone(note, *hz, color))
        .collect()
}

pub fn misophonia_triggers() -> Result<Vec<Trigger>, CatalogError> {
    MISOPHONIA_TABLE
        .iter()
        .map(|(id, label, path, intensity, color)| {
            Trigger::clip(id, label, path, *intensity, color)
        })
        .collect()
}

pub fn touch_triggers() -> Result<Vec<Trigger>, CatalogError> {
    TOUCH_TABLE
        .iter()
        .map(|(body_part, sensation, intensity, color)| {
            Trigger::touch(body_part, sensation, *intensity, color)
        })
        .collect()
}

pub fn note_trigger_id(midi: u8) -> TriggerId {
    TriggerId(format!("note-{midi}"))
}

/// Hue in degrees for a note, spreading the keyboard range over the wheel.
pub fn note_hue(midi: u8) -> f32 {
    f32::from(midi.saturating_sub(FIRST_NOTE)) / NOTE_SPAN * 360.0
}

pub fn note_triggers() -> Vec<Trigger> {
    (0..NOTE_KEYS.chars().count())
        .map(|offset| {
            let midi = FIRST_NOTE + offset as u8;
            Trigger {
                id: note_trigger_id(midi),
                label: format!("MIDI {midi}"),
                color: format!("hsl({:.0}, 80%, 50%)", note_hue(midi)),
                intensity: Intensity::ZERO,
                resource: ResourceDescriptor::Note { midi },
            }
        })
        .collect()
}

pub fn note_key_bindings() -> Vec<(char, TriggerId)> {
    NOTE_KEYS
        .chars()
        .enumerate()
        .map(|(offset, key)| (key, note_trigger_id(FIRST_NOTE + offset as u8)))
        .collect()
}

/// Rejects empty catalogs and repeated ids. Intensities are range-checked
/// when each trigger is built from its table row.
pub fn validate_triggers(triggers: &[Trigger]) -> Result<(), CatalogError> {
    if triggers.is_empty() {
        return Err(CatalogError::Empty);
    }
    let mut seen = HashSet::new();
    for trigger in triggers {
        if !seen.insert(&trigger.id) {
            return Err(CatalogError::DuplicateTrigger(trigger.id.clone()));
        }
    }
    Ok(())
}

/// Keyboard bindings checked against a catalog once, at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    bindings: BTreeMap<char, TriggerId>,
}

impl KeyMap {
    pub fn new(
        bindings: impl IntoIterator<Item = (char, TriggerId)>,
        triggers: &[Trigger],
    ) -> Result<Self, CatalogError> {
        let known: HashSet<&TriggerId> = triggers.iter().map(|t| &t.id).collect();
        let mut map = BTreeMap::new();
        for (key, target) in bindings {
            let key = key.to_ascii_lowercase();
            if !known.contains(&target) {
                return Err(CatalogError::UnknownKeyTarget { key, target });
            }
            if map.insert(key, target).is_some() {
                return Err(CatalogError::DuplicateKey { key });
            }
        }
        Ok(Self { bindings: map })
    }

    /// Case-insensitive lookup.
    pub fn resolve(&self, key: char) -> Option<&TriggerId> {
        self.bindings.get(&key.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    /// Press-and-hold tones with vibration cues.
    AuditoryTactile,
    /// Trigger sounds driving the stress meter.
    Misophonia,
    /// Keyboard notes with color bursts.
    Chromesthesia,
    /// Observed touches mirrored as a fading sensation.
    MirrorTouch,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 4] = [
        ProfileKind::AuditoryTactile,
        ProfileKind::Misophonia,
        ProfileKind::Chromesthesia,
        ProfileKind::MirrorTouch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileKind::AuditoryTactile => "auditory-tactile",
            ProfileKind::Misophonia => "misophonia",
            ProfileKind::Chromesthesia => "chromesthesia",
            ProfileKind::MirrorTouch => "mirror-touch",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ProfileKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown profile '{s}'"))
    }
}

/// How a start is acknowledged on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionMode {
    /// One message about the latest trigger; each start re-arms its timer.
    Message,
    /// Every start adds its own burst with its own expiry.
    Bursts,
}

/// One panel's worth of triggers plus the policies that drive it.
#[derive(Debug, Clone)]
pub struct ReactionProfile {
    pub kind: ProfileKind,
    pub triggers: Vec<Trigger>,
    pub key_map: Option<KeyMap>,
    pub decay: DecayTimer,
    pub reaction_display: Option<Duration>,
    pub reaction_mode: ReactionMode,
    pub controller: ControllerConfig,
}

impl ReactionProfile {
    pub fn build(kind: ProfileKind) -> Result<Self, CatalogError> {
        let mut controller = ControllerConfig::default();
        let mut tick = DEFAULT_DECAY_TICK;
        let mut reaction_mode = ReactionMode::Message;
        let (triggers, policy, reaction_display) = match kind {
            ProfileKind::AuditoryTactile => (tone_triggers(), DecayPolicy::Unconditional, None),
            ProfileKind::Misophonia => (
                misophonia_triggers()?,
                DecayPolicy::FreezeWhilePlaying,
                Some(REACTION_DISPLAY),
            ),
            ProfileKind::Chromesthesia => {
                reaction_mode = ReactionMode::Bursts;
                (
                    note_triggers(),
                    DecayPolicy::Unconditional,
                    Some(NOTE_BURST_DISPLAY),
                )
            }
            ProfileKind::MirrorTouch => {
                controller.intensity_rule = IntensityRule::Set;
                tick = TOUCH_DECAY_TICK;
                (
                    touch_triggers()?,
                    DecayPolicy::Unconditional,
                    Some(TOUCH_REACTION_DISPLAY),
                )
            }
        };
        validate_triggers(&triggers)?;

        let key_map = match kind {
            ProfileKind::Chromesthesia => Some(KeyMap::new(note_key_bindings(), &triggers)?),
            _ => None,
        };

        Ok(Self {
            kind,
            triggers,
            key_map,
            decay: DecayTimer::new(policy, tick)?,
            reaction_display,
            reaction_mode,
            controller,
        })
    }

    pub fn with_decay_tick(mut self, interval: Duration) -> Result<Self, CatalogError> {
        self.decay = DecayTimer::new(self.decay.policy(), interval)?;
        Ok(self)
    }

    pub fn with_reaction_display(mut self, display: Option<Duration>) -> Self {
        if self.reaction_display.is_some() {
            self.reaction_display = display.filter(|d| !d.is_zero());
        }
        self
    }

    pub fn with_tone_auto_stop(mut self, after: Duration) -> Self {
        self.controller.tone_auto_stop = after;
        self
    }

    pub fn trigger(&self, id: &TriggerId) -> Option<&Trigger> {
        self.triggers.iter().find(|t| &t.id == id)
    }

    pub fn trigger_for_key(&self, key: char) -> Option<&Trigger> {
        let id = self.key_map.as_ref()?.resolve(key)?;
        self.trigger(id)
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
