use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, InvalidIntensity};

/// Upper bound of the perceptual-load scale.
pub const MAX_INTENSITY: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(pub String);

impl TriggerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TriggerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Accumulated perceptual load, always within `0..=MAX_INTENSITY`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Intensity(u8);

impl Intensity {
    pub const ZERO: Intensity = Intensity(0);
    pub const MAX: Intensity = Intensity(MAX_INTENSITY);

    /// Clamps into range instead of rejecting.
    pub fn saturating(value: u32) -> Self {
        Self(value.min(MAX_INTENSITY as u32) as u8)
    }

    /// `None` when `value` is above the scale maximum.
    pub fn try_new(value: u32) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_INTENSITY)
            .map(Self)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn raised_by(self, amount: Intensity) -> Self {
        Self::saturating(self.0 as u32 + amount.0 as u32)
    }

    pub fn lowered_by(self, amount: u8) -> Self {
        Self(self.0.saturating_sub(amount))
    }
}

impl TryFrom<u32> for Intensity {
    type Error = InvalidIntensity;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or(InvalidIntensity(value))
    }
}

impl From<Intensity> for u32 {
    fn from(value: Intensity) -> Self {
        value.0.into()
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDescriptor {
    /// Synthesized sine oscillator.
    Tone { frequency_hz: f32 },
    /// Pre-recorded sample on disk or behind a URL path.
    Clip { path: PathBuf },
    /// A single instrument note, MIDI numbering.
    Note { midi: u8 },
    /// An observed touch; silent, carries the mirrored sensation.
    Touch { sensation: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Tone,
    Clip,
    Note,
    Touch,
}

impl ResourceDescriptor {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceDescriptor::Tone { .. } => ResourceKind::Tone,
            ResourceDescriptor::Clip { .. } => ResourceKind::Clip,
            ResourceDescriptor::Note { .. } => ResourceKind::Note,
            ResourceDescriptor::Touch { .. } => ResourceKind::Touch,
        }
    }
}

impl ResourceKind {
    /// Whether one acquired handle may be restarted across plays.
    pub fn is_poolable(self) -> bool {
        matches!(self, ResourceKind::Clip)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: TriggerId,
    pub label: String,
    pub color: String,
    pub intensity: Intensity,
    pub resource: ResourceDescriptor,
}

impl Trigger {
    pub fn tone(label: &str, frequency_hz: u16, color: &str) -> Self {
        Self {
            id: TriggerId(format!("tone-{frequency_hz}")),
            label: label.to_string(),
            color: color.to_string(),
            intensity: Intensity::ZERO,
            resource: ResourceDescriptor::Tone {
                frequency_hz: f32::from(frequency_hz),
            },
        }
    }

    pub fn clip(
        id: &str,
        label: &str,
        path: &str,
        intensity: u32,
        color: &str,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            id: TriggerId::from(id),
            label: label.to_string(),
            color: color.to_string(),
            intensity: table_intensity(id, intensity)?,
            resource: ResourceDescriptor::Clip { path: path.into() },
        })
    }

    pub fn touch(
        body_part: &str,
        sensation: &str,
        intensity: u32,
        color: &str,
    ) -> Result<Self, CatalogError> {
        let id = format!("touch-{}", body_part.to_ascii_lowercase());
        Ok(Self {
            intensity: table_intensity(&id, intensity)?,
            id: TriggerId(id),
            label: body_part.to_string(),
            color: color.to_string(),
            resource: ResourceDescriptor::Touch {
                sensation: sensation.to_string(),
            },
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }
}

fn table_intensity(id: &str, raw: u32) -> Result<Intensity, CatalogError> {
    Intensity::try_new(raw).ok_or_else(|| CatalogError::IntensityOutOfRange {
        id: TriggerId::from(id),
        intensity: raw,
    })
}
