//! Stress-meter bands read by the presenter.

use serde::{Deserialize, Serialize};

use crate::domain::Intensity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressBand {
    Calm,
    Uncomfortable,
    Overwhelmed,
}

impl StressBand {
    pub fn of(intensity: Intensity) -> Self {
        match intensity.value() {
            v if v > 75 => StressBand::Overwhelmed,
            v if v > 50 => StressBand::Uncomfortable,
            _ => StressBand::Calm,
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            StressBand::Overwhelmed => "Overwhelmed by trigger sounds",
            StressBand::Uncomfortable => "These sounds are uncomfortable",
            StressBand::Calm => "Select a trigger sound to experience",
        }
    }

    pub fn coping_suggestion(self) -> Option<&'static str> {
        match self {
            StressBand::Overwhelmed => Some("Try deep breathing (4-7-8 technique)"),
            StressBand::Uncomfortable => Some("Consider using noise-cancelling headphones"),
            StressBand::Calm => None,
        }
    }
}

pub fn reaction_line(trigger_label: &str, intensity: Intensity) -> String {
    match StressBand::of(intensity) {
        StressBand::Overwhelmed => {
            format!("Can't stand this {}!", trigger_label.to_lowercase())
        }
        _ => format!("{trigger_label} is triggering!"),
    }
}
