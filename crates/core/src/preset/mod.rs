//! Static catalog of binaural effects.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::BinauralError;

/// Identifier of a catalog entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetId {
    #[default]
    Relaxation,
    Focus,
    Sleep,
    Meditation,
    Energy,
    Creativity,
}

impl PresetId {
    pub const ALL: [PresetId; 6] = [
        PresetId::Relaxation,
        PresetId::Focus,
        PresetId::Sleep,
        PresetId::Meditation,
        PresetId::Energy,
        PresetId::Creativity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PresetId::Relaxation => "relaxation",
            PresetId::Focus => "focus",
            PresetId::Sleep => "sleep",
            PresetId::Meditation => "meditation",
            PresetId::Energy => "energy",
            PresetId::Creativity => "creativity",
        }
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetId {
    type Err = BinauralError;

    /// Accepts either the identifier (`meditation`) or the tile title
    /// (`Meditate`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PresetId::ALL
            .into_iter()
            .find(|id| {
                id.as_str().eq_ignore_ascii_case(wanted)
                    || preset(*id).title.eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| BinauralError::UnknownPreset(wanted.to_string()))
    }
}

/// Inclusive range of beat frequencies a preset allows, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeatRange {
    pub min: f32,
    pub max: f32,
}

impl BeatRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, hz: f32) -> bool {
        hz >= self.min && hz <= self.max
    }

    pub fn clamp(&self, hz: f32) -> f32 {
        hz.clamp(self.min, self.max)
    }

    /// Position of `hz` along the range, 0 at `min` and 1 at `max`. Values
    /// outside the range extrapolate linearly.
    pub fn fraction(&self, hz: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        (hz - self.min) / span
    }
}

/// A named bundle of default tuning values representing a target state.
#[derive(Debug, Clone, Serialize)]
pub struct Preset {
    pub id: PresetId,
    pub title: &'static str,
    pub subtitle: &'static str,
    /// Name of the glyph shown on the tile.
    pub icon: &'static str,
    pub color: &'static str,
    pub frequency_label: &'static str,
    pub default_carrier: f32,
    pub default_beat: f32,
    pub beat_range: BeatRange,
}

static CATALOG: [Preset; 6] = [
    Preset {
        id: PresetId::Relaxation,
        title: "Relax",
        subtitle: "Release tension",
        icon: "heart",
        color: "#10b981",
        frequency_label: "8-12 Hz Alpha",
        default_carrier: 220.0,
        default_beat: 10.0,
        beat_range: BeatRange::new(8.0, 12.0),
    },
    Preset {
        id: PresetId::Focus,
        title: "Focus",
        subtitle: "Deep concentration",
        icon: "focus",
        color: "#3b82f6",
        frequency_label: "15-20 Hz Beta",
        default_carrier: 180.0,
        default_beat: 16.0,
        beat_range: BeatRange::new(15.0, 20.0),
    },
    Preset {
        id: PresetId::Sleep,
        title: "Sleep",
        subtitle: "Restorative rest",
        icon: "moon",
        color: "#8b5cf6",
        frequency_label: "1-4 Hz Delta",
        default_carrier: 100.0,
        default_beat: 2.0,
        beat_range: BeatRange::new(1.0, 4.0),
    },
    Preset {
        id: PresetId::Meditation,
        title: "Meditate",
        subtitle: "Mindful states",
        icon: "brain",
        color: "#f59e0b",
        frequency_label: "4-8 Hz Theta",
        default_carrier: 150.0,
        default_beat: 6.0,
        beat_range: BeatRange::new(4.0, 8.0),
    },
    Preset {
        id: PresetId::Energy,
        title: "Energize",
        subtitle: "Mental clarity",
        icon: "zap",
        color: "#ef4444",
        frequency_label: "25-30 Hz Beta",
        default_carrier: 200.0,
        default_beat: 27.0,
        beat_range: BeatRange::new(25.0, 30.0),
    },
    Preset {
        id: PresetId::Creativity,
        title: "Create",
        subtitle: "Unlock flow",
        icon: "palette",
        color: "#a855f7",
        frequency_label: "6-8 Hz Theta",
        default_carrier: 160.0,
        default_beat: 7.0,
        beat_range: BeatRange::new(6.0, 8.0),
    },
];

/// All presets in display order.
pub fn catalog() -> &'static [Preset] {
    &CATALOG
}

/// Looks up a preset. Total, since every [`PresetId`] has an entry.
pub fn preset(id: PresetId) -> &'static Preset {
    match id {
        PresetId::Relaxation => &CATALOG[0],
        PresetId::Focus => &CATALOG[1],
        PresetId::Sleep => &CATALOG[2],
        PresetId::Meditation => &CATALOG[3],
        PresetId::Energy => &CATALOG[4],
        PresetId::Creativity => &CATALOG[5],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_keyed_consistently() {
        assert_eq!(catalog().len(), 6);
        for id in PresetId::ALL {
            assert_eq!(preset(id).id, id);
        }
    }

    #[test]
    fn defaults_sit_inside_their_ranges() {
        for entry in catalog() {
            assert!(
                entry.beat_range.contains(entry.default_beat),
                "{} default beat outside range",
                entry.id
            );
            assert!(entry.default_carrier > 0.0);
        }
    }

    #[test]
    fn parses_identifiers_and_titles() {
        assert_eq!("focus".parse::<PresetId>().unwrap(), PresetId::Focus);
        assert_eq!("Meditate".parse::<PresetId>().unwrap(), PresetId::Meditation);
        assert_eq!(" ENERGY ".parse::<PresetId>().unwrap(), PresetId::Energy);

        let err = "lucid".parse::<PresetId>().unwrap_err();
        assert!(format!("{err}").contains("lucid"));
    }

    #[test]
    fn fraction_interpolates_linearly() {
        let range = preset(PresetId::Relaxation).beat_range;
        assert_eq!(range.fraction(8.0), 0.0);
        assert_eq!(range.fraction(10.0), 0.5);
        assert_eq!(range.fraction(12.0), 1.0);
        assert_eq!(range.clamp(14.0), 12.0);
    }
}
