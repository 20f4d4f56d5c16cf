//! Music and track definitions, and the decoded form a player consumes.
//!
//! # JSON format
//!
//! ```json
//! {
//!   "bpm": 140,
//!   "looping": true,
//!   "tracks": [
//!     { "notes": "C E G +C2", "octave": 4, "instrument": { "waveform": "square" } },
//!     { "notes": "7" },
//!     { "notes": "C2@ A2$", "octave": 3, "instrument": { "waveform": "triangle" } }
//!   ]
//! }
//! ```
//!
//! A track whose `notes` is a bare number (the second one above) is a
//! detune-only track: it replays the previous track, detuned by that many
//! cents.

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::components::instrument::Instrument;
use crate::error::EngineResult;

pub const DEFAULT_OCTAVE: i32 = 4;
const DEFAULT_BPM: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDefinition {
    pub notes: String,
    #[serde(default = "default_octave")]
    pub octave: i32,
    /// Detune in cents.
    #[serde(default)]
    pub detune: f64,
    #[serde(default)]
    pub instrument: Instrument,
}

fn default_octave() -> i32 {
    DEFAULT_OCTAVE
}

impl TrackDefinition {
    pub fn new(notes: impl Into<String>, instrument: Instrument) -> Self {
        Self {
            notes: notes.into(),
            octave: DEFAULT_OCTAVE,
            detune: 0.0,
            instrument,
        }
    }

    pub fn with_detune(mut self, cents: f64) -> Self {
        self.detune = cents;
        self
    }

    /// The detune of a detune-only track, i.e. one whose note string is a
    /// plain number.
    pub fn detune_only(&self) -> Option<f64> {
        let notes = self.notes.trim();
        let numeric = !notes.is_empty()
            && notes
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'));
        if !numeric {
            return None;
        }
        notes.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicDefinition {
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    /// Overrides the configured default when present.
    #[serde(default)]
    pub looping: Option<bool>,
    /// Overrides the configured default when present.
    #[serde(default)]
    pub merge_notes: Option<bool>,
    pub tracks: Vec<TrackDefinition>,
}

fn default_bpm() -> f64 {
    DEFAULT_BPM
}

impl MusicDefinition {
    pub fn new(bpm: f64, tracks: Vec<TrackDefinition>) -> Self {
        Self {
            bpm,
            looping: None,
            merge_notes: None,
            tracks,
        }
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Length of one quaver (eighth note) in milliseconds.
    pub fn quaver_ms(&self) -> u64 {
        let bpm = if self.bpm > 0.0 {
            self.bpm
        } else {
            warn!("[music] invalid bpm {}, using {}", self.bpm, DEFAULT_BPM);
            DEFAULT_BPM
        };
        ((60_000.0 / (bpm * 2.0)).round() as u64).max(1)
    }
}

/// A track after note decoding: one frequency per quaver slot, 0 for silence.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    /// Detune in cents, applied when the frequency reaches the voice.
    pub detune: f64,
    pub instrument: Instrument,
    pub frequencies: Vec<f64>,
}

impl DecodedTrack {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// `frequency` shifted by this track's detune.
    pub fn detuned(&self, frequency: f64) -> f64 {
        frequency * 2f64.powf(self.detune / 1200.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quaver_length() {
        let def = MusicDefinition::new(120.0, vec![]);
        assert_eq!(def.quaver_ms(), 250);
        let def = MusicDefinition::new(140.0, vec![]);
        assert_eq!(def.quaver_ms(), 214);
        let def = MusicDefinition::new(0.0, vec![]);
        assert_eq!(def.quaver_ms(), 250);
    }

    #[test]
    fn test_detune_only_detection() {
        let track = |notes: &str| TrackDefinition::new(notes, Instrument::default());
        assert_eq!(track("7").detune_only(), Some(7.0));
        assert_eq!(track(" -12.5 ").detune_only(), Some(-12.5));
        assert_eq!(track("C4").detune_only(), None);
        assert_eq!(track("--").detune_only(), None);
        assert_eq!(track("").detune_only(), None);
    }

    #[test]
    fn test_detuned_octave() {
        let decoded = DecodedTrack {
            detune: 1200.0,
            instrument: Instrument::default(),
            frequencies: vec![],
        };
        assert!((decoded.detuned(220.0) - 440.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_definition_with_defaults() {
        let def = MusicDefinition::from_json(r#"{ "tracks": [ { "notes": "C D E" } ] }"#).unwrap();
        assert_eq!(def.bpm, 120.0);
        assert_eq!(def.looping, None);
        assert_eq!(def.tracks[0].octave, DEFAULT_OCTAVE);
        assert_eq!(def.tracks[0].detune, 0.0);
    }
}
