//! Instrument descriptors for the synthesiser.
//!
//! Authored as JSON next to the note strings of a track:
//!
//! ```json
//! { "waveform": "square", "gain": 0.3, "sweep": 0.5,
//!   "envelope": { "attack": 0.01, "decay": 0.05, "sustain": 0.6,
//!                 "sustain_time": 0.1, "release": 0.2 } }
//! ```
//!
//! All times are in seconds. Instruments without an envelope gate their gain
//! directly: full gain on a note, silence on a rest.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    /// Filtered white noise. Has no pitch of its own.
    Noise,
}

impl Waveform {
    pub fn is_tonal(&self) -> bool {
        !matches!(self, Waveform::Noise)
    }
}

/// Attack/decay/sustain/release amplitude envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub attack: f64,
    #[serde(default)]
    pub decay: f64,
    /// Sustain level, as a fraction of the instrument gain.
    #[serde(default = "default_sustain")]
    pub sustain: f64,
    /// How long the sustain level is held before the release starts.
    #[serde(default)]
    pub sustain_time: f64,
    #[serde(default)]
    pub release: f64,
}

fn default_sustain() -> f64 {
    1.0
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.0,
            decay: 0.0,
            sustain: default_sustain(),
            sustain_time: 0.0,
            release: 0.0,
        }
    }
}

impl Envelope {
    pub fn new(attack: f64, decay: f64, sustain: f64, sustain_time: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain: sustain.clamp(0.0, 1.0),
            sustain_time,
            release,
        }
    }

    /// Seconds from note-on until the release stage begins.
    pub fn release_start(&self) -> f64 {
        self.attack + self.decay + self.sustain_time
    }

    /// Worst-case time for a freshly triggered note to fall silent.
    pub fn tail(&self) -> f64 {
        self.release_start() + self.release
    }
}

/// Resonant bandpass applied to noise sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseFilter {
    /// Centre frequency in Hz.
    pub frequency: f64,
    /// Resonance.
    pub q: f64,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self {
            frequency: 1000.0,
            q: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    #[serde(default)]
    pub waveform: Waveform,
    #[serde(default = "default_gain")]
    pub gain: f64,
    #[serde(default)]
    pub envelope: Option<Envelope>,
    /// Pitch multiplier approached over the length of each note; 1 disables.
    #[serde(default = "default_sweep")]
    pub sweep: f64,
    #[serde(default)]
    pub filter: NoiseFilter,
}

fn default_gain() -> f64 {
    1.0
}

fn default_sweep() -> f64 {
    1.0
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            waveform: Waveform::default(),
            gain: default_gain(),
            envelope: None,
            sweep: default_sweep(),
            filter: NoiseFilter::default(),
        }
    }
}

impl Instrument {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            ..Self::default()
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn with_sweep(mut self, sweep: f64) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn with_filter(mut self, frequency: f64, q: f64) -> Self {
        self.filter = NoiseFilter { frequency, q };
        self
    }

    pub fn sweeps(&self) -> bool {
        self.sweep > 0.0 && self.sweep != 1.0
    }

    /// Release tail of the envelope, or 0 for gated instruments.
    pub fn tail(&self) -> f64 {
        self.envelope.map_or(0.0, |env| env.tail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let instrument: Instrument = serde_json::from_str("{}").unwrap();
        assert_eq!(instrument, Instrument::default());
        assert!(!instrument.sweeps());
        assert_eq!(instrument.tail(), 0.0);
    }

    #[test]
    fn test_envelope_tail() {
        let env = Envelope::new(0.1, 0.2, 0.5, 0.3, 0.4);
        assert!((env.release_start() - 0.6).abs() < 1e-12);
        assert!((env.tail() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sustain_is_clamped() {
        assert_eq!(Envelope::new(0.0, 0.0, 1.5, 0.0, 0.0).sustain, 1.0);
    }

    #[test]
    fn test_parse_full_instrument() {
        let instrument: Instrument = serde_json::from_str(
            r#"{ "waveform": "noise", "gain": 0.4,
                 "envelope": { "attack": 0.01, "release": 0.1 },
                 "filter": { "frequency": 3000, "q": 8 } }"#,
        )
        .unwrap();
        assert_eq!(instrument.waveform, Waveform::Noise);
        assert!(!instrument.waveform.is_tonal());
        let env = instrument.envelope.unwrap();
        assert_eq!(env.sustain, 1.0);
        assert_eq!(instrument.filter.q, 8.0);
    }
}
