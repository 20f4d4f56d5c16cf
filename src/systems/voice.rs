//! Sound sources driven by the sequence player.
//!
//! A [`Voice`] exposes its automatable parameters as [`ParamTimeline`]s; the
//! player only ever schedules events on them. [`SynthVoice`] is the software
//! implementation used for offline rendering: a tonal oscillator, or looped
//! white noise through a resonant bandpass for percussion.

use std::f64::consts::TAU;

use crate::components::automation::ParamTimeline;
use crate::components::instrument::{Instrument, NoiseFilter, Waveform};

pub trait Voice: Send {
    /// Frequency parameter in Hz. `None` for sources without a pitch.
    fn frequency(&mut self) -> Option<&mut ParamTimeline>;

    /// Linear gain parameter.
    fn gain(&mut self) -> &mut ParamTimeline;

    fn start(&mut self, at: f64);

    /// Schedule the source to stop producing sound at `at`.
    fn stop(&mut self, at: f64);

    /// True once a stop has been scheduled.
    fn is_stopped(&self) -> bool;

    /// Mix `out.len()` samples starting at `start_time` into `out`.
    fn render(&mut self, _out: &mut [f32], _start_time: f64, _sample_rate: f64) {}
}

/// Second-order resonant bandpass (constant peak gain).
#[derive(Debug, Clone, Copy, Default)]
struct Bandpass {
    b0: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Bandpass {
    fn new(filter: &NoiseFilter, sample_rate: f64) -> Self {
        let nyquist = sample_rate * 0.5;
        let centre = filter.frequency.clamp(1.0, nyquist * 0.99);
        let w0 = TAU * centre / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * filter.q.max(0.1));
        let a0 = 1.0 + alpha;
        Self {
            b0: alpha / a0,
            b2: -alpha / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
            ..Self::default()
        }
    }

    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// `seconds` of uniform white noise in [-1, 1].
pub fn noise_buffer(seconds: f64, sample_rate: f64, rng: &mut fastrand::Rng) -> Vec<f32> {
    let len = ((seconds * sample_rate).round() as usize).max(1);
    (0..len).map(|_| rng.f32() * 2.0 - 1.0).collect()
}

#[derive(Debug, Clone)]
enum Source {
    Oscillator {
        waveform: Waveform,
        frequency: ParamTimeline,
        phase: f64,
    },
    Noise {
        buffer: Vec<f32>,
        cursor: usize,
        filter: NoiseFilter,
        bandpass: Option<Bandpass>,
    },
}

fn oscillate(waveform: Waveform, phase: f64) -> f64 {
    match waveform {
        Waveform::Sine | Waveform::Noise => (TAU * phase).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}

#[derive(Debug, Clone)]
pub struct SynthVoice {
    source: Source,
    gain: ParamTimeline,
    started_at: Option<f64>,
    stop_at: Option<f64>,
}

impl SynthVoice {
    /// A voice for `instrument`. Noise instruments get a fresh looped buffer
    /// of `noise_seconds`.
    pub fn new(instrument: &Instrument, sample_rate: f64, noise_seconds: f64) -> Self {
        Self::with_rng(instrument, sample_rate, noise_seconds, &mut fastrand::Rng::new())
    }

    pub fn with_rng(
        instrument: &Instrument,
        sample_rate: f64,
        noise_seconds: f64,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let source = match instrument.waveform {
            Waveform::Noise => Source::Noise {
                buffer: noise_buffer(noise_seconds, sample_rate, rng),
                cursor: 0,
                filter: instrument.filter,
                bandpass: None,
            },
            waveform => Source::Oscillator {
                waveform,
                frequency: ParamTimeline::new(0.0),
                phase: 0.0,
            },
        };
        Self {
            source,
            gain: ParamTimeline::new(0.0),
            started_at: None,
            stop_at: None,
        }
    }

    fn is_sounding(&self, t: f64) -> bool {
        self.started_at.is_some_and(|start| t >= start) && self.stop_at.is_none_or(|stop| t < stop)
    }
}

impl Voice for SynthVoice {
    fn frequency(&mut self) -> Option<&mut ParamTimeline> {
        match &mut self.source {
            Source::Oscillator { frequency, .. } => Some(frequency),
            Source::Noise { .. } => None,
        }
    }

    fn gain(&mut self) -> &mut ParamTimeline {
        &mut self.gain
    }

    fn start(&mut self, at: f64) {
        self.started_at.get_or_insert(at);
    }

    fn stop(&mut self, at: f64) {
        self.stop_at = Some(self.stop_at.map_or(at, |prev| prev.min(at)));
    }

    fn is_stopped(&self) -> bool {
        self.stop_at.is_some()
    }

    fn render(&mut self, out: &mut [f32], start_time: f64, sample_rate: f64) {
        let step = 1.0 / sample_rate;
        for (i, sample) in out.iter_mut().enumerate() {
            let t = start_time + i as f64 * step;
            if !self.is_sounding(t) {
                continue;
            }
            let gain = self.gain.value_at(t);
            let value = match &mut self.source {
                Source::Oscillator {
                    waveform,
                    frequency,
                    phase,
                } => {
                    let value = oscillate(*waveform, *phase);
                    *phase = (*phase + frequency.value_at(t) * step).rem_euclid(1.0);
                    value
                }
                Source::Noise {
                    buffer,
                    cursor,
                    filter,
                    bandpass,
                } => {
                    let raw = buffer[*cursor] as f64;
                    *cursor = (*cursor + 1) % buffer.len();
                    bandpass
                        .get_or_insert_with(|| Bandpass::new(filter, sample_rate))
                        .process(raw)
                }
            };
            *sample += (gain * value) as f32;
        }
    }
}
