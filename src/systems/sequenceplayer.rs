//! Sequence player: turns decoded tracks into scheduled voice automation.
//!
//! The player is clocked externally. Every call to [`SequencePlayer::tick`]
//! advances all tracks by exactly one quaver slot, in lock-step, and
//! schedules that slot's pitch and envelope on each track's [`Voice`]. The
//! caller owns the timer: a real-time thread ticks it every quaver
//! ([`crate::systems::audio::music_thread`]), the offline mixer ticks it on a
//! virtual clock ([`crate::systems::mixer::render_music`]).
//!
//! Per slot, for each track:
//! - a pitched slot sets the voice frequency at once (dropping any pending
//!   sweep) and, for sweeping instruments, glides toward `freq * sweep`,
//! - its envelope is retriggered (attack to full gain, decay to sustain)
//!   unless the pitch repeats the previous slot and merging is enabled,
//! - a release toward silence is always scheduled `sustain_time` after the
//!   decay ends,
//! - a rest silences gated (envelope-less) instruments immediately and leaves
//!   enveloped ones to their scheduled release.

use log::debug;

use crate::components::instrument::Instrument;
use crate::components::track::{DecodedTrack, MusicDefinition};
use crate::resources::engineconfig::EngineConfig;
use crate::systems::notedecoder::decode_music;
use crate::systems::voice::{SynthVoice, Voice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerOptions {
    pub looping: bool,
    pub merge_notes: bool,
}

impl PlayerOptions {
    /// Options of `music`, falling back to the configured defaults.
    pub fn resolve(music: &MusicDefinition, config: &EngineConfig) -> Self {
        Self {
            looping: music.looping.unwrap_or(config.looping),
            merge_notes: music.merge_notes.unwrap_or(config.merge_notes),
        }
    }
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            looping: false,
            merge_notes: true,
        }
    }
}

struct TrackPlayer {
    track: DecodedTrack,
    voice: Box<dyn Voice>,
    cursor: usize,
    previous: f64,
}

impl TrackPlayer {
    fn has_material(&self) -> bool {
        self.cursor < self.track.len()
    }

    fn play_slot(&mut self, frequency: f64, now: f64, quaver: f64, merge_notes: bool) {
        let instrument = &self.track.instrument;
        let voice = self.voice.as_mut();

        if frequency > 0.0 {
            let pitched = self.track.detuned(frequency);
            if let Some(param) = voice.frequency() {
                param.cancel_from(now);
                param.set_value_at(pitched, now);
                if instrument.sweeps() {
                    let time_constant = sweep_time_constant(instrument, quaver);
                    param.set_target_at(pitched * instrument.sweep, now, time_constant);
                }
            }

            let gain = voice.gain();
            match instrument.envelope {
                Some(env) => {
                    let level = instrument.gain;
                    let decay_end = now + env.attack + env.decay;
                    gain.cancel_and_hold(now);
                    if frequency != self.previous || !merge_notes {
                        gain.set_value_at(0.0, now);
                        gain.linear_ramp_to(level, now + env.attack);
                    }
                    gain.linear_ramp_to(level * env.sustain, decay_end);
                    gain.set_target_at(0.0, decay_end + env.sustain_time, env.release / 3.0);
                }
                None => {
                    gain.cancel_from(now);
                    gain.set_value_at(instrument.gain, now);
                }
            }
        } else if instrument.envelope.is_none() {
            let gain = voice.gain();
            gain.cancel_from(now);
            gain.set_value_at(0.0, now);
        }
        self.previous = frequency;
    }
}

fn sweep_time_constant(instrument: &Instrument, quaver: f64) -> f64 {
    match instrument.envelope {
        Some(env) if env.release_start() > 0.0 => env.release_start() / 3.0,
        _ => quaver / 3.0,
    }
}

pub struct SequencePlayer {
    tracks: Vec<TrackPlayer>,
    quaver_ms: u64,
    options: PlayerOptions,
    started: bool,
    stopping: bool,
}

impl SequencePlayer {
    /// Player over already decoded tracks; `make_voice` builds one voice per
    /// track.
    pub fn new(
        tracks: Vec<DecodedTrack>,
        quaver_ms: u64,
        options: PlayerOptions,
        mut make_voice: impl FnMut(&Instrument) -> Box<dyn Voice>,
    ) -> Self {
        let tracks = tracks
            .into_iter()
            .map(|track| TrackPlayer {
                voice: make_voice(&track.instrument),
                track,
                cursor: 0,
                previous: 0.0,
            })
            .collect();
        Self {
            tracks,
            quaver_ms: quaver_ms.max(1),
            options,
            started: false,
            stopping: false,
        }
    }

    /// Decode `music` and give every track a software voice.
    pub fn from_music(music: &MusicDefinition, config: &EngineConfig) -> Self {
        let sample_rate = config.sample_rate as f64;
        let noise_seconds = config.noise_seconds;
        Self::new(
            decode_music(music),
            music.quaver_ms(),
            PlayerOptions::resolve(music, config),
            |instrument| Box::new(SynthVoice::new(instrument, sample_rate, noise_seconds)),
        )
    }

    pub fn quaver_ms(&self) -> u64 {
        self.quaver_ms
    }

    pub fn quaver_seconds(&self) -> f64 {
        self.quaver_ms as f64 / 1000.0
    }

    pub fn options(&self) -> PlayerOptions {
        self.options
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.options.looping = looping;
    }

    /// Slot index the next tick will play on `track`.
    pub fn cursor(&self, track: usize) -> Option<usize> {
        self.tracks.get(track).map(|t| t.cursor)
    }

    pub fn voice_mut(&mut self, track: usize) -> Option<&mut dyn Voice> {
        self.tracks.get_mut(track).map(|t| t.voice.as_mut() as &mut dyn Voice)
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// True while any track has slots left, or forever when looping a
    /// non-empty piece.
    pub fn has_material(&self) -> bool {
        if self.options.looping {
            return self.tracks.iter().any(|t| !t.track.is_empty());
        }
        self.tracks.iter().any(TrackPlayer::has_material)
    }

    /// Worst-case release time of any instrument in the piece.
    pub fn release_tail(&self) -> f64 {
        self.tracks
            .iter()
            .map(|t| t.track.instrument.tail())
            .fold(0.0, f64::max)
    }

    /// Play one slot on every track at `now` (seconds). Returns whether
    /// there is more to play; once false, the caller should [`stop`].
    ///
    /// [`stop`]: SequencePlayer::stop
    pub fn tick(&mut self, now: f64) -> bool {
        if self.stopping {
            return false;
        }
        if !self.started {
            self.started = true;
            for track in &mut self.tracks {
                track.voice.start(now);
            }
        }

        let quaver = self.quaver_seconds();
        let PlayerOptions {
            looping,
            merge_notes,
        } = self.options;
        for track in &mut self.tracks {
            if let Some(param) = track.voice.frequency() {
                param.prune_before(now);
            }
            track.voice.gain().prune_before(now);

            if !track.has_material() {
                if !looping || track.track.is_empty() {
                    continue;
                }
                track.cursor = 0;
            }
            let frequency = track.track.frequencies[track.cursor];
            track.cursor += 1;
            track.play_slot(frequency, now, quaver, merge_notes);
        }
        self.has_material()
    }

    /// Stop playback at `now`. Sources are torn down after the release tail
    /// so sounding notes fade out; returns that delay in seconds.
    pub fn stop(&mut self, now: f64) -> f64 {
        let tail = self.release_tail();
        self.stopping = true;
        for track in &mut self.tracks {
            track.voice.stop(now + tail);
        }
        debug!("[music] stop at {:.3}s, teardown in {:.3}s", now, tail);
        tail
    }

    /// Mix every voice into `out`, starting at `start_time`.
    pub fn render(&mut self, out: &mut [f32], start_time: f64, sample_rate: f64) {
        for track in &mut self.tracks {
            track.voice.render(out, start_time, sample_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::automation::ParamTimeline;
    use crate::components::instrument::{Envelope, Waveform};
    use crate::components::track::TrackDefinition;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    struct TestVoice {
        frequency: Option<ParamTimeline>,
        gain: ParamTimeline,
        started: Option<f64>,
        stopped: Option<f64>,
    }

    impl Voice for TestVoice {
        fn frequency(&mut self) -> Option<&mut ParamTimeline> {
            self.frequency.as_mut()
        }
        fn gain(&mut self) -> &mut ParamTimeline {
            &mut self.gain
        }
        fn start(&mut self, at: f64) {
            self.started = Some(at);
        }
        fn stop(&mut self, at: f64) {
            self.stopped = Some(at);
        }
        fn is_stopped(&self) -> bool {
            self.stopped.is_some()
        }
    }

    fn test_voice(instrument: &Instrument) -> Box<dyn Voice> {
        Box::new(TestVoice {
            frequency: instrument.waveform.is_tonal().then(|| ParamTimeline::new(0.0)),
            gain: ParamTimeline::new(0.0),
            started: None,
            stopped: None,
        })
    }

    fn track(frequencies: &[f64], instrument: Instrument) -> DecodedTrack {
        DecodedTrack {
            detune: 0.0,
            instrument,
            frequencies: frequencies.to_vec(),
        }
    }

    fn player(tracks: Vec<DecodedTrack>, options: PlayerOptions) -> SequencePlayer {
        SequencePlayer::new(tracks, 250, options, test_voice)
    }

    fn gain_at(player: &mut SequencePlayer, track: usize, t: f64) -> f64 {
        player.voice_mut(track).unwrap().gain().value_at(t)
    }

    fn freq_at(player: &mut SequencePlayer, track: usize, t: f64) -> f64 {
        player
            .voice_mut(track)
            .unwrap()
            .frequency()
            .map_or(0.0, |f| f.value_at(t))
    }

    fn adsr() -> Envelope {
        Envelope::new(0.1, 0.1, 0.5, 0.2, 0.3)
    }

    #[test]
    fn test_tracks_advance_in_lock_step() {
        let mut player = player(
            vec![
                track(&[100.0, 0.0, 200.0], Instrument::default()),
                track(&[300.0], Instrument::default()),
            ],
            PlayerOptions::default(),
        );
        assert!(player.tick(0.0));
        assert_eq!(player.cursor(0), Some(1));
        assert_eq!(player.cursor(1), Some(1));
        assert!(player.tick(0.25));
        assert!(!player.tick(0.5));
        assert_eq!(player.cursor(0), Some(3));
        assert_eq!(player.cursor(1), Some(1));
        assert!(!player.has_material());
    }

    #[test]
    fn test_looping_wraps_every_track() {
        let mut player = player(
            vec![track(&[100.0, 200.0], Instrument::default())],
            PlayerOptions {
                looping: true,
                merge_notes: true,
            },
        );
        for i in 0..5 {
            assert!(player.tick(i as f64 * 0.25));
        }
        assert_eq!(player.cursor(0), Some(1));
        assert!(approx_eq(freq_at(&mut player, 0, 1.0), 100.0));
    }

    #[test]
    fn test_looping_empty_piece_has_no_material() {
        let mut player = player(
            vec![track(&[], Instrument::default())],
            PlayerOptions {
                looping: true,
                merge_notes: true,
            },
        );
        assert!(!player.tick(0.0));
    }

    #[test]
    fn test_gated_instrument_follows_notes_and_rests() {
        let mut player = player(
            vec![track(&[220.0, 0.0], Instrument::default().with_gain(0.8))],
            PlayerOptions::default(),
        );
        player.tick(0.0);
        assert!(approx_eq(gain_at(&mut player, 0, 0.1), 0.8));
        assert!(approx_eq(freq_at(&mut player, 0, 0.1), 220.0));
        player.tick(0.25);
        assert_eq!(gain_at(&mut player, 0, 0.25), 0.0);
        assert!(approx_eq(gain_at(&mut player, 0, 0.2), 0.8));
    }

    #[test]
    fn test_envelope_shape() {
        let instrument = Instrument::default().with_envelope(adsr());
        let mut player = player(vec![track(&[440.0, 0.0], instrument)], PlayerOptions::default());
        player.tick(1.0);
        assert_eq!(gain_at(&mut player, 0, 1.0), 0.0);
        assert!(approx_eq(gain_at(&mut player, 0, 1.05), 0.5));
        assert!(approx_eq(gain_at(&mut player, 0, 1.1), 1.0));
        assert!(approx_eq(gain_at(&mut player, 0, 1.2), 0.5));
        // Rests leave the envelope to release on its own.
        player.tick(1.25);
        assert!(approx_eq(gain_at(&mut player, 0, 1.3), 0.5));
        assert!(approx_eq(gain_at(&mut player, 0, 1.4), 0.5));
        let released = gain_at(&mut player, 0, 1.5);
        assert!(approx_eq(released, 0.5 * (-1.0f64).exp()));
        assert!(gain_at(&mut player, 0, 3.0) < 1e-3);
    }

    #[test]
    fn test_repeated_note_merges() {
        let instrument = Instrument::default().with_envelope(adsr());
        let mut player = player(vec![track(&[440.0, 440.0], instrument)], PlayerOptions::default());
        player.tick(0.0);
        player.tick(0.25);
        assert!(approx_eq(gain_at(&mut player, 0, 0.25), 0.5));
        assert!(approx_eq(gain_at(&mut player, 0, 0.6), 0.5));
    }

    #[test]
    fn test_repeated_note_retriggers_without_merge() {
        let instrument = Instrument::default().with_envelope(adsr());
        let mut player = player(
            vec![track(&[440.0, 440.0], instrument)],
            PlayerOptions {
                looping: false,
                merge_notes: false,
            },
        );
        player.tick(0.0);
        player.tick(0.25);
        assert_eq!(gain_at(&mut player, 0, 0.25), 0.0);
        assert!(approx_eq(gain_at(&mut player, 0, 0.35), 1.0));
    }

    #[test]
    fn test_detune_applies_to_frequency() {
        let mut detuned = track(&[440.0], Instrument::default());
        detuned.detune = -1200.0;
        let mut player = player(vec![detuned], PlayerOptions::default());
        player.tick(0.0);
        assert!(approx_eq(freq_at(&mut player, 0, 0.0), 220.0));
    }

    #[test]
    fn test_sweep_glides_toward_factor() {
        let instrument = Instrument::default().with_sweep(2.0);
        let mut player = player(vec![track(&[100.0, 0.0], instrument)], PlayerOptions::default());
        player.tick(0.0);
        let tc = 0.25 / 3.0;
        let expected = 200.0 - 100.0 * (-1.0f64).exp();
        assert!(approx_eq(freq_at(&mut player, 0, tc), expected));
        assert!((freq_at(&mut player, 0, 2.0) - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_new_note_cancels_pending_sweep() {
        let instrument = Instrument::default().with_sweep(0.5);
        let mut player = player(vec![track(&[400.0, 300.0], instrument)], PlayerOptions::default());
        player.tick(0.0);
        player.tick(0.25);
        assert!(approx_eq(freq_at(&mut player, 0, 0.25), 300.0));
    }

    #[test]
    fn test_noise_track_ignores_frequency() {
        let instrument = Instrument::new(Waveform::Noise).with_gain(0.3);
        let mut player = player(vec![track(&[440.0, 0.0], instrument)], PlayerOptions::default());
        player.tick(0.0);
        assert!(player.voice_mut(0).unwrap().frequency().is_none());
        assert!(approx_eq(gain_at(&mut player, 0, 0.1), 0.3));
    }

    #[test]
    fn test_stop_defers_teardown_by_tail() {
        let instrument = Instrument::default().with_envelope(adsr());
        let mut player = player(
            vec![
                track(&[440.0], instrument),
                track(&[220.0], Instrument::default()),
            ],
            PlayerOptions::default(),
        );
        player.tick(0.0);
        let tail = player.stop(0.1);
        assert!(approx_eq(tail, 0.7));
        assert!(player.voice_mut(0).unwrap().is_stopped());
        assert!(player.voice_mut(1).unwrap().is_stopped());
        assert!(player.is_stopping());
        assert!(!player.tick(0.25));
    }

    #[test]
    fn test_options_fall_back_to_config() {
        let mut config = EngineConfig::new();
        config.looping = true;
        config.merge_notes = false;
        let mut music = MusicDefinition::new(
            120.0,
            vec![TrackDefinition::new("C", Instrument::default())],
        );
        assert_eq!(
            PlayerOptions::resolve(&music, &config),
            PlayerOptions {
                looping: true,
                merge_notes: false
            }
        );
        music.looping = Some(false);
        assert!(!PlayerOptions::resolve(&music, &config).looping);

        let player = SequencePlayer::from_music(&music, &config);
        assert_eq!(player.quaver_ms(), 250);
    }
}
