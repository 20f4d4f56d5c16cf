//! Offline rendering of a piece to PCM.
//!
//! [`render_music`] drives a [`SequencePlayer`] on a virtual clock: one tick
//! per quaver, rendering that quaver's audio right after it is scheduled,
//! until the material runs out, then renders the release tail. Looping is
//! ignored offline. [`write_wav`] stores the result as 16-bit mono.

use std::path::Path;

use log::info;

use crate::components::track::MusicDefinition;
use crate::error::EngineResult;
use crate::resources::engineconfig::EngineConfig;
use crate::systems::sequenceplayer::SequencePlayer;

fn sample_index(time: f64, sample_rate: f64) -> usize {
    (time * sample_rate).round() as usize
}

/// Cuts a player's output into consecutive blocks on a sample counter, so
/// block edges never drift from the quaver grid.
pub(crate) struct BlockClock {
    sample_rate: f64,
    rendered: usize,
}

impl BlockClock {
    pub(crate) fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            rendered: 0,
        }
    }

    /// Render everything not yet rendered up to `end` (seconds).
    pub(crate) fn render_until(&mut self, player: &mut SequencePlayer, end: f64) -> Vec<f32> {
        let to = sample_index(end, self.sample_rate).max(self.rendered);
        let mut block = vec![0.0; to - self.rendered];
        player.render(
            &mut block,
            self.rendered as f64 / self.sample_rate,
            self.sample_rate,
        );
        self.rendered = to;
        block
    }
}

/// Scale by the master gain and clip to [-1, 1].
pub(crate) fn apply_master(samples: &mut [f32], gain: f32) {
    for sample in samples {
        *sample = (*sample * gain).clamp(-1.0, 1.0);
    }
}

/// Render `player` into `out`, from its first tick to the end of its tail.
pub fn render_player(player: &mut SequencePlayer, sample_rate: f64, out: &mut Vec<f32>) {
    player.set_looping(false);
    let quaver = player.quaver_seconds();
    let mut clock = BlockClock::new(sample_rate);
    let mut now = 0.0;
    loop {
        let more = player.tick(now);
        now += quaver;
        out.extend(clock.render_until(player, now));
        if !more {
            break;
        }
    }

    let tail = player.stop(now);
    out.extend(clock.render_until(player, now + tail));
}

/// Render `music` to mono samples at the configured sample rate, scaled by
/// the master gain and clipped to [-1, 1].
pub fn render_music(music: &MusicDefinition, config: &EngineConfig) -> Vec<f32> {
    let sample_rate = config.sample_rate as f64;
    let mut player = SequencePlayer::from_music(music, config);
    let mut out = Vec::new();
    render_player(&mut player, sample_rate, &mut out);

    apply_master(&mut out, config.master_gain);
    info!(
        "[mixer] rendered {:.2}s ({} samples)",
        out.len() as f64 / sample_rate,
        out.len()
    );
    out
}

/// Write mono samples as a 16-bit PCM WAV file.
pub fn write_wav(
    path: impl AsRef<Path>,
    samples: &[f32],
    sample_rate: u32,
) -> EngineResult<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
