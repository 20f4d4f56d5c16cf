//! The music thread.
//!
//! [`music_thread`] runs on its own OS thread and owns a [`SequencePlayer`]
//! for the life of one piece. All tracks share a single
//! `crossbeam_channel::tick` timer of one quaver, so they advance together.
//! The player runs on a virtual clock of whole quavers: each tick schedules
//! one slot, renders that quaver and sends it to the [`MusicOutput`] as a
//! block, one quaver ahead of the wall clock.
//!
//! When the material runs out, the last quaver still plays out: teardown is
//! armed for one quaver plus the release tail, and ticks keep streaming the
//! tail until then. A [`MusicCmd::Stop`] releases the voices at the current
//! virtual time instead.
//!
//! The thread is started through
//! [`crate::resources::audio::MusicChannel::bind`].

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, after, never, select, tick};
use log::{debug, info, trace};

use crate::events::audio::{MusicCmd, MusicMessage};
use crate::resources::audio::MusicOutput;
use crate::systems::mixer::{BlockClock, apply_master};
use crate::systems::sequenceplayer::SequencePlayer;

struct Playback {
    player: SequencePlayer,
    output: MusicOutput,
    clock: BlockClock,
    quaver: f64,
    /// Virtual time already rendered, in seconds.
    now: f64,
    /// Virtual time at which the voices fall silent, once stopping.
    end: Option<f64>,
}

impl Playback {
    fn new(player: SequencePlayer, output: MusicOutput) -> Self {
        Self {
            quaver: player.quaver_seconds(),
            clock: BlockClock::new(output.sample_rate as f64),
            player,
            output,
            now: 0.0,
            end: None,
        }
    }

    /// Play and stream one quaver. Returns the teardown delay once the
    /// piece has run out of material.
    fn advance(&mut self) -> Option<f64> {
        if let Some(end) = self.end {
            self.now = (self.now + self.quaver).min(end);
            self.flush(self.now);
            return None;
        }

        let more = self.player.tick(self.now);
        self.now += self.quaver;
        self.flush(self.now);
        if more {
            return None;
        }
        let tail = self.player.stop(self.now);
        self.end = Some(self.now + tail);
        Some(self.quaver + tail)
    }

    /// Release every voice at the current virtual time. Returns the tail.
    fn stop(&mut self) -> f64 {
        let tail = self.player.stop(self.now);
        self.end = Some(self.now + tail);
        tail
    }

    /// Stream whatever is left of the tail.
    fn finish(&mut self) {
        if let Some(end) = self.end {
            self.flush(end);
        }
    }

    fn flush(&mut self, until: f64) {
        let mut block = self.clock.render_until(&mut self.player, until);
        if block.is_empty() {
            return;
        }
        apply_master(&mut block, self.output.master_gain);
        trace!("[music] block of {} samples up to {:.3}s", block.len(), until);
        let _ = self.output.blocks.send(block);
    }
}

/// Entry point of the music thread.
///
/// Blocks until the piece ends, a stop completes, or
/// [`MusicCmd::Shutdown`] arrives (or every command sender is dropped).
pub fn music_thread(
    player: SequencePlayer,
    output: MusicOutput,
    rx_cmd: Receiver<MusicCmd>,
    tx_msg: Sender<MusicMessage>,
) {
    debug!(
        "[music] thread starting (id={:?})",
        std::thread::current().id()
    );
    let mut playback = Playback::new(player, output);
    let quavers = tick(Duration::from_secs_f64(playback.quaver));
    let mut teardown: Receiver<Instant> = never();
    let mut done = MusicMessage::Finished;

    let _ = tx_msg.send(MusicMessage::Started);
    if let Some(delay) = playback.advance() {
        teardown = after(Duration::from_secs_f64(delay));
    }

    loop {
        select! {
            recv(rx_cmd) -> cmd => match cmd {
                Ok(MusicCmd::Stop) => {
                    if !playback.player.is_stopping() {
                        done = MusicMessage::Stopped;
                        teardown = after(Duration::from_secs_f64(playback.stop()));
                    }
                }
                Ok(MusicCmd::Shutdown) | Err(_) => {
                    if !playback.player.is_stopping() {
                        playback.stop();
                    }
                    debug!("[music] shutdown");
                    return;
                }
            },
            recv(quavers) -> _ => {
                if let Some(delay) = playback.advance() {
                    teardown = after(Duration::from_secs_f64(delay));
                }
            },
            recv(teardown) -> _ => {
                playback.finish();
                info!("[music] {:?}", done);
                let _ = tx_msg.send(done);
                return;
            },
        }
    }
}
