//! Bridge between the game thread and the music thread.
//!
//! A [`MusicChannel`] plays at most one piece at a time. [`MusicChannel::bind`]
//! moves a [`SequencePlayer`] onto a fresh music thread; binding another one
//! while the first is still playing is an API misuse and fails with
//! [`EngineError::ChannelBusy`]. Drop the channel (or call
//! [`MusicChannel::shutdown`]) to stop the thread and join it.
//!
//! The thread streams mono PCM blocks into the [`MusicOutput`] given to
//! `bind`; whoever holds the receiving end feeds them to a device.

use std::path::Path;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{error, info};

use crate::components::track::MusicDefinition;
use crate::error::{EngineError, EngineResult};
use crate::events::audio::{MusicCmd, MusicMessage};
use crate::resources::engineconfig::EngineConfig;
use crate::systems::audio::music_thread;
use crate::systems::sequenceplayer::SequencePlayer;

struct MusicBridge {
    /// Sender for [`MusicCmd`] messages (game -> music thread).
    tx_cmd: Sender<MusicCmd>,
    /// Receiver for [`MusicMessage`] messages (music thread -> game).
    rx_msg: Receiver<MusicMessage>,
    handle: JoinHandle<()>,
}

/// Where the music thread sends its audio.
#[derive(Debug, Clone)]
pub struct MusicOutput {
    pub sample_rate: u32,
    pub master_gain: f32,
    /// One block of mono samples per quaver, master gain applied.
    pub blocks: Sender<Vec<f32>>,
}

impl MusicOutput {
    pub fn new(config: &EngineConfig, blocks: Sender<Vec<f32>>) -> Self {
        Self {
            sample_rate: config.sample_rate,
            master_gain: config.master_gain,
            blocks,
        }
    }
}

#[derive(Default)]
pub struct MusicChannel {
    bridge: Option<MusicBridge>,
}

/// Load a music definition, logging instead of failing so the caller can
/// carry on without sound.
pub fn try_load_music(path: impl AsRef<Path>) -> Option<MusicDefinition> {
    let path = path.as_ref();
    match MusicDefinition::load(path) {
        Ok(music) => Some(music),
        Err(e) => {
            error!("[music] failed to load {:?}: {}", path, e);
            None
        }
    }
}

impl MusicChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a bound player's thread is still running.
    pub fn is_playing(&self) -> bool {
        self.bridge
            .as_ref()
            .is_some_and(|bridge| !bridge.handle.is_finished())
    }

    /// Start playing `player` on a new music thread, streaming into `output`.
    pub fn bind(&mut self, player: SequencePlayer, output: MusicOutput) -> EngineResult<()> {
        if self.is_playing() {
            return Err(EngineError::ChannelBusy);
        }
        self.shutdown();

        let (tx_cmd, rx_cmd) = unbounded::<MusicCmd>();
        let (tx_msg, rx_msg) = unbounded::<MusicMessage>();
        let handle = std::thread::Builder::new()
            .name("music".into())
            .spawn(move || music_thread(player, output, rx_cmd, tx_msg))?;

        self.bridge = Some(MusicBridge {
            tx_cmd,
            rx_msg,
            handle,
        });
        Ok(())
    }

    /// Load `path` and start playing it into `blocks`. Returns `Ok(false)`
    /// when the piece could not be loaded; the failure has already been
    /// logged.
    pub fn play_file(
        &mut self,
        path: impl AsRef<Path>,
        config: &EngineConfig,
        blocks: Sender<Vec<f32>>,
    ) -> EngineResult<bool> {
        if self.is_playing() {
            return Err(EngineError::ChannelBusy);
        }
        let Some(music) = try_load_music(path) else {
            return Ok(false);
        };
        self.bind(
            SequencePlayer::from_music(&music, config),
            MusicOutput::new(config, blocks),
        )?;
        info!(
            "[music] playing {} track(s) at {} bpm",
            music.tracks.len(),
            music.bpm
        );
        Ok(true)
    }

    /// Ask the current piece to stop. Completion is reported as
    /// [`MusicMessage::Stopped`] once the release tail has played out.
    pub fn stop(&self) {
        if let Some(bridge) = &self.bridge {
            let _ = bridge.tx_cmd.send(MusicCmd::Stop);
        }
    }

    /// Wait for the next message from the music thread, if one arrives
    /// within `timeout`.
    pub fn wait(&self, timeout: std::time::Duration) -> Option<MusicMessage> {
        self.bridge
            .as_ref()
            .and_then(|bridge| bridge.rx_msg.recv_timeout(timeout).ok())
    }

    /// Stop the music thread immediately and join it.
    pub fn shutdown(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            let _ = bridge.tx_cmd.send(MusicCmd::Shutdown);
            let _ = bridge.handle.join();
        }
    }
}

impl Drop for MusicChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}
