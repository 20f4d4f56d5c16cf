//! Engine configuration resource.
//!
//! Audio and animation settings loaded from an INI file. Every value has a
//! safe default, so a missing or partial file still yields a usable config.
//!
//! # Configuration File Format
//!
//! ```ini
//! [audio]
//! sample_rate = 44100
//! master_gain = 0.8
//! noise_seconds = 1.0
//!
//! [music]
//! merge_notes = true
//! looping = false
//!
//! [animator]
//! max_delta = 0.25
//! ```

use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

/// Default safe values for startup
const DEFAULT_SAMPLE_RATE: u32 = 44_100;
const DEFAULT_MASTER_GAIN: f32 = 0.8;
const DEFAULT_NOISE_SECONDS: f64 = 1.0;
const DEFAULT_MERGE_NOTES: bool = true;
const DEFAULT_LOOPING: bool = false;
const DEFAULT_MAX_DELTA: f64 = 0.25;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Gain applied to the final mix.
    pub master_gain: f32,
    /// Length of the looped noise buffer of noise voices.
    pub noise_seconds: f64,
    /// Default for pieces that do not say whether repeated notes merge.
    pub merge_notes: bool,
    /// Default for pieces that do not say whether they loop.
    pub looping: bool,
    /// Longest animator tick in seconds; 0 disables the clamp.
    pub max_delta: f64,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            master_gain: DEFAULT_MASTER_GAIN,
            noise_seconds: DEFAULT_NOISE_SECONDS,
            merge_notes: DEFAULT_MERGE_NOTES,
            looping: DEFAULT_LOOPING,
            max_delta: DEFAULT_MAX_DELTA,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing or malformed values keep their current values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        // [audio] section
        if let Some(rate) = config.getuint("audio", "sample_rate").ok().flatten()
            && rate > 0
        {
            self.sample_rate = rate as u32;
        }
        if let Some(gain) = config.getfloat("audio", "master_gain").ok().flatten() {
            self.master_gain = gain.max(0.0) as f32;
        }
        if let Some(seconds) = config.getfloat("audio", "noise_seconds").ok().flatten()
            && seconds > 0.0
        {
            self.noise_seconds = seconds;
        }

        // [music] section
        if let Some(merge) = config.getbool("music", "merge_notes").ok().flatten() {
            self.merge_notes = merge;
        }
        if let Some(looping) = config.getbool("music", "looping").ok().flatten() {
            self.looping = looping;
        }

        // [animator] section
        if let Some(max_delta) = config.getfloat("animator", "max_delta").ok().flatten() {
            self.max_delta = max_delta.max(0.0);
        }

        info!(
            "Loaded config: {} Hz, master_gain={}, noise={}s, merge_notes={}, looping={}, max_delta={}",
            self.sample_rate,
            self.master_gain,
            self.noise_seconds,
            self.merge_notes,
            self.looping,
            self.max_delta
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [audio] section
        config.set("audio", "sample_rate", Some(self.sample_rate.to_string()));
        config.set("audio", "master_gain", Some(self.master_gain.to_string()));
        config.set("audio", "noise_seconds", Some(self.noise_seconds.to_string()));

        // [music] section
        config.set("music", "merge_notes", Some(self.merge_notes.to_string()));
        config.set("music", "looping", Some(self.looping.to_string()));

        // [animator] section
        config.set("animator", "max_delta", Some(self.max_delta.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}
