//! Sprite-sheet frame metadata.
//!
//! A [`SpriteSheet`] maps frame names to pixel rectangles. Frames belonging
//! to an animation state follow the naming convention
//! `"{base}_{state}{index}"`, e.g. `hero_walk0`, `hero_walk1`, ...
//!
//! # JSON format
//!
//! ```json
//! { "frames": {
//!     "hero_walk0": { "x": 0,  "y": 0, "width": 16, "height": 24 },
//!     "hero_walk1": { "x": 16, "y": 0, "width": 16, "height": 24 },
//!     "hero_jump":  { "x": 32, "y": 0, "width": 16, "height": 24, "flip_x": true }
//! } }
//! ```

use std::path::Path;

use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::components::animation::{FrameData, Frames};
use crate::error::EngineResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpriteSheet {
    pub frames: FxHashMap<String, FrameData>,
}

impl SpriteSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn insert(&mut self, name: impl Into<String>, frame: FrameData) {
        self.frames.insert(name.into(), frame);
    }

    pub fn get(&self, name: &str) -> Option<&FrameData> {
        self.frames.get(name)
    }

    /// Collect the frames of `state` for sprite `base`.
    ///
    /// Reads `base_state0`, `base_state1`, ... up to the first gap. If there
    /// is no numbered frame but `base_state` exists, that single frame is
    /// used as a static state. Missing frames are logged, never fatal.
    pub fn frames_for(&self, base: &str, state: &str) -> Frames {
        let mut frames = Frames::new();
        while let Some(frame) = self.frames.get(&format!("{base}_{state}{}", frames.len())) {
            frames.push(*frame);
        }
        if frames.is_empty() {
            let name = format!("{base}_{state}");
            match self.frames.get(&name) {
                Some(frame) => {
                    debug!("[sheet] '{}' has no numbered frames, using static frame", name);
                    frames.push(*frame);
                }
                None => warn!("[sheet] no frames for '{}'", name),
            }
        }
        frames
    }
}
