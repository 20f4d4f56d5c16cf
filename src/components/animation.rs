//! Named animation states owned by a sprite.
//!
//! An [`AnimationState`] is an ordered list of [`FrameData`] rectangles plus
//! the timing ([`Interval`]) and the [`CycleType`] policy that decides what
//! happens at the ends of the list. The frame-advance logic itself lives in
//! [`Sprite::update`](crate::components::sprite::Sprite::update).

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::components::dynamics::Dynamics;

/// A frame rectangle on the sprite sheet, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameData {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
}

impl FrameData {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            flip_x: false,
            flip_y: false,
        }
    }
}

/// What happens when playback reaches either end of the frame list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleType {
    /// Never advances; the sprite stays on frame 0.
    None,
    /// Wraps back to frame 0 after the last frame.
    #[default]
    Loop,
    /// Bounces between the ends without repeating a terminal frame.
    Oscillate,
    /// Freezes on the last frame and stops the clock.
    Stop,
}

/// Frame interval in milliseconds.
#[derive(Clone)]
pub enum Interval {
    Fixed(f64),
    /// Computed every tick from the owning sprite's dynamics (a sprite
    /// without dynamics passes a resting [`Dynamics`]).
    Derived(Rc<dyn Fn(&Dynamics) -> f64>),
}

impl Interval {
    pub fn derived(f: impl Fn(&Dynamics) -> f64 + 'static) -> Self {
        Interval::Derived(Rc::new(f))
    }

    pub fn resolve(&self, dynamics: &Dynamics) -> f64 {
        match self {
            Interval::Fixed(ms) => *ms,
            Interval::Derived(f) => f(dynamics),
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::Fixed(0.0)
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Fixed(ms) => f.debug_tuple("Fixed").field(ms).finish(),
            Interval::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

pub type Frames = SmallVec<[FrameData; 8]>;

#[derive(Debug, Clone, Default)]
pub struct AnimationState {
    pub frames: Frames,
    pub interval: Interval,
    pub cycle: CycleType,
}

impl AnimationState {
    pub fn new(frames: impl IntoIterator<Item = FrameData>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            interval: Interval::Fixed(0.0),
            cycle: CycleType::Loop,
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_interval_ms(self, ms: f64) -> Self {
        self.with_interval(Interval::Fixed(ms))
    }

    pub fn with_cycle(mut self, cycle: CycleType) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn first_frame(&self) -> Option<&FrameData> {
        self.frames.first()
    }
}
