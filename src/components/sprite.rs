//! Animated, stateful visual entity.
//!
//! A [`Sprite`] owns a set of named [`AnimationState`]s, the index of the
//! frame currently shown, its [`Body`] (position and size), and optionally a
//! [`Dynamics`] and an [`Adjuster`]. Each call to [`Sprite::update`]:
//!
//! 1. integrates the dynamics (and refreshes auto-flip flags),
//! 2. runs the adjuster, dropping it once it reports completion,
//! 3. advances the animation frame according to the state's cycle policy,
//! 4. hands a [`SpriteSnapshot`] to the renderer.
//!
//! # Frame advance
//!
//! The frame that is "due" at `timestamp` is `floor(timestamp / interval) mod
//! frame_count`. When it differs from the stored index the sprite moves by a
//! single step in its current direction, however many steps are overdue. At
//! very low frame rates playback therefore lags behind wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::components::adjuster::{Adjuster, CompletionReason};
use crate::components::animation::{AnimationState, CycleType, FrameData, Interval};
use crate::components::dynamics::Dynamics;
use crate::components::position::{Body, Dimensions, Position, Rect};
use crate::components::renderer::{Renderer, SpriteSnapshot};
use crate::error::EngineResult;
use crate::systems::animator::Animate;

static NEXT_SPRITE_ID: AtomicU64 = AtomicU64::new(1);

pub struct Sprite {
    id: String,
    states: FxHashMap<String, AnimationState>,
    state_name: Option<String>,
    /// Interval of the active state; a `STOP` state zeroes it once finished.
    active_interval: Interval,
    frame_index: usize,
    direction: isize,
    body: Body,
    explicit_size: bool,
    pub opacity: f64,
    /// Mirror horizontally while moving left.
    pub auto_flip_x: bool,
    /// Mirror vertically while moving up.
    pub auto_flip_y: bool,
    flip_x: bool,
    flip_y: bool,
    dynamics: Option<Dynamics>,
    adjuster: Option<Box<dyn Adjuster>>,
    renderer: Box<dyn Renderer>,
    killed: bool,
}

impl Sprite {
    /// Create a sprite with no states. The debug id is `"{base_name}#{n}"`.
    pub fn new(base_name: &str, renderer: Box<dyn Renderer>) -> Self {
        let n = NEXT_SPRITE_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{base_name}#{n}"),
            states: FxHashMap::default(),
            state_name: None,
            active_interval: Interval::Fixed(0.0),
            frame_index: 0,
            direction: 1,
            body: Body::default(),
            explicit_size: false,
            opacity: 1.0,
            auto_flip_x: false,
            auto_flip_y: false,
            flip_x: false,
            flip_y: false,
            dynamics: None,
            adjuster: None,
            renderer,
            killed: false,
        }
    }

    pub fn with_state(mut self, name: &str, state: AnimationState) -> Self {
        self.set_state_frames(name, state);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    // ---------------------------------------------------------------- states

    /// Register or replace a state.
    ///
    /// A state without frames is logged and ignored. The first state ever
    /// registered becomes active; replacing the active state restarts it.
    pub fn set_state_frames(&mut self, name: &str, state: AnimationState) {
        if state.frames.is_empty() {
            warn!("[sprite] {}: state '{}' has no frames, ignored", self.id, name);
            return;
        }
        self.states.insert(name.to_string(), state);
        let is_active = self.state_name.as_deref() == Some(name);
        if self.state_name.is_none() || is_active {
            self.activate(name);
        }
    }

    /// Switch the active state. Unknown names are logged and ignored;
    /// selecting the state that is already active changes nothing.
    pub fn set_state(&mut self, name: &str) {
        if self.state_name.as_deref() == Some(name) {
            return;
        }
        if !self.states.contains_key(name) {
            warn!("[sprite] {}: unknown state '{}'", self.id, name);
            return;
        }
        self.activate(name);
    }

    fn activate(&mut self, name: &str) {
        let Some(state) = self.states.get(name) else {
            return;
        };
        self.active_interval = state.interval.clone();
        if !self.explicit_size
            && let Some(first) = state.first_frame()
        {
            self.body.dimensions = Dimensions::new(first.width, first.height);
        }
        self.frame_index = 0;
        self.direction = 1;
        self.state_name = Some(name.to_string());
        debug!("[sprite] {} -> state '{}'", self.id, name);
    }

    pub fn state(&self) -> Option<&str> {
        self.state_name.as_deref()
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    fn active_state(&self) -> Option<&AnimationState> {
        self.state_name.as_ref().and_then(|n| self.states.get(n))
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// +1 or -1; only `OSCILLATE` states ever run backwards.
    pub fn direction(&self) -> isize {
        self.direction
    }

    pub fn current_frame(&self) -> Option<&FrameData> {
        self.active_state()
            .and_then(|state| state.frames.get(self.frame_index))
    }

    // -------------------------------------------------------------- geometry

    pub fn position(&self) -> &Position {
        &self.body.position
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.body.position.x = x;
        self.body.position.y = y;
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.body.dimensions
    }

    /// Fix the size explicitly; state switches stop overriding it.
    pub fn set_dimensions(&mut self, width: f64, height: f64) {
        self.body.dimensions = Dimensions::new(width, height);
        self.explicit_size = true;
    }

    pub fn bounds(&self) -> Rect {
        self.body.bounds()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn flips(&self) -> (bool, bool) {
        (self.flip_x, self.flip_y)
    }

    // ------------------------------------------------------- motion/behaviour

    pub fn set_dynamics(&mut self, dynamics: Dynamics) {
        self.dynamics = Some(dynamics);
    }

    pub fn dynamics(&self) -> Option<&Dynamics> {
        self.dynamics.as_ref()
    }

    pub fn dynamics_mut(&mut self) -> Option<&mut Dynamics> {
        self.dynamics.as_mut()
    }

    /// Body and dynamics borrowed together, for code that moves the sprite.
    pub fn motion_mut(&mut self) -> Option<(&mut Body, &mut Dynamics)> {
        let body = &mut self.body;
        self.dynamics.as_mut().map(|d| (body, d))
    }

    pub fn has_adjuster(&self) -> bool {
        self.adjuster.is_some()
    }

    /// Attach `adjuster`, silently discarding any previous one (its
    /// completion callback does not run).
    pub fn set_adjuster<A: Adjuster + 'static>(&mut self, adjuster: A) {
        self.replace_adjuster(Some(Box::new(adjuster)), false);
    }

    /// Drop the current adjuster without running its callback.
    pub fn clear_adjuster(&mut self) {
        self.replace_adjuster(None, false);
    }

    /// Swap the adjuster. With `notify_previous` the old adjuster completes
    /// with [`CompletionReason::Replaced`] and its callback runs.
    pub fn replace_adjuster(&mut self, adjuster: Option<Box<dyn Adjuster>>, notify_previous: bool) {
        if let Some(mut previous) = std::mem::replace(&mut self.adjuster, adjuster) {
            if notify_previous {
                previous.mark_complete(CompletionReason::Replaced);
            } else {
                previous.core_mut().discard();
            }
        }
    }

    // ------------------------------------------------------------- lifecycle

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Release the renderer and mark the sprite dead. Safe to call twice.
    pub fn kill(&mut self) {
        if self.killed {
            return;
        }
        self.killed = true;
        self.renderer.kill();
        if let Some(mut adjuster) = self.adjuster.take() {
            adjuster.mark_complete(CompletionReason::Killed);
        }
        debug!("[sprite] {} killed", self.id);
    }

    /// Advance the sprite by one display frame.
    pub fn update(&mut self, timestamp: f64, delta_seconds: f64) -> EngineResult<()> {
        if self.killed {
            return Ok(());
        }

        if let Some(dynamics) = self.dynamics.as_mut() {
            dynamics.integrate(&mut self.body, delta_seconds);
            if self.auto_flip_x && dynamics.vx != 0.0 {
                self.flip_x = dynamics.vx < 0.0;
            }
            if self.auto_flip_y && dynamics.vy != 0.0 {
                self.flip_y = dynamics.vy < 0.0;
            }
        }

        if let Some(mut adjuster) = self.adjuster.take() {
            let result = adjuster.adjust(self, timestamp, delta_seconds);
            // Keep it unless it finished or installed a successor.
            if !adjuster.is_complete() && self.adjuster.is_none() && !self.killed {
                self.adjuster = Some(adjuster);
            }
            result?;
        }
        if self.killed {
            return Ok(());
        }

        self.advance_frame(timestamp);
        self.render();
        Ok(())
    }

    fn advance_frame(&mut self, timestamp: f64) {
        let Some(state) = self.state_name.as_ref().and_then(|n| self.states.get(n)) else {
            return;
        };
        let count = state.frames.len();
        if state.cycle == CycleType::None || count < 2 {
            return;
        }

        let resting;
        let dynamics = match self.dynamics.as_ref() {
            Some(d) => d,
            None => {
                resting = Dynamics::new();
                &resting
            }
        };
        let interval = self.active_interval.resolve(dynamics);
        if interval <= 0.0 {
            return;
        }

        let due = ((timestamp / interval).floor() as i64).rem_euclid(count as i64) as usize;
        if due == self.frame_index {
            return;
        }

        let last = count - 1;
        match state.cycle {
            CycleType::Loop => {
                self.frame_index = if self.frame_index >= last {
                    0
                } else {
                    self.frame_index + 1
                };
            }
            CycleType::Oscillate => {
                let next = self.frame_index as isize + self.direction;
                if next > last as isize {
                    self.direction = -1;
                    self.frame_index = last - 1;
                } else if next < 0 {
                    self.direction = 1;
                    self.frame_index = 1;
                } else {
                    self.frame_index = next as usize;
                }
            }
            CycleType::Stop => {
                self.frame_index = (self.frame_index + 1).min(last);
                if self.frame_index == last {
                    self.active_interval = Interval::Fixed(0.0);
                }
            }
            CycleType::None => {}
        }
    }

    /// Current presentation state, or `None` before any state is registered.
    pub fn snapshot(&self) -> Option<SpriteSnapshot> {
        let frame = *self.current_frame()?;
        Some(SpriteSnapshot {
            frame,
            position: self.body.position,
            dimensions: self.body.dimensions,
            opacity: self.opacity,
            flip_x: self.flip_x ^ frame.flip_x,
            flip_y: self.flip_y ^ frame.flip_y,
        })
    }

    fn render(&mut self) {
        if let Some(snapshot) = self.snapshot() {
            self.renderer.render(&snapshot);
        }
    }
}

impl Animate for Sprite {
    fn update(&mut self, timestamp: f64, delta_seconds: f64) -> EngineResult<()> {
        Sprite::update(self, timestamp, delta_seconds)
    }

    fn is_killed(&self) -> bool {
        self.killed
    }

    fn kill(&mut self) {
        Sprite::kill(self);
    }
}

impl std::fmt::Debug for Sprite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sprite")
            .field("id", &self.id)
            .field("state", &self.state_name)
            .field("frame_index", &self.frame_index)
            .field("body", &self.body)
            .field("dynamics", &self.dynamics)
            .field("has_adjuster", &self.adjuster.is_some())
            .field("killed", &self.killed)
            .finish()
    }
}
