//! Pluggable per-tick behaviour policies for sprites.
//!
//! An [`Adjuster`] is attached to exactly one [`Sprite`] and is called once
//! per sprite update, after motion has been integrated. It reads and writes
//! the sprite's body and dynamics, and eventually completes with a
//! [`CompletionReason`]. On completion the sprite drops it.
//!
//! Adjusters never hold a reference to their sprite: the sprite lends itself
//! to [`Adjuster::adjust`] for the duration of the call, so there is no
//! sprite/adjuster cycle to break.
//!
//! Variants:
//! - [`ReachTargetXY`] – stop each axis as it arrives at a target point
//! - [`TerminateOutOfBounds`] – finish (and optionally kill) once the sprite
//!   has left a rectangle entirely
//! - [`FollowPath`] – walk a list of waypoints at a fixed speed
//!
//! # Replacement
//!
//! Attaching a new adjuster through
//! [`Sprite::set_adjuster`](crate::components::sprite::Sprite::set_adjuster)
//! discards the previous one *without* running its completion callback.
//! Callers that need the callback must call [`Adjuster::mark_complete`]
//! first, or use
//! [`Sprite::replace_adjuster`](crate::components::sprite::Sprite::replace_adjuster)
//! with `notify_previous = true`.

use std::collections::VecDeque;
use std::fmt;

use log::debug;

use crate::components::position::Rect;
use crate::components::sprite::Sprite;
use crate::error::{EngineError, EngineResult};

/// Why an adjuster finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReason {
    /// The target (or the last waypoint) was reached.
    Reached,
    /// The sprite left the watched rectangle.
    OutOfBounds,
    /// Another adjuster took its place.
    Replaced,
    /// The sprite was killed while the adjuster was attached.
    Killed,
    /// Game-specific reason.
    Custom(String),
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionReason::Reached => f.write_str("reached"),
            CompletionReason::OutOfBounds => f.write_str("out-of-bounds"),
            CompletionReason::Replaced => f.write_str("replaced"),
            CompletionReason::Killed => f.write_str("killed"),
            CompletionReason::Custom(s) => f.write_str(s),
        }
    }
}

pub type CompletionCallback = Box<dyn FnOnce(CompletionReason)>;

/// Completion bookkeeping shared by every adjuster variant.
#[derive(Default)]
pub struct AdjusterCore {
    reason: Option<CompletionReason>,
    on_completion: Option<CompletionCallback>,
}

impl AdjusterCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_on_completion(&mut self, f: impl FnOnce(CompletionReason) + 'static) {
        self.on_completion = Some(Box::new(f));
    }

    pub fn is_complete(&self) -> bool {
        self.reason.is_some()
    }

    pub fn reason(&self) -> Option<&CompletionReason> {
        self.reason.as_ref()
    }

    /// Complete with `reason`. Only the first call has any effect; the
    /// callback, if still registered, runs exactly once.
    pub fn mark_complete(&mut self, reason: CompletionReason) {
        if self.reason.is_some() {
            return;
        }
        self.reason = Some(reason.clone());
        if let Some(callback) = self.on_completion.take() {
            callback(reason);
        }
    }

    /// Complete as [`CompletionReason::Replaced`] with the callback dropped.
    pub fn discard(&mut self) {
        self.on_completion = None;
        self.mark_complete(CompletionReason::Replaced);
    }
}

impl fmt::Debug for AdjusterCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdjusterCore")
            .field("reason", &self.reason)
            .field("has_callback", &self.on_completion.is_some())
            .finish()
    }
}

pub trait Adjuster {
    /// Apply one tick of behaviour to `sprite`.
    fn adjust(&mut self, sprite: &mut Sprite, timestamp: f64, delta_seconds: f64)
    -> EngineResult<()>;

    fn core(&self) -> &AdjusterCore;

    fn core_mut(&mut self) -> &mut AdjusterCore;

    fn is_complete(&self) -> bool {
        self.core().is_complete()
    }

    fn mark_complete(&mut self, reason: CompletionReason) {
        self.core_mut().mark_complete(reason);
    }
}

/// True once `position` has arrived at `target` travelling with `velocity`.
fn axis_reached(velocity: f64, position: f64, target: f64) -> bool {
    if velocity < 0.0 {
        position <= target
    } else {
        position >= target
    }
}

/// Moves a sprite until it arrives at a target point.
///
/// Each axis is handled on its own: when the sprite passes the target in the
/// direction of its current velocity, that axis' velocity and acceleration
/// are zeroed and the position snaps to the target. The adjuster completes
/// with [`CompletionReason::Reached`] once neither axis is moving.
///
/// Requires the sprite to carry dynamics.
#[derive(Debug)]
pub struct ReachTargetXY {
    pub target_x: f64,
    pub target_y: f64,
    core: AdjusterCore,
}

impl ReachTargetXY {
    pub fn new(target_x: f64, target_y: f64) -> Self {
        Self {
            target_x,
            target_y,
            core: AdjusterCore::new(),
        }
    }

    pub fn on_completion(mut self, f: impl FnOnce(CompletionReason) + 'static) -> Self {
        self.core.set_on_completion(f);
        self
    }
}

impl Adjuster for ReachTargetXY {
    fn adjust(&mut self, sprite: &mut Sprite, _timestamp: f64, _delta: f64) -> EngineResult<()> {
        if self.is_complete() {
            return Ok(());
        }
        let id = sprite.id().to_string();
        let (body, dynamics) = sprite
            .motion_mut()
            .ok_or(EngineError::MissingDynamics { sprite: id })?;
        let pos = &mut body.position;

        if axis_reached(dynamics.vx, pos.x, self.target_x) {
            dynamics.vx = 0.0;
            dynamics.ax = 0.0;
            pos.x = self.target_x;
        }
        if axis_reached(dynamics.vy, pos.y, self.target_y) {
            dynamics.vy = 0.0;
            dynamics.ay = 0.0;
            pos.y = self.target_y;
        }

        // An axis that is still accelerating from rest has not arrived yet.
        let x_done = dynamics.vx == 0.0 && dynamics.ax == 0.0;
        let y_done = dynamics.vy == 0.0 && dynamics.ay == 0.0;
        if x_done && y_done {
            self.mark_complete(CompletionReason::Reached);
        }
        Ok(())
    }

    fn core(&self) -> &AdjusterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AdjusterCore {
        &mut self.core
    }
}

/// Completes once the sprite's bounding box no longer overlaps `bounds`.
///
/// On completion all dynamics are zeroed and, if `kill` is set, the sprite
/// is killed.
#[derive(Debug)]
pub struct TerminateOutOfBounds {
    pub bounds: Rect,
    pub kill: bool,
    core: AdjusterCore,
}

impl TerminateOutOfBounds {
    pub fn new(bounds: Rect, kill: bool) -> Self {
        Self {
            bounds,
            kill,
            core: AdjusterCore::new(),
        }
    }

    pub fn on_completion(mut self, f: impl FnOnce(CompletionReason) + 'static) -> Self {
        self.core.set_on_completion(f);
        self
    }
}

impl Adjuster for TerminateOutOfBounds {
    fn adjust(&mut self, sprite: &mut Sprite, _timestamp: f64, _delta: f64) -> EngineResult<()> {
        if self.is_complete() || self.bounds.overlaps(&sprite.bounds()) {
            return Ok(());
        }
        debug!("[adjuster] {} left {:?}", sprite.id(), self.bounds);
        if let Some(dynamics) = sprite.dynamics_mut() {
            dynamics.stop();
        }
        self.mark_complete(CompletionReason::OutOfBounds);
        if self.kill {
            sprite.kill();
        }
        Ok(())
    }

    fn core(&self) -> &AdjusterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AdjusterCore {
        &mut self.core
    }
}

/// Walks a sprite through a list of waypoints at constant speed.
///
/// For each waypoint the velocity is pointed straight at it and arrival is
/// delegated to an inner [`ReachTargetXY`]. Completes with
/// [`CompletionReason::Reached`] after the last waypoint.
#[derive(Debug)]
pub struct FollowPath {
    waypoints: VecDeque<(f64, f64)>,
    speed: f64,
    leg: Option<ReachTargetXY>,
    reached: usize,
    core: AdjusterCore,
}

impl FollowPath {
    pub fn new(waypoints: impl IntoIterator<Item = (f64, f64)>, speed: f64) -> Self {
        Self {
            waypoints: waypoints.into_iter().collect(),
            speed,
            leg: None,
            reached: 0,
            core: AdjusterCore::new(),
        }
    }

    pub fn on_completion(mut self, f: impl FnOnce(CompletionReason) + 'static) -> Self {
        self.core.set_on_completion(f);
        self
    }

    /// Number of waypoints already reached.
    pub fn reached(&self) -> usize {
        self.reached
    }

    /// Aim the sprite at the next waypoint. Returns false when none is left.
    fn start_leg(&mut self, sprite: &mut Sprite) -> EngineResult<bool> {
        let Some((tx, ty)) = self.waypoints.pop_front() else {
            return Ok(false);
        };
        let id = sprite.id().to_string();
        let (body, dynamics) = sprite
            .motion_mut()
            .ok_or(EngineError::MissingDynamics { sprite: id })?;
        let dx = tx - body.position.x;
        let dy = ty - body.position.y;
        let distance = dx.hypot(dy);
        dynamics.ax = 0.0;
        dynamics.ay = 0.0;
        if distance > 0.0 {
            dynamics.vx = self.speed * dx / distance;
            dynamics.vy = self.speed * dy / distance;
        } else {
            dynamics.vx = 0.0;
            dynamics.vy = 0.0;
        }
        self.leg = Some(ReachTargetXY::new(tx, ty));
        Ok(true)
    }
}

impl Adjuster for FollowPath {
    fn adjust(&mut self, sprite: &mut Sprite, timestamp: f64, delta: f64) -> EngineResult<()> {
        if self.is_complete() {
            return Ok(());
        }
        if self.leg.is_none() && !self.start_leg(sprite)? {
            self.mark_complete(CompletionReason::Reached);
            return Ok(());
        }
        if let Some(leg) = self.leg.as_mut() {
            leg.adjust(sprite, timestamp, delta)?;
            if leg.is_complete() {
                self.leg = None;
                self.reached += 1;
                if self.waypoints.is_empty() {
                    self.mark_complete(CompletionReason::Reached);
                } else {
                    self.start_leg(sprite)?;
                }
            }
        }
        Ok(())
    }

    fn core(&self) -> &AdjusterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AdjusterCore {
        &mut self.core
    }
}
