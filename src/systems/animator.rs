//! Frame clock driving every animated target once per display frame.
//!
//! The host owns the real display-frame callback (vsync, a window event
//! loop, a browser `requestAnimationFrame` bridge...). The [`Animator`] only
//! says whether it wants another frame: the host polls
//! [`Animator::take_frame_request`] and, when it returns true, calls
//! [`Animator::frame`] on the next display frame with that frame's timestamp.
//! Stopping the loop therefore needs no cancellation: the animator simply
//! stops asking.
//!
//! # Tick contract
//!
//! On every delivered frame, while active and not paused:
//! 1. `delta_seconds = (timestamp - last_timestamp) / 1000`, or 0 on the first
//!    frame after activation or resume,
//! 2. every registered target is updated in one pass,
//! 3. targets reporting [`Animate::is_killed`] are evicted (after their
//!    update, so a dying target always gets its final tick),
//! 4. another frame is requested, even with no targets.
//!
//! [`Animator::pause`]/[`Animator::resume`] never touch the active flag, so a
//! modal dialog can pause animation without the caller losing track of
//! whether it was meant to be running.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, error};

use crate::error::EngineResult;

/// Anything the animator can tick.
pub trait Animate {
    fn update(&mut self, timestamp: f64, delta_seconds: f64) -> EngineResult<()>;

    fn is_killed(&self) -> bool {
        false
    }

    fn kill(&mut self) {}
}

/// Shared handle to a registered target. Identity is the allocation.
pub type Target = Rc<RefCell<dyn Animate>>;

fn same_target(a: &Target, b: &Target) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

#[derive(Default)]
pub struct Animator {
    active: bool,
    paused: bool,
    last_timestamp: Option<f64>,
    frame_requested: bool,
    /// Upper bound on a single tick's delta in seconds; 0 disables it.
    max_delta: f64,
    targets: Vec<Target>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_delta(mut self, seconds: f64) -> Self {
        self.max_delta = seconds.max(0.0);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.active && !self.paused
    }

    /// Turn the frame loop on or off. Either way the reference timestamp is
    /// forgotten, so the next tick after resuming has a zero delta.
    pub fn set_active(&mut self, active: bool) {
        self.last_timestamp = None;
        self.active = active;
        self.frame_requested = self.is_running();
        debug!("[animator] active={}", active);
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.last_timestamp = None;
        self.frame_requested = false;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.last_timestamp = None;
        self.frame_requested = self.active;
    }

    /// Register a target. Adding the same target twice is a no-op.
    pub fn add_target(&mut self, target: Target) {
        if !self.targets.iter().any(|t| same_target(t, &target)) {
            self.targets.push(target);
        }
    }

    /// Unregister a target without killing it.
    pub fn remove_target(&mut self, target: &Target) {
        self.targets.retain(|t| !same_target(t, target));
    }

    /// Kill a target and unregister it.
    pub fn kill_target(&mut self, target: &Target) {
        target.borrow_mut().kill();
        self.remove_target(target);
    }

    pub fn contains(&self, target: &Target) -> bool {
        self.targets.iter().any(|t| same_target(t, target))
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Kill every target and deactivate.
    pub fn clear(&mut self) {
        for target in self.targets.drain(..) {
            target.borrow_mut().kill();
        }
        self.set_active(false);
    }

    /// True if the animator wants the next display frame. Consumes the request.
    pub fn take_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }

    /// Deliver one display frame. `timestamp` is in milliseconds; a frame
    /// without a timestamp only keeps the loop alive.
    ///
    /// Errors from targets are returned after the pass completes, so one
    /// misbehaving target neither starves the others nor stops the loop.
    pub fn frame(&mut self, timestamp: Option<f64>) -> EngineResult<()> {
        self.frame_requested = false;
        if !self.is_running() {
            return Ok(());
        }

        let mut first_error = None;
        if let Some(timestamp) = timestamp {
            let mut delta = match self.last_timestamp {
                Some(last) => ((timestamp - last) / 1000.0).max(0.0),
                None => 0.0,
            };
            if self.max_delta > 0.0 {
                delta = delta.min(self.max_delta);
            }
            self.last_timestamp = Some(timestamp);

            for target in &self.targets {
                if let Err(e) = target.borrow_mut().update(timestamp, delta) {
                    error!("[animator] target update failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
            self.targets.retain(|t| !t.borrow().is_killed());
        }

        self.frame_requested = true;
        first_error.map_or(Ok(()), Err)
    }

    /// Drive the loop from a simulated display clock, starting at `start_ms`
    /// and stepping `frame_ms` per frame, for at most `max_frames` frames.
    /// Stops early once no frame is requested. Returns the frames delivered.
    pub fn run_frames(
        &mut self,
        start_ms: f64,
        frame_ms: f64,
        max_frames: usize,
    ) -> EngineResult<usize> {
        let mut delivered = 0;
        let mut now = start_ms;
        while delivered < max_frames && self.take_frame_request() {
            self.frame(Some(now))?;
            delivered += 1;
            now += frame_ms;
        }
        Ok(delivered)
    }
}
