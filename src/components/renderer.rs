//! Presentation seam for sprites.
//!
//! A sprite never knows how it is drawn. After every update it hands a
//! [`SpriteSnapshot`] to its [`Renderer`], and on `kill()` it asks the
//! renderer to release whatever it holds. One implementation exists per
//! presentation strategy.

use log::trace;

use crate::components::animation::FrameData;
use crate::components::position::{Dimensions, Position};

/// Everything a renderer needs to draw one sprite for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteSnapshot {
    pub frame: FrameData,
    pub position: Position,
    pub dimensions: Dimensions,
    pub opacity: f64,
    pub flip_x: bool,
    pub flip_y: bool,
}

pub trait Renderer {
    fn render(&mut self, snapshot: &SpriteSnapshot);
    /// Release presentation resources. May finish asynchronously.
    fn kill(&mut self);
}

/// Renderer that draws nothing.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _snapshot: &SpriteSnapshot) {}
    fn kill(&mut self) {}
}

/// Renderer that traces every snapshot. Used by the headless demo.
#[derive(Debug)]
pub struct LogRenderer {
    label: String,
}

impl LogRenderer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, s: &SpriteSnapshot) {
        trace!(
            "[render] {} at ({:.1},{:.1}) frame=({},{} {}x{}) flip=({},{}) alpha={:.2}",
            self.label,
            s.position.x,
            s.position.y,
            s.frame.x,
            s.frame.y,
            s.frame.width,
            s.frame.height,
            s.flip_x,
            s.flip_y,
            s.opacity
        );
    }

    fn kill(&mut self) {
        trace!("[render] {} released", self.label);
    }
}
