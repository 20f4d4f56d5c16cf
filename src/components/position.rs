//! Design-space geometry shared by sprites, limiters and adjusters.
//!
//! All coordinates live in a single "design space"; scaling to the viewport
//! is done by whoever renders. A sprite's [`Position`] is the top-left corner
//! of its bounding box, and `angle` is in radians.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    /// Rotation in radians, kept within `[0, 2π)` by the integrator.
    #[serde(default)]
    pub angle: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, angle: 0.0 }
    }

    /// Bounding box of something at this position with the given size.
    pub fn bounds(&self, dimensions: &Dimensions) -> Rect {
        Rect::new(self.x, self.y, dimensions.width, dimensions.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// The placement part of a sprite that motion code is allowed to touch.
///
/// Limiters and integrators receive a `&mut Body` instead of the whole
/// sprite, which keeps them free of any back-reference to their owner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Body {
    pub position: Position,
    pub dimensions: Dimensions,
}

impl Body {
    pub fn bounds(&self) -> Rect {
        self.position.bounds(&self.dimensions)
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Strict AABB overlap. Rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}
