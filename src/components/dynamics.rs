//! Linear and angular motion state for a single sprite.
//!
//! [`Dynamics`] stores velocity and acceleration for x, y and angle and
//! integrates them into a [`Body`] once per tick. An optional [`Limiter`]
//! runs after every integration step and may clamp the body and rewrite the
//! velocity, e.g. to bounce inside a rectangle.
//!
//! Integration order per step:
//! 1. position += velocity * dt (velocity from before this step)
//! 2. velocity += acceleration * dt
//! 3. limiter (if any)

use std::f64::consts::TAU;
use std::fmt;

use crate::components::position::{Body, Rect};

/// Post-integration hook.
pub enum Limiter {
    /// Elastic bounce inside a rectangle: the bounding box is clamped to the
    /// rectangle and the offending velocity component is pointed back inside.
    Bounce(Rect),
    /// Arbitrary user limiter.
    Custom(Box<dyn FnMut(&mut Body, &mut Dynamics)>),
}

impl fmt::Debug for Limiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limiter::Bounce(rect) => f.debug_tuple("Bounce").field(rect).finish(),
            Limiter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Velocity and acceleration for x, y and angle.
#[derive(Debug, Default)]
pub struct Dynamics {
    pub vx: f64,
    pub vy: f64,
    pub v_angle: f64,
    pub ax: f64,
    pub ay: f64,
    pub a_angle: f64,
    pub limiter: Option<Limiter>,
}

impl Dynamics {
    /// Dynamics at rest with no limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dynamics with an initial linear velocity.
    pub fn with_velocity(vx: f64, vy: f64) -> Self {
        Self {
            vx,
            vy,
            ..Self::default()
        }
    }

    pub fn with_acceleration(mut self, ax: f64, ay: f64) -> Self {
        self.ax = ax;
        self.ay = ay;
        self
    }

    pub fn with_angular(mut self, v_angle: f64, a_angle: f64) -> Self {
        self.v_angle = v_angle;
        self.a_angle = a_angle;
        self
    }

    pub fn with_limiter(mut self, limiter: Limiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// True if any of the six scalars is non-zero.
    pub fn is_moving(&self) -> bool {
        self.vx != 0.0
            || self.vy != 0.0
            || self.v_angle != 0.0
            || self.ax != 0.0
            || self.ay != 0.0
            || self.a_angle != 0.0
    }

    /// Zero every velocity and acceleration component.
    pub fn stop(&mut self) {
        self.vx = 0.0;
        self.vy = 0.0;
        self.v_angle = 0.0;
        self.ax = 0.0;
        self.ay = 0.0;
        self.a_angle = 0.0;
    }

    /// Advance `body` by one step of `delta_seconds`.
    pub fn integrate(&mut self, body: &mut Body, delta_seconds: f64) {
        let position = &mut body.position;
        position.x += delta_seconds * self.vx;
        position.y += delta_seconds * self.vy;
        position.angle = (position.angle + delta_seconds * self.v_angle).rem_euclid(TAU);

        self.vx += delta_seconds * self.ax;
        self.vy += delta_seconds * self.ay;
        self.v_angle += delta_seconds * self.a_angle;

        // The limiter receives `self`, so it is moved out for the call.
        if let Some(mut limiter) = self.limiter.take() {
            match &mut limiter {
                Limiter::Bounce(rect) => bounce_within(rect, body, self),
                Limiter::Custom(f) => f(body, self),
            }
            if self.limiter.is_none() {
                self.limiter = Some(limiter);
            }
        }
    }
}

/// Clamp `body` inside `bounds`, reflecting the velocity on each violated edge.
pub fn bounce_within(bounds: &Rect, body: &mut Body, dynamics: &mut Dynamics) {
    let width = body.dimensions.width;
    let height = body.dimensions.height;
    let pos = &mut body.position;

    if pos.x < bounds.x {
        pos.x = bounds.x;
        dynamics.vx = dynamics.vx.abs();
    } else if pos.x + width > bounds.right() {
        pos.x = bounds.right() - width;
        dynamics.vx = -dynamics.vx.abs();
    }

    if pos.y < bounds.y {
        pos.y = bounds.y;
        dynamics.vy = dynamics.vy.abs();
    } else if pos.y + height > bounds.bottom() {
        pos.y = bounds.bottom() - height;
        dynamics.vy = -dynamics.vy.abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::position::{Dimensions, Position};
    use std::cell::Cell;
    use std::rc::Rc;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn body_at(x: f64, y: f64, w: f64, h: f64) -> Body {
        Body {
            position: Position::new(x, y),
            dimensions: Dimensions::new(w, h),
        }
    }

    #[test]
    fn test_new_is_at_rest() {
        let d = Dynamics::new();
        assert!(!d.is_moving());
        assert!(d.limiter.is_none());
    }

    #[test]
    fn test_is_moving_checks_every_scalar() {
        assert!(Dynamics::with_velocity(0.0, 1.0).is_moving());
        assert!(Dynamics::new().with_acceleration(0.1, 0.0).is_moving());
        assert!(Dynamics::new().with_angular(0.0, 0.5).is_moving());
    }

    #[test]
    fn test_stop_zeroes_everything() {
        let mut d = Dynamics::with_velocity(3.0, 4.0)
            .with_acceleration(1.0, 1.0)
            .with_angular(2.0, 2.0);
        d.stop();
        assert!(!d.is_moving());
    }

    #[test]
    fn test_constant_velocity_is_deterministic() {
        let mut d = Dynamics::with_velocity(10.0, 0.0);
        let mut body = body_at(0.0, 0.0, 1.0, 1.0);
        for _ in 0..4 {
            d.integrate(&mut body, 0.5);
        }
        assert!(approx_eq(body.position.x, 20.0));
        assert!(approx_eq(body.position.y, 0.0));
    }

    #[test]
    fn test_position_uses_velocity_before_acceleration() {
        let mut d = Dynamics::new().with_acceleration(2.0, 0.0);
        let mut body = body_at(0.0, 0.0, 1.0, 1.0);
        d.integrate(&mut body, 1.0);
        // First step moves with v=0, then v becomes 2.
        assert!(approx_eq(body.position.x, 0.0));
        assert!(approx_eq(d.vx, 2.0));
        d.integrate(&mut body, 1.0);
        assert!(approx_eq(body.position.x, 2.0));
        assert!(approx_eq(d.vx, 4.0));
    }

    #[test]
    fn test_angle_wraps_into_full_turn() {
        let mut d = Dynamics::new().with_angular(TAU, 0.0);
        let mut body = body_at(0.0, 0.0, 1.0, 1.0);
        body.position.angle = 1.0;
        d.integrate(&mut body, 1.25);
        assert!(approx_eq(body.position.angle, 1.0 + 0.25 * TAU));

        let mut back = Dynamics::new().with_angular(-2.0, 0.0);
        let mut body = body_at(0.0, 0.0, 1.0, 1.0);
        back.integrate(&mut body, 1.0);
        assert!(body.position.angle >= 0.0 && body.position.angle < TAU);
        assert!(approx_eq(body.position.angle, TAU - 2.0));
    }

    #[test]
    fn test_bounce_left_edge() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut d = Dynamics::with_velocity(-5.0, 0.0).with_limiter(Limiter::Bounce(bounds));
        let mut body = body_at(2.0, 50.0, 10.0, 10.0);
        d.integrate(&mut body, 1.0);
        assert!(approx_eq(body.position.x, 0.0));
        assert!(approx_eq(d.vx, 5.0));
    }

    #[test]
    fn test_bounce_right_and_bottom_edges() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut d = Dynamics::with_velocity(5.0, 8.0).with_limiter(Limiter::Bounce(bounds));
        let mut body = body_at(88.0, 85.0, 10.0, 10.0);
        d.integrate(&mut body, 1.0);
        assert!(approx_eq(body.position.x, 90.0));
        assert!(approx_eq(body.position.y, 90.0));
        assert!(approx_eq(d.vx, -5.0));
        assert!(approx_eq(d.vy, -8.0));
        assert!(d.limiter.is_some());
    }

    #[test]
    fn test_bounce_top_edge_forces_positive_velocity() {
        let bounds = Rect::new(0.0, 10.0, 100.0, 100.0);
        let mut d = Dynamics::with_velocity(0.0, -3.0).with_limiter(Limiter::Bounce(bounds));
        let mut body = body_at(50.0, 11.0, 10.0, 10.0);
        d.integrate(&mut body, 1.0);
        assert!(approx_eq(body.position.y, 10.0));
        assert!(approx_eq(d.vy, 3.0));
    }

    #[test]
    fn test_limiter_runs_after_velocity_update() {
        let seen = Rc::new(Cell::new(0.0));
        let seen_in = Rc::clone(&seen);
        let mut d = Dynamics::with_velocity(1.0, 0.0)
            .with_acceleration(1.0, 0.0)
            .with_limiter(Limiter::Custom(Box::new(move |body, dynamics| {
                seen_in.set(body.position.x + dynamics.vx);
            })));
        let mut body = body_at(0.0, 0.0, 1.0, 1.0);
        d.integrate(&mut body, 1.0);
        // x = 1 after the move, vx = 2 after acceleration
        assert!(approx_eq(seen.get(), 3.0));
    }

    #[test]
    fn test_custom_limiter_may_replace_itself() {
        let mut d = Dynamics::with_velocity(1.0, 0.0).with_limiter(Limiter::Custom(Box::new(
            |_body, dynamics| {
                dynamics.limiter = Some(Limiter::Bounce(Rect::new(0.0, 0.0, 1.0, 1.0)));
            },
        )));
        let mut body = body_at(0.0, 0.0, 1.0, 1.0);
        d.integrate(&mut body, 0.1);
        assert!(matches!(d.limiter, Some(Limiter::Bounce(_))));
    }
}
