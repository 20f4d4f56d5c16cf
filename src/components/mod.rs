//! Plain data attached to sprites and music tracks.
//!
//! Submodules overview:
//! - [`adjuster`] – behaviours attached to a sprite that complete once (reach a target, leave bounds, follow a path)
//! - [`animation`] – frame rectangles, cycle policies and animation states
//! - [`automation`] – scheduled parameter curves for voice gain and frequency
//! - [`dynamics`] – velocity/acceleration integrator with an optional bounds limiter
//! - [`instrument`] – waveform, envelope, sweep and noise-filter descriptors
//! - [`position`] – position, dimensions, bodies and rectangles
//! - [`renderer`] – the rendering capability a sprite draws through
//! - [`sprite`] – the animated, stateful sprite entity
//! - [`track`] – music and track definitions and their decoded form

pub mod adjuster;
pub mod animation;
pub mod automation;
pub mod dynamics;
pub mod instrument;
pub mod position;
pub mod renderer;
pub mod sprite;
pub mod track;
