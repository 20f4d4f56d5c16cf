//! Spritesynth library.
//!
//! A small 2D engine core: animated sprites with simple dynamics and
//! completion-based behaviours driven by a frame clock, plus a note-notation
//! synthesiser that schedules oscillator envelopes per quaver.
//!
//! Modules are exposed for the CLI, integration tests and reuse as a library.

pub mod components;
pub mod error;
pub mod events;
pub mod resources;
pub mod systems;
