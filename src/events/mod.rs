//! Message types exchanged across thread boundaries.
//!
//! Submodules:
//! - [`audio`] – commands and messages for the music thread

pub mod audio;
