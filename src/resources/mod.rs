//! Long-lived shared state: configuration, lookup tables, asset metadata and
//! the music thread bridge.
//!
//! Submodules overview:
//! - [`audio`] – music channel bridging the game thread and the music thread
//! - [`engineconfig`] – INI-backed engine configuration
//! - [`notetable`] – process-wide frequency and chord tables
//! - [`spritefactory`] – builds sprites from sheet metadata
//! - [`spritesheet`] – frame-name to rectangle metadata

pub mod audio;
pub mod engineconfig;
pub mod notetable;
pub mod spritefactory;
pub mod spritesheet;
