//! Per-tick logic.
//!
//! Submodules overview
//! - [`animator`] – frame clock ticking every registered target once per display frame
//! - [`audio`] – the music thread that clocks a sequence player in real time
//! - [`mixer`] – offline rendering of a piece to samples and WAV files
//! - [`notedecoder`] – note-string decoding into per-quaver frequency slots
//! - [`sequenceplayer`] – per-quaver scheduling of pitch and envelopes on voices
//! - [`voice`] – voice capability and the software oscillator/noise voice

pub mod animator;
pub mod audio;
pub mod mixer;
pub mod notedecoder;
pub mod sequenceplayer;
pub mod voice;
