//! Engine error type.
//!
//! Only the failures that a caller must react to live here: missing setup,
//! API misuse and I/O. Authored-content problems (unknown state names, bad
//! note tokens, missing sheet frames) are logged where they happen and never
//! reach this type.

use thiserror::Error;

/// Result alias used across the crate.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A factory was used before its sprite sheet or renderer maker was set.
    #[error("sprite factory is not configured: missing {0}")]
    FactoryNotConfigured(&'static str),

    /// An adjuster needs a [`Dynamics`](crate::components::dynamics::Dynamics)
    /// on the sprite it drives.
    #[error("sprite '{sprite}' has no dynamics attached")]
    MissingDynamics { sprite: String },

    /// A music channel already has a bound player.
    #[error("music channel already has a player bound")]
    ChannelBusy,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),
}
