//! Messages crossing the music thread boundary.

/// Commands sent *to* the music thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicCmd {
    /// Stop playback; sources are torn down once their release tail ends.
    Stop,
    /// Exit at once without waiting for any tail.
    Shutdown,
}

/// Events sent *back* from the music thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicMessage {
    Started,
    /// Reached the end of a non-looping piece and released every source.
    Finished,
    /// A requested stop completed.
    Stopped,
}
