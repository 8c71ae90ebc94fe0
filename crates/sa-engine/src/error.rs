//! Engine errors.

use thiserror::Error;

/// A parameter outside its accepted range. Raised before any state changes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("song {index} does not exist (module has {count} songs)")]
    SongIndex { index: usize, count: usize },
    #[error("sample rate {0} Hz outside 2000..=200000")]
    SampleRate(u32),
    #[error("song speed {0} outside 1..=16")]
    SongSpeed(u16),
    #[error("{0} interrupts per second outside 1..=200")]
    InterruptRate(u16),
    #[error("track index {0} outside 0..=3")]
    TrackIndex(usize),
    #[error("cannot read {0} ms at once (limit is 1000 ms)")]
    ReadTooLong(u32),
    #[error("loop limit {0} exceeds 100")]
    LoopLimit(u32),
}

/// Errors reported by [`crate::Stream`] operations.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Range(#[from] RangeError),
    /// The end-of-stream boundary was consumed. Only a reset recovers.
    #[error("end of stream reached")]
    EndOfStream,
    #[error("failed to write PCM data: {0}")]
    Io(#[from] std::io::Error),
}
