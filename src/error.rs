use thiserror::Error;

use crate::core::clock::Cu;

/// Errors surfaced by the judgment and progression core.
///
/// None of these cross the core boundary as panics; callers log them and
/// carry on with the request treated as a no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A section asked for a chart the store does not hold.
    #[error("Chart not found: index {index} (store holds {available})")]
    ChartNotFound { index: usize, available: usize },

    /// A press named a lane the track does not have.
    #[error("Invalid lane {lane} (track has {lanes})")]
    InvalidLane { lane: usize, lanes: usize },

    /// The marker hand-off queue is full; the marker was dropped.
    #[error("Timeline queue full, dropped marker at {position}")]
    TimelineQueueFull { position: Cu },

    /// The frame side of the marker hand-off has gone away.
    #[error("Timeline receiver disconnected")]
    TimelineDisconnected,

    /// The configuration file could not be read or written.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<ini::Error> for CoreError {
    fn from(e: ini::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Config(e.to_string())
    }
}
