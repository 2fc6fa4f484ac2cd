//! Error taxonomy for the scheduling core.

use crate::proposer::ProposerError;
use thiserror::Error;

/// Errors surfaced by generation, grid edits, and publication. The HTTP
/// boundary is the only place these are translated into status codes.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The requested level has no record
    #[error("Level {0} not found")]
    LevelNotFound(i64),

    /// Point lookup by schedule id came up empty
    #[error("Schedule {0} not found")]
    ScheduleNotFound(String),

    /// Request body carried no level number
    #[error("Level number is required")]
    MissingLevel,

    /// Request body carried no grid
    #[error("Grid is required")]
    MissingGrid,

    /// Level outside the academic range
    #[error("Invalid academic level provided: {0}")]
    InvalidLevel(i64),

    /// A concurrent publisher won the version race; retry against the
    /// current version
    #[error("Schedule {id} was published concurrently (expected version {expected})")]
    PublishConflict { id: String, expected: i64 },

    /// The external proposer failed or returned garbage
    #[error("Proposer failure: {0}")]
    Proposer(#[from] ProposerError),

    /// Store read/write failed
    #[error("Store failure: {0}")]
    Store(#[from] rusqlite::Error),

    /// JSON (de)serialization failed
    #[error("Serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}
