//! Engine-level error taxonomy
//!
//! Calculators and the matcher never error for "no match"; only truly
//! malformed input is rejected. Conflict-shaped store errors are
//! recoverable (retried or treated as already-handled); what reaches a
//! caller through `EngineError` is a genuine per-event failure, never a
//! half-applied progress write.

use thiserror::Error;

use bingo_types::BoardTileId;

use crate::effects::CatalogError;
use crate::event::EventError;
use crate::stats::StatsError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// External stats lookup failed; retryable, scoped to the one tile
    /// whose requirement needed the snapshot.
    #[error(transparent)]
    Stats(#[from] StatsError),

    /// Rejected outright, never silently coerced.
    #[error("invariant violation: {reason}")]
    InvariantViolation { reason: String },

    #[error("progress update for tile {0} exhausted its retry budget")]
    RetriesExhausted(BoardTileId),
}

impl EngineError {
    /// Whether the caller may safely retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Stats(_)
                | Self::RetriesExhausted(_)
                | Self::Store(StoreError::ProgressVersionConflict(_))
        )
    }
}
