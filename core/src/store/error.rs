//! Error types for store operations

use thiserror::Error;

use bingo_types::{BoardId, BoardTileId, EarnedEffectId};

use crate::board::LineType;
use crate::effects::EffectStatus;

/// Errors from the record store.
///
/// Conflict variants are recoverable by design: a version conflict means
/// "retry the read-modify-write", a line conflict means "a concurrent
/// winner already handled it".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("position ({row}, {column}) on board {board} is already occupied")]
    PositionTaken {
        board: BoardId,
        row: u32,
        column: u32,
    },

    #[error("tile progress for {0} was modified concurrently")]
    ProgressVersionConflict(BoardTileId),

    #[error("line completion already recorded for board {board} {line_type:?} {index}")]
    LineAlreadyCompleted {
        board: BoardId,
        line_type: LineType,
        index: u32,
    },

    #[error("effect {0} is not available or has no remaining uses")]
    EffectUnavailable(EarnedEffectId),

    #[error("illegal effect status transition {from:?} -> {to:?} for {id}")]
    InvalidTransition {
        id: EarnedEffectId,
        from: EffectStatus,
        to: EffectStatus,
    },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
