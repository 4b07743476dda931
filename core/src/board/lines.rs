//! Line completion detection
//!
//! After a tile completes, re-read its row and its column; for each line
//! whose tiles are all complete, insert the LineCompletion record and
//! grant the board's configured effects. The store's uniqueness
//! constraint on (board, line type, index) is the sole race guard:
//! losing the insert means a concurrent completion already handled the
//! line, and the loser backs off without granting anything.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::effects::{EffectSource, EffectsEngine};
use crate::error::EngineError;
use crate::store::{Store, StoreError};

use super::{Board, BoardTile, LineCompletion, LineType};

#[derive(Clone)]
pub struct LineDetector {
    store: Arc<dyn Store>,
    effects: EffectsEngine,
}

impl LineDetector {
    pub fn new(store: Arc<dyn Store>, effects: EffectsEngine) -> Self {
        Self { store, effects }
    }

    /// Check the just-completed tile's row and column. Both can complete
    /// from one event. Returns the line completions this caller won.
    pub fn check_tile(
        &self,
        tile: &BoardTile,
        now: DateTime<Utc>,
    ) -> Result<Vec<LineCompletion>, EngineError> {
        let board = self.store.board(tile.board_id)?;
        let tiles = self.store.board_tiles(board.id);

        let mut completed = Vec::new();
        for (line_type, index) in [(LineType::Row, tile.row), (LineType::Column, tile.column)] {
            if let Some(line) = self.check_line(&board, &tiles, line_type, index, now)? {
                completed.push(line);
            }
        }
        Ok(completed)
    }

    fn check_line(
        &self,
        board: &Board,
        tiles: &[BoardTile],
        line_type: LineType,
        index: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<LineCompletion>, EngineError> {
        let line_tiles: Vec<&BoardTile> = tiles
            .iter()
            .filter(|tile| match line_type {
                LineType::Row => tile.row == index,
                LineType::Column => tile.column == index,
            })
            .collect();

        let expected = match line_type {
            LineType::Row => board.columns,
            LineType::Column => board.rows,
        } as usize;

        // A partially-placed line can never complete.
        if line_tiles.len() != expected || !line_tiles.iter().all(|tile| tile.is_completed) {
            return Ok(None);
        }

        let bonus_points = board
            .line_bonus
            .unwrap_or_else(|| line_tiles.iter().map(|tile| tile.definition.points).sum());

        let line = LineCompletion {
            id: 0,
            board_id: board.id,
            line_type,
            index,
            tile_ids: line_tiles.iter().map(|tile| tile.id).collect(),
            bonus_points,
            effects_granted: false,
            completed_at: now,
        };

        let line_id = match self.store.insert_line_completion(line.clone()) {
            Ok(id) => id,
            // A concurrent completion already recorded this line; back
            // off without re-granting effects.
            Err(StoreError::LineAlreadyCompleted { .. }) => {
                debug!(
                    board = %board.id,
                    ?line_type,
                    index,
                    "line already completed by concurrent winner"
                );
                // The winner may have failed between recording the line
                // and granting its effects; finish the grant if the flag
                // never flipped.
                self.finish_pending_grant(board, line_type, index, now)?;
                return Ok(None);
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            board = %board.id,
            ?line_type,
            index,
            bonus_points,
            "line completed"
        );
        self.grant_line_effects(board, line_type, index, line_id, now)?;

        Ok(Some(LineCompletion {
            id: line_id,
            effects_granted: true,
            ..line
        }))
    }

    /// Recover a recorded line whose effect grant never ran. The unique
    /// insert means no caller reattempts the line itself, so later
    /// traffic on the same line picks the grant up here; the monotonic
    /// `effects_granted` flag keeps it single-shot.
    fn finish_pending_grant(
        &self,
        board: &Board,
        line_type: LineType,
        index: u32,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let pending = self
            .store
            .line_completions(board.id)
            .into_iter()
            .find(|line| {
                line.line_type == line_type && line.index == index && !line.effects_granted
            });
        match pending {
            Some(line) => self.grant_line_effects(board, line_type, index, line.id, now),
            None => Ok(()),
        }
    }

    fn grant_line_effects(
        &self,
        board: &Board,
        line_type: LineType,
        index: u32,
        line_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        // The flag flips false→true exactly once even if two callers
        // somehow reach this point for the same line.
        if !self.store.mark_effects_granted(board.id, line_type, index)? {
            return Ok(());
        }

        let (effect_ids, source) = match line_type {
            LineType::Row => (&board.row_effects, EffectSource::RowCompletion),
            LineType::Column => (&board.column_effects, EffectSource::ColumnCompletion),
        };
        for definition_id in effect_ids {
            self.effects
                .grant(board.team_id, definition_id, source, line_id, now)?;
        }
        Ok(())
    }
}
