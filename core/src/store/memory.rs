//! In-memory store
//!
//! Concurrent-map-backed implementation of `Store`. Each conditional
//! operation runs under the row's shard lock (`DashMap::entry` /
//! `get_mut`), which makes check-and-update a single atomic step, the
//! property the engine's compare-and-consume semantics rely on.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use bingo_types::{AccountId, BoardId, BoardTileId, EarnedEffectId, TeamId};

use crate::board::{Board, BoardTile, LineCompletion, LineType, Team};
use crate::effects::{ActivationLogEntry, EffectStatus, TeamEarnedEffect};
use crate::progress::TileProgress;

use super::{Store, StoreError, VersionedProgress};

#[derive(Debug, Default)]
pub struct MemoryStore {
    teams: DashMap<TeamId, Team>,
    boards: DashMap<BoardId, Board>,
    tiles: DashMap<BoardTileId, BoardTile>,
    /// (board, row, column) position uniqueness index.
    positions: DashMap<(BoardId, u32, u32), BoardTileId>,
    progress: DashMap<BoardTileId, (u64, TileProgress)>,
    lines: DashMap<(BoardId, LineType, u32), LineCompletion>,
    effects: DashMap<EarnedEffectId, TeamEarnedEffect>,
    log: Mutex<Vec<ActivationLogEntry>>,
    next_line_id: AtomicI64,
    next_effect_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_line_id: AtomicI64::new(1),
            next_effect_id: AtomicI64::new(1),
            ..Self::default()
        }
    }
}

impl Store for MemoryStore {
    fn insert_team(&self, team: Team) -> Result<(), StoreError> {
        self.teams.insert(team.id, team);
        Ok(())
    }

    fn team_for_account(&self, account: AccountId) -> Option<TeamId> {
        self.teams
            .iter()
            .find(|team| team.members.contains(&account))
            .map(|team| team.id)
    }

    fn insert_board(&self, board: Board) -> Result<(), StoreError> {
        self.boards.insert(board.id, board);
        Ok(())
    }

    fn board(&self, id: BoardId) -> Result<Board, StoreError> {
        self.boards
            .get(&id)
            .map(|board| board.clone())
            .ok_or_else(|| StoreError::not_found("board", id))
    }

    fn boards(&self) -> Vec<Board> {
        self.boards.iter().map(|board| board.clone()).collect()
    }

    fn insert_tile(&self, tile: BoardTile) -> Result<(), StoreError> {
        let key = (tile.board_id, tile.row, tile.column);
        match self.positions.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::PositionTaken {
                board: tile.board_id,
                row: tile.row,
                column: tile.column,
            }),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(tile.id);
                self.tiles.insert(tile.id, tile);
                Ok(())
            }
        }
    }

    fn tile(&self, id: BoardTileId) -> Result<BoardTile, StoreError> {
        self.tiles
            .get(&id)
            .map(|tile| tile.clone())
            .ok_or_else(|| StoreError::not_found("board tile", id))
    }

    fn board_tiles(&self, board: BoardId) -> Vec<BoardTile> {
        self.tiles
            .iter()
            .filter(|tile| tile.board_id == board)
            .map(|tile| tile.clone())
            .collect()
    }

    fn complete_tile(
        &self,
        id: BoardTileId,
        team: TeamId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tile = self
            .tiles
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("board tile", id))?;
        if tile.is_completed {
            return Ok(false);
        }
        tile.is_completed = true;
        tile.completed_at = Some(at);
        tile.completed_by_team = Some(team);
        Ok(true)
    }

    fn load_progress(&self, tile: BoardTileId) -> Option<VersionedProgress> {
        self.progress
            .get(&tile)
            .map(|entry| VersionedProgress {
                version: entry.0,
                progress: entry.1.clone(),
            })
    }

    fn save_progress(
        &self,
        progress: TileProgress,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let tile = progress.board_tile_id;
        match self.progress.entry(tile) {
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                if expected_version != 0 {
                    return Err(StoreError::ProgressVersionConflict(tile));
                }
                vacant.insert((1, progress));
                Ok(())
            }
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let (version, _) = occupied.get();
                if *version != expected_version {
                    return Err(StoreError::ProgressVersionConflict(tile));
                }
                occupied.insert((expected_version + 1, progress));
                Ok(())
            }
        }
    }

    fn insert_line_completion(&self, mut line: LineCompletion) -> Result<i64, StoreError> {
        let key = (line.board_id, line.line_type, line.index);
        match self.lines.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::LineAlreadyCompleted {
                board: line.board_id,
                line_type: line.line_type,
                index: line.index,
            }),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let id = self.next_line_id.fetch_add(1, Ordering::Relaxed);
                line.id = id;
                vacant.insert(line);
                Ok(id)
            }
        }
    }

    fn line_completions(&self, board: BoardId) -> Vec<LineCompletion> {
        self.lines
            .iter()
            .filter(|line| line.board_id == board)
            .map(|line| line.clone())
            .collect()
    }

    fn mark_effects_granted(
        &self,
        board: BoardId,
        line_type: LineType,
        index: u32,
    ) -> Result<bool, StoreError> {
        let mut line = self
            .lines
            .get_mut(&(board, line_type, index))
            .ok_or_else(|| StoreError::not_found("line completion", format!("{board}/{line_type:?}/{index}")))?;
        if line.effects_granted {
            return Ok(false);
        }
        line.effects_granted = true;
        Ok(true)
    }

    fn insert_earned_effect(&self, mut effect: TeamEarnedEffect) -> Result<EarnedEffectId, StoreError> {
        let id = EarnedEffectId(self.next_effect_id.fetch_add(1, Ordering::Relaxed));
        effect.id = id;
        self.effects.insert(id, effect);
        Ok(id)
    }

    fn earned_effect(&self, id: EarnedEffectId) -> Result<TeamEarnedEffect, StoreError> {
        self.effects
            .get(&id)
            .map(|effect| effect.clone())
            .ok_or_else(|| StoreError::not_found("earned effect", id))
    }

    fn team_effects(&self, team: TeamId) -> Vec<TeamEarnedEffect> {
        let mut effects: Vec<_> = self
            .effects
            .iter()
            .filter(|effect| effect.team_id == team)
            .map(|effect| effect.clone())
            .collect();
        effects.sort_by_key(|effect| effect.id);
        effects
    }

    fn earned_effects(&self) -> Vec<TeamEarnedEffect> {
        let mut effects: Vec<_> = self.effects.iter().map(|effect| effect.clone()).collect();
        effects.sort_by_key(|effect| effect.id);
        effects
    }

    fn consume_effect_use(
        &self,
        id: EarnedEffectId,
        used_on: Option<TeamId>,
    ) -> Result<TeamEarnedEffect, StoreError> {
        // get_mut holds the shard lock: the check and the decrement are
        // one atomic step.
        let mut effect = self
            .effects
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("earned effect", id))?;
        if effect.status != EffectStatus::Available || effect.remaining_uses == 0 {
            return Err(StoreError::EffectUnavailable(id));
        }
        effect.remaining_uses -= 1;
        if effect.remaining_uses == 0 {
            effect.status = EffectStatus::Used;
        }
        if used_on.is_some() {
            effect.used_on_team = used_on;
        }
        Ok(effect.clone())
    }

    fn transition_effect(
        &self,
        id: EarnedEffectId,
        to: EffectStatus,
    ) -> Result<bool, StoreError> {
        let mut effect = self
            .effects
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("earned effect", id))?;
        if effect.status == to {
            // Another caller already performed this transition.
            return Ok(false);
        }
        if !effect.status.can_transition(to) {
            return Err(StoreError::InvalidTransition {
                id,
                from: effect.status,
                to,
            });
        }
        effect.status = to;
        Ok(true)
    }

    fn append_log(&self, entry: ActivationLogEntry) {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(entry);
    }

    fn activation_log(&self) -> Vec<ActivationLogEntry> {
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
