//! Record store seam
//!
//! The durable, transactional record store is an external collaborator;
//! the engine talks to it through the `Store` trait, which exposes
//! exactly the atomic primitives the concurrency model needs:
//!
//! - versioned TileProgress save (compare-and-swap, the per-tile
//!   optimistic-retry guard)
//! - unique LineCompletion insert (the line-completion race guard)
//! - conditional effect-use consumption (compare-and-consume, guarded by
//!   status and remaining uses)
//! - monotonic flips (tile completion, effects-granted) that report
//!   whether this caller performed the transition
//!
//! `MemoryStore` is the in-process implementation used by tests and the
//! worker binary.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use bingo_types::{AccountId, BoardId, BoardTileId, EarnedEffectId, TeamId};

use crate::board::{Board, BoardTile, LineCompletion, LineType, Team};
use crate::effects::{ActivationLogEntry, EffectStatus, TeamEarnedEffect};
use crate::progress::TileProgress;

/// A progress row plus the version its reader saw.
#[derive(Debug, Clone)]
pub struct VersionedProgress {
    pub progress: TileProgress,
    pub version: u64,
}

pub trait Store: Send + Sync {
    // ─── Teams & boards ─────────────────────────────────────────────────────

    fn insert_team(&self, team: Team) -> Result<(), StoreError>;
    fn team_for_account(&self, account: AccountId) -> Option<TeamId>;
    fn insert_board(&self, board: Board) -> Result<(), StoreError>;
    fn board(&self, id: BoardId) -> Result<Board, StoreError>;
    fn boards(&self) -> Vec<Board>;

    // ─── Tiles ──────────────────────────────────────────────────────────────

    /// Insert a tile placement. Fails if the (board, row, column)
    /// position is already occupied.
    fn insert_tile(&self, tile: BoardTile) -> Result<(), StoreError>;
    fn tile(&self, id: BoardTileId) -> Result<BoardTile, StoreError>;
    fn board_tiles(&self, board: BoardId) -> Vec<BoardTile>;

    /// Flip the tile's completion flag. Returns true if this call
    /// performed the flip, false if the tile was already completed.
    /// Completion is monotonic; there is no inverse operation.
    fn complete_tile(
        &self,
        id: BoardTileId,
        team: TeamId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    // ─── Tile progress (one row per tile) ───────────────────────────────────

    fn load_progress(&self, tile: BoardTileId) -> Option<VersionedProgress>;

    /// Compare-and-swap save. `expected_version` 0 means "insert new";
    /// a mismatch returns `StoreError::ProgressVersionConflict` and the
    /// caller retries its read-modify-write.
    fn save_progress(
        &self,
        progress: TileProgress,
        expected_version: u64,
    ) -> Result<(), StoreError>;

    // ─── Line completions ───────────────────────────────────────────────────

    /// Unique insert keyed on (board, line type, index); returns the
    /// allocated id. A conflict means a concurrent completion already
    /// handled this line.
    fn insert_line_completion(&self, line: LineCompletion) -> Result<i64, StoreError>;
    fn line_completions(&self, board: BoardId) -> Vec<LineCompletion>;

    /// Flip `effects_granted` false→true. Returns true if this call
    /// performed the flip.
    fn mark_effects_granted(
        &self,
        board: BoardId,
        line_type: LineType,
        index: u32,
    ) -> Result<bool, StoreError>;

    // ─── Earned effects ─────────────────────────────────────────────────────

    /// Insert with a store-allocated id; returns the id.
    fn insert_earned_effect(&self, effect: TeamEarnedEffect) -> Result<EarnedEffectId, StoreError>;
    fn earned_effect(&self, id: EarnedEffectId) -> Result<TeamEarnedEffect, StoreError>;
    fn team_effects(&self, team: TeamId) -> Vec<TeamEarnedEffect>;
    fn earned_effects(&self) -> Vec<TeamEarnedEffect>;

    /// Atomically consume one use: requires status Available and
    /// remaining_uses > 0, decrements, transitions to Used at zero, and
    /// records the target team. Returns the updated row. Two concurrent
    /// callers can never both consume the last use.
    fn consume_effect_use(
        &self,
        id: EarnedEffectId,
        used_on: Option<TeamId>,
    ) -> Result<TeamEarnedEffect, StoreError>;

    /// One-directional status transition. Returns true if this call
    /// performed it, false if the effect already left Available for the
    /// same target status. Any other transition is an invariant
    /// violation surfaced as `StoreError::InvalidTransition`.
    fn transition_effect(
        &self,
        id: EarnedEffectId,
        to: EffectStatus,
    ) -> Result<bool, StoreError>;

    // ─── Audit log ──────────────────────────────────────────────────────────

    /// Append-only; entries are never updated or deleted.
    fn append_log(&self, entry: ActivationLogEntry);
    fn activation_log(&self) -> Vec<ActivationLogEntry>;
}
