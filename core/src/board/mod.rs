//! Boards, tiles, and line completions
//!
//! A board is one team's grid of tile placements. Tile definitions are
//! reusable catalog entries; a `BoardTile` is one placement of a
//! definition at one grid position. Line completions are derived records
//! created exactly once per fully-completed row or column.

mod lines;

#[cfg(test)]
mod lines_tests;

pub use lines::LineDetector;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bingo_types::{AccountId, BoardId, BoardTileId, RequirementSpec, TeamId, TileDefinitionId};

/// A team competing on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub members: Vec<AccountId>,
}

/// Reusable catalog entry describing a task.
///
/// Immutable once referenced by a live board tile; edits apply only to
/// future placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    pub id: TileDefinitionId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: u8,
    pub spec: RequirementSpec,
    pub points: i64,
    /// Effect definition granted to the team when this tile completes.
    #[serde(default)]
    pub completion_effect: Option<String>,
}

/// One team's board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub team_id: TeamId,
    pub rows: u32,
    pub columns: u32,
    /// Effect definitions granted for completing a row / a column.
    #[serde(default)]
    pub row_effects: Vec<String>,
    #[serde(default)]
    pub column_effects: Vec<String>,
    /// Flat bonus for any line completion; when unset the bonus is the
    /// sum of the line's tile points.
    #[serde(default)]
    pub line_bonus: Option<i64>,
}

/// One placement of a tile definition on a board.
///
/// Position is unique within a board; completion is monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardTile {
    pub id: BoardTileId,
    pub board_id: BoardId,
    pub definition: TileDefinition,
    pub row: u32,
    pub column: u32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by_team: Option<TeamId>,
}

impl BoardTile {
    pub fn new(
        id: BoardTileId,
        board_id: BoardId,
        definition: TileDefinition,
        row: u32,
        column: u32,
    ) -> Self {
        Self {
            id,
            board_id,
            definition,
            row,
            column,
            is_completed: false,
            completed_at: None,
            completed_by_team: None,
        }
    }
}

/// Row or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Row,
    Column,
}

/// One fully-completed row or column. Unique per
/// (board, line type, index); a line completes at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineCompletion {
    /// Store-allocated id, used as the effect grant's source id.
    pub id: i64,
    pub board_id: BoardId,
    pub line_type: LineType,
    pub index: u32,
    pub tile_ids: Vec<BoardTileId>,
    pub bonus_points: i64,
    /// Flips false→true exactly once, around the effect grant.
    pub effects_granted: bool,
    pub completed_at: DateTime<Utc>,
}
