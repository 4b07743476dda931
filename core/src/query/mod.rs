//! Read models
//!
//! Serializable views over the store for clients (dashboards, the worker
//! binary's output). Views never embed a `Requirement`: what a tile asks
//! for is summarized in display text, so a puzzle tile's hidden
//! requirement cannot leak through a query. Until the puzzle is solved,
//! clients only ever see its display name, description, and hint.


use chrono::{DateTime, Utc};
use serde::Serialize;

use bingo_types::{
    AccountId, BoardId, BoardTileId, EarnedEffectId, EffectConfig, Requirement, TeamId,
    TriggerMode,
};

use crate::board::{BoardTile, LineType};
use crate::effects::{ActivationLogEntry, EffectStatus, TeamEarnedEffect};
use crate::error::EngineError;
use crate::progress::{CompletionType, TileProgress};
use crate::store::Store;

/// Public face of a puzzle tile. The hidden requirement stays hidden;
/// `is_solved` flips with tile completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PuzzleView {
    pub display_name: String,
    pub display_description: String,
    pub display_hint: String,
    pub is_solved: bool,
}

/// Per-requirement-slot summary. Indexes line up with the spec's base
/// requirement list; values are kind-specific numeric progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    pub index: usize,
    pub value: f64,
    pub satisfied: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressView {
    pub value: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed_tiers: Vec<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<SlotView>,
}

impl From<TileProgress> for ProgressView {
    fn from(progress: TileProgress) -> Self {
        Self {
            value: progress.value,
            completed_tiers: progress.metadata.completed_tiers.into_iter().collect(),
            requirements: progress
                .metadata
                .requirements
                .into_iter()
                .map(|(index, slot)| SlotView {
                    index,
                    value: slot.value,
                    satisfied: slot.satisfied,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileView {
    pub id: BoardTileId,
    pub row: u32,
    pub column: u32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub difficulty: u8,
    /// Points the tile pays out. For a tiered tile this is the highest
    /// reached tier's points.
    pub points: i64,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_type: Option<CompletionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<AccountId>,
    pub progress: ProgressView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub puzzle: Option<PuzzleView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineView {
    pub line_type: LineType,
    pub index: u32,
    pub bonus_points: i64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardView {
    pub board_id: BoardId,
    pub team_id: TeamId,
    pub rows: u32,
    pub columns: u32,
    pub tiles: Vec<TileView>,
    pub lines: Vec<LineView>,
    /// The owning team's currently available effects.
    pub active_effects: Vec<EffectView>,
    /// Completed tile points plus line bonuses.
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectView {
    pub id: EarnedEffectId,
    pub definition_id: String,
    pub config: EffectConfig,
    pub trigger: TriggerMode,
    pub status: EffectStatus,
    pub remaining_uses: u32,
    pub earned_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<TeamEarnedEffect> for EffectView {
    fn from(effect: TeamEarnedEffect) -> Self {
        Self {
            id: effect.id,
            definition_id: effect.definition_id,
            config: effect.config,
            trigger: effect.trigger,
            status: effect.status,
            remaining_uses: effect.remaining_uses,
            earned_at: effect.earned_at,
            expires_at: effect.expires_at,
        }
    }
}

/// Assemble the full view of one board: tiles in placement order with
/// their progress, completed lines, and the running point total.
pub fn board_view(store: &dyn Store, board_id: BoardId) -> Result<BoardView, EngineError> {
    let board = store.board(board_id)?;
    let mut tiles = store.board_tiles(board_id);
    tiles.sort_by_key(|tile| (tile.row, tile.column));

    let mut views = Vec::with_capacity(tiles.len());
    let mut points = 0;
    for tile in tiles {
        let row = store.load_progress(tile.id).map(|row| row.progress);
        let (completion_type, completed_by) = row
            .as_ref()
            .map(|p| (p.completion_type, p.completed_by))
            .unwrap_or((None, None));
        let worth = tile_points(&tile, row.as_ref());
        let progress = row.map(ProgressView::from).unwrap_or_default();

        if tile.is_completed {
            points += worth;
        }

        let puzzle = tile.definition.spec.requirements.iter().find_map(|req| {
            if let Requirement::Puzzle {
                display_name,
                display_description,
                display_hint,
                ..
            } = req
            {
                Some(PuzzleView {
                    display_name: display_name.clone(),
                    display_description: display_description.clone(),
                    display_hint: display_hint.clone(),
                    is_solved: tile.is_completed,
                })
            } else {
                None
            }
        });

        // Puzzle tiles show their cover story, not the real definition.
        let (name, description) = match &puzzle {
            Some(view) => (view.display_name.clone(), view.display_description.clone()),
            None => (
                tile.definition.name.clone(),
                tile.definition.description.clone(),
            ),
        };

        views.push(TileView {
            id: tile.id,
            row: tile.row,
            column: tile.column,
            name,
            description,
            category: tile.definition.category.clone(),
            difficulty: tile.definition.difficulty,
            points: worth,
            is_completed: tile.is_completed,
            completed_at: tile.completed_at,
            completion_type,
            completed_by,
            progress,
            puzzle,
        });
    }

    let mut lines = Vec::new();
    for line in store.line_completions(board_id) {
        points += line.bonus_points;
        lines.push(LineView {
            line_type: line.line_type,
            index: line.index,
            bonus_points: line.bonus_points,
            completed_at: line.completed_at,
        });
    }

    let now = Utc::now();
    let active_effects = store
        .team_effects(board.team_id)
        .into_iter()
        .filter(|effect| effect.is_available(now))
        .map(EffectView::from)
        .collect();

    Ok(BoardView {
        board_id,
        team_id: board.team_id,
        rows: board.rows,
        columns: board.columns,
        tiles: views,
        lines,
        active_effects,
        points,
    })
}

/// Points a tile pays out. The highest reached tier determines the
/// award for a tiered tile; everything else is worth the definition's
/// flat value.
fn tile_points(tile: &BoardTile, progress: Option<&TileProgress>) -> i64 {
    let spec = &tile.definition.spec;
    progress
        .and_then(|p| p.metadata.completed_tiers.iter().max())
        .and_then(|reached| spec.tiers.iter().find(|tier| tier.tier == *reached))
        .map(|tier| tier.points)
        .unwrap_or(tile.definition.points)
}

/// A team's earned effects, most recent first.
pub fn team_effects_view(store: &dyn Store, team: TeamId) -> Vec<EffectView> {
    let mut effects = store.team_effects(team);
    effects.sort_by(|a, b| b.earned_at.cmp(&a.earned_at).then(b.id.0.cmp(&a.id.0)));
    effects.into_iter().map(EffectView::from).collect()
}

/// The full append-only audit trail, optionally filtered to entries a
/// team initiated or was targeted by.
pub fn activation_log_view(store: &dyn Store, team: Option<TeamId>) -> Vec<ActivationLogEntry> {
    store
        .activation_log()
        .into_iter()
        .filter(|entry| {
            team.map(|team| entry.source_team == team || entry.target_team == Some(team))
                .unwrap_or(true)
        })
        .collect()
}
