//! Tests for line completion detection
//!
//! Exactly-once line records under concurrency, bonus computation, and
//! effect grants per line type.

use std::sync::Arc;

use chrono::Utc;

use bingo_types::{
    BoardId, BoardTileId, EffectCategory, EffectConfig, EffectDefinition, Requirement,
    RequirementSpec, TargetScope, TeamId, TileDefinitionId, TriggerMode,
};

use crate::effects::{DefinitionSet, EffectsEngine};
use crate::store::{MemoryStore, Store};

use super::{Board, BoardTile, LineCompletion, LineDetector, LineType, Team, TileDefinition};

// ═══════════════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════════════

const RED: TeamId = TeamId(1);
const BOARD: BoardId = BoardId(1);

fn catalog() -> DefinitionSet {
    let mut set = DefinitionSet::new();
    set.add_definitions(
        vec![
            EffectDefinition {
                id: "shield".into(),
                name: "Shield".into(),
                description: String::new(),
                category: EffectCategory::Reactive,
                target_scope: TargetScope::SelfTeam,
                trigger: TriggerMode::Reactive,
                config: EffectConfig::Shield { charges: 1 },
                uses: 1,
                expires_in_secs: None,
            },
            EffectDefinition {
                id: "swap".into(),
                name: "Tile Swap".into(),
                description: String::new(),
                category: EffectCategory::Debuff,
                target_scope: TargetScope::Enemy,
                trigger: TriggerMode::Manual,
                config: EffectConfig::TileSwap { count: 1 },
                uses: 1,
                expires_in_secs: None,
            },
        ],
        false,
    );
    set
}

/// 2×2 board with one tile per cell, 10 points each.
fn setup(board: Board) -> (Arc<MemoryStore>, LineDetector) {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_team(Team {
            id: RED,
            name: "Red".into(),
            members: Vec::new(),
        })
        .unwrap();
    let (rows, columns) = (board.rows, board.columns);
    store.insert_board(board).unwrap();

    let mut next = 1;
    for row in 0..rows {
        for column in 0..columns {
            let definition = TileDefinition {
                id: TileDefinitionId(next),
                name: format!("tile {next}"),
                description: String::new(),
                category: String::new(),
                difficulty: 1,
                spec: RequirementSpec::single(Requirement::BaGambles { amount: 1 }),
                points: 10,
                completion_effect: None,
            };
            store
                .insert_tile(BoardTile::new(BoardTileId(next), BOARD, definition, row, column))
                .unwrap();
            next += 1;
        }
    }

    let effects = EffectsEngine::new(store.clone(), Arc::new(catalog()));
    let detector = LineDetector::new(store.clone(), effects);
    (store, detector)
}

fn board_2x2() -> Board {
    Board {
        id: BOARD,
        team_id: RED,
        rows: 2,
        columns: 2,
        row_effects: vec!["shield".into()],
        column_effects: vec!["swap".into()],
        line_bonus: None,
    }
}

fn complete(store: &MemoryStore, tile: i64) -> BoardTile {
    store
        .complete_tile(BoardTileId(tile), RED, Utc::now())
        .unwrap();
    store.tile(BoardTileId(tile)).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// Detection & bonuses
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn completed_row_is_recorded_with_point_sum_bonus() {
    let (store, detector) = setup(board_2x2());

    complete(&store, 1);
    let last = complete(&store, 2);
    let lines = detector.check_tile(&last, Utc::now()).unwrap();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].line_type, LineType::Row);
    assert_eq!(lines[0].index, 0);
    // No flat bonus configured: the bonus is the line's tile points.
    assert_eq!(lines[0].bonus_points, 20);
    assert!(lines[0].effects_granted);
    assert_eq!(store.line_completions(BOARD).len(), 1);
}

#[test]
fn flat_line_bonus_overrides_point_sum() {
    let mut board = board_2x2();
    board.line_bonus = Some(75);
    let (store, detector) = setup(board);

    complete(&store, 1);
    let last = complete(&store, 2);
    let lines = detector.check_tile(&last, Utc::now()).unwrap();
    assert_eq!(lines[0].bonus_points, 75);
}

#[test]
fn partial_line_yields_nothing() {
    let (store, detector) = setup(board_2x2());

    let only = complete(&store, 1);
    let lines = detector.check_tile(&only, Utc::now()).unwrap();
    assert!(lines.is_empty());
    assert!(store.line_completions(BOARD).is_empty());
}

#[test]
fn one_tile_can_finish_its_row_and_column_together() {
    let (store, detector) = setup(board_2x2());

    complete(&store, 1); // (0,0)
    complete(&store, 2); // (0,1)
    complete(&store, 3); // (1,0)
    let corner = complete(&store, 4); // (1,1) closes row 1 and column 1

    let lines = detector.check_tile(&corner, Utc::now()).unwrap();
    let mut kinds: Vec<_> = lines.iter().map(|l| (l.line_type, l.index)).collect();
    kinds.sort();
    assert_eq!(kinds, vec![(LineType::Row, 1), (LineType::Column, 1)]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Effect grants
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn row_and_column_grant_their_configured_effects() {
    let (store, detector) = setup(board_2x2());

    complete(&store, 1);
    complete(&store, 2);
    complete(&store, 3);
    let corner = complete(&store, 4);
    // Row 0 first, then the corner closing row 1 and column 1.
    detector
        .check_tile(&store.tile(BoardTileId(2)).unwrap(), Utc::now())
        .unwrap();
    detector.check_tile(&corner, Utc::now()).unwrap();

    let effects = store.team_effects(RED);
    let mut ids: Vec<_> = effects.iter().map(|e| e.definition_id.as_str()).collect();
    ids.sort();
    // Both rows and column 1 were detected; column 1 is recorded once
    // even though two checks covered it. Column 0 was never checked.
    assert_eq!(ids, vec!["shield", "shield", "swap"]);
}

#[test]
fn a_recorded_line_with_an_unfinished_grant_is_recovered() {
    let (store, detector) = setup(board_2x2());

    complete(&store, 1);
    let last = complete(&store, 2);
    // A winner that failed between recording the line and granting its
    // effects leaves the row behind with the flag unset.
    store
        .insert_line_completion(LineCompletion {
            id: 0,
            board_id: BOARD,
            line_type: LineType::Row,
            index: 0,
            tile_ids: vec![BoardTileId(1), BoardTileId(2)],
            bonus_points: 20,
            effects_granted: false,
            completed_at: Utc::now(),
        })
        .unwrap();

    let lines = detector.check_tile(&last, Utc::now()).unwrap();
    // This caller loses the insert but finishes the pending grant.
    assert!(lines.is_empty());
    let effects = store.team_effects(RED);
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].definition_id, "shield");
    assert!(store.line_completions(BOARD)[0].effects_granted);
}

// ═══════════════════════════════════════════════════════════════════════════
// Concurrency
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn concurrent_detection_records_a_line_exactly_once() {
    let (store, detector) = setup(board_2x2());

    complete(&store, 1);
    let last = complete(&store, 2);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let detector = detector.clone();
            let tile = last.clone();
            std::thread::spawn(move || detector.check_tile(&tile, Utc::now()).unwrap())
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    // Exactly one caller wins the insert; the loser backs off empty.
    let winners = results.iter().filter(|lines| !lines.is_empty()).count();
    assert_eq!(winners, 1);
    assert_eq!(store.line_completions(BOARD).len(), 1);

    // Effects granted once, not once per caller.
    assert_eq!(store.team_effects(RED).len(), 1);
}
