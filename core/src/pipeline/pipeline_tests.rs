//! Tests for the event pipeline
//!
//! Validation rejection, team-scoped routing, and the worker pool
//! draining a queue to completion.

use std::sync::Arc;

use tokio::sync::mpsc;

use bingo_types::{
    AccountId, BoardId, BoardTileId, CanonicalEvent, EventPayload, Requirement, RequirementSpec,
    TeamId, TileDefinitionId,
};

use crate::board::{Board, BoardTile, Team, TileDefinition};
use crate::effects::DefinitionSet;
use crate::stats::{SnapshotClient, StaticStats};
use crate::store::{MemoryStore, Store};

use super::EventPipeline;

// ═══════════════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════════════

const RED: TeamId = TeamId(1);
const BLUE: TeamId = TeamId(2);
const ALICE: AccountId = AccountId(10);

/// Two teams, one board each, one gamble tile per board.
fn make_pipeline() -> (Arc<MemoryStore>, EventPipeline) {
    let store = Arc::new(MemoryStore::new());
    for (team, account, board, tile) in [(RED, 10, 1, 1), (BLUE, 20, 2, 2)] {
        store
            .insert_team(Team {
                id: team,
                name: format!("team {}", team.0),
                members: vec![AccountId(account)],
            })
            .unwrap();
        store
            .insert_board(Board {
                id: BoardId(board),
                team_id: team,
                rows: 1,
                columns: 1,
                row_effects: Vec::new(),
                column_effects: Vec::new(),
                line_bonus: None,
            })
            .unwrap();
        let definition = TileDefinition {
            id: TileDefinitionId(tile),
            name: "gamble".into(),
            description: String::new(),
            category: String::new(),
            difficulty: 1,
            spec: RequirementSpec::single(Requirement::BaGambles { amount: 5 }),
            points: 10,
            completion_effect: None,
        };
        store
            .insert_tile(BoardTile::new(BoardTileId(tile), BoardId(board), definition, 0, 0))
            .unwrap();
    }

    let stats = SnapshotClient::with_default_timeout(Arc::new(StaticStats::new()));
    let pipeline = EventPipeline::new(store.clone(), stats, Arc::new(DefinitionSet::new()));
    (store, pipeline)
}

fn gamble(count: i64) -> CanonicalEvent {
    CanonicalEvent::new(EventPayload::BaGamble {
        gamble_count: count,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Validation & routing
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn malformed_event_is_rejected_before_routing() {
    let (store, pipeline) = make_pipeline();

    let report = pipeline
        .process(&CanonicalEvent::new(EventPayload::Loot { items: Vec::new() }))
        .await;

    assert!(report.rejected.is_some());
    assert_eq!(report.tiles_progressed, 0);
    assert!(store.load_progress(BoardTileId(1)).is_none());
}

#[tokio::test]
async fn player_events_only_reach_their_teams_board() {
    let (store, pipeline) = make_pipeline();

    let report = pipeline
        .process(&gamble(3).with_player(ALICE, "alice"))
        .await;

    assert_eq!(report.tiles_progressed, 1);
    assert!(store.load_progress(BoardTileId(1)).is_some());
    assert!(store.load_progress(BoardTileId(2)).is_none());
}

#[tokio::test]
async fn anonymous_events_reach_every_board() {
    let (store, pipeline) = make_pipeline();

    let report = pipeline.process(&gamble(3)).await;

    assert_eq!(report.tiles_progressed, 2);
    assert!(store.load_progress(BoardTileId(1)).is_some());
    assert!(store.load_progress(BoardTileId(2)).is_some());
}

#[tokio::test]
async fn completion_is_reported_with_the_tile() {
    let (store, pipeline) = make_pipeline();

    let report = pipeline
        .process(&gamble(9).with_player(ALICE, "alice"))
        .await;

    assert_eq!(report.completed_tiles, vec![BoardTileId(1)]);
    assert!(store.tile(BoardTileId(1)).unwrap().is_completed);
}

#[tokio::test]
async fn completed_tiles_leave_the_candidate_set() {
    let (_, pipeline) = make_pipeline();

    pipeline
        .process(&gamble(9).with_player(ALICE, "alice"))
        .await;
    let after = pipeline
        .process(&gamble(11).with_player(ALICE, "alice"))
        .await;
    assert_eq!(after.tiles_progressed, 0);
    assert!(after.completed_tiles.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Worker pool
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_pool_drains_the_queue() {
    let (store, pipeline) = make_pipeline();

    let (event_tx, event_rx) = mpsc::channel(32);
    let (report_tx, mut report_rx) = mpsc::channel(32);
    let workers = pipeline.spawn(event_rx, 3, report_tx);

    for count in 1..=10 {
        event_tx
            .send(gamble(count).with_player(ALICE, "alice"))
            .await
            .unwrap();
    }
    drop(event_tx);

    let mut reports = Vec::new();
    while let Some(report) = report_rx.recv().await {
        reports.push(report);
    }
    for worker in workers {
        worker.await.unwrap();
    }

    assert_eq!(reports.len(), 10);
    assert!(reports.iter().all(|report| report.failures.is_empty()));
    // The cumulative counter crossed 5 at some point, so the tile ended
    // up completed no matter how the workers interleaved.
    assert!(store.tile(BoardTileId(1)).unwrap().is_completed);
}
