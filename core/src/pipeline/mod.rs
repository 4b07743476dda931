//! Event processing pipeline
//!
//! Telemetry arrives as an unordered, concurrent stream with no global
//! ordering guarantee. The pipeline is an explicit worker/consumer
//! model: a pool of tokio workers pulls canonical events from a queue
//! and processes each one to completion. Concurrency safety comes from
//! the store's atomic primitives (per-tile CAS, unique line inserts,
//! compare-and-consume), not from processing order.
//!
//! Per-event isolation: a failure on one tile (say, a stats timeout for
//! an experience requirement) is reported and skipped; every other tile
//! for the same event is still evaluated.

#[cfg(test)]
mod pipeline_tests;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bingo_types::{BoardTileId, CanonicalEvent, EventId};

use crate::board::{BoardTile, LineCompletion, LineDetector};
use crate::effects::{DefinitionSet, EffectsEngine};
use crate::event;
use crate::progress::TileAggregator;
use crate::requirement::relevant_to_spec;
use crate::stats::SnapshotClient;
use crate::store::Store;

/// A per-tile failure that did not abort the rest of the event.
#[derive(Debug, Clone, Serialize)]
pub struct TileFailure {
    pub board_tile_id: BoardTileId,
    pub error: String,
    pub retryable: bool,
}

/// What one event did, across every tile it touched.
#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub event_id: EventId,
    /// Set when the payload failed validation; nothing was evaluated.
    pub rejected: Option<String>,
    pub tiles_progressed: u32,
    pub completed_tiles: Vec<BoardTileId>,
    pub completed_lines: Vec<LineCompletion>,
    pub failures: Vec<TileFailure>,
}

impl EventReport {
    fn empty(event_id: EventId) -> Self {
        Self {
            event_id,
            rejected: None,
            tiles_progressed: 0,
            completed_tiles: Vec::new(),
            completed_lines: Vec::new(),
            failures: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct EventPipeline {
    store: Arc<dyn Store>,
    aggregator: TileAggregator,
}

impl EventPipeline {
    /// Wire up the full engine over a store, a stats client, and an
    /// effect catalog.
    pub fn new(store: Arc<dyn Store>, stats: SnapshotClient, catalog: Arc<DefinitionSet>) -> Self {
        let effects = EffectsEngine::new(store.clone(), catalog);
        let detector = LineDetector::new(store.clone(), effects.clone());
        let aggregator = TileAggregator::new(store.clone(), stats, effects, detector);
        Self { store, aggregator }
    }

    pub fn aggregator(&self) -> &TileAggregator {
        &self.aggregator
    }

    /// Process one event to completion.
    pub async fn process(&self, event: &CanonicalEvent) -> EventReport {
        let mut report = EventReport::empty(event.event_id);

        if let Err(error) = event::validate(event) {
            warn!(event = %event.event_id, %error, "malformed event rejected");
            report.rejected = Some(error.to_string());
            return report;
        }

        let candidates = self.candidate_tiles(event);
        debug!(
            event = %event.event_id,
            kind = event.payload.kind(),
            candidates = candidates.len(),
            "event routed"
        );

        for tile in candidates {
            match self.aggregator.apply_event(tile.id, event).await {
                Ok(outcome) => {
                    if outcome.changed {
                        report.tiles_progressed += 1;
                    }
                    if outcome.newly_completed {
                        report.completed_tiles.push(tile.id);
                    }
                    report.completed_lines.extend(outcome.completed_lines);
                }
                Err(error) => {
                    warn!(tile = %tile.id, %error, "tile evaluation failed");
                    report.failures.push(TileFailure {
                        board_tile_id: tile.id,
                        retryable: error.is_retryable(),
                        error: error.to_string(),
                    });
                }
            }
        }

        if !report.completed_tiles.is_empty() {
            info!(
                event = %event.event_id,
                completed = report.completed_tiles.len(),
                lines = report.completed_lines.len(),
                "event completed tiles"
            );
        }
        report
    }

    /// Uncompleted tiles whose spec the event can progress. Events tied
    /// to a player only touch that player's team's boards; anonymous
    /// events (broadcasts) are evaluated against every board.
    fn candidate_tiles(&self, event: &CanonicalEvent) -> Vec<BoardTile> {
        let team = event
            .player_account_id
            .and_then(|account| self.store.team_for_account(account));

        self.store
            .boards()
            .into_iter()
            .filter(|board| team.map(|team| board.team_id == team).unwrap_or(true))
            .flat_map(|board| self.store.board_tiles(board.id))
            .filter(|tile| !tile.is_completed && relevant_to_spec(event, &tile.definition.spec))
            .collect()
    }

    /// Spawn a pool of workers draining the queue. Each worker processes
    /// its event fully before pulling the next; parallelism across tiles
    /// is safe through the store's atomic primitives.
    pub fn spawn(
        self,
        receiver: mpsc::Receiver<CanonicalEvent>,
        workers: usize,
        reports: mpsc::Sender<EventReport>,
    ) -> Vec<JoinHandle<()>> {
        let receiver = Arc::new(Mutex::new(receiver));
        (0..workers.max(1))
            .map(|worker| {
                let pipeline = self.clone();
                let receiver = Arc::clone(&receiver);
                let reports = reports.clone();
                tokio::spawn(async move {
                    loop {
                        let event = { receiver.lock().await.recv().await };
                        let Some(event) = event else { break };
                        let report = pipeline.process(&event).await;
                        if reports.send(report).await.is_err() {
                            break;
                        }
                    }
                    debug!(worker, "pipeline worker drained");
                })
            })
            .collect()
    }
}
