//! bingo-worker - Batch event processor for bingo events.
//!
//! Loads an event setup (teams, boards, tile placements) and an effect
//! catalog, replays a newline-delimited JSON event feed through the
//! engine's worker pool, and prints the resulting board views as JSON.
//!
//! Usage: bingo-worker --setup setup.toml --events events.ndjson
//!
//! Output: JSON to stdout with per-board views and run totals.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bingo_core::board::{Board, BoardTile, Team, TileDefinition};
use bingo_core::effects::load_effects_from_dir;
use bingo_core::pipeline::{EventPipeline, EventReport};
use bingo_core::query::{BoardView, board_view};
use bingo_core::requirement::validate_spec;
use bingo_core::stats::{SnapshotClient, StaticStats};
use bingo_core::store::{MemoryStore, Store};
use bingo_types::{BoardId, BoardTileId, CanonicalEvent};

#[derive(Parser)]
#[command(version, about = "Replay a bingo event feed against a board setup")]
struct Args {
    /// Setup TOML with [[team]], [[board]], and [[tile]] tables.
    #[arg(long)]
    setup: PathBuf,

    /// Newline-delimited JSON canonical events.
    #[arg(long)]
    events: PathBuf,

    /// Directory of effect catalog TOML files.
    #[arg(long)]
    effects: Option<PathBuf>,

    /// Optional experience snapshots TOML ([[snapshot]] tables).
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Worker pool size.
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

#[derive(Debug, Deserialize)]
struct SetupFile {
    #[serde(default, rename = "team")]
    teams: Vec<Team>,
    #[serde(default, rename = "board")]
    boards: Vec<Board>,
    #[serde(default, rename = "tile")]
    tiles: Vec<TileEntry>,
}

#[derive(Debug, Deserialize)]
struct TileEntry {
    id: i64,
    board_id: i64,
    row: u32,
    column: u32,
    definition: TileDefinition,
}

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default, rename = "snapshot")]
    snapshots: Vec<SnapshotEntry>,
}

#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    player: String,
    #[serde(default)]
    skill: Option<String>,
    xp: i64,
}

/// Output sent to stdout at the end of the run.
#[derive(Debug, Serialize)]
struct RunOutput {
    events_processed: usize,
    events_rejected: usize,
    tiles_completed: usize,
    lines_completed: usize,
    failures: usize,
    boards: Vec<BoardView>,
    elapsed_ms: u128,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let timer = std::time::Instant::now();

    let store = Arc::new(MemoryStore::new());
    let board_ids = load_setup(&store, &args.setup)?;

    let catalog = match &args.effects {
        Some(dir) => load_effects_from_dir(dir).map_err(|e| e.to_string())?,
        None => Default::default(),
    };
    info!(definitions = catalog.len(), "effect catalog loaded");

    let stats = Arc::new(StaticStats::new());
    if let Some(path) = &args.stats {
        load_snapshots(&stats, path)?;
    }
    let snapshots = SnapshotClient::with_default_timeout(stats);

    let pipeline = EventPipeline::new(store.clone(), snapshots, Arc::new(catalog));

    let (event_tx, event_rx) = mpsc::channel::<CanonicalEvent>(256);
    let (report_tx, mut report_rx) = mpsc::channel::<EventReport>(256);
    let workers = pipeline.spawn(event_rx, args.workers, report_tx);

    let feed = fs::read_to_string(&args.events)
        .map_err(|e| format!("failed to read {}: {e}", args.events.display()))?;
    // Feed from a separate task so report draining below keeps pace and
    // neither bounded channel can wedge the run.
    let feeder = tokio::spawn(async move {
        let mut submitted = 0usize;
        for (number, line) in feed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<CanonicalEvent>(line) {
                Ok(event) => {
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                    submitted += 1;
                }
                Err(error) => {
                    warn!(line = number + 1, %error, "unparseable event skipped");
                }
            }
        }
        submitted
    });

    let mut output = RunOutput {
        events_processed: 0,
        events_rejected: 0,
        tiles_completed: 0,
        lines_completed: 0,
        failures: 0,
        boards: Vec::new(),
        elapsed_ms: 0,
    };
    while let Some(report) = report_rx.recv().await {
        output.events_processed += 1;
        if report.rejected.is_some() {
            output.events_rejected += 1;
        }
        output.tiles_completed += report.completed_tiles.len();
        output.lines_completed += report.completed_lines.len();
        output.failures += report.failures.len();
    }
    let submitted = feeder.await.map_err(|e| e.to_string())?;
    for worker in workers {
        worker.await.map_err(|e| e.to_string())?;
    }
    info!(submitted, processed = output.events_processed, "feed drained");

    for board in board_ids {
        output
            .boards
            .push(board_view(store.as_ref(), board).map_err(|e| e.to_string())?);
    }
    output.elapsed_ms = timer.elapsed().as_millis();

    let json = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

/// Load the setup file into the store. Returns the board ids in file
/// order for the final report.
fn load_setup(store: &MemoryStore, path: &PathBuf) -> Result<Vec<BoardId>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let setup: SetupFile =
        toml::from_str(&content).map_err(|e| format!("invalid setup file: {e}"))?;

    for team in setup.teams {
        store.insert_team(team).map_err(|e| e.to_string())?;
    }
    let board_ids: Vec<BoardId> = setup.boards.iter().map(|board| board.id).collect();
    for board in setup.boards {
        store.insert_board(board).map_err(|e| e.to_string())?;
    }
    for tile in setup.tiles {
        validate_spec(&tile.definition.spec)
            .map_err(|reason| format!("tile {}: {reason}", tile.id))?;
        store
            .insert_tile(BoardTile::new(
                BoardTileId(tile.id),
                BoardId(tile.board_id),
                tile.definition,
                tile.row,
                tile.column,
            ))
            .map_err(|e| e.to_string())?;
    }
    Ok(board_ids)
}

fn load_snapshots(stats: &StaticStats, path: &PathBuf) -> Result<(), String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let file: SnapshotFile =
        toml::from_str(&content).map_err(|e| format!("invalid snapshots file: {e}"))?;
    for entry in file.snapshots {
        stats.set(&entry.player, entry.skill.as_deref(), entry.xp);
    }
    Ok(())
}
