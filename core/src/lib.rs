pub mod board;
pub mod effects;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod requirement;
pub mod stats;
pub mod store;

// Re-exports for convenience
pub use board::{Board, BoardTile, LineCompletion, LineDetector, LineType, Team, TileDefinition};
pub use effects::{
    ActivationLogEntry, ActivationOutcome, ActivationRequest, AppliedEffect, DefinitionSet,
    EffectSource, EffectStatus, EffectsEngine, GrantOutcome, LogAction, TeamEarnedEffect,
    load_effects_from_dir, load_effects_from_file,
};
pub use error::EngineError;
pub use pipeline::{EventPipeline, EventReport, TileFailure};
pub use progress::{
    ApplyOutcome, CompletionType, MAX_CAS_RETRIES, ProgressMetadata, TileAggregator, TileProgress,
};
pub use query::{
    BoardView, EffectView, LineView, ProgressView, PuzzleView, TileView, activation_log_view,
    board_view, team_effects_view,
};
pub use stats::{SnapshotClient, StaticStats, StatsError, StatsProvider};
pub use store::{MemoryStore, Store, StoreError, VersionedProgress};
