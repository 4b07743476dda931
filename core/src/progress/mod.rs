//! Tile progress tracking
//!
//! This module provides:
//! - **Records**: the single shared `TileProgress` row per board tile
//! - **Calculators**: pure per-kind accumulation functions
//! - **Aggregator**: merges concurrent contributions and decides completion
//!
//! # Architecture
//!
//! ```text
//! CanonicalEvent ──▶ Matcher (is this event relevant?)
//!                       │
//!                       ▼
//!            Calculator (per requirement kind)
//!                       │ new slot value + satisfied flag
//!                       ▼
//!            Aggregator (CAS read-modify-write per tile)
//!                       │ merged TileProgress, completion decision
//!                       ▼
//!            Line Completion Detector (on newly completed tiles)
//! ```

mod aggregator;
mod calculator;
mod record;


pub use aggregator::{ApplyOutcome, MAX_CAS_RETRIES, TileAggregator};
pub use calculator::{CalcOutcome, apply_requirement};
pub use record::{CompletionType, ProgressMetadata, RequirementProgress, TileProgress};
