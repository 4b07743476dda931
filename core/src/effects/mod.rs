//! Tactical effects system
//!
//! This module provides:
//! - **Catalog**: effect definitions loaded from TOML reference data
//! - **Earned instances**: per-team runtime state with a one-directional
//!   lifecycle
//! - **Engine**: earn / activate / intercept / expire, every transition
//!   journaled
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │               EffectDefinition (TOML catalog)                │
//! │  "shield: reactive, 1 charge, expires after 24h"             │
//! └──────────────────────────────────────────────────────────────┘
//!                  │ line/tile completion grants
//!                  ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │            TeamEarnedEffect (runtime state)                  │
//! │  "Team 3 holds one available shield, earned from row 2"      │
//! └──────────────────────────────────────────────────────────────┘
//!                  │ activation / interception / expiry
//!                  ▼
//!          ActivationLogEntry (append-only audit)
//! ```

mod catalog;
mod earned;
mod engine;
mod log;

#[cfg(test)]
mod engine_tests;

pub use catalog::{
    CatalogError, DefinitionSet, load_effects_from_dir, load_effects_from_file,
    validate_definition,
};
pub use earned::{EffectSource, EffectStatus, TeamEarnedEffect};
pub use engine::{
    ActivationOutcome, ActivationRequest, AppliedEffect, EffectsEngine, GrantOutcome,
};
pub use log::{ActivationLogEntry, LogAction};
