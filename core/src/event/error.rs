//! Error types for canonical event validation

use thiserror::Error;

/// A payload missing required kind-specific fields. Rejected before
/// matching; never persisted as progress.
#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    #[error("loot event carries no items")]
    EmptyLoot,

    #[error("loot item {item_id} has negative quantity or price")]
    NegativeLoot { item_id: i64 },

    #[error("pet event has an empty pet name")]
    EmptyPetName,

    #[error("speedrun event has an empty location")]
    EmptyLocation,

    #[error("speedrun time must be a positive number, got {0}")]
    InvalidTime(f64),

    #[error("gamble count must be non-negative, got {0}")]
    NegativeGambleCount(i64),

    #[error("chat event has an empty source or message")]
    EmptyChat,
}
