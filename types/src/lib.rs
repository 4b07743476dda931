//! Shared data contracts for the bingo engine
//!
//! This crate contains the serializable types shared between the engine
//! core (bingo-core) and anything feeding it events: the canonical event
//! schema, requirement specifications, and effect definition configs.
//! No logic beyond validation helpers lives here.

mod effect;
mod event;
mod requirement;

pub use effect::*;
pub use event::*;
pub use requirement::*;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Id newtypes
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(
    /// A player account.
    AccountId
);
id_type!(
    /// A team competing on a board.
    TeamId
);
id_type!(
    /// A board (one per team per event).
    BoardId
);
id_type!(
    /// A tile placement on a board.
    BoardTileId
);
id_type!(
    /// A reusable tile definition in the catalog.
    TileDefinitionId
);
id_type!(
    /// A unit of earned tactical effect held by a team.
    EarnedEffectId
);
