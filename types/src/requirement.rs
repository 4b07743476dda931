//! Tile requirement specifications
//!
//! A `RequirementSpec` describes what gameplay has to happen for a tile
//! to complete. Requirements are a closed tagged union with an explicit
//! `kind` discriminator; configuration never round-trips through an
//! untyped map past the boundary adapter.

use serde::{Deserialize, Serialize};

/// How a multi-requirement list combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationMode {
    /// Every requirement must be satisfied (each tracked independently).
    #[default]
    All,
    /// Any single satisfied requirement completes the tile.
    Any,
}

/// What "fully complete" means for a tiered tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierRule {
    /// Reaching any tier completes the tile (higher tiers add points).
    #[default]
    AnyTier,
    /// Only reaching the highest configured tier completes the tile.
    TopTier,
}

/// One gameplay condition a tile can ask for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// Obtain items. Two modes: when `total_amount` is set, quantities of
    /// all listed items sum toward the threshold; otherwise every listed
    /// item must be obtained at least once.
    ItemDrop {
        items: Vec<i64>,
        #[serde(default)]
        total_amount: Option<i64>,
    },
    /// Receive a specific pet (name compared case-insensitively).
    Pet { pet_name: String },
    /// Receive a single item stack worth at least `value`.
    ValueDrop { value: i64 },
    /// Beat a time goal at a location (lower is better).
    Speedrun { location: String, goal_seconds: f64 },
    /// Gain experience measured against a baseline snapshot taken when
    /// tracking starts. `skill` of None means overall experience.
    Experience {
        #[serde(default)]
        skill: Option<String>,
        target_xp: i64,
    },
    /// Reach a cumulative Barbarian Assault gamble count.
    BaGambles { amount: i64 },
    /// Observe a specific non-player chat line.
    ChatMessage {
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        message_type: Option<String>,
        message: String,
        #[serde(default)]
        exact_match: bool,
    },
    /// Wrapper that hides the real requirement from players. Matching
    /// delegates entirely to `hidden`; read models expose only the
    /// display fields. Nesting depth is 1: `hidden` may not be a puzzle.
    Puzzle {
        display_name: String,
        #[serde(default)]
        display_description: String,
        #[serde(default)]
        display_hint: String,
        hidden: Box<Requirement>,
    },
}

impl Requirement {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ItemDrop { .. } => "item_drop",
            Self::Pet { .. } => "pet",
            Self::ValueDrop { .. } => "value_drop",
            Self::Speedrun { .. } => "speedrun",
            Self::Experience { .. } => "experience",
            Self::BaGambles { .. } => "ba_gambles",
            Self::ChatMessage { .. } => "chat_message",
            Self::Puzzle { .. } => "puzzle",
        }
    }

    pub fn is_puzzle(&self) -> bool {
        matches!(self, Self::Puzzle { .. })
    }

    /// The requirement that actually defines matching semantics
    /// (unwraps one puzzle layer).
    pub fn effective(&self) -> &Requirement {
        match self {
            Self::Puzzle { hidden, .. } => hidden,
            other => other,
        }
    }
}

/// One tier of a tiered requirement list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRequirement {
    pub tier: u32,
    pub requirement: Requirement,
    pub points: i64,
}

/// The full requirement specification attached to a tile definition.
///
/// Base requirements and tiers are a genuine OR-track: an event counts if
/// it satisfies either side. `tier_rule` decides when a tiered tile is
/// fully complete.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequirementSpec {
    #[serde(default)]
    pub mode: CombinationMode,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub tiers: Vec<TierRequirement>,
    #[serde(default)]
    pub tier_rule: TierRule,
}

impl RequirementSpec {
    /// Single base requirement, ALL mode.
    pub fn single(requirement: Requirement) -> Self {
        Self {
            requirements: vec![requirement],
            ..Self::default()
        }
    }

    pub fn is_tiered(&self) -> bool {
        !self.tiers.is_empty()
    }

    /// Highest configured tier number, if any.
    pub fn top_tier(&self) -> Option<u32> {
        self.tiers.iter().map(|t| t.tier).max()
    }
}
