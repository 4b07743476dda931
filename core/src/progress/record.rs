//! Progress records (runtime state)
//!
//! Exactly one `TileProgress` exists per board tile; concurrent player
//! contributions merge into it, they never fan out into per-player rows.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use bingo_types::{AccountId, BoardTileId, CombinationMode, EventId, RequirementSpec, TierRule};

/// How a tile reached completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionType {
    /// A tier of a tiered spec decided completion.
    Tiered,
    /// Exactly one account supplied the entire qualifying contribution.
    Solo,
    /// Contributions came from two or more accounts.
    Team,
    /// Completed manually by an event admin.
    Admin,
}

/// Sub-progress for one requirement slot (base index or tier).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementProgress {
    /// Kind-specific numeric progress (sum, count, max value, …).
    pub value: f64,
    /// Whether this slot has been satisfied at least once. Monotonic.
    pub satisfied: bool,
    /// Distinct required items obtained (per-item item-drop mode).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub obtained_items: BTreeSet<i64>,
    /// Best (lowest) speedrun time observed, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_time: Option<f64>,
    /// Experience baseline per player, captured at that player's first
    /// logout. Snapshots are lifetime totals, so one player's baseline
    /// says nothing about another's.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub baselines: BTreeMap<String, i64>,
    /// Experience gained per player since their own baseline. Monotone.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub xp_gained: BTreeMap<String, i64>,
}

/// Structured metadata merged into the single progress row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressMetadata {
    /// Per-base-requirement-index sub-progress.
    #[serde(default)]
    pub requirements: BTreeMap<usize, RequirementProgress>,
    /// Per-tier sub-progress, keyed by tier number.
    #[serde(default)]
    pub tiers: BTreeMap<u32, RequirementProgress>,
    /// Tier numbers whose requirement has been satisfied.
    #[serde(default)]
    pub completed_tiers: BTreeSet<u32>,
    /// Qualifying contribution per account (solo-attribution ledger).
    #[serde(default)]
    pub contributions: BTreeMap<AccountId, f64>,
    /// Event ids already applied; replays of these are dropped.
    #[serde(default)]
    pub applied_events: HashSet<EventId>,
}

/// The single shared progress record for one board tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileProgress {
    pub board_tile_id: BoardTileId,
    /// Headline progress value for display. For a single-requirement
    /// spec this mirrors the slot's value; for multi-requirement specs
    /// it is the count of satisfied slots; for tiered specs the highest
    /// reached tier.
    pub value: f64,
    pub metadata: ProgressMetadata,
    pub completion_type: Option<CompletionType>,
    /// Set only when a single account supplied the entire qualifying
    /// contribution.
    pub completed_by: Option<AccountId>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TileProgress {
    pub fn new(board_tile_id: BoardTileId) -> Self {
        Self {
            board_tile_id,
            value: 0.0,
            metadata: ProgressMetadata::default(),
            completion_type: None,
            completed_by: None,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Recompute the headline value from the metadata.
    pub fn refresh_value(&mut self, spec: &RequirementSpec) {
        self.value = if spec.is_tiered() && spec.requirements.is_empty() {
            self.metadata
                .completed_tiers
                .iter()
                .max()
                .copied()
                .unwrap_or(0) as f64
        } else if spec.requirements.len() == 1 {
            self.metadata
                .requirements
                .get(&0)
                .map(|slot| slot.value)
                .unwrap_or(0.0)
        } else {
            self.metadata
                .requirements
                .values()
                .filter(|slot| slot.satisfied)
                .count() as f64
        };
    }

    /// Whether the spec's completion condition now holds.
    pub fn satisfies(&self, spec: &RequirementSpec) -> bool {
        let tier_complete = if spec.is_tiered() {
            match spec.tier_rule {
                TierRule::AnyTier => !self.metadata.completed_tiers.is_empty(),
                TierRule::TopTier => spec
                    .top_tier()
                    .map(|top| self.metadata.completed_tiers.contains(&top))
                    .unwrap_or(false),
            }
        } else {
            false
        };

        let base_complete = if spec.requirements.is_empty() {
            false
        } else {
            match spec.mode {
                CombinationMode::All => (0..spec.requirements.len()).all(|index| {
                    self.metadata
                        .requirements
                        .get(&index)
                        .map(|slot| slot.satisfied)
                        .unwrap_or(false)
                }),
                CombinationMode::Any => self
                    .metadata
                    .requirements
                    .values()
                    .any(|slot| slot.satisfied),
            }
        };

        tier_complete || base_complete
    }

    /// Accounts that supplied qualifying contribution.
    pub fn contributors(&self) -> Vec<AccountId> {
        self.metadata
            .contributions
            .iter()
            .filter(|(_, amount)| **amount > 0.0)
            .map(|(account, _)| *account)
            .collect()
    }
}
