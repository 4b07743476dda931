//! Effect definition configuration
//!
//! Definitions are reference data loaded from TOML catalogs. They
//! describe the tactical effects teams can earn; runtime state (earned
//! instances, statuses, audit log) lives in the engine core.

use serde::{Deserialize, Serialize};

/// Broad grouping used for display and for reactive-defense resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCategory {
    /// Beneficial effect applied to the owning team.
    #[default]
    Buff,
    /// Harmful effect applied to an opposing team.
    Debuff,
    /// Defensive effect that intercepts incoming activations.
    Reactive,
}

/// Who an effect may be activated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetScope {
    /// The owning team only.
    #[default]
    SelfTeam,
    /// One opposing team.
    Enemy,
    /// Every team in the event.
    All,
}

/// When an effect fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Applies at earn time, no activation step.
    Immediate,
    /// Spent deliberately by the owning team.
    #[default]
    Manual,
    /// Lies in wait and intercepts incoming enemy activations.
    Reactive,
}

/// Typed per-category configuration payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectConfig {
    /// Flat points added to the team total.
    PointsBonus { points: i64 },
    /// Multiplies points earned for a duration.
    PointMultiplier { factor: f64, duration_secs: u64 },
    /// Swap up to `count` tiles on the target board.
    TileSwap { count: u32 },
    /// Lock target tiles against progress for a duration.
    TileLock { duration_secs: u64 },
    /// Absorbs incoming enemy activations, one charge each.
    Shield { charges: u32 },
    /// Redirects one incoming enemy activation back at its source.
    Reflect,
    /// Blocks all incoming enemy activations for a duration.
    Immunity { duration_secs: u64 },
}

impl EffectConfig {
    /// Reactive configs are the ones that may intercept an incoming
    /// activation.
    pub fn is_reactive(&self) -> bool {
        matches!(self, Self::Shield { .. } | Self::Reflect | Self::Immunity { .. })
    }
}

/// Definition of an earnable effect (loaded from catalog TOML).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    /// Stable catalog id, referenced by earned instances and boards.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: EffectCategory,
    #[serde(default)]
    pub target_scope: TargetScope,
    #[serde(default)]
    pub trigger: TriggerMode,
    pub config: EffectConfig,
    /// How many times one earned instance can be used.
    #[serde(default = "default_uses")]
    pub uses: u32,
    /// Lifetime of an earned instance. None = never expires.
    #[serde(default)]
    pub expires_in_secs: Option<u64>,
}

fn default_uses() -> u32 {
    1
}

impl EffectDefinition {
    /// Charges an earned instance starts with. Shields carry their
    /// charge count; everything else uses the definition's `uses`.
    pub fn initial_uses(&self) -> u32 {
        match self.config {
            EffectConfig::Shield { charges } => charges,
            _ => self.uses,
        }
    }
}
