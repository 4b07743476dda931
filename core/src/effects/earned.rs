//! Earned effect instances (runtime state)
//!
//! A `TeamEarnedEffect` is one unit of tactical resource held by a team.
//! It is created on grant and terminates when consumed, expired, or
//! negated. Status moves one direction only:
//!
//! ```text
//! Available ──▶ Used | Expired | Negated
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use bingo_types::{EarnedEffectId, EffectConfig, EffectDefinition, TeamId, TriggerMode};

/// Where an earned effect came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectSource {
    RowCompletion,
    ColumnCompletion,
    TileCompletion,
    Admin,
    /// Re-granted to a defender whose reflect intercepted an attack.
    Reflected,
}

/// Lifecycle status. Transitions out of `Available` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectStatus {
    Available,
    Used,
    Expired,
    Negated,
}

impl EffectStatus {
    /// Whether moving to `to` is a legal (one-directional) transition.
    pub fn can_transition(self, to: EffectStatus) -> bool {
        self == EffectStatus::Available && to != EffectStatus::Available
    }
}

/// A unit of tactical resource held by a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEarnedEffect {
    pub id: EarnedEffectId,
    pub team_id: TeamId,
    /// Catalog id of the definition this instance was granted from.
    pub definition_id: String,
    /// Config copied from the definition at grant time, so an earned
    /// instance stays stable if the catalog is edited later.
    pub config: EffectConfig,
    pub trigger: TriggerMode,
    pub source: EffectSource,
    /// Id of the granting record (line completion id, board tile id,
    /// the reflected attack's effect id, or 0 for admin grants).
    pub source_id: i64,
    pub status: EffectStatus,
    /// Monotonically decreasing; never incremented.
    pub remaining_uses: u32,
    pub earned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_on_team: Option<TeamId>,
}

impl TeamEarnedEffect {
    /// Build a fresh instance from a catalog definition. The id is
    /// assigned by the store on insert.
    pub fn from_definition(
        definition: &EffectDefinition,
        team_id: TeamId,
        source: EffectSource,
        source_id: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EarnedEffectId(0),
            team_id,
            definition_id: definition.id.clone(),
            config: definition.config.clone(),
            trigger: definition.trigger,
            source,
            source_id,
            status: EffectStatus::Available,
            remaining_uses: definition.initial_uses(),
            earned_at: now,
            expires_at: definition
                .expires_in_secs
                .map(|secs| now + Duration::seconds(secs as i64)),
            used_on_team: None,
        }
    }

    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.status == EffectStatus::Available && !self.is_past_expiry(now)
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }

    /// Interception priority when this instance sits in a defender's
    /// pool: shields first, then reflects, then immunities.
    pub fn reactive_priority(&self) -> Option<u8> {
        match self.config {
            EffectConfig::Shield { .. } => Some(0),
            EffectConfig::Reflect => Some(1),
            EffectConfig::Immunity { .. } => Some(2),
            _ => None,
        }
    }
}
