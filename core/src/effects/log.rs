//! Effect activation audit log
//!
//! Append-only journal of every effect state transition. Entries are
//! created once and never updated or deleted; cross-references (the
//! defensive effect that blocked an attempt, the reflected source) are
//! plain ids, never in-memory back-pointers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bingo_types::{EarnedEffectId, TeamId};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Earned,
    Activated,
    AutoTriggered,
    Reflected,
    Blocked,
    Expired,
    Removed,
}

/// Immutable audit record for one effect state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationLogEntry {
    pub at: DateTime<Utc>,
    pub action: LogAction,
    pub source_team: TeamId,
    pub target_team: Option<TeamId>,
    pub effect_id: EarnedEffectId,
    pub definition_id: String,
    pub success: bool,
    /// When blocked: the defensive effect that consumed the attempt.
    pub blocked_by: Option<EarnedEffectId>,
}

impl ActivationLogEntry {
    pub fn new(
        action: LogAction,
        source_team: TeamId,
        effect_id: EarnedEffectId,
        definition_id: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            at: Utc::now(),
            action,
            source_team,
            target_team: None,
            effect_id,
            definition_id: definition_id.into(),
            success,
            blocked_by: None,
        }
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }

    pub fn target(mut self, team: TeamId) -> Self {
        self.target_team = Some(team);
        self
    }

    pub fn blocked_by(mut self, effect: EarnedEffectId) -> Self {
        self.blocked_by = Some(effect);
        self
    }
}
