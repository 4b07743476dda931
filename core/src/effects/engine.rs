//! Effects engine
//!
//! Team-scoped resource state machine. Effects are earned from line and
//! tile completions (or admin grants), later activated against self or
//! an opponent, may be intercepted by the target's reactive defenses,
//! and every attempt lands in the append-only audit log.
//!
//! Interception priority for an incoming enemy activation:
//! 1. Shield: consumes one charge, blocks
//! 2. Reflect: consumes itself, redirects the consequences
//! 3. Immunity: blocks unconditionally while unexpired, not consumed

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bingo_types::{
    BoardTileId, EarnedEffectId, EffectConfig, TargetScope, TeamId, TriggerMode,
};

use crate::error::EngineError;
use crate::store::{Store, StoreError};

use super::catalog::{CatalogError, DefinitionSet};
use super::earned::{EffectSource, EffectStatus, TeamEarnedEffect};
use super::log::{ActivationLogEntry, LogAction};

/// Manual effect activation request (player/admin initiated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub earned_effect_id: EarnedEffectId,
    /// The team spending the effect; must own it.
    pub acting_team: TeamId,
    #[serde(default)]
    pub target_team_id: Option<TeamId>,
    #[serde(default)]
    pub target_tile_ids: Vec<BoardTileId>,
    #[serde(default)]
    pub target_positions: Vec<(u32, u32)>,
}

/// The consequence that actually landed somewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedEffect {
    pub config: EffectConfig,
    /// None means event-wide (target scope `all`).
    pub applied_to: Option<TeamId>,
}

/// Result of one activation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationOutcome {
    pub success: bool,
    pub action: LogAction,
    pub result: Option<AppliedEffect>,
    /// The defensive effect that consumed the attempt, when blocked or
    /// reflected.
    pub blocked_by: Option<EarnedEffectId>,
    /// Effects newly granted as a consequence (e.g. from a reflect).
    pub granted: Vec<TeamEarnedEffect>,
}

/// Result of granting an effect.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantOutcome {
    pub effect: TeamEarnedEffect,
    /// Set for immediate-trigger effects, which apply at earn time.
    pub auto_applied: Option<AppliedEffect>,
}

#[derive(Clone)]
pub struct EffectsEngine {
    store: Arc<dyn Store>,
    catalog: Arc<DefinitionSet>,
}

impl EffectsEngine {
    pub fn new(store: Arc<dyn Store>, catalog: Arc<DefinitionSet>) -> Self {
        Self { store, catalog }
    }

    // ─── Earn ───────────────────────────────────────────────────────────────

    /// Grant an effect to a team. Immediate-trigger effects apply on the
    /// spot and are journaled as `auto_triggered`.
    pub fn grant(
        &self,
        team: TeamId,
        definition_id: &str,
        source: EffectSource,
        source_id: i64,
        now: DateTime<Utc>,
    ) -> Result<GrantOutcome, EngineError> {
        let definition = self
            .catalog
            .get(definition_id)
            .ok_or_else(|| CatalogError::UnknownDefinition(definition_id.to_string()))?;

        let earned = TeamEarnedEffect::from_definition(definition, team, source, source_id, now);
        let id = self.store.insert_earned_effect(earned)?;
        self.store.append_log(
            ActivationLogEntry::new(LogAction::Earned, team, id, definition_id, true).at(now),
        );
        info!(%team, definition_id, ?source, "effect earned");

        let mut effect = self.store.earned_effect(id)?;
        let mut auto_applied = None;
        if definition.trigger == TriggerMode::Immediate {
            effect = self.store.consume_effect_use(id, None)?;
            self.store.append_log(
                ActivationLogEntry::new(LogAction::AutoTriggered, team, id, definition_id, true)
                    .at(now),
            );
            auto_applied = Some(AppliedEffect {
                config: effect.config.clone(),
                applied_to: Some(team),
            });
        }

        Ok(GrantOutcome {
            effect,
            auto_applied,
        })
    }

    // ─── Activate ───────────────────────────────────────────────────────────

    /// Spend a manual-trigger effect, optionally against a target team.
    pub fn activate(
        &self,
        request: &ActivationRequest,
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome, EngineError> {
        let effect = self.store.earned_effect(request.earned_effect_id)?;

        if effect.team_id != request.acting_team {
            return Err(EngineError::InvariantViolation {
                reason: format!(
                    "team {} does not own effect {}",
                    request.acting_team, effect.id
                ),
            });
        }
        if effect.trigger != TriggerMode::Manual {
            return Err(EngineError::InvariantViolation {
                reason: format!("effect {} is not manually triggerable", effect.id),
            });
        }

        // Lazy expiry: a stale effect expires on touch instead of
        // waiting for the sweep.
        if effect.is_past_expiry(now) {
            self.expire_one(&effect, now)?;
            return Ok(ActivationOutcome {
                success: false,
                action: LogAction::Expired,
                result: None,
                blocked_by: None,
                granted: Vec::new(),
            });
        }
        if effect.status != EffectStatus::Available {
            return Err(StoreError::EffectUnavailable(effect.id).into());
        }

        let definition = self
            .catalog
            .get(&effect.definition_id)
            .ok_or_else(|| CatalogError::UnknownDefinition(effect.definition_id.clone()))?;

        match definition.target_scope {
            TargetScope::Enemy => {
                let target = request.target_team_id.ok_or_else(|| {
                    EngineError::InvariantViolation {
                        reason: "enemy-targeted effect requires a target team".into(),
                    }
                })?;
                if target == request.acting_team {
                    return Err(EngineError::InvariantViolation {
                        reason: "enemy-targeted effect cannot target its own team".into(),
                    });
                }
                self.activate_against(&effect, target, now)
            }
            TargetScope::SelfTeam | TargetScope::All => {
                let applied_to = match definition.target_scope {
                    TargetScope::SelfTeam => Some(request.acting_team),
                    _ => None,
                };
                let spent = self
                    .store
                    .consume_effect_use(effect.id, applied_to)?;
                self.store.append_log(
                    ActivationLogEntry::new(
                        LogAction::Activated,
                        effect.team_id,
                        effect.id,
                        &effect.definition_id,
                        true,
                    )
                    .at(now),
                );
                debug!(effect = %effect.id, "self-scoped effect activated");
                Ok(ActivationOutcome {
                    success: true,
                    action: LogAction::Activated,
                    result: Some(AppliedEffect {
                        config: spent.config,
                        applied_to,
                    }),
                    blocked_by: None,
                    granted: Vec::new(),
                })
            }
        }
    }

    /// Enemy-targeted path: check the target's reactive defenses in
    /// priority order before the effect lands.
    fn activate_against(
        &self,
        effect: &TeamEarnedEffect,
        target: TeamId,
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome, EngineError> {
        let attacker = effect.team_id;

        let mut defenses: Vec<TeamEarnedEffect> = self
            .store
            .team_effects(target)
            .into_iter()
            .filter(|defense| {
                defense.trigger == TriggerMode::Reactive
                    && defense.reactive_priority().is_some()
                    && defense.is_available(now)
            })
            .collect();
        defenses.sort_by_key(|defense| (defense.reactive_priority(), defense.id));

        for defense in defenses {
            match &defense.config {
                EffectConfig::Shield { .. } => {
                    match self.store.consume_effect_use(defense.id, Some(attacker)) {
                        Ok(_) => return self.blocked(effect, target, &defense, now),
                        // Raced away by a concurrent attacker; the next
                        // defense (or none) decides.
                        Err(StoreError::EffectUnavailable(_)) => continue,
                        Err(other) => return Err(other.into()),
                    }
                }
                EffectConfig::Reflect => {
                    match self.store.consume_effect_use(defense.id, Some(attacker)) {
                        Ok(_) => return self.reflected(effect, target, &defense, now),
                        Err(StoreError::EffectUnavailable(_)) => continue,
                        Err(other) => return Err(other.into()),
                    }
                }
                EffectConfig::Immunity { .. } => {
                    // Not consumed; blocks everything for its duration.
                    return self.blocked(effect, target, &defense, now);
                }
                _ => continue,
            }
        }

        // Nothing intercepted: the effect lands.
        let spent = self.store.consume_effect_use(effect.id, Some(target))?;
        self.store.append_log(
            ActivationLogEntry::new(
                LogAction::Activated,
                attacker,
                effect.id,
                &effect.definition_id,
                true,
            )
            .at(now)
            .target(target),
        );
        info!(effect = %effect.id, %attacker, %target, "effect activated");
        Ok(ActivationOutcome {
            success: true,
            action: LogAction::Activated,
            result: Some(AppliedEffect {
                config: spent.config,
                applied_to: Some(target),
            }),
            blocked_by: None,
            granted: Vec::new(),
        })
    }

    /// The attack was intercepted; the attempt still spends the
    /// attacker's effect.
    fn blocked(
        &self,
        effect: &TeamEarnedEffect,
        target: TeamId,
        defense: &TeamEarnedEffect,
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome, EngineError> {
        self.store.consume_effect_use(effect.id, Some(target))?;
        self.store.append_log(
            ActivationLogEntry::new(
                LogAction::Blocked,
                effect.team_id,
                effect.id,
                &effect.definition_id,
                false,
            )
            .at(now)
            .target(target)
            .blocked_by(defense.id),
        );
        info!(
            effect = %effect.id,
            defense = %defense.id,
            %target,
            "activation blocked by reactive defense"
        );
        Ok(ActivationOutcome {
            success: false,
            action: LogAction::Blocked,
            result: None,
            blocked_by: Some(defense.id),
            granted: Vec::new(),
        })
    }

    /// The defender's reflect sends the consequences back at the
    /// attacker: the attacker's effect is spent, and the defender is
    /// granted a mirror instance that applies immediately against the
    /// attacking team.
    fn reflected(
        &self,
        effect: &TeamEarnedEffect,
        target: TeamId,
        defense: &TeamEarnedEffect,
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome, EngineError> {
        let attacker = effect.team_id;
        self.store.consume_effect_use(effect.id, Some(target))?;

        let mirror = TeamEarnedEffect {
            id: EarnedEffectId(0),
            team_id: target,
            definition_id: effect.definition_id.clone(),
            config: effect.config.clone(),
            trigger: effect.trigger,
            source: EffectSource::Reflected,
            source_id: effect.id.0,
            status: EffectStatus::Available,
            remaining_uses: 1,
            earned_at: now,
            expires_at: None,
            used_on_team: None,
        };
        let mirror_id = self.store.insert_earned_effect(mirror)?;
        self.store.append_log(
            ActivationLogEntry::new(
                LogAction::Earned,
                target,
                mirror_id,
                &effect.definition_id,
                true,
            )
            .at(now),
        );
        let applied = self.store.consume_effect_use(mirror_id, Some(attacker))?;
        self.store.append_log(
            ActivationLogEntry::new(
                LogAction::Reflected,
                target,
                mirror_id,
                &effect.definition_id,
                true,
            )
            .at(now)
            .target(attacker)
            .blocked_by(defense.id),
        );
        info!(
            effect = %effect.id,
            defense = %defense.id,
            %attacker,
            "activation reflected back at its source"
        );
        Ok(ActivationOutcome {
            success: false,
            action: LogAction::Reflected,
            result: Some(AppliedEffect {
                config: applied.config.clone(),
                applied_to: Some(attacker),
            }),
            blocked_by: Some(defense.id),
            granted: vec![applied],
        })
    }

    // ─── Expire / remove ────────────────────────────────────────────────────

    /// Transition every past-expiry available effect to `expired`,
    /// journaling each exactly once.
    pub fn expire_sweep(&self, now: DateTime<Utc>) -> Result<Vec<EarnedEffectId>, EngineError> {
        let mut expired = Vec::new();
        for effect in self.store.earned_effects() {
            if effect.status == EffectStatus::Available && effect.is_past_expiry(now) {
                if self.expire_one(&effect, now)? {
                    expired.push(effect.id);
                }
            }
        }
        Ok(expired)
    }

    fn expire_one(
        &self,
        effect: &TeamEarnedEffect,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let transitioned = self.store.transition_effect(effect.id, EffectStatus::Expired)?;
        if transitioned {
            self.store.append_log(
                ActivationLogEntry::new(
                    LogAction::Expired,
                    effect.team_id,
                    effect.id,
                    &effect.definition_id,
                    false,
                )
                .at(now),
            );
            debug!(effect = %effect.id, "effect expired");
        }
        Ok(transitioned)
    }

    /// Admin removal: negate an available effect.
    pub fn remove(&self, id: EarnedEffectId, now: DateTime<Utc>) -> Result<(), EngineError> {
        let effect = self.store.earned_effect(id)?;
        if self.store.transition_effect(id, EffectStatus::Negated)? {
            self.store.append_log(
                ActivationLogEntry::new(
                    LogAction::Removed,
                    effect.team_id,
                    effect.id,
                    &effect.definition_id,
                    false,
                )
                .at(now),
            );
        }
        Ok(())
    }
}
