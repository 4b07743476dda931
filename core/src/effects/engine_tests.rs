//! Tests for the effects engine
//!
//! Earn/activate/intercept/expire flows, the interception priority
//! order, and the compare-and-consume guarantee under contention.

use std::sync::Arc;

use chrono::{Duration, Utc};

use bingo_types::{
    EffectCategory, EffectConfig, EffectDefinition, TargetScope, TeamId, TriggerMode,
};

use crate::error::EngineError;
use crate::store::{MemoryStore, Store};

use super::{
    ActivationRequest, DefinitionSet, EffectSource, EffectStatus, EffectsEngine, LogAction,
};

// ═══════════════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════════════

const RED: TeamId = TeamId(1);
const BLUE: TeamId = TeamId(2);

fn definition(
    id: &str,
    target_scope: TargetScope,
    trigger: TriggerMode,
    config: EffectConfig,
) -> EffectDefinition {
    EffectDefinition {
        id: id.into(),
        name: id.into(),
        description: String::new(),
        category: match config {
            _ if config.is_reactive() => EffectCategory::Reactive,
            EffectConfig::TileLock { .. } | EffectConfig::TileSwap { .. } => EffectCategory::Debuff,
            _ => EffectCategory::Buff,
        },
        target_scope,
        trigger,
        config,
        uses: 1,
        expires_in_secs: None,
    }
}

fn make_engine() -> (Arc<MemoryStore>, EffectsEngine) {
    let mut catalog = DefinitionSet::new();
    catalog.add_definitions(
        vec![
            definition(
                "lockdown",
                TargetScope::Enemy,
                TriggerMode::Manual,
                EffectConfig::TileLock { duration_secs: 600 },
            ),
            definition(
                "double_points",
                TargetScope::SelfTeam,
                TriggerMode::Manual,
                EffectConfig::PointMultiplier {
                    factor: 2.0,
                    duration_secs: 3600,
                },
            ),
            definition(
                "bonus",
                TargetScope::SelfTeam,
                TriggerMode::Immediate,
                EffectConfig::PointsBonus { points: 50 },
            ),
            definition(
                "shield",
                TargetScope::SelfTeam,
                TriggerMode::Reactive,
                EffectConfig::Shield { charges: 1 },
            ),
            definition(
                "mirror",
                TargetScope::SelfTeam,
                TriggerMode::Reactive,
                EffectConfig::Reflect,
            ),
            {
                let mut timed = definition(
                    "timed_bonus",
                    TargetScope::SelfTeam,
                    TriggerMode::Manual,
                    EffectConfig::PointsBonus { points: 10 },
                );
                timed.expires_in_secs = Some(60);
                timed
            },
            definition(
                "aegis",
                TargetScope::SelfTeam,
                TriggerMode::Reactive,
                EffectConfig::Immunity { duration_secs: 3600 },
            ),
        ],
        false,
    );

    let store = Arc::new(MemoryStore::new());
    let engine = EffectsEngine::new(store.clone(), Arc::new(catalog));
    (store, engine)
}

fn request(effect: bingo_types::EarnedEffectId, team: TeamId, target: Option<TeamId>) -> ActivationRequest {
    ActivationRequest {
        earned_effect_id: effect,
        acting_team: team,
        target_team_id: target,
        target_tile_ids: Vec::new(),
        target_positions: Vec::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Earn
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn grant_journals_and_leaves_effect_available() {
    let (store, engine) = make_engine();
    let now = Utc::now();

    let granted = engine
        .grant(RED, "lockdown", EffectSource::RowCompletion, 7, now)
        .unwrap();

    assert_eq!(granted.effect.status, EffectStatus::Available);
    assert_eq!(granted.effect.remaining_uses, 1);
    assert_eq!(granted.effect.source_id, 7);
    assert!(granted.auto_applied.is_none());

    let log = store.activation_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, LogAction::Earned);
    assert!(log[0].success);
}

#[test]
fn immediate_effect_applies_at_earn_time() {
    let (store, engine) = make_engine();
    let now = Utc::now();

    let granted = engine
        .grant(RED, "bonus", EffectSource::TileCompletion, 3, now)
        .unwrap();

    assert_eq!(granted.effect.status, EffectStatus::Used);
    assert_eq!(
        granted.auto_applied.unwrap().config,
        bingo_types::EffectConfig::PointsBonus { points: 50 }
    );

    let actions: Vec<_> = store.activation_log().iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![LogAction::Earned, LogAction::AutoTriggered]);
}

#[test]
fn grant_of_unknown_definition_fails() {
    let (_, engine) = make_engine();
    let result = engine.grant(RED, "nonsense", EffectSource::Admin, 0, Utc::now());
    assert!(matches!(result, Err(EngineError::Catalog(_))));
}

// ═══════════════════════════════════════════════════════════════════════════
// Activate
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn self_scoped_activation_consumes_the_effect() {
    let (store, engine) = make_engine();
    let now = Utc::now();
    let granted = engine
        .grant(RED, "double_points", EffectSource::ColumnCompletion, 1, now)
        .unwrap();

    let outcome = engine
        .activate(&request(granted.effect.id, RED, None), now)
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.result.unwrap().applied_to, Some(RED));
    assert_eq!(
        store.earned_effect(granted.effect.id).unwrap().status,
        EffectStatus::Used
    );
}

#[test]
fn activation_requires_ownership() {
    let (_, engine) = make_engine();
    let now = Utc::now();
    let granted = engine
        .grant(RED, "double_points", EffectSource::Admin, 0, now)
        .unwrap();

    let result = engine.activate(&request(granted.effect.id, BLUE, None), now);
    assert!(matches!(result, Err(EngineError::InvariantViolation { .. })));
}

#[test]
fn enemy_effect_requires_a_foreign_target() {
    let (_, engine) = make_engine();
    let now = Utc::now();
    let granted = engine
        .grant(RED, "lockdown", EffectSource::Admin, 0, now)
        .unwrap();

    let missing = engine.activate(&request(granted.effect.id, RED, None), now);
    assert!(matches!(missing, Err(EngineError::InvariantViolation { .. })));

    let own_goal = engine.activate(&request(granted.effect.id, RED, Some(RED)), now);
    assert!(matches!(own_goal, Err(EngineError::InvariantViolation { .. })));
}

#[test]
fn enemy_activation_lands_when_undefended() {
    let (store, engine) = make_engine();
    let now = Utc::now();
    let granted = engine
        .grant(RED, "lockdown", EffectSource::RowCompletion, 1, now)
        .unwrap();

    let outcome = engine
        .activate(&request(granted.effect.id, RED, Some(BLUE)), now)
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.result.unwrap().applied_to, Some(BLUE));

    let spent = store.earned_effect(granted.effect.id).unwrap();
    assert_eq!(spent.status, EffectStatus::Used);
    assert_eq!(spent.used_on_team, Some(BLUE));
}

// ═══════════════════════════════════════════════════════════════════════════
// Interception
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn shield_blocks_and_both_effects_are_spent() {
    let (store, engine) = make_engine();
    let now = Utc::now();
    let attack = engine
        .grant(RED, "lockdown", EffectSource::RowCompletion, 1, now)
        .unwrap();
    let shield = engine
        .grant(BLUE, "shield", EffectSource::TileCompletion, 2, now)
        .unwrap();

    let outcome = engine
        .activate(&request(attack.effect.id, RED, Some(BLUE)), now)
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.action, LogAction::Blocked);
    assert_eq!(outcome.blocked_by, Some(shield.effect.id));
    assert!(outcome.result.is_none());

    // The attempt spends the attacker's effect and the shield charge.
    assert_eq!(
        store.earned_effect(attack.effect.id).unwrap().status,
        EffectStatus::Used
    );
    assert_eq!(
        store.earned_effect(shield.effect.id).unwrap().status,
        EffectStatus::Used
    );

    let blocked: Vec<_> = store
        .activation_log()
        .into_iter()
        .filter(|entry| entry.action == LogAction::Blocked)
        .collect();
    assert_eq!(blocked.len(), 1);
    assert!(!blocked[0].success);
    assert_eq!(blocked[0].blocked_by, Some(shield.effect.id));
    assert_eq!(blocked[0].target_team, Some(BLUE));
}

#[test]
fn reflect_sends_the_consequences_back() {
    let (store, engine) = make_engine();
    let now = Utc::now();
    let attack = engine
        .grant(RED, "lockdown", EffectSource::RowCompletion, 1, now)
        .unwrap();
    let reflect = engine
        .grant(BLUE, "mirror", EffectSource::TileCompletion, 2, now)
        .unwrap();

    let outcome = engine
        .activate(&request(attack.effect.id, RED, Some(BLUE)), now)
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.action, LogAction::Reflected);
    assert_eq!(outcome.blocked_by, Some(reflect.effect.id));
    // The consequence lands on the attacker instead.
    assert_eq!(outcome.result.unwrap().applied_to, Some(RED));

    // The defender was granted a mirror instance, already consumed
    // against the attacker.
    assert_eq!(outcome.granted.len(), 1);
    let mirror = &outcome.granted[0];
    assert_eq!(mirror.team_id, BLUE);
    assert_eq!(mirror.source, EffectSource::Reflected);
    assert_eq!(mirror.source_id, attack.effect.id.0);
    assert_eq!(mirror.status, EffectStatus::Used);
    assert_eq!(mirror.used_on_team, Some(RED));

    assert_eq!(
        store.earned_effect(attack.effect.id).unwrap().status,
        EffectStatus::Used
    );
    assert_eq!(
        store.earned_effect(reflect.effect.id).unwrap().status,
        EffectStatus::Used
    );
}

#[test]
fn immunity_blocks_without_being_consumed() {
    let (store, engine) = make_engine();
    let now = Utc::now();
    let immunity = engine
        .grant(BLUE, "aegis", EffectSource::ColumnCompletion, 5, now)
        .unwrap();

    for _ in 0..2 {
        let attack = engine
            .grant(RED, "lockdown", EffectSource::Admin, 0, now)
            .unwrap();
        let outcome = engine
            .activate(&request(attack.effect.id, RED, Some(BLUE)), now)
            .unwrap();
        assert_eq!(outcome.action, LogAction::Blocked);
        assert_eq!(outcome.blocked_by, Some(immunity.effect.id));
    }

    let unspent = store.earned_effect(immunity.effect.id).unwrap();
    assert_eq!(unspent.status, EffectStatus::Available);
    assert_eq!(unspent.remaining_uses, 1);
}

#[test]
fn shield_is_consumed_before_immunity() {
    let (store, engine) = make_engine();
    let now = Utc::now();
    let shield = engine
        .grant(BLUE, "shield", EffectSource::Admin, 0, now)
        .unwrap();
    engine
        .grant(BLUE, "aegis", EffectSource::Admin, 0, now)
        .unwrap();

    let attack = engine
        .grant(RED, "lockdown", EffectSource::Admin, 0, now)
        .unwrap();
    let outcome = engine
        .activate(&request(attack.effect.id, RED, Some(BLUE)), now)
        .unwrap();

    assert_eq!(outcome.blocked_by, Some(shield.effect.id));
    assert_eq!(
        store.earned_effect(shield.effect.id).unwrap().status,
        EffectStatus::Used
    );
}

#[test]
fn one_shield_charge_blocks_exactly_one_concurrent_attack() {
    let (store, engine) = make_engine();
    let now = Utc::now();
    engine
        .grant(BLUE, "shield", EffectSource::Admin, 0, now)
        .unwrap();
    let first = engine
        .grant(RED, "lockdown", EffectSource::Admin, 0, now)
        .unwrap();
    let second = engine
        .grant(RED, "lockdown", EffectSource::Admin, 0, now)
        .unwrap();

    let handles: Vec<_> = [first.effect.id, second.effect.id]
        .into_iter()
        .map(|id| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                engine
                    .activate(&request(id, RED, Some(BLUE)), Utc::now())
                    .unwrap()
            })
        })
        .collect();
    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    // Exactly one attack was absorbed; the other landed.
    let blocked = outcomes
        .iter()
        .filter(|o| o.action == LogAction::Blocked)
        .count();
    let landed = outcomes
        .iter()
        .filter(|o| o.action == LogAction::Activated)
        .count();
    assert_eq!((blocked, landed), (1, 1));

    // Both attacker effects are spent regardless of outcome.
    for id in [first.effect.id, second.effect.id] {
        assert_eq!(
            store.earned_effect(id).unwrap().status,
            EffectStatus::Used
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Expiry & removal
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn stale_effect_expires_on_activation_attempt() {
    let (store, engine) = make_engine();
    let earned_at = Utc::now();
    let granted = engine
        .grant(RED, "timed_bonus", EffectSource::Admin, 0, earned_at)
        .unwrap();

    let later = earned_at + Duration::seconds(120);
    let outcome = engine
        .activate(&request(granted.effect.id, RED, None), later)
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.action, LogAction::Expired);
    assert_eq!(
        store.earned_effect(granted.effect.id).unwrap().status,
        EffectStatus::Expired
    );
}

#[test]
fn expire_sweep_journals_each_effect_once() {
    let (store, engine) = make_engine();
    let earned_at = Utc::now();
    let granted = engine
        .grant(RED, "timed_bonus", EffectSource::Admin, 0, earned_at)
        .unwrap();

    let later = earned_at + Duration::seconds(120);
    let first = engine.expire_sweep(later).unwrap();
    assert_eq!(first, vec![granted.effect.id]);

    // A second sweep finds nothing left to transition.
    let second = engine.expire_sweep(later).unwrap();
    assert!(second.is_empty());

    let expired_entries = store
        .activation_log()
        .into_iter()
        .filter(|entry| entry.action == LogAction::Expired)
        .count();
    assert_eq!(expired_entries, 1);
}

#[test]
fn admin_removal_negates_an_available_effect() {
    let (store, engine) = make_engine();
    let now = Utc::now();
    let granted = engine
        .grant(RED, "double_points", EffectSource::Admin, 0, now)
        .unwrap();

    engine.remove(granted.effect.id, now).unwrap();
    assert_eq!(
        store.earned_effect(granted.effect.id).unwrap().status,
        EffectStatus::Negated
    );
    assert!(
        store
            .activation_log()
            .iter()
            .any(|entry| entry.action == LogAction::Removed)
    );
}
