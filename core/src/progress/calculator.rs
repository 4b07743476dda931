//! Per-kind progress calculators
//!
//! One pure function per requirement kind. Each takes the event, the
//! requirement, and the prior slot state, and produces the updated slot
//! plus the qualifying contribution this event added (used for the
//! solo-attribution ledger).
//!
//! Accumulation semantics per kind:
//! - item drop, total mode: sums required-item quantities
//! - item drop, per-item mode: tracks the distinct item set
//! - value drop: running maximum single-stack value observed
//! - speedrun: running minimum (best) time
//! - BA gambles: monotone maximum of the cumulative count
//! - pet / chat: one-shot, first match satisfies
//! - experience: each player's gain over their own baseline, summed
//!
//! Event-level replay protection (at-least-once delivery) is handled by
//! the aggregator via applied-event ids before any calculator runs, so
//! the functions here only need per-kind merge semantics.

use bingo_types::{CanonicalEvent, EventPayload, Requirement};

use super::RequirementProgress;
use crate::requirement::matches_requirement;

/// Result of applying one event to one requirement slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalcOutcome {
    /// Qualifying contribution this event added (ledger units).
    pub contribution: f64,
    /// Whether the slot is satisfied after this event.
    pub satisfied: bool,
    /// Whether the slot changed at all.
    pub changed: bool,
}

/// Apply an event to one requirement slot.
///
/// `xp_snapshot` carries the externally fetched experience total for
/// experience requirements; all other kinds ignore it.
pub fn apply_requirement(
    event: &CanonicalEvent,
    requirement: &Requirement,
    slot: &mut RequirementProgress,
    xp_snapshot: Option<i64>,
) -> CalcOutcome {
    match requirement.effective() {
        Requirement::ItemDrop {
            items,
            total_amount,
        } => apply_item_drop(event, items, *total_amount, slot),
        Requirement::ValueDrop { value } => apply_value_drop(event, *value, slot),
        Requirement::Speedrun { goal_seconds, .. } => {
            apply_speedrun(event, requirement, *goal_seconds, slot)
        }
        Requirement::Experience { target_xp, .. } => {
            apply_experience(*target_xp, slot, xp_snapshot, event.player_name.as_deref())
        }
        Requirement::BaGambles { amount } => apply_ba_gambles(event, *amount, slot),
        // One-shot kinds: first matching event satisfies the slot.
        Requirement::Pet { .. } | Requirement::ChatMessage { .. } => {
            apply_one_shot(event, requirement, slot)
        }
        // `effective()` unwraps one layer; a nested puzzle stays inert.
        Requirement::Puzzle { .. } => CalcOutcome::default(),
    }
}

fn outcome(slot: &RequirementProgress, contribution: f64, changed: bool) -> CalcOutcome {
    CalcOutcome {
        contribution,
        satisfied: slot.satisfied,
        changed,
    }
}

fn apply_item_drop(
    event: &CanonicalEvent,
    items: &[i64],
    total_amount: Option<i64>,
    slot: &mut RequirementProgress,
) -> CalcOutcome {
    let EventPayload::Loot { items: dropped } = &event.payload else {
        return CalcOutcome::default();
    };

    match total_amount {
        Some(threshold) => {
            let added: i64 = dropped
                .iter()
                .filter(|stack| items.contains(&stack.item_id))
                .map(|stack| stack.quantity)
                .sum();
            if added <= 0 {
                return CalcOutcome::default();
            }
            slot.value += added as f64;
            slot.satisfied = slot.satisfied || slot.value >= threshold as f64;
            outcome(slot, added as f64, true)
        }
        None => {
            let mut added = 0.0;
            for stack in dropped {
                if stack.quantity > 0
                    && items.contains(&stack.item_id)
                    && slot.obtained_items.insert(stack.item_id)
                {
                    added += 1.0;
                }
            }
            if added == 0.0 {
                return CalcOutcome::default();
            }
            slot.value = slot.obtained_items.len() as f64;
            slot.satisfied =
                slot.satisfied || items.iter().all(|item| slot.obtained_items.contains(item));
            outcome(slot, added, true)
        }
    }
}

fn apply_value_drop(
    event: &CanonicalEvent,
    threshold: i64,
    slot: &mut RequirementProgress,
) -> CalcOutcome {
    let EventPayload::Loot { items } = &event.payload else {
        return CalcOutcome::default();
    };
    let best = items.iter().map(|stack| stack.stack_value()).max();
    let Some(best) = best else {
        return CalcOutcome::default();
    };

    let best = best as f64;
    if best <= slot.value {
        return CalcOutcome::default();
    }
    let added = best - slot.value;
    slot.value = best;
    slot.satisfied = slot.satisfied || best >= threshold as f64;
    outcome(slot, added, true)
}

fn apply_speedrun(
    event: &CanonicalEvent,
    requirement: &Requirement,
    goal_seconds: f64,
    slot: &mut RequirementProgress,
) -> CalcOutcome {
    // Location check lives in the matcher; re-use it so a run at the
    // wrong location never improves the best time.
    if !matches_location(event, requirement) {
        return CalcOutcome::default();
    }
    let EventPayload::Speedrun { time_seconds, .. } = &event.payload else {
        return CalcOutcome::default();
    };

    let improved = slot.best_time.map(|best| *time_seconds < best).unwrap_or(true);
    if !improved {
        return CalcOutcome::default();
    }
    slot.best_time = Some(*time_seconds);
    slot.value = *time_seconds;
    let newly_satisfied = *time_seconds <= goal_seconds && !slot.satisfied;
    slot.satisfied = slot.satisfied || *time_seconds <= goal_seconds;
    // Credit only the run that first beats the goal.
    outcome(slot, if newly_satisfied { 1.0 } else { 0.0 }, true)
}

/// Location-only check for speedrun events (goal comparison is the
/// calculator's own concern since a non-qualifying run still updates the
/// best time toward display).
fn matches_location(event: &CanonicalEvent, requirement: &Requirement) -> bool {
    let Requirement::Speedrun { location, .. } = requirement.effective() else {
        return false;
    };
    let EventPayload::Speedrun {
        location: run_location,
        ..
    } = &event.payload
    else {
        return false;
    };
    run_location.eq_ignore_ascii_case(location)
}

fn apply_experience(
    target_xp: i64,
    slot: &mut RequirementProgress,
    xp_snapshot: Option<i64>,
    player: Option<&str>,
) -> CalcOutcome {
    // Snapshot fetch failed upstream, or the event carries no player to
    // attribute the gain to; leave the slot untouched.
    let (Some(snapshot), Some(player)) = (xp_snapshot, player) else {
        return CalcOutcome::default();
    };

    let Some(&baseline) = slot.baselines.get(player) else {
        // First session-end signal for this player: capture their own
        // tracking baseline.
        slot.baselines.insert(player.to_string(), snapshot);
        return outcome(slot, 0.0, true);
    };

    let gained = (snapshot - baseline).max(0);
    let prior = slot.xp_gained.get(player).copied().unwrap_or(0);
    if gained <= prior {
        // Stale or repeated snapshot; nothing gained.
        return CalcOutcome::default();
    }
    let added = (gained - prior) as f64;
    slot.xp_gained.insert(player.to_string(), gained);
    // The slot accumulates the team's combined gain.
    slot.value += added;
    slot.satisfied = slot.satisfied || slot.value >= target_xp as f64;
    outcome(slot, added, true)
}

fn apply_ba_gambles(
    event: &CanonicalEvent,
    amount: i64,
    slot: &mut RequirementProgress,
) -> CalcOutcome {
    let EventPayload::BaGamble { gamble_count } = &event.payload else {
        return CalcOutcome::default();
    };
    let count = *gamble_count as f64;
    // The event carries a cumulative lifetime total; the counter only
    // ever moves forward.
    if count <= slot.value {
        return CalcOutcome::default();
    }
    let added = count - slot.value;
    slot.value = count;
    slot.satisfied = slot.satisfied || count >= amount as f64;
    outcome(slot, added, true)
}

fn apply_one_shot(
    event: &CanonicalEvent,
    requirement: &Requirement,
    slot: &mut RequirementProgress,
) -> CalcOutcome {
    if slot.satisfied || !matches_requirement(event, requirement) {
        return CalcOutcome::default();
    }
    slot.value = 1.0;
    slot.satisfied = true;
    outcome(slot, 1.0, true)
}
