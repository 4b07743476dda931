//! Per-kind requirement matching rules

use bingo_types::{CanonicalEvent, CombinationMode, EventPayload, Requirement, RequirementSpec};

/// Chat sources the engine accepts for chat-message requirements.
///
/// Only non-player-originated channels count; anything a player can type
/// into directly is excluded so tiles cannot be completed by saying the
/// magic words.
pub const ALLOWED_CHAT_SOURCES: &[&str] = &[
    "GAMEMESSAGE",
    "SPAM",
    "MESBOX",
    "CLAN_MESSAGE",
    "BROADCAST",
    "TRADE",
];

/// Does the event satisfy the spec?
///
/// Tiers and base requirements are an OR-track: a tier match counts even
/// when base requirements exist, and vice versa. For ALL-mode base
/// requirements a single satisfied entry is enough here; the aggregator
/// tracks which of the N entries have been satisfied over time.
pub fn matches_spec(event: &CanonicalEvent, spec: &RequirementSpec) -> bool {
    let tier_match = spec
        .tiers
        .iter()
        .any(|tier| matches_requirement(event, &tier.requirement));

    let base_match = match spec.mode {
        // Any single relevant requirement makes the event worth routing
        // to the aggregator, in both modes.
        CombinationMode::All | CombinationMode::Any => spec
            .requirements
            .iter()
            .any(|requirement| matches_requirement(event, requirement)),
    };

    tier_match || base_match
}

/// Is the event worth routing to a tile with this spec at all?
///
/// Unlike `matches_spec`, partial progress counts: a loot drop below a
/// total threshold or a gamble count short of its target still has to
/// reach the aggregator to accumulate.
pub fn relevant_to_spec(event: &CanonicalEvent, spec: &RequirementSpec) -> bool {
    spec.requirements
        .iter()
        .chain(spec.tiers.iter().map(|tier| &tier.requirement))
        .any(|requirement| relevant_to_requirement(event, requirement))
}

fn relevant_to_requirement(event: &CanonicalEvent, requirement: &Requirement) -> bool {
    if let Requirement::Puzzle { hidden, .. } = requirement
        && hidden.is_puzzle()
    {
        return false;
    }
    match requirement.effective() {
        Requirement::ItemDrop { items, .. } => {
            let EventPayload::Loot { items: dropped } = &event.payload else {
                return false;
            };
            dropped
                .iter()
                .any(|stack| stack.quantity > 0 && items.contains(&stack.item_id))
        }
        Requirement::ValueDrop { .. } => matches!(event.payload, EventPayload::Loot { .. }),
        Requirement::Speedrun { location, .. } => {
            let EventPayload::Speedrun {
                location: run_location,
                ..
            } = &event.payload
            else {
                return false;
            };
            // Any run at the right location updates the best time.
            run_location.eq_ignore_ascii_case(location)
        }
        Requirement::Experience { .. } => {
            matches!(event.payload, EventPayload::ExperienceLogout)
        }
        Requirement::BaGambles { .. } => {
            matches!(event.payload, EventPayload::BaGamble { .. })
        }
        // One-shot kinds progress only when they fully match.
        one_shot => matches_requirement(event, one_shot),
    }
}

/// Does the event satisfy one requirement?
///
/// Total over every kind/payload combination; unrelated pairs are false.
pub fn matches_requirement(event: &CanonicalEvent, requirement: &Requirement) -> bool {
    match requirement {
        Requirement::ItemDrop {
            items,
            total_amount,
        } => match_item_drop(event, items, *total_amount),
        Requirement::Pet { pet_name } => match_pet(event, pet_name),
        Requirement::ValueDrop { value } => match_value_drop(event, *value),
        Requirement::Speedrun {
            location,
            goal_seconds,
        } => match_speedrun(event, location, *goal_seconds),
        // The matcher only confirms this is a session-end signal; the
        // baseline-vs-snapshot comparison is the calculator's job.
        Requirement::Experience { .. } => {
            matches!(event.payload, EventPayload::ExperienceLogout)
        }
        Requirement::BaGambles { amount } => match_ba_gambles(event, *amount),
        Requirement::ChatMessage {
            source,
            message_type,
            message,
            exact_match,
        } => match_chat(
            event,
            source.as_deref(),
            message_type.as_deref(),
            message,
            *exact_match,
        ),
        Requirement::Puzzle { hidden, .. } => {
            // Nesting depth is 1: a puzzle wrapping a puzzle never matches.
            if hidden.is_puzzle() {
                return false;
            }
            matches_requirement(event, hidden)
        }
    }
}

fn match_item_drop(event: &CanonicalEvent, items: &[i64], total_amount: Option<i64>) -> bool {
    let EventPayload::Loot { items: dropped } = &event.payload else {
        return false;
    };

    match total_amount {
        // Total mode: quantities of all required items in this drop sum
        // toward the threshold.
        Some(threshold) => {
            let total: i64 = dropped
                .iter()
                .filter(|stack| items.contains(&stack.item_id))
                .map(|stack| stack.quantity)
                .sum();
            total >= threshold
        }
        // Per-item mode: any one required item present is a match (the
        // aggregator tracks the full distinct-item set).
        None => dropped
            .iter()
            .any(|stack| stack.quantity > 0 && items.contains(&stack.item_id)),
    }
}

fn match_pet(event: &CanonicalEvent, pet_name: &str) -> bool {
    let EventPayload::Pet { pet_name: received } = &event.payload else {
        return false;
    };
    received.eq_ignore_ascii_case(pet_name)
}

fn match_value_drop(event: &CanonicalEvent, value: i64) -> bool {
    let EventPayload::Loot { items } = &event.payload else {
        return false;
    };
    // A single stack must meet the threshold on its own; the drop's
    // combined total does not count.
    items.iter().any(|stack| stack.stack_value() >= value)
}

fn match_speedrun(event: &CanonicalEvent, location: &str, goal_seconds: f64) -> bool {
    let EventPayload::Speedrun {
        location: run_location,
        time_seconds,
    } = &event.payload
    else {
        return false;
    };
    run_location.eq_ignore_ascii_case(location) && *time_seconds <= goal_seconds
}

fn match_ba_gambles(event: &CanonicalEvent, amount: i64) -> bool {
    let EventPayload::BaGamble { gamble_count } = &event.payload else {
        return false;
    };
    *gamble_count >= amount
}

fn match_chat(
    event: &CanonicalEvent,
    required_source: Option<&str>,
    required_type: Option<&str>,
    message: &str,
    exact_match: bool,
) -> bool {
    let EventPayload::Chat {
        source,
        message_type,
        message: content,
    } = &event.payload
    else {
        return false;
    };

    if !ALLOWED_CHAT_SOURCES
        .iter()
        .any(|allowed| source.eq_ignore_ascii_case(allowed))
    {
        return false;
    }

    if let Some(required) = required_source
        && !source.eq_ignore_ascii_case(required)
    {
        return false;
    }

    if let Some(required) = required_type {
        match message_type {
            Some(actual) if actual.eq_ignore_ascii_case(required) => {}
            _ => return false,
        }
    }

    let content = content.to_ascii_lowercase();
    let needle = message.to_ascii_lowercase();
    if exact_match {
        content == needle
    } else {
        content.contains(&needle)
    }
}
