//! Canonical event intake
//!
//! Events arrive already adapted into the canonical schema
//! (`bingo_types::CanonicalEvent`). This module rejects malformed
//! payloads before anything downstream sees them: a payload that fails
//! validation is logged and dropped, never persisted as progress.

mod error;

pub use error::EventError;

use bingo_types::{CanonicalEvent, EventPayload};

/// Validate a canonical event's kind-specific payload.
///
/// Matching and progress are only ever computed for events that pass
/// this check.
pub fn validate(event: &CanonicalEvent) -> Result<(), EventError> {
    match &event.payload {
        EventPayload::Loot { items } => {
            if items.is_empty() {
                return Err(EventError::EmptyLoot);
            }
            for item in items {
                if item.quantity < 0 || item.price_each < 0 {
                    return Err(EventError::NegativeLoot {
                        item_id: item.item_id,
                    });
                }
            }
            Ok(())
        }
        EventPayload::Pet { pet_name } => {
            if pet_name.trim().is_empty() {
                return Err(EventError::EmptyPetName);
            }
            Ok(())
        }
        EventPayload::Speedrun {
            location,
            time_seconds,
        } => {
            if location.trim().is_empty() {
                return Err(EventError::EmptyLocation);
            }
            if !time_seconds.is_finite() || *time_seconds <= 0.0 {
                return Err(EventError::InvalidTime(*time_seconds));
            }
            Ok(())
        }
        EventPayload::ExperienceLogout => Ok(()),
        EventPayload::BaGamble { gamble_count } => {
            if *gamble_count < 0 {
                return Err(EventError::NegativeGambleCount(*gamble_count));
            }
            Ok(())
        }
        EventPayload::Chat {
            source, message, ..
        } => {
            if source.trim().is_empty() || message.trim().is_empty() {
                return Err(EventError::EmptyChat);
            }
            Ok(())
        }
    }
}
