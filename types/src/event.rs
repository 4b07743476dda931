//! Canonical gameplay event schema
//!
//! Every telemetry provider is adapted into this shape before it reaches
//! the engine. The payload is a closed tagged union; adding a kind is a
//! schema change, not a stringly-typed extension.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AccountId;

/// Unique id for one delivered event. Delivery is at-least-once; the
/// engine deduplicates on this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One stack of items in a loot drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootedItem {
    pub item_id: i64,
    pub quantity: i64,
    /// Unit price at drop time.
    pub price_each: i64,
}

impl LootedItem {
    /// Combined value of this stack (price × quantity).
    pub fn stack_value(&self) -> i64 {
        self.price_each.saturating_mul(self.quantity)
    }
}

/// Kind-specific payload of a canonical event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    /// One or more items dropped for the player.
    Loot { items: Vec<LootedItem> },
    /// The player received a pet.
    Pet { pet_name: String },
    /// A timed run was completed at a location.
    Speedrun { location: String, time_seconds: f64 },
    /// Session end; experience totals must be fetched from the stats
    /// provider, the event itself carries nothing.
    ExperienceLogout,
    /// Barbarian Assault gamble tally. The count is the player's
    /// cumulative lifetime total, not a delta.
    BaGamble { gamble_count: i64 },
    /// A non-player-originated chat line observed in the client.
    Chat {
        source: String,
        #[serde(default)]
        message_type: Option<String>,
        message: String,
    },
}

impl EventPayload {
    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Loot { .. } => "loot",
            Self::Pet { .. } => "pet",
            Self::Speedrun { .. } => "speedrun",
            Self::ExperienceLogout => "experience_logout",
            Self::BaGamble { .. } => "ba_gamble",
            Self::Chat { .. } => "chat",
        }
    }
}

/// A single piece of gameplay telemetry in provider-agnostic form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEvent {
    #[serde(default)]
    pub event_id: EventId,
    #[serde(default)]
    pub player_account_id: Option<AccountId>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl CanonicalEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            event_id: EventId::new(),
            player_account_id: None,
            player_name: None,
            received_at: Utc::now(),
            payload,
        }
    }

    pub fn with_player(mut self, account_id: AccountId, name: impl Into<String>) -> Self {
        self.player_account_id = Some(account_id);
        self.player_name = Some(name.into());
        self
    }
}
