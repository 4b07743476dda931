//! External player-statistics seam
//!
//! Experience requirements need a snapshot of a player's experience
//! totals from an external provider. That call is the only place the
//! engine touches the network, so it is isolated behind a trait and a
//! timeout: a slow or failing provider degrades exactly one tile's
//! progress for one event, nothing else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// Errors from the external statistics provider.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("stats lookup for '{player}' timed out after {timeout_ms}ms")]
    Timeout { player: String, timeout_ms: u64 },

    #[error("stats provider has no data for '{player}'")]
    UnknownPlayer { player: String },

    #[error("stats provider failure: {reason}")]
    Provider { reason: String },
}

/// A source of player experience snapshots.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Current experience total for a player. `skill` of None means
    /// overall experience.
    async fn experience(&self, player: &str, skill: Option<&str>) -> Result<i64, StatsError>;
}

/// Timeout wrapper around a provider.
#[derive(Clone)]
pub struct SnapshotClient {
    provider: Arc<dyn StatsProvider>,
    timeout: Duration,
}

impl SnapshotClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(provider: Arc<dyn StatsProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn with_default_timeout(provider: Arc<dyn StatsProvider>) -> Self {
        Self::new(provider, Self::DEFAULT_TIMEOUT)
    }

    pub async fn fetch(&self, player: &str, skill: Option<&str>) -> Result<i64, StatsError> {
        tokio::time::timeout(self.timeout, self.provider.experience(player, skill))
            .await
            .map_err(|_| StatsError::Timeout {
                player: player.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
    }
}

/// In-memory provider for tests and the worker binary. Values are keyed
/// by (player, skill) with a per-player overall total.
#[derive(Debug, Default)]
pub struct StaticStats {
    totals: DashMap<(String, Option<String>), i64>,
}

impl StaticStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, player: &str, skill: Option<&str>, xp: i64) {
        self.totals.insert(
            (player.to_ascii_lowercase(), skill.map(|s| s.to_ascii_lowercase())),
            xp,
        );
    }
}

#[async_trait]
impl StatsProvider for StaticStats {
    async fn experience(&self, player: &str, skill: Option<&str>) -> Result<i64, StatsError> {
        let key = (
            player.to_ascii_lowercase(),
            skill.map(|s| s.to_ascii_lowercase()),
        );
        self.totals
            .get(&key)
            .map(|xp| *xp)
            .ok_or_else(|| StatsError::UnknownPlayer {
                player: player.to_string(),
            })
    }
}
