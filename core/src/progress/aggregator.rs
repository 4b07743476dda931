//! Tile progress aggregation
//!
//! Owns the single TileProgress row per board tile. Events from many
//! players merge into that one row through an optimistic-retry loop:
//! load the row with its version, run the calculators, and save with
//! compare-and-swap. A version conflict means another contribution
//! landed first, so reload and reapply. Updates to different tiles never
//! contend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use tracing::{debug, info, warn};

use bingo_types::{BoardTileId, CanonicalEvent, EventPayload, Requirement, RequirementSpec};

use crate::board::{BoardTile, LineCompletion, LineDetector};
use crate::effects::{EffectSource, EffectsEngine};
use crate::error::EngineError;
use crate::stats::SnapshotClient;
use crate::store::{Store, StoreError, VersionedProgress};

use super::calculator::apply_requirement;
use super::record::{CompletionType, ProgressMetadata, TileProgress};

/// Bounded CAS retries before the event is surfaced as a retryable
/// per-event failure.
pub const MAX_CAS_RETRIES: u32 = 5;

/// What one event did to one tile.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub changed: bool,
    pub newly_completed: bool,
    pub completed_lines: Vec<LineCompletion>,
}

#[derive(Clone)]
pub struct TileAggregator {
    store: Arc<dyn Store>,
    stats: SnapshotClient,
    effects: EffectsEngine,
    detector: LineDetector,
}

impl TileAggregator {
    pub fn new(
        store: Arc<dyn Store>,
        stats: SnapshotClient,
        effects: EffectsEngine,
        detector: LineDetector,
    ) -> Self {
        Self {
            store,
            stats,
            effects,
            detector,
        }
    }

    /// Apply one qualifying event to one tile.
    ///
    /// Atomic per event: either the merged progress row is saved in full
    /// or nothing is written. Duplicate deliveries of the same event id
    /// are dropped without double-counting.
    pub async fn apply_event(
        &self,
        tile_id: BoardTileId,
        event: &CanonicalEvent,
    ) -> Result<ApplyOutcome, EngineError> {
        let tile = self.store.tile(tile_id)?;
        if tile.is_completed {
            return Ok(ApplyOutcome::default());
        }
        let spec = &tile.definition.spec;

        // The one external call, isolated up front so the CAS loop below
        // stays pure read-modify-write.
        let snapshots = self.fetch_snapshots(event, spec).await?;

        let mut attempt = 0;
        let (progress, newly_completed, changed) = loop {
            let VersionedProgress {
                mut progress,
                version,
            } = self
                .store
                .load_progress(tile_id)
                .unwrap_or(VersionedProgress {
                    progress: TileProgress::new(tile_id),
                    version: 0,
                });

            if progress.is_completed() {
                return Ok(ApplyOutcome::default());
            }
            if progress.metadata.applied_events.contains(&event.event_id) {
                debug!(%tile_id, event = %event.event_id, "duplicate event delivery dropped");
                return Ok(ApplyOutcome::default());
            }

            let (changed, contribution) = run_calculators(event, spec, &mut progress, &snapshots);
            if !changed {
                return Ok(ApplyOutcome::default());
            }

            progress.metadata.applied_events.insert(event.event_id);
            if let Some(account) = event.player_account_id
                && contribution > 0.0
            {
                *progress.metadata.contributions.entry(account).or_insert(0.0) += contribution;
            }
            progress.refresh_value(spec);

            let newly_completed = progress.satisfies(spec);
            if newly_completed {
                decide_completion(&mut progress, spec, event.received_at);
            }

            match self.store.save_progress(progress.clone(), version) {
                Ok(()) => break (progress, newly_completed, changed),
                Err(StoreError::ProgressVersionConflict(_)) => {
                    attempt += 1;
                    if attempt >= MAX_CAS_RETRIES {
                        warn!(%tile_id, "progress CAS retry budget exhausted");
                        return Err(EngineError::RetriesExhausted(tile_id));
                    }
                }
                Err(other) => return Err(other.into()),
            }
        };

        let mut outcome = ApplyOutcome {
            changed,
            newly_completed,
            completed_lines: Vec::new(),
        };
        if newly_completed {
            outcome.completed_lines = self
                .finish_tile(&tile, progress.completed_at.unwrap_or(event.received_at))?;
        }
        Ok(outcome)
    }

    /// Admin override: complete a tile without a qualifying event.
    pub fn complete_manually(
        &self,
        tile_id: BoardTileId,
        now: DateTime<Utc>,
    ) -> Result<ApplyOutcome, EngineError> {
        let tile = self.store.tile(tile_id)?;
        if tile.is_completed {
            return Ok(ApplyOutcome::default());
        }

        let mut attempt = 0;
        loop {
            let VersionedProgress {
                mut progress,
                version,
            } = self
                .store
                .load_progress(tile_id)
                .unwrap_or(VersionedProgress {
                    progress: TileProgress::new(tile_id),
                    version: 0,
                });
            if progress.is_completed() {
                return Ok(ApplyOutcome::default());
            }
            progress.completion_type = Some(CompletionType::Admin);
            progress.completed_at = Some(now);

            match self.store.save_progress(progress, version) {
                Ok(()) => break,
                Err(StoreError::ProgressVersionConflict(_)) => {
                    attempt += 1;
                    if attempt >= MAX_CAS_RETRIES {
                        return Err(EngineError::RetriesExhausted(tile_id));
                    }
                }
                Err(other) => return Err(other.into()),
            }
        }

        let completed_lines = self.finish_tile(&tile, now)?;
        Ok(ApplyOutcome {
            changed: true,
            newly_completed: true,
            completed_lines,
        })
    }

    /// Flip the board tile's completion flag, grant any tile-completion
    /// effect, and run line detection.
    fn finish_tile(
        &self,
        tile: &BoardTile,
        at: DateTime<Utc>,
    ) -> Result<Vec<LineCompletion>, EngineError> {
        let board = self.store.board(tile.board_id)?;
        // Monotonic flip; false means a concurrent completion got there
        // first and already ran detection.
        if !self.store.complete_tile(tile.id, board.team_id, at)? {
            return Ok(Vec::new());
        }
        info!(tile = %tile.id, board = %board.id, "tile completed");

        if let Some(definition_id) = &tile.definition.completion_effect {
            self.effects.grant(
                board.team_id,
                definition_id,
                EffectSource::TileCompletion,
                tile.id.0,
                at,
            )?;
        }

        let completed = self.store.tile(tile.id)?;
        self.detector.check_tile(&completed, at)
    }

    /// Fetch the experience snapshots the spec needs for this event, one
    /// per distinct skill. Non-experience specs and non-logout events
    /// need nothing.
    async fn fetch_snapshots(
        &self,
        event: &CanonicalEvent,
        spec: &RequirementSpec,
    ) -> Result<HashMap<Option<String>, i64>, EngineError> {
        let mut snapshots = HashMap::new();
        if !matches!(event.payload, EventPayload::ExperienceLogout) {
            return Ok(snapshots);
        }
        let Some(player) = event.player_name.as_deref() else {
            return Ok(snapshots);
        };

        for requirement in spec
            .requirements
            .iter()
            .chain(spec.tiers.iter().map(|tier| &tier.requirement))
        {
            let Requirement::Experience { skill, .. } = requirement.effective() else {
                continue;
            };
            let key = skill.as_ref().map(|s| s.to_ascii_lowercase());
            if snapshots.contains_key(&key) {
                continue;
            }
            let xp = self.stats.fetch(player, skill.as_deref()).await?;
            snapshots.insert(key, xp);
        }
        Ok(snapshots)
    }
}

/// Run the calculators over every base requirement index and every tier.
/// Returns (anything changed, qualifying contribution added).
fn run_calculators(
    event: &CanonicalEvent,
    spec: &RequirementSpec,
    progress: &mut TileProgress,
    snapshots: &HashMap<Option<String>, i64>,
) -> (bool, f64) {
    let mut changed = false;
    let mut contribution = 0.0;

    for (index, requirement) in spec.requirements.iter().enumerate() {
        let slot = progress.metadata.requirements.entry(index).or_default();
        let outcome = apply_requirement(event, requirement, slot, snapshot_for(requirement, snapshots));
        changed |= outcome.changed;
        contribution += outcome.contribution;
    }

    for tier in &spec.tiers {
        let slot = progress.metadata.tiers.entry(tier.tier).or_default();
        let outcome = apply_requirement(
            event,
            &tier.requirement,
            slot,
            snapshot_for(&tier.requirement, snapshots),
        );
        changed |= outcome.changed;
        contribution += outcome.contribution;
        if outcome.satisfied && progress.metadata.completed_tiers.insert(tier.tier) {
            changed = true;
        }
    }

    (changed, contribution)
}

fn snapshot_for(
    requirement: &Requirement,
    snapshots: &HashMap<Option<String>, i64>,
) -> Option<i64> {
    let Requirement::Experience { skill, .. } = requirement.effective() else {
        return None;
    };
    snapshots
        .get(&skill.as_ref().map(|s| s.to_ascii_lowercase()))
        .copied()
}

/// Fill in completion type and attribution on the row that crossed the
/// finish line.
fn decide_completion(progress: &mut TileProgress, spec: &RequirementSpec, at: DateTime<Utc>) {
    let tier_decided = spec.is_tiered() && {
        // Was it the tier track that satisfied the spec?
        let base_only = TileProgress {
            metadata: ProgressMetadata {
                completed_tiers: Default::default(),
                ..progress.metadata.clone()
            },
            ..progress.clone()
        };
        !base_only.satisfies(spec)
    };

    let contributors = progress.contributors();
    progress.completion_type = Some(if tier_decided {
        CompletionType::Tiered
    } else if contributors.len() == 1 {
        CompletionType::Solo
    } else {
        CompletionType::Team
    });
    // Solo credit only when one account supplied everything.
    if contributors.len() == 1 && !tier_decided {
        progress.completed_by = Some(contributors[0]);
    }
    progress.completed_at = Some(at);
}
