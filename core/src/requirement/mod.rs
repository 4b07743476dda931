//! Requirement matching
//!
//! Pure predicates that decide whether a canonical event satisfies a
//! requirement specification. Matching is total: every (event kind,
//! requirement kind) combination returns a boolean, never an error, so
//! new requirement kinds can ship without breaking older tiles.
//!
//! Two predicates with different strictness: `matches_*` answers "does
//! this event satisfy the requirement outright", while `relevant_to_spec`
//! answers the routing question "could this event progress the spec":
//! cumulative kinds accept partial contributions there. Per-requirement
//! completion bookkeeping is the aggregator's job.

mod matcher;


pub use matcher::{ALLOWED_CHAT_SOURCES, matches_requirement, matches_spec, relevant_to_spec};

use bingo_types::{Requirement, RequirementSpec};

/// Validate a requirement spec for catalog use.
///
/// Rejects specs with nothing to satisfy and puzzles nested inside
/// puzzles (the matcher treats those as never-matching, but they should
/// not enter a catalog in the first place).
pub fn validate_spec(spec: &RequirementSpec) -> Result<(), String> {
    if spec.requirements.is_empty() && spec.tiers.is_empty() {
        return Err("spec has no requirements and no tiers".into());
    }
    for requirement in spec
        .requirements
        .iter()
        .chain(spec.tiers.iter().map(|t| &t.requirement))
    {
        if let Requirement::Puzzle { hidden, .. } = requirement
            && hidden.is_puzzle()
        {
            return Err("puzzle requirements cannot nest another puzzle".into());
        }
    }
    Ok(())
}
