//! Effect definition catalogs
//!
//! Definitions are reference data loaded from TOML files, one catalog
//! file per directory entry with `[[effect]]` tables:
//!
//! ```toml
//! [[effect]]
//! id = "shield"
//! name = "Shield"
//! category = "reactive"
//! trigger = "reactive"
//! config = { type = "shield", charges = 1 }
//! expires_in_secs = 86400
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::Deserialize;
use thiserror::Error;

use bingo_types::{EffectConfig, EffectDefinition, TriggerMode};

/// Errors during effect catalog loading
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML in {path}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid effect definition '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("unknown effect definition '{0}'")]
    UnknownDefinition(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "effect")]
    effects: Vec<EffectDefinition>,
}

/// Combined set of effect definitions
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    /// All effect definitions, keyed by catalog id
    effects: HashMap<String, EffectDefinition>,
}

impl DefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add definitions. If `overwrite` is true, replaces existing
    /// definitions with the same id. Returns ids of duplicates
    /// (skipped if !overwrite, replaced if overwrite).
    pub fn add_definitions(
        &mut self,
        definitions: Vec<EffectDefinition>,
        overwrite: bool,
    ) -> Vec<String> {
        let mut duplicates = Vec::new();
        for definition in definitions {
            if self.effects.contains_key(&definition.id) {
                duplicates.push(definition.id.clone());
                if !overwrite {
                    continue;
                }
            }
            self.effects.insert(definition.id.clone(), definition);
        }
        duplicates
    }

    pub fn get(&self, id: &str) -> Option<&EffectDefinition> {
        self.effects.get(id)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectDefinition> {
        self.effects.values()
    }
}

/// Validate one definition before it enters a catalog.
pub fn validate_definition(definition: &EffectDefinition) -> Result<(), CatalogError> {
    let invalid = |reason: &str| CatalogError::InvalidDefinition {
        id: definition.id.clone(),
        reason: reason.to_string(),
    };

    if definition.id.trim().is_empty() {
        return Err(invalid("id must not be empty"));
    }
    if definition.uses == 0 {
        return Err(invalid("uses must be at least 1"));
    }
    if definition.config.is_reactive() && definition.trigger != TriggerMode::Reactive {
        return Err(invalid("shield/reflect/immunity configs require a reactive trigger"));
    }
    if !definition.config.is_reactive() && definition.trigger == TriggerMode::Reactive {
        return Err(invalid("reactive trigger requires a shield/reflect/immunity config"));
    }
    if let EffectConfig::Shield { charges } = definition.config
        && charges == 0
    {
        return Err(invalid("shield must have at least one charge"));
    }
    Ok(())
}

/// Load every `.toml` catalog file in a directory into one set.
pub fn load_effects_from_dir(dir: &Path) -> Result<DefinitionSet, CatalogError> {
    let mut set = DefinitionSet::new();
    if !dir.exists() {
        return Ok(set);
    }

    let entries = fs::read_dir(dir).map_err(|source| CatalogError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        let definitions = load_effects_from_file(&path)?;
        let duplicates = set.add_definitions(definitions, false);
        for id in duplicates {
            tracing::warn!(
                file = %path.display(),
                id,
                "duplicate effect definition skipped"
            );
        }
    }
    Ok(set)
}

/// Load effect definitions from a single TOML file.
pub fn load_effects_from_file(path: &Path) -> Result<Vec<EffectDefinition>, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let file: CatalogFile = toml::from_str(&content).map_err(|source| CatalogError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;

    for definition in &file.effects {
        validate_definition(definition)?;
    }
    Ok(file.effects)
}
