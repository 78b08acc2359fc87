use std::collections::BTreeMap;
use std::path::Path;

use costscope_models::building::{BuildingConfig, BuildingTypeConfig, RegionalTable};
use costscope_models::dealshield::{ContentProfile, DecisionPolicy, TileProfile};
use costscope_models::result::ConfigSource;
use costscope_models::scope::ScopeItemProfile;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::loader::{load_sources, read_dir_sources, RegistrySettings, BUILTIN_SOURCES};
use crate::validate::{validate_registry, IntegrityViolation};

/// Immutable, process-wide map from (building type, subtype) to configuration.
///
/// Built once and shared behind an `Arc`. Reloading means building a new
/// registry and swapping the handle; nothing here is ever mutated in place.
#[derive(Debug, Clone)]
pub struct Registry {
    settings: RegistrySettings,
    regions: RegionalTable,
    building_types: BTreeMap<String, BuildingTypeConfig>,
    scope_profiles: BTreeMap<String, ScopeItemProfile>,
    tile_profiles: BTreeMap<String, TileProfile>,
    content_profiles: BTreeMap<String, ContentProfile>,
    decision_policies: BTreeMap<String, DecisionPolicy>,
}

/// A configuration together with the building type it belongs to and how it
/// was found.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedConfig<'a> {
    pub building_type: &'a BuildingTypeConfig,
    pub subtype: &'a str,
    pub config: &'a BuildingConfig,
    pub source: ConfigSource,
}

impl Registry {
    pub(crate) fn assemble(
        settings: RegistrySettings,
        regions: RegionalTable,
        building_types: BTreeMap<String, BuildingTypeConfig>,
        scope_profiles: BTreeMap<String, ScopeItemProfile>,
        tile_profiles: BTreeMap<String, TileProfile>,
        content_profiles: BTreeMap<String, ContentProfile>,
        decision_policies: BTreeMap<String, DecisionPolicy>,
    ) -> Self {
        Self {
            settings,
            regions,
            building_types,
            scope_profiles,
            tile_profiles,
            content_profiles,
            decision_policies,
        }
    }

    /// The registry compiled into the binary.
    pub fn builtin() -> Result<Self, RegistryError> {
        load_sources(BUILTIN_SOURCES.iter().copied())
    }

    /// Load a registry laid out like the builtin `data/` directory.
    /// Integrity violations are logged, not fatal.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let root = root.as_ref();
        let sources = read_dir_sources(root)?;
        let registry = load_sources(sources.iter().map(|(p, c)| (p.as_str(), c.as_str())))?;

        let violations = registry.validate();
        for v in &violations {
            warn!(scope = %v.scope, reason = %v.reason, "Registry integrity violation");
        }
        info!(
            path = %root.display(),
            building_types = registry.building_types.len(),
            violations = violations.len(),
            "Registry loaded"
        );
        Ok(registry)
    }

    /// Reject the registry if the integrity pass reports anything.
    pub fn into_strict(self) -> Result<Self, RegistryError> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(self)
        } else {
            Err(RegistryError::Integrity(violations))
        }
    }

    /// Load from `dir` when given, otherwise the builtin registry.
    pub fn load(dir: Option<&str>, strict: bool) -> Result<Self, RegistryError> {
        let registry = match dir {
            Some(dir) => Self::from_dir(dir)?,
            None => Self::builtin()?,
        };
        if strict {
            registry.into_strict()
        } else {
            Ok(registry)
        }
    }

    /// Resolve a configuration: exact subtype first, then the building type's
    /// declared baseline. Never "first subtype found".
    pub fn get_config(
        &self,
        building_type: &str,
        subtype: Option<&str>,
    ) -> Result<ResolvedConfig<'_>, RegistryError> {
        let not_found = || RegistryError::ConfigNotFound {
            building_type: building_type.to_string(),
            subtype: subtype.map(str::to_string),
        };

        let type_key = building_type.trim().to_ascii_lowercase();
        let bt = self.building_types.get(&type_key).ok_or_else(not_found)?;

        if let Some(requested) = subtype {
            let key = requested.trim().to_ascii_lowercase();
            if let Some((name, config)) = bt.subtypes.get_key_value(&key) {
                return Ok(ResolvedConfig {
                    building_type: bt,
                    subtype: name.as_str(),
                    config,
                    source: ConfigSource::Subtype,
                });
            }
        }

        let (name, config) = bt
            .subtypes
            .get_key_value(&bt.baseline_subtype)
            .ok_or_else(not_found)?;
        Ok(ResolvedConfig {
            building_type: bt,
            subtype: name.as_str(),
            config,
            source: ConfigSource::BuildingTypeBaseline,
        })
    }

    pub fn validate(&self) -> Vec<IntegrityViolation> {
        validate_registry(self)
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Registry-wide regional defaults, consulted after the building type's table.
    pub fn regions(&self) -> &RegionalTable {
        &self.regions
    }

    pub fn building_type(&self, building_type: &str) -> Option<&BuildingTypeConfig> {
        self.building_types
            .get(&building_type.trim().to_ascii_lowercase())
    }

    pub fn building_types(&self) -> impl Iterator<Item = &BuildingTypeConfig> {
        self.building_types.values()
    }

    pub fn scope_profile(&self, id: &str) -> Option<&ScopeItemProfile> {
        self.scope_profiles.get(id)
    }

    pub fn scope_profiles(&self) -> impl Iterator<Item = &ScopeItemProfile> {
        self.scope_profiles.values()
    }

    pub fn tile_profile(&self, id: &str) -> Option<&TileProfile> {
        self.tile_profiles.get(id)
    }

    pub fn tile_profiles(&self) -> impl Iterator<Item = &TileProfile> {
        self.tile_profiles.values()
    }

    pub fn content_profiles(&self) -> impl Iterator<Item = &ContentProfile> {
        self.content_profiles.values()
    }

    pub fn decision_policies(&self) -> impl Iterator<Item = &DecisionPolicy> {
        self.decision_policies.values()
    }

    /// The content profile bound to a tile profile, if any.
    pub fn content_for(&self, tile_profile_id: &str) -> Option<&ContentProfile> {
        self.content_profiles
            .values()
            .find(|c| c.tile_profile_id == tile_profile_id)
    }

    /// The decision policy bound to a tile profile, if any.
    pub fn policy_for(&self, tile_profile_id: &str) -> Option<&DecisionPolicy> {
        self.decision_policies
            .values()
            .find(|p| p.tile_profile_id == tile_profile_id)
    }

    pub fn valuation_supported(&self, asset_class: &str) -> bool {
        self.settings
            .valuation_supported
            .iter()
            .any(|c| c.eq_ignore_ascii_case(asset_class))
    }
}
