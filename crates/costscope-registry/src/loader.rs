use std::collections::BTreeMap;
use std::path::Path;

use costscope_models::building::{BuildingTypeConfig, RegionalTable};
use costscope_models::dealshield::{ContentProfile, DecisionPolicy, TileProfile};
use costscope_models::scope::ScopeItemProfile;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegistryError;
use crate::registry::Registry;

/// Registry-wide settings (`settings.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrySettings {
    /// Asset classes for which cap-rate valuation is computed.
    pub valuation_supported: Vec<String>,
    pub mixed_use: QualitativeMix,
}

/// Percentages assigned to the dominant component for qualitative hints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualitativeMix {
    /// "mostly residential"
    pub mostly: Decimal,
    /// "office-heavy"
    pub heavy: Decimal,
}

#[derive(Debug, Default, Deserialize)]
struct ScopeDocument {
    #[serde(default)]
    profiles: Vec<ScopeItemProfile>,
}

#[derive(Debug, Default, Deserialize)]
struct DealShieldDocument {
    #[serde(default)]
    tile_profiles: Vec<TileProfile>,
    #[serde(default)]
    content_profiles: Vec<ContentProfile>,
    #[serde(default)]
    decision_policies: Vec<DecisionPolicy>,
}

/// Documents compiled into the binary, keyed by their path under `data/`.
pub const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("settings.toml", include_str!("../data/settings.toml")),
    ("regions.toml", include_str!("../data/regions.toml")),
    (
        "buildings/office.toml",
        include_str!("../data/buildings/office.toml"),
    ),
    (
        "buildings/multifamily.toml",
        include_str!("../data/buildings/multifamily.toml"),
    ),
    (
        "buildings/mixed_use.toml",
        include_str!("../data/buildings/mixed_use.toml"),
    ),
    (
        "buildings/restaurant.toml",
        include_str!("../data/buildings/restaurant.toml"),
    ),
    (
        "buildings/industrial.toml",
        include_str!("../data/buildings/industrial.toml"),
    ),
    ("scope/profiles.toml", include_str!("../data/scope/profiles.toml")),
    (
        "dealshield/office.toml",
        include_str!("../data/dealshield/office.toml"),
    ),
    (
        "dealshield/multifamily.toml",
        include_str!("../data/dealshield/multifamily.toml"),
    ),
    (
        "dealshield/mixed_use.toml",
        include_str!("../data/dealshield/mixed_use.toml"),
    ),
    (
        "dealshield/restaurant.toml",
        include_str!("../data/dealshield/restaurant.toml"),
    ),
    (
        "dealshield/industrial.toml",
        include_str!("../data/dealshield/industrial.toml"),
    ),
];

fn parse<T: DeserializeOwned>(path: &str, contents: &str) -> Result<T, RegistryError> {
    toml::from_str(contents).map_err(|source| RegistryError::Toml {
        path: path.to_string(),
        source,
    })
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    kind: &'static str,
    id: String,
    value: T,
) -> Result<(), RegistryError> {
    if map.contains_key(&id) {
        return Err(RegistryError::Duplicate { kind, id });
    }
    map.insert(id, value);
    Ok(())
}

/// Assemble a registry from `(relative path, contents)` pairs.
///
/// Paths are classified by name: `settings.toml`, `regions.toml`, and files
/// under `buildings/`, `scope/` and `dealshield/`.
pub fn load_sources<'a, I>(sources: I) -> Result<Registry, RegistryError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut settings: Option<RegistrySettings> = None;
    let mut regions = RegionalTable::default();
    let mut building_types = BTreeMap::new();
    let mut scope_profiles = BTreeMap::new();
    let mut tile_profiles = BTreeMap::new();
    let mut content_profiles = BTreeMap::new();
    let mut decision_policies = BTreeMap::new();

    for (path, contents) in sources {
        let normalized = path.replace('\\', "/");
        debug!(path = %normalized, "Loading registry document");

        if normalized == "settings.toml" {
            settings = Some(parse(&normalized, contents)?);
        } else if normalized == "regions.toml" {
            regions = parse(&normalized, contents)?;
        } else if normalized.starts_with("buildings/") {
            let config: BuildingTypeConfig = parse(&normalized, contents)?;
            let id = config.building_type.to_ascii_lowercase();
            insert_unique(&mut building_types, "building type", id, config)?;
        } else if normalized.starts_with("scope/") {
            let doc: ScopeDocument = parse(&normalized, contents)?;
            for profile in doc.profiles {
                insert_unique(&mut scope_profiles, "scope profile", profile.id.clone(), profile)?;
            }
        } else if normalized.starts_with("dealshield/") {
            let doc: DealShieldDocument = parse(&normalized, contents)?;
            for profile in doc.tile_profiles {
                insert_unique(&mut tile_profiles, "tile profile", profile.id.clone(), profile)?;
            }
            for content in doc.content_profiles {
                insert_unique(
                    &mut content_profiles,
                    "content profile",
                    content.id.clone(),
                    content,
                )?;
            }
            for policy in doc.decision_policies {
                insert_unique(
                    &mut decision_policies,
                    "decision policy",
                    policy.id.clone(),
                    policy,
                )?;
            }
        } else {
            return Err(RegistryError::UnknownDocument(normalized));
        }
    }

    let settings = settings.ok_or_else(|| {
        RegistryError::UnknownDocument("settings.toml is required".to_string())
    })?;

    Ok(Registry::assemble(
        settings,
        regions,
        building_types,
        scope_profiles,
        tile_profiles,
        content_profiles,
        decision_policies,
    ))
}

/// Read every `.toml` document under `root` using the builtin layout.
pub fn read_dir_sources(root: &Path) -> Result<Vec<(String, String)>, RegistryError> {
    let mut sources = Vec::new();

    for name in ["settings.toml", "regions.toml"] {
        let path = root.join(name);
        if path.is_file() {
            sources.push((name.to_string(), std::fs::read_to_string(&path)?));
        }
    }

    for sub in ["buildings", "scope", "dealshield"] {
        let dir = root.join(sub);
        if !dir.is_dir() {
            continue;
        }
        let mut files: Vec<_> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();
        for file in files {
            let name = match file.file_name().and_then(|n| n.to_str()) {
                Some(name) => format!("{sub}/{name}"),
                None => continue,
            };
            sources.push((name, std::fs::read_to_string(&file)?));
        }
    }

    Ok(sources)
}
