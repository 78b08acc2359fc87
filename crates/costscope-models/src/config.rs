use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level configuration for costscope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CostscopeConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: Option<StoreConfig>,
}

/// Where building configurations are loaded from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// Directory with `settings.toml`, `regions.toml`, `buildings/`, `scope/`
    /// and `dealshield/`. None uses the registry compiled into the binary.
    #[serde(default)]
    pub dir: Option<String>,
    /// Refuse to start when the integrity pass reports any violation.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Emit DealShield scenario snapshots for subtypes bound to a tile profile.
    #[serde(default = "default_true")]
    pub dealshield: bool,
    /// Tolerance when reconciling scope items and trades against their totals.
    #[serde(default = "default_epsilon")]
    pub reconciliation_epsilon: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dealshield: true,
            reconciliation_epsilon: default_epsilon(),
        }
    }
}

/// Configuration for the result store collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    pub sqlite_path: String,
    /// Maximum number of results kept in the in-memory hot cache.
    #[serde(default = "default_memory_capacity")]
    pub memory_max_capacity: u64,
}

fn default_true() -> bool {
    true
}

fn default_epsilon() -> Decimal {
    Decimal::new(1, 2)
}

fn default_memory_capacity() -> u64 {
    1_000
}
