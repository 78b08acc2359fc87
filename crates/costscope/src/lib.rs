//! costscope - construction cost estimation with DealShield scenario tables.
//!
//! Wires the registry, the calculation engine and the optional result store
//! together from a single [`CostscopeConfig`].
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use costscope::models::config::CostscopeConfig;
//! use costscope::models::request::ProjectRequest;
//!
//! # fn run(request: ProjectRequest) -> anyhow::Result<()> {
//! let config = CostscopeConfig::default();
//! let engine = costscope::build_engine(&config)?;
//! let calculation = costscope::calculate(&engine, None, None, &request)?;
//! let table = engine.scenario_table(&calculation.request_id, &calculation.result)?;
//! # Ok(())
//! # }
//! ```

pub use costscope_engine as engine;
pub use costscope_models as models;
pub use costscope_registry as registry;
pub use costscope_store as store;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use costscope_engine::{Engine, EngineError};
use costscope_models::config::CostscopeConfig;
use costscope_models::request::ProjectRequest;
use costscope_registry::Registry;
use costscope_store::{CachedStore, ResultStore, StoreError, StoredResult};
use tracing::{info, warn};

/// Read a TOML configuration file. `None` yields the built-in defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<CostscopeConfig> {
    let Some(path) = path else {
        return Ok(CostscopeConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Build an Engine from configuration.
pub fn build_engine(config: &CostscopeConfig) -> anyhow::Result<Engine> {
    let registry = Registry::load(config.registry.dir.as_deref(), config.registry.strict)
        .context("Failed to load building registry")?;
    info!(
        building_types = registry.building_types().count(),
        strict = config.registry.strict,
        "Registry ready"
    );
    Ok(Engine::new(Arc::new(registry), config.engine.clone()))
}

/// Open the result store when one is configured.
pub fn build_store(config: &CostscopeConfig) -> Result<Option<CachedStore>, StoreError> {
    config.store.as_ref().map(CachedStore::open).transpose()
}

pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Calculate a request and persist the result when a store is given.
///
/// A store failure is logged and does not discard the calculation.
pub fn calculate(
    engine: &Engine,
    store: Option<&dyn ResultStore>,
    request_id: Option<String>,
    request: &ProjectRequest,
) -> Result<StoredResult, EngineError> {
    let request_id = request_id.unwrap_or_else(new_request_id);
    let result = engine.calculate(request)?;
    let record = StoredResult::new(request_id, result);

    if let Some(store) = store {
        if let Err(e) = store.put(&record) {
            warn!(request_id = %record.request_id, error = %e, "Failed to store result");
        }
    }

    Ok(record)
}

/// Whether an error chain bottoms out in a caller-input problem.
pub fn is_client_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<EngineError>()
            .is_some_and(EngineError::is_client_error)
    })
}
