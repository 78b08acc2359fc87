use costscope_registry::RegistryError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Scope profile not registered: {0}")]
    ScopeProfileNotFound(String),

    #[error("Tile profile not registered: {0}")]
    TileProfileNotFound(String),

    #[error("Cannot resolve metric {metric_ref} for tile {tile_id}: {reason}")]
    MetricResolution {
        tile_id: String,
        metric_ref: String,
        reason: String,
    },

    #[error("Scope items for {trade} sum to {items}, expected {expected}")]
    Reconciliation {
        trade: String,
        items: Decimal,
        expected: Decimal,
    },
}

impl EngineError {
    /// Whether the failure was caused by the caller's input rather than by
    /// configuration or an internal invariant.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidRequest(_)
                | EngineError::Registry(RegistryError::ConfigNotFound { .. })
        )
    }
}
