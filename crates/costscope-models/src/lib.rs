pub mod building;
pub mod config;
pub mod dealshield;
pub mod metric;
pub mod mixed_use;
pub mod request;
pub mod result;
pub mod scope;

pub use building::{
    BuildingConfig, BuildingTypeConfig, ComponentProfile, CostClamp, ExpenseBasis,
    FeaturePricing, FinancialMetrics, FinancingTerms, FinishMultipliers, MixedUseProfile,
    OperatingExpense, OwnershipFinancing, ProjectClassMultipliers, RegionalFactor,
    RegionalTable, SoftCostLine, SpecialFeature, Trade, TradeShares, UnitRule,
};
pub use config::{CostscopeConfig, EngineConfig, RegistryConfig, StoreConfig};
pub use dealshield::{
    ContentProfile, DecisionInsuranceProvenance, DecisionPolicy, DerivedRow, Direction,
    ScenarioTable, Tile, TileProfile, Transform, TransformOp,
};
pub use metric::{Driver, MetricLookup, MetricSource};
pub use mixed_use::{Component, InvalidMix, InvalidMixReason, MixSource, MixedUseSplit};
pub use request::{FinishLevel, OwnershipType, ProjectClass, ProjectRequest, RequestOverrides};
pub use result::{
    CalculationResult, ConfigSource, ConstructionCosts, DealShieldScenarios, KeyMetrics,
    OwnershipAnalysis, ReturnMetrics, RevenueAnalysis, ScenarioSnapshot, TraceEntry,
    TraceLevel, TradeBreakdown,
};
pub use scope::{QuantityRule, ScopeItemProfile, ScopeItemSpec, ScopeSystem, TradeScope};
