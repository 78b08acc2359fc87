pub mod allocator;
pub mod costs;
pub mod dealshield;
pub mod decision_insurance;
pub mod engine;
pub mod error;
pub mod financials;
pub mod mixed_use;
pub mod money;
pub mod parser;
pub mod regional;
pub mod scenarios;
pub mod trace;
pub mod trades;

pub mod test_support;

pub use dealshield::{build_scenario_table, ProfileBindings};
pub use engine::{Engine, MAX_SQUARE_FOOTAGE};
pub use error::EngineError;
