//! Builders for requests and engines used across the engine's tests and by
//! downstream crates' tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use costscope_models::config::EngineConfig;
use costscope_models::request::{OwnershipType, ProjectClass, ProjectRequest, RequestOverrides};
use costscope_registry::Registry;
use rust_decimal::Decimal;

use crate::engine::Engine;
use crate::error::EngineError;

/// An engine over the builtin registry with default settings.
pub fn builtin_engine() -> Result<Engine, EngineError> {
    let registry = Registry::builtin()?;
    Ok(Engine::new(Arc::new(registry), EngineConfig::default()))
}

pub fn request(
    building_type: &str,
    subtype: Option<&str>,
    square_footage: Decimal,
    location: &str,
) -> ProjectRequest {
    ProjectRequest {
        building_type: building_type.to_string(),
        subtype: subtype.map(str::to_string),
        square_footage,
        location: location.to_string(),
        project_class: ProjectClass::GroundUp,
        floors: 1,
        ownership_type: OwnershipType::ForProfit,
        finish_level: None,
        special_features: Vec::new(),
        overrides: None,
    }
}

/// 85,000 SF Class A office in Nashville, ground-up, for-profit.
pub fn nashville_office() -> ProjectRequest {
    ProjectRequest {
        floors: 6,
        ..request("office", Some("class_a"), Decimal::from(85_000), "Nashville, TN")
    }
}

pub fn mixed_use_with_split(split: &[(&str, Decimal)]) -> ProjectRequest {
    ProjectRequest {
        overrides: Some(RequestOverrides {
            mixed_use_split: Some(
                split
                    .iter()
                    .map(|(name, share)| (name.to_string(), *share))
                    .collect::<BTreeMap<_, _>>(),
            ),
            source_description: None,
        }),
        ..request("mixed_use", Some("office_residential"), Decimal::from(120_000), "Austin, TX")
    }
}

pub fn mixed_use_described(description: &str) -> ProjectRequest {
    ProjectRequest {
        overrides: Some(RequestOverrides {
            mixed_use_split: None,
            source_description: Some(description.to_string()),
        }),
        ..request("mixed_use", Some("office_residential"), Decimal::from(120_000), "Austin, TX")
    }
}
