use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const REQUEST_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectClass {
    GroundUp,
    Addition,
    Renovation,
    TenantImprovement,
}

impl ProjectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectClass::GroundUp => "ground_up",
            ProjectClass::Addition => "addition",
            ProjectClass::Renovation => "renovation",
            ProjectClass::TenantImprovement => "tenant_improvement",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipType {
    ForProfit,
    Nonprofit,
    Government,
}

impl OwnershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipType::ForProfit => "for_profit",
            OwnershipType::Nonprofit => "nonprofit",
            OwnershipType::Government => "government",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FinishLevel {
    #[default]
    Standard,
    Premium,
    Luxury,
}

impl FinishLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishLevel::Standard => "standard",
            FinishLevel::Premium => "premium",
            FinishLevel::Luxury => "luxury",
        }
    }
}

/// Caller-supplied adjustments layered over the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestOverrides {
    /// Component name to share. Shares may be percentages or fractions.
    /// Names are kept as raw strings so unsupported components can be reported.
    #[serde(default)]
    pub mixed_use_split: Option<BTreeMap<String, Decimal>>,
    /// Free-text project description, scanned for mixed-use hints.
    #[serde(default)]
    pub source_description: Option<String>,
}

/// A structured project submitted for estimation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRequest {
    pub building_type: String,
    /// None or an unknown value resolves to the building type's baseline.
    #[serde(default)]
    pub subtype: Option<String>,
    pub square_footage: Decimal,
    pub location: String,
    pub project_class: ProjectClass,
    #[serde(default = "default_floors")]
    pub floors: u32,
    pub ownership_type: OwnershipType,
    #[serde(default)]
    pub finish_level: Option<FinishLevel>,
    #[serde(default)]
    pub special_features: Vec<String>,
    #[serde(default)]
    pub overrides: Option<RequestOverrides>,
}

fn default_floors() -> u32 {
    1
}

impl ProjectRequest {
    pub fn finish_level(&self) -> FinishLevel {
        self.finish_level.unwrap_or_default()
    }

    pub fn mixed_use_override(&self) -> Option<&BTreeMap<String, Decimal>> {
        self.overrides
            .as_ref()
            .and_then(|o| o.mixed_use_split.as_ref())
    }

    pub fn source_description(&self) -> Option<&str> {
        self.overrides
            .as_ref()
            .and_then(|o| o.source_description.as_deref())
    }
}
