use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Named use components a mixed-use program can be split across.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Office,
    Residential,
    Retail,
    Hotel,
    Transit,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Office,
        Component::Residential,
        Component::Retail,
        Component::Hotel,
        Component::Transit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Office => "office",
            Component::Residential => "residential",
            Component::Retail => "retail",
            Component::Hotel => "hotel",
            Component::Transit => "transit",
        }
    }

    /// Parse a component name, accepting common synonyms.
    pub fn parse(name: &str) -> Option<Component> {
        match name.trim().to_ascii_lowercase().as_str() {
            "office" | "offices" | "workplace" => Some(Component::Office),
            "residential" | "residence" | "residences" | "apartment" | "apartments"
            | "housing" | "multifamily" | "condo" | "condos" => Some(Component::Residential),
            "retail" | "shops" | "shopping" | "storefront" | "storefronts" => {
                Some(Component::Retail)
            }
            "hotel" | "hospitality" | "lodging" => Some(Component::Hotel),
            "transit" | "station" | "rail" => Some(Component::Transit),
            _ => None,
        }
    }
}

/// Where a resolved split came from, in precedence order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MixSource {
    Override,
    Detected,
    Default,
}

/// The shape of a mixed-use hint found in a project description.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MixPatternKind {
    RatioPair,
    PercentPair,
    Mostly,
    Heavy,
    Balanced,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvalidMixReason {
    UnsupportedComponent,
    InvalidTotal,
    NegativeShare,
}

impl InvalidMixReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidMixReason::UnsupportedComponent => "unsupported_component",
            InvalidMixReason::InvalidTotal => "invalid_total",
            InvalidMixReason::NegativeShare => "negative_share",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvalidMix {
    pub reason: InvalidMixReason,
    /// The offending component names or a short description of the problem.
    pub detail: Vec<String>,
}

/// The resolved percentage allocation across use components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixedUseSplit {
    pub source: MixSource,
    #[serde(default)]
    pub pattern: Option<MixPatternKind>,
    /// Component name to percentage. Always sums to 100.
    pub value: BTreeMap<String, Decimal>,
    pub normalization_applied: bool,
    pub inference_applied: bool,
    #[serde(default)]
    pub invalid_mix: Option<InvalidMix>,
}

impl MixedUseSplit {
    pub fn share_of(&self, component: Component) -> Decimal {
        self.value
            .get(component.as_str())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total(&self) -> Decimal {
        self.value.values().copied().sum()
    }
}
