use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::mixed_use::Component;
use crate::request::{FinishLevel, OwnershipType, ProjectClass};

/// The five construction disciplines every estimate is broken into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trade {
    Structural,
    Mechanical,
    Electrical,
    Plumbing,
    Finishes,
}

impl Trade {
    /// Canonical allocation order. The last trade absorbs rounding residue.
    pub const ALL: [Trade; 5] = [
        Trade::Structural,
        Trade::Mechanical,
        Trade::Electrical,
        Trade::Plumbing,
        Trade::Finishes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trade::Structural => "structural",
            Trade::Mechanical => "mechanical",
            Trade::Electrical => "electrical",
            Trade::Plumbing => "plumbing",
            Trade::Finishes => "finishes",
        }
    }
}

/// Share of construction cost per trade. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeShares {
    pub structural: Decimal,
    pub mechanical: Decimal,
    pub electrical: Decimal,
    pub plumbing: Decimal,
    pub finishes: Decimal,
}

impl TradeShares {
    pub fn share(&self, trade: Trade) -> Decimal {
        match trade {
            Trade::Structural => self.structural,
            Trade::Mechanical => self.mechanical,
            Trade::Electrical => self.electrical,
            Trade::Plumbing => self.plumbing,
            Trade::Finishes => self.finishes,
        }
    }

    pub fn total(&self) -> Decimal {
        Trade::ALL.iter().map(|t| self.share(*t)).sum()
    }
}

/// Explicit multiplier for every project class. No ordering between classes
/// is assumed anywhere; each subtype declares all four.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectClassMultipliers {
    pub ground_up: Decimal,
    pub addition: Decimal,
    pub renovation: Decimal,
    pub tenant_improvement: Decimal,
}

impl ProjectClassMultipliers {
    pub fn get(&self, class: ProjectClass) -> Decimal {
        match class {
            ProjectClass::GroundUp => self.ground_up,
            ProjectClass::Addition => self.addition,
            ProjectClass::Renovation => self.renovation,
            ProjectClass::TenantImprovement => self.tenant_improvement,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinishMultipliers {
    pub standard: Decimal,
    pub premium: Decimal,
    pub luxury: Decimal,
}

impl FinishMultipliers {
    pub fn get(&self, level: FinishLevel) -> Decimal {
        match level {
            FinishLevel::Standard => self.standard,
            FinishLevel::Premium => self.premium,
            FinishLevel::Luxury => self.luxury,
        }
    }
}

/// Pricing basis for a special feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum FeaturePricing {
    /// Scales with the building's square footage.
    PerSf { cost_per_sf: Decimal },
    /// Fixed count of units; never scales with area.
    PerUnit {
        unit_cost: Decimal,
        #[serde(default = "default_units")]
        units: u32,
    },
}

fn default_units() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialFeature {
    pub label: String,
    pub pricing: FeaturePricing,
}

/// How the primary revenue unit count is derived from the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum UnitRule {
    PerArea {
        units_per_sf: Decimal,
        /// Round down to whole units (apartments, keys, seats).
        #[serde(default)]
        whole_units: bool,
    },
    Fixed { count: Decimal },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum ExpenseBasis {
    PerSf { rate: Decimal },
    PerUnit { rate: Decimal },
    PercentOfRevenue { rate: Decimal },
    Fixed { amount: Decimal },
}

/// A named operating expense line. Net income is revenue minus the sum of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperatingExpense {
    pub name: String,
    pub basis: ExpenseBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialMetrics {
    /// Real-estate asset class used to gate cap-rate valuation.
    pub asset_class: String,
    /// Label for the revenue unit (e.g. "units", "sf", "seats").
    pub primary_unit: String,
    pub unit_rule: UnitRule,
    /// Annual revenue per primary unit before regional adjustment.
    pub revenue_per_unit: Decimal,
    pub operating_expenses: Vec<OperatingExpense>,
    #[serde(default)]
    pub cap_rate: Option<Decimal>,
    #[serde(default = "default_hold_years")]
    pub hold_years: u32,
}

fn default_hold_years() -> u32 {
    10
}

/// Cost-per-square-foot band for volatile subtypes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostClamp {
    pub min_cost_per_sf: Decimal,
    pub max_cost_per_sf: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentProfile {
    pub component: Component,
    /// Multiplier on the subtype base cost for this component's share.
    pub cost_factor: Decimal,
    /// Multiplier on revenue per unit for this component's share.
    pub revenue_factor: Decimal,
    /// Default percentage. When every component omits it the split is even.
    #[serde(default)]
    pub default_share: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixedUseProfile {
    pub components: Vec<ComponentProfile>,
}

impl MixedUseProfile {
    pub fn component(&self, component: Component) -> Option<&ComponentProfile> {
        self.components.iter().find(|c| c.component == component)
    }

    pub fn supports(&self, component: Component) -> bool {
        self.component(component).is_some()
    }
}

/// Configuration for one (building type, subtype) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingConfig {
    pub display_name: String,
    pub base_cost_per_sf: Decimal,
    pub project_class_multipliers: ProjectClassMultipliers,
    pub trades: TradeShares,
    #[serde(default)]
    pub special_features: BTreeMap<String, SpecialFeature>,
    pub financial: FinancialMetrics,
    #[serde(default)]
    pub cost_clamp: Option<CostClamp>,
    #[serde(default)]
    pub mixed_use: Option<MixedUseProfile>,
    pub scope_profile: String,
    #[serde(default)]
    pub dealshield_tile_profile: Option<String>,
}

/// Cost and revenue multipliers for a region. Both are required; the revenue
/// multiplier is never inferred from the cost multiplier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegionalFactor {
    pub cost: Decimal,
    pub revenue: Decimal,
}

impl RegionalFactor {
    pub const NEUTRAL: RegionalFactor = RegionalFactor {
        cost: Decimal::ONE,
        revenue: Decimal::ONE,
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegionalTable {
    /// Keyed by two-letter state code, upper case.
    #[serde(default)]
    pub states: BTreeMap<String, RegionalFactor>,
    /// Keyed by `"city, st"`, lower case.
    #[serde(default)]
    pub cities: BTreeMap<String, RegionalFactor>,
    /// Used when only a city is known. Keyed by lower-case city name.
    #[serde(default)]
    pub city_only_overrides: BTreeMap<String, RegionalFactor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoftCostLine {
    pub name: String,
    /// Fraction of hard costs.
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancingTerms {
    pub debt_ratio: Decimal,
    pub equity_ratio: Decimal,
    pub interest_rate: Decimal,
    pub amortization_years: u32,
    pub target_dscr: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnershipFinancing {
    pub for_profit: FinancingTerms,
    pub nonprofit: FinancingTerms,
    pub government: FinancingTerms,
}

impl OwnershipFinancing {
    pub fn get(&self, ownership: OwnershipType) -> &FinancingTerms {
        match ownership {
            OwnershipType::ForProfit => &self.for_profit,
            OwnershipType::Nonprofit => &self.nonprofit,
            OwnershipType::Government => &self.government,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (OwnershipType, &FinancingTerms)> {
        [
            (OwnershipType::ForProfit, &self.for_profit),
            (OwnershipType::Nonprofit, &self.nonprofit),
            (OwnershipType::Government, &self.government),
        ]
        .into_iter()
    }
}

/// Everything declared for a building type, including its subtypes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingTypeConfig {
    pub building_type: String,
    pub display_name: String,
    /// The single deterministic fallback when a subtype is absent or unknown.
    pub baseline_subtype: String,
    #[serde(default)]
    pub regional: RegionalTable,
    pub finish_multipliers: FinishMultipliers,
    pub soft_costs: Vec<SoftCostLine>,
    pub financing: OwnershipFinancing,
    pub subtypes: BTreeMap<String, BuildingConfig>,
}
