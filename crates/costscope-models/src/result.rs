use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::building::Trade;
use crate::dealshield::{DecisionInsuranceProvenance, Transform};
use crate::mixed_use::MixedUseSplit;
use crate::request::{FinishLevel, OwnershipType, ProjectClass};
use crate::scope::TradeScope;

pub const OUTPUT_SCHEMA_VERSION: u32 = 1;

/// Which configuration answered the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Subtype,
    BuildingTypeBaseline,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Subtype => "subtype",
            ConfigSource::BuildingTypeBaseline => "building_type_baseline",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectInfo {
    pub building_type: String,
    pub requested_subtype: Option<String>,
    pub subtype: String,
    pub config_source: ConfigSource,
    pub display_name: String,
    pub square_footage: Decimal,
    pub floors: u32,
    pub location: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub project_class: ProjectClass,
    pub ownership_type: OwnershipType,
    pub finish_level: FinishLevel,
    pub special_features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCost {
    pub feature: String,
    pub label: String,
    pub basis: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoftCost {
    pub name: String,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionCosts {
    pub base_cost_per_sf: Decimal,
    pub regional_multiplier: Decimal,
    pub project_class_multiplier: Decimal,
    pub finish_multiplier: Decimal,
    /// Blended mixed-use component factor; 1 for single-use subtypes.
    pub component_multiplier: Decimal,
    pub adjusted_cost_per_sf: Decimal,
    pub clamp_applied: bool,
    pub construction_total: Decimal,
    pub special_features: Vec<FeatureCost>,
    pub special_features_total: Decimal,
    pub hard_costs: Decimal,
    pub soft_costs: Vec<SoftCost>,
    pub soft_costs_total: Decimal,
    pub total_project_cost: Decimal,
    pub cost_per_sf: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TradeBreakdown {
    pub structural: Decimal,
    pub mechanical: Decimal,
    pub electrical: Decimal,
    pub plumbing: Decimal,
    pub finishes: Decimal,
}

impl TradeBreakdown {
    pub fn get(&self, trade: Trade) -> Decimal {
        match trade {
            Trade::Structural => self.structural,
            Trade::Mechanical => self.mechanical,
            Trade::Electrical => self.electrical,
            Trade::Plumbing => self.plumbing,
            Trade::Finishes => self.finishes,
        }
    }

    pub fn set(&mut self, trade: Trade, amount: Decimal) {
        match trade {
            Trade::Structural => self.structural = amount,
            Trade::Mechanical => self.mechanical = amount,
            Trade::Electrical => self.electrical = amount,
            Trade::Plumbing => self.plumbing = amount,
            Trade::Finishes => self.finishes = amount,
        }
    }

    pub fn total(&self) -> Decimal {
        Trade::ALL.iter().map(|t| self.get(*t)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseLine {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueAnalysis {
    pub primary_unit: String,
    pub unit_count: Decimal,
    pub revenue_per_unit: Decimal,
    /// Revenue-side regional multiplier. Independent of the cost multiplier.
    pub regional_multiplier: Decimal,
    pub annual_revenue: Decimal,
    pub operating_expenses: Vec<ExpenseLine>,
    pub total_operating_expenses: Decimal,
    pub net_income: Decimal,
}

/// Cap-rate based metrics. All None for unsupported asset classes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReturnMetrics {
    pub asset_class: String,
    pub valuation_supported: bool,
    pub cap_rate: Option<Decimal>,
    pub property_value: Option<Decimal>,
    pub yield_on_cost: Option<Decimal>,
    pub irr: Option<Decimal>,
    pub payback_period: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebtMetrics {
    pub debt_ratio: Decimal,
    pub debt_amount: Decimal,
    pub equity_amount: Decimal,
    pub interest_rate: Decimal,
    pub amortization_years: u32,
    pub annual_debt_service: Decimal,
    /// None when the structure carries no debt.
    pub calculated_dscr: Option<Decimal>,
    pub target_dscr: Decimal,
    pub meets_target: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnershipAnalysis {
    pub ownership_type: OwnershipType,
    pub debt_metrics: DebtMetrics,
}

/// Headline metrics recomputed for each DealShield scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyMetrics {
    pub hard_costs: Decimal,
    pub soft_costs_total: Decimal,
    pub total_project_cost: Decimal,
    pub annual_revenue: Decimal,
    pub total_operating_expenses: Decimal,
    pub net_income: Decimal,
    pub cap_rate: Option<Decimal>,
    pub property_value: Option<Decimal>,
    pub yield_on_cost: Option<Decimal>,
    pub irr: Option<Decimal>,
    pub payback_period: Option<Decimal>,
    pub debt_amount: Decimal,
    pub interest_rate: Decimal,
    pub annual_debt_service: Decimal,
    pub calculated_dscr: Option<Decimal>,
}

/// One driver stress applied while deriving a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverApplication {
    pub tile_id: String,
    pub metric_ref: String,
    pub transforms: Vec<Transform>,
    pub before: Decimal,
    pub after: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioSnapshot {
    pub scenario_id: String,
    pub label: String,
    pub drivers: Vec<DriverApplication>,
    pub metrics: KeyMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioProvenance {
    pub row_order: Vec<String>,
    #[serde(default)]
    pub content_profile_id: Option<String>,
    pub decision_insurance: DecisionInsuranceProvenance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DealShieldScenarios {
    pub profile_id: String,
    /// `base` plus one entry per derived row.
    pub scenarios: BTreeMap<String, ScenarioSnapshot>,
    pub provenance: ScenarioProvenance,
}

/// Older payloads carried per-scenario metric overrides in this shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LegacySensitivity {
    /// Scenario id to metric ref to value.
    pub scenarios: BTreeMap<String, BTreeMap<String, Decimal>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraceLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    pub step: String,
    pub level: TraceLevel,
    pub data: serde_json::Value,
}

/// The complete output for a ProjectRequest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationResult {
    pub schema_version: u32,
    pub project_info: ProjectInfo,
    pub construction_costs: ConstructionCosts,
    pub trade_breakdown: TradeBreakdown,
    pub scope_items: Vec<TradeScope>,
    pub revenue_analysis: RevenueAnalysis,
    pub return_metrics: ReturnMetrics,
    pub ownership_analysis: OwnershipAnalysis,
    #[serde(default)]
    pub mixed_use_split: Option<MixedUseSplit>,
    #[serde(default)]
    pub dealshield_tile_profile: Option<String>,
    #[serde(default)]
    pub dealshield_scenarios: Option<DealShieldScenarios>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity_analysis: Option<LegacySensitivity>,
    pub calculation_trace: Vec<TraceEntry>,
    /// Excluded from determinism comparisons.
    pub generated_at: DateTime<Utc>,
}

impl CalculationResult {
    pub fn scope_for(&self, trade: Trade) -> Option<&TradeScope> {
        self.scope_items.iter().find(|s| s.trade == trade)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &TraceEntry> {
        self.calculation_trace
            .iter()
            .filter(|e| e.level == TraceLevel::Warning)
    }

    pub fn trace_step(&self, step: &str) -> Option<&TraceEntry> {
        self.calculation_trace.iter().find(|e| e.step == step)
    }

    /// JSON form with `generated_at` removed, for repeatability checks.
    pub fn without_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(obj) = value.as_object_mut() {
            obj.remove("generated_at");
        }
        value
    }
}
