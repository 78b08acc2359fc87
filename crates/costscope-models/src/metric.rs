//! Typed dotted-path access to calculation metrics.
//!
//! Tile profiles and decision policies reference metrics by dotted path
//! (`construction_costs.total_project_cost`). Rather than walking an untyped
//! JSON tree, every path is matched against the typed result here.

use rust_decimal::Decimal;

use crate::result::{CalculationResult, KeyMetrics, ScenarioSnapshot};

/// Outcome of resolving a metric path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricLookup {
    Found(Decimal),
    /// The path is known but the value is null for this payload.
    NotNumeric,
    NotFound,
}

impl MetricLookup {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            MetricLookup::Found(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Option<Decimal>> for MetricLookup {
    fn from(value: Option<Decimal>) -> Self {
        match value {
            Some(v) => MetricLookup::Found(v),
            None => MetricLookup::NotNumeric,
        }
    }
}

pub trait MetricSource {
    fn metric(&self, path: &str) -> MetricLookup;
}

/// Metric refs a scenario can stress. Any other path is an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Driver {
    HardCosts,
    SoftCosts,
    Revenue,
    OperatingExpenses,
    CapRate,
    InterestRate,
}

impl Driver {
    pub fn from_metric_ref(path: &str) -> Option<Driver> {
        match path {
            "construction_costs.hard_costs" => Some(Driver::HardCosts),
            "construction_costs.soft_costs_total" => Some(Driver::SoftCosts),
            "revenue_analysis.annual_revenue" => Some(Driver::Revenue),
            "revenue_analysis.total_operating_expenses" => Some(Driver::OperatingExpenses),
            "return_metrics.cap_rate" => Some(Driver::CapRate),
            "ownership_analysis.debt_metrics.interest_rate" => Some(Driver::InterestRate),
            _ => None,
        }
    }
}

/// Every path a `CalculationResult` can resolve.
pub const KNOWN_METRIC_PATHS: &[&str] = &[
    "project_info.square_footage",
    "construction_costs.base_cost_per_sf",
    "construction_costs.regional_multiplier",
    "construction_costs.adjusted_cost_per_sf",
    "construction_costs.construction_total",
    "construction_costs.special_features_total",
    "construction_costs.hard_costs",
    "construction_costs.soft_costs_total",
    "construction_costs.total_project_cost",
    "construction_costs.cost_per_sf",
    "trade_breakdown.structural",
    "trade_breakdown.mechanical",
    "trade_breakdown.electrical",
    "trade_breakdown.plumbing",
    "trade_breakdown.finishes",
    "revenue_analysis.unit_count",
    "revenue_analysis.revenue_per_unit",
    "revenue_analysis.regional_multiplier",
    "revenue_analysis.annual_revenue",
    "revenue_analysis.total_operating_expenses",
    "revenue_analysis.net_income",
    "return_metrics.cap_rate",
    "return_metrics.property_value",
    "return_metrics.yield_on_cost",
    "return_metrics.irr",
    "return_metrics.payback_period",
    "ownership_analysis.debt_metrics.debt_amount",
    "ownership_analysis.debt_metrics.equity_amount",
    "ownership_analysis.debt_metrics.interest_rate",
    "ownership_analysis.debt_metrics.annual_debt_service",
    "ownership_analysis.debt_metrics.calculated_dscr",
];

pub fn is_known_metric(path: &str) -> bool {
    KNOWN_METRIC_PATHS.contains(&path)
}

impl MetricSource for CalculationResult {
    fn metric(&self, path: &str) -> MetricLookup {
        let costs = &self.construction_costs;
        let trades = &self.trade_breakdown;
        let revenue = &self.revenue_analysis;
        let returns = &self.return_metrics;
        let debt = &self.ownership_analysis.debt_metrics;

        let found = |v: Decimal| MetricLookup::Found(v);
        match path {
            "project_info.square_footage" => found(self.project_info.square_footage),
            "construction_costs.base_cost_per_sf" => found(costs.base_cost_per_sf),
            "construction_costs.regional_multiplier" => found(costs.regional_multiplier),
            "construction_costs.adjusted_cost_per_sf" => found(costs.adjusted_cost_per_sf),
            "construction_costs.construction_total" => found(costs.construction_total),
            "construction_costs.special_features_total" => found(costs.special_features_total),
            "construction_costs.hard_costs" => found(costs.hard_costs),
            "construction_costs.soft_costs_total" => found(costs.soft_costs_total),
            "construction_costs.total_project_cost" => found(costs.total_project_cost),
            "construction_costs.cost_per_sf" => found(costs.cost_per_sf),
            "trade_breakdown.structural" => found(trades.structural),
            "trade_breakdown.mechanical" => found(trades.mechanical),
            "trade_breakdown.electrical" => found(trades.electrical),
            "trade_breakdown.plumbing" => found(trades.plumbing),
            "trade_breakdown.finishes" => found(trades.finishes),
            "revenue_analysis.unit_count" => found(revenue.unit_count),
            "revenue_analysis.revenue_per_unit" => found(revenue.revenue_per_unit),
            "revenue_analysis.regional_multiplier" => found(revenue.regional_multiplier),
            "revenue_analysis.annual_revenue" => found(revenue.annual_revenue),
            "revenue_analysis.total_operating_expenses" => {
                found(revenue.total_operating_expenses)
            }
            "revenue_analysis.net_income" => found(revenue.net_income),
            "return_metrics.cap_rate" => returns.cap_rate.into(),
            "return_metrics.property_value" => returns.property_value.into(),
            "return_metrics.yield_on_cost" => returns.yield_on_cost.into(),
            "return_metrics.irr" => returns.irr.into(),
            "return_metrics.payback_period" => returns.payback_period.into(),
            "ownership_analysis.debt_metrics.debt_amount" => found(debt.debt_amount),
            "ownership_analysis.debt_metrics.equity_amount" => found(debt.equity_amount),
            "ownership_analysis.debt_metrics.interest_rate" => found(debt.interest_rate),
            "ownership_analysis.debt_metrics.annual_debt_service" => {
                found(debt.annual_debt_service)
            }
            "ownership_analysis.debt_metrics.calculated_dscr" => debt.calculated_dscr.into(),
            _ => MetricLookup::NotFound,
        }
    }
}

impl MetricSource for KeyMetrics {
    fn metric(&self, path: &str) -> MetricLookup {
        let found = |v: Decimal| MetricLookup::Found(v);
        match path {
            "construction_costs.hard_costs" => found(self.hard_costs),
            "construction_costs.soft_costs_total" => found(self.soft_costs_total),
            "construction_costs.total_project_cost" => found(self.total_project_cost),
            "revenue_analysis.annual_revenue" => found(self.annual_revenue),
            "revenue_analysis.total_operating_expenses" => found(self.total_operating_expenses),
            "revenue_analysis.net_income" => found(self.net_income),
            "return_metrics.cap_rate" => self.cap_rate.into(),
            "return_metrics.property_value" => self.property_value.into(),
            "return_metrics.yield_on_cost" => self.yield_on_cost.into(),
            "return_metrics.irr" => self.irr.into(),
            "return_metrics.payback_period" => self.payback_period.into(),
            "ownership_analysis.debt_metrics.debt_amount" => found(self.debt_amount),
            "ownership_analysis.debt_metrics.interest_rate" => found(self.interest_rate),
            "ownership_analysis.debt_metrics.annual_debt_service" => {
                found(self.annual_debt_service)
            }
            "ownership_analysis.debt_metrics.calculated_dscr" => self.calculated_dscr.into(),
            _ => MetricLookup::NotFound,
        }
    }
}

impl MetricSource for ScenarioSnapshot {
    fn metric(&self, path: &str) -> MetricLookup {
        self.metrics.metric(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn metrics() -> KeyMetrics {
        KeyMetrics {
            hard_costs: dec!(1000),
            soft_costs_total: dec!(200),
            total_project_cost: dec!(1200),
            annual_revenue: dec!(300),
            total_operating_expenses: dec!(100),
            net_income: dec!(200),
            cap_rate: None,
            property_value: None,
            yield_on_cost: Some(dec!(0.1667)),
            irr: None,
            payback_period: Some(dec!(6)),
            debt_amount: dec!(780),
            interest_rate: dec!(0.065),
            annual_debt_service: dec!(60),
            calculated_dscr: Some(dec!(3.33)),
        }
    }

    #[test]
    fn key_metrics_lookup() {
        let m = metrics();
        assert_eq!(
            m.metric("construction_costs.total_project_cost"),
            MetricLookup::Found(dec!(1200))
        );
        assert_eq!(m.metric("return_metrics.cap_rate"), MetricLookup::NotNumeric);
        assert_eq!(m.metric("trade_breakdown.structural"), MetricLookup::NotFound);
    }

    #[test]
    fn driver_paths_are_known_metrics() {
        for path in [
            "construction_costs.hard_costs",
            "construction_costs.soft_costs_total",
            "revenue_analysis.annual_revenue",
            "revenue_analysis.total_operating_expenses",
            "return_metrics.cap_rate",
            "ownership_analysis.debt_metrics.interest_rate",
        ] {
            assert!(Driver::from_metric_ref(path).is_some(), "{path}");
            assert!(is_known_metric(path), "{path}");
        }
        assert_eq!(Driver::from_metric_ref("revenue_analysis.net_income"), None);
    }

    #[test]
    fn snapshot_paths_are_known_metrics() {
        let m = metrics();
        for path in KNOWN_METRIC_PATHS {
            if m.metric(path) != MetricLookup::NotFound {
                assert!(is_known_metric(path));
            }
        }
    }
}
