//! Append-only calculation trace.
//!
//! Non-fatal anomalies are typed as [`Warning`] inside the engine and only
//! rendered to JSON trace entries here, so every fallback the engine takes
//! leaves exactly one named record behind.

use costscope_models::mixed_use::InvalidMix;
use costscope_models::result::{TraceEntry, TraceLevel};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::warn;

use crate::regional::RegionalWarning;

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    RegionalData(RegionalWarning),
    InvalidMix(InvalidMix),
    CostClamp {
        unclamped: Decimal,
        clamped: Decimal,
        min: Decimal,
        max: Decimal,
    },
    UnknownFeature {
        feature: String,
    },
    /// Trade shares that do not sum to 1; the last trade absorbs the gap.
    TradeShares {
        total: Decimal,
        residual_trade: &'static str,
    },
}

impl Warning {
    pub fn step(&self) -> &'static str {
        match self {
            Warning::RegionalData(_) => "regional_data_warning",
            Warning::InvalidMix(_) => "invalid_mix_warning",
            Warning::CostClamp { .. } => "cost_clamp_applied",
            Warning::UnknownFeature { .. } => "special_feature_warning",
            Warning::TradeShares { .. } => "trade_shares_warning",
        }
    }

    fn data(&self) -> serde_json::Value {
        match self {
            Warning::RegionalData(w) => json!({
                "location": w.location,
                "reason": w.reason.as_str(),
                "fallback": w.fallback.as_str(),
                "cost_multiplier": w.factor.cost,
                "revenue_multiplier": w.factor.revenue,
            }),
            Warning::InvalidMix(mix) => json!({
                "reason": mix.reason.as_str(),
                "detail": mix.detail,
                "fallback": "default_split",
            }),
            Warning::CostClamp {
                unclamped,
                clamped,
                min,
                max,
            } => json!({
                "unclamped_cost_per_sf": unclamped,
                "clamped_cost_per_sf": clamped,
                "min_cost_per_sf": min,
                "max_cost_per_sf": max,
            }),
            Warning::UnknownFeature { feature } => json!({
                "feature": feature,
                "action": "skipped",
            }),
            Warning::TradeShares {
                total,
                residual_trade,
            } => json!({
                "shares_total": total,
                "expected": Decimal::ONE,
                "residual_trade": residual_trade,
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, step: &str, data: serde_json::Value) {
        self.entries.push(TraceEntry {
            step: step.to_string(),
            level: TraceLevel::Info,
            data,
        });
    }

    pub fn warning(&mut self, warning: Warning) {
        let step = warning.step();
        let data = warning.data();
        warn!(step, data = %data, "Calculation warning");
        self.entries.push(TraceEntry {
            step: step.to_string(),
            level: TraceLevel::Warning,
            data,
        });
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }
}
