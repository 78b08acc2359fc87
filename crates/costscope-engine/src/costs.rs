//! Construction cost arithmetic: rate adjustment, clamping, special features
//! and soft costs. Every currency amount leaving this module is in cents.

use std::collections::BTreeSet;

use costscope_models::building::{BuildingConfig, CostClamp, FeaturePricing, SoftCostLine};
use costscope_models::result::{FeatureCost, SoftCost};
use rust_decimal::Decimal;

use crate::money::cents;
use crate::trace::{Trace, Warning};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedRate {
    pub cost_per_sf: Decimal,
    pub clamp_applied: bool,
}

/// Apply `multipliers` to the base rate, then the subtype's clamp band.
pub fn adjusted_cost_per_sf(
    base_cost_per_sf: Decimal,
    multipliers: &[Decimal],
    clamp: Option<&CostClamp>,
    trace: &mut Trace,
) -> AdjustedRate {
    let unclamped = cents(
        multipliers
            .iter()
            .fold(base_cost_per_sf, |rate, m| rate * *m),
    );

    let Some(band) = clamp else {
        return AdjustedRate {
            cost_per_sf: unclamped,
            clamp_applied: false,
        };
    };

    let clamped = unclamped
        .max(band.min_cost_per_sf)
        .min(band.max_cost_per_sf);
    if clamped == unclamped {
        return AdjustedRate {
            cost_per_sf: unclamped,
            clamp_applied: false,
        };
    }

    trace.warning(Warning::CostClamp {
        unclamped,
        clamped,
        min: band.min_cost_per_sf,
        max: band.max_cost_per_sf,
    });
    AdjustedRate {
        cost_per_sf: clamped,
        clamp_applied: true,
    }
}

/// `"Rooftop Terrace"` and `"rooftop-terrace"` both name `rooftop_terrace`.
pub fn normalize_feature(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Price requested features. Unknown names are skipped with a warning;
/// duplicates are priced once.
///
/// Per-square-foot features scale with area. Per-unit features are a fixed
/// count and never do.
pub fn price_features(
    requested: &[String],
    config: &BuildingConfig,
    square_footage: Decimal,
    regional_cost: Decimal,
    trace: &mut Trace,
) -> Vec<FeatureCost> {
    let mut seen = BTreeSet::new();
    let mut priced = Vec::new();

    for raw in requested {
        let key = normalize_feature(raw);
        if key.is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        let Some(feature) = config.special_features.get(&key) else {
            trace.warning(Warning::UnknownFeature { feature: key });
            continue;
        };

        let (basis, amount) = match &feature.pricing {
            FeaturePricing::PerSf { cost_per_sf } => (
                "per_sf",
                cents(*cost_per_sf * square_footage * regional_cost),
            ),
            FeaturePricing::PerUnit { unit_cost, units } => (
                "per_unit",
                cents(*unit_cost * Decimal::from(*units) * regional_cost),
            ),
        };
        priced.push(FeatureCost {
            feature: key,
            label: feature.label.clone(),
            basis: basis.to_string(),
            amount,
        });
    }

    priced
}

pub fn soft_costs(hard_costs: Decimal, lines: &[SoftCostLine]) -> Vec<SoftCost> {
    lines
        .iter()
        .map(|line| SoftCost {
            name: line.name.clone(),
            rate: line.rate,
            amount: cents(hard_costs * line.rate),
        })
        .collect()
}
