use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::building::Trade;

/// How a scope item's quantity is derived from the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum QuantityRule {
    /// `square_footage × factor`.
    Area { factor: Decimal },
    Fixed { count: Decimal },
    /// `floors × per_floor`.
    PerFloor { per_floor: Decimal },
    /// `ceil(square_footage / area_per_group)`, at least `minimum`
    /// (restroom groups, stair cores, riser stacks).
    AreaGroups {
        area_per_group: Decimal,
        #[serde(default)]
        minimum: Decimal,
    },
    LumpSum,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopeItemSpec {
    pub key: String,
    pub label: String,
    pub unit: String,
    /// Fraction of the trade total. Shares per trade sum to 1.0.
    pub share: Decimal,
    pub quantity: QuantityRule,
}

/// Per-trade line item allocation profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopeItemProfile {
    pub id: String,
    #[serde(default)]
    pub structural: Vec<ScopeItemSpec>,
    #[serde(default)]
    pub mechanical: Vec<ScopeItemSpec>,
    #[serde(default)]
    pub electrical: Vec<ScopeItemSpec>,
    #[serde(default)]
    pub plumbing: Vec<ScopeItemSpec>,
    #[serde(default)]
    pub finishes: Vec<ScopeItemSpec>,
}

impl ScopeItemProfile {
    pub fn items(&self, trade: Trade) -> &[ScopeItemSpec] {
        match trade {
            Trade::Structural => &self.structural,
            Trade::Mechanical => &self.mechanical,
            Trade::Electrical => &self.electrical,
            Trade::Plumbing => &self.plumbing,
            Trade::Finishes => &self.finishes,
        }
    }

    pub fn share_total(&self, trade: Trade) -> Decimal {
        self.items(trade).iter().map(|i| i.share).sum()
    }
}

/// A priced, quantified line item within a trade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopeSystem {
    pub key: String,
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeScope {
    pub trade: Trade,
    pub trade_total: Decimal,
    pub systems: Vec<ScopeSystem>,
}

impl TradeScope {
    pub fn systems_total(&self) -> Decimal {
        self.systems.iter().map(|s| s.total_cost).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn profile_from_toml() {
        let toml_str = r#"
id = "test_scope"

[[structural]]
key = "foundations"
label = "Foundations"
unit = "sf"
share = 0.4
quantity = { rule = "area", factor = 1.0 }

[[structural]]
key = "frame"
label = "Structural frame"
unit = "sf"
share = 0.6
quantity = { rule = "area", factor = 1.0 }

[[plumbing]]
key = "restroom_groups"
label = "Restroom groups"
unit = "groups"
share = 1.0
quantity = { rule = "area_groups", area_per_group = 10000, minimum = 2 }
"#;
        let profile: ScopeItemProfile = toml::from_str(toml_str).unwrap();
        assert_eq!(profile.items(Trade::Structural).len(), 2);
        assert_eq!(profile.share_total(Trade::Structural), dec!(1.0));
        assert!(profile.items(Trade::Mechanical).is_empty());
        assert_eq!(
            profile.plumbing[0].quantity,
            QuantityRule::AreaGroups {
                area_per_group: dec!(10000),
                minimum: dec!(2)
            }
        );
    }

    #[test]
    fn lump_sum_rule_parses_without_fields() {
        let rule: QuantityRule = serde_json::from_str(r#"{"rule": "lump_sum"}"#).unwrap();
        assert_eq!(rule, QuantityRule::LumpSum);
    }
}
