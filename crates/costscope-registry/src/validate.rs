//! Non-fatal integrity pass over a loaded registry.
//!
//! Violations are collected as a batch. A registry with violations still
//! serves requests that only touch valid configurations.

use std::collections::BTreeSet;

use costscope_models::building::{BuildingConfig, BuildingTypeConfig, FinancingTerms, Trade};
use costscope_models::dealshield::{
    ContentProfile, DecisionPolicy, TileProfile, CONSERVATIVE_ROW, UGLY_ROW,
};
use costscope_models::metric::{is_known_metric, Driver};
use costscope_models::mixed_use::Component;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::registry::Registry;

/// Shares must sum to exactly 1.0 within this tolerance.
pub fn share_epsilon() -> Decimal {
    Decimal::new(1, 9)
}

fn max_interest_rate() -> Decimal {
    Decimal::new(25, 2)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct IntegrityViolation {
    /// What the violation belongs to, e.g. `office/class_a` or `tile_profile:office_dealshield_v1`.
    pub scope: String,
    pub reason: String,
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.scope, self.reason)
    }
}

struct Collector {
    violations: Vec<IntegrityViolation>,
}

impl Collector {
    fn push(&mut self, scope: impl Into<String>, reason: impl Into<String>) {
        self.violations.push(IntegrityViolation {
            scope: scope.into(),
            reason: reason.into(),
        });
    }
}

fn is_unit_sum(total: Decimal) -> bool {
    (total - Decimal::ONE).abs() <= share_epsilon()
}

pub fn validate_registry(registry: &Registry) -> Vec<IntegrityViolation> {
    let mut out = Collector {
        violations: Vec::new(),
    };

    for bt in registry.building_types() {
        check_building_type(registry, bt, &mut out);
    }

    for profile in registry.scope_profiles() {
        let scope = format!("scope_profile:{}", profile.id);
        for trade in Trade::ALL {
            let items = profile.items(trade);
            if items.is_empty() {
                out.push(&scope, format!("trade {} has no scope items", trade.as_str()));
                continue;
            }
            let total = profile.share_total(trade);
            if !is_unit_sum(total) {
                out.push(
                    &scope,
                    format!("{} item shares sum to {total}, expected 1.0", trade.as_str()),
                );
            }
            let mut keys = BTreeSet::new();
            for item in items {
                if item.share < Decimal::ZERO {
                    out.push(&scope, format!("item {} has a negative share", item.key));
                }
                if !keys.insert(item.key.as_str()) {
                    out.push(&scope, format!("duplicate item key {}", item.key));
                }
            }
        }
    }

    for profile in registry.tile_profiles() {
        check_tile_profile(profile, &mut out);
    }

    let mut bound_content = BTreeSet::new();
    for content in registry.content_profiles() {
        if !bound_content.insert(content.tile_profile_id.as_str()) {
            out.push(
                format!("content_profile:{}", content.id),
                format!(
                    "tile profile {} already has a content profile",
                    content.tile_profile_id
                ),
            );
        }
        check_content_profile(registry, content, &mut out);
    }

    let mut bound_policies = BTreeSet::new();
    for policy in registry.decision_policies() {
        if !bound_policies.insert(policy.tile_profile_id.as_str()) {
            out.push(
                format!("decision_policy:{}", policy.id),
                format!(
                    "tile profile {} already has a decision policy",
                    policy.tile_profile_id
                ),
            );
        }
        check_policy(registry, policy, &mut out);
    }

    out.violations.sort();
    out.violations
}

fn check_building_type(registry: &Registry, bt: &BuildingTypeConfig, out: &mut Collector) {
    let type_scope = bt.building_type.clone();

    if !bt.subtypes.contains_key(&bt.baseline_subtype) {
        out.push(
            &type_scope,
            format!("baseline subtype {} is not declared", bt.baseline_subtype),
        );
    }

    for (ownership, terms) in bt.financing.iter() {
        check_financing(&format!("{type_scope}/financing.{}", ownership.as_str()), terms, out);
    }

    for line in &bt.soft_costs {
        if line.rate < Decimal::ZERO || line.rate > Decimal::ONE {
            out.push(
                &type_scope,
                format!("soft cost {} rate {} outside [0, 1]", line.name, line.rate),
            );
        }
    }

    let finishes = &bt.finish_multipliers;
    for (name, value) in [
        ("standard", finishes.standard),
        ("premium", finishes.premium),
        ("luxury", finishes.luxury),
    ] {
        if value <= Decimal::ZERO {
            out.push(&type_scope, format!("finish multiplier {name} must be positive"));
        }
    }

    for (subtype, config) in &bt.subtypes {
        check_subtype(registry, &format!("{type_scope}/{subtype}"), config, out);
    }
}

fn check_financing(scope: &str, terms: &FinancingTerms, out: &mut Collector) {
    let unit = Decimal::ZERO..=Decimal::ONE;
    if !unit.contains(&terms.debt_ratio) {
        out.push(scope, format!("debt ratio {} outside [0, 1]", terms.debt_ratio));
    }
    if !unit.contains(&terms.equity_ratio) {
        out.push(scope, format!("equity ratio {} outside [0, 1]", terms.equity_ratio));
    }
    if !is_unit_sum(terms.debt_ratio + terms.equity_ratio) {
        out.push(scope, "debt and equity ratios do not sum to 1.0");
    }
    if terms.interest_rate < Decimal::ZERO || terms.interest_rate > max_interest_rate() {
        out.push(
            scope,
            format!("interest rate {} outside [0, 0.25]", terms.interest_rate),
        );
    }
    if terms.debt_ratio > Decimal::ZERO && terms.amortization_years == 0 {
        out.push(scope, "amortization years must be positive when debt is carried");
    }
    if terms.target_dscr <= Decimal::ZERO {
        out.push(scope, "target DSCR must be positive");
    }
}

fn check_subtype(registry: &Registry, scope: &str, config: &BuildingConfig, out: &mut Collector) {
    if config.base_cost_per_sf <= Decimal::ZERO {
        out.push(scope, "base cost per square foot must be positive");
    }

    let trade_total = config.trades.total();
    if !is_unit_sum(trade_total) {
        out.push(scope, format!("trade shares sum to {trade_total}, expected 1.0"));
    }
    for trade in Trade::ALL {
        if config.trades.share(trade) < Decimal::ZERO {
            out.push(scope, format!("trade share {} is negative", trade.as_str()));
        }
    }

    let classes = &config.project_class_multipliers;
    for (name, value) in [
        ("ground_up", classes.ground_up),
        ("addition", classes.addition),
        ("renovation", classes.renovation),
        ("tenant_improvement", classes.tenant_improvement),
    ] {
        if value <= Decimal::ZERO {
            out.push(scope, format!("project class multiplier {name} must be positive"));
        }
    }

    if let Some(clamp) = &config.cost_clamp {
        if clamp.min_cost_per_sf >= clamp.max_cost_per_sf {
            out.push(scope, "cost clamp minimum must be below maximum");
        }
    }

    if let Some(mix) = &config.mixed_use {
        if mix.components.len() < 2 {
            out.push(scope, "mixed-use profile needs at least two components");
        }
        let mut seen = BTreeSet::new();
        for c in &mix.components {
            if !seen.insert(c.component) {
                out.push(scope, format!("duplicate component {}", c.component.as_str()));
            }
        }
        let declared: Vec<Decimal> = mix
            .components
            .iter()
            .filter_map(|c| c.default_share)
            .collect();
        if !declared.is_empty() {
            if declared.len() != mix.components.len() {
                out.push(scope, "default shares must be declared for all components or none");
            } else if declared.iter().copied().sum::<Decimal>() != Decimal::ONE_HUNDRED {
                out.push(scope, "default component shares must sum to 100");
            }
        }
        if Component::ALL.iter().all(|c| !mix.supports(*c)) {
            out.push(scope, "mixed-use profile declares no components");
        }
    }

    if registry.scope_profile(&config.scope_profile).is_none() {
        out.push(
            scope,
            format!("scope profile {} is not registered", config.scope_profile),
        );
    }

    if let Some(tile_profile) = &config.dealshield_tile_profile {
        if registry.tile_profile(tile_profile).is_none() {
            out.push(scope, format!("tile profile {tile_profile} is not registered"));
        }
    }

    let financial = &config.financial;
    if financial.revenue_per_unit < Decimal::ZERO {
        out.push(scope, "revenue per unit must not be negative");
    }
    if let Some(cap) = financial.cap_rate {
        if cap <= Decimal::ZERO || cap >= Decimal::ONE {
            out.push(scope, format!("cap rate {cap} outside (0, 1)"));
        }
    }
    if registry.valuation_supported(&financial.asset_class) && financial.cap_rate.is_none() {
        out.push(
            scope,
            format!(
                "asset class {} supports valuation but no cap rate is declared",
                financial.asset_class
            ),
        );
    }
}

fn check_tile_profile(profile: &TileProfile, out: &mut Collector) {
    let scope = format!("tile_profile:{}", profile.id);

    let mut ids = BTreeSet::new();
    for tile in &profile.tiles {
        if !ids.insert(tile.tile_id.as_str()) {
            out.push(&scope, format!("duplicate tile id {}", tile.tile_id));
        }
        if !is_known_metric(&tile.metric_ref) {
            out.push(
                &scope,
                format!("tile {} references unknown metric {}", tile.tile_id, tile.metric_ref),
            );
        }
        if tile.is_driver() {
            if Driver::from_metric_ref(&tile.metric_ref).is_none() {
                out.push(
                    &scope,
                    format!(
                        "tile {} transforms {} which is not a scenario driver",
                        tile.tile_id, tile.metric_ref
                    ),
                );
            }
            for t in tile.transform_chain() {
                if !t.is_adverse(tile.adverse) {
                    out.push(
                        &scope,
                        format!("tile {} transform is not adverse in its declared direction", tile.tile_id),
                    );
                }
            }
        }
    }

    let mut row_ids = BTreeSet::new();
    for row in &profile.rows {
        if row.row_id == costscope_models::dealshield::BASE_SCENARIO {
            out.push(&scope, "row id 'base' is reserved");
        }
        if !row_ids.insert(row.row_id.as_str()) {
            out.push(&scope, format!("duplicate row id {}", row.row_id));
        }
        for tile_id in row.stress_tiles() {
            match profile.tile(tile_id) {
                None => out.push(
                    &scope,
                    format!("row {} references unknown tile {tile_id}", row.row_id),
                ),
                Some(tile) if !tile.is_driver() => out.push(
                    &scope,
                    format!("row {} applies tile {tile_id} which has no transform", row.row_id),
                ),
                Some(_) => {}
            }
        }
    }

    for required in [CONSERVATIVE_ROW, UGLY_ROW] {
        if profile.row(required).is_none() {
            out.push(&scope, format!("missing required row {required}"));
        }
    }

    if let (Some(conservative), Some(ugly)) = (profile.row(CONSERVATIVE_ROW), profile.row(UGLY_ROW))
    {
        let ugly_tiles: BTreeSet<&str> = ugly.stress_tiles().collect();
        for tile_id in conservative.stress_tiles() {
            if !ugly_tiles.contains(tile_id) {
                out.push(
                    &scope,
                    format!("ugly row does not stress conservative tile {tile_id}"),
                );
            }
        }
    }
}

fn check_content_profile(registry: &Registry, content: &ContentProfile, out: &mut Collector) {
    let scope = format!("content_profile:{}", content.id);
    let Some(profile) = registry.tile_profile(&content.tile_profile_id) else {
        out.push(
            &scope,
            format!("bound tile profile {} is not registered", content.tile_profile_id),
        );
        return;
    };
    for (section, tile_id) in content.tile_refs() {
        if profile.tile(tile_id).is_none() {
            out.push(
                &scope,
                format!("{section} references tile {tile_id} missing from {}", profile.id),
            );
        }
    }
}

fn check_policy(registry: &Registry, policy: &DecisionPolicy, out: &mut Collector) {
    let scope = format!("decision_policy:{}", policy.id);
    let Some(profile) = registry.tile_profile(&policy.tile_profile_id) else {
        out.push(
            &scope,
            format!("bound tile profile {} is not registered", policy.tile_profile_id),
        );
        return;
    };

    match profile.tile(&policy.primary_control.tile_id) {
        None => out.push(
            &scope,
            format!(
                "primary control tile {} missing from {}",
                policy.primary_control.tile_id, profile.id
            ),
        ),
        Some(tile) if tile.metric_ref != policy.primary_control.metric_ref => out.push(
            &scope,
            format!(
                "primary control metric {} does not match tile metric {}",
                policy.primary_control.metric_ref, tile.metric_ref
            ),
        ),
        Some(_) => {}
    }

    if !is_known_metric(&policy.collapse_trigger.metric_ref) {
        out.push(
            &scope,
            format!(
                "collapse trigger references unknown metric {}",
                policy.collapse_trigger.metric_ref
            ),
        );
    }

    let flex = &policy.flex_calibration;
    if flex.tight_max < Decimal::ZERO || flex.tight_max >= flex.moderate_max {
        out.push(&scope, "flex calibration requires 0 <= tight_max < moderate_max");
    }
}
