use std::sync::Arc;

use chrono::Utc;
use costscope_models::building::Trade;
use costscope_models::config::EngineConfig;
use costscope_models::dealshield::ScenarioTable;
use costscope_models::request::ProjectRequest;
use costscope_models::result::{
    CalculationResult, ConstructionCosts, OwnershipAnalysis, ProjectInfo, ReturnMetrics,
    RevenueAnalysis, OUTPUT_SCHEMA_VERSION,
};
use costscope_models::scope::TradeScope;
use costscope_registry::validate::share_epsilon;
use costscope_registry::Registry;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info};

use crate::allocator::{allocate_trade, reconcile, QuantityContext};
use crate::costs::{adjusted_cost_per_sf, normalize_feature, price_features};
use crate::dealshield::{build_scenario_table, ProfileBindings};
use crate::error::EngineError;
use crate::financials::{unit_count, FinancialModel, Stress};
use crate::mixed_use::resolve_split;
use crate::money::cents;
use crate::parser::detect_mix;
use crate::regional;
use crate::scenarios::build_scenarios;
use crate::trace::{Trace, Warning};
use crate::trades::allocate_trades;

/// The calculation engine. Holds no per-request state; one instance can serve
/// any number of threads.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<Registry>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(registry: Arc<Registry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Produce the full, reconciled result for one request.
    pub fn calculate(&self, request: &ProjectRequest) -> Result<CalculationResult, EngineError> {
        validate_request(request)?;
        info!(
            building_type = %request.building_type,
            subtype = ?request.subtype,
            square_footage = %request.square_footage,
            "Starting calculation"
        );

        let registry = &self.registry;
        let mut trace = Trace::new();

        // 1. Configuration
        let resolved = registry.get_config(&request.building_type, request.subtype.as_deref())?;
        let building_type = resolved.building_type;
        let config = resolved.config;
        trace.info(
            "config_resolved",
            json!({
                "building_type": building_type.building_type,
                "requested_subtype": request.subtype,
                "subtype": resolved.subtype,
                "source": resolved.source.as_str(),
            }),
        );

        // 2. Regional multipliers
        let region = regional::resolve(&request.location, &building_type.regional, registry.regions());
        trace.info(
            "regional_multiplier",
            json!({
                "location": request.location,
                "source": region.source.as_str(),
                "cost_multiplier": region.factor.cost,
                "revenue_multiplier": region.factor.revenue,
            }),
        );
        if let Some(warning) = region.warning.clone() {
            trace.warning(Warning::RegionalData(warning));
        }

        // 3. Class and finish
        let class_multiplier = config.project_class_multipliers.get(request.project_class);
        trace.info(
            "project_class_multiplier",
            json!({
                "project_class": request.project_class.as_str(),
                "multiplier": class_multiplier,
            }),
        );
        let finish_level = request.finish_level();
        let finish_multiplier = building_type.finish_multipliers.get(finish_level);
        trace.info(
            "finish_multiplier",
            json!({
                "finish_level": finish_level.as_str(),
                "multiplier": finish_multiplier,
            }),
        );

        // 4. Mixed-use split
        let mix = match &config.mixed_use {
            Some(profile) => {
                let hint = request
                    .source_description()
                    .and_then(|d| detect_mix(d, &registry.settings().mixed_use));
                let mix = resolve_split(profile, request.mixed_use_override(), hint.as_ref());
                if let Some(invalid) = mix.split.invalid_mix.clone() {
                    trace.warning(Warning::InvalidMix(invalid));
                }
                trace.info(
                    "mixed_use_split",
                    json!({
                        "source": mix.split.source,
                        "pattern": mix.split.pattern,
                        "value": mix.split.value,
                        "normalization_applied": mix.split.normalization_applied,
                        "inference_applied": mix.split.inference_applied,
                        "cost_factor": mix.cost_factor,
                        "revenue_factor": mix.revenue_factor,
                    }),
                );
                Some(mix)
            }
            None => {
                if request.mixed_use_override().is_some() {
                    trace.info(
                        "mixed_use_ignored",
                        json!({ "subtype": resolved.subtype }),
                    );
                }
                None
            }
        };
        let component_multiplier = mix.as_ref().map_or(Decimal::ONE, |m| m.cost_factor);
        let revenue_factor = mix.as_ref().map_or(Decimal::ONE, |m| m.revenue_factor);

        // 5. Construction cost
        let rate = adjusted_cost_per_sf(
            config.base_cost_per_sf,
            &[
                region.factor.cost,
                class_multiplier,
                finish_multiplier,
                component_multiplier,
            ],
            config.cost_clamp.as_ref(),
            &mut trace,
        );
        let construction_total = cents(rate.cost_per_sf * request.square_footage);
        trace.info(
            "construction_total",
            json!({
                "adjusted_cost_per_sf": rate.cost_per_sf,
                "square_footage": request.square_footage,
                "construction_total": construction_total,
            }),
        );

        let features = price_features(
            &request.special_features,
            config,
            request.square_footage,
            region.factor.cost,
            &mut trace,
        );
        let special_features_total: Decimal = features.iter().map(|f| f.amount).sum();
        if !features.is_empty() {
            trace.info(
                "special_features",
                json!({
                    "features": features.iter().map(|f| &f.feature).collect::<Vec<_>>(),
                    "total": special_features_total,
                }),
            );
        }
        let hard_costs = construction_total + special_features_total;

        // 6. Trades and scope
        let share_total = config.trades.total();
        if (share_total - Decimal::ONE).abs() > share_epsilon() {
            trace.warning(Warning::TradeShares {
                total: share_total,
                residual_trade: Trade::Finishes.as_str(),
            });
        }
        let trade_breakdown = allocate_trades(construction_total, &config.trades);
        trace.info(
            "trade_allocation",
            json!({ "construction_total": construction_total, "trades": trade_breakdown }),
        );

        let scope_profile = registry
            .scope_profile(&config.scope_profile)
            .ok_or_else(|| EngineError::ScopeProfileNotFound(config.scope_profile.clone()))?;
        let ctx = QuantityContext {
            square_footage: request.square_footage,
            floors: request.floors,
        };
        let scope_items: Vec<TradeScope> = Trade::ALL
            .iter()
            .map(|t| allocate_trade(*t, trade_breakdown.get(*t), scope_profile.items(*t), ctx))
            .collect();
        reconcile(
            construction_total,
            &trade_breakdown,
            &scope_items,
            self.config.reconciliation_epsilon,
        )?;
        trace.info(
            "scope_reconciliation",
            json!({
                "profile": scope_profile.id,
                "items": scope_items.iter().map(|s| s.systems.len()).sum::<usize>(),
            }),
        );

        // 7. Financial model
        let financial = &config.financial;
        let valuation_supported = registry.valuation_supported(&financial.asset_class);
        let cap_rate = financial.cap_rate.filter(|_| valuation_supported);
        let units = unit_count(&financial.unit_rule, request.square_footage);
        let revenue_per_unit = cents(financial.revenue_per_unit * revenue_factor);
        let terms = building_type.financing.get(request.ownership_type);

        let model = FinancialModel {
            hard_costs,
            soft_cost_lines: &building_type.soft_costs,
            square_footage: request.square_footage,
            unit_count: units,
            revenue_per_unit,
            revenue_multiplier: region.factor.revenue,
            operating_expenses: &financial.operating_expenses,
            cap_rate,
            hold_years: financial.hold_years,
            financing: terms,
        };
        let base = model.evaluate(&Stress::none())?;

        trace.info(
            "soft_costs",
            json!({
                "hard_costs": base.hard_costs,
                "soft_costs_total": base.soft_costs_total,
                "total_project_cost": base.total_project_cost,
            }),
        );
        trace.info(
            "revenue",
            json!({
                "unit_count": units,
                "revenue_per_unit": revenue_per_unit,
                "revenue_multiplier": region.factor.revenue,
                "annual_revenue": base.annual_revenue,
                "net_income": base.net_income,
            }),
        );
        if cap_rate.is_some() {
            trace.info(
                "return_metrics",
                json!({
                    "cap_rate": base.cap_rate,
                    "property_value": base.property_value,
                    "yield_on_cost": base.yield_on_cost,
                    "irr": base.irr,
                }),
            );
        } else {
            let reason = if valuation_supported {
                "no_cap_rate_configured"
            } else {
                "asset_class_not_supported"
            };
            trace.info(
                "valuation_skipped",
                json!({ "asset_class": financial.asset_class, "reason": reason }),
            );
        }
        trace.info(
            "ownership_financing",
            json!({
                "ownership_type": request.ownership_type.as_str(),
                "debt_amount": base.debt.debt_amount,
                "annual_debt_service": base.debt.annual_debt_service,
                "calculated_dscr": base.debt.calculated_dscr,
            }),
        );

        // 8. DealShield snapshots
        let dealshield_scenarios = match (&config.dealshield_tile_profile, self.config.dealshield) {
            (Some(profile_id), true) => {
                let profile = registry
                    .tile_profile(profile_id)
                    .ok_or_else(|| EngineError::TileProfileNotFound(profile_id.clone()))?;
                let scenarios = build_scenarios(
                    profile,
                    registry.content_for(profile_id).map(|c| c.id.as_str()),
                    registry.policy_for(profile_id),
                    &model,
                    &base,
                )?;
                trace.info(
                    "dealshield_scenarios",
                    json!({
                        "profile_id": profile_id,
                        "rows": scenarios.provenance.row_order,
                    }),
                );
                Some(scenarios)
            }
            _ => None,
        };

        let total_project_cost = base.total_project_cost;
        let mut special_features: Vec<String> = Vec::new();
        for raw in &request.special_features {
            let name = normalize_feature(raw);
            if !name.is_empty() && !special_features.contains(&name) {
                special_features.push(name);
            }
        }

        let result = CalculationResult {
            schema_version: OUTPUT_SCHEMA_VERSION,
            project_info: ProjectInfo {
                building_type: building_type.building_type.clone(),
                requested_subtype: request.subtype.clone(),
                subtype: resolved.subtype.to_string(),
                config_source: resolved.source,
                display_name: config.display_name.clone(),
                square_footage: request.square_footage,
                floors: request.floors,
                location: request.location.clone(),
                city: region.location.city.clone(),
                state: region.location.state.clone(),
                project_class: request.project_class,
                ownership_type: request.ownership_type,
                finish_level,
                special_features,
            },
            construction_costs: ConstructionCosts {
                base_cost_per_sf: config.base_cost_per_sf,
                regional_multiplier: region.factor.cost,
                project_class_multiplier: class_multiplier,
                finish_multiplier,
                component_multiplier,
                adjusted_cost_per_sf: rate.cost_per_sf,
                clamp_applied: rate.clamp_applied,
                construction_total,
                special_features: features,
                special_features_total,
                hard_costs: base.hard_costs,
                soft_costs: base.soft_costs.clone(),
                soft_costs_total: base.soft_costs_total,
                total_project_cost,
                cost_per_sf: cents(total_project_cost / request.square_footage),
            },
            trade_breakdown,
            scope_items,
            revenue_analysis: RevenueAnalysis {
                primary_unit: financial.primary_unit.clone(),
                unit_count: units,
                revenue_per_unit,
                regional_multiplier: region.factor.revenue,
                annual_revenue: base.annual_revenue,
                operating_expenses: base.operating_expenses.clone(),
                total_operating_expenses: base.total_operating_expenses,
                net_income: base.net_income,
            },
            return_metrics: ReturnMetrics {
                asset_class: financial.asset_class.clone(),
                valuation_supported,
                cap_rate: base.cap_rate,
                property_value: base.property_value,
                yield_on_cost: base.yield_on_cost,
                irr: base.irr,
                payback_period: base.payback_period,
            },
            ownership_analysis: OwnershipAnalysis {
                ownership_type: request.ownership_type,
                debt_metrics: base.debt.clone(),
            },
            mixed_use_split: mix.map(|m| m.split),
            dealshield_tile_profile: config.dealshield_tile_profile.clone(),
            dealshield_scenarios,
            sensitivity_analysis: None,
            calculation_trace: trace.into_entries(),
            generated_at: Utc::now(),
        };

        info!(
            subtype = %result.project_info.subtype,
            total_project_cost = %result.construction_costs.total_project_cost,
            warnings = result.warnings().count(),
            "Calculation complete"
        );
        Ok(result)
    }

    /// Render the DealShield table for a result using the profile it is bound to.
    pub fn scenario_table(
        &self,
        request_id: &str,
        result: &CalculationResult,
    ) -> Result<ScenarioTable, EngineError> {
        let profile_id = result.dealshield_tile_profile.as_deref().ok_or_else(|| {
            EngineError::InvalidRequest(format!(
                "{}/{} is not bound to a DealShield tile profile",
                result.project_info.building_type, result.project_info.subtype
            ))
        })?;
        let profile = self
            .registry
            .tile_profile(profile_id)
            .ok_or_else(|| EngineError::TileProfileNotFound(profile_id.to_string()))?;
        let bindings = ProfileBindings {
            content: self.registry.content_for(profile_id),
            policy: self.registry.policy_for(profile_id),
        };
        debug!(request_id, profile_id, "Building scenario table");
        build_scenario_table(request_id, result, profile, bindings)
    }
}

/// Largest accepted building area, in square feet. Every area-scaled amount
/// stays far inside `Decimal` range below it.
pub const MAX_SQUARE_FOOTAGE: u32 = 100_000_000;

fn validate_request(request: &ProjectRequest) -> Result<(), EngineError> {
    if request.building_type.trim().is_empty() {
        return Err(EngineError::InvalidRequest(
            "building_type is required".to_string(),
        ));
    }
    if request.square_footage <= Decimal::ZERO {
        return Err(EngineError::InvalidRequest(format!(
            "square_footage must be positive, got {}",
            request.square_footage
        )));
    }
    if request.square_footage > Decimal::from(MAX_SQUARE_FOOTAGE) {
        return Err(EngineError::InvalidRequest(format!(
            "square_footage must not exceed {MAX_SQUARE_FOOTAGE}, got {}",
            request.square_footage
        )));
    }
    if request.floors == 0 {
        return Err(EngineError::InvalidRequest(
            "floors must be at least 1".to_string(),
        ));
    }
    Ok(())
}
