//! End-to-end calculations against the builtin registry.

use std::sync::Arc;

use costscope_engine::test_support::{
    builtin_engine, mixed_use_described, mixed_use_with_split, nashville_office, request,
};
use costscope_engine::{Engine, EngineError, MAX_SQUARE_FOOTAGE};
use costscope_models::building::Trade;
use costscope_models::config::EngineConfig;
use costscope_models::dealshield::BASE_SCENARIO;
use costscope_models::metric::MetricSource;
use costscope_models::mixed_use::{Component, InvalidMixReason, MixPatternKind, MixSource};
use costscope_models::request::FinishLevel;
use costscope_models::result::{ConfigSource, TraceLevel};
use costscope_models::ProjectRequest;
use costscope_registry::loader::{load_sources, BUILTIN_SOURCES};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn nashville_class_a_office() {
    let engine = builtin_engine().unwrap();
    let result = engine.calculate(&nashville_office()).unwrap();

    assert_eq!(result.project_info.subtype, "class_a");
    assert_eq!(result.project_info.config_source, ConfigSource::Subtype);
    assert_eq!(result.project_info.state.as_deref(), Some("TN"));

    let costs = &result.construction_costs;
    assert_eq!(costs.regional_multiplier, dec!(0.97));
    assert_eq!(costs.adjusted_cost_per_sf, dec!(315.25));
    assert_eq!(costs.construction_total, dec!(26796250.00));
    assert_eq!(costs.hard_costs, dec!(26796250.00));
    assert_eq!(costs.soft_costs_total, dec!(4823325.00));
    assert_eq!(costs.total_project_cost, dec!(31619575.00));
    assert_eq!(costs.cost_per_sf, dec!(372.00));

    assert_eq!(result.trade_breakdown.structural, dec!(7502950.00));
    assert_eq!(result.trade_breakdown.finishes, dec!(6967025.00));
    assert_eq!(result.trade_breakdown.total(), costs.construction_total);

    let revenue = &result.revenue_analysis;
    assert_eq!(revenue.regional_multiplier, dec!(1.06));
    assert_eq!(revenue.unit_count, dec!(74800));
    assert_eq!(revenue.annual_revenue, dec!(3330096.00));
    assert_eq!(revenue.net_income, dec!(2367443.12));

    assert_eq!(result.return_metrics.property_value, Some(dec!(35073231.41)));
    assert_eq!(result.return_metrics.yield_on_cost, Some(dec!(0.0749)));
    assert_eq!(result.return_metrics.payback_period, Some(dec!(13.36)));
    assert!(result.return_metrics.irr.is_some());

    let debt = &result.ownership_analysis.debt_metrics;
    assert_eq!(debt.debt_amount, dec!(20552723.75));
    assert_eq!(debt.calculated_dscr, Some(dec!(1.37)));
    assert!(debt.meets_target);

    assert_eq!(result.warnings().count(), 0);
}

#[test]
fn trades_and_scope_reconcile_for_every_subtype() {
    let engine = builtin_engine().unwrap();
    let registry = engine.registry().clone();
    for building_type in registry.building_types() {
        for (subtype, config) in &building_type.subtypes {
            let scope_profile = registry.scope_profile(&config.scope_profile).unwrap();
            let req = ProjectRequest {
                floors: 4,
                ..request(
                    &building_type.building_type,
                    Some(subtype.as_str()),
                    dec!(47250),
                    "Dallas, TX",
                )
            };
            let result = engine.calculate(&req).unwrap();
            let costs = &result.construction_costs;

            assert_eq!(result.trade_breakdown.total(), costs.construction_total);
            for trade in Trade::ALL {
                let scope = result.scope_for(trade).unwrap();
                assert_eq!(scope.systems_total(), result.trade_breakdown.get(trade));
                let authored = scope_profile.items(trade);
                assert!(!authored.is_empty(), "{subtype}/{trade:?}");
                assert_eq!(scope.systems.len(), authored.len(), "{subtype}/{trade:?}");
                for (system, item) in scope.systems.iter().zip(authored) {
                    assert_eq!(system.key, item.key);
                }
            }
            assert_eq!(costs.hard_costs, costs.construction_total);
            assert_eq!(
                costs.total_project_cost,
                costs.hard_costs + costs.soft_costs_total
            );
        }
    }
}

/// The builtin registry with class A office trade shares summing to 1.30.
fn engine_with_overallocated_trades() -> Engine {
    let sources: Vec<(String, String)> = BUILTIN_SOURCES
        .iter()
        .map(|(path, contents)| {
            let contents = if *path == "buildings/office.toml" {
                contents.replace(
                    "trades = { structural = 0.28, mechanical = 0.24",
                    "trades = { structural = 0.58, mechanical = 0.24",
                )
            } else {
                contents.to_string()
            };
            (path.to_string(), contents)
        })
        .collect();
    let registry =
        load_sources(sources.iter().map(|(p, c)| (p.as_str(), c.as_str()))).unwrap();
    Engine::new(Arc::new(registry), EngineConfig::default())
}

#[test]
fn trade_shares_off_unity_are_warned() {
    let engine = engine_with_overallocated_trades();
    let result = engine.calculate(&nashville_office()).unwrap();

    let warning = result.trace_step("trade_shares_warning").unwrap();
    assert_eq!(warning.level, TraceLevel::Warning);
    assert_eq!(warning.data["residual_trade"], "finishes");
    let total: Decimal = warning.data["shares_total"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, dec!(1.30));

    // Finishes absorbs the over-allocation, which the warning explains.
    assert_eq!(result.trade_breakdown.finishes, dec!(-1071850.00));
    assert_eq!(
        result.trade_breakdown.total(),
        result.construction_costs.construction_total
    );

    let clean = builtin_engine().unwrap().calculate(&nashville_office()).unwrap();
    assert!(clean.trace_step("trade_shares_warning").is_none());
}

#[test]
fn unknown_subtype_uses_declared_baseline() {
    let engine = builtin_engine().unwrap();
    let result = engine
        .calculate(&request("office", Some("class_z"), dec!(40000), "Atlanta, GA"))
        .unwrap();
    assert_eq!(result.project_info.subtype, "class_b");
    assert_eq!(
        result.project_info.config_source,
        ConfigSource::BuildingTypeBaseline
    );
    assert_eq!(
        result.trace_step("config_resolved").unwrap().data["source"],
        "building_type_baseline"
    );
}

#[test]
fn unknown_building_type_is_fatal() {
    let engine = builtin_engine().unwrap();
    let err = engine
        .calculate(&request("spaceport", None, dec!(1000), "Austin, TX"))
        .unwrap_err();
    assert!(err.is_client_error());
}

#[test]
fn invalid_requests_are_rejected() {
    let engine = builtin_engine().unwrap();
    let zero = request("office", None, dec!(0), "Austin, TX");
    assert!(matches!(
        engine.calculate(&zero),
        Err(EngineError::InvalidRequest(_))
    ));

    let no_floors = ProjectRequest {
        floors: 0,
        ..request("office", None, dec!(1000), "Austin, TX")
    };
    assert!(matches!(
        engine.calculate(&no_floors),
        Err(EngineError::InvalidRequest(_))
    ));
}

#[test]
fn oversized_inputs_are_rejected_not_overflowed() {
    let engine = builtin_engine().unwrap();

    let huge = request("office", Some("class_a"), Decimal::MAX, "Nashville, TN");
    let err = engine.calculate(&huge).unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(ref m) if m.contains("must not exceed")));
    assert!(err.is_client_error());

    let largest = ProjectRequest {
        floors: 120,
        ..request(
            "office",
            Some("class_a"),
            Decimal::from(MAX_SQUARE_FOOTAGE),
            "Nashville, TN",
        )
    };
    let result = engine.calculate(&largest).unwrap();
    assert_eq!(
        result.trade_breakdown.total(),
        result.construction_costs.construction_total
    );

    let result = engine
        .calculate(&mixed_use_with_split(&[
            ("office", Decimal::MAX),
            ("residential", Decimal::MAX),
        ]))
        .unwrap();
    let split = result.mixed_use_split.as_ref().unwrap();
    assert_eq!(split.source, MixSource::Default);
    assert!(result.trace_step("invalid_mix_warning").is_some());
}

#[test]
fn city_only_location_warns_and_uses_override() {
    let engine = builtin_engine().unwrap();
    let result = engine
        .calculate(&request("office", Some("class_a"), dec!(85000), "Nashville"))
        .unwrap();

    assert_eq!(result.construction_costs.regional_multiplier, dec!(0.98));
    assert_eq!(result.revenue_analysis.regional_multiplier, dec!(1.05));

    let warning = result.trace_step("regional_data_warning").unwrap();
    assert_eq!(warning.level, TraceLevel::Warning);
    assert_eq!(warning.data["reason"], "state_undetermined");
    assert_eq!(warning.data["fallback"], "city_only_override");
    assert_eq!(warning.data["cost_multiplier"], "0.98");
}

#[test]
fn unconfigured_state_falls_back_to_neutral_with_warning() {
    let engine = builtin_engine().unwrap();
    let result = engine
        .calculate(&request("office", Some("class_b"), dec!(30000), "Boise, ID"))
        .unwrap();
    assert_eq!(result.construction_costs.regional_multiplier, dec!(1));
    let warning = result.trace_step("regional_data_warning").unwrap();
    assert_eq!(warning.data["reason"], "state_not_configured");
}

#[test]
fn unsupported_mixed_use_component_falls_back_to_default() {
    let engine = builtin_engine().unwrap();
    let result = engine
        .calculate(&mixed_use_with_split(&[("unknownComponent", dec!(100))]))
        .unwrap();

    let split = result.mixed_use_split.as_ref().unwrap();
    assert_eq!(split.source, MixSource::Default);
    assert_eq!(split.share_of(Component::Office), dec!(50));
    assert_eq!(split.share_of(Component::Residential), dec!(50));
    assert_eq!(
        split.invalid_mix.as_ref().unwrap().reason,
        InvalidMixReason::UnsupportedComponent
    );

    let warning = result.trace_step("invalid_mix_warning").unwrap();
    assert_eq!(warning.level, TraceLevel::Warning);
    assert_eq!(warning.data["reason"], "unsupported_component");
}

#[test]
fn mixed_use_override_shifts_blended_cost() {
    let engine = builtin_engine().unwrap();
    let office_heavy = engine
        .calculate(&mixed_use_with_split(&[("office", dec!(80)), ("residential", dec!(20))]))
        .unwrap();
    let even = engine
        .calculate(&mixed_use_with_split(&[("office", dec!(50)), ("residential", dec!(50))]))
        .unwrap();

    let split = office_heavy.mixed_use_split.as_ref().unwrap();
    assert_eq!(split.source, MixSource::Override);
    assert!(split.invalid_mix.is_none());
    assert!(
        office_heavy.construction_costs.component_multiplier
            > even.construction_costs.component_multiplier
    );
    assert!(
        office_heavy.construction_costs.total_project_cost
            > even.construction_costs.total_project_cost
    );
}

#[test]
fn description_hint_is_detected() {
    let engine = builtin_engine().unwrap();
    let result = engine
        .calculate(&mixed_use_described("Mostly residential with ground floor office"))
        .unwrap();
    let split = result.mixed_use_split.as_ref().unwrap();
    assert_eq!(split.source, MixSource::Detected);
    assert_eq!(split.pattern, Some(MixPatternKind::Mostly));
    assert_eq!(split.share_of(Component::Residential), dec!(70));
    assert_eq!(split.share_of(Component::Office), dec!(30));
}

#[test]
fn mixed_use_override_on_single_use_subtype_is_ignored() {
    let engine = builtin_engine().unwrap();
    let base = nashville_office();
    let with_override = ProjectRequest {
        overrides: mixed_use_with_split(&[("office", dec!(100))]).overrides,
        ..base.clone()
    };
    let result = engine.calculate(&with_override).unwrap();
    assert!(result.mixed_use_split.is_none());
    assert!(result.trace_step("mixed_use_ignored").is_some());
    assert_eq!(
        result.construction_costs.total_project_cost,
        engine.calculate(&base).unwrap().construction_costs.total_project_cost
    );
}

#[test]
fn per_unit_features_do_not_scale_with_area() {
    let engine = builtin_engine().unwrap();
    let feature = |sf: Decimal| {
        let req = ProjectRequest {
            special_features: vec!["backup_generator".to_string()],
            ..request("office", Some("class_a"), sf, "Boulder, CO")
        };
        let result = engine.calculate(&req).unwrap();
        let costs = result.construction_costs;
        assert_eq!(
            costs.hard_costs,
            costs.construction_total + costs.special_features_total
        );
        costs.special_features_total
    };
    assert_eq!(feature(dec!(20000)), feature(dec!(200000)));
    // 850,000 × 1.04 (Colorado)
    assert_eq!(feature(dec!(20000)), dec!(884000.00));
}

#[test]
fn unknown_feature_is_warned_and_skipped() {
    let engine = builtin_engine().unwrap();
    let req = ProjectRequest {
        special_features: vec!["Helipad".to_string(), "green roof".to_string()],
        ..nashville_office()
    };
    let result = engine.calculate(&req).unwrap();
    assert_eq!(result.construction_costs.special_features.len(), 1);
    assert_eq!(
        result.construction_costs.special_features[0].feature,
        "green_roof"
    );
    assert_eq!(
        result.trace_step("special_feature_warning").unwrap().data["feature"],
        "helipad"
    );
}

#[test]
fn restaurant_has_no_valuation() {
    let engine = builtin_engine().unwrap();
    let result = engine
        .calculate(&request("restaurant", Some("full_service"), dec!(6500), "Memphis, TN"))
        .unwrap();
    let returns = &result.return_metrics;
    assert!(!returns.valuation_supported);
    assert_eq!(returns.property_value, None);
    assert_eq!(returns.yield_on_cost, None);
    assert_eq!(returns.irr, None);
    assert_eq!(
        result.trace_step("valuation_skipped").unwrap().data["reason"],
        "asset_class_not_supported"
    );
}

#[test]
fn luxury_quick_service_is_clamped() {
    let engine = builtin_engine().unwrap();
    let req = ProjectRequest {
        finish_level: Some(FinishLevel::Luxury),
        ..request("restaurant", Some("quick_service"), dec!(3200), "San Francisco, CA")
    };
    let result = engine.calculate(&req).unwrap();
    assert!(result.construction_costs.clamp_applied);
    assert_eq!(result.construction_costs.adjusted_cost_per_sf, dec!(550));
    let entry = result.trace_step("cost_clamp_applied").unwrap();
    assert_eq!(entry.level, TraceLevel::Warning);
    assert_eq!(entry.data["unclamped_cost_per_sf"], "805.14");
}

#[test]
fn government_restaurant_carries_no_debt() {
    let engine = builtin_engine().unwrap();
    let req = ProjectRequest {
        ownership_type: costscope_models::OwnershipType::Government,
        ..request("restaurant", Some("full_service"), dec!(6500), "Memphis, TN")
    };
    let result = engine.calculate(&req).unwrap();
    let debt = &result.ownership_analysis.debt_metrics;
    assert_eq!(debt.debt_amount, dec!(0));
    assert_eq!(debt.annual_debt_service, dec!(0));
    assert_eq!(debt.calculated_dscr, None);
}

#[test]
fn base_snapshot_matches_result() {
    let engine = builtin_engine().unwrap();
    let result = engine.calculate(&nashville_office()).unwrap();
    let scenarios = result.dealshield_scenarios.as_ref().unwrap();
    let base = &scenarios.scenarios[BASE_SCENARIO];

    for path in [
        "construction_costs.hard_costs",
        "construction_costs.total_project_cost",
        "revenue_analysis.annual_revenue",
        "revenue_analysis.net_income",
        "return_metrics.property_value",
        "return_metrics.yield_on_cost",
        "return_metrics.irr",
        "ownership_analysis.debt_metrics.annual_debt_service",
        "ownership_analysis.debt_metrics.calculated_dscr",
    ] {
        assert_eq!(base.metric(path), result.metric(path), "{path}");
    }
    assert!(base.drivers.is_empty());
    assert_eq!(
        scenarios.provenance.row_order,
        vec!["conservative", "ugly", "capital_markets"]
    );
}

#[test]
fn conservative_snapshot_recomputes_from_drivers() {
    let engine = builtin_engine().unwrap();
    let result = engine.calculate(&nashville_office()).unwrap();
    let scenarios = result.dealshield_scenarios.as_ref().unwrap();
    let conservative = &scenarios.scenarios["conservative"];

    assert_eq!(conservative.metrics.hard_costs, dec!(29475875.00));
    assert_eq!(conservative.metrics.total_project_cost, dec!(34781532.51));
    assert_eq!(conservative.metrics.net_income, dec!(2044423.81));
    assert_eq!(conservative.metrics.calculated_dscr, Some(dec!(1.07)));

    let overrun = &conservative.drivers[0];
    assert_eq!(overrun.tile_id, "hard_cost_overrun");
    assert_eq!(overrun.before, dec!(26796250.00));
    assert_eq!(overrun.after, dec!(29475875.00));
}

#[test]
fn dealshield_can_be_disabled() {
    let engine = builtin_engine().unwrap();
    let config = costscope_models::EngineConfig {
        dealshield: false,
        ..engine.config().clone()
    };
    let engine = costscope_engine::Engine::new(engine.registry().clone(), config);
    let result = engine.calculate(&nashville_office()).unwrap();
    assert!(result.dealshield_scenarios.is_none());
    assert_eq!(
        result.dealshield_tile_profile.as_deref(),
        Some("office_dealshield_v1")
    );
}

#[test]
fn repeated_calculations_are_identical() {
    let engine = builtin_engine().unwrap();
    let req = nashville_office();
    let first = engine.calculate(&req).unwrap().without_timestamp();
    for _ in 0..2 {
        assert_eq!(engine.calculate(&req).unwrap().without_timestamp(), first);
    }

    let outputs: Vec<serde_json::Value> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..3)
            .map(|_| s.spawn(|| engine.calculate(&req).unwrap().without_timestamp()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for output in outputs {
        assert_eq!(output, first);
    }
}

#[test]
fn request_json_round_trips_through_engine() {
    let json = r#"{
        "building_type": "multifamily",
        "subtype": "luxury_apartments",
        "square_footage": "120000",
        "location": "Charlotte, NC",
        "project_class": "ground_up",
        "floors": 8,
        "ownership_type": "for_profit",
        "finish_level": "premium"
    }"#;
    let req: ProjectRequest = serde_json::from_str(json).unwrap();
    let engine = builtin_engine().unwrap();
    let result = engine.calculate(&req).unwrap();
    // 0.00095 units/sf, floored
    assert_eq!(result.revenue_analysis.unit_count, dec!(114));
    assert_eq!(result.project_info.finish_level, FinishLevel::Premium);
}
