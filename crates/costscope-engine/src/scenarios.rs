//! DealShield scenario snapshots.
//!
//! Each derived row is evaluated by re-running the financial model with the
//! row's driver tiles applied as stress, so every snapshot is internally
//! consistent with the base result.

use std::collections::BTreeMap;

use costscope_models::dealshield::{DecisionPolicy, TileProfile, BASE_SCENARIO};
use costscope_models::metric::MetricSource;
use costscope_models::result::{
    DealShieldScenarios, DriverApplication, ScenarioProvenance, ScenarioSnapshot,
};
use tracing::debug;

use crate::decision_insurance;
use crate::error::EngineError;
use crate::financials::{Evaluation, FinancialModel, Stress};

pub fn build_scenarios(
    profile: &TileProfile,
    content_profile_id: Option<&str>,
    policy: Option<&DecisionPolicy>,
    model: &FinancialModel<'_>,
    base: &Evaluation,
) -> Result<DealShieldScenarios, EngineError> {
    let base_metrics = base.key_metrics();
    let mut scenarios = BTreeMap::new();
    scenarios.insert(
        BASE_SCENARIO.to_string(),
        ScenarioSnapshot {
            scenario_id: BASE_SCENARIO.to_string(),
            label: "Base".to_string(),
            drivers: Vec::new(),
            metrics: base_metrics.clone(),
        },
    );

    for row in &profile.rows {
        let mut stress = Stress::none();
        let mut stressed_tiles = Vec::new();
        for tile_id in row.stress_tiles() {
            let tile = profile
                .tile(tile_id)
                .ok_or_else(|| EngineError::MetricResolution {
                    tile_id: tile_id.to_string(),
                    metric_ref: String::new(),
                    reason: format!("row {} names an undeclared tile", row.row_id),
                })?;
            if !stress.push(tile) {
                return Err(EngineError::MetricResolution {
                    tile_id: tile.tile_id.clone(),
                    metric_ref: tile.metric_ref.clone(),
                    reason: format!("row {} stresses a metric that is not a driver", row.row_id),
                });
            }
            stressed_tiles.push(tile);
        }

        let metrics = model.evaluate(&stress)?.key_metrics();

        let mut drivers = Vec::with_capacity(stressed_tiles.len());
        for tile in stressed_tiles {
            let before = base_metrics.metric(&tile.metric_ref).value();
            let after = metrics.metric(&tile.metric_ref).value();
            match (before, after) {
                (Some(before), Some(after)) => drivers.push(DriverApplication {
                    tile_id: tile.tile_id.clone(),
                    metric_ref: tile.metric_ref.clone(),
                    transforms: tile.transform_chain(),
                    before,
                    after,
                }),
                _ if tile.required => {
                    return Err(EngineError::MetricResolution {
                        tile_id: tile.tile_id.clone(),
                        metric_ref: tile.metric_ref.clone(),
                        reason: "driver has no base value".to_string(),
                    })
                }
                _ => {}
            }
        }

        debug!(row = %row.row_id, drivers = drivers.len(), "Scenario evaluated");
        scenarios.insert(
            row.row_id.clone(),
            ScenarioSnapshot {
                scenario_id: row.row_id.clone(),
                label: row.label.clone(),
                drivers,
                metrics,
            },
        );
    }

    let decision_insurance = decision_insurance::evaluate(policy, profile, &base_metrics, &scenarios);

    Ok(DealShieldScenarios {
        profile_id: profile.id.clone(),
        scenarios,
        provenance: ScenarioProvenance {
            row_order: profile.rows.iter().map(|r| r.row_id.clone()).collect(),
            content_profile_id: content_profile_id.map(str::to_string),
            decision_insurance,
        },
    })
}
