//! DealShield scenario table.
//!
//! Resolves every tile of a profile against a finished result. The base row
//! holds each tile's metric with the tile's own transforms applied; derived
//! rows prefer the engine's own snapshots, then a legacy sensitivity block,
//! and only then fall back to the base cell, marked `base_only` with an
//! explanation.

use std::collections::BTreeMap;

use chrono::Utc;
use costscope_models::dealshield::{
    Cell, CellExplain, CellProvenance, CellSource, Column, ContentProfile, Coverage,
    CoverageSummary, DecisionPolicy, DerivedRow, OmittedColumn, ScenarioRow, ScenarioTable,
    TableProvenance, Tile, TileProfile, Transform, BASE_SCENARIO,
};
use costscope_models::metric::{MetricLookup, MetricSource};
use costscope_models::result::{CalculationResult, ScenarioSnapshot};
use rust_decimal::Decimal;
use tracing::debug;

use crate::decision_insurance;
use crate::error::EngineError;

/// Content and policy bound to the profile being rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileBindings<'a> {
    pub content: Option<&'a ContentProfile>,
    pub policy: Option<&'a DecisionPolicy>,
}

struct ResolvedColumn<'a> {
    tile: &'a Tile,
    /// The metric with the tile's transform chain applied.
    base_value: Decimal,
    base_transforms: Vec<Transform>,
}

pub fn build_scenario_table(
    request_id: &str,
    result: &CalculationResult,
    profile: &TileProfile,
    bindings: ProfileBindings<'_>,
) -> Result<ScenarioTable, EngineError> {
    let (columns, omitted) = resolve_columns(result, profile)?;

    let empty = BTreeMap::new();
    let snapshots: &BTreeMap<String, ScenarioSnapshot> = match &result.dealshield_scenarios {
        Some(ds) if ds.profile_id == profile.id => &ds.scenarios,
        _ => &empty,
    };

    let mut rows = Vec::with_capacity(profile.rows.len() + 1);
    rows.push(ScenarioRow {
        scenario_id: BASE_SCENARIO.to_string(),
        label: "Base".to_string(),
        cells: columns
            .iter()
            .map(|c| Cell {
                tile_id: c.tile.tile_id.clone(),
                value: c.base_value,
                coverage: Coverage::Complete,
                provenance: CellProvenance {
                    source: CellSource::BaseResult,
                    metric_ref: c.tile.metric_ref.clone(),
                    transforms_applied: c.base_transforms.clone(),
                },
                explain: None,
            })
            .collect(),
    });

    for row in &profile.rows {
        let snapshot = snapshots.get(&row.row_id);
        let cells = columns
            .iter()
            .map(|c| derived_cell(result, profile, row, snapshot, c))
            .collect();
        rows.push(ScenarioRow {
            scenario_id: row.row_id.clone(),
            label: row.label.clone(),
            cells,
        });
    }

    let coverage = rows
        .iter()
        .flat_map(|r| r.cells.iter())
        .fold(CoverageSummary { complete: 0, base_only: 0 }, |mut acc, cell| {
            match cell.coverage {
                Coverage::Complete => acc.complete += 1,
                Coverage::BaseOnly => acc.base_only += 1,
            }
            acc
        });

    let decision_insurance =
        decision_insurance::evaluate(bindings.policy, profile, result, snapshots);

    debug!(
        request_id,
        profile = %profile.id,
        complete = coverage.complete,
        base_only = coverage.base_only,
        "Scenario table built"
    );

    Ok(ScenarioTable {
        request_id: request_id.to_string(),
        profile_id: profile.id.clone(),
        columns: columns
            .iter()
            .map(|c| Column {
                tile_id: c.tile.tile_id.clone(),
                label: c.tile.label.clone(),
                metric_ref: c.tile.metric_ref.clone(),
                required: c.tile.required,
            })
            .collect(),
        rows,
        provenance: TableProvenance {
            profile_id: profile.id.clone(),
            content_profile_id: bindings.content.map(|c| c.id.clone()),
            coverage,
            omitted_columns: omitted,
            decision_insurance,
        },
        generated_at: Utc::now(),
    })
}

/// Unknown paths are always errors. A null value is an error for a required
/// tile and drops the column for an optional one.
fn resolve_columns<'a>(
    result: &CalculationResult,
    profile: &'a TileProfile,
) -> Result<(Vec<ResolvedColumn<'a>>, Vec<OmittedColumn>), EngineError> {
    let mut columns = Vec::with_capacity(profile.tiles.len());
    let mut omitted = Vec::new();

    for tile in &profile.tiles {
        match result.metric(&tile.metric_ref) {
            MetricLookup::Found(raw) => {
                let base_transforms = tile.transform_chain();
                let base_value = apply_chain(tile, raw, &base_transforms)?;
                columns.push(ResolvedColumn {
                    tile,
                    base_value,
                    base_transforms,
                });
            }
            MetricLookup::NotNumeric if !tile.required => omitted.push(OmittedColumn {
                tile_id: tile.tile_id.clone(),
                metric_ref: tile.metric_ref.clone(),
                reason: "metric is null for this result".to_string(),
            }),
            MetricLookup::NotNumeric => {
                return Err(EngineError::MetricResolution {
                    tile_id: tile.tile_id.clone(),
                    metric_ref: tile.metric_ref.clone(),
                    reason: "metric is null for this result".to_string(),
                })
            }
            MetricLookup::NotFound => {
                return Err(EngineError::MetricResolution {
                    tile_id: tile.tile_id.clone(),
                    metric_ref: tile.metric_ref.clone(),
                    reason: "unknown metric path".to_string(),
                })
            }
        }
    }

    Ok((columns, omitted))
}

fn apply_chain(tile: &Tile, value: Decimal, chain: &[Transform]) -> Result<Decimal, EngineError> {
    chain.iter().try_fold(value, |acc, t| {
        t.apply(acc).ok_or_else(|| EngineError::MetricResolution {
            tile_id: tile.tile_id.clone(),
            metric_ref: tile.metric_ref.clone(),
            reason: format!("transform {:?} {} overflowed", t.op, t.value),
        })
    })
}

/// Every transform the row stacks on this tile's metric, in application order.
fn row_transforms(profile: &TileProfile, row: &DerivedRow, tile: &Tile) -> Vec<Transform> {
    row.stress_tiles()
        .filter_map(|id| profile.tile(id))
        .filter(|t| t.metric_ref == tile.metric_ref)
        .flat_map(|t| t.transform_chain())
        .collect()
}

fn derived_cell(
    result: &CalculationResult,
    profile: &TileProfile,
    row: &DerivedRow,
    snapshot: Option<&ScenarioSnapshot>,
    column: &ResolvedColumn<'_>,
) -> Cell {
    let tile = column.tile;
    let cell = |value, coverage, source, transforms_applied, explain| Cell {
        tile_id: tile.tile_id.clone(),
        value,
        coverage,
        provenance: CellProvenance {
            source,
            metric_ref: tile.metric_ref.clone(),
            transforms_applied,
        },
        explain,
    };

    if let Some(snapshot) = snapshot {
        if let Some(value) = snapshot.metric(&tile.metric_ref).value() {
            let transforms_applied: Vec<Transform> = snapshot
                .drivers
                .iter()
                .filter(|d| d.metric_ref == tile.metric_ref)
                .flat_map(|d| d.transforms.iter().copied())
                .collect();
            return cell(
                value,
                Coverage::Complete,
                CellSource::ScenarioSnapshot,
                transforms_applied,
                None,
            );
        }
    }

    let legacy = result
        .sensitivity_analysis
        .as_ref()
        .and_then(|s| s.scenarios.get(&row.row_id))
        .and_then(|metrics| metrics.get(&tile.metric_ref));
    if let Some(value) = legacy {
        return cell(
            *value,
            Coverage::Complete,
            CellSource::SensitivityBlock,
            row_transforms(profile, row, tile),
            None,
        );
    }

    let explain = if snapshot.is_none() {
        CellExplain {
            reason: format!(
                "result carries no {} snapshot for profile {}",
                row.row_id, profile.id
            ),
            remediation: "recalculate with DealShield snapshots enabled".to_string(),
        }
    } else {
        CellExplain {
            reason: format!("{} is not recomputed per scenario", tile.metric_ref),
            remediation: format!("add {} to the scenario key metrics", tile.metric_ref),
        }
    };
    cell(
        column.base_value,
        Coverage::BaseOnly,
        CellSource::BaseFallback,
        column.base_transforms.clone(),
        Some(explain),
    )
}
