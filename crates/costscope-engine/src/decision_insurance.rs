//! Decision Insurance: which driver matters most, where the deal first
//! breaks, and how much room the base case has before it does.
//!
//! Never fails. Anything missing yields an `unavailable` block with a reason.

use std::collections::BTreeMap;

use costscope_models::dealshield::{
    DecisionInsuranceProvenance, DecisionPolicy, FirstBreakCondition, FlexBand, FlexBeforeBreak,
    FlexCalibration, PolicyStatus, PrimaryControlVariable, TileProfile, TriggerOperator,
    BASE_SCENARIO,
};
use costscope_models::metric::MetricSource;
use costscope_models::result::ScenarioSnapshot;
use rust_decimal::Decimal;
use tracing::debug;

use crate::money::round_to;

pub fn evaluate(
    policy: Option<&DecisionPolicy>,
    profile: &TileProfile,
    base: &dyn MetricSource,
    scenarios: &BTreeMap<String, ScenarioSnapshot>,
) -> DecisionInsuranceProvenance {
    let Some(policy) = policy else {
        return DecisionInsuranceProvenance::unavailable(
            None,
            format!("no decision policy is bound to {}", profile.id),
        );
    };
    let policy_id = Some(policy.id.clone());

    if policy.tile_profile_id != profile.id {
        return DecisionInsuranceProvenance::unavailable(
            policy_id,
            format!(
                "policy is bound to {}, not {}",
                policy.tile_profile_id, profile.id
            ),
        );
    }

    let control = &policy.primary_control;
    let Some(tile) = profile.tile(&control.tile_id) else {
        return DecisionInsuranceProvenance::unavailable(
            policy_id,
            format!("primary control tile {} is not in the profile", control.tile_id),
        );
    };
    let Some(control_value) = base.metric(&control.metric_ref).value() else {
        return DecisionInsuranceProvenance::unavailable(
            policy_id,
            format!("{} has no base value", control.metric_ref),
        );
    };

    let trigger = &policy.collapse_trigger;
    let Some(trigger_base) = base.metric(&trigger.metric_ref).value() else {
        return DecisionInsuranceProvenance::unavailable(
            policy_id,
            format!("{} has no base value", trigger.metric_ref),
        );
    };

    let first_break = first_break(policy, profile, trigger_base, scenarios);
    let headroom = headroom(trigger_base, trigger.threshold, trigger.operator);
    let band = band(headroom, &policy.flex_calibration);
    debug!(policy = %policy.id, %headroom, ?band, "Decision insurance evaluated");

    DecisionInsuranceProvenance {
        status: PolicyStatus::Available,
        policy_id,
        reason: None,
        primary_control_variable: Some(PrimaryControlVariable {
            tile_id: tile.tile_id.clone(),
            label: tile.label.clone(),
            metric_ref: control.metric_ref.clone(),
            base_value: control_value,
        }),
        first_break_condition: Some(first_break),
        flex_before_break: Some(FlexBeforeBreak { band, headroom }),
    }
}

/// The earliest scenario, base first then rows in declared order, whose
/// trigger metric crosses the threshold.
fn first_break(
    policy: &DecisionPolicy,
    profile: &TileProfile,
    trigger_base: Decimal,
    scenarios: &BTreeMap<String, ScenarioSnapshot>,
) -> FirstBreakCondition {
    let trigger = &policy.collapse_trigger;
    let breaks = |scenario_id: &str, value: Decimal| FirstBreakCondition::Breaks {
        scenario_id: scenario_id.to_string(),
        metric_ref: trigger.metric_ref.clone(),
        value,
        threshold: trigger.threshold,
        operator: trigger.operator,
    };

    if trigger.operator.fires(trigger_base, trigger.threshold) {
        return breaks(BASE_SCENARIO, trigger_base);
    }

    let mut checked = 1;
    for row in &profile.rows {
        let Some(value) = scenarios
            .get(&row.row_id)
            .and_then(|s| s.metric(&trigger.metric_ref).value())
        else {
            continue;
        };
        checked += 1;
        if trigger.operator.fires(value, trigger.threshold) {
            return breaks(&row.row_id, value);
        }
    }

    FirstBreakCondition::Holds {
        metric_ref: trigger.metric_ref.clone(),
        scenarios_checked: checked,
    }
}

/// Relative distance from `value` to `threshold`, positive on the safe side.
pub fn headroom(value: Decimal, threshold: Decimal, operator: TriggerOperator) -> Decimal {
    let distance = match operator {
        TriggerOperator::Lt | TriggerOperator::Le => value - threshold,
        TriggerOperator::Gt | TriggerOperator::Ge => threshold - value,
    };
    if threshold.is_zero() {
        round_to(distance, 4)
    } else {
        round_to(distance / threshold.abs(), 4)
    }
}

pub fn band(headroom: Decimal, calibration: &FlexCalibration) -> FlexBand {
    if headroom <= calibration.tight_max {
        FlexBand::Tight
    } else if headroom <= calibration.moderate_max {
        FlexBand::Moderate
    } else {
        FlexBand::Comfortable
    }
}
