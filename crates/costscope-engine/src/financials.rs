//! Revenue, valuation and debt model.
//!
//! One evaluation path serves both the base result and every DealShield
//! scenario: a scenario is the same model run with a [`Stress`] applied to
//! its driver metrics, so downstream metrics are always recomputed rather
//! than scaled.

use std::collections::BTreeMap;

use costscope_models::building::{
    ExpenseBasis, FinancingTerms, OperatingExpense, SoftCostLine, UnitRule,
};
use costscope_models::dealshield::{Tile, Transform};
use costscope_models::metric::Driver;
use costscope_models::result::{DebtMetrics, ExpenseLine, KeyMetrics, SoftCost};
use rust_decimal::Decimal;

use crate::costs::soft_costs;
use crate::error::EngineError;
use crate::money::{cents, round_to};

const IRR_LOWER: Decimal = Decimal::from_parts(99, 0, 0, true, 2);
const IRR_UPPER: Decimal = Decimal::ONE;
const IRR_ITERATIONS: usize = 100;
const IRR_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

#[derive(Debug, Clone)]
struct StressStep {
    tile_id: String,
    metric_ref: String,
    transforms: Vec<Transform>,
}

/// Driver transforms layered onto the base model, in application order.
#[derive(Debug, Clone, Default)]
pub struct Stress {
    steps: BTreeMap<Driver, Vec<StressStep>>,
}

impl Stress {
    pub fn none() -> Self {
        Self::default()
    }

    /// Queue a driver tile's transform chain. Returns false for output tiles.
    pub fn push(&mut self, tile: &Tile) -> bool {
        let Some(driver) = Driver::from_metric_ref(&tile.metric_ref) else {
            return false;
        };
        self.steps.entry(driver).or_default().push(StressStep {
            tile_id: tile.tile_id.clone(),
            metric_ref: tile.metric_ref.clone(),
            transforms: tile.transform_chain(),
        });
        true
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn apply(&self, driver: Driver, value: Decimal) -> Result<Decimal, EngineError> {
        let Some(steps) = self.steps.get(&driver) else {
            return Ok(value);
        };
        let mut value = value;
        for step in steps {
            for transform in &step.transforms {
                value = transform
                    .apply(value)
                    .ok_or_else(|| EngineError::MetricResolution {
                        tile_id: step.tile_id.clone(),
                        metric_ref: step.metric_ref.clone(),
                        reason: "transform overflowed".to_string(),
                    })?;
            }
        }
        Ok(value)
    }
}

/// Primary revenue units for a request of `square_footage`.
pub fn unit_count(rule: &UnitRule, square_footage: Decimal) -> Decimal {
    match rule {
        UnitRule::PerArea {
            units_per_sf,
            whole_units,
        } => {
            let raw = square_footage * *units_per_sf;
            if *whole_units {
                raw.floor()
            } else {
                round_to(raw, 2)
            }
        }
        UnitRule::Fixed { count } => *count,
    }
}

/// Inputs resolved from configuration and the base cost calculation.
#[derive(Debug, Clone)]
pub struct FinancialModel<'a> {
    pub hard_costs: Decimal,
    pub soft_cost_lines: &'a [SoftCostLine],
    pub square_footage: Decimal,
    pub unit_count: Decimal,
    /// Revenue per unit after any mixed-use revenue factor.
    pub revenue_per_unit: Decimal,
    /// Revenue-side regional multiplier.
    pub revenue_multiplier: Decimal,
    pub operating_expenses: &'a [OperatingExpense],
    /// None when the asset class does not support cap-rate valuation.
    pub cap_rate: Option<Decimal>,
    pub hold_years: u32,
    pub financing: &'a FinancingTerms,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub hard_costs: Decimal,
    pub soft_costs: Vec<SoftCost>,
    pub soft_costs_total: Decimal,
    pub total_project_cost: Decimal,
    pub annual_revenue: Decimal,
    pub operating_expenses: Vec<ExpenseLine>,
    pub total_operating_expenses: Decimal,
    pub net_income: Decimal,
    pub cap_rate: Option<Decimal>,
    pub property_value: Option<Decimal>,
    pub yield_on_cost: Option<Decimal>,
    pub irr: Option<Decimal>,
    pub payback_period: Option<Decimal>,
    pub debt: DebtMetrics,
}

impl Evaluation {
    pub fn key_metrics(&self) -> KeyMetrics {
        KeyMetrics {
            hard_costs: self.hard_costs,
            soft_costs_total: self.soft_costs_total,
            total_project_cost: self.total_project_cost,
            annual_revenue: self.annual_revenue,
            total_operating_expenses: self.total_operating_expenses,
            net_income: self.net_income,
            cap_rate: self.cap_rate,
            property_value: self.property_value,
            yield_on_cost: self.yield_on_cost,
            irr: self.irr,
            payback_period: self.payback_period,
            debt_amount: self.debt.debt_amount,
            interest_rate: self.debt.interest_rate,
            annual_debt_service: self.debt.annual_debt_service,
            calculated_dscr: self.debt.calculated_dscr,
        }
    }
}

impl FinancialModel<'_> {
    pub fn evaluate(&self, stress: &Stress) -> Result<Evaluation, EngineError> {
        let hard_costs = cents(stress.apply(Driver::HardCosts, self.hard_costs)?);
        let soft_lines = soft_costs(hard_costs, self.soft_cost_lines);
        let soft_base: Decimal = soft_lines.iter().map(|s| s.amount).sum();
        let soft_costs_total = cents(stress.apply(Driver::SoftCosts, soft_base)?);
        let total_project_cost = hard_costs + soft_costs_total;

        let base_revenue =
            cents(self.unit_count * self.revenue_per_unit * self.revenue_multiplier);
        let annual_revenue = cents(stress.apply(Driver::Revenue, base_revenue)?);

        let operating_expenses: Vec<ExpenseLine> = self
            .operating_expenses
            .iter()
            .map(|line| ExpenseLine {
                name: line.name.clone(),
                amount: self.expense_amount(&line.basis, annual_revenue),
            })
            .collect();
        let opex_base: Decimal = operating_expenses.iter().map(|l| l.amount).sum();
        let total_operating_expenses =
            cents(stress.apply(Driver::OperatingExpenses, opex_base)?);
        let net_income = annual_revenue - total_operating_expenses;

        let cap_rate = match self.cap_rate {
            Some(rate) => Some(stress.apply(Driver::CapRate, rate)?),
            None => None,
        };
        let property_value = cap_rate
            .filter(|c| *c > Decimal::ZERO)
            .map(|c| cents(net_income / c));
        let (yield_on_cost, payback_period, irr) = if cap_rate.is_some() {
            let yield_on_cost = (total_project_cost > Decimal::ZERO)
                .then(|| round_to(net_income / total_project_cost, 4));
            let payback = (net_income > Decimal::ZERO)
                .then(|| round_to(total_project_cost / net_income, 2));
            let irr = property_value.and_then(|exit| {
                irr(total_project_cost, net_income, exit, self.hold_years)
            });
            (yield_on_cost, payback, irr)
        } else {
            (None, None, None)
        };

        let debt = self.debt_metrics(total_project_cost, net_income, stress)?;

        Ok(Evaluation {
            hard_costs,
            soft_costs: soft_lines,
            soft_costs_total,
            total_project_cost,
            annual_revenue,
            operating_expenses,
            total_operating_expenses,
            net_income,
            cap_rate,
            property_value,
            yield_on_cost,
            irr,
            payback_period,
            debt,
        })
    }

    fn expense_amount(&self, basis: &ExpenseBasis, revenue: Decimal) -> Decimal {
        match basis {
            ExpenseBasis::PerSf { rate } => cents(*rate * self.square_footage),
            ExpenseBasis::PerUnit { rate } => cents(*rate * self.unit_count),
            ExpenseBasis::PercentOfRevenue { rate } => cents(*rate * revenue),
            ExpenseBasis::Fixed { amount } => cents(*amount),
        }
    }

    fn debt_metrics(
        &self,
        total_project_cost: Decimal,
        net_income: Decimal,
        stress: &Stress,
    ) -> Result<DebtMetrics, EngineError> {
        let terms = self.financing;
        let debt_amount = cents(total_project_cost * terms.debt_ratio);
        let equity_amount = total_project_cost - debt_amount;
        let interest_rate = stress.apply(Driver::InterestRate, terms.interest_rate)?;
        let annual_debt_service = cents(annual_payment(
            debt_amount,
            interest_rate,
            terms.amortization_years,
        ));

        let calculated_dscr = (annual_debt_service > Decimal::ZERO)
            .then(|| round_to(net_income / annual_debt_service, 2));
        let meets_target = match calculated_dscr {
            Some(dscr) => dscr >= terms.target_dscr,
            None => true,
        };

        Ok(DebtMetrics {
            debt_ratio: terms.debt_ratio,
            debt_amount,
            equity_amount,
            interest_rate,
            amortization_years: terms.amortization_years,
            annual_debt_service,
            calculated_dscr,
            target_dscr: terms.target_dscr,
            meets_target,
        })
    }
}

/// Level annual payment on a fully amortizing loan. Interest-only when the
/// term is zero.
pub fn annual_payment(principal: Decimal, rate: Decimal, years: u32) -> Decimal {
    if principal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if years == 0 {
        return principal * rate;
    }
    if rate.is_zero() {
        return principal / Decimal::from(years);
    }
    let growth = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..years {
        factor *= growth;
    }
    principal * rate * factor / (factor - Decimal::ONE)
}

/// Net present value scaled by `(1 + rate)^years`. Same sign as the NPV for
/// any rate above -1, and free of division.
fn scaled_npv(
    outlay: Decimal,
    annual: Decimal,
    exit: Decimal,
    years: u32,
    rate: Decimal,
) -> Option<Decimal> {
    let growth = Decimal::ONE + rate;
    let mut acc = -outlay;
    for year in 1..=years {
        let flow = if year == years { annual + exit } else { annual };
        acc = acc.checked_mul(growth)?.checked_add(flow)?;
    }
    Some(acc)
}

/// IRR of: pay `outlay` today, receive `annual` for `years`, sell for `exit`
/// at the end. Solved by bisection; None when no root lies in range.
pub fn irr(outlay: Decimal, annual: Decimal, exit: Decimal, years: u32) -> Option<Decimal> {
    if years == 0 || outlay <= Decimal::ZERO {
        return None;
    }

    let mut lo = IRR_LOWER;
    let mut hi = IRR_UPPER;
    let mut f_lo = scaled_npv(outlay, annual, exit, years, lo)?;
    let f_hi = scaled_npv(outlay, annual, exit, years, hi)?;
    if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
        return None;
    }

    for _ in 0..IRR_ITERATIONS {
        let mid = (lo + hi) / Decimal::TWO;
        let f_mid = scaled_npv(outlay, annual, exit, years, mid)?;
        if f_mid.is_zero() || (hi - lo) < IRR_TOLERANCE {
            return Some(round_to(mid, 4));
        }
        if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Some(round_to((lo + hi) / Decimal::TWO, 4))
}
