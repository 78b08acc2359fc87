//! Scope item allocation.
//!
//! Each trade total is split across that trade's scope items by share, and
//! every item gets a quantity derived from the request. Item totals are the
//! source of truth; unit cost is derived from them, so the items of a trade
//! always sum back to the trade total.

use costscope_models::building::Trade;
use costscope_models::result::TradeBreakdown;
use costscope_models::scope::{QuantityRule, ScopeItemSpec, ScopeSystem, TradeScope};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::EngineError;
use crate::money::{cents, round_to, split_by_shares};

#[derive(Debug, Clone, Copy)]
pub struct QuantityContext {
    pub square_footage: Decimal,
    pub floors: u32,
}

pub fn quantity(rule: &QuantityRule, ctx: QuantityContext) -> Decimal {
    match rule {
        QuantityRule::Area { factor } => round_to(ctx.square_footage * *factor, 2),
        QuantityRule::Fixed { count } => *count,
        QuantityRule::PerFloor { per_floor } => Decimal::from(ctx.floors) * *per_floor,
        QuantityRule::AreaGroups {
            area_per_group,
            minimum,
        } => {
            if *area_per_group <= Decimal::ZERO {
                return *minimum;
            }
            (ctx.square_footage / *area_per_group).ceil().max(*minimum)
        }
        QuantityRule::LumpSum => Decimal::ONE,
    }
}

pub fn allocate_trade(
    trade: Trade,
    trade_total: Decimal,
    items: &[ScopeItemSpec],
    ctx: QuantityContext,
) -> TradeScope {
    let weights: Vec<Decimal> = items.iter().map(|i| i.share).collect();
    let amounts = split_by_shares(trade_total, &weights);

    let systems = items
        .iter()
        .zip(amounts)
        .map(|(item, total_cost)| {
            let qty = quantity(&item.quantity, ctx);
            let unit_cost = if qty > Decimal::ZERO {
                cents(total_cost / qty)
            } else {
                total_cost
            };
            ScopeSystem {
                key: item.key.clone(),
                name: item.label.clone(),
                quantity: qty,
                unit: item.unit.clone(),
                unit_cost,
                total_cost,
            }
        })
        .collect();

    TradeScope {
        trade,
        trade_total,
        systems,
    }
}

/// Check the three-way identity: items sum to their trade, trades sum to the
/// construction total.
pub fn reconcile(
    construction_total: Decimal,
    breakdown: &TradeBreakdown,
    scopes: &[TradeScope],
    epsilon: Decimal,
) -> Result<(), EngineError> {
    for scope in scopes {
        let expected = breakdown.get(scope.trade);
        let items = scope.systems_total();
        if (items - expected).abs() > epsilon {
            return Err(EngineError::Reconciliation {
                trade: scope.trade.as_str().to_string(),
                items,
                expected,
            });
        }
    }

    let trades = breakdown.total();
    if (trades - construction_total).abs() > epsilon {
        return Err(EngineError::Reconciliation {
            trade: "all".to_string(),
            items: trades,
            expected: construction_total,
        });
    }

    debug!(%construction_total, trades = scopes.len(), "Scope reconciled");
    Ok(())
}
