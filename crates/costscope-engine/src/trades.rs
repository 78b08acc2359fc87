use costscope_models::building::{Trade, TradeShares};
use costscope_models::result::TradeBreakdown;
use rust_decimal::Decimal;

use crate::money::split_by_shares;

/// Split the construction total across trades. Finishes, the last trade in
/// canonical order, absorbs the rounding residual.
pub fn allocate_trades(construction_total: Decimal, shares: &TradeShares) -> TradeBreakdown {
    let weights: Vec<Decimal> = Trade::ALL.iter().map(|t| shares.share(*t)).collect();
    let parts = split_by_shares(construction_total, &weights);

    let mut breakdown = TradeBreakdown::default();
    for (trade, amount) in Trade::ALL.iter().zip(parts) {
        breakdown.set(*trade, amount);
    }
    breakdown
}
