use rust_decimal::{Decimal, RoundingStrategy};

/// Round a currency amount to cents, half away from zero.
pub fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a ratio or rate to `dp` decimal places, half away from zero.
pub fn round_to(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Split `total` by `weights`, rounding each part to cents. The last part
/// takes the residual so the parts always sum to `total` exactly.
pub fn split_by_shares(total: Decimal, weights: &[Decimal]) -> Vec<Decimal> {
    let mut parts = Vec::with_capacity(weights.len());
    let mut allocated = Decimal::ZERO;
    for (i, weight) in weights.iter().enumerate() {
        if i + 1 == weights.len() {
            parts.push(total - allocated);
        } else {
            let part = cents(total * weight);
            allocated += part;
            parts.push(part);
        }
    }
    parts
}
