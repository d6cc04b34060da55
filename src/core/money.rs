use rust_decimal::{Decimal, RoundingStrategy};

/// Round a GBP amount to pence, half to even.
pub fn round_gbp(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Unrounded slice of `total` for `part` out of `whole` shares.
///
/// Profit or loss is taken from these and rounded once.
pub fn share(total: Decimal, part: u64, whole: u64) -> Decimal {
    if whole == 0 || part >= whole {
        return total;
    }
    total * Decimal::from(part) / Decimal::from(whole)
}

/// Proportional slice of `total` for `part` out of `whole` shares, rounded to pence.
///
/// Taking the whole yields `total` exactly so nothing is lost to rounding.
pub fn proportion(total: Decimal, part: u64, whole: u64) -> Decimal {
    if whole == 0 || part >= whole {
        return total;
    }
    round_gbp(share(total, part, whole))
}

/// Profit or loss of selling `quantity` shares, rounded once to pence.
pub fn profit_or_loss(
    proceeds_total: Decimal,
    proceeds_quantity: u64,
    cost_total: Decimal,
    cost_quantity: u64,
    quantity: u64,
) -> Decimal {
    round_gbp(
        share(proceeds_total, quantity, proceeds_quantity)
            - share(cost_total, quantity, cost_quantity),
    )
}

/// Average price per share, zero for an empty quantity.
pub fn average(total: Decimal, quantity: u64) -> Decimal {
    if quantity == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(quantity)
    }
}

pub fn format_gbp(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-£{:.2}", amount.abs())
    } else {
        format!("£{:.2}", amount)
    }
}

/// Per-share prices carry more precision than pence; trim trailing zeros.
pub fn format_price(price: Decimal) -> String {
    let s = format!("{:.6}", price);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
