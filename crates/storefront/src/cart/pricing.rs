//! Pure cart pricing.
//!
//! Everything here is a function of the cart lines and the applied
//! adjustments; nothing is cached, so totals cannot drift from the lines.
//! Arithmetic is checked and saturates at [`Decimal::MAX`] rather than
//! panicking.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::CartLine;

/// Loyalty-coin parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltyRules {
    /// Flat amount taken off the total while coins are being redeemed.
    pub coin_discount: Decimal,
    /// Coins earned per unit of subtotal.
    pub earn_rate: Decimal,
}

impl Default for LoyaltyRules {
    fn default() -> Self {
        Self {
            coin_discount: Decimal::ONE_HUNDRED,
            earn_rate: Decimal::new(5, 2),
        }
    }
}

/// Derived totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub coin_discount: Decimal,
    pub total: Decimal,
    pub earned_coins: u64,
    pub item_count: u64,
}

/// Round a money amount to cents.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum of `unit_price × quantity` over all lines.
#[must_use]
pub fn subtotal(lines: &[CartLine]) -> Decimal {
    lines.iter().fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(line.line_total()).unwrap_or(Decimal::MAX)
    })
}

/// Total number of units across all lines.
#[must_use]
pub fn item_count(lines: &[CartLine]) -> u64 {
    lines.iter().map(|line| u64::from(line.quantity)).sum()
}

/// Discount produced by a percentage code on `subtotal`.
#[must_use]
pub fn code_discount(subtotal: Decimal, rate: Decimal) -> Decimal {
    round_money(subtotal.checked_mul(rate).unwrap_or(Decimal::MAX))
}

/// Flat coin discount, or zero when not redeeming.
#[must_use]
pub fn coin_discount(redeeming: bool, rules: &LoyaltyRules) -> Decimal {
    if redeeming {
        rules.coin_discount
    } else {
        Decimal::ZERO
    }
}

/// Final payable amount, never negative.
#[must_use]
pub fn final_total(subtotal: Decimal, discount: Decimal, coins: Decimal) -> Decimal {
    subtotal
        .checked_sub(discount)
        .and_then(|rest| rest.checked_sub(coins))
        .map_or(Decimal::ZERO, |total| total.max(Decimal::ZERO))
}

/// Coins earned for `subtotal`, rounded down.
#[must_use]
pub fn earned_coins(subtotal: Decimal, rules: &LoyaltyRules) -> u64 {
    subtotal
        .checked_mul(rules.earn_rate)
        .and_then(|coins| coins.floor().to_u64())
        .unwrap_or(0)
}

/// Compute every derived value in one pass.
#[must_use]
pub fn compute(
    lines: &[CartLine],
    discount_rate: Option<Decimal>,
    redeeming_coins: bool,
    rules: &LoyaltyRules,
) -> CartTotals {
    let subtotal = subtotal(lines);
    let discount_amount = discount_rate.map_or(Decimal::ZERO, |rate| code_discount(subtotal, rate));
    let coin_discount = coin_discount(redeeming_coins, rules);

    CartTotals {
        subtotal,
        discount_amount,
        coin_discount,
        total: final_total(subtotal, discount_amount, coin_discount),
        earned_coins: earned_coins(subtotal, rules),
        item_count: item_count(lines),
    }
}
