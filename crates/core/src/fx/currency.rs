//! Currency code and amount helpers.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for converted amounts.
pub const AMOUNT_SCALE: u32 = 2;

/// Upper-cases and validates an ISO-4217 style code (three ASCII letters).
pub fn normalize_currency_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

/// Rounds a converted amount half away from zero.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
