use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{PaycertError, Result};

/// Round a monetary value to cents. Only call this at presentation time.
pub fn round_money(val: Decimal) -> Decimal {
    val.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a decimal as an amount with thousands separators: 1,234.56
pub fn money(val: Decimal) -> String {
    let rounded = round_money(val);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let cents = format!("{:.2}", rounded.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

/// Format a quantity without trailing zeros: 12.50 -> 12.5, 3.00 -> 3
pub fn quantity(val: Decimal) -> String {
    val.normalize().to_string()
}

/// Parse a user-supplied amount exactly. Accepts thousands separators.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(PaycertError::InvalidAmount(input.to_string()));
    }
    Decimal::from_str(&cleaned).map_err(|_| PaycertError::InvalidAmount(input.to_string()))
}

fn too_large(what: String) -> PaycertError {
    PaycertError::InvalidAmount(format!("{what} is too large"))
}

/// `quantity * rate`, refusing products that do not fit a decimal.
pub fn line_total(quantity: Decimal, rate: Decimal) -> Result<Decimal> {
    quantity
        .checked_mul(rate)
        .ok_or_else(|| too_large(format!("{quantity} x {rate}")))
}

pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| too_large(format!("{a} + {b}")))
}

pub fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b).ok_or_else(|| too_large(format!("{a} - {b}")))
}

/// Sum amounts, refusing totals that do not fit a decimal.
pub fn checked_sum<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, checked_add)
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
