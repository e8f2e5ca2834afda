// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exact decimal money handling.
//!
//! Prices are stored as text and parsed with [`rust_decimal`] so that totals
//! are exact decimal sums with no float drift. Totals are always recomputed
//! from the price texts at write time, never trusted from an earlier render
//! request.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// A price text that could not be interpreted as a usable amount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// Not parseable as a decimal number.
    #[error("`{0}` is not a valid amount")]
    Invalid(String),

    /// Parsed, but negative. Prices must be zero or positive.
    #[error("`{0}` is negative")]
    Negative(String),
}

/// Parse a single price text into an exact decimal.
///
/// Accepts an optional leading naira sign and surrounding whitespace;
/// rejects anything non-numeric and anything negative.
pub fn parse_amount(raw: &str) -> Result<Decimal, MoneyError> {
    let trimmed = raw.trim();
    let cleaned = trimmed.strip_prefix('₦').unwrap_or(trimmed).trim();
    let value =
        Decimal::from_str(cleaned).map_err(|_| MoneyError::Invalid(trimmed.to_string()))?;
    if value.is_sign_negative() {
        return Err(MoneyError::Negative(trimmed.to_string()));
    }
    Ok(value)
}

/// Sum a sequence of price texts into one exact decimal total.
pub fn sum_prices<'a, I>(prices: I) -> Result<Decimal, MoneyError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total = Decimal::ZERO;
    for price in prices {
        total += parse_amount(price)?;
    }
    Ok(total)
}

/// Format a non-negative amount for user-facing messages: naira sign,
/// thousands grouping, fractional part only when non-zero (padded to two
/// digits).
pub fn format_naira(amount: Decimal) -> String {
    let text = amount.round_dp(2).normalize().to_string();
    let (int_digits, frac_digits) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_digits.len() + int_digits.len() / 3 + 1);
    grouped.push('₦');
    for (idx, ch) in int_digits.chars().enumerate() {
        if idx > 0 && (int_digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_digits {
        Some(f) if f.len() == 1 => format!("{grouped}.{f}0"),
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}
