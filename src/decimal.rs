//! Decimal kernel
//!
//! Fixed rounding policy on top of `rust_decimal`: every rounding site goes
//! through `normalize`, which rounds half-away-from-zero and pins the result
//! to an exact scale. Costs, products, ratios and tolerances all live at the
//! working scale (18); transient ratio and summation steps are lifted a few
//! digits above it before the final normalize back down.
//!
//! Author: AI-Generated
//! Created: 2026-02-09

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{PathfinderError, Result};

/// Canonical scale for costs, ratios, products and tolerances.
pub const WORKING_SCALE: u32 = 18;

/// Extra transient precision for multi-step ratio operations.
pub const RATIO_EXTRA_SCALE: u32 = 4;

/// Extra transient precision for summation chains.
pub const SUM_EXTRA_SCALE: u32 = 2;

/// Round half-away-from-zero to `scale` and pin the result scale exactly.
/// Idempotent: normalizing an already-normalized value is a no-op.
pub fn normalize(value: Decimal, scale: u32) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Normalize to the working scale.
pub fn working(value: Decimal) -> Decimal {
    normalize(value, WORKING_SCALE)
}

/// Parse a numeric string exactly. Malformed input is an error; excess
/// precision is an error rather than a silent round.
pub fn parse(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PathfinderError::invalid_input("empty numeric string"));
    }
    Decimal::from_str_exact(trimmed).map_err(|e| {
        PathfinderError::invalid_input(format!("malformed numeric string \"{trimmed}\": {e}"))
    })
}

/// Render at an explicit scale with fixed fraction digits.
pub fn render(value: Decimal, scale: u32) -> String {
    normalize(value, scale).to_string()
}

/// Exact addition, normalized at `scale`.
pub fn sum_at(a: Decimal, b: Decimal, scale: u32) -> Result<Decimal> {
    let lifted = a
        .checked_add(b)
        .ok_or_else(|| PathfinderError::invalid_input(format!("addition overflow: {a} + {b}")))?;
    Ok(normalize(lifted, scale))
}

/// Exact subtraction, normalized at `scale`.
pub fn sub_at(a: Decimal, b: Decimal, scale: u32) -> Result<Decimal> {
    let lifted = a
        .checked_sub(b)
        .ok_or_else(|| PathfinderError::invalid_input(format!("subtraction overflow: {a} - {b}")))?;
    Ok(normalize(lifted, scale))
}

/// Multiplication normalized at `scale`.
pub fn mul_at(a: Decimal, b: Decimal, scale: u32) -> Result<Decimal> {
    let product = a
        .checked_mul(b)
        .ok_or_else(|| PathfinderError::invalid_input(format!("multiplication overflow: {a} * {b}")))?;
    Ok(normalize(product, scale))
}

/// Division normalized at `scale`. Zero divisor is rejected.
pub fn div(a: Decimal, b: Decimal, scale: u32) -> Result<Decimal> {
    if b.is_zero() {
        return Err(PathfinderError::invalid_input(format!(
            "division by zero: {a} / 0"
        )));
    }
    let quotient = a
        .checked_div(b)
        .ok_or_else(|| PathfinderError::invalid_input(format!("division overflow: {a} / {b}")))?;
    Ok(normalize(quotient, scale))
}

/// Ratio at working scale, computed with the transient extra digits before
/// the final normalize back to 18.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Result<Decimal> {
    let lifted = div(numerator, denominator, WORKING_SCALE + RATIO_EXTRA_SCALE)?;
    Ok(working(lifted))
}

/// Integer power by iterated multiplication, normalized at working scale.
/// `pow(x, 0)` is 1 for any x.
pub fn pow(base: Decimal, exp: u32) -> Result<Decimal> {
    let mut acc = Decimal::ONE;
    for _ in 0..exp {
        acc = acc.checked_mul(base).ok_or_else(|| {
            PathfinderError::invalid_input(format!("power overflow: {base}^{exp}"))
        })?;
        acc = normalize(acc, WORKING_SCALE + RATIO_EXTRA_SCALE);
    }
    Ok(working(acc))
}

/// Compare, optionally pre-normalizing both sides at `scale` so tie-breaking
/// happens at the declared precision.
pub fn cmp_at(a: Decimal, b: Decimal, scale: Option<u32>) -> std::cmp::Ordering {
    match scale {
        Some(s) => normalize(a, s).cmp(&normalize(b, s)),
        None => a.cmp(&b),
    }
}

pub fn is_positive(value: Decimal) -> bool {
    value > Decimal::ZERO
}

pub fn is_negative(value: Decimal) -> bool {
    value < Decimal::ZERO
}
