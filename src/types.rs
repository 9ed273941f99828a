//! Core value objects
//!
//! Immutable money/pair/rate/bounds/fee types plus the `Order` offer type.
//! Every constructor validates its invariants and fails fast with
//! `InvalidInput`, including the offending value when it is non-sensitive.
//!
//! Author: AI-Generated
//! Created: 2026-02-10
//! Modified: 2026-02-18 - fill reconstruction from spend-side amounts

use rust_decimal::Decimal;
use serde_json::json;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::decimal::{self, WORKING_SCALE};
use crate::error::{PathfinderError, Result};

// ---------------------------------------------------------------------------
// Currency codes
// ---------------------------------------------------------------------------

/// Currency codes are 3-12 character uppercase identifiers (A-Z, 0-9, at
/// least one letter). Lowercase or empty codes are rejected.
pub fn validate_currency(code: &str) -> Result<()> {
    let len = code.chars().count();
    if !(3..=12).contains(&len) {
        return Err(PathfinderError::invalid_input(format!(
            "currency \"{code}\" must be 3-12 characters"
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(PathfinderError::invalid_input(format!(
            "currency \"{code}\" must be uppercase A-Z / 0-9"
        )));
    }
    if !code.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PathfinderError::invalid_input(format!(
            "currency \"{code}\" must contain at least one letter"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Stable, deterministic order identity: the index assigned at graph-build
/// time. Reproducible across runs, unlike object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(pub usize);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// Non-negative amount of a single currency at an explicit scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    currency: String,
    amount: Decimal,
}

impl Money {
    pub fn new(currency: &str, amount: Decimal) -> Result<Self> {
        validate_currency(currency)?;
        if decimal::is_negative(amount) {
            return Err(PathfinderError::invalid_input(format!(
                "negative amount {amount} {currency}"
            )));
        }
        Ok(Self {
            currency: currency.to_string(),
            amount,
        })
    }

    /// Parse the amount from a numeric string.
    pub fn from_str(currency: &str, amount: &str) -> Result<Self> {
        Self::new(currency, decimal::parse(amount)?)
    }

    pub fn zero(currency: &str) -> Result<Self> {
        Self::new(currency, Decimal::ZERO)
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn scale(&self) -> u32 {
        self.amount.scale()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        decimal::is_positive(self.amount)
    }

    /// Re-normalize the amount at an explicit scale.
    pub fn at_scale(&self, scale: u32) -> Money {
        Money {
            currency: self.currency.clone(),
            amount: decimal::normalize(self.amount, scale),
        }
    }

    fn require_same_currency(&self, other: &Money, operation: &str) -> Result<()> {
        if self.currency != other.currency {
            return Err(PathfinderError::invalid_input(format!(
                "currency mismatch in {operation}: {} vs {}",
                self.currency, other.currency
            )));
        }
        Ok(())
    }

    /// Addition. Result scale is the max of the operand scales.
    pub fn add(&self, other: &Money) -> Result<Money> {
        self.require_same_currency(other, "add")?;
        let scale = self.scale().max(other.scale());
        Ok(Money {
            currency: self.currency.clone(),
            amount: decimal::sum_at(self.amount, other.amount, scale)?,
        })
    }

    /// Subtraction. Subtracting a greater amount is forbidden.
    pub fn sub(&self, other: &Money) -> Result<Money> {
        self.require_same_currency(other, "sub")?;
        if other.amount > self.amount {
            return Err(PathfinderError::invalid_input(format!(
                "cannot subtract {} from {}",
                other, self
            )));
        }
        let scale = self.scale().max(other.scale());
        Ok(Money {
            currency: self.currency.clone(),
            amount: decimal::sub_at(self.amount, other.amount, scale)?,
        })
    }

    /// Subtraction clamped at zero instead of erroring on underflow.
    pub fn saturating_sub(&self, other: &Money) -> Result<Money> {
        self.require_same_currency(other, "saturating_sub")?;
        if other.amount >= self.amount {
            return Money::zero(&self.currency);
        }
        self.sub(other)
    }

    /// Amount comparison at the shared (max) scale.
    pub fn cmp_amount(&self, other: &Money) -> Result<Ordering> {
        self.require_same_currency(other, "compare")?;
        let scale = self.scale().max(other.scale());
        Ok(decimal::cmp_at(self.amount, other.amount, Some(scale)))
    }

    pub fn min_of(&self, other: &Money) -> Result<Money> {
        Ok(match self.cmp_amount(other)? {
            Ordering::Greater => other.clone(),
            _ => self.clone(),
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "currency": self.currency,
            "amount": decimal::render(self.amount, self.scale()),
            "scale": self.scale(),
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", decimal::render(self.amount, self.scale()), self.currency)
    }
}

impl serde::Serialize for Money {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.to_json(), serializer)
    }
}

// ---------------------------------------------------------------------------
// AssetPair
// ---------------------------------------------------------------------------

/// Base/quote currency pair. Same-currency pairs exist only through the
/// `transfer` constructor and are routable only by the execution-plan engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPair {
    base: String,
    quote: String,
}

impl AssetPair {
    pub fn new(base: &str, quote: &str) -> Result<Self> {
        validate_currency(base)?;
        validate_currency(quote)?;
        if base == quote {
            return Err(PathfinderError::invalid_input(format!(
                "same-asset pair {base}/{quote}"
            )));
        }
        Ok(Self {
            base: base.to_string(),
            quote: quote.to_string(),
        })
    }

    /// Same-currency transfer pair.
    pub fn transfer(currency: &str) -> Result<Self> {
        validate_currency(currency)?;
        Ok(Self {
            base: currency.to_string(),
            quote: currency.to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn is_transfer(&self) -> bool {
        self.base == self.quote
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

// ---------------------------------------------------------------------------
// ExchangeRate
// ---------------------------------------------------------------------------

/// Positive conversion rate from base to quote at a declared scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRate {
    pair: AssetPair,
    rate: Decimal,
    scale: u32,
}

impl ExchangeRate {
    pub fn new(pair: AssetPair, rate: Decimal, scale: u32) -> Result<Self> {
        if !decimal::is_positive(rate) {
            return Err(PathfinderError::invalid_input(format!(
                "rate must be positive, got {rate} for {pair}"
            )));
        }
        Ok(Self { pair, rate, scale })
    }

    pub fn from_str(pair: AssetPair, rate: &str, scale: u32) -> Result<Self> {
        let parsed = decimal::parse(rate)?;
        Self::new(pair, parsed, scale)
    }

    pub fn pair(&self) -> &AssetPair {
        &self.pair
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Convert base money into quote money, rounding at the declared scale.
    pub fn convert(&self, money: &Money) -> Result<Money> {
        if money.currency() != self.pair.base() {
            return Err(PathfinderError::invalid_input(format!(
                "cannot convert {} with rate {}",
                money.currency(),
                self.pair
            )));
        }
        let amount = decimal::mul_at(money.amount(), self.rate, self.scale)?;
        Money::new(self.pair.quote(), amount)
    }

    /// Reciprocal rate, rounded at the declared scale.
    pub fn invert(&self) -> Result<ExchangeRate> {
        let inverted = decimal::div(Decimal::ONE, self.rate, self.scale)?;
        let pair = if self.pair.is_transfer() {
            self.pair.clone()
        } else {
            AssetPair::new(self.pair.quote(), self.pair.base())?
        };
        ExchangeRate::new(pair, inverted, self.scale)
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.pair, decimal::render(self.rate, self.scale))
    }
}

// ---------------------------------------------------------------------------
// OrderBounds
// ---------------------------------------------------------------------------

/// Inclusive fill window on the base leg, normalized to a shared scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBounds {
    min: Money,
    max: Money,
}

impl OrderBounds {
    pub fn new(min: Money, max: Money) -> Result<Self> {
        if min.currency() != max.currency() {
            return Err(PathfinderError::invalid_input(format!(
                "bounds currency mismatch: {} vs {}",
                min.currency(),
                max.currency()
            )));
        }
        let scale = min.scale().max(max.scale());
        let min = min.at_scale(scale);
        let max = max.at_scale(scale);
        if min.amount() > max.amount() {
            return Err(PathfinderError::invalid_input(format!(
                "inverted bounds: min {} > max {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> &Money {
        &self.min
    }

    pub fn max(&self) -> &Money {
        &self.max
    }

    pub fn currency(&self) -> &str {
        self.min.currency()
    }

    pub fn scale(&self) -> u32 {
        self.min.scale()
    }

    /// Inclusive containment check.
    pub fn contains(&self, value: &Money) -> Result<bool> {
        let lower = value.cmp_amount(&self.min)?;
        let upper = value.cmp_amount(&self.max)?;
        Ok(lower != Ordering::Less && upper != Ordering::Greater)
    }

    /// Nearest boundary within the window.
    pub fn clamp(&self, value: &Money) -> Result<Money> {
        if value.cmp_amount(&self.min)? == Ordering::Less {
            return Ok(self.min.clone());
        }
        if value.cmp_amount(&self.max)? == Ordering::Greater {
            return Ok(self.max.clone());
        }
        Ok(value.at_scale(self.scale().max(value.scale())))
    }
}

impl fmt::Display for OrderBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

// ---------------------------------------------------------------------------
// FeeBreakdown
// ---------------------------------------------------------------------------

/// Per-fill fees on the base and/or quote leg. Zero-valued components are
/// treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeeBreakdown {
    base_fee: Option<Money>,
    quote_fee: Option<Money>,
}

impl FeeBreakdown {
    pub fn new(base_fee: Option<Money>, quote_fee: Option<Money>) -> Self {
        Self {
            base_fee: base_fee.filter(|fee| !fee.is_zero()),
            quote_fee: quote_fee.filter(|fee| !fee.is_zero()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn base_fee(&self) -> Option<&Money> {
        self.base_fee.as_ref()
    }

    pub fn quote_fee(&self) -> Option<&Money> {
        self.quote_fee.as_ref()
    }

    pub fn has_base_fee(&self) -> bool {
        self.base_fee.is_some()
    }

    pub fn has_quote_fee(&self) -> bool {
        self.quote_fee.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.base_fee.is_none() && self.quote_fee.is_none()
    }

    /// Additive merge of two breakdowns.
    pub fn merge(&self, other: &FeeBreakdown) -> Result<FeeBreakdown> {
        let base_fee = merge_component(self.base_fee.as_ref(), other.base_fee.as_ref())?;
        let quote_fee = merge_component(self.quote_fee.as_ref(), other.quote_fee.as_ref())?;
        Ok(FeeBreakdown::new(base_fee, quote_fee))
    }

    /// Non-absent components, base leg first.
    pub fn components(&self) -> impl Iterator<Item = &Money> {
        self.base_fee.iter().chain(self.quote_fee.iter())
    }
}

fn merge_component(a: Option<&Money>, b: Option<&Money>) -> Result<Option<Money>> {
    match (a, b) {
        (Some(x), Some(y)) => Ok(Some(x.add(y)?)),
        (Some(x), None) => Ok(Some(x.clone())),
        (None, Some(y)) => Ok(Some(y.clone())),
        (None, None) => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Fee policies
// ---------------------------------------------------------------------------

/// Which leg of the trade a fee applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeLeg {
    Base,
    Quote,
}

impl fmt::Display for FeeLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeLeg::Base => write!(f, "base"),
            FeeLeg::Quote => write!(f, "quote"),
        }
    }
}

/// Deterministic, pure fee function identified by a fingerprint string.
/// Edges only coalesce orders whose policies share a fingerprint.
pub trait FeePolicy: fmt::Debug + Send + Sync {
    fn assess(&self, side: OrderSide, base: &Money, quote: &Money) -> Result<FeeBreakdown>;

    fn fingerprint(&self) -> String;
}

/// Fixed fee charged on one leg regardless of fill size.
#[derive(Debug, Clone)]
pub struct FlatFee {
    leg: FeeLeg,
    fee: Money,
}

impl FlatFee {
    pub fn new(leg: FeeLeg, fee: Money) -> Self {
        Self { leg, fee }
    }
}

impl FeePolicy for FlatFee {
    fn assess(&self, _side: OrderSide, base: &Money, quote: &Money) -> Result<FeeBreakdown> {
        let expected = match self.leg {
            FeeLeg::Base => base.currency(),
            FeeLeg::Quote => quote.currency(),
        };
        if self.fee.currency() != expected {
            return Err(PathfinderError::invalid_input(format!(
                "flat fee currency {} does not match {} leg currency {expected}",
                self.fee.currency(),
                self.leg
            )));
        }
        Ok(match self.leg {
            FeeLeg::Base => FeeBreakdown::new(Some(self.fee.clone()), None),
            FeeLeg::Quote => FeeBreakdown::new(None, Some(self.fee.clone())),
        })
    }

    fn fingerprint(&self) -> String {
        format!(
            "flat:{}:{}:{}",
            self.leg,
            self.fee.currency(),
            decimal::render(self.fee.amount(), self.fee.scale())
        )
    }
}

/// Fee proportional to the quote leg.
#[derive(Debug, Clone)]
pub struct ProportionalFee {
    rate: Decimal,
}

impl ProportionalFee {
    pub fn new(rate: Decimal) -> Result<Self> {
        if decimal::is_negative(rate) || rate >= Decimal::ONE {
            return Err(PathfinderError::invalid_input(format!(
                "proportional fee rate must be in [0, 1), got {rate}"
            )));
        }
        Ok(Self { rate })
    }

    pub fn from_str(rate: &str) -> Result<Self> {
        Self::new(decimal::parse(rate)?)
    }
}

impl FeePolicy for ProportionalFee {
    fn assess(&self, _side: OrderSide, _base: &Money, quote: &Money) -> Result<FeeBreakdown> {
        let amount = decimal::mul_at(quote.amount(), self.rate, quote.scale())?;
        let fee = Money::new(quote.currency(), amount)?;
        Ok(FeeBreakdown::new(None, Some(fee)))
    }

    fn fingerprint(&self) -> String {
        format!("prop:{}", decimal::render(self.rate, self.rate.scale()))
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// Order side from the taker's perspective:
/// BUY spends base and receives quote; SELL spends quote and receives base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A single peer-to-peer conversion offer. Immutable.
#[derive(Debug, Clone)]
pub struct Order {
    side: OrderSide,
    pair: AssetPair,
    bounds: OrderBounds,
    rate: ExchangeRate,
    fee_policy: Option<Arc<dyn FeePolicy>>,
}

impl Order {
    pub fn new(
        side: OrderSide,
        pair: AssetPair,
        bounds: OrderBounds,
        rate: ExchangeRate,
        fee_policy: Option<Arc<dyn FeePolicy>>,
    ) -> Result<Self> {
        if bounds.currency() != pair.base() {
            return Err(PathfinderError::invalid_input(format!(
                "bounds currency {} does not match pair base {}",
                bounds.currency(),
                pair.base()
            )));
        }
        if rate.pair() != &pair {
            return Err(PathfinderError::invalid_input(format!(
                "rate pair {} does not match order pair {}",
                rate.pair(),
                pair
            )));
        }
        Ok(Self {
            side,
            pair,
            bounds,
            rate,
            fee_policy,
        })
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn pair(&self) -> &AssetPair {
        &self.pair
    }

    pub fn bounds(&self) -> &OrderBounds {
        &self.bounds
    }

    pub fn rate(&self) -> &ExchangeRate {
        &self.rate
    }

    pub fn is_transfer(&self) -> bool {
        self.pair.is_transfer()
    }

    pub fn fee_fingerprint(&self) -> String {
        self.fee_policy
            .as_ref()
            .map(|policy| policy.fingerprint())
            .unwrap_or_else(|| "none".to_string())
    }

    fn require_base_fill(&self, fill: &Money) -> Result<()> {
        if fill.currency() != self.pair.base() {
            return Err(PathfinderError::invalid_input(format!(
                "fill currency {} does not match base {}",
                fill.currency(),
                self.pair.base()
            )));
        }
        if !self.bounds.contains(fill)? {
            return Err(PathfinderError::invalid_input(format!(
                "fill {} outside bounds {}",
                fill, self.bounds
            )));
        }
        Ok(())
    }

    /// Fees for a base fill within bounds.
    pub fn fees(&self, fill: &Money) -> Result<FeeBreakdown> {
        self.require_base_fill(fill)?;
        let quote_gross = self.rate.convert(fill)?;
        match &self.fee_policy {
            Some(policy) => policy.assess(self.side, fill, &quote_gross),
            None => Ok(FeeBreakdown::none()),
        }
    }

    /// The quote leg as experienced by the taker: net of the quote fee when
    /// receiving (BUY), inflated by it when spending (SELL). Floored at zero.
    pub fn effective_quote(&self, fill: &Money) -> Result<Money> {
        let quote_gross = self.rate.convert(fill)?;
        let fees = self.fees(fill)?;
        match (self.side, fees.quote_fee()) {
            (_, None) => Ok(quote_gross),
            (OrderSide::Buy, Some(fee)) => quote_gross.saturating_sub(fee),
            (OrderSide::Sell, Some(fee)) => quote_gross.add(fee),
        }
    }

    /// Base fill plus the base-side fee (the BUY taker's spend).
    pub fn gross_base(&self, fill: &Money) -> Result<Money> {
        let fees = self.fees(fill)?;
        match fees.base_fee() {
            Some(fee) => fill.add(fee),
            None => Ok(fill.clone()),
        }
    }

    /// Base fill net of the base-side fee (the SELL taker's receive).
    pub fn net_base(&self, fill: &Money) -> Result<Money> {
        let fees = self.fees(fill)?;
        match fees.base_fee() {
            Some(fee) => fill.saturating_sub(fee),
            None => Ok(fill.clone()),
        }
    }

    /// What the taker pays for a given base fill.
    pub fn taker_spend(&self, fill: &Money) -> Result<Money> {
        match self.side {
            OrderSide::Buy => self.gross_base(fill),
            OrderSide::Sell => self.effective_quote(fill),
        }
    }

    /// What the taker receives for a given base fill.
    pub fn taker_receive(&self, fill: &Money) -> Result<Money> {
        match self.side {
            OrderSide::Buy => self.effective_quote(fill),
            OrderSide::Sell => self.net_base(fill),
        }
    }

    /// Reconstruct the base fill from a spend-side amount. One fee
    /// refinement step, exact for flat and proportional policies; the result
    /// is clamped into bounds.
    pub fn fill_for_spend(&self, spend: &Money) -> Result<Money> {
        match self.side {
            OrderSide::Buy => {
                if spend.currency() != self.pair.base() {
                    return Err(PathfinderError::invalid_input(format!(
                        "BUY spend currency {} does not match base {}",
                        spend.currency(),
                        self.pair.base()
                    )));
                }
                let probe = self.bounds.clamp(spend)?;
                let fees = self.fees(&probe)?;
                let fill = match fees.base_fee() {
                    Some(fee) => spend.saturating_sub(fee)?,
                    None => spend.clone(),
                };
                self.bounds.clamp(&fill)
            }
            OrderSide::Sell => {
                if spend.currency() != self.pair.quote() {
                    return Err(PathfinderError::invalid_input(format!(
                        "SELL spend currency {} does not match quote {}",
                        spend.currency(),
                        self.pair.quote()
                    )));
                }
                let scale = self
                    .bounds
                    .scale()
                    .max(spend.scale())
                    .max(self.rate.scale());
                let base_raw = decimal::div(spend.amount(), self.rate.rate(), scale)?;
                let probe = self.bounds.clamp(&Money::new(self.pair.base(), base_raw)?)?;
                let fees = self.fees(&probe)?;
                let net_quote = match fees.quote_fee() {
                    Some(fee) => spend.saturating_sub(fee)?,
                    None => spend.clone(),
                };
                let fill_raw = decimal::div(net_quote.amount(), self.rate.rate(), scale)?;
                self.bounds.clamp(&Money::new(self.pair.base(), fill_raw)?)
            }
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.side, self.pair, self.bounds, self.rate)
    }
}

/// Working-scale zero, handy as a cost/product seed.
pub fn working_zero() -> Decimal {
    decimal::normalize(Decimal::ZERO, WORKING_SCALE)
}
