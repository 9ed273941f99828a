//! Search configuration and request boundary
//!
//! The fluent builder is the only configuration surface of the engine.
//! Tolerances are accepted as numeric strings only; a float-typed API would
//! smuggle binary rounding into the tolerance math.
//!
//! Author: AI-Generated
//! Created: 2026-02-15

use rust_decimal::Decimal;

use crate::decimal;
use crate::error::{PathfinderError, Result};
use crate::types::{validate_currency, Money, Order};

/// Default bounded result count when `result_limit` is not set.
pub const DEFAULT_RESULT_LIMIT: usize = 5;

/// Default visited-state ceiling.
pub const DEFAULT_MAX_VISITED_STATES: u64 = 10_000;

/// Default expansion ceiling.
pub const DEFAULT_MAX_EXPANSIONS: u64 = 50_000;

// ---------------------------------------------------------------------------
// ToleranceBounds
// ---------------------------------------------------------------------------

/// Residual tolerance window, both ends in [0, 1). The upper end drives the
/// amplifier prune; the lower end filters the final result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToleranceBounds {
    min: Decimal,
    max: Decimal,
}

impl ToleranceBounds {
    pub fn from_strings(min: &str, max: &str) -> Result<Self> {
        let min = decimal::parse(min)?;
        let max = decimal::parse(max)?;
        for value in [min, max] {
            if decimal::is_negative(value) || value >= Decimal::ONE {
                return Err(PathfinderError::invalid_input(format!(
                    "tolerance {value} outside [0, 1)"
                )));
            }
        }
        if min > max {
            return Err(PathfinderError::invalid_input(format!(
                "inverted tolerance bounds: {min} > {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn zero() -> Self {
        Self {
            min: Decimal::ZERO,
            max: Decimal::ZERO,
        }
    }

    pub fn min(&self) -> Decimal {
        self.min
    }

    pub fn max(&self) -> Decimal {
        self.max
    }

    /// `1 / (1 - max)` at working scale. Tolerance 0 yields exactly 1: no
    /// slack above the best candidate cost.
    pub fn amplifier(&self) -> Result<Decimal> {
        decimal::ratio(Decimal::ONE, Decimal::ONE - self.max)
    }
}

// ---------------------------------------------------------------------------
// GuardLimits
// ---------------------------------------------------------------------------

/// Configured guard ceilings. All limits are at least 1 at this boundary;
/// the zero-limit escape hatch exists only on `SearchGuards` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardLimits {
    max_visited_states: u64,
    max_expansions: u64,
    time_budget_ms: Option<u64>,
}

impl GuardLimits {
    pub fn new(
        max_visited_states: u64,
        max_expansions: u64,
        time_budget_ms: Option<u64>,
    ) -> Result<Self> {
        if max_visited_states < 1 {
            return Err(PathfinderError::invalid_input(
                "visited-state limit must be at least 1",
            ));
        }
        if max_expansions < 1 {
            return Err(PathfinderError::invalid_input(
                "expansion limit must be at least 1",
            ));
        }
        if let Some(budget) = time_budget_ms {
            if budget < 1 {
                return Err(PathfinderError::invalid_input(
                    "time budget must be at least 1ms",
                ));
            }
        }
        Ok(Self {
            max_visited_states,
            max_expansions,
            time_budget_ms,
        })
    }

    pub fn max_visited_states(&self) -> u64 {
        self.max_visited_states
    }

    pub fn max_expansions(&self) -> u64 {
        self.max_expansions
    }

    pub fn time_budget_ms(&self) -> Option<u64> {
        self.time_budget_ms
    }
}

impl Default for GuardLimits {
    fn default() -> Self {
        Self {
            max_visited_states: DEFAULT_MAX_VISITED_STATES,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            time_budget_ms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// PathSearchConfig
// ---------------------------------------------------------------------------

/// Validated, immutable search configuration.
#[derive(Debug, Clone)]
pub struct PathSearchConfig {
    spend_amount: Money,
    tolerance: ToleranceBounds,
    min_hops: u32,
    max_hops: u32,
    guards: GuardLimits,
    result_limit: usize,
    guard_limit_exception: bool,
}

impl PathSearchConfig {
    pub fn builder() -> PathSearchConfigBuilder {
        PathSearchConfigBuilder::default()
    }

    pub fn spend_amount(&self) -> &Money {
        &self.spend_amount
    }

    pub fn tolerance(&self) -> &ToleranceBounds {
        &self.tolerance
    }

    pub fn min_hops(&self) -> u32 {
        self.min_hops
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    pub fn guards(&self) -> &GuardLimits {
        &self.guards
    }

    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    pub fn guard_limit_exception(&self) -> bool {
        self.guard_limit_exception
    }
}

/// Fluent builder; every option is validated at `build`.
#[derive(Debug, Default)]
pub struct PathSearchConfigBuilder {
    spend_amount: Option<Money>,
    tolerance: Option<(String, String)>,
    hop_limits: Option<(u32, u32)>,
    guards: Option<(u64, u64, Option<u64>)>,
    result_limit: Option<usize>,
    guard_limit_exception: bool,
}

impl PathSearchConfigBuilder {
    pub fn spend_amount(mut self, spend: Money) -> Self {
        self.spend_amount = Some(spend);
        self
    }

    /// Tolerance window as numeric strings, both in [0, 1).
    pub fn tolerance_bounds(mut self, min: &str, max: &str) -> Self {
        self.tolerance = Some((min.to_string(), max.to_string()));
        self
    }

    pub fn hop_limits(mut self, min: u32, max: u32) -> Self {
        self.hop_limits = Some((min, max));
        self
    }

    pub fn search_guards(
        mut self,
        max_visited_states: u64,
        max_expansions: u64,
        time_budget_ms: Option<u64>,
    ) -> Self {
        self.guards = Some((max_visited_states, max_expansions, time_budget_ms));
        self
    }

    pub fn result_limit(mut self, limit: usize) -> Self {
        self.result_limit = Some(limit);
        self
    }

    /// Escalate guard breaches to `GuardLimitExceeded` instead of reporting
    /// them through the metadata.
    pub fn guard_limit_exception(mut self) -> Self {
        self.guard_limit_exception = true;
        self
    }

    pub fn build(self) -> Result<PathSearchConfig> {
        let spend_amount = self
            .spend_amount
            .ok_or_else(|| PathfinderError::invalid_input("spend amount is required"))?;
        let (min_hops, max_hops) = self
            .hop_limits
            .ok_or_else(|| PathfinderError::invalid_input("hop limits are required"))?;
        if min_hops < 1 {
            return Err(PathfinderError::invalid_input(format!(
                "minimum hop count must be at least 1, got {min_hops}"
            )));
        }
        if max_hops < min_hops {
            return Err(PathfinderError::invalid_input(format!(
                "maximum hop count {max_hops} below minimum {min_hops}"
            )));
        }
        let tolerance = match self.tolerance {
            Some((min, max)) => ToleranceBounds::from_strings(&min, &max)?,
            None => ToleranceBounds::zero(),
        };
        let guards = match self.guards {
            Some((visited, expansions, budget)) => GuardLimits::new(visited, expansions, budget)?,
            None => GuardLimits::default(),
        };
        let result_limit = self.result_limit.unwrap_or(DEFAULT_RESULT_LIMIT);
        if result_limit < 1 {
            return Err(PathfinderError::invalid_input(
                "result limit must be at least 1",
            ));
        }
        Ok(PathSearchConfig {
            spend_amount,
            tolerance,
            min_hops,
            max_hops,
            guards,
            result_limit,
            guard_limit_exception: self.guard_limit_exception,
        })
    }
}

// ---------------------------------------------------------------------------
// PathSearchRequest
// ---------------------------------------------------------------------------

/// Order book plus config plus the target currency.
#[derive(Debug, Clone)]
pub struct PathSearchRequest {
    orders: Vec<Order>,
    config: PathSearchConfig,
    target_currency: String,
}

impl PathSearchRequest {
    pub fn new(
        orders: Vec<Order>,
        config: PathSearchConfig,
        target_currency: &str,
    ) -> Result<Self> {
        let target = target_currency.trim().to_uppercase();
        if target.is_empty() {
            return Err(PathfinderError::invalid_input("empty target currency"));
        }
        validate_currency(&target)?;
        Ok(Self {
            orders,
            config,
            target_currency: target,
        })
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn into_parts(self) -> (Vec<Order>, PathSearchConfig, String) {
        (self.orders, self.config, self.target_currency)
    }

    pub fn config(&self) -> &PathSearchConfig {
        &self.config
    }

    pub fn target_currency(&self) -> &str {
        &self.target_currency
    }
}
