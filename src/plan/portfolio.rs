//! Multi-currency portfolio state
//!
//! The execution-plan engine threads an immutable portfolio through its
//! augmenting loop: balances per currency, the set of currencies already
//! drained by spending, and the orders consumed so far. Every transition
//! returns a fresh state; nothing is visible across branches.
//!
//! Author: AI-Generated
//! Created: 2026-02-19

use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use crate::decimal::{self, WORKING_SCALE};
use crate::error::{PathfinderError, Result};
use crate::types::{Money, OrderId};

/// Immutable multi-currency balance sheet for split/merge planning.
#[derive(Debug, Clone)]
pub struct PortfolioState {
    balances: BTreeMap<String, Money>,
    visited: BTreeSet<String>,
    used_orders: BTreeSet<OrderId>,
    total_cost: Decimal,
}

impl PortfolioState {
    /// Seed with the full spend in the source currency.
    pub fn initial(spend: Money) -> Self {
        let mut balances = BTreeMap::new();
        balances.insert(spend.currency().to_string(), spend);
        Self {
            balances,
            visited: BTreeSet::new(),
            used_orders: BTreeSet::new(),
            total_cost: decimal::normalize(Decimal::ZERO, WORKING_SCALE),
        }
    }

    pub fn balance(&self, currency: &str) -> Option<&Money> {
        self.balances.get(currency)
    }

    /// Currencies holding a positive balance, in lexicographic order.
    pub fn funded_currencies(&self) -> Vec<&Money> {
        self.balances
            .values()
            .filter(|money| money.is_positive())
            .collect()
    }

    pub fn visited(&self) -> &BTreeSet<String> {
        &self.visited
    }

    pub fn used_orders(&self) -> &BTreeSet<OrderId> {
        &self.used_orders
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    /// A currency can receive funds while it is unvisited or still carries
    /// residual balance from another route.
    pub fn can_receive(&self, currency: &str) -> bool {
        if !self.visited.contains(currency) {
            return true;
        }
        self.balances
            .get(currency)
            .map(|money| money.is_positive())
            .unwrap_or(false)
    }

    /// Currencies that can no longer participate: drained and marked
    /// visited. Seeded into augmenting searches as pre-visited nodes.
    pub fn blocked_currencies(&self) -> BTreeSet<String> {
        self.visited
            .iter()
            .filter(|currency| !self.can_receive(currency))
            .cloned()
            .collect()
    }

    /// Execute one fill: spend from one balance, receive into another, and
    /// account the fill's cost. Enforces every portfolio invariant and
    /// returns the successor state.
    pub fn execute_order(
        &self,
        order_id: OrderId,
        spend: &Money,
        received: &Money,
        cost: Decimal,
    ) -> Result<PortfolioState> {
        if self.used_orders.contains(&order_id) {
            return Err(PathfinderError::invalid_input(format!(
                "{order_id} already executed in this plan"
            )));
        }
        let available = self.balances.get(spend.currency()).ok_or_else(|| {
            PathfinderError::invalid_input(format!(
                "no balance in {} to spend",
                spend.currency()
            ))
        })?;
        if available.cmp_amount(spend)? == std::cmp::Ordering::Less {
            return Err(PathfinderError::invalid_input(format!(
                "insufficient balance: {} < {}",
                available, spend
            )));
        }
        if !self.can_receive(received.currency()) {
            return Err(PathfinderError::invalid_input(format!(
                "currency {} is drained and cannot receive",
                received.currency()
            )));
        }

        let mut next = self.clone();
        let remaining = available.sub(spend)?;
        next.balances
            .insert(spend.currency().to_string(), remaining);
        let target_balance = match next.balances.get(received.currency()) {
            Some(existing) => existing.add(received)?,
            None => received.clone(),
        };
        next.balances
            .insert(received.currency().to_string(), target_balance);
        // Drained by spending: visited from this point on.
        let drained = next
            .balances
            .get(spend.currency())
            .map(|money| money.is_zero())
            .unwrap_or(true);
        if drained {
            next.visited.insert(spend.currency().to_string());
        }
        next.used_orders.insert(order_id);
        next.total_cost = decimal::sum_at(next.total_cost, cost, WORKING_SCALE)?;
        Ok(next)
    }
}
