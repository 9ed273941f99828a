//! State registry with dominance-based deduplication
//!
//! Keyed by the normalized state signature. An existing record dominates a
//! newcomer when its (cost, hops, route) cascade is strictly smaller at the
//! working scale; dominated states are skipped, everything else replaces
//! the record and counts toward the visited-state guard.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::decimal::{self, WORKING_SCALE};
use crate::search::state::SearchState;

#[derive(Debug, Clone)]
struct RegistryRecord {
    cost: Decimal,
    hops: u32,
    route: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOutcome {
    /// An existing record is strictly better; skip expansion.
    Dominated,
    /// The state was recorded (fresh signature or replacement).
    Recorded,
}

/// Signature -> best-seen record, plus the visited-state accounting.
#[derive(Debug)]
pub struct StateRegistry {
    records: HashMap<String, RegistryRecord>,
    visited_states: u64,
    limit: u64,
}

impl StateRegistry {
    pub fn new(limit: u64) -> Self {
        Self {
            records: HashMap::new(),
            visited_states: 0,
            limit,
        }
    }

    pub fn visited_states(&self) -> u64 {
        self.visited_states
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// True once the visited-state limit has been consumed.
    pub fn limit_reached(&self) -> bool {
        self.visited_states >= self.limit
    }

    /// Dominance test and insert. The comparison cascade mirrors the path
    /// order key minus the insertion counter: costs at working scale, then
    /// hops, then the route prefix.
    pub fn observe(&mut self, signature: &str, state: &SearchState) -> RegistryOutcome {
        let route = state.route_signature();
        if let Some(existing) = self.records.get(signature) {
            let existing_key = (
                decimal::normalize(existing.cost, WORKING_SCALE),
                existing.hops,
                existing.route.as_str(),
            );
            let candidate_key = (
                decimal::normalize(state.cost(), WORKING_SCALE),
                state.hops(),
                route.as_str(),
            );
            if existing_key < candidate_key {
                return RegistryOutcome::Dominated;
            }
        }
        self.records.insert(
            signature.to_string(),
            RegistryRecord {
                cost: state.cost(),
                hops: state.hops(),
                route,
            },
        );
        self.visited_states += 1;
        RegistryOutcome::Recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::types::{AssetPair, ExchangeRate, Money, Order, OrderBounds, OrderSide};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn two_hop_state(cost: Decimal) -> SearchState {
        let ab = {
            let pair = AssetPair::new("AAA", "BBB").unwrap();
            let bounds = OrderBounds::new(
                Money::zero("AAA").unwrap(),
                Money::from_str("AAA", "100").unwrap(),
            )
            .unwrap();
            let rate = ExchangeRate::from_str(pair.clone(), "1.0000", 4).unwrap();
            Order::new(OrderSide::Buy, pair, bounds, rate, None).unwrap()
        };
        let graph = GraphBuilder::new().add_order(ab).build().unwrap();
        let edge = &graph.edges_from("AAA")[0];
        let initial = SearchState::initial("AAA", None, None, &BTreeSet::new()).unwrap();
        initial.advance(edge, cost, dec!(1), None)
    }

    #[test]
    fn test_fresh_signature_is_recorded() {
        let mut registry = StateRegistry::new(10);
        let state = two_hop_state(dec!(1));
        let sig = state.signature().unwrap().value();
        assert_eq!(registry.observe(&sig, &state), RegistryOutcome::Recorded);
        assert_eq!(registry.visited_states(), 1);
    }

    #[test]
    fn test_worse_cost_is_dominated() {
        let mut registry = StateRegistry::new(10);
        let better = two_hop_state(dec!(1));
        let worse = two_hop_state(dec!(2));
        let sig = better.signature().unwrap().value();
        registry.observe(&sig, &better);
        assert_eq!(registry.observe(&sig, &worse), RegistryOutcome::Dominated);
        assert_eq!(registry.visited_states(), 1);
    }

    #[test]
    fn test_better_cost_replaces() {
        let mut registry = StateRegistry::new(10);
        let worse = two_hop_state(dec!(2));
        let better = two_hop_state(dec!(1));
        let sig = worse.signature().unwrap().value();
        registry.observe(&sig, &worse);
        assert_eq!(registry.observe(&sig, &better), RegistryOutcome::Recorded);
        assert_eq!(registry.visited_states(), 2);
    }

    #[test]
    fn test_equal_key_is_not_dominated() {
        // Equal cascade means "not strictly smaller": re-recorded, so a
        // re-queued equal state is still expandable.
        let mut registry = StateRegistry::new(10);
        let a = two_hop_state(dec!(1));
        let b = two_hop_state(dec!(1));
        let sig = a.signature().unwrap().value();
        registry.observe(&sig, &a);
        assert_eq!(registry.observe(&sig, &b), RegistryOutcome::Recorded);
    }

    #[test]
    fn test_limit_reached() {
        let mut registry = StateRegistry::new(1);
        assert!(!registry.limit_reached());
        let state = two_hop_state(dec!(1));
        let sig = state.signature().unwrap().value();
        registry.observe(&sig, &state);
        assert!(registry.limit_reached());
    }

    #[test]
    fn test_zero_limit_blocks_immediately() {
        let registry = StateRegistry::new(0);
        assert!(registry.limit_reached());
    }
}
