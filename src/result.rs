//! Result shaping
//!
//! Terminal search states become `CandidatePath`s; the materializer walks
//! the edge sequence with the actual spend, reconstructing per-leg fills,
//! fees and totals, and stamps the residual tolerance against the best
//! candidate. The result set keeps the composite ordering it was built in.
//!
//! Author: AI-Generated
//! Created: 2026-02-16
//! Modified: 2026-02-24 - aggregated fee breakdown by currency

use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::decimal::{self, WORKING_SCALE};
use crate::error::Result;
use crate::graph::{Graph, GraphEdge};
use crate::search::guards::SearchGuardReport;
use crate::search::queue::PathOrderKey;
use crate::search::state::{SearchState, SpendRange};
use crate::types::{FeeBreakdown, Money};

// ---------------------------------------------------------------------------
// CandidatePath
// ---------------------------------------------------------------------------

/// A complete path as emitted by the search engine, before materialization.
#[derive(Debug, Clone)]
pub struct CandidatePath {
    cost: Decimal,
    product: Decimal,
    hops: u32,
    edges: Vec<Arc<GraphEdge>>,
    amount_range: Option<SpendRange>,
    route: String,
    insertion: u64,
}

impl CandidatePath {
    pub fn from_state(state: &SearchState, key: &PathOrderKey) -> Self {
        Self {
            cost: state.cost(),
            product: state.product(),
            hops: state.hops(),
            edges: state.path().to_vec(),
            amount_range: state.amount_range().cloned(),
            route: key.route().to_string(),
            insertion: key.insertion(),
        }
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    pub fn product(&self) -> Decimal {
        self.product
    }

    pub fn hops(&self) -> u32 {
        self.hops
    }

    pub fn edges(&self) -> &[Arc<GraphEdge>] {
        &self.edges
    }

    pub fn amount_range(&self) -> Option<&SpendRange> {
        self.amount_range.as_ref()
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn insertion(&self) -> u64 {
        self.insertion
    }
}

// ---------------------------------------------------------------------------
// PathLeg / PathResult
// ---------------------------------------------------------------------------

/// One materialized conversion step.
#[derive(Debug, Clone)]
pub struct PathLeg {
    from: String,
    to: String,
    spent: Money,
    received: Money,
    fees: BTreeMap<String, Money>,
}

impl PathLeg {
    pub(crate) fn new(
        from: String,
        to: String,
        spent: Money,
        received: Money,
        fees: BTreeMap<String, Money>,
    ) -> Self {
        Self {
            from,
            to,
            spent,
            received,
            fees,
        }
    }

    pub fn from_currency(&self) -> &str {
        &self.from
    }

    pub fn to_currency(&self) -> &str {
        &self.to
    }

    pub fn spent(&self) -> &Money {
        &self.spent
    }

    pub fn received(&self) -> &Money {
        &self.received
    }

    pub fn fees(&self) -> &BTreeMap<String, Money> {
        &self.fees
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "from": self.from,
            "to": self.to,
            "spent": self.spent.to_json(),
            "received": self.received.to_json(),
            "fees": fees_json(&self.fees),
        })
    }
}

/// A fully materialized path: totals, legs, fees and the residual tolerance
/// relative to the best candidate.
#[derive(Debug, Clone)]
pub struct PathResult {
    total_spent: Money,
    total_received: Money,
    residual_tolerance: Decimal,
    fee_breakdown: BTreeMap<String, Money>,
    legs: Vec<PathLeg>,
    cost: Decimal,
    product: Decimal,
    hops: u32,
    route: String,
}

impl PathResult {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        total_spent: Money,
        total_received: Money,
        residual_tolerance: Decimal,
        fee_breakdown: BTreeMap<String, Money>,
        legs: Vec<PathLeg>,
        cost: Decimal,
        product: Decimal,
        hops: u32,
        route: String,
    ) -> Self {
        Self {
            total_spent,
            total_received,
            residual_tolerance,
            fee_breakdown,
            legs,
            cost,
            product,
            hops,
            route,
        }
    }

    pub fn total_spent(&self) -> &Money {
        &self.total_spent
    }

    pub fn total_received(&self) -> &Money {
        &self.total_received
    }

    /// Slack ratio against the best candidate at working scale; zero for
    /// the best path itself.
    pub fn residual_tolerance(&self) -> Decimal {
        self.residual_tolerance
    }

    pub fn fee_breakdown(&self) -> &BTreeMap<String, Money> {
        &self.fee_breakdown
    }

    pub fn legs(&self) -> &[PathLeg] {
        &self.legs
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    pub fn product(&self) -> Decimal {
        self.product
    }

    pub fn hops(&self) -> u32 {
        self.hops
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "totalSpent": self.total_spent.to_json(),
            "totalReceived": self.total_received.to_json(),
            "residualTolerance": decimal::render(self.residual_tolerance, WORKING_SCALE),
            "feeBreakdown": fees_json(&self.fee_breakdown),
            "legs": self.legs.iter().map(|leg| leg.to_json()).collect::<Vec<_>>(),
        })
    }
}

fn fees_json(fees: &BTreeMap<String, Money>) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (currency, money) in fees {
        map.insert(currency.clone(), money.to_json());
    }
    serde_json::Value::Object(map)
}

fn accumulate_fee(target: &mut BTreeMap<String, Money>, fee: &Money) -> Result<()> {
    match target.get(fee.currency()) {
        Some(existing) => {
            let merged = existing.add(fee)?;
            target.insert(fee.currency().to_string(), merged);
        }
        None => {
            target.insert(fee.currency().to_string(), fee.clone());
        }
    }
    Ok(())
}

fn accumulate_breakdown(target: &mut BTreeMap<String, Money>, fees: &FeeBreakdown) -> Result<()> {
    for component in fees.components() {
        accumulate_fee(target, component)?;
    }
    Ok(())
}

/// Walk the candidate's edges with the actual spend, producing legs, fees
/// and totals. `best_cost` anchors the residual tolerance.
pub fn materialize_candidate(
    graph: &Graph,
    candidate: &CandidatePath,
    spend: &Money,
    best_cost: Decimal,
) -> Result<PathResult> {
    let mut legs = Vec::with_capacity(candidate.edges.len());
    let mut fee_breakdown = BTreeMap::new();
    let mut cursor = spend.clone();
    for edge in &candidate.edges {
        let flow = edge.apply_spend(graph, &cursor)?;
        let mut leg_fees = BTreeMap::new();
        for part in &flow.parts {
            accumulate_breakdown(&mut leg_fees, &part.fees)?;
            accumulate_breakdown(&mut fee_breakdown, &part.fees)?;
        }
        legs.push(PathLeg {
            from: edge.from_node().to_string(),
            to: edge.to_node().to_string(),
            spent: flow.spent.clone(),
            received: flow.received.clone(),
            fees: leg_fees,
        });
        cursor = flow.received;
    }
    let residual = residual_tolerance(candidate.cost, best_cost)?;
    Ok(PathResult {
        total_spent: spend.clone(),
        total_received: cursor,
        residual_tolerance: residual,
        fee_breakdown,
        legs,
        cost: candidate.cost,
        product: candidate.product,
        hops: candidate.hops,
        route: candidate.route.clone(),
    })
}

/// `(cost - best) / cost` at working scale, clamped to zero for the best
/// path. Bounded by the configured tolerance via the amplifier prune.
pub fn residual_tolerance(cost: Decimal, best_cost: Decimal) -> Result<Decimal> {
    if decimal::cmp_at(cost, best_cost, Some(WORKING_SCALE)) != std::cmp::Ordering::Greater {
        return Ok(decimal::normalize(Decimal::ZERO, WORKING_SCALE));
    }
    decimal::ratio(cost - best_cost, cost)
}

// ---------------------------------------------------------------------------
// PathResultSet / SearchOutcome
// ---------------------------------------------------------------------------

/// Ordered, bounded collection of materialized paths.
#[derive(Debug, Clone, Default)]
pub struct PathResultSet {
    results: Vec<PathResult>,
}

impl PathResultSet {
    pub fn new(results: Vec<PathResult>) -> Self {
        Self { results }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PathResult> {
        self.results.get(index)
    }

    pub fn first(&self) -> Option<&PathResult> {
        self.results.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[PathResult] {
        &self.results
    }

    /// Sub-slice view; out-of-range ends are clamped.
    pub fn slice(&self, start: usize, end: usize) -> &[PathResult] {
        let end = end.min(self.results.len());
        let start = start.min(end);
        &self.results[start..end]
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!(self
            .results
            .iter()
            .map(|result| result.to_json())
            .collect::<Vec<_>>())
    }
}

impl std::ops::Index<usize> for PathResultSet {
    type Output = PathResult;

    fn index(&self, index: usize) -> &Self::Output {
        &self.results[index]
    }
}

impl<'a> IntoIterator for &'a PathResultSet {
    type Item = &'a PathResult;
    type IntoIter = std::slice::Iter<'a, PathResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

impl serde::Serialize for PathResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.to_json(), serializer)
    }
}

impl serde::Serialize for PathResultSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.to_json(), serializer)
    }
}

/// The search engine's complete answer: ranked paths plus the guard report.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    paths: PathResultSet,
    guard_limits: SearchGuardReport,
}

impl SearchOutcome {
    pub fn new(paths: PathResultSet, guard_limits: SearchGuardReport) -> Self {
        Self {
            paths,
            guard_limits,
        }
    }

    pub fn paths(&self) -> &PathResultSet {
        &self.paths
    }

    pub fn guard_limits(&self) -> &SearchGuardReport {
        &self.guard_limits
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "paths": self.paths.to_json(),
            "guardLimits": self.guard_limits.to_json(),
        })
    }
}

impl serde::Serialize for SearchOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.to_json(), serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::search::queue::PathOrderKey;
    use crate::types::{AssetPair, ExchangeRate, Order, OrderBounds, OrderSide};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn order(base: &str, quote: &str, rate: &str, max: &str) -> Order {
        let pair = AssetPair::new(base, quote).unwrap();
        let bounds = OrderBounds::new(
            Money::zero(base).unwrap(),
            Money::from_str(base, max).unwrap(),
        )
        .unwrap();
        let rate = ExchangeRate::from_str(pair.clone(), rate, 4).unwrap();
        Order::new(OrderSide::Buy, pair, bounds, rate, None).unwrap()
    }

    fn candidate_through(graph: &Graph, nodes: &[&str]) -> CandidatePath {
        let mut state =
            SearchState::initial(nodes[0], None, None, &BTreeSet::new()).unwrap();
        for window in nodes.windows(2) {
            let edge = graph
                .edges_from(window[0])
                .iter()
                .find(|e| e.to_node() == window[1])
                .unwrap()
                .clone();
            let cost = decimal::sum_at(
                state.cost(),
                edge.unit_cost(),
                WORKING_SCALE,
            )
            .unwrap();
            let product =
                decimal::mul_at(state.product(), edge.conversion_rate(), WORKING_SCALE).unwrap();
            state = state.advance(&edge, cost, product, None);
        }
        let key = PathOrderKey::new(state.cost(), state.hops(), state.route_signature(), 0);
        CandidatePath::from_state(&state, &key)
    }

    #[test]
    fn test_materialize_two_hops() {
        let graph = GraphBuilder::new()
            .add_orders(vec![
                order("AAA", "BBB", "2.0000", "100"),
                order("BBB", "CCC", "0.5000", "500"),
            ])
            .build()
            .unwrap();
        let candidate = candidate_through(&graph, &["AAA", "BBB", "CCC"]);
        let spend = Money::from_str("AAA", "50").unwrap();
        let result =
            materialize_candidate(&graph, &candidate, &spend, candidate.cost()).unwrap();

        assert_eq!(result.total_spent().currency(), "AAA");
        assert_eq!(result.total_spent().amount(), dec!(50));
        assert_eq!(result.total_received().currency(), "CCC");
        assert_eq!(result.total_received().amount(), dec!(50.0000));
        assert_eq!(result.legs().len(), 2);
        assert_eq!(result.legs()[0].from_currency(), "AAA");
        assert_eq!(result.legs()[0].received().amount(), dec!(100.0000));
        assert_eq!(result.legs()[1].to_currency(), "CCC");
        assert_eq!(result.residual_tolerance(), Decimal::ZERO);
        assert!(result.fee_breakdown().is_empty());
    }

    #[test]
    fn test_residual_tolerance() {
        let zero = residual_tolerance(dec!(2), dec!(2)).unwrap();
        assert_eq!(zero, dec!(0));
        // (2.5 - 2) / 2.5 = 0.2
        let residual = residual_tolerance(dec!(2.5), dec!(2)).unwrap();
        assert_eq!(residual, dec!(0.2));
        // best below cost only; a better-than-best cost clamps to zero
        let clamped = residual_tolerance(dec!(1.5), dec!(2)).unwrap();
        assert_eq!(clamped, dec!(0));
    }

    #[test]
    fn test_result_set_access() {
        let graph = GraphBuilder::new()
            .add_order(order("AAA", "BBB", "1.0000", "100"))
            .build()
            .unwrap();
        let candidate = candidate_through(&graph, &["AAA", "BBB"]);
        let spend = Money::from_str("AAA", "10").unwrap();
        let result =
            materialize_candidate(&graph, &candidate, &spend, candidate.cost()).unwrap();
        let set = PathResultSet::new(vec![result.clone(), result]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.slice(0, 1).len(), 1);
        assert_eq!(set.slice(1, 10).len(), 1);
        assert_eq!(set[0].total_spent().amount(), dec!(10));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn test_path_json_shape() {
        let graph = GraphBuilder::new()
            .add_order(order("AAA", "BBB", "1.0000", "100"))
            .build()
            .unwrap();
        let candidate = candidate_through(&graph, &["AAA", "BBB"]);
        let spend = Money::from_str("AAA", "10").unwrap();
        let result =
            materialize_candidate(&graph, &candidate, &spend, candidate.cost()).unwrap();
        let v = result.to_json();
        assert_eq!(v["totalSpent"]["currency"], "AAA");
        assert_eq!(v["totalReceived"]["currency"], "BBB");
        assert_eq!(
            v["residualTolerance"],
            "0.000000000000000000"
        );
        assert!(v["legs"].as_array().unwrap().len() == 1);
        assert_eq!(v["legs"][0]["from"], "AAA");
        assert_eq!(v["legs"][0]["to"], "BBB");
    }
}
