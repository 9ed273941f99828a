//! Frontier states and spend ranges
//!
//! A `SearchState` is one node of the best-first frontier: position, cost,
//! running conversion product, the path prefix and the per-path visited set.
//! The spend-range carry narrows as mandatory floors and capacity ceilings
//! are reconciled edge by edge.
//!
//! Author: AI-Generated
//! Created: 2026-02-13
//! Modified: 2026-02-22 - desired-amount carry for plan searches

use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::decimal::{self, WORKING_SCALE};
use crate::error::{PathfinderError, Result};
use crate::graph::{EdgeCapacity, GraphEdge};
use crate::search::signature::{encode_money, encode_range, SearchStateSignature};
use crate::types::Money;

// ---------------------------------------------------------------------------
// SpendRange
// ---------------------------------------------------------------------------

/// Inclusive amount window in a single currency. Inverted ends are swapped
/// rather than rejected; scales propagate to the max of the operands before
/// arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendRange {
    min: Money,
    max: Money,
}

impl SpendRange {
    pub fn new(a: Money, b: Money) -> Result<Self> {
        if a.currency() != b.currency() {
            return Err(PathfinderError::invalid_input(format!(
                "range currency mismatch: {} vs {}",
                a.currency(),
                b.currency()
            )));
        }
        let scale = a.scale().max(b.scale());
        let a = a.at_scale(scale);
        let b = b.at_scale(scale);
        let (min, max) = if a.amount() > b.amount() { (b, a) } else { (a, b) };
        Ok(Self { min, max })
    }

    /// Degenerate single-point range.
    pub fn exact(amount: Money) -> Self {
        Self {
            min: amount.clone(),
            max: amount,
        }
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
        self.min.scale().max(self.max.scale())
    }

    /// Nearest boundary within the window.
    pub fn clamp(&self, value: &Money) -> Result<Money> {
        if value.cmp_amount(&self.min)? == std::cmp::Ordering::Less {
            return Ok(self.min.clone());
        }
        if value.cmp_amount(&self.max)? == std::cmp::Ordering::Greater {
            return Ok(self.max.clone());
        }
        Ok(value.clone())
    }

    /// Intersection with a capacity envelope in the same currency; None when
    /// the windows do not overlap.
    pub fn intersect_capacity(&self, capacity: &EdgeCapacity) -> Result<Option<SpendRange>> {
        let lower = if self.min.cmp_amount(capacity.min())? == std::cmp::Ordering::Less {
            capacity.min().clone()
        } else {
            self.min.clone()
        };
        let upper = if self.max.cmp_amount(capacity.max())? == std::cmp::Ordering::Greater {
            capacity.max().clone()
        } else {
            self.max.clone()
        };
        if lower.cmp_amount(&upper)? == std::cmp::Ordering::Greater {
            return Ok(None);
        }
        Ok(Some(SpendRange::new(lower, upper)?))
    }

    /// Convert both ends across an edge at its working-scale conversion
    /// rate, producing the receive-side window.
    pub fn convert(&self, edge: &GraphEdge) -> Result<SpendRange> {
        let min = edge.convert_forward(self.min.amount())?;
        let max = edge.convert_forward(self.max.amount())?;
        SpendRange::new(
            Money::new(edge.to_node(), min)?,
            Money::new(edge.to_node(), max)?,
        )
    }
}

impl std::fmt::Display for SpendRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

// ---------------------------------------------------------------------------
// SearchState
// ---------------------------------------------------------------------------

/// One frontier state of the best-first search.
#[derive(Debug, Clone)]
pub struct SearchState {
    node: String,
    cost: Decimal,
    product: Decimal,
    hops: u32,
    path: Vec<Arc<GraphEdge>>,
    amount_range: Option<SpendRange>,
    desired_amount: Option<Money>,
    visited: BTreeSet<String>,
}

impl SearchState {
    /// Source state: zero cost, unit product, visited = {node} plus any
    /// currencies the caller forbids routing through.
    pub fn initial(
        node: &str,
        amount_range: Option<SpendRange>,
        desired_amount: Option<Money>,
        blocked: &BTreeSet<String>,
    ) -> Result<Self> {
        let node = node.trim();
        if node.is_empty() {
            return Err(PathfinderError::invalid_input("empty source currency"));
        }
        let mut visited = blocked.clone();
        visited.insert(node.to_string());
        Ok(Self {
            node: node.to_string(),
            cost: decimal::normalize(Decimal::ZERO, WORKING_SCALE),
            product: decimal::normalize(Decimal::ONE, WORKING_SCALE),
            hops: 0,
            path: Vec::new(),
            amount_range,
            desired_amount,
            visited,
        })
    }

    pub fn node(&self) -> &str {
        &self.node
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

    pub fn path(&self) -> &[Arc<GraphEdge>] {
        &self.path
    }

    pub fn amount_range(&self) -> Option<&SpendRange> {
        self.amount_range.as_ref()
    }

    pub fn desired_amount(&self) -> Option<&Money> {
        self.desired_amount.as_ref()
    }

    pub fn visited(&self) -> &BTreeSet<String> {
        &self.visited
    }

    pub fn has_visited(&self, currency: &str) -> bool {
        self.visited.contains(currency)
    }

    /// Successor state: append the edge, extend the visited set, adopt the
    /// already-lifted cost, product and converted range.
    pub fn advance(
        &self,
        edge: &Arc<GraphEdge>,
        cost: Decimal,
        product: Decimal,
        amount_range: Option<SpendRange>,
    ) -> SearchState {
        let mut visited = self.visited.clone();
        visited.insert(edge.to_node().to_string());
        let mut path = self.path.clone();
        path.push(Arc::clone(edge));
        SearchState {
            node: edge.to_node().to_string(),
            cost,
            product,
            hops: self.hops + 1,
            path,
            amount_range,
            desired_amount: self.desired_amount.clone(),
            visited,
        }
    }

    /// Node chain from the path start to the current node.
    pub fn route_nodes(&self) -> Vec<&str> {
        let mut nodes = Vec::with_capacity(self.path.len() + 1);
        match self.path.first() {
            Some(first) => {
                nodes.push(first.from_node());
                for edge in &self.path {
                    nodes.push(edge.to_node());
                }
            }
            None => nodes.push(self.node.as_str()),
        }
        nodes
    }

    /// `A->B->C` route form used in ordering and dedup.
    pub fn route_signature(&self) -> String {
        self.route_nodes().join("->")
    }

    /// Registry key: node, range and desired-amount carry.
    pub fn signature(&self) -> Result<SearchStateSignature> {
        let range = encode_range(self.amount_range.as_ref());
        let desired = encode_money(self.desired_amount.as_ref());
        SearchStateSignature::compose(&[
            ("node", &self.node),
            ("range", &range),
            ("desired", &desired),
        ])
    }
}
