//! Directed conversion multigraph
//!
//! Currency nodes with ordered outgoing edge lists, derived from an order
//! sequence by the builder. Supports two rebuild views for k-best style
//! enumeration: order exclusion and usage penalties.
//!
//! Author: AI-Generated
//! Created: 2026-02-12

mod builder;
mod edge;

pub use builder::GraphBuilder;
pub use edge::{
    CapacityMeasure, EdgeCapacity, EdgeFlow, EdgeSegment, EdgeSegments, FlowPart, GraphEdge,
};

use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::decimal;
use crate::error::{PathfinderError, Result};
use crate::types::{Order, OrderId};

/// A currency node with its ordered outgoing edges.
#[derive(Debug, Clone)]
pub struct GraphNode {
    currency: String,
    edges: Vec<Arc<GraphEdge>>,
}

impl GraphNode {
    fn new(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            edges: Vec::new(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn edges(&self) -> &[Arc<GraphEdge>] {
        &self.edges
    }
}

/// The conversion graph plus the build-time order registry.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: BTreeMap<String, GraphNode>,
    orders: BTreeMap<OrderId, Order>,
}

impl Graph {
    pub(crate) fn from_parts(
        nodes: BTreeMap<String, GraphNode>,
        orders: BTreeMap<OrderId, Order>,
    ) -> Self {
        Self { nodes, orders }
    }

    pub fn node(&self, currency: &str) -> Option<&GraphNode> {
        self.nodes.get(currency)
    }

    pub fn has_currency(&self, currency: &str) -> bool {
        self.nodes.contains_key(currency)
    }

    /// Outgoing edges of a currency; empty when the currency is unknown.
    pub fn edges_from(&self, currency: &str) -> &[Arc<GraphEdge>] {
        self.nodes
            .get(currency)
            .map(|node| node.edges())
            .unwrap_or(&[])
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|k| k.as_str())
    }

    pub fn order(&self, id: OrderId) -> Result<&Order> {
        self.orders
            .get(&id)
            .ok_or_else(|| PathfinderError::invalid_input(format!("unknown {id}")))
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.edges.len()).sum()
    }

    /// A view with the excluded orders' segments removed. Edges left without
    /// segments disappear; emptied nodes stay in the map (reachability is a
    /// search-time concern).
    pub fn without_orders(&self, excluded: &BTreeSet<OrderId>) -> Result<Graph> {
        let mut nodes = BTreeMap::new();
        for (currency, node) in &self.nodes {
            let mut kept = GraphNode::new(currency);
            for edge in &node.edges {
                if let Some(filtered) = edge.without_orders(excluded, &self.orders)? {
                    kept.edges.push(Arc::new(filtered));
                }
            }
            nodes.insert(currency.clone(), kept);
        }
        Ok(Graph {
            nodes,
            orders: self.orders.clone(),
        })
    }

    /// A view with each edge's conversion rate rescaled by
    /// `penalty_factor^usage`, where usage is the highest usage count among
    /// the edge's backing orders. Capacity is untouched; only the ranking
    /// changes, which is what diversification-aware searches want.
    pub fn with_order_penalties(
        &self,
        usage_counts: &BTreeMap<OrderId, u32>,
        penalty_factor: Decimal,
    ) -> Result<Graph> {
        if !decimal::is_positive(penalty_factor) || penalty_factor > Decimal::ONE {
            return Err(PathfinderError::invalid_input(format!(
                "penalty factor must be in (0, 1], got {penalty_factor}"
            )));
        }
        let mut nodes = BTreeMap::new();
        for (currency, node) in &self.nodes {
            let mut rebuilt = GraphNode::new(currency);
            for edge in &node.edges {
                let usage = edge
                    .segments()
                    .iter()
                    .filter_map(|s| usage_counts.get(&s.order_id()))
                    .copied()
                    .max()
                    .unwrap_or(0);
                if usage == 0 {
                    rebuilt.edges.push(Arc::clone(edge));
                    continue;
                }
                let factor = decimal::pow(penalty_factor, usage)?;
                let conversion = decimal::mul_at(
                    edge.conversion_rate(),
                    factor,
                    decimal::WORKING_SCALE,
                )?;
                let unit_cost = decimal::ratio(Decimal::ONE, conversion)?;
                rebuilt
                    .edges
                    .push(Arc::new(edge.with_conversion(conversion, unit_cost)));
            }
            nodes.insert(currency.clone(), rebuilt);
        }
        Ok(Graph {
            nodes,
            orders: self.orders.clone(),
        })
    }

    pub(crate) fn insert_edge(&mut self, edge: GraphEdge) {
        let node = self
            .nodes
            .entry(edge.from_node().to_string())
            .or_insert_with(|| GraphNode::new(edge.from_node()));
        // Target currency gets a node even without outgoing edges.
        let to = edge.to_node().to_string();
        node.edges.push(Arc::new(edge));
        self.nodes
            .entry(to.clone())
            .or_insert_with(|| GraphNode::new(&to));
    }

    pub(crate) fn register_order(&mut self, id: OrderId, order: Order) {
        self.orders.insert(id, order);
    }

    pub(crate) fn empty() -> Self {
        Self {
            nodes: BTreeMap::new(),
            orders: BTreeMap::new(),
        }
    }
}
