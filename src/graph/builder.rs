//! Graph construction from an order sequence
//!
//! Assigns stable ids by insertion position and coalesces orders with
//! identical (from, to, rate, fee fingerprint) into a single edge whose
//! segments accumulate their capacity windows.
//!
//! Author: AI-Generated
//! Created: 2026-02-12

use std::collections::HashMap;

use tracing::debug;

use crate::decimal;
use crate::error::Result;
use crate::graph::edge::{EdgeSegment, EdgeSegments, GraphEdge};
use crate::graph::Graph;
use crate::types::{Order, OrderId, OrderSide};

#[derive(Debug, Default)]
pub struct GraphBuilder {
    orders: Vec<Order>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn add_orders(mut self, orders: impl IntoIterator<Item = Order>) -> Self {
        self.orders.extend(orders);
        self
    }

    pub fn build(self) -> Result<Graph> {
        let mut graph = Graph::empty();
        for (index, order) in self.orders.iter().enumerate() {
            graph.register_order(OrderId(index), order.clone());
        }

        // Coalesce by (from, to, rate, fee fingerprint), preserving the
        // first-occurrence order of edges.
        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut index_by_key: HashMap<String, usize> = HashMap::new();
        for (index, order) in self.orders.into_iter().enumerate() {
            let id = OrderId(index);
            let segment = EdgeSegment::from_order(id, &order)?;
            let (from, to) = match order.side() {
                OrderSide::Buy => (order.pair().base(), order.pair().quote()),
                OrderSide::Sell => (order.pair().quote(), order.pair().base()),
            };
            let key = format!(
                "{from}|{to}|{}|{}",
                decimal::render(order.rate().rate(), order.rate().scale()),
                order.fee_fingerprint()
            );
            match index_by_key.get(&key) {
                Some(&slot) => edges[slot].push_segment(segment),
                None => {
                    let edge = GraphEdge::new(id, order, EdgeSegments::new(vec![segment])?)?;
                    index_by_key.insert(key, edges.len());
                    edges.push(edge);
                }
            }
        }

        let edge_total = edges.len();
        for edge in edges {
            graph.insert_edge(edge);
        }
        debug!(
            orders = graph.order_count(),
            edges = edge_total,
            "graph built"
        );
        Ok(graph)
    }
}
