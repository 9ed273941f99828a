//! Graph edges and capacity segments
//!
//! An edge bundles every order with identical (from, to, rate, fee
//! fingerprint) into one traversable arc. Each backing order contributes a
//! segment carrying its capacity intervals in three measures; mandatory
//! segments keep their lower bound as a floor that any flow through the
//! edge must cover.
//!
//! Author: AI-Generated
//! Created: 2026-02-12
//! Modified: 2026-02-21 - per-segment spend allocation for fills

use rust_decimal::Decimal;

use crate::decimal::{self, WORKING_SCALE};
use crate::error::{PathfinderError, Result};
use crate::graph::Graph;
use crate::types::{ExchangeRate, FeeBreakdown, Money, Order, OrderId, OrderSide};

// ---------------------------------------------------------------------------
// Capacity measures and intervals
// ---------------------------------------------------------------------------

/// The three measures a segment's capacity is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityMeasure {
    /// Raw base fill window.
    Base,
    /// Quote leg as experienced by the taker.
    Quote,
    /// Base fill inflated by base-side fees.
    GrossBase,
}

/// Inclusive capacity interval in one currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCapacity {
    min: Money,
    max: Money,
}

impl EdgeCapacity {
    pub fn new(min: Money, max: Money) -> Result<Self> {
        if min.currency() != max.currency() {
            return Err(PathfinderError::invalid_input(format!(
                "capacity currency mismatch: {} vs {}",
                min.currency(),
                max.currency()
            )));
        }
        if min.cmp_amount(&max)? == std::cmp::Ordering::Greater {
            return Err(PathfinderError::invalid_input(format!(
                "inverted capacity: min {} > max {}",
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
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// One backing order's capacity contribution to an edge.
#[derive(Debug, Clone)]
pub struct EdgeSegment {
    order_id: OrderId,
    base: EdgeCapacity,
    quote: EdgeCapacity,
    gross_base: EdgeCapacity,
    mandatory: bool,
    fee_fingerprint: String,
}

impl EdgeSegment {
    /// Derive the segment from an order's bounds: the base interval is the
    /// bounds window, the quote and gross-base intervals are the taker-side
    /// flows at the window ends. A non-zero lower bound makes the segment
    /// mandatory.
    pub fn from_order(order_id: OrderId, order: &Order) -> Result<Self> {
        let bounds = order.bounds();
        let base = EdgeCapacity::new(bounds.min().clone(), bounds.max().clone())?;
        let quote = EdgeCapacity::new(
            order.effective_quote(bounds.min())?,
            order.effective_quote(bounds.max())?,
        )?;
        let gross_base = EdgeCapacity::new(
            order.gross_base(bounds.min())?,
            order.gross_base(bounds.max())?,
        )?;
        Ok(Self {
            order_id,
            base,
            quote,
            gross_base,
            mandatory: bounds.min().is_positive(),
            fee_fingerprint: order.fee_fingerprint(),
        })
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn capacity(&self, measure: CapacityMeasure) -> &EdgeCapacity {
        match measure {
            CapacityMeasure::Base => &self.base,
            CapacityMeasure::Quote => &self.quote,
            CapacityMeasure::GrossBase => &self.gross_base,
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn fee_fingerprint(&self) -> &str {
        &self.fee_fingerprint
    }
}

/// Ordered collection of an edge's segments.
#[derive(Debug, Clone)]
pub struct EdgeSegments {
    segments: Vec<EdgeSegment>,
}

impl EdgeSegments {
    pub fn new(segments: Vec<EdgeSegment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(PathfinderError::invalid_input(
                "edge requires at least one segment",
            ));
        }
        Ok(Self { segments })
    }

    pub fn push(&mut self, segment: EdgeSegment) {
        self.segments.push(segment);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EdgeSegment> {
        self.segments.iter()
    }

    /// Max scale across segments for a measure.
    pub fn capacity_scale(&self, measure: CapacityMeasure) -> u32 {
        self.segments
            .iter()
            .map(|s| {
                let cap = s.capacity(measure);
                cap.min().scale().max(cap.max().scale())
            })
            .max()
            .unwrap_or(0)
    }

    /// Aggregate capacity at `scale`: the floor is the sum of mandatory
    /// segments' lower bounds, the ceiling the sum of all upper bounds.
    pub fn capacity_totals(&self, measure: CapacityMeasure, scale: u32) -> Result<EdgeCapacity> {
        let currency = self.segments[0].capacity(measure).currency().to_string();
        let mut floor = Money::zero(&currency)?.at_scale(scale);
        let mut ceiling = floor.clone();
        for segment in &self.segments {
            let cap = segment.capacity(measure);
            if segment.is_mandatory() {
                floor = floor.add(&cap.min().at_scale(scale))?;
            }
            ceiling = ceiling.add(&cap.max().at_scale(scale))?;
        }
        EdgeCapacity::new(floor, ceiling)
    }
}

// ---------------------------------------------------------------------------
// Edge flow (materialized spend)
// ---------------------------------------------------------------------------

/// One segment's share of a flow pushed through an edge.
#[derive(Debug, Clone)]
pub struct FlowPart {
    pub order_id: OrderId,
    pub spend: Money,
    pub fill: Money,
    pub received: Money,
    pub fees: FeeBreakdown,
    /// Share of the edge's unit cost, proportional to the spend share.
    pub cost: Decimal,
}

/// The result of pushing a spend-side amount through an edge: per-segment
/// parts plus aggregated totals.
#[derive(Debug, Clone)]
pub struct EdgeFlow {
    pub spent: Money,
    pub received: Money,
    pub fees: FeeBreakdown,
    pub parts: Vec<FlowPart>,
}

// ---------------------------------------------------------------------------
// GraphEdge
// ---------------------------------------------------------------------------

/// A directed arc of the conversion graph. `from` is the currency the taker
/// spends, `to` the one received: base for BUY, quote for SELL.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    from: String,
    to: String,
    side: OrderSide,
    order_id: OrderId,
    order: Order,
    rate: ExchangeRate,
    conversion_rate: Decimal,
    unit_cost: Decimal,
    segments: EdgeSegments,
}

impl GraphEdge {
    pub fn new(order_id: OrderId, order: Order, segments: EdgeSegments) -> Result<Self> {
        let (from, to) = match order.side() {
            OrderSide::Buy => (order.pair().base(), order.pair().quote()),
            OrderSide::Sell => (order.pair().quote(), order.pair().base()),
        };
        let reference = order.bounds().max().clone();
        if reference.is_zero() {
            return Err(PathfinderError::invalid_input(format!(
                "order {order_id} has no capacity: bounds max is zero"
            )));
        }
        let spend_ref = order.taker_spend(&reference)?;
        let receive_ref = order.taker_receive(&reference)?;
        if !spend_ref.is_positive() || !receive_ref.is_positive() {
            return Err(PathfinderError::invalid_input(format!(
                "order {order_id} converts to nothing after fees"
            )));
        }
        let conversion_rate = decimal::ratio(receive_ref.amount(), spend_ref.amount())?;
        let unit_cost = decimal::ratio(spend_ref.amount(), receive_ref.amount())?;
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            side: order.side(),
            order_id,
            rate: order.rate().clone(),
            order,
            conversion_rate,
            unit_cost,
            segments,
        })
    }

    pub fn from_node(&self) -> &str {
        &self.from
    }

    pub fn to_node(&self) -> &str {
        &self.to
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn rate(&self) -> &ExchangeRate {
        &self.rate
    }

    /// Forward units of `to` per unit of `from`, after fees, working scale.
    pub fn conversion_rate(&self) -> Decimal {
        self.conversion_rate
    }

    /// Reciprocal of the conversion rate: the additive cost contribution.
    pub fn unit_cost(&self) -> Decimal {
        self.unit_cost
    }

    pub fn segments(&self) -> &EdgeSegments {
        &self.segments
    }

    pub fn is_transfer(&self) -> bool {
        self.from == self.to
    }

    /// The capacity measure flows through this edge are metered in on the
    /// spend side: gross base for BUY, quote for SELL.
    pub fn spend_measure(&self) -> CapacityMeasure {
        match self.side {
            OrderSide::Buy => CapacityMeasure::GrossBase,
            OrderSide::Sell => CapacityMeasure::Quote,
        }
    }

    /// Aggregated spend-side capacity envelope at the segments' scale.
    pub fn spend_envelope(&self) -> Result<EdgeCapacity> {
        let measure = self.spend_measure();
        let scale = self.segments.capacity_scale(measure);
        self.segments.capacity_totals(measure, scale)
    }

    /// Convert a spend-side amount forward across the edge at working scale.
    pub fn convert_forward(&self, amount: Decimal) -> Result<Decimal> {
        decimal::mul_at(amount, self.conversion_rate, WORKING_SCALE)
    }

    /// Accumulate a coalesced order's segment (graph build only).
    pub(crate) fn push_segment(&mut self, segment: EdgeSegment) {
        self.segments.push(segment);
    }

    /// Replace the cached conversion rate (penalty rebuilds only).
    pub(crate) fn with_conversion(&self, conversion_rate: Decimal, unit_cost: Decimal) -> Self {
        let mut edge = self.clone();
        edge.conversion_rate = conversion_rate;
        edge.unit_cost = unit_cost;
        edge
    }

    /// Restrict to segments backed by orders outside the excluded set.
    /// Returns None when nothing remains.
    pub(crate) fn without_orders(
        &self,
        excluded: &std::collections::BTreeSet<OrderId>,
        orders: &std::collections::BTreeMap<OrderId, Order>,
    ) -> Result<Option<Self>> {
        let kept: Vec<EdgeSegment> = self
            .segments
            .iter()
            .filter(|s| !excluded.contains(&s.order_id()))
            .cloned()
            .collect();
        if kept.is_empty() {
            return Ok(None);
        }
        let mut edge = self.clone();
        if excluded.contains(&edge.order_id) {
            let replacement = kept[0].order_id();
            let order = orders.get(&replacement).ok_or_else(|| {
                PathfinderError::invalid_input(format!("unknown order {replacement}"))
            })?;
            edge.order_id = replacement;
            edge.order = order.clone();
        }
        edge.segments = EdgeSegments::new(kept)?;
        Ok(Some(edge))
    }

    /// Push a spend-side amount through the edge, allocating it across
    /// segments: mandatory lower bounds are reserved first, the remainder
    /// tops segments up in declaration order. The spend must already fit the
    /// aggregated envelope.
    pub fn apply_spend(&self, graph: &Graph, spend: &Money) -> Result<EdgeFlow> {
        if spend.currency() != self.from {
            return Err(PathfinderError::invalid_input(format!(
                "spend currency {} does not match edge from {}",
                spend.currency(),
                self.from
            )));
        }
        let measure = self.spend_measure();

        // Pass 1: reserve mandatory floors.
        let mut allocations: Vec<Money> = Vec::with_capacity(self.segments.len());
        let mut reserved = Money::zero(&self.from)?;
        for segment in self.segments.iter() {
            let floor = if segment.is_mandatory() {
                segment.capacity(measure).min().clone()
            } else {
                Money::zero(&self.from)?
            };
            reserved = reserved.add(&floor)?;
            allocations.push(floor);
        }
        let mut remaining = spend.sub(&reserved).map_err(|_| {
            PathfinderError::invalid_input(format!(
                "spend {} below mandatory floor {} on edge {}->{}",
                spend, reserved, self.from, self.to
            ))
        })?;

        // Pass 2: top up in segment order.
        for (allocation, segment) in allocations.iter_mut().zip(self.segments.iter()) {
            if remaining.is_zero() {
                break;
            }
            let headroom = segment.capacity(measure).max().sub(allocation)?;
            let take = remaining.min_of(&headroom)?;
            *allocation = allocation.add(&take)?;
            remaining = remaining.sub(&take)?;
        }
        if remaining.is_positive() {
            return Err(PathfinderError::invalid_input(format!(
                "spend {} exceeds capacity of edge {}->{}",
                spend, self.from, self.to
            )));
        }

        // Materialize per-segment fills.
        let mut parts = Vec::new();
        let mut received_total = Money::zero(&self.to)?;
        let mut fees_total = FeeBreakdown::none();
        for (allocation, segment) in allocations.iter().zip(self.segments.iter()) {
            if allocation.is_zero() {
                continue;
            }
            let order = graph.order(segment.order_id())?;
            let fill = order.fill_for_spend(allocation)?;
            let received = order.taker_receive(&fill)?;
            let fees = order.fees(&fill)?;
            let share = decimal::ratio(allocation.amount(), spend.amount())?;
            let cost = decimal::mul_at(self.unit_cost, share, WORKING_SCALE)?;
            received_total = received_total.add(&received)?;
            fees_total = fees_total.merge(&fees)?;
            parts.push(FlowPart {
                order_id: segment.order_id(),
                spend: allocation.clone(),
                fill,
                received,
                fees,
                cost,
            });
        }
        Ok(EdgeFlow {
            spent: spend.clone(),
            received: received_total,
            fees: fees_total,
            parts,
        })
    }

    /// `from->to` fragment for route signatures and logs.
    pub fn label(&self) -> String {
        format!("{}->{}", self.from, self.to)
    }
}
