//! Priority queues with stable total ordering
//!
//! Every ordering decision flows through `PathOrderKey`: lower cost, then
//! fewer hops, then lexicographically smaller route signature, then earlier
//! insertion. The binary heap is not insertion-stable on its own, so the
//! insertion counter is part of the key rather than an afterthought.
//!
//! Author: AI-Generated
//! Created: 2026-02-13

use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::search::state::SearchState;

/// Composite ranking key. The derived ordering cascades field by field,
/// which is exactly the required comparator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PathOrderKey {
    cost: Decimal,
    hops: u32,
    route: String,
    insertion: u64,
}

impl PathOrderKey {
    pub fn new(cost: Decimal, hops: u32, route: String, insertion: u64) -> Self {
        Self {
            cost,
            hops,
            route,
            insertion,
        }
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    pub fn hops(&self) -> u32 {
        self.hops
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn insertion(&self) -> u64 {
        self.insertion
    }
}

#[derive(Debug)]
struct FrontierEntry {
    key: PathOrderKey,
    state: SearchState,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Min-heap frontier; assigns insertion order on push.
#[derive(Debug)]
pub struct FrontierQueue {
    heap: BinaryHeap<Reverse<FrontierEntry>>,
    counter: u64,
}

impl FrontierQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            counter: 0,
        }
    }

    pub fn push(&mut self, state: SearchState) {
        let key = PathOrderKey::new(
            state.cost(),
            state.hops(),
            state.route_signature(),
            self.counter,
        );
        self.counter += 1;
        self.heap.push(Reverse(FrontierEntry { key, state }));
    }

    pub fn pop(&mut self) -> Option<(SearchState, PathOrderKey)> {
        self.heap.pop().map(|Reverse(entry)| (entry.state, entry.key))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Default for FrontierQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Result heap bounded to K candidates: worst-first eviction, running best
/// cost for the tolerance amplifier. Eviction never removes the best entry,
/// so the running minimum only ever improves.
#[derive(Debug)]
pub struct CandidateHeap {
    heap: BinaryHeap<FrontierEntry>,
    capacity: usize,
    best_cost: Option<Decimal>,
}

impl CandidateHeap {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::new(),
            capacity,
            best_cost: None,
        }
    }

    pub fn push(&mut self, state: SearchState, key: PathOrderKey) {
        let cost = key.cost();
        match self.best_cost {
            Some(best) if best <= cost => {}
            _ => self.best_cost = Some(cost),
        }
        self.heap.push(FrontierEntry { key, state });
        if self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    /// Cost of the best complete candidate seen so far.
    pub fn best_cost(&self) -> Option<Decimal> {
        self.best_cost
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into ascending key order.
    pub fn into_sorted(self) -> Vec<(SearchState, PathOrderKey)> {
        let mut entries: Vec<FrontierEntry> = self.heap.into_vec();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries.into_iter().map(|e| (e.state, e.key)).collect()
    }
}
