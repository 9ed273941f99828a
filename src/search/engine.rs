//! Best-first path search engine
//!
//! Dijkstra-like enumeration over `SearchState` with mandatory-capacity
//! pruning, dominance deduplication and tolerance-amplified cost pruning.
//! Everything that orders results flows through the composite path key, so
//! rerunning the same inputs yields byte-identical output.
//!
//! Author: AI-Generated
//! Created: 2026-02-17
//! Modified: 2026-02-26 - shared search loop for the plan engine

use rust_decimal::Decimal;
use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::decimal::{self, WORKING_SCALE};
use crate::error::Result;
use crate::graph::{Graph, GraphBuilder, GraphEdge};
use crate::result::{
    materialize_candidate, CandidatePath, PathResult, PathResultSet, SearchOutcome,
};
use crate::search::config::{PathSearchConfig, PathSearchRequest};
use crate::search::guards::SearchGuards;
use crate::search::queue::{CandidateHeap, FrontierQueue};
use crate::search::registry::{RegistryOutcome, StateRegistry};
use crate::search::state::{SearchState, SpendRange};

/// Knobs of one search loop invocation.
#[derive(Debug, Clone)]
pub(crate) struct SearchParams {
    pub min_hops: u32,
    pub max_hops: u32,
    pub amplifier: Decimal,
    pub top_k: usize,
}

/// Reconcile the carried spend range with an edge's capacity: prune when
/// the mandatory floor is out of reach, intersect with the envelope, then
/// convert the surviving window to the receive side.
fn reconcile_range(state: &SearchState, edge: &GraphEdge) -> Result<Option<SpendRange>> {
    let envelope = edge.spend_envelope()?;
    let window = match state.amount_range() {
        Some(range) => {
            if range.max().cmp_amount(envelope.min())? == std::cmp::Ordering::Less {
                debug!(
                    edge = %edge.label(),
                    range = %range,
                    floor = %envelope.min(),
                    "pruned below mandatory floor"
                );
                return Ok(None);
            }
            match range.intersect_capacity(&envelope)? {
                Some(clamped) => clamped,
                None => {
                    debug!(edge = %edge.label(), range = %range, "pruned: empty capacity intersection");
                    return Ok(None);
                }
            }
        }
        None => SpendRange::new(envelope.min().clone(), envelope.max().clone())?,
    };
    Ok(Some(window.convert(edge)?))
}

/// The core best-first loop. Shared verbatim between the public path search
/// and the plan engine's augmenting searches, which carry their own guards
/// and registry across invocations.
pub(crate) fn run_search(
    graph: &Graph,
    initial: SearchState,
    target: &str,
    params: &SearchParams,
    guards: &mut SearchGuards,
    registry: &mut StateRegistry,
) -> Result<Vec<CandidatePath>> {
    let mut frontier = FrontierQueue::new();
    frontier.push(initial);
    let mut candidates = CandidateHeap::new(params.top_k);

    loop {
        if !guards.can_expand() {
            debug!(expansions = guards.expansions(), "guard stop before pop");
            break;
        }
        if registry.limit_reached() {
            debug!(
                visited_states = registry.visited_states(),
                "visited-state limit reached"
            );
            break;
        }
        let Some((state, key)) = frontier.pop() else {
            break;
        };
        if state.hops() > params.max_hops {
            continue;
        }
        if state.node() == target {
            // Terminal states are never expanded: the target is in their
            // visited set, so nothing routes back through it.
            if state.hops() >= params.min_hops && state.hops() >= 1 {
                debug!(route = %key.route(), cost = %state.cost(), "candidate found");
                candidates.push(state, key);
            }
            continue;
        }
        let signature = state.signature()?.value();
        if registry.observe(&signature, &state) == RegistryOutcome::Dominated {
            debug!(signature = %signature, "dominated, skipping expansion");
            continue;
        }
        guards.record_expansion();

        let best_cost = candidates.best_cost();
        for edge in graph.edges_from(state.node()) {
            if state.has_visited(edge.to_node()) {
                continue;
            }
            if state.hops() + 1 > params.max_hops {
                break;
            }
            let Some(next_range) = reconcile_range(&state, edge)? else {
                continue;
            };
            let next_cost = decimal::sum_at(state.cost(), edge.unit_cost(), WORKING_SCALE)?;
            if let Some(best) = best_cost {
                let ceiling = decimal::mul_at(best, params.amplifier, WORKING_SCALE)?;
                if decimal::cmp_at(next_cost, ceiling, Some(WORKING_SCALE))
                    == std::cmp::Ordering::Greater
                {
                    debug!(edge = %edge.label(), cost = %next_cost, "pruned by tolerance amplifier");
                    continue;
                }
            }
            let next_product =
                decimal::mul_at(state.product(), edge.conversion_rate(), WORKING_SCALE)?;
            frontier.push(state.advance(edge, next_cost, next_product, Some(next_range)));
        }
    }

    Ok(candidates
        .into_sorted()
        .iter()
        .map(|(state, key)| CandidatePath::from_state(state, key))
        .collect())
}

/// The tolerance-aware, guarded best-path search engine.
pub struct PathSearchEngine {
    graph: Graph,
    config: PathSearchConfig,
    target: String,
}

impl PathSearchEngine {
    /// Build the graph from the request's order book and validate the
    /// search parameters.
    pub fn new(request: PathSearchRequest) -> Result<Self> {
        let (orders, config, target) = request.into_parts();
        let graph = GraphBuilder::new().add_orders(orders).build()?;
        Self::from_graph(graph, config, &target)
    }

    /// Run against an already-built graph (k-best rebuild views, tests).
    pub fn from_graph(graph: Graph, config: PathSearchConfig, target: &str) -> Result<Self> {
        Ok(Self {
            graph,
            config,
            target: target.to_string(),
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &PathSearchConfig {
        &self.config
    }

    /// Enumerate up to `result_limit` best paths from the spend currency to
    /// the target. Empty result sets are not errors; guard breaches either
    /// annotate the report or escalate, per configuration.
    pub fn search(&self) -> Result<SearchOutcome> {
        let spend = self.config.spend_amount().clone();
        let source = spend.currency().to_string();
        let limits = self.config.guards();
        let mut guards = SearchGuards::new(limits.max_expansions(), limits.time_budget_ms());
        let mut registry = StateRegistry::new(limits.max_visited_states());
        let params = SearchParams {
            min_hops: self.config.min_hops(),
            max_hops: self.config.max_hops(),
            amplifier: self.config.tolerance().amplifier()?,
            top_k: self.config.result_limit(),
        };
        let initial = SearchState::initial(
            &source,
            Some(SpendRange::exact(spend.clone())),
            None,
            &BTreeSet::new(),
        )?;

        let candidates = run_search(
            &self.graph,
            initial,
            &self.target,
            &params,
            &mut guards,
            &mut registry,
        )?;
        let report = guards.finalize(
            registry.visited_states(),
            registry.limit(),
            registry.limit_reached(),
        );
        if self.config.guard_limit_exception() {
            report.escalate()?;
        }

        let results = self.shape_results(&candidates, &spend, &params)?;
        info!(
            source = %source,
            target = %self.target,
            paths = results.len(),
            expansions = report.expansions(),
            visited_states = report.visited_states(),
            "path search finished"
        );
        Ok(SearchOutcome::new(
            PathResultSet::new(results),
            report,
        ))
    }

    /// Re-run with the given orders removed from the book. The k-best
    /// enumeration pattern: exclude each found path's orders and search
    /// again for genuinely different routes.
    pub fn search_excluding(
        &self,
        excluded: &std::collections::BTreeSet<crate::types::OrderId>,
    ) -> Result<SearchOutcome> {
        let view = self.graph.without_orders(excluded)?;
        Self::from_graph(view, self.config.clone(), &self.target)?.search()
    }

    /// Re-run with used orders' conversion rates penalized, steering the
    /// ranking toward less-used liquidity without touching capacity.
    pub fn search_with_penalties(
        &self,
        usage_counts: &std::collections::BTreeMap<crate::types::OrderId, u32>,
        penalty_factor: Decimal,
    ) -> Result<SearchOutcome> {
        let view = self.graph.with_order_penalties(usage_counts, penalty_factor)?;
        Self::from_graph(view, self.config.clone(), &self.target)?.search()
    }

    /// Final shaping: enforce the tolerance envelope around the best cost,
    /// materialize survivors, apply the lower residual filter.
    fn shape_results(
        &self,
        candidates: &[CandidatePath],
        spend: &crate::types::Money,
        params: &SearchParams,
    ) -> Result<Vec<PathResult>> {
        let Some(best) = candidates.first() else {
            return Ok(Vec::new());
        };
        let best_cost = best.cost();
        let ceiling = decimal::mul_at(best_cost, params.amplifier, WORKING_SCALE)?;
        let tolerance_min = self.config.tolerance().min();
        let mut results = Vec::new();
        for candidate in candidates {
            if decimal::cmp_at(candidate.cost(), ceiling, Some(WORKING_SCALE))
                == std::cmp::Ordering::Greater
            {
                debug!(route = %candidate.route(), "dropped outside tolerance envelope");
                continue;
            }
            let result = materialize_candidate(&self.graph, candidate, spend, best_cost)?;
            if result.residual_tolerance() < tolerance_min {
                debug!(route = %candidate.route(), "dropped below tolerance floor");
                continue;
            }
            results.push(result);
        }
        Ok(results)
    }
}
