//! Execution plan engine
//!
//! Augmenting-path loop on top of the shared best-first search: while some
//! currency still holds balance, find the most productive path to the
//! target, push the binding flow through it, and fold the fills into the
//! portfolio. Splitting across parallel routes and merging at the target
//! fall out of the loop rather than being special-cased.
//!
//! Author: AI-Generated
//! Created: 2026-02-20
//! Modified: 2026-02-27 - guard accounting across the outer loop

use rust_decimal::Decimal;
use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::decimal;
use crate::error::Result;
use crate::graph::{EdgeFlow, Graph, GraphBuilder};
use crate::plan::plan::{ExecutionPlan, PlanFill};
use crate::plan::portfolio::PortfolioState;
use crate::result::CandidatePath;
use crate::search::config::{PathSearchConfig, PathSearchRequest};
use crate::search::engine::{run_search, SearchParams};
use crate::search::guards::{SearchGuardReport, SearchGuards};
use crate::search::registry::StateRegistry;
use crate::search::state::{SearchState, SpendRange};
use crate::types::Money;

/// A plan plus the guard accounting of the loop that produced it.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    plan: ExecutionPlan,
    guard_limits: SearchGuardReport,
}

impl PlanOutcome {
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn guard_limits(&self) -> &SearchGuardReport {
        &self.guard_limits
    }
}

/// One augmenting route picked in a loop iteration.
struct Augmentation {
    score: Decimal,
    route: String,
    candidate: CandidatePath,
    flows: Vec<EdgeFlow>,
}

/// Split/merge execution planner.
pub struct ExecutionPlanEngine {
    graph: Graph,
    config: PathSearchConfig,
    target: String,
}

impl ExecutionPlanEngine {
    pub fn new(request: PathSearchRequest) -> Result<Self> {
        let (orders, config, target) = request.into_parts();
        let graph = GraphBuilder::new().add_orders(orders).build()?;
        Self::from_graph(graph, config, &target)
    }

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

    /// Produce fills covering as much of the requested spend as the book
    /// allows. Insufficient liquidity yields a partial plan, not an error.
    pub fn plan(&self) -> Result<PlanOutcome> {
        let spend = self.config.spend_amount().clone();
        let source = spend.currency().to_string();
        let limits = self.config.guards();

        let idle = || {
            SearchGuardReport::idle(
                limits.max_visited_states(),
                limits.max_expansions(),
                limits.time_budget_ms(),
            )
        };
        if spend.is_zero()
            || !self.graph.has_currency(&source)
            || !self.graph.has_currency(&self.target)
        {
            return Ok(PlanOutcome {
                plan: ExecutionPlan::empty(source, self.target.clone(), spend)?,
                guard_limits: idle(),
            });
        }
        if source == self.target {
            return self.transfer_plan(spend);
        }

        let mut guards = SearchGuards::new(limits.max_expansions(), limits.time_budget_ms());
        let visited_limit = limits.max_visited_states();
        let mut visited_total: u64 = 0;
        let mut portfolio = PortfolioState::initial(spend.clone());
        let mut fills: Vec<PlanFill> = Vec::new();
        let mut sequence: u32 = 1;
        let amplifier = self.config.tolerance().amplifier()?;

        loop {
            if !guards.can_expand() || visited_total >= visited_limit {
                debug!("plan loop stopped by guards");
                break;
            }
            let funded: Vec<Money> = portfolio
                .funded_currencies()
                .into_iter()
                .filter(|money| money.currency() != self.target)
                .cloned()
                .collect();
            if funded.is_empty() {
                break;
            }
            let view = self.graph.without_orders(portfolio.used_orders())?;
            let blocked = portfolio.blocked_currencies();

            let mut best: Option<Augmentation> = None;
            for balance in &funded {
                let found = self.find_augmentation(
                    &view,
                    balance,
                    &blocked,
                    amplifier,
                    &mut guards,
                    visited_limit,
                    &mut visited_total,
                )?;
                let Some(found) = found else { continue };
                let better = match &best {
                    None => true,
                    Some(current) => match found.score.cmp(&current.score) {
                        std::cmp::Ordering::Greater => true,
                        std::cmp::Ordering::Less => false,
                        std::cmp::Ordering::Equal => found.route < current.route,
                    },
                };
                if better {
                    best = Some(found);
                }
            }
            let Some(chosen) = best else {
                debug!("no augmenting path remains");
                break;
            };

            debug!(route = %chosen.route, score = %chosen.score, "applying augmenting path");
            for (edge, flow) in chosen.candidate.edges().iter().zip(chosen.flows) {
                for part in flow.parts {
                    portfolio = portfolio.execute_order(
                        part.order_id,
                        &part.spend,
                        &part.received,
                        part.cost,
                    )?;
                    fills.push(PlanFill::new(
                        part.order_id,
                        edge.from_node().to_string(),
                        edge.to_node().to_string(),
                        part.spend,
                        part.received,
                        part.fees,
                        sequence,
                    ));
                    sequence += 1;
                }
            }
        }

        let remaining = portfolio
            .balance(&source)
            .cloned()
            .unwrap_or(Money::zero(&source)?);
        let total_spent = spend.sub(&remaining)?;
        let total_received = portfolio
            .balance(&self.target)
            .cloned()
            .unwrap_or(Money::zero(&self.target)?);
        let report = guards.finalize(
            visited_total,
            visited_limit,
            visited_total >= visited_limit,
        );
        if self.config.guard_limit_exception() {
            report.escalate()?;
        }
        info!(
            source = %source,
            target = %self.target,
            fills = fills.len(),
            total_spent = %total_spent,
            total_received = %total_received,
            "execution plan finished"
        );
        Ok(PlanOutcome {
            plan: ExecutionPlan::new(
                source,
                self.target.clone(),
                spend,
                fills,
                total_spent,
                total_received,
                portfolio.total_cost(),
            ),
            guard_limits: report,
        })
    }

    /// Best augmenting path from one funded currency, scored by marginal
    /// received amount per unit cost.
    #[allow(clippy::too_many_arguments)]
    fn find_augmentation(
        &self,
        view: &Graph,
        balance: &Money,
        blocked: &BTreeSet<String>,
        amplifier: Decimal,
        guards: &mut SearchGuards,
        visited_limit: u64,
        visited_total: &mut u64,
    ) -> Result<Option<Augmentation>> {
        let mut registry = StateRegistry::new(visited_limit.saturating_sub(*visited_total));
        let range = SpendRange::new(Money::zero(balance.currency())?, balance.clone())?;
        let initial =
            SearchState::initial(balance.currency(), Some(range), None, blocked)?;
        let params = SearchParams {
            min_hops: 1,
            max_hops: self.config.max_hops(),
            amplifier,
            top_k: 1,
        };
        let candidates = run_search(view, initial, &self.target, &params, guards, &mut registry)?;
        *visited_total += registry.visited_states();
        let Some(candidate) = candidates.into_iter().next() else {
            return Ok(None);
        };
        let Some(flows) = walk_binding_flow(view, &candidate, balance)? else {
            return Ok(None);
        };
        let received = match flows.last() {
            Some(last) if last.received.is_positive() => last.received.clone(),
            _ => return Ok(None),
        };
        let score = decimal::ratio(received.amount(), candidate.cost())?;
        let route = candidate.route().to_string();
        Ok(Some(Augmentation {
            score,
            route,
            candidate,
            flows,
        }))
    }

    /// Same-currency request: only transfer orders apply. Fills are pushed
    /// through every transfer edge in declaration order until the spend is
    /// absorbed.
    fn transfer_plan(&self, spend: Money) -> Result<PlanOutcome> {
        let source = spend.currency().to_string();
        let limits = self.config.guards();
        let mut portfolio = PortfolioState::initial(spend.clone());
        let mut fills: Vec<PlanFill> = Vec::new();
        let mut sequence: u32 = 1;
        let mut remaining = spend.clone();
        let mut received_total = Money::zero(&source)?;

        for edge in self.graph.edges_from(&source) {
            if !edge.is_transfer() || remaining.is_zero() {
                continue;
            }
            let envelope = edge.spend_envelope()?;
            let amount = remaining.min_of(envelope.max())?;
            if amount.cmp_amount(envelope.min())? == std::cmp::Ordering::Less {
                continue;
            }
            let flow = edge.apply_spend(&self.graph, &amount)?;
            for part in flow.parts {
                portfolio = portfolio.execute_order(
                    part.order_id,
                    &part.spend,
                    &part.received,
                    part.cost,
                )?;
                fills.push(PlanFill::new(
                    part.order_id,
                    edge.from_node().to_string(),
                    edge.to_node().to_string(),
                    part.spend,
                    part.received,
                    part.fees,
                    sequence,
                ));
                sequence += 1;
            }
            remaining = remaining.sub(&flow.spent)?;
            received_total = received_total.add(&flow.received)?;
        }

        let total_spent = spend.sub(&remaining)?;
        info!(
            source = %source,
            fills = fills.len(),
            "transfer plan finished"
        );
        Ok(PlanOutcome {
            plan: ExecutionPlan::new(
                source.clone(),
                source,
                spend,
                fills,
                total_spent,
                received_total,
                portfolio.total_cost(),
            ),
            guard_limits: SearchGuardReport::idle(
                limits.max_visited_states(),
                limits.max_expansions(),
                limits.time_budget_ms(),
            ),
        })
    }
}

/// Walk the candidate's edges pushing the maximum feasible flow: the spend
/// at each edge is the incoming amount clamped to the edge ceiling; a floor
/// that cannot be met kills the route.
fn walk_binding_flow(
    view: &Graph,
    candidate: &CandidatePath,
    balance: &Money,
) -> Result<Option<Vec<EdgeFlow>>> {
    let mut flows = Vec::with_capacity(candidate.edges().len());
    let mut cursor = balance.clone();
    for edge in candidate.edges() {
        let envelope = edge.spend_envelope()?;
        let spend_here = cursor.min_of(envelope.max())?;
        if spend_here.cmp_amount(envelope.min())? == std::cmp::Ordering::Less
            || spend_here.is_zero()
        {
            return Ok(None);
        }
        let flow = edge.apply_spend(view, &spend_here)?;
        cursor = flow.received.clone();
        flows.push(flow);
    }
    Ok(Some(flows))
}
