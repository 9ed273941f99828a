//! Execution plans
//!
//! A plan is the ordered fill sequence the augmenting loop produced, plus
//! the aggregate view: steps grouped by conversion edge, linearity
//! classification, and the legacy single-path downcast for plans that turn
//! out to be one chain.
//!
//! Author: AI-Generated
//! Created: 2026-02-20

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::decimal::{self, WORKING_SCALE};
use crate::error::{PathfinderError, Result};
use crate::result::{PathLeg, PathResult};
use crate::types::{FeeBreakdown, Money, OrderId};

/// One executed fill: an order, the spend pushed through it, and its
/// position in the execution sequence (1-based).
#[derive(Debug, Clone)]
pub struct PlanFill {
    order_id: OrderId,
    from: String,
    to: String,
    spent: Money,
    received: Money,
    fees: FeeBreakdown,
    sequence: u32,
}

impl PlanFill {
    pub(crate) fn new(
        order_id: OrderId,
        from: String,
        to: String,
        spent: Money,
        received: Money,
        fees: FeeBreakdown,
        sequence: u32,
    ) -> Self {
        Self {
            order_id,
            from,
            to,
            spent,
            received,
            fees,
            sequence,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
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

    pub fn fees(&self) -> &FeeBreakdown {
        &self.fees
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

fn accumulate(target: &mut BTreeMap<String, Money>, component: &Money) -> Result<()> {
    match target.get(component.currency()) {
        Some(existing) => {
            let merged = existing.add(component)?;
            target.insert(component.currency().to_string(), merged);
        }
        None => {
            target.insert(component.currency().to_string(), component.clone());
        }
    }
    Ok(())
}

/// Fills aggregated by conversion edge, in first-use order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub from: String,
    pub to: String,
    pub spent: Money,
    pub received: Money,
}

/// The outcome of the augmenting loop: ordered fills between a source and a
/// target currency.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    source: String,
    target: String,
    requested: Money,
    fills: Vec<PlanFill>,
    total_spent: Money,
    total_received: Money,
    total_cost: Decimal,
}

impl ExecutionPlan {
    pub(crate) fn new(
        source: String,
        target: String,
        requested: Money,
        fills: Vec<PlanFill>,
        total_spent: Money,
        total_received: Money,
        total_cost: Decimal,
    ) -> Self {
        Self {
            source,
            target,
            requested,
            fills,
            total_spent,
            total_received,
            total_cost,
        }
    }

    pub(crate) fn empty(source: String, target: String, requested: Money) -> Result<Self> {
        let total_spent = Money::zero(&source)?;
        let total_received = Money::zero(&target)?;
        Ok(Self {
            source,
            target,
            requested,
            fills: Vec::new(),
            total_spent,
            total_received,
            total_cost: decimal::normalize(Decimal::ZERO, WORKING_SCALE),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn requested(&self) -> &Money {
        &self.requested
    }

    /// Fills ordered by sequence number.
    pub fn fills(&self) -> &[PlanFill] {
        &self.fills
    }

    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    pub fn total_spent(&self) -> &Money {
        &self.total_spent
    }

    pub fn total_received(&self) -> &Money {
        &self.total_received
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    /// True when the requested spend could not be fully absorbed.
    pub fn is_partial(&self) -> Result<bool> {
        Ok(self.total_spent.cmp_amount(&self.requested)? == std::cmp::Ordering::Less)
    }

    /// Aggregate fills by `from -> to` edge in first-use order.
    pub fn steps(&self) -> Result<Vec<PlanStep>> {
        let mut steps: Vec<PlanStep> = Vec::new();
        let mut index: BTreeMap<(String, String), usize> = BTreeMap::new();
        for fill in &self.fills {
            let key = (fill.from.clone(), fill.to.clone());
            match index.get(&key) {
                Some(&slot) => {
                    let step = &mut steps[slot];
                    step.spent = step.spent.add(&fill.spent)?;
                    step.received = step.received.add(&fill.received)?;
                }
                None => {
                    index.insert(key, steps.len());
                    steps.push(PlanStep {
                        from: fill.from.clone(),
                        to: fill.to.clone(),
                        spent: fill.spent.clone(),
                        received: fill.received.clone(),
                    });
                }
            }
        }
        Ok(steps)
    }

    pub fn step_count(&self) -> Result<usize> {
        Ok(self.steps()?.len())
    }

    /// A plan is linear when its steps form one chain from source to target
    /// with no revisited currency.
    pub fn is_linear(&self) -> Result<bool> {
        let steps = self.steps()?;
        let Some(first) = steps.first() else {
            return Ok(false);
        };
        if first.from != self.source {
            return Ok(false);
        }
        let Some(last) = steps.last() else {
            return Ok(false);
        };
        if last.to != self.target {
            return Ok(false);
        }
        let mut seen = std::collections::BTreeSet::new();
        seen.insert(first.from.clone());
        for window in steps.windows(2) {
            if window[0].to != window[1].from {
                return Ok(false);
            }
        }
        for step in &steps {
            if !seen.insert(step.to.clone()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Downcast a linear plan to the legacy single-path view: legs replay
    /// the steps in order. Non-linear plans have no path form.
    pub fn to_path(&self) -> Result<PathResult> {
        if !self.is_linear()? {
            return Err(PathfinderError::invalid_input(
                "only a linear plan converts to a path",
            ));
        }
        let steps = self.steps()?;
        let mut fee_breakdown: BTreeMap<String, Money> = BTreeMap::new();
        for fill in &self.fills {
            for component in fill.fees.components() {
                accumulate(&mut fee_breakdown, component)?;
            }
        }
        let mut route_nodes = vec![self.source.clone()];
        let legs = steps
            .into_iter()
            .map(|step| {
                route_nodes.push(step.to.clone());
                let mut leg_fees = BTreeMap::new();
                for fill in &self.fills {
                    if fill.from == step.from && fill.to == step.to {
                        for component in fill.fees.components() {
                            accumulate(&mut leg_fees, component)?;
                        }
                    }
                }
                Ok(PathLeg::new(
                    step.from,
                    step.to,
                    step.spent,
                    step.received,
                    leg_fees,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        let hops = legs.len() as u32;
        Ok(PathResult::from_parts(
            self.total_spent.clone(),
            self.total_received.clone(),
            decimal::normalize(Decimal::ZERO, WORKING_SCALE),
            fee_breakdown,
            legs,
            self.total_cost,
            decimal::normalize(Decimal::ONE, WORKING_SCALE),
            hops,
            route_nodes.join("->"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn money(currency: &str, amount: &str) -> Money {
        Money::from_str(currency, amount).unwrap()
    }

    fn fill(
        id: usize,
        from: &str,
        to: &str,
        spent: &str,
        received: &str,
        sequence: u32,
    ) -> PlanFill {
        PlanFill::new(
            OrderId(id),
            from.to_string(),
            to.to_string(),
            money(from, spent),
            money(to, received),
            FeeBreakdown::none(),
            sequence,
        )
    }

    fn linear_plan() -> ExecutionPlan {
        ExecutionPlan::new(
            "AAA".to_string(),
            "CCC".to_string(),
            money("AAA", "100"),
            vec![
                fill(0, "AAA", "BBB", "100", "100", 1),
                fill(1, "BBB", "CCC", "100", "100", 2),
            ],
            money("AAA", "100"),
            money("CCC", "100"),
            dec!(2),
        )
    }

    fn split_plan() -> ExecutionPlan {
        ExecutionPlan::new(
            "AAA".to_string(),
            "DDD".to_string(),
            money("AAA", "80"),
            vec![
                fill(0, "AAA", "BBB", "50", "50", 1),
                fill(2, "BBB", "DDD", "50", "50", 2),
                fill(1, "AAA", "CCC", "30", "30", 3),
                fill(3, "CCC", "DDD", "30", "30", 4),
            ],
            money("AAA", "80"),
            money("DDD", "80"),
            dec!(4),
        )
    }

    #[test]
    fn test_steps_aggregate_in_first_use_order() {
        let plan = ExecutionPlan::new(
            "AAA".to_string(),
            "BBB".to_string(),
            money("AAA", "100"),
            vec![
                fill(0, "AAA", "BBB", "60", "60", 1),
                fill(1, "AAA", "BBB", "40", "40", 2),
            ],
            money("AAA", "100"),
            money("BBB", "100"),
            dec!(1),
        );
        let steps = plan.steps().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].spent.amount(), dec!(100));
        assert_eq!(steps[0].received.amount(), dec!(100));
    }

    #[test]
    fn test_linear_classification() {
        assert!(linear_plan().is_linear().unwrap());
        assert!(!split_plan().is_linear().unwrap());
    }

    #[test]
    fn test_empty_plan_is_not_linear() {
        let plan =
            ExecutionPlan::empty("AAA".to_string(), "BBB".to_string(), money("AAA", "10"))
                .unwrap();
        assert!(!plan.is_linear().unwrap());
        assert!(plan.is_empty());
        assert!(plan.is_partial().unwrap());
    }

    #[test]
    fn test_linear_downcast_replays_steps() {
        let plan = linear_plan();
        let path = plan.to_path().unwrap();
        assert_eq!(path.legs().len(), 2);
        assert_eq!(path.legs()[0].from_currency(), "AAA");
        assert_eq!(path.legs()[0].to_currency(), "BBB");
        assert_eq!(path.legs()[1].from_currency(), "BBB");
        assert_eq!(path.legs()[1].to_currency(), "CCC");
        assert_eq!(path.route(), "AAA->BBB->CCC");
        assert_eq!(path.total_spent().amount(), dec!(100));
        assert_eq!(path.total_received().amount(), dec!(100));
    }

    #[test]
    fn test_nonlinear_downcast_rejected() {
        assert!(split_plan().to_path().is_err());
    }

    #[test]
    fn test_partial_classification() {
        let plan = ExecutionPlan::new(
            "AAA".to_string(),
            "BBB".to_string(),
            money("AAA", "100"),
            vec![fill(0, "AAA", "BBB", "60", "60", 1)],
            money("AAA", "60"),
            money("BBB", "60"),
            dec!(1),
        );
        assert!(plan.is_partial().unwrap());
        assert!(!linear_plan().is_partial().unwrap());
    }

    #[test]
    fn test_step_count() {
        assert_eq!(split_plan().step_count().unwrap(), 4);
        assert_eq!(linear_plan().step_count().unwrap(), 2);
    }
}
