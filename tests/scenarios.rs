//! End-to-end scenarios against the public API
//!
//! Exercises the search and plan engines the way a consumer would: direct
//! fills, deterministic ties, forced splits, blocked backtracking, guard
//! breaches in both reporting modes, and zero-tolerance pruning.
//!
//! Author: AI-Generated
//! Created: 2026-03-02

use anyhow::Result;
use rust_decimal_macros::dec;

use std::sync::Arc;

use p2p_pathfinder::{
    AssetPair, ExchangeRate, ExecutionPlanEngine, FeePolicy, Money, Order, OrderBounds,
    OrderSide, PathSearchConfig, PathSearchEngine, PathSearchRequest, PathfinderError,
    ProportionalFee,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn sell(base: &str, quote: &str, rate: &str, min: &str, max: &str) -> Order {
    let pair = AssetPair::new(base, quote).unwrap();
    let bounds = OrderBounds::new(
        Money::from_str(base, min).unwrap(),
        Money::from_str(base, max).unwrap(),
    )
    .unwrap();
    let rate = ExchangeRate::from_str(pair.clone(), rate, 4).unwrap();
    Order::new(OrderSide::Sell, pair, bounds, rate, None).unwrap()
}

fn buy(base: &str, quote: &str, rate: &str, min: &str, max: &str) -> Order {
    let pair = AssetPair::new(base, quote).unwrap();
    let bounds = OrderBounds::new(
        Money::from_str(base, min).unwrap(),
        Money::from_str(base, max).unwrap(),
    )
    .unwrap();
    let rate = ExchangeRate::from_str(pair.clone(), rate, 4).unwrap();
    Order::new(OrderSide::Buy, pair, bounds, rate, None).unwrap()
}

#[test]
fn scenario_direct_order() -> Result<()> {
    init_tracing();
    // One SELL offer bridging USD -> USDT at parity.
    let orders = vec![sell("USDT", "USD", "1.0000", "10", "1000")];
    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("USD", "100.00")?)
        .tolerance_bounds("0", "0.01")
        .hop_limits(1, 2)
        .result_limit(3)
        .build()?;
    let request = PathSearchRequest::new(orders, config, "USDT")?;
    let outcome = PathSearchEngine::new(request)?.search()?;

    assert_eq!(outcome.paths().len(), 1);
    let path = &outcome.paths()[0];
    assert_eq!(path.total_spent().currency(), "USD");
    assert_eq!(path.total_spent().amount(), dec!(100.00));
    assert_eq!(path.total_received().currency(), "USDT");
    assert_eq!(path.total_received().amount(), dec!(100.00));
    assert_eq!(path.legs().len(), 1);
    assert_eq!(path.residual_tolerance(), dec!(0));
    assert!(!outcome.guard_limits().any_limit_reached());
    Ok(())
}

#[test]
fn scenario_deterministic_tie() -> Result<()> {
    // Two identical SELL offers EUR -> USD; output must be byte-identical
    // across runs.
    let run = || -> Result<String> {
        let orders = vec![
            sell("USD", "EUR", "0.9000", "0", "1000"),
            sell("USD", "EUR", "0.9000", "0", "1000"),
        ];
        let config = PathSearchConfig::builder()
            .spend_amount(Money::from_str("EUR", "100")?)
            .hop_limits(1, 2)
            .result_limit(1)
            .build()?;
        let request = PathSearchRequest::new(orders, config, "USD")?;
        let outcome = PathSearchEngine::new(request)?.search()?;
        assert_eq!(outcome.paths().len(), 1);
        Ok(outcome.paths().to_json().to_string())
    };
    let first = run()?;
    for _ in 0..4 {
        assert_eq!(run()?, first);
    }
    Ok(())
}

#[test]
fn scenario_split_required() -> Result<()> {
    let orders = vec![
        buy("AAA", "BBB", "1.0000", "0", "50"),
        buy("AAA", "CCC", "1.0000", "0", "50"),
        buy("BBB", "DDD", "1.0000", "0", "100"),
        buy("CCC", "DDD", "1.0000", "0", "100"),
    ];
    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("AAA", "80")?)
        .tolerance_bounds("0", "0.5")
        .hop_limits(1, 3)
        .build()?;
    let request = PathSearchRequest::new(orders, config, "DDD")?;
    let outcome = ExecutionPlanEngine::new(request)?.plan()?;
    let plan = outcome.plan();

    assert!(!plan.is_linear()?);
    assert!(plan.step_count()? >= 3);
    assert!(plan.total_spent().cmp_amount(&Money::from_str("AAA", "80")?)? != std::cmp::Ordering::Greater);
    assert_eq!(plan.total_received().amount(), dec!(80));
    // first fill follows the lexicographically smaller route signature
    assert_eq!(plan.fills()[0].to_currency(), "BBB");
    assert_eq!(plan.fills()[0].sequence(), 1);
    Ok(())
}

#[test]
fn scenario_backtracking_blocked() -> Result<()> {
    let orders = vec![
        buy("AAA", "BBB", "1.0000", "0", "1000"),
        buy("BBB", "AAA", "1.0000", "0", "1000"),
        buy("BBB", "CCC", "1.0000", "0", "1000"),
    ];
    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("AAA", "100")?)
        .hop_limits(1, 3)
        .build()?;
    let request = PathSearchRequest::new(orders, config, "CCC")?;
    let outcome = PathSearchEngine::new(request)?.search()?;

    assert_eq!(outcome.paths().len(), 1);
    let route = outcome.paths()[0].route();
    assert_eq!(route, "AAA->BBB->CCC");
    // AAA never reappears after the initial position
    assert_eq!(route.matches("AAA").count(), 1);
    Ok(())
}

#[test]
fn scenario_guard_breach_metadata_mode() -> Result<()> {
    let orders = vec![
        buy("AAA", "BBB", "1.0000", "0", "1000"),
        buy("BBB", "CCC", "1.0000", "0", "1000"),
    ];
    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("AAA", "100")?)
        .hop_limits(1, 3)
        .search_guards(100, 1, None)
        .build()?;
    let request = PathSearchRequest::new(orders, config, "CCC")?;
    let outcome = PathSearchEngine::new(request)?.search()?;

    assert!(outcome.paths().is_empty());
    assert!(outcome.guard_limits().expansions_reached());
    // the check is pre-pop, so at most one overshoot
    assert!(outcome.guard_limits().expansions() <= 1 + 1);
    Ok(())
}

#[test]
fn scenario_guard_breach_exception_mode() -> Result<()> {
    let orders = vec![
        buy("AAA", "BBB", "1.0000", "0", "1000"),
        buy("BBB", "CCC", "1.0000", "0", "1000"),
    ];
    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("AAA", "100")?)
        .hop_limits(1, 3)
        .search_guards(100, 1, None)
        .guard_limit_exception()
        .build()?;
    let request = PathSearchRequest::new(orders, config, "CCC")?;
    let err = PathSearchEngine::new(request)?.search().unwrap_err();
    match &err {
        PathfinderError::GuardLimitExceeded { report } => {
            assert!(report.expansions_reached());
        }
        other => panic!("expected guard escalation, got {other}"),
    }
    assert_eq!(
        err.to_string(),
        "Search guard limit exceeded: expansions 1/1."
    );
    Ok(())
}

#[test]
fn scenario_tolerance_zero() -> Result<()> {
    // Costs C (direct, rate 1) and C + epsilon (via GBP at 0.99).
    let orders = vec![
        buy("EUR", "USD", "1.0000", "0", "1000"),
        buy("EUR", "GBP", "0.9900", "0", "1000"),
        buy("GBP", "USD", "1.0000", "0", "1000"),
    ];
    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("EUR", "100")?)
        .tolerance_bounds("0", "0")
        .hop_limits(1, 3)
        .result_limit(3)
        .build()?;
    let request = PathSearchRequest::new(orders, config, "USD")?;
    let outcome = PathSearchEngine::new(request)?.search()?;

    assert_eq!(outcome.paths().len(), 1);
    assert_eq!(outcome.paths()[0].route(), "EUR->USD");
    Ok(())
}

#[test]
fn scenario_fee_bearing_path() -> Result<()> {
    // 1% fee on the quote leg: 100 EUR in, 99 USD out, fee surfaced.
    let pair = AssetPair::new("EUR", "USD")?;
    let bounds = OrderBounds::new(Money::from_str("EUR", "0")?, Money::from_str("EUR", "1000")?)?;
    let rate = ExchangeRate::from_str(pair.clone(), "1.0000", 4)?;
    let policy: Arc<dyn FeePolicy> = Arc::new(ProportionalFee::from_str("0.01")?);
    let order = Order::new(OrderSide::Buy, pair, bounds, rate, Some(policy))?;

    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("EUR", "100")?)
        .hop_limits(1, 2)
        .build()?;
    let request = PathSearchRequest::new(vec![order], config, "USD")?;
    let outcome = PathSearchEngine::new(request)?.search()?;

    assert_eq!(outcome.paths().len(), 1);
    let path = &outcome.paths()[0];
    assert_eq!(path.total_received().amount(), dec!(99));
    let fee = path.fee_breakdown().get("USD").expect("quote fee surfaced");
    assert_eq!(fee.amount(), dec!(1));
    let v = path.to_json();
    assert_eq!(v["feeBreakdown"]["USD"]["currency"], "USD");
    assert_eq!(v["legs"][0]["fees"]["USD"]["amount"], "1.0000");
    Ok(())
}

#[test]
fn property_currency_consistency_and_no_cycles() -> Result<()> {
    let orders = vec![
        buy("EUR", "GBP", "0.8500", "0", "1000"),
        buy("GBP", "USD", "1.2500", "0", "1000"),
        buy("EUR", "USD", "1.0000", "0", "1000"),
        sell("USD", "EUR", "0.9500", "0", "1000"),
    ];
    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("EUR", "50")?)
        .tolerance_bounds("0", "0.3")
        .hop_limits(1, 3)
        .result_limit(5)
        .build()?;
    let request = PathSearchRequest::new(orders, config, "USD")?;
    let outcome = PathSearchEngine::new(request)?.search()?;

    assert!(!outcome.paths().is_empty());
    for path in outcome.paths() {
        assert_eq!(path.total_spent().currency(), "EUR");
        assert_eq!(path.total_received().currency(), "USD");
        let nodes: Vec<&str> = path.route().split("->").collect();
        let unique: std::collections::BTreeSet<&str> = nodes.iter().copied().collect();
        assert_eq!(nodes.len(), unique.len(), "cycle in {}", path.route());
        assert!(path.hops() >= 1 && path.hops() <= 3);
        let mut cursor = "EUR";
        for leg in path.legs() {
            assert_eq!(leg.from_currency(), cursor);
            assert_eq!(leg.spent().currency(), leg.from_currency());
            assert_eq!(leg.received().currency(), leg.to_currency());
            cursor = leg.to_currency();
        }
        assert_eq!(cursor, "USD");
    }
    // results are ranked: residuals never decrease
    let mut previous = dec!(0);
    for path in outcome.paths() {
        assert!(path.residual_tolerance() >= previous);
        previous = path.residual_tolerance();
    }
    Ok(())
}

#[test]
fn property_linear_plan_downcast_replays_steps() -> Result<()> {
    let orders = vec![
        buy("AAA", "BBB", "1.0000", "0", "1000"),
        buy("BBB", "CCC", "1.0000", "0", "1000"),
    ];
    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("AAA", "100")?)
        .hop_limits(1, 3)
        .build()?;
    let request = PathSearchRequest::new(orders, config, "CCC")?;
    let outcome = ExecutionPlanEngine::new(request)?.plan()?;
    let plan = outcome.plan();

    assert!(plan.is_linear()?);
    let path = plan.to_path()?;
    let steps = plan.steps()?;
    assert_eq!(path.legs().len(), steps.len());
    for (leg, step) in path.legs().iter().zip(&steps) {
        assert_eq!(leg.from_currency(), step.from);
        assert_eq!(leg.to_currency(), step.to);
        assert_eq!(leg.spent(), &step.spent);
        assert_eq!(leg.received(), &step.received);
    }
    Ok(())
}

#[test]
fn property_search_outcome_json_contract() -> Result<()> {
    let orders = vec![sell("USDT", "USD", "1.0000", "10", "1000")];
    let config = PathSearchConfig::builder()
        .spend_amount(Money::from_str("USD", "100.00")?)
        .hop_limits(1, 2)
        .build()?;
    let request = PathSearchRequest::new(orders, config, "USDT")?;
    let outcome = PathSearchEngine::new(request)?.search()?;
    let v = outcome.to_json();

    let path = &v["paths"][0];
    assert_eq!(path["totalSpent"]["currency"], "USD");
    assert_eq!(path["totalSpent"]["amount"], "100.00");
    assert_eq!(path["totalSpent"]["scale"], 2);
    assert_eq!(path["residualTolerance"], "0.000000000000000000");
    assert!(path["legs"].is_array());
    let report = &v["guardLimits"];
    assert!(report["limits"]["expansions"].is_u64());
    assert!(report["metrics"]["elapsed_ms"].is_number());
    assert_eq!(report["breached"]["any"], false);
    Ok(())
}
