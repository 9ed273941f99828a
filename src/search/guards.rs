//! Search guards and the guard report
//!
//! Expansion and wall-clock budgets consulted once per frontier pop; the
//! visited-state limit lives in the registry and is folded in at finalize.
//! Zero limits are valid and block immediately, which keeps guard behavior
//! testable without large graphs.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use serde_json::json;
use std::time::Instant;

use tracing::warn;

use crate::error::{PathfinderError, Result};

// ---------------------------------------------------------------------------
// SearchGuardReport
// ---------------------------------------------------------------------------

/// Immutable snapshot of the guard limits, the consumed metrics, and which
/// limits were breached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchGuardReport {
    expansion_limit: u64,
    visited_state_limit: u64,
    time_budget_ms: Option<u64>,
    expansions: u64,
    visited_states: u64,
    elapsed_ms: u64,
    expansions_reached: bool,
    visited_states_reached: bool,
    time_budget_reached: bool,
}

impl SearchGuardReport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        expansion_limit: u64,
        visited_state_limit: u64,
        time_budget_ms: Option<u64>,
        expansions: u64,
        visited_states: u64,
        elapsed_ms: u64,
        expansions_reached: bool,
        visited_states_reached: bool,
        time_budget_reached: bool,
    ) -> Self {
        Self {
            expansion_limit,
            visited_state_limit,
            time_budget_ms,
            expansions,
            visited_states,
            elapsed_ms,
            expansions_reached,
            visited_states_reached,
            time_budget_reached,
        }
    }

    /// Zero-progress report carrying the configured limits.
    pub fn idle(
        visited_state_limit: u64,
        expansion_limit: u64,
        time_budget_ms: Option<u64>,
    ) -> Self {
        Self::new(
            expansion_limit,
            visited_state_limit,
            time_budget_ms,
            0,
            0,
            0,
            false,
            false,
            false,
        )
    }

    /// Neutral report for when no search ran at all.
    pub fn none() -> Self {
        Self::idle(0, 0, None)
    }

    pub fn expansion_limit(&self) -> u64 {
        self.expansion_limit
    }

    pub fn visited_state_limit(&self) -> u64 {
        self.visited_state_limit
    }

    pub fn time_budget_ms(&self) -> Option<u64> {
        self.time_budget_ms
    }

    pub fn expansions(&self) -> u64 {
        self.expansions
    }

    pub fn visited_states(&self) -> u64 {
        self.visited_states
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn expansions_reached(&self) -> bool {
        self.expansions_reached
    }

    pub fn visited_states_reached(&self) -> bool {
        self.visited_states_reached
    }

    pub fn time_budget_reached(&self) -> bool {
        self.time_budget_reached
    }

    pub fn any_limit_reached(&self) -> bool {
        self.expansions_reached || self.visited_states_reached || self.time_budget_reached
    }

    /// Frozen breach message: one clause per breached guard, joined by
    /// "and", expansion clause first.
    pub fn breach_message(&self) -> String {
        let mut clauses = Vec::new();
        if self.expansions_reached {
            clauses.push(format!(
                "expansions {}/{}",
                self.expansions, self.expansion_limit
            ));
        }
        if self.visited_states_reached {
            clauses.push(format!(
                "visited states {}/{}",
                self.visited_states, self.visited_state_limit
            ));
        }
        if self.time_budget_reached {
            let budget = self.time_budget_ms.unwrap_or(0);
            clauses.push(format!("time budget {}ms/{}ms", self.elapsed_ms, budget));
        }
        if clauses.is_empty() {
            return "Search guard limit exceeded.".to_string();
        }
        format!("Search guard limit exceeded: {}.", clauses.join(" and "))
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "limits": {
                "expansions": self.expansion_limit,
                "visited_states": self.visited_state_limit,
                "time_budget_ms": self.time_budget_ms,
            },
            "metrics": {
                "expansions": self.expansions,
                "visited_states": self.visited_states,
                "elapsed_ms": self.elapsed_ms,
            },
            "breached": {
                "expansions": self.expansions_reached,
                "visited_states": self.visited_states_reached,
                "time_budget": self.time_budget_reached,
                "any": self.any_limit_reached(),
            },
        })
    }

    /// Escalate to the opt-in error when any limit fired.
    pub fn escalate(&self) -> Result<()> {
        if self.any_limit_reached() {
            warn!(message = %self.breach_message(), "guard breach escalated");
            return Err(PathfinderError::GuardLimitExceeded {
                report: self.clone(),
            });
        }
        Ok(())
    }
}

impl serde::Serialize for SearchGuardReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.to_json(), serializer)
    }
}

// ---------------------------------------------------------------------------
// SearchGuards
// ---------------------------------------------------------------------------

/// Live expansion/time accounting. Wall-clock runs from construction; the
/// time budget is inclusive, so elapsed >= budget already blocks.
#[derive(Debug)]
pub struct SearchGuards {
    max_expansions: u64,
    time_budget_ms: Option<u64>,
    started: Instant,
    expansions: u64,
}

impl SearchGuards {
    pub fn new(max_expansions: u64, time_budget_ms: Option<u64>) -> Self {
        Self {
            max_expansions,
            time_budget_ms,
            started: Instant::now(),
            expansions: 0,
        }
    }

    pub fn expansions(&self) -> u64 {
        self.expansions
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn expansions_exhausted(&self) -> bool {
        self.expansions >= self.max_expansions
    }

    fn time_exhausted(&self) -> bool {
        match self.time_budget_ms {
            Some(budget) => self.elapsed_ms() >= budget,
            None => false,
        }
    }

    /// False once any limit is reached.
    pub fn can_expand(&self) -> bool {
        !self.expansions_exhausted() && !self.time_exhausted()
    }

    pub fn record_expansion(&mut self) {
        self.expansions += 1;
    }

    /// Fold in the visited-state accounting and freeze the report.
    pub fn finalize(
        &self,
        visited_states: u64,
        visited_state_limit: u64,
        visited_states_reached: bool,
    ) -> SearchGuardReport {
        SearchGuardReport::new(
            self.max_expansions,
            visited_state_limit,
            self.time_budget_ms,
            self.expansions,
            visited_states,
            self.elapsed_ms(),
            self.expansions_exhausted(),
            visited_states_reached,
            self.time_exhausted(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_expansion_limit_blocks_immediately() {
        let guards = SearchGuards::new(0, None);
        assert!(!guards.can_expand());
    }

    #[test]
    fn test_expansion_counting() {
        let mut guards = SearchGuards::new(2, None);
        assert!(guards.can_expand());
        guards.record_expansion();
        assert!(guards.can_expand());
        guards.record_expansion();
        assert!(!guards.can_expand());
        assert_eq!(guards.expansions(), 2);
    }

    #[test]
    fn test_zero_time_budget_blocks_inclusively() {
        let guards = SearchGuards::new(100, Some(0));
        assert!(!guards.can_expand());
    }

    #[test]
    fn test_finalize_flags() {
        let mut guards = SearchGuards::new(1, None);
        guards.record_expansion();
        let report = guards.finalize(3, 10, false);
        assert!(report.expansions_reached());
        assert!(!report.visited_states_reached());
        assert!(!report.time_budget_reached());
        assert!(report.any_limit_reached());
        assert_eq!(report.expansions(), 1);
        assert_eq!(report.visited_states(), 3);
    }

    #[test]
    fn test_idle_and_none_reports() {
        let idle = SearchGuardReport::idle(10, 20, Some(5));
        assert_eq!(idle.expansion_limit(), 20);
        assert_eq!(idle.visited_state_limit(), 10);
        assert_eq!(idle.time_budget_ms(), Some(5));
        assert!(!idle.any_limit_reached());

        let none = SearchGuardReport::none();
        assert!(!none.any_limit_reached());
        assert_eq!(none.expansions(), 0);
    }

    #[test]
    fn test_breach_message_single_clause() {
        let report = SearchGuardReport::new(5, 10, None, 5, 2, 1, true, false, false);
        assert_eq!(
            report.breach_message(),
            "Search guard limit exceeded: expansions 5/5."
        );
    }

    #[test]
    fn test_breach_message_multiple_clauses() {
        let report =
            SearchGuardReport::new(5, 10, Some(50), 5, 10, 61, true, true, true);
        assert_eq!(
            report.breach_message(),
            "Search guard limit exceeded: expansions 5/5 and visited states 10/10 and time budget 61ms/50ms."
        );
    }

    #[test]
    fn test_escalate_only_on_breach() {
        let clean = SearchGuardReport::idle(10, 10, None);
        assert!(clean.escalate().is_ok());

        let breached = SearchGuardReport::new(5, 10, None, 5, 2, 1, true, false, false);
        let err = breached.escalate().unwrap_err();
        assert!(matches!(
            err,
            crate::error::PathfinderError::GuardLimitExceeded { .. }
        ));
    }

    #[test]
    fn test_report_json_shape() {
        let report = SearchGuardReport::new(5, 10, Some(50), 4, 9, 12, false, false, false);
        let v = report.to_json();
        assert_eq!(v["limits"]["expansions"], 5);
        assert_eq!(v["limits"]["visited_states"], 10);
        assert_eq!(v["limits"]["time_budget_ms"], 50);
        assert_eq!(v["metrics"]["expansions"], 4);
        assert_eq!(v["metrics"]["visited_states"], 9);
        assert_eq!(v["metrics"]["elapsed_ms"], 12);
        assert_eq!(v["breached"]["expansions"], false);
        assert_eq!(v["breached"]["any"], false);
    }
}
