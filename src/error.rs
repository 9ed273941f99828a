//! Crate-wide error types
//!
//! All construction-time validation fails eagerly with `InvalidInput`.
//! Guard breaches surface through the guard report by default; callers that
//! opt into escalation receive `GuardLimitExceeded` carrying the full report.
//!
//! Author: AI-Generated
//! Created: 2026-02-09

use thiserror::Error;

use crate::search::guards::SearchGuardReport;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, PathfinderError>;

#[derive(Debug, Clone, Error)]
pub enum PathfinderError {
    /// Constraint or invariant violation in a constructor or operation
    /// argument. Never used for absent/optional outcomes.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An arithmetic operation cannot honor its precision guarantee.
    /// Reserved for future scale-preserving operations.
    #[error("precision violation: {0}")]
    PrecisionViolation(String),

    /// Opt-in escalation of guard breaches. Carries the full report so the
    /// caller can inspect which limits fired and by how much.
    #[error("{}", .report.breach_message())]
    GuardLimitExceeded { report: SearchGuardReport },
}

impl PathfinderError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        PathfinderError::InvalidInput(message.into())
    }
}
