//! Search state signatures
//!
//! Normalized `label:value` segments joined by `|`, used as the dedup key in
//! the state registry. The encoding is observable: it must round-trip
//! through compose -> value -> from_string bit-exactly, so parsing is
//! strict about empty segments, missing separators and stray delimiters.
//!
//! Author: AI-Generated
//! Created: 2026-02-13

use std::fmt;

use crate::decimal;
use crate::error::{PathfinderError, Result};
use crate::search::state::SpendRange;
use crate::types::Money;

/// Literal token for an absent optional value.
pub const NULL_TOKEN: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSegment {
    label: String,
    value: String,
}

impl SignatureSegment {
    fn new(label: &str, value: &str) -> Result<Self> {
        let label = label.trim();
        let value = value.trim();
        if label.is_empty() {
            return Err(PathfinderError::invalid_input("empty signature label"));
        }
        if label.contains('|') || label.contains(':') {
            return Err(PathfinderError::invalid_input(format!(
                "signature label \"{label}\" contains a reserved delimiter"
            )));
        }
        if value.is_empty() {
            return Err(PathfinderError::invalid_input(format!(
                "empty signature value for label \"{label}\""
            )));
        }
        if value.contains('|') {
            return Err(PathfinderError::invalid_input(format!(
                "signature value for \"{label}\" contains a segment delimiter"
            )));
        }
        Ok(Self {
            label: label.to_string(),
            value: value.to_string(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Ordered `label:value` sequence. Segment order is preserved and
/// significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStateSignature {
    segments: Vec<SignatureSegment>,
}

impl SearchStateSignature {
    /// Build from label/value pairs, validating each segment.
    pub fn compose(pairs: &[(&str, &str)]) -> Result<Self> {
        if pairs.is_empty() {
            return Err(PathfinderError::invalid_input(
                "signature requires at least one segment",
            ));
        }
        let segments = pairs
            .iter()
            .map(|(label, value)| SignatureSegment::new(label, value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// The canonical encoded form.
    pub fn value(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("{}:{}", s.label, s.value))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Strict parse of the encoded form.
    pub fn from_string(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathfinderError::invalid_input("empty signature string"));
        }
        let mut segments = Vec::new();
        for part in trimmed.split('|') {
            if part.trim().is_empty() {
                return Err(PathfinderError::invalid_input(format!(
                    "blank segment in signature \"{trimmed}\""
                )));
            }
            let (label, value) = part.split_once(':').ok_or_else(|| {
                PathfinderError::invalid_input(format!(
                    "segment \"{part}\" is missing the label separator"
                ))
            })?;
            segments.push(SignatureSegment::new(label, value)?);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[SignatureSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for SearchStateSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// `currency:amount:scale`, or the null token.
pub fn encode_money(money: Option<&Money>) -> String {
    match money {
        Some(m) => format!(
            "{}:{}:{}",
            m.currency(),
            decimal::render(m.amount(), m.scale()),
            m.scale()
        ),
        None => NULL_TOKEN.to_string(),
    }
}

/// `currency:min:max:scale`, or the null token.
pub fn encode_range(range: Option<&SpendRange>) -> String {
    match range {
        Some(r) => {
            let scale = r.scale();
            format!(
                "{}:{}:{}:{}",
                r.currency(),
                decimal::render(r.min().amount(), scale),
                decimal::render(r.max().amount(), scale),
                scale
            )
        }
        None => NULL_TOKEN.to_string(),
    }
}
