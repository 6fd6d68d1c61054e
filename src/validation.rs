//! Parameter validation reporting.
//!
//! Parameter structs are plain data; `validate` methods clamp fields
//! into their legal ranges in place and return a report naming every
//! field that was changed, so callers see the exact values the
//! pipeline will run with instead of silently mutated inputs.

use serde::Serialize;
use std::fmt;

/// One field adjusted during validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    /// Name of the adjusted field.
    pub field: &'static str,
    /// Value before clamping.
    pub from: f64,
    /// Value after clamping.
    pub to: f64,
    /// Constraint that forced the change.
    pub reason: &'static str,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} ({})",
            self.field, self.from, self.to, self.reason
        )
    }
}

/// Outcome of validating a parameter struct.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Adjustments applied, in field order.
    pub adjustments: Vec<Adjustment>,
}

impl ValidationReport {
    /// Record one adjustment.
    pub(crate) fn push(&mut self, field: &'static str, from: f64, to: f64, reason: &'static str) {
        self.adjustments.push(Adjustment {
            field,
            from,
            to,
            reason,
        });
    }

    /// True when no field needed clamping.
    pub fn is_clean(&self) -> bool {
        self.adjustments.is_empty()
    }

    /// Number of adjusted fields.
    pub fn len(&self) -> usize {
        self.adjustments.len()
    }

    /// True when the report carries no adjustments.
    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }

    /// Log every adjustment at warn level under a short context tag.
    pub fn warn_all(&self, context: &str) {
        for adj in &self.adjustments {
            log::warn!("{context}: adjusted {adj}");
        }
    }
}

/// Clamp `value` to the nearest odd integer at or above `min`.
///
/// Shared by the blur/morphology kernel fields, which all require an
/// odd size so the kernel has a center pixel.
pub(crate) fn force_odd_at_least(value: u32, min: u32) -> u32 {
    let v = value.max(min);
    if v % 2 == 0 {
        v + 1
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_adjustments() {
        let mut report = ValidationReport::default();
        assert!(report.is_clean());
        report.push("threshold1", 300.0, 255.0, "must be at most 255");
        assert!(!report.is_clean());
        assert_eq!(report.len(), 1);
        assert_eq!(
            report.adjustments[0].to_string(),
            "threshold1: 300 -> 255 (must be at most 255)"
        );
    }

    #[test]
    fn odd_clamp() {
        assert_eq!(force_odd_at_least(0, 3), 3);
        assert_eq!(force_odd_at_least(4, 3), 5);
        assert_eq!(force_odd_at_least(5, 3), 5);
        assert_eq!(force_odd_at_least(2, 1), 3);
        assert_eq!(force_odd_at_least(7, 3), 7);
    }
}
