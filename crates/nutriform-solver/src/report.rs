use crate::problem::{ConstraintId, Model};
use crate::solution::SolveResult;

/// Absolute margin used for boundary comparisons when none is given
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// Satisfaction of one constraint by a solved diet
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintStatus {
    pub constraint: ConstraintId,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Weighted sum over the selected variables
    pub actual: f64,
    pub satisfied: bool,
}

/// Information about a violated constraint
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintViolation {
    /// Constraint name
    pub constraint: ConstraintId,
    /// The bound that was missed
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

/// Per-constraint status of a result, judged against a model's bounds
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintReport {
    pub epsilon: f64,
    pub statuses: Vec<ConstraintStatus>,
    /// Violations, worst first
    pub violations: Vec<ConstraintViolation>,
}

impl ConstraintReport {
    /// Compares every constraint's weighted sum against its bounds. A bound
    /// counts as met within `epsilon + model.tolerance * |bound|`.
    pub fn evaluate(model: &Model, result: &SolveResult, epsilon: f64) -> Self {
        let margin = |bound: f64| epsilon + model.tolerance * bound.abs();
        let mut statuses = Vec::with_capacity(model.num_constraints());
        let mut violations = Vec::new();

        for (id, c) in &model.constraints {
            let actual = model.weighted_sum(id, &result.values);
            let satisfied = c.admits(actual, margin);

            if let Some(min) = c.min.filter(|&min| actual < min - margin(min)) {
                let amt = min - actual;
                violations.push(ConstraintViolation {
                    constraint: id.clone(),
                    required: min,
                    actual,
                    violation_amount: amt,
                    description: format!("{} is below minimum of {:.2} by {:.2}", id, min, amt),
                });
            }
            if let Some(max) = c.max.filter(|&max| actual > max + margin(max)) {
                let amt = actual - max;
                violations.push(ConstraintViolation {
                    constraint: id.clone(),
                    required: max,
                    actual,
                    violation_amount: amt,
                    description: format!("{} exceeds maximum of {:.2} by {:.2}", id, max, amt),
                });
            }

            statuses.push(ConstraintStatus {
                constraint: id.clone(),
                min: c.min,
                max: c.max,
                actual,
                satisfied,
            });
        }

        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));

        Self {
            epsilon,
            statuses,
            violations,
        }
    }

    pub fn all_satisfied(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn status(&self, constraint: impl Into<ConstraintId>) -> Option<&ConstraintStatus> {
        let id = constraint.into();
        self.statuses.iter().find(|s| s.constraint == id)
    }
}
