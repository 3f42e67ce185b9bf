use indexmap::IndexMap;

use crate::problem::{Direction, Model, VariableId};
use crate::relaxation::Stage;

/// The result of solving a model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveResult {
    /// Solution status
    pub status: SolutionStatus,
    /// A basic feasible solution was found
    pub feasible: bool,
    /// The objective is bounded in the optimization direction
    pub bounded: bool,
    /// Optimal objective value in model terms
    pub objective_value: f64,
    /// Solved quantity for every variable, in model order
    pub values: IndexMap<VariableId, f64>,
    /// Relaxation stage whose model produced this result
    pub stage: Stage,
    /// The bounds used were looser than the caller's
    pub relaxed: bool,
    /// Simplex pivots performed
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// No solution satisfies all constraints
    Infeasible,
    /// The objective can improve without limit
    Unbounded,
    /// The iteration cap was hit before the method terminated
    CycleLimitExceeded,
}

impl SolveResult {
    pub fn optimal(values: IndexMap<VariableId, f64>, objective_value: f64, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            feasible: true,
            bounded: true,
            objective_value,
            values,
            stage: Stage::Original,
            relaxed: false,
            iterations,
        }
    }

    pub fn infeasible(model: &Model, iterations: usize) -> Self {
        Self::without_solution(model, SolutionStatus::Infeasible, iterations)
    }

    pub fn cycle_limit_exceeded(model: &Model, iterations: usize) -> Self {
        Self::without_solution(model, SolutionStatus::CycleLimitExceeded, iterations)
    }

    pub fn unbounded(model: &Model, iterations: usize) -> Self {
        let objective_value = match model.direction {
            Direction::Minimize => f64::NEG_INFINITY,
            Direction::Maximize => f64::INFINITY,
        };
        Self {
            status: SolutionStatus::Unbounded,
            feasible: true,
            bounded: false,
            objective_value,
            values: zeros(model),
            stage: Stage::Original,
            relaxed: false,
            iterations,
        }
    }

    fn without_solution(model: &Model, status: SolutionStatus, iterations: usize) -> Self {
        let objective_value = match model.direction {
            Direction::Minimize => f64::INFINITY,
            Direction::Maximize => f64::NEG_INFINITY,
        };
        Self {
            status,
            feasible: false,
            bounded: true,
            objective_value,
            values: zeros(model),
            stage: Stage::Original,
            relaxed: false,
            iterations,
        }
    }

    /// Tags the result with the relaxation stage that produced it
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self.relaxed = stage != Stage::Original;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Solved quantity of a variable, 0 if it is unknown or unselected
    pub fn value(&self, variable: impl Into<VariableId>) -> f64 {
        self.values.get(&variable.into()).copied().unwrap_or(0.0)
    }

    /// Variables with a positive solved quantity
    pub fn selected(&self) -> impl Iterator<Item = (&VariableId, f64)> {
        self.values.iter().filter(|(_, v)| **v > 0.0).map(|(k, v)| (k, *v))
    }
}

fn zeros(model: &Model) -> IndexMap<VariableId, f64> {
    model.variables.keys().map(|id| (id.clone(), 0.0)).collect()
}
