mod problem;
mod relaxation;
mod report;
mod simplex;
mod solution;

pub use problem::{
    validate, Constraint, ConstraintId, Direction, InvalidModel, Model, ValidationError, Variable, VariableId,
};
pub use relaxation::{recompute, solve_with_relaxation, RelaxationController, RelaxationPolicy, Stage};
pub use report::{ConstraintReport, ConstraintStatus, ConstraintViolation, DEFAULT_EPSILON};
pub use simplex::{PivotRule, Solver};
pub use solution::{SolutionStatus, SolveResult};
