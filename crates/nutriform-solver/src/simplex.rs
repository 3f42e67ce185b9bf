use indexmap::IndexMap;

use crate::problem::{Direction, InvalidModel, Model, VariableId};
use crate::solution::SolveResult;

/// Rule for choosing the entering column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotRule {
    /// Most favorable reduced cost
    #[default]
    Dantzig,
    /// First favorable reduced cost
    Bland,
}

/// Two-phase simplex solver for diet formulation models
#[derive(Debug, Clone)]
pub struct Solver {
    /// Pivots allowed across both phases
    max_iterations: usize,
    /// Magnitude below which tableau entries count as zero during pivot selection
    tolerance: f64,
    /// Largest artificial sum accepted as feasible at the end of phase 1
    feasibility_tolerance: f64,
    pivot_rule: PivotRule,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            feasibility_tolerance: 1e-7,
            pivot_rule: PivotRule::Dantzig,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_feasibility_tolerance(mut self, tol: f64) -> Self {
        self.feasibility_tolerance = tol;
        self
    }

    pub fn with_pivot_rule(mut self, rule: PivotRule) -> Self {
        self.pivot_rule = rule;
        self
    }

    /// Validate and solve the model using the two-phase simplex method
    pub fn solve(&self, model: &Model) -> Result<SolveResult, InvalidModel> {
        for warning in model.check()? {
            log::warn!("{}", warning);
        }
        Ok(self.solve_checked(model))
    }

    /// Solve a model that already passed validation
    pub(crate) fn solve_checked(&self, model: &Model) -> SolveResult {
        let form = StandardForm::from_model(model);
        let mut tableau = self.build_tableau(&form);
        let mut iterations = 0;
        log::debug!(
            "solving {} variables against {} rows ({} artificial)",
            form.variables.len(),
            form.rows.len(),
            tableau.n_artificial
        );

        // Phase 1: find an initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau, &mut iterations) {
                PhaseOne::Feasible => {}
                PhaseOne::Infeasible => {
                    log::debug!("phase 1 ended with a positive artificial sum after {} pivots", iterations);
                    return SolveResult::infeasible(model, iterations);
                }
                PhaseOne::IterationLimit => {
                    log::warn!("phase 1 hit the iteration cap of {}", self.max_iterations);
                    return SolveResult::cycle_limit_exceeded(model, iterations);
                }
            }
        }

        // Phase 2: optimize the real objective
        match self.phase2(&mut tableau, &mut iterations) {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => {
                log::warn!("objective '{}' is unbounded; check the variable bounds", model.objective);
                return SolveResult::unbounded(model, iterations);
            }
            SimplexResult::IterationLimit => {
                log::warn!("phase 2 hit the iteration cap of {}", self.max_iterations);
                return SolveResult::cycle_limit_exceeded(model, iterations);
            }
        }

        let solution = self.extract_solution(&tableau, &form, iterations);
        log::debug!(
            "optimal after {} pivots, {} = {}",
            iterations,
            model.objective,
            solution.objective_value
        );
        solution
    }

    fn build_tableau(&self, form: &StandardForm) -> Tableau {
        let n_vars = form.n_columns;
        let rows: Vec<Row> = form.rows.iter().map(Row::with_nonnegative_rhs).collect();
        let n_constraints = rows.len();

        // Every row gets a slack or surplus; >= rows also need an artificial
        let n_slack = n_constraints;
        let n_artificial = rows.iter().filter(|r| r.op == RowOp::Ge).count();

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            row_labels: rows.iter().map(|r| r.label.clone()).collect(),
        };

        let mut artificial_idx = n_vars + n_slack;
        for (i, row) in rows.iter().enumerate() {
            tableau.data[i][..n_vars].copy_from_slice(&row.coefficients);
            tableau.data[i][total_cols - 1] = row.rhs;

            let slack_idx = n_vars + i;
            match row.op {
                RowOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                }
                RowOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // The tableau maximizes, so a minimization stores -c
        let obj_row = n_constraints;
        for (j, &coef) in form.column_objective.iter().enumerate() {
            tableau.data[obj_row][j] = if form.minimize { -coef } else { coef };
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau, iterations: &mut usize) -> PhaseOne {
        let obj_row = tableau.obj_row();
        let n_cols = tableau.n_cols();
        let rhs_col = tableau.rhs_col();
        let art_start = tableau.art_start();

        // Maximize -sum(artificials), priced out against the artificial basis
        let original = std::mem::replace(&mut tableau.data[obj_row], vec![0.0; n_cols]);
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[obj_row][j] = -1.0;
        }
        for i in 0..obj_row {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] += tableau.data[i][j];
                }
            }
        }

        loop {
            let Some(pivot_col) = self.entering_column(tableau, rhs_col) else {
                break;
            };
            let Some(pivot_row) = self.leaving_row(tableau, pivot_col) else {
                // The auxiliary objective is bounded by zero
                return PhaseOne::Infeasible;
            };
            if *iterations >= self.max_iterations {
                return PhaseOne::IterationLimit;
            }
            self.pivot(tableau, pivot_row, pivot_col);
            *iterations += 1;
        }

        let infeasibility: f64 = (0..obj_row)
            .filter(|&i| tableau.basic_vars[i] >= art_start)
            .map(|i| tableau.data[i][rhs_col])
            .sum();
        if infeasibility > self.feasibility_tolerance {
            return PhaseOne::Infeasible;
        }

        // Drive zero-level artificials out of the basis. A row with nothing but
        // artificial entries is redundant and never changes again.
        for i in 0..obj_row {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            if let Some(col) = (0..art_start).find(|&j| tableau.data[i][j].abs() > self.tolerance) {
                tableau.data[i][rhs_col] = 0.0;
                self.pivot(tableau, i, col);
            }
        }

        // Restore the real objective and price out the basic columns
        tableau.data[obj_row] = original;
        for i in 0..obj_row {
            let ratio = tableau.data[obj_row][tableau.basic_vars[i]];
            if ratio != 0.0 {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        PhaseOne::Feasible
    }

    fn phase2(&self, tableau: &mut Tableau, iterations: &mut usize) -> SimplexResult {
        // Artificial columns never re-enter
        let exclude_from = tableau.art_start();

        loop {
            let Some(pivot_col) = self.entering_column(tableau, exclude_from) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.leaving_row(tableau, pivot_col) else {
                return SimplexResult::Unbounded;
            };
            if *iterations >= self.max_iterations {
                return SimplexResult::IterationLimit;
            }
            self.pivot(tableau, pivot_row, pivot_col);
            *iterations += 1;
        }
    }

    /// Column with a favorable (positive) reduced cost among the first `limit`
    /// columns. Ties go to the lowest index.
    fn entering_column(&self, tableau: &Tableau, limit: usize) -> Option<usize> {
        let obj = &tableau.data[tableau.obj_row()];
        match self.pivot_rule {
            PivotRule::Bland => (0..limit).find(|&j| obj[j] > self.tolerance),
            PivotRule::Dantzig => {
                let mut max_val = self.tolerance;
                let mut max_col = None;
                for (j, &val) in obj.iter().enumerate().take(limit) {
                    if val > max_val {
                        max_val = val;
                        max_col = Some(j);
                    }
                }
                max_col
            }
        }
    }

    /// Minimum ratio test. Ties go to the row whose basic variable has the lowest index.
    fn leaving_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let rhs_col = tableau.rhs_col();
        let mut best: Option<(usize, f64)> = None;

        for i in 0..tableau.obj_row() {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs_col].max(0.0) / val;
            let better = match best {
                None => true,
                Some((row, min_ratio)) => {
                    ratio < min_ratio - self.tolerance
                        || (ratio <= min_ratio + self.tolerance
                            && tableau.basic_vars[i] < tableau.basic_vars[row])
                }
            };
            if better {
                best = Some((i, ratio));
            }
        }

        best.map(|(row, _)| row)
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        log::trace!(
            "pivot on '{}': column {} enters, column {} leaves",
            tableau.row_labels[row],
            col,
            tableau.basic_vars[row]
        );
        tableau.basic_vars[row] = col;

        // Scale pivot row
        let mut pivot_row = std::mem::take(&mut tableau.data[row]);
        let pivot_val = pivot_row[col];
        for v in pivot_row.iter_mut() {
            *v /= pivot_val;
        }

        // Eliminate column in other rows
        for (i, other) in tableau.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in other.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
            other[col] = 0.0;
        }

        tableau.data[row] = pivot_row;
    }

    fn extract_solution(&self, tableau: &Tableau, form: &StandardForm, iterations: usize) -> SolveResult {
        let rhs_col = tableau.rhs_col();

        let mut columns = vec![0.0; tableau.n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < tableau.n_vars {
                let x = tableau.data[i][rhs_col];
                columns[basic] = if x.abs() < self.tolerance { 0.0 } else { x };
            }
        }

        let values: IndexMap<VariableId, f64> = form
            .variables
            .iter()
            .zip(&form.substitutions)
            .map(|(id, sub)| (id.clone(), sub.value(&columns)))
            .collect();

        let objective_value = form
            .objective
            .iter()
            .zip(values.values())
            .map(|(coef, value)| coef * value)
            .sum();

        SolveResult::optimal(values, objective_value, iterations)
    }
}

/// How a model variable is written in terms of non-negative tableau columns
#[derive(Debug, Clone, Copy)]
enum Substitution {
    /// `x = lower + x'`
    Shift { col: usize, lower: f64 },
    /// `x = upper - x'`, for variables bounded only from above
    Mirror { col: usize, upper: f64 },
    /// `x = x⁺ - x⁻`, for free variables
    Split { pos: usize, neg: usize },
}

impl Substitution {
    fn offset(&self) -> f64 {
        match *self {
            Substitution::Shift { lower, .. } => lower,
            Substitution::Mirror { upper, .. } => upper,
            Substitution::Split { .. } => 0.0,
        }
    }

    /// Adds `coef * x` to a row over tableau columns
    fn spread(&self, coef: f64, row: &mut [f64]) {
        match *self {
            Substitution::Shift { col, .. } => row[col] += coef,
            Substitution::Mirror { col, .. } => row[col] -= coef,
            Substitution::Split { pos, neg } => {
                row[pos] += coef;
                row[neg] -= coef;
            }
        }
    }

    fn value(&self, columns: &[f64]) -> f64 {
        match *self {
            Substitution::Shift { col, lower } => lower + columns[col],
            Substitution::Mirror { col, upper } => upper - columns[col],
            Substitution::Split { pos, neg } => columns[pos] - columns[neg],
        }
    }
}

/// The model lowered to rows over non-negative columns
struct StandardForm {
    variables: Vec<VariableId>,
    substitutions: Vec<Substitution>,
    n_columns: usize,
    /// Objective coefficients in model terms
    objective: Vec<f64>,
    /// Objective coefficients per tableau column
    column_objective: Vec<f64>,
    rows: Vec<Row>,
    minimize: bool,
}

impl StandardForm {
    fn from_model(model: &Model) -> Self {
        let vars: Vec<_> = model.variables.values().collect();

        let mut n_columns = 0;
        let substitutions: Vec<Substitution> = vars
            .iter()
            .map(|v| {
                let col = n_columns;
                let upper = v.upper.filter(|u| u.is_finite());
                if v.lower.is_finite() {
                    n_columns += 1;
                    Substitution::Shift { col, lower: v.lower }
                } else if let Some(upper) = upper {
                    n_columns += 1;
                    Substitution::Mirror { col, upper }
                } else {
                    n_columns += 2;
                    Substitution::Split { pos: col, neg: col + 1 }
                }
            })
            .collect();

        // Spreads model coefficients over the columns; returns the row and the
        // constant the substitutions move to the right-hand side
        let to_columns = |coefficients: &[f64]| {
            let mut row = vec![0.0; n_columns];
            let mut shift = 0.0;
            for (sub, &coef) in substitutions.iter().zip(coefficients) {
                sub.spread(coef, &mut row);
                shift += coef * sub.offset();
            }
            (row, shift)
        };

        let mut rows = Vec::new();

        // A closed interval becomes two rows
        for (id, constraint) in &model.constraints {
            let coefficients: Vec<f64> = vars.iter().map(|v| model.row_coefficient(v, id)).collect();
            let (coefficients, shift) = to_columns(coefficients.as_slice());
            if let Some(min) = constraint.min {
                rows.push(Row {
                    label: format!("{} >= {}", id, min),
                    coefficients: coefficients.clone(),
                    op: RowOp::Ge,
                    rhs: min - shift,
                });
            }
            if let Some(max) = constraint.max {
                rows.push(Row {
                    label: format!("{} <= {}", id, max),
                    coefficients,
                    op: RowOp::Le,
                    rhs: max - shift,
                });
            }
        }

        // Mirrored variables already carry their upper bound
        for (v, sub) in vars.iter().zip(&substitutions) {
            if let (Substitution::Shift { col, lower }, Some(upper)) = (*sub, v.upper.filter(|u| u.is_finite())) {
                let mut coefficients = vec![0.0; n_columns];
                coefficients[col] = 1.0;
                rows.push(Row {
                    label: format!("{} <= {}", v.id, upper),
                    coefficients,
                    op: RowOp::Le,
                    rhs: upper - lower,
                });
            }
        }

        let objective: Vec<f64> = vars.iter().map(|v| model.objective_coefficient(v)).collect();
        let (column_objective, _) = to_columns(objective.as_slice());

        Self {
            variables: vars.iter().map(|v| v.id.clone()).collect(),
            substitutions,
            n_columns,
            objective,
            column_objective,
            rows,
            minimize: model.direction == Direction::Minimize,
        }
    }
}

#[derive(Debug, Clone)]
struct Row {
    label: String,
    coefficients: Vec<f64>,
    op: RowOp,
    rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
}

impl Row {
    /// Negates rows with a negative RHS, and >= rows with a zero RHS so their
    /// slack can start in the basis
    fn with_nonnegative_rhs(&self) -> Row {
        let flip = self.rhs < 0.0 || (self.op == RowOp::Ge && self.rhs == 0.0);
        if !flip {
            return self.clone();
        }
        Row {
            label: self.label.clone(),
            coefficients: self.coefficients.iter().map(|c| -c).collect(),
            op: match self.op {
                RowOp::Le => RowOp::Ge,
                RowOp::Ge => RowOp::Le,
            },
            rhs: -self.rhs,
        }
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    row_labels: Vec<String>,
}

impl Tableau {
    fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    fn n_cols(&self) -> usize {
        self.data[0].len()
    }

    fn rhs_col(&self) -> usize {
        self.n_cols() - 1
    }

    fn art_start(&self) -> usize {
        self.n_vars + self.n_slack
    }
}

enum PhaseOne {
    Feasible,
    Infeasible,
    IterationLimit,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Constraint, Variable};
    use crate::solution::SolutionStatus;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_simple_maximization() {
        init();
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let model = Model::maximize("profit")
            .with_constraint("sum", Constraint::max(4.0))
            .with_variable(
                Variable::new("x")
                    .with_coefficient("profit", 3.0)
                    .with_coefficient("sum", 1.0)
                    .with_bounds(0.0, Some(3.0)),
            )
            .with_variable(
                Variable::new("y")
                    .with_coefficient("profit", 2.0)
                    .with_coefficient("sum", 1.0)
                    .with_bounds(0.0, Some(3.0)),
            );

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("x") - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.value("x"));
        assert!((solution.value("y") - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.value("y"));
        assert!(
            (solution.objective_value - 11.0).abs() < 1e-6,
            "obj = {} (expected 11)",
            solution.objective_value
        );
    }

    #[test]
    fn test_minimization_with_ge() {
        init();
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=9
        let model = Model::minimize("cost")
            .with_constraint("sum", Constraint::min(4.0))
            .with_variable(
                Variable::new("x")
                    .with_coefficient("cost", 2.0)
                    .with_coefficient("sum", 1.0)
                    .with_bounds(0.0, Some(3.0)),
            )
            .with_variable(
                Variable::new("y")
                    .with_coefficient("cost", 3.0)
                    .with_coefficient("sum", 1.0)
                    .with_bounds(0.0, Some(3.0)),
            );

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("x") - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.value("x"));
        assert!((solution.value("y") - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.value("y"));
        assert!(
            (solution.objective_value - 9.0).abs() < 1e-6,
            "obj = {} (expected 9)",
            solution.objective_value
        );
    }

    #[test]
    fn test_infeasible() {
        init();
        // x >= 5
        // x <= 3
        let model = Model::minimize("grams")
            .with_constraint("lower", Constraint::min(5.0))
            .with_constraint("upper", Constraint::max(3.0))
            .with_variable(
                Variable::new("x")
                    .with_coefficient("lower", 1.0)
                    .with_coefficient("upper", 1.0),
            );

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(!solution.feasible);
        assert_eq!(solution.value("x"), 0.0);
    }

    #[test]
    fn test_closed_interval() {
        init();
        // Minimize grams with 0.2 g protein and 0.5 mg sodium per gram,
        // protein in [10, 20], sodium <= 40
        let model = Model::minimize("grams")
            .with_constraint("protein", Constraint::between(10.0, 20.0))
            .with_constraint("sodium", Constraint::max(40.0))
            .with_variable(
                Variable::new("beans")
                    .with_coefficient("protein", 0.2)
                    .with_coefficient("sodium", 0.5),
            );

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("beans") - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_lower_bound_is_shifted() {
        init();
        // Minimize x + y with x >= 2 (variable bound) and x + y >= 5
        let model = Model::minimize("grams")
            .with_constraint("energy", Constraint::min(5.0))
            .with_variable(Variable::new("x").with_coefficient("energy", 1.0).with_bounds(2.0, None))
            .with_variable(Variable::new("y").with_coefficient("energy", 2.0));

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("x") - 2.0).abs() < 1e-6, "x = {}", solution.value("x"));
        assert!((solution.value("y") - 1.5).abs() < 1e-6, "y = {}", solution.value("y"));
        assert!((solution.objective_value - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_unbounded_maximization() {
        init();
        let model = Model::maximize("grams")
            .with_constraint("protein", Constraint::min(10.0))
            .with_variable(Variable::new("x").with_coefficient("protein", 1.0));

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Unbounded);
        assert!(solution.feasible);
        assert!(!solution.bounded);
        assert_eq!(solution.objective_value, f64::INFINITY);
    }

    #[test]
    fn test_iteration_cap() {
        init();
        // Needs one phase 1 pivot per nutrient row
        let model = Model::minimize("grams")
            .with_constraint("a", Constraint::min(10.0))
            .with_constraint("b", Constraint::min(10.0))
            .with_variable(Variable::new("x").with_coefficient("a", 1.0))
            .with_variable(Variable::new("y").with_coefficient("b", 1.0));

        let solution = Solver::new().with_max_iterations(1).solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::CycleLimitExceeded);
        assert!(!solution.feasible);
        assert_eq!(solution.iterations, 1);
    }

    #[test]
    fn test_bland_rule_agrees() {
        init();
        let model = Model::minimize("grams")
            .with_constraint("protein", Constraint::min(30.0))
            .with_constraint("fibre", Constraint::min(10.0))
            .with_variable(
                Variable::new("oats")
                    .with_coefficient("protein", 0.13)
                    .with_coefficient("fibre", 0.10),
            )
            .with_variable(
                Variable::new("lentils")
                    .with_coefficient("protein", 0.25)
                    .with_coefficient("fibre", 0.08),
            );

        let dantzig = Solver::new().solve(&model).unwrap();
        let bland = Solver::new().with_pivot_rule(PivotRule::Bland).solve(&model).unwrap();

        assert_eq!(dantzig.status, SolutionStatus::Optimal);
        assert_eq!(bland.status, SolutionStatus::Optimal);
        assert!(
            (dantzig.objective_value - bland.objective_value).abs() < 1e-6,
            "{} vs {}",
            dantzig.objective_value,
            bland.objective_value
        );
    }

    #[test]
    fn test_invalid_model_is_not_solved() {
        let model = Model::minimize("grams").with_constraint("protein", Constraint::min(1.0));
        assert!(Solver::new().solve(&model).is_err());
    }

    #[test]
    fn test_redundant_equal_rows() {
        init();
        // The two copies of the same >= row leave an artificial in the basis at zero
        let model = Model::minimize("grams")
            .with_constraint("iron", Constraint::min(8.0))
            .with_constraint("iron copy", Constraint::min(8.0))
            .with_variable(
                Variable::new("spinach")
                    .with_coefficient("iron", 0.04)
                    .with_coefficient("iron copy", 0.04),
            )
            .with_variable(
                Variable::new("beef")
                    .with_coefficient("iron", 0.02)
                    .with_coefficient("iron copy", 0.02),
            );

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("spinach") - 200.0).abs() < 1e-6);
        assert_eq!(solution.value("beef"), 0.0);
    }

    #[test]
    fn test_free_variable_is_unbounded() {
        init();
        let model = Model::minimize("grams").with_variable(Variable::new("x").with_bounds(f64::NEG_INFINITY, None));

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Unbounded);
        assert!(!solution.bounded);
        assert_eq!(solution.objective_value, f64::NEG_INFINITY);
    }

    #[test]
    fn test_free_variable_with_negative_minimum() {
        init();
        // x >= -3 with x free: the row has a negative right-hand side and is flipped
        let model = Model::minimize("grams")
            .with_constraint("net", Constraint::min(-3.0))
            .with_variable(
                Variable::new("x")
                    .with_coefficient("net", 1.0)
                    .with_bounds(f64::NEG_INFINITY, None),
            );

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("x") + 3.0).abs() < 1e-6, "x = {} (expected -3)", solution.value("x"));
        assert!(
            (solution.objective_value + 3.0).abs() < 1e-6,
            "obj = {} (expected -3)",
            solution.objective_value
        );
    }

    #[test]
    fn test_upper_bound_only() {
        init();
        let model =
            Model::maximize("grams").with_variable(Variable::new("x").with_bounds(f64::NEG_INFINITY, Some(5.0)));

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("x") - 5.0).abs() < 1e-6, "x = {} (expected 5)", solution.value("x"));
        assert!((solution.objective_value - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_lower_bound_is_shifted() {
        init();
        // x in [-5, 5] with x >= -2 lowers to x' >= 3
        let model = Model::minimize("grams")
            .with_constraint("net", Constraint::min(-2.0))
            .with_variable(
                Variable::new("x")
                    .with_coefficient("net", 1.0)
                    .with_bounds(-5.0, Some(5.0)),
            );

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("x") + 2.0).abs() < 1e-6, "x = {} (expected -2)", solution.value("x"));
    }

    #[test]
    fn test_negative_maximum_is_flipped() {
        init();
        // -x <= -4 means x >= 4
        let model = Model::minimize("grams")
            .with_constraint("deficit", Constraint::max(-4.0))
            .with_variable(Variable::new("x").with_coefficient("deficit", -1.0));

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("x") - 4.0).abs() < 1e-6, "x = {} (expected 4)", solution.value("x"));
    }

    #[test]
    fn test_zero_minimum_row() {
        init();
        // y - x >= 0 has a zero right-hand side and starts with its slack in the basis
        // Optimal: x=10, y=10, obj=20
        let model = Model::minimize("grams")
            .with_constraint("protein", Constraint::min(10.0))
            .with_constraint("balance", Constraint::min(0.0))
            .with_variable(
                Variable::new("x")
                    .with_coefficient("protein", 1.0)
                    .with_coefficient("balance", -1.0),
            )
            .with_variable(Variable::new("y").with_coefficient("balance", 1.0));

        let solution = Solver::new().solve(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.value("x") - 10.0).abs() < 1e-6, "x = {} (expected 10)", solution.value("x"));
        assert!((solution.value("y") - 10.0).abs() < 1e-6, "y = {} (expected 10)", solution.value("y"));
        assert!(
            (solution.objective_value - 20.0).abs() < 1e-6,
            "obj = {} (expected 20)",
            solution.objective_value
        );
    }

    #[test]
    fn test_rows_are_flipped_to_nonnegative_rhs() {
        let negative = Row {
            label: "a".to_string(),
            coefficients: vec![1.0, -2.0],
            op: RowOp::Le,
            rhs: -3.0,
        }
        .with_nonnegative_rhs();
        assert_eq!(negative.op, RowOp::Ge);
        assert_eq!(negative.coefficients, vec![-1.0, 2.0]);
        assert_eq!(negative.rhs, 3.0);

        let zero_ge = Row {
            label: "b".to_string(),
            coefficients: vec![1.0],
            op: RowOp::Ge,
            rhs: 0.0,
        }
        .with_nonnegative_rhs();
        assert_eq!(zero_ge.op, RowOp::Le);
        assert_eq!(zero_ge.coefficients, vec![-1.0]);

        let positive = Row {
            label: "c".to_string(),
            coefficients: vec![1.0],
            op: RowOp::Ge,
            rhs: 2.0,
        }
        .with_nonnegative_rhs();
        assert_eq!(positive.op, RowOp::Ge);
        assert_eq!(positive.rhs, 2.0);
    }
}
