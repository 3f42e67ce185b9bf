use std::borrow::Cow;

use crate::problem::{Constraint, ConstraintId, InvalidModel, Model};
use crate::simplex::Solver;
use crate::solution::SolveResult;

/// Which attempt of the fallback chain produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Stage {
    /// The caller's bounds
    #[default]
    Original,
    /// Every bound widened by the policy factors
    Relaxed,
    /// Only the essential constraints, widened
    Minimal,
    /// No stage was feasible
    Failed,
}

impl Stage {
    fn next(self) -> Stage {
        match self {
            Stage::Original => Stage::Relaxed,
            Stage::Relaxed => Stage::Minimal,
            Stage::Minimal | Stage::Failed => Stage::Failed,
        }
    }
}

/// How far bounds are loosened when the original model is infeasible
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RelaxationPolicy {
    /// Minimums are multiplied by this (clamped to [0, 1])
    pub min_factor: f64,
    /// Maximums are multiplied by this (at least 1)
    pub max_factor: f64,
    /// Tolerance of the relaxed model, if larger than the original
    pub relaxed_tolerance: f64,
    /// Constraints kept by the minimal stage. Empty skips that stage.
    pub essential: Vec<ConstraintId>,
    /// Tolerance of the minimal model, if larger than the original
    pub minimal_tolerance: f64,
}

impl Default for RelaxationPolicy {
    fn default() -> Self {
        Self {
            min_factor: 0.7,
            max_factor: 1.3,
            relaxed_tolerance: 0.1,
            essential: Vec::new(),
            minimal_tolerance: 0.5,
        }
    }
}

impl RelaxationPolicy {
    pub fn with_factors(mut self, min_factor: f64, max_factor: f64) -> Self {
        self.min_factor = min_factor;
        self.max_factor = max_factor;
        self
    }

    pub fn with_essential<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ConstraintId>,
    {
        self.essential = names.into_iter().map(Into::into).collect();
        self
    }

    /// Moves each bound outward. Positive bounds are scaled directly; negative
    /// ones move by the same relative step so `min <= max` still holds.
    pub fn relax(&self, constraint: &Constraint) -> Constraint {
        let shrink = self.min_factor.clamp(0.0, 1.0);
        let grow = self.max_factor.max(1.0);
        Constraint {
            min: constraint
                .min
                .map(|min| if min >= 0.0 { min * shrink } else { min * (2.0 - shrink) }),
            max: constraint
                .max
                .map(|max| if max >= 0.0 { max * grow } else { max * (2.0 - grow) }),
        }
    }

    /// Copy of the model with every constraint relaxed and the tolerance loosened
    pub fn relaxed_model(&self, model: &Model) -> Model {
        let mut relaxed = model.clone();
        for constraint in relaxed.constraints.values_mut() {
            *constraint = self.relax(constraint);
        }
        relaxed.tolerance = model.tolerance.max(self.relaxed_tolerance);
        relaxed
    }

    /// Copy of the model keeping only the essential constraints, relaxed. `None`
    /// when none of them exist in the model.
    pub fn minimal_model(&self, model: &Model) -> Option<Model> {
        for id in self.essential.iter().filter(|id| !model.constraints.contains_key(*id)) {
            log::debug!("essential constraint '{}' is not part of the model", id);
        }

        let mut minimal = model.clone();
        minimal.constraints = model
            .constraints
            .iter()
            .filter(|(id, _)| self.essential.contains(id))
            .map(|(id, c)| (id.clone(), self.relax(c)))
            .collect();
        if minimal.constraints.is_empty() {
            return None;
        }
        minimal.tolerance = model.tolerance.max(self.minimal_tolerance);
        Some(minimal)
    }

    fn model_for<'a>(&self, stage: Stage, model: &'a Model) -> Option<Cow<'a, Model>> {
        match stage {
            Stage::Original => Some(Cow::Borrowed(model)),
            Stage::Relaxed => Some(Cow::Owned(self.relaxed_model(model))),
            Stage::Minimal => self.minimal_model(model).map(Cow::Owned),
            Stage::Failed => None,
        }
    }
}

/// Runs the solver through the fixed fallback chain
/// `Original -> Relaxed -> Minimal -> Failed`, stopping at the first feasible result
#[derive(Debug, Clone, Default)]
pub struct RelaxationController {
    solver: Solver,
    policy: RelaxationPolicy,
}

impl RelaxationController {
    pub fn new(policy: RelaxationPolicy) -> Self {
        Self {
            solver: Solver::default(),
            policy,
        }
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn policy(&self) -> &RelaxationPolicy {
        &self.policy
    }

    pub fn solve(&self, model: &Model) -> Result<SolveResult, InvalidModel> {
        for warning in model.check()? {
            log::warn!("{}", warning);
        }

        let mut stage = Stage::Original;
        let mut last = None;
        while stage != Stage::Failed {
            let Some(candidate) = self.policy.model_for(stage, model) else {
                log::debug!("skipping {:?} stage", stage);
                stage = stage.next();
                continue;
            };

            let result = self.solver.solve_checked(&candidate).with_stage(stage);
            if result.feasible {
                log::debug!("{:?} stage produced a {:?} result", stage, result.status);
                return Ok(result);
            }
            log::info!("{:?} stage is {:?}, moving on", stage, result.status);
            last = Some(result);
            stage = stage.next();
        }

        log::warn!("no relaxation stage is feasible for '{}'", model.objective);
        Ok(match last {
            Some(result) => result.with_stage(Stage::Failed),
            None => SolveResult::infeasible(model, 0).with_stage(Stage::Failed),
        })
    }
}

/// Solve `model`, falling back to relaxed variants while it stays infeasible
pub fn solve_with_relaxation(model: &Model, policy: &RelaxationPolicy) -> Result<SolveResult, InvalidModel> {
    RelaxationController::new(policy.clone()).solve(model)
}

/// Entry point for presentation layers: re-solve after any change to the model
pub fn recompute(model: &Model, policy: &RelaxationPolicy) -> Result<SolveResult, InvalidModel> {
    solve_with_relaxation(model, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Variable;
    use crate::solution::SolutionStatus;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Needs x >= 50 for protein but allows at most 40 grams
    fn tight_model() -> Model {
        Model::minimize("grams")
            .with_constraint("protein", Constraint::min(10.0))
            .with_constraint("grams", Constraint::max(40.0))
            .with_variable(Variable::new("x").with_coefficient("protein", 0.2))
    }

    /// Sodium caps x at 1.3 grams even after relaxing, so only dropping it helps
    fn sodium_capped_model() -> Model {
        Model::minimize("grams")
            .with_constraint("protein", Constraint::min(10.0))
            .with_constraint("grams", Constraint::max(40.0))
            .with_constraint("sodium", Constraint::max(1.0))
            .with_variable(
                Variable::new("x")
                    .with_coefficient("protein", 0.2)
                    .with_coefficient("sodium", 1.0),
            )
    }

    #[test]
    fn test_feasible_original_is_not_relaxed() {
        init();
        let model = Model::minimize("grams")
            .with_constraint("protein", Constraint::min(10.0))
            .with_variable(Variable::new("x").with_coefficient("protein", 0.2));

        let result = solve_with_relaxation(&model, &RelaxationPolicy::default()).unwrap();

        assert_eq!(result.stage, Stage::Original);
        assert!(!result.relaxed);
        assert!((result.value("x") - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_relaxed_stage() {
        init();
        let model = tight_model();
        let policy = RelaxationPolicy::default();

        let result = solve_with_relaxation(&model, &policy).unwrap();

        assert_eq!(result.stage, Stage::Relaxed);
        assert!(result.relaxed);
        assert!(result.feasible);
        // protein min becomes 7, so x = 35
        assert!((result.value("x") - 35.0).abs() < 1e-6, "x = {}", result.value("x"));
    }

    #[test]
    fn test_minimal_stage() {
        init();
        let policy = RelaxationPolicy::default().with_essential(["protein"]);

        let result = solve_with_relaxation(&sodium_capped_model(), &policy).unwrap();

        assert_eq!(result.stage, Stage::Minimal);
        assert!((result.value("x") - 35.0).abs() < 1e-6, "x = {}", result.value("x"));
    }

    #[test]
    fn test_minimal_stage_skipped_without_essentials() {
        init();
        let result = solve_with_relaxation(&sodium_capped_model(), &RelaxationPolicy::default()).unwrap();

        assert_eq!(result.stage, Stage::Failed);
        assert!(!result.feasible);
        assert_eq!(result.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn test_all_stages_fail() {
        init();
        // Nothing supplies iron
        let model = Model::minimize("grams")
            .with_constraint("iron", Constraint::min(8.0))
            .with_variable(Variable::new("rice").with_coefficient("protein", 0.07));
        let policy = RelaxationPolicy::default().with_essential(["iron"]);

        let result = solve_with_relaxation(&model, &policy).unwrap();

        assert_eq!(result.stage, Stage::Failed);
        assert!(result.relaxed);
        assert!(!result.feasible);
        assert_eq!(result.value("rice"), 0.0);
    }

    #[test]
    fn test_cycle_limit_falls_through() {
        init();
        let controller = RelaxationController::new(RelaxationPolicy::default())
            .with_solver(Solver::new().with_max_iterations(0));

        let result = controller.solve(&tight_model()).unwrap();

        assert_eq!(result.stage, Stage::Failed);
        assert_eq!(result.status, SolutionStatus::CycleLimitExceeded);
    }

    #[test]
    fn test_caller_model_is_untouched() {
        let model = tight_model();
        let before = model.clone();
        let _ = recompute(&model, &RelaxationPolicy::default()).unwrap();
        assert_eq!(model, before);
    }

    #[test]
    fn test_relax_keeps_interval_ordered() {
        let policy = RelaxationPolicy::default();

        let positive = policy.relax(&Constraint::between(14.0, 40.0));
        assert!((positive.min.unwrap() - 9.8).abs() < 1e-12);
        assert!((positive.max.unwrap() - 52.0).abs() < 1e-12);

        let negative = policy.relax(&Constraint::between(-10.0, -5.0));
        assert!(negative.min.unwrap() < -10.0);
        assert!(negative.max.unwrap() > -5.0);
        assert!(negative.min.unwrap() <= negative.max.unwrap());

        // Factors pointing the wrong way are clamped to no change
        let inverted = RelaxationPolicy::default().with_factors(1.5, 0.5);
        assert_eq!(inverted.relax(&Constraint::between(1.0, 2.0)), Constraint::between(1.0, 2.0));
    }

    #[test]
    fn test_relaxed_tolerance() {
        let policy = RelaxationPolicy::default();
        assert_eq!(policy.relaxed_model(&tight_model()).tolerance, 0.1);
        assert_eq!(policy.relaxed_model(&tight_model().with_tolerance(0.2)).tolerance, 0.2);
        assert!(policy.minimal_model(&tight_model()).is_none());
    }
}
