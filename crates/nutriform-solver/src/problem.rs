use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

/// Strips line breaks (including the `&#10;` entity spreadsheet exports leave
/// in headers) and surrounding whitespace.
fn normalize(raw: &str) -> String {
    raw.replace("&#10;", "")
        .replace(['\r', '\n'], "")
        .trim()
        .to_string()
}

macro_rules! name_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl AsRef<str>) -> Self {
                Self(normalize(raw.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self::new(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

name_id! {
    /// Normalized name of a decision variable (a food item)
    VariableId
}

name_id! {
    /// Normalized name of a constrained quantity (a nutrient, or the objective quantity)
    ConstraintId
}

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "min"))]
    Minimize,
    #[cfg_attr(feature = "serde", serde(alias = "max"))]
    Maximize,
}

/// Bounds on the weighted sum of one constrained quantity
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    /// Lower bound on the weighted sum
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub min: Option<f64>,
    /// Upper bound on the weighted sum
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub max: Option<f64>,
}

impl Constraint {
    pub fn min(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    pub fn max(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Multiplies both bounds by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            min: self.min.map(|v| v * factor),
            max: self.max.map(|v| v * factor),
        }
    }

    /// Whether `sum` lies within the bounds widened by `margin(bound)` on each side
    pub fn admits(&self, sum: f64, margin: impl Fn(f64) -> f64) -> bool {
        let above_min = self.min.is_none_or(|min| sum >= min - margin(min));
        let below_max = self.max.is_none_or(|max| sum <= max + margin(max));
        above_min && below_max
    }
}

/// A decision quantity with its per-unit contribution to each constrained quantity
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    pub id: VariableId,
    /// Per-unit coefficients keyed by constraint name
    #[cfg_attr(feature = "serde", serde(default))]
    pub coefficients: BTreeMap<ConstraintId, f64>,
    /// Lower bound (default 0, `-inf` for none)
    #[cfg_attr(feature = "serde", serde(default))]
    pub lower: f64,
    /// Upper bound (default unbounded)
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub upper: Option<f64>,
}

impl Variable {
    pub fn new(name: impl Into<VariableId>) -> Self {
        Self {
            id: name.into(),
            coefficients: BTreeMap::new(),
            lower: 0.0,
            upper: None,
        }
    }

    pub fn with_coefficient(mut self, constraint: impl Into<ConstraintId>, value: f64) -> Self {
        self.set_coefficient(constraint, value);
        self
    }

    pub fn set_coefficient(&mut self, constraint: impl Into<ConstraintId>, value: f64) {
        self.coefficients.insert(constraint.into(), value);
    }

    pub fn with_bounds(mut self, lower: f64, upper: Option<f64>) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    pub fn coefficient(&self, constraint: &ConstraintId) -> Option<f64> {
        self.coefficients.get(constraint).copied()
    }
}

/// A diet formulation model: minimize (or maximize) the objective quantity over
/// all variables subject to constraint bounds
///
/// Repeated names are only detected through [`Model::add_constraint`] and
/// [`Model::add_variable`]. Deserializing a model keeps the last of any
/// repeated keys without reporting it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Model {
    /// Name of the optimized quantity. Each variable contributes 1 per unit unless
    /// it carries a coefficient under this name.
    pub objective: ConstraintId,
    pub direction: Direction,
    pub constraints: BTreeMap<ConstraintId, Constraint>,
    pub variables: IndexMap<VariableId, Variable>,
    /// Fraction in `[0, 1]` of each bound used as margin when judging whether it is satisfied
    #[cfg_attr(feature = "serde", serde(default))]
    pub tolerance: f64,
    #[cfg_attr(feature = "serde", serde(skip))]
    duplicate_constraints: Vec<ConstraintId>,
    #[cfg_attr(feature = "serde", serde(skip))]
    duplicate_variables: Vec<VariableId>,
}

impl Model {
    pub fn new(objective: impl Into<ConstraintId>, direction: Direction) -> Self {
        Self {
            objective: objective.into(),
            direction,
            constraints: BTreeMap::new(),
            variables: IndexMap::new(),
            tolerance: 0.0,
            duplicate_constraints: Vec::new(),
            duplicate_variables: Vec::new(),
        }
    }

    pub fn minimize(objective: impl Into<ConstraintId>) -> Self {
        Self::new(objective, Direction::Minimize)
    }

    pub fn maximize(objective: impl Into<ConstraintId>) -> Self {
        Self::new(objective, Direction::Maximize)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_constraint(mut self, name: impl Into<ConstraintId>, constraint: Constraint) -> Self {
        self.add_constraint(name, constraint);
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.add_variable(variable);
        self
    }

    /// Adds a constraint. A second definition under the same name replaces the
    /// first and is remembered so validation can flag it.
    pub fn add_constraint(&mut self, name: impl Into<ConstraintId>, constraint: Constraint) -> Option<Constraint> {
        let id = name.into();
        let previous = self.constraints.insert(id.clone(), constraint);
        if previous.is_some() {
            log::debug!("constraint '{}' redefined", id);
            self.duplicate_constraints.push(id);
        }
        previous
    }

    /// Adds a variable, replacing (and flagging) any earlier one with the same name
    pub fn add_variable(&mut self, variable: Variable) -> Option<Variable> {
        let id = variable.id.clone();
        let previous = self.variables.insert(id.clone(), variable);
        if previous.is_some() {
            log::debug!("variable '{}' redefined", id);
            self.duplicate_variables.push(id);
        }
        previous
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective units contributed by one unit of `variable`
    pub fn objective_coefficient(&self, variable: &Variable) -> f64 {
        variable.coefficient(&self.objective).unwrap_or(1.0)
    }

    /// Coefficient of `variable` in the row of `constraint`. Constraining the
    /// objective quantity itself uses the objective contribution.
    pub fn row_coefficient(&self, variable: &Variable, constraint: &ConstraintId) -> f64 {
        if *constraint == self.objective {
            self.objective_coefficient(variable)
        } else {
            variable.coefficient(constraint).unwrap_or(0.0)
        }
    }

    /// Weighted sum of `constraint` for the given quantities (missing variables count as 0)
    pub fn weighted_sum(&self, constraint: &ConstraintId, values: &IndexMap<VariableId, f64>) -> f64 {
        self.variables
            .values()
            .filter_map(|v| {
                let amount = values.get(&v.id).copied().unwrap_or(0.0);
                (amount > 0.0).then(|| self.row_coefficient(v, constraint) * amount)
            })
            .sum()
    }

    /// Copy of the model with every constraint bound multiplied by `factor`
    pub fn with_bounds_scaled(&self, factor: f64) -> Self {
        let mut scaled = self.clone();
        for constraint in scaled.constraints.values_mut() {
            *constraint = constraint.scaled(factor);
        }
        scaled
    }

    pub fn duplicate_constraints(&self) -> &[ConstraintId] {
        &self.duplicate_constraints
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        validate(self)
    }

    /// Validates the model, returning the non-fatal findings on success
    pub fn check(&self) -> Result<Vec<ValidationError>, InvalidModel> {
        let (fatal, warnings): (Vec<_>, Vec<_>) = validate(self).into_iter().partition(ValidationError::is_fatal);
        if fatal.is_empty() {
            Ok(warnings)
        } else {
            Err(InvalidModel { errors: fatal })
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Model has no variables")]
    NoVariables,
    #[error("Objective name is empty")]
    EmptyObjective,
    #[error("Constraint {0} has neither a min nor a max")]
    MissingBounds(ConstraintId),
    #[error("Constraint {id} has min {min} greater than max {max}")]
    InvertedConstraintBounds { id: ConstraintId, min: f64, max: f64 },
    #[error("Variable {id} has lower bound {lower} greater than upper bound {upper}")]
    InvertedVariableBounds { id: VariableId, lower: f64, upper: f64 },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
    #[error("Tolerance must be a fraction between 0 and 1, got {0}")]
    ToleranceOutOfRange(f64),
    #[error("Constraint {0} defined more than once; the last definition is used")]
    DuplicateConstraint(ConstraintId),
    #[error("Variable {0} defined more than once; the last definition is used")]
    DuplicateVariable(VariableId),
}

impl ValidationError {
    /// Duplicates are resolved by "last definition wins" and only reported
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ValidationError::DuplicateConstraint(_) | ValidationError::DuplicateVariable(_)
        )
    }
}

/// A model that failed validation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid model: {}", join_errors(.errors))]
pub struct InvalidModel {
    pub errors: Vec<ValidationError>,
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

/// Checks a model for structural problems before solving
pub fn validate(model: &Model) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if model.variables.is_empty() {
        errors.push(ValidationError::NoVariables);
    }
    if model.objective.is_empty() {
        errors.push(ValidationError::EmptyObjective);
    }
    if !model.tolerance.is_finite() {
        errors.push(ValidationError::NonFinite("tolerance".to_string()));
    } else if !(0.0..=1.0).contains(&model.tolerance) {
        errors.push(ValidationError::ToleranceOutOfRange(model.tolerance));
    }

    for (id, c) in &model.constraints {
        if c.is_empty() {
            errors.push(ValidationError::MissingBounds(id.clone()));
            continue;
        }
        if c.min.is_some_and(|v| !v.is_finite()) || c.max.is_some_and(|v| !v.is_finite()) {
            errors.push(ValidationError::NonFinite(format!("bounds of constraint {}", id)));
            continue;
        }
        if let (Some(min), Some(max)) = (c.min, c.max) {
            if min > max {
                errors.push(ValidationError::InvertedConstraintBounds { id: id.clone(), min, max });
            }
        }
    }

    for v in model.variables.values() {
        // -inf below and +inf above both mean "no bound"
        let bad_lower = v.lower.is_nan() || v.lower == f64::INFINITY;
        let bad_upper = v.upper.is_some_and(|u| u.is_nan() || u == f64::NEG_INFINITY);
        if bad_lower || bad_upper {
            errors.push(ValidationError::NonFinite(format!("bounds of variable {}", v.id)));
        } else if let Some(upper) = v.upper.filter(|u| *u < v.lower) {
            errors.push(ValidationError::InvertedVariableBounds {
                id: v.id.clone(),
                lower: v.lower,
                upper,
            });
        }
        if let Some((name, _)) = v.coefficients.iter().find(|(_, c)| !c.is_finite()) {
            errors.push(ValidationError::NonFinite(format!("coefficient {} of variable {}", name, v.id)));
        }
    }

    for id in &model.duplicate_constraints {
        errors.push(ValidationError::DuplicateConstraint(id.clone()));
    }
    for id in &model.duplicate_variables {
        errors.push(ValidationError::DuplicateVariable(id.clone()));
    }

    errors
}
