use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use nutriform_solver::{Constraint, ConstraintId, Direction, Model, RelaxationPolicy, Variable, VariableId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::preset;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Food table must be a JSON array of row objects")]
    NotATable,
    #[error("Row {0} has no '{1}' column")]
    MissingName(usize, String),
    #[error("Fraction must be a positive number, got {0}")]
    InvalidFraction(f64),
}

/// A constraint as written in a constraint file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedConstraint {
    pub name: String,
    #[serde(flatten)]
    pub bounds: Constraint,
}

/// Which foods take part, and per-food gram limits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodOptions {
    /// Disabled foods
    pub exclude: Vec<VariableId>,
    /// Per-food min/max grams
    pub bounds: BTreeMap<VariableId, Constraint>,
}

/// Contents of a constraint file. Missing fields fall back to the built-in
/// daily intake preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub objective: String,
    pub direction: Direction,
    pub tolerance: f64,
    /// A list rather than a map so repeated names reach the model and get flagged
    pub constraints: Vec<NamedConstraint>,
    pub foods: FoodOptions,
    /// Fields given here override the preset policy one by one
    #[serde(deserialize_with = "policy_over_preset")]
    pub relaxation: RelaxationPolicy,
}

/// A `relaxation` block as written; absent fields keep the preset value
#[derive(Deserialize)]
struct PolicyOverrides {
    min_factor: Option<f64>,
    max_factor: Option<f64>,
    relaxed_tolerance: Option<f64>,
    essential: Option<Vec<ConstraintId>>,
    minimal_tolerance: Option<f64>,
}

fn preset_policy() -> RelaxationPolicy {
    RelaxationPolicy::default().with_essential(preset::essential())
}

fn policy_over_preset<'de, D>(deserializer: D) -> Result<RelaxationPolicy, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = PolicyOverrides::deserialize(deserializer)?;
    let mut policy = preset_policy();
    if let Some(v) = overrides.min_factor {
        policy.min_factor = v;
    }
    if let Some(v) = overrides.max_factor {
        policy.max_factor = v;
    }
    if let Some(v) = overrides.relaxed_tolerance {
        policy.relaxed_tolerance = v;
    }
    if let Some(names) = overrides.essential {
        policy.essential = names;
    }
    if let Some(v) = overrides.minimal_tolerance {
        policy.minimal_tolerance = v;
    }
    Ok(policy)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            objective: "grams".to_string(),
            direction: Direction::Minimize,
            tolerance: 0.1,
            constraints: preset::daily_intake(),
            foods: FoodOptions::default(),
            relaxation: preset_policy(),
        }
    }
}

impl Config {
    pub fn read(path: &Path) -> Result<Self, InputError> {
        let source = read_to_string(path)?;
        serde_json::from_str(&source).map_err(|source| InputError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Builds the model from this configuration and a food list. `fraction`
    /// scales every bound, e.g. 1/3 for a single meal.
    pub fn build_model(&self, foods: Vec<Variable>, fraction: Option<f64>) -> Result<Model, InputError> {
        let mut model = Model::new(self.objective.as_str(), self.direction).with_tolerance(self.tolerance);
        for c in &self.constraints {
            model.add_constraint(c.name.as_str(), c.bounds);
        }
        if let Some(f) = fraction {
            if !(f.is_finite() && f > 0.0) {
                return Err(InputError::InvalidFraction(f));
            }
            model = model.with_bounds_scaled(f);
        }

        let excluded: HashSet<&VariableId> = self.foods.exclude.iter().collect();
        let known: HashSet<VariableId> = foods.iter().map(|f| f.id.clone()).collect();
        for name in self.foods.exclude.iter().chain(self.foods.bounds.keys()) {
            if !known.contains(name) {
                log::warn!("food '{}' in the constraint file is not in the food table", name);
            }
        }

        for mut food in foods {
            if excluded.contains(&food.id) {
                log::debug!("excluding {}", food.id);
                continue;
            }
            if let Some(bounds) = self.foods.bounds.get(&food.id) {
                food.lower = bounds.min.unwrap_or(0.0);
                food.upper = bounds.max;
            }
            model.add_variable(food);
        }

        Ok(model)
    }
}

fn read_to_string(path: &Path) -> Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Reads a food table: a JSON array of rows, one food per row, with nutrient
/// columns given per 100 g
pub fn read_foods(path: &Path, name_column: &str) -> Result<Vec<Variable>, InputError> {
    let source = read_to_string(path)?;
    let table: Value = serde_json::from_str(&source).map_err(|source| InputError::Json {
        path: path.display().to_string(),
        source,
    })?;
    parse_foods(&table, name_column)
}

/// Converts table rows to variables with per-gram coefficients. Header names are
/// normalized; cells that are not numbers are skipped.
pub fn parse_foods(table: &Value, name_column: &str) -> Result<Vec<Variable>, InputError> {
    let rows = table.as_array().ok_or(InputError::NotATable)?;
    let mut foods = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let cells = row.as_object().ok_or(InputError::NotATable)?;
        let name = cells
            .iter()
            .find(|(header, _)| ConstraintId::new(header.as_str()).as_str() == name_column)
            .and_then(|(_, v)| v.as_str())
            .ok_or_else(|| InputError::MissingName(i, name_column.to_string()))?;

        let mut food = Variable::new(name);
        for (header, cell) in cells {
            let Some(per_100) = numeric(cell) else {
                continue;
            };
            let id = ConstraintId::new(header.as_str());
            if id.as_str() != name_column {
                food.set_coefficient(id, per_100 / 100.0);
            }
        }
        log::trace!("{} has {} numeric columns", food.id, food.coefficients.len());
        foods.push(food);
    }

    log::info!("read {} foods", foods.len());
    Ok(foods)
}

fn numeric(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
