mod input;
mod preset;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use env_logger::Builder;
use nutriform_solver::{
    ConstraintReport, Model, RelaxationController, SolutionStatus, SolveResult, Solver, Stage, DEFAULT_EPSILON,
};
use serde::Serialize;

use crate::input::{Config, InputError};

#[derive(Parser)]
#[command(name = "nutriform")]
#[command(about = "Find the smallest diet that meets nutrient targets", long_about = None)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a food table against a constraint set
    Solve {
        /// JSON food table, nutrient values per 100 g
        foods: PathBuf,
        /// JSON constraint file (defaults to the built-in daily intake targets)
        #[arg(short, long)]
        constraints: Option<PathBuf>,
        /// Column holding each food's name
        #[arg(long, default_value = "Food Name")]
        name_column: String,
        /// Scale every bound, e.g. 0.333 for one meal
        #[arg(long)]
        fraction: Option<f64>,
        /// Report infeasibility instead of relaxing bounds
        #[arg(long)]
        no_relax: bool,
        /// Constraints kept by the minimal relaxation stage (repeatable)
        #[arg(long)]
        essential: Vec<String>,
        /// Absolute margin when checking bounds
        #[arg(long, default_value_t = DEFAULT_EPSILON)]
        epsilon: f64,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Check a food table and constraint set for errors
    Check {
        foods: PathBuf,
        #[arg(short, long)]
        constraints: Option<PathBuf>,
        #[arg(long, default_value = "Food Name")]
        name_column: String,
    },
    /// Print the built-in constraint set as a constraint file
    Preset,
}

#[derive(Serialize)]
struct Output<'a> {
    result: &'a SolveResult,
    report: &'a ConstraintReport,
}

fn load(
    foods: &Path,
    constraints: Option<&Path>,
    name_column: &str,
    fraction: Option<f64>,
) -> Result<(Config, Model), InputError> {
    let config = match constraints {
        Some(path) => Config::read(path)?,
        None => Config::default(),
    };
    let foods = input::read_foods(foods, name_column)?;
    let model = config.build_model(foods, fraction)?;
    Ok((config, model))
}

fn main() {
    let cli = Cli::parse();
    Builder::new().filter_level(cli.verbose.log_level_filter()).init();

    match cli.command {
        Commands::Solve {
            foods,
            constraints,
            name_column,
            fraction,
            no_relax,
            essential,
            epsilon,
            format,
        } => {
            let (config, model) = match load(&foods, constraints.as_deref(), &name_column, fraction) {
                Ok(loaded) => loaded,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let solved = if no_relax {
                Solver::new().solve(&model)
            } else {
                let mut policy = config.relaxation.clone();
                if !essential.is_empty() {
                    policy = policy.with_essential(essential);
                }
                RelaxationController::new(policy).solve(&model)
            };
            let solution = match solved {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Model error: {}", e);
                    std::process::exit(1);
                }
            };

            // Judge against the caller's bounds so relaxed results show what was given up
            let report = ConstraintReport::evaluate(&model, &solution, epsilon);

            if format == "json" {
                let output = Output {
                    result: &solution,
                    report: &report,
                };
                match serde_json::to_string_pretty(&output) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error writing JSON: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                print_solution(&model, &solution, &report);
            }

            if !solution.feasible || !solution.bounded {
                std::process::exit(1);
            }
        }
        Commands::Check {
            foods,
            constraints,
            name_column,
        } => {
            let model = match load(&foods, constraints.as_deref(), &name_column, None) {
                Ok((_, model)) => model,
                Err(e) => {
                    eprintln!("✗ {}", e);
                    std::process::exit(1);
                }
            };

            let findings = model.validate();
            let fatal = findings.iter().filter(|f| f.is_fatal()).count();
            if fatal == 0 {
                println!("✓ {} is valid", foods.display());
            } else {
                println!("✗ {} has errors:", foods.display());
            }
            println!("  {} foods", model.num_variables());
            println!("  {} constraints", model.num_constraints());
            for finding in &findings {
                let marker = if finding.is_fatal() { "error" } else { "warning" };
                println!("  {}: {}", marker, finding);
            }
            if fatal > 0 {
                std::process::exit(1);
            }
        }
        Commands::Preset => match serde_json::to_string_pretty(&Config::default()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error writing JSON: {}", e);
                std::process::exit(1);
            }
        },
    }
}

fn print_solution(model: &Model, solution: &SolveResult, report: &ConstraintReport) {
    match solution.stage {
        Stage::Original => println!("Stage: ORIGINAL"),
        Stage::Relaxed => println!("Stage: RELAXED (bounds widened)"),
        Stage::Minimal => println!("Stage: MINIMAL (essential constraints only)"),
        Stage::Failed => println!("Stage: FAILED"),
    }

    match solution.status {
        SolutionStatus::Optimal => {
            println!("Status: OPTIMAL");
            println!("Total {}: {:.2}", model.objective, solution.objective_value);
            println!();
            println!("Foods:");
            for (name, amount) in solution.selected() {
                if amount > 0.001 {
                    println!("  {:40} {:10.2}", name.as_str(), amount);
                }
            }
            println!();
            println!("Constraints:");
            for status in &report.statuses {
                let mark = if status.satisfied { "✓" } else { "✗" };
                let min = status.min.map_or("-".to_string(), |v| format!("{:.2}", v));
                let max = status.max.map_or("-".to_string(), |v| format!("{:.2}", v));
                println!(
                    "  {} {:40} {:10.2}  [{}, {}]",
                    mark,
                    status.constraint.as_str(),
                    status.actual,
                    min,
                    max
                );
            }
            for violation in &report.violations {
                println!("    {}", violation.description);
            }
        }
        SolutionStatus::Infeasible => {
            println!("Status: INFEASIBLE");
            if solution.stage == Stage::Failed {
                println!("No solution exists under any tested relaxation stage.");
            } else {
                println!("No solution satisfies all constraints.");
            }
        }
        SolutionStatus::Unbounded => {
            println!("Status: UNBOUNDED");
            println!("The problem has no finite optimal solution; check the food bounds.");
        }
        SolutionStatus::CycleLimitExceeded => {
            println!("Status: ITERATION LIMIT");
            println!("The solver stopped before finishing; the problem may be degenerate.");
        }
    }
}
