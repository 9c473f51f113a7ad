//! Functionality for solving a model and writing its results.
use crate::model::Model;
use crate::optimisation::build_model_spec;
use crate::output::DataWriter;
use crate::solver::{HighsSolver, Solution, SolverAdapter, SolverOptions};
use crate::summary::Summary;
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// Assemble the model and solve it with the given solver.
///
/// Infeasible and unbounded problems are reported as a [`crate::solver::ModelError`].
pub fn solve_with<S: SolverAdapter + ?Sized>(model: &Model, solver: &S) -> Result<Solution> {
    let options = SolverOptions::from_config(&model.parameters.solver.options)?;
    let spec = build_model_spec(model);
    let result = solver.solve(&spec, &options);
    info!("Solver finished with status: {}", result.status);

    let solution = result.into_solution(&spec)?;
    if solution.is_degraded() {
        warn!("Results are based on a solution which may not be optimal");
    }
    info!("Objective value: {}", solution.objective_value());

    Ok(solution)
}

/// Assemble and solve the model with HiGHS
pub fn solve(model: &Model) -> Result<Solution> {
    solve_with(model, &HighsSolver)
}

/// Solve the model and write its results to `output_path`.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
pub fn run(model: &Model, output_path: &Path) -> Result<Summary> {
    let solution = solve(model)?;
    let summary = Summary::new(model, &solution);
    if let Some(lcoe) = summary.weighted_lcoe() {
        info!("Levelised cost of energy: {lcoe}");
    }

    let mut writer = DataWriter::create(output_path)
        .with_context(|| format!("Could not create output files in {}", output_path.display()))?;
    writer.write_all(model, &solution, &summary)?;
    writer.flush()?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::optimisation::ModelSpec;
    use crate::solver::{ModelError, SolveResult, SolveStatus};
    use rstest::rstest;
    use tempfile::tempdir;

    /// A solver which always reports the same status
    struct FixedStatusSolver(SolveStatus);

    impl SolverAdapter for FixedStatusSolver {
        fn solve(&self, spec: &ModelSpec, _options: &SolverOptions) -> SolveResult {
            SolveResult {
                status: self.0,
                values: vec![0.0; spec.num_variables()],
                objective: 0.0,
                message: self.0.to_string(),
            }
        }
    }

    #[rstest]
    fn test_solve_with_infeasible(model: Model) {
        let err = solve_with(&model, &FixedStatusSolver(SolveStatus::Infeasible)).unwrap_err();
        assert_eq!(err.downcast_ref::<ModelError>(), Some(&ModelError::Infeasible));
    }

    #[rstest]
    fn test_solve_with_degraded(model: Model) {
        let solution = solve_with(&model, &FixedStatusSolver(SolveStatus::Numerical)).unwrap();
        assert!(solution.is_degraded());
    }

    #[rstest]
    fn test_run(model: Model) {
        let dir = tempdir().unwrap();
        let summary = run(&model, dir.path()).unwrap();
        assert_eq!(summary.scenarios.len(), 1);
        for file_name in [
            "electric_dispatch.csv",
            "thermal_dispatch.csv",
            "system_size.csv",
            "costs.csv",
            "indicators.csv",
        ] {
            assert!(dir.path().join(file_name).is_file());
        }
    }
}
