//! Sweeps of a single model parameter.
//!
//! Every value in a sweep is an independent run: the model is read from disk again with the
//! parameter overridden, then assembled and solved from scratch. A run which fails, either
//! because the value is invalid or because the problem cannot be solved, is recorded and the
//! sweep carries on.
use crate::input::overrides::ParameterOverrides;
use crate::model::Model;
use crate::model::parameters::ModelParameters;
use crate::simulation::solve;
use crate::solver::{ModelError, SolveStatus};
use crate::summary::Summary;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The output file name for sensitivity results
const SENSITIVITY_FILE_NAME: &str = "sensitivity.csv";

/// Status recorded for values which do not give a valid model
const INVALID_STATUS: &str = "Invalid";

/// One run of a sensitivity sweep
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SensitivityRow {
    /// The value of the parameter, as given by the user
    pub value: String,
    /// Outcome of the run
    pub status: String,
    /// Total investment cost
    pub investment_cost: Option<f64>,
    /// Weighted net present cost (the objective)
    pub net_present_cost: Option<f64>,
    /// Discounted O&M and replacement costs
    pub fixed_costs: Option<f64>,
    /// Weighted variable costs
    pub variable_costs: Option<f64>,
    /// Weighted levelised cost of energy
    pub lcoe: Option<f64>,
    /// Installed renewable capacity
    pub res_capacity: Option<f64>,
    /// Battery capacity
    pub battery_capacity: Option<f64>,
    /// Generator capacity
    pub generator_capacity: Option<f64>,
}

impl SensitivityRow {
    /// A row for a run which produced results
    fn new(value: &str, status: SolveStatus, summary: &Summary) -> Self {
        Self {
            value: value.to_string(),
            status: status.to_string(),
            investment_cost: Some(summary.investment_cost.value()),
            net_present_cost: Some(summary.objective.value()),
            fixed_costs: Some(summary.fixed_costs.value()),
            variable_costs: Some(summary.weighted_variable_costs().value()),
            lcoe: summary.weighted_lcoe().map(|lcoe| lcoe.value()),
            res_capacity: Some(summary.res_capacity().value()),
            battery_capacity: Some(summary.electric.battery_capacity.value()),
            generator_capacity: Some(summary.electric.generator_capacity.value()),
        }
    }

    /// Whether the run was solved to optimality
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal.to_string()
    }

    /// A row for a run which failed
    fn failed(value: &str, status: &str) -> Self {
        Self {
            value: value.to_string(),
            status: status.to_string(),
            investment_cost: None,
            net_present_cost: None,
            fixed_costs: None,
            variable_costs: None,
            lcoe: None,
            res_capacity: None,
            battery_capacity: None,
            generator_capacity: None,
        }
    }
}

/// Run the model once with the given overrides
fn run_once(model_dir: &Path, overrides: &ParameterOverrides, value: &str) -> SensitivityRow {
    let model = match Model::from_path(model_dir, overrides) {
        Ok(model) => model,
        Err(err) => {
            warn!("Skipping value {value}: {err:#}");
            return SensitivityRow::failed(value, INVALID_STATUS);
        }
    };

    match solve(&model) {
        Ok(solution) => {
            let status = if solution.is_degraded() {
                SolveStatus::Numerical
            } else {
                SolveStatus::Optimal
            };
            SensitivityRow::new(value, status, &Summary::new(&model, &solution))
        }
        Err(err) => {
            warn!("Run with value {value} failed: {err:#}");
            let status = match err.downcast_ref::<ModelError>() {
                Some(ModelError::Infeasible) => SolveStatus::Infeasible,
                Some(ModelError::Unbounded) => SolveStatus::Unbounded,
                _ => SolveStatus::Error,
            };
            SensitivityRow::failed(value, &status.to_string())
        }
    }
}

/// Run the model once for each value of a parameter and write a row per run to `output_path`.
///
/// The parameter name and the other overrides are checked against the model file before any run,
/// so a misspelt name is an error rather than a sweep of invalid runs.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `overrides` - Overrides applied to every run
/// * `parameter` - Dotted name of the parameter to vary
/// * `values` - The values to give the parameter
/// * `output_path` - The folder to which the results will be written
pub fn run_sensitivity(
    model_dir: &Path,
    overrides: &ParameterOverrides,
    parameter: &str,
    values: &[String],
    output_path: &Path,
) -> Result<Vec<SensitivityRow>> {
    let runs: Vec<_> = values
        .iter()
        .map(|value| -> Result<_> {
            let mut overrides = overrides.clone();
            overrides.insert_raw(&format!("{parameter}={value}"))?;
            Ok((value, overrides))
        })
        .collect::<Result<_>>()?;
    if let Some((_, overrides)) = runs.first() {
        ModelParameters::check_overrides(model_dir, overrides)
            .with_context(|| format!("Cannot vary parameter '{parameter}'"))?;
    }

    let mut writer = csv::Writer::from_path(output_path.join(SENSITIVITY_FILE_NAME))?;
    let mut rows = Vec::with_capacity(runs.len());
    for (value, overrides) in runs {
        info!("Running with {parameter} = {value}");
        let row = run_once(model_dir, &overrides, value);
        writer.serialize(&row)?;
        rows.push(row);
    }
    writer.flush()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::fixture::write_model_dir;
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use tempfile::tempdir;

    fn values(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_run_sensitivity() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path());
        let output_dir = tempdir().unwrap();

        let rows = run_sensitivity(
            model_dir.path(),
            &ParameterOverrides::default(),
            "reliability.ee_value_of_lost_load",
            &values(&["10", "20"]),
            output_dir.path(),
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.status == "Optimal"));

        // Lost load is the only way to meet the deficit, so its cost scales with its value
        assert_approx_eq!(f64, rows[0].net_present_cost.unwrap(), 200.0, epsilon = 1e-6);
        assert_approx_eq!(f64, rows[1].net_present_cost.unwrap(), 400.0, epsilon = 1e-6);

        let written: Vec<SensitivityRow> =
            csv::Reader::from_path(output_dir.path().join(SENSITIVITY_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        assert_eq!(written, rows);
    }

    #[test]
    fn test_run_sensitivity_failures() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path());
        let output_dir = tempdir().unwrap();

        let rows = run_sensitivity(
            model_dir.path(),
            &ParameterOverrides::default(),
            "reliability.ee_lost_load_tolerance",
            &values(&["1.5", "0", "1"]),
            output_dir.path(),
        )
        .unwrap();
        assert_eq!(rows[0].status, INVALID_STATUS);
        assert!(matches!(rows[1].status.as_str(), "Infeasible" | "Unbounded"));
        assert_eq!(rows[2].status, "Optimal");
        assert_eq!(rows[0].lcoe, None);
        assert!(rows[2].lcoe.is_some());
        assert_eq!(
            rows.iter().map(SensitivityRow::is_optimal).collect_vec(),
            [false, false, true]
        );
    }

    #[test]
    fn test_run_sensitivity_unknown_parameter() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path());
        let output_dir = tempdir().unwrap();

        let err = run_sensitivity(
            model_dir.path(),
            &ParameterOverrides::default(),
            "batery.investment_cost",
            &values(&["100", "200"]),
            output_dir.path(),
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnknownParameter(
                "batery.investment_cost".into()
            ))
        );

        // No runs were made
        assert!(!output_dir.path().join(SENSITIVITY_FILE_NAME).exists());
    }

    #[test]
    fn test_run_sensitivity_bad_parameter() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path());
        let output_dir = tempdir().unwrap();

        assert!(
            run_sensitivity(
                model_dir.path(),
                &ParameterOverrides::default(),
                "",
                &values(&["1"]),
                output_dir.path(),
            )
            .is_err()
        );
    }
}
