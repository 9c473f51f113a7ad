//! Fixtures for tests
use crate::model::Model;
use crate::model::parameters::ModelParameters;
use crate::optimisation::build_model_spec;
use crate::solver::{HighsSolver, Solution, SolverAdapter, SolverOptions};
use crate::time_series::{TimeSeries, TimeSeriesTable};
use rstest::fixture;
use std::fs;
use std::path::Path;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A small model: one scenario of two periods, one renewable unit and no storage or generation
pub const MODEL_TOML: &str = include_str!("../tests/data/small_model.toml");

#[fixture]
pub fn model_parameters() -> ModelParameters {
    toml::from_str(MODEL_TOML).unwrap()
}

#[fixture]
pub fn time_series() -> TimeSeries {
    let table = |values: &[f64]| {
        TimeSeriesTable::from_rows(values.iter().map(|&value| vec![value]).collect())
    };

    TimeSeries {
        electric_demand: table(&[10.0, 10.0]),
        thermal_demand: table(&[0.0, 0.0]),
        res_yield: table(&[4.0, 6.0]),
        collector_yield: table(&[0.0, 0.0]),
        classes: 1,
    }
}

#[fixture]
pub fn model(model_parameters: ModelParameters, time_series: TimeSeries) -> Model {
    Model::new(model_parameters, &time_series).unwrap()
}

/// The fixture model solved with HiGHS
#[fixture]
pub fn solution(model: Model) -> Solution {
    let spec = build_model_spec(&model);
    HighsSolver
        .solve(&spec, &SolverOptions::default())
        .into_solution(&spec)
        .unwrap()
}

/// Write the fixture model and its time series to `dir`
pub fn write_model_dir(dir: &Path) {
    fs::write(dir.join("model.toml"), MODEL_TOML).unwrap();
    for (file_name, values) in [
        ("electric_demand.csv", [10.0, 10.0]),
        ("thermal_demand.csv", [0.0, 0.0]),
        ("res_yield.csv", [4.0, 6.0]),
        ("collector_yield.csv", [0.0, 0.0]),
    ] {
        let contents = format!("period;s1\n1;{}\n2;{}\n", values[0], values[1]);
        fs::write(dir.join(file_name), contents).unwrap();
    }
}
