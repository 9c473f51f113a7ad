//! The module responsible for writing output data to disk.
use crate::model::Model;
use crate::optimisation::variables::VariableKind;
use crate::solver::Solution;
use crate::summary::Summary;
use anyhow::{Context, Result, ensure};
use itertools::iproduct;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The default root folder in which model-specific output folders will be created
pub const DEFAULT_RESULTS_DIR: &str = "mes2_results";

/// The output file name for electric dispatch
const ELECTRIC_DISPATCH_FILE_NAME: &str = "electric_dispatch.csv";

/// The output file name for thermal dispatch
const THERMAL_DISPATCH_FILE_NAME: &str = "thermal_dispatch.csv";

/// The output file name for component sizes
const SYSTEM_SIZE_FILE_NAME: &str = "system_size.csv";

/// The output file name for costs
const COSTS_FILE_NAME: &str = "costs.csv";

/// The output file name for performance indicators
const INDICATORS_FILE_NAME: &str = "indicators.csv";

/// Cost variables written to the costs file, in order
const COST_KINDS: [VariableKind; 23] = [
    VariableKind::TotalInvestmentCost,
    VariableKind::ResInvestmentCost,
    VariableKind::BessInvestmentCost,
    VariableKind::GeneratorInvestmentCost,
    VariableKind::ScInvestmentCost,
    VariableKind::BoilerInvestmentCost,
    VariableKind::TankInvestmentCost,
    VariableKind::ResistanceInvestmentCost,
    VariableKind::FixedCosts,
    VariableKind::ResOmCost,
    VariableKind::BessOmCost,
    VariableKind::BessReplacementCost,
    VariableKind::GeneratorOmCost,
    VariableKind::ScOmCost,
    VariableKind::BoilerOmCost,
    VariableKind::TankOmCost,
    VariableKind::ResistanceOmCost,
    VariableKind::VariableCosts,
    VariableKind::LostLoadCostEe,
    VariableKind::DieselCost,
    VariableKind::LostLoadCostTh,
    VariableKind::NgCost,
    VariableKind::ScenarioNpc,
];

/// Capacity variables written to the system size file, in order
const SIZE_KINDS: [VariableKind; 10] = [
    VariableKind::ResUnits,
    VariableKind::BessCapacity,
    VariableKind::GeneratorCapacity,
    VariableKind::MaxBessChargePower,
    VariableKind::MaxBessDischargePower,
    VariableKind::ScUnits,
    VariableKind::BoilerCapacity,
    VariableKind::TankCapacity,
    VariableKind::ResistancePower,
    VariableKind::MaxTankDischargePower,
];

/// Get the output folder for the model specified at `model_dir`, below `results_dir`
pub fn get_output_dir(model_dir: &Path, results_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok(results_dir.join(model_name))
}

/// Create a new output directory for the model.
///
/// An existing non-empty directory is only reused if `allow_overwrite` is set. Returns whether
/// existing files may be overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder {} already exists and is not empty. Use --overwrite to replace its \
             contents.",
            output_dir.display()
        );
        warn!("Overwriting files in {}", output_dir.display());
        return Ok(true);
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Represents a row in the electric dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ElectricDispatchRow {
    scenario: u32,
    period: u32,
    demand: f64,
    res_production: f64,
    curtailment: f64,
    battery_inflow: f64,
    battery_outflow: f64,
    battery_state_of_charge: f64,
    generator_production: f64,
    diesel_consumption: f64,
    resistance_consumption: f64,
    lost_load: f64,
}

/// Represents a row in the thermal dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ThermalDispatchRow {
    scenario: u32,
    class: u32,
    period: u32,
    demand: f64,
    collector_production: f64,
    boiler_production: f64,
    ng_consumption: f64,
    resistance_production: f64,
    tank_inflow: f64,
    tank_outflow: f64,
    tank_state_of_charge: f64,
    curtailment: f64,
    lost_load: f64,
}

/// Represents a row in the system size CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SystemSizeRow {
    variable: String,
    class: Option<u32>,
    value: f64,
}

/// Represents a row in the costs CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CostRow {
    variable: String,
    scenario: Option<u32>,
    class: Option<u32>,
    value: f64,
}

/// Represents a row in the indicators CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct IndicatorRow {
    scenario: u32,
    weight: f64,
    net_present_cost: f64,
    lcoe: Option<f64>,
    res_fraction: f64,
    ee_lost_load_fraction: f64,
    th_lost_load_fraction: f64,
}

/// An object for writing the results of a solved model to file
pub struct DataWriter {
    electric_writer: csv::Writer<File>,
    thermal_writer: csv::Writer<File>,
    size_writer: csv::Writer<File>,
    costs_writer: csv::Writer<File>,
    indicators_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            electric_writer: new_writer(ELECTRIC_DISPATCH_FILE_NAME)?,
            thermal_writer: new_writer(THERMAL_DISPATCH_FILE_NAME)?,
            size_writer: new_writer(SYSTEM_SIZE_FILE_NAME)?,
            costs_writer: new_writer(COSTS_FILE_NAME)?,
            indicators_writer: new_writer(INDICATORS_FILE_NAME)?,
        })
    }

    /// Write every output file
    pub fn write_all(
        &mut self,
        model: &Model,
        solution: &Solution,
        summary: &Summary,
    ) -> Result<()> {
        self.write_electric_dispatch(model, solution)?;
        self.write_thermal_dispatch(model, solution)?;
        self.write_system_size(solution)?;
        self.write_costs(solution)?;
        self.write_indicators(summary)?;

        Ok(())
    }

    /// Write the electric flows of every scenario and period
    pub fn write_electric_dispatch(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        let sets = &model.sets;
        for (s, t) in iproduct!(sets.iter_scenarios(), sets.iter_periods()) {
            let flow = |kind| solution.period(kind, s, t);
            let row = ElectricDispatchRow {
                scenario: s,
                period: t,
                demand: model.electric_demand(s, t),
                res_production: flow(VariableKind::ResProduction),
                curtailment: flow(VariableKind::ElectricCurtailment),
                battery_inflow: flow(VariableKind::BessInflow),
                battery_outflow: flow(VariableKind::BessOutflow),
                battery_state_of_charge: flow(VariableKind::BessSoc),
                generator_production: flow(VariableKind::GeneratorProduction),
                diesel_consumption: flow(VariableKind::DieselConsumption),
                resistance_consumption: sets
                    .iter_classes()
                    .map(|c| solution.class_period(VariableKind::ResistanceConsumption, s, c, t))
                    .sum(),
                lost_load: flow(VariableKind::LostLoadEe),
            };
            self.electric_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the thermal flows of every scenario, class and period
    pub fn write_thermal_dispatch(&mut self, model: &Model, solution: &Solution) -> Result<()> {
        let sets = &model.sets;
        let indices = iproduct!(
            sets.iter_scenarios(),
            sets.iter_classes(),
            sets.iter_periods()
        );
        for (s, c, t) in indices {
            let flow = |kind| solution.class_period(kind, s, c, t);
            let row = ThermalDispatchRow {
                scenario: s,
                class: c,
                period: t,
                demand: model.thermal_demand(s, c, t),
                collector_production: flow(VariableKind::ScProduction),
                boiler_production: flow(VariableKind::BoilerProduction),
                ng_consumption: flow(VariableKind::NgConsumption),
                resistance_production: flow(VariableKind::ResistanceProduction),
                tank_inflow: flow(VariableKind::TankInflow),
                tank_outflow: flow(VariableKind::TankOutflow),
                tank_state_of_charge: flow(VariableKind::TankSoc),
                curtailment: flow(VariableKind::ThermalCurtailment),
                lost_load: flow(VariableKind::LostLoadTh),
            };
            self.thermal_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the capacity of every component
    pub fn write_system_size(&mut self, solution: &Solution) -> Result<()> {
        for kind in SIZE_KINDS {
            for (index, value) in solution.iter(kind) {
                self.size_writer.serialize(SystemSizeRow {
                    variable: kind.to_string(),
                    class: index.class(),
                    value,
                })?;
            }
        }

        Ok(())
    }

    /// Write every cost variable, followed by the objective
    pub fn write_costs(&mut self, solution: &Solution) -> Result<()> {
        for kind in COST_KINDS {
            for (index, value) in solution.iter(kind) {
                self.costs_writer.serialize(CostRow {
                    variable: kind.to_string(),
                    scenario: index.scenario(),
                    class: index.class(),
                    value,
                })?;
            }
        }
        self.costs_writer.serialize(CostRow {
            variable: "Objective".into(),
            scenario: None,
            class: None,
            value: solution.objective_value(),
        })?;

        Ok(())
    }

    /// Write the indicators of every scenario
    pub fn write_indicators(&mut self, summary: &Summary) -> Result<()> {
        for scenario in &summary.scenarios {
            self.indicators_writer.serialize(IndicatorRow {
                scenario: scenario.scenario,
                weight: scenario.weight,
                net_present_cost: scenario.net_present_cost.value(),
                lcoe: scenario.lcoe.map(|lcoe| lcoe.value()),
                res_fraction: scenario.res_fraction.value(),
                ee_lost_load_fraction: scenario.ee_lost_load_fraction.value(),
                th_lost_load_fraction: scenario.th_lost_load_fraction.value(),
            })?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.electric_writer.flush()?;
        self.thermal_writer.flush()?;
        self.size_writer.flush()?;
        self.costs_writer.flush()?;
        self.indicators_writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, solution};
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::rstest;
    use serde::de::DeserializeOwned;
    use tempfile::tempdir;

    fn read_rows<T: DeserializeOwned>(dir: &Path, file_name: &str) -> Vec<T> {
        csv::Reader::from_path(dir.join(file_name))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[rstest]
    fn test_write_electric_dispatch(model: Model, solution: Solution) {
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path()).unwrap();
            writer.write_electric_dispatch(&model, &solution).unwrap();
            writer.flush().unwrap();
        }

        let rows: Vec<ElectricDispatchRow> = read_rows(dir.path(), ELECTRIC_DISPATCH_FILE_NAME);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[1].scenario, rows[1].period), (1, 2));
        assert_eq!(rows[1].demand, 10.0);
        assert_approx_eq!(f64, rows[0].res_production, 4.0, epsilon = 1e-6);
        assert_approx_eq!(f64, rows[1].lost_load, 4.0, epsilon = 1e-6);
    }

    #[rstest]
    fn test_write_thermal_dispatch(model: Model, solution: Solution) {
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path()).unwrap();
            writer.write_thermal_dispatch(&model, &solution).unwrap();
            writer.flush().unwrap();
        }

        let rows: Vec<ThermalDispatchRow> = read_rows(dir.path(), THERMAL_DISPATCH_FILE_NAME);
        assert_eq!(
            rows.iter().map(|row| (row.scenario, row.class, row.period)).collect_vec(),
            [(1, 1, 1), (1, 1, 2)]
        );
    }

    #[rstest]
    fn test_write_system_size_and_costs(solution: Solution) {
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path()).unwrap();
            writer.write_system_size(&solution).unwrap();
            writer.write_costs(&solution).unwrap();
            writer.flush().unwrap();
        }

        let sizes: Vec<SystemSizeRow> = read_rows(dir.path(), SYSTEM_SIZE_FILE_NAME);
        assert_eq!(sizes.len(), 10);
        assert_eq!(sizes[0].variable, "RES_Units");
        assert_eq!(sizes[0].class, None);
        assert_approx_eq!(f64, sizes[0].value, 1.0, epsilon = 1e-6);
        assert_eq!(sizes[5].variable, "SC_Units");
        assert_eq!(sizes[5].class, Some(1));

        let costs: Vec<CostRow> = read_rows(dir.path(), COSTS_FILE_NAME);
        let objective = costs.last().unwrap();
        assert_eq!(objective.variable, "Objective");
        assert_approx_eq!(f64, objective.value, 200.0, epsilon = 1e-6);
        let npc = costs
            .iter()
            .find(|row| row.variable == "Scenario_Net_Present_Cost")
            .unwrap();
        assert_eq!(npc.scenario, Some(1));
        assert_approx_eq!(f64, npc.value, 200.0, epsilon = 1e-6);
    }

    #[rstest]
    fn test_write_indicators(model: Model, solution: Solution) {
        let summary = Summary::new(&model, &solution);
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path()).unwrap();
            writer.write_indicators(&summary).unwrap();
            writer.flush().unwrap();
        }

        let rows: Vec<IndicatorRow> = read_rows(dir.path(), INDICATORS_FILE_NAME);
        assert_eq!(rows.len(), 1);
        assert_approx_eq!(f64, rows[0].lcoe.unwrap(), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_create_output_directory_new() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results").join("model");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[rstest]
    #[case(false, false)]
    #[case(true, true)]
    fn test_create_output_directory_existing(#[case] allow_overwrite: bool, #[case] ok: bool) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(COSTS_FILE_NAME), "").unwrap();
        let result = create_output_directory(dir.path(), allow_overwrite);
        assert_eq!(result.is_ok(), ok);
        if ok {
            assert!(result.unwrap());
        }
    }

    #[test]
    fn test_get_output_dir() {
        let dir = tempdir().unwrap();
        let model_dir = dir.path().join("my_model");
        fs::create_dir(&model_dir).unwrap();
        assert_eq!(
            get_output_dir(&model_dir, Path::new(DEFAULT_RESULTS_DIR)).unwrap(),
            PathBuf::from(DEFAULT_RESULTS_DIR).join("my_model")
        );
        assert_eq!(
            get_output_dir(&model_dir, Path::new("/results")).unwrap(),
            Path::new("/results/my_model")
        );
    }
}
