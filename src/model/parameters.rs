//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::error::ConfigError;
use crate::input::overrides::ParameterOverrides;
use crate::input::{input_err_msg, read_toml_table};
use crate::sets::IndexSets;
use crate::solver::SolverOptions;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// The name of the file holding the scalar and vector parameters of a model
pub const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_periods_per_hour, f64, 1.0);
define_param_default!(default_capacity_max, f64, f64::INFINITY);
define_param_default!(default_electric_demand_file, String, "electric_demand.csv".into());
define_param_default!(default_thermal_demand_file, String, "thermal_demand.csv".into());
define_param_default!(default_res_yield_file, String, "res_yield.csv".into());
define_param_default!(default_collector_yield_file, String, "collector_yield.csv".into());

/// Represents the contents of the entire model file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelParameters {
    /// Sizes of the index sets
    pub sets: SetSizes,
    /// Project-wide parameters
    pub project: ProjectParameters,
    /// Names of the time-series files
    #[serde(default)]
    pub inputs: InputFiles,
    /// Renewable generator (e.g. photovoltaic array)
    pub res: ResParameters,
    /// Solar thermal collector
    pub solar_collector: CollectorParameters,
    /// Battery energy storage system
    pub battery: BatteryParameters,
    /// Thermal storage tank
    pub tank: TankParameters,
    /// Diesel generator
    pub generator: FuelConverterParameters,
    /// Natural gas boiler
    pub boiler: FuelConverterParameters,
    /// Electric resistance heater
    pub resistance: ResistanceParameters,
    /// Lost load tolerances and costs
    pub reliability: ReliabilityParameters,
    /// Bounds on the capacity decision variables
    #[serde(default)]
    pub capacity_limits: CapacityLimits,
    /// Options passed to the solver
    #[serde(default)]
    pub solver: SolverParameters,
}

/// Sizes of the index sets.
///
/// These are read as floats so that non-integral sizes can be reported as configuration errors.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SetSizes {
    /// Number of scenarios
    pub scenarios: f64,
    /// Number of periods in the representative year
    pub periods: f64,
    /// Number of project years
    pub years: f64,
    /// Number of thermal user classes
    pub classes: f64,
}

/// Project-wide parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectParameters {
    /// Discount rate applied to future costs
    pub discount_rate: f64,
    /// Number of periods per hour, used to convert between energy and power
    #[serde(default = "default_periods_per_hour")]
    pub periods_per_hour: f64,
    /// Probability of each scenario (defaults to equal weights)
    pub scenario_weights: Option<Vec<f64>>,
    /// Calendar offset of each project year used for discounting (defaults to `1..=years`)
    pub project_years: Option<Vec<u32>>,
}

/// Names of the time-series files, relative to the model directory
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InputFiles {
    /// Electric demand per period and scenario
    #[serde(default = "default_electric_demand_file")]
    pub electric_demand: String,
    /// Thermal demand per period, scenario and class
    #[serde(default = "default_thermal_demand_file")]
    pub thermal_demand: String,
    /// Yield of one renewable unit per period and scenario
    #[serde(default = "default_res_yield_file")]
    pub res_yield: String,
    /// Yield of one collector unit per period, scenario and class
    #[serde(default = "default_collector_yield_file")]
    pub collector_yield: String,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            electric_demand: default_electric_demand_file(),
            thermal_demand: default_thermal_demand_file(),
            res_yield: default_res_yield_file(),
            collector_yield: default_collector_yield_file(),
        }
    }
}

/// Renewable generator parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResParameters {
    /// Capacity of a single unit
    pub nominal_capacity: f64,
    /// Efficiency of the inverter
    pub inverter_efficiency: f64,
    /// Investment cost per unit of capacity
    pub investment_cost: f64,
    /// Annual O&M cost as a fraction of the investment cost
    pub om_fraction: f64,
}

/// Solar collector parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CollectorParameters {
    /// Capacity of a single unit
    pub nominal_capacity: f64,
    /// Investment cost per unit of capacity
    pub investment_cost: f64,
    /// Annual O&M cost as a fraction of the investment cost
    pub om_fraction: f64,
}

/// Battery parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatteryParameters {
    /// Charging efficiency
    pub charge_efficiency: f64,
    /// Discharging efficiency
    pub discharge_efficiency: f64,
    /// Fraction of capacity which must always remain stored
    pub depth_of_discharge: f64,
    /// Hours needed to charge fully at maximum power
    pub max_charge_time: f64,
    /// Hours needed to discharge fully at maximum power
    pub max_discharge_time: f64,
    /// Years after which the battery is replaced
    pub replacement_time: f64,
    /// Investment cost per unit of energy capacity
    pub investment_cost: f64,
    /// Annual O&M cost as a fraction of the investment cost
    pub om_fraction: f64,
}

/// Thermal tank parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TankParameters {
    /// Fraction of stored energy retained from one period to the next
    pub self_discharge_efficiency: f64,
    /// Fraction of capacity which must always remain stored
    pub depth_of_discharge: f64,
    /// Hours needed to discharge fully at maximum power
    pub max_discharge_time: f64,
    /// Investment cost per unit of energy capacity
    pub investment_cost: f64,
    /// Annual O&M cost as a fraction of the investment cost
    pub om_fraction: f64,
}

/// Parameters of a fuel-burning converter (diesel generator or boiler)
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FuelConverterParameters {
    /// Conversion efficiency
    pub efficiency: f64,
    /// Lower heating value of the fuel (energy per unit of fuel)
    pub lower_heating_value: f64,
    /// Cost per unit of fuel
    pub fuel_cost: f64,
    /// Investment cost per unit of capacity
    pub investment_cost: f64,
    /// Annual O&M cost as a fraction of the investment cost
    pub om_fraction: f64,
}

/// Electric resistance parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResistanceParameters {
    /// Conversion efficiency from electricity to heat
    pub efficiency: f64,
    /// Investment cost per unit of power
    pub investment_cost: f64,
    /// Annual O&M cost as a fraction of the investment cost
    pub om_fraction: f64,
}

/// A parameter which either takes the same value for every class or one value per class
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PerClass {
    /// The same value for every class
    Uniform(f64),
    /// One value per class
    Values(Vec<f64>),
}

impl PerClass {
    /// Get the value for the given (1-based) class
    pub fn get(&self, class: u32) -> f64 {
        match self {
            Self::Uniform(value) => *value,
            Self::Values(values) => values[class as usize - 1],
        }
    }

    /// Iterate over the values which have been supplied
    fn iter_values(&self) -> impl Iterator<Item = f64> + '_ {
        match self {
            Self::Uniform(value) => std::slice::from_ref(value).iter().copied(),
            Self::Values(values) => values.iter().copied(),
        }
    }
}

/// Lost load tolerances and costs
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReliabilityParameters {
    /// Maximum fraction of annual electric demand which may go unserved
    pub ee_lost_load_tolerance: f64,
    /// Cost of unserved electric energy
    pub ee_value_of_lost_load: f64,
    /// Maximum fraction of annual thermal demand which may go unserved, per class
    pub th_lost_load_tolerance: PerClass,
    /// Cost of unserved thermal energy
    pub th_value_of_lost_load: f64,
}

/// Lower and upper bounds on a capacity
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Bounds {
    /// Lower bound
    #[serde(default)]
    pub min: f64,
    /// Upper bound
    #[serde(default = "default_capacity_max")]
    pub max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: f64::INFINITY,
        }
    }
}

/// Bounds on the capacity decision variables.
///
/// Fixing both bounds to the size of an existing installation models a brownfield system. Thermal
/// bounds apply to every class.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct CapacityLimits {
    /// Number of renewable units
    pub res: Bounds,
    /// Battery energy capacity
    pub battery: Bounds,
    /// Generator power
    pub generator: Bounds,
    /// Number of collector units per class
    pub solar_collector: Bounds,
    /// Boiler power per class
    pub boiler: Bounds,
    /// Tank energy capacity per class
    pub tank: Bounds,
    /// Resistance power per class
    pub resistance: Bounds,
}

impl CapacityLimits {
    /// Iterate over the bounds for each component
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Bounds)> {
        [
            ("res", self.res),
            ("battery", self.battery),
            ("generator", self.generator),
            ("solar_collector", self.solar_collector),
            ("boiler", self.boiler),
            ("tank", self.tank),
            ("resistance", self.resistance),
        ]
        .into_iter()
    }
}

/// Solver configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SolverParameters {
    /// Solver options as name/value pairs
    #[serde(default)]
    pub options: IndexMap<String, toml::Value>,
}

/// Check that a parameter lies in the given range
fn check_range(
    name: &str,
    value: f64,
    is_valid: impl Fn(f64) -> bool,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if value.is_finite() && is_valid(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value,
            expected,
        })
    }
}

/// Check that an efficiency lies in (0, 1]
fn check_efficiency(name: &str, value: f64) -> Result<(), ConfigError> {
    check_range(name, value, |v| v > 0.0 && v <= 1.0, "in the range (0, 1]")
}

/// Check that a fraction lies in [0, 1]
fn check_fraction(name: &str, value: f64) -> Result<(), ConfigError> {
    check_range(name, value, |v| (0.0..=1.0).contains(&v), "in the range [0, 1]")
}

/// Check that a depth of discharge lies in [0, 1)
fn check_depth_of_discharge(name: &str, value: f64) -> Result<(), ConfigError> {
    check_range(name, value, |v| (0.0..1.0).contains(&v), "in the range [0, 1)")
}

/// Check that a parameter is strictly positive
fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    check_range(name, value, |v| v > 0.0, "a finite number greater than zero")
}

/// Check that a parameter is not negative
fn check_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    check_range(name, value, |v| v >= 0.0, "a finite, non-negative number")
}

/// Check that a vector parameter has one entry per element of an index set
fn check_length(name: &'static str, expected: u32, found: usize) -> Result<(), ConfigError> {
    if found == expected as usize {
        Ok(())
    } else {
        Err(ConfigError::LengthMismatch {
            name,
            expected: expected as usize,
            found,
        })
    }
}

/// Check that capacity bounds satisfy `0 <= min <= max`
fn check_bounds(component: &'static str, bounds: Bounds) -> Result<(), ConfigError> {
    let Bounds { min, max } = bounds;
    if min.is_finite() && min >= 0.0 && !max.is_nan() && min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidCapacityLimits {
            component,
            min,
            max,
        })
    }
}

/// Read the model file as a TOML table and apply the overrides to it
fn read_overridden_table(file_path: &Path, overrides: &ParameterOverrides) -> Result<toml::Table> {
    let mut table = read_toml_table(file_path)?;
    overrides
        .apply(&mut table)
        .with_context(|| input_err_msg(file_path))?;

    Ok(table)
}

impl ModelParameters {
    /// Read a model file from the specified directory, applying any parameter overrides first.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    /// * `overrides` - Parameter values to replace those in the file
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(
        model_dir: P,
        overrides: &ParameterOverrides,
    ) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let table = read_overridden_table(&file_path, overrides)?;

        let model_params: ModelParameters = toml::Value::Table(table)
            .try_into()
            .with_context(|| input_err_msg(&file_path))?;
        model_params
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(model_params)
    }

    /// Check that every override names a parameter of the model file in `model_dir`.
    ///
    /// Only the names are checked; the values are validated when the model is loaded.
    pub fn check_overrides<P: AsRef<Path>>(
        model_dir: P,
        overrides: &ParameterOverrides,
    ) -> Result<()> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        read_overridden_table(&file_path, overrides)?;
        Ok(())
    }

    /// The index sets declared by the model.
    ///
    /// Fails if any set size is not a positive integer.
    pub fn index_sets(&self) -> Result<IndexSets, ConfigError> {
        let SetSizes {
            scenarios,
            periods,
            years,
            classes,
        } = self.sets;
        IndexSets::new(scenarios, periods, years, classes)
    }

    /// The weight of each scenario, in order
    pub fn scenario_weights(&self, sets: &IndexSets) -> Vec<f64> {
        self.project
            .scenario_weights
            .clone()
            .unwrap_or_else(|| vec![1.0 / f64::from(sets.scenarios); sets.scenarios as usize])
    }

    /// The calendar offset of each project year, in order
    pub fn project_years(&self, sets: &IndexSets) -> Vec<u32> {
        self.project
            .project_years
            .clone()
            .unwrap_or_else(|| sets.iter_years().collect())
    }

    /// Validate parameters after reading in file
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sets = self.index_sets()?;

        // project
        let project = &self.project;
        check_range(
            "project.discount_rate",
            project.discount_rate,
            |v| v > -1.0,
            "a finite number greater than -1",
        )?;
        check_positive("project.periods_per_hour", project.periods_per_hour)?;
        if let Some(weights) = &project.scenario_weights {
            check_length("project.scenario_weights", sets.scenarios, weights.len())?;
            for weight in weights {
                check_non_negative("project.scenario_weights", *weight)?;
            }
        }
        if let Some(years) = &project.project_years {
            check_length("project.project_years", sets.years, years.len())?;
        }

        // res
        check_positive("res.nominal_capacity", self.res.nominal_capacity)?;
        check_efficiency("res.inverter_efficiency", self.res.inverter_efficiency)?;
        check_non_negative("res.investment_cost", self.res.investment_cost)?;
        check_fraction("res.om_fraction", self.res.om_fraction)?;

        // solar_collector
        let collector = &self.solar_collector;
        check_positive("solar_collector.nominal_capacity", collector.nominal_capacity)?;
        check_non_negative("solar_collector.investment_cost", collector.investment_cost)?;
        check_fraction("solar_collector.om_fraction", collector.om_fraction)?;

        // battery
        let battery = &self.battery;
        check_efficiency("battery.charge_efficiency", battery.charge_efficiency)?;
        check_efficiency("battery.discharge_efficiency", battery.discharge_efficiency)?;
        check_depth_of_discharge("battery.depth_of_discharge", battery.depth_of_discharge)?;
        check_positive("battery.max_charge_time", battery.max_charge_time)?;
        check_positive("battery.max_discharge_time", battery.max_discharge_time)?;
        check_non_negative("battery.replacement_time", battery.replacement_time)?;
        check_non_negative("battery.investment_cost", battery.investment_cost)?;
        check_fraction("battery.om_fraction", battery.om_fraction)?;

        // tank
        let tank = &self.tank;
        check_efficiency(
            "tank.self_discharge_efficiency",
            tank.self_discharge_efficiency,
        )?;
        check_depth_of_discharge("tank.depth_of_discharge", tank.depth_of_discharge)?;
        check_positive("tank.max_discharge_time", tank.max_discharge_time)?;
        check_non_negative("tank.investment_cost", tank.investment_cost)?;
        check_fraction("tank.om_fraction", tank.om_fraction)?;

        // generator and boiler
        for (name, converter) in [("generator", &self.generator), ("boiler", &self.boiler)] {
            check_efficiency(&format!("{name}.efficiency"), converter.efficiency)?;
            check_positive(
                &format!("{name}.lower_heating_value"),
                converter.lower_heating_value,
            )?;
            check_non_negative(&format!("{name}.fuel_cost"), converter.fuel_cost)?;
            check_non_negative(&format!("{name}.investment_cost"), converter.investment_cost)?;
            check_fraction(&format!("{name}.om_fraction"), converter.om_fraction)?;
        }

        // resistance
        check_efficiency("resistance.efficiency", self.resistance.efficiency)?;
        check_non_negative("resistance.investment_cost", self.resistance.investment_cost)?;
        check_fraction("resistance.om_fraction", self.resistance.om_fraction)?;

        // reliability
        let reliability = &self.reliability;
        check_fraction(
            "reliability.ee_lost_load_tolerance",
            reliability.ee_lost_load_tolerance,
        )?;
        check_non_negative(
            "reliability.ee_value_of_lost_load",
            reliability.ee_value_of_lost_load,
        )?;
        if let PerClass::Values(values) = &reliability.th_lost_load_tolerance {
            check_length(
                "reliability.th_lost_load_tolerance",
                sets.classes,
                values.len(),
            )?;
        }
        for value in reliability.th_lost_load_tolerance.iter_values() {
            check_fraction("reliability.th_lost_load_tolerance", value)?;
        }
        check_non_negative(
            "reliability.th_value_of_lost_load",
            reliability.th_value_of_lost_load,
        )?;

        // capacity_limits
        for (component, bounds) in self.capacity_limits.iter() {
            check_bounds(component, bounds)?;
        }

        // solver
        SolverOptions::from_config(&self.solver.options)?;

        Ok(())
    }
}
