//! The parameter store: a model's scalar parameters, index sets and time series.
use crate::finance::{discount_factor, present_value_factor};
use crate::input::overrides::ParameterOverrides;
use crate::input::time_series::read_time_series;
use crate::sets::IndexSets;
use crate::time_series::{Series, SeriesLookup};
use crate::units::Dimensionless;
use anyhow::{Context, Result};
use itertools::iproduct;
use log::debug;
use std::path::Path;

pub mod parameters;
use parameters::ModelParameters;

/// Model definition.
///
/// All time-series values are fetched when the model is created, so a missing value is reported
/// before any constraint is built. The model is never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Parameters from the model file
    pub parameters: ModelParameters,
    /// The index sets
    pub sets: IndexSets,
    scenario_weights: Vec<f64>,
    project_years: Vec<u32>,
    electric_demand: Vec<f64>,
    res_yield: Vec<f64>,
    thermal_demand: Vec<f64>,
    collector_yield: Vec<f64>,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    /// * `overrides` - Parameter values which replace those in `model.toml`
    pub fn from_path<P: AsRef<Path>>(model_dir: P, overrides: &ParameterOverrides) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let parameters = ModelParameters::from_path(model_dir, overrides)?;
        let sets = parameters.index_sets()?;
        let time_series = read_time_series(model_dir, &sets, &parameters.inputs)?;

        Self::new(parameters, &time_series)
    }

    /// Create a model from its parameters, fetching time-series values from `lookup`.
    ///
    /// Fails with a [`crate::error::ConfigError`] if the parameters are invalid or a
    /// [`crate::error::DataError`] if a time-series value is missing.
    pub fn new<L: SeriesLookup + ?Sized>(parameters: ModelParameters, lookup: &L) -> Result<Model> {
        parameters.validate()?;
        let sets = parameters.index_sets()?;

        let fetch_electric = |series| {
            iproduct!(sets.iter_scenarios(), sets.iter_periods())
                .map(|(s, t)| lookup.lookup(series, s, t, None))
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Could not populate {series}"))
        };
        let fetch_thermal = |series| {
            iproduct!(sets.iter_scenarios(), sets.iter_classes(), sets.iter_periods())
                .map(|(s, c, t)| lookup.lookup(series, s, t, Some(c)))
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Could not populate {series}"))
        };

        let model = Model {
            scenario_weights: parameters.scenario_weights(&sets),
            project_years: parameters.project_years(&sets),
            electric_demand: fetch_electric(Series::ElectricDemand)?,
            res_yield: fetch_electric(Series::ResYield)?,
            thermal_demand: fetch_thermal(Series::ThermalDemand)?,
            collector_yield: fetch_thermal(Series::CollectorYield)?,
            parameters,
            sets,
        };
        debug!(
            "Populated model with {} scenarios, {} periods, {} years and {} classes",
            sets.scenarios, sets.periods, sets.years, sets.classes
        );

        Ok(model)
    }

    /// Position of (s, t) in the dense electric arrays
    fn electric_index(&self, scenario: u32, period: u32) -> usize {
        (scenario as usize - 1) * self.sets.periods as usize + period as usize - 1
    }

    /// Position of (s, c, t) in the dense thermal arrays
    fn thermal_index(&self, scenario: u32, class: u32, period: u32) -> usize {
        ((scenario as usize - 1) * self.sets.classes as usize + class as usize - 1)
            * self.sets.periods as usize
            + period as usize
            - 1
    }

    /// Electric demand in the given scenario and period
    pub fn electric_demand(&self, scenario: u32, period: u32) -> f64 {
        self.electric_demand[self.electric_index(scenario, period)]
    }

    /// Yield of one renewable unit in the given scenario and period
    pub fn res_yield(&self, scenario: u32, period: u32) -> f64 {
        self.res_yield[self.electric_index(scenario, period)]
    }

    /// Thermal demand of a class in the given scenario and period
    pub fn thermal_demand(&self, scenario: u32, class: u32, period: u32) -> f64 {
        self.thermal_demand[self.thermal_index(scenario, class, period)]
    }

    /// Yield of one collector unit for a class in the given scenario and period
    pub fn collector_yield(&self, scenario: u32, class: u32, period: u32) -> f64 {
        self.collector_yield[self.thermal_index(scenario, class, period)]
    }

    /// Electric demand summed over all periods of a scenario
    pub fn total_electric_demand(&self, scenario: u32) -> f64 {
        self.sets
            .iter_periods()
            .map(|t| self.electric_demand(scenario, t))
            .sum()
    }

    /// Thermal demand of a class summed over all periods of a scenario
    pub fn total_thermal_demand(&self, scenario: u32, class: u32) -> f64 {
        self.sets
            .iter_periods()
            .map(|t| self.thermal_demand(scenario, class, t))
            .sum()
    }

    /// Weight (probability) of a scenario
    pub fn scenario_weight(&self, scenario: u32) -> f64 {
        self.scenario_weights[scenario as usize - 1]
    }

    /// The calendar offsets of the project years
    pub fn project_years(&self) -> &[u32] {
        &self.project_years
    }

    /// Tolerated fraction of thermal lost load for a class
    pub fn th_lost_load_tolerance(&self, class: u32) -> f64 {
        self.parameters.reliability.th_lost_load_tolerance.get(class)
    }

    /// Number of periods per hour (Δt)
    pub fn periods_per_hour(&self) -> f64 {
        self.parameters.project.periods_per_hour
    }

    /// The project discount rate
    pub fn discount_rate(&self) -> Dimensionless {
        Dimensionless(self.parameters.project.discount_rate)
    }

    /// Sum of discount factors over the project years.
    ///
    /// Annually recurring costs are multiplied by this to obtain their present value.
    pub fn present_value_factor(&self) -> f64 {
        present_value_factor(self.discount_rate(), &self.project_years).value()
    }

    /// Discount factor applied to the one-off battery replacement
    pub fn replacement_discount_factor(&self) -> f64 {
        discount_factor(
            self.discount_rate(),
            self.parameters.battery.replacement_time,
        )
        .value()
    }
}
