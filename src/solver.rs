//! Solving the assembled problem and reading back the results.
//!
//! The [`SolverAdapter`] trait decouples the problem from the LP solver. [`HighsSolver`] implements
//! it with the HiGHS solver.
use crate::error::ConfigError;
use crate::model::Model;
use crate::optimisation::ModelSpec;
use crate::optimisation::constraints::Row;
use crate::optimisation::variables::{VariableKind, VariableMap};
use crate::sets::Index;
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use indexmap::IndexMap;
use log::{Level, debug, log_enabled, warn};
use std::error::Error;
use std::fmt;
use strum::Display;

/// The type of value taken by a solver option
#[derive(Debug, Clone, Copy, PartialEq)]
enum OptionType {
    Bool,
    Int,
    Float,
    Str,
}

/// The HiGHS options which may be set in the model file, with the type of their values
const SUPPORTED_OPTIONS: &[(&str, OptionType)] = &[
    ("presolve", OptionType::Str),
    ("solver", OptionType::Str),
    ("parallel", OptionType::Str),
    ("run_crossover", OptionType::Str),
    ("time_limit", OptionType::Float),
    ("primal_feasibility_tolerance", OptionType::Float),
    ("dual_feasibility_tolerance", OptionType::Float),
    ("ipm_optimality_tolerance", OptionType::Float),
    ("objective_bound", OptionType::Float),
    ("threads", OptionType::Int),
    ("random_seed", OptionType::Int),
    ("simplex_strategy", OptionType::Int),
    ("simplex_iteration_limit", OptionType::Int),
    ("ipm_iteration_limit", OptionType::Int),
    ("log_to_console", OptionType::Bool),
    ("output_flag", OptionType::Bool),
];

/// The value of a solver option
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// A boolean option
    Bool(bool),
    /// An integer option
    Int(i32),
    /// A floating-point option
    Float(f64),
    /// A string option
    Str(String),
}

impl OptionValue {
    /// Convert a value from the model file to the given type, if possible.
    ///
    /// Strings are accepted for every type, so that values given on the command line need not be
    /// quoted differently from those in the file.
    fn convert(value: &toml::Value, option_type: OptionType) -> Option<Self> {
        match (option_type, value) {
            (OptionType::Bool, toml::Value::Boolean(b)) => Some(Self::Bool(*b)),
            (OptionType::Bool, toml::Value::String(s)) => s.parse().ok().map(Self::Bool),
            (OptionType::Int, toml::Value::Integer(i)) => i32::try_from(*i).ok().map(Self::Int),
            (OptionType::Int, toml::Value::String(s)) => s.parse().ok().map(Self::Int),
            (OptionType::Float, toml::Value::Float(f)) => Some(Self::Float(*f)),
            (OptionType::Float, toml::Value::Integer(i)) => Some(Self::Float(*i as f64)),
            (OptionType::Float, toml::Value::String(s)) => s.parse().ok().map(Self::Float),
            (OptionType::Str, toml::Value::String(s)) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }
}

/// Options passed to the solver, checked against the options it supports
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverOptions(IndexMap<&'static str, OptionValue>);

impl SolverOptions {
    /// Check and convert the options given in the model file.
    ///
    /// Fails if an option is not supported or its value cannot be converted to the option's type.
    pub fn from_config(options: &IndexMap<String, toml::Value>) -> Result<Self, ConfigError> {
        let mut converted = IndexMap::new();
        for (name, value) in options {
            let (name, option_type) = SUPPORTED_OPTIONS
                .iter()
                .find(|(option, _)| option == name)
                .copied()
                .ok_or_else(|| ConfigError::UnknownParameter(format!("solver.options.{name}")))?;
            let value = OptionValue::convert(value, option_type).ok_or_else(|| {
                ConfigError::InvalidSolverOption {
                    name: name.to_string(),
                    value: value.to_string(),
                }
            })?;
            converted.insert(name, value);
        }

        Ok(Self(converted))
    }

    /// Get the value of an option, if it has been set
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    /// Iterate over the options in the order they were given
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OptionValue)> {
        self.0.iter().map(|(name, value)| (*name, value))
    }

    /// Set the options on a HiGHS model
    fn apply(&self, highs_model: &mut highs::Model) {
        for (name, value) in self.iter() {
            debug!("Setting solver option {name} = {value:?}");
            match value {
                OptionValue::Bool(value) => highs_model.set_option(name, *value),
                OptionValue::Int(value) => highs_model.set_option(name, *value),
                OptionValue::Float(value) => highs_model.set_option(name, *value),
                OptionValue::Str(value) => highs_model.set_option(name, value.as_str()),
            }
        }
    }
}

/// The outcome of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SolveStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem has no feasible solution
    Infeasible,
    /// The objective can be decreased without limit
    Unbounded,
    /// The solver stopped on a limit before converging; values are the best found
    Numerical,
    /// The solver failed
    Error,
}

impl From<HighsModelStatus> for SolveStatus {
    fn from(status: HighsModelStatus) -> Self {
        match status {
            HighsModelStatus::Optimal => Self::Optimal,
            HighsModelStatus::Infeasible => Self::Infeasible,
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                Self::Unbounded
            }
            HighsModelStatus::ReachedTimeLimit
            | HighsModelStatus::ReachedIterationLimit
            | HighsModelStatus::ObjectiveBound
            | HighsModelStatus::ObjectiveTarget => Self::Numerical,
            _ => Self::Error,
        }
    }
}

/// The raw result of a solve, as returned by a [`SolverAdapter`]
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// The outcome of the solve
    pub status: SolveStatus,
    /// Value of every column, in column order. Empty unless a solution was found.
    pub values: Vec<f64>,
    /// Value of the objective for the values found
    pub objective: f64,
    /// Description of the solver's final state
    pub message: String,
}

impl SolveResult {
    /// A result for a solve which did not produce any values
    fn failed(status: SolveStatus, message: String) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: f64::NAN,
            message,
        }
    }

    /// Convert to a [`Solution`] if values were found.
    ///
    /// A solve which stopped on a limit gives a degraded solution rather than an error, leaving the
    /// caller to decide whether it is usable.
    pub fn into_solution(self, spec: &ModelSpec) -> Result<Solution, ModelError> {
        match self.status {
            SolveStatus::Optimal | SolveStatus::Numerical => {}
            SolveStatus::Infeasible => return Err(ModelError::Infeasible),
            SolveStatus::Unbounded => return Err(ModelError::Unbounded),
            SolveStatus::Error => return Err(ModelError::Solver(self.message)),
        }

        if self.values.len() != spec.num_variables() {
            return Err(ModelError::Solver(format!(
                "Expected {} values, but the solver returned {}",
                spec.num_variables(),
                self.values.len()
            )));
        }

        let degraded = self.status == SolveStatus::Numerical;
        if degraded {
            warn!(
                "Solver stopped before convergence ({}). Using best solution found, with objective {}",
                self.message, self.objective
            );
        }

        Ok(Solution {
            variables: spec.variables.clone(),
            values: self.values,
            objective: self.objective,
            degraded,
        })
    }
}

/// A solve which gave no usable solution
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The problem has no feasible solution
    Infeasible,
    /// The objective can be decreased without limit
    Unbounded,
    /// The solver failed or the problem is incoherent
    Solver(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infeasible => write!(f, "The model is infeasible"),
            Self::Unbounded => write!(f, "The model is unbounded"),
            Self::Solver(message) => write!(f, "Could not solve the model: {message}"),
        }
    }
}

impl Error for ModelError {}

/// Something which can solve an assembled problem
pub trait SolverAdapter {
    /// Solve the problem, minimising its objective.
    ///
    /// Solver failures are reported through the status of the result.
    fn solve(&self, spec: &ModelSpec, options: &SolverOptions) -> SolveResult;
}

/// Solves problems with HiGHS
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsSolver;

impl SolverAdapter for HighsSolver {
    fn solve(&self, spec: &ModelSpec, options: &SolverOptions) -> SolveResult {
        let mut problem = Problem::default();
        let columns: Vec<_> = spec
            .definitions
            .iter()
            .map(|def| problem.add_column(def.coefficient, def.min..=def.max))
            .collect();
        for constraint in &spec.constraints {
            let row = &constraint.row;
            problem.add_row(
                row.min..=row.max,
                row.terms.iter().map(|(var, coeff)| (columns[var.0], *coeff)),
            );
        }

        let mut highs_model = problem.optimise(Sense::Minimise);

        // Solver output doesn't go through our logger, so only show it when debugging
        highs_model.set_option("output_flag", log_enabled!(Level::Debug));
        options.apply(&mut highs_model);

        let solved = match highs_model.try_solve() {
            Ok(solved) => solved,
            Err(status) => {
                return SolveResult::failed(
                    SolveStatus::Error,
                    format!("HiGHS returned {status:?}"),
                );
            }
        };

        let highs_status = solved.status();
        let status = SolveStatus::from(highs_status);
        let message = format!("{highs_status:?}");
        debug!("HiGHS finished with status {message}");
        match status {
            SolveStatus::Optimal | SolveStatus::Numerical => {
                let values = solved.get_solution().columns().to_vec();
                SolveResult {
                    status,
                    objective: spec.objective_value(&values),
                    values,
                    message,
                }
            }
            _ => SolveResult::failed(status, message),
        }
    }
}

/// Value of a row's left-hand side minus the nearest value within its bounds
pub fn row_violation(row: &Row, values: &[f64]) -> f64 {
    let lhs: f64 = row.terms.iter().map(|(var, coeff)| coeff * values[var.0]).sum();
    lhs - lhs.clamp(row.min, row.max)
}

/// The values of every variable after a solve
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    variables: VariableMap,
    values: Vec<f64>,
    objective: f64,
    degraded: bool,
}

impl Solution {
    /// Get the value of a variable
    pub fn value(&self, kind: VariableKind, index: Index) -> f64 {
        self.values[self.variables.get(kind, index).0]
    }

    /// Get the value of an unindexed variable
    pub fn scalar(&self, kind: VariableKind) -> f64 {
        self.value(kind, Index::Global)
    }

    /// Get the value of a variable indexed by class
    pub fn class(&self, kind: VariableKind, class: u32) -> f64 {
        self.value(kind, Index::Class(class))
    }

    /// Get the value of a variable indexed by scenario
    pub fn scenario(&self, kind: VariableKind, scenario: u32) -> f64 {
        self.value(kind, Index::Scenario(scenario))
    }

    /// Get the value of a variable indexed by scenario and class
    pub fn scenario_class(&self, kind: VariableKind, scenario: u32, class: u32) -> f64 {
        self.value(kind, Index::ScenarioClass(scenario, class))
    }

    /// Get the value of a variable indexed by scenario and period
    pub fn period(&self, kind: VariableKind, scenario: u32, period: u32) -> f64 {
        self.value(kind, Index::ScenarioPeriod(scenario, period))
    }

    /// Get the value of a variable indexed by scenario, class and period
    pub fn class_period(&self, kind: VariableKind, scenario: u32, class: u32, period: u32) -> f64 {
        self.value(kind, Index::ScenarioClassPeriod(scenario, class, period))
    }

    /// Iterate over the values of every variable of one kind
    pub fn iter(&self, kind: VariableKind) -> impl Iterator<Item = (Index, f64)> + '_ {
        self.variables
            .iter_kind(kind)
            .map(|(index, var)| (index, self.values[var.0]))
    }

    /// The values of every column, in column order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The value of the objective
    pub fn objective_value(&self) -> f64 {
        self.objective
    }

    /// Whether the solver stopped before reaching an optimal solution
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Electric supply minus demand in one period.
    ///
    /// This is computed from the model's demand rather than the assembled rows, so that it checks
    /// the balance constraints themselves.
    pub fn electric_balance_residual(&self, model: &Model, scenario: u32, period: u32) -> f64 {
        let flow = |kind| self.period(kind, scenario, period);
        let resistance: f64 = model
            .sets
            .iter_classes()
            .map(|c| self.class_period(VariableKind::ResistanceConsumption, scenario, c, period))
            .sum();

        flow(VariableKind::ResProduction) - flow(VariableKind::BessInflow)
            + flow(VariableKind::BessOutflow)
            + flow(VariableKind::GeneratorProduction)
            + flow(VariableKind::LostLoadEe)
            - flow(VariableKind::ElectricCurtailment)
            - resistance
            - model.electric_demand(scenario, period)
    }

    /// Thermal supply minus demand for one class in one period
    pub fn thermal_balance_residual(
        &self,
        model: &Model,
        scenario: u32,
        class: u32,
        period: u32,
    ) -> f64 {
        let flow = |kind| self.class_period(kind, scenario, class, period);

        flow(VariableKind::ScProduction) + flow(VariableKind::ResistanceProduction)
            - flow(VariableKind::TankInflow)
            + flow(VariableKind::TankOutflow)
            + flow(VariableKind::BoilerProduction)
            - flow(VariableKind::ThermalCurtailment)
            + flow(VariableKind::LostLoadTh)
            - model.thermal_demand(scenario, class, period)
    }

    /// The largest violation of any row of the problem by this solution
    pub fn max_violation(&self, spec: &ModelSpec) -> f64 {
        spec.constraints
            .iter()
            .map(|constraint| row_violation(&constraint.row, &self.values).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::optimisation::build_model_spec;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn options(entries: &[(&str, toml::Value)]) -> IndexMap<String, toml::Value> {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[rstest]
    #[case("time_limit", toml::Value::Integer(10), OptionValue::Float(10.0))]
    #[case("time_limit", toml::Value::String("2.5".into()), OptionValue::Float(2.5))]
    #[case("threads", toml::Value::Integer(2), OptionValue::Int(2))]
    #[case("presolve", toml::Value::String("off".into()), OptionValue::Str("off".into()))]
    #[case("log_to_console", toml::Value::Boolean(false), OptionValue::Bool(false))]
    fn test_solver_options_from_config(
        #[case] name: &str,
        #[case] value: toml::Value,
        #[case] expected: OptionValue,
    ) {
        let options = SolverOptions::from_config(&options(&[(name, value)])).unwrap();
        assert_eq!(options.get(name), Some(&expected));
    }

    #[test]
    fn test_solver_options_unknown() {
        assert_eq!(
            SolverOptions::from_config(&options(&[("warp_speed", toml::Value::Integer(9))])),
            Err(ConfigError::UnknownParameter(
                "solver.options.warp_speed".into()
            ))
        );
    }

    #[rstest]
    #[case("threads", toml::Value::Float(1.5))]
    #[case("threads", toml::Value::Integer(i64::MAX))]
    #[case("time_limit", toml::Value::String("soon".into()))]
    #[case("presolve", toml::Value::Boolean(true))]
    fn test_solver_options_invalid(#[case] name: &str, #[case] value: toml::Value) {
        assert!(matches!(
            SolverOptions::from_config(&options(&[(name, value)])),
            Err(ConfigError::InvalidSolverOption { .. })
        ));
    }

    #[rstest]
    #[case(HighsModelStatus::Optimal, SolveStatus::Optimal)]
    #[case(HighsModelStatus::Infeasible, SolveStatus::Infeasible)]
    #[case(HighsModelStatus::UnboundedOrInfeasible, SolveStatus::Unbounded)]
    #[case(HighsModelStatus::ReachedTimeLimit, SolveStatus::Numerical)]
    #[case(HighsModelStatus::SolveError, SolveStatus::Error)]
    fn test_status_mapping(#[case] status: HighsModelStatus, #[case] expected: SolveStatus) {
        assert_eq!(SolveStatus::from(status), expected);
    }

    #[rstest]
    fn test_into_solution_degraded(model: Model) {
        let spec = build_model_spec(&model);
        let result = SolveResult {
            status: SolveStatus::Numerical,
            values: vec![0.0; spec.num_variables()],
            objective: 0.0,
            message: "ReachedTimeLimit".into(),
        };
        assert!(result.into_solution(&spec).unwrap().is_degraded());
    }

    #[rstest]
    fn test_into_solution_errors(model: Model) {
        let spec = build_model_spec(&model);
        let failed = |status| SolveResult::failed(status, "oops".into());
        assert_eq!(
            failed(SolveStatus::Infeasible).into_solution(&spec),
            Err(ModelError::Infeasible)
        );
        assert_eq!(
            failed(SolveStatus::Error).into_solution(&spec),
            Err(ModelError::Solver("oops".into()))
        );

        // Optimal, but missing values
        assert!(matches!(
            failed(SolveStatus::Optimal).into_solution(&spec),
            Err(ModelError::Solver(_))
        ));
    }

    #[rstest]
    fn test_highs_solve(model: Model) {
        let spec = build_model_spec(&model);
        let solution = HighsSolver
            .solve(&spec, &SolverOptions::default())
            .into_solution(&spec)
            .unwrap();
        assert!(!solution.is_degraded());
        assert!(solution.max_violation(&spec) < 1e-6);
        assert_approx_eq!(
            f64,
            solution.period(VariableKind::LostLoadEe, 1, 1),
            6.0,
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_highs_solve_infeasible(mut model: Model) {
        // Demand exceeds what the fixed renewables can supply, and no lost load is allowed
        model.parameters.reliability.ee_lost_load_tolerance = 0.0;
        let spec = build_model_spec(&model);
        let result = HighsSolver.solve(&spec, &SolverOptions::default());
        assert!(matches!(
            result.status,
            SolveStatus::Infeasible | SolveStatus::Unbounded
        ));
        assert!(result.into_solution(&spec).is_err());
    }
}
