//! Integration tests checking the properties of solved models.
use float_cmp::assert_approx_eq;
use mes2::input::overrides::ParameterOverrides;
use mes2::model::Model;
use mes2::optimisation::build_model_spec;
use mes2::optimisation::variables::VariableKind;
use mes2::simulation::solve;
use mes2::solver::{ModelError, Solution, row_violation};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Tolerance for checks on solver output
const TOLERANCE: f64 = 1e-6;

/// A single-scenario, single-class model shared with the unit tests. Renewables are fixed at one
/// unit and every other component costs something, so nothing else is worth installing unless a
/// test says otherwise.
const MODEL_TOML: &str = include_str!("data/small_model.toml");

/// Write a table with one column per scenario (and class) and one row per period
fn write_table(path: &Path, columns: &[&[f64]]) {
    let header: Vec<String> = (1..=columns.len()).map(|i| format!("col{i}")).collect();
    let mut contents = format!("period;{}\n", header.join(";"));
    for t in 0..columns[0].len() {
        let row: Vec<String> = columns.iter().map(|column| column[t].to_string()).collect();
        contents.push_str(&format!("{};{}\n", t + 1, row.join(";")));
    }
    fs::write(path, contents).unwrap();
}

/// Load the single-scenario model with the given electric demand and renewable yield
fn load_model(model_dir: &Path, demand: &[f64], res_yield: &[f64], overrides: &[&str]) -> Model {
    let zeros = vec![0.0; demand.len()];
    fs::write(model_dir.join("model.toml"), MODEL_TOML).unwrap();
    write_table(&model_dir.join("electric_demand.csv"), &[demand]);
    write_table(&model_dir.join("res_yield.csv"), &[res_yield]);
    write_table(&model_dir.join("thermal_demand.csv"), &[&zeros]);
    write_table(&model_dir.join("collector_yield.csv"), &[&zeros]);

    let mut all_overrides = vec![format!("sets.periods={}", demand.len())];
    all_overrides.extend(overrides.iter().map(ToString::to_string));
    let overrides = ParameterOverrides::from_args(&all_overrides).unwrap();
    Model::from_path(model_dir, &overrides).unwrap()
}

/// Path to the bundled example model
fn demo_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// Load and solve the bundled example model
fn solve_demo() -> (Model, Solution) {
    let model = Model::from_path(demo_dir(), &ParameterOverrides::default()).unwrap();
    let solution = solve(&model).unwrap();
    (model, solution)
}

#[test]
fn test_unmet_demand_is_lost_load() {
    let dir = tempdir().unwrap();
    let model = load_model(dir.path(), &[10.0, 10.0], &[4.0, 6.0], &[]);
    let solution = solve(&model).unwrap();

    assert_approx_eq!(
        f64,
        solution.period(VariableKind::LostLoadEe, 1, 1),
        6.0,
        epsilon = TOLERANCE
    );
    assert_approx_eq!(
        f64,
        solution.period(VariableKind::LostLoadEe, 1, 2),
        4.0,
        epsilon = TOLERANCE
    );
    for t in model.sets.iter_periods() {
        assert_approx_eq!(
            f64,
            solution.period(VariableKind::ElectricCurtailment, 1, t),
            0.0,
            epsilon = TOLERANCE
        );
    }
    assert_approx_eq!(
        f64,
        solution.scalar(VariableKind::TotalInvestmentCost),
        0.0,
        epsilon = TOLERANCE
    );
}

#[test]
fn test_surplus_is_curtailed() {
    let dir = tempdir().unwrap();
    let model = load_model(dir.path(), &[5.0, 5.0], &[8.0, 5.0], &[]);
    let solution = solve(&model).unwrap();

    assert_approx_eq!(
        f64,
        solution.period(VariableKind::ElectricCurtailment, 1, 1),
        3.0,
        epsilon = TOLERANCE
    );
    assert_approx_eq!(f64, solution.objective_value(), 0.0, epsilon = TOLERANCE);
}

#[test]
fn test_no_lost_load_allowed_is_infeasible() {
    let dir = tempdir().unwrap();
    let model = load_model(
        dir.path(),
        &[10.0, 10.0],
        &[4.0, 6.0],
        &["reliability.ee_lost_load_tolerance=0"],
    );
    let err = solve(&model).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ModelError>(),
        Some(ModelError::Infeasible | ModelError::Unbounded)
    ));
}

#[test]
fn test_no_simultaneous_charge_and_discharge() {
    let dir = tempdir().unwrap();
    let model = load_model(
        dir.path(),
        &[10.0, 12.0, 9.0, 11.0],
        &[4.0, 6.0, 8.0, 2.0],
        &[
            "capacity_limits.battery.max=1000",
            "battery.investment_cost=1",
            "battery.om_fraction=0",
            "battery.depth_of_discharge=0",
            "battery.max_charge_time=0.5",
            "battery.max_discharge_time=0.5",
            "reliability.ee_value_of_lost_load=1000",
        ],
    );
    let solution = solve(&model).unwrap();

    // The battery starts full, so it is worth buying to cover the deficit
    assert!(solution.scalar(VariableKind::BessCapacity) > TOLERANCE);
    for t in model.sets.iter_periods() {
        let inflow = solution.period(VariableKind::BessInflow, 1, t);
        let outflow = solution.period(VariableKind::BessOutflow, 1, t);
        assert!(
            inflow.min(outflow) < TOLERANCE,
            "period {t}: {inflow} in, {outflow} out"
        );
    }
}

#[test]
fn test_no_simultaneous_charge_and_discharge_with_surplus() {
    let dir = tempdir().unwrap();
    let model = load_model(
        dir.path(),
        &[10.0, 2.0, 20.0],
        &[0.0, 8.0, 0.0],
        &[
            "capacity_limits.battery.min=20",
            "capacity_limits.battery.max=20",
            "battery.depth_of_discharge=0",
            "battery.max_charge_time=0.5",
            "battery.max_discharge_time=0.5",
        ],
    );
    let solution = solve(&model).unwrap();

    // Curtailment is free, but cycling in the surplus period would waste energy which is needed
    // later, so all of the surplus goes into the battery
    for t in model.sets.iter_periods() {
        let inflow = solution.period(VariableKind::BessInflow, 1, t);
        let outflow = solution.period(VariableKind::BessOutflow, 1, t);
        assert!(
            inflow.min(outflow) < TOLERANCE,
            "period {t}: {inflow} in, {outflow} out"
        );
        assert_approx_eq!(
            f64,
            solution.period(VariableKind::ElectricCurtailment, 1, t),
            0.0,
            epsilon = TOLERANCE
        );
    }
    assert_approx_eq!(
        f64,
        solution.period(VariableKind::BessInflow, 1, 2),
        6.0,
        epsilon = TOLERANCE
    );

    // The full battery and the stored surplus are both delivered
    let lost: f64 = model
        .sets
        .iter_periods()
        .map(|t| solution.period(VariableKind::LostLoadEe, 1, t))
        .sum();
    assert_approx_eq!(
        f64,
        lost,
        30.0 - 0.9 * (20.0 + 0.9 * 6.0),
        epsilon = TOLERANCE
    );
}

/// In the demo model curtailment is free and energy left in storage at the end of the cycle has no
/// value, so optimal solutions need not be unique. Any charging and discharging in the same period
/// can be replaced by the net flow plus curtailment without changing the cost.
#[test]
fn test_demo_simultaneous_charge_and_discharge_is_never_needed() {
    let (model, solution) = solve_demo();
    let spec = build_model_spec(&model);
    let battery = &model.parameters.battery;
    let round_trip = battery.charge_efficiency * battery.discharge_efficiency;

    let mut values = solution.values().to_vec();
    for (index, inflow_var) in spec.variables.iter_kind(VariableKind::BessInflow) {
        let outflow_var = spec.variables.get(VariableKind::BessOutflow, index);
        let curtailment_var = spec.variables.get(VariableKind::ElectricCurtailment, index);
        let (inflow, outflow) = (values[inflow_var.0], values[outflow_var.0]);

        // Keep the change in state of charge, and curtail what is no longer cycled
        let (new_inflow, new_outflow) = if inflow * round_trip >= outflow {
            (inflow - outflow / round_trip, 0.0)
        } else {
            (0.0, outflow - inflow * round_trip)
        };
        values[inflow_var.0] = new_inflow;
        values[outflow_var.0] = new_outflow;
        values[curtailment_var.0] += (inflow - new_inflow) - (outflow - new_outflow);
        assert!(values[curtailment_var.0] >= -TOLERANCE);
    }

    for constraint in &spec.constraints {
        let violation = row_violation(&constraint.row, &values);
        assert!(
            violation.abs() < TOLERANCE,
            "{} violated by {violation}",
            constraint.family
        );
    }
    assert_approx_eq!(
        f64,
        spec.objective_value(&values),
        spec.objective_value(solution.values()),
        epsilon = 1e-9
    );
}

#[test]
fn test_demo_energy_balances() {
    let (model, solution) = solve_demo();
    assert!(!solution.is_degraded());

    for s in model.sets.iter_scenarios() {
        for t in model.sets.iter_periods() {
            assert!(
                solution.electric_balance_residual(&model, s, t).abs() < TOLERANCE
            );
            for c in model.sets.iter_classes() {
                assert!(
                    solution.thermal_balance_residual(&model, s, c, t).abs() < TOLERANCE
                );
            }
        }
    }

    let spec = build_model_spec(&model);
    assert!(solution.max_violation(&spec) < TOLERANCE);
}

#[test]
fn test_demo_storage_bounds() {
    let (model, solution) = solve_demo();
    let params = &model.parameters;

    let battery = solution.scalar(VariableKind::BessCapacity);
    for (_, soc) in solution.iter(VariableKind::BessSoc) {
        assert!(soc <= battery + TOLERANCE);
        assert!(
            soc >= params.battery.depth_of_discharge * battery - TOLERANCE
        );
    }

    for (index, soc) in solution.iter(VariableKind::TankSoc) {
        let tank = solution.class(VariableKind::TankCapacity, index.class().unwrap());
        assert!(soc <= tank + TOLERANCE);
        assert!(soc >= params.tank.depth_of_discharge * tank - TOLERANCE);
    }
}

#[test]
fn test_demo_reliability_caps() {
    let (model, solution) = solve_demo();
    let params = &model.parameters;

    for s in model.sets.iter_scenarios() {
        let lost: f64 = model
            .sets
            .iter_periods()
            .map(|t| solution.period(VariableKind::LostLoadEe, s, t))
            .sum();
        let cap = params.reliability.ee_lost_load_tolerance * model.total_electric_demand(s);
        assert!(lost <= cap + TOLERANCE);

        for c in model.sets.iter_classes() {
            let lost: f64 = model
                .sets
                .iter_periods()
                .map(|t| solution.class_period(VariableKind::LostLoadTh, s, c, t))
                .sum();
            let cap = model.th_lost_load_tolerance(c) * model.total_thermal_demand(s, c);
            assert!(lost <= cap + TOLERANCE);
        }
    }
}

#[test]
fn test_demo_cost_additivity() {
    let (model, solution) = solve_demo();
    let investment = solution.scalar(VariableKind::TotalInvestmentCost);
    let fixed = solution.scalar(VariableKind::FixedCosts);

    let mut expected_objective = 0.0;
    for s in model.sets.iter_scenarios() {
        let npc = solution.scenario(VariableKind::ScenarioNpc, s);
        let variable = solution.scenario(VariableKind::VariableCosts, s);
        assert_approx_eq!(f64, npc, investment + fixed + variable, epsilon = 1e-4);
        expected_objective += model.scenario_weight(s) * npc;
    }
    assert_approx_eq!(
        f64,
        solution.objective_value(),
        expected_objective,
        epsilon = 1e-4
    );
}
