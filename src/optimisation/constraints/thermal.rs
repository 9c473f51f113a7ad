//! Constraints of the thermal subsystem of each user class: solar collectors, boiler, tank and
//! electric resistance.
use super::{ConstraintFamily, Expression, Row, Rule};
use crate::model::Model;
use crate::optimisation::variables::{VariableKind, VariableMap};

/// Thermal constraint families
pub const FAMILIES: &[ConstraintFamily] = &[
    ConstraintFamily {
        name: "Thermal_Energy_Balance",
        rule: Rule::ScenarioClassPeriod(energy_balance),
    },
    ConstraintFamily {
        name: "SC_Energy_Production",
        rule: Rule::ScenarioClassPeriod(sc_energy_production),
    },
    ConstraintFamily {
        name: "Maximum_Boiler_Energy",
        rule: Rule::ScenarioClassPeriod(maximum_boiler_energy),
    },
    ConstraintFamily {
        name: "NG_Consumption",
        rule: Rule::ScenarioClassPeriod(ng_consumption),
    },
    ConstraintFamily {
        name: "Tank_State_of_Charge",
        rule: Rule::ScenarioClassPeriod(tank_state_of_charge),
    },
    ConstraintFamily {
        name: "Maximum_Tank_Charge",
        rule: Rule::ScenarioClassPeriod(maximum_tank_charge),
    },
    ConstraintFamily {
        name: "Minimum_Tank_Charge",
        rule: Rule::ScenarioClassPeriod(minimum_tank_charge),
    },
    ConstraintFamily {
        name: "Max_Power_Tank_Discharge",
        rule: Rule::Class(max_power_tank_discharge),
    },
    ConstraintFamily {
        name: "Max_Tank_Outflow",
        rule: Rule::ScenarioClassPeriod(max_tank_outflow),
    },
    ConstraintFamily {
        name: "Maximum_Electric_Resistance_Energy",
        rule: Rule::ScenarioClassPeriod(maximum_resistance_energy),
    },
    ConstraintFamily {
        name: "Electric_Resistance_Energy_Production",
        rule: Rule::ScenarioClassPeriod(resistance_energy_production),
    },
    ConstraintFamily {
        name: "Tot_Electric_Resistance_Energy_Production",
        rule: Rule::ScenarioPeriod(total_resistance_energy_production),
    },
    ConstraintFamily {
        name: "Maximum_Lost_Load_Th",
        rule: Rule::ScenarioClass(maximum_lost_load),
    },
];

/// `SC + RP - TIn + TOut + Boiler - Curt + LL = D`
fn energy_balance(model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    let var = |kind| vars.class_period(kind, s, c, t);
    Expression::new()
        .term(var(VariableKind::ScProduction), 1.0)
        .term(var(VariableKind::ResistanceProduction), 1.0)
        .term(var(VariableKind::TankInflow), -1.0)
        .term(var(VariableKind::TankOutflow), 1.0)
        .term(var(VariableKind::BoilerProduction), 1.0)
        .term(var(VariableKind::ThermalCurtailment), -1.0)
        .term(var(VariableKind::LostLoadTh), 1.0)
        .equals(model.thermal_demand(s, c, t))
}

fn sc_energy_production(model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.class_period(VariableKind::ScProduction, s, c, t), 1.0)
        .term(
            vars.class(VariableKind::ScUnits, c),
            -model.collector_yield(s, c, t),
        )
        .equals(0.0)
}

fn maximum_boiler_energy(_model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.class_period(VariableKind::BoilerProduction, s, c, t), 1.0)
        .term(vars.class(VariableKind::BoilerCapacity, c), -1.0)
        .at_most(0.0)
}

fn ng_consumption(model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    let boiler = &model.parameters.boiler;
    Expression::new()
        .term(vars.class_period(VariableKind::NgConsumption, s, c, t), 1.0)
        .term(
            vars.class_period(VariableKind::BoilerProduction, s, c, t),
            -1.0 / (boiler.efficiency * boiler.lower_heating_value * model.periods_per_hour()),
        )
        .equals(0.0)
}

/// Tank state of charge.
///
/// The tank is charged by the collector and resistance output and discharged by its outflow.
/// Self-discharge only applies to energy carried over from the previous period; in the first
/// period the tank starts full.
fn tank_state_of_charge(model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    let dt = model.periods_per_hour();
    let (previous, retained) = if t == 1 {
        (vars.class(VariableKind::TankCapacity, c), 1.0)
    } else {
        (
            vars.class_period(VariableKind::TankSoc, s, c, t - 1),
            model.parameters.tank.self_discharge_efficiency,
        )
    };

    Expression::new()
        .term(vars.class_period(VariableKind::TankSoc, s, c, t), 1.0)
        .term(previous, -retained)
        .term(
            vars.class_period(VariableKind::ScProduction, s, c, t),
            -1.0 / dt,
        )
        .term(
            vars.class_period(VariableKind::ResistanceProduction, s, c, t),
            -model.parameters.resistance.efficiency / dt,
        )
        .term(
            vars.class_period(VariableKind::TankOutflow, s, c, t),
            1.0 / dt,
        )
        .equals(0.0)
}

fn maximum_tank_charge(_model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.class_period(VariableKind::TankSoc, s, c, t), 1.0)
        .term(vars.class(VariableKind::TankCapacity, c), -1.0)
        .at_most(0.0)
}

fn minimum_tank_charge(model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.class_period(VariableKind::TankSoc, s, c, t), 1.0)
        .term(
            vars.class(VariableKind::TankCapacity, c),
            -model.parameters.tank.depth_of_discharge,
        )
        .at_least(0.0)
}

fn max_power_tank_discharge(model: &Model, vars: &VariableMap, c: u32) -> Row {
    Expression::new()
        .term(vars.class(VariableKind::MaxTankDischargePower, c), 1.0)
        .term(
            vars.class(VariableKind::TankCapacity, c),
            -1.0 / model.parameters.tank.max_discharge_time,
        )
        .equals(0.0)
}

fn max_tank_outflow(_model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.class_period(VariableKind::TankOutflow, s, c, t), 1.0)
        .term(vars.class(VariableKind::MaxTankDischargePower, c), -1.0)
        .at_most(0.0)
}

fn maximum_resistance_energy(_model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    Expression::new()
        .term(
            vars.class_period(VariableKind::ResistanceProduction, s, c, t),
            1.0,
        )
        .term(vars.class(VariableKind::ResistancePower, c), -1.0)
        .at_most(0.0)
}

fn resistance_energy_production(model: &Model, vars: &VariableMap, s: u32, c: u32, t: u32) -> Row {
    Expression::new()
        .term(
            vars.class_period(VariableKind::ResistanceProduction, s, c, t),
            1.0,
        )
        .term(
            vars.class_period(VariableKind::ResistanceConsumption, s, c, t),
            -model.parameters.resistance.efficiency,
        )
        .equals(0.0)
}

fn total_resistance_energy_production(model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.period(VariableKind::TotalResistanceProduction, s, t), 1.0)
        .terms(model.sets.iter_classes().map(|c| {
            (
                vars.class_period(VariableKind::ResistanceProduction, s, c, t),
                -1.0,
            )
        }))
        .equals(0.0)
}

/// Thermal lost load is capped per class as a fraction of that class's total demand
fn maximum_lost_load(model: &Model, vars: &VariableMap, s: u32, c: u32) -> Row {
    Expression::new()
        .terms(
            model
                .sets
                .iter_periods()
                .map(|t| (vars.class_period(VariableKind::LostLoadTh, s, c, t), 1.0)),
        )
        .at_most(model.th_lost_load_tolerance(c) * model.total_thermal_demand(s, c))
}
