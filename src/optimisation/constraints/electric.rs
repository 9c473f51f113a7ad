//! Constraints of the electric subsystem: renewables, battery, diesel generator and lost load.
use super::{ConstraintFamily, Expression, Row, Rule};
use crate::model::Model;
use crate::optimisation::variables::{VariableKind, VariableMap};

/// Electric constraint families
pub const FAMILIES: &[ConstraintFamily] = &[
    ConstraintFamily {
        name: "Electric_Energy_Balance",
        rule: Rule::ScenarioPeriod(energy_balance),
    },
    ConstraintFamily {
        name: "RES_Energy_Production",
        rule: Rule::ScenarioPeriod(res_energy_production),
    },
    ConstraintFamily {
        name: "BESS_State_of_Charge",
        rule: Rule::ScenarioPeriod(bess_state_of_charge),
    },
    ConstraintFamily {
        name: "Maximum_BESS_Charge",
        rule: Rule::ScenarioPeriod(maximum_bess_charge),
    },
    ConstraintFamily {
        name: "Minimum_BESS_Charge",
        rule: Rule::ScenarioPeriod(minimum_bess_charge),
    },
    ConstraintFamily {
        name: "Max_Power_BESS_Charge",
        rule: Rule::Global(max_power_bess_charge),
    },
    ConstraintFamily {
        name: "Max_Power_BESS_Discharge",
        rule: Rule::Global(max_power_bess_discharge),
    },
    ConstraintFamily {
        name: "Max_BESS_Inflow",
        rule: Rule::ScenarioPeriod(max_bess_inflow),
    },
    ConstraintFamily {
        name: "Max_BESS_Outflow",
        rule: Rule::ScenarioPeriod(max_bess_outflow),
    },
    ConstraintFamily {
        name: "Maximum_Generator_Energy",
        rule: Rule::ScenarioPeriod(maximum_generator_energy),
    },
    ConstraintFamily {
        name: "Diesel_Consumption",
        rule: Rule::ScenarioPeriod(diesel_consumption),
    },
    ConstraintFamily {
        name: "Maximum_Lost_Load_EE",
        rule: Rule::Scenario(maximum_lost_load),
    },
];

/// Supply must meet demand plus the consumption of every class's electric resistance:
///
/// `RES - In + Out + Gen + LL - Curt - Σ_c RC = D`
fn energy_balance(model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    let resistance = model.sets.iter_classes().map(|c| {
        (
            vars.class_period(VariableKind::ResistanceConsumption, s, c, t),
            -1.0,
        )
    });

    Expression::new()
        .term(vars.period(VariableKind::ResProduction, s, t), 1.0)
        .term(vars.period(VariableKind::BessInflow, s, t), -1.0)
        .term(vars.period(VariableKind::BessOutflow, s, t), 1.0)
        .term(vars.period(VariableKind::GeneratorProduction, s, t), 1.0)
        .term(vars.period(VariableKind::LostLoadEe, s, t), 1.0)
        .term(vars.period(VariableKind::ElectricCurtailment, s, t), -1.0)
        .terms(resistance)
        .equals(model.electric_demand(s, t))
}

fn res_energy_production(model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.period(VariableKind::ResProduction, s, t), 1.0)
        .term(
            vars.scalar(VariableKind::ResUnits),
            -model.res_yield(s, t) * model.parameters.res.inverter_efficiency,
        )
        .equals(0.0)
}

/// Battery state of charge.
///
/// The battery starts the representative year full, so in the first period the previous state
/// is the nominal capacity.
fn bess_state_of_charge(model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    let battery = &model.parameters.battery;
    let dt = model.periods_per_hour();
    let previous = if t == 1 {
        vars.scalar(VariableKind::BessCapacity)
    } else {
        vars.period(VariableKind::BessSoc, s, t - 1)
    };

    Expression::new()
        .term(vars.period(VariableKind::BessSoc, s, t), 1.0)
        .term(previous, -1.0)
        .term(
            vars.period(VariableKind::BessOutflow, s, t),
            1.0 / (dt * battery.discharge_efficiency),
        )
        .term(
            vars.period(VariableKind::BessInflow, s, t),
            -battery.charge_efficiency / dt,
        )
        .equals(0.0)
}

fn maximum_bess_charge(_model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.period(VariableKind::BessSoc, s, t), 1.0)
        .term(vars.scalar(VariableKind::BessCapacity), -1.0)
        .at_most(0.0)
}

fn minimum_bess_charge(model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.period(VariableKind::BessSoc, s, t), 1.0)
        .term(
            vars.scalar(VariableKind::BessCapacity),
            -model.parameters.battery.depth_of_discharge,
        )
        .at_least(0.0)
}

fn max_power_bess_charge(model: &Model, vars: &VariableMap) -> Row {
    Expression::new()
        .term(vars.scalar(VariableKind::MaxBessChargePower), 1.0)
        .term(
            vars.scalar(VariableKind::BessCapacity),
            -1.0 / model.parameters.battery.max_charge_time,
        )
        .equals(0.0)
}

fn max_power_bess_discharge(model: &Model, vars: &VariableMap) -> Row {
    Expression::new()
        .term(vars.scalar(VariableKind::MaxBessDischargePower), 1.0)
        .term(
            vars.scalar(VariableKind::BessCapacity),
            -1.0 / model.parameters.battery.max_discharge_time,
        )
        .equals(0.0)
}

fn max_bess_inflow(_model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.period(VariableKind::BessInflow, s, t), 1.0)
        .term(vars.scalar(VariableKind::MaxBessChargePower), -1.0)
        .at_most(0.0)
}

fn max_bess_outflow(_model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.period(VariableKind::BessOutflow, s, t), 1.0)
        .term(vars.scalar(VariableKind::MaxBessDischargePower), -1.0)
        .at_most(0.0)
}

fn maximum_generator_energy(_model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    Expression::new()
        .term(vars.period(VariableKind::GeneratorProduction, s, t), 1.0)
        .term(vars.scalar(VariableKind::GeneratorCapacity), -1.0)
        .at_most(0.0)
}

fn diesel_consumption(model: &Model, vars: &VariableMap, s: u32, t: u32) -> Row {
    let generator = &model.parameters.generator;
    Expression::new()
        .term(vars.period(VariableKind::DieselConsumption, s, t), 1.0)
        .term(
            vars.period(VariableKind::GeneratorProduction, s, t),
            -1.0 / (generator.efficiency * generator.lower_heating_value * model.periods_per_hour()),
        )
        .equals(0.0)
}

/// Lost load is capped as a fraction of the scenario's total demand
fn maximum_lost_load(model: &Model, vars: &VariableMap, s: u32) -> Row {
    let tolerance = model.parameters.reliability.ee_lost_load_tolerance;
    Expression::new()
        .terms(
            model
                .sets
                .iter_periods()
                .map(|t| (vars.period(VariableKind::LostLoadEe, s, t), 1.0)),
        )
        .at_most(tolerance * model.total_electric_demand(s))
}
