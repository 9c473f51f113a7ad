//! Cost accounting constraints.
//!
//! Investment and fixed costs are shared by every scenario. Variable costs are built per scenario
//! from the period-level flows of the representative year, which recur in every project year, so
//! they are discounted with the present value factor.
use super::{ConstraintFamily, Expression, Row, Rule};
use crate::model::Model;
use crate::optimisation::variables::{Variable, VariableKind, VariableMap};

/// Economic constraint families
pub const FAMILIES: &[ConstraintFamily] = &[
    ConstraintFamily {
        name: "Scenario_Net_Present_Cost",
        rule: Rule::Scenario(scenario_net_present_cost),
    },
    ConstraintFamily {
        name: "Total_Investment_Cost",
        rule: Rule::Global(total_investment_cost),
    },
    ConstraintFamily {
        name: "RES_Investment_Cost",
        rule: Rule::Global(res_investment_cost),
    },
    ConstraintFamily {
        name: "BESS_Investment_Cost",
        rule: Rule::Global(bess_investment_cost),
    },
    ConstraintFamily {
        name: "Generator_Investment_Cost",
        rule: Rule::Global(generator_investment_cost),
    },
    ConstraintFamily {
        name: "SC_Investment_Cost",
        rule: Rule::Class(sc_investment_cost),
    },
    ConstraintFamily {
        name: "Boiler_Investment_Cost",
        rule: Rule::Class(boiler_investment_cost),
    },
    ConstraintFamily {
        name: "Tank_Investment_Cost",
        rule: Rule::Class(tank_investment_cost),
    },
    ConstraintFamily {
        name: "Electric_Resistance_Investment_Cost",
        rule: Rule::Class(resistance_investment_cost),
    },
    ConstraintFamily {
        name: "Fixed_Costs",
        rule: Rule::Global(fixed_costs),
    },
    ConstraintFamily {
        name: "RES_OM_Cost",
        rule: Rule::Global(res_om_cost),
    },
    ConstraintFamily {
        name: "BESS_OM_Cost",
        rule: Rule::Global(bess_om_cost),
    },
    ConstraintFamily {
        name: "BESS_Replacement_Cost",
        rule: Rule::Global(bess_replacement_cost),
    },
    ConstraintFamily {
        name: "Generator_OM_Cost",
        rule: Rule::Global(generator_om_cost),
    },
    ConstraintFamily {
        name: "SC_OM_Cost",
        rule: Rule::Class(sc_om_cost),
    },
    ConstraintFamily {
        name: "Boiler_OM_Cost",
        rule: Rule::Class(boiler_om_cost),
    },
    ConstraintFamily {
        name: "Tank_OM_Cost",
        rule: Rule::Class(tank_om_cost),
    },
    ConstraintFamily {
        name: "Electric_Resistance_OM_Cost",
        rule: Rule::Class(resistance_om_cost),
    },
    ConstraintFamily {
        name: "Variable_Costs",
        rule: Rule::Scenario(variable_costs),
    },
    ConstraintFamily {
        name: "Scenario_Lost_Load_Cost_EE",
        rule: Rule::Scenario(lost_load_cost_ee),
    },
    ConstraintFamily {
        name: "Total_Diesel_Cost",
        rule: Rule::Scenario(total_diesel_cost),
    },
    ConstraintFamily {
        name: "Scenario_Lost_Load_Cost_Th",
        rule: Rule::ScenarioClass(lost_load_cost_th),
    },
    ConstraintFamily {
        name: "Total_NG_Cost",
        rule: Rule::ScenarioClass(total_ng_cost),
    },
];

/// `NPC[s] = TotalInvestmentCost + FixedCosts + VariableCosts[s]`
fn scenario_net_present_cost(_model: &Model, vars: &VariableMap, s: u32) -> Row {
    Expression::new()
        .term(vars.scenario(VariableKind::ScenarioNpc, s), 1.0)
        .term(vars.scalar(VariableKind::TotalInvestmentCost), -1.0)
        .term(vars.scalar(VariableKind::FixedCosts), -1.0)
        .term(vars.scenario(VariableKind::VariableCosts, s), -1.0)
        .equals(0.0)
}

/// Terms subtracting the given per-class cost variables, for every class
fn thermal_terms<'a>(
    model: &'a Model,
    vars: &'a VariableMap,
    kinds: &'a [VariableKind],
) -> impl Iterator<Item = (Variable, f64)> + 'a {
    model
        .sets
        .iter_classes()
        .flat_map(move |c| kinds.iter().map(move |&kind| (vars.class(kind, c), -1.0)))
}

fn total_investment_cost(model: &Model, vars: &VariableMap) -> Row {
    const THERMAL: &[VariableKind] = &[
        VariableKind::ScInvestmentCost,
        VariableKind::BoilerInvestmentCost,
        VariableKind::TankInvestmentCost,
        VariableKind::ResistanceInvestmentCost,
    ];

    Expression::new()
        .term(vars.scalar(VariableKind::TotalInvestmentCost), 1.0)
        .term(vars.scalar(VariableKind::ResInvestmentCost), -1.0)
        .term(vars.scalar(VariableKind::BessInvestmentCost), -1.0)
        .term(vars.scalar(VariableKind::GeneratorInvestmentCost), -1.0)
        .terms(thermal_terms(model, vars, THERMAL))
        .equals(0.0)
}

fn res_investment_cost(model: &Model, vars: &VariableMap) -> Row {
    let res = &model.parameters.res;
    Expression::new()
        .term(vars.scalar(VariableKind::ResInvestmentCost), 1.0)
        .term(
            vars.scalar(VariableKind::ResUnits),
            -res.nominal_capacity * res.investment_cost,
        )
        .equals(0.0)
}

fn bess_investment_cost(model: &Model, vars: &VariableMap) -> Row {
    Expression::new()
        .term(vars.scalar(VariableKind::BessInvestmentCost), 1.0)
        .term(
            vars.scalar(VariableKind::BessCapacity),
            -model.parameters.battery.investment_cost,
        )
        .equals(0.0)
}

fn generator_investment_cost(model: &Model, vars: &VariableMap) -> Row {
    Expression::new()
        .term(vars.scalar(VariableKind::GeneratorInvestmentCost), 1.0)
        .term(
            vars.scalar(VariableKind::GeneratorCapacity),
            -model.parameters.generator.investment_cost,
        )
        .equals(0.0)
}

fn sc_investment_cost(model: &Model, vars: &VariableMap, c: u32) -> Row {
    let collector = &model.parameters.solar_collector;
    Expression::new()
        .term(vars.class(VariableKind::ScInvestmentCost, c), 1.0)
        .term(
            vars.class(VariableKind::ScUnits, c),
            -collector.nominal_capacity * collector.investment_cost,
        )
        .equals(0.0)
}

fn boiler_investment_cost(model: &Model, vars: &VariableMap, c: u32) -> Row {
    Expression::new()
        .term(vars.class(VariableKind::BoilerInvestmentCost, c), 1.0)
        .term(
            vars.class(VariableKind::BoilerCapacity, c),
            -model.parameters.boiler.investment_cost,
        )
        .equals(0.0)
}

fn tank_investment_cost(model: &Model, vars: &VariableMap, c: u32) -> Row {
    Expression::new()
        .term(vars.class(VariableKind::TankInvestmentCost, c), 1.0)
        .term(
            vars.class(VariableKind::TankCapacity, c),
            -model.parameters.tank.investment_cost,
        )
        .equals(0.0)
}

fn resistance_investment_cost(model: &Model, vars: &VariableMap, c: u32) -> Row {
    Expression::new()
        .term(vars.class(VariableKind::ResistanceInvestmentCost, c), 1.0)
        .term(
            vars.class(VariableKind::ResistancePower, c),
            -model.parameters.resistance.investment_cost,
        )
        .equals(0.0)
}

fn fixed_costs(model: &Model, vars: &VariableMap) -> Row {
    const THERMAL: &[VariableKind] = &[
        VariableKind::ScOmCost,
        VariableKind::BoilerOmCost,
        VariableKind::TankOmCost,
        VariableKind::ResistanceOmCost,
    ];

    Expression::new()
        .term(vars.scalar(VariableKind::FixedCosts), 1.0)
        .term(vars.scalar(VariableKind::ResOmCost), -1.0)
        .term(vars.scalar(VariableKind::BessOmCost), -1.0)
        .term(vars.scalar(VariableKind::BessReplacementCost), -1.0)
        .term(vars.scalar(VariableKind::GeneratorOmCost), -1.0)
        .terms(thermal_terms(model, vars, THERMAL))
        .equals(0.0)
}

/// The discounted O&M cost over the project years:
/// `OM = Σ_y investment × om_fraction / (1 + r)^years[y]`
fn om_cost(model: &Model, om: Variable, investment: Variable, om_fraction: f64) -> Row {
    Expression::new()
        .term(om, 1.0)
        .term(investment, -om_fraction * model.present_value_factor())
        .equals(0.0)
}

fn res_om_cost(model: &Model, vars: &VariableMap) -> Row {
    om_cost(
        model,
        vars.scalar(VariableKind::ResOmCost),
        vars.scalar(VariableKind::ResInvestmentCost),
        model.parameters.res.om_fraction,
    )
}

fn bess_om_cost(model: &Model, vars: &VariableMap) -> Row {
    om_cost(
        model,
        vars.scalar(VariableKind::BessOmCost),
        vars.scalar(VariableKind::BessInvestmentCost),
        model.parameters.battery.om_fraction,
    )
}

/// The battery is bought again after its replacement time, discounted to the present
fn bess_replacement_cost(model: &Model, vars: &VariableMap) -> Row {
    Expression::new()
        .term(vars.scalar(VariableKind::BessReplacementCost), 1.0)
        .term(
            vars.scalar(VariableKind::BessInvestmentCost),
            -model.replacement_discount_factor(),
        )
        .equals(0.0)
}

fn generator_om_cost(model: &Model, vars: &VariableMap) -> Row {
    om_cost(
        model,
        vars.scalar(VariableKind::GeneratorOmCost),
        vars.scalar(VariableKind::GeneratorInvestmentCost),
        model.parameters.generator.om_fraction,
    )
}

fn sc_om_cost(model: &Model, vars: &VariableMap, c: u32) -> Row {
    om_cost(
        model,
        vars.class(VariableKind::ScOmCost, c),
        vars.class(VariableKind::ScInvestmentCost, c),
        model.parameters.solar_collector.om_fraction,
    )
}

fn boiler_om_cost(model: &Model, vars: &VariableMap, c: u32) -> Row {
    om_cost(
        model,
        vars.class(VariableKind::BoilerOmCost, c),
        vars.class(VariableKind::BoilerInvestmentCost, c),
        model.parameters.boiler.om_fraction,
    )
}

fn tank_om_cost(model: &Model, vars: &VariableMap, c: u32) -> Row {
    om_cost(
        model,
        vars.class(VariableKind::TankOmCost, c),
        vars.class(VariableKind::TankInvestmentCost, c),
        model.parameters.tank.om_fraction,
    )
}

fn resistance_om_cost(model: &Model, vars: &VariableMap, c: u32) -> Row {
    om_cost(
        model,
        vars.class(VariableKind::ResistanceOmCost, c),
        vars.class(VariableKind::ResistanceInvestmentCost, c),
        model.parameters.resistance.om_fraction,
    )
}

fn variable_costs(model: &Model, vars: &VariableMap, s: u32) -> Row {
    let thermal = model.sets.iter_classes().flat_map(|c| {
        [
            (vars.scenario_class(VariableKind::LostLoadCostTh, s, c), -1.0),
            (vars.scenario_class(VariableKind::NgCost, s, c), -1.0),
        ]
    });

    Expression::new()
        .term(vars.scenario(VariableKind::VariableCosts, s), 1.0)
        .term(vars.scenario(VariableKind::LostLoadCostEe, s), -1.0)
        .term(vars.scenario(VariableKind::DieselCost, s), -1.0)
        .terms(thermal)
        .equals(0.0)
}

/// Lost load is a power, so it is converted to energy before pricing
fn lost_load_cost_ee(model: &Model, vars: &VariableMap, s: u32) -> Row {
    let coefficient = model.parameters.reliability.ee_value_of_lost_load
        / model.periods_per_hour()
        * model.present_value_factor();

    Expression::new()
        .term(vars.scenario(VariableKind::LostLoadCostEe, s), 1.0)
        .terms(
            model
                .sets
                .iter_periods()
                .map(|t| (vars.period(VariableKind::LostLoadEe, s, t), -coefficient)),
        )
        .equals(0.0)
}

fn total_diesel_cost(model: &Model, vars: &VariableMap, s: u32) -> Row {
    let coefficient = model.parameters.generator.fuel_cost * model.present_value_factor();

    Expression::new()
        .term(vars.scenario(VariableKind::DieselCost, s), 1.0)
        .terms(
            model
                .sets
                .iter_periods()
                .map(|t| (vars.period(VariableKind::DieselConsumption, s, t), -coefficient)),
        )
        .equals(0.0)
}

fn lost_load_cost_th(model: &Model, vars: &VariableMap, s: u32, c: u32) -> Row {
    let coefficient = model.parameters.reliability.th_value_of_lost_load
        / model.periods_per_hour()
        * model.present_value_factor();

    Expression::new()
        .term(vars.scenario_class(VariableKind::LostLoadCostTh, s, c), 1.0)
        .terms(model.sets.iter_periods().map(|t| {
            (
                vars.class_period(VariableKind::LostLoadTh, s, c, t),
                -coefficient,
            )
        }))
        .equals(0.0)
}

fn total_ng_cost(model: &Model, vars: &VariableMap, s: u32, c: u32) -> Row {
    let coefficient = model.parameters.boiler.fuel_cost * model.present_value_factor();

    Expression::new()
        .term(vars.scenario_class(VariableKind::NgCost, s, c), 1.0)
        .terms(model.sets.iter_periods().map(|t| {
            (
                vars.class_period(VariableKind::NgConsumption, s, c, t),
                -coefficient,
            )
        }))
        .equals(0.0)
}
