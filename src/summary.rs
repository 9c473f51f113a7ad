//! Aggregate results of a solved model: component sizes, costs and performance indicators.
use crate::finance::levelised_cost;
use crate::model::Model;
use crate::optimisation::variables::VariableKind;
use crate::solver::Solution;
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy, Power};

/// Size of the components shared by every class
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricSize {
    /// Number of renewable units
    pub res_units: f64,
    /// Installed renewable capacity
    pub res_capacity: Power,
    /// Battery energy capacity
    pub battery_capacity: Energy,
    /// Generator power
    pub generator_capacity: Power,
}

/// Size of the thermal components of one class
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalSize {
    /// The user class
    pub class: u32,
    /// Number of collector units
    pub collector_units: f64,
    /// Installed collector capacity
    pub collector_capacity: Power,
    /// Boiler power
    pub boiler_capacity: Power,
    /// Tank energy capacity
    pub tank_capacity: Energy,
    /// Resistance power
    pub resistance_power: Power,
}

/// Costs and indicators of a single scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    /// The scenario
    pub scenario: u32,
    /// Weight of the scenario in the objective
    pub weight: f64,
    /// Net present cost
    pub net_present_cost: Money,
    /// Discounted operating costs
    pub variable_costs: Money,
    /// Cost of unserved electric energy
    pub lost_load_cost_ee: Money,
    /// Cost of unserved thermal energy, summed over classes
    pub lost_load_cost_th: Money,
    /// Diesel cost
    pub diesel_cost: Money,
    /// Natural gas cost, summed over classes
    pub ng_cost: Money,
    /// Net present cost per unit of discounted energy served, if any was served
    pub lcoe: Option<MoneyPerEnergy>,
    /// Share of electricity production from renewables (after curtailment)
    pub res_fraction: Dimensionless,
    /// Share of electric demand which went unserved
    pub ee_lost_load_fraction: Dimensionless,
    /// Share of thermal demand which went unserved
    pub th_lost_load_fraction: Dimensionless,
}

/// Summary of a solved model
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Size of the electric components
    pub electric: ElectricSize,
    /// Size of the thermal components of each class
    pub thermal: Vec<ThermalSize>,
    /// Total investment cost
    pub investment_cost: Money,
    /// Discounted O&M costs, including the battery replacement
    pub fixed_costs: Money,
    /// Discounted battery replacement cost
    pub replacement_cost: Money,
    /// Per-scenario costs and indicators
    pub scenarios: Vec<ScenarioSummary>,
    /// Weighted net present cost
    pub objective: Money,
}

/// Share of `part` in `whole`, or zero if `whole` is zero
fn fraction(part: Energy, whole: Energy) -> Dimensionless {
    if whole > Energy(0.0) {
        part / whole
    } else {
        Dimensionless(0.0)
    }
}

impl Summary {
    /// Summarise a solution of the given model
    pub fn new(model: &Model, solution: &Solution) -> Self {
        let params = &model.parameters;
        let res_units = solution.scalar(VariableKind::ResUnits);
        let electric = ElectricSize {
            res_units,
            res_capacity: Power(res_units * params.res.nominal_capacity),
            battery_capacity: Energy(solution.scalar(VariableKind::BessCapacity)),
            generator_capacity: Power(solution.scalar(VariableKind::GeneratorCapacity)),
        };
        let thermal = model
            .sets
            .iter_classes()
            .map(|c| {
                let collector_units = solution.class(VariableKind::ScUnits, c);
                ThermalSize {
                    class: c,
                    collector_units,
                    collector_capacity: Power(
                        collector_units * params.solar_collector.nominal_capacity,
                    ),
                    boiler_capacity: Power(solution.class(VariableKind::BoilerCapacity, c)),
                    tank_capacity: Energy(solution.class(VariableKind::TankCapacity, c)),
                    resistance_power: Power(solution.class(VariableKind::ResistancePower, c)),
                }
            })
            .collect();

        Self {
            electric,
            thermal,
            investment_cost: Money(solution.scalar(VariableKind::TotalInvestmentCost)),
            fixed_costs: Money(solution.scalar(VariableKind::FixedCosts)),
            replacement_cost: Money(solution.scalar(VariableKind::BessReplacementCost)),
            scenarios: model
                .sets
                .iter_scenarios()
                .map(|s| summarise_scenario(model, solution, s))
                .collect(),
            objective: Money(solution.objective_value()),
        }
    }

    /// Total installed renewable capacity
    pub fn res_capacity(&self) -> Power {
        self.electric.res_capacity
    }

    /// Levelised cost of energy, weighted over scenarios with a defined value
    pub fn weighted_lcoe(&self) -> Option<MoneyPerEnergy> {
        let (total, weight) = self
            .scenarios
            .iter()
            .filter_map(|scenario| scenario.lcoe.map(|lcoe| (lcoe.value(), scenario.weight)))
            .fold((0.0, 0.0), |(total, weights), (lcoe, weight)| {
                (total + lcoe * weight, weights + weight)
            });
        (weight > 0.0).then_some(MoneyPerEnergy(total / weight))
    }

    /// Weighted variable costs over scenarios
    pub fn weighted_variable_costs(&self) -> Money {
        self.scenarios
            .iter()
            .map(|scenario| scenario.variable_costs * Dimensionless(scenario.weight))
            .sum()
    }
}

/// Costs and indicators of one scenario
fn summarise_scenario(model: &Model, solution: &Solution, s: u32) -> ScenarioSummary {
    let dt = model.periods_per_hour();
    let pvf = Dimensionless(model.present_value_factor());
    let sum_periods = |kind| -> Energy {
        model
            .sets
            .iter_periods()
            .map(|t| Energy(solution.period(kind, s, t) / dt))
            .sum()
    };
    let sum_thermal = |kind| -> Energy {
        model
            .sets
            .iter_classes()
            .flat_map(|c| model.sets.iter_periods().map(move |t| (c, t)))
            .map(|(c, t)| Energy(solution.class_period(kind, s, c, t) / dt))
            .sum()
    };

    let ee_demand = Energy(model.total_electric_demand(s) / dt);
    let th_demand: Energy = model
        .sets
        .iter_classes()
        .map(|c| Energy(model.total_thermal_demand(s, c) / dt))
        .sum();
    let ee_lost = sum_periods(VariableKind::LostLoadEe);
    let th_lost = sum_thermal(VariableKind::LostLoadTh);

    // Curtailed energy never reaches the bus
    let res_used =
        sum_periods(VariableKind::ResProduction) - sum_periods(VariableKind::ElectricCurtailment);
    let production = res_used + sum_periods(VariableKind::GeneratorProduction);

    let net_present_cost = Money(solution.scenario(VariableKind::ScenarioNpc, s));
    let served = (ee_demand - ee_lost + th_demand - th_lost) * pvf;
    let sum_classes = |kind| -> Money {
        model
            .sets
            .iter_classes()
            .map(|c| Money(solution.scenario_class(kind, s, c)))
            .sum()
    };

    ScenarioSummary {
        scenario: s,
        weight: model.scenario_weight(s),
        net_present_cost,
        variable_costs: Money(solution.scenario(VariableKind::VariableCosts, s)),
        lost_load_cost_ee: Money(solution.scenario(VariableKind::LostLoadCostEe, s)),
        lost_load_cost_th: sum_classes(VariableKind::LostLoadCostTh),
        diesel_cost: Money(solution.scenario(VariableKind::DieselCost, s)),
        ng_cost: sum_classes(VariableKind::NgCost),
        lcoe: levelised_cost(net_present_cost, served),
        res_fraction: fraction(res_used, production),
        ee_lost_load_fraction: fraction(ee_lost, ee_demand),
        th_lost_load_fraction: fraction(th_lost, th_demand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, solution};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_fraction() {
        assert_eq!(fraction(Energy(1.0), Energy(4.0)), Dimensionless(0.25));
        assert_eq!(fraction(Energy(1.0), Energy(0.0)), Dimensionless(0.0));
    }

    #[rstest]
    fn test_summary(model: Model, solution: Solution) {
        let summary = Summary::new(&model, &solution);
        assert_approx_eq!(Power, summary.res_capacity(), Power(1.0), epsilon = 1e-6);
        assert_approx_eq!(Energy, summary.electric.battery_capacity, Energy(0.0), epsilon = 1e-6);
        assert_eq!(summary.thermal.len(), 1);
        assert_approx_eq!(Money, summary.investment_cost, Money(0.0), epsilon = 1e-6);

        // 10 units of lost load over two project years at a value of 10
        let scenario = &summary.scenarios[0];
        assert_approx_eq!(Money, scenario.net_present_cost, Money(200.0), epsilon = 1e-6);
        assert_approx_eq!(Money, scenario.lost_load_cost_ee, Money(200.0), epsilon = 1e-6);
        assert_approx_eq!(Money, summary.objective, Money(200.0), epsilon = 1e-6);

        // Half of the demand is served, by renewables alone
        assert_approx_eq!(
            Dimensionless,
            scenario.ee_lost_load_fraction,
            Dimensionless(0.5),
            epsilon = 1e-6
        );
        assert_approx_eq!(Dimensionless, scenario.res_fraction, Dimensionless(1.0), epsilon = 1e-6);
        assert_eq!(scenario.th_lost_load_fraction, Dimensionless(0.0));
        assert_approx_eq!(
            MoneyPerEnergy,
            scenario.lcoe.unwrap(),
            MoneyPerEnergy(10.0),
            epsilon = 1e-6
        );
        assert_approx_eq!(
            MoneyPerEnergy,
            summary.weighted_lcoe().unwrap(),
            MoneyPerEnergy(10.0),
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_weighted_lcoe_undefined(model: Model, solution: Solution) {
        let mut summary = Summary::new(&model, &solution);
        summary.scenarios[0].lcoe = None;
        assert!(summary.weighted_lcoe().is_none());
    }
}
