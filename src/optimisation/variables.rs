//! Decision variables of the sizing problem.
use crate::model::Model;
use crate::model::parameters::Bounds;
use crate::sets::{Domain, Index, IndexSets};
use indexmap::IndexMap;
use strum::{Display, EnumIter, IntoEnumIterator};

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(pub usize);

/// The kinds of decision variable, each declared over one [`Domain`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[allow(missing_docs)]
pub enum VariableKind {
    // Electric capacities
    #[strum(serialize = "RES_Units")]
    ResUnits,
    #[strum(serialize = "BESS_Nominal_Capacity")]
    BessCapacity,
    #[strum(serialize = "Generator_Nominal_Capacity")]
    GeneratorCapacity,
    #[strum(serialize = "Maximum_BESS_Charge_Power")]
    MaxBessChargePower,
    #[strum(serialize = "Maximum_BESS_Discharge_Power")]
    MaxBessDischargePower,

    // Thermal capacities
    #[strum(serialize = "SC_Units")]
    ScUnits,
    #[strum(serialize = "Boiler_Nominal_Capacity")]
    BoilerCapacity,
    #[strum(serialize = "Tank_Nominal_Capacity")]
    TankCapacity,
    #[strum(serialize = "Electric_Resistance_Nominal_Power")]
    ResistancePower,
    #[strum(serialize = "Maximum_Tank_Discharge_Power")]
    MaxTankDischargePower,

    // Scenario-independent costs
    #[strum(serialize = "Total_Investment_Cost")]
    TotalInvestmentCost,
    #[strum(serialize = "Fixed_Costs")]
    FixedCosts,
    #[strum(serialize = "RES_Investment_Cost")]
    ResInvestmentCost,
    #[strum(serialize = "RES_OM_Cost")]
    ResOmCost,
    #[strum(serialize = "BESS_Investment_Cost")]
    BessInvestmentCost,
    #[strum(serialize = "BESS_OM_Cost")]
    BessOmCost,
    #[strum(serialize = "BESS_Replacement_Cost")]
    BessReplacementCost,
    #[strum(serialize = "Generator_Investment_Cost")]
    GeneratorInvestmentCost,
    #[strum(serialize = "Generator_OM_Cost")]
    GeneratorOmCost,
    #[strum(serialize = "SC_Investment_Cost")]
    ScInvestmentCost,
    #[strum(serialize = "SC_OM_Cost")]
    ScOmCost,
    #[strum(serialize = "Boiler_Investment_Cost")]
    BoilerInvestmentCost,
    #[strum(serialize = "Boiler_OM_Cost")]
    BoilerOmCost,
    #[strum(serialize = "Tank_Investment_Cost")]
    TankInvestmentCost,
    #[strum(serialize = "Tank_OM_Cost")]
    TankOmCost,
    #[strum(serialize = "Electric_Resistance_Investment_Cost")]
    ResistanceInvestmentCost,
    #[strum(serialize = "Electric_Resistance_OM_Cost")]
    ResistanceOmCost,

    // Scenario costs
    #[strum(serialize = "Scenario_Net_Present_Cost")]
    ScenarioNpc,
    #[strum(serialize = "Variable_Costs")]
    VariableCosts,
    #[strum(serialize = "Scenario_Lost_Load_Cost_EE")]
    LostLoadCostEe,
    #[strum(serialize = "Total_Diesel_Cost")]
    DieselCost,
    #[strum(serialize = "Scenario_Lost_Load_Cost_Th")]
    LostLoadCostTh,
    #[strum(serialize = "Total_NG_Cost")]
    NgCost,

    // Electric flows
    #[strum(serialize = "RES_Energy_Production")]
    ResProduction,
    #[strum(serialize = "BESS_Inflow")]
    BessInflow,
    #[strum(serialize = "BESS_Outflow")]
    BessOutflow,
    #[strum(serialize = "BESS_State_of_Charge")]
    BessSoc,
    #[strum(serialize = "Generator_Energy_Production")]
    GeneratorProduction,
    #[strum(serialize = "Diesel_Consumption")]
    DieselConsumption,
    #[strum(serialize = "Lost_Load_EE")]
    LostLoadEe,
    #[strum(serialize = "Electric_Curtailment")]
    ElectricCurtailment,
    #[strum(serialize = "Tot_Electric_Resistance_Energy_Production")]
    TotalResistanceProduction,

    // Thermal flows
    #[strum(serialize = "SC_Energy_Production")]
    ScProduction,
    #[strum(serialize = "Tank_Inflow")]
    TankInflow,
    #[strum(serialize = "Tank_Outflow")]
    TankOutflow,
    #[strum(serialize = "Tank_State_of_Charge")]
    TankSoc,
    #[strum(serialize = "Boiler_Energy_Production")]
    BoilerProduction,
    #[strum(serialize = "NG_Consumption")]
    NgConsumption,
    #[strum(serialize = "Electric_Resistance_Energy_Production")]
    ResistanceProduction,
    #[strum(serialize = "Electric_Resistance_Energy_Consumption")]
    ResistanceConsumption,
    #[strum(serialize = "Lost_Load_Th")]
    LostLoadTh,
    #[strum(serialize = "Thermal_Energy_Curtailment")]
    ThermalCurtailment,
}

impl VariableKind {
    /// The domain over which this kind of variable is declared
    pub fn domain(self) -> Domain {
        match self {
            Self::ResUnits
            | Self::BessCapacity
            | Self::GeneratorCapacity
            | Self::MaxBessChargePower
            | Self::MaxBessDischargePower
            | Self::TotalInvestmentCost
            | Self::FixedCosts
            | Self::ResInvestmentCost
            | Self::ResOmCost
            | Self::BessInvestmentCost
            | Self::BessOmCost
            | Self::BessReplacementCost
            | Self::GeneratorInvestmentCost
            | Self::GeneratorOmCost => Domain::Global,
            Self::ScUnits
            | Self::BoilerCapacity
            | Self::TankCapacity
            | Self::ResistancePower
            | Self::MaxTankDischargePower
            | Self::ScInvestmentCost
            | Self::ScOmCost
            | Self::BoilerInvestmentCost
            | Self::BoilerOmCost
            | Self::TankInvestmentCost
            | Self::TankOmCost
            | Self::ResistanceInvestmentCost
            | Self::ResistanceOmCost => Domain::Class,
            Self::ScenarioNpc
            | Self::VariableCosts
            | Self::LostLoadCostEe
            | Self::DieselCost => Domain::Scenario,
            Self::LostLoadCostTh | Self::NgCost => Domain::ScenarioClass,
            Self::ResProduction
            | Self::BessInflow
            | Self::BessOutflow
            | Self::BessSoc
            | Self::GeneratorProduction
            | Self::DieselConsumption
            | Self::LostLoadEe
            | Self::ElectricCurtailment
            | Self::TotalResistanceProduction => Domain::ScenarioPeriod,
            Self::ScProduction
            | Self::TankInflow
            | Self::TankOutflow
            | Self::TankSoc
            | Self::BoilerProduction
            | Self::NgConsumption
            | Self::ResistanceProduction
            | Self::ResistanceConsumption
            | Self::LostLoadTh
            | Self::ThermalCurtailment => Domain::ScenarioClassPeriod,
        }
    }

    /// Bounds on the capacity decision variables, if this is one
    fn capacity_bounds(self, model: &Model) -> Option<Bounds> {
        let limits = &model.parameters.capacity_limits;
        match self {
            Self::ResUnits => Some(limits.res),
            Self::BessCapacity => Some(limits.battery),
            Self::GeneratorCapacity => Some(limits.generator),
            Self::ScUnits => Some(limits.solar_collector),
            Self::BoilerCapacity => Some(limits.boiler),
            Self::TankCapacity => Some(limits.tank),
            Self::ResistancePower => Some(limits.resistance),
            _ => None,
        }
    }
}

/// A key identifying a single decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableKey {
    /// The kind of variable
    pub kind: VariableKind,
    /// Its index within the kind's domain
    pub index: Index,
}

/// The definition of a variable to be optimised.
///
/// The coefficient represents the multiplying factor in the objective function to minimise, with
/// the variable taking values between min and max.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableDefinition {
    /// The variable's minimum value
    pub min: f64,
    /// The variable's maximum value
    pub max: f64,
    /// The coefficient of the variable in the objective
    pub coefficient: f64,
}

/// A map for easy lookup of variables in the problem.
///
/// Every kind of variable occupies a contiguous block of columns, ordered as its domain is
/// iterated by [`IndexSets::iter_domain`].
///
/// We use this data structure for two things:
///
/// 1. In order define constraints for the optimisation
/// 2. To keep track of the combination of parameters that each variable corresponds to, for when we
///    are reading the results of the optimisation.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableMap {
    sets: IndexSets,
    offsets: IndexMap<VariableKind, usize>,
    len: usize,
}

impl VariableMap {
    /// Declare one variable of every kind for every index of its domain
    pub fn new(sets: IndexSets) -> Self {
        let mut offsets = IndexMap::new();
        let mut len = 0;
        for kind in VariableKind::iter() {
            offsets.insert(kind, len);
            len += sets.domain_size(kind.domain());
        }

        Self { sets, offsets, len }
    }

    /// Get the [`Variable`] corresponding to the given kind and index.
    ///
    /// # Panics
    ///
    /// If the index does not belong to the kind's domain or lies outside the index sets.
    pub fn get(&self, kind: VariableKind, index: Index) -> Variable {
        assert_eq!(
            index.domain(),
            kind.domain(),
            "Index {index} does not match domain of {kind}"
        );
        assert!(
            self.sets.contains(index),
            "Index {index} out of range for {kind}"
        );

        Variable(self.offsets[&kind] + self.sets.position(index))
    }

    /// Get an unindexed variable
    pub fn scalar(&self, kind: VariableKind) -> Variable {
        self.get(kind, Index::Global)
    }

    /// Get a variable indexed by class
    pub fn class(&self, kind: VariableKind, class: u32) -> Variable {
        self.get(kind, Index::Class(class))
    }

    /// Get a variable indexed by scenario
    pub fn scenario(&self, kind: VariableKind, scenario: u32) -> Variable {
        self.get(kind, Index::Scenario(scenario))
    }

    /// Get a variable indexed by scenario and class
    pub fn scenario_class(&self, kind: VariableKind, scenario: u32, class: u32) -> Variable {
        self.get(kind, Index::ScenarioClass(scenario, class))
    }

    /// Get a variable indexed by scenario and period
    pub fn period(&self, kind: VariableKind, scenario: u32, period: u32) -> Variable {
        self.get(kind, Index::ScenarioPeriod(scenario, period))
    }

    /// Get a variable indexed by scenario, class and period
    pub fn class_period(
        &self,
        kind: VariableKind,
        scenario: u32,
        class: u32,
        period: u32,
    ) -> Variable {
        self.get(kind, Index::ScenarioClassPeriod(scenario, class, period))
    }

    /// The total number of variables
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no variables
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over every variable of one kind with its index
    pub fn iter_kind(&self, kind: VariableKind) -> impl Iterator<Item = (Index, Variable)> {
        let offset = self.offsets[&kind];
        self.sets
            .iter_domain(kind.domain())
            .enumerate()
            .map(move |(position, index)| (index, Variable(offset + position)))
    }

    /// Iterate over every variable in column order
    pub fn iter(&self) -> impl Iterator<Item = (VariableKey, Variable)> + '_ {
        self.offsets.keys().flat_map(|&kind| {
            self.iter_kind(kind)
                .map(move |(index, var)| (VariableKey { kind, index }, var))
        })
    }
}

/// Define the bounds and objective coefficient of every variable.
///
/// All variables are non-negative. Capacities are further bounded by the model's capacity limits
/// and the only objective terms are the scenario net present costs, weighted by scenario.
pub fn define_variables(model: &Model, variables: &VariableMap) -> Vec<VariableDefinition> {
    variables
        .iter()
        .map(|(key, _)| {
            let (min, max) = key
                .kind
                .capacity_bounds(model)
                .map_or((0.0, f64::INFINITY), |bounds| (bounds.min, bounds.max));
            let coefficient = match (key.kind, key.index) {
                (VariableKind::ScenarioNpc, Index::Scenario(s)) => model.scenario_weight(s),
                _ => 0.0,
            };

            VariableDefinition {
                min,
                max,
                coefficient,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use itertools::Itertools;
    use rstest::rstest;

    #[test]
    fn test_variable_map_columns_unique() {
        let sets = IndexSets::new(2.0, 3.0, 1.0, 2.0).unwrap();
        let variables = VariableMap::new(sets);
        let columns = variables.iter().map(|(_, var)| var.0).collect_vec();
        assert_eq!(columns.len(), variables.len());
        assert!(columns.iter().copied().eq(0..variables.len()));

        // Lookups agree with iteration order
        for (key, var) in variables.iter() {
            assert_eq!(variables.get(key.kind, key.index), var);
        }
    }

    #[test]
    fn test_variable_map_len() {
        let sets = IndexSets::new(2.0, 3.0, 1.0, 2.0).unwrap();
        let variables = VariableMap::new(sets);
        let expected: usize = VariableKind::iter()
            .map(|kind| sets.domain_size(kind.domain()))
            .sum();
        assert_eq!(variables.len(), expected);
        assert_eq!(variables.iter_kind(VariableKind::TankSoc).count(), 12);
    }

    #[test]
    #[should_panic(expected = "does not match domain")]
    fn test_variable_map_wrong_domain() {
        let variables = VariableMap::new(IndexSets::new(1.0, 1.0, 1.0, 1.0).unwrap());
        variables.period(VariableKind::ResUnits, 1, 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_variable_map_out_of_range() {
        let variables = VariableMap::new(IndexSets::new(1.0, 2.0, 1.0, 1.0).unwrap());
        variables.period(VariableKind::BessSoc, 1, 3);
    }

    #[rstest]
    fn test_define_variables(model: Model) {
        let variables = VariableMap::new(model.sets);
        let definitions = define_variables(&model, &variables);
        assert_eq!(definitions.len(), variables.len());

        // RES units are fixed by the capacity limits
        let res_units = definitions[variables.scalar(VariableKind::ResUnits).0];
        assert_eq!((res_units.min, res_units.max), (1.0, 1.0));

        // Only the scenario NPC appears in the objective
        let npc = variables.scenario(VariableKind::ScenarioNpc, 1);
        for (key, var) in variables.iter() {
            let definition = definitions[var.0];
            if var == npc {
                assert_eq!(definition.coefficient, 1.0);
            } else {
                assert_eq!(definition.coefficient, 0.0, "{}{}", key.kind, key.index);
            }
        }
    }
}
