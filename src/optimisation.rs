//! Assembly of the sizing problem.
//!
//! The problem is built once from a [`Model`] into an immutable [`ModelSpec`], which holds every
//! variable definition and constraint row and is handed to a solver as a whole.
use crate::model::Model;
use log::info;

pub mod constraints;
pub mod variables;
use constraints::{Constraint, build_constraints};
use variables::{VariableDefinition, VariableMap, define_variables};

/// The assembled linear program.
///
/// The objective is to minimise the sum of each variable's coefficient multiplied by its value;
/// the only non-zero coefficients are the scenario weights on the scenario net present costs.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    /// Lookup from variable keys to columns
    pub variables: VariableMap,
    /// Bounds and objective coefficient of every column, in column order
    pub definitions: Vec<VariableDefinition>,
    /// Every constraint row, grouped by family
    pub constraints: Vec<Constraint>,
}

impl ModelSpec {
    /// The number of columns in the problem
    pub fn num_variables(&self) -> usize {
        self.definitions.len()
    }

    /// The number of rows in the problem
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Iterate over the rows generated by one constraint family
    pub fn iter_family<'a>(&'a self, family: &'a str) -> impl Iterator<Item = &'a Constraint> {
        self.constraints
            .iter()
            .filter(move |constraint| constraint.family == family)
    }

    /// Evaluate the objective for the given column values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.definitions
            .iter()
            .zip(values)
            .map(|(definition, value)| definition.coefficient * value)
            .sum()
    }
}

/// Build the linear program for a model
pub fn build_model_spec(model: &Model) -> ModelSpec {
    let variables = VariableMap::new(model.sets);
    let definitions = define_variables(model, &variables);
    let constraints = build_constraints(model, &variables);
    info!(
        "Assembled model with {} variables and {} constraints",
        definitions.len(),
        constraints.len()
    );

    ModelSpec {
        variables,
        definitions,
        constraints,
    }
}
