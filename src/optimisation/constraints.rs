//! Constraint families of the sizing problem.
//!
//! Every family is a pure function of an index tuple, the model parameters and the variable map,
//! registered statically in [`CONSTRAINT_FAMILIES`]. The builder invokes each one over the full
//! cross-product of its domain.
use super::variables::{Variable, VariableMap};
use crate::model::Model;
use crate::sets::{Domain, Index};
use log::debug;

pub mod economic;
pub mod electric;
pub mod thermal;

/// A linear expression of decision variables plus a constant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    terms: Vec<(Variable, f64)>,
    constant: f64,
}

impl Expression {
    /// An empty expression
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coefficient * var` to the expression
    pub fn term(mut self, var: Variable, coefficient: f64) -> Self {
        self.terms.push((var, coefficient));
        self
    }

    /// Add several terms to the expression
    pub fn terms<I: IntoIterator<Item = (Variable, f64)>>(mut self, terms: I) -> Self {
        self.terms.extend(terms);
        self
    }

    /// Add a constant to the expression
    pub fn constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    /// The row `expression == rhs`
    pub fn equals(self, rhs: f64) -> Row {
        let value = rhs - self.constant;
        Row::new(self.terms, value, value)
    }

    /// The row `expression <= rhs`
    pub fn at_most(self, rhs: f64) -> Row {
        Row::new(self.terms, f64::NEG_INFINITY, rhs - self.constant)
    }

    /// The row `expression >= rhs`
    pub fn at_least(self, rhs: f64) -> Row {
        Row::new(self.terms, rhs - self.constant, f64::INFINITY)
    }
}

/// A single row of the problem, of the form `min <= a1*x1 + a2*x2 + ... <= max`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The minimum value for the row
    pub min: f64,
    /// The maximum value for the row
    pub max: f64,
    /// Variables and their coefficients
    pub terms: Vec<(Variable, f64)>,
}

impl Row {
    fn new(terms: Vec<(Variable, f64)>, min: f64, max: f64) -> Self {
        Self { min, max, terms }
    }
}

/// A row generated by one constraint family for one index tuple
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Name of the family which generated the row
    pub family: &'static str,
    /// The index tuple the row was generated for
    pub index: Index,
    /// The row itself
    pub row: Row,
}

/// A rule generating one row per index tuple of its domain
#[derive(Clone, Copy)]
pub enum Rule {
    /// A single row
    Global(fn(&Model, &VariableMap) -> Row),
    /// One row per class
    Class(fn(&Model, &VariableMap, u32) -> Row),
    /// One row per scenario
    Scenario(fn(&Model, &VariableMap, u32) -> Row),
    /// One row per (scenario, class)
    ScenarioClass(fn(&Model, &VariableMap, u32, u32) -> Row),
    /// One row per (scenario, period)
    ScenarioPeriod(fn(&Model, &VariableMap, u32, u32) -> Row),
    /// One row per (scenario, class, period)
    ScenarioClassPeriod(fn(&Model, &VariableMap, u32, u32, u32) -> Row),
}

impl Rule {
    /// The domain the rule is declared over
    pub fn domain(self) -> Domain {
        match self {
            Self::Global(_) => Domain::Global,
            Self::Class(_) => Domain::Class,
            Self::Scenario(_) => Domain::Scenario,
            Self::ScenarioClass(_) => Domain::ScenarioClass,
            Self::ScenarioPeriod(_) => Domain::ScenarioPeriod,
            Self::ScenarioClassPeriod(_) => Domain::ScenarioClassPeriod,
        }
    }

    /// Generate the row for one index tuple.
    ///
    /// # Panics
    ///
    /// If the index does not belong to the rule's domain.
    pub fn apply(self, model: &Model, variables: &VariableMap, index: Index) -> Row {
        match (self, index) {
            (Self::Global(rule), Index::Global) => rule(model, variables),
            (Self::Class(rule), Index::Class(c)) => rule(model, variables, c),
            (Self::Scenario(rule), Index::Scenario(s)) => rule(model, variables, s),
            (Self::ScenarioClass(rule), Index::ScenarioClass(s, c)) => rule(model, variables, s, c),
            (Self::ScenarioPeriod(rule), Index::ScenarioPeriod(s, t)) => {
                rule(model, variables, s, t)
            }
            (Self::ScenarioClassPeriod(rule), Index::ScenarioClassPeriod(s, c, t)) => {
                rule(model, variables, s, c, t)
            }
            _ => panic!("Index {index} does not belong to domain {:?}", self.domain()),
        }
    }
}

/// A named family of constraints
#[derive(Clone, Copy)]
pub struct ConstraintFamily {
    /// Name of the family
    pub name: &'static str,
    /// The rule generating its rows
    pub rule: Rule,
}

/// Every constraint family of the model, grouped by subsystem
pub const CONSTRAINT_FAMILIES: &[&[ConstraintFamily]] =
    &[economic::FAMILIES, electric::FAMILIES, thermal::FAMILIES];

/// Iterate over every registered constraint family
pub fn iter_families() -> impl Iterator<Item = &'static ConstraintFamily> {
    CONSTRAINT_FAMILIES.iter().flat_map(|families| families.iter())
}

/// Generate the rows of every constraint family
pub fn build_constraints(model: &Model, variables: &VariableMap) -> Vec<Constraint> {
    let mut constraints = Vec::new();
    for family in iter_families() {
        let num_before = constraints.len();
        constraints.extend(
            model
                .sets
                .iter_domain(family.rule.domain())
                .map(|index| Constraint {
                    family: family.name,
                    index,
                    row: family.rule.apply(model, variables, index),
                }),
        );
        debug!(
            "Added {} rows for constraint {}",
            constraints.len() - num_before,
            family.name
        );
    }

    constraints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use itertools::Itertools;
    use rstest::rstest;

    #[test]
    fn test_expression_rows() {
        let (x, y) = (Variable(0), Variable(1));
        let expr = || Expression::new().term(x, 1.0).term(y, -2.0).constant(3.0);

        assert_eq!(
            expr().equals(5.0),
            Row {
                min: 2.0,
                max: 2.0,
                terms: vec![(x, 1.0), (y, -2.0)]
            }
        );
        let row = expr().at_most(5.0);
        assert_eq!((row.min, row.max), (f64::NEG_INFINITY, 2.0));
        let row = expr().at_least(1.0);
        assert_eq!((row.min, row.max), (-2.0, f64::INFINITY));
    }

    #[test]
    fn test_family_names_unique() {
        let names = iter_families().map(|family| family.name).collect_vec();
        assert_eq!(names.len(), names.iter().unique().count());
    }

    #[rstest]
    fn test_build_constraints_counts(model: Model) {
        let variables = VariableMap::new(model.sets);
        let constraints = build_constraints(&model, &variables);
        let expected: usize = iter_families()
            .map(|family| model.sets.domain_size(family.rule.domain()))
            .sum();
        assert_eq!(constraints.len(), expected);

        // Every row refers to declared variables only
        assert!(
            constraints
                .iter()
                .flat_map(|constraint| &constraint.row.terms)
                .all(|(var, _)| var.0 < variables.len())
        );
    }

    #[rstest]
    #[should_panic(expected = "does not belong to domain")]
    fn test_rule_wrong_index(model: Model) {
        let variables = VariableMap::new(model.sets);
        let family = iter_families()
            .find(|family| family.rule.domain() == Domain::Scenario)
            .unwrap();
        family.rule.apply(&model, &variables, Index::Global);
    }
}
