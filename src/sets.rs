//! Index sets over which parameters, variables and constraints are declared.
//!
//! All sets are contiguous, 1-based ranges of integers whose sizes come from the model
//! configuration.
use crate::error::ConfigError;
use itertools::iproduct;
use std::fmt;
use std::ops::RangeInclusive;

/// The sizes of the four index sets of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSets {
    /// Number of demand/weather scenarios
    pub scenarios: u32,
    /// Number of periods in the representative year
    pub periods: u32,
    /// Number of project years
    pub years: u32,
    /// Number of thermal user classes
    pub classes: u32,
}

/// Check that a set size is a positive integer and convert it
fn check_set_size(name: &'static str, value: f64) -> Result<u32, ConfigError> {
    if value.is_finite() && value >= 1.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(ConfigError::InvalidSetSize { name, value })
    }
}

impl IndexSets {
    /// Create index sets from (possibly non-integral) configuration values.
    ///
    /// Fails if any size is non-positive or non-integral.
    pub fn new(scenarios: f64, periods: f64, years: f64, classes: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            scenarios: check_set_size("scenarios", scenarios)?,
            periods: check_set_size("periods", periods)?,
            years: check_set_size("years", years)?,
            classes: check_set_size("classes", classes)?,
        })
    }

    /// Scenario indices
    pub fn iter_scenarios(&self) -> RangeInclusive<u32> {
        1..=self.scenarios
    }

    /// Period indices
    pub fn iter_periods(&self) -> RangeInclusive<u32> {
        1..=self.periods
    }

    /// Project year indices
    pub fn iter_years(&self) -> RangeInclusive<u32> {
        1..=self.years
    }

    /// Class indices
    pub fn iter_classes(&self) -> RangeInclusive<u32> {
        1..=self.classes
    }

    /// Iterate over every index tuple in the given domain, in declaration order.
    ///
    /// The period index always varies fastest, so that storage recurrences are visited in time
    /// order for each scenario (and class).
    pub fn iter_domain(&self, domain: Domain) -> Box<dyn Iterator<Item = Index>> {
        let (scenarios, periods, classes) =
            (self.iter_scenarios(), self.iter_periods(), self.iter_classes());
        match domain {
            Domain::Global => Box::new(std::iter::once(Index::Global)),
            Domain::Class => Box::new(classes.map(Index::Class)),
            Domain::Scenario => Box::new(scenarios.map(Index::Scenario)),
            Domain::ScenarioClass => {
                Box::new(iproduct!(scenarios, classes).map(|(s, c)| Index::ScenarioClass(s, c)))
            }
            Domain::ScenarioPeriod => {
                Box::new(iproduct!(scenarios, periods).map(|(s, t)| Index::ScenarioPeriod(s, t)))
            }
            Domain::ScenarioClassPeriod => Box::new(
                iproduct!(scenarios, classes, periods)
                    .map(|(s, c, t)| Index::ScenarioClassPeriod(s, c, t)),
            ),
        }
    }

    /// Whether every component of an index lies within its set
    pub fn contains(&self, index: Index) -> bool {
        index.scenario().is_none_or(|s| (1..=self.scenarios).contains(&s))
            && index.class().is_none_or(|c| (1..=self.classes).contains(&c))
            && index.period().is_none_or(|t| (1..=self.periods).contains(&t))
    }

    /// The position of an index within the iteration order of its domain
    pub fn position(&self, index: Index) -> usize {
        let (classes, periods) = (self.classes as usize, self.periods as usize);
        let (s, c, t) = (
            index.scenario().map_or(0, |s| s as usize - 1),
            index.class().map_or(0, |c| c as usize - 1),
            index.period().map_or(0, |t| t as usize - 1),
        );
        match index.domain() {
            Domain::Global => 0,
            Domain::Class => c,
            Domain::Scenario => s,
            Domain::ScenarioClass => s * classes + c,
            Domain::ScenarioPeriod => s * periods + t,
            Domain::ScenarioClassPeriod => (s * classes + c) * periods + t,
        }
    }

    /// The number of index tuples in the given domain
    pub fn domain_size(&self, domain: Domain) -> usize {
        let (s, t, c) = (
            self.scenarios as usize,
            self.periods as usize,
            self.classes as usize,
        );
        match domain {
            Domain::Global => 1,
            Domain::Class => c,
            Domain::Scenario => s,
            Domain::ScenarioClass => s * c,
            Domain::ScenarioPeriod => s * t,
            Domain::ScenarioClassPeriod => s * c * t,
        }
    }
}

/// The cross-product of index sets over which an entity is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// A single, unindexed entity
    Global,
    /// One per class
    Class,
    /// One per scenario
    Scenario,
    /// One per (scenario, class)
    ScenarioClass,
    /// One per (scenario, period)
    ScenarioPeriod,
    /// One per (scenario, class, period)
    ScenarioClassPeriod,
}

/// A single index tuple. Fields are (scenario, class, period) where present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Index {
    /// Unindexed
    Global,
    /// Class `c`
    Class(u32),
    /// Scenario `s`
    Scenario(u32),
    /// Scenario `s`, class `c`
    ScenarioClass(u32, u32),
    /// Scenario `s`, period `t`
    ScenarioPeriod(u32, u32),
    /// Scenario `s`, class `c`, period `t`
    ScenarioClassPeriod(u32, u32, u32),
}

impl Index {
    /// The domain this index belongs to
    pub fn domain(self) -> Domain {
        match self {
            Self::Global => Domain::Global,
            Self::Class(_) => Domain::Class,
            Self::Scenario(_) => Domain::Scenario,
            Self::ScenarioClass(..) => Domain::ScenarioClass,
            Self::ScenarioPeriod(..) => Domain::ScenarioPeriod,
            Self::ScenarioClassPeriod(..) => Domain::ScenarioClassPeriod,
        }
    }

    /// The scenario component, if any
    pub fn scenario(self) -> Option<u32> {
        match self {
            Self::Scenario(s)
            | Self::ScenarioClass(s, _)
            | Self::ScenarioPeriod(s, _)
            | Self::ScenarioClassPeriod(s, _, _) => Some(s),
            _ => None,
        }
    }

    /// The class component, if any
    pub fn class(self) -> Option<u32> {
        match self {
            Self::Class(c) | Self::ScenarioClass(_, c) | Self::ScenarioClassPeriod(_, c, _) => {
                Some(c)
            }
            _ => None,
        }
    }

    /// The period component, if any
    pub fn period(self) -> Option<u32> {
        match self {
            Self::ScenarioPeriod(_, t) | Self::ScenarioClassPeriod(_, _, t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => Ok(()),
            Self::Class(c) => write!(f, "[c={c}]"),
            Self::Scenario(s) => write!(f, "[s={s}]"),
            Self::ScenarioClass(s, c) => write!(f, "[s={s},c={c}]"),
            Self::ScenarioPeriod(s, t) => write!(f, "[s={s},t={t}]"),
            Self::ScenarioClassPeriod(s, c, t) => write!(f, "[s={s},c={c},t={t}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rstest::rstest;

    #[test]
    fn test_index_sets_new() {
        let sets = IndexSets::new(2.0, 24.0, 20.0, 3.0).unwrap();
        assert_eq!(
            sets,
            IndexSets {
                scenarios: 2,
                periods: 24,
                years: 20,
                classes: 3
            }
        );
        assert_eq!(sets.iter_years().count(), 20);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(1.5)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_index_sets_invalid(#[case] periods: f64) {
        assert_eq!(
            IndexSets::new(1.0, periods, 1.0, 1.0).unwrap_err(),
            ConfigError::InvalidSetSize {
                name: "periods",
                value: periods
            }
        );
    }

    #[test]
    fn test_iter_domain_order() {
        let sets = IndexSets::new(2.0, 2.0, 1.0, 2.0).unwrap();
        assert_eq!(
            sets.iter_domain(Domain::ScenarioPeriod).collect_vec(),
            [
                Index::ScenarioPeriod(1, 1),
                Index::ScenarioPeriod(1, 2),
                Index::ScenarioPeriod(2, 1),
                Index::ScenarioPeriod(2, 2),
            ]
        );
        assert_eq!(
            sets.iter_domain(Domain::ScenarioClassPeriod).nth(2),
            Some(Index::ScenarioClassPeriod(1, 2, 1))
        );
    }

    #[rstest]
    #[case(Domain::Global)]
    #[case(Domain::Class)]
    #[case(Domain::Scenario)]
    #[case(Domain::ScenarioClass)]
    #[case(Domain::ScenarioPeriod)]
    #[case(Domain::ScenarioClassPeriod)]
    fn test_domain_size_matches_iteration(#[case] domain: Domain) {
        let sets = IndexSets::new(3.0, 5.0, 2.0, 2.0).unwrap();
        let indices = sets.iter_domain(domain).collect_vec();
        assert_eq!(indices.len(), sets.domain_size(domain));
        assert!(indices.iter().all(|index| index.domain() == domain));
        for (position, index) in indices.into_iter().enumerate() {
            assert_eq!(sets.position(index), position);
        }
    }

    #[test]
    fn test_index_components() {
        let index = Index::ScenarioClassPeriod(2, 3, 4);
        assert_eq!(index.scenario(), Some(2));
        assert_eq!(index.class(), Some(3));
        assert_eq!(index.period(), Some(4));
        assert_eq!(index.to_string(), "[s=2,c=3,t=4]");
        assert_eq!(Index::Global.scenario(), None);
    }

    #[test]
    fn test_contains() {
        let sets = IndexSets::new(2.0, 3.0, 1.0, 1.0).unwrap();
        assert!(sets.contains(Index::ScenarioPeriod(2, 3)));
        assert!(!sets.contains(Index::ScenarioPeriod(1, 4)));
        assert!(!sets.contains(Index::ScenarioClass(1, 2)));
        assert!(!sets.contains(Index::Scenario(0)));
        assert!(sets.contains(Index::Global));
    }
}
