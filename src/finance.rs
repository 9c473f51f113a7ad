//! General functions related to finance.
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy};

/// Calculates the factor by which a cost incurred `years` into the future is discounted.
///
/// The factor is `1 / (1 + discount_rate)^years`.
pub fn discount_factor(discount_rate: Dimensionless, years: f64) -> Dimensionless {
    Dimensionless(1.0) / (Dimensionless(1.0) + discount_rate).powf(years)
}

/// Calculates the sum of discount factors over the given project years.
///
/// Multiplying a recurring annual cost by this factor gives its present value over the lifetime
/// of the project.
pub fn present_value_factor(discount_rate: Dimensionless, project_years: &[u32]) -> Dimensionless {
    project_years
        .iter()
        .map(|&year| discount_factor(discount_rate, f64::from(year)))
        .sum()
}

/// Calculates a levelised cost from a discounted cost and a discounted amount of energy.
///
/// Returns `None` if no energy is delivered.
pub fn levelised_cost(discounted_cost: Money, discounted_energy: Energy) -> Option<MoneyPerEnergy> {
    (discounted_energy > Energy(0.0)).then(|| discounted_cost / discounted_energy)
}
