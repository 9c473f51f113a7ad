//! Time-series parameters supplied by external tables.
//!
//! Each table has one row per period and one column per scenario (for electric series) or per
//! (scenario, class) pair (for thermal series). Values are looked up through the [`SeriesLookup`]
//! trait so that the model can be populated from any source, not only from files.
use crate::error::DataError;
use strum::{Display, EnumIter};

/// The externally supplied time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Series {
    /// Electric demand per (scenario, period)
    #[strum(serialize = "electric demand")]
    ElectricDemand,
    /// Thermal demand per (scenario, class, period)
    #[strum(serialize = "thermal demand")]
    ThermalDemand,
    /// Energy yield of one renewable unit per (scenario, period)
    #[strum(serialize = "RES yield")]
    ResYield,
    /// Energy yield of one solar collector unit per (scenario, class, period)
    #[strum(serialize = "collector yield")]
    CollectorYield,
}

impl Series {
    /// Whether the series has a column per (scenario, class) rather than per scenario
    pub fn is_class_indexed(self) -> bool {
        matches!(self, Self::ThermalDemand | Self::CollectorYield)
    }
}

/// Resolves a single time-series value
pub trait SeriesLookup {
    /// Look up the value of `series` for the given scenario, period and (for thermal series)
    /// class.
    ///
    /// All indices are 1-based. Fails with a [`DataError`] if the backing data has no such entry.
    fn lookup(
        &self,
        series: Series,
        scenario: u32,
        period: u32,
        class: Option<u32>,
    ) -> Result<f64, DataError>;
}

/// Round a value to three decimal places, as done for all input series
pub fn round_value(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// A dense table of values with one row per period
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeriesTable {
    values: Vec<f64>,
    num_columns: usize,
}

impl TimeSeriesTable {
    /// Create a table from its rows.
    ///
    /// All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let num_columns = rows.first().map_or(0, Vec::len);
        assert!(
            rows.iter().all(|row| row.len() == num_columns),
            "All rows of a time-series table must have the same length"
        );

        Self {
            values: rows.into_iter().flatten().collect(),
            num_columns,
        }
    }

    /// The number of rows (periods)
    pub fn num_rows(&self) -> usize {
        if self.num_columns == 0 {
            0
        } else {
            self.values.len() / self.num_columns
        }
    }

    /// The number of value columns
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Get the value at the given 1-based row and column
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row == 0 || column == 0 || row > self.num_rows() || column > self.num_columns {
            return None;
        }

        self.values
            .get((row - 1) * self.num_columns + column - 1)
            .copied()
    }
}

/// The four time-series tables of a model
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Electric demand
    pub electric_demand: TimeSeriesTable,
    /// Thermal demand
    pub thermal_demand: TimeSeriesTable,
    /// Yield of one renewable unit
    pub res_yield: TimeSeriesTable,
    /// Yield of one solar collector unit
    pub collector_yield: TimeSeriesTable,
    /// Number of classes, used to address the columns of class-indexed tables
    pub classes: u32,
}

impl TimeSeries {
    /// The table backing the given series
    pub fn table(&self, series: Series) -> &TimeSeriesTable {
        match series {
            Series::ElectricDemand => &self.electric_demand,
            Series::ThermalDemand => &self.thermal_demand,
            Series::ResYield => &self.res_yield,
            Series::CollectorYield => &self.collector_yield,
        }
    }
}

/// Get the 1-based column holding the given scenario (and class).
///
/// Class-indexed tables are laid out in scenario-major blocks, so that the column for
/// (scenario, class) is `(scenario - 1) * classes + class`.
pub fn column_for(series: Series, scenario: u32, class: Option<u32>, classes: u32) -> Option<usize> {
    if scenario == 0 {
        return None;
    }

    match (series.is_class_indexed(), class) {
        (false, None) => Some(scenario as usize),
        (true, Some(class)) if (1..=classes).contains(&class) => {
            Some((scenario as usize - 1) * classes as usize + class as usize)
        }
        _ => None,
    }
}

impl SeriesLookup for TimeSeries {
    fn lookup(
        &self,
        series: Series,
        scenario: u32,
        period: u32,
        class: Option<u32>,
    ) -> Result<f64, DataError> {
        column_for(series, scenario, class, self.classes)
            .and_then(|column| self.table(series).get(period as usize, column))
            .ok_or(DataError::MissingValue {
                series,
                scenario,
                class,
                period,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn time_series() -> TimeSeries {
        // Two scenarios, two classes, three periods
        let thermal = TimeSeriesTable::from_rows(vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![5.0, 6.0, 7.0, 8.0],
            vec![9.0, 10.0, 11.0, 12.0],
        ]);
        TimeSeries {
            electric_demand: TimeSeriesTable::from_rows(vec![
                vec![10.0, 20.0],
                vec![11.0, 21.0],
                vec![12.0, 22.0],
            ]),
            thermal_demand: thermal.clone(),
            res_yield: TimeSeriesTable::from_rows(vec![vec![0.0, 0.5]; 3]),
            collector_yield: thermal,
            classes: 2,
        }
    }

    #[rstest]
    #[case(1.23449, 1.234)]
    #[case(1.2345001, 1.235)]
    #[case(-0.0004, -0.0)]
    fn test_round_value(#[case] value: f64, #[case] expected: f64) {
        assert_eq!(round_value(value), expected);
    }

    #[test]
    fn test_table_get() {
        let table = TimeSeriesTable::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.get(2, 1), Some(3.0));
        assert_eq!(table.get(0, 1), None);
        assert_eq!(table.get(3, 1), None);
        assert_eq!(table.get(1, 3), None);
    }

    #[rstest]
    #[case(1, 1, 1)]
    #[case(1, 2, 2)]
    #[case(2, 1, 3)]
    #[case(2, 2, 4)]
    fn test_column_for_class_indexed(
        #[case] scenario: u32,
        #[case] class: u32,
        #[case] expected: usize,
    ) {
        assert_eq!(
            column_for(Series::ThermalDemand, scenario, Some(class), 2),
            Some(expected)
        );
    }

    #[test]
    fn test_column_for_invalid() {
        assert_eq!(column_for(Series::ThermalDemand, 1, None, 2), None);
        assert_eq!(column_for(Series::ThermalDemand, 1, Some(3), 2), None);
        assert_eq!(column_for(Series::ElectricDemand, 1, Some(1), 2), None);
        assert_eq!(column_for(Series::ElectricDemand, 0, None, 2), None);
    }

    #[rstest]
    fn test_lookup(time_series: TimeSeries) {
        assert_eq!(
            time_series.lookup(Series::ElectricDemand, 2, 3, None),
            Ok(22.0)
        );
        assert_eq!(
            time_series.lookup(Series::ThermalDemand, 2, 2, Some(1)),
            Ok(7.0)
        );
        assert_eq!(time_series.lookup(Series::ResYield, 2, 1, None), Ok(0.5));
    }

    #[rstest]
    fn test_lookup_missing(time_series: TimeSeries) {
        assert_eq!(
            time_series.lookup(Series::CollectorYield, 3, 1, Some(1)),
            Err(DataError::MissingValue {
                series: Series::CollectorYield,
                scenario: 3,
                class: Some(1),
                period: 1
            })
        );
        assert!(time_series.lookup(Series::ElectricDemand, 1, 4, None).is_err());
    }
}
