//! Error types raised while declaring and populating a model.
//!
//! Configuration and data errors are unrecoverable: they abort model construction and carry the
//! name and index of whatever was wrong. Problems with the solve itself are reported through
//! [`crate::solver::SolveStatus`] and [`crate::solver::ModelError`] instead.
use crate::time_series::Series;
use std::error::Error;
use std::fmt;

/// Invalid or inconsistent model configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// An index set was given a size which is not a positive integer
    InvalidSetSize {
        /// Name of the index set
        name: &'static str,
        /// The offending value
        value: f64,
    },
    /// A scalar parameter lies outside its permitted range
    OutOfRange {
        /// Name of the parameter
        name: String,
        /// The offending value
        value: f64,
        /// Description of the permitted range
        expected: &'static str,
    },
    /// A vector parameter has the wrong number of entries
    LengthMismatch {
        /// Name of the parameter
        name: &'static str,
        /// Number of entries required by the index sets
        expected: usize,
        /// Number of entries supplied
        found: usize,
    },
    /// Lower bound on a capacity exceeds the upper bound (or either is negative)
    InvalidCapacityLimits {
        /// The component whose capacity is limited
        component: &'static str,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// A parameter override refers to a parameter which does not exist
    UnknownParameter(String),
    /// A parameter override could not be parsed
    InvalidOverride(String),
    /// A solver option is not supported or has a value of the wrong type
    InvalidSolverOption {
        /// Name of the option
        name: String,
        /// The raw value supplied
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSetSize { name, value } => {
                write!(f, "Size of set '{name}' must be a positive integer (got {value})")
            }
            Self::OutOfRange {
                name,
                value,
                expected,
            } => write!(f, "Parameter '{name}' must be {expected} (got {value})"),
            Self::LengthMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "Parameter '{name}' must have {expected} entries (got {found})"
            ),
            Self::InvalidCapacityLimits {
                component,
                min,
                max,
            } => write!(
                f,
                "Invalid capacity limits for {component}: need 0 <= min <= max (got min = {min}, \
                max = {max})"
            ),
            Self::UnknownParameter(name) => write!(f, "Unknown parameter '{name}'"),
            Self::InvalidOverride(raw) => {
                write!(f, "Invalid parameter override '{raw}': expected name=value")
            }
            Self::InvalidSolverOption { name, value } => {
                write!(f, "Invalid value '{value}' for solver option '{name}'")
            }
        }
    }
}

impl Error for ConfigError {}

/// Missing or malformed time-series data
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    /// The table has no value for the requested index
    MissingValue {
        /// The series being looked up
        series: Series,
        /// Scenario index (1-based)
        scenario: u32,
        /// Class index (1-based), for class-indexed series
        class: Option<u32>,
        /// Period index (1-based)
        period: u32,
    },
    /// A cell of the table could not be parsed as a number
    Malformed {
        /// The series being read
        series: Series,
        /// Data row (1-based, excluding the header)
        row: usize,
        /// Column (1-based, excluding the period label)
        column: usize,
        /// The raw cell contents
        value: String,
    },
    /// A row has a different number of columns from the header
    RaggedRow {
        /// The series being read
        series: Series,
        /// Data row (1-based, excluding the header)
        row: usize,
        /// Number of value columns in the header
        expected: usize,
        /// Number of value columns in this row
        found: usize,
    },
    /// The table does not have one row per period and one column per scenario (and class)
    Shape {
        /// The series being read
        series: Series,
        /// Required number of rows
        expected_rows: usize,
        /// Required number of value columns
        expected_columns: usize,
        /// Number of rows found
        rows: usize,
        /// Number of value columns found
        columns: usize,
    },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValue {
                series,
                scenario,
                class: Some(class),
                period,
            } => write!(
                f,
                "No {series} value for scenario {scenario}, class {class}, period {period}"
            ),
            Self::MissingValue {
                series,
                scenario,
                class: None,
                period,
            } => write!(
                f,
                "No {series} value for scenario {scenario}, period {period}"
            ),
            Self::Malformed {
                series,
                row,
                column,
                value,
            } => write!(
                f,
                "Invalid {series} value '{value}' at row {row}, column {column}"
            ),
            Self::RaggedRow {
                series,
                row,
                expected,
                found,
            } => write!(
                f,
                "Row {row} of {series} table has {found} values, but {expected} were expected"
            ),
            Self::Shape {
                series,
                expected_rows,
                expected_columns,
                rows,
                columns,
            } => write!(
                f,
                "The {series} table must have {expected_rows} rows and {expected_columns} value \
                columns (found {rows} rows and {columns} columns)"
            ),
        }
    }
}

impl Error for DataError {}
