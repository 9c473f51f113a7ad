//! Code for reading the time-series tables of a model.
use super::input_err_msg;
use crate::error::DataError;
use crate::model::parameters::InputFiles;
use crate::sets::IndexSets;
use crate::time_series::{Series, TimeSeries, TimeSeriesTable, round_value};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// The delimiter used in time-series files
const DELIMITER: u8 = b';';

/// Read the four time-series tables from the model directory.
///
/// Each file must have a header row and one row per period. The first column holds a period label
/// and is ignored; the remaining columns hold one value per scenario (electric demand and RES
/// yield) or per (scenario, class) pair in scenario-major order (thermal demand and collector
/// yield). Values are rounded to three decimal places.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `sets` - The model's index sets, used to check the shape of each table
/// * `files` - The file names of the tables
pub fn read_time_series(model_dir: &Path, sets: &IndexSets, files: &InputFiles) -> Result<TimeSeries> {
    let read = |series, file_name: &str| {
        let file_path = model_dir.join(file_name);
        read_table_from_path(&file_path, series, sets).with_context(|| input_err_msg(&file_path))
    };

    Ok(TimeSeries {
        electric_demand: read(Series::ElectricDemand, &files.electric_demand)?,
        thermal_demand: read(Series::ThermalDemand, &files.thermal_demand)?,
        res_yield: read(Series::ResYield, &files.res_yield)?,
        collector_yield: read(Series::CollectorYield, &files.collector_yield)?,
        classes: sets.classes,
    })
}

/// Read a single table from a file and check its shape
fn read_table_from_path(file_path: &Path, series: Series, sets: &IndexSets) -> Result<TimeSeriesTable> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    let table = read_table(reader, series)?;

    let expected_columns = if series.is_class_indexed() {
        sets.scenarios as usize * sets.classes as usize
    } else {
        sets.scenarios as usize
    };
    let expected_rows = sets.periods as usize;
    if table.num_rows() != expected_rows || table.num_columns() != expected_columns {
        Err(DataError::Shape {
            series,
            expected_rows,
            expected_columns,
            rows: table.num_rows(),
            columns: table.num_columns(),
        })?;
    }

    Ok(table)
}

/// Read a table of values from a CSV reader, skipping the first (label) column
fn read_table<R: Read>(mut reader: csv::Reader<R>, series: Series) -> Result<TimeSeriesTable> {
    let num_columns = reader.headers()?.len().saturating_sub(1);

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = row_idx + 1;
        let found = record.len().saturating_sub(1);
        if found != num_columns {
            Err(DataError::RaggedRow {
                series,
                row,
                expected: num_columns,
                found,
            })?;
        }

        let values = record
            .iter()
            .skip(1)
            .enumerate()
            .map(|(col_idx, cell)| {
                cell.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .map(round_value)
                    .ok_or_else(|| DataError::Malformed {
                        series,
                        row,
                        column: col_idx + 1,
                        value: cell.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(values);
    }

    Ok(TimeSeriesTable::from_rows(rows))
}
