// Primitives for reading CSV wave files.

use log::debug;

use chrono::NaiveDate;
use wave_tally::{CellValue, WaveTable, Weight};

use crate::waves::{io_common::retained_columns, *};

/// Reads one wave of microdata from a CSV file.
///
/// The header row names the columns. Only the `wanted` columns that exist
/// in this wave are retained (a wave may simply not have fielded a
/// question); the weight column is required and read separately.
pub fn read_wave_csv(
    path: &str,
    date: NaiveDate,
    wanted: &[String],
    weight_column: &str,
) -> BWavesResult<WaveTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    let headers = rdr.headers().context(OpeningCsvSnafu { path })?.clone();

    let weight_idx = headers
        .iter()
        .position(|h| h == weight_column)
        .context(MissingWeightColumnSnafu {
            column: weight_column,
            path,
        })?;
    let keep = retained_columns(wanted, weight_idx, |name| {
        headers.iter().position(|h| h == name)
    });

    let mut cells: Vec<Vec<CellValue>> = Vec::new();
    let mut weights: Vec<Weight> = Vec::new();
    for (idx, record_r) in rdr.into_records().enumerate() {
        // The header occupies the first line.
        let lineno = idx + 2;
        let record = record_r.context(CsvRecordSnafu { lineno })?;
        let raw_weight = record
            .get(weight_idx)
            .context(CsvLineTooShortSnafu { lineno })?;
        let weight: Weight = raw_weight
            .trim()
            .parse::<f64>()
            .ok()
            .context(BadWeightSnafu { lineno, path })?;
        let row: Vec<CellValue> = keep
            .iter()
            .map(|(col, _)| parse_cell(record.get(*col).unwrap_or("")))
            .collect();
        cells.push(row);
        weights.push(weight);
    }
    debug!("read_wave_csv: {:?}: {} rows", path, cells.len());

    let columns = keep.into_iter().map(|(_, name)| name).collect();
    let table = WaveTable::new(date, columns, cells, weights).context(TallySnafu {})?;
    Ok(table)
}

pub(crate) fn parse_cell(raw: &str) -> CellValue {
    let s = raw.trim();
    if s.is_empty() {
        CellValue::Missing
    } else if let Ok(x) = s.parse::<f64>() {
        CellValue::Number(x)
    } else {
        CellValue::Text(s.to_string())
    }
}
