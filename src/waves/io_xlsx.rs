// Reader for waves delivered as Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;

use chrono::NaiveDate;
use wave_tally::{CellValue, WaveTable, Weight};

use crate::waves::{io_common::retained_columns, *};

pub fn read_wave_xlsx(
    path: &str,
    date: NaiveDate,
    wanted: &[String],
    weight_column: &str,
    worksheet_name: &Option<String>,
) -> BWavesResult<WaveTable> {
    let wrange = get_range(path, worksheet_name)?;
    let header = wrange.rows().next().context(EmptyExcelSnafu {})?;
    debug!("read_wave_xlsx: header: {:?}", header);

    let names: Vec<Option<String>> = header
        .iter()
        .map(|dt| match dt {
            DataType::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .collect();
    let weight_idx = names
        .iter()
        .position(|h| h.as_deref() == Some(weight_column))
        .context(MissingWeightColumnSnafu {
            column: weight_column,
            path,
        })?;
    let keep = retained_columns(wanted, weight_idx, |name| {
        names.iter().position(|h| h.as_deref() == Some(name))
    });

    let mut iter = wrange.rows();
    iter.next();
    let mut cells: Vec<Vec<CellValue>> = Vec::new();
    let mut weights: Vec<Weight> = Vec::new();
    for (idx, row) in iter.enumerate() {
        // The header occupies the first line.
        let lineno = (idx + 2) as u64;
        let weight: Weight = match row.get(weight_idx) {
            Some(DataType::Float(f)) => *f,
            Some(DataType::Int(i)) => *i as f64,
            other => ExcelWrongCellTypeSnafu {
                lineno,
                content: format!("{:?}", other),
            }
            .fail()?,
        };
        let mut parsed: Vec<CellValue> = Vec::new();
        for (col, _) in keep.iter() {
            parsed.push(read_cell(row.get(*col), lineno)?);
        }
        cells.push(parsed);
        weights.push(weight);
    }
    debug!("read_wave_xlsx: {:?}: {} rows", path, cells.len());

    let columns = keep.into_iter().map(|(_, name)| name).collect();
    let table = WaveTable::new(date, columns, cells, weights).context(TallySnafu {})?;
    Ok(table)
}

fn read_cell(cell: Option<&DataType>, lineno: u64) -> BWavesResult<CellValue> {
    match cell {
        Some(DataType::String(s)) if s.trim().is_empty() => Ok(CellValue::Missing),
        Some(DataType::String(s)) => Ok(CellValue::Text(s.trim().to_string())),
        Some(DataType::Float(f)) => Ok(CellValue::Number(*f)),
        Some(DataType::Int(i)) => Ok(CellValue::Number(*i as f64)),
        Some(DataType::Bool(b)) => Ok(CellValue::Text(b.to_string())),
        Some(DataType::Empty) | None => Ok(CellValue::Missing),
        other => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", other),
        }
        .fail()?,
    }
}

fn get_range(path: &str, worksheet_name_o: &Option<String>) -> BWavesResult<calamine::Range<DataType>> {
    debug!(
        "read_wave_xlsx: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> =
        open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu {}.fail()?,
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_wave_xlsx: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => AmbiguousWorksheetSnafu { path }.fail()?,
        }
    }
}
