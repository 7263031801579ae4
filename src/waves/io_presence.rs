// Reader for the question-presence metadata files.
//
// These files carry a fixed-size preamble (notes from the data release),
// then a header row whose first cell is unnamed and whose remaining cells
// are wave identifiers, then one row per question with per-wave presence
// indicators.

use std::collections::BTreeMap;

use log::debug;

use wave_tally::PresenceMatrix;

use crate::waves::*;

pub fn read_presence_csv(path: &str, skip_rows: usize) -> BWavesResult<PresenceMatrix> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    let mut records = rdr.into_records();
    for _ in 0..skip_rows {
        let _ = records.next();
    }

    let header = match records.next() {
        Some(record_r) => record_r.context(CsvRecordSnafu {
            lineno: skip_rows + 1,
        })?,
        None => EmptyMetadataSnafu { path }.fail()?,
    };
    let waves: Vec<String> = header
        .iter()
        .skip(1)
        .map(|s| s.trim().to_string())
        .collect();

    let mut rows: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for (idx, record_r) in records.enumerate() {
        let lineno = idx + skip_rows + 2;
        let record = record_r.context(CsvRecordSnafu { lineno })?;
        let question = match record.get(0) {
            Some(q) if !q.trim().is_empty() => q.trim().to_string(),
            _ => continue,
        };
        let flags: Vec<u8> = (0..waves.len())
            .map(|col| presence_flag(record.get(col + 1).unwrap_or("")))
            .collect();
        rows.insert(question, flags);
    }
    debug!(
        "read_presence_csv: {:?}: {} questions over {} waves",
        path,
        rows.len(),
        waves.len()
    );
    Ok(PresenceMatrix { waves, rows })
}

// A presence cell is empty (absent), a number (zero means absent) or an
// arbitrary marker (present).
fn presence_flag(raw: &str) -> u8 {
    let s = raw.trim();
    if s.is_empty() {
        return 0;
    }
    match s.parse::<f64>() {
        Ok(x) if x != 0.0 => 1,
        Ok(_) => 0,
        Err(_) => 1,
    }
}
