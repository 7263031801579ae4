use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::debug;
use snafu::OptionExt;

use crate::waves::config_reader::WaveSource;
use crate::waves::{BadWaveDateSnafu, WavesResult};

/// Derives the fielding date from a wave identifier: the two-character
/// survey prefix is stripped and the remainder is parsed year-first.
pub fn wave_date(wave: &str) -> WavesResult<NaiveDate> {
    let digits = wave.get(2..).unwrap_or("");
    NaiveDate::parse_from_str(digits, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(digits, "%y%m%d"))
        .or_else(|_| NaiveDate::parse_from_str(digits, "%Y-%m-%d"))
        .ok()
        .context(BadWaveDateSnafu { wave })
}

/// The location of a wave's data file: an explicit path when the source
/// carries one, the `<wave>/<wave>.<ext>` directory convention otherwise.
pub fn wave_data_path(root: &Path, source: &WaveSource, ext: &str) -> PathBuf {
    match source.file_path.as_ref() {
        Some(p) => root.join(p),
        None => root
            .join(&source.wave)
            .join(format!("{}.{}", source.wave, ext)),
    }
}

/// The requested columns that actually exist in a wave's header, in
/// request order. Absent columns are silently skipped; the weight column
/// can never double as a question.
pub fn retained_columns(
    wanted: &[String],
    weight_idx: usize,
    position: impl Fn(&str) -> Option<usize>,
) -> Vec<(usize, String)> {
    let mut keep: Vec<(usize, String)> = Vec::new();
    for name in wanted {
        match position(name) {
            Some(col) if col != weight_idx => keep.push((col, name.clone())),
            Some(_) => {}
            None => {
                debug!("retained_columns: column {:?} not present", name);
            }
        }
    }
    keep
}
