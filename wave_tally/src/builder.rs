pub use crate::config::*;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;

use crate::preprocess;

// A recurring clerical error in the source data: one wave keyed the
// category with a lowercase 's'. The two spellings are merged under the
// canonical one.
const NOT_SURE_MISKEYED: &str = "Not sure";
const NOT_SURE: &str = "Not Sure";

/// A builder folding per-wave tables into per-question series.
///
/// Waves are added one at a time so that a raw table can be dropped as
/// soon as its tallies have been extracted.
///
/// ```
/// pub use wave_tally::builder::SeriesBuilder;
/// pub use wave_tally::{CellValue, WaveTable};
/// # use wave_tally::TallyError;
/// use chrono::NaiveDate;
///
/// let mut builder = SeriesBuilder::new(&["vote_intention".to_string()])?;
///
/// let date = NaiveDate::from_ymd_opt(2020, 6, 25).unwrap();
/// let table = WaveTable::new(
///     date,
///     vec!["vote_intention".to_string()],
///     vec![
///         vec![CellValue::Text("Yes".to_string())],
///         vec![CellValue::Text("No".to_string())],
///     ],
///     vec![2.0, 3.0],
/// )?;
/// builder.add_wave(&table)?;
///
/// let series = builder.build();
/// assert_eq!(series["vote_intention"].value(date, "Yes"), Some(2.0));
/// # Ok::<(), TallyError>(())
/// ```
pub struct SeriesBuilder {
    // One accumulator per requested question, even if no wave ever
    // fielded it: such a question builds into an empty series.
    pub(crate) acc: BTreeMap<String, BTreeMap<NaiveDate, ResponseTally>>,
}

impl SeriesBuilder {
    pub fn new(questions: &[String]) -> Result<SeriesBuilder, TallyError> {
        let acc = questions
            .iter()
            .map(|q| (q.clone(), BTreeMap::new()))
            .collect();
        Ok(SeriesBuilder { acc })
    }

    /// Folds one wave into the accumulators.
    ///
    /// A requested question absent from this wave's columns is skipped for
    /// this wave only. Adding two tables with the same date merges their
    /// tallies by summing.
    pub fn add_wave(&mut self, table: &WaveTable) -> Result<(), TallyError> {
        for (question, by_date) in self.acc.iter_mut() {
            if table.column_index(question).is_none() {
                debug!(
                    "add_wave: question {:?} not fielded in wave {}",
                    question, table.date
                );
                continue;
            }
            let wave_tally = crate::weighted_tally(table, question)?;
            let tally = by_date.entry(table.date).or_default();
            for (label, w) in wave_tally {
                *tally.entry(corrected_label(label)).or_insert(0.0) += w;
            }
        }
        Ok(())
    }

    /// Runs every accumulator through [preprocess] and returns the series,
    /// keyed by question identifier.
    pub fn build(self) -> BTreeMap<String, QuestionSeries> {
        self.acc
            .into_iter()
            .map(|(question, by_date)| {
                let series = preprocess(&question, &by_date);
                (question, series)
            })
            .collect()
    }
}

fn corrected_label(label: String) -> String {
    if label == NOT_SURE_MISKEYED {
        NOT_SURE.to_string()
    } else {
        label
    }
}
