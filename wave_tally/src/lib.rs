mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

pub use crate::builder::SeriesBuilder;
pub use crate::config::*;

/// The sentinel category marking a question that was not fielded to a
/// respondent. It is dropped before totals are computed.
pub const NOT_ASKED: &str = "Not Asked";

/// The name of the appended total column, as the rendering layer expects it.
pub const TOTAL: &str = "Total";

/// Groups the rows of one wave by a question's response value and sums the
/// weights per group.
///
/// Missing cells are not counted. Numeric codes are tallied under their
/// canonical text rendering.
pub fn weighted_tally(table: &WaveTable, question: &str) -> Result<ResponseTally, TallyError> {
    let col = table
        .column_index(question)
        .ok_or_else(|| TallyError::MissingColumn {
            column: question.to_string(),
        })?;
    let mut tally = ResponseTally::new();
    for (row, w) in table.cells.iter().zip(table.weights.iter()) {
        if let Some(label) = row.get(col).and_then(|c| c.label()) {
            *tally.entry(label).or_insert(0.0) += *w;
        }
    }
    Ok(tally)
}

/// Reorients accumulated per-wave tallies into a [QuestionSeries]: wave
/// dates become rows, the category set is unioned across waves with an
/// explicit zero fill, the [NOT_ASKED] sentinel is dropped, and the
/// row-wise total is appended.
///
/// An accumulator with no waves yields an empty series. That is a valid
/// result, not an error: it is what a question that was never fielded
/// looks like.
pub fn preprocess(
    question: &str,
    tallies: &BTreeMap<NaiveDate, ResponseTally>,
) -> QuestionSeries {
    let mut categories: BTreeSet<String> = BTreeSet::new();
    for tally in tallies.values() {
        for category in tally.keys() {
            categories.insert(category.clone());
        }
    }
    categories.remove(NOT_ASKED);
    let categories: Vec<String> = categories.into_iter().collect();

    let rows: Vec<SeriesRow> = tallies
        .iter()
        .map(|(date, tally)| {
            let values: Vec<Weight> = categories
                .iter()
                .map(|c| tally.get(c).copied().unwrap_or(0.0))
                .collect();
            let total = values.iter().sum();
            SeriesRow {
                date: *date,
                values,
                total,
            }
        })
        .collect();

    debug!(
        "preprocess: question {:?}: {} waves, {} categories",
        question,
        rows.len(),
        categories.len()
    );
    QuestionSeries {
        question: question.to_string(),
        categories,
        rows,
    }
}

/// Breaks down how the affinity groups of `group_by` responded to
/// `question`, through a weighted tally over one wave's table.
///
/// Only text-valued cells of the grouping column define groups: numeric
/// codes and missing values are not affinity labels and their rows are
/// left out. The output is sparse; combinations never observed stay
/// absent.
pub fn compare(
    table: &WaveTable,
    question: &str,
    group_by: &str,
) -> Result<ComparisonTable, TallyError> {
    let q_col = table
        .column_index(question)
        .ok_or_else(|| TallyError::MissingColumn {
            column: question.to_string(),
        })?;
    let g_col = table
        .column_index(group_by)
        .ok_or_else(|| TallyError::MissingColumn {
            column: group_by.to_string(),
        })?;

    let groups: BTreeSet<String> = table
        .cells
        .iter()
        .filter_map(|row| row.get(g_col).and_then(|c| c.as_text()))
        .map(|s| s.to_string())
        .collect();

    let mut rows: BTreeMap<String, BTreeMap<String, Weight>> = BTreeMap::new();
    for (row, w) in table.cells.iter().zip(table.weights.iter()) {
        let group = match row.get(g_col).and_then(|c| c.as_text()) {
            Some(g) => g.to_string(),
            None => continue,
        };
        let label = match row.get(q_col).and_then(|c| c.label()) {
            Some(l) => l,
            None => continue,
        };
        *rows.entry(label).or_default().entry(group).or_insert(0.0) += *w;
    }

    info!(
        "compare: question {:?} by {:?}: {} groups, {} responses",
        question,
        group_by,
        groups.len(),
        rows.len()
    );
    Ok(ComparisonTable {
        question: question.to_string(),
        groups: groups.into_iter().collect(),
        rows,
    })
}

/// Fuses two presence matrices by outer union on the question identifier
/// (missing flags count as zero), sums each question's flags across the
/// waves of both, and ranks the questions by descending wave count.
/// Ties are broken by question identifier to keep the ranking stable.
pub fn audit_presence(meta1: &PresenceMatrix, meta2: &PresenceMatrix) -> Vec<(String, u64)> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for matrix in [meta1, meta2] {
        for (question, flags) in matrix.rows.iter() {
            let present: u64 = flags.iter().map(|f| *f as u64).sum();
            *counts.entry(question.clone()).or_insert(0) += present;
        }
    }
    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn table(d: NaiveDate, columns: &[&str], rows: Vec<(Vec<CellValue>, Weight)>) -> WaveTable {
        let (cells, weights): (Vec<Vec<CellValue>>, Vec<Weight>) = rows.into_iter().unzip();
        WaveTable::new(
            d,
            columns.iter().map(|c| c.to_string()).collect(),
            cells,
            weights,
        )
        .unwrap()
    }

    fn strings(ss: &[&str]) -> Vec<String> {
        ss.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn preprocess_fills_gaps_with_zero_and_totals() {
        let mut tallies: BTreeMap<NaiveDate, ResponseTally> = BTreeMap::new();
        tallies.insert(
            date(2020, 6, 25),
            [("Yes".to_string(), 2.0), ("No".to_string(), 3.0)].into(),
        );
        tallies.insert(date(2020, 7, 2), [("Yes".to_string(), 5.0)].into());

        let series = preprocess("q1", &tallies);
        assert_eq!(series.categories, strings(&["No", "Yes"]));
        assert_eq!(series.columns(), strings(&["No", "Yes", TOTAL]));
        // Every cell is present, absent observations are explicit zeros.
        for row in series.rows.iter() {
            assert_eq!(row.values.len(), series.categories.len());
            assert_eq!(row.total, row.values.iter().sum::<f64>());
        }
        assert_eq!(series.value(date(2020, 7, 2), "No"), Some(0.0));
        assert_eq!(series.value(date(2020, 7, 2), "Yes"), Some(5.0));
    }

    #[test]
    fn preprocess_drops_not_asked_before_totaling() {
        let mut tallies: BTreeMap<NaiveDate, ResponseTally> = BTreeMap::new();
        tallies.insert(
            date(2020, 6, 25),
            [
                ("Yes".to_string(), 2.0),
                (NOT_ASKED.to_string(), 40.0),
            ]
            .into(),
        );
        let series = preprocess("q1", &tallies);
        assert_eq!(series.categories, strings(&["Yes"]));
        assert_eq!(series.rows[0].total, 2.0);
    }

    #[test]
    fn preprocess_totals_are_idempotent() {
        let mut tallies: BTreeMap<NaiveDate, ResponseTally> = BTreeMap::new();
        tallies.insert(
            date(2020, 6, 25),
            [("Yes".to_string(), 2.0), ("No".to_string(), 3.0)].into(),
        );
        tallies.insert(date(2020, 7, 2), [("No".to_string(), 4.0)].into());
        let series = preprocess("q1", &tallies);

        // Feed the zero-filled output (minus the total) back through:
        // the same totals come out.
        let mut back: BTreeMap<NaiveDate, ResponseTally> = BTreeMap::new();
        for row in series.rows.iter() {
            let tally: ResponseTally = series
                .categories
                .iter()
                .cloned()
                .zip(row.values.iter().copied())
                .collect();
            back.insert(row.date, tally);
        }
        let again = preprocess("q1", &back);
        assert_eq!(series, again);
    }

    #[test]
    fn builder_aggregates_two_waves() {
        let w1 = table(
            date(2020, 6, 25),
            &["q1"],
            vec![(vec![text("Yes")], 2.0), (vec![text("No")], 3.0)],
        );
        let w2 = table(date(2020, 7, 2), &["q1"], vec![(vec![text("Yes")], 5.0)]);

        let mut builder = SeriesBuilder::new(&strings(&["q1"])).unwrap();
        builder.add_wave(&w1).unwrap();
        builder.add_wave(&w2).unwrap();
        let out = builder.build();
        let series = &out["q1"];

        assert_eq!(series.value(date(2020, 6, 25), "Yes"), Some(2.0));
        assert_eq!(series.value(date(2020, 6, 25), "No"), Some(3.0));
        assert_eq!(series.rows[0].total, 5.0);
        assert_eq!(series.value(date(2020, 7, 2), "Yes"), Some(5.0));
        assert_eq!(series.value(date(2020, 7, 2), "No"), Some(0.0));
        assert_eq!(series.rows[1].total, 5.0);
    }

    #[test]
    fn builder_skips_questions_missing_from_a_wave() {
        let w1 = table(
            date(2020, 6, 25),
            &["q1", "q2"],
            vec![(vec![text("Yes"), text("Blue")], 2.0)],
        );
        let w2 = table(date(2020, 7, 2), &["q1"], vec![(vec![text("No")], 1.5)]);

        let mut builder = SeriesBuilder::new(&strings(&["q1", "q2"])).unwrap();
        builder.add_wave(&w1).unwrap();
        builder.add_wave(&w2).unwrap();
        let series = builder.build();

        // q2 only has the one wave where it was fielded.
        assert_eq!(series["q2"].rows.len(), 1);
        assert_eq!(series["q1"].rows.len(), 2);
    }

    #[test]
    fn builder_requesting_a_superset_changes_nothing() {
        let w1 = table(
            date(2020, 6, 25),
            &["q1", "q2"],
            vec![
                (vec![text("Yes"), text("Blue")], 2.0),
                (vec![text("No"), text("Red")], 3.0),
            ],
        );

        let mut direct = SeriesBuilder::new(&strings(&["q1"])).unwrap();
        direct.add_wave(&w1).unwrap();
        let direct = builder_output(direct, "q1");

        let mut superset = SeriesBuilder::new(&strings(&["q1", "q2", "q_missing"])).unwrap();
        superset.add_wave(&w1).unwrap();
        let kept = builder_output(superset, "q1");

        assert_eq!(direct, kept);
    }

    fn builder_output(builder: SeriesBuilder, question: &str) -> QuestionSeries {
        builder.build().remove(question).unwrap()
    }

    #[test]
    fn builder_merges_the_not_sure_spellings() {
        let w1 = table(
            date(2020, 6, 25),
            &["q1"],
            vec![
                (vec![text("Not sure")], 1.0),
                (vec![text("Not Sure")], 2.0),
            ],
        );
        let mut builder = SeriesBuilder::new(&strings(&["q1"])).unwrap();
        builder.add_wave(&w1).unwrap();
        let out = builder.build();
        let series = &out["q1"];

        assert_eq!(series.categories, strings(&["Not Sure"]));
        assert_eq!(series.value(date(2020, 6, 25), "Not Sure"), Some(3.0));
    }

    #[test]
    fn builder_unfielded_question_yields_empty_series() {
        let w1 = table(date(2020, 6, 25), &["q1"], vec![(vec![text("Yes")], 2.0)]);
        let mut builder = SeriesBuilder::new(&strings(&["q_absent"])).unwrap();
        builder.add_wave(&w1).unwrap();
        let out = builder.build();
        let series = &out["q_absent"];
        assert!(series.is_empty());
        assert!(series.categories.is_empty());
    }

    #[test]
    fn builder_merges_duplicate_wave_dates() {
        let d = date(2020, 6, 25);
        let w1 = table(d, &["q1"], vec![(vec![text("Yes")], 2.0)]);
        let w2 = table(d, &["q1"], vec![(vec![text("Yes")], 1.0)]);
        let mut builder = SeriesBuilder::new(&strings(&["q1"])).unwrap();
        builder.add_wave(&w1).unwrap();
        builder.add_wave(&w2).unwrap();
        let out = builder.build();
        let series = &out["q1"];
        assert_eq!(series.rows.len(), 1);
        assert_eq!(series.value(d, "Yes"), Some(3.0));
    }

    #[test]
    fn builder_skips_missing_cells() {
        let w1 = table(
            date(2020, 6, 25),
            &["q1"],
            vec![
                (vec![text("Yes")], 2.0),
                (vec![CellValue::Missing], 7.0),
            ],
        );
        let mut builder = SeriesBuilder::new(&strings(&["q1"])).unwrap();
        builder.add_wave(&w1).unwrap();
        let out = builder.build();
        let series = &out["q1"];
        assert_eq!(series.rows[0].total, 2.0);
    }

    #[test]
    fn compare_keeps_only_string_groups() {
        let w1 = table(
            date(2020, 6, 25),
            &["q1", "identity"],
            vec![
                (vec![text("Yes"), text("A")], 1.0),
                (vec![text("No"), text("B")], 2.0),
                (vec![text("Yes"), CellValue::Number(5.0)], 4.0),
                (vec![text("No"), CellValue::Missing], 8.0),
            ],
        );
        let cmp = compare(&w1, "q1", "identity").unwrap();
        assert_eq!(cmp.groups, strings(&["A", "B"]));
        assert_eq!(cmp.rows["Yes"]["A"], 1.0);
        assert_eq!(cmp.rows["No"]["B"], 2.0);
        // The numeric-coded and missing rows were left out entirely.
        assert_eq!(cmp.rows["Yes"].len(), 1);
    }

    #[test]
    fn compare_leaves_unobserved_combinations_absent() {
        let w1 = table(
            date(2020, 6, 25),
            &["q1", "identity"],
            vec![
                (vec![text("Yes"), text("A")], 1.0),
                (vec![text("No"), text("B")], 2.0),
            ],
        );
        let cmp = compare(&w1, "q1", "identity").unwrap();
        assert!(cmp.rows["Yes"].get("B").is_none());

        let dense = cmp.with_totals();
        assert_eq!(dense.groups, strings(&["A", "B"]));
        assert_eq!(dense.columns(), strings(&["A", "B", TOTAL]));
        let yes = dense.rows.iter().find(|r| r.response == "Yes").unwrap();
        assert_eq!(yes.values, vec![1.0, 0.0]);
        assert_eq!(yes.total, 1.0);
    }

    #[test]
    fn compare_requires_both_columns() {
        let w1 = table(date(2020, 6, 25), &["q1"], vec![(vec![text("Yes")], 1.0)]);
        let err = compare(&w1, "q1", "identity").unwrap_err();
        assert_eq!(
            err,
            TallyError::MissingColumn {
                column: "identity".to_string()
            }
        );
        let err = compare(&w1, "q_absent", "q1").unwrap_err();
        assert_eq!(
            err,
            TallyError::MissingColumn {
                column: "q_absent".to_string()
            }
        );
    }

    #[test]
    fn weighted_tally_counts_numeric_codes_by_label() {
        let w1 = table(
            date(2020, 6, 25),
            &["q1"],
            vec![
                (vec![CellValue::Number(5.0)], 1.0),
                (vec![text("5")], 2.0),
            ],
        );
        let tally = weighted_tally(&w1, "q1").unwrap();
        assert_eq!(tally["5"], 3.0);
    }

    #[test]
    fn audit_presence_fuses_both_sources() {
        let meta1 = PresenceMatrix {
            waves: strings(&["w1", "w2"]),
            rows: [
                ("qa".to_string(), vec![1, 1]),
                ("qb".to_string(), vec![1, 0]),
            ]
            .into(),
        };
        let meta2 = PresenceMatrix {
            waves: strings(&["w3"]),
            rows: [("qa".to_string(), vec![1])].into(),
        };
        let ranked = audit_presence(&meta1, &meta2);
        assert_eq!(
            ranked,
            vec![("qa".to_string(), 3), ("qb".to_string(), 1)]
        );
    }

    #[test]
    fn series_percentages_normalize_by_total() {
        let mut tallies: BTreeMap<NaiveDate, ResponseTally> = BTreeMap::new();
        tallies.insert(
            date(2020, 6, 25),
            [("Yes".to_string(), 2.0), ("No".to_string(), 3.0)].into(),
        );
        let series = preprocess("q1", &tallies);
        let pct = series.percentages();
        assert_eq!(pct.len(), 1);
        let (_, shares) = &pct[0];
        // Categories are sorted: No, Yes.
        assert_eq!(shares, &vec![60.0, 40.0]);
    }

    #[test]
    fn wave_table_rejects_misaligned_rows() {
        let err = WaveTable::new(
            date(2020, 6, 25),
            strings(&["q1", "q2"]),
            vec![vec![text("Yes")]],
            vec![1.0],
        )
        .unwrap_err();
        assert_eq!(
            err,
            TallyError::ShapeMismatch {
                expected: 2,
                actual: 1
            }
        );
    }
}
