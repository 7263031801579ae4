// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

use chrono::NaiveDate;

/// The per-respondent weighting factor. Survey weights are fractional, so
/// all the tallies in this crate are weighted sums rather than raw counts.
pub type Weight = f64;

/// The content of a single cell of survey microdata.
///
/// The readers normalize every source format to this enum before the
/// aggregation pipeline runs. `Missing` cells are never counted.
#[derive(PartialEq, Debug, Clone)]
pub enum CellValue {
    /// A categorical response label.
    Text(String),
    /// A numeric code. Numeric codes are valid response categories but are
    /// never valid affinity-group labels.
    Number(f64),
    /// No response recorded for this respondent.
    Missing,
}

impl CellValue {
    /// The label under which this cell is tallied, if any.
    pub fn label(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(x) => Some(format_number(*x)),
            CellValue::Missing => None,
        }
    }

    /// The text content of this cell. Numeric codes and missing cells
    /// return `None`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

// Integer-valued codes render without a trailing ".0" so that a code read
// as 5.0 and a code read as "5" land in the same category.
fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// One wave of raw survey microdata: rows are respondents, columns are
/// question identifiers. The weight column is carried separately so that it
/// can never collide with a question identifier.
#[derive(PartialEq, Debug, Clone)]
pub struct WaveTable {
    /// The fielding date of this wave, used as the series index key.
    pub date: NaiveDate,
    /// Question identifiers, in source order. Does not contain the weight.
    pub columns: Vec<String>,
    /// Row-major cells, each row aligned with `columns`.
    pub cells: Vec<Vec<CellValue>>,
    /// One weight per row.
    pub weights: Vec<Weight>,
}

impl WaveTable {
    pub fn new(
        date: NaiveDate,
        columns: Vec<String>,
        cells: Vec<Vec<CellValue>>,
        weights: Vec<Weight>,
    ) -> Result<WaveTable, TallyError> {
        if weights.len() != cells.len() {
            return Err(TallyError::ShapeMismatch {
                expected: cells.len(),
                actual: weights.len(),
            });
        }
        for row in cells.iter() {
            if row.len() != columns.len() {
                return Err(TallyError::ShapeMismatch {
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(WaveTable {
            date,
            columns,
            cells,
            weights,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn num_rows(&self) -> usize {
        self.cells.len()
    }
}

/// The weighted response-count distribution for one question in one wave:
/// response category to summed weight.
pub type ResponseTally = BTreeMap<String, Weight>;

// ******** Output data structures *********

/// One wave-date entry of a [QuestionSeries]. Dense: `values` is aligned
/// with the series categories and contains no gaps.
#[derive(PartialEq, Debug, Clone)]
pub struct SeriesRow {
    pub date: NaiveDate,
    pub values: Vec<Weight>,
    /// Row-wise sum over `values`.
    pub total: Weight,
}

/// The per-question weighted response distribution across all waves.
///
/// Rows are wave dates in ascending order; columns are the union of the
/// response categories observed in any wave. A category that was not
/// observed in some wave holds an explicit zero there.
#[derive(PartialEq, Debug, Clone)]
pub struct QuestionSeries {
    pub question: String,
    /// Sorted union of response categories, without the total.
    pub categories: Vec<String>,
    pub rows: Vec<SeriesRow>,
}

impl QuestionSeries {
    /// True when the question was absent from every wave.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All column names of the series, with the total appended last.
    pub fn columns(&self) -> Vec<String> {
        let mut cols = self.categories.clone();
        cols.push(crate::TOTAL.to_string());
        cols
    }

    pub fn value(&self, date: NaiveDate, category: &str) -> Option<Weight> {
        let col = self.categories.iter().position(|c| c == category)?;
        let row = self.rows.iter().find(|r| r.date == date)?;
        row.values.get(col).copied()
    }

    /// Per-row response shares, `100 * value / total`, in category order.
    /// A row with a zero total yields zeros.
    pub fn percentages(&self) -> Vec<(NaiveDate, Vec<Weight>)> {
        self.rows
            .iter()
            .map(|r| {
                let shares = r
                    .values
                    .iter()
                    .map(|v| if r.total > 0.0 { 100.0 * v / r.total } else { 0.0 })
                    .collect();
                (r.date, shares)
            })
            .collect()
    }
}

/// The weighted breakdown of one question by affinity group, for a single
/// wave. Sparse: a (response, group) pair that was never observed stays
/// absent. Use [ComparisonTable::with_totals] for the dense form expected
/// by the rendering layer.
#[derive(PartialEq, Debug, Clone)]
pub struct ComparisonTable {
    pub question: String,
    /// Sorted distinct affinity-group labels found in the grouping column.
    pub groups: Vec<String>,
    /// Response category to (group label to summed weight).
    pub rows: BTreeMap<String, BTreeMap<String, Weight>>,
}

/// One response row of a [ComparisonSummary], zero-filled and totaled.
#[derive(PartialEq, Debug, Clone)]
pub struct ComparisonRow {
    pub response: String,
    pub values: Vec<Weight>,
    pub total: Weight,
}

/// The dense, totaled form of a [ComparisonTable].
#[derive(PartialEq, Debug, Clone)]
pub struct ComparisonSummary {
    pub question: String,
    pub groups: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonSummary {
    /// All column names of the summary, with the total appended last.
    pub fn columns(&self) -> Vec<String> {
        let mut cols = self.groups.clone();
        cols.push(crate::TOTAL.to_string());
        cols
    }
}

impl ComparisonTable {
    /// Fills absent (response, group) combinations with zero and appends
    /// the row-wise total over all groups.
    pub fn with_totals(&self) -> ComparisonSummary {
        let rows = self
            .rows
            .iter()
            .map(|(response, by_group)| {
                let values: Vec<Weight> = self
                    .groups
                    .iter()
                    .map(|g| by_group.get(g).copied().unwrap_or(0.0))
                    .collect();
                let total = values.iter().sum();
                ComparisonRow {
                    response: response.clone(),
                    values,
                    total,
                }
            })
            .collect();
        ComparisonSummary {
            question: self.question.clone(),
            groups: self.groups.clone(),
            rows,
        }
    }
}

/// Which questions appeared in which waves, from one metadata source.
#[derive(PartialEq, Debug, Clone)]
pub struct PresenceMatrix {
    /// Wave identifiers, one per flag column.
    pub waves: Vec<String>,
    /// Question identifier to per-wave presence flags, aligned with `waves`.
    pub rows: BTreeMap<String, Vec<u8>>,
}

/// Errors raised by the aggregation pipeline.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyError {
    /// A requested column does not exist in the given wave table.
    MissingColumn { column: String },
    /// A row or the weight vector does not line up with the column set.
    ShapeMismatch { expected: usize, actual: usize },
}

impl Error for TallyError {}

impl Display for TallyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyError::MissingColumn { column } => {
                write!(f, "column not found in wave table: {}", column)
            }
            TallyError::ShapeMismatch { expected, actual } => {
                write!(f, "misaligned table: expected {} values, got {}", expected, actual)
            }
        }
    }
}
