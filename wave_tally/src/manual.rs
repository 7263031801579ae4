/*!

# Aggregating survey waves

A repeated survey fields a questionnaire over many rounds ("waves"), one
dataset per fielding period. Each row of a wave is one respondent, with a
per-respondent `weight` used to compute population-representative sums
instead of raw counts.

The pipeline in this crate reshapes many small per-wave tables into
per-question time series:

1. Read one wave into a [crate::WaveTable] (the `wavetab` command line tool
   ships CSV and Excel readers; any source that can produce cells and
   weights works).
2. Fold the waves into a [crate::SeriesBuilder]. For every requested
   question present in a wave, the builder groups the rows by response
   value and sums the weights. A wave that did not field a question is
   skipped for that question; a wave table can be dropped as soon as it has
   been added.
3. [crate::SeriesBuilder::build] runs every accumulator through
   [crate::preprocess], which unions the response categories across waves,
   fills the unobserved (wave, category) cells with explicit zeros, drops
   the `"Not Asked"` sentinel, and appends a row-wise total.

The resulting [crate::QuestionSeries] has wave dates as rows and response
categories as columns, with no gaps, which is the shape the plotting layer
consumes ([crate::QuestionSeries::percentages] yields the percentage view
directly).

Two side operations share the same tallying core:

- [crate::compare] breaks one wave's responses to a question down by an
  affinity-group attribute, one column per group label.
- [crate::audit_presence] fuses two question-presence matrices and ranks
  the questions by the number of waves in which they were asked. This is a
  good place to start when deciding which questions are worth a series.

*/
