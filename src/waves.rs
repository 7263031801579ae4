use log::{info, warn};

use wave_tally::*;

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::waves::config_reader::*;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_presence;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum WavesError {
    #[snafu(display("Error opening file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading record at line {lineno}"))]
    CsvRecord { source: csv::Error, lineno: usize },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Error opening workbook {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display(""))]
    EmptyExcel {},
    #[snafu(display("More than one worksheet in {path}, the worksheet name must be provided"))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("Unreadable cell at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("No weight column {column:?} in {path}"))]
    MissingWeightColumn { column: String, path: String },
    #[snafu(display("Unparsable weight at line {lineno} of {path}"))]
    BadWeight { lineno: usize, path: String },
    #[snafu(display("Cannot derive a date from wave identifier {wave:?}"))]
    BadWaveDate { wave: String },
    #[snafu(display("No header row found in metadata file {path}"))]
    EmptyMetadata { path: String },
    #[snafu(display("Comparison refers to unknown wave {wave:?}"))]
    UnknownWave { wave: String },
    #[snafu(display("Expected exactly two presence metadata files, got {count}"))]
    PresenceSourceCount { count: usize },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    MissingParentDir {},
    #[snafu(display(""))]
    Tally { source: wave_tally::TallyError },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    SummaryMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type WavesResult<T> = Result<T, WavesError>;
pub type BWavesResult<T> = Result<T, Box<WavesError>>;

/// Loads one wave of microdata through the provider named by its source.
///
/// Only the requested columns (plus the weight column) are retained, so
/// the caller can fold the table into a [SeriesBuilder] and drop it before
/// the next wave is read.
pub fn load_wave(root: &Path, source: &WaveSource, wanted: &[String]) -> BWavesResult<WaveTable> {
    let date = io_common::wave_date(&source.wave)?;
    let weight_column = source.weight_column();
    match source.provider.as_str() {
        "csv" => {
            let p = io_common::wave_data_path(root, source, "csv");
            let p2 = p.as_path().display().to_string();
            info!("Attempting to read wave file {:?}", p2);
            io_csv::read_wave_csv(&p2, date, wanted, &weight_column)
        }
        "xlsx" => {
            let p = io_common::wave_data_path(root, source, "xlsx");
            let p2 = p.as_path().display().to_string();
            info!("Attempting to read wave file {:?}", p2);
            io_xlsx::read_wave_xlsx(
                &p2,
                date,
                wanted,
                &weight_column,
                &source.excel_worksheet_name,
            )
        }
        x => unimplemented!("Provider not implemented {:?}", x),
    }
}

fn series_to_json(series: &QuestionSeries, title: &str) -> JSValue {
    let shares = series.percentages();
    let rows: Vec<JSValue> = series
        .rows
        .iter()
        .zip(shares.iter())
        .map(|(row, (_, pct))| {
            json!({
                "date": row.date.to_string(),
                "values": row.values,
                "total": row.total,
                "shares": pct,
            })
        })
        .collect();
    json!({
        "chartTitle": title,
        "categories": series.categories,
        "rows": rows,
    })
}

fn comparison_to_json(summary: &ComparisonSummary, spec: &ComparisonSpec) -> JSValue {
    let rows: Vec<JSValue> = summary
        .rows
        .iter()
        .map(|row| {
            json!({
                "response": row.response,
                "values": row.values,
                "total": row.total,
            })
        })
        .collect();
    json!({
        "wave": spec.wave,
        "question": summary.question,
        "groupBy": spec.group_by,
        "groups": summary.groups,
        "rows": rows,
    })
}

/// Builds the whole summary for one survey configuration: every question
/// series, the requested group comparisons (in their totaled form) and the
/// presence ranking.
pub fn build_survey_summary(root: &Path, config: &SurveyConfig) -> BWavesResult<JSValue> {
    let mut builder = SeriesBuilder::new(&config.questions).context(TallySnafu {})?;
    for source in config.wave_sources.iter() {
        // One wave at a time: the raw table goes out of scope as soon as
        // its tallies have been folded in.
        let table = load_wave(root, source, &config.questions)?;
        info!(
            "build_survey_summary: wave {}: {} respondents",
            source.wave,
            table.num_rows()
        );
        builder.add_wave(&table).context(TallySnafu {})?;
    }
    let series = builder.build();

    let mut questions_js: JSMap<String, JSValue> = JSMap::new();
    for (question, s) in series.iter() {
        let title = config.output_settings.chart_title(question);
        questions_js.insert(question.clone(), series_to_json(s, &title));
    }

    let mut comparisons_js: Vec<JSValue> = Vec::new();
    for spec in config.comparisons.clone().unwrap_or_default() {
        let source = config
            .wave_sources
            .iter()
            .find(|ws| ws.wave == spec.wave)
            .context(UnknownWaveSnafu {
                wave: spec.wave.clone(),
            })?;
        let wanted = vec![spec.question.clone(), spec.group_by.clone()];
        let table = load_wave(root, source, &wanted)?;
        let cmp = compare(&table, &spec.question, &spec.group_by).context(TallySnafu {})?;
        comparisons_js.push(comparison_to_json(&cmp.with_totals(), &spec));
    }

    let presence_js = match config.presence_sources.as_deref() {
        None | Some([]) => JSValue::Null,
        Some([first, second]) => {
            let meta1 = read_presence_source(root, first)?;
            let meta2 = read_presence_source(root, second)?;
            let ranked = audit_presence(&meta1, &meta2);
            let entries: Vec<JSValue> = ranked
                .iter()
                .map(|(question, count)| json!({"question": question, "waves": count}))
                .collect();
            JSValue::Array(entries)
        }
        Some(other) => PresenceSourceCountSnafu { count: other.len() }.fail()?,
    };

    Ok(json!({
        "config": {
            "survey": config.output_settings.survey_name,
            "questions": config.questions,
        },
        "questions": questions_js,
        "comparisons": comparisons_js,
        "presence": presence_js,
    }))
}

fn read_presence_source(root: &Path, source: &PresenceSource) -> BWavesResult<PresenceMatrix> {
    let p = root.join(&source.file_path);
    let p2 = p.as_path().display().to_string();
    io_presence::read_presence_csv(&p2, source.skip_rows())
}

pub fn run_survey(
    config_path: String,
    check_summary_path: Option<String>,
    out_path: Option<String>,
) -> BWavesResult<()> {
    let config_p = Path::new(config_path.as_str());
    let config_str = fs::read_to_string(config_path.clone()).context(OpeningJsonSnafu {
        path: config_path.clone(),
    })?;
    let config: SurveyConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    info!("config: {:?}", config);

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let summary = build_survey_summary(root_p, &config)?;
    let pretty_js_summary = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;

    // CLI output location wins over the configured directory.
    let out_file = match out_path {
        Some(p) if p == "stdout" => None,
        Some(p) => Some(PathBuf::from(p)),
        None => config
            .output_settings
            .output_directory
            .as_ref()
            .map(|d| root_p.join(d).join("summary.json")),
    };
    match out_file {
        Some(p) => {
            let p2 = p.as_path().display().to_string();
            info!("Writing summary to {:?}", p2);
            fs::write(&p, &pretty_js_summary).context(WritingSummarySnafu { path: p2 })?;
        }
        None => println!("{}", pretty_js_summary),
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_ref(),
                "\n",
            );
            SummaryMismatchSnafu {}.fail()?
        }
    }

    Ok(())
}
